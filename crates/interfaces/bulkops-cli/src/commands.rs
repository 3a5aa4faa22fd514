use std::io;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use bulkops_config::{clamp_concurrency, PROGRESS_CHANNEL_CAPACITY};
use bulkops_core::BulkRun;
use bulkops_executor::{
    BulkActionDialog, BulkActionExecutor, BulkActionRequest, ExecutorOptions, ProgressTracker,
    RequestBody, RestAction,
};
use bulkops_infra::{HttpRestClient, Method};
use camino::{Utf8Path, Utf8PathBuf};
use indicatif::{ProgressBar, ProgressStyle};
use serde_json::Value;
use tracing::warn;

use crate::items::{confirm_from, display_name, load_items, render_row, sort_by_name, write_report};
use crate::{CliKey, CliMethod};

pub struct RunArgs {
    pub base_url: String,
    pub items: Utf8PathBuf,
    pub method: CliMethod,
    pub path: String,
    pub key: CliKey,
    pub body: Option<String>,
    pub send_item: bool,
    pub concurrency: usize,
    pub rps: Option<u32>,
    pub abort_in_flight: bool,
    pub yes: bool,
    pub report: Option<Utf8PathBuf>,
    pub token: Option<String>,
    pub timeout_secs: u64,
}

/// Lists the items a run would touch, keyed and sorted, without calling anything.
pub fn cmd_plan(items_path: &Utf8Path, key: CliKey) -> Result<BulkRun<Value>> {
    let mut items = load_items(items_path)?;
    sort_by_name(&mut items);
    let run = BulkRun::new(items, &key.key_fn())?;

    println!(":: {} items selected", run.len());
    for outcome in &run.outcomes {
        println!(
            "   {:<12} {}",
            outcome.key.as_str(),
            display_name(&outcome.item, &outcome.key)
        );
    }
    Ok(run)
}

/// Applies one REST call per item. Returns `None` when the user declines the
/// confirmation and nothing was sent.
pub async fn cmd_run(args: RunArgs) -> Result<Option<BulkRun<Value>>> {
    let mut items = load_items(&args.items)?;
    sort_by_name(&mut items);
    let total = items.len();
    let method: Method = args.method.into();

    println!(":: Bulk {} on {} items", method, total);
    println!("   Target: {}{}", args.base_url.trim_end_matches('/'), args.path);

    let mut client = HttpRestClient::new(args.base_url.clone())
        .context("Failed to build HTTP client")?
        .timeout(Duration::from_secs(args.timeout_secs));
    if let Some(token) = args.token {
        client = client.bearer_token(token);
    }

    let body = match (args.body, args.send_item) {
        (Some(raw), _) => {
            RequestBody::Fixed(serde_json::from_str(&raw).context("--body is not valid JSON")?)
        }
        (None, true) => RequestBody::Item,
        (None, false) => RequestBody::None,
    };
    let action = RestAction::new(Arc::new(client), method.clone(), args.path)
        .with_body(body)
        .observe_signal(args.abort_in_flight);

    let executor = BulkActionExecutor::new(ExecutorOptions {
        concurrency: clamp_concurrency(args.concurrency),
        abort_in_flight_on_cancel: args.abort_in_flight,
        max_requests_per_second: args.rps,
    });

    let mut request = BulkActionRequest::new(format!("{method} {total} items"), items, args.key.key_fn());
    if action.is_destructive() {
        request = request
            .danger(format!(
                "Yes, I confirm that I want to delete these {total} items."
            ))
            .action_button_text(format!("Delete {total} items"))
            .alert_prompt("Deleted items cannot be recovered.");
    }

    let (tx, mut rx) = tokio::sync::mpsc::channel(PROGRESS_CHANNEL_CAPACITY);
    let mut dialog = BulkActionDialog::open(executor, request)?.with_progress(tx);

    if dialog.is_danger() {
        for alert in dialog.alert_prompts() {
            println!("   ! {}", alert);
        }
        let confirmed = if args.yes {
            true
        } else {
            let question = dialog.confirm_text().unwrap_or("Continue?").to_string();
            tokio::task::spawn_blocking(move || {
                confirm_from(&mut io::stdin().lock(), &mut io::stdout(), &question)
            })
            .await??
        };
        dialog.confirm(confirmed);
        if !confirmed {
            println!(":: Aborted, nothing was changed.");
            dialog.close();
            return Ok(None);
        }
    }

    let cancel = dialog.cancel_token();
    let interrupt = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupted, canceling items that have not started");
            cancel.cancel();
        }
    });

    let pb = ProgressBar::new(total as u64);
    pb.set_style(
        ProgressStyle::with_template("[{elapsed_precise}] {bar:40.cyan/blue} {pos}/{len} {msg}")?
            .progress_chars("=>-"),
    );

    dialog.start(action)?;

    let progress = {
        let pb = pb.clone();
        tokio::spawn(async move {
            let mut tracker = ProgressTracker::new(total);
            while let Some(ev) = rx.recv().await {
                tracker.update(&ev);
                let snap = tracker.snapshot();
                pb.set_position(snap.done() as u64);
                pb.set_message(format!(
                    "{} ok, {} failed, {} in flight ({:.1}/s)",
                    snap.succeeded,
                    snap.failed,
                    snap.in_flight.len(),
                    snap.items_per_sec
                ));
                if snap.finished {
                    break;
                }
            }
        })
    };

    let run = dialog.wait().await.context("Bulk run was never started")?;
    interrupt.abort();
    let _ = progress.await;
    pb.finish_with_message(run.summary().to_string());

    println!("\n:: Result");
    for outcome in &run.outcomes {
        println!("   {}", render_row(outcome));
    }
    println!("   {}", run.summary());

    if let Some(path) = &args.report {
        write_report(path, &run)?;
        println!(":: Wrote report to {}", path);
    }

    dialog.close();
    Ok(Some(run))
}
