use bulkops_cli::commands::{self, RunArgs};
use bulkops_cli::{CliKey, CliMethod};
use bulkops_config::{DEFAULT_CONCURRENCY, DEFAULT_REQUEST_TIMEOUT_SECS};
use camino::Utf8PathBuf;
use clap::{Parser, Subcommand};
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

#[derive(Parser)]
#[command(author, version, about)]
struct Cli {
    #[arg(short, long, global = true)]
    verbose: bool,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show the items a run would touch without sending anything
    Plan {
        #[arg(long)]
        items: Utf8PathBuf,
        #[arg(long, value_enum, default_value_t = CliKey::Id)]
        key: CliKey,
    },
    /// Apply one REST call to every item in a JSON list
    Run {
        #[arg(long, env = "BULKOPS_BASE_URL")]
        base_url: String,
        #[arg(long, help = "JSON array of items, or a paginated list response")]
        items: Utf8PathBuf,
        #[arg(short, long, value_enum, default_value_t = CliMethod::Delete)]
        method: CliMethod,
        #[arg(long, help = "Path template, e.g. /api/eda/v1/event-streams/{id}/")]
        path: String,
        #[arg(long, value_enum, default_value_t = CliKey::Id)]
        key: CliKey,
        #[arg(long, help = "JSON body sent with every request")]
        body: Option<String>,
        #[arg(long, conflicts_with = "body", help = "Send each item as the request body")]
        send_item: bool,
        #[arg(short, long, default_value_t = DEFAULT_CONCURRENCY)]
        concurrency: usize,
        #[arg(long, help = "Maximum requests per second")]
        rps: Option<u32>,
        #[arg(long, help = "Abort in-flight requests on Ctrl-C instead of letting them finish")]
        abort_in_flight: bool,
        #[arg(short, long, help = "Skip the confirmation prompt for destructive actions")]
        yes: bool,
        #[arg(long)]
        report: Option<Utf8PathBuf>,
        #[arg(long, env = "BULKOPS_TOKEN", hide_env_values = true)]
        token: Option<String>,
        #[arg(long, default_value_t = DEFAULT_REQUEST_TIMEOUT_SECS)]
        timeout: u64,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let level = if cli.verbose {
        Level::DEBUG
    } else {
        Level::WARN
    };
    let subscriber = FmtSubscriber::builder().with_max_level(level).finish();
    tracing::subscriber::set_global_default(subscriber).expect("default subscriber");

    match cli.command {
        Commands::Plan { items, key } => {
            commands::cmd_plan(&items, key)?;
        }
        Commands::Run {
            base_url,
            items,
            method,
            path,
            key,
            body,
            send_item,
            concurrency,
            rps,
            abort_in_flight,
            yes,
            report,
            token,
            timeout,
        } => {
            let run = commands::cmd_run(RunArgs {
                base_url,
                items,
                method,
                path,
                key,
                body,
                send_item,
                concurrency,
                rps,
                abort_in_flight,
                yes,
                report,
                token,
                timeout_secs: timeout,
            })
            .await?;

            if let Some(run) = run {
                let summary = run.summary();
                if summary.failed > 0 {
                    anyhow::bail!("{} of {} items failed", summary.failed, summary.total);
                }
            }
        }
    }

    Ok(())
}
