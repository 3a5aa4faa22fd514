use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use bulkops_core::{key_fn, name_key_fn};
use bulkops_executor::{
    action_fn, BulkActionDialog, BulkActionExecutor, BulkActionRequest, BulkError, DialogState,
    ExecutorOptions, OutcomeStatus, RunState,
};
use serde_json::{json, Value};
use tokio_util::sync::CancellationToken;

fn remotes() -> Vec<Value> {
    vec![
        json!({ "name": "community", "pulp_href": "/pulp/api/v3/remotes/ansible/collection/11/" }),
        json!({ "name": "rh-certified", "pulp_href": "/pulp/api/v3/remotes/ansible/collection/12/" }),
    ]
}

fn delete_request(closed: Arc<AtomicUsize>) -> BulkActionRequest<Value> {
    BulkActionRequest::new("Permanently delete remotes", remotes(), key_fn(name_key_fn))
        .danger("Yes, I confirm that I want to delete these 2 remotes.")
        .action_button_text("Delete remotes")
        .alert_prompt("This will also delete all associated resources under this remote.")
        .on_close(move || {
            closed.fetch_add(1, Ordering::SeqCst);
        })
}

#[tokio::test]
async fn dangerous_action_requires_confirmation() {
    let closed = Arc::new(AtomicUsize::new(0));
    let mut dialog =
        BulkActionDialog::open(BulkActionExecutor::default(), delete_request(closed.clone()))
            .unwrap();

    assert_eq!(dialog.state(), DialogState::AwaitingConfirmation);
    assert!(dialog.is_danger());
    assert_eq!(dialog.action_button_text(), "Delete remotes");
    assert_eq!(dialog.alert_prompts().len(), 1);

    let err = dialog
        .start(action_fn(|_item: Value, _signal: CancellationToken| async {
            Ok(Value::Null)
        }))
        .unwrap_err();
    assert!(matches!(err, BulkError::InvalidState(_)));
    assert_eq!(dialog.snapshot().state, RunState::Idle);

    dialog.confirm(true);
    assert_eq!(dialog.state(), DialogState::Ready);
    dialog.confirm(false);
    assert_eq!(dialog.state(), DialogState::AwaitingConfirmation);
    dialog.confirm(true);

    dialog
        .start(action_fn(|_item: Value, _signal: CancellationToken| async {
            Ok(Value::Null)
        }))
        .unwrap();
    assert_eq!(dialog.state(), DialogState::Running);

    let run = dialog.wait().await.unwrap();
    assert_eq!(dialog.state(), DialogState::Finished);
    assert_eq!(run.summary().succeeded, 2);

    dialog.close();
    dialog.close();
    assert_eq!(dialog.state(), DialogState::Closed);
    assert_eq!(closed.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn safe_action_starts_without_confirmation() {
    let completed = Arc::new(AtomicUsize::new(0));
    let counter = completed.clone();
    let request = BulkActionRequest::new("Add roles", remotes(), key_fn(name_key_fn)).on_complete(
        move |outcomes| {
            assert_eq!(outcomes.len(), 2);
            counter.fetch_add(1, Ordering::SeqCst);
        },
    );

    let mut dialog = BulkActionDialog::open(BulkActionExecutor::default(), request).unwrap();
    assert_eq!(dialog.state(), DialogState::Ready);
    assert_eq!(dialog.action_button_text(), "Add roles");

    dialog
        .start(action_fn(|_item: Value, _signal: CancellationToken| async {
            Ok(json!({ "id": 1 }))
        }))
        .unwrap();
    dialog.wait().await.unwrap();
    assert_eq!(completed.load(Ordering::SeqCst), 1);

    let err = dialog
        .start(action_fn(|_item: Value, _signal: CancellationToken| async {
            Ok(Value::Null)
        }))
        .unwrap_err();
    assert!(matches!(err, BulkError::InvalidState(_)));
}

#[tokio::test]
async fn empty_selection_cannot_open() {
    let request = BulkActionRequest::new("Delete", Vec::<Value>::new(), key_fn(name_key_fn));
    let err = BulkActionDialog::open(BulkActionExecutor::default(), request).err();
    assert!(matches!(err, Some(BulkError::InvalidArgument(_))));
}

#[tokio::test]
async fn closing_a_running_dialog_cancels_remaining_items() {
    let closed = Arc::new(AtomicUsize::new(0));
    let executor = BulkActionExecutor::new(ExecutorOptions::sequential());
    let mut dialog = BulkActionDialog::open(executor, delete_request(closed.clone())).unwrap();
    dialog.confirm(true);
    dialog
        .start(action_fn(|_item: Value, _signal: CancellationToken| async {
            tokio::time::sleep(Duration::from_millis(50)).await;
            Ok(Value::Null)
        }))
        .unwrap();

    tokio::time::sleep(Duration::from_millis(10)).await;
    dialog.close();
    assert_eq!(closed.load(Ordering::SeqCst), 1);
    assert_eq!(dialog.state(), DialogState::Closed);

    // The first remote was in flight and still finishes; the second never starts.
    let run = dialog.wait().await.unwrap();
    assert_eq!(run.state, RunState::Canceled);
    assert_eq!(run.outcomes[0].status, OutcomeStatus::Success);
    assert_eq!(run.outcomes[1].status, OutcomeStatus::Canceled);
    assert_eq!(dialog.state(), DialogState::Closed);
}
