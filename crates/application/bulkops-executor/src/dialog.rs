use bulkops_core::{ActionOutcome, BulkError, BulkRun, KeyFn, RunEvent};
use tokio::sync::mpsc::Sender;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::warn;

use crate::action::ItemAction;
use crate::executor::BulkActionExecutor;
use crate::options::{CloseFn, CompleteFn, RunOptions};
use crate::store::RunStore;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DialogState {
    /// A dangerous action is waiting for the explicit confirm gesture.
    AwaitingConfirmation,
    Ready,
    Running,
    Finished,
    Closed,
}

/// Everything a list view hands over when the user picks a bulk action.
pub struct BulkActionRequest<T> {
    pub title: String,
    pub prompt: Option<String>,
    pub confirm_text: Option<String>,
    pub action_button_text: String,
    pub alert_prompts: Vec<String>,
    pub items: Vec<T>,
    pub key_fn: KeyFn<T>,
    pub is_danger: bool,
    pub on_complete: Option<CompleteFn<T>>,
    pub on_close: Option<CloseFn>,
}

impl<T> BulkActionRequest<T> {
    pub fn new(title: impl Into<String>, items: Vec<T>, key_fn: KeyFn<T>) -> Self {
        let title = title.into();
        Self {
            action_button_text: title.clone(),
            title,
            prompt: None,
            confirm_text: None,
            alert_prompts: Vec::new(),
            items,
            key_fn,
            is_danger: false,
            on_complete: None,
            on_close: None,
        }
    }

    pub fn prompt(mut self, prompt: impl Into<String>) -> Self {
        self.prompt = Some(prompt.into());
        self
    }

    /// Marks the action as dangerous; `confirm_text` is what the user agrees to.
    pub fn danger(mut self, confirm_text: impl Into<String>) -> Self {
        self.is_danger = true;
        self.confirm_text = Some(confirm_text.into());
        self
    }

    pub fn action_button_text(mut self, text: impl Into<String>) -> Self {
        self.action_button_text = text.into();
        self
    }

    pub fn alert_prompt(mut self, alert: impl Into<String>) -> Self {
        self.alert_prompts.push(alert.into());
        self
    }

    pub fn on_complete(mut self, f: impl FnOnce(&[ActionOutcome<T>]) + Send + 'static) -> Self {
        self.on_complete = Some(Box::new(f));
        self
    }

    pub fn on_close(mut self, f: impl FnOnce() + Send + 'static) -> Self {
        self.on_close = Some(Box::new(f));
        self
    }
}

/// Confirmation and progress flow around one bulk run, independent of any
/// rendering layer. A view reads `state()` and `snapshot()` and forwards the
/// user's confirm, cancel and close gestures.
pub struct BulkActionDialog<T> {
    executor: BulkActionExecutor,
    title: String,
    prompt: Option<String>,
    confirm_text: Option<String>,
    action_button_text: String,
    alert_prompts: Vec<String>,
    is_danger: bool,
    state: DialogState,
    store: RunStore<T>,
    options: Option<RunOptions<T>>,
    cancel: CancellationToken,
    task: Option<JoinHandle<BulkRun<T>>>,
    result: Option<BulkRun<T>>,
    on_close: Option<CloseFn>,
}

impl<T> BulkActionDialog<T>
where
    T: Clone + Send + Sync + 'static,
{
    /// Opens the dialog. An empty or ambiguous selection is rejected here,
    /// before anything is shown or invoked.
    pub fn open(executor: BulkActionExecutor, request: BulkActionRequest<T>) -> Result<Self, BulkError> {
        let BulkActionRequest {
            title,
            prompt,
            confirm_text,
            action_button_text,
            alert_prompts,
            items,
            key_fn,
            is_danger,
            on_complete,
            on_close,
        } = request;

        let mut options = RunOptions::new(key_fn).danger(is_danger);
        options.on_complete = on_complete;
        let cancel = options.cancel.clone();
        let store = executor.prepare(items, &options)?;

        Ok(Self {
            executor,
            title,
            prompt,
            confirm_text,
            action_button_text,
            alert_prompts,
            is_danger,
            state: if is_danger {
                DialogState::AwaitingConfirmation
            } else {
                DialogState::Ready
            },
            store,
            options: Some(options),
            cancel,
            task: None,
            result: None,
            on_close,
        })
    }

    pub fn with_progress(mut self, tx: Sender<RunEvent>) -> Self {
        if let Some(options) = self.options.take() {
            self.options = Some(options.with_progress(tx));
        }
        self
    }

    pub fn state(&self) -> DialogState {
        self.state
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn prompt(&self) -> Option<&str> {
        self.prompt.as_deref()
    }

    pub fn confirm_text(&self) -> Option<&str> {
        self.confirm_text.as_deref()
    }

    pub fn action_button_text(&self) -> &str {
        &self.action_button_text
    }

    pub fn alert_prompts(&self) -> &[String] {
        &self.alert_prompts
    }

    pub fn is_danger(&self) -> bool {
        self.is_danger
    }

    /// Toggles the confirm checkbox of a dangerous action.
    pub fn confirm(&mut self, confirmed: bool) {
        match (self.state, confirmed) {
            (DialogState::AwaitingConfirmation, true) => self.state = DialogState::Ready,
            (DialogState::Ready, false) if self.is_danger => {
                self.state = DialogState::AwaitingConfirmation
            }
            _ => {}
        }
    }

    pub fn start<A>(&mut self, action: A) -> Result<(), BulkError>
    where
        A: ItemAction<T> + 'static,
    {
        match self.state {
            DialogState::Ready => {}
            DialogState::AwaitingConfirmation => {
                return Err(BulkError::InvalidState(
                    "dangerous bulk action requires confirmation before it starts".into(),
                ))
            }
            other => {
                return Err(BulkError::InvalidState(format!(
                    "bulk action cannot start from {other:?}"
                )))
            }
        }
        let Some(options) = self.options.take() else {
            return Err(BulkError::InvalidState("bulk action already started".into()));
        };

        let executor = self.executor.clone();
        let store = self.store.clone();
        self.task = Some(tokio::spawn(async move {
            executor.drive(store, action, options).await
        }));
        self.state = DialogState::Running;
        Ok(())
    }

    /// Current outcomes, one row per item, for the progress view.
    pub fn snapshot(&self) -> BulkRun<T> {
        self.store.state()
    }

    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// Token that cancels this run, for callers that cancel from another task.
    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Waits for the run to finish. Returns `None` if it was never started.
    pub async fn wait(&mut self) -> Option<BulkRun<T>> {
        if let Some(task) = self.task.take() {
            let run = match task.await {
                Ok(run) => run,
                Err(e) => {
                    warn!("Bulk run task ended abnormally: {e}");
                    self.store.state()
                }
            };
            self.result = Some(run);
            if self.state == DialogState::Running {
                self.state = DialogState::Finished;
            }
        }
        self.result.clone()
    }

    /// Dismisses the dialog. `on_close` fires exactly once, whatever the
    /// outcome. A run still in progress is canceled; in-flight items finish
    /// in the background.
    pub fn close(&mut self) {
        if self.state == DialogState::Closed {
            return;
        }
        if self.state == DialogState::Running {
            self.cancel.cancel();
        }
        if let Some(on_close) = self.on_close.take() {
            on_close();
        }
        self.state = DialogState::Closed;
    }
}
