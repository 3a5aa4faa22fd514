use bulkops_config::{clamp_concurrency, DEFAULT_CONCURRENCY};
use bulkops_core::{key_fn, ActionOutcome, ItemKey, KeyFn, RunEvent};
use tokio::sync::mpsc::Sender;
use tokio_util::sync::CancellationToken;

#[derive(Debug, Clone)]
pub struct ExecutorOptions {
    /// Upper bound on item actions in flight at once. One issues items sequentially.
    pub concurrency: usize,
    /// Drop in-flight actions when the run is canceled instead of letting them finish.
    /// Dropped items are recorded as canceled.
    pub abort_in_flight_on_cancel: bool,
    pub max_requests_per_second: Option<u32>,
}

impl Default for ExecutorOptions {
    fn default() -> Self {
        Self {
            concurrency: DEFAULT_CONCURRENCY,
            abort_in_flight_on_cancel: false,
            max_requests_per_second: None,
        }
    }
}

impl ExecutorOptions {
    pub fn sequential() -> Self {
        Self {
            concurrency: 1,
            ..Self::default()
        }
    }

    pub fn effective_concurrency(&self) -> usize {
        clamp_concurrency(self.concurrency)
    }
}

pub type CompleteFn<T> = Box<dyn FnOnce(&[ActionOutcome<T>]) + Send>;
pub type CloseFn = Box<dyn FnOnce() + Send>;

pub struct RunOptions<T> {
    pub key_fn: KeyFn<T>,
    /// Carried for the confirmation step; the executor only records it.
    pub is_danger: bool,
    pub on_complete: Option<CompleteFn<T>>,
    pub cancel: CancellationToken,
    pub progress_tx: Option<Sender<RunEvent>>,
}

impl<T> RunOptions<T> {
    pub fn new(key_fn: KeyFn<T>) -> Self {
        Self {
            key_fn,
            is_danger: false,
            on_complete: None,
            cancel: CancellationToken::new(),
            progress_tx: None,
        }
    }

    pub fn keyed_by<F, K>(f: F) -> Self
    where
        F: Fn(&T) -> K + Send + Sync + 'static,
        K: Into<ItemKey>,
    {
        Self::new(key_fn(f))
    }

    pub fn danger(mut self, is_danger: bool) -> Self {
        self.is_danger = is_danger;
        self
    }

    pub fn on_complete(mut self, f: impl FnOnce(&[ActionOutcome<T>]) + Send + 'static) -> Self {
        self.on_complete = Some(Box::new(f));
        self
    }

    pub fn with_cancel(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn with_progress(mut self, tx: Sender<RunEvent>) -> Self {
        self.progress_tx = Some(tx);
        self
    }
}
