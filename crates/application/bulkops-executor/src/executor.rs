use std::num::NonZeroU32;
use std::sync::Arc;

use bulkops_core::{ActionError, BulkError, BulkRun, ItemKey, RunEvent};
use futures::stream::{self, StreamExt};
use governor::clock::DefaultClock;
use governor::middleware::NoOpMiddleware;
use governor::state::{InMemoryState, NotKeyed};
use governor::{Quota, RateLimiter};
use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::mpsc::Sender;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::action::ItemAction;
use crate::options::{ExecutorOptions, RunOptions};
use crate::store::RunStore;

type Limiter = RateLimiter<NotKeyed, InMemoryState, DefaultClock, NoOpMiddleware>;

/// Applies an action once per selected item and records every item's outcome.
///
/// One item's failure never stops the others. The only error surfaced by
/// [`BulkActionExecutor::run`] is [`BulkError::InvalidArgument`], raised before
/// any action is invoked.
#[derive(Debug, Clone, Default)]
pub struct BulkActionExecutor {
    options: ExecutorOptions,
}

// Applies events to the store and mirrors them to the optional progress channel.
// A full or closed channel drops the event; the store stays authoritative.
struct Emitter<T> {
    store: RunStore<T>,
    tx: Option<Sender<RunEvent>>,
}

impl<T> Emitter<T> {
    fn emit(&self, ev: RunEvent) {
        self.store.apply(ev.clone());
        self.forward(ev);
    }

    fn forward(&self, ev: RunEvent) {
        let Some(tx) = &self.tx else {
            return;
        };
        if let Err(TrySendError::Full(ev)) = tx.try_send(ev) {
            debug!(?ev, "Progress channel full, dropping event");
        }
    }

    fn begin(&self, key: &ItemKey) -> bool {
        let started = self.store.begin(key);
        if started {
            self.forward(RunEvent::ItemStarted { key: key.clone() });
        }
        started
    }

    fn cancel_requested(&self) {
        if self.store.request_cancel() {
            self.forward(RunEvent::CancelRequested);
        }
    }

    fn canceled(&self, key: ItemKey) {
        self.cancel_requested();
        self.emit(RunEvent::ItemCanceled { key });
    }
}

impl BulkActionExecutor {
    pub fn new(options: ExecutorOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &ExecutorOptions {
        &self.options
    }

    pub async fn run<T, A>(
        &self,
        items: Vec<T>,
        action: A,
        options: RunOptions<T>,
    ) -> Result<BulkRun<T>, BulkError>
    where
        T: Clone + Send + Sync + 'static,
        A: ItemAction<T>,
    {
        let store = self.prepare(items, &options)?;
        Ok(self.drive(store, action, options).await)
    }

    /// Validates the selection and builds the idle run without invoking anything.
    pub fn prepare<T>(
        &self,
        items: Vec<T>,
        options: &RunOptions<T>,
    ) -> Result<RunStore<T>, BulkError> {
        let run = BulkRun::new(items, &options.key_fn)?;
        Ok(RunStore::new(run))
    }

    /// Drives a prepared run to completion and fires `on_complete` once.
    pub async fn drive<T, A>(&self, store: RunStore<T>, action: A, options: RunOptions<T>) -> BulkRun<T>
    where
        T: Clone + Send + Sync + 'static,
        A: ItemAction<T>,
    {
        let RunOptions {
            is_danger,
            on_complete,
            cancel,
            progress_tx,
            ..
        } = options;

        let concurrency = self.options.effective_concurrency();
        let limiter: Option<Arc<Limiter>> = self
            .options
            .max_requests_per_second
            .and_then(NonZeroU32::new)
            .map(|nz| Arc::new(RateLimiter::direct(Quota::per_second(nz))));

        let (run_id, queue) = store.with_state(|run| {
            let queue: Vec<(ItemKey, T)> = run
                .outcomes
                .iter()
                .map(|o| (o.key.clone(), o.item.clone()))
                .collect();
            (run.id, queue)
        });

        info!(
            %run_id,
            items = queue.len(),
            concurrency,
            is_danger,
            "Starting bulk run"
        );

        let emitter = Emitter {
            store: store.clone(),
            tx: progress_tx,
        };
        emitter.emit(RunEvent::Started);

        let done = CancellationToken::new();
        let watcher = async {
            tokio::select! {
                _ = cancel.cancelled() => emitter.cancel_requested(),
                _ = done.cancelled() => {}
            }
        };

        let driver = async {
            stream::iter(queue)
                .map(|(key, item)| {
                    self.process_item(key, item, &action, &cancel, &emitter, limiter.as_deref())
                })
                .buffer_unordered(concurrency)
                .collect::<Vec<()>>()
                .await;
            done.cancel();
        };

        futures::join!(driver, watcher);

        emitter.emit(RunEvent::Finished);
        let run = store.state();
        info!(%run_id, state = ?run.state, summary = %run.summary(), "Bulk run finished");

        if let Some(on_complete) = on_complete {
            on_complete(&run.outcomes);
        }
        run
    }

    async fn process_item<T, A>(
        &self,
        key: ItemKey,
        item: T,
        action: &A,
        cancel: &CancellationToken,
        emitter: &Emitter<T>,
        limiter: Option<&Limiter>,
    ) where
        T: Clone + Send + Sync + 'static,
        A: ItemAction<T>,
    {
        if let Some(lim) = limiter {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    debug!(%key, "Item canceled while waiting for the rate limiter");
                    emitter.canceled(key);
                    return;
                }
                _ = lim.until_ready() => {}
            }
        }

        // The token may fire before the watcher records it in the store.
        if cancel.is_cancelled() {
            debug!(%key, "Skipping item, run canceled");
            emitter.canceled(key);
            return;
        }

        if !emitter.begin(&key) {
            debug!(%key, "Item canceled before start");
            emitter.emit(RunEvent::ItemCanceled { key });
            return;
        }
        debug!(%key, "Item started");

        let call = action.execute(item, cancel.clone());
        let result = if self.options.abort_in_flight_on_cancel {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => None,
                res = call => Some(res),
            }
        } else {
            Some(call.await)
        };

        match result {
            Some(Ok(output)) => {
                debug!(%key, "Item succeeded");
                emitter.emit(RunEvent::ItemSucceeded {
                    key,
                    output: Some(output),
                });
            }
            // An action that observed the run's signal and gave up was canceled, not failed.
            Some(Err(ActionError::Aborted)) if cancel.is_cancelled() => {
                debug!(%key, "In-flight item aborted its own call");
                emitter.canceled(key);
            }
            Some(Err(e)) => {
                let error = e.detail();
                warn!(%key, error = %error, "Item action failed");
                emitter.emit(RunEvent::ItemFailed { key, error });
            }
            None => {
                debug!(%key, "In-flight item aborted by cancellation");
                emitter.canceled(key);
            }
        }
    }
}
