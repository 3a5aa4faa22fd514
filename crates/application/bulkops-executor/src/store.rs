use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use bulkops_core::{apply, BulkRun, ItemKey, RunEvent};

/// Shared handle on one run's state. Every mutation goes through the reducer.
pub struct RunStore<T> {
    inner: Arc<Mutex<BulkRun<T>>>,
}

impl<T> Clone for RunStore<T> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<T> RunStore<T> {
    pub fn new(run: BulkRun<T>) -> Self {
        Self {
            inner: Arc::new(Mutex::new(run)),
        }
    }

    fn lock(&self) -> MutexGuard<'_, BulkRun<T>> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn apply(&self, ev: RunEvent) {
        apply(&mut self.lock(), ev);
    }

    /// Marks the item as started and reports whether it is now in flight.
    /// Returns false when the item was already canceled or finished.
    pub fn begin(&self, key: &ItemKey) -> bool {
        let mut guard = self.lock();
        apply(&mut guard, RunEvent::ItemStarted { key: key.clone() });
        guard.outcome(key).is_some_and(|o| o.is_in_flight())
    }

    /// Records a cancellation request. Returns true only for the first request.
    pub fn request_cancel(&self) -> bool {
        let mut guard = self.lock();
        if guard.cancel_requested || guard.is_finished() {
            return false;
        }
        apply(&mut guard, RunEvent::CancelRequested);
        true
    }

    pub fn with_state<R>(&self, f: impl FnOnce(&BulkRun<T>) -> R) -> R {
        f(&self.lock())
    }
}

impl<T: Clone> RunStore<T> {
    pub fn state(&self) -> BulkRun<T> {
        self.lock().clone()
    }
}
