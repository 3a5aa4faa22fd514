use std::future::Future;
use std::sync::Arc;

use bulkops_core::ActionError;
use serde_json::Value;
use tokio_util::sync::CancellationToken;

/// The side-effecting call applied to each selected item.
///
/// The executor invokes it at most once per item and never retries. The
/// signal is the run's cancellation token; implementations may observe it to
/// abort their own request.
#[async_trait::async_trait]
pub trait ItemAction<T: Send + 'static>: Send + Sync {
    async fn execute(&self, item: T, signal: CancellationToken) -> Result<Value, ActionError>;
}

pub struct FnAction<F> {
    f: F,
}

/// Adapts a closure returning a future into an [`ItemAction`].
pub fn action_fn<T, F, Fut>(f: F) -> FnAction<F>
where
    T: Send + 'static,
    F: Fn(T, CancellationToken) -> Fut + Send + Sync,
    Fut: Future<Output = Result<Value, ActionError>> + Send,
{
    FnAction { f }
}

#[async_trait::async_trait]
impl<T, F, Fut> ItemAction<T> for FnAction<F>
where
    T: Send + 'static,
    F: Fn(T, CancellationToken) -> Fut + Send + Sync,
    Fut: Future<Output = Result<Value, ActionError>> + Send,
{
    async fn execute(&self, item: T, signal: CancellationToken) -> Result<Value, ActionError> {
        (self.f)(item, signal).await
    }
}

#[async_trait::async_trait]
impl<T, A> ItemAction<T> for Arc<A>
where
    T: Send + 'static,
    A: ItemAction<T> + ?Sized,
{
    async fn execute(&self, item: T, signal: CancellationToken) -> Result<Value, ActionError> {
        (**self).execute(item, signal).await
    }
}
