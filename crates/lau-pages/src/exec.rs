//! Offloading of blocking hooks.
//!
//! Hooks declared with a `blocking` constructor run on the blocking thread
//! pool so they never stall other in-flight requests on the same worker.
//! The request scope of the calling task is re-entered on the blocking
//! thread, so ambient lookups keep working.

use futures::FutureExt;

use crate::BoxFuture;
use crate::context;
use crate::error::PageError;

/// Run `f` on the blocking pool inside the caller's request scope.
pub(crate) fn offload<F, T>(f: F) -> BoxFuture<Result<T, PageError>>
where
    F: FnOnce() -> Result<T, PageError> + Send + 'static,
    T: Send + 'static,
{
    let scope = context::current_scope();
    async move {
        tokio::task::spawn_blocking(move || match scope {
            Some(scope) => context::enter_blocking(scope, f),
            None => f(),
        })
        .await?
    }
    .boxed()
}
