//! Ambient request scope.
//!
//! Each dispatch binds a [`RequestScope`] in task-local storage for the
//! lifetime of that dispatch only. Concurrent requests run in separate tasks
//! and never observe each other's scope. Providers publish values into the
//! scope under a [`Context`] key; pages read them back with
//! [`Context::current`].

use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::marker::PhantomData;
use std::sync::{Arc, PoisonError, RwLock};

use crate::request::PageRequest;

tokio::task_local! {
    static REQUEST_SCOPE: Arc<RequestScope>;
}

/// Name of an ambient context value.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ContextId(&'static str);

impl ContextId {
    /// Context name.
    #[must_use]
    pub fn name(self) -> &'static str {
        self.0
    }
}

impl fmt::Display for ContextId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.0)
    }
}

/// Ambient lookup failure.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ContextError {
    /// Called outside of a dispatch.
    #[error("no request scope is active on the current task")]
    NoActiveScope,
    /// Nothing was provided under this context.
    #[error("context `{0}` has no value in the current request scope")]
    Missing(ContextId),
    /// A value of another type was provided under this context.
    #[error("context `{0}` holds a value of a different type")]
    TypeMismatch(ContextId),
}

/// Per-request state bound while a dispatch runs.
pub struct RequestScope {
    request: Arc<PageRequest>,
    values: RwLock<HashMap<ContextId, Arc<dyn Any + Send + Sync>>>,
}

impl RequestScope {
    /// Scope for a request with no context values yet.
    #[must_use]
    pub fn new(request: Arc<PageRequest>) -> Self {
        Self {
            request,
            values: RwLock::new(HashMap::new()),
        }
    }

    /// Seed a context value before binding.
    #[must_use]
    pub fn with_value<T: Any + Send + Sync>(self, context: &Context<T>, value: T) -> Self {
        self.insert(context.id(), Arc::new(value));
        self
    }

    /// The bound request.
    #[must_use]
    pub fn request(&self) -> &Arc<PageRequest> {
        &self.request
    }

    pub(crate) fn insert(&self, id: ContextId, value: Arc<dyn Any + Send + Sync>) {
        self.values
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(id, value);
    }

    pub(crate) fn remove(&self, id: ContextId) {
        self.values
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&id);
    }

    fn get(&self, id: ContextId) -> Option<Arc<dyn Any + Send + Sync>> {
        self.values
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&id)
            .cloned()
    }
}

/// Typed key for an ambient value.
///
/// ```
/// use lau_pages::Context;
///
/// struct Db;
/// static DB: Context<Db> = Context::new("db");
/// assert_eq!(DB.id().name(), "db");
/// ```
pub struct Context<T> {
    name: &'static str,
    _marker: PhantomData<fn() -> T>,
}

impl<T> Context<T> {
    /// Declare a context key.
    #[must_use]
    pub const fn new(name: &'static str) -> Self {
        Self {
            name,
            _marker: PhantomData,
        }
    }

    /// Key identifier.
    #[must_use]
    pub const fn id(&self) -> ContextId {
        ContextId(self.name)
    }
}

impl<T: Any + Send + Sync> Context<T> {
    /// Value provided for the current request.
    pub fn current(&self) -> Result<Arc<T>, ContextError> {
        let value = with_scope(|scope| scope.get(self.id()))?
            .ok_or(ContextError::Missing(self.id()))?;
        value
            .downcast::<T>()
            .map_err(|_| ContextError::TypeMismatch(self.id()))
    }

    /// Publish a value for the rest of the current request.
    pub fn provide(&self, value: T) -> Result<(), ContextError> {
        with_scope(|scope| scope.insert(self.id(), Arc::new(value)))
    }
}

impl<T> fmt::Debug for Context<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Context").field(&self.name).finish()
    }
}

/// The request bound to the current dispatch.
pub fn use_request() -> Result<Arc<PageRequest>, ContextError> {
    with_scope(|scope| Arc::clone(&scope.request))
}

/// Run `future` with `scope` bound. The binding ends when the future
/// completes or is dropped.
pub(crate) async fn bind<F: Future>(scope: Arc<RequestScope>, future: F) -> F::Output {
    REQUEST_SCOPE.scope(scope, future).await
}

/// Scope bound to the current task, if any.
pub(crate) fn current_scope() -> Option<Arc<RequestScope>> {
    REQUEST_SCOPE.try_with(Arc::clone).ok()
}

/// Run a synchronous closure with `scope` bound on the current thread.
pub(crate) fn enter_blocking<R>(scope: Arc<RequestScope>, f: impl FnOnce() -> R) -> R {
    REQUEST_SCOPE.sync_scope(scope, f)
}

fn with_scope<R>(f: impl FnOnce(&RequestScope) -> R) -> Result<R, ContextError> {
    REQUEST_SCOPE
        .try_with(|scope| f(scope.as_ref()))
        .map_err(|_| ContextError::NoActiveScope)
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use axum::http::Method;

    use super::*;

    static COUNTER: Context<u32> = Context::new("counter");
    static LABEL: Context<String> = Context::new("counter");

    fn scope_for(path: &str) -> Arc<RequestScope> {
        let request = PageRequest::new(Method::GET, path.parse().unwrap());
        Arc::new(RequestScope::new(Arc::new(request)))
    }

    #[test]
    fn test_use_request_outside_scope() {
        assert_eq!(use_request().unwrap_err(), ContextError::NoActiveScope);
    }

    #[tokio::test]
    async fn test_use_request_inside_scope() {
        let path = bind(scope_for("/about"), async { use_request().unwrap().path().to_owned() }).await;
        assert_eq!(path, "/about");
    }

    #[tokio::test]
    async fn test_binding_released_after_scope() {
        bind(scope_for("/about"), async {}).await;
        assert!(use_request().is_err());
    }

    #[tokio::test]
    async fn test_provide_and_read_context() {
        let value = bind(scope_for("/"), async {
            COUNTER.provide(7).unwrap();
            COUNTER.current().unwrap()
        })
        .await;
        assert_eq!(*value, 7);
    }

    #[tokio::test]
    async fn test_missing_and_mismatched_context() {
        bind(scope_for("/"), async {
            assert_eq!(
                COUNTER.current().unwrap_err(),
                ContextError::Missing(COUNTER.id())
            );
            COUNTER.provide(1).unwrap();
            assert_eq!(
                LABEL.current().unwrap_err(),
                ContextError::TypeMismatch(LABEL.id())
            );
        })
        .await;
    }

    #[tokio::test]
    async fn test_seeded_value() {
        let scope = RequestScope::new(Arc::new(PageRequest::new(
            Method::GET,
            "/".parse().unwrap(),
        )))
        .with_value(&COUNTER, 3);

        let value = bind(Arc::new(scope), async { COUNTER.current().unwrap() }).await;
        assert_eq!(*value, 3);
    }

    #[tokio::test]
    async fn test_concurrent_requests_are_isolated() {
        async fn observe(path: &'static str) -> Vec<String> {
            bind(scope_for(path), async {
                let mut seen = Vec::new();
                for _ in 0..5 {
                    seen.push(use_request().unwrap().path().to_owned());
                    tokio::time::sleep(Duration::from_millis(1)).await;
                }
                seen
            })
            .await
        }

        let (first, second) = tokio::join!(
            tokio::spawn(observe("/first")),
            tokio::spawn(observe("/second"))
        );
        assert!(first.unwrap().iter().all(|p| p == "/first"));
        assert!(second.unwrap().iter().all(|p| p == "/second"));

        let (a, b) = tokio::join!(observe("/a"), observe("/b"));
        assert!(a.iter().all(|p| p == "/a"));
        assert!(b.iter().all(|p| p == "/b"));
    }
}
