//! Typed dependency providers.
//!
//! A [`Provider`] publishes one ambient [`Context`] value per request. It
//! may depend on other contexts, which are acquired first. The dependency
//! graph is resolved into a linear order once, when the [`ProviderSet`] is
//! built; every dispatch then acquires in that order into a
//! [`ResourceStack`] and releases in reverse.

use std::any::Any;
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::future::Future;
use std::sync::Arc;

use futures::FutureExt;

use crate::BoxFuture;
use crate::context::{self, Context, ContextError, ContextId};
use crate::error::PageError;
use crate::exec::offload;

/// Teardown for an acquired value.
pub trait Release: Send {
    /// Release the resource.
    fn release(self: Box<Self>) -> BoxFuture<()>;
}

impl<F, Fut> Release for F
where
    F: FnOnce() -> Fut + Send + 'static,
    Fut: Future<Output = ()> + Send + 'static,
{
    fn release(self: Box<Self>) -> BoxFuture<()> {
        (*self)().boxed()
    }
}

/// Value produced by a provider, with optional teardown.
pub struct Provided<T> {
    value: T,
    release: Option<Box<dyn Release>>,
}

impl<T> Provided<T> {
    /// Value without teardown.
    pub fn value(value: T) -> Self {
        Self {
            value,
            release: None,
        }
    }

    /// Value released when the request finishes.
    pub fn with_release(value: T, release: impl Release + 'static) -> Self {
        Self {
            value,
            release: Some(Box::new(release)),
        }
    }
}

/// Provider resolution or acquisition failure.
#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    #[error("context `{0}` has more than one provider")]
    DuplicateProvider(ContextId),

    #[error("provider for `{provider}` depends on `{dependency}`, which has no provider")]
    UnknownDependency {
        provider: ContextId,
        dependency: ContextId,
    },

    #[error("provider dependency cycle among: {}", format_ids(.0))]
    Cycle(Vec<ContextId>),

    #[error("failed to acquire `{context}`: {source}")]
    Acquire {
        context: ContextId,
        source: Box<PageError>,
    },
}

fn format_ids(ids: &[ContextId]) -> String {
    ids.iter()
        .copied()
        .map(ContextId::name)
        .collect::<Vec<_>>()
        .join(", ")
}

type Acquired = (Arc<dyn Any + Send + Sync>, Option<Box<dyn Release>>);
type AcquireFn = Arc<dyn Fn() -> BoxFuture<Result<Acquired, PageError>> + Send + Sync>;

/// Producer of one context value per request.
#[derive(Clone)]
pub struct Provider {
    context: ContextId,
    depends_on: Vec<ContextId>,
    acquire: AcquireFn,
}

impl Provider {
    /// Provider for `context`, acquired after every context in `depends_on`.
    ///
    /// `acquire` runs inside the request scope, so it can read the request
    /// and its dependencies through ambient lookups.
    pub fn new<T, F, Fut>(context: &Context<T>, depends_on: &[ContextId], acquire: F) -> Self
    where
        T: Any + Send + Sync,
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Provided<T>, PageError>> + Send + 'static,
    {
        let acquire: AcquireFn = Arc::new(move || {
            let fut = acquire();
            async move {
                let provided = fut.await?;
                let value: Arc<dyn Any + Send + Sync> = Arc::new(provided.value);
                Ok((value, provided.release))
            }
            .boxed()
        });

        Self {
            context: context.id(),
            depends_on: depends_on.to_vec(),
            acquire,
        }
    }

    /// Provider whose acquisition blocks. It runs on the blocking thread
    /// pool, still inside the request scope.
    pub fn blocking<T, F>(context: &Context<T>, depends_on: &[ContextId], acquire: F) -> Self
    where
        T: Any + Send + Sync,
        F: Fn() -> Result<Provided<T>, PageError> + Send + Sync + 'static,
    {
        let acquire = Arc::new(acquire);
        Self::new(context, depends_on, move || {
            let acquire = Arc::clone(&acquire);
            offload(move || acquire())
        })
    }

    /// Context this provider publishes.
    #[must_use]
    pub fn context(&self) -> ContextId {
        self.context
    }

    /// Contexts acquired before this one.
    #[must_use]
    pub fn depends_on(&self) -> &[ContextId] {
        &self.depends_on
    }
}

impl fmt::Debug for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Provider")
            .field("context", &self.context)
            .field("depends_on", &self.depends_on)
            .finish_non_exhaustive()
    }
}

/// Providers in resolved acquisition order.
#[derive(Clone, Debug, Default)]
pub struct ProviderSet {
    ordered: Vec<Provider>,
}

impl ProviderSet {
    /// Resolve acquisition order. Ties keep declaration order.
    pub fn new(providers: Vec<Provider>) -> Result<Self, ProviderError> {
        let mut seen = HashSet::new();
        for provider in &providers {
            if !seen.insert(provider.context) {
                return Err(ProviderError::DuplicateProvider(provider.context));
            }
        }
        for provider in &providers {
            if let Some(dependency) = provider.depends_on.iter().find(|d| !seen.contains(*d)) {
                return Err(ProviderError::UnknownDependency {
                    provider: provider.context,
                    dependency: *dependency,
                });
            }
        }

        let mut pending: HashMap<ContextId, usize> = providers
            .iter()
            .map(|p| (p.context, p.depends_on.len()))
            .collect();
        let mut remaining = providers;
        let mut ordered = Vec::with_capacity(remaining.len());

        while !remaining.is_empty() {
            let Some(index) = remaining
                .iter()
                .position(|p| pending.get(&p.context) == Some(&0))
            else {
                return Err(ProviderError::Cycle(
                    remaining.iter().map(|p| p.context).collect(),
                ));
            };

            let ready = remaining.remove(index);
            pending.remove(&ready.context);
            for provider in &remaining {
                let count = provider
                    .depends_on
                    .iter()
                    .filter(|d| **d == ready.context)
                    .count();
                if let Some(left) = pending.get_mut(&provider.context) {
                    *left -= count;
                }
            }
            ordered.push(ready);
        }

        Ok(Self { ordered })
    }

    /// Set without providers.
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    /// Number of providers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.ordered.len()
    }

    /// True when no providers are registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.ordered.is_empty()
    }

    /// Contexts in acquisition order.
    pub fn order(&self) -> impl Iterator<Item = ContextId> + '_ {
        self.ordered.iter().map(|p| p.context)
    }

    /// Acquire every provider into the current request scope.
    ///
    /// If an acquisition fails, everything acquired so far is released
    /// before the error is returned.
    pub async fn provide_all(&self) -> Result<ResourceStack, PageError> {
        let scope = context::current_scope().ok_or(ContextError::NoActiveScope)?;
        let mut stack = ResourceStack::new();

        for provider in &self.ordered {
            match (provider.acquire)().await {
                Ok((value, release)) => {
                    scope.insert(provider.context, value);
                    stack.push(provider.context, release);
                    tracing::debug!(context = %provider.context, "Acquired provider");
                }
                Err(err) => {
                    stack.release().await;
                    return Err(ProviderError::Acquire {
                        context: provider.context,
                        source: Box::new(err),
                    }
                    .into());
                }
            }
        }

        Ok(stack)
    }
}

/// Resources acquired for one request.
///
/// Released in reverse acquisition order by [`ResourceStack::release`]. A
/// stack dropped without an explicit release (cancelled request) spawns the
/// same release on the current runtime. Teardown runs as its own task in
/// both cases, so cancelling the caller never cuts it short.
#[derive(Default)]
pub struct ResourceStack {
    entries: Entries,
}

impl ResourceStack {
    /// Empty stack.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an acquired context.
    pub fn push(&mut self, context: ContextId, release: Option<Box<dyn Release>>) {
        self.entries.push((context, release));
    }

    /// Number of acquired contexts.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True when nothing was acquired.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Release in reverse acquisition order.
    ///
    /// Dropping the returned future does not stop the release.
    pub async fn release(mut self) {
        let entries = std::mem::take(&mut self.entries);
        if entries.is_empty() {
            return;
        }
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                if let Err(err) = handle.spawn(release_in_scope(entries)).await {
                    tracing::error!(error = %err, "Provider release task failed");
                }
            }
            Err(_) => release_entries(entries).await,
        }
    }
}

type Entries = Vec<(ContextId, Option<Box<dyn Release>>)>;

/// Release task carrying the caller's request scope, if any.
fn release_in_scope(entries: Entries) -> impl Future<Output = ()> + Send + 'static {
    let scope = context::current_scope();
    async move {
        match scope {
            Some(scope) => context::bind(scope, release_entries(entries)).await,
            None => release_entries(entries).await,
        }
    }
}

async fn release_entries(entries: Entries) {
    for (context, release) in entries.into_iter().rev() {
        if let Some(release) = release {
            release.release().await;
            tracing::debug!(context = %context, "Released provider");
        }
    }
}

impl Drop for ResourceStack {
    fn drop(&mut self) {
        if self.entries.is_empty() {
            return;
        }
        let entries = std::mem::take(&mut self.entries);
        tracing::debug!(count = entries.len(), "Releasing abandoned resources");
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                handle.spawn(release_in_scope(entries));
            }
            Err(_) => futures::executor::block_on(release_entries(entries)),
        }
    }
}

impl fmt::Debug for ResourceStack {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list()
            .entries(self.entries.iter().map(|(context, _)| context))
            .finish()
    }
}
