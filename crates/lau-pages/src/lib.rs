//! Page contracts, route table and request dispatch for Lau.
//!
//! This crate is the routing core. It provides:
//! - [`PageModule`]: a declared page (entry point plus optional hooks)
//! - [`PageRegistry`]: the registration table keyed by module path
//! - [`RouteTable`]: validated, ordered route descriptors
//! - [`Dispatcher`]: the per-request pipeline (props, context, providers,
//!   page, layout, response)
//!
//! # Quick Start
//!
//! ```no_run
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! use std::sync::Arc;
//! use lau_pages::{
//!     Dispatcher, Element, PageEntry, PageError, PageModule, PageRegistry, PageRequest,
//!     ProviderSet, RouteTable,
//! };
//!
//! let registry = PageRegistry::new().register(
//!     "pages/index",
//!     PageModule::new().page(PageEntry::new(|| async {
//!         Ok::<_, PageError>(Element::new("h1").text("Hello"))
//!     })),
//! );
//! let table = RouteTable::build(registry)?;
//! let dispatcher = Dispatcher::new(Arc::new(ProviderSet::empty()));
//!
//! let route = &table.routes()[0];
//! let request = PageRequest::new(axum::http::Method::GET, "/".parse()?);
//! let response = dispatcher.dispatch(route, request).await?;
//! # let _ = response;
//! # Ok(())
//! # }
//! ```
//!
//! # Pipeline
//!
//! ```text
//! PageRegistry ──validate──► RouteDescriptor* ──sort──► RouteTable
//!                                                         │
//!                         request ──► Dispatcher ◄────────┘
//!                                        │
//!                                        ├─► ssr props
//!                                        ├─► request scope (task-local)
//!                                        ├─► providers (ResourceStack)
//!                                        ├─► page ─► layout
//!                                        └─► Response
//! ```

mod context;
mod contract;
mod dispatch;
mod element;
mod entry;
mod error;
mod error_handler;
mod exec;
mod path;
mod props;
mod provider;
mod registry;
mod request;
mod rpc;
mod signature;
mod table;

pub use context::{Context, ContextError, ContextId, RequestScope, use_request};
pub use contract::ContractError;
pub use dispatch::{DispatchError, DispatchStage, Dispatcher};
pub use element::{Element, Node, PageOutput, PageReturn};
pub use entry::{
    LayoutEntry, LayoutFn, PageEntry, PageFn, SsrPropsEntry, SsrPropsFn, StaticPathsEntry,
};
pub use error::PageError;
pub use error_handler::{
    ERROR_CONTEXT, ErrorFn, ErrorHandler, ErrorHandlerRegistry, HttpErrorInfo, use_error,
};
pub use path::{
    PAGE_ROOT_DEPTH, PathParams, UrlError, has_parameters, parameter_names, params, route_pattern,
    url_for,
};
pub use props::Props;
pub use provider::{Provided, Provider, ProviderError, ProviderSet, Release, ResourceStack};
pub use registry::{ModulePath, PageModule, PageRegistry};
pub use request::{FormData, PageRequest};
pub use rpc::{FormAction, RPC_QUERY_PARAM, RpcFunction, RpcRegistry, form, rpc_ident};
pub use signature::{Arity, TypeTag};
pub use table::{RouteDescriptor, RouteTable, order_key};

/// Boxed future returned by type-erased page hooks.
pub type BoxFuture<T> = futures::future::BoxFuture<'static, T>;

/// Build an [`RpcFunction`] named after the handler's module path.
///
/// ```ignore
/// let submit = lau_pages::rpc!(on_submit);
/// ```
#[macro_export]
macro_rules! rpc {
    ($handler:path) => {
        $crate::RpcFunction::new(
            concat!(module_path!(), "::", stringify!($handler)),
            $handler,
        )
    };
}
