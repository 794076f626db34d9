//! Application state.
//!
//! Shared state for all request handlers.

use std::sync::Arc;

use lau_pages::{Dispatcher, ErrorHandlerRegistry, RouteTable, RpcRegistry};

/// Application state shared across all handlers.
pub(crate) struct AppState {
    /// Validated routes in match order.
    pub(crate) routes: Arc<RouteTable>,
    /// Per-request page pipeline.
    pub(crate) dispatcher: Dispatcher,
    /// Server functions by identifier.
    pub(crate) rpc: RpcRegistry,
    /// Pages rendered for error statuses.
    pub(crate) error_handlers: ErrorHandlerRegistry,
    /// Request construction settings.
    pub(crate) settings: RequestSettings,
}

/// How inbound requests are turned into page requests.
#[derive(Clone, Debug, Default)]
pub(crate) struct RequestSettings {
    /// Mount prefix reported to pages.
    pub(crate) root_path: String,
    /// Trust `X-Forwarded-*` headers.
    pub(crate) proxy_headers: bool,
    /// Include error details in default error responses.
    pub(crate) debug: bool,
}
