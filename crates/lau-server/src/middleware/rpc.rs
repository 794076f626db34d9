//! Form submissions to server functions.
//!
//! A request whose query string carries a known `lau-rpc` identifier is
//! answered by that server function instead of the route it targets. Unknown
//! or missing identifiers pass through untouched.

use std::sync::Arc;

use axum::extract::{Request, State};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use lau_pages::{PageRequest, PathParams, RPC_QUERY_PARAM, RpcFunction};

use crate::handlers::errors::error_response;
use crate::handlers::page_request;
use crate::state::AppState;

/// Intercept requests addressed to a server function.
pub(crate) async fn form_rpc(
    State(state): State<Arc<AppState>>,
    request: Request,
    next: Next,
) -> Response {
    let Some(function) = target(&state, &request) else {
        return next.run(request).await;
    };

    let request = match page_request(&state.settings, request, PathParams::new()).await {
        Ok(request) => request,
        Err(e) => return e.into_response(),
    };

    tracing::debug!(
        function = function.name(),
        request_id = request.request_id(),
        "Invoking server function"
    );

    let snapshot = request.clone();
    match function.invoke(request).await {
        Ok(response) => response,
        Err(e) => {
            if e.status().is_server_error() {
                tracing::error!(function = function.name(), error = %e, "Server function failed");
            }
            error_response(&state, snapshot, &e).await
        }
    }
}

/// Server function named by the request's query string, if registered.
fn target(state: &AppState, request: &Request) -> Option<RpcFunction> {
    request.uri().query()?;
    let ident = PageRequest::new(request.method().clone(), request.uri().clone())
        .query_param(RPC_QUERY_PARAM)?;
    state.rpc.get(&ident).cloned()
}
