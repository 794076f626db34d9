//! Page route handlers.

use std::sync::Arc;

use axum::extract::{Request, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use lau_pages::{PathParams, RouteDescriptor};

use super::errors::{canonical, error_response, status_response};
use super::page_request;
use crate::state::AppState;

/// Serve one matched page route.
pub(crate) async fn serve_page(
    state: Arc<AppState>,
    route: RouteDescriptor,
    path_params: PathParams,
    request: Request,
) -> Response {
    let request = match page_request(&state.settings, request, path_params).await {
        Ok(request) => request,
        Err(e) => return e.into_response(),
    };

    let snapshot = request.clone();
    match state.dispatcher.dispatch(&route, request).await {
        Ok(response) => response,
        Err(e) => {
            let status = e.status();
            if status.is_server_error() {
                tracing::error!(
                    route = route.pattern(),
                    request_id = snapshot.request_id(),
                    stage = %e.stage,
                    error = %e.source,
                    "Page failed"
                );
            } else {
                tracing::debug!(
                    route = route.pattern(),
                    status = status.as_u16(),
                    "Page answered with error status"
                );
            }
            error_response(&state, snapshot, &e.source).await
        }
    }
}

/// Fallback for paths no route matches.
pub(crate) async fn not_found(State(state): State<Arc<AppState>>, request: Request) -> Response {
    answer_status(&state, request, StatusCode::NOT_FOUND).await
}

/// Fallback for a matched path with an undeclared method.
pub(crate) async fn method_not_allowed(
    State(state): State<Arc<AppState>>,
    request: Request,
) -> Response {
    answer_status(&state, request, StatusCode::METHOD_NOT_ALLOWED).await
}

async fn answer_status(state: &AppState, request: Request, status: StatusCode) -> Response {
    match page_request(&state.settings, request, PathParams::new()).await {
        Ok(request) => status_response(state, request, canonical(status)).await,
        Err(e) => e.into_response(),
    }
}
