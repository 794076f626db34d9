//! Error responses.
//!
//! Failures are answered by the registered error page for their status, or
//! by a plain-text status response when none is registered or the error
//! page itself fails.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use lau_pages::{HttpErrorInfo, PageError, PageRequest};

use crate::state::AppState;

/// Render the response for a failed request.
pub(crate) async fn error_response(
    state: &AppState,
    request: PageRequest,
    error: &PageError,
) -> Response {
    let mut info = HttpErrorInfo::from_error(error);
    if state.settings.debug && !matches!(error, PageError::Http { .. }) {
        info.message = error.to_string();
    }
    status_response(state, request, info).await
}

/// Render the response for a bare status, e.g. an unmatched path.
pub(crate) async fn status_response(
    state: &AppState,
    request: PageRequest,
    info: HttpErrorInfo,
) -> Response {
    let request_id = request.request_id().to_string();
    match state.error_handlers.render(request, info.clone()).await {
        Some(Ok(response)) => response,
        Some(Err(e)) => {
            tracing::error!(
                request_id = %request_id,
                status = info.status.as_u16(),
                error = %e,
                "Error page failed"
            );
            plain(info)
        }
        None => plain(info),
    }
}

fn plain(info: HttpErrorInfo) -> Response {
    (info.status, info.message).into_response()
}

/// Info for a status with its canonical reason as the message.
pub(crate) fn canonical(status: StatusCode) -> HttpErrorInfo {
    HttpErrorInfo::new(status, status.canonical_reason().unwrap_or("Error"))
}
