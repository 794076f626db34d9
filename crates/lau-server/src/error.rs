//! Error types for the HTTP server.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use lau_pages::{ContractError, DispatchError, ProviderError};

/// Server error type.
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    /// A page, layout or error handler breaks its contract.
    #[error("Invalid application: {0}")]
    Contract(#[from] ContractError),

    /// The provider graph is invalid.
    #[error("Invalid providers: {0}")]
    Provider(#[from] ProviderError),

    /// A route declares a method the router cannot match.
    #[error("Unsupported method {method} on route {pattern}")]
    UnsupportedMethod { pattern: String, method: String },

    /// Request body could not be read.
    #[error("Invalid request body: {0}")]
    Body(String),

    /// Page pipeline failure.
    #[error(transparent)]
    Dispatch(#[from] DispatchError),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl ServerError {
    /// Status code answered for this error.
    #[must_use]
    pub fn status(&self) -> StatusCode {
        match self {
            Self::Body(_) => StatusCode::BAD_REQUEST,
            Self::Dispatch(e) => e.status(),
            Self::Contract(_) | Self::Provider(_) | Self::UnsupportedMethod { .. } | Self::Io(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = match &self {
            Self::Body(message) => format!("Bad Request: {message}"),
            _ => status.canonical_reason().unwrap_or("Error").to_string(),
        };
        (status, body).into_response()
    }
}
