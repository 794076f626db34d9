//! Errors raised by page hooks during a request.

use axum::http::StatusCode;

use crate::context::ContextError;
use crate::provider::ProviderError;

/// Error returned from SSR props, providers, pages, layouts and RPC handlers.
#[derive(Debug, thiserror::Error)]
pub enum PageError {
    /// HTTP error with an explicit status (e.g. not found).
    #[error("{status}: {message}")]
    Http {
        /// Response status.
        status: StatusCode,
        /// Human-readable detail.
        message: String,
    },

    /// Props value did not have the type the hook declared.
    #[error("props are not of type {expected}")]
    PropsType {
        /// Declared props type name.
        expected: &'static str,
    },

    /// Ambient context lookup failed.
    #[error(transparent)]
    Context(#[from] ContextError),

    /// Provider acquisition failed.
    #[error(transparent)]
    Provider(#[from] ProviderError),

    /// Offloaded blocking hook panicked or was cancelled.
    #[error("blocking task failed: {0}")]
    Join(#[from] tokio::task::JoinError),

    /// Application error raised by a hook.
    #[error("{0}")]
    Handler(Box<dyn std::error::Error + Send + Sync>),
}

impl PageError {
    /// HTTP error with the given status and message.
    pub fn http(status: StatusCode, message: impl Into<String>) -> Self {
        Self::Http {
            status,
            message: message.into(),
        }
    }

    /// 404 Not Found.
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::http(StatusCode::NOT_FOUND, message)
    }

    /// Wrap an application error.
    pub fn handler(err: impl Into<Box<dyn std::error::Error + Send + Sync>>) -> Self {
        Self::Handler(err.into())
    }

    /// Status code the host should answer with.
    #[must_use]
    pub fn status(&self) -> StatusCode {
        match self {
            Self::Http { status, .. } => *status,
            Self::Provider(ProviderError::Acquire { source, .. }) => source.status(),
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}
