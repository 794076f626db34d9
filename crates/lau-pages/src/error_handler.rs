//! Custom pages for HTTP error statuses.

use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::sync::Arc;

use axum::http::StatusCode;
use axum::response::Response;
use futures::FutureExt;

use crate::BoxFuture;
use crate::context::{self, Context, ContextError, RequestScope};
use crate::contract::{ContractError, check_return_type};
use crate::element::{PageOutput, PageReturn};
use crate::error::PageError;
use crate::exec::offload;
use crate::request::PageRequest;
use crate::signature::TypeTag;

/// The error being rendered.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct HttpErrorInfo {
    pub status: StatusCode,
    pub message: String,
}

impl HttpErrorInfo {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    /// Describe a failed hook. Only HTTP errors expose their message.
    #[must_use]
    pub fn from_error(error: &PageError) -> Self {
        let status = error.status();
        let message = match error {
            PageError::Http { message, .. } => message.clone(),
            _ => status.canonical_reason().unwrap_or("Error").to_owned(),
        };
        Self { status, message }
    }
}

/// Ambient key the error is bound under while a handler renders.
pub static ERROR_CONTEXT: Context<HttpErrorInfo> = Context::new("error");

/// The error currently being rendered.
pub fn use_error() -> Result<Arc<HttpErrorInfo>, ContextError> {
    ERROR_CONTEXT.current()
}

/// Type-erased error handler.
pub type ErrorFn = Arc<dyn Fn() -> BoxFuture<Result<PageOutput, PageError>> + Send + Sync>;

/// Renders the page for one error status.
#[derive(Clone)]
pub struct ErrorHandler {
    handler: ErrorFn,
    returns: TypeTag,
}

impl ErrorHandler {
    pub fn new<F, Fut, R>(handler: F) -> Self
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<R, PageError>> + Send + 'static,
        R: PageReturn,
    {
        let handler: ErrorFn = Arc::new(move || {
            let fut = handler();
            async move { fut.await.map(Into::<PageOutput>::into) }.boxed()
        });
        Self::from_parts(handler, TypeTag::of::<R>())
    }

    pub fn blocking<F, R>(handler: F) -> Self
    where
        F: Fn() -> Result<R, PageError> + Send + Sync + 'static,
        R: PageReturn,
    {
        let handler = Arc::new(handler);
        let handler: ErrorFn = Arc::new(move || {
            let handler = Arc::clone(&handler);
            offload(move || handler().map(Into::<PageOutput>::into))
        });
        Self::from_parts(handler, TypeTag::of::<R>())
    }

    /// Handler with an explicitly declared return type.
    pub fn from_parts(handler: ErrorFn, returns: TypeTag) -> Self {
        Self { handler, returns }
    }
}

impl fmt::Debug for ErrorHandler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ErrorHandler")
            .field("returns", &self.returns.name())
            .finish_non_exhaustive()
    }
}

/// Error handlers keyed by status.
#[derive(Clone, Debug, Default)]
pub struct ErrorHandlerRegistry {
    handlers: HashMap<StatusCode, ErrorHandler>,
}

impl ErrorHandlerRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register the handler for a 4xx or 5xx status.
    pub fn register(mut self, status: u16, handler: ErrorHandler) -> Result<Self, ContractError> {
        let code = StatusCode::from_u16(status)
            .ok()
            .filter(|code| code.is_client_error() || code.is_server_error())
            .ok_or(ContractError::InvalidErrorStatus { status })?;
        check_return_type(&format!("error handler {status}"), handler.returns)?;

        self.handlers.insert(code, handler);
        Ok(self)
    }

    #[must_use]
    pub fn contains(&self, status: StatusCode) -> bool {
        self.handlers.contains_key(&status)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }

    /// Render the registered page for `error`, or `None` if the status has
    /// no handler. The response always carries the error status.
    pub async fn render(
        &self,
        request: PageRequest,
        error: HttpErrorInfo,
    ) -> Option<Result<Response, PageError>> {
        let handler = self.handlers.get(&error.status)?;
        let status = error.status;

        let scope = RequestScope::new(Arc::new(request)).with_value(&ERROR_CONTEXT, error);
        let result = context::bind(Arc::new(scope), async { (handler.handler)().await }).await;

        Some(result.map(|output| {
            let mut response = output.into_response();
            *response.status_mut() = status;
            response
        }))
    }
}

#[cfg(test)]
mod tests {
    use axum::body::to_bytes;
    use axum::http::Method;
    use axum::response::IntoResponse;
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::context::use_request;
    use crate::element::Element;

    fn not_found_page() -> ErrorHandler {
        ErrorHandler::new(|| async {
            let error = use_error()?;
            let request = use_request()?;
            Ok::<_, PageError>(
                Element::new("h1").text(format!("{} at {}", error.message, request.path())),
            )
        })
    }

    fn get(path: &str) -> PageRequest {
        PageRequest::new(Method::GET, path.parse().unwrap())
    }

    #[test]
    fn test_info_from_errors() {
        let info = HttpErrorInfo::from_error(&PageError::not_found("no such user"));
        assert_eq!(info, HttpErrorInfo::new(StatusCode::NOT_FOUND, "no such user"));

        let info = HttpErrorInfo::from_error(&PageError::handler("secret detail"));
        assert_eq!(
            info,
            HttpErrorInfo::new(StatusCode::INTERNAL_SERVER_ERROR, "Internal Server Error")
        );
    }

    #[test]
    fn test_register_rejects_non_error_status() {
        let err = ErrorHandlerRegistry::new()
            .register(200, not_found_page())
            .unwrap_err();
        assert_eq!(err, ContractError::InvalidErrorStatus { status: 200 });

        let err = ErrorHandlerRegistry::new()
            .register(1000, not_found_page())
            .unwrap_err();
        assert_eq!(err, ContractError::InvalidErrorStatus { status: 1000 });
    }

    #[test]
    fn test_register_rejects_invalid_return_type() {
        let handler = ErrorHandler::from_parts(
            Arc::new(|| {
                futures::future::ready(Ok::<_, PageError>(PageOutput::Element(Element::new("p"))))
                    .boxed()
            }),
            TypeTag::of::<u32>(),
        );
        let err = ErrorHandlerRegistry::new()
            .register(404, handler)
            .unwrap_err();
        assert!(matches!(
            err,
            ContractError::InvalidReturnType { ref module, .. } if module == "error handler 404"
        ));
    }

    #[tokio::test]
    async fn test_render_binds_error_and_request() {
        let registry = ErrorHandlerRegistry::new()
            .register(404, not_found_page())
            .unwrap();

        let response = registry
            .render(
                get("/missing"),
                HttpErrorInfo::new(StatusCode::NOT_FOUND, "Not Found"),
            )
            .await
            .unwrap()
            .unwrap();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert_eq!(&body[..], b"<h1>Not Found at /missing</h1>");
    }

    #[tokio::test]
    async fn test_render_forces_status_on_raw_response() {
        let registry = ErrorHandlerRegistry::new()
            .register(
                500,
                ErrorHandler::new(|| async { Ok("oops".into_response()) }),
            )
            .unwrap();

        let response = registry
            .render(
                get("/"),
                HttpErrorInfo::new(StatusCode::INTERNAL_SERVER_ERROR, "boom"),
            )
            .await
            .unwrap()
            .unwrap();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[tokio::test]
    async fn test_render_without_handler() {
        let registry = ErrorHandlerRegistry::new();
        let rendered = registry
            .render(get("/"), HttpErrorInfo::new(StatusCode::NOT_FOUND, "x"))
            .await;
        assert!(rendered.is_none());
        assert!(!registry.contains(StatusCode::NOT_FOUND));
    }
}
