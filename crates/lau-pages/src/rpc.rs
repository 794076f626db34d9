//! Form submissions routed to server functions.
//!
//! A form built with [`form`] and an [`RpcFunction`] action posts to
//! `?lau-rpc=<ident>` on the current page. The host intercepts requests
//! carrying that query parameter and runs the matching function instead of
//! the page.

use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::sync::Arc;

use axum::response::Response;
use futures::FutureExt;
use md5::{Digest, Md5};

use crate::BoxFuture;
use crate::context::{self, RequestScope};
use crate::element::{Element, Node, PageOutput, PageReturn};
use crate::error::PageError;
use crate::exec::offload;
use crate::request::{FormData, PageRequest};

/// Query parameter carrying the RPC identifier.
pub const RPC_QUERY_PARAM: &str = "lau-rpc";

/// Identifier for a function name: hex MD5 of the name.
pub fn rpc_ident(name: &str) -> String {
    let mut hasher = Md5::new();
    hasher.update(name.as_bytes());
    hex::encode(hasher.finalize())
}

type RpcHandler = Arc<dyn Fn(FormData) -> BoxFuture<Result<PageOutput, PageError>> + Send + Sync>;

/// Named handler for form submissions.
#[derive(Clone)]
pub struct RpcFunction {
    name: String,
    ident: String,
    handler: RpcHandler,
}

impl RpcFunction {
    /// Async handler. Prefer the [`rpc!`](crate::rpc) macro, which names the
    /// function after its module path.
    pub fn new<F, Fut, R>(name: impl Into<String>, handler: F) -> Self
    where
        F: Fn(FormData) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<R, PageError>> + Send + 'static,
        R: PageReturn,
    {
        let handler: RpcHandler = Arc::new(move |form: FormData| {
            let fut = handler(form);
            async move { fut.await.map(Into::<PageOutput>::into) }.boxed()
        });
        Self::with_handler(name.into(), handler)
    }

    /// Blocking handler, run on the blocking pool.
    pub fn blocking<F, R>(name: impl Into<String>, handler: F) -> Self
    where
        F: Fn(FormData) -> Result<R, PageError> + Send + Sync + 'static,
        R: PageReturn,
    {
        let handler = Arc::new(handler);
        let handler: RpcHandler = Arc::new(move |form: FormData| {
            let handler = Arc::clone(&handler);
            offload(move || handler(form).map(Into::<PageOutput>::into))
        });
        Self::with_handler(name.into(), handler)
    }

    fn with_handler(name: String, handler: RpcHandler) -> Self {
        Self {
            ident: rpc_ident(&name),
            name,
            handler,
        }
    }

    /// Qualified function name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Identifier sent in the query string.
    #[must_use]
    pub fn ident(&self) -> &str {
        &self.ident
    }

    /// Relative form action, e.g. `?lau-rpc=5d41...`.
    #[must_use]
    pub fn endpoint(&self) -> String {
        format!("?{RPC_QUERY_PARAM}={}", self.ident)
    }

    /// Run the handler on the request's form body inside its request scope.
    pub async fn invoke(&self, request: PageRequest) -> Result<Response, PageError> {
        let form = request.form();
        let scope = Arc::new(RequestScope::new(Arc::new(request)));
        let output = context::bind(scope, async { (self.handler)(form).await }).await?;
        Ok(output.into_response())
    }
}

impl fmt::Debug for RpcFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RpcFunction")
            .field("name", &self.name)
            .field("ident", &self.ident)
            .finish_non_exhaustive()
    }
}

/// Functions reachable through [`RPC_QUERY_PARAM`].
#[derive(Clone, Debug, Default)]
pub struct RpcRegistry {
    functions: HashMap<String, RpcFunction>,
}

impl RpcRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a function (builder form).
    #[must_use]
    pub fn register(mut self, function: RpcFunction) -> Self {
        self.add(function);
        self
    }

    /// Register a function. The first registration of a name wins.
    pub fn add(&mut self, function: RpcFunction) {
        self.functions
            .entry(function.ident.clone())
            .or_insert(function);
    }

    /// Look up by identifier.
    #[must_use]
    pub fn get(&self, ident: &str) -> Option<&RpcFunction> {
        self.functions.get(ident)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.functions.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.functions.is_empty()
    }
}

/// Target of a form submission.
#[derive(Clone, Debug)]
pub enum FormAction {
    /// Server function.
    Rpc(RpcFunction),
    /// Plain URL.
    Url(String),
}

impl FormAction {
    fn href(&self) -> String {
        match self {
            Self::Rpc(function) => function.endpoint(),
            Self::Url(url) => url.clone(),
        }
    }
}

impl From<RpcFunction> for FormAction {
    fn from(function: RpcFunction) -> Self {
        Self::Rpc(function)
    }
}

impl From<&RpcFunction> for FormAction {
    fn from(function: &RpcFunction) -> Self {
        Self::Rpc(function.clone())
    }
}

impl From<&str> for FormAction {
    fn from(url: &str) -> Self {
        Self::Url(url.to_owned())
    }
}

impl From<String> for FormAction {
    fn from(url: String) -> Self {
        Self::Url(url)
    }
}

/// `<form method="post">` posting to `action`.
pub fn form<I, N>(action: impl Into<FormAction>, children: I) -> Element
where
    I: IntoIterator<Item = N>,
    N: Into<Node>,
{
    Element::new("form")
        .attr("method", "post")
        .attr("action", action.into().href())
        .children(children)
}

#[cfg(test)]
mod tests {
    use axum::body::{Bytes, to_bytes};
    use axum::http::{Method, StatusCode};
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::context::use_request;

    async fn greet(form: FormData) -> Result<Element, PageError> {
        let name = form.get("name").unwrap_or("stranger").to_owned();
        Ok(Element::new("p").text(format!("Hello {name}")))
    }

    #[test]
    fn test_ident_is_md5_hex() {
        assert_eq!(rpc_ident("hello"), "5d41402abc4b2a76b9719d911017c592");
    }

    #[test]
    fn test_macro_names_function_after_module() {
        let function = crate::rpc!(greet);
        assert_eq!(function.name(), "lau_pages::rpc::tests::greet");
        assert_eq!(function.ident(), rpc_ident("lau_pages::rpc::tests::greet"));
        assert_eq!(function.endpoint(), format!("?lau-rpc={}", function.ident()));
    }

    #[test]
    fn test_form_action_from_function() {
        let function = RpcFunction::new("demo::submit", greet);
        let element = form(&function, [Element::new("button").text("Send")]);

        assert_eq!(
            element.get_attr("action"),
            Some(format!("?lau-rpc={}", rpc_ident("demo::submit")).as_str())
        );
        assert_eq!(element.get_attr("method"), Some("post"));
    }

    #[test]
    fn test_form_action_from_url() {
        let element = form("/search", Vec::<Node>::new());
        assert_eq!(element.to_string(), r#"<form method="post" action="/search"></form>"#);
    }

    #[test]
    fn test_registry_lookup() {
        let function = RpcFunction::new("demo::submit", greet);
        let ident = function.ident().to_owned();
        let registry = RpcRegistry::new()
            .register(function.clone())
            .register(function);

        assert_eq!(registry.len(), 1);
        assert!(registry.get(&ident).is_some());
        assert!(registry.get("unknown").is_none());
    }

    #[tokio::test]
    async fn test_invoke_parses_form() {
        let function = RpcFunction::new("demo::submit", greet);
        let request = PageRequest::new(Method::POST, "/form".parse().unwrap())
            .with_body(Bytes::from_static(b"name=Ren"));

        let response = function.invoke(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert_eq!(&body[..], b"<p>Hello Ren</p>");
    }

    #[tokio::test]
    async fn test_blocking_handler_sees_request() {
        let function = RpcFunction::blocking("demo::path", |_form| {
            Ok(Element::new("p").text(use_request()?.path().to_owned()))
        });
        let request = PageRequest::new(Method::POST, "/form?lau-rpc=x".parse().unwrap());

        let response = function.invoke(request).await.unwrap();
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert_eq!(&body[..], b"<p>/form</p>");
    }
}
