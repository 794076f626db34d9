//! Page module entry points.
//!
//! Every hook is stored type-erased together with the types it declared
//! (see [`TypeTag`]). Typed constructors derive those declarations from the
//! closure's generics; `from_parts` constructors take them explicitly, which
//! is the shape generated registration code uses.
//!
//! `new`/`with_props` constructors take async closures that are awaited on
//! the request task. `blocking` constructors take plain closures that are
//! offloaded to the blocking thread pool.

use std::any::Any;
use std::fmt;
use std::future::Future;
use std::sync::Arc;

use futures::FutureExt;

use crate::BoxFuture;
use crate::element::{Element, PageOutput, PageReturn};
use crate::error::PageError;
use crate::exec::offload;
use crate::path::PathParams;
use crate::props::Props;
use crate::request::PageRequest;
use crate::signature::{Arity, TypeTag};

/// Type-erased page entry point.
#[derive(Clone)]
pub enum PageFn {
    /// `page()`
    Nullary(Arc<dyn Fn() -> BoxFuture<Result<PageOutput, PageError>> + Send + Sync>),
    /// `page(props)`
    Unary(Arc<dyn Fn(Props) -> BoxFuture<Result<PageOutput, PageError>> + Send + Sync>),
}

/// The required page entry point of a module.
#[derive(Clone)]
pub struct PageEntry {
    handler: PageFn,
    props: Option<TypeTag>,
    returns: TypeTag,
    methods: Option<Vec<String>>,
}

impl PageEntry {
    /// Page without props.
    pub fn new<F, Fut, R>(page: F) -> Self
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<R, PageError>> + Send + 'static,
        R: PageReturn,
    {
        let handler = PageFn::Nullary(Arc::new(move || {
            let fut = page();
            async move { fut.await.map(Into::<PageOutput>::into) }.boxed()
        }));
        Self::from_parts(handler, None, TypeTag::of::<R>())
    }

    /// Page taking the props computed by the module's SSR props hook.
    pub fn with_props<P, F, Fut, R>(page: F) -> Self
    where
        P: Any + Send + Sync,
        F: Fn(Arc<P>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<R, PageError>> + Send + 'static,
        R: PageReturn,
    {
        let handler = PageFn::Unary(Arc::new(move |props: Props| {
            match props.downcast::<P>() {
                Ok(props) => {
                    let fut = page(props);
                    async move { fut.await.map(Into::<PageOutput>::into) }.boxed()
                }
                Err(err) => futures::future::ready(Err(err)).boxed(),
            }
        }));
        Self::from_parts(handler, Some(TypeTag::of::<P>()), TypeTag::of::<R>())
    }

    /// Blocking page without props.
    pub fn blocking<F, R>(page: F) -> Self
    where
        F: Fn() -> Result<R, PageError> + Send + Sync + 'static,
        R: PageReturn,
    {
        let page = Arc::new(page);
        let handler = PageFn::Nullary(Arc::new(move || {
            let page = Arc::clone(&page);
            offload(move || page().map(Into::<PageOutput>::into))
        }));
        Self::from_parts(handler, None, TypeTag::of::<R>())
    }

    /// Blocking page taking props.
    pub fn blocking_with_props<P, F, R>(page: F) -> Self
    where
        P: Any + Send + Sync,
        F: Fn(&P) -> Result<R, PageError> + Send + Sync + 'static,
        R: PageReturn,
    {
        let page = Arc::new(page);
        let handler = PageFn::Unary(Arc::new(move |props: Props| {
            let page = Arc::clone(&page);
            offload(move || {
                let props = props.downcast::<P>()?;
                page(&*props).map(Into::<PageOutput>::into)
            })
        }));
        Self::from_parts(handler, Some(TypeTag::of::<P>()), TypeTag::of::<R>())
    }

    /// Page with an explicitly declared signature.
    pub fn from_parts(handler: PageFn, props: Option<TypeTag>, returns: TypeTag) -> Self {
        Self {
            handler,
            props,
            returns,
            methods: None,
        }
    }

    /// Restrict the HTTP methods this page answers.
    #[must_use]
    pub fn methods<I, S>(mut self, methods: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.methods = Some(methods.into_iter().map(Into::into).collect());
        self
    }

    /// Declared number of arguments.
    #[must_use]
    pub fn arity(&self) -> Arity {
        match self.handler {
            PageFn::Nullary(_) => Arity::Nullary,
            PageFn::Unary(_) => Arity::Unary,
        }
    }

    /// Declared props type.
    #[must_use]
    pub fn props_type(&self) -> Option<TypeTag> {
        self.props
    }

    /// Declared return type.
    #[must_use]
    pub fn return_type(&self) -> TypeTag {
        self.returns
    }

    /// Declared method restriction.
    #[must_use]
    pub fn declared_methods(&self) -> Option<&[String]> {
        self.methods.as_deref()
    }

    /// Invoke with as many arguments as the page declares.
    pub(crate) fn call(&self, props: Props) -> BoxFuture<Result<PageOutput, PageError>> {
        match &self.handler {
            PageFn::Nullary(page) => page(),
            PageFn::Unary(page) => page(props),
        }
    }
}

impl fmt::Debug for PageEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PageEntry")
            .field("arity", &self.arity())
            .field("props", &TypeTag::describe(self.props))
            .field("returns", &self.returns.name())
            .field("methods", &self.methods)
            .finish()
    }
}

/// Type-erased SSR props hook.
pub type SsrPropsFn = Arc<dyn Fn(Arc<PageRequest>) -> BoxFuture<Result<Props, PageError>> + Send + Sync>;

/// Server-side props computation for a module.
#[derive(Clone)]
pub struct SsrPropsEntry {
    handler: SsrPropsFn,
    returns: Option<TypeTag>,
}

impl SsrPropsEntry {
    /// Async props hook returning `P`.
    pub fn new<P, F, Fut>(hook: F) -> Self
    where
        P: Any + Send + Sync,
        F: Fn(Arc<PageRequest>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<P, PageError>> + Send + 'static,
    {
        let handler: SsrPropsFn = Arc::new(move |request: Arc<PageRequest>| {
            let fut = hook(request);
            async move { fut.await.map(Props::new) }.boxed()
        });
        Self::from_parts(handler, Some(TypeTag::of::<P>()))
    }

    /// Blocking props hook returning `P`.
    pub fn blocking<P, F>(hook: F) -> Self
    where
        P: Any + Send + Sync,
        F: Fn(&PageRequest) -> Result<P, PageError> + Send + Sync + 'static,
    {
        let hook = Arc::new(hook);
        let handler: SsrPropsFn = Arc::new(move |request: Arc<PageRequest>| {
            let hook = Arc::clone(&hook);
            offload(move || hook(&*request).map(Props::new))
        });
        Self::from_parts(handler, Some(TypeTag::of::<P>()))
    }

    /// Props hook with an explicitly declared return type. `None` means the
    /// type could not be determined and fails validation.
    pub fn from_parts(handler: SsrPropsFn, returns: Option<TypeTag>) -> Self {
        Self { handler, returns }
    }

    /// Declared props type.
    #[must_use]
    pub fn return_type(&self) -> Option<TypeTag> {
        self.returns
    }

    pub(crate) fn call(&self, request: Arc<PageRequest>) -> BoxFuture<Result<Props, PageError>> {
        (self.handler)(request)
    }
}

impl fmt::Debug for SsrPropsEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SsrPropsEntry")
            .field("returns", &TypeTag::describe(self.returns))
            .finish_non_exhaustive()
    }
}

/// Type-erased layout hook.
pub type LayoutFn =
    Arc<dyn Fn(Props, Element) -> BoxFuture<Result<PageOutput, PageError>> + Send + Sync>;

/// Layout wrapping the rendered page element.
#[derive(Clone)]
pub struct LayoutEntry {
    handler: LayoutFn,
    props: Option<TypeTag>,
}

impl LayoutEntry {
    /// Layout for modules without props.
    pub fn new<F, Fut, R>(layout: F) -> Self
    where
        F: Fn(Element) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<R, PageError>> + Send + 'static,
        R: PageReturn,
    {
        let handler: LayoutFn = Arc::new(move |_props: Props, element: Element| {
            let fut = layout(element);
            async move { fut.await.map(Into::<PageOutput>::into) }.boxed()
        });
        Self::from_parts(handler, None)
    }

    /// Layout receiving the module's props.
    pub fn with_props<P, F, Fut, R>(layout: F) -> Self
    where
        P: Any + Send + Sync,
        F: Fn(Arc<P>, Element) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<R, PageError>> + Send + 'static,
        R: PageReturn,
    {
        let handler: LayoutFn = Arc::new(move |props: Props, element: Element| {
            match props.downcast::<P>() {
                Ok(props) => {
                    let fut = layout(props, element);
                    async move { fut.await.map(Into::<PageOutput>::into) }.boxed()
                }
                Err(err) => futures::future::ready(Err(err)).boxed(),
            }
        });
        Self::from_parts(handler, Some(TypeTag::of::<P>()))
    }

    /// Blocking layout for modules without props.
    pub fn blocking<F, R>(layout: F) -> Self
    where
        F: Fn(Element) -> Result<R, PageError> + Send + Sync + 'static,
        R: PageReturn,
    {
        let layout = Arc::new(layout);
        let handler: LayoutFn = Arc::new(move |_props: Props, element: Element| {
            let layout = Arc::clone(&layout);
            offload(move || layout(element).map(Into::<PageOutput>::into))
        });
        Self::from_parts(handler, None)
    }

    /// Blocking layout receiving the module's props.
    pub fn blocking_with_props<P, F, R>(layout: F) -> Self
    where
        P: Any + Send + Sync,
        F: Fn(&P, Element) -> Result<R, PageError> + Send + Sync + 'static,
        R: PageReturn,
    {
        let layout = Arc::new(layout);
        let handler: LayoutFn = Arc::new(move |props: Props, element: Element| {
            let layout = Arc::clone(&layout);
            offload(move || {
                let props = props.downcast::<P>()?;
                layout(&*props, element).map(Into::<PageOutput>::into)
            })
        });
        Self::from_parts(handler, Some(TypeTag::of::<P>()))
    }

    /// Layout with an explicitly declared props type.
    pub fn from_parts(handler: LayoutFn, props: Option<TypeTag>) -> Self {
        Self { handler, props }
    }

    /// Declared props type.
    #[must_use]
    pub fn props_type(&self) -> Option<TypeTag> {
        self.props
    }

    pub(crate) fn call(
        &self,
        props: Props,
        element: Element,
    ) -> BoxFuture<Result<PageOutput, PageError>> {
        (self.handler)(props, element)
    }
}

impl fmt::Debug for LayoutEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LayoutEntry")
            .field("props", &TypeTag::describe(self.props))
            .finish_non_exhaustive()
    }
}

/// Enumerates the concrete parameter sets a route is built for.
#[derive(Clone)]
pub struct StaticPathsEntry {
    handler: Arc<dyn Fn() -> BoxFuture<Result<Vec<PathParams>, PageError>> + Send + Sync>,
}

impl StaticPathsEntry {
    /// Async enumerator.
    pub fn new<F, Fut>(enumerate: F) -> Self
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Vec<PathParams>, PageError>> + Send + 'static,
    {
        Self {
            handler: Arc::new(move || enumerate().boxed()),
        }
    }

    /// Blocking enumerator.
    pub fn blocking<F>(enumerate: F) -> Self
    where
        F: Fn() -> Result<Vec<PathParams>, PageError> + Send + Sync + 'static,
    {
        let enumerate = Arc::new(enumerate);
        Self {
            handler: Arc::new(move || {
                let enumerate = Arc::clone(&enumerate);
                offload(move || enumerate())
            }),
        }
    }

    /// Fixed list of parameter sets.
    #[must_use]
    pub fn fixed(paths: Vec<PathParams>) -> Self {
        Self::new(move || futures::future::ready(Ok(paths.clone())))
    }

    /// Run the enumerator.
    pub fn enumerate(&self) -> BoxFuture<Result<Vec<PathParams>, PageError>> {
        (self.handler)()
    }
}

impl fmt::Debug for StaticPathsEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StaticPathsEntry").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::{RequestScope, bind, use_request};
    use crate::path::params;

    struct Greeting {
        name: String,
    }

    #[test]
    fn test_typed_constructors_declare_types() {
        let page = PageEntry::with_props(|props: Arc<Greeting>| async move {
            Ok(Element::new("p").text(props.name.clone()))
        });

        assert_eq!(page.arity(), Arity::Unary);
        assert_eq!(page.props_type(), Some(TypeTag::of::<Greeting>()));
        assert_eq!(page.return_type(), TypeTag::of::<Element>());

        let page = PageEntry::new(|| async { Ok(Element::new("p")) });
        assert_eq!(page.arity(), Arity::Nullary);
        assert_eq!(page.props_type(), None);
    }

    #[test]
    fn test_methods_declaration() {
        let page = PageEntry::new(|| async { Ok(Element::new("p")) }).methods(["GET", "POST"]);
        assert_eq!(
            page.declared_methods(),
            Some(&["GET".to_owned(), "POST".to_owned()][..])
        );
    }

    #[tokio::test]
    async fn test_unary_page_receives_props() {
        let page = PageEntry::with_props(|props: Arc<Greeting>| async move {
            Ok(Element::new("p").text(format!("Hello {}", props.name)))
        });

        let output = page
            .call(Props::new(Greeting {
                name: "ren".to_owned(),
            }))
            .await
            .unwrap();

        let PageOutput::Element(element) = output else {
            panic!("expected element");
        };
        assert_eq!(element.to_string(), "<p>Hello ren</p>");
    }

    #[tokio::test]
    async fn test_unary_page_with_wrong_props_fails() {
        let page = PageEntry::with_props(|_: Arc<Greeting>| async { Ok(Element::new("p")) });
        let err = page.call(Props::absent()).await.unwrap_err();
        assert!(matches!(err, PageError::PropsType { .. }));
    }

    #[tokio::test]
    async fn test_blocking_page_with_props() {
        let page = PageEntry::blocking_with_props(|props: &Greeting| {
            Ok(Element::new("p").text(props.name.clone()))
        });
        let output = page
            .call(Props::new(Greeting {
                name: "blocking".to_owned(),
            }))
            .await
            .unwrap();
        assert!(matches!(output, PageOutput::Element(ref e) if e.to_string() == "<p>blocking</p>"));
    }

    #[tokio::test]
    async fn test_ssr_props_hooks() {
        let request = Arc::new(PageRequest::new(
            axum::http::Method::GET,
            "/greet/ren".parse().unwrap(),
        ));

        let hook = SsrPropsEntry::new(|request: Arc<PageRequest>| async move {
            Ok(Greeting {
                name: request.path().to_owned(),
            })
        });
        assert_eq!(hook.return_type(), Some(TypeTag::of::<Greeting>()));
        let props = hook.call(Arc::clone(&request)).await.unwrap();
        assert_eq!(props.downcast::<Greeting>().unwrap().name, "/greet/ren");

        let hook = SsrPropsEntry::blocking(|request: &PageRequest| Ok(request.path().len()));
        let props = hook.call(request).await.unwrap();
        assert_eq!(*props.downcast::<usize>().unwrap(), 10);
    }

    #[tokio::test]
    async fn test_layout_wraps_element() {
        let layout = LayoutEntry::new(|element: Element| async move {
            Ok(Element::new("main").child(element))
        });
        let output = layout
            .call(Props::absent(), Element::new("p").text("body"))
            .await
            .unwrap();
        let PageOutput::Element(element) = output else {
            panic!("expected element");
        };
        assert_eq!(element.to_string(), "<main><p>body</p></main>");
    }

    #[tokio::test]
    async fn test_blocking_layout_sees_request_scope() {
        let request = PageRequest::new(axum::http::Method::GET, "/greet/ren".parse().unwrap());
        let scope = Arc::new(RequestScope::new(Arc::new(request)));
        let layout = LayoutEntry::blocking_with_props(|props: &Greeting, element: Element| {
            let path = use_request()?.path().to_owned();
            Ok(Element::new("main")
                .attr("data-path", path)
                .attr("title", props.name.clone())
                .child(element))
        });
        assert_eq!(layout.props_type(), Some(TypeTag::of::<Greeting>()));

        let output = bind(
            scope,
            layout.call(
                Props::new(Greeting {
                    name: "ren".to_owned(),
                }),
                Element::new("p"),
            ),
        )
        .await
        .unwrap();

        assert!(matches!(
            output,
            PageOutput::Element(ref e)
                if e.to_string() == r#"<main data-path="/greet/ren" title="ren"><p></p></main>"#
        ));
    }

    #[tokio::test]
    async fn test_blocking_layout_without_props() {
        let layout =
            LayoutEntry::blocking(|element: Element| Ok(Element::new("main").child(element)));
        assert_eq!(layout.props_type(), None);

        let output = layout
            .call(Props::absent(), Element::new("p").text("body"))
            .await
            .unwrap();

        assert!(matches!(
            output,
            PageOutput::Element(ref e) if e.to_string() == "<main><p>body</p></main>"
        ));
    }

    #[tokio::test]
    async fn test_static_paths_fixed() {
        let paths = StaticPathsEntry::fixed(vec![
            params([("username", "ren")]),
            params([("username", "example")]),
        ]);
        let listed = paths.enumerate().await.unwrap();
        assert_eq!(listed.len(), 2);
        assert_eq!(listed[1]["username"], "example");
    }
}
