//! Per-request dispatch pipeline.
//!
//! ```text
//! Start ─► PropsComputed ─► ContextBound ─► DependenciesAcquired
//!       ─► PageInvoked ─► LayoutApplied ─► ResponseReady
//! ```
//!
//! The request scope is bound around everything after props computation and
//! is unbound when the dispatch future completes or is dropped. Acquired
//! resources are released in reverse order on every exit path.

use std::fmt;
use std::sync::Arc;

use axum::http::StatusCode;
use axum::response::Response;
use tracing::Instrument;

use crate::context::{self, RequestScope};
use crate::element::PageOutput;
use crate::error::PageError;
use crate::props::Props;
use crate::provider::ProviderSet;
use crate::request::PageRequest;
use crate::table::RouteDescriptor;

/// Dispatch pipeline stage.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DispatchStage {
    Start,
    PropsComputed,
    ContextBound,
    DependenciesAcquired,
    PageInvoked,
    LayoutApplied,
    ResponseReady,
}

impl fmt::Display for DispatchStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Start => "start",
            Self::PropsComputed => "computing props",
            Self::ContextBound => "binding request context",
            Self::DependenciesAcquired => "acquiring dependencies",
            Self::PageInvoked => "invoking page",
            Self::LayoutApplied => "applying layout",
            Self::ResponseReady => "building response",
        };
        f.write_str(name)
    }
}

/// Failure inside the pipeline, tagged with the stage it happened in.
#[derive(Debug, thiserror::Error)]
#[error("dispatch failed while {stage}: {source}")]
pub struct DispatchError {
    pub stage: DispatchStage,
    pub source: PageError,
}

impl DispatchError {
    /// Status code the host should answer with.
    #[must_use]
    pub fn status(&self) -> StatusCode {
        self.source.status()
    }
}

fn at(stage: DispatchStage) -> impl FnOnce(PageError) -> DispatchError {
    move |source| DispatchError { stage, source }
}

/// Runs matched requests through their route.
#[derive(Clone, Debug)]
pub struct Dispatcher {
    providers: Arc<ProviderSet>,
}

impl Dispatcher {
    #[must_use]
    pub fn new(providers: Arc<ProviderSet>) -> Self {
        Self { providers }
    }

    /// Produce the response for `request` on `route`.
    pub async fn dispatch(
        &self,
        route: &RouteDescriptor,
        request: PageRequest,
    ) -> Result<Response, DispatchError> {
        let span = tracing::info_span!(
            "dispatch",
            route = route.pattern(),
            request_id = request.request_id()
        );
        self.run(route, request).instrument(span).await
    }

    async fn run(
        &self,
        route: &RouteDescriptor,
        request: PageRequest,
    ) -> Result<Response, DispatchError> {
        let request = Arc::new(request);

        let props = match route.ssr_props() {
            Some(hook) => hook
                .call(Arc::clone(&request))
                .await
                .map_err(at(DispatchStage::PropsComputed))?,
            None => Props::absent(),
        };

        let scope = Arc::new(RequestScope::new(request));
        context::bind(scope, async {
            let stack = self
                .providers
                .provide_all()
                .await
                .map_err(at(DispatchStage::DependenciesAcquired))?;

            let result = render(route, props).await;
            stack.release().await;
            result
        })
        .await
    }
}

async fn render(route: &RouteDescriptor, props: Props) -> Result<Response, DispatchError> {
    let output = route
        .page()
        .call(props.clone())
        .await
        .map_err(at(DispatchStage::PageInvoked))?;

    let output = match (output, route.layout()) {
        (PageOutput::Element(element), Some(layout)) => layout
            .call(props, element)
            .await
            .map_err(at(DispatchStage::LayoutApplied))?,
        (output, _) => output,
    };

    tracing::debug!("Page rendered");
    Ok(output.into_response())
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;
    use std::time::Duration;

    use axum::body::to_bytes;
    use axum::http::{Method, header};
    use axum::response::IntoResponse;
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::context::{Context, use_request};
    use crate::element::Element;
    use crate::entry::{LayoutEntry, PageEntry, SsrPropsEntry};
    use crate::provider::{Provided, Provider};
    use crate::registry::{PageModule, PageRegistry};
    use crate::table::RouteTable;

    static DB: Context<String> = Context::new("db");
    static SESSION: Context<String> = Context::new("session");

    type Log = Arc<Mutex<Vec<String>>>;

    struct UsernameProps {
        info: String,
    }

    fn recording(context: &'static Context<String>, deps: &[crate::ContextId], log: &Log) -> Provider {
        let log = Arc::clone(log);
        Provider::new(context, deps, move || {
            let log = Arc::clone(&log);
            async move {
                let name = context.id().name();
                log.lock().unwrap().push(format!("acquire {name}"));
                Ok(Provided::with_release(name.to_owned(), move || async move {
                    log.lock().unwrap().push(format!("release {name}"));
                }))
            }
        })
    }

    fn providers(log: &Log) -> Arc<ProviderSet> {
        Arc::new(
            ProviderSet::new(vec![
                recording(&DB, &[], log),
                recording(&SESSION, &[DB.id()], log),
            ])
            .unwrap(),
        )
    }

    fn route(path: &str, module: PageModule) -> RouteDescriptor {
        let table = RouteTable::build(PageRegistry::new().register(path, module)).unwrap();
        table.routes()[0].clone()
    }

    fn get(path: &str) -> PageRequest {
        PageRequest::new(Method::GET, path.parse().unwrap())
    }

    async fn body(response: Response) -> String {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    #[tokio::test]
    async fn test_props_flow_to_page_and_layout() {
        let module = PageModule::new()
            .ssr_props(SsrPropsEntry::new(|request: Arc<PageRequest>| async move {
                Ok(UsernameProps {
                    info: format!("visiting {}", request.path()),
                })
            }))
            .page(PageEntry::with_props(|props: Arc<UsernameProps>| async move {
                Ok(Element::new("p").text(props.info.clone()))
            }))
            .layout(LayoutEntry::with_props(
                |props: Arc<UsernameProps>, element: Element| async move {
                    Ok(Element::new("main").attr("title", props.info.clone()).child(element))
                },
            ));
        let route = route("pages/greet/[username].rs", module);

        let dispatcher = Dispatcher::new(Arc::new(ProviderSet::empty()));
        let response = dispatcher.dispatch(&route, get("/greet/ren")).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers()[header::CONTENT_TYPE],
            "text/html; charset=utf-8"
        );
        assert_eq!(
            body(response).await,
            r#"<main title="visiting /greet/ren"><p>visiting /greet/ren</p></main>"#
        );
    }

    #[tokio::test]
    async fn test_raw_response_skips_layout() {
        let module = PageModule::new()
            .page(PageEntry::new(|| async {
                Ok((StatusCode::ACCEPTED, "raw").into_response())
            }))
            .layout(LayoutEntry::new(|_: Element| async {
                Ok(Element::new("main"))
            }));
        let route = route("pages/raw.rs", module);

        let response = Dispatcher::new(Arc::new(ProviderSet::empty()))
            .dispatch(&route, get("/raw"))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::ACCEPTED);
        assert_eq!(body(response).await, "raw");
    }

    #[tokio::test]
    async fn test_page_reads_request_and_providers() {
        let log = Log::default();
        let module = PageModule::new().page(PageEntry::new(|| async {
            let request = use_request()?;
            let session = SESSION.current()?;
            Ok::<_, PageError>(Element::new("p").text(format!("{} {}", request.path(), session)))
        }));
        let route = route("pages/index.rs", module);

        let response = Dispatcher::new(providers(&log))
            .dispatch(&route, get("/"))
            .await
            .unwrap();

        assert_eq!(body(response).await, "<p>/ session</p>");
        assert_eq!(
            *log.lock().unwrap(),
            vec!["acquire db", "acquire session", "release session", "release db"]
        );
    }

    #[tokio::test]
    async fn test_failing_page_releases_resources() {
        let log = Log::default();
        let module = PageModule::new().page(PageEntry::new(|| async {
            Err::<Element, _>(PageError::handler("boom"))
        }));
        let route = route("pages/index.rs", module);

        let err = Dispatcher::new(providers(&log))
            .dispatch(&route, get("/"))
            .await
            .unwrap_err();

        assert_eq!(err.stage, DispatchStage::PageInvoked);
        assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(
            *log.lock().unwrap(),
            vec!["acquire db", "acquire session", "release session", "release db"]
        );
        assert!(use_request().is_err());
    }

    #[tokio::test]
    async fn test_failing_layout_releases_resources() {
        let log = Log::default();
        let module = PageModule::new()
            .page(PageEntry::new(|| async { Ok(Element::new("p")) }))
            .layout(LayoutEntry::new(|_: Element| async {
                Err::<Element, _>(PageError::not_found("gone"))
            }));
        let route = route("pages/index.rs", module);

        let err = Dispatcher::new(providers(&log))
            .dispatch(&route, get("/"))
            .await
            .unwrap_err();

        assert_eq!(err.stage, DispatchStage::LayoutApplied);
        assert_eq!(err.status(), StatusCode::NOT_FOUND);
        assert_eq!(log.lock().unwrap().len(), 4);
    }

    #[tokio::test]
    async fn test_failing_props_acquires_nothing() {
        let log = Log::default();
        let module = PageModule::new()
            .ssr_props(SsrPropsEntry::new(|_: Arc<PageRequest>| async {
                Err::<UsernameProps, _>(PageError::not_found("no such user"))
            }))
            .page(PageEntry::with_props(|_: Arc<UsernameProps>| async {
                Ok(Element::new("p"))
            }));
        let route = route("pages/greet/[username].rs", module);

        let err = Dispatcher::new(providers(&log))
            .dispatch(&route, get("/greet/nobody"))
            .await
            .unwrap_err();

        assert_eq!(err.stage, DispatchStage::PropsComputed);
        assert!(log.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_cancelled_dispatch_releases_resources() {
        let log = Log::default();
        let module = PageModule::new().page(PageEntry::new(|| async {
            futures::future::pending::<()>().await;
            Ok(Element::new("p"))
        }));
        let route = route("pages/index.rs", module);
        let dispatcher = Dispatcher::new(providers(&log));

        let outcome = tokio::time::timeout(
            Duration::from_millis(20),
            dispatcher.dispatch(&route, get("/")),
        )
        .await;
        assert!(outcome.is_err());

        for _ in 0..5 {
            tokio::task::yield_now().await;
        }
        assert_eq!(
            *log.lock().unwrap(),
            vec!["acquire db", "acquire session", "release session", "release db"]
        );
    }

    #[tokio::test]
    async fn test_dispatch_cancelled_during_release_still_unwinds() {
        let log = Log::default();
        let slow_log = Arc::clone(&log);
        let slow_session = Provider::new(&SESSION, &[DB.id()], move || {
            let log = Arc::clone(&slow_log);
            async move {
                log.lock().unwrap().push("acquire session".to_owned());
                Ok(Provided::with_release("session".to_owned(), move || async move {
                    tokio::time::sleep(Duration::from_millis(50)).await;
                    log.lock().unwrap().push("release session".to_owned());
                }))
            }
        });
        let providers =
            ProviderSet::new(vec![recording(&DB, &[], &log), slow_session]).unwrap();
        let module = PageModule::new().page(PageEntry::new(|| async { Ok(Element::new("p")) }));
        let route = route("pages/index.rs", module);
        let dispatcher = Dispatcher::new(Arc::new(providers));

        let outcome = tokio::time::timeout(
            Duration::from_millis(10),
            dispatcher.dispatch(&route, get("/")),
        )
        .await;
        assert!(outcome.is_err());

        tokio::time::sleep(Duration::from_millis(200)).await;
        assert_eq!(
            *log.lock().unwrap(),
            vec!["acquire db", "acquire session", "release session", "release db"]
        );
    }

    #[tokio::test]
    async fn test_runtime_props_type_mismatch() {
        struct Declared;
        struct Actual;

        let hook = SsrPropsEntry::from_parts(
            Arc::new(|_: Arc<PageRequest>| {
                Box::pin(async { Ok(Props::new(Actual)) })
                    as crate::BoxFuture<Result<Props, PageError>>
            }),
            Some(crate::TypeTag::of::<Declared>()),
        );
        let module = PageModule::new()
            .ssr_props(hook)
            .page(PageEntry::with_props(|_: Arc<Declared>| async {
                Ok(Element::new("p"))
            }));
        let route = route("pages/index.rs", module);

        let err = Dispatcher::new(Arc::new(ProviderSet::empty()))
            .dispatch(&route, get("/"))
            .await
            .unwrap_err();

        assert_eq!(err.stage, DispatchStage::PageInvoked);
        assert!(matches!(err.source, PageError::PropsType { .. }));
    }

    #[tokio::test]
    async fn test_concurrent_dispatches_are_isolated() {
        let module = PageModule::new().page(PageEntry::new(|| async {
            let before = use_request()?.path().to_owned();
            tokio::time::sleep(Duration::from_millis(5)).await;
            let after = use_request()?.path().to_owned();
            Ok::<_, PageError>(Element::new("p").text(format!("{before} {after}")))
        }));
        let route = route("pages/[name].rs", module);
        let dispatcher = Dispatcher::new(Arc::new(ProviderSet::empty()));

        let (first, second) = tokio::join!(
            dispatcher.dispatch(&route, get("/first")),
            dispatcher.dispatch(&route, get("/second"))
        );

        assert_eq!(body(first.unwrap()).await, "<p>/first /first</p>");
        assert_eq!(body(second.unwrap()).await, "<p>/second /second</p>");
    }
}
