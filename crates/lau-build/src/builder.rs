//! Static site builder.
//!
//! Every route is instantiated once per enumerated parameter set (or once
//! with no parameters), requested through the application router and
//! written to disk. Routes with parameters but no enumerator are skipped;
//! every other failure aborts the build.

use std::path::{Component, Path, PathBuf};
use std::sync::Arc;

use axum::Router;
use axum::body::{Body, to_bytes};
use axum::http::{Method, Request, StatusCode};
use lau_pages::{PageError, PathParams, RouteDescriptor, UrlError, url_for};
use lau_server::App;
use percent_encoding::percent_decode_str;
use tower::ServiceExt;

/// Error returned by the static site builder.
#[derive(Debug, thiserror::Error)]
pub enum BuildError {
    /// The static path enumerator of a route failed.
    #[error("Static paths of {pattern} failed: {source}")]
    StaticPaths {
        pattern: String,
        #[source]
        source: PageError,
    },

    /// An enumerated parameter set does not fit the route pattern.
    #[error(transparent)]
    Url(#[from] UrlError),

    /// The URL resolves to a file outside the target directory.
    #[error("Output for {url} escapes the target directory")]
    PathEscapesRoot { url: String },

    /// The page answered with a non-2xx status.
    #[error("{url} answered {status}")]
    Status { url: String, status: StatusCode },

    /// Two URLs resolve to the same output file.
    #[error("Output file already exists: {}", path.display())]
    DuplicateOutput { url: String, path: PathBuf },

    /// The router failed to produce a response.
    #[error("Request to {url} failed: {message}")]
    Request { url: String, message: String },

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// A rendered and written page.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BuiltPage {
    pub url: String,
    pub path: PathBuf,
}

/// A route left out of the build.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SkippedRoute {
    pub pattern: String,
    pub module: String,
}

/// Outcome of a successful build.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct BuildReport {
    pub pages: Vec<BuiltPage>,
    pub skipped: Vec<SkippedRoute>,
}

/// Progress notification.
#[derive(Clone, Copy, Debug)]
pub enum BuildEvent<'a> {
    /// A route is about to be rendered.
    Route(&'a RouteDescriptor),
    /// A route was skipped for lack of a static path enumerator.
    Skipped(&'a SkippedRoute),
    /// A page was written.
    Page(&'a BuiltPage),
}

type Observer = Arc<dyn Fn(BuildEvent<'_>) + Send + Sync>;

/// Builds a static site from an application.
pub struct StaticSiteBuilder<'a> {
    app: &'a App,
    observer: Option<Observer>,
}

impl<'a> StaticSiteBuilder<'a> {
    #[must_use]
    pub fn new(app: &'a App) -> Self {
        Self {
            app,
            observer: None,
        }
    }

    /// Report progress to `observer`.
    #[must_use]
    pub fn on_event<F>(mut self, observer: F) -> Self
    where
        F: Fn(BuildEvent<'_>) + Send + Sync + 'static,
    {
        self.observer = Some(Arc::new(observer));
        self
    }

    /// Render every route into `target`.
    ///
    /// # Errors
    ///
    /// Returns the first fatal error. Files written before it stay on disk.
    pub async fn build(&self, target: &Path) -> Result<BuildReport, BuildError> {
        tokio::fs::create_dir_all(target).await?;
        let mut report = BuildReport::default();

        for route in self.app.routes() {
            self.notify(BuildEvent::Route(route));

            let params = match route.static_paths() {
                Some(static_paths) => {
                    static_paths
                        .enumerate()
                        .await
                        .map_err(|source| BuildError::StaticPaths {
                            pattern: route.pattern().to_string(),
                            source,
                        })?
                }
                None if route.has_parameters() => {
                    let skipped = SkippedRoute {
                        pattern: route.pattern().to_string(),
                        module: route.module().to_string(),
                    };
                    tracing::warn!(
                        pattern = route.pattern(),
                        module = route.module(),
                        "Skipped: route has parameters but no static paths"
                    );
                    self.notify(BuildEvent::Skipped(&skipped));
                    report.skipped.push(skipped);
                    continue;
                }
                None => vec![PathParams::new()],
            };

            for params in &params {
                let page = self.build_page(route, params, target).await?;
                self.notify(BuildEvent::Page(&page));
                report.pages.push(page);
            }
        }

        tracing::info!(
            pages = report.pages.len(),
            skipped = report.skipped.len(),
            target = %target.display(),
            "Build finished"
        );
        Ok(report)
    }

    async fn build_page(
        &self,
        route: &RouteDescriptor,
        params: &PathParams,
        target: &Path,
    ) -> Result<BuiltPage, BuildError> {
        let url = url_for(route.pattern(), params)?;
        let path = output_path(target, &url)?;

        let body = render(self.app.router(), &url).await?;

        if tokio::fs::try_exists(&path).await? {
            return Err(BuildError::DuplicateOutput { url, path });
        }
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(&path, &body).await?;

        tracing::debug!(url = %url, path = %path.display(), bytes = body.len(), "Page written");
        Ok(BuiltPage { url, path })
    }

    fn notify(&self, event: BuildEvent<'_>) {
        if let Some(observer) = &self.observer {
            observer(event);
        }
    }
}

/// Request `url` in-process and return the body of a 2xx response.
async fn render(router: &Router, url: &str) -> Result<Vec<u8>, BuildError> {
    let request_error = |message: String| BuildError::Request {
        url: url.to_string(),
        message,
    };

    let request = Request::builder()
        .method(Method::GET)
        .uri(url)
        .body(Body::empty())
        .map_err(|e| request_error(e.to_string()))?;
    let response = router
        .clone()
        .oneshot(request)
        .await
        .map_err(|e| request_error(e.to_string()))?;

    let status = response.status();
    if !status.is_success() {
        return Err(BuildError::Status {
            url: url.to_string(),
            status,
        });
    }

    let body = to_bytes(response.into_body(), usize::MAX)
        .await
        .map_err(|e| request_error(e.to_string()))?;
    Ok(body.to_vec())
}

/// `<target>/<url without surrounding slashes>/index.html`, lexically
/// normalized and required to stay inside `target`.
fn output_path(target: &Path, url: &str) -> Result<PathBuf, BuildError> {
    let escapes = || BuildError::PathEscapesRoot {
        url: url.to_string(),
    };

    let decoded = percent_decode_str(url)
        .decode_utf8()
        .map_err(|_| escapes())?;

    let mut relative = PathBuf::new();
    for component in Path::new(decoded.trim_matches('/')).components() {
        match component {
            Component::Normal(part) => relative.push(part),
            Component::CurDir => {}
            Component::ParentDir => {
                if !relative.pop() {
                    return Err(escapes());
                }
            }
            Component::RootDir | Component::Prefix(_) => return Err(escapes()),
        }
    }

    Ok(target.join(relative).join("index.html"))
}
