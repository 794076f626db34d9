//! HTTP server for Lau page applications.
//!
//! This crate turns a [`Site`] (pages, providers, server functions and error
//! pages) into an axum application, serving:
//! - One route per page, in route table order
//! - Form submissions to server functions (`?lau-rpc=<ident>`)
//! - Static files from the configured directory under `/static`
//!
//! # Quick Start
//!
//! ```ignore
//! use lau_pages::{Element, PageEntry, PageError, PageModule, PageRegistry};
//! use lau_server::{ServerConfig, Site, run_server};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), lau_server::ServerError> {
//!     let pages = PageRegistry::new().register(
//!         "pages/index",
//!         PageModule::new().page(PageEntry::new(|| async {
//!             Ok::<_, PageError>(Element::new("h1").text("Hello"))
//!         })),
//!     );
//!     let config = ServerConfig::default();
//!     let app = Site::new(pages).into_app(&config)?;
//!     run_server(app, &config).await
//! }
//! ```
//!
//! # Architecture
//!
//! ```text
//! Browser ──HTTP──► axum router (lau-server)
//!                        │
//!                        ├─► RPC middleware ──► RpcFunction::invoke
//!                        │
//!                        ├─► page routes ──► Dispatcher (lau-pages)
//!                        │                       │
//!                        │                       └─► error pages on failure
//!                        │
//!                        ├─► /static (tower-http)
//!                        │
//!                        └─► fallback ──► 404 error page
//! ```

mod app;
mod error;
mod handlers;
mod middleware;
mod state;
mod static_files;

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use axum::Router;
use lau_config::Config;
use lau_pages::{
    ErrorHandler, ErrorHandlerRegistry, PageRegistry, Provider, ProviderSet, RouteTable,
    RpcFunction, RpcRegistry,
};

pub use error::ServerError;
use state::{AppState, RequestSettings};

/// Server configuration.
#[derive(Clone, Debug)]
pub struct ServerConfig {
    /// Host address to bind to.
    pub host: String,
    /// Port to listen on.
    pub port: u16,
    /// Mount prefix reported to pages.
    pub root_path: String,
    /// Trust `X-Forwarded-*` headers for the client scheme and address.
    pub proxy_headers: bool,
    /// Directory served under `/static`.
    pub static_dir: PathBuf,
    /// Include error details in default error responses.
    pub debug: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8000,
            root_path: String::new(),
            proxy_headers: true,
            static_dir: PathBuf::from("static"),
            debug: false,
        }
    }
}

/// Create server configuration from Lau config.
#[must_use]
pub fn server_config_from_lau_config(config: &Config) -> ServerConfig {
    ServerConfig {
        host: config.server.host.clone(),
        port: config.server.port,
        root_path: config.server.root_path.clone(),
        proxy_headers: config.server.proxy_headers,
        static_dir: config.paths.static_dir.clone(),
        debug: config.server.debug,
    }
}

type Customize = Box<dyn FnOnce(Router) -> Router + Send>;

/// Everything an application declares.
///
/// Registration problems (page contracts, provider graph, error handler
/// statuses) surface from [`Site::into_app`], before any request is served.
pub struct Site {
    pages: PageRegistry,
    providers: Vec<Provider>,
    rpc: RpcRegistry,
    error_handlers: Vec<(u16, ErrorHandler)>,
    customize: Option<Customize>,
}

impl Site {
    #[must_use]
    pub fn new(pages: PageRegistry) -> Self {
        Self {
            pages,
            providers: Vec::new(),
            rpc: RpcRegistry::new(),
            error_handlers: Vec::new(),
            customize: None,
        }
    }

    /// Add a request-scoped provider.
    #[must_use]
    pub fn provider(mut self, provider: Provider) -> Self {
        self.providers.push(provider);
        self
    }

    /// Add a server function reachable from forms.
    #[must_use]
    pub fn rpc(mut self, function: RpcFunction) -> Self {
        self.rpc.add(function);
        self
    }

    /// Add the page rendered for `status`.
    #[must_use]
    pub fn error_handler(mut self, status: u16, handler: ErrorHandler) -> Self {
        self.error_handlers.push((status, handler));
        self
    }

    /// Adjust the router after all routes are registered, e.g. to add
    /// middleware or extra endpoints.
    #[must_use]
    pub fn customize<F>(mut self, customize: F) -> Self
    where
        F: FnOnce(Router) -> Router + Send + 'static,
    {
        self.customize = Some(Box::new(customize));
        self
    }

    /// Validate everything and build the application.
    pub fn into_app(self, config: &ServerConfig) -> Result<App, ServerError> {
        let routes = Arc::new(RouteTable::build(self.pages)?);
        let providers = Arc::new(ProviderSet::new(self.providers)?);

        let mut error_handlers = ErrorHandlerRegistry::new();
        for (status, handler) in self.error_handlers {
            error_handlers = error_handlers.register(status, handler)?;
        }

        tracing::info!(
            routes = routes.len(),
            providers = providers.len(),
            rpc = self.rpc.len(),
            error_pages = error_handlers.len(),
            "Application loaded"
        );

        let state = Arc::new(AppState {
            routes: Arc::clone(&routes),
            dispatcher: lau_pages::Dispatcher::new(providers),
            rpc: self.rpc,
            error_handlers,
            settings: RequestSettings {
                root_path: config.root_path.clone(),
                proxy_headers: config.proxy_headers,
                debug: config.debug,
            },
        });

        let mut router = app::create_router(state, &config.static_dir)?;
        if let Some(customize) = self.customize {
            router = customize(router);
        }

        Ok(App { router, routes })
    }
}

/// A built application.
#[derive(Clone, Debug)]
pub struct App {
    router: Router,
    routes: Arc<RouteTable>,
}

impl App {
    /// The axum router serving the application.
    #[must_use]
    pub fn router(&self) -> &Router {
        &self.router
    }

    /// Validated routes in match order.
    #[must_use]
    pub fn routes(&self) -> &RouteTable {
        &self.routes
    }
}

/// Run the server until Ctrl-C.
///
/// # Errors
///
/// Returns an error if the listener cannot be bound or the server fails.
pub async fn run_server(app: App, config: &ServerConfig) -> Result<(), ServerError> {
    let listener = tokio::net::TcpListener::bind((config.host.as_str(), config.port)).await?;
    tracing::info!(address = %listener.local_addr()?, "Starting server");

    axum::serve(
        listener,
        app.router
            .into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    Ok(())
}

/// Wait for shutdown signal (Ctrl-C).
async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for Ctrl+C");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received, stopping server...");
}

#[cfg(test)]
mod tests {
    use std::path::Path;

    use lau_config::EnvDefaults;
    use lau_pages::{Element, PageEntry, PageError, PageModule};
    use pretty_assertions::assert_eq;

    use super::*;

    fn pages() -> PageRegistry {
        PageRegistry::new().register(
            "pages/index",
            PageModule::new().page(PageEntry::new(|| async {
                Ok::<_, PageError>(Element::new("h1").text("Home"))
            })),
        )
    }

    #[test]
    fn test_server_config_from_lau_config() {
        let config = Config::from_toml(
            "[server]\nport = 9000\nroot_path = \"/app\"\n",
            Path::new("/srv/app"),
            &EnvDefaults::default(),
        )
        .unwrap();

        let server = server_config_from_lau_config(&config);

        assert_eq!(server.port, 9000);
        assert_eq!(server.root_path, "/app");
        assert_eq!(server.static_dir, PathBuf::from("/srv/app/static"));
        assert!(server.proxy_headers);
    }

    #[test]
    fn test_into_app_rejects_invalid_page() {
        let pages = PageRegistry::new().register("pages/empty", PageModule::new());
        let err = Site::new(pages)
            .into_app(&ServerConfig::default())
            .unwrap_err();
        assert!(matches!(err, ServerError::Contract(_)));
    }

    #[test]
    fn test_into_app_rejects_unroutable_segment() {
        let pages = pages().register(
            "pages/[a][b]",
            PageModule::new().page(PageEntry::new(|| async {
                Ok::<_, PageError>(Element::new("p"))
            })),
        );
        let err = Site::new(pages)
            .into_app(&ServerConfig::default())
            .unwrap_err();
        assert!(matches!(
            err,
            ServerError::Contract(lau_pages::ContractError::InvalidSegment { .. })
        ));
    }

    #[test]
    fn test_into_app_rejects_invalid_error_status() {
        let err = Site::new(pages())
            .error_handler(
                302,
                ErrorHandler::new(|| async { Ok::<_, PageError>(Element::new("p")) }),
            )
            .into_app(&ServerConfig::default())
            .unwrap_err();
        assert!(matches!(err, ServerError::Contract(_)));
    }

    #[tokio::test]
    async fn test_into_app_exposes_routes() {
        let app = Site::new(pages())
            .into_app(&ServerConfig::default())
            .unwrap();
        assert_eq!(app.routes().len(), 1);
        assert_eq!(app.routes().routes()[0].pattern(), "/");
    }
}
