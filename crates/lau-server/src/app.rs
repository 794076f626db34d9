//! Router construction.
//!
//! Builds the axum router with all page routes and middleware.

use std::path::Path as FsPath;
use std::sync::Arc;

use axum::Router;
use axum::extract::{Path, Request, State};
use axum::middleware;
use axum::routing::{MethodFilter, on};
use lau_pages::{PathParams, RouteDescriptor};
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;

use crate::error::ServerError;
use crate::handlers::pages;
use crate::middleware::{rpc, security};
use crate::state::AppState;
use crate::static_files::{self, STATIC_PREFIX};

/// Create the application router.
///
/// Routes are registered in route table order. A route the router cannot
/// hold next to an earlier one (same shape, or differently named parameters
/// at the same position) is skipped with a warning.
pub(crate) fn create_router(
    state: Arc<AppState>,
    static_dir: &FsPath,
) -> Result<Router, ServerError> {
    let routes = Arc::clone(&state.routes);
    let mut router = Router::new();
    let mut registered: Vec<&str> = Vec::new();

    for route in routes.iter() {
        if let Some(existing) = registered.iter().find(|p| conflicts(p, route.pattern())) {
            tracing::warn!(
                pattern = route.pattern(),
                module = route.module(),
                conflicts_with = existing,
                "Route conflicts with an earlier route, skipping"
            );
            continue;
        }

        let descriptor = route.clone();
        let handler = move |State(state): State<Arc<AppState>>,
                            Path(path_params): Path<PathParams>,
                            request: Request| {
            let route = descriptor.clone();
            async move { pages::serve_page(state, route, path_params, request).await }
        };
        router = router.route(route.pattern(), on(method_filter(route)?, handler));
        registered.push(route.pattern());

        tracing::debug!(
            pattern = route.pattern(),
            module = route.module(),
            methods = ?route.allowed_methods(),
            "Registered route"
        );
    }

    router = router
        .method_not_allowed_fallback(pages::method_not_allowed)
        .fallback(pages::not_found);

    if registered.iter().any(|p| under_static_prefix(p)) {
        tracing::warn!(
            prefix = STATIC_PREFIX,
            "Pages are routed under the static prefix, not mounting static files"
        );
    } else if let Some(service) = static_files::static_service(static_dir) {
        router = router.nest_service(STATIC_PREFIX, service);
    }

    Ok(router
        .layer(middleware::from_fn_with_state(
            Arc::clone(&state),
            rpc::form_rpc,
        ))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(security::security_headers()),
        )
        .with_state(state))
}

/// Method filter accepting every declared method of a route.
fn method_filter(route: &RouteDescriptor) -> Result<MethodFilter, ServerError> {
    let mut filter: Option<MethodFilter> = None;
    for method in route.allowed_methods() {
        let next = MethodFilter::try_from(method.clone()).map_err(|_| {
            ServerError::UnsupportedMethod {
                pattern: route.pattern().to_string(),
                method: method.to_string(),
            }
        })?;
        filter = Some(filter.map_or(next, |filter| filter.or(next)));
    }
    Ok(filter.unwrap_or(MethodFilter::GET))
}

fn is_parameter(segment: &str) -> bool {
    segment.starts_with('{') && segment.ends_with('}')
}

/// True if the router cannot hold `pattern` next to `existing`.
fn conflicts(existing: &str, pattern: &str) -> bool {
    let existing: Vec<&str> = existing.split('/').collect();
    let pattern: Vec<&str> = pattern.split('/').collect();

    for (a, b) in existing.iter().zip(&pattern) {
        if a != b {
            return is_parameter(a) && is_parameter(b);
        }
    }
    existing.len() == pattern.len()
}

fn under_static_prefix(pattern: &str) -> bool {
    pattern == STATIC_PREFIX
        || pattern
            .strip_prefix(STATIC_PREFIX)
            .is_some_and(|rest| rest.starts_with('/'))
}
