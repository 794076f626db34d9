//! Validated route descriptors in match order.

use std::collections::HashSet;

use axum::http::Method;

use crate::contract::{ContractError, validate, validate_path};
use crate::entry::{LayoutEntry, PageEntry, SsrPropsEntry, StaticPathsEntry};
use crate::path::{has_parameters, parameter_names};
use crate::registry::PageRegistry;

/// Methods a page answers when it declares no restriction.
const DEFAULT_METHODS: [Method; 1] = [Method::GET];

/// Sort key for route patterns: parameter-free routes first, then
/// lexicographic.
pub fn order_key(pattern: &str) -> (bool, &str) {
    (has_parameters(pattern), pattern)
}

/// Everything needed to serve one page module.
#[derive(Clone, Debug)]
pub struct RouteDescriptor {
    module: String,
    pattern: String,
    page: PageEntry,
    static_paths: Option<StaticPathsEntry>,
    ssr_props: Option<SsrPropsEntry>,
    layout: Option<LayoutEntry>,
    methods: Vec<Method>,
}

impl RouteDescriptor {
    /// Dotted name of the module the route was built from.
    #[must_use]
    pub fn module(&self) -> &str {
        &self.module
    }

    /// URL pattern, e.g. `/greet/{username}`.
    #[must_use]
    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    #[must_use]
    pub fn page(&self) -> &PageEntry {
        &self.page
    }

    #[must_use]
    pub fn static_paths(&self) -> Option<&StaticPathsEntry> {
        self.static_paths.as_ref()
    }

    #[must_use]
    pub fn ssr_props(&self) -> Option<&SsrPropsEntry> {
        self.ssr_props.as_ref()
    }

    #[must_use]
    pub fn layout(&self) -> Option<&LayoutEntry> {
        self.layout.as_ref()
    }

    /// Methods the route answers (GET unless restricted).
    #[must_use]
    pub fn allowed_methods(&self) -> &[Method] {
        &self.methods
    }

    /// True if the pattern has placeholders.
    #[must_use]
    pub fn has_parameters(&self) -> bool {
        has_parameters(&self.pattern)
    }

    /// Placeholder names in order.
    #[must_use]
    pub fn parameter_names(&self) -> Vec<&str> {
        parameter_names(&self.pattern)
    }
}

/// Ordered, immutable list of routes.
#[derive(Clone, Debug, Default)]
pub struct RouteTable {
    routes: Vec<RouteDescriptor>,
}

impl RouteTable {
    /// Validate every registered module and order the resulting routes.
    ///
    /// The first invalid module aborts the build; no partial table is
    /// returned.
    pub fn build(registry: PageRegistry) -> Result<Self, ContractError> {
        let mut seen = HashSet::new();
        let mut routes = Vec::with_capacity(registry.len());

        for (path, module) in registry.into_modules() {
            let name = path.name();
            if !seen.insert(path.clone()) {
                return Err(ContractError::DuplicateModule { module: name });
            }

            validate_path(&path)?;
            let validated = validate(&name, module)?;
            let pattern = path.route_pattern();
            tracing::debug!(module = %name, pattern = %pattern, "Validated page module");

            routes.push(RouteDescriptor {
                module: name,
                pattern,
                page: validated.page,
                static_paths: validated.static_paths,
                ssr_props: validated.ssr_props,
                layout: validated.layout,
                methods: validated
                    .methods
                    .unwrap_or_else(|| DEFAULT_METHODS.to_vec()),
            });
        }

        routes.sort_by(|a, b| order_key(&a.pattern).cmp(&order_key(&b.pattern)));

        Ok(Self { routes })
    }

    /// Routes in match order.
    #[must_use]
    pub fn routes(&self) -> &[RouteDescriptor] {
        &self.routes
    }

    pub fn iter(&self) -> std::slice::Iter<'_, RouteDescriptor> {
        self.routes.iter()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.routes.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }

    /// First route with the given pattern.
    #[must_use]
    pub fn get(&self, pattern: &str) -> Option<&RouteDescriptor> {
        self.routes.iter().find(|r| r.pattern == pattern)
    }
}

impl<'a> IntoIterator for &'a RouteTable {
    type Item = &'a RouteDescriptor;
    type IntoIter = std::slice::Iter<'a, RouteDescriptor>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}
