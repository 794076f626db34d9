//! Explicit registration table of page modules.
//!
//! Modules are registered under their source path relative to the project
//! root (e.g. `pages/greet/[username].rs`). The path is the only input to
//! route derivation, so registration order never affects the URL a module
//! is served at.

use std::fmt;
use std::path::Path;

use crate::entry::{LayoutEntry, PageEntry, SsrPropsEntry, StaticPathsEntry};
use crate::path::route_pattern;

/// Source path of a page module, split into segments.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct ModulePath {
    segments: Vec<String>,
}

impl ModulePath {
    /// Parse a `/`-separated path. A file extension on the last segment is
    /// dropped.
    #[must_use]
    pub fn parse(path: &str) -> Self {
        let mut segments: Vec<String> = path
            .split('/')
            .filter(|s| !s.is_empty())
            .map(ToOwned::to_owned)
            .collect();

        if let Some(last) = segments.last_mut()
            && let Some(stem) = Path::new(last.as_str()).file_stem().and_then(|s| s.to_str())
        {
            *last = stem.to_owned();
        }

        Self { segments }
    }

    /// Path segments without extension.
    #[must_use]
    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    /// Dotted module name, e.g. `pages.greet.[username]`.
    #[must_use]
    pub fn name(&self) -> String {
        self.segments.join(".")
    }

    /// URL pattern this module is served at.
    #[must_use]
    pub fn route_pattern(&self) -> String {
        route_pattern(&self.segments)
    }
}

impl From<&str> for ModulePath {
    fn from(path: &str) -> Self {
        Self::parse(path)
    }
}

impl fmt::Display for ModulePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.segments.join("/"))
    }
}

/// Hooks declared by one page module.
#[derive(Clone, Debug, Default)]
pub struct PageModule {
    pub(crate) page: Option<PageEntry>,
    pub(crate) static_paths: Option<StaticPathsEntry>,
    pub(crate) ssr_props: Option<SsrPropsEntry>,
    pub(crate) layout: Option<LayoutEntry>,
}

impl PageModule {
    /// Module with no hooks yet.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the page entry point.
    #[must_use]
    pub fn page(mut self, page: PageEntry) -> Self {
        self.page = Some(page);
        self
    }

    /// Set the static path enumerator.
    #[must_use]
    pub fn static_paths(mut self, static_paths: StaticPathsEntry) -> Self {
        self.static_paths = Some(static_paths);
        self
    }

    /// Set the SSR props hook.
    #[must_use]
    pub fn ssr_props(mut self, ssr_props: SsrPropsEntry) -> Self {
        self.ssr_props = Some(ssr_props);
        self
    }

    /// Set the layout.
    #[must_use]
    pub fn layout(mut self, layout: LayoutEntry) -> Self {
        self.layout = Some(layout);
        self
    }
}

/// Page modules in registration order.
#[derive(Clone, Debug, Default)]
pub struct PageRegistry {
    modules: Vec<(ModulePath, PageModule)>,
}

impl PageRegistry {
    /// Empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a module (builder form).
    #[must_use]
    pub fn register(mut self, path: impl Into<ModulePath>, module: PageModule) -> Self {
        self.add(path, module);
        self
    }

    /// Register a module.
    pub fn add(&mut self, path: impl Into<ModulePath>, module: PageModule) {
        self.modules.push((path.into(), module));
    }

    /// Number of registered modules.
    #[must_use]
    pub fn len(&self) -> usize {
        self.modules.len()
    }

    /// True when nothing is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.modules.is_empty()
    }

    /// Registered module paths.
    pub fn paths(&self) -> impl Iterator<Item = &ModulePath> {
        self.modules.iter().map(|(path, _)| path)
    }

    pub(crate) fn into_modules(self) -> Vec<(ModulePath, PageModule)> {
        self.modules
    }
}
