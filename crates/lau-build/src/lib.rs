//! Static site generation for Lau page applications.
//!
//! Renders every route of an [`App`](lau_server::App) through its own router
//! and writes the results as `<target>/<url>/index.html`.
//!
//! # Example
//!
//! ```ignore
//! use std::path::Path;
//! use lau_build::StaticSiteBuilder;
//!
//! let report = StaticSiteBuilder::new(&app).build(Path::new("dist")).await?;
//! println!("{} pages", report.pages.len());
//! ```

mod builder;

pub use builder::{
    BuildError, BuildEvent, BuildReport, BuiltPage, SkippedRoute, StaticSiteBuilder,
};
