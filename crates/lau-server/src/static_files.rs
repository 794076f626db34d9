//! Static file serving.

use std::path::Path;

use tower_http::services::ServeDir;

/// URL prefix static files are mounted under.
pub(crate) const STATIC_PREFIX: &str = "/static";

/// File service for the static directory, if it exists.
pub(crate) fn static_service(dir: &Path) -> Option<ServeDir> {
    if dir.is_dir() {
        tracing::debug!(dir = %dir.display(), prefix = STATIC_PREFIX, "Serving static files");
        Some(ServeDir::new(dir))
    } else {
        tracing::debug!(dir = %dir.display(), "No static directory, skipping mount");
        None
    }
}
