//! Per-request visit record, published to pages as a provider.

use std::time::Instant;

use lau_pages::{Context, PageError, Provided, Provider, use_request};

/// The visit being served.
pub(crate) struct Visit {
    pub(crate) path: String,
    started: Instant,
}

pub(crate) static VISIT: Context<Visit> = Context::new("visit");

/// Records the request path and logs how long the request took.
pub(crate) fn provider() -> Provider {
    Provider::new(&VISIT, &[], || async {
        let request = use_request()?;
        let path = request.path().to_owned();
        let started = Instant::now();

        let release_path = path.clone();
        Ok::<_, PageError>(Provided::with_release(
            Visit { path, started },
            move || async move {
                tracing::info!(
                    path = %release_path,
                    elapsed_ms = started.elapsed().as_millis(),
                    "Visit finished"
                );
            },
        ))
    })
}
