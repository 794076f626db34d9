//! Example Lau application.
//!
//! ```text
//! cargo run -p lau-demo -- dev
//! cargo run -p lau-demo -- build --target dist
//! ```

mod pages;
mod visit;

use std::process::ExitCode;

use lau::Site;

fn site() -> Site {
    Site::new(pages::registry())
        .provider(visit::provider())
        .rpc(pages::form::on_submit())
        .error_handler(404, pages::not_found())
}

fn main() -> ExitCode {
    lau::run_cli(site)
}

#[cfg(test)]
mod tests {
    use axum::body::{Body, to_bytes};
    use axum::http::{Request, StatusCode};
    use lau::Site;
    use pretty_assertions::assert_eq;
    use tower::ServiceExt;

    async fn get(site: Site, uri: &str) -> (StatusCode, String) {
        let app = site.into_app(&lau::ServerConfig::default()).unwrap();
        let response = app
            .router()
            .clone()
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, String::from_utf8(body.to_vec()).unwrap())
    }

    #[tokio::test]
    async fn test_greet_page() {
        let (status, body) = get(super::site(), "/greet/ren").await;
        assert_eq!(status, StatusCode::OK);
        assert!(body.contains("<p>Hello ren! (I'm from props!)</p>"));
    }

    #[tokio::test]
    async fn test_home_page_shows_visit() {
        let (status, body) = get(super::site(), "/").await;
        assert_eq!(status, StatusCode::OK);
        assert!(body.contains("You are visiting /"));
    }

    #[tokio::test]
    async fn test_not_found_page() {
        let (status, body) = get(super::site(), "/missing").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert!(body.contains("Nothing at /missing"));
    }
}
