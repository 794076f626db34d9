//! HTTP request handlers.

pub(crate) mod errors;
pub(crate) mod pages;

use std::net::SocketAddr;

use axum::body::to_bytes;
use axum::extract::{ConnectInfo, Request};
use axum::http::HeaderMap;
use lau_pages::{PageRequest, PathParams};
use uuid::Uuid;

use crate::error::ServerError;
use crate::state::RequestSettings;

/// Largest request body read into a page request.
pub(crate) const MAX_BODY_BYTES: usize = 2 * 1024 * 1024;

/// Snapshot an inbound request for the page pipeline.
pub(crate) async fn page_request(
    settings: &RequestSettings,
    request: Request,
    path_params: PathParams,
) -> Result<PageRequest, ServerError> {
    let (parts, body) = request.into_parts();
    let body = to_bytes(body, MAX_BODY_BYTES)
        .await
        .map_err(|e| ServerError::Body(e.to_string()))?;

    let peer = parts
        .extensions
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| *addr);
    let (scheme, client_addr) = client_info(&parts.headers, peer, settings.proxy_headers);

    Ok(PageRequest::new(parts.method, parts.uri)
        .with_headers(parts.headers)
        .with_path_params(path_params)
        .with_body(body)
        .with_root_path(settings.root_path.clone())
        .with_request_id(Uuid::new_v4().to_string())
        .with_client(scheme, client_addr))
}

/// Client scheme and address, from `X-Forwarded-*` headers when trusted and
/// present, otherwise from the socket.
fn client_info(
    headers: &HeaderMap,
    peer: Option<SocketAddr>,
    proxy_headers: bool,
) -> (Option<String>, Option<String>) {
    let mut scheme = Some("http".to_string());
    let mut client_addr = peer.map(|addr| addr.to_string());

    if proxy_headers {
        if let Some(proto) = first_forwarded(headers, "x-forwarded-proto") {
            scheme = Some(proto.to_ascii_lowercase());
        }
        if let Some(client) = first_forwarded(headers, "x-forwarded-for") {
            client_addr = Some(client.to_string());
        }
    }

    (scheme, client_addr)
}

/// First comma-separated entry of a forwarding header.
fn first_forwarded<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get(name)?
        .to_str()
        .ok()?
        .split(',')
        .map(str::trim)
        .find(|value| !value.is_empty())
}

#[cfg(test)]
mod tests {
    use axum::body::Body;
    use axum::http::{HeaderValue, Request as HttpRequest};
    use lau_pages::params;
    use pretty_assertions::assert_eq;

    use super::*;

    fn peer() -> Option<SocketAddr> {
        Some("10.0.0.5:51000".parse().unwrap())
    }

    fn forwarded_headers() -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert("x-forwarded-proto", HeaderValue::from_static("HTTPS"));
        headers.insert(
            "x-forwarded-for",
            HeaderValue::from_static("203.0.113.7, 10.0.0.1"),
        );
        headers
    }

    #[test]
    fn test_client_info_from_socket() {
        let (scheme, client) = client_info(&HeaderMap::new(), peer(), true);
        assert_eq!(scheme.as_deref(), Some("http"));
        assert_eq!(client.as_deref(), Some("10.0.0.5:51000"));
    }

    #[test]
    fn test_client_info_trusts_proxy_headers() {
        let (scheme, client) = client_info(&forwarded_headers(), peer(), true);
        assert_eq!(scheme.as_deref(), Some("https"));
        assert_eq!(client.as_deref(), Some("203.0.113.7"));
    }

    #[test]
    fn test_client_info_ignores_proxy_headers_when_disabled() {
        let (scheme, client) = client_info(&forwarded_headers(), peer(), false);
        assert_eq!(scheme.as_deref(), Some("http"));
        assert_eq!(client.as_deref(), Some("10.0.0.5:51000"));
    }

    #[tokio::test]
    async fn test_page_request_snapshot() {
        let settings = RequestSettings {
            root_path: "/app".to_string(),
            proxy_headers: true,
            debug: false,
        };
        let request = HttpRequest::builder()
            .method("POST")
            .uri("/greet/ren?x=1")
            .body(Body::from("name=Ren"))
            .unwrap();

        let page = page_request(&settings, request, params([("username", "ren")]))
            .await
            .unwrap();

        assert_eq!(page.path(), "/greet/ren");
        assert_eq!(page.path_param("username"), Some("ren"));
        assert_eq!(page.form().get("name"), Some("Ren"));
        assert_eq!(page.root_path(), "/app");
        assert!(!page.request_id().is_empty());
        assert_eq!(page.client_addr(), None);
    }

    #[tokio::test]
    async fn test_page_request_body_limit() {
        let request = HttpRequest::builder()
            .uri("/")
            .body(Body::from(vec![b'a'; MAX_BODY_BYTES + 1]))
            .unwrap();

        let err = page_request(&RequestSettings::default(), request, PathParams::new())
            .await
            .unwrap_err();
        assert!(matches!(err, ServerError::Body(_)));
    }
}
