//! Security headers applied to every response.
//!
//! No Content-Security-Policy is set: pages own their markup, and an
//! application that wants one adds it through [`Site::customize`](crate::Site::customize).

use axum::http::HeaderValue;
use axum::http::header::{HeaderName, REFERRER_POLICY, X_CONTENT_TYPE_OPTIONS, X_FRAME_OPTIONS};
use tower::layer::util::{Identity, Stack};
use tower_http::set_header::SetResponseHeaderLayer;

type HeaderLayer = SetResponseHeaderLayer<HeaderValue>;

pub(crate) type SecurityLayers =
    Stack<HeaderLayer, Stack<HeaderLayer, Stack<HeaderLayer, Identity>>>;

/// `nosniff` always wins; frame and referrer policies set by a page are kept.
pub(crate) fn security_headers() -> SecurityLayers {
    let layer = |name: HeaderName, value: &'static str, force: bool| {
        let value = HeaderValue::from_static(value);
        if force {
            SetResponseHeaderLayer::overriding(name, value)
        } else {
            SetResponseHeaderLayer::if_not_present(name, value)
        }
    };

    Stack::new(
        layer(REFERRER_POLICY, "strict-origin-when-cross-origin", false),
        Stack::new(
            layer(X_FRAME_OPTIONS, "SAMEORIGIN", false),
            Stack::new(layer(X_CONTENT_TYPE_OPTIONS, "nosniff", true), Identity::new()),
        ),
    )
}
