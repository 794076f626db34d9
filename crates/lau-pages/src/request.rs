//! Inbound request as seen by page hooks.

use std::collections::BTreeMap;

use axum::body::Bytes;
use axum::http::{HeaderMap, Method, Uri};

use crate::path::PathParams;

/// Snapshot of an inbound request.
///
/// Built by the host for every dispatch and bound in the request scope, so
/// nested page and provider code can read it through
/// [`use_request`](crate::use_request).
#[derive(Clone, Debug)]
pub struct PageRequest {
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    path_params: PathParams,
    body: Bytes,
    root_path: String,
    request_id: String,
    scheme: Option<String>,
    client_addr: Option<String>,
}

impl PageRequest {
    /// Request with empty headers, parameters and body.
    #[must_use]
    pub fn new(method: Method, uri: Uri) -> Self {
        Self {
            method,
            uri,
            headers: HeaderMap::new(),
            path_params: PathParams::new(),
            body: Bytes::new(),
            root_path: String::new(),
            request_id: String::new(),
            scheme: None,
            client_addr: None,
        }
    }

    /// Attach request headers.
    #[must_use]
    pub fn with_headers(mut self, headers: HeaderMap) -> Self {
        self.headers = headers;
        self
    }

    /// Attach path parameters extracted by the router.
    #[must_use]
    pub fn with_path_params(mut self, path_params: PathParams) -> Self {
        self.path_params = path_params;
        self
    }

    /// Attach the buffered request body.
    #[must_use]
    pub fn with_body(mut self, body: Bytes) -> Self {
        self.body = body;
        self
    }

    /// Attach the path prefix the app is mounted under behind a proxy.
    #[must_use]
    pub fn with_root_path(mut self, root_path: impl Into<String>) -> Self {
        self.root_path = root_path.into();
        self
    }

    /// Attach a request identifier used in logs.
    #[must_use]
    pub fn with_request_id(mut self, request_id: impl Into<String>) -> Self {
        self.request_id = request_id.into();
        self
    }

    /// Attach the client scheme and address (from the socket or proxy headers).
    #[must_use]
    pub fn with_client(mut self, scheme: Option<String>, client_addr: Option<String>) -> Self {
        self.scheme = scheme;
        self.client_addr = client_addr;
        self
    }

    /// HTTP method.
    #[must_use]
    pub fn method(&self) -> &Method {
        &self.method
    }

    /// Request URI.
    #[must_use]
    pub fn uri(&self) -> &Uri {
        &self.uri
    }

    /// Request path.
    #[must_use]
    pub fn path(&self) -> &str {
        self.uri.path()
    }

    /// Request headers.
    #[must_use]
    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// All path parameters.
    #[must_use]
    pub fn path_params(&self) -> &PathParams {
        &self.path_params
    }

    /// Single path parameter.
    #[must_use]
    pub fn path_param(&self, name: &str) -> Option<&str> {
        self.path_params.get(name).map(String::as_str)
    }

    /// Query string parameters (first value wins for repeated keys).
    #[must_use]
    pub fn query_params(&self) -> BTreeMap<String, String> {
        let pairs: Vec<(String, String)> = self
            .uri
            .query()
            .and_then(|q| serde_urlencoded::from_str(q).ok())
            .unwrap_or_default();

        let mut params = BTreeMap::new();
        for (key, value) in pairs {
            params.entry(key).or_insert(value);
        }
        params
    }

    /// Single query parameter.
    #[must_use]
    pub fn query_param(&self, name: &str) -> Option<String> {
        self.query_params().remove(name)
    }

    /// Raw request body.
    #[must_use]
    pub fn body(&self) -> &Bytes {
        &self.body
    }

    /// Body parsed as `application/x-www-form-urlencoded`.
    #[must_use]
    pub fn form(&self) -> FormData {
        FormData::parse(&self.body)
    }

    /// Path prefix the app is mounted under (empty when none).
    #[must_use]
    pub fn root_path(&self) -> &str {
        &self.root_path
    }

    /// Request identifier.
    #[must_use]
    pub fn request_id(&self) -> &str {
        &self.request_id
    }

    /// Client scheme (`http`/`https`), if known.
    #[must_use]
    pub fn scheme(&self) -> Option<&str> {
        self.scheme.as_deref()
    }

    /// Client address, if known.
    #[must_use]
    pub fn client_addr(&self) -> Option<&str> {
        self.client_addr.as_deref()
    }
}

/// Submitted form fields in submission order.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct FormData {
    fields: Vec<(String, String)>,
}

impl FormData {
    /// Parse an urlencoded body. Undecodable input yields an empty form.
    #[must_use]
    pub fn parse(body: &[u8]) -> Self {
        let fields = serde_urlencoded::from_bytes(body).unwrap_or_default();
        Self { fields }
    }

    /// First value for a field.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_str())
    }

    /// Every value for a field.
    pub fn get_all<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a str> + 'a {
        self.fields
            .iter()
            .filter(move |(n, _)| n == name)
            .map(|(_, v)| v.as_str())
    }

    /// True when no fields were submitted.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for FormData {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            fields: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}
