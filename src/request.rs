//! Incoming HTTP request type.

use std::collections::HashMap;
use std::sync::Arc;

use bytes::Bytes;
use http::{HeaderMap, Method, Uri, Version};

/// An incoming HTTP request with its body fully read and its route resolved.
pub struct Request {
    pub(crate) method: Method,
    pub(crate) uri: Uri,
    pub(crate) version: Version,
    pub(crate) request_uri: String,
    pub(crate) headers: HeaderMap,
    pub(crate) body: Bytes,
    pub(crate) params: HashMap<String, String>,
    pub(crate) route_template: Option<Arc<str>>,
}

impl Request {
    pub(crate) fn new(
        method: Method,
        uri: Uri,
        version: Version,
        headers: HeaderMap,
        body: Bytes,
    ) -> Self {
        let request_uri = request_target(&uri, version);
        Self {
            method,
            uri,
            version,
            request_uri,
            headers,
            body,
            params: HashMap::new(),
            route_template: None,
        }
    }

    pub(crate) fn with_route(
        mut self,
        template: Option<Arc<str>>,
        params: HashMap<String, String>,
    ) -> Self {
        self.route_template = template;
        self.params = params;
        self
    }

    /// The method exactly as received, e.g. `"GET"` or a custom `"Purge"`.
    pub fn method(&self) -> &str { self.method.as_str() }
    pub fn uri(&self) -> &Uri { &self.uri }
    pub fn version(&self) -> Version { self.version }
    /// The unmodified request target, e.g. `/items/42?full=1`.
    pub fn request_uri(&self) -> &str { &self.request_uri }
    pub fn headers(&self) -> &HeaderMap { &self.headers }
    pub fn body(&self) -> &[u8] { &self.body }

    /// Header lookup. Names are case-insensitive; non-UTF-8 values read as `None`.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    /// Returns a named path parameter.
    ///
    /// For a route `/items/{id}`, `req.param("id")` on `/items/42` returns `Some("42")`.
    pub fn param(&self, key: &str) -> Option<&str> {
        self.params.get(key).map(String::as_str)
    }

    /// The template of the route that matched this request, e.g. `/items/{id}`.
    ///
    /// `None` when no registered route matched and the router's fallback
    /// handler is serving the request.
    pub fn route_template(&self) -> Option<&str> {
        self.route_template.as_deref()
    }
}

/// The request target as the client sent it.
///
/// HTTP/1 keeps origin-form as path plus query and absolute-form whole.
/// HTTP/2 carries the target in `:path` (`:authority` for CONNECT), while
/// hyper rebuilds an absolute URI from the pseudo-headers, so only the path
/// and query count there.
fn request_target(uri: &Uri, version: Version) -> String {
    let pseudo_headers = version >= Version::HTTP_2;
    match (uri.path_and_query(), uri.scheme()) {
        (Some(pq), None) => pq.as_str().to_owned(),
        (Some(pq), Some(_)) if pseudo_headers => pq.as_str().to_owned(),
        (None, _) if pseudo_headers => {
            uri.authority().map(|a| a.as_str().to_owned()).unwrap_or_default()
        }
        _ => uri.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn target(uri: &str, version: Version) -> String {
        let uri = uri.parse().unwrap();
        let req = Request::new(Method::GET, uri, version, HeaderMap::new(), Bytes::new());
        req.request_uri().to_owned()
    }

    #[test]
    fn origin_form_keeps_path_and_query() {
        assert_eq!(target("/items/42?full=1", Version::HTTP_11), "/items/42?full=1");
    }

    #[test]
    fn http1_absolute_form_is_kept_whole() {
        assert_eq!(
            target("http://example.com/items/42?full=1", Version::HTTP_11),
            "http://example.com/items/42?full=1",
        );
    }

    #[test]
    fn http2_target_is_the_path_not_the_rebuilt_uri() {
        assert_eq!(
            target("https://example.com/missing?q=1", Version::HTTP_2),
            "/missing?q=1",
        );
    }

    #[test]
    fn http2_connect_target_is_the_authority() {
        let req = Request::new(
            Method::CONNECT,
            "example.com:443".parse().unwrap(),
            Version::HTTP_2,
            HeaderMap::new(),
            Bytes::new(),
        );
        assert_eq!(req.request_uri(), "example.com:443");
    }
}
