use crate::http::HttpMethod;
use crate::http::body::RequestBody;
use crate::http::headers::HttpHeaders;

/// Common HTTP request headers
/// This enum defines the set of headers that can be explicitly set on an
/// [`HttpRequest`] through its safe wrapper API.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestHeader {
    Host,
    ContentLength,
    ContentType,
    TransferEncoding,
}

#[derive(Debug)]
pub struct HttpRequest {
    pub method: HttpMethod,
    pub uri: String,
    /// The URI as received, when a router rewrote [`uri`](Self::uri) for a mounted handler.
    pub original_uri: Option<String>,
    pub http_version: (u8, u8),

    // headers
    pub headers: HttpHeaders,
    pub body: RequestBody,
}

/// Owned copy of a request's head, detached from its body.
#[derive(Debug, Clone, PartialEq)]
pub struct RequestHead {
    pub method: HttpMethod,
    pub uri: String,
    pub http_version: (u8, u8),
    pub headers: HttpHeaders,
}

impl HttpRequest {
    pub fn new() -> Self {
        Self {
            method: HttpMethod::Unknown,
            uri: String::new(),
            original_uri: None,
            http_version: (1, 1),
            headers: HttpHeaders::new(),
            body: RequestBody::empty(),
        }
    }

    /// Shorthand for a bodiless request, mostly useful in tests.
    pub fn with_target(method: HttpMethod, uri: &str) -> Self {
        let mut req = Self::new();
        req.method = method;
        req.uri = uri.to_string();
        req
    }

    /// Sets a request header constrained to the allowed [`RequestHeader`] variants.
    ///
    /// No validation is performed on the header value itself.
    pub fn set_header(&mut self, h: RequestHeader, value: &str) {
        let name = match h {
            RequestHeader::ContentLength => "Content-Length",
            RequestHeader::ContentType => "Content-Type",
            RequestHeader::Host => "Host",
            RequestHeader::TransferEncoding => "Transfer-Encoding",
        };

        self.headers.set_raw(name, value);
    }

    /// Declared body length, if the header is present and well formed.
    pub fn content_length(&self) -> Option<u64> {
        self.headers
            .get("Content-Length")
            .and_then(|v| v.trim().parse().ok())
    }

    /// Path component of the URI the client originally asked for.
    ///
    /// Query string and fragment are excluded, and absolute-form targets
    /// (`http://host/path`) are reduced to their path. Returns `None` when
    /// there is no path to report.
    pub fn original_path(&self) -> Option<&str> {
        let uri = self.original_uri.as_deref().unwrap_or(&self.uri);
        let uri = uri.split(['?', '#']).next().unwrap_or_default();

        let path = match uri.split_once("://") {
            Some((_, rest)) => rest.find('/').map(|i| &rest[i..]).unwrap_or("/"),
            None => uri,
        };

        if path.is_empty() { None } else { Some(path) }
    }

    pub fn head(&self) -> RequestHead {
        RequestHead {
            method: self.method.clone(),
            uri: self.original_uri.clone().unwrap_or_else(|| self.uri.clone()),
            http_version: self.http_version,
            headers: self.headers.clone(),
        }
    }
}

impl Default for HttpRequest {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn original_path_strips_query_and_fragment() {
        let req = HttpRequest::with_target(HttpMethod::Get, "/foo/bar?x=1#frag");
        assert_eq!(req.original_path(), Some("/foo/bar"));
    }

    #[test]
    fn original_path_prefers_original_uri() {
        let mut req = HttpRequest::with_target(HttpMethod::Get, "/bar");
        req.original_uri = Some("/mount/bar".to_string());
        assert_eq!(req.original_path(), Some("/mount/bar"));
    }

    #[test]
    fn original_path_of_absolute_form() {
        let req = HttpRequest::with_target(HttpMethod::Get, "http://example.com/a/b?c");
        assert_eq!(req.original_path(), Some("/a/b"));

        let req = HttpRequest::with_target(HttpMethod::Get, "http://example.com");
        assert_eq!(req.original_path(), Some("/"));
    }

    #[test]
    fn missing_path() {
        assert_eq!(HttpRequest::new().original_path(), None);
        assert_eq!(HttpRequest::with_target(HttpMethod::Get, "?only=query").original_path(), None);
    }
}
