//! Request and response representation.

use bytes::BytesMut;
use http::{HeaderMap, HeaderValue, Method, StatusCode, Uri, Version};

/// An HTTP request as seen by the core.
///
/// Buffers are kept across [`Request::reset`] so pooled contexts reuse their
/// allocations.
#[derive(Debug, Default)]
pub struct Request {
    pub method: Method,
    pub uri: Uri,
    pub version: Version,
    pub headers: HeaderMap,
    pub body: BytesMut,
}

impl Request {
    /// Path component of the request URI.
    pub fn path(&self) -> &str {
        self.uri.path()
    }

    pub fn query(&self) -> Option<&str> {
        self.uri.query()
    }

    /// First value of the named header, if it is valid UTF-8.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    pub fn body(&self) -> &[u8] {
        &self.body
    }

    pub fn reset(&mut self) {
        self.method = Method::GET;
        self.uri = Uri::default();
        self.version = Version::default();
        self.headers.clear();
        self.body.clear();
    }
}

/// An HTTP response produced by the core.
#[derive(Debug, Default)]
pub struct Response {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: BytesMut,
}

impl Response {
    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn set_status(&mut self, status: StatusCode) {
        self.status = status;
    }

    /// Append a header. Returns `false` if `name` or `value` is not valid.
    pub fn add_header(&mut self, name: &str, value: &str) -> bool {
        match (
            http::header::HeaderName::from_bytes(name.as_bytes()),
            HeaderValue::from_str(value),
        ) {
            (Ok(name), Ok(value)) => {
                self.headers.append(name, value);
                true
            }
            _ => false,
        }
    }

    pub fn body(&self) -> &[u8] {
        &self.body
    }

    /// Replace the body.
    pub fn set_body(&mut self, body: impl AsRef<[u8]>) {
        self.body.clear();
        self.body.extend_from_slice(body.as_ref());
    }

    pub fn reset(&mut self) {
        self.status = StatusCode::OK;
        self.headers.clear();
        self.body.clear();
    }
}

/// Per-request state passed through the core.
#[derive(Debug, Default)]
pub struct RequestContext {
    pub request: Request,
    pub response: Response,
}

impl RequestContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Clear request and response for reuse.
    pub fn reset(&mut self) {
        self.request.reset();
        self.response.reset();
    }
}
