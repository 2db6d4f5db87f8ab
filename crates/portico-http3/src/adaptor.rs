//! Conversions between `http` types and portico's request context.

use http::header::{self, HeaderName, HeaderValue};
use portico_core::{Request, Response};

/// Header fields HTTP/3 forbids (RFC 9114, section 4.2).
const CONNECTION_SPECIFIC: [HeaderName; 5] = [
    header::CONNECTION,
    HeaderName::from_static("keep-alive"),
    HeaderName::from_static("proxy-connection"),
    header::TRANSFER_ENCODING,
    header::UPGRADE,
];

/// Copy method, URI, version and headers of `src` into `dst`.
///
/// HTTP/3 carries the host in the `:authority` pseudo-header; it is exposed
/// as a `host` header when the request has none.
pub fn copy_request_head(src: &http::Request<()>, dst: &mut Request) {
    dst.method = src.method().clone();
    dst.uri = src.uri().clone();
    dst.version = src.version();
    for (name, value) in src.headers() {
        dst.headers.append(name.clone(), value.clone());
    }

    if !dst.headers.contains_key(header::HOST) {
        if let Some(value) = src
            .uri()
            .authority()
            .and_then(|authority| HeaderValue::from_str(authority.as_str()).ok())
        {
            dst.headers.insert(header::HOST, value);
        }
    }
}

/// Build the response head for `src`, leaving out connection-specific
/// headers.
pub fn response_head(src: &Response) -> http::Response<()> {
    let mut head = http::Response::new(());
    *head.status_mut() = src.status;
    for (name, value) in &src.headers {
        if !CONNECTION_SPECIFIC.contains(name) {
            head.headers_mut().append(name.clone(), value.clone());
        }
    }
    head
}
