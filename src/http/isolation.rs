//! Cross-origin isolation headers
//!
//! Every response leaves the server carrying `Cross-Origin-Opener-Policy`,
//! `Cross-Origin-Embedder-Policy` and `Access-Control-Allow-Origin`. The headers are applied
//! last, after the file-serving handler has built the rest of the response.

use hyper::header::{HeaderMap, HeaderName, HeaderValue};
use hyper::Response;

/// The fixed header set as (lowercase name, value), in wire order
pub const ISOLATION_HEADERS: [(&str, &str); 3] = [
    ("cross-origin-opener-policy", "same-origin"),
    ("cross-origin-embedder-policy", "require-corp"),
    ("access-control-allow-origin", "*"),
];

/// Set the isolation headers on `headers`, replacing any earlier value so each appears once
pub fn apply(headers: &mut HeaderMap) {
    for (name, value) in ISOLATION_HEADERS {
        headers.insert(
            HeaderName::from_static(name),
            HeaderValue::from_static(value),
        );
    }
}

/// Decorate a finished response with the isolation headers
pub fn isolate<B>(mut response: Response<B>) -> Response<B> {
    apply(response.headers_mut());
    response
}
