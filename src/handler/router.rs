//! Request dispatch module
//!
//! Entry point for HTTP request processing: method validation, then static file serving.

use crate::config::AppState;
use crate::handler::static_files;
use crate::http::{self, ResponseBody};
use crate::logger;
use hyper::{Method, Request, Response};
use std::convert::Infallible;
use std::sync::Arc;

/// Request context encapsulating information needed for request processing
#[derive(Debug, Clone)]
pub struct RequestContext {
    /// Raw (still percent-encoded) URL path
    pub path: String,
    pub query: Option<String>,
    pub is_head: bool,
    pub if_modified_since: Option<String>,
    pub if_none_match: Option<String>,
}

impl RequestContext {
    pub fn from_request<B>(req: &Request<B>) -> Self {
        let header = |name: &str| {
            req.headers()
                .get(name)
                .and_then(|v| v.to_str().ok())
                .map(ToString::to_string)
        };

        Self {
            path: req.uri().path().to_string(),
            query: req.uri().query().map(ToString::to_string),
            is_head: req.method() == Method::HEAD,
            if_modified_since: header("if-modified-since"),
            if_none_match: header("if-none-match"),
        }
    }
}

/// Main entry point for HTTP request handling
///
/// The request body is never read.
pub async fn handle_request<B>(
    req: Request<B>,
    state: Arc<AppState>,
) -> Result<Response<ResponseBody>, Infallible> {
    if let Some(resp) = check_http_method(req.method()) {
        return Ok(resp);
    }

    let ctx = RequestContext::from_request(&req);
    drop(req);

    Ok(static_files::serve(&ctx, &state).await)
}

/// Only GET and HEAD are served
fn check_http_method(method: &Method) -> Option<Response<ResponseBody>> {
    match *method {
        Method::GET | Method::HEAD => None,
        _ => {
            logger::log_warning(&format!("Unsupported method: {method}"));
            Some(http::build_501_response(method.as_str()))
        }
    }
}
