//! Access log format module
//!
//! Common Log Format:
//! `$remote_addr - - [$time_local] "$request" $status $body_bytes_sent`

use chrono::Local;
use hyper::{Request, Response, Version};
use std::net::SocketAddr;

/// Access log entry containing request/response information
#[derive(Debug, Clone)]
pub struct AccessLogEntry {
    /// Client IP address
    pub remote_addr: String,
    /// Request timestamp
    pub time: chrono::DateTime<Local>,
    /// HTTP method (GET, HEAD, ...)
    pub method: String,
    /// Request URI (path and query)
    pub uri: String,
    /// HTTP version (1.0, 1.1)
    pub http_version: String,
    /// Response status code
    pub status: u16,
    /// Response body size in bytes, `None` when unknown
    pub body_bytes: Option<u64>,
}

impl AccessLogEntry {
    /// Start an entry for an incoming request, timestamped now
    pub fn from_request<B>(peer_addr: &SocketAddr, req: &Request<B>) -> Self {
        Self {
            remote_addr: peer_addr.ip().to_string(),
            time: Local::now(),
            method: req.method().to_string(),
            uri: req
                .uri()
                .path_and_query()
                .map_or_else(|| req.uri().path().to_string(), ToString::to_string),
            http_version: version_label(req.version()).to_string(),
            status: 0,
            body_bytes: None,
        }
    }

    /// Record the outcome of the request
    pub fn finish<B>(&mut self, resp: &Response<B>) {
        self.status = resp.status().as_u16();
        self.body_bytes = resp
            .headers()
            .get("content-length")
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.parse().ok());
    }

    /// Common Log Format (CLF)
    pub fn format_common(&self) -> String {
        format!(
            "{} - - [{}] \"{} {} HTTP/{}\" {} {}",
            self.remote_addr,
            self.time.format("%d/%b/%Y:%H:%M:%S %z"),
            self.method,
            self.uri,
            self.http_version,
            self.status,
            self.body_bytes
                .map_or_else(|| "-".to_string(), |n| n.to_string()),
        )
    }
}

fn version_label(version: Version) -> &'static str {
    match version {
        Version::HTTP_09 => "0.9",
        Version::HTTP_10 => "1.0",
        Version::HTTP_2 => "2",
        Version::HTTP_3 => "3",
        _ => "1.1",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create_test_entry() -> AccessLogEntry {
        let req = Request::builder()
            .method("GET")
            .uri("/docs/index.html?lang=en")
            .version(Version::HTTP_10)
            .body(())
            .unwrap();
        let peer: SocketAddr = "192.168.1.1:51000".parse().unwrap();
        AccessLogEntry::from_request(&peer, &req)
    }

    #[test]
    fn test_format_common() {
        let mut entry = create_test_entry();
        let resp = Response::builder()
            .status(200)
            .header("Content-Length", 1234)
            .body(())
            .unwrap();
        entry.finish(&resp);

        let log = entry.format_common();
        assert!(log.starts_with("192.168.1.1 - - ["));
        assert!(log.contains("\"GET /docs/index.html?lang=en HTTP/1.0\""));
        assert!(log.ends_with("200 1234"));
    }

    #[test]
    fn test_unknown_size() {
        let mut entry = create_test_entry();
        let resp = Response::builder().status(304).body(()).unwrap();
        entry.finish(&resp);
        assert!(entry.format_common().ends_with("304 -"));
    }
}
