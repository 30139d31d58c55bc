//! Local static file server for cross-origin isolated pages
//!
//! Serves the working directory over HTTP/1.1 on port 8000 and adds
//! `Cross-Origin-Opener-Policy: same-origin`, `Cross-Origin-Embedder-Policy: require-corp` and
//! `Access-Control-Allow-Origin: *` to every response.

pub mod config;
pub mod handler;
pub mod http;
pub mod logger;
pub mod server;
