//! Logger module
//!
//! Provides logging utilities for the server:
//! - Server lifecycle logging
//! - Per-request access logging in Common Log Format
//! - Error, warning and debug logging
//!
//! Everything is written to stderr. Stdout is reserved for the startup banner.

mod format;

pub use format::AccessLogEntry;

use crate::config::LoggingConfig;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU8, Ordering};

/// Log severity, ordered from most to least severe
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
#[repr(u8)]
pub enum Level {
    Error = 0,
    Warn = 1,
    Info = 2,
    Debug = 3,
}

impl Level {
    /// Parse a level name, case-insensitive
    pub fn parse(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "error" => Some(Self::Error),
            "warn" | "warning" => Some(Self::Warn),
            "info" => Some(Self::Info),
            "debug" | "trace" => Some(Self::Debug),
            _ => None,
        }
    }
}

static MAX_LEVEL: AtomicU8 = AtomicU8::new(Level::Info as u8);

/// Initialize the logger with configuration
///
/// Should be called once at application startup. Unknown level names keep the default (`info`).
pub fn init(config: &LoggingConfig) {
    match Level::parse(&config.level) {
        Some(level) => MAX_LEVEL.store(level as u8, Ordering::Relaxed),
        None => log_warning(&format!(
            "Unknown log level '{}', using 'info'",
            config.level
        )),
    }
}

fn enabled(level: Level) -> bool {
    level as u8 <= MAX_LEVEL.load(Ordering::Relaxed)
}

fn write(level: Level, message: &str) {
    if enabled(level) {
        eprintln!("{message}");
    }
}

/// Print the startup banner on stdout
pub fn print_banner(addr: &SocketAddr) {
    println!("Serving at http://localhost:{}", addr.port());
    println!("Press Ctrl+C to stop");
}

pub fn log_server_start(addr: &SocketAddr, root: &std::path::Path) {
    write(Level::Debug, &format!("[Server] Listening on {addr}"));
    write(Level::Debug, &format!("[Server] Serving {}", root.display()));
}

pub fn log_server_stop() {
    write(Level::Info, "[Server] Shutting down");
}

pub fn log_connection_accepted(peer_addr: &SocketAddr) {
    write(Level::Debug, &format!("[Connection] Accepted from: {peer_addr}"));
}

pub fn log_connection_error(err: &impl std::fmt::Debug) {
    write(Level::Debug, &format!("[Connection] Closed with error: {err:?}"));
}

pub fn log_error(message: &str) {
    write(Level::Error, &format!("[ERROR] {message}"));
}

pub fn log_warning(message: &str) {
    write(Level::Warn, &format!("[WARN] {message}"));
}

pub fn log_signal(name: &str) {
    write(Level::Info, &format!("\n[SIGNAL] {name} received"));
}

/// Log formatted access log entry
pub fn log_access(entry: &AccessLogEntry) {
    write(Level::Info, &entry.format_common());
}

pub fn log_request_rejected(peer_addr: &SocketAddr, status: hyper::StatusCode) {
    write(
        Level::Info,
        &format!("[Request] Rejected malformed request from {peer_addr}: {status}"),
    );
}

pub fn log_bind_failed(addr: &SocketAddr, err: &std::io::Error) {
    log_error(&format!("Failed to bind {addr}: {err}"));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_level() {
        assert_eq!(Level::parse("INFO"), Some(Level::Info));
        assert_eq!(Level::parse("warning"), Some(Level::Warn));
        assert_eq!(Level::parse("trace"), Some(Level::Debug));
        assert_eq!(Level::parse("verbose"), None);
    }

    #[test]
    fn test_level_order() {
        assert!(Level::Error < Level::Warn);
        assert!(Level::Info < Level::Debug);
    }
}
