// Configuration module entry point
// Built-in defaults only: the server exposes no file, environment or flag surface

mod state;
mod types;

use std::net::SocketAddr;

// Re-export public types
pub use state::AppState;
pub use types::{Config, HttpConfig, LoggingConfig, PerformanceConfig, ServerConfig};

impl Config {
    /// Build the configuration from the compiled-in defaults
    pub fn load() -> Result<Self, config::ConfigError> {
        let settings = config::Config::builder()
            .set_default("server.host", "0.0.0.0")?
            .set_default("server.port", 8000)?
            .set_default("http.index_files", vec!["index.html", "index.htm"])?
            .set_default("performance.keep_alive", true)?
            .set_default("performance.header_read_timeout", 30)?
            .set_default("logging.level", "info")?
            .set_default("logging.access_log", true)?
            .build()?;

        settings.try_deserialize()
    }

    pub fn get_socket_addr(&self) -> Result<SocketAddr, String> {
        format!("{}:{}", self.server.host, self.server.port)
            .parse()
            .map_err(|e| format!("Invalid address: {e}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let cfg = Config::load().unwrap();
        assert_eq!(cfg.server.host, "0.0.0.0");
        assert_eq!(cfg.server.port, 8000);
        assert_eq!(cfg.server.workers, None);
        assert_eq!(cfg.http.index_files, vec!["index.html", "index.htm"]);
        assert!(cfg.performance.keep_alive);
        assert_eq!(cfg.performance.header_read_timeout, 30);
        assert_eq!(cfg.logging.level, "info");
        assert!(cfg.logging.access_log);
    }

    #[test]
    fn test_socket_addr() {
        let cfg = Config::load().unwrap();
        let addr = cfg.get_socket_addr().unwrap();
        assert!(addr.ip().is_unspecified());
        assert_eq!(addr.port(), 8000);
    }

    #[test]
    fn test_invalid_host() {
        let mut cfg = Config::load().unwrap();
        cfg.server.host = "not a host".to_string();
        assert!(cfg.get_socket_addr().is_err());
    }
}
