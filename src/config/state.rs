// Application state module
// Read-only state shared by every connection

use std::io;
use std::path::{Path, PathBuf};

use super::types::Config;

/// Application state
pub struct AppState {
    pub config: Config,
    /// Canonical path of the served root
    pub root: PathBuf,
}

impl AppState {
    /// Create `AppState` serving `root`; the root must exist
    pub fn new(config: Config, root: &Path) -> io::Result<Self> {
        Ok(Self {
            config,
            root: root.canonicalize()?,
        })
    }

    /// Serve the process's current working directory
    pub fn from_current_dir(config: Config) -> io::Result<Self> {
        Self::new(config, &std::env::current_dir()?)
    }
}
