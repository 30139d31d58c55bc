//! Request handler module
//!
//! Maps requests onto the served root: method validation, path resolution, file and
//! directory listing responses.

pub mod listing;
pub mod router;
pub mod static_files;

// Re-export main entry point
pub use router::handle_request;
