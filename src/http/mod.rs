//! HTTP protocol layer module
//!
//! Protocol-level helpers decoupled from the file-serving logic: path translation,
//! content types, cache validation, response bodies and builders and the isolation header decorator.

pub mod body;
pub mod cache;
pub mod isolation;
pub mod mime;
pub mod path;
pub mod response;

// Re-export commonly used items
pub use body::ResponseBody;
pub use isolation::isolate;
pub use response::{
    build_304_response, build_403_response, build_404_response, build_501_response,
    build_redirect_response,
};
