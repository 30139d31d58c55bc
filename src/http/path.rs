//! Request path translation
//!
//! Maps a URL path onto a path relative to the served root. `..` segments are resolved
//! lexically and can never climb above the root.

use std::borrow::Cow;
use std::path::PathBuf;

/// URL path mapped onto the filesystem
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TranslatedPath {
    /// Path relative to the served root, empty for the root itself
    pub relative: PathBuf,
    /// Whether the URL path ended with `/`
    pub trailing_slash: bool,
}

/// Percent-decode a URL path, replacing invalid UTF-8 sequences
pub fn decode(path: &str) -> String {
    urlencoding::decode(path).map_or_else(
        |_| String::from_utf8_lossy(&urlencoding::decode_binary(path.as_bytes())).into_owned(),
        Cow::into_owned,
    )
}

/// Translate a URL path (query and fragment are ignored) to a root-relative path
///
/// # Examples
/// ```
/// use coi_serve::http::path::translate_path;
/// let t = translate_path("/a/./b/../c%20d/");
/// assert_eq!(t.relative, std::path::PathBuf::from("a/c d"));
/// assert!(t.trailing_slash);
/// ```
pub fn translate_path(url_path: &str) -> TranslatedPath {
    let path = url_path
        .split(['?', '#'])
        .next()
        .unwrap_or_default();
    // Judged before decoding: "/docs%2F" does not end with a slash
    let trailing_slash = path.ends_with('/');
    let decoded = decode(path);

    let mut segments: Vec<&str> = Vec::new();
    for segment in decoded.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                segments.pop();
            }
            // A decoded segment must stay a single path component
            s if s.contains(['\\', '\0']) => {}
            s => segments.push(s),
        }
    }

    TranslatedPath {
        relative: segments.iter().collect(),
        trailing_slash,
    }
}
