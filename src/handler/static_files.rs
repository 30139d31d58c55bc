//! Static file serving module
//!
//! Resolves request paths against the served root and builds file, listing, redirect and
//! error responses.

use crate::config::AppState;
use crate::handler::listing;
use crate::handler::router::RequestContext;
use crate::http::{self, cache, mime, path, ResponseBody};
use crate::logger;
use hyper::Response;
use std::path::{Path, PathBuf};
use std::time::SystemTime;
use tokio::fs;

/// Outcome of mapping a URL path onto the served root
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolved {
    /// Regular file to send
    File(PathBuf),
    /// Directory without an index file
    Listing(PathBuf),
    /// Directory requested without a trailing slash
    RedirectToSlash,
    NotFound,
    /// Target lies outside the served root
    Forbidden,
}

/// Serve a GET or HEAD request from the served root
pub async fn serve(ctx: &RequestContext, state: &AppState) -> Response<ResponseBody> {
    match resolve(&state.root, &ctx.path, &state.config.http.index_files).await {
        Resolved::File(file) => serve_file(ctx, &file).await,
        Resolved::Listing(dir) => serve_listing(ctx, &dir).await,
        Resolved::RedirectToSlash => {
            let location = match &ctx.query {
                Some(query) => format!("{}/?{query}", ctx.path),
                None => format!("{}/", ctx.path),
            };
            http::build_redirect_response(&location)
        }
        Resolved::NotFound => http::build_404_response("File not found", ctx.is_head),
        Resolved::Forbidden => http::build_403_response(ctx.is_head),
    }
}

/// Map `url_path` onto `root` (which must be canonical)
///
/// Directories resolve to the first existing entry of `index_files`, otherwise to a listing.
pub async fn resolve(root: &Path, url_path: &str, index_files: &[String]) -> Resolved {
    let translated = path::translate_path(url_path);
    let target = root.join(&translated.relative);

    let Ok(meta) = fs::metadata(&target).await else {
        return Resolved::NotFound;
    };
    if let Err(outcome) = confine(root, &target, url_path).await {
        return outcome;
    }

    if !meta.is_dir() {
        // "/file.txt/" names a directory that does not exist
        if translated.trailing_slash {
            return Resolved::NotFound;
        }
        return Resolved::File(target);
    }

    if !translated.trailing_slash {
        return Resolved::RedirectToSlash;
    }

    for index in index_files {
        let candidate = target.join(index);
        if fs::metadata(&candidate).await.is_ok_and(|m| m.is_file()) {
            if let Err(outcome) = confine(root, &candidate, url_path).await {
                return outcome;
            }
            return Resolved::File(candidate);
        }
    }

    Resolved::Listing(target)
}

/// Reject paths whose canonical form escapes the root (symlinks)
async fn confine(root: &Path, target: &Path, url_path: &str) -> Result<(), Resolved> {
    let Ok(canonical) = fs::canonicalize(target).await else {
        return Err(Resolved::NotFound);
    };
    if canonical.starts_with(root) {
        Ok(())
    } else {
        logger::log_warning(&format!(
            "Path traversal attempt blocked: {} -> {}",
            url_path,
            canonical.display()
        ));
        Err(Resolved::Forbidden)
    }
}

async fn serve_file(ctx: &RequestContext, file: &Path) -> Response<ResponseBody> {
    let handle = match fs::File::open(file).await {
        Ok(handle) => handle,
        Err(e) => {
            logger::log_error(&format!("Failed to open file '{}': {}", file.display(), e));
            return http::build_404_response("File not found", ctx.is_head);
        }
    };
    let Ok(meta) = handle.metadata().await else {
        return http::build_404_response("File not found", ctx.is_head);
    };
    let modified = meta.modified().unwrap_or_else(|_| SystemTime::now());

    if cache::is_not_modified(
        ctx.if_modified_since.as_deref(),
        ctx.if_none_match.as_deref(),
        modified,
    ) {
        return http::build_304_response();
    }

    http::response::build_file_response(
        handle,
        meta.len(),
        mime::guess_type(file),
        &cache::format_http_date(modified),
        ctx.is_head,
    )
}

async fn serve_listing(ctx: &RequestContext, dir: &Path) -> Response<ResponseBody> {
    match listing::read_entries(dir).await {
        Ok(entries) => {
            let html = listing::render(&path::decode(&ctx.path), &entries);
            http::response::build_html_response(html, ctx.is_head)
        }
        Err(e) => {
            logger::log_warning(&format!("Cannot list '{}': {}", dir.display(), e));
            http::build_404_response("No permission to list directory", ctx.is_head)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs as stdfs;

    fn index_files() -> Vec<String> {
        vec!["index.html".to_string(), "index.htm".to_string()]
    }

    /// Canonical temp root with a small tree
    fn fixture() -> (tempfile::TempDir, PathBuf) {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().canonicalize().unwrap();
        stdfs::write(root.join("page.html"), b"<p>hi</p>").unwrap();
        stdfs::create_dir(root.join("site")).unwrap();
        stdfs::write(root.join("site").join("index.htm"), b"site").unwrap();
        stdfs::create_dir(root.join("assets")).unwrap();
        stdfs::write(root.join("assets").join("logo.svg"), b"<svg/>").unwrap();
        (dir, root)
    }

    #[tokio::test]
    async fn test_resolve_file() {
        let (_dir, root) = fixture();
        assert_eq!(
            resolve(&root, "/page.html", &index_files()).await,
            Resolved::File(root.join("page.html"))
        );
    }

    #[tokio::test]
    async fn test_resolve_file_with_trailing_slash() {
        let (_dir, root) = fixture();
        assert_eq!(
            resolve(&root, "/page.html/", &index_files()).await,
            Resolved::NotFound
        );
    }

    #[tokio::test]
    async fn test_resolve_index_file() {
        let (_dir, root) = fixture();
        assert_eq!(
            resolve(&root, "/site/", &index_files()).await,
            Resolved::File(root.join("site").join("index.htm"))
        );
    }

    #[tokio::test]
    async fn test_resolve_listing() {
        let (_dir, root) = fixture();
        assert_eq!(
            resolve(&root, "/assets/", &index_files()).await,
            Resolved::Listing(root.join("assets"))
        );
        assert_eq!(
            resolve(&root, "/", &index_files()).await,
            Resolved::Listing(root.clone())
        );
    }

    #[tokio::test]
    async fn test_resolve_redirect() {
        let (_dir, root) = fixture();
        assert_eq!(
            resolve(&root, "/assets", &index_files()).await,
            Resolved::RedirectToSlash
        );
        assert_eq!(
            resolve(&root, "/assets%2F", &index_files()).await,
            Resolved::RedirectToSlash
        );
    }

    #[tokio::test]
    async fn test_resolve_missing() {
        let (_dir, root) = fixture();
        assert_eq!(
            resolve(&root, "/missing.js", &index_files()).await,
            Resolved::NotFound
        );
    }

    #[tokio::test]
    async fn test_resolve_traversal_stays_in_root() {
        let (_dir, root) = fixture();
        assert_eq!(
            resolve(&root, "/../../etc/passwd", &index_files()).await,
            Resolved::NotFound
        );
        assert_eq!(
            resolve(&root, "/assets/../../page.html", &index_files()).await,
            Resolved::File(root.join("page.html"))
        );
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_resolve_symlink_escape() {
        let (_dir, root) = fixture();
        let outside = tempfile::tempdir().unwrap();
        stdfs::write(outside.path().join("secret.txt"), b"secret").unwrap();
        std::os::unix::fs::symlink(outside.path().join("secret.txt"), root.join("leak.txt"))
            .unwrap();
        std::os::unix::fs::symlink(outside.path(), root.join("elsewhere")).unwrap();

        assert_eq!(
            resolve(&root, "/leak.txt", &index_files()).await,
            Resolved::Forbidden
        );
        assert_eq!(
            resolve(&root, "/elsewhere/secret.txt", &index_files()).await,
            Resolved::Forbidden
        );
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_resolve_symlink_inside_root() {
        let (_dir, root) = fixture();
        std::os::unix::fs::symlink(root.join("page.html"), root.join("alias.html")).unwrap();
        assert_eq!(
            resolve(&root, "/alias.html", &index_files()).await,
            Resolved::File(root.join("alias.html"))
        );
    }
}
