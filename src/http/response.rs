//! HTTP response building module
//!
//! Builders for every response the file server sends. Isolation headers are not added here;
//! see [`crate::http::isolation`].

use super::body::{self, ResponseBody};
use hyper::{Response, StatusCode};
use tokio::fs::File;

/// Build 200 response streaming the first `len` bytes of an open file
pub fn build_file_response(
    file: File,
    len: u64,
    content_type: &str,
    last_modified: &str,
    is_head: bool,
) -> Response<ResponseBody> {
    let body = if is_head {
        body::empty()
    } else {
        body::streamed(file, len)
    };

    Response::builder()
        .status(StatusCode::OK)
        .header("Content-Type", content_type)
        .header("Content-Length", len)
        .header("Last-Modified", last_modified)
        .body(body)
        .unwrap_or_else(|e| fallback(StatusCode::OK, &e))
}

/// Build generic HTML response (directory listings)
pub fn build_html_response(content: String, is_head: bool) -> Response<ResponseBody> {
    let content_length = content.len();
    let body = if is_head {
        body::empty()
    } else {
        body::full(content)
    };

    Response::builder()
        .status(StatusCode::OK)
        .header("Content-Type", "text/html; charset=utf-8")
        .header("Content-Length", content_length)
        .body(body)
        .unwrap_or_else(|e| fallback(StatusCode::OK, &e))
}

/// Build 301 redirect response (directory requested without trailing slash)
pub fn build_redirect_response(location: &str) -> Response<ResponseBody> {
    Response::builder()
        .status(StatusCode::MOVED_PERMANENTLY)
        .header("Location", location)
        .header("Content-Length", 0)
        .body(body::empty())
        .unwrap_or_else(|e| fallback(StatusCode::MOVED_PERMANENTLY, &e))
}

/// Build 304 Not Modified response
pub fn build_304_response() -> Response<ResponseBody> {
    Response::builder()
        .status(StatusCode::NOT_MODIFIED)
        .body(body::empty())
        .unwrap_or_else(|e| fallback(StatusCode::NOT_MODIFIED, &e))
}

/// Build 403 Forbidden response
pub fn build_403_response(is_head: bool) -> Response<ResponseBody> {
    build_error_response(StatusCode::FORBIDDEN, "Forbidden", is_head)
}

/// Build 404 Not Found response
pub fn build_404_response(message: &str, is_head: bool) -> Response<ResponseBody> {
    build_error_response(StatusCode::NOT_FOUND, message, is_head)
}

/// Build 501 Not Implemented response for methods other than GET/HEAD
pub fn build_501_response(method: &str) -> Response<ResponseBody> {
    build_error_response(
        StatusCode::NOT_IMPLEMENTED,
        &format!("Unsupported method ('{method}')"),
        false,
    )
}

/// Build an HTML error page; the connection is closed after it is sent
pub fn build_error_response(
    status: StatusCode,
    message: &str,
    is_head: bool,
) -> Response<ResponseBody> {
    let page = render_error_page(status, message);
    let content_length = page.len();
    let body = if is_head {
        body::empty()
    } else {
        body::full(page)
    };

    Response::builder()
        .status(status)
        .header("Content-Type", "text/html; charset=utf-8")
        .header("Content-Length", content_length)
        .header("Connection", "close")
        .body(body)
        .unwrap_or_else(|e| fallback(status, &e))
}

fn render_error_page(status: StatusCode, message: &str) -> String {
    format!(
        "<!DOCTYPE HTML>\n\
         <html lang=\"en\">\n\
         <head>\n\
         <meta charset=\"utf-8\">\n\
         <title>Error response</title>\n\
         </head>\n\
         <body>\n\
         <h1>Error response</h1>\n\
         <p>Error code: {}</p>\n\
         <p>Message: {}.</p>\n\
         <p>Error code explanation: {}.</p>\n\
         </body>\n\
         </html>\n",
        status.as_u16(),
        escape_html_text(message),
        status.canonical_reason().unwrap_or("Unknown"),
    )
}

/// Escape text for inclusion in HTML content; quotes are left as they are
pub fn escape_html_text(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

/// Escape text for inclusion in HTML attribute values
pub fn escape_html(s: &str) -> String {
    escape_html_text(s)
        .replace('"', "&quot;")
        .replace('\'', "&#x27;")
}

/// Keep the status when a builder rejects a header value
fn fallback(status: StatusCode, error: &hyper::http::Error) -> Response<ResponseBody> {
    crate::logger::log_error(&format!("Failed to build {status} response: {error}"));
    let mut resp = Response::new(body::empty());
    *resp.status_mut() = status;
    resp
}

#[cfg(test)]
mod tests {
    use super::*;
    use http_body_util::BodyExt;

    async fn open_with(dir: &tempfile::TempDir, data: &[u8]) -> File {
        let path = dir.path().join("file.txt");
        std::fs::write(&path, data).unwrap();
        File::open(path).await.unwrap()
    }

    async fn body_string(resp: Response<ResponseBody>) -> String {
        let bytes = resp.into_body().collect().await.unwrap().to_bytes();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    #[tokio::test]
    async fn test_file_response() {
        let dir = tempfile::tempdir().unwrap();
        let resp = build_file_response(
            open_with(&dir, b"hello").await,
            5,
            "text/plain; charset=utf-8",
            "Wed, 21 Oct 2015 07:28:00 GMT",
            false,
        );
        assert_eq!(resp.status(), 200);
        assert_eq!(resp.headers()["content-length"], "5");
        assert_eq!(resp.headers()["last-modified"], "Wed, 21 Oct 2015 07:28:00 GMT");
        assert_eq!(body_string(resp).await, "hello");
    }

    #[tokio::test]
    async fn test_head_keeps_length() {
        let dir = tempfile::tempdir().unwrap();
        let file = open_with(&dir, b"hello").await;
        let resp = build_file_response(file, 5, "text/plain", "x", true);
        assert_eq!(resp.headers()["content-length"], "5");
        assert_eq!(body_string(resp).await, "");
    }

    #[tokio::test]
    async fn test_error_page() {
        let resp = build_404_response("File not found", false);
        assert_eq!(resp.status(), 404);
        assert_eq!(resp.headers()["connection"], "close");
        let body = body_string(resp).await;
        assert!(body.contains("<p>Error code: 404</p>"));
        assert!(body.contains("File not found"));
    }

    #[tokio::test]
    async fn test_501_escapes_method() {
        let resp = build_501_response("<X>");
        assert_eq!(resp.status(), 501);
        assert!(body_string(resp).await.contains("&lt;X&gt;"));
    }

    #[test]
    fn test_redirect() {
        let resp = build_redirect_response("/docs/");
        assert_eq!(resp.status(), 301);
        assert_eq!(resp.headers()["location"], "/docs/");
        assert_eq!(resp.headers()["content-length"], "0");
    }

    #[tokio::test]
    async fn test_error_page_keeps_quotes() {
        let body = body_string(build_404_response("can't find \"x\"", false)).await;
        assert!(body.contains("<p>Message: can't find \"x\".</p>"));
    }

    #[test]
    fn test_escape_html_text() {
        assert_eq!(
            escape_html_text("<b>Tom & 'Jerry'</b>"),
            "&lt;b&gt;Tom &amp; 'Jerry'&lt;/b&gt;"
        );
    }

    #[test]
    fn test_escape_html() {
        assert_eq!(
            escape_html(r#"<a href="x">Tom & 'Jerry'</a>"#),
            "&lt;a href=&quot;x&quot;&gt;Tom &amp; &#x27;Jerry&#x27;&lt;/a&gt;"
        );
    }
}
