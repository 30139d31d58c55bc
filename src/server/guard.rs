// Request head guard
// Validates each request head before hyper sees it, so requests hyper would reject on its
// own are answered by this server instead (with the isolation headers)

use std::io;
use std::pin::Pin;
use std::task::{ready, Context, Poll};
use std::time::Duration;

use http_body_util::BodyExt;
use hyper::{StatusCode, Uri};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt, ReadBuf};

use crate::http;

/// Largest accepted request head (request line plus headers)
pub const MAX_HEAD_BYTES: usize = 64 * 1024;
/// Largest accepted request target
pub const MAX_URI_BYTES: usize = 16 * 1024;
/// Most header fields accepted in one request
pub const MAX_HEADERS: usize = 100;

const READ_CHUNK: usize = 8 * 1024;
const LINGER_TIMEOUT: Duration = Duration::from_secs(2);
const LINGER_LIMIT: usize = 1024 * 1024;

/// Why a request head was refused
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rejection {
    Malformed,
    HeadTooLarge,
    UriTooLong,
}

impl Rejection {
    pub const fn status(self) -> StatusCode {
        match self {
            Self::Malformed => StatusCode::BAD_REQUEST,
            Self::HeadTooLarge => StatusCode::REQUEST_HEADER_FIELDS_TOO_LARGE,
            Self::UriTooLong => StatusCode::URI_TOO_LONG,
        }
    }

    pub const fn message(self) -> &'static str {
        match self {
            Self::Malformed => "Bad request syntax",
            Self::HeadTooLarge => "Request header fields too large",
            Self::UriTooLong => "Request-URI too long",
        }
    }
}

/// How the bytes after a validated head are framed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Framing {
    /// Waiting for the next request head
    Head,
    /// Forwarding this many body bytes
    Body(u64),
    /// Chunked body: the rest of the connection is forwarded unchecked
    Passthrough,
}

/// Read side wrapper that only releases bytes belonging to well-formed requests.
///
/// When a head is refused, the guard stops releasing bytes and reports EOF, so hyper finishes
/// the responses it owes and closes cleanly. The caller then takes the stream back and sends
/// the refusal with [`reject`].
#[derive(Debug)]
pub struct RequestGuard<T> {
    inner: T,
    framing: Framing,
    /// Received but not yet validated
    pending: Vec<u8>,
    /// Validated, waiting for hyper to read
    ready: Vec<u8>,
    rejection: Option<Rejection>,
    eof: bool,
}

impl<T> RequestGuard<T> {
    pub const fn new(inner: T) -> Self {
        Self {
            inner,
            framing: Framing::Head,
            pending: Vec::new(),
            ready: Vec::new(),
            rejection: None,
            eof: false,
        }
    }

    pub const fn rejection(&self) -> Option<Rejection> {
        self.rejection
    }

    pub fn into_inner(self) -> T {
        self.inner
    }

    /// Move validated bytes from `pending` to `ready`
    fn advance(&mut self) {
        while self.rejection.is_none() && !self.pending.is_empty() {
            match self.framing {
                Framing::Passthrough => {
                    self.ready.append(&mut self.pending);
                }
                Framing::Body(remaining) => {
                    let take = usize::try_from(remaining)
                        .map_or(self.pending.len(), |r| r.min(self.pending.len()));
                    self.ready.extend(self.pending.drain(..take));
                    let left = remaining - take as u64;
                    self.framing = if left == 0 { Framing::Head } else { Framing::Body(left) };
                }
                Framing::Head => match inspect_head(&self.pending) {
                    Ok(Some((len, framing))) => {
                        self.ready.extend(self.pending.drain(..len));
                        self.framing = framing;
                    }
                    Ok(None) if self.pending.len() > MAX_HEAD_BYTES => {
                        self.reject(Rejection::HeadTooLarge);
                    }
                    Ok(None) => return,
                    Err(rejection) => self.reject(rejection),
                },
            }
        }
    }

    fn reject(&mut self, rejection: Rejection) {
        self.rejection = Some(rejection);
        self.pending.clear();
    }
}

/// Check the head at the start of `buf`
///
/// Returns the head length and the framing of what follows, or `None` while incomplete.
fn inspect_head(buf: &[u8]) -> Result<Option<(usize, Framing)>, Rejection> {
    let mut headers = [httparse::EMPTY_HEADER; MAX_HEADERS];
    let mut req = httparse::Request::new(&mut headers);
    let len = match req.parse(buf) {
        Ok(httparse::Status::Complete(len)) => len,
        Ok(httparse::Status::Partial) => return Ok(None),
        Err(httparse::Error::TooManyHeaders) => return Err(Rejection::HeadTooLarge),
        Err(_) => return Err(Rejection::Malformed),
    };
    if len > MAX_HEAD_BYTES {
        return Err(Rejection::HeadTooLarge);
    }

    let target = req.path.unwrap_or_default();
    if target.len() > MAX_URI_BYTES {
        return Err(Rejection::UriTooLong);
    }
    if Uri::try_from(target).is_err() {
        return Err(Rejection::Malformed);
    }

    let mut content_length = None;
    for header in req.headers.iter() {
        if header.name.eq_ignore_ascii_case("transfer-encoding") {
            return Ok(Some((len, Framing::Passthrough)));
        }
        if header.name.eq_ignore_ascii_case("content-length") {
            let value = std::str::from_utf8(header.value)
                .ok()
                .and_then(|v| v.trim().parse::<u64>().ok())
                .ok_or(Rejection::Malformed)?;
            match content_length {
                Some(previous) if previous != value => return Err(Rejection::Malformed),
                _ => content_length = Some(value),
            }
        }
    }

    let framing = match content_length {
        Some(n) if n > 0 => Framing::Body(n),
        _ => Framing::Head,
    };
    Ok(Some((len, framing)))
}

impl<T: AsyncRead + Unpin> AsyncRead for RequestGuard<T> {
    fn poll_read(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        let this = self.get_mut();
        loop {
            if !this.ready.is_empty() {
                let n = this.ready.len().min(buf.remaining());
                buf.put_slice(&this.ready[..n]);
                this.ready.drain(..n);
                return Poll::Ready(Ok(()));
            }
            if this.rejection.is_some() || this.eof {
                return Poll::Ready(Ok(()));
            }

            let mut chunk = [0u8; READ_CHUNK];
            let mut chunk_buf = ReadBuf::new(&mut chunk);
            ready!(Pin::new(&mut this.inner).poll_read(cx, &mut chunk_buf))?;
            let filled = chunk_buf.filled();

            if filled.is_empty() {
                // Client went away mid-head; hyper sees the same truncated input
                this.eof = true;
                this.ready.append(&mut this.pending);
            } else {
                this.pending.extend_from_slice(filled);
                this.advance();
            }
        }
    }
}

impl<T: AsyncWrite + Unpin> AsyncWrite for RequestGuard<T> {
    fn poll_write(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<io::Result<usize>> {
        Pin::new(&mut self.get_mut().inner).poll_write(cx, buf)
    }

    fn poll_write_vectored(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        bufs: &[io::IoSlice<'_>],
    ) -> Poll<io::Result<usize>> {
        Pin::new(&mut self.get_mut().inner).poll_write_vectored(cx, bufs)
    }

    fn is_write_vectored(&self) -> bool {
        self.inner.is_write_vectored()
    }

    fn poll_flush(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Pin::new(&mut self.get_mut().inner).poll_flush(cx)
    }

    fn poll_shutdown(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Pin::new(&mut self.get_mut().inner).poll_shutdown(cx)
    }
}

/// Send the error page for `rejection` and close the connection.
///
/// Unread request bytes are drained for a short while after the write side is shut down, so
/// the client receives the page instead of a reset.
pub async fn reject<S>(mut stream: S, rejection: Rejection) -> io::Result<()>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    stream.write_all(&encode_rejection(rejection).await).await?;
    stream.shutdown().await?;

    let _ = tokio::time::timeout(LINGER_TIMEOUT, async {
        let mut scratch = [0u8; READ_CHUNK];
        let mut drained = 0;
        while drained < LINGER_LIMIT {
            match stream.read(&mut scratch).await {
                Ok(0) | Err(_) => break,
                Ok(n) => drained += n,
            }
        }
    })
    .await;
    Ok(())
}

/// Serialize the isolated error response for `rejection`
async fn encode_rejection(rejection: Rejection) -> Vec<u8> {
    let mut response = http::isolate(http::response::build_error_response(
        rejection.status(),
        rejection.message(),
        false,
    ));
    if let Ok(date) = http::cache::format_http_date(std::time::SystemTime::now()).parse() {
        response.headers_mut().insert(hyper::header::DATE, date);
    }

    let (parts, body) = response.into_parts();
    // In-memory page, collecting cannot fail
    let body = body
        .collect()
        .await
        .map(http_body_util::Collected::to_bytes)
        .unwrap_or_default();

    let mut out = format!("HTTP/1.1 {}\r\n", parts.status).into_bytes();
    for (name, value) in &parts.headers {
        out.extend_from_slice(name.as_str().as_bytes());
        out.extend_from_slice(b": ");
        out.extend_from_slice(value.as_bytes());
        out.extend_from_slice(b"\r\n");
    }
    out.extend_from_slice(b"\r\n");
    out.extend_from_slice(&body);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn read_all<T: AsyncRead + Unpin>(guard: &mut RequestGuard<T>) -> Vec<u8> {
        let mut out = Vec::new();
        guard.read_to_end(&mut out).await.unwrap();
        out
    }

    #[test]
    fn test_inspect_complete_head() {
        let head = b"GET /index.html HTTP/1.1\r\nHost: localhost\r\n\r\n";
        assert_eq!(
            inspect_head(head),
            Ok(Some((head.len(), Framing::Head)))
        );
    }

    #[test]
    fn test_inspect_partial_head() {
        assert_eq!(inspect_head(b"GET /index.html HTTP/1.1\r\nHo"), Ok(None));
    }

    #[test]
    fn test_inspect_garbage() {
        assert_eq!(inspect_head(b"GARBAGE\r\n\r\n"), Err(Rejection::Malformed));
    }

    #[test]
    fn test_inspect_body_framing() {
        let head = b"POST / HTTP/1.1\r\nContent-Length: 5\r\n\r\n";
        assert_eq!(inspect_head(head), Ok(Some((head.len(), Framing::Body(5)))));

        let chunked = b"POST / HTTP/1.1\r\nTransfer-Encoding: chunked\r\n\r\n";
        assert_eq!(
            inspect_head(chunked),
            Ok(Some((chunked.len(), Framing::Passthrough)))
        );
    }

    #[test]
    fn test_inspect_bad_content_length() {
        assert_eq!(
            inspect_head(b"POST / HTTP/1.1\r\nContent-Length: nope\r\n\r\n"),
            Err(Rejection::Malformed)
        );
        assert_eq!(
            inspect_head(b"POST / HTTP/1.1\r\nContent-Length: 1\r\nContent-Length: 2\r\n\r\n"),
            Err(Rejection::Malformed)
        );
    }

    #[test]
    fn test_inspect_too_many_headers() {
        let mut head = String::from("GET / HTTP/1.1\r\n");
        for i in 0..=MAX_HEADERS {
            head.push_str(&format!("X-H{i}: v\r\n"));
        }
        head.push_str("\r\n");
        assert_eq!(inspect_head(head.as_bytes()), Err(Rejection::HeadTooLarge));
    }

    #[test]
    fn test_inspect_long_uri() {
        let head = format!("GET /{} HTTP/1.1\r\n\r\n", "a".repeat(MAX_URI_BYTES));
        assert_eq!(inspect_head(head.as_bytes()), Err(Rejection::UriTooLong));
    }

    #[tokio::test]
    async fn test_guard_forwards_pipelined_requests() {
        let input: &[u8] =
            b"POST /a HTTP/1.1\r\nContent-Length: 3\r\n\r\nxyzGET /b HTTP/1.1\r\n\r\n";
        let mut guard = RequestGuard::new(input);
        assert_eq!(read_all(&mut guard).await, input);
        assert_eq!(guard.rejection(), None);
    }

    #[tokio::test]
    async fn test_guard_stops_at_malformed_request() {
        let input: &[u8] = b"GET /a HTTP/1.1\r\n\r\nGARBAGE\r\n\r\n";
        let mut guard = RequestGuard::new(input);
        assert_eq!(read_all(&mut guard).await, b"GET /a HTTP/1.1\r\n\r\n");
        assert_eq!(guard.rejection(), Some(Rejection::Malformed));
    }

    #[tokio::test]
    async fn test_guard_rejects_oversize_head() {
        let input = format!(
            "GET / HTTP/1.1\r\nX-Big: {}\r\n\r\n",
            "a".repeat(MAX_HEAD_BYTES)
        );
        let mut guard = RequestGuard::new(input.as_bytes());
        assert!(read_all(&mut guard).await.is_empty());
        assert_eq!(guard.rejection(), Some(Rejection::HeadTooLarge));
    }

    #[tokio::test]
    async fn test_rejection_page_is_isolated() {
        let raw = String::from_utf8(encode_rejection(Rejection::Malformed).await).unwrap();
        assert!(raw.starts_with("HTTP/1.1 400 Bad Request\r\n"));
        assert!(raw.contains("cross-origin-opener-policy: same-origin\r\n"));
        assert!(raw.contains("cross-origin-embedder-policy: require-corp\r\n"));
        assert!(raw.contains("access-control-allow-origin: *\r\n"));
        assert!(raw.contains("connection: close\r\n"));
        assert!(raw.contains("Bad request syntax"));
    }
}
