//! Response body types
//!
//! Generated pages are sent from memory. Files are streamed from disk in fixed-size chunks,
//! so large assets are never held in memory whole.

use std::io;
use std::pin::Pin;
use std::task::{ready, Context, Poll};

use http_body_util::{Either, Full};
use hyper::body::{Body, Bytes, Frame, SizeHint};
use tokio::fs::File;
use tokio::io::{AsyncRead, ReadBuf};

/// Bytes read from disk per frame
pub const FILE_CHUNK_SIZE: usize = 64 * 1024;

/// Body of every response the server sends
pub type ResponseBody = Either<Full<Bytes>, FileBody>;

/// In-memory body
pub fn full(data: impl Into<Bytes>) -> ResponseBody {
    Either::Left(Full::new(data.into()))
}

/// Empty body
pub fn empty() -> ResponseBody {
    full(Bytes::new())
}

/// Body streaming the first `len` bytes of `file`
pub fn streamed(file: File, len: u64) -> ResponseBody {
    Either::Right(FileBody::new(file, len))
}

/// Streams exactly `len` bytes of an open file
#[derive(Debug)]
pub struct FileBody {
    file: File,
    remaining: u64,
    buf: Vec<u8>,
}

impl FileBody {
    pub fn new(file: File, len: u64) -> Self {
        Self {
            file,
            remaining: len,
            buf: Vec::new(),
        }
    }
}

impl Body for FileBody {
    type Data = Bytes;
    type Error = io::Error;

    fn poll_frame(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
    ) -> Poll<Option<Result<Frame<Bytes>, io::Error>>> {
        let this = self.get_mut();
        if this.remaining == 0 {
            return Poll::Ready(None);
        }

        let want = usize::try_from(this.remaining)
            .map_or(FILE_CHUNK_SIZE, |r| r.min(FILE_CHUNK_SIZE));
        this.buf.resize(want, 0);
        let mut read_buf = ReadBuf::new(&mut this.buf);
        ready!(Pin::new(&mut this.file).poll_read(cx, &mut read_buf))?;

        let n = read_buf.filled().len();
        if n == 0 {
            // Shrunk since Content-Length was sent
            return Poll::Ready(Some(Err(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                "file truncated while streaming",
            ))));
        }
        this.remaining -= n as u64;
        Poll::Ready(Some(Ok(Frame::data(Bytes::copy_from_slice(&this.buf[..n])))))
    }

    fn is_end_stream(&self) -> bool {
        self.remaining == 0
    }

    fn size_hint(&self) -> SizeHint {
        SizeHint::with_exact(self.remaining)
    }
}
