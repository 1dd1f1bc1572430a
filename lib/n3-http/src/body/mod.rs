/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 ByteDance and/or its affiliates.
 */

use std::fmt;
use std::io;
use std::pin::Pin;
use std::task::{Context, Poll};

use bytes::Bytes;
use tokio::io::{AsyncRead, ReadBuf};

mod chunked_decoder;
pub use chunked_decoder::ChunkedDecodeReader;

mod chunked_encoder;
pub use chunked_encoder::ChunkedEncodeTransfer;

mod length_limited;
pub use length_limited::LengthLimitedReader;

mod compress;
pub use compress::{CompressDecodeReader, CompressEncodeReader, MessageTooLargeError};

mod incoming;
pub use incoming::{FramedReader, IncomingBodyReader};

/// How a message body is framed on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpBodyType {
    Chunked,
    ContentLength(u64),
    /// close-delimited, the body runs to connection end
    ReadUntilEnd,
}

/// The body of a message.
///
/// A body is owned by exactly one message. Incoming bodies borrow the
/// per-connection decoder chain for the span of one request cycle.
pub enum Body<'a> {
    Empty,
    /// in-memory payload, rewindable before resending
    Buffer { data: Bytes, pos: usize },
    Reader(&'a mut (dyn AsyncRead + Send + Unpin)),
    Stream(Box<dyn AsyncRead + Send + Unpin + 'a>),
}

impl fmt::Debug for Body<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Body::Empty => f.write_str("Empty"),
            Body::Buffer { data, pos } => f
                .debug_struct("Buffer")
                .field("len", &data.len())
                .field("pos", pos)
                .finish(),
            Body::Reader(_) => f.write_str("Reader"),
            Body::Stream(_) => f.write_str("Stream"),
        }
    }
}

impl Body<'static> {
    pub fn buffer(data: impl Into<Bytes>) -> Self {
        Body::Buffer {
            data: data.into(),
            pos: 0,
        }
    }
}

impl<'a> Body<'a> {
    pub fn is_readable(&self) -> bool {
        match self {
            Body::Empty => false,
            Body::Buffer { data, pos } => *pos < data.len(),
            Body::Reader(_) | Body::Stream(_) => true,
        }
    }

    /// Total length, known only for in-memory bodies.
    pub fn len(&self) -> Option<u64> {
        match self {
            Body::Empty => Some(0),
            Body::Buffer { data, .. } => Some(data.len() as u64),
            Body::Reader(_) | Body::Stream(_) => None,
        }
    }

    /// Rewind an in-memory body to its start. Streaming bodies cannot be
    /// rewound and return false.
    pub fn reset(&mut self) -> bool {
        match self {
            Body::Empty => true,
            Body::Buffer { pos, .. } => {
                *pos = 0;
                true
            }
            Body::Reader(_) | Body::Stream(_) => false,
        }
    }
}

impl AsyncRead for Body<'_> {
    fn poll_read(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        match self.get_mut() {
            Body::Empty => Poll::Ready(Ok(())),
            Body::Buffer { data, pos } => {
                let left = &data[*pos..];
                let n = left.len().min(buf.remaining());
                buf.put_slice(&left[..n]);
                *pos += n;
                Poll::Ready(Ok(()))
            }
            Body::Reader(r) => Pin::new(&mut **r).poll_read(cx, buf),
            Body::Stream(r) => Pin::new(&mut **r).poll_read(cx, buf),
        }
    }
}

/// Map a body stream error to the HTTP status a server can still answer
/// with, if any.
pub(crate) fn body_error_status(e: &io::Error) -> Option<http::StatusCode> {
    if e.get_ref().is_some_and(|inner| inner.is::<MessageTooLargeError>()) {
        Some(http::StatusCode::PAYLOAD_TOO_LARGE)
    } else if e.kind() == io::ErrorKind::InvalidData {
        Some(http::StatusCode::BAD_REQUEST)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::AsyncReadExt;

    #[tokio::test]
    async fn buffer_body_read_and_reset() {
        let mut body = Body::buffer("hello");
        assert_eq!(body.len(), Some(5));
        assert!(body.is_readable());

        let mut out = Vec::new();
        (&mut body).read_to_end(&mut out).await.unwrap();
        assert_eq!(out, b"hello");
        assert!(!body.is_readable());

        assert!(body.reset());
        let mut out = Vec::new();
        (&mut body).read_to_end(&mut out).await.unwrap();
        assert_eq!(out, b"hello");
    }

    #[tokio::test]
    async fn empty_body_is_eof() {
        let mut body = Body::Empty;
        let mut out = Vec::new();
        (&mut body).read_to_end(&mut out).await.unwrap();
        assert!(out.is_empty());
    }

    #[test]
    fn debug_elides_payload() {
        assert_eq!(format!("{:?}", Body::Empty), "Empty");
        assert_eq!(
            format!("{:?}", Body::buffer("hello")),
            "Buffer { len: 5, pos: 0 }"
        );
    }
}
