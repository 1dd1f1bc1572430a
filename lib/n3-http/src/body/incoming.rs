/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 ByteDance and/or its affiliates.
 */

use std::io;
use std::pin::Pin;
use std::task::{Context, Poll};

use tokio::io::{AsyncBufRead, AsyncRead, ReadBuf};

use super::{ChunkedDecodeReader, CompressDecodeReader, HttpBodyType, LengthLimitedReader};
use crate::build::ContentCodec;

/// Framing layer of an incoming body, borrowing the connection reader.
pub enum FramedReader<'a, R> {
    Empty,
    Chunked(ChunkedDecodeReader<'a, R>),
    Limited(LengthLimitedReader<'a, R>),
    UntilEnd(&'a mut R),
}

impl<'a, R> FramedReader<'a, R>
where
    R: AsyncBufRead + Unpin,
{
    pub fn new(reader: &'a mut R, body_type: HttpBodyType, body_line_max_size: usize) -> Self {
        match body_type {
            HttpBodyType::Chunked => {
                FramedReader::Chunked(ChunkedDecodeReader::new(reader, body_line_max_size))
            }
            HttpBodyType::ContentLength(0) => FramedReader::Empty,
            HttpBodyType::ContentLength(n) => {
                FramedReader::Limited(LengthLimitedReader::new(reader, n))
            }
            HttpBodyType::ReadUntilEnd => FramedReader::UntilEnd(reader),
        }
    }

    /// True when the framing layer has consumed its whole body, leaving
    /// the connection reader positioned at the next message.
    pub fn finished(&self) -> bool {
        match self {
            FramedReader::Empty => true,
            FramedReader::Chunked(r) => r.finished(),
            FramedReader::Limited(r) => r.finished(),
            FramedReader::UntilEnd(_) => false,
        }
    }
}

impl<R> AsyncRead for FramedReader<'_, R>
where
    R: AsyncBufRead + Unpin,
{
    fn poll_read(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        match self.get_mut() {
            FramedReader::Empty => Poll::Ready(Ok(())),
            FramedReader::Chunked(r) => Pin::new(r).poll_read(cx, buf),
            FramedReader::Limited(r) => Pin::new(r).poll_read(cx, buf),
            FramedReader::UntilEnd(r) => Pin::new(&mut **r).poll_read(cx, buf),
        }
    }
}

/// A complete incoming body chain: framing decoder plus the optional
/// content-coding decompressor on top.
pub enum IncomingBodyReader<'a, R> {
    Plain(FramedReader<'a, R>),
    Decoded(CompressDecodeReader<FramedReader<'a, R>>),
}

impl<'a, R> IncomingBodyReader<'a, R>
where
    R: AsyncBufRead + Unpin,
{
    pub fn new(
        reader: &'a mut R,
        body_type: HttpBodyType,
        codec: Option<ContentCodec>,
        body_line_max_size: usize,
        max_decode_size: usize,
    ) -> Self {
        let framed = FramedReader::new(reader, body_type, body_line_max_size);
        match codec {
            Some(codec) => IncomingBodyReader::Decoded(CompressDecodeReader::new(
                framed,
                codec,
                max_decode_size,
            )),
            None => IncomingBodyReader::Plain(framed),
        }
    }

    /// True when the underlying framing has been fully drained, so the
    /// connection can be reused for the next request.
    pub fn finished(&self) -> bool {
        match self {
            IncomingBodyReader::Plain(framed) => framed.finished(),
            IncomingBodyReader::Decoded(decoded) => decoded.get_ref().finished(),
        }
    }
}

impl<R> AsyncRead for IncomingBodyReader<'_, R>
where
    R: AsyncBufRead + Unpin,
{
    fn poll_read(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        match self.get_mut() {
            IncomingBodyReader::Plain(r) => Pin::new(r).poll_read(cx, buf),
            IncomingBodyReader::Decoded(r) => Pin::new(r).poll_read(cx, buf),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, BufReader};

    #[tokio::test]
    async fn chunked_chain_finishes() {
        let wire: &[u8] = b"5\r\nHello\r\n0\r\n\r\nGET /next";
        let mut reader = BufReader::new(wire);
        let mut body =
            IncomingBodyReader::new(&mut reader, HttpBodyType::Chunked, None, 1024, 1 << 20);

        let mut out = Vec::new();
        (&mut body).read_to_end(&mut out).await.unwrap();
        assert_eq!(out, b"Hello");
        assert!(body.finished());
        drop(body);

        // the next request line is still in the connection reader
        let mut rest = Vec::new();
        reader.read_to_end(&mut rest).await.unwrap();
        assert_eq!(rest, b"GET /next");
    }

    #[tokio::test]
    async fn empty_chain_never_touches_reader() {
        let wire: &[u8] = b"GET /next";
        let mut reader = BufReader::new(wire);
        let mut body = IncomingBodyReader::new(
            &mut reader,
            HttpBodyType::ContentLength(0),
            None,
            1024,
            1 << 20,
        );
        let mut out = Vec::new();
        (&mut body).read_to_end(&mut out).await.unwrap();
        assert!(out.is_empty());
        assert!(body.finished());
    }

    #[tokio::test]
    async fn gzip_over_content_length() {
        let payload = b"compressed payload body";
        let mut compressed = Vec::new();
        {
            use std::io::Read;
            flate2::read::GzEncoder::new(&payload[..], flate2::Compression::new(6))
                .read_to_end(&mut compressed)
                .unwrap();
        }

        let mut reader = BufReader::new(compressed.as_slice());
        let mut body = IncomingBodyReader::new(
            &mut reader,
            HttpBodyType::ContentLength(compressed.len() as u64),
            Some(ContentCodec::Gzip),
            1024,
            1 << 20,
        );

        let mut out = Vec::new();
        (&mut body).read_to_end(&mut out).await.unwrap();
        assert_eq!(out, payload);
        assert!(body.finished());
    }
}
