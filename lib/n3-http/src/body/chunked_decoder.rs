/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 ByteDance and/or its affiliates.
 */

use std::io;
use std::pin::Pin;
use std::task::{Context, Poll, ready};

use bytes::BufMut;
use tokio::io::{AsyncBufRead, AsyncRead, ReadBuf};

use crate::parse::HttpChunkedLine;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DecodeState {
    SizeLine,
    ChunkData,
    ChunkEndCr,
    ChunkEndLf,
    Trailer,
    Finished,
}

struct ChunkedDecodeInternal {
    body_line_max_size: usize,
    state: DecodeState,
    size_line_cache: Vec<u8>,
    left_chunk_size: u64,
    deferred_error: Option<io::Error>,
}

impl ChunkedDecodeInternal {
    fn new(body_line_max_size: usize) -> Self {
        ChunkedDecodeInternal {
            body_line_max_size,
            state: DecodeState::SizeLine,
            size_line_cache: Vec::with_capacity(32),
            left_chunk_size: 0,
            deferred_error: None,
        }
    }

    fn poll_decode<R>(
        &mut self,
        cx: &mut Context<'_>,
        mut reader: Pin<&mut R>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>>
    where
        R: AsyncBufRead + Unpin,
    {
        loop {
            match self.state {
                DecodeState::SizeLine => {
                    loop {
                        let r_buf = ready!(reader.as_mut().poll_fill_buf(cx))?;
                        if r_buf.is_empty() {
                            return Poll::Ready(Err(io::Error::new(
                                io::ErrorKind::UnexpectedEof,
                                "reader closed while reading chunk size line",
                            )));
                        }
                        match memchr::memchr(b'\n', r_buf) {
                            Some(p) => {
                                if self.size_line_cache.len() + p + 1 > self.body_line_max_size {
                                    return Poll::Ready(Err(io::Error::new(
                                        io::ErrorKind::InvalidData,
                                        format!(
                                            "chunk size line too long (> {})",
                                            self.body_line_max_size
                                        ),
                                    )));
                                }
                                self.size_line_cache.put_slice(&r_buf[0..=p]);
                                reader.as_mut().consume(p + 1);
                                break;
                            }
                            None => {
                                let len = r_buf.len();
                                if self.size_line_cache.len() + len > self.body_line_max_size {
                                    return Poll::Ready(Err(io::Error::new(
                                        io::ErrorKind::InvalidData,
                                        format!(
                                            "chunk size line too long (> {})",
                                            self.body_line_max_size
                                        ),
                                    )));
                                }
                                self.size_line_cache.put_slice(r_buf);
                                reader.as_mut().consume(len);
                            }
                        }
                    }

                    let chunk_size = HttpChunkedLine::parse(&self.size_line_cache)
                        .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?
                        .chunk_size;
                    self.size_line_cache.clear();
                    self.left_chunk_size = chunk_size;
                    self.state = if chunk_size == 0 {
                        // the trailer section runs until an empty line
                        DecodeState::Trailer
                    } else {
                        DecodeState::ChunkData
                    };
                }
                DecodeState::ChunkData => {
                    let buf_remaining = buf.remaining();
                    if buf_remaining == 0 {
                        return Poll::Ready(Ok(()));
                    }

                    let to_read = usize::try_from(self.left_chunk_size)
                        .unwrap_or(usize::MAX)
                        .min(buf_remaining);
                    let mut new_buf = ReadBuf::new(buf.initialize_unfilled_to(to_read));
                    ready!(reader.as_mut().poll_read(cx, &mut new_buf))?;
                    let nr = new_buf.filled().len();
                    if nr == 0 {
                        return Poll::Ready(Err(io::Error::new(
                            io::ErrorKind::UnexpectedEof,
                            "reader closed while reading chunk data",
                        )));
                    }
                    buf.advance(nr);
                    self.left_chunk_size -= nr as u64;
                    if self.left_chunk_size == 0 {
                        self.state = DecodeState::ChunkEndCr;
                    }
                }
                DecodeState::ChunkEndCr => {
                    let r_buf = ready!(reader.as_mut().poll_fill_buf(cx))?;
                    match r_buf.first() {
                        None => {
                            return Poll::Ready(Err(io::Error::new(
                                io::ErrorKind::UnexpectedEof,
                                "reader closed while reading chunk end",
                            )));
                        }
                        Some(b'\r') => {
                            reader.as_mut().consume(1);
                            self.state = DecodeState::ChunkEndLf;
                        }
                        Some(b'\n') => {
                            reader.as_mut().consume(1);
                            self.state = DecodeState::SizeLine;
                        }
                        Some(_) => {
                            return Poll::Ready(Err(io::Error::new(
                                io::ErrorKind::InvalidData,
                                "no chunk end whitespace found",
                            )));
                        }
                    }
                }
                DecodeState::ChunkEndLf => {
                    let r_buf = ready!(reader.as_mut().poll_fill_buf(cx))?;
                    match r_buf.first() {
                        None => {
                            return Poll::Ready(Err(io::Error::new(
                                io::ErrorKind::UnexpectedEof,
                                "reader closed while reading chunk end",
                            )));
                        }
                        Some(b'\n') => {
                            reader.as_mut().consume(1);
                            self.state = DecodeState::SizeLine;
                        }
                        Some(_) => {
                            return Poll::Ready(Err(io::Error::new(
                                io::ErrorKind::InvalidData,
                                "no chunk end whitespace found",
                            )));
                        }
                    }
                }
                DecodeState::Trailer => {
                    loop {
                        let r_buf = ready!(reader.as_mut().poll_fill_buf(cx))?;
                        if r_buf.is_empty() {
                            return Poll::Ready(Err(io::Error::new(
                                io::ErrorKind::UnexpectedEof,
                                "reader closed while reading chunk trailer",
                            )));
                        }
                        match memchr::memchr(b'\n', r_buf) {
                            Some(p) => {
                                if self.size_line_cache.len() + p + 1 > self.body_line_max_size {
                                    return Poll::Ready(Err(io::Error::new(
                                        io::ErrorKind::InvalidData,
                                        format!(
                                            "trailer line too long (> {})",
                                            self.body_line_max_size
                                        ),
                                    )));
                                }
                                self.size_line_cache.put_slice(&r_buf[0..=p]);
                                reader.as_mut().consume(p + 1);
                                break;
                            }
                            None => {
                                let len = r_buf.len();
                                if self.size_line_cache.len() + len > self.body_line_max_size {
                                    return Poll::Ready(Err(io::Error::new(
                                        io::ErrorKind::InvalidData,
                                        format!(
                                            "trailer line too long (> {})",
                                            self.body_line_max_size
                                        ),
                                    )));
                                }
                                self.size_line_cache.put_slice(r_buf);
                                reader.as_mut().consume(len);
                            }
                        }
                    }

                    // trailer fields are consumed and discarded
                    let line = self.size_line_cache.as_slice();
                    let section_end = line == b"\n" || line == b"\r\n";
                    self.size_line_cache.clear();
                    if section_end {
                        self.state = DecodeState::Finished;
                    }
                }
                DecodeState::Finished => return Poll::Ready(Ok(())),
            }
        }
    }
}

/// Streaming decoder for chunked transfer coding. Reads from a borrowed
/// buffered reader and reports EOF after the terminating zero chunk,
/// correct under any segmentation of the input.
pub struct ChunkedDecodeReader<'a, R> {
    reader: &'a mut R,
    internal: ChunkedDecodeInternal,
}

impl<'a, R> ChunkedDecodeReader<'a, R> {
    pub fn new(reader: &'a mut R, body_line_max_size: usize) -> Self {
        ChunkedDecodeReader {
            reader,
            internal: ChunkedDecodeInternal::new(body_line_max_size),
        }
    }

    /// True once the zero chunk and its trailer section are consumed.
    pub fn finished(&self) -> bool {
        self.internal.state == DecodeState::Finished
    }

    pub fn into_reader(self) -> &'a mut R {
        self.reader
    }
}

impl<R> AsyncRead for ChunkedDecodeReader<'_, R>
where
    R: AsyncBufRead + Unpin,
{
    fn poll_read(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        let me = &mut *self;

        if let Some(e) = me.internal.deferred_error.take() {
            return Poll::Ready(Err(e));
        }

        // a read that already filled bytes must not report an error in the
        // same call, so progress wins and the failure waits for the next poll
        let old_remaining = buf.remaining();
        match me.internal.poll_decode(cx, Pin::new(&mut me.reader), buf) {
            Poll::Pending => {
                if old_remaining > buf.remaining() {
                    Poll::Ready(Ok(()))
                } else {
                    Poll::Pending
                }
            }
            Poll::Ready(Err(e)) => {
                if old_remaining > buf.remaining() {
                    me.internal.deferred_error = Some(e);
                    Poll::Ready(Ok(()))
                } else {
                    Poll::Ready(Err(e))
                }
            }
            Poll::Ready(Ok(())) => Poll::Ready(Ok(())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;
    use tokio::io::{AsyncReadExt, BufReader, Result};
    use tokio_stream::iter;
    use tokio_util::io::StreamReader;

    #[tokio::test]
    async fn single_read() {
        let content = b"5\r\nHello\r\n0\r\n\r\n";
        let stream = iter(vec![Result::Ok(Bytes::from_static(content))]);
        let mut buf_stream = BufReader::new(StreamReader::new(stream));
        let mut body_reader = ChunkedDecodeReader::new(&mut buf_stream, 1024);

        let mut body = Vec::new();
        body_reader.read_to_end(&mut body).await.unwrap();
        assert_eq!(body, b"Hello");
        assert!(body_reader.finished());
    }

    #[tokio::test]
    async fn split_read() {
        let content1 = b"5\r\nHe";
        let content2 = b"llo\r\n5\r\nWo";
        let content3 = b"rld\r\n0\r";
        let content4 = b"\n\r\n";
        let stream = iter(vec![
            Result::Ok(Bytes::from_static(content1)),
            Result::Ok(Bytes::from_static(content2)),
            Result::Ok(Bytes::from_static(content3)),
            Result::Ok(Bytes::from_static(content4)),
        ]);
        let mut buf_stream = BufReader::new(StreamReader::new(stream));
        let mut body_reader = ChunkedDecodeReader::new(&mut buf_stream, 1024);

        let mut body = Vec::new();
        body_reader.read_to_end(&mut body).await.unwrap();
        assert_eq!(body, b"HelloWorld");
        assert!(body_reader.finished());
    }

    #[tokio::test]
    async fn empty_body() {
        let content = b"0\r\n\r\n";
        let stream = iter(vec![Result::Ok(Bytes::from_static(content))]);
        let mut buf_stream = BufReader::new(StreamReader::new(stream));
        let mut body_reader = ChunkedDecodeReader::new(&mut buf_stream, 1024);

        let mut body = Vec::new();
        body_reader.read_to_end(&mut body).await.unwrap();
        assert!(body.is_empty());
        assert!(body_reader.finished());
    }

    #[tokio::test]
    async fn trailer_fields_skipped() {
        let content = b"5\r\nHello\r\n0\r\nExpires: never\r\nX-Sum: 1\r\n\r\nleft";
        let stream = iter(vec![Result::Ok(Bytes::from_static(content))]);
        let mut buf_stream = BufReader::new(StreamReader::new(stream));
        let mut body_reader = ChunkedDecodeReader::new(&mut buf_stream, 1024);

        let mut body = Vec::new();
        body_reader.read_to_end(&mut body).await.unwrap();
        assert_eq!(body, b"Hello");
        assert!(body_reader.finished());
        drop(body_reader);

        // bytes after the trailer section stay in the reader
        let mut rest = Vec::new();
        buf_stream.read_to_end(&mut rest).await.unwrap();
        assert_eq!(rest, b"left");
    }

    #[tokio::test]
    async fn invalid_chunk_size() {
        let content = b"zz\r\ndata\r\n";
        let stream = iter(vec![Result::Ok(Bytes::from_static(content))]);
        let mut buf_stream = BufReader::new(StreamReader::new(stream));
        let mut body_reader = ChunkedDecodeReader::new(&mut buf_stream, 1024);

        let mut body = Vec::new();
        let err = body_reader.read_to_end(&mut body).await.unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::InvalidData);
    }

    #[tokio::test]
    async fn truncated_chunk_data() {
        let content = b"5\r\nHel";
        let stream = iter(vec![Result::Ok(Bytes::from_static(content))]);
        let mut buf_stream = BufReader::new(StreamReader::new(stream));
        let mut body_reader = ChunkedDecodeReader::new(&mut buf_stream, 1024);

        let mut body = Vec::new();
        let err = body_reader.read_to_end(&mut body).await.unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::UnexpectedEof);
        assert!(!body_reader.finished());
    }

    #[tokio::test]
    async fn partial_data_delivered_before_error() {
        let content = b"5\r\nHel";
        let stream = iter(vec![Result::Ok(Bytes::from_static(content))]);
        let mut buf_stream = BufReader::new(StreamReader::new(stream));
        let mut body_reader = ChunkedDecodeReader::new(&mut buf_stream, 1024);

        // the bytes already decoded come through as a successful read,
        // the truncation error surfaces on the following one
        let mut buf = [0u8; 16];
        let nr = body_reader.read(&mut buf).await.unwrap();
        assert_eq!(&buf[..nr], b"Hel");
        let err = body_reader.read(&mut buf).await.unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::UnexpectedEof);
    }

    #[tokio::test]
    async fn size_line_over_budget() {
        let content = b"5;aaaaaaaaaaaaaaaa\r\nHello\r\n0\r\n\r\n";
        let stream = iter(vec![Result::Ok(Bytes::from_static(content))]);
        let mut buf_stream = BufReader::new(StreamReader::new(stream));
        let mut body_reader = ChunkedDecodeReader::new(&mut buf_stream, 8);

        let mut body = Vec::new();
        let err = body_reader.read_to_end(&mut body).await.unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::InvalidData);
    }
}
