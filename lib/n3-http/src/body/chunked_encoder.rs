/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 ByteDance and/or its affiliates.
 */

use std::future::Future;
use std::io::Write;
use std::pin::Pin;
use std::task::{Context, Poll, ready};

use tokio::io::{AsyncBufRead, AsyncWrite};

use n3_io_ext::StreamCopyError;

struct ChunkedEncodeInternal {
    yield_size: usize,
    this_chunk_size: usize,
    left_chunk_size: usize,
    static_header: Vec<u8>,
    static_offset: usize,
    total_write: u64,
    read_finished: bool,
}

impl ChunkedEncodeInternal {
    fn new(yield_size: usize) -> Self {
        ChunkedEncodeInternal {
            yield_size,
            this_chunk_size: 0,
            left_chunk_size: 0,
            static_header: Vec::with_capacity(16),
            static_offset: 0,
            total_write: 0,
            read_finished: false,
        }
    }

    fn poll_encode<R, W>(
        &mut self,
        cx: &mut Context<'_>,
        mut reader: Pin<&mut R>,
        mut writer: Pin<&mut W>,
    ) -> Poll<Result<u64, StreamCopyError>>
    where
        R: AsyncBufRead,
        W: AsyncWrite,
    {
        let mut copy_this_round = 0usize;
        loop {
            if self.this_chunk_size == 0 && !self.read_finished {
                let data = ready!(reader.as_mut().poll_fill_buf(cx))
                    .map_err(StreamCopyError::ReadFailed)?;
                self.static_header.clear();
                let chunk_size = data.len();
                if chunk_size == 0 {
                    self.read_finished = true;
                    if self.total_write == 0 {
                        let _ = write!(&mut self.static_header, "0\r\n\r\n");
                    } else {
                        // the CRLF closing the previous chunk comes first
                        let _ = write!(&mut self.static_header, "\r\n0\r\n\r\n");
                    }
                } else if self.total_write == 0 {
                    let _ = write!(&mut self.static_header, "{chunk_size:x}\r\n");
                } else {
                    let _ = write!(&mut self.static_header, "\r\n{chunk_size:x}\r\n");
                }
                self.static_offset = 0;
                self.this_chunk_size = chunk_size;
                self.left_chunk_size = chunk_size;
            }

            while self.static_offset < self.static_header.len() {
                let nw = ready!(
                    writer
                        .as_mut()
                        .poll_write(cx, &self.static_header[self.static_offset..])
                )
                .map_err(StreamCopyError::WriteFailed)?;
                self.static_offset += nw;
                self.total_write += nw as u64;
            }
            if self.read_finished {
                ready!(writer.as_mut().poll_flush(cx)).map_err(StreamCopyError::WriteFailed)?;
                return Poll::Ready(Ok(self.total_write));
            }

            while self.left_chunk_size > 0 {
                let data = ready!(
                    reader
                        .as_mut()
                        .poll_fill_buf(cx)
                        .map_err(StreamCopyError::ReadFailed)
                )?;
                let to_write = self.left_chunk_size.min(data.len());
                let nw = ready!(writer.as_mut().poll_write(cx, &data[..to_write]))
                    .map_err(StreamCopyError::WriteFailed)?;
                reader.as_mut().consume(nw);
                copy_this_round += nw;
                self.left_chunk_size -= nw;
                self.total_write += nw as u64;
            }
            self.this_chunk_size = 0;

            if copy_this_round >= self.yield_size {
                cx.waker().wake_by_ref();
                return Poll::Pending;
            }
        }
    }

    fn finished(&self) -> bool {
        self.read_finished && self.static_offset >= self.static_header.len()
    }
}

/// Copy future that chunk-encodes a buffered reader into a writer.
///
/// Each non-empty fill of the source becomes one chunk; source EOF emits
/// the terminating zero chunk exactly once. Empty sends emit nothing.
pub struct ChunkedEncodeTransfer<'a, R, W> {
    reader: &'a mut R,
    writer: &'a mut W,
    internal: ChunkedEncodeInternal,
}

impl<'a, R, W> ChunkedEncodeTransfer<'a, R, W> {
    pub fn new(reader: &'a mut R, writer: &'a mut W, yield_size: usize) -> Self {
        ChunkedEncodeTransfer {
            reader,
            writer,
            internal: ChunkedEncodeInternal::new(yield_size),
        }
    }

    pub fn finished(&self) -> bool {
        self.internal.finished()
    }
}

impl<R, W> Future for ChunkedEncodeTransfer<'_, R, W>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    type Output = Result<u64, StreamCopyError>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let me = &mut *self;

        me.internal
            .poll_encode(cx, Pin::new(&mut me.reader), Pin::new(&mut me.writer))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;
    use tokio::io::{BufReader, Result};
    use tokio_stream::iter;
    use tokio_util::io::StreamReader;

    #[tokio::test]
    async fn encode_one_chunk() {
        let stream = iter(vec![Result::Ok(Bytes::from_static(b"Hello"))]);
        let mut reader = BufReader::new(StreamReader::new(stream));
        let mut writer = Vec::new();

        let mut transfer = ChunkedEncodeTransfer::new(&mut reader, &mut writer, 1 << 20);
        let n = (&mut transfer).await.unwrap();
        assert!(transfer.finished());
        drop(transfer);
        assert_eq!(writer, b"5\r\nHello\r\n0\r\n\r\n");
        assert_eq!(n, writer.len() as u64);
    }

    #[tokio::test]
    async fn encode_split_chunks() {
        let stream = iter(vec![
            Result::Ok(Bytes::from_static(b"Hello")),
            Result::Ok(Bytes::from_static(b" World")),
        ]);
        let mut reader = BufReader::new(StreamReader::new(stream));
        let mut writer = Vec::new();

        let mut transfer = ChunkedEncodeTransfer::new(&mut reader, &mut writer, 1 << 20);
        (&mut transfer).await.unwrap();
        drop(transfer);
        assert_eq!(writer, b"5\r\nHello\r\n6\r\n World\r\n0\r\n\r\n");
    }

    #[tokio::test]
    async fn encode_empty_body() {
        let stream = iter(Vec::<Result<Bytes>>::new());
        let mut reader = BufReader::new(StreamReader::new(stream));
        let mut writer = Vec::new();

        let mut transfer = ChunkedEncodeTransfer::new(&mut reader, &mut writer, 1 << 20);
        (&mut transfer).await.unwrap();
        drop(transfer);
        assert_eq!(writer, b"0\r\n\r\n");
    }
}
