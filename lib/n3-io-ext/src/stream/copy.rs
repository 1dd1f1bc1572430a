/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 ByteDance and/or its affiliates.
 */

use std::future::Future;
use std::io;
use std::pin::Pin;
use std::task::{Context, Poll, ready};

use thiserror::Error;
use tokio::io::{AsyncRead, AsyncWrite, ReadBuf};

const DEFAULT_COPY_BUFFER_SIZE: usize = 8192;
const MINIMAL_COPY_BUFFER_SIZE: usize = 256;
const DEFAULT_COPY_YIELD_SIZE: usize = 1024 * 1024; // 1MB
const MINIMAL_COPY_YIELD_SIZE: usize = 256 * 1024; // 256KB

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct StreamCopyConfig {
    buffer_size: usize,
    yield_size: usize,
}

impl Default for StreamCopyConfig {
    fn default() -> Self {
        StreamCopyConfig {
            buffer_size: DEFAULT_COPY_BUFFER_SIZE,
            yield_size: DEFAULT_COPY_YIELD_SIZE,
        }
    }
}

impl StreamCopyConfig {
    pub fn set_buffer_size(&mut self, buffer_size: usize) {
        self.buffer_size = buffer_size.max(MINIMAL_COPY_BUFFER_SIZE);
    }

    #[inline]
    pub fn buffer_size(&self) -> usize {
        self.buffer_size
    }

    pub fn set_yield_size(&mut self, yield_size: usize) {
        self.yield_size = yield_size.max(MINIMAL_COPY_YIELD_SIZE);
    }

    #[inline]
    pub fn yield_size(&self) -> usize {
        self.yield_size
    }
}

#[derive(Error, Debug)]
pub enum StreamCopyError {
    #[error("read failed: {0:?}")]
    ReadFailed(io::Error),
    #[error("write failed: {0:?}")]
    WriteFailed(io::Error),
}

#[derive(Debug)]
struct StreamCopyBuffer {
    read_done: bool,
    buf: Box<[u8]>,
    yield_size: usize,
    r_off: usize,
    w_off: usize,
    total_write: u64,
    need_flush: bool,
}

impl StreamCopyBuffer {
    fn new(config: &StreamCopyConfig) -> Self {
        StreamCopyBuffer {
            read_done: false,
            buf: vec![0; config.buffer_size].into_boxed_slice(),
            yield_size: config.yield_size,
            r_off: 0,
            w_off: 0,
            total_write: 0,
            need_flush: false,
        }
    }

    fn poll_fill_buf<R>(&mut self, cx: &mut Context<'_>, reader: Pin<&mut R>) -> Poll<io::Result<()>>
    where
        R: AsyncRead + ?Sized,
    {
        let mut read_buf = ReadBuf::new(&mut self.buf[self.r_off..]);
        let res = reader.poll_read(cx, &mut read_buf);
        if let Poll::Ready(Ok(_)) = res {
            let nr = read_buf.filled().len();
            if nr == 0 {
                self.read_done = true;
            } else {
                self.r_off += nr;
            }
        }
        res
    }

    fn check_move_cache(&mut self) {
        let left = self.r_off - self.w_off;
        if left <= self.w_off {
            // move the pending bytes to the start, so the next read can be larger
            self.buf.copy_within(self.w_off..self.r_off, 0);
            self.w_off = 0;
            self.r_off = left;
        }
    }

    fn poll_write_buf<W>(
        &mut self,
        cx: &mut Context<'_>,
        writer: Pin<&mut W>,
    ) -> Poll<Result<usize, StreamCopyError>>
    where
        W: AsyncWrite + ?Sized,
    {
        match ready!(writer.poll_write(cx, &self.buf[self.w_off..self.r_off])) {
            Err(e) => Poll::Ready(Err(StreamCopyError::WriteFailed(e))),
            Ok(0) => Poll::Ready(Err(StreamCopyError::WriteFailed(io::Error::new(
                io::ErrorKind::WriteZero,
                "write zero byte into writer",
            )))),
            Ok(n) => {
                self.w_off += n;
                self.total_write += n as u64;
                self.need_flush = true;
                Poll::Ready(Ok(n))
            }
        }
    }

    fn poll_copy<R, W>(
        &mut self,
        cx: &mut Context<'_>,
        mut reader: Pin<&mut R>,
        mut writer: Pin<&mut W>,
    ) -> Poll<Result<u64, StreamCopyError>>
    where
        R: AsyncRead + ?Sized,
        W: AsyncWrite + ?Sized,
    {
        let mut copy_this_round = 0usize;
        loop {
            if !self.read_done {
                if self.w_off == self.r_off {
                    self.w_off = 0;
                    self.r_off = 0;
                } else if self.w_off != 0 {
                    self.check_move_cache();
                }
                if self.r_off < self.buf.len() {
                    match self.poll_fill_buf(cx, reader.as_mut()) {
                        Poll::Ready(Ok(_)) => {}
                        Poll::Ready(Err(e)) => {
                            return Poll::Ready(Err(StreamCopyError::ReadFailed(e)));
                        }
                        Poll::Pending => {
                            if self.w_off >= self.r_off {
                                // nothing buffered, flush what was written so far
                                if self.need_flush {
                                    self.need_flush = false;
                                    ready!(writer.as_mut().poll_flush(cx))
                                        .map_err(StreamCopyError::WriteFailed)?;
                                }
                                return Poll::Pending;
                            }
                        }
                    }
                }
            }

            while self.w_off < self.r_off {
                let i = ready!(self.poll_write_buf(cx, writer.as_mut()))?;
                copy_this_round += i;
            }

            if self.read_done {
                if self.need_flush {
                    ready!(writer.as_mut().poll_flush(cx)).map_err(StreamCopyError::WriteFailed)?;
                }
                return Poll::Ready(Ok(self.total_write));
            }

            if copy_this_round >= self.yield_size {
                cx.waker().wake_by_ref();
                return Poll::Pending;
            }
        }
    }
}

#[derive(Debug)]
pub struct StreamCopy<'a, R: ?Sized, W: ?Sized> {
    reader: &'a mut R,
    writer: &'a mut W,
    buf: StreamCopyBuffer,
}

impl<'a, R, W> StreamCopy<'a, R, W>
where
    R: AsyncRead + Unpin + ?Sized,
    W: AsyncWrite + Unpin + ?Sized,
{
    pub fn new(reader: &'a mut R, writer: &'a mut W, config: &StreamCopyConfig) -> Self {
        StreamCopy {
            reader,
            writer,
            buf: StreamCopyBuffer::new(config),
        }
    }

    #[inline]
    pub fn no_cached_data(&self) -> bool {
        self.buf.r_off == self.buf.w_off
    }

    #[inline]
    pub fn finished(&self) -> bool {
        self.buf.read_done && self.no_cached_data()
    }

    #[inline]
    pub fn copied_size(&self) -> u64 {
        self.buf.total_write
    }
}

impl<R, W> Future for StreamCopy<'_, R, W>
where
    R: AsyncRead + Unpin + ?Sized,
    W: AsyncWrite + Unpin + ?Sized,
{
    type Output = Result<u64, StreamCopyError>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let me = &mut *self;
        me.buf
            .poll_copy(cx, Pin::new(&mut me.reader), Pin::new(&mut me.writer))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn copy_all() {
        let mut reader = b"hello stream copy".as_slice();
        let mut writer = Vec::new();
        let config = StreamCopyConfig::default();
        let copy = StreamCopy::new(&mut reader, &mut writer, &config);
        let n = copy.await.unwrap();
        assert_eq!(n, 17);
        assert_eq!(writer.as_slice(), b"hello stream copy");
    }

    #[tokio::test]
    async fn copy_empty() {
        let mut reader = b"".as_slice();
        let mut writer = Vec::new();
        let config = StreamCopyConfig::default();
        let n = StreamCopy::new(&mut reader, &mut writer, &config)
            .await
            .unwrap();
        assert_eq!(n, 0);
        assert!(writer.is_empty());
    }

    #[tokio::test]
    async fn copy_larger_than_buffer() {
        let data = vec![0xa5u8; 70000];
        let mut reader = data.as_slice();
        let mut writer = Vec::new();
        let mut config = StreamCopyConfig::default();
        config.set_buffer_size(256);
        let n = StreamCopy::new(&mut reader, &mut writer, &config)
            .await
            .unwrap();
        assert_eq!(n, 70000);
        assert_eq!(writer, data);
    }
}
