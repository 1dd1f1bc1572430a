/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 ByteDance and/or its affiliates.
 */

use std::io;
use std::pin::Pin;
use std::task::{Context, Poll, ready};

use tokio::io::{AsyncRead, ReadBuf};

/// Forwards exactly `len` bytes of a borrowed reader, then reports EOF.
/// A zero length is EOF immediately, without touching the source.
pub struct LengthLimitedReader<'a, R> {
    reader: &'a mut R,
    left: u64,
}

impl<'a, R> LengthLimitedReader<'a, R> {
    pub fn new(reader: &'a mut R, len: u64) -> Self {
        LengthLimitedReader { reader, left: len }
    }

    /// True once all `len` bytes have been delivered.
    pub fn finished(&self) -> bool {
        self.left == 0
    }

    pub fn into_reader(self) -> &'a mut R {
        self.reader
    }
}

impl<R> AsyncRead for LengthLimitedReader<'_, R>
where
    R: AsyncRead + Unpin,
{
    fn poll_read(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        let me = self.get_mut();
        if me.left == 0 || buf.remaining() == 0 {
            return Poll::Ready(Ok(()));
        }

        let to_read = usize::try_from(me.left)
            .unwrap_or(usize::MAX)
            .min(buf.remaining());
        let mut limited_buf = ReadBuf::new(buf.initialize_unfilled_to(to_read));
        ready!(Pin::new(&mut *me.reader).poll_read(cx, &mut limited_buf))?;
        let nr = limited_buf.filled().len();
        if nr == 0 {
            return Poll::Ready(Err(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                "reader closed while reading fixed length body",
            )));
        }
        buf.advance(nr);
        me.left -= nr as u64;
        Poll::Ready(Ok(()))
    }
}
