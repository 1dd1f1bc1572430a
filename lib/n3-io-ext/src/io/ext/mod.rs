/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 ByteDance and/or its affiliates.
 */

mod limited_read_until;
mod write_all_flush;

use tokio::io::{AsyncBufRead, AsyncWrite};

use limited_read_until::LimitedReadUntil;
use write_all_flush::WriteAllFlush;

pub trait LimitedBufReadExt: AsyncBufRead {
    /// Read bytes up to and including `delimiter`, appending at most `max_len`
    /// bytes to `buf`. Resolves to `(found, nr)` where `found` tells whether
    /// the delimiter was seen before the limit or EOF was hit.
    fn limited_read_until<'a>(
        &'a mut self,
        delimiter: u8,
        max_len: usize,
        buf: &'a mut Vec<u8>,
    ) -> LimitedReadUntil<'a, Self>
    where
        Self: Unpin,
    {
        LimitedReadUntil::new(self, delimiter, max_len, buf)
    }
}

impl<R: AsyncBufRead + ?Sized> LimitedBufReadExt for R {}

pub trait LimitedWriteExt: AsyncWrite {
    fn write_all_flush<'a>(&'a mut self, buf: &'a [u8]) -> WriteAllFlush<'a, Self>
    where
        Self: Unpin,
    {
        WriteAllFlush::new(self, buf)
    }
}

impl<W: AsyncWrite + ?Sized> LimitedWriteExt for W {}
