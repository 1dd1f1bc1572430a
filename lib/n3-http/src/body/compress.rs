/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 ByteDance and/or its affiliates.
 */

use std::io::{self, Read};
use std::pin::Pin;
use std::task::{Context, Poll, ready};

use thiserror::Error;
use tokio::io::{AsyncRead, ReadBuf};

use crate::build::ContentCodec;

/// A decoded body grew past the configured buffer cap. Maps to 413 on the
/// server side.
#[derive(Debug, Error)]
#[error("buffered message body larger than {0} bytes")]
pub struct MessageTooLargeError(pub usize);

const SCRATCH_SIZE: usize = 8192;

fn decode_all(codec: ContentCodec, input: &[u8]) -> io::Result<Vec<u8>> {
    let mut output = Vec::with_capacity(input.len().saturating_mul(3));
    let r = match codec {
        ContentCodec::Gzip => flate2::read::GzDecoder::new(input).read_to_end(&mut output),
        ContentCodec::Deflate => flate2::read::ZlibDecoder::new(input).read_to_end(&mut output),
    };
    match r {
        Ok(_) => Ok(output),
        Err(e) => Err(io::Error::new(io::ErrorKind::InvalidData, e)),
    }
}

fn encode_all(codec: ContentCodec, level: flate2::Compression, input: &[u8]) -> io::Result<Vec<u8>> {
    let mut output = Vec::with_capacity(input.len() / 2 + 64);
    match codec {
        ContentCodec::Gzip => {
            flate2::read::GzEncoder::new(input, level).read_to_end(&mut output)?
        }
        ContentCodec::Deflate => {
            flate2::read::ZlibEncoder::new(input, level).read_to_end(&mut output)?
        }
    };
    Ok(output)
}

/// One-shot decompressor: buffers the whole inner stream up to
/// `max_decode_size`, decompresses at inner EOF, then serves the output.
pub struct CompressDecodeReader<R> {
    reader: R,
    codec: ContentCodec,
    max_decode_size: usize,
    input: Vec<u8>,
    output: Option<Vec<u8>>,
    out_pos: usize,
}

impl<R> CompressDecodeReader<R> {
    pub fn new(reader: R, codec: ContentCodec, max_decode_size: usize) -> Self {
        CompressDecodeReader {
            reader,
            codec,
            max_decode_size,
            input: Vec::new(),
            output: None,
            out_pos: 0,
        }
    }

    pub fn get_ref(&self) -> &R {
        &self.reader
    }

    pub fn into_reader(self) -> R {
        self.reader
    }
}

impl<R> AsyncRead for CompressDecodeReader<R>
where
    R: AsyncRead + Unpin,
{
    fn poll_read(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        let me = self.get_mut();

        while me.output.is_none() {
            let mut scratch = [0u8; SCRATCH_SIZE];
            let mut scratch_buf = ReadBuf::new(&mut scratch);
            ready!(Pin::new(&mut me.reader).poll_read(cx, &mut scratch_buf))?;
            let nr = scratch_buf.filled().len();
            if nr == 0 {
                me.output = Some(decode_all(me.codec, &me.input)?);
                me.input = Vec::new();
            } else {
                if me.input.len() + nr > me.max_decode_size {
                    return Poll::Ready(Err(io::Error::other(MessageTooLargeError(
                        me.max_decode_size,
                    ))));
                }
                me.input.extend_from_slice(scratch_buf.filled());
            }
        }

        if let Some(output) = &me.output {
            let left = &output[me.out_pos..];
            let n = left.len().min(buf.remaining());
            buf.put_slice(&left[..n]);
            me.out_pos += n;
        }
        Poll::Ready(Ok(()))
    }
}

/// One-shot compressor, the encode-direction twin of
/// [`CompressDecodeReader`]. Encoded size is bounded by the input, no cap
/// is applied.
pub struct CompressEncodeReader<R> {
    reader: R,
    codec: ContentCodec,
    level: flate2::Compression,
    input: Vec<u8>,
    output: Option<Vec<u8>>,
    out_pos: usize,
}

impl<R> CompressEncodeReader<R> {
    pub fn new(reader: R, codec: ContentCodec, level: flate2::Compression) -> Self {
        CompressEncodeReader {
            reader,
            codec,
            level,
            input: Vec::new(),
            output: None,
            out_pos: 0,
        }
    }
}

impl<R> AsyncRead for CompressEncodeReader<R>
where
    R: AsyncRead + Unpin,
{
    fn poll_read(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        let me = self.get_mut();

        while me.output.is_none() {
            let mut scratch = [0u8; SCRATCH_SIZE];
            let mut scratch_buf = ReadBuf::new(&mut scratch);
            ready!(Pin::new(&mut me.reader).poll_read(cx, &mut scratch_buf))?;
            let nr = scratch_buf.filled().len();
            if nr == 0 {
                me.output = Some(encode_all(me.codec, me.level, &me.input)?);
                me.input = Vec::new();
            } else {
                me.input.extend_from_slice(scratch_buf.filled());
            }
        }

        if let Some(output) = &me.output {
            let left = &output[me.out_pos..];
            let n = left.len().min(buf.remaining());
            buf.put_slice(&left[..n]);
            me.out_pos += n;
        }
        Poll::Ready(Ok(()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::AsyncReadExt;

    #[tokio::test]
    async fn gzip_encode_then_decode() {
        let payload = b"The quick brown fox jumps over the lazy dog".repeat(32);

        let mut encoder = CompressEncodeReader::new(
            payload.as_slice(),
            ContentCodec::Gzip,
            flate2::Compression::new(6),
        );
        let mut compressed = Vec::new();
        encoder.read_to_end(&mut compressed).await.unwrap();
        assert!(!compressed.is_empty());
        assert!(compressed.len() < payload.len());

        let mut decoder =
            CompressDecodeReader::new(compressed.as_slice(), ContentCodec::Gzip, 1 << 20);
        let mut decompressed = Vec::new();
        decoder.read_to_end(&mut decompressed).await.unwrap();
        assert_eq!(decompressed, payload);
    }

    #[tokio::test]
    async fn deflate_round_trip() {
        let payload = b"hello deflate";

        let mut encoder = CompressEncodeReader::new(
            payload.as_slice(),
            ContentCodec::Deflate,
            flate2::Compression::new(6),
        );
        let mut compressed = Vec::new();
        encoder.read_to_end(&mut compressed).await.unwrap();

        let mut decoder =
            CompressDecodeReader::new(compressed.as_slice(), ContentCodec::Deflate, 1 << 20);
        let mut decompressed = Vec::new();
        decoder.read_to_end(&mut decompressed).await.unwrap();
        assert_eq!(decompressed, payload);
    }

    #[tokio::test]
    async fn malformed_input_is_invalid_data() {
        let mut decoder =
            CompressDecodeReader::new(&b"not gzip at all"[..], ContentCodec::Gzip, 1 << 20);
        let mut out = Vec::new();
        let err = decoder.read_to_end(&mut out).await.unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::InvalidData);
    }

    #[tokio::test]
    async fn over_budget_is_message_too_large() {
        let payload = vec![0u8; 256];
        let mut decoder = CompressDecodeReader::new(payload.as_slice(), ContentCodec::Gzip, 64);
        let mut out = Vec::new();
        let err = decoder.read_to_end(&mut out).await.unwrap_err();
        assert!(
            err.get_ref()
                .is_some_and(|inner| inner.is::<MessageTooLargeError>())
        );
    }
}
