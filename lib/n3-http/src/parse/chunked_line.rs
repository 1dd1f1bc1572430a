/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 ByteDance and/or its affiliates.
 */

use atoi::FromRadix16;

use super::HttpLineParseError;

/// A parsed chunk-size line: `hex-size[;extension]CRLF`.
pub struct HttpChunkedLine<'a> {
    pub chunk_size: u64,
    pub extension: Option<&'a str>,
}

impl<'a> HttpChunkedLine<'a> {
    pub fn parse(buf: &'a [u8]) -> Result<HttpChunkedLine<'a>, HttpLineParseError> {
        let line = trim_line_end(buf);

        let (size_part, extension) = match memchr::memchr(b';', line) {
            Some(p) => {
                let ext = std::str::from_utf8(&line[p + 1..])
                    .map_err(HttpLineParseError::InvalidUtf8Encoding)?
                    .trim();
                (trim_spaces(&line[..p]), Some(ext))
            }
            None => (trim_spaces(line), None),
        };

        let (chunk_size, offset) = u64::from_radix_16(size_part);
        if offset == 0 || offset != size_part.len() {
            return Err(HttpLineParseError::InvalidChunkSize);
        }

        Ok(HttpChunkedLine {
            chunk_size,
            extension,
        })
    }
}

fn trim_line_end(buf: &[u8]) -> &[u8] {
    let buf = buf.strip_suffix(b"\n").unwrap_or(buf);
    buf.strip_suffix(b"\r").unwrap_or(buf)
}

fn trim_spaces(buf: &[u8]) -> &[u8] {
    let start = buf.iter().position(|b| *b != b' ').unwrap_or(buf.len());
    let end = buf.iter().rposition(|b| *b != b' ').map_or(start, |p| p + 1);
    &buf[start..end]
}
