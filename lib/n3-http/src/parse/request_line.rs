/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 ByteDance and/or its affiliates.
 */

use super::HttpLineParseError;

pub struct HttpRequestLine<'a> {
    pub method: &'a str,
    pub target: &'a str,
    pub version: u8,
}

impl<'a> HttpRequestLine<'a> {
    pub fn parse(buf: &'a [u8]) -> Result<HttpRequestLine<'a>, HttpLineParseError> {
        const MINIMAL_LENGTH: usize = 14; // M / HTTP/1.x\n

        if buf.len() < MINIMAL_LENGTH {
            return Err(HttpLineParseError::NotLongEnough);
        }

        let line = std::str::from_utf8(buf)?;
        let line = line.trim_end();

        let Some(p) = memchr::memchr(b' ', line.as_bytes()) else {
            return Err(HttpLineParseError::NoDelimiterFound(' '));
        };
        let method = &line[0..p];
        if method.is_empty() {
            return Err(HttpLineParseError::InvalidMethod);
        }

        let left = &line[p + 1..];
        let Some(p) = memchr::memrchr(b' ', left.as_bytes()) else {
            return Err(HttpLineParseError::NoDelimiterFound(' '));
        };
        let target = left[0..p].trim();
        if target.is_empty() {
            return Err(HttpLineParseError::NotLongEnough);
        }

        let version: u8 = match &left[p + 1..] {
            "HTTP/1.0" => 0,
            "HTTP/1.1" => 1,
            _ => return Err(HttpLineParseError::InvalidVersion),
        };

        Ok(HttpRequestLine {
            method,
            target,
            version,
        })
    }
}
