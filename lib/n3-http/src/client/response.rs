/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 ByteDance and/or its affiliates.
 */

use http::{StatusCode, Version};
use tokio::io::AsyncBufRead;

use n3_io_ext::LimitedBufReadExt;

use super::HttpResponseParseError;
use crate::header::HeaderMap;
use crate::message::Response;
use crate::parse::{HttpHeaderLine, HttpLineParseError, HttpStatusLine};
use crate::server::HeadParseConfig;

/// Read one response head off `reader`, leaving everything after the
/// header block in its buffer for the body phase.
pub async fn recv_response_head<R>(
    reader: &mut R,
    config: &HeadParseConfig,
) -> Result<Response<'static>, HttpResponseParseError>
where
    R: AsyncBufRead + Unpin,
{
    let mut line_buf = Vec::<u8>::with_capacity(1024);

    let (found, nr) = reader
        .limited_read_until(b'\n', config.max_start_line_length, &mut line_buf)
        .await?;
    if nr == 0 {
        return Err(HttpResponseParseError::RemoteClosed);
    }
    if !found {
        return if nr < config.max_start_line_length {
            Err(HttpResponseParseError::RemoteClosed)
        } else {
            Err(HttpResponseParseError::TooLargeStartLine(
                config.max_start_line_length,
            ))
        };
    }

    let status_line =
        HttpStatusLine::parse(&line_buf).map_err(HttpResponseParseError::InvalidStatusLine)?;
    let version = match status_line.version {
        0 => Version::HTTP_10,
        _ => Version::HTTP_11,
    };
    let status = StatusCode::from_u16(status_line.code)
        .map_err(|_| HttpResponseParseError::InvalidStatusLine(HttpLineParseError::InvalidStatusCode))?;
    let reason = if status_line.reason.is_empty() {
        None
    } else {
        Some(status_line.reason.to_string())
    };

    let mut headers = HeaderMap::new();
    let mut header_size = 0usize;
    loop {
        if header_size >= config.max_header_size {
            return Err(HttpResponseParseError::TooLargeHeader(
                config.max_header_size,
            ));
        }
        line_buf.clear();
        let max_len = config.max_header_size - header_size;
        let (found, nr) = reader
            .limited_read_until(b'\n', max_len, &mut line_buf)
            .await?;
        if nr == 0 {
            return Err(HttpResponseParseError::RemoteClosed);
        }
        if !found {
            return if nr < max_len {
                Err(HttpResponseParseError::RemoteClosed)
            } else {
                Err(HttpResponseParseError::TooLargeHeader(
                    config.max_header_size,
                ))
            };
        }
        header_size += nr;
        if (line_buf.len() == 1 && line_buf[0] == b'\n')
            || (line_buf.len() == 2 && line_buf[0] == b'\r' && line_buf[1] == b'\n')
        {
            break;
        }

        let header =
            HttpHeaderLine::parse(&line_buf).map_err(HttpResponseParseError::InvalidHeaderLine)?;
        headers
            .append(header.name, header.value)
            .map_err(HttpResponseParseError::InvalidHeader)?;
    }

    Ok(Response::from_parts(version, status, reason, headers))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, BufReader};

    #[tokio::test]
    async fn simple_response() {
        let wire: &[u8] =
            b"HTTP/1.1 200 OK\r\nContent-Type: text/plain\r\nContent-Length: 5\r\n\r\nHello";
        let mut reader = BufReader::new(wire);
        let rsp = recv_response_head(&mut reader, &HeadParseConfig::default())
            .await
            .unwrap();
        assert_eq!(rsp.version(), Version::HTTP_11);
        assert_eq!(rsp.status(), StatusCode::OK);
        assert_eq!(rsp.reason(), "OK");
        assert_eq!(rsp.headers().get("Content-Length"), Some("5"));

        let mut left = Vec::new();
        reader.read_to_end(&mut left).await.unwrap();
        assert_eq!(left, b"Hello");
    }

    #[tokio::test]
    async fn custom_reason_survives() {
        let wire: &[u8] = b"HTTP/1.0 404 Gone Fishing\r\n\r\n";
        let mut reader = BufReader::new(wire);
        let rsp = recv_response_head(&mut reader, &HeadParseConfig::default())
            .await
            .unwrap();
        assert_eq!(rsp.version(), Version::HTTP_10);
        assert_eq!(rsp.status(), StatusCode::NOT_FOUND);
        assert_eq!(rsp.reason(), "Gone Fishing");
    }

    #[tokio::test]
    async fn empty_reason_falls_back() {
        let wire: &[u8] = b"HTTP/1.1 204 \r\n\r\n";
        let mut reader = BufReader::new(wire);
        let rsp = recv_response_head(&mut reader, &HeadParseConfig::default())
            .await
            .unwrap();
        assert_eq!(rsp.reason(), "No Content");
    }

    #[tokio::test]
    async fn truncated_head_is_remote_closed() {
        let wire: &[u8] = b"HTTP/1.1 200 OK\r\nContent-Ty";
        let mut reader = BufReader::new(wire);
        let err = recv_response_head(&mut reader, &HeadParseConfig::default())
            .await
            .unwrap_err();
        assert!(matches!(err, HttpResponseParseError::RemoteClosed));
    }

    #[tokio::test]
    async fn over_budget_header_rejected() {
        let config = HeadParseConfig {
            max_header_size: 8,
            ..Default::default()
        };
        let wire: &[u8] = b"HTTP/1.1 200 OK\r\nX-Long-Header-Name: value\r\n\r\n";
        let mut reader = BufReader::new(wire);
        let err = recv_response_head(&mut reader, &config).await.unwrap_err();
        assert!(matches!(err, HttpResponseParseError::TooLargeHeader(8)));
    }

    #[tokio::test]
    async fn bad_version_rejected() {
        let wire: &[u8] = b"HTTP/3 200 OK\r\n\r\n";
        let mut reader = BufReader::new(wire);
        let err = recv_response_head(&mut reader, &HeadParseConfig::default())
            .await
            .unwrap_err();
        assert!(matches!(err, HttpResponseParseError::InvalidStatusLine(_)));
    }
}
