/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 ByteDance and/or its affiliates.
 */

use std::str::FromStr;

use http::{Method, Version};
use tokio::io::AsyncBufRead;

use n3_io_ext::LimitedBufReadExt;

use super::{HeadParseConfig, HttpRequestParseError};
use crate::header::HeaderMap;
use crate::message::Request;
use crate::parse::{HttpHeaderLine, HttpRequestLine};
use crate::uri::Uri;

/// Read one request head off `reader`, leaving everything after the
/// header block in its buffer for the body phase.
///
/// The start line and the cumulative header block run under independent
/// size budgets; exceeding either maps to 431.
pub async fn recv_request_head<R>(
    reader: &mut R,
    config: &HeadParseConfig,
) -> Result<Request<'static>, HttpRequestParseError>
where
    R: AsyncBufRead + Unpin,
{
    let mut line_buf = Vec::<u8>::with_capacity(1024);

    let (found, nr) = reader
        .limited_read_until(b'\n', config.max_start_line_length, &mut line_buf)
        .await?;
    if nr == 0 {
        return Err(HttpRequestParseError::ClientClosed);
    }
    if !found {
        return if nr < config.max_start_line_length {
            Err(HttpRequestParseError::ClientClosed)
        } else {
            Err(HttpRequestParseError::TooLargeStartLine(
                config.max_start_line_length,
            ))
        };
    }

    let req_line =
        HttpRequestLine::parse(&line_buf).map_err(HttpRequestParseError::InvalidRequestLine)?;
    let version = match req_line.version {
        0 => Version::HTTP_10,
        _ => Version::HTTP_11,
    };
    let method = Method::from_str(req_line.method)
        .map_err(|_| HttpRequestParseError::UnsupportedMethod(req_line.method.to_string()))?;
    let target = req_line.target.to_string();

    let mut headers = HeaderMap::new();
    let mut header_size = 0usize;
    loop {
        if header_size >= config.max_header_size {
            return Err(HttpRequestParseError::TooLargeHeader(
                config.max_header_size,
            ));
        }
        line_buf.clear();
        let max_len = config.max_header_size - header_size;
        let (found, nr) = reader
            .limited_read_until(b'\n', max_len, &mut line_buf)
            .await?;
        if nr == 0 {
            return Err(HttpRequestParseError::ClientClosed);
        }
        if !found {
            return if nr < max_len {
                Err(HttpRequestParseError::ClientClosed)
            } else {
                Err(HttpRequestParseError::TooLargeHeader(
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
            HttpHeaderLine::parse(&line_buf).map_err(HttpRequestParseError::InvalidHeaderLine)?;
        headers
            .append(header.name, header.value)
            .map_err(HttpRequestParseError::InvalidHeader)?;
    }

    build_request(method, target, version, headers)
}

/// Disambiguate the request-target and bind the URI, per the four target
/// forms: origin (`/...`), asterisk (`*`), absolute (`http[s]://...`) and
/// authority (`host[:port]`).
fn build_request(
    method: Method,
    target: String,
    version: Version,
    headers: HeaderMap,
) -> Result<Request<'static>, HttpRequestParseError> {
    let host = headers.get("Host").map(str::to_string);
    let explicit_host = host.is_some();

    let (uri, stored_target) = if target.starts_with('/') {
        let Some(host) = host else {
            return Err(HttpRequestParseError::MissedHost);
        };
        let uri = Uri::from_str(&format!("http://{host}{target}"))
            .map_err(|_| HttpRequestParseError::InvalidRequestTarget)?;
        // serialization re-derives path and query from the URI
        (uri, None)
    } else if target == "*" {
        let Some(host) = host else {
            return Err(HttpRequestParseError::MissedHost);
        };
        let uri = Uri::from_str(&format!("http://{host}"))
            .map_err(|_| HttpRequestParseError::InvalidRequestTarget)?;
        (uri, Some(target))
    } else if target.starts_with("http://") || target.starts_with("https://") {
        let uri =
            Uri::from_str(&target).map_err(|_| HttpRequestParseError::InvalidRequestTarget)?;
        (uri, Some(target))
    } else {
        let Some(_host) = host else {
            return Err(HttpRequestParseError::MissedHost);
        };
        let uri = Uri::from_str(&format!("//{target}"))
            .map_err(|_| HttpRequestParseError::InvalidRequestTarget)?;
        (uri, Some(target))
    };

    Ok(Request::from_parts(
        method,
        uri,
        stored_target,
        version,
        headers,
        !explicit_host,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::BufReader;

    async fn parse(wire: &'static [u8]) -> Result<Request<'static>, HttpRequestParseError> {
        let mut reader = BufReader::new(wire);
        recv_request_head(&mut reader, &HeadParseConfig::default()).await
    }

    #[tokio::test]
    async fn origin_form() {
        let req = parse(b"GET /teapot?a=1 HTTP/1.1\r\nHost: example.com\r\n\r\n")
            .await
            .unwrap();
        assert_eq!(*req.method(), Method::GET);
        assert_eq!(req.version(), Version::HTTP_11);
        assert_eq!(req.uri().host(), "example.com");
        assert_eq!(req.uri().path(), "/teapot");
        assert_eq!(req.target(), "/teapot?a=1");
        assert_eq!(req.headers().get("host"), Some("example.com"));
    }

    #[tokio::test]
    async fn absolute_form() {
        let req = parse(b"GET http://example.com/x HTTP/1.1\r\n\r\n")
            .await
            .unwrap();
        assert_eq!(req.uri().host(), "example.com");
        assert_eq!(req.target(), "http://example.com/x");
        // Host gets derived from the URI when absent
        assert_eq!(req.headers().get("host"), Some("example.com"));
    }

    #[tokio::test]
    async fn asterisk_form() {
        let req = parse(b"OPTIONS * HTTP/1.1\r\nHost: example.com\r\n\r\n")
            .await
            .unwrap();
        assert_eq!(req.target(), "*");
        assert_eq!(req.uri().host(), "example.com");
    }

    #[tokio::test]
    async fn authority_form() {
        let req = parse(b"CONNECT example.com:443 HTTP/1.1\r\nHost: example.com:443\r\n\r\n")
            .await
            .unwrap();
        assert_eq!(req.target(), "example.com:443");
        assert_eq!(req.uri().host(), "example.com");
        assert_eq!(req.uri().port(), 443);
    }

    #[tokio::test]
    async fn missing_host_rejected() {
        let err = parse(b"GET / HTTP/1.1\r\n\r\n").await.unwrap_err();
        assert!(matches!(err, HttpRequestParseError::MissedHost));
        assert_eq!(err.status_code(), Some(http::StatusCode::BAD_REQUEST));
    }

    #[tokio::test]
    async fn header_without_colon_rejected() {
        let err = parse(b"GET / HTTP/1.1\r\nHost example.com\r\n\r\n")
            .await
            .unwrap_err();
        assert!(matches!(err, HttpRequestParseError::InvalidHeaderLine(_)));
    }

    #[tokio::test]
    async fn unsupported_version_maps_to_505() {
        let err = parse(b"GET / HTTP/2.0\r\nHost: example.com\r\n\r\n")
            .await
            .unwrap_err();
        assert_eq!(
            err.status_code(),
            Some(http::StatusCode::HTTP_VERSION_NOT_SUPPORTED)
        );
    }

    #[tokio::test]
    async fn tiny_header_budget_maps_to_431() {
        let wire: &[u8] = b"GET / HTTP/1.1\r\nHost: example.com\r\n\r\n";
        let mut reader = BufReader::new(wire);
        let config = HeadParseConfig {
            max_header_size: 1,
            max_start_line_length: 1024,
        };
        let err = recv_request_head(&mut reader, &config).await.unwrap_err();
        assert_eq!(
            err.status_code(),
            Some(http::StatusCode::REQUEST_HEADER_FIELDS_TOO_LARGE)
        );
    }

    #[tokio::test]
    async fn long_start_line_maps_to_431() {
        let wire: &[u8] = b"GET /aaaaaaaaaaaaaaaaaaaaaaaaaaaaaa HTTP/1.1\r\n\r\n";
        let mut reader = BufReader::new(wire);
        let config = HeadParseConfig {
            max_header_size: 16384,
            max_start_line_length: 8,
        };
        let err = recv_request_head(&mut reader, &config).await.unwrap_err();
        assert!(matches!(err, HttpRequestParseError::TooLargeStartLine(8)));
    }

    #[tokio::test]
    async fn body_bytes_stay_buffered() {
        use tokio::io::AsyncReadExt;

        let wire: &[u8] = b"POST /u HTTP/1.1\r\nHost: h\r\nContent-Length: 5\r\n\r\nHello";
        let mut reader = BufReader::new(wire);
        let req = recv_request_head(&mut reader, &HeadParseConfig::default())
            .await
            .unwrap();
        assert_eq!(req.headers().get("content-length"), Some("5"));

        let mut rest = Vec::new();
        reader.read_to_end(&mut rest).await.unwrap();
        assert_eq!(rest, b"Hello");
    }

    #[tokio::test]
    async fn reserialized_head_is_stable() {
        let wire: &[u8] = b"POST /submit?x=1 HTTP/1.1\r\nHost: example.com\r\n\
              Content-Length: 5\r\nX-Trace: abc\r\n\r\n";
        let mut reader = BufReader::new(wire);
        let req = recv_request_head(&mut reader, &HeadParseConfig::default())
            .await
            .unwrap();

        let first = req.serialize_head();
        let mut reader = BufReader::new(first.as_slice());
        let reparsed = recv_request_head(&mut reader, &HeadParseConfig::default())
            .await
            .unwrap();
        assert_eq!(reparsed.serialize_head(), first);
    }
}
