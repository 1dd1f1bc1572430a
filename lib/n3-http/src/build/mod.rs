/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 ByteDance and/or its affiliates.
 */

use std::str::FromStr;
use std::time::Duration;

use atoi::FromRadix10Checked;
use http::{Method, Version};
use mime::Mime;

use crate::body::HttpBodyType;
use crate::header::{HeaderMap, connection_value_has_token};
use crate::message::{MessageError, Request, Response};

/// A negotiable content coding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentCodec {
    Gzip,
    Deflate,
}

impl ContentCodec {
    pub fn as_str(&self) -> &'static str {
        match self {
            ContentCodec::Gzip => "gzip",
            ContentCodec::Deflate => "deflate",
        }
    }

    fn from_coding(token: &str) -> Option<Self> {
        if token.eq_ignore_ascii_case("gzip") || token.eq_ignore_ascii_case("x-gzip") {
            Some(ContentCodec::Gzip)
        } else if token.eq_ignore_ascii_case("deflate") {
            Some(ContentCodec::Deflate)
        } else {
            None
        }
    }
}

/// A content-type pattern, either `type/subtype` or `type/*`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompressMatch {
    main_type: String,
    sub_type: Option<String>,
}

impl CompressMatch {
    pub fn exact(main_type: &str, sub_type: &str) -> Self {
        CompressMatch {
            main_type: main_type.to_string(),
            sub_type: Some(sub_type.to_string()),
        }
    }

    pub fn wildcard(main_type: &str) -> Self {
        CompressMatch {
            main_type: main_type.to_string(),
            sub_type: None,
        }
    }

    fn matches(&self, mime: &Mime) -> bool {
        if self.main_type != mime.type_().as_str() {
            return false;
        }
        match &self.sub_type {
            Some(sub) => {
                let essence = mime.essence_str();
                match essence.split_once('/') {
                    Some((_, s)) => sub == s,
                    None => false,
                }
            }
            None => true,
        }
    }
}

impl FromStr for CompressMatch {
    type Err = MessageError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().split_once('/') {
            Some((t, "*")) => Ok(CompressMatch::wildcard(t)),
            Some((t, s)) => Ok(CompressMatch::exact(t, s)),
            None => Err(MessageError::bad_request("invalid content type pattern")),
        }
    }
}

fn default_compress_types() -> Vec<CompressMatch> {
    vec![
        CompressMatch::wildcard("text"),
        CompressMatch::exact("application", "json"),
        CompressMatch::exact("application", "javascript"),
        CompressMatch::exact("application", "xml"),
        CompressMatch::exact("application", "xhtml+xml"),
        CompressMatch::exact("image", "svg+xml"),
        CompressMatch::exact("font", "otf"),
        CompressMatch::exact("font", "ttf"),
        CompressMatch::exact("font", "opentype"),
    ]
}

#[derive(Debug, Clone)]
pub struct H1BuilderConfig {
    /// compression level, `None` disables content-coding negotiation
    pub compression: Option<u32>,
    pub compress_types: Vec<CompressMatch>,
    pub keep_alive_timeout: Duration,
    pub keep_alive_max: usize,
    pub allow_persistent: bool,
}

impl Default for H1BuilderConfig {
    fn default() -> Self {
        H1BuilderConfig {
            compression: Some(6),
            compress_types: default_compress_types(),
            keep_alive_timeout: Duration::from_secs(15),
            keep_alive_max: 100,
            allow_persistent: true,
        }
    }
}

/// What the driver has to do with a message body after its head was
/// serialized.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OutgoingBodyPlan {
    pub framing: HttpBodyType,
    pub encode: Option<ContentCodec>,
}

/// Connection-level facts about the peer's request, captured before the
/// request is handed to the application.
#[derive(Debug, Clone, Copy)]
pub struct PeerRequestInfo {
    pub version: Version,
    pub keep_alive_requested: bool,
    pub accept_gzip: bool,
    pub accept_deflate: bool,
}

impl PeerRequestInfo {
    pub fn from_request(req: &Request<'_>) -> Self {
        let connection = req.headers().get_line("Connection").unwrap_or_default();
        let keep_alive_requested = if req.version() == Version::HTTP_10 {
            connection_value_has_token(&connection, "keep-alive")
        } else {
            !connection_value_has_token(&connection, "close")
        };

        let mut accept_gzip = false;
        let mut accept_deflate = false;
        if let Some(accept_encoding) = req.headers().get_line("Accept-Encoding") {
            for coding in accept_encoding.split(',') {
                let token = coding.split(';').next().unwrap_or("").trim();
                match ContentCodec::from_coding(token) {
                    Some(ContentCodec::Gzip) => accept_gzip = true,
                    Some(ContentCodec::Deflate) => accept_deflate = true,
                    None => {}
                }
            }
        }

        PeerRequestInfo {
            version: req.version(),
            keep_alive_requested,
            accept_gzip,
            accept_deflate,
        }
    }
}

fn parse_content_length(value: &str) -> Option<u64> {
    let b = value.trim().as_bytes();
    if b.is_empty() {
        return None;
    }
    let (size, offset) = u64::from_radix_10_checked(b);
    if offset != b.len() { None } else { size }
}

/// Decides body framing and content coding for both directions of an
/// HTTP/1.x exchange. Pure header logic; the decoder/encoder streams are
/// attached by the caller, which owns the connection.
pub struct H1Builder {
    config: H1BuilderConfig,
}

impl H1Builder {
    pub fn new(config: H1BuilderConfig) -> Self {
        H1Builder { config }
    }

    pub fn config(&self) -> &H1BuilderConfig {
        &self.config
    }

    fn content_length_of(headers: &HeaderMap) -> Result<Option<u64>, MessageError> {
        let values = headers.get_all("Content-Length");
        let Some(first) = values.first() else {
            return Ok(None);
        };
        let Some(size) = parse_content_length(first) else {
            return Err(MessageError::bad_request("invalid content-length"));
        };
        for other in &values[1..] {
            if parse_content_length(other) != Some(size) {
                return Err(MessageError::bad_request("conflicting content-length"));
            }
        }
        Ok(Some(size))
    }

    fn is_chunked(headers: &HeaderMap) -> bool {
        headers
            .get_line("Transfer-Encoding")
            .is_some_and(|te| connection_value_has_token(&te, "chunked"))
    }

    /// Body framing of an incoming request.
    pub fn incoming_request_body_type(
        &self,
        headers: &HeaderMap,
        method: &Method,
    ) -> Result<HttpBodyType, MessageError> {
        if Self::is_chunked(headers) {
            return Ok(HttpBodyType::Chunked);
        }
        if let Some(size) = Self::content_length_of(headers)? {
            return Ok(HttpBodyType::ContentLength(size));
        }
        if matches!(*method, Method::POST | Method::PUT) {
            return Err(MessageError::length_required("content-length required"));
        }
        Ok(HttpBodyType::ContentLength(0))
    }

    /// Body framing of an incoming response. With no framing headers the
    /// body can only be close-delimited, which requires the peer to have
    /// announced `Connection: close`.
    pub fn incoming_response_body_type(
        &self,
        headers: &HeaderMap,
    ) -> Result<HttpBodyType, MessageError> {
        if Self::is_chunked(headers) {
            return Ok(HttpBodyType::Chunked);
        }
        if let Some(size) = Self::content_length_of(headers)? {
            return Ok(HttpBodyType::ContentLength(size));
        }
        let connection = headers.get_line("Connection").unwrap_or_default();
        if connection_value_has_token(&connection, "close") {
            Ok(HttpBodyType::ReadUntilEnd)
        } else {
            Err(MessageError::length_required("ambiguous body framing"))
        }
    }

    /// The content coding an incoming body has to be passed through.
    pub fn incoming_encoding(
        &self,
        headers: &HeaderMap,
    ) -> Result<Option<ContentCodec>, MessageError> {
        let Some(encoding) = headers.get_line("Content-Encoding") else {
            return Ok(None);
        };
        let token = encoding.trim();
        if token.is_empty() || token.eq_ignore_ascii_case("identity") {
            return Ok(None);
        }
        match ContentCodec::from_coding(token) {
            Some(codec) => Ok(Some(codec)),
            None => Err(MessageError::bad_request("unsupported content encoding")),
        }
    }

    fn negotiate_encoding(&self, headers: &HeaderMap, peer: &PeerRequestInfo) -> Option<ContentCodec> {
        self.config.compression?;
        let codec = if peer.accept_gzip {
            ContentCodec::Gzip
        } else if peer.accept_deflate {
            ContentCodec::Deflate
        } else {
            return None;
        };
        let content_type = headers.get("Content-Type")?;
        let mime = Mime::from_str(content_type).ok()?;
        self.config
            .compress_types
            .iter()
            .any(|m| m.matches(&mime))
            .then_some(codec)
    }

    pub fn compression_level(&self) -> flate2::Compression {
        flate2::Compression::new(self.config.compression.unwrap_or(6))
    }

    /// Negotiate persistence and content coding, then install the framing
    /// headers of an outgoing response.
    pub fn build_outgoing_response<'b>(
        &self,
        rsp: Response<'b>,
        peer: &PeerRequestInfo,
        force_close: bool,
    ) -> (Response<'b>, OutgoingBodyPlan) {
        let mut rsp = rsp;
        let connection = rsp.headers().get_line("Connection").unwrap_or_default();
        if connection_value_has_token(&connection, "upgrade") {
            // protocol handover, leave the message alone
            let plan = OutgoingBodyPlan {
                framing: HttpBodyType::ReadUntilEnd,
                encode: None,
            };
            return (rsp, plan);
        }

        let close = force_close || !self.config.allow_persistent || !peer.keep_alive_requested;
        rsp = self.set_connection_headers(rsp, close);

        rsp = rsp.without_header("Content-Encoding");
        // compressed output is chunked, which a 1.0 peer cannot decode
        let encode = if peer.version == Version::HTTP_11 {
            self.negotiate_encoding(rsp.headers(), peer)
        } else {
            None
        };
        if let Some(codec) = encode {
            let mut headers = rsp.headers().clone();
            headers.set_internal("Content-Encoding", codec.as_str());
            headers.remove("Content-Length");
            rsp = rsp.with_headers(headers);
        }

        let (rsp, framing) = self.apply_framing(rsp, encode.is_some(), peer.version);
        (rsp, OutgoingBodyPlan { framing, encode })
    }

    /// Install connection, accept and framing headers of an outgoing
    /// request.
    pub fn build_outgoing_request<'b>(
        &self,
        req: Request<'b>,
        keep_alive: bool,
    ) -> (Request<'b>, OutgoingBodyPlan) {
        let mut headers = req.headers().clone();
        if keep_alive && self.config.allow_persistent {
            headers.set_internal("Connection", "keep-alive");
        } else {
            headers.set_internal("Connection", "close");
        }
        if !headers.contains("Accept") {
            headers.set_internal("Accept", "*/*");
        }
        if self.config.compression.is_some() {
            headers.set_internal("Accept-Encoding", "gzip, deflate");
        } else {
            headers.remove("Accept-Encoding");
        }

        let mut req = req.with_headers(headers);
        let framing = match Self::content_length_of(req.headers()).ok().flatten() {
            Some(size) => HttpBodyType::ContentLength(size),
            None => match req.body().len() {
                Some(size) => {
                    let mut headers = req.headers().clone();
                    headers.set_internal("Content-Length", itoa::Buffer::new().format(size));
                    req = req.with_headers(headers);
                    HttpBodyType::ContentLength(size)
                }
                None => {
                    let mut headers = req.headers().clone();
                    headers.set_internal("Transfer-Encoding", "chunked");
                    req = req.with_headers(headers);
                    HttpBodyType::Chunked
                }
            },
        };
        (
            req,
            OutgoingBodyPlan {
                framing,
                encode: None,
            },
        )
    }

    fn set_connection_headers<'b>(&self, rsp: Response<'b>, close: bool) -> Response<'b> {
        let mut headers = rsp.headers().clone();
        if close {
            headers.set_internal("Connection", "close");
            headers.remove("Keep-Alive");
        } else {
            headers.set_internal("Connection", "keep-alive");
            headers.set_internal(
                "Keep-Alive",
                &format!(
                    "timeout={}, max={}",
                    self.config.keep_alive_timeout.as_secs(),
                    self.config.keep_alive_max
                ),
            );
        }
        rsp.with_headers(headers)
    }

    fn apply_framing<'b>(
        &self,
        rsp: Response<'b>,
        length_unknown: bool,
        peer_version: Version,
    ) -> (Response<'b>, HttpBodyType) {
        let mut headers = rsp.headers().clone();
        if !length_unknown {
            if let Some(size) = Self::content_length_of(&headers).ok().flatten() {
                return (rsp, HttpBodyType::ContentLength(size));
            }
            if let Some(size) = rsp.body().len() {
                headers.set_internal("Content-Length", itoa::Buffer::new().format(size));
                return (rsp.with_headers(headers), HttpBodyType::ContentLength(size));
            }
        }
        // a peer speaking 1.0 cannot decode chunked framing
        if peer_version == Version::HTTP_11 {
            headers.remove("Content-Length");
            headers.set_internal("Transfer-Encoding", "chunked");
            (rsp.with_headers(headers), HttpBodyType::Chunked)
        } else {
            // HTTP/1.0 without a length can only be close-delimited
            headers.remove("Content-Length");
            headers.set_internal("Connection", "close");
            headers.remove("Keep-Alive");
            (rsp.with_headers(headers), HttpBodyType::ReadUntilEnd)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::body::Body;
    use crate::uri::Uri;
    use http::StatusCode;

    fn request(head: &[(&str, &str)]) -> Request<'static> {
        let mut req = Request::new(Method::GET, Uri::from_str("http://example.com/").unwrap());
        for (name, value) in head {
            req = req.with_header(name, value).unwrap();
        }
        req
    }

    #[test]
    fn incoming_request_framing() {
        let builder = H1Builder::new(H1BuilderConfig::default());

        let req = request(&[("Transfer-Encoding", "chunked")]);
        assert_eq!(
            builder
                .incoming_request_body_type(req.headers(), req.method())
                .unwrap(),
            HttpBodyType::Chunked
        );

        let req = request(&[("Content-Length", "42")]);
        assert_eq!(
            builder
                .incoming_request_body_type(req.headers(), req.method())
                .unwrap(),
            HttpBodyType::ContentLength(42)
        );

        let req = request(&[]);
        assert_eq!(
            builder
                .incoming_request_body_type(req.headers(), req.method())
                .unwrap(),
            HttpBodyType::ContentLength(0)
        );
    }

    #[test]
    fn post_without_framing_needs_length() {
        let builder = H1Builder::new(H1BuilderConfig::default());
        let req = request(&[]).with_method(Method::POST);
        let err = builder
            .incoming_request_body_type(req.headers(), req.method())
            .unwrap_err();
        assert_eq!(err.status(), StatusCode::LENGTH_REQUIRED);
    }

    #[test]
    fn bad_content_length_rejected() {
        let builder = H1Builder::new(H1BuilderConfig::default());

        let req = request(&[("Content-Length", "abc")]);
        let err = builder
            .incoming_request_body_type(req.headers(), req.method())
            .unwrap_err();
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);

        let req = request(&[("Content-Length", "-1")]);
        assert!(
            builder
                .incoming_request_body_type(req.headers(), req.method())
                .is_err()
        );

        let req = request(&[("Content-Length", "3")])
            .with_added_header("Content-Length", "4")
            .unwrap();
        assert!(
            builder
                .incoming_request_body_type(req.headers(), req.method())
                .is_err()
        );
    }

    #[test]
    fn response_without_framing_needs_close() {
        let builder = H1Builder::new(H1BuilderConfig::default());

        let mut headers = HeaderMap::new();
        headers.set("Connection", "close").unwrap();
        assert_eq!(
            builder.incoming_response_body_type(&headers).unwrap(),
            HttpBodyType::ReadUntilEnd
        );

        let headers = HeaderMap::new();
        let err = builder.incoming_response_body_type(&headers).unwrap_err();
        assert_eq!(err.status(), StatusCode::LENGTH_REQUIRED);
    }

    #[test]
    fn unknown_content_encoding_rejected() {
        let builder = H1Builder::new(H1BuilderConfig::default());
        let mut headers = HeaderMap::new();
        headers.set("Content-Encoding", "br").unwrap();
        let err = builder.incoming_encoding(&headers).unwrap_err();
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);

        let mut headers = HeaderMap::new();
        headers.set("Content-Encoding", "x-gzip").unwrap();
        assert_eq!(
            builder.incoming_encoding(&headers).unwrap(),
            Some(ContentCodec::Gzip)
        );
    }

    #[test]
    fn response_negotiates_gzip() {
        let builder = H1Builder::new(H1BuilderConfig::default());
        let peer = PeerRequestInfo {
            version: Version::HTTP_11,
            keep_alive_requested: true,
            accept_gzip: true,
            accept_deflate: false,
        };
        let rsp = Response::new(StatusCode::OK)
            .with_header("Content-Type", "text/plain")
            .unwrap()
            .with_body(Body::buffer("Hello"));

        let (rsp, plan) = builder.build_outgoing_response(rsp, &peer, false);
        assert_eq!(plan.encode, Some(ContentCodec::Gzip));
        assert_eq!(plan.framing, HttpBodyType::Chunked);
        assert_eq!(rsp.headers().get("content-encoding"), Some("gzip"));
        assert_eq!(rsp.headers().get("transfer-encoding"), Some("chunked"));
        assert!(!rsp.headers().contains("Content-Length"));
        assert_eq!(rsp.headers().get("connection"), Some("keep-alive"));
        assert_eq!(
            rsp.headers().get("keep-alive"),
            Some("timeout=15, max=100")
        );
    }

    #[test]
    fn no_compression_for_http10_peer() {
        let builder = H1Builder::new(H1BuilderConfig::default());
        let peer = PeerRequestInfo {
            version: Version::HTTP_10,
            keep_alive_requested: false,
            accept_gzip: true,
            accept_deflate: false,
        };
        let rsp = Response::new(StatusCode::OK)
            .with_header("Content-Type", "text/plain")
            .unwrap()
            .with_body(Body::buffer("Hello"));

        let (rsp, plan) = builder.build_outgoing_response(rsp, &peer, false);
        assert_eq!(plan.encode, None);
        assert_eq!(plan.framing, HttpBodyType::ContentLength(5));
        assert!(!rsp.headers().contains("Content-Encoding"));
        assert_eq!(rsp.headers().get("content-length"), Some("5"));
    }

    #[test]
    fn response_without_negotiation_uses_content_length() {
        let builder = H1Builder::new(H1BuilderConfig::default());
        let peer = PeerRequestInfo {
            version: Version::HTTP_11,
            keep_alive_requested: false,
            accept_gzip: false,
            accept_deflate: false,
        };
        let rsp = Response::new(StatusCode::OK)
            .with_header("Content-Type", "application/octet-stream")
            .unwrap()
            .with_body(Body::buffer("Hello"));

        let (rsp, plan) = builder.build_outgoing_response(rsp, &peer, false);
        assert_eq!(plan.encode, None);
        assert_eq!(plan.framing, HttpBodyType::ContentLength(5));
        assert_eq!(rsp.headers().get("content-length"), Some("5"));
        assert_eq!(rsp.headers().get("connection"), Some("close"));
    }

    #[test]
    fn upgrade_response_passes_through() {
        let builder = H1Builder::new(H1BuilderConfig::default());
        let peer = PeerRequestInfo {
            version: Version::HTTP_11,
            keep_alive_requested: true,
            accept_gzip: true,
            accept_deflate: false,
        };
        let rsp = Response::new(StatusCode::SWITCHING_PROTOCOLS)
            .with_header("Connection", "upgrade")
            .unwrap()
            .with_header("Upgrade", "websocket")
            .unwrap();

        let (rsp, plan) = builder.build_outgoing_response(rsp, &peer, false);
        assert_eq!(plan.encode, None);
        assert_eq!(plan.framing, HttpBodyType::ReadUntilEnd);
        assert_eq!(rsp.headers().get("connection"), Some("upgrade"));
        assert!(!rsp.headers().contains("Transfer-Encoding"));
    }

    #[test]
    fn outgoing_request_defaults() {
        let builder = H1Builder::new(H1BuilderConfig::default());
        let req = Request::new(Method::GET, Uri::from_str("http://example.com/").unwrap());
        let (req, plan) = builder.build_outgoing_request(req, true);
        assert_eq!(plan.framing, HttpBodyType::ContentLength(0));
        assert_eq!(req.headers().get("connection"), Some("keep-alive"));
        assert_eq!(req.headers().get("accept"), Some("*/*"));
        assert_eq!(req.headers().get("accept-encoding"), Some("gzip, deflate"));
        assert_eq!(req.headers().get("content-length"), Some("0"));
    }
}
