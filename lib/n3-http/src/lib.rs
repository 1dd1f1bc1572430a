/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 ByteDance and/or its affiliates.
 */

//! HTTP/1.x protocol engine: wire parsing and serialization, body framing
//! (chunked / content-length), gzip and deflate content coding, and a
//! per-connection serve loop over any async duplex stream.

mod parse;
pub use parse::{
    HttpChunkedLine, HttpHeaderLine, HttpLineParseError, HttpRequestLine, HttpStatusLine,
};

pub mod uri;
pub use uri::{Scheme, Uri, UriParseError};

pub mod header;
pub use header::{Cookie, HeaderMap, InvalidHeaderError, SetCookie};

mod message;
pub use message::{InvalidValueError, MessageError, Request, Response};

pub mod body;
pub use body::{Body, HttpBodyType};

pub mod build;
pub use build::{
    CompressMatch, ContentCodec, H1Builder, H1BuilderConfig, OutgoingBodyPlan, PeerRequestInfo,
};

pub mod server;
pub use server::{
    ConnectionContext, H1Driver, HeadParseConfig, HttpRequestParseError, HttpServerConfig,
    HttpServerHandler,
};

pub mod client;
pub use client::HttpResponseParseError;
