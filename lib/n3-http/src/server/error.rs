/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 ByteDance and/or its affiliates.
 */

use std::io;

use http::StatusCode;
use thiserror::Error;

use crate::HttpLineParseError;
use crate::header::InvalidHeaderError;

#[derive(Debug, Error)]
pub enum HttpRequestParseError {
    #[error("client closed")]
    ClientClosed,
    #[error("too large start line, should be less than {0}")]
    TooLargeStartLine(usize),
    #[error("too large header, should be less than {0}")]
    TooLargeHeader(usize),
    #[error("invalid request line: {0}")]
    InvalidRequestLine(HttpLineParseError),
    #[error("unsupported method: {0}")]
    UnsupportedMethod(String),
    #[error("invalid request target")]
    InvalidRequestTarget,
    #[error("invalid header line: {0}")]
    InvalidHeaderLine(HttpLineParseError),
    #[error("invalid header: {0}")]
    InvalidHeader(InvalidHeaderError),
    #[error("missed host header")]
    MissedHost,
    #[error("io failed: {0:?}")]
    IoFailed(#[from] io::Error),
}

impl HttpRequestParseError {
    /// The status a server can still answer with, `None` when the
    /// connection is no longer usable for a response.
    pub fn status_code(&self) -> Option<StatusCode> {
        match self {
            HttpRequestParseError::ClientClosed | HttpRequestParseError::IoFailed(_) => None,
            HttpRequestParseError::TooLargeStartLine(_)
            | HttpRequestParseError::TooLargeHeader(_) => {
                Some(StatusCode::REQUEST_HEADER_FIELDS_TOO_LARGE)
            }
            HttpRequestParseError::InvalidRequestLine(HttpLineParseError::InvalidVersion) => {
                Some(StatusCode::HTTP_VERSION_NOT_SUPPORTED)
            }
            HttpRequestParseError::UnsupportedMethod(_) => Some(StatusCode::NOT_IMPLEMENTED),
            _ => Some(StatusCode::BAD_REQUEST),
        }
    }
}
