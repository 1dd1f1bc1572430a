/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 ByteDance and/or its affiliates.
 */

use http::StatusCode;
use thiserror::Error;

/// A value rejected at message construction or mutation time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("{0}")]
pub struct InvalidValueError(&'static str);

impl InvalidValueError {
    pub(crate) fn new(reason: &'static str) -> Self {
        InvalidValueError(reason)
    }

    pub fn reason(&self) -> &'static str {
        self.0
    }
}

/// A semantic framing violation that carries the HTTP status a server
/// should answer with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("{status}: {reason}")]
pub struct MessageError {
    status: StatusCode,
    reason: &'static str,
}

impl MessageError {
    pub fn new(status: StatusCode, reason: &'static str) -> Self {
        MessageError { status, reason }
    }

    pub fn bad_request(reason: &'static str) -> Self {
        MessageError::new(StatusCode::BAD_REQUEST, reason)
    }

    pub fn length_required(reason: &'static str) -> Self {
        MessageError::new(StatusCode::LENGTH_REQUIRED, reason)
    }

    #[inline]
    pub fn status(&self) -> StatusCode {
        self.status
    }

    #[inline]
    pub fn reason(&self) -> &'static str {
        self.reason
    }
}
