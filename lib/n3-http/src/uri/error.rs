/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 ByteDance and/or its affiliates.
 */

use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum UriParseError {
    #[error("unsupported scheme")]
    UnsupportedScheme,
    #[error("invalid authority")]
    InvalidAuthority,
    #[error("invalid host")]
    InvalidHost,
    #[error("invalid port")]
    InvalidPort,
}
