/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 ByteDance and/or its affiliates.
 */

mod map;
pub use map::{HeaderMap, InvalidHeaderError};

mod cookie;
pub use cookie::{Cookie, SetCookie};

/// Scan a `Connection` header value for a known token.
pub fn connection_value_has_token(value: &str, token: &str) -> bool {
    value
        .split(',')
        .any(|v| v.trim().eq_ignore_ascii_case(token))
}
