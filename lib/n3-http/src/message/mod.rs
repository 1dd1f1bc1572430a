/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 ByteDance and/or its affiliates.
 */

use http::Version;

use crate::header::HeaderMap;

mod error;
pub use error::{InvalidValueError, MessageError};

mod request;
pub use request::Request;

mod response;
pub use response::Response;

fn check_version(version: Version) -> Result<(), InvalidValueError> {
    if version == Version::HTTP_10 || version == Version::HTTP_11 {
        Ok(())
    } else {
        Err(InvalidValueError::new("unsupported http version"))
    }
}

/// Serialize a header block. `Host` goes first and is comma-joined,
/// `Set-Cookie` gets one line per value, everything else is comma-joined
/// per name in first-insertion order.
fn serialize_headers(headers: &HeaderMap, buf: &mut Vec<u8>) {
    if let Some(host) = headers.get_line("Host") {
        buf.extend_from_slice(b"Host: ");
        buf.extend_from_slice(host.as_bytes());
        buf.extend_from_slice(b"\r\n");
    }
    for (name, values) in headers.iter() {
        if name.eq_ignore_ascii_case("Host") {
            continue;
        }
        if name.eq_ignore_ascii_case("Set-Cookie") {
            for value in values {
                buf.extend_from_slice(name.as_bytes());
                buf.extend_from_slice(b": ");
                buf.extend_from_slice(value.as_bytes());
                buf.extend_from_slice(b"\r\n");
            }
        } else {
            buf.extend_from_slice(name.as_bytes());
            buf.extend_from_slice(b": ");
            buf.extend_from_slice(values.join(", ").as_bytes());
            buf.extend_from_slice(b"\r\n");
        }
    }
}
