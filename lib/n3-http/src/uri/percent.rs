/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 ByteDance and/or its affiliates.
 */

fn is_hex_digit(b: u8) -> bool {
    b.is_ascii_hexdigit()
}

fn hex_value(b: u8) -> u8 {
    match b {
        b'0'..=b'9' => b - b'0',
        b'a'..=b'f' => b - b'a' + 10,
        b'A'..=b'F' => b - b'A' + 10,
        _ => unreachable!(),
    }
}

fn push_escaped(buf: &mut String, b: u8) {
    const HEX: &[u8; 16] = b"0123456789ABCDEF";
    buf.push('%');
    buf.push(HEX[(b >> 4) as usize] as char);
    buf.push(HEX[(b & 0x0f) as usize] as char);
}

/// Decode percent-triples. Invalid triples are kept as literal text.
pub(crate) fn decode(s: &str) -> String {
    let bytes = s.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%'
            && i + 2 < bytes.len()
            && is_hex_digit(bytes[i + 1])
            && is_hex_digit(bytes[i + 2])
        {
            out.push(hex_value(bytes[i + 1]) << 4 | hex_value(bytes[i + 2]));
            i += 3;
            continue;
        }
        out.push(bytes[i]);
        i += 1;
    }
    String::from_utf8(out).unwrap_or_else(|e| String::from_utf8_lossy(e.as_bytes()).into_owned())
}

fn is_path_safe(b: u8) -> bool {
    matches!(b, b'/' | b':' | b'@' | b'~' | b'-' | b'.' | b'_') || b.is_ascii_alphanumeric()
}

/// Encode a path for the wire, escaping everything outside the safe set
/// while keeping already-valid percent-triples untouched.
pub(crate) fn encode_path(s: &str) -> String {
    let bytes = s.as_bytes();
    let mut out = String::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        let b = bytes[i];
        if b == b'%' && i + 2 < bytes.len() && is_hex_digit(bytes[i + 1]) && is_hex_digit(bytes[i + 2])
        {
            out.push_str(&s[i..i + 3]);
            i += 3;
            continue;
        }
        if is_path_safe(b) {
            out.push(b as char);
        } else {
            push_escaped(&mut out, b);
        }
        i += 1;
    }
    out
}

fn is_unreserved(b: u8) -> bool {
    matches!(b, b'-' | b'.' | b'_' | b'~') || b.is_ascii_alphanumeric()
}

/// Encode a single component (query name/value, userinfo, fragment);
/// the input is taken as decoded text, so `%` itself is escaped.
pub(crate) fn encode_component(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for &b in s.as_bytes() {
        if is_unreserved(b) {
            out.push(b as char);
        } else {
            push_escaped(&mut out, b);
        }
    }
    out
}
