/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 ByteDance and/or its affiliates.
 */

use std::fmt;

use chrono::{DateTime, NaiveDateTime, Utc};

use crate::message::InvalidValueError;

fn is_cookie_name_char(b: u8) -> bool {
    // header token syntax
    matches!(
        b,
        b'!' | b'#'
            | b'$'
            | b'%'
            | b'&'
            | b'\''
            | b'*'
            | b'+'
            | b'-'
            | b'.'
            | b'^'
            | b'_'
            | b'`'
            | b'|'
            | b'~'
    ) || b.is_ascii_alphanumeric()
}

fn is_cookie_value_char(b: u8) -> bool {
    // RFC 6265 cookie-octet
    matches!(b, 0x21 | 0x23..=0x2b | 0x2d..=0x3a | 0x3c..=0x5b | 0x5d..=0x7e)
}

/// A bare name/value cookie pair, as carried by the request `Cookie` header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cookie {
    name: String,
    value: String,
}

impl Cookie {
    pub fn new(name: &str, value: &str) -> Result<Self, InvalidValueError> {
        if name.is_empty() || !name.bytes().all(is_cookie_name_char) {
            return Err(InvalidValueError::new("invalid cookie name"));
        }
        if !value.bytes().all(is_cookie_value_char) {
            return Err(InvalidValueError::new("invalid cookie value"));
        }
        Ok(Cookie {
            name: name.to_string(),
            value: value.to_string(),
        })
    }

    /// Parse one `name=value` pair.
    pub fn from_pair(pair: &str) -> Result<Self, InvalidValueError> {
        let pair = pair.trim();
        let Some(p) = memchr::memchr(b'=', pair.as_bytes()) else {
            return Err(InvalidValueError::new("cookie pair without '='"));
        };
        Cookie::new(pair[..p].trim(), pair[p + 1..].trim().trim_matches('"'))
    }

    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[inline]
    pub fn value(&self) -> &str {
        &self.value
    }
}

impl fmt::Display for Cookie {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}={}", self.name, self.value)
    }
}

/// A cookie plus its transport attributes, as carried by one `Set-Cookie`
/// header line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SetCookie {
    cookie: Cookie,
    /// unix timestamp, 0 means a session cookie
    expires: i64,
    path: Option<String>,
    domain: Option<String>,
    secure: bool,
    http_only: bool,
}

impl SetCookie {
    pub fn new(name: &str, value: &str) -> Result<Self, InvalidValueError> {
        Ok(SetCookie {
            cookie: Cookie::new(name, value)?,
            expires: 0,
            path: None,
            domain: None,
            secure: false,
            http_only: false,
        })
    }

    /// Parse one `Set-Cookie` header line. Unknown attributes are ignored;
    /// an unparsable `Expires` date leaves the cookie a session cookie.
    pub fn from_header(line: &str) -> Result<Self, InvalidValueError> {
        let mut parts = line.split(';');
        let Some(pair) = parts.next() else {
            return Err(InvalidValueError::new("empty set-cookie header"));
        };
        let mut set_cookie = SetCookie {
            cookie: Cookie::from_pair(pair)?,
            expires: 0,
            path: None,
            domain: None,
            secure: false,
            http_only: false,
        };

        for attr in parts {
            let attr = attr.trim();
            let (name, value) = match memchr::memchr(b'=', attr.as_bytes()) {
                Some(p) => (&attr[..p], attr[p + 1..].trim()),
                None => (attr, ""),
            };
            if name.eq_ignore_ascii_case("expires") {
                if let Some(ts) = parse_http_date(value) {
                    set_cookie.expires = ts;
                }
            } else if name.eq_ignore_ascii_case("max-age") {
                if let Ok(delta) = value.parse::<i64>() {
                    set_cookie.expires = Utc::now().timestamp() + delta;
                }
            } else if name.eq_ignore_ascii_case("path") {
                set_cookie.path = Some(value.to_string());
            } else if name.eq_ignore_ascii_case("domain") {
                set_cookie.domain = Some(value.to_string());
            } else if name.eq_ignore_ascii_case("secure") {
                set_cookie.secure = true;
            } else if name.eq_ignore_ascii_case("httponly") {
                set_cookie.http_only = true;
            }
        }

        Ok(set_cookie)
    }

    pub fn to_header(&self) -> String {
        let mut s = self.cookie.to_string();
        if self.expires != 0 {
            if let Some(date) = format_http_date(self.expires) {
                s.push_str("; Expires=");
                s.push_str(&date);
            }
        }
        if let Some(path) = &self.path {
            s.push_str("; Path=");
            s.push_str(path);
        }
        if let Some(domain) = &self.domain {
            s.push_str("; Domain=");
            s.push_str(domain);
        }
        if self.secure {
            s.push_str("; Secure");
        }
        if self.http_only {
            s.push_str("; HttpOnly");
        }
        s
    }

    #[inline]
    pub fn name(&self) -> &str {
        self.cookie.name()
    }

    #[inline]
    pub fn value(&self) -> &str {
        self.cookie.value()
    }

    #[inline]
    pub fn expires(&self) -> i64 {
        self.expires
    }

    #[inline]
    pub fn is_session(&self) -> bool {
        self.expires == 0
    }

    #[inline]
    pub fn path(&self) -> Option<&str> {
        self.path.as_deref()
    }

    #[inline]
    pub fn domain(&self) -> Option<&str> {
        self.domain.as_deref()
    }

    #[inline]
    pub fn secure(&self) -> bool {
        self.secure
    }

    #[inline]
    pub fn http_only(&self) -> bool {
        self.http_only
    }

    pub fn with_expires(mut self, expires: i64) -> Self {
        self.expires = expires;
        self
    }

    pub fn with_path(mut self, path: &str) -> Self {
        self.path = Some(path.to_string());
        self
    }

    pub fn with_domain(mut self, domain: &str) -> Self {
        self.domain = Some(domain.to_string());
        self
    }

    pub fn with_secure(mut self, secure: bool) -> Self {
        self.secure = secure;
        self
    }

    pub fn with_http_only(mut self, http_only: bool) -> Self {
        self.http_only = http_only;
        self
    }
}

fn parse_http_date(s: &str) -> Option<i64> {
    if let Ok(dt) = DateTime::parse_from_rfc2822(s) {
        return Some(dt.timestamp());
    }
    // RFC 850
    if let Ok(dt) = NaiveDateTime::parse_from_str(s, "%A, %d-%b-%y %H:%M:%S GMT") {
        return Some(dt.and_utc().timestamp());
    }
    // asctime
    if let Ok(dt) = NaiveDateTime::parse_from_str(s, "%a %b %e %H:%M:%S %Y") {
        return Some(dt.and_utc().timestamp());
    }
    None
}

fn format_http_date(ts: i64) -> Option<String> {
    DateTime::<Utc>::from_timestamp(ts, 0).map(|dt| dt.format("%a, %d %b %Y %H:%M:%S GMT").to_string())
}
