/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 ByteDance and/or its affiliates.
 */

use std::io::Write;

use http::{StatusCode, Version};

use crate::body::Body;
use crate::header::{HeaderMap, InvalidHeaderError, SetCookie};

use super::{InvalidValueError, serialize_headers};

/// An HTTP/1.x response.
#[derive(Debug)]
pub struct Response<'a> {
    version: Version,
    status: StatusCode,
    /// explicit reason phrase, `None` falls back to the canonical one
    reason: Option<String>,
    headers: HeaderMap,
    body: Body<'a>,
    cookies: Option<Vec<SetCookie>>,
}

impl Response<'static> {
    pub fn new(status: StatusCode) -> Self {
        Response {
            version: Version::HTTP_11,
            status,
            reason: None,
            headers: HeaderMap::new(),
            body: Body::Empty,
            cookies: None,
        }
    }
}

impl<'a> Response<'a> {
    pub(crate) fn from_parts(
        version: Version,
        status: StatusCode,
        reason: Option<String>,
        headers: HeaderMap,
    ) -> Self {
        Response {
            version,
            status,
            reason,
            headers,
            body: Body::Empty,
            cookies: None,
        }
    }

    #[inline]
    pub fn version(&self) -> Version {
        self.version
    }

    #[inline]
    pub fn status(&self) -> StatusCode {
        self.status
    }

    /// The explicit reason phrase, or the canonical one for the status
    /// code, or the empty string for unknown codes.
    pub fn reason(&self) -> &str {
        match &self.reason {
            Some(r) => r.as_str(),
            None => self.status.canonical_reason().unwrap_or(""),
        }
    }

    #[inline]
    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    #[inline]
    pub fn body(&self) -> &Body<'a> {
        &self.body
    }

    #[inline]
    pub fn body_mut(&mut self) -> &mut Body<'a> {
        &mut self.body
    }

    pub fn take_body(&mut self) -> Body<'a> {
        std::mem::replace(&mut self.body, Body::Empty)
    }

    pub fn with_status(mut self, status: StatusCode) -> Result<Self, InvalidValueError> {
        if status.as_u16() > 599 {
            return Err(InvalidValueError::new("status code out of range"));
        }
        self.status = status;
        self.reason = None;
        Ok(self)
    }

    pub fn with_reason(mut self, reason: &str) -> Self {
        self.reason = Some(reason.to_string());
        self
    }

    pub fn with_version(mut self, version: Version) -> Result<Self, InvalidValueError> {
        super::check_version(version)?;
        self.version = version;
        Ok(self)
    }

    pub fn with_header(mut self, name: &str, value: &str) -> Result<Self, InvalidHeaderError> {
        self.headers.set(name, value)?;
        if name.eq_ignore_ascii_case("Set-Cookie") {
            self.cookies = None;
        }
        Ok(self)
    }

    pub fn with_added_header(
        mut self,
        name: &str,
        value: &str,
    ) -> Result<Self, InvalidHeaderError> {
        self.headers.append(name, value)?;
        if name.eq_ignore_ascii_case("Set-Cookie") {
            self.cookies = None;
        }
        Ok(self)
    }

    pub fn without_header(mut self, name: &str) -> Self {
        self.headers.remove(name);
        if name.eq_ignore_ascii_case("Set-Cookie") {
            self.cookies = None;
        }
        self
    }

    pub(crate) fn with_headers(mut self, headers: HeaderMap) -> Self {
        self.headers = headers;
        self.cookies = None;
        self
    }

    pub fn with_body<'b>(self, body: Body<'b>) -> Response<'b> {
        Response {
            version: self.version,
            status: self.status,
            reason: self.reason,
            headers: self.headers,
            body,
            cookies: self.cookies,
        }
    }

    /// The cookies of the `Set-Cookie` header lines, one per occurrence,
    /// materialized on first use. Malformed lines are skipped.
    pub fn set_cookies(&mut self) -> &[SetCookie] {
        if self.cookies.is_none() {
            let jar = self
                .headers
                .get_all("Set-Cookie")
                .iter()
                .filter_map(|line| SetCookie::from_header(line).ok())
                .collect();
            self.cookies = Some(jar);
        }
        match &self.cookies {
            Some(jar) => jar.as_slice(),
            None => &[],
        }
    }

    /// Append one `Set-Cookie` header line for `cookie`.
    pub fn with_set_cookie(mut self, cookie: &SetCookie) -> Self {
        self.headers
            .append_internal("Set-Cookie", &cookie.to_header());
        self.cookies = None;
        self
    }

    /// Wire bytes of the status line and header block, body excluded.
    pub fn serialize_head(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(256);
        let _ = write!(
            &mut buf,
            "{:?} {} {}\r\n",
            self.version,
            self.status.as_u16(),
            self.reason()
        );
        serialize_headers(&self.headers, &mut buf);
        buf.extend_from_slice(b"\r\n");
        buf
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn canonical_reason_fallback() {
        let rsp = Response::new(StatusCode::NOT_FOUND);
        assert_eq!(rsp.reason(), "Not Found");
        let rsp = rsp.with_reason("Gone Fishing");
        assert_eq!(rsp.reason(), "Gone Fishing");
    }

    #[test]
    fn serialize_head_basic() {
        let rsp = Response::new(StatusCode::OK)
            .with_header("Content-Type", "text/plain")
            .unwrap();
        let head = rsp.serialize_head();
        let head = std::str::from_utf8(&head).unwrap();
        assert_eq!(head, "HTTP/1.1 200 OK\r\nContent-Type: text/plain\r\n\r\n");
    }

    #[test]
    fn set_cookie_lines_never_joined() {
        let rsp = Response::new(StatusCode::OK)
            .with_set_cookie(&SetCookie::new("a", "1").unwrap())
            .with_set_cookie(&SetCookie::new("b", "2").unwrap());
        let head = rsp.serialize_head();
        let head = std::str::from_utf8(&head).unwrap();
        assert!(head.contains("Set-Cookie: a=1\r\n"));
        assert!(head.contains("Set-Cookie: b=2\r\n"));

        let mut rsp = rsp;
        let jar = rsp.set_cookies();
        assert_eq!(jar.len(), 2);
        assert_eq!(jar[1].name(), "b");
    }

    #[test]
    fn status_range_checked() {
        let rsp = Response::new(StatusCode::OK);
        let out_of_range = StatusCode::from_u16(600).unwrap();
        assert!(rsp.with_status(out_of_range).is_err());
    }
}
