/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 ByteDance and/or its affiliates.
 */

use std::io::Write;

use http::{Method, Version};

use crate::body::Body;
use crate::header::{Cookie, HeaderMap, InvalidHeaderError};
use crate::uri::Uri;

use super::{InvalidValueError, serialize_headers};

/// An HTTP/1.x request.
///
/// Mutators consume the receiver and return the changed instance, so no
/// two handles ever share header or cookie state. The `Host` header tracks
/// the URI authority until it is set explicitly.
#[derive(Debug)]
pub struct Request<'a> {
    method: Method,
    uri: Uri,
    /// explicit request-target override, `None` derives from the URI
    target: Option<String>,
    version: Version,
    headers: HeaderMap,
    body: Body<'a>,
    host_derived: bool,
    cookies: Option<Vec<Cookie>>,
}

impl Request<'static> {
    pub fn new(method: Method, uri: Uri) -> Self {
        let mut req = Request {
            method,
            uri,
            target: None,
            version: Version::HTTP_11,
            headers: HeaderMap::new(),
            body: Body::Empty,
            host_derived: false,
            cookies: None,
        };
        req.derive_host();
        req
    }
}

impl<'a> Request<'a> {
    pub(crate) fn from_parts(
        method: Method,
        uri: Uri,
        target: Option<String>,
        version: Version,
        headers: HeaderMap,
        host_derived: bool,
    ) -> Self {
        let mut req = Request {
            method,
            uri,
            target,
            version,
            headers,
            body: Body::Empty,
            host_derived,
            cookies: None,
        };
        if host_derived {
            req.derive_host();
        }
        req
    }

    fn derive_host(&mut self) {
        let authority = self.uri.authority();
        if !authority.is_empty() {
            self.headers.set_internal("Host", &authority);
        } else {
            self.headers.remove("Host");
        }
        self.host_derived = true;
    }

    #[inline]
    pub fn method(&self) -> &Method {
        &self.method
    }

    #[inline]
    pub fn uri(&self) -> &Uri {
        &self.uri
    }

    #[inline]
    pub fn version(&self) -> Version {
        self.version
    }

    /// The request-target as it goes on the wire.
    pub fn target(&self) -> String {
        match &self.target {
            Some(t) => t.clone(),
            None => self.uri.path_and_query(),
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

    pub fn with_method(mut self, method: Method) -> Self {
        self.method = method;
        self
    }

    pub fn with_uri(mut self, uri: Uri) -> Self {
        self.uri = uri;
        self.target = None;
        if self.host_derived {
            self.derive_host();
        }
        self
    }

    pub fn with_target(mut self, target: Option<&str>) -> Self {
        self.target = target.map(str::to_string);
        self
    }

    pub fn with_version(mut self, version: Version) -> Result<Self, InvalidValueError> {
        super::check_version(version)?;
        self.version = version;
        Ok(self)
    }

    /// Replace all values stored under `name`.
    pub fn with_header(mut self, name: &str, value: &str) -> Result<Self, InvalidHeaderError> {
        self.headers.set(name, value)?;
        self.note_header_changed(name);
        Ok(self)
    }

    /// Append a value under `name`, keeping earlier values.
    pub fn with_added_header(
        mut self,
        name: &str,
        value: &str,
    ) -> Result<Self, InvalidHeaderError> {
        self.headers.append(name, value)?;
        self.note_header_changed(name);
        Ok(self)
    }

    /// Remove `name`. Removing `Host` re-derives it from the URI.
    pub fn without_header(mut self, name: &str) -> Self {
        self.headers.remove(name);
        if name.eq_ignore_ascii_case("Host") {
            self.derive_host();
        } else if name.eq_ignore_ascii_case("Cookie") {
            self.cookies = None;
        }
        self
    }

    fn note_header_changed(&mut self, name: &str) {
        if name.eq_ignore_ascii_case("Host") {
            self.host_derived = false;
        } else if name.eq_ignore_ascii_case("Cookie") {
            self.cookies = None;
        }
    }

    pub(crate) fn with_headers(mut self, headers: HeaderMap) -> Self {
        self.headers = headers;
        self.cookies = None;
        self
    }

    pub fn with_body<'b>(self, body: Body<'b>) -> Request<'b> {
        Request {
            method: self.method,
            uri: self.uri,
            target: self.target,
            version: self.version,
            headers: self.headers,
            body,
            host_derived: self.host_derived,
            cookies: self.cookies,
        }
    }

    /// The cookie pairs of the `Cookie` header, materialized on first use.
    /// Malformed pairs are skipped.
    pub fn cookies(&mut self) -> &[Cookie] {
        if self.cookies.is_none() {
            let jar = match self.headers.get_line("Cookie") {
                Some(line) => line
                    .split(';')
                    .filter_map(|pair| Cookie::from_pair(pair).ok())
                    .collect(),
                None => Vec::new(),
            };
            self.cookies = Some(jar);
        }
        match &self.cookies {
            Some(jar) => jar.as_slice(),
            None => &[],
        }
    }

    /// Add a cookie pair and re-serialize the jar into the `Cookie` header.
    pub fn with_cookie(mut self, cookie: Cookie) -> Self {
        let mut jar = std::mem::take(&mut self.cookies).unwrap_or_else(|| {
            match self.headers.get_line("Cookie") {
                Some(line) => line
                    .split(';')
                    .filter_map(|pair| Cookie::from_pair(pair).ok())
                    .collect(),
                None => Vec::new(),
            }
        });
        jar.push(cookie);
        self.store_cookie_jar(jar);
        self
    }

    pub fn without_cookie(mut self, name: &str) -> Self {
        let mut jar: Vec<Cookie> = match self.headers.get_line("Cookie") {
            Some(line) => line
                .split(';')
                .filter_map(|pair| Cookie::from_pair(pair).ok())
                .collect(),
            None => Vec::new(),
        };
        jar.retain(|c| c.name() != name);
        self.store_cookie_jar(jar);
        self
    }

    fn store_cookie_jar(&mut self, jar: Vec<Cookie>) {
        if jar.is_empty() {
            self.headers.remove("Cookie");
        } else {
            let line = jar
                .iter()
                .map(|c| c.to_string())
                .collect::<Vec<_>>()
                .join("; ");
            // cookie values are octet-checked at construction
            self.headers.set_internal("Cookie", &line);
        }
        self.cookies = Some(jar);
    }

    /// Wire bytes of the request line and header block, body excluded.
    pub fn serialize_head(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(256);
        let _ = write!(
            &mut buf,
            "{} {} {:?}\r\n",
            self.method,
            self.target(),
            self.version
        );
        serialize_headers(&self.headers, &mut buf);
        buf.extend_from_slice(b"\r\n");
        buf
    }
}
