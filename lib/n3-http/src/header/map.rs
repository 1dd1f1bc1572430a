/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 ByteDance and/or its affiliates.
 */

use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum InvalidHeaderError {
    #[error("invalid header name: {0:?}")]
    InvalidName(String),
    #[error("invalid header value for {0:?}")]
    InvalidValue(String),
}

fn is_token_char(b: u8) -> bool {
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

fn validate_name(name: &str) -> Result<(), InvalidHeaderError> {
    if name.is_empty() || !name.bytes().all(is_token_char) {
        return Err(InvalidHeaderError::InvalidName(name.to_string()));
    }
    Ok(())
}

fn validate_value(name: &str, value: &str) -> Result<(), InvalidHeaderError> {
    if value.bytes().any(|b| matches!(b, b'\0' | b'\r' | b'\n')) {
        return Err(InvalidHeaderError::InvalidValue(name.to_string()));
    }
    Ok(())
}

#[derive(Debug, Clone)]
struct HeaderEntry {
    /// the spelling of the first occurrence, kept for serialization
    name: String,
    lower: String,
    values: Vec<String>,
}

/// Insertion-ordered multi-value header map.
///
/// Lookups are case-insensitive; the stored spelling is that of the first
/// occurrence and is what serialization emits. `set` adopts the spelling of
/// the new name.
#[derive(Debug, Clone, Default)]
pub struct HeaderMap {
    entries: Vec<HeaderEntry>,
}

impl HeaderMap {
    pub fn new() -> Self {
        HeaderMap::default()
    }

    fn find(&self, name: &str) -> Option<usize> {
        self.entries
            .iter()
            .position(|e| e.lower.eq_ignore_ascii_case(name))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.find(name).is_some()
    }

    /// First value stored under `name`.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.find(name)
            .and_then(|i| self.entries[i].values.first().map(|v| v.as_str()))
    }

    pub fn get_all(&self, name: &str) -> &[String] {
        match self.find(name) {
            Some(i) => self.entries[i].values.as_slice(),
            None => &[],
        }
    }

    /// All values under `name` joined with `, `, the way they appear in a
    /// folded header line.
    pub fn get_line(&self, name: &str) -> Option<String> {
        self.find(name).map(|i| self.entries[i].values.join(", "))
    }

    /// Replace all values stored under `name`, adopting the new spelling.
    pub fn set(&mut self, name: &str, value: &str) -> Result<(), InvalidHeaderError> {
        validate_name(name)?;
        let value = value.trim();
        validate_value(name, value)?;
        match self.find(name) {
            Some(i) => {
                let entry = &mut self.entries[i];
                entry.name = name.to_string();
                entry.lower = name.to_ascii_lowercase();
                entry.values.clear();
                entry.values.push(value.to_string());
            }
            None => self.entries.push(HeaderEntry {
                name: name.to_string(),
                lower: name.to_ascii_lowercase(),
                values: vec![value.to_string()],
            }),
        }
        Ok(())
    }

    /// Append a value, keeping the originally stored spelling.
    pub fn append(&mut self, name: &str, value: &str) -> Result<(), InvalidHeaderError> {
        validate_name(name)?;
        let value = value.trim();
        validate_value(name, value)?;
        match self.find(name) {
            Some(i) => self.entries[i].values.push(value.to_string()),
            None => self.entries.push(HeaderEntry {
                name: name.to_string(),
                lower: name.to_ascii_lowercase(),
                values: vec![value.to_string()],
            }),
        }
        Ok(())
    }

    /// Replace values with one produced inside the crate, known to be
    /// free of control bytes.
    pub(crate) fn set_internal(&mut self, name: &str, value: &str) {
        match self.find(name) {
            Some(i) => {
                let entry = &mut self.entries[i];
                entry.name = name.to_string();
                entry.lower = name.to_ascii_lowercase();
                entry.values.clear();
                entry.values.push(value.to_string());
            }
            None => self.entries.push(HeaderEntry {
                name: name.to_string(),
                lower: name.to_ascii_lowercase(),
                values: vec![value.to_string()],
            }),
        }
    }

    pub(crate) fn append_internal(&mut self, name: &str, value: &str) {
        match self.find(name) {
            Some(i) => self.entries[i].values.push(value.to_string()),
            None => self.entries.push(HeaderEntry {
                name: name.to_string(),
                lower: name.to_ascii_lowercase(),
                values: vec![value.to_string()],
            }),
        }
    }

    pub fn remove(&mut self, name: &str) -> bool {
        match self.find(name) {
            Some(i) => {
                self.entries.remove(i);
                true
            }
            None => false,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Iterate entries in first-insertion order as `(stored name, values)`.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.entries
            .iter()
            .map(|e| (e.name.as_str(), e.values.as_slice()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn case_insensitive_lookup() {
        let mut map = HeaderMap::new();
        map.set("Content-Type", "text/plain").unwrap();
        assert_eq!(map.get("content-type"), Some("text/plain"));
        assert_eq!(map.get("CONTENT-TYPE"), Some("text/plain"));
        assert!(map.contains("cOnTeNt-TyPe"));
    }

    #[test]
    fn append_keeps_first_spelling() {
        let mut map = HeaderMap::new();
        map.append("X-Tag", "a").unwrap();
        map.append("x-tag", "b").unwrap();
        let entries: Vec<_> = map.iter().collect();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].0, "X-Tag");
        assert_eq!(entries[0].1, &["a".to_string(), "b".to_string()]);
    }

    #[test]
    fn set_adopts_new_spelling() {
        let mut map = HeaderMap::new();
        map.set("x-tag", "a").unwrap();
        map.set("X-TAG", "b").unwrap();
        let entries: Vec<_> = map.iter().collect();
        assert_eq!(entries[0].0, "X-TAG");
        assert_eq!(entries[0].1, &["b".to_string()]);
    }

    #[test]
    fn insertion_order_kept() {
        let mut map = HeaderMap::new();
        map.set("B", "2").unwrap();
        map.set("A", "1").unwrap();
        map.set("C", "3").unwrap();
        let names: Vec<_> = map.iter().map(|(n, _)| n).collect();
        assert_eq!(names, ["B", "A", "C"]);
    }

    #[test]
    fn reject_control_chars() {
        let mut map = HeaderMap::new();
        assert!(map.set("X", "a\r\nb").is_err());
        assert!(map.set("X", "a\0b").is_err());
        assert!(map.set("bad name", "a").is_err());
        assert!(map.set("", "a").is_err());
    }

    #[test]
    fn value_trimmed() {
        let mut map = HeaderMap::new();
        map.set("X", "  spaced  ").unwrap();
        assert_eq!(map.get("X"), Some("spaced"));
    }

    #[test]
    fn get_line_joins() {
        let mut map = HeaderMap::new();
        map.append("Accept", "text/html").unwrap();
        map.append("Accept", "*/*").unwrap();
        assert_eq!(map.get_line("accept").unwrap(), "text/html, */*");
    }
}
