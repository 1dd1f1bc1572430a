/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 ByteDance and/or its affiliates.
 */

use std::fmt;

use super::percent;

/// Ordered query-string multimap. Keys keep first-insertion order and
/// every key keeps its values in append order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Query {
    entries: Vec<(String, Vec<String>)>,
}

impl Query {
    pub fn parse(s: &str) -> Self {
        let mut query = Query::default();
        for pair in s.split('&') {
            if pair.is_empty() {
                continue;
            }
            match memchr::memchr(b'=', pair.as_bytes()) {
                Some(p) => {
                    let name = percent::decode(&pair[..p]);
                    let value = percent::decode(&pair[p + 1..]);
                    query.append(name, value);
                }
                None => query.append(percent::decode(pair), String::new()),
            }
        }
        query
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(n, _)| n == name)
            .and_then(|(_, v)| v.first().map(|s| s.as_str()))
    }

    pub fn get_all(&self, name: &str) -> Option<&[String]> {
        self.entries
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_slice())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.iter().any(|(n, _)| n == name)
    }

    /// Replace all values stored under `name`.
    pub fn set(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        let value = value.into();
        match self.entries.iter_mut().find(|(n, _)| *n == name) {
            Some((_, values)) => {
                values.clear();
                values.push(value);
            }
            None => self.entries.push((name, vec![value])),
        }
    }

    pub fn append(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        let value = value.into();
        match self.entries.iter_mut().find(|(n, _)| *n == name) {
            Some((_, values)) => values.push(value),
            None => self.entries.push((name, vec![value])),
        }
    }

    pub fn remove(&mut self, name: &str) {
        self.entries.retain(|(n, _)| n != name);
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.entries.iter().map(|(n, v)| (n.as_str(), v.as_slice()))
    }
}

impl fmt::Display for Query {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for (name, values) in self.entries.iter() {
            for value in values {
                if !first {
                    f.write_str("&")?;
                }
                first = false;
                f.write_str(&percent::encode_component(name))?;
                if !value.is_empty() {
                    f.write_str("=")?;
                    f.write_str(&percent::encode_component(value))?;
                }
            }
        }
        Ok(())
    }
}
