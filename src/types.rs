/*
 * types.rs
 * Copyright (C) 2026 Chris Burdess
 *
 * This file is part of Mostra, an embeddable HTTP/1.x server library.
 *
 * Mostra is free software: you can redistribute it and/or modify
 * it under the terms of the GNU General Public License as published by
 * the Free Software Foundation, either version 3 of the License, or
 * (at your option) any later version.
 *
 * Mostra is distributed in the hope that it will be useful,
 * but WITHOUT ANY WARRANTY; without even the implied warranty of
 * MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
 * GNU General Public License for more details.
 *
 * You should have received a copy of the GNU General Public License
 * along with Mostra.  If not, see <http://www.gnu.org/licenses/>.
 */

//! Shared protocol types: protocol tag, response code, and the
//! case-insensitive header multimap.

use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::fmt;

/// HTTP protocol named in a request line (or chosen for a response line).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Protocol {
    /// Request line carried no protocol field (HTTP/0.9-style).
    None,
    /// Protocol field present but not HTTP/1.0 or HTTP/1.1.
    Unknown,
    Http1_0,
    Http1_1,
}

/// Numeric response code plus reason phrase. Any positive code is permitted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResponseCode {
    pub code: u16,
    pub description: String,
}

impl ResponseCode {
    pub fn new(code: u16, description: impl Into<String>) -> Self {
        Self {
            code,
            description: description.into(),
        }
    }
}

/// Query arguments: key to ordered list of values, duplicate keys preserved.
pub type QueryArgs = BTreeMap<String, Vec<String>>;

/// Locale-independent ASCII uppercase.
pub(crate) fn toupper_ascii(byte: u8) -> u8 {
    if byte.is_ascii_lowercase() {
        byte & !0x20
    } else {
        byte
    }
}

/// ASCII-case-insensitive ordering: uppercase-wise byte comparison, ties
/// broken by length.
pub fn cmp_ignore_case_ascii(lhs: &str, rhs: &str) -> Ordering {
    for (lhc, rhc) in lhs.bytes().zip(rhs.bytes()) {
        match toupper_ascii(lhc).cmp(&toupper_ascii(rhc)) {
            Ordering::Equal => continue,
            unequal => return unequal,
        }
    }
    lhs.len().cmp(&rhs.len())
}

/// Header name, compared and ordered ASCII-case-insensitively. The
/// as-inserted spelling is preserved for display.
#[derive(Debug, Clone)]
pub struct HeaderName(String);

impl HeaderName {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for HeaderName {
    fn from(name: &str) -> Self {
        Self(name.to_string())
    }
}

impl From<String> for HeaderName {
    fn from(name: String) -> Self {
        Self(name)
    }
}

impl fmt::Display for HeaderName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl PartialEq for HeaderName {
    fn eq(&self, other: &Self) -> bool {
        cmp_ignore_case_ascii(&self.0, &other.0) == Ordering::Equal
    }
}

impl Eq for HeaderName {}

impl PartialOrd for HeaderName {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for HeaderName {
    fn cmp(&self, other: &Self) -> Ordering {
        cmp_ignore_case_ascii(&self.0, &other.0)
    }
}

/// Header multimap: name to ordered list of values. Lookup is
/// ASCII-case-insensitive; order within a value list is insertion order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Headers {
    entries: BTreeMap<HeaderName, Vec<String>>,
}

impl Headers {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append one value under `name`, keeping any existing values.
    pub fn append(&mut self, name: impl Into<HeaderName>, value: impl Into<String>) {
        self.entries
            .entry(name.into())
            .or_default()
            .push(value.into());
    }

    /// Replace all values under `name`.
    pub fn insert(&mut self, name: impl Into<HeaderName>, values: Vec<String>) {
        self.entries.insert(name.into(), values);
    }

    /// Values under `name`, if any.
    pub fn get(&self, name: &str) -> Option<&[String]> {
        self.entries
            .get(&HeaderName::from(name))
            .map(|values| values.as_slice())
    }

    /// First value under `name`, if any.
    pub fn get_first(&self, name: &str) -> Option<&str> {
        self.get(name).and_then(|values| values.first()).map(|v| v.as_str())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(&HeaderName::from(name))
    }

    pub fn iter(&self) -> impl Iterator<Item = (&HeaderName, &[String])> {
        self.entries
            .iter()
            .map(|(name, values)| (name, values.as_slice()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<'a, const N: usize> From<[(&'a str, &'a str); N]> for Headers {
    fn from(pairs: [(&'a str, &'a str); N]) -> Self {
        let mut headers = Headers::new();
        for (name, value) in pairs {
            headers.append(name, value);
        }
        headers
    }
}
