//! Copyright © 2025-2026 Wenze Wei. All Rights Reserved.
//!
//! This file is part of Decodex.
//! The Decodex project belongs to the Dunimd Team.
//!
//! Licensed under the Apache License, Version 2.0 (the "License");
//! You may not use this file except in compliance with the License.
//! You may obtain a copy of the License at
//!
//!     http://www.apache.org/licenses/LICENSE-2.0
//!
//! Unless required by applicable law or agreed to in writing, software
//! distributed under the License is distributed on an "AS IS" BASIS,
//! WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
//! See the License for the specific language governing permissions and
//! limitations under the License.

//! # Path Module
//!
//! Paths address values inside context variables: `obj.Finance.Balance`.
//!
//! ## Syntax
//!
//! - `a.b.c` plain dotted segments
//! - `a[k]` is sugar for `a.k`, quotes inside brackets are dropped
//! - `a.{k1|k2|k3}` is a fallback set, the first key resolving to a present
//!   value wins; the set may be followed by more segments (`a.{x|y}.z`)
//! - a trailing `@suffix` on the last segment becomes its own token; document
//!   lookups skip such tokens, accessors may interpret them
//!
//! Paths are compiled once at parse time into [`DxPath`], so decoding never
//! splits strings.

use std::borrow::Cow;

use crate::value::{parse_i64, DxValue};

/// Compiled path expression.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct DxPath {
    raw: String,
    segments: Vec<String>,
    fallbacks: Vec<Vec<String>>,
}

impl DxPath {
    pub fn parse(raw: &str) -> DxPath {
        let raw = raw.trim();
        let normalized = replace_brackets(raw);
        match split_fallback(&normalized) {
            Some((prefix, keys, suffix)) => {
                let segments = split_path(prefix);
                let tail = split_path(suffix);
                let fallbacks = keys
                    .iter()
                    .map(|key| {
                        let mut candidate = segments.clone();
                        candidate.push((*key).to_string());
                        candidate.extend(tail.iter().cloned());
                        candidate
                    })
                    .collect();
                DxPath {
                    raw: raw.to_string(),
                    segments,
                    fallbacks,
                }
            }
            None => DxPath {
                raw: raw.to_string(),
                segments: split_path(&normalized),
                fallbacks: Vec::new(),
            },
        }
    }

    pub fn raw(&self) -> &str {
        &self.raw
    }

    /// Segments of the path, or of the base path before a fallback set.
    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    /// Full candidate paths produced by a fallback set, in priority order.
    pub fn fallbacks(&self) -> &[Vec<String>] {
        &self.fallbacks
    }

    pub fn has_fallback(&self) -> bool {
        !self.fallbacks.is_empty()
    }

    /// Name of the context variable the path starts from.
    pub fn root(&self) -> &str {
        self.segments
            .first()
            .or_else(|| self.fallbacks.first().and_then(|c| c.first()))
            .map(String::as_str)
            .unwrap_or("")
    }

    pub fn is_empty(&self) -> bool {
        self.raw.is_empty()
    }
}

/// Rewrite `a[k]` into `a.k`.
pub fn replace_brackets(path: &str) -> Cow<'_, str> {
    if !path.contains('[') {
        return Cow::Borrowed(path);
    }
    let mut out = String::with_capacity(path.len());
    let mut chars = path.chars().peekable();
    while let Some(ch) = chars.next() {
        match ch {
            '[' => {
                if !out.is_empty() && !out.ends_with('.') {
                    out.push('.');
                }
                let mut key = String::new();
                for inner in chars.by_ref() {
                    if inner == ']' {
                        break;
                    }
                    key.push(inner);
                }
                out.push_str(trim_quotes(key.trim()));
            }
            _ => out.push(ch),
        }
    }
    Cow::Owned(out)
}

/// Split a dotted path, turning a trailing `@suffix` into its own token.
pub fn split_path(path: &str) -> Vec<String> {
    let path = path.trim_matches('.');
    if path.is_empty() {
        return Vec::new();
    }
    let mut segments: Vec<String> = path
        .split('.')
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect();
    if let Some(last) = segments.last_mut() {
        if let Some(pos) = last.find('@') {
            if pos > 0 && last.len() - pos > 1 {
                let token = last.split_off(pos);
                segments.push(token);
            }
        }
    }
    segments
}

/// Locate a `.{k1|k2}` fallback set and return `(prefix, keys, suffix)`.
pub fn split_fallback(path: &str) -> Option<(&str, Vec<&str>, &str)> {
    let open = path.find(".{")?;
    let close = path[open..].find('}')? + open;
    let keys: Vec<&str> = path[open + 2..close]
        .split('|')
        .map(str::trim)
        .filter(|k| !k.is_empty())
        .collect();
    if keys.is_empty() {
        return None;
    }
    Some((&path[..open], keys, &path[close + 1..]))
}

pub fn trim_quotes(text: &str) -> &str {
    let bytes = text.as_bytes();
    if bytes.len() >= 2 {
        let (first, last) = (bytes[0], bytes[bytes.len() - 1]);
        if first == last && matches!(first, b'"' | b'\'' | b'`') {
            return &text[1..text.len() - 1];
        }
    }
    text
}

/// Recognize a static literal: quoted string, number, `true` or `false`.
pub fn parse_literal(text: &str) -> Option<DxValue> {
    let text = text.trim();
    if text.is_empty() {
        return None;
    }
    let bytes = text.as_bytes();
    let first = bytes[0];
    if matches!(first, b'"' | b'\'' | b'`') {
        if bytes.len() >= 2 && bytes[bytes.len() - 1] == first {
            return Some(DxValue::Str(unescape(&text[1..text.len() - 1], first as char)));
        }
        return None;
    }
    match text {
        "true" => return Some(DxValue::Bool(true)),
        "false" => return Some(DxValue::Bool(false)),
        _ => {}
    }
    if !(first.is_ascii_digit() || ((first == b'-' || first == b'+') && bytes.len() > 1)) {
        return None;
    }
    if let Some(v) = parse_i64(text) {
        return Some(DxValue::Int(v));
    }
    if let Ok(v) = text.parse::<u64>() {
        return Some(DxValue::Uint(v));
    }
    if text.bytes().all(|b| b.is_ascii_digit() || matches!(b, b'.' | b'-' | b'+' | b'e' | b'E')) {
        if let Ok(v) = text.parse::<f64>() {
            return Some(DxValue::Float(v));
        }
    }
    None
}

fn unescape(text: &str, quote: char) -> String {
    if !text.contains('\\') {
        return text.to_string();
    }
    let mut out = String::with_capacity(text.len());
    let mut chars = text.chars();
    while let Some(ch) = chars.next() {
        if ch != '\\' {
            out.push(ch);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('t') => out.push('\t'),
            Some('\\') => out.push('\\'),
            Some(c) if c == quote => out.push(c),
            Some(c) => {
                out.push('\\');
                out.push(c);
            }
            None => out.push('\\'),
        }
    }
    out
}
