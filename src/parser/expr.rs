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

//! Lexical helpers shared by the statement classifier.

/// Find the first byte index at nesting level zero (outside quotes, parens,
/// brackets and braces) for which `pred` holds.
pub(crate) fn find_top_level(text: &str, mut pred: impl FnMut(&[u8], usize) -> bool) -> Option<usize> {
    let bytes = text.as_bytes();
    let mut quote: Option<u8> = None;
    let mut depth = 0usize;
    let mut i = 0;
    while i < bytes.len() {
        let b = bytes[i];
        if let Some(q) = quote {
            if b == b'\\' {
                i += 2;
                continue;
            }
            if b == q {
                quote = None;
            }
            i += 1;
            continue;
        }
        match b {
            b'"' | b'\'' | b'`' => quote = Some(b),
            b'(' | b'[' | b'{' => depth += 1,
            b')' | b']' | b'}' => depth = depth.saturating_sub(1),
            _ if depth == 0 && pred(bytes, i) => return Some(i),
            _ => {}
        }
        i += 1;
    }
    None
}

/// Split on `sep` at nesting level zero. Empty input yields no parts.
pub(crate) fn split_top_level(text: &str, sep: u8) -> Vec<&str> {
    let text = text.trim();
    if text.is_empty() {
        return Vec::new();
    }
    let mut parts = Vec::new();
    let mut rest = text;
    while let Some(pos) = find_top_level(rest, |b, i| b[i] == sep) {
        parts.push(rest[..pos].trim());
        rest = &rest[pos + 1..];
    }
    parts.push(rest.trim());
    parts
}

/// Position of a plain `=` assignment operator.
pub(crate) fn find_assign(text: &str) -> Option<usize> {
    find_top_level(text, |b, i| {
        b[i] == b'='
            && b.get(i + 1) != Some(&b'=')
            && (i == 0 || !matches!(b[i - 1], b'=' | b'!' | b'<' | b'>' | b':'))
    })
}

/// Position and length of the first comparison operator.
pub(crate) fn find_comparison(text: &str) -> Option<(usize, usize)> {
    let pos = find_top_level(text, |b, i| match b[i] {
        b'=' | b'!' => b.get(i + 1) == Some(&b'='),
        b'<' | b'>' => true,
        _ => false,
    })?;
    let len = if text.as_bytes().get(pos + 1) == Some(&b'=') { 2 } else { 1 };
    Some((pos, len))
}

/// Whether the text has `&&` or `||` outside nested parts.
pub(crate) fn has_logical_operator(text: &str) -> bool {
    find_top_level(text, |b, i| {
        (b[i] == b'&' && b.get(i + 1) == Some(&b'&')) || (b[i] == b'|' && b.get(i + 1) == Some(&b'|'))
    })
    .is_some()
}

pub(crate) fn is_ident(text: &str) -> bool {
    let mut chars = text.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_' || c == ':')
}

/// Split `name(args)` into its name and raw argument text.
pub(crate) fn split_call(text: &str) -> Option<(&str, &str)> {
    let text = text.trim();
    if !text.ends_with(')') {
        return None;
    }
    let open = text.find('(')?;
    let name = text[..open].trim();
    if !is_ident(name) {
        return None;
    }
    let inner = &text[open + 1..text.len() - 1];
    // The opening paren must be closed by the last one.
    if !parens_balanced(inner) {
        return None;
    }
    Some((name, inner))
}

/// Whether every `)` outside quotes closes a `(` opened earlier in `text`
/// and nothing is left open at the end.
fn parens_balanced(text: &str) -> bool {
    let bytes = text.as_bytes();
    let mut quote: Option<u8> = None;
    let mut depth = 0isize;
    let mut i = 0;
    while i < bytes.len() {
        let b = bytes[i];
        if let Some(q) = quote {
            if b == b'\\' {
                i += 2;
                continue;
            }
            if b == q {
                quote = None;
            }
        } else {
            match b {
                b'"' | b'\'' | b'`' => quote = Some(b),
                b'(' => depth += 1,
                b')' => {
                    depth -= 1;
                    if depth < 0 {
                        return false;
                    }
                }
                _ => {}
            }
        }
        i += 1;
    }
    depth == 0
}

/// Split a trailing accessor annotation, `src as Type` or `src.(Type)`.
pub(crate) fn split_accessor(text: &str) -> (&str, Option<&str>) {
    let text = text.trim();
    if let Some(pos) = find_top_level(text, |b, i| b[i..].starts_with(b" as ")) {
        let name = text[pos + 4..].trim();
        if is_ident(name) {
            return (text[..pos].trim(), Some(name));
        }
    }
    if text.ends_with(')') {
        if let Some(pos) = text.rfind(".(") {
            let name = text[pos + 2..text.len() - 1].trim();
            if is_ident(name) {
                return (text[..pos].trim(), Some(name));
            }
        }
    }
    (text, None)
}
