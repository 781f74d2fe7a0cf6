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

//! Control-unit scanner.
//!
//! A unit is one statement, one block header (ending with `{`), one block
//! close (`}` or `} else ... {`) or one `case`/`default` label. Units end at a
//! newline unless a `{`, `;` or `}` comes first. A `.{` opens a fallback set,
//! not a block, and `;` inside `for` headers and ok-binding `if` headers is part
//! of the header.

/// One unit of source with its byte offset.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) struct DxUnit<'a> {
    pub text: &'a str,
    pub offset: usize,
}

/// Extract the unit starting at or after `pos`. Returns the unit and the
/// position to continue from, `None` at EOF.
pub(crate) fn next_unit(src: &str, mut pos: usize) -> Option<(DxUnit<'_>, usize)> {
    let bytes = src.as_bytes();
    loop {
        while pos < bytes.len() && matches!(bytes[pos], b' ' | b'\t' | b'\n' | b'\r' | b';') {
            pos += 1;
        }
        if pos >= bytes.len() {
            return None;
        }
        if bytes[pos] == b'#' || src[pos..].starts_with("//") {
            while pos < bytes.len() && bytes[pos] != b'\n' {
                pos += 1;
            }
            continue;
        }
        break;
    }

    let start = pos;
    let line_end = src[start..]
        .find(['\n', '\r'])
        .map(|i| start + i)
        .unwrap_or(bytes.len());
    let line = &src[start..line_end];
    let is_for = line.starts_with("for ");
    let is_label = line.starts_with("case ") || line.starts_with("default");
    let is_ok_binding = line.starts_with("if ") && line.contains(":=");

    let mut quote: Option<u8> = None;
    let mut parens = 0usize;
    let mut sets = 0usize;
    let mut end = line_end;
    let mut next = line_end;
    let mut j = start;
    while j < line_end {
        let b = bytes[j];
        if let Some(q) = quote {
            if b == b'\\' {
                j += 2;
                continue;
            }
            if b == q {
                quote = None;
            }
            j += 1;
            continue;
        }
        match b {
            b'"' | b'\'' | b'`' => quote = Some(b),
            b'(' => parens += 1,
            b')' => parens = parens.saturating_sub(1),
            b'{' => {
                if j > start && bytes[j - 1] == b'.' {
                    sets += 1;
                } else {
                    end = j + 1;
                    next = j + 1;
                    break;
                }
            }
            b'}' => {
                if sets > 0 {
                    sets -= 1;
                } else if j > start {
                    end = j;
                    next = j;
                    break;
                } else if !src[j + 1..line_end].trim_start().starts_with("else") {
                    end = j + 1;
                    next = j + 1;
                    break;
                }
            }
            b';' if parens == 0 && !is_for && !is_ok_binding => {
                end = j;
                next = j + 1;
                break;
            }
            b':' if is_label && parens == 0 && bytes.get(j + 1) != Some(&b'=') => {
                end = j + 1;
                next = j + 1;
                break;
            }
            _ => {}
        }
        j += 1;
    }

    let text = src[start..end].trim_end();
    Some((DxUnit { text, offset: start }, next))
}
