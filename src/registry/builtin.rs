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

//! Built-in function library.
//!
//! Registered by [`DxRegistry::with_builtins`]. Every function receives its
//! arguments already resolved; arity is checked against the registered
//! minimum before the call, so bodies only index into what was promised.

use std::fmt::Write;

use chrono::{DateTime, Utc};
use regex::Regex;

use crate::context::DxCtx;
use crate::document::parse_document;
use crate::errors::{DxError, Result};
use crate::registry::DxRegistry;
use crate::value::DxValue;

pub fn register_builtins(registry: &mut DxRegistry) {
    registry
        .register_modifier("default", "def", mod_default)
        .with_min_args(1)
        .with_description("Replace an absent value with the first argument.");
    registry
        .register_modifier("ifThen", "if", mod_if_then)
        .with_min_args(1)
        .with_description("Return the first argument if the value is truthy.");
    registry
        .register_modifier("ifThenElse", "ifel", mod_if_then_else)
        .with_min_args(2)
        .with_description("Return the first argument if the value is truthy, the second otherwise.");
    registry
        .register_modifier("format", "fmt", mod_format)
        .with_min_args(1)
        .with_description("Printf-like formatting with %s %d %f %v verbs.");
    registry
        .register_modifier("replace", "", mod_replace)
        .with_min_args(2)
        .with_description("Replace every regex match with the replacement text.");
    registry
        .register_modifier("date", "", mod_date)
        .with_min_args(1)
        .with_description("Format unix seconds or RFC 3339 text with a strftime layout.");
    registry
        .register_modifier("trim", "", mod_trim)
        .with_description("Strip surrounding whitespace.");
    registry
        .register_modifier("lower", "", mod_lower)
        .with_description("Lowercase text.");
    registry
        .register_modifier("upper", "", mod_upper)
        .with_description("Uppercase text.");

    registry
        .register_getter("crc32", "", getter_crc32)
        .with_min_args(1)
        .with_description("CRC32 (IEEE) of the concatenated arguments.");
    registry
        .register_getter("atoi", "", getter_atoi)
        .with_min_args(1)
        .with_description("Parse text as a signed integer.");
    registry
        .register_getter("atou", "", getter_atou)
        .with_min_args(1)
        .with_description("Parse text as an unsigned integer.");
    registry
        .register_getter("atof", "", getter_atof)
        .with_min_args(1)
        .with_description("Parse text as a float.");
    registry
        .register_getter("atob", "", getter_atob)
        .with_min_args(1)
        .with_description("Parse text as a boolean.");
    registry
        .register_getter("itoa", "", getter_itoa)
        .with_min_args(1)
        .with_description("Render a signed integer as text.");
    registry
        .register_getter("utoa", "", getter_utoa)
        .with_min_args(1)
        .with_description("Render an unsigned integer as text.");
    registry
        .register_getter("len", "", getter_len)
        .with_min_args(1)
        .with_description("Length of text or of a document collection.");

    registry
        .register_callback("jsonParseAs", "jsonParse", cb_json_parse)
        .with_min_args(2)
        .with_description("Parse JSON text and register it as a context variable.");
    registry
        .register_callback("yamlParseAs", "yamlParse", cb_yaml_parse)
        .with_min_args(2)
        .with_description("Parse YAML text and register it as a context variable.");
    registry
        .register_callback("urlParseAs", "urlParse", cb_url_parse)
        .with_min_args(2)
        .with_description("Parse a URL query and register it as a context variable.");

    registry
        .register_condition_helper("empty", "", helper_empty)
        .with_min_args(1)
        .with_description("True if the argument is absent or empty.");
    registry
        .register_condition_helper("notEmpty", "", helper_not_empty)
        .with_min_args(1)
        .with_description("True if the argument is present and not empty.");

    registry
        .register_condition_ok_helper("tryInt", cond_try_int)
        .with_min_args(1)
        .with_description("Bind the argument as an integer if it parses.");
    registry
        .register_condition_ok_helper("tryFloat", cond_try_float)
        .with_min_args(1)
        .with_description("Bind the argument as a float if it parses.");
}

fn text_arg<'v>(function: &str, args: &'v [DxValue], index: usize) -> Result<std::borrow::Cow<'v, str>> {
    args.get(index)
        .and_then(DxValue::as_str)
        .ok_or_else(|| DxError::internal(format!("{}: argument {} is not text", function, index)))
}

fn mod_default(_: &mut DxCtx, value: DxValue, args: &[DxValue]) -> Result<DxValue> {
    if value.is_present() {
        return Ok(value);
    }
    Ok(args[0].clone())
}

fn mod_if_then(_: &mut DxCtx, value: DxValue, args: &[DxValue]) -> Result<DxValue> {
    if value.is_truthy() {
        return Ok(args[0].clone());
    }
    Ok(DxValue::Null)
}

fn mod_if_then_else(_: &mut DxCtx, value: DxValue, args: &[DxValue]) -> Result<DxValue> {
    if value.is_truthy() {
        Ok(args[0].clone())
    } else {
        Ok(args[1].clone())
    }
}

/// Printf-like formatting into the context buffer. The modified value itself
/// is ignored; the first argument is the layout.
fn mod_format(ctx: &mut DxCtx, _: DxValue, args: &[DxValue]) -> Result<DxValue> {
    let Some(layout) = args[0].as_str() else {
        return Ok(DxValue::Null);
    };
    ctx.buf.clear();
    let mut rest = args[1..].iter();
    let mut chars = layout.chars().peekable();
    while let Some(c) = chars.next() {
        if c != '%' {
            ctx.buf.push(c);
            continue;
        }
        let mut precision = None;
        if chars.peek() == Some(&'.') {
            chars.next();
            let mut digits = String::new();
            while let Some(d) = chars.peek().copied().filter(char::is_ascii_digit) {
                digits.push(d);
                chars.next();
            }
            precision = digits.parse::<usize>().ok();
        }
        match chars.next() {
            Some('%') => ctx.buf.push('%'),
            Some('d') => match rest.next().and_then(DxValue::as_i64) {
                Some(v) => {
                    let _ = write!(ctx.buf, "{}", v);
                }
                None => ctx.buf.push_str("%!d(bad)"),
            },
            Some('f') => match rest.next().and_then(DxValue::as_f64) {
                Some(v) => {
                    let _ = write!(ctx.buf, "{:.*}", precision.unwrap_or(6), v);
                }
                None => ctx.buf.push_str("%!f(bad)"),
            },
            Some('s') | Some('v') => match rest.next() {
                Some(v) => v.write_text(&mut ctx.buf),
                None => ctx.buf.push_str("%!(missing)"),
            },
            Some(other) => {
                ctx.buf.push('%');
                ctx.buf.push(other);
            }
            None => ctx.buf.push('%'),
        }
    }
    Ok(DxValue::Str(ctx.buf.clone()))
}

fn mod_replace(_: &mut DxCtx, value: DxValue, args: &[DxValue]) -> Result<DxValue> {
    let Some(text) = value.as_str() else {
        return Ok(DxValue::Null);
    };
    let pattern = text_arg("replace", args, 0)?;
    let replacement = text_arg("replace", args, 1)?;
    let re = Regex::new(&pattern).map_err(|e| DxError::internal(format!("replace: {}", e)))?;
    Ok(DxValue::Str(re.replace_all(&text, &*replacement).into_owned()))
}

fn mod_date(_: &mut DxCtx, value: DxValue, args: &[DxValue]) -> Result<DxValue> {
    let layout = text_arg("date", args, 0)?;
    let moment: Option<DateTime<Utc>> = match value.as_i64() {
        Some(secs) => DateTime::from_timestamp(secs, 0),
        None => value
            .as_str()
            .and_then(|text| DateTime::parse_from_rfc3339(text.trim()).ok())
            .map(|dt| dt.with_timezone(&Utc)),
    };
    let Some(dt) = moment else {
        return Ok(DxValue::Null);
    };
    let mut out = String::new();
    write!(out, "{}", dt.format(&layout))
        .map_err(|_| DxError::internal(format!("date: invalid layout '{}'", layout)))?;
    Ok(DxValue::Str(out))
}

fn mod_trim(_: &mut DxCtx, value: DxValue, _: &[DxValue]) -> Result<DxValue> {
    Ok(match value.as_str() {
        Some(text) => DxValue::Str(text.trim().to_string()),
        None => DxValue::Null,
    })
}

fn mod_lower(_: &mut DxCtx, value: DxValue, _: &[DxValue]) -> Result<DxValue> {
    Ok(match value.as_str() {
        Some(text) => DxValue::Str(text.to_lowercase()),
        None => DxValue::Null,
    })
}

fn mod_upper(_: &mut DxCtx, value: DxValue, _: &[DxValue]) -> Result<DxValue> {
    Ok(match value.as_str() {
        Some(text) => DxValue::Str(text.to_uppercase()),
        None => DxValue::Null,
    })
}

/// CRC32 over the text of every argument. Absent arguments contribute
/// nothing; if nothing was hashed the result is absent.
fn getter_crc32(ctx: &mut DxCtx, args: &[DxValue]) -> Result<DxValue> {
    ctx.buf.clear();
    for arg in args {
        arg.write_text(&mut ctx.buf);
    }
    if ctx.buf.is_empty() {
        return Ok(DxValue::Null);
    }
    Ok(DxValue::Int(i64::from(crc32fast::hash(ctx.buf.as_bytes()))))
}

fn getter_atoi(_: &mut DxCtx, args: &[DxValue]) -> Result<DxValue> {
    let text = text_arg("atoi", args, 0)?;
    text.trim()
        .parse::<i64>()
        .map(DxValue::Int)
        .map_err(|e| DxError::internal(format!("atoi '{}': {}", text, e)))
}

fn getter_atou(_: &mut DxCtx, args: &[DxValue]) -> Result<DxValue> {
    let text = text_arg("atou", args, 0)?;
    text.trim()
        .parse::<u64>()
        .map(DxValue::Uint)
        .map_err(|e| DxError::internal(format!("atou '{}': {}", text, e)))
}

fn getter_atof(_: &mut DxCtx, args: &[DxValue]) -> Result<DxValue> {
    let text = text_arg("atof", args, 0)?;
    text.trim()
        .parse::<f64>()
        .map(DxValue::Float)
        .map_err(|e| DxError::internal(format!("atof '{}': {}", text, e)))
}

fn getter_atob(_: &mut DxCtx, args: &[DxValue]) -> Result<DxValue> {
    let text = text_arg("atob", args, 0)?;
    match text.trim() {
        "1" | "t" | "T" | "true" | "TRUE" | "True" => Ok(DxValue::Bool(true)),
        "0" | "f" | "F" | "false" | "FALSE" | "False" => Ok(DxValue::Bool(false)),
        other => Err(DxError::internal(format!("atob: invalid syntax '{}'", other))),
    }
}

fn getter_itoa(_: &mut DxCtx, args: &[DxValue]) -> Result<DxValue> {
    args[0]
        .as_i64()
        .map(|v| DxValue::Str(v.to_string()))
        .ok_or_else(|| DxError::internal(format!("itoa: {} is not an integer", args[0].type_name())))
}

fn getter_utoa(_: &mut DxCtx, args: &[DxValue]) -> Result<DxValue> {
    args[0]
        .as_u64()
        .map(|v| DxValue::Str(v.to_string()))
        .ok_or_else(|| DxError::internal(format!("utoa: {} is not an unsigned integer", args[0].type_name())))
}

fn getter_len(_: &mut DxCtx, args: &[DxValue]) -> Result<DxValue> {
    Ok(match args[0].len() {
        Some(len) => DxValue::Int(len as i64),
        None => DxValue::Null,
    })
}

/// `fooParse(src, name)`: parse `src` and register the document as `name`.
/// An empty source registers nothing.
fn parse_into(ctx: &mut DxCtx, args: &[DxValue], format: &str) -> Result<()> {
    let Some(src) = args[0].as_str() else {
        return Ok(());
    };
    if src.is_empty() {
        return Ok(());
    }
    let name = text_arg(format, args, 1)?;
    let node = parse_document(format, src.as_bytes())?;
    ctx.set_node(&name, node)
}

fn cb_json_parse(ctx: &mut DxCtx, args: &[DxValue]) -> Result<()> {
    parse_into(ctx, args, "json")
}

fn cb_yaml_parse(ctx: &mut DxCtx, args: &[DxValue]) -> Result<()> {
    parse_into(ctx, args, "yaml")
}

fn cb_url_parse(ctx: &mut DxCtx, args: &[DxValue]) -> Result<()> {
    parse_into(ctx, args, "url")
}

fn helper_empty(_: &mut DxCtx, args: &[DxValue]) -> Result<bool> {
    Ok(!args[0].is_present() || args[0].is_empty())
}

fn helper_not_empty(ctx: &mut DxCtx, args: &[DxValue]) -> Result<bool> {
    helper_empty(ctx, args).map(|empty| !empty)
}

fn cond_try_int(_: &mut DxCtx, args: &[DxValue]) -> Result<(DxValue, bool)> {
    Ok(match args[0].as_i64() {
        Some(v) => (DxValue::Int(v), true),
        None => (DxValue::Null, false),
    })
}

fn cond_try_float(_: &mut DxCtx, args: &[DxValue]) -> Result<(DxValue, bool)> {
    Ok(match args[0].as_f64() {
        Some(v) => (DxValue::Float(v), true),
        None => (DxValue::Null, false),
    })
}
