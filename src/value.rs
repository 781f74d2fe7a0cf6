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

//! # Value Module
//!
//! [`DxValue`] is the closed set of values flowing through a decode: literals,
//! resolved document nodes, host object handles and results of functions.
//! Conversions are exhaustive matches over the variants so every kind of
//! value has a defined behavior in every conversion.
//!
//! [`DxValue::Null`] doubles as the "undefined" sentinel: a path that doesn't
//! resolve produces it, and modifiers receive it unchanged.

use std::any::Any;
use std::borrow::Cow;
use std::cmp::Ordering;
use std::fmt;
use std::sync::{Arc, Mutex};

use serde_json::Value;

use crate::document::DxDocNode;
use crate::errors::{DxError, Result};
use crate::tree::DxOp;

/// Shared handle to a host object.
///
/// The caller keeps a clone to read the destination back after decoding while
/// the context writes through its own clone. Field accessors downcast the
/// handle to the concrete type they understand.
#[derive(Clone)]
pub struct DxHost(Arc<Mutex<dyn Any + Send>>);

impl DxHost {
    pub fn new<T: Any + Send>(value: T) -> Self {
        let inner: Arc<Mutex<dyn Any + Send>> = Arc::new(Mutex::new(value));
        DxHost(inner)
    }

    /// Run `f` over a shared view of the host object downcast to `T`.
    pub fn with<T: Any, R>(&self, f: impl FnOnce(&T) -> R) -> Result<R> {
        let guard = self
            .0
            .lock()
            .map_err(|_| DxError::internal("host value lock poisoned"))?;
        let target = (&*guard as &dyn Any)
            .downcast_ref::<T>()
            .ok_or_else(|| DxError::internal(format!("host value is not a {}", std::any::type_name::<T>())))?;
        Ok(f(target))
    }

    /// Run `f` over a mutable view of the host object downcast to `T`.
    pub fn with_mut<T: Any, R>(&self, f: impl FnOnce(&mut T) -> R) -> Result<R> {
        let mut guard = self
            .0
            .lock()
            .map_err(|_| DxError::internal("host value lock poisoned"))?;
        let target = (&mut *guard as &mut dyn Any)
            .downcast_mut::<T>()
            .ok_or_else(|| DxError::internal(format!("host value is not a {}", std::any::type_name::<T>())))?;
        Ok(f(target))
    }

    pub fn is<T: Any>(&self) -> bool {
        self.0
            .lock()
            .map(|guard| (&*guard as &dyn Any).is::<T>())
            .unwrap_or(false)
    }

    pub fn ptr_eq(&self, other: &DxHost) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl fmt::Debug for DxHost {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("DxHost(..)")
    }
}

impl PartialEq for DxHost {
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other)
    }
}

#[derive(Clone, Debug, Default, PartialEq)]
pub enum DxValue {
    #[default]
    Null,
    Bytes(Vec<u8>),
    Str(String),
    Bool(bool),
    Int(i64),
    Uint(u64),
    Float(f64),
    Node(DxDocNode),
    Host(DxHost),
}

impl DxValue {
    pub fn type_name(&self) -> &'static str {
        match self {
            DxValue::Null => "null",
            DxValue::Bytes(_) => "bytes",
            DxValue::Str(_) => "string",
            DxValue::Bool(_) => "bool",
            DxValue::Int(_) => "int",
            DxValue::Uint(_) => "uint",
            DxValue::Float(_) => "float",
            DxValue::Node(_) => "node",
            DxValue::Host(_) => "host",
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, DxValue::Null)
    }

    /// A value is present unless it is `Null` or a document node of null type.
    pub fn is_present(&self) -> bool {
        match self {
            DxValue::Null => false,
            DxValue::Node(node) => node.is_present(),
            _ => true,
        }
    }

    /// Truthiness used by bare conditions such as `if flag {`.
    pub fn is_truthy(&self) -> bool {
        match self {
            DxValue::Null => false,
            DxValue::Bytes(b) => !b.is_empty(),
            DxValue::Str(s) => !s.is_empty() && s != "false" && s != "0",
            DxValue::Bool(b) => *b,
            DxValue::Int(v) => *v != 0,
            DxValue::Uint(v) => *v != 0,
            DxValue::Float(v) => *v != 0.0,
            DxValue::Node(node) => match node.value() {
                Value::Null => false,
                Value::Bool(b) => *b,
                Value::Number(n) => n.as_f64().map(|v| v != 0.0).unwrap_or(false),
                Value::String(s) => !s.is_empty() && s != "false" && s != "0",
                Value::Array(a) => !a.is_empty(),
                Value::Object(o) => !o.is_empty(),
            },
            DxValue::Host(_) => true,
        }
    }

    /// Text form of the value, `None` for absent and host values.
    pub fn as_str(&self) -> Option<Cow<'_, str>> {
        match self {
            DxValue::Null | DxValue::Host(_) => None,
            DxValue::Bytes(b) => Some(String::from_utf8_lossy(b)),
            DxValue::Str(s) => Some(Cow::Borrowed(s.as_str())),
            DxValue::Bool(b) => Some(Cow::Owned(b.to_string())),
            DxValue::Int(v) => Some(Cow::Owned(v.to_string())),
            DxValue::Uint(v) => Some(Cow::Owned(v.to_string())),
            DxValue::Float(v) => Some(Cow::Owned(v.to_string())),
            DxValue::Node(node) => match node.value() {
                Value::Null => None,
                Value::String(s) => Some(Cow::Borrowed(s.as_str())),
                other => Some(Cow::Owned(other.to_string())),
            },
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            DxValue::Null | DxValue::Host(_) => None,
            DxValue::Bytes(b) => std::str::from_utf8(b).ok().and_then(parse_i64),
            DxValue::Str(s) => parse_i64(s),
            DxValue::Bool(b) => Some(i64::from(*b)),
            DxValue::Int(v) => Some(*v),
            DxValue::Uint(v) => i64::try_from(*v).ok(),
            DxValue::Float(v) => float_to_i64(*v),
            DxValue::Node(node) => match node.value() {
                Value::Number(n) => n.as_i64().or_else(|| n.as_f64().and_then(float_to_i64)),
                Value::String(s) => parse_i64(s),
                Value::Bool(b) => Some(i64::from(*b)),
                _ => None,
            },
        }
    }

    pub fn as_u64(&self) -> Option<u64> {
        match self {
            DxValue::Uint(v) => Some(*v),
            DxValue::Node(node) => match node.value() {
                Value::Number(n) => n.as_u64().or_else(|| n.as_i64().and_then(|v| u64::try_from(v).ok())),
                Value::String(s) => s.trim().parse::<u64>().ok(),
                _ => self.as_i64().and_then(|v| u64::try_from(v).ok()),
            },
            DxValue::Str(s) => s.trim().parse::<u64>().ok(),
            _ => self.as_i64().and_then(|v| u64::try_from(v).ok()),
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            DxValue::Null | DxValue::Host(_) => None,
            DxValue::Bytes(b) => std::str::from_utf8(b).ok().and_then(|s| s.trim().parse().ok()),
            DxValue::Str(s) => s.trim().parse().ok(),
            DxValue::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
            DxValue::Int(v) => Some(*v as f64),
            DxValue::Uint(v) => Some(*v as f64),
            DxValue::Float(v) => Some(*v),
            DxValue::Node(node) => match node.value() {
                Value::Number(n) => n.as_f64(),
                Value::String(s) => s.trim().parse().ok(),
                Value::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
                _ => None,
            },
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            DxValue::Null | DxValue::Host(_) => None,
            DxValue::Bytes(b) => std::str::from_utf8(b).ok().and_then(parse_bool),
            DxValue::Str(s) => parse_bool(s),
            DxValue::Bool(b) => Some(*b),
            DxValue::Int(v) => Some(*v != 0),
            DxValue::Uint(v) => Some(*v != 0),
            DxValue::Float(v) => Some(*v != 0.0),
            DxValue::Node(node) => match node.value() {
                Value::Bool(b) => Some(*b),
                Value::String(s) => parse_bool(s),
                Value::Number(n) => n.as_f64().map(|v| v != 0.0),
                _ => None,
            },
        }
    }

    /// Length of strings, byte buffers and document collections.
    pub fn len(&self) -> Option<usize> {
        match self {
            DxValue::Bytes(b) => Some(b.len()),
            DxValue::Str(s) => Some(s.len()),
            DxValue::Node(node) => match node.value() {
                Value::String(s) => Some(s.len()),
                Value::Array(a) => Some(a.len()),
                Value::Object(o) => Some(o.len()),
                Value::Null => Some(0),
                _ => None,
            },
            DxValue::Null => Some(0),
            DxValue::Bool(_) | DxValue::Int(_) | DxValue::Uint(_) | DxValue::Float(_) | DxValue::Host(_) => None,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len().map(|len| len == 0).unwrap_or(false)
    }

    pub fn to_json(&self) -> Value {
        match self {
            DxValue::Null | DxValue::Host(_) => Value::Null,
            DxValue::Bytes(b) => Value::String(String::from_utf8_lossy(b).into_owned()),
            DxValue::Str(s) => Value::String(s.clone()),
            DxValue::Bool(b) => Value::Bool(*b),
            DxValue::Int(v) => Value::from(*v),
            DxValue::Uint(v) => Value::from(*v),
            DxValue::Float(v) => serde_json::Number::from_f64(*v)
                .map(Value::Number)
                .unwrap_or(Value::Null),
            DxValue::Node(node) => node.value().clone(),
        }
    }

    /// Serialize the value into `buf` the way the right operand of a
    /// comparison is serialized. Absent values write nothing.
    pub fn write_text(&self, buf: &mut String) {
        if let Some(text) = self.as_str() {
            buf.push_str(&text);
        }
    }

    /// Compare this value against a serialized right operand.
    ///
    /// Numbers compare numerically, booleans by truth value, everything else
    /// lexically. A right side that doesn't parse as the left side's type only
    /// satisfies `!=`.
    pub fn compare_text(&self, op: DxOp, right: &str) -> bool {
        match self {
            DxValue::Null => compare_absent(op, right),
            DxValue::Bool(b) => compare_bool(*b, op, right),
            DxValue::Int(v) => match parse_i64(right) {
                Some(r) => compare_ord(v, &r, op),
                None => compare_float(*v as f64, op, right),
            },
            DxValue::Uint(v) => match right.trim().parse::<u64>() {
                Ok(r) => compare_ord(v, &r, op),
                Err(_) => compare_float(*v as f64, op, right),
            },
            DxValue::Float(v) => compare_float(*v, op, right),
            DxValue::Str(s) => compare_ord(s.as_str(), right, op),
            DxValue::Bytes(b) => compare_ord(&*String::from_utf8_lossy(b), right, op),
            DxValue::Node(node) => match node.value() {
                Value::Null => compare_absent(op, right),
                Value::Bool(b) => compare_bool(*b, op, right),
                Value::Number(n) => match (n.as_i64(), parse_i64(right)) {
                    (Some(l), Some(r)) => compare_ord(&l, &r, op),
                    _ => compare_float(n.as_f64().unwrap_or(f64::NAN), op, right),
                },
                Value::String(s) => compare_ord(s.as_str(), right, op),
                other => compare_ord(other.to_string().as_str(), right, op),
            },
            DxValue::Host(_) => op == DxOp::Nq,
        }
    }

    /// Compare two resolved values by serializing the right one.
    pub fn compare(&self, op: DxOp, right: &DxValue) -> bool {
        let mut buf = String::new();
        right.write_text(&mut buf);
        self.compare_text(op, &buf)
    }
}

/// Integer parsing accepting `0x`, `0o` and `0b` prefixes.
pub fn parse_i64(text: &str) -> Option<i64> {
    let text = text.trim();
    let (negative, digits) = match text.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, text.strip_prefix('+').unwrap_or(text)),
    };
    let (radix, digits) = if let Some(rest) = digits.strip_prefix("0x").or_else(|| digits.strip_prefix("0X")) {
        (16, rest)
    } else if let Some(rest) = digits.strip_prefix("0o") {
        (8, rest)
    } else if let Some(rest) = digits.strip_prefix("0b") {
        (2, rest)
    } else {
        (10, digits)
    };
    if digits.is_empty() {
        return None;
    }
    let magnitude = i64::from_str_radix(digits, radix).ok()?;
    Some(if negative { -magnitude } else { magnitude })
}

fn parse_bool(text: &str) -> Option<bool> {
    match text.trim() {
        "true" | "1" => Some(true),
        "false" | "0" | "" => Some(false),
        _ => None,
    }
}

fn float_to_i64(v: f64) -> Option<i64> {
    if v.is_finite() && v.fract() == 0.0 && v >= i64::MIN as f64 && v <= i64::MAX as f64 {
        Some(v as i64)
    } else {
        None
    }
}

fn compare_ord<T: PartialOrd + ?Sized>(left: &T, right: &T, op: DxOp) -> bool {
    match op {
        DxOp::Eq => left == right,
        DxOp::Nq => left != right,
        DxOp::Gt => left.partial_cmp(right) == Some(Ordering::Greater),
        DxOp::Gtq => matches!(left.partial_cmp(right), Some(Ordering::Greater | Ordering::Equal)),
        DxOp::Lt => left.partial_cmp(right) == Some(Ordering::Less),
        DxOp::Ltq => matches!(left.partial_cmp(right), Some(Ordering::Less | Ordering::Equal)),
        DxOp::Inc | DxOp::Dec | DxOp::Unk => false,
    }
}

fn compare_float(left: f64, op: DxOp, right: &str) -> bool {
    match right.trim().parse::<f64>() {
        Ok(r) => compare_ord(&left, &r, op),
        Err(_) => op == DxOp::Nq,
    }
}

fn compare_bool(left: bool, op: DxOp, right: &str) -> bool {
    match (parse_bool(right), op) {
        (Some(r), DxOp::Eq) => left == r,
        (Some(r), DxOp::Nq) => left != r,
        (None, DxOp::Nq) => true,
        _ => false,
    }
}

fn compare_absent(op: DxOp, right: &str) -> bool {
    let absent = right.is_empty() || right == "null";
    match op {
        DxOp::Eq => absent,
        DxOp::Nq => !absent,
        _ => false,
    }
}

impl From<&str> for DxValue {
    fn from(v: &str) -> Self {
        DxValue::Str(v.to_string())
    }
}

impl From<String> for DxValue {
    fn from(v: String) -> Self {
        DxValue::Str(v)
    }
}

impl From<Vec<u8>> for DxValue {
    fn from(v: Vec<u8>) -> Self {
        DxValue::Bytes(v)
    }
}

impl From<bool> for DxValue {
    fn from(v: bool) -> Self {
        DxValue::Bool(v)
    }
}

impl From<i64> for DxValue {
    fn from(v: i64) -> Self {
        DxValue::Int(v)
    }
}

impl From<i32> for DxValue {
    fn from(v: i32) -> Self {
        DxValue::Int(i64::from(v))
    }
}

impl From<u64> for DxValue {
    fn from(v: u64) -> Self {
        DxValue::Uint(v)
    }
}

impl From<f64> for DxValue {
    fn from(v: f64) -> Self {
        DxValue::Float(v)
    }
}

impl From<DxDocNode> for DxValue {
    fn from(v: DxDocNode) -> Self {
        DxValue::Node(v)
    }
}

impl From<DxHost> for DxValue {
    fn from(v: DxHost) -> Self {
        DxValue::Host(v)
    }
}
