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

//! # Field Accessor Module
//!
//! A field accessor gets and sets values by path on one kind of context
//! variable. Every variable in a [`crate::context::DxCtx`] is paired with an
//! accessor; rules name one explicitly with `ctx.x = src as TypeName`.
//!
//! ## Built-in accessors
//!
//! - [`DxStaticAccessor`] (`static`): a value box without inner fields
//! - [`DxDocumentAccessor`] (`document`): read-only parsed documents
//! - [`DxJsonAccessor`] (`json`): a writable `serde_json::Value` destination
//!
//! Applications implement [`DxAccessor`] for their own destination types and
//! register them on the [`crate::registry::DxRegistry`].

use serde_json::{Map, Value};

use crate::document::DxDocNode;
use crate::errors::{DxError, Result};
use crate::tree::DxOp;
use crate::value::DxValue;

/// Verdict returned by a loop body to the iterating accessor.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DxLoopCtl {
    None,
    Brk,
    Cnt,
}

/// Receiver of a range iteration.
pub trait DxLooper {
    /// Whether the loop binds keys; accessors may skip building them otherwise.
    fn require_key(&self) -> bool;
    fn set_key(&mut self, key: DxValue);
    fn set_value(&mut self, value: DxValue);
    /// Run the loop body for the current key/value pair.
    fn iterate(&mut self) -> DxLoopCtl;
}

pub trait DxAccessor: Send + Sync {
    fn name(&self) -> &str;

    /// Read the value at `path` below `target`, `None` when absent.
    fn get(&self, target: &DxValue, path: &[String]) -> Result<Option<DxValue>>;

    /// Write `value` at `path` below `target`.
    fn set(&self, target: &DxValue, path: &[String], value: &DxValue) -> Result<()>;

    /// Iterate the collection at `path`, feeding each element to `looper`.
    fn range(&self, target: &DxValue, path: &[String], looper: &mut dyn DxLooper) -> Result<()> {
        if let Some(DxValue::Node(node)) = self.get(target, path)? {
            range_node(&node, looper);
        }
        Ok(())
    }

    /// Compare the value at `path` with a serialized right operand.
    fn compare(&self, target: &DxValue, path: &[String], op: DxOp, right: &str) -> Result<bool> {
        let left = self.get(target, path)?.unwrap_or_default();
        Ok(left.compare_text(op, right))
    }

    fn length(&self, target: &DxValue, path: &[String]) -> Result<Option<usize>> {
        Ok(self.get(target, path)?.and_then(|v| v.len()))
    }
}

/// Feed the members of a document node to a looper.
pub fn range_node(node: &DxDocNode, looper: &mut dyn DxLooper) {
    let with_key = looper.require_key();
    node.each(|key, child| {
        if with_key {
            looper.set_key(key);
        }
        looper.set_value(DxValue::Node(child));
        looper.iterate() != DxLoopCtl::Brk
    });
}

#[derive(Clone, Copy, Debug, Default)]
pub struct DxStaticAccessor;

impl DxAccessor for DxStaticAccessor {
    fn name(&self) -> &str {
        "static"
    }

    fn get(&self, target: &DxValue, path: &[String]) -> Result<Option<DxValue>> {
        if path.iter().all(|s| s.starts_with('@')) {
            return Ok(Some(target.clone()));
        }
        match target {
            DxValue::Node(node) => Ok(node.get(path).map(DxValue::Node)),
            _ => Ok(None),
        }
    }

    fn set(&self, _target: &DxValue, path: &[String], _value: &DxValue) -> Result<()> {
        Err(DxError::accessor(
            "static",
            format!("static value has no field '{}'", path.join(".")),
        ))
    }
}

#[derive(Clone, Copy, Debug, Default)]
pub struct DxDocumentAccessor;

impl DxAccessor for DxDocumentAccessor {
    fn name(&self) -> &str {
        "document"
    }

    fn get(&self, target: &DxValue, path: &[String]) -> Result<Option<DxValue>> {
        match target {
            DxValue::Node(node) => Ok(node.get(path).map(DxValue::Node)),
            _ => Ok(None),
        }
    }

    fn set(&self, _target: &DxValue, path: &[String], _value: &DxValue) -> Result<()> {
        Err(DxError::accessor(
            "document",
            format!("documents are read-only, can't write '{}'", path.join(".")),
        ))
    }
}

/// Accessor over a [`crate::value::DxHost`] wrapping a `serde_json::Value`.
///
/// Writes create intermediate objects on demand; numeric segments address
/// array elements, and an index equal to the array length appends.
#[derive(Clone, Copy, Debug, Default)]
pub struct DxJsonAccessor;

impl DxAccessor for DxJsonAccessor {
    fn name(&self) -> &str {
        "json"
    }

    fn get(&self, target: &DxValue, path: &[String]) -> Result<Option<DxValue>> {
        match target {
            DxValue::Host(host) => host.with::<Value, _>(|root| {
                let mut current = root;
                for segment in path.iter().filter(|s| !s.starts_with('@')) {
                    current = match current {
                        Value::Object(map) => match map.get(segment) {
                            Some(v) => v,
                            None => return None,
                        },
                        Value::Array(items) => match segment.parse::<usize>().ok().and_then(|i| items.get(i)) {
                            Some(v) => v,
                            None => return None,
                        },
                        _ => return None,
                    };
                }
                Some(json_to_value(current))
            }),
            DxValue::Node(node) => Ok(node.get(path).map(DxValue::Node)),
            _ => Ok(None),
        }
    }

    fn set(&self, target: &DxValue, path: &[String], value: &DxValue) -> Result<()> {
        let host = match target {
            DxValue::Host(host) => host,
            other => {
                return Err(DxError::accessor(
                    "json",
                    format!("can't write into a {} value", other.type_name()),
                ))
            }
        };
        let json = value.to_json();
        host.with_mut::<Value, _>(|root| set_json_path(root, path, json))?
    }
}

/// Scalars become plain values, containers become document nodes.
pub fn json_to_value(value: &Value) -> DxValue {
    match value {
        Value::Null => DxValue::Null,
        Value::Bool(b) => DxValue::Bool(*b),
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                DxValue::Int(i)
            } else if let Some(u) = n.as_u64() {
                DxValue::Uint(u)
            } else {
                DxValue::Float(n.as_f64().unwrap_or(f64::NAN))
            }
        }
        Value::String(s) => DxValue::Str(s.clone()),
        Value::Array(_) | Value::Object(_) => DxValue::Node(DxDocNode::from_value(value.clone())),
    }
}

fn set_json_path(root: &mut Value, path: &[String], value: Value) -> Result<()> {
    let segments: Vec<&String> = path.iter().filter(|s| !s.starts_with('@')).collect();
    let Some((last, parents)) = segments.split_last() else {
        *root = value;
        return Ok(());
    };
    let mut current = root;
    for segment in parents {
        if current.is_null() {
            *current = Value::Object(Map::new());
        }
        current = match current {
            Value::Object(map) => map
                .entry(segment.to_string())
                .or_insert_with(|| Value::Object(Map::new())),
            Value::Array(items) => {
                let idx = segment
                    .parse::<usize>()
                    .ok()
                    .filter(|idx| *idx < items.len())
                    .ok_or_else(|| DxError::accessor("json", format!("index '{}' out of range", segment)))?;
                &mut items[idx]
            }
            _ => {
                return Err(DxError::accessor(
                    "json",
                    format!("segment '{}' crosses a scalar value", segment),
                ))
            }
        };
    }
    if current.is_null() {
        *current = Value::Object(Map::new());
    }
    match current {
        Value::Object(map) => {
            map.insert(last.to_string(), value);
            Ok(())
        }
        Value::Array(items) => match last.parse::<usize>() {
            Ok(idx) if idx < items.len() => {
                items[idx] = value;
                Ok(())
            }
            Ok(idx) if idx == items.len() => {
                items.push(value);
                Ok(())
            }
            _ => Err(DxError::accessor("json", format!("index '{}' out of range", last))),
        },
        _ => Err(DxError::accessor(
            "json",
            format!("segment '{}' crosses a scalar value", last),
        )),
    }
}
