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

//! # Document Module
//!
//! Parsed documents are held as `serde_json::Value` trees behind an `Arc`, so a
//! node handle is a shared root plus a JSON pointer into it. Handing out
//! sub-nodes to loops and variables never copies the underlying tree.
//!
//! JSON, YAML and URL-encoded query strings all land in the same node model.

use std::fmt;
use std::sync::Arc;

use serde_json::{Map, Value};

use crate::errors::{DxError, Result};
use crate::value::DxValue;

static NULL: Value = Value::Null;

/// Handle to a node inside a parsed document.
#[derive(Clone)]
pub struct DxDocNode {
    root: Arc<Value>,
    pointer: String,
}

impl DxDocNode {
    pub fn from_value(value: Value) -> Self {
        DxDocNode {
            root: Arc::new(value),
            pointer: String::new(),
        }
    }

    pub fn from_json(raw: &[u8]) -> Result<Self> {
        let value: Value = serde_json::from_slice(raw)?;
        Ok(Self::from_value(value))
    }

    pub fn from_yaml(raw: &str) -> Result<Self> {
        let value: serde_yaml::Value = serde_yaml::from_str(raw)?;
        Ok(Self::from_value(yaml_to_json(&value)))
    }

    /// Build an object from a form-urlencoded query. Repeated keys collect
    /// into an array in order of appearance.
    pub fn from_url_query(raw: &str) -> Self {
        let query = raw.strip_prefix('?').unwrap_or(raw);
        let mut map = Map::new();
        for (key, value) in url::form_urlencoded::parse(query.as_bytes()) {
            let value = Value::String(value.into_owned());
            match map.get_mut(key.as_ref()) {
                Some(Value::Array(items)) => items.push(value),
                Some(existing) => {
                    let first = existing.take();
                    *existing = Value::Array(vec![first, value]);
                }
                None => {
                    map.insert(key.into_owned(), value);
                }
            }
        }
        Self::from_value(Value::Object(map))
    }

    pub fn value(&self) -> &Value {
        if self.pointer.is_empty() {
            return &self.root;
        }
        self.root.pointer(&self.pointer).unwrap_or(&NULL)
    }

    pub fn pointer(&self) -> &str {
        &self.pointer
    }

    /// A node is present when it exists and isn't of null type.
    pub fn is_present(&self) -> bool {
        !self.value().is_null()
    }

    /// Object member or array element addressed by `key`.
    pub fn child(&self, key: &str) -> Option<DxDocNode> {
        let exists = match self.value() {
            Value::Object(map) => map.contains_key(key),
            Value::Array(items) => key.parse::<usize>().map(|idx| idx < items.len()).unwrap_or(false),
            _ => false,
        };
        if !exists {
            return None;
        }
        Some(self.descend(key))
    }

    /// Walk `path` below this node. `@suffix` token markers are ignored.
    pub fn get<S: AsRef<str>>(&self, path: &[S]) -> Option<DxDocNode> {
        let mut node = self.clone();
        for segment in path {
            let segment = segment.as_ref();
            if segment.starts_with('@') {
                continue;
            }
            node = node.child(segment)?;
        }
        Some(node)
    }

    /// Visit the members of an object or array in document order. `visit`
    /// returns `false` to stop early.
    pub fn each(&self, mut visit: impl FnMut(DxValue, DxDocNode) -> bool) {
        match self.value() {
            Value::Object(map) => {
                for key in map.keys() {
                    if !visit(DxValue::Str(key.clone()), self.descend(key)) {
                        break;
                    }
                }
            }
            Value::Array(items) => {
                for idx in 0..items.len() {
                    if !visit(DxValue::Int(idx as i64), self.descend(&idx.to_string())) {
                        break;
                    }
                }
            }
            _ => {}
        }
    }

    fn descend(&self, key: &str) -> DxDocNode {
        let mut pointer = String::with_capacity(self.pointer.len() + key.len() + 1);
        pointer.push_str(&self.pointer);
        pointer.push('/');
        for ch in key.chars() {
            match ch {
                '~' => pointer.push_str("~0"),
                '/' => pointer.push_str("~1"),
                _ => pointer.push(ch),
            }
        }
        DxDocNode {
            root: Arc::clone(&self.root),
            pointer,
        }
    }
}

impl fmt::Debug for DxDocNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "DxDocNode({})", self.value())
    }
}

impl PartialEq for DxDocNode {
    fn eq(&self, other: &Self) -> bool {
        self.value() == other.value()
    }
}

/// Convert a YAML tree into the JSON node model.
pub fn yaml_to_json(yaml: &serde_yaml::Value) -> Value {
    match yaml {
        serde_yaml::Value::Null => Value::Null,
        serde_yaml::Value::Bool(b) => Value::Bool(*b),
        serde_yaml::Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                Value::Number(i.into())
            } else if let Some(u) = n.as_u64() {
                Value::Number(u.into())
            } else if let Some(f) = n.as_f64() {
                serde_json::Number::from_f64(f).map(Value::Number).unwrap_or(Value::Null)
            } else {
                Value::Null
            }
        }
        serde_yaml::Value::String(s) => Value::String(s.clone()),
        serde_yaml::Value::Sequence(seq) => Value::Array(seq.iter().map(yaml_to_json).collect()),
        serde_yaml::Value::Mapping(map) => {
            let mut obj = Map::new();
            for (k, v) in map {
                let key = match k {
                    serde_yaml::Value::String(s) => s.clone(),
                    other => match yaml_to_json(other) {
                        Value::String(s) => s,
                        json => json.to_string(),
                    },
                };
                obj.insert(key, yaml_to_json(v));
            }
            Value::Object(obj)
        }
        serde_yaml::Value::Tagged(tagged) => yaml_to_json(&tagged.value),
    }
}

/// Parse raw bytes of the named format into a document node.
pub fn parse_document(format: &str, raw: &[u8]) -> Result<DxDocNode> {
    match format {
        "json" => DxDocNode::from_json(raw),
        "yaml" => {
            let text = std::str::from_utf8(raw).map_err(|e| DxError::document("yaml", e.to_string()))?;
            DxDocNode::from_yaml(text)
        }
        "url" => {
            let text = std::str::from_utf8(raw).map_err(|e| DxError::document("url", e.to_string()))?;
            Ok(DxDocNode::from_url_query(text))
        }
        other => Err(DxError::document(other, "unsupported document format")),
    }
}
