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

//! # Execution Context Module
//!
//! [`DxCtx`] is the variable environment a rule body runs against. Every
//! variable pairs a value with the [`DxAccessor`] that knows how to walk it:
//! documents, host objects and plain static values all live in the same table.
//!
//! Paths are resolved by looking the first segment up in the table and
//! handing the remaining segments to the variable's accessor. A leading
//! `ctx.`/`context.` segment in a destination writes into the table itself.
//!
//! The context also owns the scratch space of the interpreter (argument
//! stack, counter stack, range-loop slots, comparison buffer). [`DxCtx::reset`]
//! clears the logical state while keeping every allocation, which is what
//! makes pooling worthwhile. A context is used by one decode at a time.

mod pool;

pub use pool::{acquire_ctx, DxCtxGuard, DxCtxPool};

use std::sync::Arc;

use log::debug;

use crate::accessor::{DxAccessor, DxDocumentAccessor, DxStaticAccessor};
use crate::document::DxDocNode;
use crate::errors::{DxError, Result};
use crate::path::{split_path, DxPath};
use crate::tree::DxAccessorRef;
use crate::value::DxValue;

struct DxVar {
    key: String,
    value: DxValue,
    accessor: Arc<dyn DxAccessor>,
}

/// Slot of the range-loop arena, claimed by depth.
#[derive(Debug, Default)]
pub(crate) struct DxRangeSlot {
    pub(crate) key: DxValue,
    pub(crate) value: DxValue,
    pub(crate) iterations: usize,
}

impl DxRangeSlot {
    pub(crate) fn clear(&mut self) {
        self.key = DxValue::Null;
        self.value = DxValue::Null;
        self.iterations = 0;
    }
}

pub struct DxCtx {
    vars: Vec<DxVar>,
    len: usize,
    static_ins: Arc<dyn DxAccessor>,
    document_ins: Arc<dyn DxAccessor>,
    /// Serialized right operand of comparisons.
    pub(crate) buf: String,
    pub(crate) args: Vec<DxValue>,
    pub(crate) counters: Vec<i64>,
    pub(crate) ranges: Vec<DxRangeSlot>,
    pub(crate) range_depth: usize,
    pub(crate) brk_depth: usize,
    pub(crate) err: Option<DxError>,
}

impl Default for DxCtx {
    fn default() -> Self {
        Self::new()
    }
}

impl DxCtx {
    pub fn new() -> Self {
        DxCtx {
            vars: Vec::new(),
            len: 0,
            static_ins: Arc::new(DxStaticAccessor),
            document_ins: Arc::new(DxDocumentAccessor),
            buf: String::new(),
            args: Vec::new(),
            counters: Vec::new(),
            ranges: Vec::new(),
            range_depth: 0,
            brk_depth: 0,
            err: None,
        }
    }

    /// Bind `name` to a value walked by `accessor`, replacing any previous binding.
    pub fn set(&mut self, name: &str, value: impl Into<DxValue>, accessor: Arc<dyn DxAccessor>) {
        let value = value.into();
        if let Some(idx) = self.find(name) {
            let var = &mut self.vars[idx];
            var.value = value;
            var.accessor = accessor;
            return;
        }
        if self.len < self.vars.len() {
            let var = &mut self.vars[self.len];
            var.key.clear();
            var.key.push_str(name);
            var.value = value;
            var.accessor = accessor;
        } else {
            self.vars.push(DxVar {
                key: name.to_string(),
                value,
                accessor,
            });
        }
        self.len += 1;
    }

    /// Bind a plain value without inner fields.
    pub fn set_static(&mut self, name: &str, value: impl Into<DxValue>) {
        let accessor = Arc::clone(&self.static_ins);
        self.set(name, value, accessor);
    }

    pub fn set_document(&mut self, name: &str, node: DxDocNode) {
        let accessor = Arc::clone(&self.document_ins);
        self.set(name, DxValue::Node(node), accessor);
    }

    /// Bind a document node produced by a callback. A node that holds no
    /// value is rejected.
    pub fn set_node(&mut self, name: &str, node: DxDocNode) -> Result<()> {
        if !node.is_present() {
            return Err(DxError::EmptyNode(name.to_string()));
        }
        self.set_document(name, node);
        Ok(())
    }

    /// Parse `raw` as JSON and bind the document root to `name`.
    pub fn set_json(&mut self, name: &str, raw: &[u8]) -> Result<DxDocNode> {
        let node = DxDocNode::from_json(raw)?;
        self.set_document(name, node.clone());
        Ok(node)
    }

    pub fn set_yaml(&mut self, name: &str, raw: &str) -> Result<DxDocNode> {
        let node = DxDocNode::from_yaml(raw)?;
        self.set_document(name, node.clone());
        Ok(node)
    }

    pub fn set_url_query(&mut self, name: &str, raw: &str) -> DxDocNode {
        let node = DxDocNode::from_url_query(raw);
        self.set_document(name, node.clone());
        node
    }

    /// Resolve a path written in rule syntax, including fallback sets.
    pub fn get(&self, path: &str) -> Option<DxValue> {
        let path = DxPath::parse(path);
        match self.get_path(&path) {
            Ok(value) => value,
            Err(err) => {
                debug!("get '{}' failed: {}", path.raw(), err);
                None
            }
        }
    }

    pub fn contains(&self, name: &str) -> bool {
        self.find(name).is_some()
    }

    /// Number of bound variables.
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn break_depth(&self) -> usize {
        self.brk_depth
    }

    /// Take the error recorded by an interrupted range loop, if any.
    pub fn take_error(&mut self) -> Option<DxError> {
        self.err.take()
    }

    /// Clear variables and scratch state, keeping allocated storage.
    pub fn reset(&mut self) {
        for var in &mut self.vars[..self.len] {
            var.value = DxValue::Null;
        }
        self.len = 0;
        self.buf.clear();
        self.args.clear();
        self.counters.clear();
        for slot in &mut self.ranges {
            slot.clear();
        }
        self.range_depth = 0;
        self.brk_depth = 0;
        self.err = None;
    }

    fn find(&self, name: &str) -> Option<usize> {
        self.vars[..self.len].iter().position(|var| var.key == name)
    }

    pub(crate) fn get_path(&self, path: &DxPath) -> Result<Option<DxValue>> {
        if path.has_fallback() {
            return self.get_with_fallback(path.fallbacks());
        }
        self.get_segments(path.segments())
    }

    pub(crate) fn get_segments(&self, segments: &[String]) -> Result<Option<DxValue>> {
        let Some((root, tail)) = segments.split_first() else {
            return Ok(None);
        };
        match self.find(root) {
            Some(idx) => {
                let var = &self.vars[idx];
                var.accessor.get(&var.value, tail)
            }
            None => Ok(None),
        }
    }

    /// Try each candidate path in order and return the first present value.
    pub(crate) fn get_with_fallback(&self, candidates: &[Vec<String>]) -> Result<Option<DxValue>> {
        for candidate in candidates {
            if let Some(value) = self.get_segments(candidate)? {
                if value.is_present() {
                    return Ok(Some(value));
                }
            }
        }
        Ok(None)
    }

    /// Run the accessor of the variable `path` starts from.
    pub(crate) fn with_accessor<R>(
        &self,
        path: &DxPath,
        f: impl FnOnce(&dyn DxAccessor, &DxValue, &[String]) -> Result<R>,
    ) -> Result<Option<R>> {
        let segments = path.segments();
        let Some((root, tail)) = segments.split_first() else {
            return Ok(None);
        };
        match self.find(root) {
            Some(idx) => {
                let var = &self.vars[idx];
                f(var.accessor.as_ref(), &var.value, tail).map(Some)
            }
            None => Ok(None),
        }
    }

    /// Value and accessor of the variable `path` starts from, for loops that
    /// must release the context while iterating.
    pub(crate) fn variable(&self, name: &str) -> Option<(DxValue, Arc<dyn DxAccessor>)> {
        self.find(name).map(|idx| {
            let var = &self.vars[idx];
            (var.value.clone(), Arc::clone(&var.accessor))
        })
    }

    /// Write `value` to a destination path.
    pub(crate) fn set_path(&mut self, dst: &DxPath, value: DxValue, ins: Option<&DxAccessorRef>) -> Result<()> {
        let segments = dst.segments();
        let Some((root, tail)) = segments.split_first() else {
            return Ok(());
        };
        if root == "ctx" || root == "context" {
            let name = tail.join(".");
            match (ins, &value) {
                (Some(ins), _) => self.set(&name, value, Arc::clone(&ins.accessor)),
                (None, DxValue::Node(_)) => {
                    let accessor = Arc::clone(&self.document_ins);
                    self.set(&name, value, accessor);
                }
                (None, _) => self.set_static(&name, value),
            }
            return Ok(());
        }
        let Some(idx) = self.find(root) else {
            debug!("destination variable '{}' is not set, skipping", root);
            return Ok(());
        };
        let var = &mut self.vars[idx];
        if tail.iter().all(|s| s.starts_with('@')) && !matches!(var.value, DxValue::Host(_)) {
            var.accessor = if matches!(value, DxValue::Node(_)) {
                Arc::clone(&self.document_ins)
            } else {
                Arc::clone(&self.static_ins)
            };
            var.value = value;
            return Ok(());
        }
        var.accessor.set(&var.value, tail, &value)
    }

    /// Bind a loop or ok-binding variable, choosing the accessor by value kind.
    pub(crate) fn bind(&mut self, name: &str, value: DxValue, ins: Option<&DxAccessorRef>) {
        match (ins, &value) {
            (Some(ins), _) => self.set(name, value, Arc::clone(&ins.accessor)),
            (None, DxValue::Node(_)) => {
                let accessor = Arc::clone(&self.document_ins);
                self.set(name, value, accessor);
            }
            (None, _) => self.set_static(name, value),
        }
    }

    /// Convenience path setter for callbacks working with plain text paths.
    pub fn set_by_path(&mut self, path: &str, value: DxValue) -> Result<()> {
        let segments = split_path(path);
        if segments.is_empty() {
            return Err(DxError::internal("empty destination path"));
        }
        self.set_path(&DxPath::parse(path), value, None)
    }
}
