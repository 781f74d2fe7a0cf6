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

//! # Parser Module
//!
//! Turns a rule body into a [`DxTree`]. The source is consumed one control
//! unit at a time (see [`unit`]); every unit is classified, in order, as a
//! loop header, a block close, a break/continue, a condition header, a switch
//! header, a case label, an assignment or a bare callback call.
//!
//! Block bodies are parsed recursively. Before a body is entered the nesting
//! counters are snapshotted, and the `}` that closes the body has to bring
//! them back to that snapshot.
//!
//! Function and accessor names are resolved against the registry while
//! parsing; an unknown name fails the whole body with its offset.
//!
//! ```rust
//! use decodex::parser::DxParser;
//! use decodex::registry::DxRegistry;
//!
//! let registry = DxRegistry::with_builtins();
//! let tree = DxParser::new(&registry)
//!     .parse("obj.Name = jso.person.name|default(jso.person.full_name)")
//!     .unwrap();
//! assert_eq!(tree.node_count(), 1);
//! ```

mod expr;
mod target;
mod unit;

use std::sync::Arc;

use log::debug;
use xxhash_rust::xxh3::xxh3_64;

use crate::errors::{DxError, Result};
use crate::path::{parse_literal, DxPath};
use crate::registry::DxRegistry;
use crate::store::DxStore;
use crate::tree::{
    DxAccessorRef, DxArg, DxAssign, DxCall, DxCase, DxCaseMatch, DxCondition, DxConditionOk, DxCounterLoop,
    DxGetter, DxMod, DxNode, DxOkCheck, DxOp, DxRangeLoop, DxSwitch, DxTest, DxTree,
};

use expr::{find_assign, find_comparison, find_top_level, has_logical_operator, is_ident, split_accessor, split_call, split_top_level};
use target::{DxBlock, DxDepth, DxTarget};
use unit::{next_unit, DxUnit};

/// Rule body parser bound to a registry and, optionally, to a store whose
/// hash index serves as a parse cache.
pub struct DxParser<'a> {
    registry: &'a DxRegistry,
    store: Option<&'a DxStore>,
}

impl<'a> DxParser<'a> {
    pub fn new(registry: &'a DxRegistry) -> Self {
        DxParser { registry, store: None }
    }

    /// Reuse trees already registered in `store` for byte-identical sources.
    pub fn with_store(mut self, store: &'a DxStore) -> Self {
        self.store = Some(store);
        self
    }

    pub fn parse(&self, src: &str) -> Result<Arc<DxTree>> {
        let hash = xxh3_64(src.as_bytes());
        if let Some(tree) = self.store.and_then(|store| store.get_by_hash(hash)) {
            debug!("rule body {:016x} already parsed, reusing tree", hash);
            return Ok(tree);
        }

        let mut walker = DxWalker {
            registry: self.registry,
            src,
            pos: 0,
            depth: DxDepth::default(),
        };
        let body = walker.parse_body(DxFrame::Root, DxTarget::snapshot(DxDepth::default()))?;
        let tree = DxTree::new(body.nodes, hash);
        debug!("parsed rule body {:016x}: {} node(s)", hash, tree.node_count());
        Ok(Arc::new(tree))
    }

    pub fn parse_bytes(&self, src: &[u8]) -> Result<Arc<DxTree>> {
        let text = std::str::from_utf8(src).map_err(|e| DxError::parse(e.valid_up_to(), "invalid UTF-8"))?;
        self.parse(text)
    }
}

/// Enclosing block of the body being parsed.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum DxFrame {
    Root,
    Cond,
    Loop,
    /// `boolean` is set for subject-less switches whose labels are conditions.
    Switch { boolean: bool },
}

impl DxFrame {
    fn block(&self) -> Option<DxBlock> {
        match self {
            DxFrame::Root => None,
            DxFrame::Cond => Some(DxBlock::Cond),
            DxFrame::Loop => Some(DxBlock::Loop),
            DxFrame::Switch { .. } => Some(DxBlock::Switch),
        }
    }
}

/// How a body ended.
enum DxClose<'s> {
    Eof,
    Brace,
    Else,
    /// `} else if COND {` with the condition text and its offset.
    ElseIf(&'s str, usize),
}

struct DxBody<'s> {
    nodes: Vec<DxNode>,
    close: DxClose<'s>,
}

struct DxWalker<'a, 's> {
    registry: &'a DxRegistry,
    src: &'s str,
    pos: usize,
    depth: DxDepth,
}

impl<'a, 's> DxWalker<'a, 's> {
    fn parse_body(&mut self, frame: DxFrame, target: DxTarget) -> Result<DxBody<'s>> {
        let mut nodes: Vec<DxNode> = Vec::new();
        loop {
            let Some((unit, next)) = next_unit(self.src, self.pos) else {
                if frame.block().is_some() {
                    return Err(DxError::UnbalancedControl);
                }
                return Ok(DxBody {
                    nodes,
                    close: DxClose::Eof,
                });
            };
            self.pos = next;

            if unit.text.starts_with('}') {
                let close = self.parse_close(unit, frame)?;
                if !target.reached(self.depth) {
                    return Err(DxError::UnbalancedControl);
                }
                return Ok(DxBody { nodes, close });
            }

            if let Some(label) = self.parse_label(unit, frame)? {
                nodes.push(label);
                continue;
            }

            let node = self.parse_unit(unit)?;
            if let DxFrame::Switch { .. } = frame {
                match nodes.last_mut() {
                    Some(DxNode::Case(case)) => case.children.push(node),
                    Some(DxNode::Default(children)) => children.push(node),
                    _ => return Err(DxError::parse(unit.offset, "statement before the first case label")),
                }
            } else {
                nodes.push(node);
            }
        }
    }

    fn parse_close(&mut self, unit: DxUnit<'s>, frame: DxFrame) -> Result<DxClose<'s>> {
        let Some(block) = frame.block() else {
            return Err(DxError::UnexpectedClose { offset: unit.offset });
        };
        if !self.depth.leave(block) {
            return Err(DxError::UnexpectedClose { offset: unit.offset });
        }
        let rest = unit.text[1..].trim_start();
        if rest.is_empty() {
            return Ok(DxClose::Brace);
        }
        let Some(after_else) = rest.strip_prefix("else") else {
            return Err(DxError::parse(unit.offset, format!("unexpected text after close '{}'", unit.text)));
        };
        if frame != DxFrame::Cond {
            return Err(DxError::parse(unit.offset, "else without if"));
        }
        let after_else = after_else.trim();
        if after_else == "{" {
            return Ok(DxClose::Else);
        }
        match after_else.strip_prefix("if ").and_then(|c| c.strip_suffix('{')) {
            Some(cond) => {
                let offset = unit.offset + unit.text.len() - after_else.len() + 3;
                Ok(DxClose::ElseIf(cond.trim(), offset))
            }
            None => Err(DxError::parse(unit.offset, format!("malformed else '{}'", unit.text))),
        }
    }

    fn parse_label(&mut self, unit: DxUnit<'s>, frame: DxFrame) -> Result<Option<DxNode>> {
        let text = unit.text;
        let is_case = text.starts_with("case ");
        let is_default = text == "default:" || (text.starts_with("default") && text[7..].trim() == ":");
        if !is_case && !is_default {
            return Ok(None);
        }
        let DxFrame::Switch { boolean } = frame else {
            return Err(DxError::parse(unit.offset, "case label outside of switch"));
        };
        if is_default {
            return Ok(Some(DxNode::Default(Vec::new())));
        }
        let body = text[5..].trim_end_matches(':').trim();
        if body.is_empty() {
            return Err(DxError::parse(unit.offset, "empty case label"));
        }
        let matcher = if boolean {
            DxCaseMatch::Test(self.parse_test(body, unit.offset)?)
        } else {
            DxCaseMatch::Values(parse_args(body))
        };
        Ok(Some(DxNode::Case(DxCase {
            matcher,
            children: Vec::new(),
        })))
    }

    fn parse_unit(&mut self, unit: DxUnit<'s>) -> Result<DxNode> {
        let text = unit.text;
        if text.starts_with("for ") && text.ends_with('{') {
            return self.parse_loop(unit);
        }
        if let Some(node) = self.parse_break(unit)? {
            return Ok(node);
        }
        if let Some(cond) = text.strip_prefix("if ").and_then(|t| t.strip_suffix('{')) {
            return self.parse_condition(cond.trim(), unit.offset + 3);
        }
        if (text == "switch {" || text.starts_with("switch ")) && text.ends_with('{') {
            return self.parse_switch(unit);
        }
        if text.ends_with('{') {
            return Err(DxError::parse(unit.offset, format!("unknown block '{}'", text)));
        }
        if let Some(pos) = find_assign(text) {
            return self.parse_assign(&text[..pos], &text[pos + 1..], unit.offset);
        }
        if let Some((name, args)) = split_call(text) {
            let func = self
                .registry
                .callback(name)
                .ok_or_else(|| DxError::unknown_function("callback", name, unit.offset))?;
            return Ok(DxNode::Callback(DxCall {
                func,
                args: parse_args(args),
            }));
        }
        Err(DxError::parse(unit.offset, format!("unknown node '{}'", text)))
    }

    fn parse_break(&mut self, unit: DxUnit<'s>) -> Result<Option<DxNode>> {
        let text = unit.text;
        if text == "continue" {
            if self.depth.loops == 0 {
                return Err(DxError::parse(unit.offset, "continue outside of loop"));
            }
            return Ok(Some(DxNode::Continue));
        }
        let (word, rest) = match text.split_once(' ') {
            Some((word, rest)) => (word, rest.trim()),
            None => (text, ""),
        };
        let lazy = match word {
            "break" => false,
            "lazybreak" => true,
            _ => return Ok(None),
        };
        let levels = if rest.is_empty() {
            1
        } else {
            rest.parse::<usize>()
                .map_err(|_| DxError::parse(unit.offset, format!("bad break depth '{}'", rest)))?
        };
        if levels == 0 || levels > self.depth.loops {
            return Err(DxError::parse(
                unit.offset,
                format!("{} {} exceeds {} enclosing loop(s)", word, levels, self.depth.loops),
            ));
        }
        Ok(Some(if lazy {
            DxNode::LazyBreak(levels)
        } else {
            DxNode::Break(levels)
        }))
    }

    /// Parse a block body with the counters of `block` raised.
    fn parse_block(&mut self, frame: DxFrame) -> Result<DxBody<'s>> {
        let target = DxTarget::snapshot(self.depth);
        if let Some(block) = frame.block() {
            self.depth.enter(block);
        }
        self.parse_body(frame, target)
    }

    fn parse_loop(&mut self, unit: DxUnit<'s>) -> Result<DxNode> {
        let header = unit.text[4..unit.text.len() - 1].trim();
        let malformed = || DxError::MalformedLoop {
            offset: unit.offset,
            header: header.to_string(),
        };

        let mut node = match find_top_level(header, |b, i| b[i] == b':' && b.get(i + 1) == Some(&b'=')) {
            Some(pos) if header[pos + 2..].trim_start().starts_with("range ") => {
                let src = header[pos + 2..].trim_start()[6..].trim();
                let names = split_top_level(&header[..pos], b',');
                if src.is_empty() || names.is_empty() || names.len() > 2 || !names.iter().all(|n| is_ident(n)) {
                    return Err(malformed());
                }
                let bind = |name: &str| (name != "_").then(|| name.to_string());
                DxNode::RangeLoop(DxRangeLoop {
                    key: bind(names[0]),
                    value: names.get(1).copied().and_then(bind),
                    src: DxPath::parse(src),
                    children: Vec::new(),
                })
            }
            _ => DxNode::CounterLoop(parse_counter(header).ok_or_else(malformed)?),
        };

        let body = self.parse_block(DxFrame::Loop)?;
        match &mut node {
            DxNode::RangeLoop(lp) => lp.children = body.nodes,
            DxNode::CounterLoop(lp) => lp.children = body.nodes,
            _ => {}
        }
        Ok(node)
    }

    fn parse_condition(&mut self, cond: &'s str, offset: usize) -> Result<DxNode> {
        let binding = find_top_level(cond, |b, i| b[i] == b':' && b.get(i + 1) == Some(&b'='));
        if let Some(pos) = binding {
            let mut node = self.parse_condition_ok(cond, pos, offset)?;
            node.children = self.parse_branches()?;
            return Ok(DxNode::ConditionOk(node));
        }
        let test = self.parse_test(cond, offset)?;
        let children = self.parse_branches()?;
        Ok(DxNode::Condition(DxCondition { test, children }))
    }

    /// Parse the true branch and any `else` continuation.
    fn parse_branches(&mut self) -> Result<Vec<DxNode>> {
        let body = self.parse_block(DxFrame::Cond)?;
        let mut children = vec![DxNode::TrueBranch(body.nodes)];
        match body.close {
            DxClose::Else => {
                let other = self.parse_block(DxFrame::Cond)?;
                if !matches!(other.close, DxClose::Brace) {
                    return Err(DxError::parse(self.pos, "else after else"));
                }
                children.push(DxNode::FalseBranch(other.nodes));
            }
            DxClose::ElseIf(cond, offset) => {
                let nested = self.parse_condition(cond, offset)?;
                children.push(DxNode::FalseBranch(vec![nested]));
            }
            DxClose::Brace | DxClose::Eof => {}
        }
        Ok(children)
    }

    fn parse_condition_ok(&self, cond: &str, assign: usize, offset: usize) -> Result<DxConditionOk> {
        let names = split_top_level(&cond[..assign], b',');
        if names.is_empty() || names.len() > 2 {
            return Err(DxError::parse(offset, format!("malformed ok binding '{}'", cond)));
        }
        let rest = &cond[assign + 2..];
        let (call, check) = match find_top_level(rest, |b, i| b[i] == b';') {
            Some(pos) => (rest[..pos].trim(), rest[pos + 1..].trim()),
            None => (rest.trim(), ""),
        };

        let (var, var_ins) = split_accessor(names[0]);
        let (call, call_ins) = split_accessor(call);
        let ins = match call_ins.or(var_ins) {
            Some(name) => Some(self.accessor(name, offset)?),
            None => None,
        };
        let (name, args) = split_call(call)
            .ok_or_else(|| DxError::parse(offset, format!("ok binding needs a helper call, got '{}'", call)))?;
        let helper = self
            .registry
            .condition_ok_helper(name)
            .ok_or_else(|| DxError::unknown_function("condition-OK helper", name, offset))?;

        let ok_name = names.get(1).copied().unwrap_or("_");
        let bind = |name: &str| (name != "_").then(|| name.to_string());
        let check = self.parse_ok_check(check, ok_name, offset)?;
        Ok(DxConditionOk {
            var: bind(var),
            ok_var: bind(ok_name),
            ins,
            helper,
            args: parse_args(args),
            check,
            children: Vec::new(),
        })
    }

    fn parse_ok_check(&self, check: &str, ok_name: &str, offset: usize) -> Result<DxOkCheck> {
        let named = ok_name != "_";
        if check.is_empty() || (named && check == ok_name) {
            return Ok(DxOkCheck::Ok);
        }
        if named && check.strip_prefix('!').map(str::trim) == Some(ok_name) {
            return Ok(DxOkCheck::NotOk);
        }
        let mut compare = check;
        if named {
            if let Some(rest) = check.strip_prefix(ok_name).map(str::trim_start) {
                if let Some(rest) = rest.strip_prefix("&&") {
                    compare = rest.trim();
                }
            }
        }
        if has_logical_operator(compare) {
            return Err(DxError::ComplexCondition {
                offset,
                condition: check.to_string(),
            });
        }
        let (pos, len) = find_comparison(compare).ok_or_else(|| DxError::ComplexCondition {
            offset,
            condition: check.to_string(),
        })?;
        let (left, op, right) = comparison(compare, pos, len);
        Ok(DxOkCheck::Compare { left, op, right })
    }

    /// Boolean test of a condition header or a boolean case label.
    fn parse_test(&self, text: &str, offset: usize) -> Result<DxTest> {
        let text = text.trim();
        if has_logical_operator(text) {
            return Err(DxError::ComplexCondition {
                offset,
                condition: text.to_string(),
            });
        }
        if let Some((pos, len)) = find_comparison(text) {
            let (lhs, rhs) = (&text[..pos], &text[pos + len..]);
            let op = DxOp::parse(&text[pos..pos + len]);
            if let Some((cap, operand)) = length_call(lhs) {
                return Ok(DxTest::Length {
                    cap,
                    operand: DxArg::parse(operand),
                    op,
                    right: DxArg::parse(rhs),
                });
            }
            if let Some((cap, operand)) = length_call(rhs) {
                return Ok(DxTest::Length {
                    cap,
                    operand: DxArg::parse(operand),
                    op: op.mirror(),
                    right: DxArg::parse(lhs),
                });
            }
            let (left, op, right) = comparison(text, pos, len);
            return Ok(DxTest::Compare { left, op, right });
        }

        let (negate, inner) = match text.strip_prefix('!') {
            Some(inner) => (true, inner.trim()),
            None => (false, text),
        };
        if let Some((name, args)) = split_call(inner) {
            let helper = self
                .registry
                .condition_helper(name)
                .ok_or_else(|| DxError::unknown_function("condition helper", name, offset))?;
            return Ok(DxTest::Helper {
                helper,
                args: parse_args(args),
                negate,
            });
        }
        if inner.is_empty() {
            return Err(DxError::parse(offset, "empty condition"));
        }
        Ok(DxTest::Truthy {
            operand: DxArg::parse(inner),
            negate,
        })
    }

    fn parse_switch(&mut self, unit: DxUnit<'s>) -> Result<DxNode> {
        let subject = unit.text[6..unit.text.len() - 1].trim();
        let subject = (!subject.is_empty()).then(|| DxArg::parse(subject));
        let body = self.parse_block(DxFrame::Switch {
            boolean: subject.is_none(),
        })?;
        Ok(DxNode::Switch(DxSwitch {
            subject,
            children: body.nodes,
        }))
    }

    fn parse_assign(&self, dst: &str, rhs: &str, offset: usize) -> Result<DxNode> {
        let dst = DxPath::parse(dst);
        let rhs = rhs.trim();
        if dst.is_empty() || rhs.is_empty() {
            return Err(DxError::parse(offset, "incomplete assignment"));
        }

        let (rhs, ins) = if matches!(dst.root(), "ctx" | "context") {
            let (rhs, ins) = split_accessor(rhs);
            match ins {
                Some(name) => (rhs, Some(self.accessor(name, offset)?)),
                None => (rhs, None),
            }
        } else {
            (rhs, None)
        };

        if parse_literal(rhs).is_some() {
            return Ok(DxNode::Assign(DxAssign {
                dst,
                src: Some(DxArg::parse(rhs)),
                mods: Vec::new(),
                ins,
            }));
        }

        let parts = split_top_level(rhs, b'|');
        let (first, rest) = parts.split_first().ok_or_else(|| DxError::parse(offset, "incomplete assignment"))?;
        let mut mods = Vec::with_capacity(parts.len());
        let src = match split_call(first) {
            Some((name, args)) => {
                if rest.is_empty() {
                    if let Some(func) = self.registry.getter(name) {
                        return Ok(DxNode::Getter(DxGetter {
                            dst,
                            call: DxCall {
                                func,
                                args: parse_args(args),
                            },
                            ins,
                        }));
                    }
                }
                let func = self
                    .registry
                    .modifier(name)
                    .ok_or_else(|| DxError::unknown_function("getter", name, offset))?;
                mods.push(DxMod {
                    func,
                    args: parse_args(args),
                });
                None
            }
            None => Some(DxArg::parse(first)),
        };
        for part in rest {
            mods.push(self.parse_mod(part, offset)?);
        }
        Ok(DxNode::Assign(DxAssign { dst, src, mods, ins }))
    }

    fn parse_mod(&self, part: &str, offset: usize) -> Result<DxMod> {
        let (name, args) = match split_call(part) {
            Some(call) => call,
            None if is_ident(part) => (part, ""),
            None => return Err(DxError::parse(offset, format!("malformed modifier '{}'", part))),
        };
        let func = self
            .registry
            .modifier(name)
            .ok_or_else(|| DxError::unknown_function("modifier", name, offset))?;
        Ok(DxMod {
            func,
            args: parse_args(args),
        })
    }

    fn accessor(&self, name: &str, offset: usize) -> Result<DxAccessorRef> {
        self.registry
            .accessor(name)
            .ok_or_else(|| DxError::unknown_function("accessor", name, offset))
    }
}

fn parse_args(raw: &str) -> Vec<DxArg> {
    split_top_level(raw, b',').into_iter().map(DxArg::parse).collect()
}

/// `len(x)` or `cap(x)`: whether it is `cap`, and the operand text.
fn length_call(text: &str) -> Option<(bool, &str)> {
    let (name, operand) = split_call(text)?;
    matches!(name, "len" | "cap").then_some((name == "cap", operand))
}

/// Split `LEFT OP RIGHT`, moving a lone static operand to the right.
fn comparison(text: &str, pos: usize, len: usize) -> (DxArg, DxOp, DxArg) {
    let left = DxArg::parse(&text[..pos]);
    let op = DxOp::parse(&text[pos..pos + len]);
    let right = DxArg::parse(&text[pos + len..]);
    if left.is_static() && !right.is_static() {
        (right, op.mirror(), left)
    } else {
        (left, op, right)
    }
}

fn is_op_byte(b: u8) -> bool {
    matches!(b, b'<' | b'>' | b'=' | b'!' | b'+' | b'-' | b'*' | b'/' | b'%' | b'&' | b'|' | b'^' | b'~')
}

/// Split a leading operator token off `text`.
fn split_op(text: &str) -> (&str, &str) {
    let end = text.bytes().take_while(|b| is_op_byte(*b)).count();
    (&text[..end], text[end..].trim())
}

/// `i := INIT; i OP LIMIT; i STEP`
fn parse_counter(header: &str) -> Option<DxCounterLoop> {
    let parts = split_top_level(header, b';');
    if parts.len() != 3 {
        return None;
    }
    let (counter, init) = match parts[0].split_once(":=") {
        Some(split) => split,
        None => parts[0].split_once('=')?,
    };
    let counter = counter.trim();
    let init = init.trim();
    if !is_ident(counter) || init.is_empty() {
        return None;
    }

    let (cond_raw, limit) = split_op(parts[1].strip_prefix(counter)?.trim_start());
    if cond_raw.is_empty() || limit.is_empty() {
        return None;
    }
    let (step_raw, tail) = split_op(parts[2].strip_prefix(counter)?.trim_start());
    if step_raw.is_empty() || !tail.is_empty() {
        return None;
    }

    Some(DxCounterLoop {
        counter: counter.to_string(),
        init: DxArg::parse(init),
        cond: DxOp::parse(cond_raw),
        cond_raw: cond_raw.to_string(),
        limit: DxArg::parse(limit),
        step: DxOp::parse(step_raw),
        step_raw: step_raw.to_string(),
        children: Vec::new(),
    })
}
