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

//! # Tree Module
//!
//! The parsed form of a rule body. A [`DxTree`] is an ordered list of root
//! [`DxNode`]s plus the checksum of the source it was parsed from. Trees are
//! immutable once built and shared read-only (behind an `Arc`) by every decode
//! that uses them.
//!
//! Functions and accessors referenced by a rule body are resolved while
//! parsing, so nodes carry the function pointers themselves next to the names
//! used to print them.
//!
//! ## Node kinds
//!
//! - **Leaf**: `Assign`, `Callback`, `Getter`, `Break`, `LazyBreak`, `Continue`
//! - **Block**: `CounterLoop`, `RangeLoop`, `Condition`, `ConditionOk`,
//!   `TrueBranch`, `FalseBranch`, `Switch`, `Case`, `Default`
//!
//! Only block kinds own children.

mod dump;

use std::fmt;
use std::sync::Arc;

use crate::accessor::DxAccessor;
use crate::path::{parse_literal, DxPath};
use crate::registry::{DxCallbackFn, DxCondOkFn, DxGetterFn, DxHelperFn, DxModifierFn};
use crate::value::DxValue;

/// Comparison and increment operators used by conditions and loops.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum DxOp {
    #[default]
    Unk,
    Eq,
    Nq,
    Gt,
    Gtq,
    Lt,
    Ltq,
    Inc,
    Dec,
}

impl DxOp {
    pub fn parse(text: &str) -> DxOp {
        match text.trim() {
            "==" => DxOp::Eq,
            "!=" => DxOp::Nq,
            ">" => DxOp::Gt,
            ">=" => DxOp::Gtq,
            "<" => DxOp::Lt,
            "<=" => DxOp::Ltq,
            "++" => DxOp::Inc,
            "--" => DxOp::Dec,
            _ => DxOp::Unk,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            DxOp::Unk => "unk",
            DxOp::Eq => "==",
            DxOp::Nq => "!=",
            DxOp::Gt => ">",
            DxOp::Gtq => ">=",
            DxOp::Lt => "<",
            DxOp::Ltq => "<=",
            DxOp::Inc => "++",
            DxOp::Dec => "--",
        }
    }

    /// Operator to use once the operands trade places.
    pub fn mirror(&self) -> DxOp {
        match self {
            DxOp::Gt => DxOp::Lt,
            DxOp::Gtq => DxOp::Ltq,
            DxOp::Lt => DxOp::Gt,
            DxOp::Ltq => DxOp::Gtq,
            other => *other,
        }
    }

    pub fn is_comparison(&self) -> bool {
        matches!(self, DxOp::Eq | DxOp::Nq | DxOp::Gt | DxOp::Gtq | DxOp::Lt | DxOp::Ltq)
    }
}

impl fmt::Display for DxOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Argument of a function, a modifier or one side of a comparison: either a
/// static literal or a path resolved against the context.
#[derive(Clone, Debug, PartialEq)]
pub struct DxArg {
    pub path: DxPath,
    pub literal: Option<DxValue>,
}

impl DxArg {
    pub fn parse(text: &str) -> DxArg {
        let text = text.trim();
        DxArg {
            path: DxPath::parse(text),
            literal: parse_literal(text),
        }
    }

    pub fn is_static(&self) -> bool {
        self.literal.is_some()
    }

    pub fn raw(&self) -> &str {
        self.path.raw()
    }
}

/// A registered function resolved at parse time.
#[derive(Clone)]
pub struct DxFnRef<F> {
    pub name: String,
    pub min_args: usize,
    pub func: F,
}

impl<F> fmt::Debug for DxFnRef<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "DxFnRef({})", self.name)
    }
}

/// A named field accessor resolved at parse time.
#[derive(Clone)]
pub struct DxAccessorRef {
    pub name: String,
    pub accessor: Arc<dyn DxAccessor>,
}

impl fmt::Debug for DxAccessorRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "DxAccessorRef({})", self.name)
    }
}

#[derive(Clone, Debug)]
pub struct DxMod {
    pub func: DxFnRef<DxModifierFn>,
    pub args: Vec<DxArg>,
}

#[derive(Clone, Debug)]
pub struct DxCall<F> {
    pub func: DxFnRef<F>,
    pub args: Vec<DxArg>,
}

/// `dst = src|mod(..)`, `dst = "literal"` or `ctx.name = src as Type`.
///
/// `src` is `None` when the right side is a bare modifier call such as
/// `dst = default("x")`; the chain then starts from `Null`.
#[derive(Clone, Debug)]
pub struct DxAssign {
    pub dst: DxPath,
    pub src: Option<DxArg>,
    pub mods: Vec<DxMod>,
    pub ins: Option<DxAccessorRef>,
}

#[derive(Clone, Debug)]
pub struct DxGetter {
    pub dst: DxPath,
    pub call: DxCall<DxGetterFn>,
    pub ins: Option<DxAccessorRef>,
}

#[derive(Clone, Debug)]
pub struct DxCounterLoop {
    pub counter: String,
    pub init: DxArg,
    pub cond: DxOp,
    pub cond_raw: String,
    pub limit: DxArg,
    pub step: DxOp,
    pub step_raw: String,
    pub children: Vec<DxNode>,
}

#[derive(Clone, Debug)]
pub struct DxRangeLoop {
    pub key: Option<String>,
    pub value: Option<String>,
    pub src: DxPath,
    pub children: Vec<DxNode>,
}

/// Boolean test of a condition header or a boolean `case` label.
#[derive(Clone, Debug)]
pub enum DxTest {
    Compare {
        left: DxArg,
        op: DxOp,
        right: DxArg,
    },
    Truthy {
        operand: DxArg,
        negate: bool,
    },
    Helper {
        helper: DxFnRef<DxHelperFn>,
        args: Vec<DxArg>,
        negate: bool,
    },
    Length {
        cap: bool,
        operand: DxArg,
        op: DxOp,
        right: DxArg,
    },
}

#[derive(Clone, Debug)]
pub struct DxCondition {
    pub test: DxTest,
    /// A `TrueBranch` followed by an optional `FalseBranch`.
    pub children: Vec<DxNode>,
}

/// What an ok-binding condition finally branches on.
#[derive(Clone, Debug)]
pub enum DxOkCheck {
    Ok,
    NotOk,
    /// `ok && LEFT OP RIGHT`
    Compare { left: DxArg, op: DxOp, right: DxArg },
}

#[derive(Clone, Debug)]
pub struct DxConditionOk {
    pub var: Option<String>,
    pub ok_var: Option<String>,
    pub ins: Option<DxAccessorRef>,
    pub helper: DxFnRef<DxCondOkFn>,
    pub args: Vec<DxArg>,
    pub check: DxOkCheck,
    pub children: Vec<DxNode>,
}

#[derive(Clone, Debug)]
pub struct DxSwitch {
    /// `None` for boolean switches whose cases are conditions.
    pub subject: Option<DxArg>,
    /// `Case` and `Default` nodes.
    pub children: Vec<DxNode>,
}

#[derive(Clone, Debug)]
pub enum DxCaseMatch {
    Values(Vec<DxArg>),
    Test(DxTest),
}

#[derive(Clone, Debug)]
pub struct DxCase {
    pub matcher: DxCaseMatch,
    pub children: Vec<DxNode>,
}

#[derive(Clone, Debug)]
pub enum DxNode {
    Assign(DxAssign),
    Callback(DxCall<DxCallbackFn>),
    Getter(DxGetter),
    CounterLoop(DxCounterLoop),
    RangeLoop(DxRangeLoop),
    Break(usize),
    LazyBreak(usize),
    Continue,
    Condition(DxCondition),
    ConditionOk(DxConditionOk),
    TrueBranch(Vec<DxNode>),
    FalseBranch(Vec<DxNode>),
    Switch(DxSwitch),
    Case(DxCase),
    Default(Vec<DxNode>),
}

impl DxNode {
    pub fn kind(&self) -> &'static str {
        match self {
            DxNode::Assign(_) => "assign",
            DxNode::Callback(_) => "callback",
            DxNode::Getter(_) => "getter",
            DxNode::CounterLoop(_) => "loopCount",
            DxNode::RangeLoop(_) => "loopRange",
            DxNode::Break(_) => "break",
            DxNode::LazyBreak(_) => "lazybreak",
            DxNode::Continue => "continue",
            DxNode::Condition(_) => "cond",
            DxNode::ConditionOk(_) => "condOK",
            DxNode::TrueBranch(_) => "condTrue",
            DxNode::FalseBranch(_) => "condFalse",
            DxNode::Switch(_) => "switch",
            DxNode::Case(_) => "case",
            DxNode::Default(_) => "default",
        }
    }

    pub fn children(&self) -> &[DxNode] {
        match self {
            DxNode::CounterLoop(l) => &l.children,
            DxNode::RangeLoop(l) => &l.children,
            DxNode::Condition(c) => &c.children,
            DxNode::ConditionOk(c) => &c.children,
            DxNode::TrueBranch(children) | DxNode::FalseBranch(children) | DxNode::Default(children) => children,
            DxNode::Switch(s) => &s.children,
            DxNode::Case(c) => &c.children,
            DxNode::Assign(_)
            | DxNode::Callback(_)
            | DxNode::Getter(_)
            | DxNode::Break(_)
            | DxNode::LazyBreak(_)
            | DxNode::Continue => &[],
        }
    }

    /// Count this node and every node below it.
    pub fn count(&self) -> usize {
        1 + self.children().iter().map(DxNode::count).sum::<usize>()
    }
}

/// Parsed rule body.
#[derive(Clone, Debug)]
pub struct DxTree {
    nodes: Vec<DxNode>,
    hash: u64,
}

impl DxTree {
    pub fn new(nodes: Vec<DxNode>, hash: u64) -> Self {
        DxTree { nodes, hash }
    }

    pub fn nodes(&self) -> &[DxNode] {
        &self.nodes
    }

    /// Checksum of the source the tree was parsed from.
    pub fn hash(&self) -> u64 {
        self.hash
    }

    pub fn hash_hex(&self) -> String {
        hex::encode(self.hash.to_be_bytes())
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Total number of nodes at every depth.
    pub fn node_count(&self) -> usize {
        self.nodes.iter().map(DxNode::count).sum()
    }
}
