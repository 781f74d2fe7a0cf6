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

//! # Interpreter Module
//!
//! Walks a parsed tree against a [`DxCtx`]. Statements run in order and the
//! first error aborts the decode; writes already made stay in place.
//!
//! Loop control travels as a [`DxFlow`] value rather than as an error. A
//! `break N` sets the context's break depth to `N`; every loop controller
//! that receives the signal lowers the depth by one and hands the signal to
//! its parent until the depth reaches zero.

mod cloop;
mod rloop;

use std::mem;

use log::trace;

use crate::context::DxCtx;
use crate::errors::{DxError, Result};
use crate::path::DxPath;
use crate::tree::{DxAccessorRef, DxArg, DxCaseMatch, DxNode, DxOkCheck, DxOp, DxSwitch, DxTest, DxTree};
use crate::value::DxValue;

/// Outcome of running a statement or a block.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DxFlow {
    Proceed,
    Break,
    /// Break once the current iteration has finished.
    LazyBreak,
    Continue,
}

/// Run a whole tree.
pub fn decode_tree(tree: &DxTree, ctx: &mut DxCtx) -> Result<()> {
    decode_ruleset(tree.nodes(), ctx)
}

/// Run root nodes in order, stopping at the first error.
pub fn decode_ruleset(nodes: &[DxNode], ctx: &mut DxCtx) -> Result<()> {
    let flow = run_block(nodes, ctx)?;
    if flow != DxFlow::Proceed {
        trace!("loop signal {:?} reached the root", flow);
        ctx.brk_depth = 0;
    }
    Ok(())
}

/// Run a child list. `Break` and `Continue` end the list at once, a lazy
/// break is reported after the remaining statements have run.
pub(crate) fn run_block(nodes: &[DxNode], ctx: &mut DxCtx) -> Result<DxFlow> {
    let mut lazy = false;
    for node in nodes {
        match follow(node, ctx)? {
            DxFlow::Proceed => {}
            DxFlow::LazyBreak => lazy = true,
            DxFlow::Continue if lazy => return Ok(DxFlow::LazyBreak),
            flow => return Ok(flow),
        }
    }
    Ok(if lazy { DxFlow::LazyBreak } else { DxFlow::Proceed })
}

pub fn follow(node: &DxNode, ctx: &mut DxCtx) -> Result<DxFlow> {
    trace!("follow {}", node.kind());
    match node {
        DxNode::Assign(assign) => {
            let mut value = match &assign.src {
                Some(src) => resolve(src, ctx)?,
                None => DxValue::Null,
            };
            for m in &assign.mods {
                let func = m.func.func;
                value = with_args(ctx, &m.args, &m.func.name, m.func.min_args, move |ctx, args| {
                    func(ctx, value, args)
                })?;
            }
            write(ctx, &assign.dst, value, assign.ins.as_ref())?;
        }
        DxNode::Callback(call) => {
            let func = call.func.func;
            with_args(ctx, &call.args, &call.func.name, call.func.min_args, func)?;
        }
        DxNode::Getter(getter) => {
            let call = &getter.call;
            let value = with_args(ctx, &call.args, &call.func.name, call.func.min_args, call.func.func)?;
            write(ctx, &getter.dst, value, getter.ins.as_ref())?;
        }
        DxNode::CounterLoop(lp) => return cloop::run(lp, ctx),
        DxNode::RangeLoop(lp) => return rloop::run(lp, ctx),
        DxNode::Break(depth) => {
            ctx.brk_depth = *depth;
            return Ok(DxFlow::Break);
        }
        DxNode::LazyBreak(depth) => {
            ctx.brk_depth = *depth;
            return Ok(DxFlow::LazyBreak);
        }
        DxNode::Continue => return Ok(DxFlow::Continue),
        DxNode::Condition(cond) => {
            let pass = eval_test(&cond.test, ctx)?;
            return run_branch(&cond.children, pass, ctx);
        }
        DxNode::ConditionOk(cond) => {
            let helper = &cond.helper;
            let (value, ok) = with_args(ctx, &cond.args, &helper.name, helper.min_args, helper.func)?;
            if let Some(var) = &cond.var {
                ctx.bind(var, value, cond.ins.as_ref());
            }
            if let Some(ok_var) = &cond.ok_var {
                ctx.set_static(ok_var, ok);
            }
            let pass = match &cond.check {
                DxOkCheck::Ok => ok,
                DxOkCheck::NotOk => !ok,
                DxOkCheck::Compare { left, op, right } => ok && compare(left, *op, right, ctx)?,
            };
            return run_branch(&cond.children, pass, ctx);
        }
        DxNode::Switch(switch) => return run_switch(switch, ctx),
        DxNode::TrueBranch(children) | DxNode::FalseBranch(children) | DxNode::Default(children) => {
            return run_block(children, ctx)
        }
        DxNode::Case(case) => return run_block(&case.children, ctx),
    }
    Ok(DxFlow::Proceed)
}

/// Resolve one argument: a literal as is, a path against the context.
/// Unresolvable paths yield `Null`.
pub(crate) fn resolve(arg: &DxArg, ctx: &DxCtx) -> Result<DxValue> {
    if let Some(literal) = &arg.literal {
        return Ok(literal.clone());
    }
    Ok(ctx.get_path(&arg.path)?.unwrap_or_default())
}

/// Resolve `args` onto the context's argument stack and call `f` with them.
fn with_args<R>(
    ctx: &mut DxCtx,
    args: &[DxArg],
    name: &str,
    min_args: usize,
    f: impl FnOnce(&mut DxCtx, &[DxValue]) -> Result<R>,
) -> Result<R> {
    let mut stack = mem::take(&mut ctx.args);
    stack.clear();
    let resolved = args.iter().try_for_each(|arg| {
        stack.push(resolve(arg, ctx)?);
        Ok::<(), DxError>(())
    });
    let result = match resolved {
        Err(err) => Err(err),
        Ok(()) if stack.len() < min_args => Err(DxError::poor_args(name, min_args, stack.len())),
        Ok(()) => f(ctx, &stack),
    };
    stack.clear();
    ctx.args = stack;
    result
}

fn write(ctx: &mut DxCtx, dst: &DxPath, value: DxValue, ins: Option<&DxAccessorRef>) -> Result<()> {
    if value.is_null() {
        trace!("'{}' resolved to nothing, skipping write", dst.raw());
        return Ok(());
    }
    ctx.set_path(dst, value, ins)
}

fn run_branch(children: &[DxNode], pass: bool, ctx: &mut DxCtx) -> Result<DxFlow> {
    for child in children {
        match child {
            DxNode::TrueBranch(nodes) if pass => return run_block(nodes, ctx),
            DxNode::FalseBranch(nodes) if !pass => return run_block(nodes, ctx),
            _ => {}
        }
    }
    Ok(DxFlow::Proceed)
}

fn run_switch(switch: &DxSwitch, ctx: &mut DxCtx) -> Result<DxFlow> {
    let subject = match &switch.subject {
        Some(arg) => Some(resolve(arg, ctx)?),
        None => None,
    };
    for child in &switch.children {
        let DxNode::Case(case) = child else {
            continue;
        };
        let hit = match &case.matcher {
            DxCaseMatch::Test(test) => eval_test(test, ctx)?,
            DxCaseMatch::Values(values) => {
                let mut hit = false;
                for value in values {
                    let value = resolve(value, ctx)?;
                    hit = match &subject {
                        Some(subject) => subject.compare(DxOp::Eq, &value),
                        None => value.is_truthy(),
                    };
                    if hit {
                        break;
                    }
                }
                hit
            }
        };
        if hit {
            return run_block(&case.children, ctx);
        }
    }
    for child in &switch.children {
        if let DxNode::Default(children) = child {
            return run_block(children, ctx);
        }
    }
    Ok(DxFlow::Proceed)
}

pub(crate) fn eval_test(test: &DxTest, ctx: &mut DxCtx) -> Result<bool> {
    match test {
        DxTest::Compare { left, op, right } => compare(left, *op, right, ctx),
        DxTest::Truthy { operand, negate } => Ok(resolve(operand, ctx)?.is_truthy() != *negate),
        DxTest::Helper { helper, args, negate } => {
            let pass = with_args(ctx, args, &helper.name, helper.min_args, helper.func)?;
            Ok(pass != *negate)
        }
        DxTest::Length { operand, op, right, .. } => {
            let len = match &operand.literal {
                Some(literal) => literal.len(),
                None if operand.path.has_fallback() => resolve(operand, ctx)?.len(),
                None => ctx
                    .with_accessor(&operand.path, |ins, target, tail| ins.length(target, tail))?
                    .flatten(),
            };
            let right = resolve(right, ctx)?;
            Ok(DxValue::Int(len.unwrap_or(0) as i64).compare(*op, &right))
        }
    }
}

/// `LEFT OP RIGHT` with a dynamic left side. The right side is serialized
/// into the context buffer and handed to the left variable's accessor.
pub(crate) fn compare(left: &DxArg, op: DxOp, right: &DxArg, ctx: &mut DxCtx) -> Result<bool> {
    if left.is_static() {
        if right.is_static() {
            return Err(DxError::SenselessComparison {
                left: left.raw().to_string(),
                right: right.raw().to_string(),
            });
        }
        return compare(right, op.mirror(), left, ctx);
    }

    let right = resolve(right, ctx)?;
    ctx.buf.clear();
    right.write_text(&mut ctx.buf);

    let ctx: &DxCtx = ctx;
    if left.path.has_fallback() {
        let value = ctx.get_path(&left.path)?.unwrap_or_default();
        return Ok(value.compare_text(op, &ctx.buf));
    }
    let verdict = ctx.with_accessor(&left.path, |ins, target, tail| ins.compare(target, tail, op, &ctx.buf))?;
    Ok(match verdict {
        Some(verdict) => verdict,
        None => DxValue::Null.compare_text(op, &ctx.buf),
    })
}
