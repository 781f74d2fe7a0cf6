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

//! Counter loops: `for i := 0; i < 10; i++ { ... }`.

use log::trace;

use super::{resolve, run_block, DxFlow};
use crate::context::DxCtx;
use crate::errors::{DxError, Result};
use crate::tree::{DxArg, DxCounterLoop, DxOp};

pub(super) fn run(lp: &DxCounterLoop, ctx: &mut DxCtx) -> Result<DxFlow> {
    if !lp.cond.is_comparison() {
        return Err(DxError::LoopCondition(lp.cond_raw.clone()));
    }
    let step: i64 = match lp.step {
        DxOp::Inc => 1,
        DxOp::Dec => -1,
        _ => return Err(DxError::LoopIncrement(lp.step_raw.clone())),
    };
    let init = bound(&lp.init, ctx)?;
    let limit = bound(&lp.limit, ctx)?;

    let slot = ctx.counters.len();
    ctx.counters.push(init);
    let result = iterate(lp, step, limit, slot, ctx);
    ctx.counters.truncate(slot);
    result
}

fn iterate(lp: &DxCounterLoop, step: i64, limit: i64, slot: usize, ctx: &mut DxCtx) -> Result<DxFlow> {
    loop {
        let counter = ctx.counters[slot];
        if !holds(counter, lp.cond, limit) || ctx.brk_depth > 0 {
            return Ok(DxFlow::Proceed);
        }
        ctx.set_static(&lp.counter, counter);
        match run_block(&lp.children, ctx)? {
            flow @ (DxFlow::Break | DxFlow::LazyBreak) => {
                ctx.brk_depth = ctx.brk_depth.saturating_sub(1);
                trace!("counter loop '{}' left at {}", lp.counter, counter);
                if ctx.brk_depth > 0 {
                    return Ok(flow);
                }
                return Ok(DxFlow::Proceed);
            }
            DxFlow::Proceed | DxFlow::Continue => {}
        }
        match counter.checked_add(step) {
            Some(next) => ctx.counters[slot] = next,
            None => return Ok(DxFlow::Proceed),
        }
    }
}

fn holds(counter: i64, op: DxOp, limit: i64) -> bool {
    match op {
        DxOp::Eq => counter == limit,
        DxOp::Nq => counter != limit,
        DxOp::Gt => counter > limit,
        DxOp::Gtq => counter >= limit,
        DxOp::Lt => counter < limit,
        DxOp::Ltq => counter <= limit,
        _ => false,
    }
}

fn bound(arg: &DxArg, ctx: &DxCtx) -> Result<i64> {
    resolve(arg, ctx)?
        .as_i64()
        .ok_or_else(|| DxError::LoopLimit(arg.raw().to_string()))
}
