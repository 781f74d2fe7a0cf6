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

//! Range loops: `for k, v := range src { ... }`.
//!
//! The accessor of `src` drives the iteration and calls back into a
//! [`DxLooper`] for every element. Key and value land in the context's
//! range slot for the current nesting depth before the body runs.

use std::mem;

use log::{debug, trace};

use super::{run_block, DxFlow};
use crate::accessor::{range_node, DxLoopCtl, DxLooper};
use crate::context::{DxCtx, DxRangeSlot};
use crate::errors::Result;
use crate::tree::DxRangeLoop;
use crate::value::DxValue;

struct DxRangeLooper<'a> {
    lp: &'a DxRangeLoop,
    ctx: &'a mut DxCtx,
    slot: usize,
    flow: DxFlow,
}

impl DxLooper for DxRangeLooper<'_> {
    fn require_key(&self) -> bool {
        self.lp.key.is_some()
    }

    fn set_key(&mut self, key: DxValue) {
        self.ctx.ranges[self.slot].key = key;
    }

    fn set_value(&mut self, value: DxValue) {
        self.ctx.ranges[self.slot].value = value;
    }

    fn iterate(&mut self) -> DxLoopCtl {
        if self.ctx.brk_depth > 0 || self.ctx.err.is_some() {
            return DxLoopCtl::Brk;
        }
        let slot = &mut self.ctx.ranges[self.slot];
        slot.iterations += 1;
        let key = mem::take(&mut slot.key);
        let value = mem::take(&mut slot.value);
        if let Some(name) = &self.lp.key {
            self.ctx.bind(name, key, None);
        }
        if let Some(name) = &self.lp.value {
            self.ctx.bind(name, value, None);
        }
        match run_block(&self.lp.children, self.ctx) {
            Ok(DxFlow::Proceed) => DxLoopCtl::None,
            Ok(DxFlow::Continue) => DxLoopCtl::Cnt,
            Ok(flow) => {
                self.flow = flow;
                DxLoopCtl::Brk
            }
            Err(err) => {
                self.ctx.err = Some(err);
                DxLoopCtl::Brk
            }
        }
    }
}

pub(super) fn run(lp: &DxRangeLoop, ctx: &mut DxCtx) -> Result<DxFlow> {
    let slot = ctx.range_depth;
    if ctx.ranges.len() <= slot {
        ctx.ranges.push(DxRangeSlot::default());
    }
    ctx.range_depth += 1;
    let result = range(lp, slot, ctx);
    trace!("range over '{}' ran {} iteration(s)", lp.src.raw(), ctx.ranges[slot].iterations);
    ctx.ranges[slot].clear();
    ctx.range_depth -= 1;

    let flow = result?;
    if let Some(err) = ctx.err.take() {
        return Err(err);
    }
    match flow {
        DxFlow::Break | DxFlow::LazyBreak => {
            ctx.brk_depth = ctx.brk_depth.saturating_sub(1);
            if ctx.brk_depth > 0 {
                return Ok(flow);
            }
            Ok(DxFlow::Proceed)
        }
        _ => Ok(DxFlow::Proceed),
    }
}

fn range(lp: &DxRangeLoop, slot: usize, ctx: &mut DxCtx) -> Result<DxFlow> {
    let mut looper = DxRangeLooper {
        lp,
        ctx,
        slot,
        flow: DxFlow::Proceed,
    };
    if lp.src.has_fallback() {
        if let Some(DxValue::Node(node)) = looper.ctx.get_path(&lp.src)? {
            range_node(&node, &mut looper);
        }
        return Ok(looper.flow);
    }
    let Some((root, tail)) = lp.src.segments().split_first() else {
        return Ok(DxFlow::Proceed);
    };
    let Some((target, accessor)) = looper.ctx.variable(root) else {
        debug!("range source '{}' is not set", root);
        return Ok(DxFlow::Proceed);
    };
    accessor.range(&target, tail, &mut looper)?;
    Ok(looper.flow)
}
