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

//! Context pooling. A [`DxCtxGuard`] resets its context and hands it back to
//! the pool when dropped, whether the decode succeeded or not.

use std::mem::ManuallyDrop;
use std::ops::{Deref, DerefMut};
use std::sync::{Mutex, OnceLock};

use log::trace;

use super::DxCtx;

pub struct DxCtxPool {
    idle: Mutex<Vec<DxCtx>>,
    capacity: usize,
}

impl DxCtxPool {
    /// Pool keeping at most `capacity` idle contexts.
    pub fn new(capacity: usize) -> Self {
        DxCtxPool {
            idle: Mutex::new(Vec::new()),
            capacity,
        }
    }

    /// Process-wide pool used by [`acquire_ctx`].
    pub fn global() -> &'static DxCtxPool {
        static POOL: OnceLock<DxCtxPool> = OnceLock::new();
        POOL.get_or_init(|| DxCtxPool::new(64))
    }

    pub fn acquire(&self) -> DxCtxGuard<'_> {
        let ctx = self
            .idle
            .lock()
            .ok()
            .and_then(|mut idle| idle.pop())
            .unwrap_or_default();
        DxCtxGuard {
            pool: self,
            ctx: ManuallyDrop::new(ctx),
        }
    }

    /// Number of idle contexts waiting for reuse.
    pub fn idle(&self) -> usize {
        self.idle.lock().map(|idle| idle.len()).unwrap_or(0)
    }

    fn release(&self, mut ctx: DxCtx) {
        ctx.reset();
        if let Ok(mut idle) = self.idle.lock() {
            if idle.len() < self.capacity {
                idle.push(ctx);
                return;
            }
        }
        trace!("context pool is full, dropping context");
    }
}

impl Default for DxCtxPool {
    fn default() -> Self {
        DxCtxPool::new(16)
    }
}

/// Acquire a context from the process-wide pool.
pub fn acquire_ctx() -> DxCtxGuard<'static> {
    DxCtxPool::global().acquire()
}

pub struct DxCtxGuard<'a> {
    pool: &'a DxCtxPool,
    ctx: ManuallyDrop<DxCtx>,
}

impl Deref for DxCtxGuard<'_> {
    type Target = DxCtx;

    fn deref(&self) -> &DxCtx {
        &self.ctx
    }
}

impl DerefMut for DxCtxGuard<'_> {
    fn deref_mut(&mut self) -> &mut DxCtx {
        &mut self.ctx
    }
}

impl Drop for DxCtxGuard<'_> {
    fn drop(&mut self) {
        // SAFETY: `ctx` is taken exactly once, here, and never touched again.
        let ctx = unsafe { ManuallyDrop::take(&mut self.ctx) };
        self.pool.release(ctx);
    }
}
