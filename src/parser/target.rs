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

//! Nesting counters of the parser.

/// Kind of block a body belongs to.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum DxBlock {
    Cond,
    Loop,
    Switch,
}

/// Current nesting depth per block kind.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub(crate) struct DxDepth {
    pub cond: usize,
    pub loops: usize,
    pub switch: usize,
}

impl DxDepth {
    pub fn enter(&mut self, block: DxBlock) {
        match block {
            DxBlock::Cond => self.cond += 1,
            DxBlock::Loop => self.loops += 1,
            DxBlock::Switch => self.switch += 1,
        }
    }

    /// Close the innermost block of the given kind, `false` if none is open.
    pub fn leave(&mut self, block: DxBlock) -> bool {
        let counter = match block {
            DxBlock::Cond => &mut self.cond,
            DxBlock::Loop => &mut self.loops,
            DxBlock::Switch => &mut self.switch,
        };
        if *counter == 0 {
            return false;
        }
        *counter -= 1;
        true
    }
}

/// Snapshot of the counters taken before a block body is parsed. The body is
/// complete once the counters are back to the snapshot.
#[derive(Clone, Copy, Debug)]
pub(crate) struct DxTarget {
    depth: DxDepth,
}

impl DxTarget {
    pub fn snapshot(depth: DxDepth) -> Self {
        DxTarget { depth }
    }

    pub fn reached(&self, depth: DxDepth) -> bool {
        self.depth == depth
    }
}
