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

//! # Engine Configuration
//!
//! Serializable configuration for [`crate::engine::DxEngine`] together with a
//! builder whose unset fields fall back to the defaults.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::errors::{DxError, Result};

/// Concurrency policy of the decoder store.
///
/// `LockFree` is a caller-managed trust boundary: switch to it only once
/// registration has settled. Decoders registered afterwards may stay invisible
/// to threads that already hold a snapshot until the next generation check.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DxLockPolicy {
    #[default]
    Locked,
    LockFree,
}

impl fmt::Display for DxLockPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DxLockPolicy::Locked => f.write_str("locked"),
            DxLockPolicy::LockFree => f.write_str("lockfree"),
        }
    }
}

impl FromStr for DxLockPolicy {
    type Err = DxError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "locked" => Ok(DxLockPolicy::Locked),
            "lockfree" | "lock_free" => Ok(DxLockPolicy::LockFree),
            _ => Err(DxError::UnknownPolicy(s.to_string())),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DxEngineConfig {
    pub lock_policy: DxLockPolicy,
    /// Reuse parsed trees for byte-identical sources.
    pub cache_trees: bool,
    /// Upper bound of idle contexts kept by the engine pool.
    pub pool_capacity: usize,
    /// Register the built-in function library.
    pub builtins: bool,
}

impl Default for DxEngineConfig {
    fn default() -> Self {
        DxEngineConfig {
            lock_policy: DxLockPolicy::Locked,
            cache_trees: true,
            pool_capacity: 16,
            builtins: true,
        }
    }
}

impl DxEngineConfig {
    pub fn builder() -> DxEngineConfigBuilder {
        DxEngineConfigBuilder::default()
    }

    /// Parse a configuration from JSON, missing fields take default values.
    pub fn from_json(text: &str) -> Result<Self> {
        let builder: DxEngineConfigBuilder = serde_json::from_str(text)
            .map_err(|e| DxError::internal(format!("invalid engine config: {}", e)))?;
        Ok(builder.build())
    }
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct DxEngineConfigBuilder {
    pub lock_policy: Option<DxLockPolicy>,
    pub cache_trees: Option<bool>,
    pub pool_capacity: Option<usize>,
    pub builtins: Option<bool>,
}

impl DxEngineConfigBuilder {
    pub fn lock_policy(mut self, policy: DxLockPolicy) -> Self {
        self.lock_policy = Some(policy);
        self
    }

    pub fn cache_trees(mut self, enabled: bool) -> Self {
        self.cache_trees = Some(enabled);
        self
    }

    pub fn pool_capacity(mut self, capacity: usize) -> Self {
        self.pool_capacity = Some(capacity);
        self
    }

    pub fn builtins(mut self, enabled: bool) -> Self {
        self.builtins = Some(enabled);
        self
    }

    pub fn build(self) -> DxEngineConfig {
        let base = DxEngineConfig::default();
        DxEngineConfig {
            lock_policy: self.lock_policy.unwrap_or(base.lock_policy),
            cache_trees: self.cache_trees.unwrap_or(base.cache_trees),
            pool_capacity: self.pool_capacity.unwrap_or(base.pool_capacity),
            builtins: self.builtins.unwrap_or(base.builtins),
        }
    }
}
