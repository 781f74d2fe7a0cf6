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

//! # Engine Module
//!
//! [`DxEngine`] bundles a function registry, a decoder store and a context
//! pool behind one handle. Typical use:
//!
//! 1. build a registry (built-ins plus the host's own functions and accessors)
//! 2. register rule bodies under ids and/or keys
//! 3. decode by key with a pooled context per request
//!
//! ```rust,ignore
//! use decodex::{DxEngine, DxJsonAccessor, DxHost};
//! use std::sync::Arc;
//!
//! let engine = DxEngine::new();
//! engine.register_source(Some(1), Some("user"), "obj.id = jso.identifier")?;
//!
//! let out = DxHost::new(serde_json::json!({}));
//! let mut ctx = engine.acquire_ctx();
//! ctx.set_json("jso", br#"{"identifier": "xf44e"}"#)?;
//! ctx.set("obj", out.clone(), Arc::new(DxJsonAccessor));
//! engine.decode("user", &mut ctx)?;
//! ```

use std::sync::Arc;

use log::{debug, warn};

use crate::config::DxEngineConfig;
use crate::context::{DxCtx, DxCtxGuard, DxCtxPool};
use crate::errors::{DxError, Result};
use crate::interp::decode_tree;
use crate::parser::DxParser;
use crate::registry::DxRegistry;
use crate::store::{DxDecoder, DxStore};
use crate::tree::DxTree;

pub struct DxEngine {
    registry: Arc<DxRegistry>,
    store: DxStore,
    pool: DxCtxPool,
    config: DxEngineConfig,
}

impl Default for DxEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl DxEngine {
    pub fn new() -> Self {
        Self::with_config(DxEngineConfig::default())
    }

    pub fn with_config(config: DxEngineConfig) -> Self {
        let registry = if config.builtins {
            DxRegistry::with_builtins()
        } else {
            DxRegistry::new()
        };
        Self::with_registry(registry, config)
    }

    /// Engine over a registry prepared by the caller. `config.builtins` is
    /// not consulted here.
    pub fn with_registry(registry: DxRegistry, config: DxEngineConfig) -> Self {
        debug!(
            "engine created: lock policy {}, tree cache {}, pool capacity {}",
            config.lock_policy, config.cache_trees, config.pool_capacity
        );
        DxEngine {
            registry: Arc::new(registry),
            store: DxStore::with_policy(config.lock_policy),
            pool: DxCtxPool::new(config.pool_capacity),
            config,
        }
    }

    pub fn config(&self) -> &DxEngineConfig {
        &self.config
    }

    pub fn registry(&self) -> &Arc<DxRegistry> {
        &self.registry
    }

    pub fn store(&self) -> &DxStore {
        &self.store
    }

    pub fn parse(&self, src: &str) -> Result<Arc<DxTree>> {
        let parser = DxParser::new(&self.registry);
        if self.config.cache_trees {
            parser.with_store(&self.store).parse(src)
        } else {
            parser.parse(src)
        }
    }

    pub fn register(&self, id: Option<u64>, key: Option<&str>, tree: Arc<DxTree>) {
        self.store.register(id, key, tree);
    }

    /// Parse `src` and register the tree. Nothing is registered on a parse error.
    pub fn register_source(&self, id: Option<u64>, key: Option<&str>, src: &str) -> Result<Arc<DxTree>> {
        let tree = self.parse(src)?;
        self.store.register(id, key, Arc::clone(&tree));
        Ok(tree)
    }

    /// Run the decoder registered under `key`.
    pub fn decode(&self, key: &str, ctx: &mut DxCtx) -> Result<()> {
        let decoder = self.store.get_by_key(key).ok_or_else(|| missing(key))?;
        decode_tree(&decoder.tree, ctx)
    }

    pub fn decode_by_id(&self, id: u64, ctx: &mut DxCtx) -> Result<()> {
        let decoder = self
            .store
            .get_by_id(id)
            .ok_or_else(|| missing(&id.to_string()))?;
        decode_tree(&decoder.tree, ctx)
    }

    /// Run the decoder under `key`, or the one under `fallback_key` when
    /// `key` isn't registered.
    pub fn decode_fallback(&self, key: &str, fallback_key: &str, ctx: &mut DxCtx) -> Result<()> {
        self.decode_by_keys(&[key, fallback_key], ctx)
    }

    /// Run the first decoder registered under any of `keys`.
    pub fn decode_by_keys<S: AsRef<str>>(&self, keys: &[S], ctx: &mut DxCtx) -> Result<()> {
        let decoder = self.store.get_by_keys(keys).ok_or_else(|| {
            let joined: Vec<&str> = keys.iter().map(AsRef::as_ref).collect();
            missing(&joined.join("|"))
        })?;
        decode_tree(&decoder.tree, ctx)
    }

    pub fn decoder(&self, key: &str) -> Option<Arc<DxDecoder>> {
        self.store.get_by_key(key)
    }

    /// Pooled context, reset and returned to the engine when dropped.
    pub fn acquire_ctx(&self) -> DxCtxGuard<'_> {
        self.pool.acquire()
    }

    /// XML-like dump of the tree registered under `key`.
    pub fn dump(&self, key: &str) -> Result<String> {
        let decoder = self.store.get_by_key(key).ok_or_else(|| missing(key))?;
        Ok(decoder.tree.human_readable())
    }
}

fn missing(key: &str) -> DxError {
    warn!("decoder '{}' not found", key);
    DxError::DecoderNotFound(key.to_string())
}

impl std::fmt::Debug for DxEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DxEngine")
            .field("config", &self.config)
            .field("store", &self.store)
            .finish()
    }
}
