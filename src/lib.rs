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

//! # Decodex Core Library
//!
//! Decodex is a rule-based data-mapping engine. A small textual DSL describes
//! how to read fields out of parsed documents and host values, transform them
//! and write them into destination objects. Rule bodies are data: they can be
//! loaded per tenant, versioned and swapped without recompiling the host.
//!
//! ## Module Overview
//!
//! - **errors**: the crate-wide [`DxError`] and [`Result`] alias
//! - **config**: engine configuration and the decoder-store lock policy
//! - **value**: [`DxValue`], the dynamic value passed between rules and functions
//! - **document**: JSON, YAML and URL-query documents behind [`DxDocNode`]
//! - **accessor**: field accessors that read and write context variables by path
//! - **path**: path tokenizer and static literal recognizer
//! - **registry**: functions and accessors a rule body may reference
//! - **tree**: the parsed rule tree, its XML-like dump and canonical rendering
//! - **parser**: DSL source to [`DxTree`]
//! - **store**: registered decoders by id, key and source checksum
//! - **context**: the execution context and its pool
//! - **interp**: the tree-walking interpreter with loop controllers
//! - **engine**: [`DxEngine`], registry, store and pool behind one handle
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use decodex::{DxEngine, DxHost, DxJsonAccessor};
//! use std::sync::Arc;
//!
//! let engine = DxEngine::new();
//! engine.register_source(None, Some("user"), r#"
//!     obj.Id = jso.identifier
//!     obj.Name = jso.person.{id|nickname|full_name}|default("anonymous")
//!     for _, v := range jso.history {
//!         obj.Status = v.status
//!     }
//! "#)?;
//!
//! let obj = DxHost::new(serde_json::json!({}));
//! let mut ctx = engine.acquire_ctx();
//! ctx.set_json("jso", payload)?;
//! ctx.set("obj", obj.clone(), Arc::new(DxJsonAccessor));
//! engine.decode("user", &mut ctx)?;
//! ```
//!
//! ## Error Handling
//!
//! Parsing and decoding return `Result<T, DxError>`. A decode stops at the
//! first failing statement; writes made before it stay in place. Loop control
//! (`break`, `lazybreak`, `continue`) is never reported as an error.

pub mod accessor;
pub mod config;
pub mod context;
pub mod document;
pub mod engine;
pub mod errors;
pub mod interp;
pub mod parser;
pub mod path;
pub mod registry;
pub mod store;
pub mod tree;
pub mod value;

pub use accessor::{DxAccessor, DxDocumentAccessor, DxJsonAccessor, DxLoopCtl, DxLooper, DxStaticAccessor};
pub use config::{DxEngineConfig, DxEngineConfigBuilder, DxLockPolicy};
pub use context::{acquire_ctx, DxCtx, DxCtxGuard, DxCtxPool};
pub use document::DxDocNode;
pub use engine::DxEngine;
pub use errors::{DxError, Result};
pub use interp::{decode_ruleset, decode_tree, DxFlow};
pub use parser::DxParser;
pub use path::DxPath;
pub use registry::{
    DxCallbackFn, DxCondOkFn, DxFnInfo, DxGetterFn, DxHelperFn, DxModifierFn, DxRegistry,
};
pub use store::{DxDecoder, DxStore};
pub use tree::{DxNode, DxOp, DxTree};
pub use value::{DxHost, DxValue};
