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

//! # Function Registry Module
//!
//! The registry maps names to the functions and field accessors a rule body
//! may reference. It is an explicit handle: the parser resolves every name
//! against the registry it is given, so separate registries stay isolated.
//!
//! ## Tables
//!
//! - **callbacks**: `name(args)` statements with side effects
//! - **getters**: `dst = name(args)`
//! - **modifiers**: `dst = src|name(args)`
//! - **condition helpers**: `if name(args) {`
//! - **condition-OK helpers**: `if v, ok := name(args); ok {`
//! - **accessors**: `ctx.x = src as name`
//!
//! Each function may carry an alias and a namespace (`ns::name`). The first
//! registration of a name wins; later ones are ignored with a warning.

pub mod builtin;

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use log::warn;

use crate::accessor::{DxAccessor, DxDocumentAccessor, DxJsonAccessor, DxStaticAccessor};
use crate::context::DxCtx;
use crate::errors::{DxError, Result};
use crate::tree::{DxAccessorRef, DxFnRef};
use crate::value::DxValue;

pub type DxCallbackFn = fn(&mut DxCtx, &[DxValue]) -> Result<()>;
pub type DxGetterFn = fn(&mut DxCtx, &[DxValue]) -> Result<DxValue>;
pub type DxModifierFn = fn(&mut DxCtx, DxValue, &[DxValue]) -> Result<DxValue>;
pub type DxHelperFn = fn(&mut DxCtx, &[DxValue]) -> Result<bool>;
pub type DxCondOkFn = fn(&mut DxCtx, &[DxValue]) -> Result<(DxValue, bool)>;

/// Descriptive metadata of a registered function.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct DxFnInfo {
    pub name: String,
    pub alias: Option<String>,
    /// Arguments required before the function is invoked.
    pub min_args: usize,
    pub description: String,
}

impl DxFnInfo {
    pub fn with_min_args(&mut self, min_args: usize) -> &mut Self {
        self.min_args = min_args;
        self
    }

    pub fn with_description(&mut self, description: &str) -> &mut Self {
        self.description = description.to_string();
        self
    }
}

/// One table of named functions of the same signature.
pub struct DxFnTable<F> {
    kind: &'static str,
    entries: Vec<(DxFnInfo, F)>,
    index: HashMap<String, usize>,
}

impl<F: Copy> DxFnTable<F> {
    fn new(kind: &'static str) -> Self {
        DxFnTable {
            kind,
            entries: Vec::new(),
            index: HashMap::new(),
        }
    }

    fn register(&mut self, name: String, alias: Option<String>, func: F) -> &mut DxFnInfo {
        if let Some(&idx) = self.index.get(&name) {
            warn!("{} '{}' is already registered, keeping the first one", self.kind, name);
            return &mut self.entries[idx].0;
        }
        let idx = self.entries.len();
        self.index.insert(name.clone(), idx);
        if let Some(alias) = &alias {
            self.index.entry(alias.clone()).or_insert(idx);
        }
        self.entries.push((
            DxFnInfo {
                name,
                alias,
                min_args: 0,
                description: String::new(),
            },
            func,
        ));
        &mut self.entries[idx].0
    }

    pub fn get(&self, name: &str) -> Option<DxFnRef<F>> {
        let idx = *self.index.get(name)?;
        let (info, func) = &self.entries[idx];
        Some(DxFnRef {
            name: info.name.clone(),
            min_args: info.min_args,
            func: *func,
        })
    }

    pub fn info(&self, name: &str) -> Option<&DxFnInfo> {
        self.index.get(name).map(|&idx| &self.entries[idx].0)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Metadata of every entry in registration order.
    pub fn infos(&self) -> impl Iterator<Item = &DxFnInfo> {
        self.entries.iter().map(|(info, _)| info)
    }
}

fn qualify(namespace: &str, name: &str) -> String {
    if namespace.is_empty() {
        name.to_string()
    } else {
        format!("{}::{}", namespace, name)
    }
}

fn qualify_alias(namespace: &str, alias: &str) -> Option<String> {
    if alias.is_empty() {
        None
    } else {
        Some(qualify(namespace, alias))
    }
}

pub struct DxRegistry {
    callbacks: DxFnTable<DxCallbackFn>,
    getters: DxFnTable<DxGetterFn>,
    modifiers: DxFnTable<DxModifierFn>,
    helpers: DxFnTable<DxHelperFn>,
    cond_ok: DxFnTable<DxCondOkFn>,
    accessors: HashMap<String, Arc<dyn DxAccessor>>,
}

impl Default for DxRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl DxRegistry {
    /// Registry holding only the built-in accessors.
    pub fn new() -> Self {
        let mut registry = DxRegistry {
            callbacks: DxFnTable::new("callback"),
            getters: DxFnTable::new("getter"),
            modifiers: DxFnTable::new("modifier"),
            helpers: DxFnTable::new("condition helper"),
            cond_ok: DxFnTable::new("condition-OK helper"),
            accessors: HashMap::new(),
        };
        registry.register_accessor(Arc::new(DxStaticAccessor));
        registry.register_accessor(Arc::new(DxDocumentAccessor));
        registry.register_accessor(Arc::new(DxJsonAccessor));
        registry
    }

    /// Registry preloaded with the built-in function library.
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        builtin::register_builtins(&mut registry);
        registry
    }

    pub fn register_callback(&mut self, name: &str, alias: &str, func: DxCallbackFn) -> &mut DxFnInfo {
        self.register_callback_ns("", name, alias, func)
    }

    pub fn register_callback_ns(
        &mut self,
        namespace: &str,
        name: &str,
        alias: &str,
        func: DxCallbackFn,
    ) -> &mut DxFnInfo {
        self.callbacks
            .register(qualify(namespace, name), qualify_alias(namespace, alias), func)
    }

    pub fn register_getter(&mut self, name: &str, alias: &str, func: DxGetterFn) -> &mut DxFnInfo {
        self.register_getter_ns("", name, alias, func)
    }

    pub fn register_getter_ns(&mut self, namespace: &str, name: &str, alias: &str, func: DxGetterFn) -> &mut DxFnInfo {
        self.getters
            .register(qualify(namespace, name), qualify_alias(namespace, alias), func)
    }

    pub fn register_modifier(&mut self, name: &str, alias: &str, func: DxModifierFn) -> &mut DxFnInfo {
        self.register_modifier_ns("", name, alias, func)
    }

    pub fn register_modifier_ns(
        &mut self,
        namespace: &str,
        name: &str,
        alias: &str,
        func: DxModifierFn,
    ) -> &mut DxFnInfo {
        self.modifiers
            .register(qualify(namespace, name), qualify_alias(namespace, alias), func)
    }

    pub fn register_condition_helper(&mut self, name: &str, alias: &str, func: DxHelperFn) -> &mut DxFnInfo {
        self.register_condition_helper_ns("", name, alias, func)
    }

    pub fn register_condition_helper_ns(
        &mut self,
        namespace: &str,
        name: &str,
        alias: &str,
        func: DxHelperFn,
    ) -> &mut DxFnInfo {
        self.helpers
            .register(qualify(namespace, name), qualify_alias(namespace, alias), func)
    }

    pub fn register_condition_ok_helper(&mut self, name: &str, func: DxCondOkFn) -> &mut DxFnInfo {
        self.register_condition_ok_helper_ns("", name, func)
    }

    pub fn register_condition_ok_helper_ns(&mut self, namespace: &str, name: &str, func: DxCondOkFn) -> &mut DxFnInfo {
        self.cond_ok.register(qualify(namespace, name), None, func)
    }

    /// Register an accessor under its own name.
    pub fn register_accessor(&mut self, accessor: Arc<dyn DxAccessor>) {
        let name = accessor.name().to_string();
        self.register_accessor_as(&name, accessor);
    }

    /// Register an accessor under an explicit type name.
    pub fn register_accessor_as(&mut self, name: &str, accessor: Arc<dyn DxAccessor>) {
        if self.accessors.contains_key(name) {
            warn!("accessor '{}' is already registered, keeping the first one", name);
            return;
        }
        self.accessors.insert(name.to_string(), accessor);
    }

    pub fn callback(&self, name: &str) -> Option<DxFnRef<DxCallbackFn>> {
        self.callbacks.get(name)
    }

    pub fn getter(&self, name: &str) -> Option<DxFnRef<DxGetterFn>> {
        self.getters.get(name)
    }

    pub fn modifier(&self, name: &str) -> Option<DxFnRef<DxModifierFn>> {
        self.modifiers.get(name)
    }

    pub fn condition_helper(&self, name: &str) -> Option<DxFnRef<DxHelperFn>> {
        self.helpers.get(name)
    }

    pub fn condition_ok_helper(&self, name: &str) -> Option<DxFnRef<DxCondOkFn>> {
        self.cond_ok.get(name)
    }

    /// Evaluate a condition helper by name, for hosts testing conditions
    /// outside a parsed rule body.
    pub fn call_condition_helper(&self, name: &str, ctx: &mut DxCtx, args: &[DxValue]) -> Result<bool> {
        let helper = self
            .helpers
            .get(name)
            .ok_or_else(|| DxError::HelperNotFound(name.to_string()))?;
        if args.len() < helper.min_args {
            return Err(DxError::poor_args(name, helper.min_args, args.len()));
        }
        (helper.func)(ctx, args)
    }

    pub fn accessor(&self, name: &str) -> Option<DxAccessorRef> {
        self.accessors.get(name).map(|accessor| DxAccessorRef {
            name: name.to_string(),
            accessor: Arc::clone(accessor),
        })
    }

    pub fn callbacks(&self) -> &DxFnTable<DxCallbackFn> {
        &self.callbacks
    }

    pub fn getters(&self) -> &DxFnTable<DxGetterFn> {
        &self.getters
    }

    pub fn modifiers(&self) -> &DxFnTable<DxModifierFn> {
        &self.modifiers
    }

    pub fn condition_helpers(&self) -> &DxFnTable<DxHelperFn> {
        &self.helpers
    }

    pub fn condition_ok_helpers(&self) -> &DxFnTable<DxCondOkFn> {
        &self.cond_ok
    }
}

impl fmt::Debug for DxRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut accessors: Vec<&String> = self.accessors.keys().collect();
        accessors.sort();
        f.debug_struct("DxRegistry")
            .field("callbacks", &self.callbacks.len())
            .field("getters", &self.getters.len())
            .field("modifiers", &self.modifiers.len())
            .field("condition_helpers", &self.helpers.len())
            .field("condition_ok_helpers", &self.cond_ok.len())
            .field("accessors", &accessors)
            .finish()
    }
}
