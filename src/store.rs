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

//! # Decoder Store Module
//!
//! Parsed trees registered under a numeric id and/or a string key, plus an
//! index by source checksum so byte-identical rule bodies share one tree.
//!
//! ## Lock policies
//!
//! Under [`DxLockPolicy::Locked`] (the default) every read takes the read
//! side of an `RwLock`. Under [`DxLockPolicy::LockFree`] each thread keeps its
//! own snapshot of the indexes and revalidates it against an atomic
//! generation counter, so steady-state reads take no lock at all.
//!
//! Switching to `LockFree` is the caller's call. Registering while other
//! threads decode under `LockFree` is not memory-unsafe here, but readers
//! may keep serving the previous generation until their next lookup. The
//! intended flow is: register under `Locked`, switch to `LockFree`, switch
//! back before the next batch of registrations.

use std::cell::RefCell;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, RwLock, Weak};

use log::{debug, warn};

use crate::config::DxLockPolicy;
use crate::tree::DxTree;

/// A registered rule body.
#[derive(Clone, Debug)]
pub struct DxDecoder {
    pub id: Option<u64>,
    pub key: Option<String>,
    pub tree: Arc<DxTree>,
}

#[derive(Clone, Debug, Default)]
struct DxIndex {
    decoders: Vec<Arc<DxDecoder>>,
    by_id: HashMap<u64, usize>,
    by_key: HashMap<String, usize>,
    by_hash: HashMap<u64, Arc<DxTree>>,
}

impl DxIndex {
    /// Slot of the first decoder matching the key, then the id.
    fn slot(&self, id: Option<u64>, key: Option<&str>) -> Option<usize> {
        key.and_then(|key| self.by_key.get(key))
            .or_else(|| id.and_then(|id| self.by_id.get(&id)))
            .copied()
    }

    fn get(&self, id: Option<u64>, key: Option<&str>) -> Option<Arc<DxDecoder>> {
        self.slot(id, key).and_then(|idx| self.decoders.get(idx)).cloned()
    }
}

thread_local! {
    // Weak, so a dropped store frees its index whichever thread last read it.
    static SNAPSHOTS: RefCell<HashMap<u64, (u64, Weak<DxIndex>)>> = RefCell::new(HashMap::new());
}

static STORE_IDS: AtomicU64 = AtomicU64::new(0);

pub struct DxStore {
    uid: u64,
    index: RwLock<Arc<DxIndex>>,
    generation: AtomicU64,
    lock_free: AtomicBool,
}

impl Default for DxStore {
    fn default() -> Self {
        Self::new()
    }
}

impl DxStore {
    pub fn new() -> Self {
        DxStore {
            uid: STORE_IDS.fetch_add(1, Ordering::Relaxed),
            index: RwLock::new(Arc::new(DxIndex::default())),
            generation: AtomicU64::new(0),
            lock_free: AtomicBool::new(false),
        }
    }

    pub fn with_policy(policy: DxLockPolicy) -> Self {
        let store = Self::new();
        store.set_lock_policy(policy);
        store
    }

    /// Register `tree` under `id` and/or `key`. A decoder already registered
    /// under the same key (or id) is replaced in place.
    pub fn register(&self, id: Option<u64>, key: Option<&str>, tree: Arc<DxTree>) {
        let decoder = Arc::new(DxDecoder {
            id,
            key: key.map(str::to_string),
            tree: Arc::clone(&tree),
        });
        let mut guard = match self.index.write() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        let index = Arc::make_mut(&mut *guard);
        let idx = match index.slot(id, key) {
            Some(idx) => {
                warn!("replacing decoder id={:?} key={:?}", id, key);
                index.decoders[idx] = decoder;
                idx
            }
            None => {
                index.decoders.push(decoder);
                index.decoders.len() - 1
            }
        };
        if let Some(id) = id {
            index.by_id.insert(id, idx);
        }
        if let Some(key) = key {
            index.by_key.insert(key.to_string(), idx);
        }
        index.by_hash.entry(tree.hash()).or_insert(tree);
        self.generation.fetch_add(1, Ordering::Release);
        debug!("registered decoder id={:?} key={:?} ({} total)", id, key, index.decoders.len());
    }

    /// Decoder found by key first, then by id.
    pub fn get(&self, id: Option<u64>, key: Option<&str>) -> Option<Arc<DxDecoder>> {
        self.read(|index| index.get(id, key))
    }

    pub fn get_by_id(&self, id: u64) -> Option<Arc<DxDecoder>> {
        self.get(Some(id), None)
    }

    pub fn get_by_key(&self, key: &str) -> Option<Arc<DxDecoder>> {
        self.get(None, Some(key))
    }

    /// First decoder registered under any of `keys`, in order.
    pub fn get_by_keys<S: AsRef<str>>(&self, keys: &[S]) -> Option<Arc<DxDecoder>> {
        self.read(|index| keys.iter().find_map(|key| index.get(None, Some(key.as_ref()))))
    }

    pub fn get_by_hash(&self, hash: u64) -> Option<Arc<DxTree>> {
        self.read(|index| index.by_hash.get(&hash).cloned())
    }

    pub fn len(&self) -> usize {
        self.read(|index| index.decoders.len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn set_lock_policy(&self, policy: DxLockPolicy) {
        self.lock_free
            .store(policy == DxLockPolicy::LockFree, Ordering::Release);
        debug!("decoder store lock policy set to {}", policy);
    }

    pub fn lock_policy(&self) -> DxLockPolicy {
        if self.lock_free.load(Ordering::Acquire) {
            DxLockPolicy::LockFree
        } else {
            DxLockPolicy::Locked
        }
    }

    fn read<R>(&self, f: impl FnOnce(&DxIndex) -> R) -> R {
        if !self.lock_free.load(Ordering::Acquire) {
            let guard = match self.index.read() {
                Ok(guard) => guard,
                Err(poisoned) => poisoned.into_inner(),
            };
            return f(&guard);
        }
        let snapshot = SNAPSHOTS.with(|cell| {
            let generation = self.generation.load(Ordering::Acquire);
            let mut snapshots = cell.borrow_mut();
            let cached = snapshots
                .get(&self.uid)
                .filter(|(seen, _)| *seen == generation)
                .and_then(|(_, index)| index.upgrade());
            if let Some(index) = cached {
                return index;
            }
            snapshots.retain(|_, (_, index)| index.strong_count() > 0);
            let index = self.snapshot();
            snapshots.insert(self.uid, (generation, Arc::downgrade(&index)));
            index
        });
        f(&snapshot)
    }

    fn snapshot(&self) -> Arc<DxIndex> {
        match self.index.read() {
            Ok(guard) => Arc::clone(&guard),
            Err(poisoned) => Arc::clone(&poisoned.into_inner()),
        }
    }
}

impl Drop for DxStore {
    fn drop(&mut self) {
        let _ = SNAPSHOTS.try_with(|cell| {
            if let Ok(mut snapshots) = cell.try_borrow_mut() {
                snapshots.remove(&self.uid);
            }
        });
    }
}

impl std::fmt::Debug for DxStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DxStore")
            .field("decoders", &self.len())
            .field("lock_policy", &self.lock_policy())
            .finish()
    }
}
