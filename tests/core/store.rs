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

#[path = "../common/mod.rs"]
mod common;

use std::sync::Arc;
use std::thread;

use common::{snapshot, test_registry, TestObject, TestObjectAccessor, PERSON_JSON};
use decodex::{
    DxCtxPool, DxEngine, DxEngineConfig, DxError, DxHost, DxLockPolicy, DxParser, DxStore, DxValue,
};

fn engine() -> DxEngine {
    DxEngine::with_registry(test_registry(), DxEngineConfig::default())
}

#[test]
fn test_id_and_key_resolve_same_tree() {
    let engine = engine();
    engine
        .register_source(Some(42), Some("person"), "obj.Id = jso.identifier")
        .unwrap();
    let by_id = engine.store().get_by_id(42).unwrap();
    let by_key = engine.store().get_by_key("person").unwrap();
    assert!(Arc::ptr_eq(&by_id.tree, &by_key.tree));

    let obj = DxHost::new(TestObject::default());
    let mut ctx = engine.acquire_ctx();
    ctx.set("obj", obj.clone(), Arc::new(TestObjectAccessor));
    ctx.set_json("jso", PERSON_JSON).unwrap();
    engine.decode_by_id(42, &mut ctx).unwrap();
    assert_eq!(snapshot(&obj).id, "xf44e");
}

#[test]
fn test_reregistering_key_replaces_tree() {
    let engine = engine();
    engine.register_source(None, Some("k"), "ctx.v = 1").unwrap();
    engine.register_source(None, Some("k"), "ctx.v = 2").unwrap();
    assert_eq!(engine.store().len(), 1);

    let mut ctx = engine.acquire_ctx();
    engine.decode("k", &mut ctx).unwrap();
    assert_eq!(ctx.get("v"), Some(DxValue::Int(2)));
}

#[test]
fn test_identical_sources_share_one_tree() {
    let engine = engine();
    let src = "obj.Id = jso.identifier\nobj.Status = jso.person.status";
    engine.register_source(Some(1), Some("a"), src).unwrap();
    engine.register_source(Some(2), Some("b"), src).unwrap();
    let a = engine.store().get_by_key("a").unwrap();
    let b = engine.store().get_by_key("b").unwrap();
    assert!(Arc::ptr_eq(&a.tree, &b.tree));
    assert!(engine.store().get_by_hash(a.tree.hash()).is_some());
    assert_eq!(a.tree.hash_hex().len(), 16);
}

#[test]
fn test_decode_fallback_and_keys() {
    let engine = engine();
    engine.register_source(None, Some("default"), "ctx.v = \"default\"").unwrap();
    engine.register_source(None, Some("tenant"), "ctx.v = \"tenant\"").unwrap();

    let mut ctx = engine.acquire_ctx();
    engine.decode_fallback("tenant", "default", &mut ctx).unwrap();
    assert_eq!(ctx.get("v"), Some(DxValue::from("tenant")));
    engine.decode_fallback("other", "default", &mut ctx).unwrap();
    assert_eq!(ctx.get("v"), Some(DxValue::from("default")));
    engine.decode_by_keys(&["x", "y", "tenant"], &mut ctx).unwrap();
    assert_eq!(ctx.get("v"), Some(DxValue::from("tenant")));
    assert!(matches!(
        engine.decode_fallback("x", "y", &mut ctx),
        Err(DxError::DecoderNotFound(_))
    ));
}

#[test]
fn test_engine_dump() {
    let engine = engine();
    engine.register_source(None, Some("k"), "obj.Id = jso.identifier").unwrap();
    let dump = engine.dump("k").unwrap();
    assert!(dump.starts_with("<?xml"));
    assert!(dump.contains("dst=\"obj.Id\""));
}

#[test]
fn test_lock_free_reads_across_threads() {
    let registry = test_registry();
    let store = Arc::new(DxStore::new());
    let parser = DxParser::new(&registry);
    for (id, key) in [(1u64, "one"), (2, "two"), (3, "three")] {
        store.register(Some(id), Some(key), parser.parse(&format!("ctx.v = {}", id)).unwrap());
    }
    store.set_lock_policy(DxLockPolicy::LockFree);

    let handles: Vec<_> = (0..4)
        .map(|_| {
            let store = Arc::clone(&store);
            thread::spawn(move || {
                for _ in 0..100 {
                    assert!(store.get_by_key("two").is_some());
                    assert!(store.get_by_id(3).is_some());
                    assert!(store.get_by_key("four").is_none());
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    store.set_lock_policy(DxLockPolicy::Locked);
    store.register(Some(4), Some("four"), parser.parse("ctx.v = 4").unwrap());
    store.set_lock_policy(DxLockPolicy::LockFree);
    assert!(store.get_by_key("four").is_some());
}

#[test]
fn test_pool_resets_context_after_failure() {
    let engine = engine();
    engine.register_source(None, Some("bad"), "ctx.v = 1\njso.x = 2").unwrap();
    {
        let mut ctx = engine.acquire_ctx();
        ctx.set_json("jso", PERSON_JSON).unwrap();
        assert!(engine.decode("bad", &mut ctx).is_err());
    }
    let ctx = engine.acquire_ctx();
    assert!(ctx.is_empty());
    assert_eq!(ctx.break_depth(), 0);
}

#[test]
fn test_pool_reuses_contexts() {
    let pool = DxCtxPool::new(4);
    {
        let _a = pool.acquire();
        let _b = pool.acquire();
    }
    assert_eq!(pool.idle(), 2);
}

#[test]
fn test_config_from_json() {
    let config = DxEngineConfig::from_json(r#"{"lock_policy": "lockfree", "pool_capacity": 2}"#).unwrap();
    assert_eq!(config.lock_policy, DxLockPolicy::LockFree);
    assert_eq!(config.pool_capacity, 2);
    assert!(config.cache_trees);
    assert_eq!("lockfree".parse::<DxLockPolicy>().unwrap(), DxLockPolicy::LockFree);
    assert!(matches!("spin".parse::<DxLockPolicy>(), Err(DxError::UnknownPolicy(_))));
}
