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

//! Shared fixtures: a host destination object with its field accessor and
//! the sample documents used across the integration tests.

#![allow(dead_code)]

use std::sync::Arc;

use decodex::accessor::range_node;
use decodex::{
    DxAccessor, DxCtx, DxDocNode, DxError, DxHost, DxLooper, DxRegistry, DxValue, Result,
};
use serde_json::json;

pub const PERSON_JSON: &[u8] = br#"{
    "identifier": "xf44e",
    "person": {
        "full_name": "Marquis Warren",
        "status": 67,
        "tags": ["vip", "early"]
    },
    "finance": {
        "balance": 9000.015,
        "allow_buy": true,
        "history": [
            {"date": 1599137650, "cost": 14.345241, "comment": "pay for delivery"},
            {"date": 1599137707, "cost": -3.0, "comment": "refund"}
        ]
    }
}"#;

#[derive(Clone, Debug, Default, PartialEq)]
pub struct TestHistory {
    pub date: i64,
    pub cost: f64,
    pub comment: String,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct TestFinance {
    pub balance: f64,
    pub allow_buy: bool,
    pub history: Vec<TestHistory>,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct TestObject {
    pub id: String,
    pub name: String,
    pub status: i64,
    pub cost: f64,
    pub flags: Vec<String>,
    pub finance: TestFinance,
}

/// Field accessor for [`TestObject`] destinations, registered as `testobj`.
pub struct TestObjectAccessor;

fn field_error(path: &[String]) -> DxError {
    DxError::accessor("testobj", format!("unknown field '{}'", path.join(".")))
}

impl TestObjectAccessor {
    fn history_node(item: &TestHistory) -> DxValue {
        DxValue::Node(DxDocNode::from_value(json!({
            "date": item.date,
            "cost": item.cost,
            "comment": item.comment,
        })))
    }
}

impl DxAccessor for TestObjectAccessor {
    fn name(&self) -> &str {
        "testobj"
    }

    fn get(&self, target: &DxValue, path: &[String]) -> Result<Option<DxValue>> {
        let DxValue::Host(host) = target else {
            return Ok(None);
        };
        if path.is_empty() {
            return Ok(Some(target.clone()));
        }
        host.with::<TestObject, _>(|obj| {
            let fields: Vec<&str> = path.iter().map(String::as_str).collect();
            match fields.as_slice() {
                ["Id"] => Some(DxValue::from(obj.id.as_str())),
                ["Name"] => Some(DxValue::from(obj.name.as_str())),
                ["Status"] => Some(DxValue::Int(obj.status)),
                ["Cost"] => Some(DxValue::Float(obj.cost)),
                ["Flags"] => Some(DxValue::Node(DxDocNode::from_value(json!(obj.flags)))),
                ["Finance", "Balance"] => Some(DxValue::Float(obj.finance.balance)),
                ["Finance", "AllowBuy"] => Some(DxValue::Bool(obj.finance.allow_buy)),
                ["Finance", "History", idx] => idx
                    .parse::<usize>()
                    .ok()
                    .and_then(|i| obj.finance.history.get(i))
                    .map(Self::history_node),
                _ => None,
            }
        })
    }

    fn set(&self, target: &DxValue, path: &[String], value: &DxValue) -> Result<()> {
        let DxValue::Host(host) = target else {
            return Err(DxError::accessor("testobj", "target is not a host object"));
        };
        host.with_mut::<TestObject, _>(|obj| {
            let fields: Vec<&str> = path.iter().map(String::as_str).collect();
            match fields.as_slice() {
                ["Id"] => obj.id = value.as_str().unwrap_or_default().into_owned(),
                ["Name"] => obj.name = value.as_str().unwrap_or_default().into_owned(),
                ["Status"] => obj.status = value.as_i64().unwrap_or_default(),
                ["Cost"] => obj.cost = value.as_f64().unwrap_or_default(),
                ["Flags"] => obj.flags.push(value.as_str().unwrap_or_default().into_owned()),
                ["Finance", "Balance"] => obj.finance.balance = value.as_f64().unwrap_or_default(),
                ["Finance", "AllowBuy"] => obj.finance.allow_buy = value.as_bool().unwrap_or_default(),
                _ => return Err(field_error(path)),
            }
            Ok(())
        })?
    }

    fn range(&self, target: &DxValue, path: &[String], looper: &mut dyn DxLooper) -> Result<()> {
        let DxValue::Host(host) = target else {
            return Ok(());
        };
        let fields: Vec<&str> = path.iter().map(String::as_str).collect();
        if fields.as_slice() != ["Finance", "History"] {
            if let Some(DxValue::Node(node)) = self.get(target, path)? {
                range_node(&node, looper);
            }
            return Ok(());
        }
        let history = host.with::<TestObject, _>(|obj| obj.finance.history.clone())?;
        for (idx, item) in history.iter().enumerate() {
            if looper.require_key() {
                looper.set_key(DxValue::Int(idx as i64));
            }
            looper.set_value(Self::history_node(item));
            if looper.iterate() == decodex::DxLoopCtl::Brk {
                break;
            }
        }
        Ok(())
    }
}

/// `appendTestHistory(obj, cost, comment)` pushes a history entry.
fn cb_append_history(_: &mut DxCtx, args: &[DxValue]) -> Result<()> {
    let DxValue::Host(host) = &args[0] else {
        return Err(DxError::internal("appendTestHistory expects a host object"));
    };
    let cost = args[1].as_f64().unwrap_or_default();
    let comment = args[2].as_str().unwrap_or_default().into_owned();
    host.with_mut::<TestObject, _>(|obj| {
        obj.finance.history.push(TestHistory {
            date: 0,
            cost,
            comment,
        })
    })
}

/// Built-in registry plus the test accessor and callback.
pub fn test_registry() -> DxRegistry {
    let mut registry = DxRegistry::with_builtins();
    registry.register_accessor(Arc::new(TestObjectAccessor));
    registry
        .register_callback("appendTestHistory", "", cb_append_history)
        .with_min_args(3);
    registry
}

/// Context with `obj` bound to a fresh test object and `jso` to [`PERSON_JSON`].
pub fn test_ctx() -> (DxCtx, DxHost) {
    let mut ctx = DxCtx::new();
    let obj = DxHost::new(TestObject::default());
    ctx.set("obj", obj.clone(), Arc::new(TestObjectAccessor));
    ctx.set_json("jso", PERSON_JSON).expect("sample document parses");
    ctx.set_static("ivar", 67i64);
    ctx.set_static("fvar", 3.1415f64);
    ctx.set_static("bvar", true);
    (ctx, obj)
}

pub fn snapshot(obj: &DxHost) -> TestObject {
    obj.with::<TestObject, _>(Clone::clone).expect("host holds a test object")
}
