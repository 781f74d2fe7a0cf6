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

use common::{snapshot, test_ctx, test_registry};
use decodex::{decode_tree, DxCtx, DxError, DxParser, DxValue};
use proptest::prelude::*;

fn decode(src: &str, ctx: &mut DxCtx) -> decodex::Result<()> {
    let registry = test_registry();
    let tree = DxParser::new(&registry).parse(src)?;
    decode_tree(&tree, ctx)
}

fn branch(src: &str) -> Option<DxValue> {
    let (mut ctx, _) = test_ctx();
    decode(src, &mut ctx).unwrap();
    ctx.get("hit")
}

#[test]
fn test_comparison_against_document() {
    assert_eq!(branch("if jso.person.status == 67 {\nctx.hit = 1\n}"), Some(DxValue::Int(1)));
    assert_eq!(branch("if jso.person.status > 100 {\nctx.hit = 1\n}"), None);
    assert_eq!(branch("if jso.identifier == \"xf44e\" {\nctx.hit = 1\n}"), Some(DxValue::Int(1)));
    assert_eq!(branch("if jso.finance.allow_buy == true {\nctx.hit = 1\n}"), Some(DxValue::Int(1)));
}

#[test]
fn test_comparison_between_dynamic_operands() {
    assert_eq!(branch("if jso.person.status == ivar {\nctx.hit = 1\n}"), Some(DxValue::Int(1)));
    assert_eq!(branch("if fvar < jso.person.status {\nctx.hit = 1\n}"), Some(DxValue::Int(1)));
}

#[test]
fn test_comparison_against_host_field() {
    let (mut ctx, _) = test_ctx();
    decode("obj.Status = 67\nif obj.Status >= 60 {\nctx.hit = 1\n}", &mut ctx).unwrap();
    assert_eq!(ctx.get("hit"), Some(DxValue::Int(1)));
}

#[test]
fn test_else_and_else_if() {
    let src = "if s > 50 {\nctx.hit = \"high\"\n} else if s > 10 {\nctx.hit = \"mid\"\n} else {\nctx.hit = \"low\"\n}";
    for (status, expect) in [(67i64, "high"), (20, "mid"), (3, "low")] {
        let (mut ctx, _) = test_ctx();
        ctx.set_static("s", status);
        decode(src, &mut ctx).unwrap();
        assert_eq!(ctx.get("hit"), Some(DxValue::from(expect)));
    }
}

#[test]
fn test_truthiness_and_negation() {
    assert_eq!(branch("if bvar {\nctx.hit = 1\n}"), Some(DxValue::Int(1)));
    assert_eq!(branch("if !bvar {\nctx.hit = 1\n}"), None);
    assert_eq!(branch("if jso.person.missing {\nctx.hit = 1\n}"), None);
    assert_eq!(branch("if !jso.person.missing {\nctx.hit = 1\n}"), Some(DxValue::Int(1)));
}

#[test]
fn test_condition_helpers() {
    assert_eq!(branch("if notEmpty(jso.person.full_name) {\nctx.hit = 1\n}"), Some(DxValue::Int(1)));
    assert_eq!(branch("if empty(jso.person.nickname) {\nctx.hit = 1\n}"), Some(DxValue::Int(1)));
    assert_eq!(branch("if !empty(jso.person.nickname) {\nctx.hit = 1\n}"), None);
}

#[test]
fn test_len_and_cap() {
    assert_eq!(branch("if len(jso.person.tags) == 2 {\nctx.hit = 1\n}"), Some(DxValue::Int(1)));
    assert_eq!(branch("if cap(jso.person.tags) > 5 {\nctx.hit = 1\n}"), None);
}

#[test]
fn test_len_on_right_of_operator() {
    assert_eq!(branch("if 0 < len(jso.person.tags) {\nctx.hit = 1\n}"), Some(DxValue::Int(1)));
    assert_eq!(branch("if 2 >= len(jso.person.tags) {\nctx.hit = 1\n}"), Some(DxValue::Int(1)));
    assert_eq!(branch("if 2 < cap(jso.person.tags) {\nctx.hit = 1\n}"), None);
    assert_eq!(branch("if ivar > len(jso.person.tags) {\nctx.hit = 1\n}"), Some(DxValue::Int(1)));
}

#[test]
fn test_condition_ok_binding() {
    let (mut ctx, obj) = test_ctx();
    decode(
        "if v, ok := tryInt(jso.person.status); ok {\nobj.Status = v\n}\nif _, ok := tryInt(jso.identifier); !ok {\nctx.hit = \"not a number\"\n}",
        &mut ctx,
    )
    .unwrap();
    assert_eq!(snapshot(&obj).status, 67);
    assert_eq!(ctx.get("hit"), Some(DxValue::from("not a number")));
    assert_eq!(ctx.get("ok"), Some(DxValue::Bool(false)));
}

#[test]
fn test_condition_ok_with_comparison() {
    assert_eq!(
        branch("if v, ok := tryInt(jso.person.status); ok && v > 60 {\nctx.hit = v\n}"),
        Some(DxValue::Int(67))
    );
    assert_eq!(branch("if v, ok := tryInt(jso.person.status); v < 60 {\nctx.hit = v\n}"), None);
    assert_eq!(
        branch("if v, ok := tryFloat(jso.finance.balance); ok {\nctx.hit = 1\n} else {\nctx.hit = 2\n}"),
        Some(DxValue::Int(1))
    );
}

#[test]
fn test_switch_with_subject() {
    let src = "switch jso.person.status {\ncase 1, 2:\nctx.hit = \"low\"\ncase 67:\nctx.hit = \"exact\"\ndefault:\nctx.hit = \"none\"\n}";
    assert_eq!(branch(src), Some(DxValue::from("exact")));
    let src = "switch jso.identifier {\ncase \"a\":\nctx.hit = 1\ndefault:\nctx.hit = 2\n}";
    assert_eq!(branch(src), Some(DxValue::Int(2)));
}

#[test]
fn test_switch_without_subject() {
    let src = "switch {\ncase jso.person.status < 10:\nctx.hit = \"small\"\ncase jso.person.status < 100:\nctx.hit = \"medium\"\n}";
    assert_eq!(branch(src), Some(DxValue::from("medium")));
}

#[test]
fn test_senseless_static_comparison() {
    let (mut ctx, _) = test_ctx();
    assert!(matches!(
        decode("if 1 < 2 {\nctx.hit = 1\n}", &mut ctx),
        Err(DxError::SenselessComparison { .. })
    ));
}

proptest! {
    #[test]
    fn test_operand_swap_equivalence(value in -1000i64..1000, literal in -1000i64..1000, op in 0usize..6) {
        let ops = ["==", "!=", ">", ">=", "<", "<="];
        let mirrored = ["==", "!=", "<", "<=", ">", ">="];
        let mut ctx = DxCtx::new();
        ctx.set_static("x", value);
        let src = format!(
            "if {lit} {op} x {{\nctx.a = true\n}}\nif x {mop} {lit} {{\nctx.b = true\n}}",
            lit = literal,
            op = ops[op],
            mop = mirrored[op],
        );
        decode(&src, &mut ctx).unwrap();
        prop_assert_eq!(ctx.get("a"), ctx.get("b"));
    }
}
