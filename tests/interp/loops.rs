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

fn decode(src: &str, ctx: &mut DxCtx) -> decodex::Result<()> {
    let registry = test_registry();
    let tree = DxParser::new(&registry).parse(src)?;
    decode_tree(&tree, ctx)
}

fn last_counter(header: &str) -> Option<i64> {
    let (mut ctx, _) = test_ctx();
    decode(&format!("for {} {{\nctx.last = i\n}}", header), &mut ctx).unwrap();
    ctx.get("last").and_then(|v| v.as_i64())
}

#[test]
fn test_counter_loop_final_status() {
    let (mut ctx, obj) = test_ctx();
    decode("for i:=0; i<3; i++ { obj.Status = i }", &mut ctx).unwrap();
    assert_eq!(snapshot(&obj).status, 2);
}

#[test]
fn test_counter_loop_operators() {
    assert_eq!(last_counter("i := 0; i < 3; i++"), Some(2));
    assert_eq!(last_counter("i := 0; i <= 3; i++"), Some(3));
    assert_eq!(last_counter("i := 3; i > 0; i--"), Some(1));
    assert_eq!(last_counter("i := 3; i >= 0; i--"), Some(0));
    assert_eq!(last_counter("i := 0; i != 4; i++"), Some(3));
    assert_eq!(last_counter("i := 5; i == 5; i++"), Some(5));
    assert_eq!(last_counter("i := 5; i < 5; i++"), None);
}

#[test]
fn test_unsupported_operator_is_decode_error() {
    let (mut ctx, _) = test_ctx();
    assert!(matches!(
        decode("for i := 0; i <> 3; i++ {\n}", &mut ctx),
        Err(DxError::LoopCondition(ref op)) if op == "<>"
    ));
    assert!(matches!(
        decode("for i := 0; i < 3; i+= {\n}", &mut ctx),
        Err(DxError::LoopIncrement(ref op)) if op == "+="
    ));
}

#[test]
fn test_break_exits_before_rest_of_iteration() {
    let (mut ctx, _) = test_ctx();
    decode(
        "for i := 0; i < 5; i++ {\nctx.seen = i\nbreak\nctx.after = i\n}",
        &mut ctx,
    )
    .unwrap();
    assert_eq!(ctx.get("seen"), Some(DxValue::Int(0)));
    assert!(ctx.get("after").is_none());
}

#[test]
fn test_lazybreak_finishes_iteration() {
    let (mut ctx, _) = test_ctx();
    decode(
        "for i := 0; i < 5; i++ {\nctx.seen = i\nlazybreak\nctx.after = i\n}",
        &mut ctx,
    )
    .unwrap();
    assert_eq!(ctx.get("seen"), Some(DxValue::Int(0)));
    assert_eq!(ctx.get("after"), Some(DxValue::Int(0)));
}

#[test]
fn test_lazybreak_inside_condition() {
    let (mut ctx, _) = test_ctx();
    decode(
        "for i := 0; i < 5; i++ {\nif i == 1 {\nlazybreak\n}\nctx.last = i\n}",
        &mut ctx,
    )
    .unwrap();
    assert_eq!(ctx.get("last"), Some(DxValue::Int(1)));
}

#[test]
fn test_continue_skips_rest_of_iteration() {
    let (mut ctx, _) = test_ctx();
    decode(
        "for i := 0; i < 4; i++ {\nctx.last = i\nif i >= 2 {\ncontinue\n}\nctx.kept = i\n}",
        &mut ctx,
    )
    .unwrap();
    assert_eq!(ctx.get("last"), Some(DxValue::Int(3)));
    assert_eq!(ctx.get("kept"), Some(DxValue::Int(1)));
}

#[test]
fn test_break_n_exits_n_levels() {
    let (mut ctx, _) = test_ctx();
    decode(
        "for i := 0; i < 3; i++ {\n\
            ctx.outer = i\n\
            for j := 0; j < 3; j++ {\n\
                for k := 0; k < 3; k++ {\n\
                    ctx.inner = k\n\
                    break 2\n\
                }\n\
                ctx.middle_after = j\n\
            }\n\
            ctx.outer_after = i\n\
        }",
        &mut ctx,
    )
    .unwrap();
    assert_eq!(ctx.get("outer"), Some(DxValue::Int(2)));
    assert_eq!(ctx.get("outer_after"), Some(DxValue::Int(2)));
    assert_eq!(ctx.get("inner"), Some(DxValue::Int(0)));
    assert!(ctx.get("middle_after").is_none());
    assert_eq!(ctx.break_depth(), 0);
}

#[test]
fn test_break_n_across_range_and_counter() {
    let (mut ctx, _) = test_ctx();
    decode(
        "for _, tag := range jso.person.tags {\nfor i := 0; i < 3; i++ {\nctx.tag = tag\nbreak 2\n}\nctx.after = 1\n}\nctx.done = 1",
        &mut ctx,
    )
    .unwrap();
    assert_eq!(ctx.get("tag").unwrap().as_str().unwrap(), "vip");
    assert!(ctx.get("after").is_none());
    assert_eq!(ctx.get("done"), Some(DxValue::Int(1)));
}

#[test]
fn test_lazybreak_n_finishes_enclosing_bodies() {
    let (mut ctx, _) = test_ctx();
    decode(
        "for _, tag := range jso.person.tags {\n\
            ctx.tag = tag\n\
            for i := 0; i < 3; i++ {\n\
                ctx.inner = i\n\
                lazybreak 2\n\
                ctx.inner_after = i\n\
            }\n\
            ctx.outer_after = tag\n\
        }\n\
        ctx.done = 1",
        &mut ctx,
    )
    .unwrap();
    assert_eq!(ctx.get("tag").unwrap().as_str().unwrap(), "vip");
    assert_eq!(ctx.get("inner"), Some(DxValue::Int(0)));
    assert_eq!(ctx.get("inner_after"), Some(DxValue::Int(0)));
    assert_eq!(ctx.get("outer_after").unwrap().as_str().unwrap(), "vip");
    assert_eq!(ctx.get("done"), Some(DxValue::Int(1)));
    assert_eq!(ctx.break_depth(), 0);
}

#[test]
fn test_lazybreak_n_from_range_inside_counter() {
    let (mut ctx, _) = test_ctx();
    decode(
        "for i := 0; i < 3; i++ {\n\
            ctx.outer = i\n\
            for _, tag := range jso.person.tags {\n\
                ctx.tag = tag\n\
                lazybreak 2\n\
                ctx.tag_after = tag\n\
            }\n\
            ctx.outer_after = i\n\
        }",
        &mut ctx,
    )
    .unwrap();
    assert_eq!(ctx.get("outer"), Some(DxValue::Int(0)));
    assert_eq!(ctx.get("tag").unwrap().as_str().unwrap(), "vip");
    assert_eq!(ctx.get("tag_after").unwrap().as_str().unwrap(), "vip");
    assert_eq!(ctx.get("outer_after"), Some(DxValue::Int(0)));
    assert_eq!(ctx.break_depth(), 0);
}

#[test]
fn test_range_over_document_array() {
    let (mut ctx, obj) = test_ctx();
    decode(
        "for i, h := range jso.finance.history {\nobj.Status = i\nobj.Flags = h.comment\n}",
        &mut ctx,
    )
    .unwrap();
    let obj = snapshot(&obj);
    assert_eq!(obj.status, 1);
    assert_eq!(obj.flags, vec!["pay for delivery".to_string(), "refund".to_string()]);
}

#[test]
fn test_range_over_host_collection() {
    let (mut ctx, obj) = test_ctx();
    decode(
        "appendTestHistory(obj, 1.5, \"a\")\nappendTestHistory(obj, 2.5, \"b\")\nfor _, h := range obj.Finance.History {\nobj.Cost = h.cost\nobj.Flags = h.comment\n}",
        &mut ctx,
    )
    .unwrap();
    let obj = snapshot(&obj);
    assert_eq!(obj.cost, 2.5);
    assert_eq!(obj.flags, vec!["a".to_string(), "b".to_string()]);
}

#[test]
fn test_range_over_object_keys() {
    let (mut ctx, _) = test_ctx();
    decode("for k := range jso.person {\nctx.last = k\n}", &mut ctx).unwrap();
    assert_eq!(ctx.get("last"), Some(DxValue::from("tags")));
}

#[test]
fn test_loop_scratch_state_is_released() {
    let (mut ctx, _) = test_ctx();
    decode(
        "for _, t := range jso.person.tags {\nfor i := 0; i < 2; i++ {\nctx.x = i\n}\n}",
        &mut ctx,
    )
    .unwrap();
    assert_eq!(ctx.break_depth(), 0);
    assert!(ctx.take_error().is_none());
}
