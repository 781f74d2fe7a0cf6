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
use decodex::{decode_tree, DxCtx, DxError, DxParser, DxRegistry, DxValue};

fn decode(src: &str, ctx: &mut DxCtx) -> decodex::Result<()> {
    let registry = test_registry();
    let tree = DxParser::new(&registry).parse(src)?;
    decode_tree(&tree, ctx)
}

fn eval(rhs: &str) -> Option<DxValue> {
    let (mut ctx, _) = test_ctx();
    decode(&format!("ctx.out = {}", rhs), &mut ctx).unwrap();
    ctx.get("out")
}

#[test]
fn test_builtin_tables_are_populated() {
    let registry = DxRegistry::with_builtins();
    for name in ["default", "def", "ifThen", "ifel", "fmt", "replace", "date", "trim", "lower", "upper"] {
        assert!(registry.modifier(name).is_some(), "modifier {}", name);
    }
    for name in ["crc32", "atoi", "atou", "atof", "atob", "itoa", "utoa", "len"] {
        assert!(registry.getter(name).is_some(), "getter {}", name);
    }
    for name in ["jsonParse", "yamlParseAs", "urlParse"] {
        assert!(registry.callback(name).is_some(), "callback {}", name);
    }
    assert!(registry.condition_helper("notEmpty").is_some());
    assert!(registry.condition_ok_helper("tryFloat").is_some());
    assert!(!registry.modifiers().info("default").unwrap().description.is_empty());
}

#[test]
fn test_default_and_conditional_modifiers() {
    assert_eq!(eval("jso.person.nickname|def(\"none\")"), Some(DxValue::from("none")));
    assert_eq!(eval("jso.finance.allow_buy|ifel(\"yes\", \"no\")"), Some(DxValue::from("yes")));
    assert_eq!(eval("jso.person.missing|ifThen(\"yes\")"), None);
    assert_eq!(eval("jso.person.missing|ifThenElse(\"yes\", \"no\")"), Some(DxValue::from("no")));
}

#[test]
fn test_format_modifier() {
    assert_eq!(
        eval("fmt(\"%s: %d (%.1f)\", jso.person.full_name, jso.person.status, fvar)"),
        Some(DxValue::from("Marquis Warren: 67 (3.1)"))
    );
}

#[test]
fn test_text_modifiers_chain() {
    assert_eq!(
        eval("jso.person.full_name|replace(\" +\", \"_\")|lower()"),
        Some(DxValue::from("marquis_warren"))
    );
    assert_eq!(eval("\"  padded \"|trim()|upper()"), Some(DxValue::from("PADDED")));
}

#[test]
fn test_date_modifier() {
    assert_eq!(
        eval("jso.finance.history[0].date|date(\"%Y-%m-%d\")"),
        Some(DxValue::from("2020-09-03"))
    );
    assert_eq!(
        eval("\"2021-02-03T04:05:06Z\"|date(\"%H:%M\")"),
        Some(DxValue::from("04:05"))
    );
}

#[test]
fn test_conversion_getters() {
    assert_eq!(eval("atoi(\"-12\")"), Some(DxValue::Int(-12)));
    assert_eq!(eval("atou(\"12\")"), Some(DxValue::Uint(12)));
    assert_eq!(eval("atof(\"1.5\")"), Some(DxValue::Float(1.5)));
    assert_eq!(eval("atob(\"true\")"), Some(DxValue::Bool(true)));
    assert_eq!(eval("itoa(ivar)"), Some(DxValue::from("67")));
    assert_eq!(eval("len(jso.person.tags)"), Some(DxValue::Int(2)));
    assert_eq!(eval("crc32(\"hello\")"), Some(DxValue::Int(907060870)));
}

#[test]
fn test_conversion_error_stops_decode() {
    let (mut ctx, _) = test_ctx();
    assert!(matches!(decode("ctx.out = atoi(\"x1\")", &mut ctx), Err(DxError::Internal(_))));
}

#[test]
fn test_parse_callbacks() {
    let (mut ctx, obj) = test_ctx();
    ctx.set_static("yaml", "person:\n  name: Daisy\n  age: 41\n");
    ctx.set_static("query", "id=q1&tag=a&tag=b");
    decode(
        "yamlParse(yaml, \"y\")\nurlParse(query, \"q\")\nobj.Name = y.person.name\nobj.Status = y.person.age\nobj.Id = q.id\nobj.Flags = q.tag[1]",
        &mut ctx,
    )
    .unwrap();
    let obj = snapshot(&obj);
    assert_eq!(obj.name, "Daisy");
    assert_eq!(obj.status, 41);
    assert_eq!(obj.id, "q1");
    assert_eq!(obj.flags, vec!["b".to_string()]);
}

#[test]
fn test_parse_callback_ignores_empty_source() {
    let (mut ctx, _) = test_ctx();
    ctx.set_static("raw", "");
    decode("jsonParse(raw, \"doc\")", &mut ctx).unwrap();
    assert!(!ctx.contains("doc"));
}

#[test]
fn test_poor_arguments() {
    let (mut ctx, _) = test_ctx();
    assert!(matches!(
        decode("ctx.out = jso.a|replace(\"x\")", &mut ctx),
        Err(DxError::PoorArgs { expected: 2, got: 1, .. })
    ));
}
