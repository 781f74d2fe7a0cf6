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

use common::test_registry;
use decodex::path::split_path;
use decodex::{DxError, DxNode, DxParser, DxRegistry, DxTree, DxStore};
use proptest::prelude::*;
use std::sync::Arc;

const BODY: &str = r#"
# mapping of a person record
obj.Id = jso.identifier
obj.Name = jso.person.{nickname|full_name}|default("anonymous")|upper()
ctx.fin = jso.finance
for i, h := range fin.history {
    if h.cost > 10 {
        obj.Cost = h.cost
        lazybreak
    } else if empty(h.comment) {
        continue
    } else {
        obj.Flags = h.comment
    }
}
for j := 0; j < 3; j++ {
    obj.Status = j
}
if v, ok := tryInt(jso.person.status); ok && v >= 18 {
    obj.Status = v
}
switch jso.person.status {
case 67, 68:
    obj.Name = "known"
default:
    obj.Name = "other"
}
appendTestHistory(obj, 1.5, "note")
"#;

fn parse(src: &str) -> decodex::Result<Arc<DxTree>> {
    let registry = test_registry();
    DxParser::new(&registry).parse(src)
}

#[test]
fn test_dump_of_single_assignment() {
    let tree = parse("obj.Id = jso.identifier").unwrap();
    assert_eq!(
        tree.human_readable(),
        "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n<nodes>\n\t<node type=\"assign\" dst=\"obj.Id\" src=\"jso.identifier\"/>\n</nodes>\n"
    );
}

#[test]
fn test_dump_escapes_quotes_and_nests_mods() {
    let tree = parse("obj.Name = jso.name|default(\"x\")").unwrap();
    let dump = tree.human_readable();
    assert!(dump.contains("<mods>\n\t\t\t<mod name=\"default\" sarg0=\"&quot;x&quot;\"/>\n\t\t</mods>"));
}

#[test]
fn test_empty_body_dumps_nothing() {
    let tree = parse("  \n# only a comment\n").unwrap();
    assert!(tree.is_empty());
    assert_eq!(tree.human_readable(), "");
}

#[test]
fn test_full_body_structure() {
    let tree = parse(BODY).unwrap();
    let kinds: Vec<&str> = tree.nodes().iter().map(DxNode::kind).collect();
    assert_eq!(
        kinds,
        vec!["assign", "assign", "assign", "loopRange", "loopCount", "condOK", "switch", "callback"]
    );
    assert!(tree.node_count() > kinds.len());
}

#[test]
fn test_dump_is_idempotent() {
    let first = parse(BODY).unwrap().human_readable();
    let second = parse(BODY).unwrap().human_readable();
    assert_eq!(first, second);
}

#[test]
fn test_render_round_trips_dump() {
    let tree = parse(BODY).unwrap();
    let rendered = tree.render();
    let reparsed = parse(&rendered).unwrap();
    assert_eq!(tree.human_readable(), reparsed.human_readable());
    assert_eq!(reparsed.render(), rendered);
}

#[test]
fn test_semicolon_splits_statements() {
    let tree = parse("obj.Id = jso.identifier; obj.Status = 1").unwrap();
    assert_eq!(tree.nodes().len(), 2);
}

#[test]
fn test_unbalanced_and_unexpected_braces() {
    assert!(matches!(parse("if x {\nobj.Id = x\n"), Err(DxError::UnbalancedControl)));
    assert!(matches!(parse("obj.Id = x\n}"), Err(DxError::UnexpectedClose { .. })));
}

#[test]
fn test_break_outside_loop_fails() {
    assert!(parse("break").is_err());
    assert!(parse("for _, v := range x {\nbreak 2\n}").is_err());
    assert!(parse("for _, v := range x {\nfor _, w := range v {\nbreak 2\n}\n}").is_ok());
}

#[test]
fn test_malformed_loop_header() {
    assert!(matches!(parse("for x y z {\n}"), Err(DxError::MalformedLoop { .. })));
}

#[test]
fn test_complex_condition_rejected() {
    assert!(matches!(
        parse("if a > 1 && b < 2 {\n}"),
        Err(DxError::ComplexCondition { ref condition, .. }) if condition.contains("&&")
    ));
}

#[test]
fn test_unknown_names_are_parse_errors() {
    assert!(matches!(
        parse("obj.Id = jso.a|nope()"),
        Err(DxError::UnknownFunction { ref kind, .. }) if kind == "modifier"
    ));
    assert!(matches!(parse("nope(x)"), Err(DxError::UnknownFunction { .. })));
    assert!(matches!(
        parse("ctx.x = jso.a as nope"),
        Err(DxError::UnknownFunction { ref kind, .. }) if kind == "accessor"
    ));
}

#[test]
fn test_adjacent_calls_are_not_one_callback() {
    assert!(matches!(
        parse("jsonParse(a, b) urlParse(c, d)"),
        Err(DxError::Parse { .. })
    ));
    assert!(parse("jsonParse(jso.raw, \")\")").is_ok());
}

#[test]
fn test_registries_are_isolated() {
    let bare = DxRegistry::new();
    assert!(DxParser::new(&bare).parse("appendTestHistory(obj, 1, \"x\")").is_err());
    assert!(parse("appendTestHistory(obj, 1, \"x\")").is_ok());
}

#[test]
fn test_store_shares_identical_sources() {
    let registry = test_registry();
    let store = DxStore::new();
    let parser = DxParser::new(&registry).with_store(&store);
    let first = parser.parse(BODY).unwrap();
    store.register(None, Some("a"), Arc::clone(&first));
    let second = parser.parse(BODY).unwrap();
    assert!(Arc::ptr_eq(&first, &second));
}

fn ident() -> impl Strategy<Value = String> {
    "[a-z][a-z0-9_]{0,6}"
}

proptest! {
    #[test]
    fn test_split_path_round_trip(segments in prop::collection::vec(ident(), 1..6)) {
        prop_assert_eq!(split_path(&segments.join(".")), segments);
    }

    #[test]
    fn test_generated_bodies_dump_idempotent(
        lines in prop::collection::vec((ident(), ident(), 0i64..1000, any::<bool>()), 1..8)
    ) {
        let body: Vec<String> = lines
            .iter()
            .map(|(dst, src, n, literal)| {
                if *literal {
                    format!("obj.{} = {}", dst, n)
                } else {
                    format!("obj.{} = jso.{}|default({})", dst, src, n)
                }
            })
            .collect();
        let src = body.join("\n");
        let tree = parse(&src).unwrap();
        prop_assert_eq!(tree.human_readable(), parse(&src).unwrap().human_readable());
        prop_assert_eq!(parse(&tree.render()).unwrap().human_readable(), tree.human_readable());
    }
}
