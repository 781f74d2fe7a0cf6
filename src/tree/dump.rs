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

//! Human-readable dump and canonical source rendering of a [`DxTree`].

use std::fmt::Write;

use super::{
    DxArg, DxCaseMatch, DxMod, DxNode, DxOkCheck, DxTest, DxTree,
};

impl DxTree {
    /// XML-like view of the tree, one `<node>` element per node.
    pub fn human_readable(&self) -> String {
        let mut buf = String::new();
        if self.nodes.is_empty() {
            return buf;
        }
        buf.push_str("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n");
        hr_nodes(&mut buf, &self.nodes, 0);
        buf
    }

    /// Canonical rule source. Parsing it yields a tree with the same dump.
    pub fn render(&self) -> String {
        let mut buf = String::new();
        render_nodes(&mut buf, &self.nodes, 0);
        buf
    }
}

fn indent(buf: &mut String, depth: usize) {
    for _ in 0..depth {
        buf.push('\t');
    }
}

fn attr(buf: &mut String, key: &str, value: &str) {
    if value.is_empty() {
        return;
    }
    buf.push(' ');
    buf.push_str(key);
    buf.push_str("=\"");
    buf.push_str(&value.replace('"', "&quot;"));
    buf.push('"');
}

fn attr_args(buf: &mut String, args: &[DxArg]) {
    for (idx, arg) in args.iter().enumerate() {
        let prefix = if arg.is_static() { "sarg" } else { "arg" };
        attr(buf, &format!("{}{}", prefix, idx), arg.raw());
    }
}

fn attr_test(buf: &mut String, test: &DxTest) {
    match test {
        DxTest::Compare { left, op, right } => {
            attr(buf, "left", left.raw());
            attr(buf, "op", op.as_str());
            attr(buf, "right", right.raw());
        }
        DxTest::Truthy { operand, negate } => {
            attr(buf, "left", operand.raw());
            if *negate {
                attr(buf, "not", "1");
            }
        }
        DxTest::Helper { helper, args, negate } => {
            attr(buf, "helper", &helper.name);
            if *negate {
                attr(buf, "not", "1");
            }
            attr_args(buf, args);
        }
        DxTest::Length { cap, operand, op, right } => {
            attr(buf, "lc", if *cap { "cap" } else { "len" });
            attr(buf, "left", operand.raw());
            attr(buf, "op", op.as_str());
            attr(buf, "right", right.raw());
        }
    }
}

fn hr_nodes(buf: &mut String, nodes: &[DxNode], depth: usize) {
    indent(buf, depth);
    buf.push_str("<nodes>\n");
    for node in nodes {
        indent(buf, depth + 1);
        buf.push_str("<node");
        attr(buf, "type", node.kind());
        let mut mods: &[DxMod] = &[];
        match node {
            DxNode::Assign(assign) => {
                attr(buf, "dst", assign.dst.raw());
                if let Some(src) = &assign.src {
                    attr(buf, "src", src.raw());
                    if src.is_static() {
                        attr(buf, "static", "1");
                    }
                }
                if let Some(ins) = &assign.ins {
                    attr(buf, "ins", &ins.name);
                }
                mods = &assign.mods;
            }
            DxNode::Callback(call) => {
                attr(buf, "callback", &call.func.name);
                attr_args(buf, &call.args);
            }
            DxNode::Getter(getter) => {
                attr(buf, "dst", getter.dst.raw());
                attr(buf, "getter", &getter.call.func.name);
                attr_args(buf, &getter.call.args);
                if let Some(ins) = &getter.ins {
                    attr(buf, "ins", &ins.name);
                }
            }
            DxNode::CounterLoop(lp) => {
                attr(buf, "counter", &lp.counter);
                attr(buf, "init", lp.init.raw());
                attr(buf, "cond", &lp.cond_raw);
                attr(buf, "limit", lp.limit.raw());
                attr(buf, "step", &lp.step_raw);
            }
            DxNode::RangeLoop(lp) => {
                attr(buf, "key", lp.key.as_deref().unwrap_or(""));
                attr(buf, "val", lp.value.as_deref().unwrap_or(""));
                attr(buf, "src", lp.src.raw());
            }
            DxNode::Break(depth) | DxNode::LazyBreak(depth) => {
                attr(buf, "brkD", &depth.to_string());
            }
            DxNode::Condition(cond) => attr_test(buf, &cond.test),
            DxNode::ConditionOk(cond) => {
                attr(buf, "var", cond.var.as_deref().unwrap_or(""));
                attr(buf, "varOK", cond.ok_var.as_deref().unwrap_or(""));
                if let Some(ins) = &cond.ins {
                    attr(buf, "ins", &ins.name);
                }
                attr(buf, "helper", &cond.helper.name);
                attr_args(buf, &cond.args);
                match &cond.check {
                    DxOkCheck::Ok => attr(buf, "check", "ok"),
                    DxOkCheck::NotOk => attr(buf, "check", "!ok"),
                    DxOkCheck::Compare { left, op, right } => {
                        attr(buf, "left", left.raw());
                        attr(buf, "op", op.as_str());
                        attr(buf, "right", right.raw());
                    }
                }
            }
            DxNode::Switch(switch) => {
                if let Some(subject) = &switch.subject {
                    attr(buf, "src", subject.raw());
                }
            }
            DxNode::Case(case) => match &case.matcher {
                DxCaseMatch::Values(values) => attr_args(buf, values),
                DxCaseMatch::Test(test) => attr_test(buf, test),
            },
            DxNode::Continue | DxNode::TrueBranch(_) | DxNode::FalseBranch(_) | DxNode::Default(_) => {}
        }

        let children = node.children();
        if mods.is_empty() && children.is_empty() {
            buf.push_str("/>\n");
            continue;
        }
        buf.push_str(">\n");
        if !mods.is_empty() {
            indent(buf, depth + 2);
            buf.push_str("<mods>\n");
            for m in mods {
                indent(buf, depth + 3);
                buf.push_str("<mod");
                attr(buf, "name", &m.func.name);
                attr_args(buf, &m.args);
                buf.push_str("/>\n");
            }
            indent(buf, depth + 2);
            buf.push_str("</mods>\n");
        }
        if !children.is_empty() {
            hr_nodes(buf, children, depth + 2);
        }
        indent(buf, depth + 1);
        buf.push_str("</node>\n");
    }
    indent(buf, depth);
    buf.push_str("</nodes>\n");
}

fn join_args(args: &[DxArg]) -> String {
    args.iter().map(DxArg::raw).collect::<Vec<_>>().join(", ")
}

fn render_test(test: &DxTest) -> String {
    match test {
        DxTest::Compare { left, op, right } => format!("{} {} {}", left.raw(), op, right.raw()),
        DxTest::Truthy { operand, negate } => {
            format!("{}{}", if *negate { "!" } else { "" }, operand.raw())
        }
        DxTest::Helper { helper, args, negate } => {
            format!("{}{}({})", if *negate { "!" } else { "" }, helper.name, join_args(args))
        }
        DxTest::Length { cap, operand, op, right } => format!(
            "{}({}) {} {}",
            if *cap { "cap" } else { "len" },
            operand.raw(),
            op,
            right.raw()
        ),
    }
}

fn render_block(buf: &mut String, header: &str, children: &[DxNode], depth: usize) {
    indent(buf, depth);
    buf.push_str(header);
    buf.push_str(" {\n");
    render_nodes(buf, children, depth + 1);
    indent(buf, depth);
    buf.push_str("}\n");
}

fn render_nodes(buf: &mut String, nodes: &[DxNode], depth: usize) {
    for node in nodes {
        match node {
            DxNode::Assign(assign) => {
                indent(buf, depth);
                let _ = write!(buf, "{} = ", assign.dst.raw());
                let mut first = true;
                if let Some(src) = &assign.src {
                    buf.push_str(src.raw());
                    first = false;
                }
                for m in &assign.mods {
                    if !first {
                        buf.push('|');
                    }
                    first = false;
                    let _ = write!(buf, "{}({})", m.func.name, join_args(&m.args));
                }
                if let Some(ins) = &assign.ins {
                    let _ = write!(buf, " as {}", ins.name);
                }
                buf.push('\n');
            }
            DxNode::Callback(call) => {
                indent(buf, depth);
                let _ = writeln!(buf, "{}({})", call.func.name, join_args(&call.args));
            }
            DxNode::Getter(getter) => {
                indent(buf, depth);
                let _ = write!(
                    buf,
                    "{} = {}({})",
                    getter.dst.raw(),
                    getter.call.func.name,
                    join_args(&getter.call.args)
                );
                if let Some(ins) = &getter.ins {
                    let _ = write!(buf, " as {}", ins.name);
                }
                buf.push('\n');
            }
            DxNode::CounterLoop(lp) => {
                let header = format!(
                    "for {c} := {}; {c} {} {}; {c}{}",
                    lp.init.raw(),
                    lp.cond_raw,
                    lp.limit.raw(),
                    lp.step_raw,
                    c = lp.counter
                );
                render_block(buf, &header, &lp.children, depth);
            }
            DxNode::RangeLoop(lp) => {
                let key = lp.key.as_deref().unwrap_or("_");
                let header = match &lp.value {
                    Some(value) => format!("for {}, {} := range {}", key, value, lp.src.raw()),
                    None => format!("for {} := range {}", key, lp.src.raw()),
                };
                render_block(buf, &header, &lp.children, depth);
            }
            DxNode::Break(n) | DxNode::LazyBreak(n) => {
                indent(buf, depth);
                let word = if matches!(node, DxNode::Break(_)) { "break" } else { "lazybreak" };
                if *n > 1 {
                    let _ = writeln!(buf, "{} {}", word, n);
                } else {
                    let _ = writeln!(buf, "{}", word);
                }
            }
            DxNode::Continue => {
                indent(buf, depth);
                buf.push_str("continue\n");
            }
            DxNode::Condition(cond) => {
                render_branches(buf, &format!("if {}", render_test(&cond.test)), &cond.children, depth);
            }
            DxNode::ConditionOk(cond) => {
                let var = cond.var.as_deref().unwrap_or("_");
                let ok = cond.ok_var.as_deref().unwrap_or("_");
                let ins = cond
                    .ins
                    .as_ref()
                    .map(|ins| format!(".({})", ins.name))
                    .unwrap_or_default();
                let check = match &cond.check {
                    DxOkCheck::Ok if cond.ok_var.is_none() => String::new(),
                    DxOkCheck::Ok => format!("; {}", ok),
                    DxOkCheck::NotOk => format!("; !{}", ok),
                    DxOkCheck::Compare { left, op, right } => {
                        format!("; {} {} {}", left.raw(), op, right.raw())
                    }
                };
                let header = format!(
                    "if {}, {} := {}({}){}{}",
                    var,
                    ok,
                    cond.helper.name,
                    join_args(&cond.args),
                    ins,
                    check
                );
                render_branches(buf, &header, &cond.children, depth);
            }
            DxNode::TrueBranch(children) | DxNode::FalseBranch(children) | DxNode::Default(children) => {
                render_nodes(buf, children, depth);
            }
            DxNode::Switch(switch) => {
                indent(buf, depth);
                match &switch.subject {
                    Some(subject) => {
                        let _ = writeln!(buf, "switch {} {{", subject.raw());
                    }
                    None => buf.push_str("switch {\n"),
                }
                for case in &switch.children {
                    indent(buf, depth);
                    match case {
                        DxNode::Case(case) => {
                            match &case.matcher {
                                DxCaseMatch::Values(values) => {
                                    let _ = writeln!(buf, "case {}:", join_args(values));
                                }
                                DxCaseMatch::Test(test) => {
                                    let _ = writeln!(buf, "case {}:", render_test(test));
                                }
                            }
                            render_nodes(buf, &case.children, depth + 1);
                        }
                        other => {
                            buf.push_str("default:\n");
                            render_nodes(buf, other.children(), depth + 1);
                        }
                    }
                }
                indent(buf, depth);
                buf.push_str("}\n");
            }
            DxNode::Case(case) => render_nodes(buf, &case.children, depth),
        }
    }
}

fn render_branches(buf: &mut String, header: &str, children: &[DxNode], depth: usize) {
    indent(buf, depth);
    buf.push_str(header);
    buf.push_str(" {\n");
    for child in children {
        if let DxNode::FalseBranch(nodes) = child {
            indent(buf, depth);
            buf.push_str("} else {\n");
            render_nodes(buf, nodes, depth + 1);
        } else {
            render_nodes(buf, child.children(), depth + 1);
        }
    }
    indent(buf, depth);
    buf.push_str("}\n");
}
