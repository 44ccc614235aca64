//! Loose smoke coverage for the Kotlin and Swift front ends. These assert
//! the mappings that every grammar version agrees on (calls, declarations)
//! without pinning the exact shape of less stable constructs.

use ir::{Language, NodeKind};
use parsers::parse_source;

fn collect<'a>(node: &'a ir::Node, kind: NodeKind, out: &mut Vec<&'a ir::Node>) {
    if node.kind == kind {
        out.push(node);
    }
    for c in &node.children {
        collect(c, kind, out);
    }
}

#[test]
fn kotlin_calls_and_properties_normalize() {
    let src = "fun main() {\n    val name = readLine()\n    println(name)\n}\n";
    let tree = parse_source(src, Language::Kotlin, "main.kt", None).unwrap();
    assert_eq!(tree.root.kind, NodeKind::Module);

    let mut funcs = Vec::new();
    collect(&tree.root, NodeKind::Function, &mut funcs);
    assert!(funcs.iter().any(|f| f.attr_str("name") == Some("main")));

    let mut calls = Vec::new();
    collect(&tree.root, NodeKind::Call, &mut calls);
    assert!(calls
        .iter()
        .any(|c| c.attr_str("callee") == Some("println")));

    let mut decls = Vec::new();
    collect(&tree.root, NodeKind::Declaration, &mut decls);
    assert!(decls.iter().any(|d| d.attr_str("name") == Some("name")));
}

#[test]
fn kotlin_when_flattens_to_conditional() {
    let src = "fun pick(x: Int) {\n    when (x) {\n        1 -> println(\"one\")\n        else -> println(\"other\")\n    }\n}\n";
    let tree = parse_source(src, Language::Kotlin, "pick.kt", None).unwrap();
    let mut conds = Vec::new();
    collect(&tree.root, NodeKind::Conditional, &mut conds);
    assert!(conds.iter().any(|c| c.attr_str("form") == Some("when")));
}

#[test]
fn swift_calls_and_properties_normalize() {
    let src = "let greeting = \"hello\"\nprint(greeting)\n";
    let tree = parse_source(src, Language::Swift, "main.swift", None).unwrap();
    assert_eq!(tree.root.kind, NodeKind::Module);

    let mut calls = Vec::new();
    collect(&tree.root, NodeKind::Call, &mut calls);
    assert!(calls.iter().any(|c| c.attr_str("callee") == Some("print")));

    let mut decls = Vec::new();
    collect(&tree.root, NodeKind::Declaration, &mut decls);
    assert!(decls
        .iter()
        .any(|d| d.attr_str("name") == Some("greeting")));
}

#[test]
fn swift_guard_flattens_to_conditional() {
    let src = "func check(_ v: Int?) {\n    guard let v = v else { return }\n    print(v)\n}\n";
    let tree = parse_source(src, Language::Swift, "check.swift", None).unwrap();
    let mut conds = Vec::new();
    collect(&tree.root, NodeKind::Conditional, &mut conds);
    assert!(conds.iter().any(|c| c.attr_str("form") == Some("guard")));
}
