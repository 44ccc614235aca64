//! Single-pass query matching over the normalized tree.

use crate::{finding_for, AnalyzeError, AnalyzeOptions, Finding};
use ir::{FileTree, Node, NodeKind};
use loader::{CompiledRule, MatcherKind, RuleSet};
use std::collections::HashMap;
use tracing::trace;

/// Depth-first traversal evaluating every query rule whose declared kind
/// matches the current node. Children are visited in source order, so the
/// output order is reproducible.
pub(crate) fn run_queries(
    tree: &FileTree,
    rules: &RuleSet,
    opts: &AnalyzeOptions,
) -> Result<Vec<Finding>, AnalyzeError> {
    // pre-filter by kind so a node only sees the rules that can match it
    let mut by_kind: HashMap<NodeKind, Vec<&CompiledRule>> = HashMap::new();
    for rule in rules.rules_for(tree.language) {
        if let Some(kind) = rule.query_kind() {
            by_kind.entry(kind).or_default().push(rule);
        }
    }

    let mut findings = Vec::new();
    let mut ancestors: Vec<&Node> = Vec::new();
    visit(
        &tree.root,
        &mut ancestors,
        &by_kind,
        tree,
        opts,
        &mut findings,
    )?;
    Ok(findings)
}

fn visit<'t>(
    node: &'t Node,
    ancestors: &mut Vec<&'t Node>,
    by_kind: &HashMap<NodeKind, Vec<&CompiledRule>>,
    tree: &FileTree,
    opts: &AnalyzeOptions,
    findings: &mut Vec<Finding>,
) -> Result<(), AnalyzeError> {
    if ancestors.len() >= opts.max_depth {
        return Err(AnalyzeError::TraversalDepthExceeded(opts.max_depth));
    }
    if let Some(candidates) = by_kind.get(&node.kind) {
        for rule in candidates {
            let MatcherKind::Query(query) = &rule.matcher else {
                continue;
            };
            if query.matches(node, ancestors) {
                trace!(rule = %rule.id, line = node.span.line, "query matched");
                findings.push(finding_for(tree, rule, &node.span, rule.severity));
            }
        }
    }
    ancestors.push(node);
    for child in &node.children {
        visit(child, ancestors, by_kind, tree, opts, findings)?;
    }
    ancestors.pop();
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analyze_tree;
    use ir::{Language, Span};
    use loader::{compile, RuleDef, WhereDef};

    fn span(line: usize) -> Span {
        Span::new("t.js", line, 1)
    }

    fn leaf(kind: NodeKind, line: usize) -> Node {
        Node::new(kind, span(line))
    }

    fn query_rule(id: &str, kind: NodeKind) -> RuleDef {
        RuleDef {
            id: id.into(),
            severity: Some("warning".into()),
            category: Some("test".into()),
            languages: vec![],
            message: Some(format!("{id} fired")),
            remediation: None,
            kind: Some(kind),
            conditions: vec![],
            within: None,
            not_within: None,
            childless: None,
            taint: None,
        }
    }

    fn rule_set(defs: Vec<RuleDef>) -> RuleSet {
        let mut set = RuleSet::new();
        for def in defs {
            set.register(compile(def, None).unwrap()).unwrap();
        }
        set
    }

    fn tree_of(children: Vec<Node>) -> FileTree {
        let root = Node::new(NodeKind::Module, span(1)).with_children(children);
        FileTree::new("t.js", Language::Javascript, root)
    }

    #[test]
    fn kind_prefilter_only_fires_on_matching_nodes() {
        let tree = tree_of(vec![
            leaf(NodeKind::Call, 2).with_attr("callee", "eval"),
            leaf(NodeKind::Literal, 3),
        ]);
        let set = rule_set(vec![query_rule("calls", NodeKind::Call)]);
        let findings = analyze_tree(&tree, &set, &AnalyzeOptions::default()).unwrap();
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].rule_id, "calls");
        assert_eq!(findings[0].line, 2);
    }

    #[test]
    fn attribute_regex_narrows_matches() {
        let tree = tree_of(vec![
            leaf(NodeKind::Call, 2).with_attr("callee", "Math.random"),
            leaf(NodeKind::Call, 3).with_attr("callee", "crypto.randomBytes"),
        ]);
        let mut def = query_rule("weak-random", NodeKind::Call);
        def.conditions = vec![WhereDef {
            attr: "callee".into(),
            equals: None,
            matches: Some(r"^Math\.random$".into()),
            absent: false,
        }];
        let set = rule_set(vec![def]);
        let findings = analyze_tree(&tree, &set, &AnalyzeOptions::default()).unwrap();
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].line, 2);
    }

    #[test]
    fn absent_attribute_predicates_match_missing_attrs() {
        let tree = tree_of(vec![
            leaf(NodeKind::Closure, 2).with_attr("captures_self", "true"),
            leaf(NodeKind::Closure, 3)
                .with_attr("captures_self", "true")
                .with_attr("capture_specifier", "weak"),
        ]);
        let mut def = query_rule("retain-cycle", NodeKind::Closure);
        def.conditions = vec![
            WhereDef {
                attr: "captures_self".into(),
                equals: Some("true".into()),
                matches: None,
                absent: false,
            },
            WhereDef {
                attr: "capture_specifier".into(),
                equals: None,
                matches: None,
                absent: true,
            },
        ];
        let set = rule_set(vec![def]);
        let findings = analyze_tree(&tree, &set, &AnalyzeOptions::default()).unwrap();
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].line, 2);
    }

    #[test]
    fn within_and_not_within_consult_the_ancestor_path() {
        let func = leaf(NodeKind::Function, 2)
            .with_children(vec![leaf(NodeKind::Declaration, 3).with_attr("name", "local")]);
        let tree = tree_of(vec![
            func,
            leaf(NodeKind::Declaration, 5).with_attr("name", "global"),
        ]);

        let mut global_only = query_rule("global-state", NodeKind::Declaration);
        global_only.not_within = Some(NodeKind::Function);
        let set = rule_set(vec![global_only]);
        let findings = analyze_tree(&tree, &set, &AnalyzeOptions::default()).unwrap();
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].line, 5);
    }

    #[test]
    fn childless_constraint_separates_empty_catch_blocks() {
        let tree = tree_of(vec![
            leaf(NodeKind::CatchBlock, 2),
            leaf(NodeKind::CatchBlock, 4).with_children(vec![leaf(NodeKind::Call, 5)]),
        ]);
        let mut def = query_rule("swallowed-error", NodeKind::CatchBlock);
        def.childless = Some(true);
        let set = rule_set(vec![def]);
        let findings = analyze_tree(&tree, &set, &AnalyzeOptions::default()).unwrap();
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].line, 2);
    }

    #[test]
    fn unmatched_nodes_produce_nothing() {
        let tree = tree_of(vec![leaf(NodeKind::Identifier, 2)]);
        let set = rule_set(vec![query_rule("calls", NodeKind::Call)]);
        let findings = analyze_tree(&tree, &set, &AnalyzeOptions::default()).unwrap();
        assert!(findings.is_empty());
    }

    #[test]
    fn degenerate_depth_fails_the_file() {
        let mut node = leaf(NodeKind::Block, 2);
        for _ in 0..300 {
            node = leaf(NodeKind::Block, 2).with_children(vec![node]);
        }
        let tree = tree_of(vec![node]);
        let set = rule_set(vec![query_rule("calls", NodeKind::Call)]);
        let err = analyze_tree(&tree, &set, &AnalyzeOptions::default()).unwrap_err();
        assert!(matches!(err, AnalyzeError::TraversalDepthExceeded(_)));
    }

    #[test]
    fn analysis_is_deterministic() {
        let tree = tree_of(vec![
            leaf(NodeKind::Call, 2).with_attr("callee", "eval"),
            leaf(NodeKind::Call, 3).with_attr("callee", "exec"),
            leaf(NodeKind::Literal, 4).with_attr("value", "sk_test_x"),
        ]);
        let set = rule_set(vec![
            query_rule("calls", NodeKind::Call),
            query_rule("literals", NodeKind::Literal),
        ]);
        let one = analyze_tree(&tree, &set, &AnalyzeOptions::default()).unwrap();
        let two = analyze_tree(&tree, &set, &AnalyzeOptions::default()).unwrap();
        assert_eq!(one, two);
    }
}
