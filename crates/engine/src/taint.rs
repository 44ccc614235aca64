//! Intraprocedural taint tracking.
//!
//! One forward pass over each function body in source order. Bindings live
//! in a lexical scope stack: a shadowing declaration gets a fresh identity,
//! so two same-named bindings in nested scopes never share a taint flag.
//! Loop bodies are visited once unless the bounded fixpoint mode is on.
//! Nested function bodies always start from empty state; taint crosses a
//! call boundary only through argument-to-return propagation at the call
//! site.

use crate::{finding_for, AnalyzeOptions, Finding, MAX_LOOP_PASSES};
use ir::{FileTree, Node, NodeKind};
use loader::{CompiledRule, MatcherKind, RuleSet, SanitizerCompleteness, Severity, TaintSpec};
use std::collections::HashMap;
use tracing::trace;

pub(crate) fn run_taint_rules(
    tree: &FileTree,
    rules: &RuleSet,
    opts: &AnalyzeOptions,
) -> Vec<Finding> {
    let mut findings = Vec::new();
    for rule in rules.rules_for(tree.language) {
        let MatcherKind::Taint(spec) = &rule.matcher else {
            continue;
        };
        let mut pass = TaintPass {
            tree,
            rule,
            spec,
            opts,
            findings: &mut findings,
        };
        // the module top level is an implicit function body
        let top_level: Vec<&ir::Node> = tree.root.children.iter().collect();
        pass.analyze_function(&[], &top_level);
    }
    findings
}

/// Binding identities for one function body. Names resolve through the
/// scope stack; flags live per identity, never per name.
#[derive(Default)]
struct TaintState {
    scopes: Vec<HashMap<String, usize>>,
    tainted: Vec<bool>,
}

impl TaintState {
    fn push_scope(&mut self) {
        self.scopes.push(HashMap::new());
    }

    fn pop_scope(&mut self) {
        self.scopes.pop();
    }

    /// New identity in the innermost scope, shadowing any outer binding of
    /// the same name.
    fn declare(&mut self, name: &str, tainted: bool) -> usize {
        let id = self.tainted.len();
        self.tainted.push(tainted);
        if let Some(scope) = self.scopes.last_mut() {
            scope.insert(name.to_string(), id);
        }
        id
    }

    fn resolve(&self, name: &str) -> Option<usize> {
        self.scopes
            .iter()
            .rev()
            .find_map(|scope| scope.get(name).copied())
    }

    fn is_tainted(&self, id: usize) -> bool {
        self.tainted.get(id).copied().unwrap_or(false)
    }

    fn set(&mut self, id: usize, value: bool) {
        if let Some(slot) = self.tainted.get_mut(id) {
            *slot = value;
        }
    }
}

struct TaintPass<'a> {
    tree: &'a FileTree,
    rule: &'a CompiledRule,
    spec: &'a TaintSpec,
    opts: &'a AnalyzeOptions,
    findings: &'a mut Vec<Finding>,
}

impl<'a> TaintPass<'a> {
    /// Analyzes one function body with fresh state.
    fn analyze_function(&mut self, params: &[&Node], body: &[&Node]) {
        let mut state = TaintState::default();
        state.push_scope();
        for p in params {
            let name = p.attr_str("name").unwrap_or_default();
            let tainted = self.source_name_matches(name);
            state.declare(name, tainted);
        }
        for stmt in body {
            self.visit_stmt(stmt, &mut state);
        }
    }

    fn visit_stmt(&mut self, node: &Node, state: &mut TaintState) {
        match node.kind {
            NodeKind::Declaration => {
                let tainted = node
                    .children
                    .first()
                    .map(|init| self.eval_expr(init, state))
                    .unwrap_or(false);
                let name = node.attr_str("name").unwrap_or_default().to_string();
                state.declare(&name, tainted);
            }
            NodeKind::Assignment => {
                let tainted = node
                    .children
                    .first()
                    .map(|rhs| self.eval_expr(rhs, state))
                    .unwrap_or(false);
                let target = node.attr_str("target").unwrap_or_default().to_string();
                match state.resolve(&target) {
                    Some(id) => state.set(id, tainted),
                    // implicit declaration (e.g. a JS global assignment)
                    None => {
                        state.declare(&target, tainted);
                    }
                }
            }
            NodeKind::Function | NodeKind::Closure => self.nested_function(node),
            NodeKind::Loop => {
                state.push_scope();
                let passes = if self.opts.loop_fixpoint {
                    MAX_LOOP_PASSES
                } else {
                    1
                };
                for _ in 0..passes {
                    let before = state.tainted.clone();
                    for child in &node.children {
                        self.visit_stmt(child, state);
                    }
                    if state.tainted[..before.len()] == before[..] {
                        break;
                    }
                }
                state.pop_scope();
            }
            NodeKind::Block
            | NodeKind::Conditional
            | NodeKind::CatchBlock
            | NodeKind::Class
            | NodeKind::Module => {
                state.push_scope();
                for child in &node.children {
                    self.visit_stmt(child, state);
                }
                state.pop_scope();
            }
            NodeKind::Return => {
                for child in &node.children {
                    self.eval_expr(child, state);
                }
            }
            // expression statement: evaluate for sink hits
            _ => {
                self.eval_expr(node, state);
            }
        }
    }

    /// Computes whether an expression's value is tainted, emitting sink
    /// findings for every call encountered on the way.
    fn eval_expr(&mut self, node: &Node, state: &mut TaintState) -> bool {
        match node.kind {
            NodeKind::Identifier => self.identifier_tainted(node, state),
            NodeKind::Literal => {
                // interpolations keep a literal's value attacker-reachable
                let mut tainted = false;
                for child in &node.children {
                    tainted |= self.eval_expr(child, state);
                }
                tainted
            }
            NodeKind::Call => self.eval_call(node, state),
            NodeKind::Function | NodeKind::Closure => {
                self.nested_function(node);
                false
            }
            NodeKind::Declaration | NodeKind::Assignment => {
                // declarations nested in expression position still mutate state
                self.visit_stmt(node, state);
                false
            }
            _ => {
                let mut tainted = false;
                for child in &node.children {
                    tainted |= self.eval_expr(child, state);
                }
                tainted
            }
        }
    }

    fn eval_call(&mut self, node: &Node, state: &mut TaintState) -> bool {
        let callee = node.attr_str("callee").unwrap_or_default().to_string();
        let arg_taints: Vec<bool> = node
            .children
            .iter()
            .map(|arg| self.eval_expr(arg, state))
            .collect();

        if self.spec.sinks.iter().any(|s| s.call.is_match(&callee))
            && arg_taints.iter().any(|t| *t)
        {
            trace!(rule = %self.rule.id, callee = %callee, line = node.span.line, "tainted sink");
            // sink findings are always critical, whatever the rule declares
            self.findings.push(finding_for(
                self.tree,
                self.rule,
                &node.span,
                Severity::Critical,
            ));
        }

        if self.spec.sources.iter().any(|s| {
            s.call
                .as_ref()
                .is_some_and(|re| re.is_match(&callee))
        }) {
            return true;
        }
        if let Some(sanitizer) = self
            .spec
            .sanitizers
            .iter()
            .find(|s| s.call.is_match(&callee))
        {
            return match sanitizer.completeness {
                SanitizerCompleteness::Full => false,
                // the false-safety pattern: the call happened, taint stays
                SanitizerCompleteness::Partial => arg_taints.iter().any(|t| *t),
            };
        }
        // unknown call: argument-to-return propagation
        arg_taints.iter().any(|t| *t)
    }

    fn identifier_tainted(&self, node: &Node, state: &TaintState) -> bool {
        let name = node.attr_str("name").unwrap_or_default();
        if let Some(id) = state.resolve(name) {
            return state.is_tainted(id);
        }
        // member access taints through its base binding
        if let Some(base) = node.attr_str("base") {
            if let Some(id) = state.resolve(base) {
                return state.is_tainted(id);
            }
            if self.source_name_matches(base) {
                return true;
            }
        }
        // unresolved names still count as sources when they match a
        // declared source pattern
        self.source_name_matches(name)
    }

    fn source_name_matches(&self, name: &str) -> bool {
        !name.is_empty()
            && self.spec.sources.iter().any(|s| {
                s.name
                    .as_ref()
                    .is_some_and(|re| re.is_match(name))
            })
    }

    fn nested_function(&mut self, node: &Node) {
        let (params, body): (Vec<&Node>, Vec<&Node>) = node
            .children
            .iter()
            .partition(|c| c.kind == NodeKind::Parameter);
        self.analyze_function(&params, &body);
    }
}
