//! JavaScript front end.
//!
//! Flattens the tree-sitter-javascript grammar onto the shared node kinds.
//! Statement wrappers (`expression_statement`, parenthesized expressions)
//! are transparent; unknown constructs are skipped with their children
//! re-attached in place.

use super::{span_of, text_of, unquote};
use crate::ParseError;
use ir::{Language, Node, NodeKind};
use tracing::debug;

pub(crate) fn normalize(content: &str, file: &str) -> Result<(Node, usize), ParseError> {
    let mut parser = tree_sitter::Parser::new();
    parser
        .set_language(tree_sitter_javascript::language())
        .map_err(|_| ParseError::Grammar(Language::Javascript))?;
    let tree = parser
        .parse(content, None)
        .ok_or_else(|| ParseError::ParseFailure {
            file: file.to_string(),
            detail: "tree-sitter produced no tree".into(),
        })?;
    let root = tree.root_node();
    if root.has_error() {
        return Err(ParseError::ParseFailure {
            file: file.to_string(),
            detail: "syntax errors in source".into(),
        });
    }

    let mut ctx = Walker {
        src: content,
        file,
        skipped: 0,
    };
    let mut module = Node::new(NodeKind::Module, span_of(root, file));
    module.children = ctx.walk_children(root);
    Ok((module, ctx.skipped))
}

struct Walker<'a> {
    src: &'a str,
    file: &'a str,
    skipped: usize,
}

impl<'a> Walker<'a> {
    fn walk_children(&mut self, node: tree_sitter::Node) -> Vec<Node> {
        let mut cursor = node.walk();
        let children: Vec<tree_sitter::Node> = node.named_children(&mut cursor).collect();
        children.into_iter().flat_map(|c| self.walk(c)).collect()
    }

    fn walk(&mut self, node: tree_sitter::Node) -> Vec<Node> {
        let span = span_of(node, self.file);
        match node.kind() {
            "function_declaration" | "generator_function_declaration" | "method_definition" => {
                let name = node
                    .child_by_field_name("name")
                    .map(|n| text_of(n, self.src).to_string())
                    .unwrap_or_default();
                let mut out = Node::new(NodeKind::Function, span).with_attr("name", name);
                out.children = self.function_parts(node);
                vec![out]
            }
            "arrow_function" | "function" | "generator_function" => {
                let mut out = Node::new(NodeKind::Closure, span);
                out.children = self.function_parts(node);
                vec![out]
            }
            "class_declaration" | "class" => {
                let name = node
                    .child_by_field_name("name")
                    .map(|n| text_of(n, self.src).to_string())
                    .unwrap_or_default();
                let mut out = Node::new(NodeKind::Class, span).with_attr("name", name);
                out.children = self.walk_children(node);
                vec![out]
            }
            "lexical_declaration" | "variable_declaration" => {
                let mutability = match node.child(0).map(|c| c.kind()) {
                    Some("const") => "const",
                    Some("let") => "let",
                    _ => "var",
                };
                let mut cursor = node.walk();
                let declarators: Vec<tree_sitter::Node> = node
                    .named_children(&mut cursor)
                    .filter(|c| c.kind() == "variable_declarator")
                    .collect();
                declarators
                    .into_iter()
                    .map(|d| self.declarator(d, mutability))
                    .collect()
            }
            "assignment_expression" | "augmented_assignment_expression" => {
                let target = node
                    .child_by_field_name("left")
                    .map(|n| text_of(n, self.src).to_string())
                    .unwrap_or_default();
                let mut out = Node::new(NodeKind::Assignment, span).with_attr("target", target);
                if node.kind() == "augmented_assignment_expression" {
                    if let Some(op) = node.child_by_field_name("operator") {
                        out = out.with_attr("operator", text_of(op, self.src));
                    }
                }
                if let Some(rhs) = node.child_by_field_name("right") {
                    out.children = self.walk(rhs);
                }
                vec![out]
            }
            "call_expression" => vec![self.call(node, span, "function")],
            "new_expression" => {
                let mut call = self.call(node, span, "constructor");
                call.attrs.insert("new".into(), true.into());
                vec![call]
            }
            "identifier" => {
                vec![Node::new(NodeKind::Identifier, span)
                    .with_attr("name", text_of(node, self.src))]
            }
            "member_expression" => {
                let base = node
                    .child_by_field_name("object")
                    .map(|n| text_of(n, self.src).to_string())
                    .unwrap_or_default();
                vec![Node::new(NodeKind::Identifier, span)
                    .with_attr("name", text_of(node, self.src))
                    .with_attr("base", base)]
            }
            "this" => {
                vec![Node::new(NodeKind::Identifier, span).with_attr("name", "this")]
            }
            "string" => {
                vec![Node::new(NodeKind::Literal, span)
                    .with_attr("literal_kind", "string")
                    .with_attr("value", unquote(text_of(node, self.src)))]
            }
            "template_string" => {
                let mut out = Node::new(NodeKind::Literal, span)
                    .with_attr("literal_kind", "template")
                    .with_attr("value", unquote(text_of(node, self.src)));
                // interpolated expressions stay visible to taint tracking
                out.children = self.walk_children(node);
                vec![out]
            }
            "template_substitution" => self.walk_children(node),
            "number" => {
                vec![Node::new(NodeKind::Literal, span)
                    .with_attr("literal_kind", "number")
                    .with_attr("value", text_of(node, self.src))]
            }
            "true" | "false" => {
                vec![Node::new(NodeKind::Literal, span)
                    .with_attr("literal_kind", "bool")
                    .with_attr("value", text_of(node, self.src))]
            }
            "null" | "undefined" => {
                vec![Node::new(NodeKind::Literal, span)
                    .with_attr("literal_kind", "null")
                    .with_attr("value", text_of(node, self.src))]
            }
            "regex" => {
                vec![Node::new(NodeKind::Literal, span)
                    .with_attr("literal_kind", "regex")
                    .with_attr("value", text_of(node, self.src))]
            }
            "binary_expression" => {
                let op = node
                    .child_by_field_name("operator")
                    .map(|n| text_of(n, self.src).to_string())
                    .unwrap_or_default();
                let mut out = Node::new(NodeKind::BinaryOp, span).with_attr("operator", op);
                out.children = self.walk_children(node);
                vec![out]
            }
            "unary_expression" | "update_expression" => {
                let op = node
                    .child_by_field_name("operator")
                    .map(|n| text_of(n, self.src).to_string())
                    .unwrap_or_default();
                let mut out = Node::new(NodeKind::UnaryOp, span).with_attr("operator", op);
                out.children = self.walk_children(node);
                vec![out]
            }
            "if_statement" => self.conditional(node, span, "if"),
            "ternary_expression" => self.conditional(node, span, "ternary"),
            "switch_statement" => self.conditional(node, span, "switch"),
            "for_statement" => self.looped(node, span, "for"),
            "for_in_statement" => {
                let form = match node.child_by_field_name("operator") {
                    Some(op) if text_of(op, self.src) == "of" => "for-of",
                    _ => "for-in",
                };
                self.looped(node, span, form)
            }
            "while_statement" => self.looped(node, span, "while"),
            "do_statement" => self.looped(node, span, "do"),
            "try_statement" => self.walk_children(node),
            "catch_clause" => {
                let mut out = Node::new(NodeKind::CatchBlock, span);
                if let Some(param) = node.child_by_field_name("parameter") {
                    out = out.with_attr("param", text_of(param, self.src));
                }
                if let Some(body) = node.child_by_field_name("body") {
                    out.children = self.walk_children(body);
                }
                vec![out]
            }
            "finally_clause" => self.walk_children(node),
            "return_statement" => {
                let mut out = Node::new(NodeKind::Return, span);
                out.children = self.walk_children(node);
                vec![out]
            }
            "statement_block" | "class_body" => {
                let mut out = Node::new(NodeKind::Block, span);
                out.children = self.walk_children(node);
                vec![out]
            }
            // transparent wrappers
            "expression_statement"
            | "parenthesized_expression"
            | "sequence_expression"
            | "await_expression"
            | "spread_element"
            | "object"
            | "array"
            | "pair"
            | "arguments"
            | "program"
            | "labeled_statement"
            | "throw_statement"
            | "else_clause"
            | "switch_body"
            | "switch_case"
            | "switch_default"
            | "export_statement" => self.walk_children(node),
            "comment" | "import_statement" | "empty_statement" | "hash_bang_line"
            | "property_identifier" | "shorthand_property_identifier" => Vec::new(),
            other => {
                debug!(file = self.file, kind = other, line = span.line, "unsupported construct skipped");
                self.skipped += 1;
                self.walk_children(node)
            }
        }
    }

    fn declarator(&mut self, node: tree_sitter::Node, mutability: &str) -> Node {
        let span = span_of(node, self.file);
        let name = node
            .child_by_field_name("name")
            .map(|n| text_of(n, self.src).to_string())
            .unwrap_or_default();
        let mut out = Node::new(NodeKind::Declaration, span)
            .with_attr("name", name)
            .with_attr("mutability", mutability);
        if let Some(value) = node.child_by_field_name("value") {
            out.children = self.walk(value);
        }
        out
    }

    fn call(&mut self, node: tree_sitter::Node, span: ir::Span, callee_field: &str) -> Node {
        let callee = node
            .child_by_field_name(callee_field)
            .map(|n| text_of(n, self.src).to_string())
            .unwrap_or_default();
        let mut out = Node::new(NodeKind::Call, span).with_attr("callee", callee);
        if let Some(args) = node.child_by_field_name("arguments") {
            out.children = self.walk_children(args);
        }
        out
    }

    fn conditional(&mut self, node: tree_sitter::Node, span: ir::Span, form: &str) -> Vec<Node> {
        let mut out = Node::new(NodeKind::Conditional, span).with_attr("form", form);
        out.children = self.walk_children(node);
        vec![out]
    }

    fn looped(&mut self, node: tree_sitter::Node, span: ir::Span, form: &str) -> Vec<Node> {
        let mut out = Node::new(NodeKind::Loop, span).with_attr("form", form);
        out.children = self.walk_children(node);
        vec![out]
    }

    fn function_parts(&mut self, node: tree_sitter::Node) -> Vec<Node> {
        let mut parts = Vec::new();
        match node.child_by_field_name("parameters") {
            Some(params) => {
                let mut cursor = params.walk();
                let named: Vec<tree_sitter::Node> = params.named_children(&mut cursor).collect();
                for p in named {
                    let pspan = span_of(p, self.file);
                    let name = match p.kind() {
                        "identifier" => text_of(p, self.src).to_string(),
                        // assignment_pattern, rest_pattern, ...
                        _ => p
                            .child_by_field_name("left")
                            .or_else(|| p.named_child(0))
                            .map(|n| text_of(n, self.src).to_string())
                            .unwrap_or_default(),
                    };
                    parts.push(Node::new(NodeKind::Parameter, pspan).with_attr("name", name));
                }
            }
            None => {
                // arrow function with a bare parameter
                if let Some(p) = node.child_by_field_name("parameter") {
                    parts.push(
                        Node::new(NodeKind::Parameter, span_of(p, self.file))
                            .with_attr("name", text_of(p, self.src)),
                    );
                }
            }
        }
        if let Some(body) = node.child_by_field_name("body") {
            parts.extend(self.walk(body));
        }
        parts
    }
}
