//! Kotlin front end.
//!
//! `when` flattens to `conditional`, lambdas to `closure`, and the `!!`
//! not-null assertion to `unary-op` so the null-safety rules stay
//! language-agnostic.

use super::{span_of, text_of, unquote};
use crate::ParseError;
use ir::{Language, Node, NodeKind};
use tracing::debug;

pub(crate) fn normalize(content: &str, file: &str) -> Result<(Node, usize), ParseError> {
    let mut parser = tree_sitter::Parser::new();
    parser
        .set_language(tree_sitter_kotlin::language())
        .map_err(|_| ParseError::Grammar(Language::Kotlin))?;
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
            "function_declaration" => {
                let name = first_of_kind(node, "simple_identifier")
                    .map(|n| text_of(n, self.src).to_string())
                    .unwrap_or_default();
                let mut out = Node::new(NodeKind::Function, span).with_attr("name", name);
                out.children = self.function_parts(node);
                vec![out]
            }
            "lambda_literal" | "anonymous_function" => {
                let mut out = Node::new(NodeKind::Closure, span);
                out.children = self.walk_children(node);
                vec![out]
            }
            "class_declaration" | "object_declaration" => {
                let name = first_of_kind(node, "type_identifier")
                    .or_else(|| first_of_kind(node, "simple_identifier"))
                    .map(|n| text_of(n, self.src).to_string())
                    .unwrap_or_default();
                let mut out = Node::new(NodeKind::Class, span).with_attr("name", name);
                out.children = self.walk_children(node);
                vec![out]
            }
            "property_declaration" => {
                let mutability = if keyword_child(node, "var") { "var" } else { "val" };
                let name = first_descendant_of_kind(node, "simple_identifier")
                    .map(|n| text_of(n, self.src).to_string())
                    .unwrap_or_default();
                let mut out = Node::new(NodeKind::Declaration, span)
                    .with_attr("name", name)
                    .with_attr("mutability", mutability);
                // initializer is the last expression child, after the `=`
                let mut cursor = node.walk();
                let init: Option<tree_sitter::Node> = node
                    .named_children(&mut cursor)
                    .filter(|c| {
                        !matches!(
                            c.kind(),
                            "variable_declaration" | "modifiers" | "type_constraints" | "binding_pattern_kind"
                        )
                    })
                    .last();
                if let Some(value) = init {
                    out.children = self.walk(value);
                }
                vec![out]
            }
            "assignment" => {
                let target = node
                    .named_child(0)
                    .map(|n| text_of(n, self.src).to_string())
                    .unwrap_or_default();
                let mut out = Node::new(NodeKind::Assignment, span).with_attr("target", target);
                if let Some(rhs) = node.named_child(1) {
                    out.children = self.walk(rhs);
                }
                vec![out]
            }
            "call_expression" => vec![self.call(node, span)],
            "simple_identifier" | "this_expression" => {
                vec![Node::new(NodeKind::Identifier, span)
                    .with_attr("name", text_of(node, self.src))]
            }
            "navigation_expression" => {
                let base = node
                    .named_child(0)
                    .map(|n| text_of(n, self.src).to_string())
                    .unwrap_or_default();
                vec![Node::new(NodeKind::Identifier, span)
                    .with_attr("name", text_of(node, self.src))
                    .with_attr("base", base)]
            }
            "string_literal" | "line_string_literal" | "multi_line_string_literal" => {
                let mut out = Node::new(NodeKind::Literal, span)
                    .with_attr("literal_kind", "string")
                    .with_attr("value", unquote(text_of(node, self.src)));
                // keep ${...} interpolations visible to taint tracking
                out.children = self.walk_children(node);
                vec![out]
            }
            "interpolated_expression" | "interpolated_identifier" | "string_interpolation" => {
                self.walk_children(node)
            }
            "line_string_content" | "multi_line_string_content" | "character_escape_seq" => {
                Vec::new()
            }
            "integer_literal" | "real_literal" | "long_literal" | "hex_literal"
            | "bin_literal" | "unsigned_literal" => {
                vec![Node::new(NodeKind::Literal, span)
                    .with_attr("literal_kind", "number")
                    .with_attr("value", text_of(node, self.src))]
            }
            "boolean_literal" => {
                vec![Node::new(NodeKind::Literal, span)
                    .with_attr("literal_kind", "bool")
                    .with_attr("value", text_of(node, self.src))]
            }
            "null" | "null_literal" => {
                vec![Node::new(NodeKind::Literal, span)
                    .with_attr("literal_kind", "null")
                    .with_attr("value", "null")]
            }
            "character_literal" => {
                vec![Node::new(NodeKind::Literal, span)
                    .with_attr("literal_kind", "char")
                    .with_attr("value", unquote(text_of(node, self.src)))]
            }
            "additive_expression"
            | "multiplicative_expression"
            | "comparison_expression"
            | "equality_expression"
            | "conjunction_expression"
            | "disjunction_expression"
            | "elvis_expression"
            | "range_expression"
            | "infix_expression" => {
                let op = operator_text(node, self.src);
                let mut out = Node::new(NodeKind::BinaryOp, span).with_attr("operator", op);
                out.children = self.walk_children(node);
                vec![out]
            }
            "prefix_expression" => {
                let op = node
                    .child(0)
                    .map(|c| text_of(c, self.src).to_string())
                    .unwrap_or_default();
                let mut out = Node::new(NodeKind::UnaryOp, span).with_attr("operator", op);
                out.children = self.walk_children(node);
                vec![out]
            }
            "postfix_expression" | "postfix_unary_expression" => {
                let raw = text_of(node, self.src);
                if raw.trim_end().ends_with("!!") {
                    let mut out = Node::new(NodeKind::UnaryOp, span).with_attr("operator", "!!");
                    out.children = self.walk_children(node);
                    vec![out]
                } else {
                    self.walk_children(node)
                }
            }
            "if_expression" => self.conditional(node, span, "if"),
            "when_expression" => self.conditional(node, span, "when"),
            "for_statement" => self.looped(node, span, "for"),
            "while_statement" => self.looped(node, span, "while"),
            "do_while_statement" => self.looped(node, span, "do"),
            "try_expression" | "try_catch_expression" => self.walk_children(node),
            "catch_block" => {
                let mut out = Node::new(NodeKind::CatchBlock, span);
                out.children = self.catch_body(node);
                vec![out]
            }
            "finally_block" => self.walk_children(node),
            "jump_expression" => {
                if text_of(node, self.src).trim_start().starts_with("return") {
                    let mut out = Node::new(NodeKind::Return, span);
                    out.children = self.walk_children(node);
                    vec![out]
                } else {
                    self.walk_children(node)
                }
            }
            "function_body" | "control_structure_body" | "class_body" => {
                let mut out = Node::new(NodeKind::Block, span);
                out.children = self.walk_children(node);
                vec![out]
            }
            // transparent wrappers
            "statements"
            | "parenthesized_expression"
            | "when_entry"
            | "when_subject"
            | "when_condition"
            | "source_file"
            | "value_arguments"
            | "value_argument"
            | "annotated_lambda"
            | "indexing_expression"
            | "as_expression"
            | "collection_literal"
            | "companion_object" => self.walk_children(node),
            "package_header" | "import_header" | "import_list" | "shebang_line" | "comment"
            | "line_comment" | "multiline_comment" | "modifiers" | "type_identifier"
            | "user_type" | "nullable_type" => Vec::new(),
            other => {
                debug!(file = self.file, kind = other, line = span.line, "unsupported construct skipped");
                self.skipped += 1;
                self.walk_children(node)
            }
        }
    }

    fn call(&mut self, node: tree_sitter::Node, span: ir::Span) -> Node {
        let callee = node
            .named_child(0)
            .map(|n| text_of(n, self.src).to_string())
            .unwrap_or_default();
        let mut out = Node::new(NodeKind::Call, span).with_attr("callee", callee);
        if let Some(suffix) = first_of_kind(node, "call_suffix") {
            out.children = self.walk_children(suffix);
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
        if let Some(params) = first_of_kind(node, "function_value_parameters") {
            let mut cursor = params.walk();
            let named: Vec<tree_sitter::Node> = params
                .named_children(&mut cursor)
                .filter(|c| c.kind() == "parameter")
                .collect();
            for p in named {
                let name = first_of_kind(p, "simple_identifier")
                    .map(|n| text_of(n, self.src).to_string())
                    .unwrap_or_default();
                parts.push(
                    Node::new(NodeKind::Parameter, span_of(p, self.file)).with_attr("name", name),
                );
            }
        }
        if let Some(body) = first_of_kind(node, "function_body") {
            parts.extend(self.walk(body));
        }
        parts
    }

    fn catch_body(&mut self, node: tree_sitter::Node) -> Vec<Node> {
        // the catch body is whatever statements follow the exception binding
        match first_of_kind(node, "statements") {
            Some(stmts) => self.walk_children(stmts),
            None => self
                .walk_children(node)
                .into_iter()
                .filter(|n| n.kind != NodeKind::Identifier)
                .collect(),
        }
    }
}

fn first_of_kind<'t>(node: tree_sitter::Node<'t>, kind: &str) -> Option<tree_sitter::Node<'t>> {
    let mut cursor = node.walk();
    let found = node.named_children(&mut cursor).find(|c| c.kind() == kind);
    found
}

fn first_descendant_of_kind<'t>(
    node: tree_sitter::Node<'t>,
    kind: &str,
) -> Option<tree_sitter::Node<'t>> {
    if node.kind() == kind {
        return Some(node);
    }
    let mut cursor = node.walk();
    let children: Vec<tree_sitter::Node> = node.named_children(&mut cursor).collect();
    children
        .into_iter()
        .find_map(|c| first_descendant_of_kind(c, kind))
}

fn keyword_child(node: tree_sitter::Node, keyword: &str) -> bool {
    (0..node.child_count()).any(|i| node.child(i).is_some_and(|c| c.kind() == keyword))
}

pub(super) fn operator_text(node: tree_sitter::Node, src: &str) -> String {
    (0..node.child_count())
        .filter_map(|i| node.child(i))
        .find(|c| !c.is_named())
        .map(|c| text_of(c, src).to_string())
        .unwrap_or_default()
}
