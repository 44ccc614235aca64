//! Swift front end.
//!
//! `guard` flattens to `conditional`, closures to `closure` with capture
//! information surfaced as attributes (`captures_self`,
//! `capture_specifier`), and force unwraps to `unary-op`. The capture
//! attributes drive the structural retain-cycle rule; this is a syntactic
//! approximation, not escape analysis.

use super::kotlin::operator_text;
use super::{span_of, text_of, unquote};
use crate::ParseError;
use ir::{Language, Node, NodeKind};
use tracing::debug;

pub(crate) fn normalize(content: &str, file: &str) -> Result<(Node, usize), ParseError> {
    let mut parser = tree_sitter::Parser::new();
    parser
        .set_language(tree_sitter_swift::language())
        .map_err(|_| ParseError::Grammar(Language::Swift))?;
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
            "function_declaration" | "protocol_function_declaration" | "init_declaration"
            | "deinit_declaration" => {
                let name = node
                    .child_by_field_name("name")
                    .or_else(|| first_of_kind(node, "simple_identifier"))
                    .map(|n| text_of(n, self.src).to_string())
                    .unwrap_or_default();
                let mut out = Node::new(NodeKind::Function, span).with_attr("name", name);
                out.children = self.function_parts(node);
                vec![out]
            }
            "lambda_literal" => vec![self.closure(node, span)],
            "class_declaration" | "protocol_declaration" => {
                let name = node
                    .child_by_field_name("name")
                    .or_else(|| first_of_kind(node, "type_identifier"))
                    .map(|n| text_of(n, self.src).to_string())
                    .unwrap_or_default();
                let mut out = Node::new(NodeKind::Class, span).with_attr("name", name);
                out.children = self.walk_children(node);
                vec![out]
            }
            "property_declaration" => {
                let mutability = if keyword_in(node, "var") { "var" } else { "let" };
                let name = first_descendant_of_kind(node, "simple_identifier")
                    .map(|n| text_of(n, self.src).to_string())
                    .unwrap_or_default();
                let mut out = Node::new(NodeKind::Declaration, span)
                    .with_attr("name", name)
                    .with_attr("mutability", mutability);
                if let Some(value) = node.child_by_field_name("value") {
                    out.children = self.walk(value);
                } else if let Some(value) = last_expression_child(node) {
                    out.children = self.walk(value);
                }
                vec![out]
            }
            "assignment" => {
                let target = node
                    .child_by_field_name("target")
                    .or_else(|| node.named_child(0))
                    .map(|n| text_of(n, self.src).to_string())
                    .unwrap_or_default();
                let mut out = Node::new(NodeKind::Assignment, span).with_attr("target", target);
                if let Some(rhs) = node
                    .child_by_field_name("result")
                    .or_else(|| node.named_child(1))
                {
                    out.children = self.walk(rhs);
                }
                vec![out]
            }
            "call_expression" => vec![self.call(node, span)],
            "simple_identifier" => {
                vec![Node::new(NodeKind::Identifier, span)
                    .with_attr("name", text_of(node, self.src))]
            }
            "self_expression" => {
                vec![Node::new(NodeKind::Identifier, span).with_attr("name", "self")]
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
            "line_string_literal" | "multi_line_string_literal" | "raw_string_literal" => {
                let mut out = Node::new(NodeKind::Literal, span)
                    .with_attr("literal_kind", "string")
                    .with_attr("value", unquote(text_of(node, self.src)));
                out.children = self.walk_children(node);
                vec![out]
            }
            "interpolated_expression" => self.walk_children(node),
            "line_str_text" | "multi_line_str_text" | "str_escaped_char" => Vec::new(),
            "integer_literal" | "real_literal" | "hex_literal" | "oct_literal"
            | "bin_literal" => {
                vec![Node::new(NodeKind::Literal, span)
                    .with_attr("literal_kind", "number")
                    .with_attr("value", text_of(node, self.src))]
            }
            "boolean_literal" => {
                vec![Node::new(NodeKind::Literal, span)
                    .with_attr("literal_kind", "bool")
                    .with_attr("value", text_of(node, self.src))]
            }
            "nil" | "nil_literal" => {
                vec![Node::new(NodeKind::Literal, span)
                    .with_attr("literal_kind", "null")
                    .with_attr("value", "nil")]
            }
            "additive_expression"
            | "multiplicative_expression"
            | "comparison_expression"
            | "equality_expression"
            | "conjunction_expression"
            | "disjunction_expression"
            | "nil_coalescing_expression"
            | "range_expression"
            | "bitwise_operation"
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
            "force_unwrap_expression" | "force_unwrap" => {
                let mut out = Node::new(NodeKind::UnaryOp, span).with_attr("operator", "!");
                out.children = self.walk_children(node);
                vec![out]
            }
            "postfix_expression" => {
                let raw = text_of(node, self.src);
                if raw.trim_end().ends_with('!') && !raw.trim_end().ends_with("!=") {
                    let mut out = Node::new(NodeKind::UnaryOp, span).with_attr("operator", "!");
                    out.children = self.walk_children(node);
                    vec![out]
                } else {
                    self.walk_children(node)
                }
            }
            "if_statement" => self.conditional(node, span, "if"),
            "guard_statement" => self.conditional(node, span, "guard"),
            "switch_statement" => self.conditional(node, span, "switch"),
            "ternary_expression" => self.conditional(node, span, "ternary"),
            "for_statement" => self.looped(node, span, "for"),
            "while_statement" => self.looped(node, span, "while"),
            "repeat_while_statement" => self.looped(node, span, "repeat"),
            "do_statement" => self.walk_children(node),
            "catch_block" => {
                let mut out = Node::new(NodeKind::CatchBlock, span);
                out.children = self.walk_children(node);
                vec![out]
            }
            "control_transfer_statement" => {
                if text_of(node, self.src).trim_start().starts_with("return") {
                    let mut out = Node::new(NodeKind::Return, span);
                    out.children = self.walk_children(node);
                    vec![out]
                } else {
                    self.walk_children(node)
                }
            }
            "function_body" | "class_body" | "statements" | "switch_entry" => {
                let mut out = Node::new(NodeKind::Block, span);
                out.children = self.walk_children(node);
                vec![out]
            }
            // transparent wrappers
            "source_file"
            | "parenthesized_expression"
            | "tuple_expression"
            | "value_arguments"
            | "value_argument"
            | "array_literal"
            | "dictionary_literal"
            | "try_expression"
            | "await_expression"
            | "equality_constraint" => self.walk_children(node),
            "import_declaration" | "comment" | "multiline_comment" | "type_annotation"
            | "user_type" | "type_identifier" | "attribute" | "modifiers"
            | "availability_condition" | "directive" | "shebang_line" => Vec::new(),
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
        let mut args = Vec::new();
        if let Some(suffix) = first_of_kind(node, "call_suffix") {
            args.extend(self.walk_children(suffix));
        } else {
            // arguments may hang directly off the call in some grammar versions
            let mut cursor = node.walk();
            let rest: Vec<tree_sitter::Node> = node.named_children(&mut cursor).skip(1).collect();
            for c in rest {
                args.extend(self.walk(c));
            }
        }
        out.children = args;
        out
    }

    fn closure(&mut self, node: tree_sitter::Node, span: ir::Span) -> Node {
        let mut out = Node::new(NodeKind::Closure, span);
        if let Some(captures) = first_descendant_of_kind(node, "capture_list") {
            let text = text_of(captures, self.src);
            if let Some(spec) = ["weak", "unowned"].iter().find(|s| text.contains(**s)) {
                out = out.with_attr("capture_specifier", *spec);
            }
            if text.contains("self") {
                out = out.with_attr("captures_self", "true");
            }
        } else if subtree_mentions_self(node) {
            out = out.with_attr("captures_self", "true");
        }
        out.children = self.walk_children(node);
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
        let mut cursor = node.walk();
        let params: Vec<tree_sitter::Node> = node
            .named_children(&mut cursor)
            .filter(|c| c.kind() == "parameter")
            .collect();
        for p in params {
            let name = first_of_kind(p, "simple_identifier")
                .map(|n| text_of(n, self.src).to_string())
                .unwrap_or_default();
            parts
                .push(Node::new(NodeKind::Parameter, span_of(p, self.file)).with_attr("name", name));
        }
        if let Some(body) = node
            .child_by_field_name("body")
            .or_else(|| first_of_kind(node, "function_body"))
        {
            parts.extend(self.walk(body));
        }
        parts
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

fn subtree_mentions_self(node: tree_sitter::Node) -> bool {
    if node.kind() == "self_expression" {
        return true;
    }
    let mut cursor = node.walk();
    let children: Vec<tree_sitter::Node> = node.named_children(&mut cursor).collect();
    children.into_iter().any(subtree_mentions_self)
}

fn keyword_in(node: tree_sitter::Node, keyword: &str) -> bool {
    (0..node.child_count()).any(|i| node.child(i).is_some_and(|c| c.kind() == keyword))
}

fn last_expression_child(node: tree_sitter::Node) -> Option<tree_sitter::Node> {
    let mut cursor = node.walk();
    let children: Vec<tree_sitter::Node> = node
        .named_children(&mut cursor)
        .filter(|c| {
            !matches!(
                c.kind(),
                "pattern"
                    | "value_binding_pattern"
                    | "type_annotation"
                    | "modifiers"
                    | "simple_identifier"
                    | "user_type"
            )
        })
        .collect();
    children.into_iter().last()
}
