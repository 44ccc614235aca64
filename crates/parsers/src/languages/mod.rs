//! Per-language normalizers plus the helpers they share.

pub mod javascript;
pub mod kotlin;
pub mod swift;

use ir::Span;

pub(crate) fn span_of(node: tree_sitter::Node, file: &str) -> Span {
    let start = node.start_position();
    let end = node.end_position();
    Span {
        file: file.to_string(),
        line: start.row + 1,
        column: start.column + 1,
        end_line: end.row + 1,
        end_column: end.column + 1,
    }
}

pub(crate) fn text_of<'a>(node: tree_sitter::Node, src: &'a str) -> &'a str {
    node.utf8_text(src.as_bytes()).unwrap_or("")
}

/// Strips one layer of matching quotes from a literal's raw text.
pub(crate) fn unquote(raw: &str) -> &str {
    let raw = raw.trim();
    for quote in ["\"\"\"", "\"", "'", "`"] {
        if raw.len() >= 2 * quote.len() && raw.starts_with(quote) && raw.ends_with(quote) {
            return &raw[quote.len()..raw.len() - quote.len()];
        }
    }
    raw
}

#[cfg(test)]
mod tests {
    use super::unquote;

    #[test]
    fn unquote_handles_each_quote_style() {
        assert_eq!(unquote("\"abc\""), "abc");
        assert_eq!(unquote("'x'"), "x");
        assert_eq!(unquote("`tpl`"), "tpl");
        assert_eq!(unquote("\"\"\"raw\"\"\""), "raw");
        assert_eq!(unquote("bare"), "bare");
    }
}
