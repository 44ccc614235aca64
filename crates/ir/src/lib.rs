//! Normalized tree model shared by every language front end.
//!
//! Each supported language's syntax tree is flattened onto the same
//! [`NodeKind`] set so rule predicates stay language-agnostic. A [`Node`] is
//! immutable once its [`FileTree`] is built and is owned exclusively by that
//! tree.

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::collections::HashMap;
use std::fmt;
use std::path::Path;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "lowercase")]
/// Source language of an analyzed file.
pub enum Language {
    Javascript,
    Kotlin,
    Swift,
}

impl Language {
    /// Detects the language from a file name extension.
    ///
    /// # Example
    /// ```
    /// use ir::Language;
    /// use std::path::Path;
    /// assert_eq!(Language::from_path(Path::new("app.kt")), Some(Language::Kotlin));
    /// assert_eq!(Language::from_path(Path::new("README.md")), None);
    /// ```
    pub fn from_path(path: &Path) -> Option<Language> {
        match path.extension()?.to_str()? {
            "js" | "jsx" | "mjs" | "cjs" => Some(Language::Javascript),
            "kt" | "kts" => Some(Language::Kotlin),
            "swift" => Some(Language::Swift),
            _ => None,
        }
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Language::Javascript => "javascript",
            Language::Kotlin => "kotlin",
            Language::Swift => "swift",
        };
        write!(f, "{s}")
    }
}

impl FromStr for Language {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "javascript" | "js" => Ok(Language::Javascript),
            "kotlin" | "kt" => Ok(Language::Kotlin),
            "swift" => Ok(Language::Swift),
            other => Err(format!("unknown language '{other}'")),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "kebab-case")]
/// Shared node classification every language front end maps onto.
///
/// An explicit tagged variant, not a hierarchy: rule files reference these
/// names verbatim (kebab-case).
pub enum NodeKind {
    Module,
    Function,
    Parameter,
    Closure,
    Block,
    Declaration,
    Assignment,
    Call,
    Identifier,
    Literal,
    BinaryOp,
    UnaryOp,
    Conditional,
    Loop,
    CatchBlock,
    Return,
    Class,
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            NodeKind::Module => "module",
            NodeKind::Function => "function",
            NodeKind::Parameter => "parameter",
            NodeKind::Closure => "closure",
            NodeKind::Block => "block",
            NodeKind::Declaration => "declaration",
            NodeKind::Assignment => "assignment",
            NodeKind::Call => "call",
            NodeKind::Identifier => "identifier",
            NodeKind::Literal => "literal",
            NodeKind::BinaryOp => "binary-op",
            NodeKind::UnaryOp => "unary-op",
            NodeKind::Conditional => "conditional",
            NodeKind::Loop => "loop",
            NodeKind::CatchBlock => "catch-block",
            NodeKind::Return => "return",
            NodeKind::Class => "class",
        };
        write!(f, "{s}")
    }
}

impl FromStr for NodeKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "module" => Ok(NodeKind::Module),
            "function" => Ok(NodeKind::Function),
            "parameter" => Ok(NodeKind::Parameter),
            "closure" => Ok(NodeKind::Closure),
            "block" => Ok(NodeKind::Block),
            "declaration" => Ok(NodeKind::Declaration),
            "assignment" => Ok(NodeKind::Assignment),
            "call" => Ok(NodeKind::Call),
            "identifier" => Ok(NodeKind::Identifier),
            "literal" => Ok(NodeKind::Literal),
            "binary-op" => Ok(NodeKind::BinaryOp),
            "unary-op" => Ok(NodeKind::UnaryOp),
            "conditional" => Ok(NodeKind::Conditional),
            "loop" => Ok(NodeKind::Loop),
            "catch-block" => Ok(NodeKind::CatchBlock),
            "return" => Ok(NodeKind::Return),
            "class" => Ok(NodeKind::Class),
            other => Err(format!("unknown node kind '{other}'")),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
/// Location of a node within its file, 1-based.
pub struct Span {
    pub file: String,
    pub line: usize,
    pub column: usize,
    pub end_line: usize,
    pub end_column: usize,
}

impl Span {
    pub fn new(file: impl Into<String>, line: usize, column: usize) -> Self {
        let file = file.into();
        Span {
            file,
            line,
            column,
            end_line: line,
            end_column: column,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
/// One normalized tree element.
pub struct Node {
    pub kind: NodeKind,
    pub span: Span,
    /// Children in source order.
    pub children: Vec<Node>,
    /// Literal attributes preserved for rule matching: `callee`, `name`,
    /// `operator`, `value`, ...
    pub attrs: HashMap<String, JsonValue>,
}

impl Node {
    pub fn new(kind: NodeKind, span: Span) -> Self {
        Node {
            kind,
            span,
            children: Vec::new(),
            attrs: HashMap::new(),
        }
    }

    /// Sets a string attribute while building the node.
    pub fn with_attr(mut self, name: &str, value: impl Into<JsonValue>) -> Self {
        self.attrs.insert(name.to_string(), value.into());
        self
    }

    pub fn with_children(mut self, children: Vec<Node>) -> Self {
        self.children = children;
        self
    }

    /// Returns an attribute as text, if present and a string.
    pub fn attr_str(&self, name: &str) -> Option<&str> {
        self.attrs.get(name).and_then(|v| v.as_str())
    }

    /// Depth-first preorder count of this node and everything below it.
    pub fn subtree_len(&self) -> usize {
        1 + self.children.iter().map(Node::subtree_len).sum::<usize>()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
/// A fully normalized file, ready for rule matching.
pub struct FileTree {
    pub file_path: String,
    pub language: Language,
    pub root: Node,
    /// Original text, kept for snippet extraction.
    pub source: Option<String>,
}

impl FileTree {
    pub fn new(file_path: impl Into<String>, language: Language, root: Node) -> Self {
        FileTree {
            file_path: file_path.into(),
            language,
            root,
            source: None,
        }
    }

    /// Extracts the source line a span starts on, trimmed.
    pub fn snippet(&self, span: &Span) -> String {
        self.source
            .as_deref()
            .and_then(|src| src.lines().nth(span.line.saturating_sub(1)))
            .map(|l| l.trim().to_string())
            .unwrap_or_default()
    }
}
