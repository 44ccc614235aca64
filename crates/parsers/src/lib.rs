//! Language front ends that turn source text into the normalized tree
//! consumed by rule matching.
//!
//! Each front end runs the matching tree-sitter grammar and flattens the
//! native syntax tree onto the shared [`ir::NodeKind`] set. Constructs with
//! no mapping are logged and skipped; their children are re-attached to the
//! nearest mapped ancestor so nothing below them is lost.

use ir::{FileTree, Language};
use serde::Serialize;
use std::fs;
use std::path::Path;
use thiserror::Error;
use tracing::debug;

pub mod languages;

#[derive(Debug, Error)]
/// Errors a front end can produce for a single file.
pub enum ParseError {
    /// The grammar could not build a usable tree from the text. Recorded as
    /// a file-level diagnostic by the batch runner; the batch continues.
    #[error("failed to parse {file}: {detail}")]
    ParseFailure { file: String, detail: String },
    #[error("failed to load the {0} grammar")]
    Grammar(Language),
    #[error("failed to read {file}: {source}")]
    Io {
        file: String,
        #[source]
        source: std::io::Error,
    },
}

#[derive(Debug, Default, Serialize)]
/// Counters accumulated across a parsing session.
pub struct ParserMetrics {
    pub files_parsed: usize,
    pub parse_failures: usize,
    /// Native constructs with no mapping onto the shared node kinds,
    /// skipped with a debug log.
    pub skipped_constructs: usize,
}

/// Detects the language of `path` from its extension.
pub fn detect_language(path: &Path) -> Option<Language> {
    let detected = Language::from_path(path);
    match detected {
        Some(lang) => debug!(file = %path.display(), language = %lang, "language detected"),
        None => debug!(file = %path.display(), "unsupported file type"),
    }
    detected
}

/// Reads and normalizes one file. Returns `Ok(None)` when the extension is
/// not a supported language.
///
/// # Example
/// ```
/// use std::fs;
/// let path = std::env::temp_dir().join("thistle_doc.js");
/// fs::write(&path, "const a = 1;\n").unwrap();
/// let tree = parsers::parse_file(&path, None).unwrap().unwrap();
/// assert_eq!(tree.language, ir::Language::Javascript);
/// ```
pub fn parse_file(
    path: &Path,
    mut metrics: Option<&mut ParserMetrics>,
) -> Result<Option<FileTree>, ParseError> {
    let Some(language) = detect_language(path) else {
        return Ok(None);
    };
    let content = fs::read_to_string(path).map_err(|e| ParseError::Io {
        file: path.display().to_string(),
        source: e,
    })?;
    let res = parse_source(&content, language, &path.to_string_lossy(), metrics.as_deref_mut());
    if let Err(ParseError::ParseFailure { .. }) = &res {
        if let Some(m) = metrics {
            m.parse_failures += 1;
        }
    }
    res.map(Some)
}

/// Normalizes in-memory source text for `language`.
pub fn parse_source(
    content: &str,
    language: Language,
    file_path: &str,
    metrics: Option<&mut ParserMetrics>,
) -> Result<FileTree, ParseError> {
    debug!(file = file_path, language = %language, "normalizing");
    let (root, skipped) = match language {
        Language::Javascript => languages::javascript::normalize(content, file_path)?,
        Language::Kotlin => languages::kotlin::normalize(content, file_path)?,
        Language::Swift => languages::swift::normalize(content, file_path)?,
    };
    if skipped > 0 {
        debug!(file = file_path, skipped, "constructs without a mapping were skipped");
    }
    if let Some(m) = metrics {
        m.files_parsed += 1;
        m.skipped_constructs += skipped;
    }
    let mut tree = FileTree::new(file_path, language, root);
    tree.source = Some(content.to_string());
    Ok(tree)
}

/// Collects the 1-based line numbers carrying an inline suppression comment.
pub fn suppressed_lines(content: &str, marker: &str) -> std::collections::HashSet<usize> {
    content
        .lines()
        .enumerate()
        .filter_map(|(idx, line)| line.contains(marker).then_some(idx + 1))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn suppression_marker_lines_are_collected() {
        let src = "eval(x); // thistle-ignore\nexec(y);\n";
        let lines = suppressed_lines(src, "thistle-ignore");
        assert!(lines.contains(&1));
        assert!(!lines.contains(&2));
    }
}
