//! Analysis engine: walks normalized trees, applies compiled rules, tracks
//! taint within function bodies and aggregates findings.
//!
//! The engine holds no ambient state. The rule set, options and
//! cancellation flag are passed into every call; each file's analysis owns
//! its data and the batch merge is the only join point.

use ir::FileTree;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use thiserror::Error;
use tracing::debug;

mod aggregate;
mod batch;
mod matcher;
mod taint;

pub use aggregate::{aggregate, merge_reports, Report};
pub use batch::{analyze_batch, BatchMetrics, BatchOptions, BatchReport, FailureKind, FileFailure};
pub use loader::Severity;

/// Default bound on traversal depth. Degenerate trees deeper than this fail
/// that file's analysis instead of hanging the walker.
pub const DEFAULT_MAX_DEPTH: usize = 192;

const MAX_LOOP_PASSES: usize = 8;

#[derive(Debug, Clone)]
/// Per-analysis tuning, passed explicitly into every call.
pub struct AnalyzeOptions {
    pub max_depth: usize,
    /// Re-run loop bodies until the taint state stabilizes (bounded).
    /// Off by default: the single forward pass is a documented soundness
    /// trade-off.
    pub loop_fixpoint: bool,
}

impl Default for AnalyzeOptions {
    fn default() -> Self {
        AnalyzeOptions {
            max_depth: DEFAULT_MAX_DEPTH,
            loop_fixpoint: false,
        }
    }
}

#[derive(Debug, Error)]
/// Per-file fatal analysis errors. The batch continues past them.
pub enum AnalyzeError {
    #[error("maximum traversal depth {0} exceeded")]
    TraversalDepthExceeded(usize),
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
/// One rule violation anchored at a node of the analyzed tree.
pub struct Finding {
    pub rule_id: String,
    pub category: String,
    pub severity: Severity,
    pub file: PathBuf,
    pub line: usize,
    pub column: usize,
    /// Descriptive message from the rule.
    pub message: String,
    /// Offending source line, trimmed.
    pub snippet: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub remediation: Option<String>,
}

/// Evaluates every applicable rule against one normalized tree.
///
/// A single depth-first pass drives the query rules (pre-filtered by node
/// kind); taint rules then run per function body. Identical input yields
/// identical ordered findings.
pub fn analyze_tree(
    tree: &FileTree,
    rules: &loader::RuleSet,
    opts: &AnalyzeOptions,
) -> Result<Vec<Finding>, AnalyzeError> {
    debug!(file = %tree.file_path, language = %tree.language, "analyzing");
    let mut findings = matcher::run_queries(tree, rules, opts)?;
    // the query pass has bounded the tree depth, so the taint walks below
    // cannot recurse deeper than max_depth either
    findings.extend(taint::run_taint_rules(tree, rules, opts));
    debug!(file = %tree.file_path, count = findings.len(), "analysis finished");
    Ok(findings)
}

pub(crate) fn finding_for(
    tree: &FileTree,
    rule: &loader::CompiledRule,
    span: &ir::Span,
    severity: Severity,
) -> Finding {
    Finding {
        rule_id: rule.id.clone(),
        category: rule.category.clone(),
        severity,
        file: PathBuf::from(&tree.file_path),
        line: span.line,
        column: span.column,
        message: rule.message.clone(),
        snippet: tree.snippet(span),
        remediation: rule.remediation.clone(),
    }
}
