//! Parallel batch execution over independent per-file units of work.
//!
//! Each unit runs parse → normalize → match → taint → aggregate-local with
//! no shared mutable state; merging the per-file reports is the only join
//! point. The parser is pluggable so the engine never depends on a
//! concrete front end.

use crate::{aggregate, analyze_tree, merge_reports, AnalyzeOptions, Report};
use ir::FileTree;
use rayon::prelude::*;
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;
use tracing::{debug, warn};

#[derive(Debug, Clone)]
pub struct BatchOptions {
    /// Worker count for the pool; 0 lets rayon pick.
    pub threads: usize,
    pub analyze: AnalyzeOptions,
    /// Inline comment marker suppressing findings on its line.
    pub suppress_marker: Option<String>,
}

impl Default for BatchOptions {
    fn default() -> Self {
        BatchOptions {
            threads: 0,
            analyze: AnalyzeOptions::default(),
            suppress_marker: None,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum FailureKind {
    /// The front end could not produce a tree.
    Parse,
    /// The tree exceeded the traversal depth bound.
    DepthExceeded,
}

#[derive(Debug, Clone, Serialize)]
/// One file that could not be analyzed. Reported separately from findings;
/// never aborts the batch.
pub struct FileFailure {
    pub file: PathBuf,
    pub kind: FailureKind,
    pub detail: String,
}

#[derive(Debug, Default, Serialize)]
pub struct BatchMetrics {
    pub files_analyzed: usize,
    pub files_failed: usize,
    /// Unsupported or cancelled-before-start files.
    pub files_skipped: usize,
    pub duration_ms: u128,
}

#[derive(Debug)]
pub struct BatchReport {
    pub report: Report,
    pub failures: Vec<FileFailure>,
    /// True when the run was cancelled; completed per-file results are
    /// retained as partial output.
    pub cancelled: bool,
    pub metrics: BatchMetrics,
}

enum Outcome {
    Done(Report),
    Failed(FileFailure),
    Skipped,
}

/// Analyzes `paths` in parallel on a dedicated pool.
///
/// `parse` turns one path into a normalized tree (`Ok(None)` marks an
/// unsupported file). Setting `cancel` stops new files from starting while
/// keeping every already-completed result.
pub fn analyze_batch<P>(
    paths: &[PathBuf],
    rules: &loader::RuleSet,
    opts: &BatchOptions,
    cancel: &AtomicBool,
    parse: P,
) -> BatchReport
where
    P: Fn(&Path) -> anyhow::Result<Option<FileTree>> + Sync,
{
    let start = Instant::now();
    debug!(files = paths.len(), rules = rules.len(), "batch starting");
    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(opts.threads)
        .build()
        .expect("worker pool");

    let outcomes: Vec<Outcome> = pool.install(|| {
        paths
            .par_iter()
            .map(|path| {
                if cancel.load(Ordering::Relaxed) {
                    return Outcome::Skipped;
                }
                run_unit(path, rules, opts, &parse)
            })
            .collect()
    });

    let mut reports = Vec::new();
    let mut failures = Vec::new();
    let mut metrics = BatchMetrics::default();
    for outcome in outcomes {
        match outcome {
            Outcome::Done(report) => {
                metrics.files_analyzed += 1;
                reports.push(report);
            }
            Outcome::Failed(failure) => {
                metrics.files_failed += 1;
                failures.push(failure);
            }
            Outcome::Skipped => metrics.files_skipped += 1,
        }
    }
    failures.sort_by(|a, b| a.file.cmp(&b.file));
    metrics.duration_ms = start.elapsed().as_millis();

    BatchReport {
        report: merge_reports(reports),
        failures,
        cancelled: cancel.load(Ordering::Relaxed),
        metrics,
    }
}

fn run_unit<P>(
    path: &Path,
    rules: &loader::RuleSet,
    opts: &BatchOptions,
    parse: &P,
) -> Outcome
where
    P: Fn(&Path) -> anyhow::Result<Option<FileTree>> + Sync,
{
    let tree = match parse(path) {
        Ok(Some(tree)) => tree,
        Ok(None) => return Outcome::Skipped,
        Err(e) => {
            warn!(file = %path.display(), error = %e, "parse failed");
            return Outcome::Failed(FileFailure {
                file: path.to_path_buf(),
                kind: FailureKind::Parse,
                detail: format!("{e:#}"),
            });
        }
    };
    let mut findings = match analyze_tree(&tree, rules, &opts.analyze) {
        Ok(f) => f,
        Err(e) => {
            warn!(file = %path.display(), error = %e, "analysis failed");
            return Outcome::Failed(FileFailure {
                file: path.to_path_buf(),
                kind: FailureKind::DepthExceeded,
                detail: e.to_string(),
            });
        }
    };
    if let (Some(marker), Some(source)) = (&opts.suppress_marker, &tree.source) {
        let suppressed = suppressed_lines(source, marker);
        findings.retain(|f| !suppressed.contains(&f.line));
    }
    Outcome::Done(aggregate(findings))
}

fn suppressed_lines(source: &str, marker: &str) -> std::collections::HashSet<usize> {
    source
        .lines()
        .enumerate()
        .filter_map(|(idx, line)| line.contains(marker).then_some(idx + 1))
        .collect()
}
