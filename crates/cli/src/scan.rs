//! The `scan` subcommand: discover files, run the batch, print the report
//! and derive the exit status.

use anyhow::{Context, Result};
use engine::{analyze_batch, AnalyzeOptions, BatchOptions};
use loader::{load_rules, walk_files};
use regex::Regex;
use std::path::PathBuf;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use tracing::{debug, info};

use crate::args::ScanArgs;
use crate::{default_excludes, is_excluded};

pub fn run_scan(args: ScanArgs) -> Result<i32> {
    // a corrupted rule set must fail before any file is touched
    let rules = load_rules(&args.rules)
        .with_context(|| format!("loading rules from {}", args.rules.display()))?;
    if rules.is_empty() {
        anyhow::bail!("no rules found under {}", args.rules.display());
    }
    info!(rules = rules.len(), "rule set loaded");

    let mut patterns: Vec<Regex> = if args.no_default_exclude {
        Vec::new()
    } else {
        default_excludes()
    };
    patterns.extend(args.exclude.iter().cloned());

    let mut files: Vec<PathBuf> = Vec::new();
    walk_files(
        &args.path,
        &|p| is_excluded(p, &patterns, args.max_file_size),
        &mut |p| {
            if parsers::detect_language(p).is_some() {
                files.push(p.to_path_buf());
            }
            Ok(())
        },
    )
    .with_context(|| format!("walking {}", args.path.display()))?;
    files.sort();
    debug!(files = files.len(), "scan targets collected");

    let opts = BatchOptions {
        threads: args.threads,
        analyze: AnalyzeOptions {
            max_depth: args.max_depth,
            loop_fixpoint: args.loop_fixpoint,
        },
        suppress_marker: Some(args.suppress_comment.clone()),
    };
    let cancel = Arc::new(AtomicBool::new(false));
    let batch = analyze_batch(&files, &rules, &opts, &cancel, |p| {
        parsers::parse_file(p, None).map_err(Into::into)
    });

    let info = reporters::ScanInfo {
        rules_loaded: rules.len(),
        files_scanned: batch.metrics.files_analyzed,
        duration_ms: batch.metrics.duration_ms,
    };
    reporters::print_report(
        &batch,
        args.format.into(),
        (!args.quiet).then_some(&info),
    )?;

    // parse failures are reported above but do not gate the exit status
    let blocking = batch.report.at_or_above(args.fail_on);
    Ok(if blocking > 0 { 1 } else { 0 })
}
