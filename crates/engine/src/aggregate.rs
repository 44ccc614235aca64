//! Finding aggregation: dedup by location + rule, severity resolution,
//! ordered reports with per-severity and per-category counts.

use crate::Finding;
use loader::Severity;
use serde::{Deserialize, Serialize};
use std::collections::btree_map::Entry;
use std::collections::BTreeMap;
use tracing::debug;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
/// Deduplicated, location-ordered findings plus the counters that make the
/// collapse observable.
pub struct Report {
    pub findings: Vec<Finding>,
    /// How many findings went in before deduplication.
    pub raw_count: usize,
    pub severity_counts: BTreeMap<Severity, usize>,
    pub category_counts: BTreeMap<String, usize>,
}

impl Report {
    /// Findings at or above `threshold`.
    pub fn at_or_above(&self, threshold: Severity) -> usize {
        self.findings
            .iter()
            .filter(|f| f.severity >= threshold)
            .count()
    }
}

/// Collapses duplicates sharing `(file, line, column, rule_id)` into one
/// entry, keeping the highest severity and merging distinct messages.
/// Nothing is dropped silently: `raw_count` records the input size.
/// Aggregating an already-aggregated report's findings changes nothing.
pub fn aggregate(findings: Vec<Finding>) -> Report {
    let raw_count = findings.len();
    let mut merged: BTreeMap<(String, usize, usize, String), Finding> = BTreeMap::new();
    for finding in findings {
        let key = (
            finding.file.display().to_string(),
            finding.line,
            finding.column,
            finding.rule_id.clone(),
        );
        match merged.entry(key) {
            Entry::Vacant(slot) => {
                slot.insert(finding);
            }
            Entry::Occupied(mut slot) => {
                let existing = slot.get_mut();
                if finding.severity > existing.severity {
                    existing.severity = finding.severity;
                }
                if !finding.message.is_empty() && !existing.message.contains(&finding.message) {
                    if existing.message.is_empty() {
                        existing.message = finding.message;
                    } else {
                        existing.message = format!("{}; {}", existing.message, finding.message);
                    }
                }
            }
        }
    }

    // BTreeMap keys order the report by file, then line, column, rule id
    let findings: Vec<Finding> = merged.into_values().collect();
    if findings.len() < raw_count {
        debug!(
            before = raw_count,
            after = findings.len(),
            "overlapping findings collapsed"
        );
    }

    let mut severity_counts: BTreeMap<Severity, usize> = BTreeMap::new();
    let mut category_counts: BTreeMap<String, usize> = BTreeMap::new();
    for f in &findings {
        *severity_counts.entry(f.severity).or_default() += 1;
        *category_counts.entry(f.category.clone()).or_default() += 1;
    }

    Report {
        findings,
        raw_count,
        severity_counts,
        category_counts,
    }
}

/// Joins per-file reports into one batch report, preserving the combined
/// pre-dedup count.
pub fn merge_reports(reports: Vec<Report>) -> Report {
    let mut raw_count = 0;
    let mut all = Vec::new();
    for report in reports {
        raw_count += report.raw_count;
        all.extend(report.findings);
    }
    let mut merged = aggregate(all);
    merged.raw_count = raw_count;
    merged
}
