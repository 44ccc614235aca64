//! Formatters for batch reports in text, JSON and SARIF.

use engine::{BatchReport, Finding};
use loader::Severity;
use serde::Serialize;
use std::io::{self, Write};

mod sarif;

/// Severity colored with plain ANSI codes.
fn color_severity(sev: Severity) -> String {
    let (code, text) = match sev {
        Severity::Info => ("\x1b[32m", "INFO"),
        Severity::Warning => ("\x1b[33m", "WARNING"),
        Severity::Critical => ("\x1b[31m", "CRITICAL"),
    };
    format!("{code}{text}\x1b[0m")
}

fn simple_box(title: &str) -> String {
    let width = title.len() + 2;
    format!(
        "╭{}╮\n│ {} │\n╰{}╯\n",
        "─".repeat(width),
        title,
        "─".repeat(width)
    )
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
/// Supported output formats.
pub enum Format {
    Text,
    Json,
    Sarif,
}

/// Run-level information shown above the text report.
pub struct ScanInfo {
    pub rules_loaded: usize,
    pub files_scanned: usize,
    pub duration_ms: u128,
}

#[derive(Serialize)]
struct JsonOut<'a> {
    findings: &'a [Finding],
    total: usize,
    raw_count: usize,
    severity_counts: &'a std::collections::BTreeMap<Severity, usize>,
    category_counts: &'a std::collections::BTreeMap<String, usize>,
    failures: &'a [engine::FileFailure],
    cancelled: bool,
}

/// Prints a batch report to stdout in the selected format.
pub fn print_report(batch: &BatchReport, fmt: Format, info: Option<&ScanInfo>) -> io::Result<()> {
    tracing::debug!(format = ?fmt, findings = batch.report.findings.len(), "writing report");
    let mut out = io::stdout();
    write_report(&mut out, batch, fmt, info)
}

/// Writes a batch report to any `Write`, used directly by tests.
pub fn write_report<W: Write>(
    out: &mut W,
    batch: &BatchReport,
    fmt: Format,
    info: Option<&ScanInfo>,
) -> io::Result<()> {
    match fmt {
        Format::Text => write_text(out, batch, info),
        Format::Json => {
            let json = JsonOut {
                findings: &batch.report.findings,
                total: batch.report.findings.len(),
                raw_count: batch.report.raw_count,
                severity_counts: &batch.report.severity_counts,
                category_counts: &batch.report.category_counts,
                failures: &batch.failures,
                cancelled: batch.cancelled,
            };
            serde_json::to_writer_pretty(&mut *out, &json)?;
            writeln!(out)
        }
        Format::Sarif => {
            let sarif = sarif::to_sarif(&batch.report.findings);
            serde_json::to_writer_pretty(&mut *out, &sarif)?;
            writeln!(out)
        }
    }
}

fn write_text<W: Write>(out: &mut W, batch: &BatchReport, info: Option<&ScanInfo>) -> io::Result<()> {
    if let Some(info) = info {
        writeln!(out, "{}", simple_box("Scan"))?;
        writeln!(
            out,
            "    {} files scanned with {} rules in {}ms",
            info.files_scanned, info.rules_loaded, info.duration_ms
        )?;
        writeln!(out)?;
    }

    let report = &batch.report;
    writeln!(out, "{}", simple_box("Results"))?;
    if report.findings.is_empty() {
        writeln!(out, "✔ No issues found.")?;
    } else {
        writeln!(out, "⚠ Found {} issue(s):\n", report.findings.len())?;
        let mut current_file: Option<&std::path::Path> = None;
        for f in &report.findings {
            if current_file != Some(f.file.as_path()) {
                writeln!(out, "  {}", f.file.display())?;
                current_file = Some(f.file.as_path());
            }
            writeln!(
                out,
                "    {} {}:{} {}",
                color_severity(f.severity),
                f.line,
                f.column,
                f.rule_id
            )?;
            writeln!(out, "        {}", f.message)?;
            if !f.snippet.is_empty() {
                writeln!(out, "        ↳  {}", f.snippet)?;
            }
            if let Some(r) = &f.remediation {
                writeln!(out, "        • Remediation: {r}")?;
            }
        }
        writeln!(out)?;
        writeln!(out, "  By severity:")?;
        for (sev, count) in &report.severity_counts {
            writeln!(out, "    {:<22} {count}", color_severity(*sev))?;
        }
        writeln!(out, "  By category:")?;
        for (cat, count) in &report.category_counts {
            writeln!(out, "    {cat:<14} {count}")?;
        }
        if report.raw_count > report.findings.len() {
            writeln!(
                out,
                "  {} overlapping finding(s) merged",
                report.raw_count - report.findings.len()
            )?;
        }
    }

    if !batch.failures.is_empty() {
        writeln!(out)?;
        writeln!(out, "{}", simple_box("Failed files"))?;
        for failure in &batch.failures {
            writeln!(
                out,
                "  {} ({:?}): {}",
                failure.file.display(),
                failure.kind,
                failure.detail
            )?;
        }
    }
    if batch.cancelled {
        writeln!(out, "\n⚠ Run cancelled — partial results shown.")?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use engine::{aggregate, BatchMetrics, BatchReport};
    use std::path::PathBuf;

    fn sample_batch() -> BatchReport {
        let finding = Finding {
            rule_id: "command-injection".into(),
            category: "injection".into(),
            severity: Severity::Critical,
            file: PathBuf::from("app.js"),
            line: 3,
            column: 1,
            message: "user input reaches a shell command".into(),
            snippet: "exec(cmd);".into(),
            remediation: Some("use execFile with an argument vector".into()),
        };
        BatchReport {
            report: aggregate(vec![finding]),
            failures: vec![],
            cancelled: false,
            metrics: BatchMetrics::default(),
        }
    }

    #[test]
    fn text_output_names_the_rule_and_severity() {
        let mut buf = Vec::new();
        write_report(&mut buf, &sample_batch(), Format::Text, None).unwrap();
        let text = String::from_utf8(buf).unwrap();
        assert!(text.contains("command-injection"));
        assert!(text.contains("CRITICAL"));
        assert!(text.contains("exec(cmd);"));
        assert!(text.contains("injection"));
    }

    #[test]
    fn empty_reports_say_so() {
        let batch = BatchReport {
            report: aggregate(vec![]),
            failures: vec![],
            cancelled: false,
            metrics: BatchMetrics::default(),
        };
        let mut buf = Vec::new();
        write_report(&mut buf, &batch, Format::Text, None).unwrap();
        assert!(String::from_utf8(buf).unwrap().contains("No issues found"));
    }

    #[test]
    fn json_output_round_trips() {
        let mut buf = Vec::new();
        write_report(&mut buf, &sample_batch(), Format::Json, None).unwrap();
        let value: serde_json::Value = serde_json::from_slice(&buf).unwrap();
        assert_eq!(value["total"], 1);
        assert_eq!(value["findings"][0]["rule_id"], "command-injection");
        assert_eq!(value["severity_counts"]["critical"], 1);
    }

    #[test]
    fn sarif_output_carries_the_results() {
        let mut buf = Vec::new();
        write_report(&mut buf, &sample_batch(), Format::Sarif, None).unwrap();
        let value: serde_json::Value = serde_json::from_slice(&buf).unwrap();
        assert_eq!(value["version"], "2.1.0");
        assert_eq!(
            value["runs"][0]["results"][0]["ruleId"],
            "command-injection"
        );
    }
}
