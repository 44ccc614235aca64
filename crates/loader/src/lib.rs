//! Loads declarative rule definitions from YAML or JSON and compiles them
//! into the executable representation the engine consumes.
//!
//! Rule files are data, never code: a rule names the node kind it applies
//! to, a set of attribute predicates, and optionally a taint specification
//! (sources, sanitizers, sinks). The whole set is validated up front —
//! a duplicate id or a malformed pattern aborts the run before any file is
//! analyzed.

use ir::Language;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::fs;
use std::path::Path;
use std::str::FromStr;
use thiserror::Error;
use tracing::debug;

mod schema;
mod walk;

pub use schema::{
    compile, AttrMatcher, CompiledRule, MatcherKind, NodeQuery, RuleDef, SanitizerCompleteness,
    SanitizerDef, SinkDef, SourceDef, TaintDef, TaintSanitizer, TaintSink, TaintSource, TaintSpec,
    WhereDef,
};
pub use walk::walk_files;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "lowercase")]
/// Severity attached to a rule and to the findings it produces.
pub enum Severity {
    Info,
    Warning,
    Critical,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Severity::Info => "INFO",
            Severity::Warning => "WARNING",
            Severity::Critical => "CRITICAL",
        };
        write!(f, "{s}")
    }
}

impl FromStr for Severity {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "info" => Ok(Severity::Info),
            "warning" | "warn" => Ok(Severity::Warning),
            "critical" | "error" => Ok(Severity::Critical),
            other => Err(format!("unknown severity '{other}'")),
        }
    }
}

#[derive(Debug, Error)]
/// Configuration-time failures. All of these are fatal for the run: a
/// corrupted rule set would silently produce wrong findings everywhere.
pub enum RuleError {
    #[error("duplicate rule id: {0}")]
    DuplicateRuleId(String),
    #[error("invalid pattern in rule '{id}': {detail}")]
    InvalidRulePattern { id: String, detail: String },
    #[error("failed to read rule file {file}: {source}")]
    Io {
        file: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse rule file {file}: {detail}")]
    Format { file: String, detail: String },
}

#[derive(Debug, Default)]
/// Compiled rules, unique by id. Immutable once loading finishes and shared
/// read-only across analysis workers.
pub struct RuleSet {
    rules: Vec<CompiledRule>,
    ids: HashSet<String>,
}

impl RuleSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds one compiled rule, rejecting duplicate ids.
    pub fn register(&mut self, rule: CompiledRule) -> Result<(), RuleError> {
        if !self.ids.insert(rule.id.clone()) {
            return Err(RuleError::DuplicateRuleId(rule.id));
        }
        debug!(rule_id = %rule.id, category = %rule.category, "rule registered");
        self.rules.push(rule);
        Ok(())
    }

    pub fn rules(&self) -> &[CompiledRule] {
        &self.rules
    }

    /// Rules applicable to one language, in registration order.
    pub fn rules_for(&self, language: Language) -> impl Iterator<Item = &CompiledRule> {
        self.rules.iter().filter(move |r| r.applies_to(language))
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Distinct categories in the set, sorted.
    pub fn categories(&self) -> Vec<&str> {
        let mut cats: Vec<&str> = self
            .rules
            .iter()
            .map(|r| r.category.as_str())
            .collect::<HashSet<_>>()
            .into_iter()
            .collect();
        cats.sort_unstable();
        cats
    }
}

/// Loads every rule file under `path` (a single file or a directory tree).
///
/// Files are visited in sorted order so the resulting set is reproducible.
pub fn load_rules(path: &Path) -> Result<RuleSet, RuleError> {
    let mut files = Vec::new();
    if path.is_file() {
        files.push(path.to_path_buf());
    } else {
        walk_files(path, &|_| false, &mut |p| {
            if matches!(
                p.extension().and_then(|e| e.to_str()),
                Some("yaml") | Some("yml") | Some("json")
            ) {
                files.push(p.to_path_buf());
            }
            Ok(())
        })
        .map_err(|e| RuleError::Io {
            file: path.display().to_string(),
            source: e,
        })?;
    }
    files.sort();

    let mut set = RuleSet::new();
    for file in &files {
        let content = fs::read_to_string(file).map_err(|e| RuleError::Io {
            file: file.display().to_string(),
            source: e,
        })?;
        let defs = schema::parse_rule_file(file, &content)?;
        let source_file = file.display().to_string();
        for def in defs {
            let rule = schema::compile(def, Some(source_file.clone()))?;
            set.register(rule)?;
        }
    }
    debug!(rules = set.len(), files = files.len(), "rule set loaded");
    Ok(set)
}
