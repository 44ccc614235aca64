//! Rule file schema and compilation to the executable form.

use crate::{RuleError, Severity};
use ir::{Language, Node, NodeKind};
use regex::Regex;
use serde::Deserialize;
use serde_json::Value as JsonValue;
use std::path::Path;

#[derive(Debug, Deserialize)]
struct RuleFile {
    rules: Vec<RuleDef>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
/// One rule as written in a YAML/JSON file.
pub struct RuleDef {
    pub id: String,
    pub severity: Option<String>,
    pub category: Option<String>,
    #[serde(default)]
    pub languages: Vec<String>,
    pub message: Option<String>,
    pub remediation: Option<String>,
    /// Node kind a query rule applies to.
    pub kind: Option<NodeKind>,
    #[serde(default, rename = "where")]
    pub conditions: Vec<WhereDef>,
    /// Only match when some ancestor has this kind.
    pub within: Option<NodeKind>,
    /// Only match when no ancestor has this kind.
    #[serde(rename = "not-within")]
    pub not_within: Option<NodeKind>,
    /// Constrain on the node having (or not having) children.
    pub childless: Option<bool>,
    pub taint: Option<TaintDef>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
/// One attribute predicate of a query rule.
pub struct WhereDef {
    pub attr: String,
    pub equals: Option<JsonValue>,
    pub matches: Option<String>,
    #[serde(default)]
    pub absent: bool,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TaintDef {
    #[serde(default)]
    pub sources: Vec<SourceDef>,
    #[serde(default)]
    pub sanitizers: Vec<SanitizerDef>,
    #[serde(default)]
    pub sinks: Vec<SinkDef>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
/// Expressions whose value is attacker-influenced: calls whose callee
/// matches `call`, or bindings/parameters whose name matches `name`.
pub struct SourceDef {
    pub call: Option<String>,
    pub name: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SanitizerDef {
    pub call: String,
    #[serde(default)]
    pub completeness: SanitizerCompleteness,
}

#[derive(Debug, Clone, Copy, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
/// Whether a sanitizer really neutralizes taint. A `partial` sanitizer
/// models the false-safety pattern: the call is present but taint is
/// retained.
pub enum SanitizerCompleteness {
    #[default]
    Full,
    Partial,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SinkDef {
    pub call: String,
}

#[derive(Debug)]
/// Rule ready for execution, regexes pre-built.
pub struct CompiledRule {
    pub id: String,
    pub severity: Severity,
    pub category: String,
    pub message: String,
    pub remediation: Option<String>,
    /// Empty means every language.
    pub languages: Vec<Language>,
    pub matcher: MatcherKind,
    pub source_file: Option<String>,
}

impl CompiledRule {
    pub fn applies_to(&self, language: Language) -> bool {
        self.languages.is_empty() || self.languages.contains(&language)
    }

    /// Node kind this rule is pre-filtered on, if it is a query rule.
    pub fn query_kind(&self) -> Option<NodeKind> {
        match &self.matcher {
            MatcherKind::Query(q) => Some(q.kind),
            MatcherKind::Taint(_) => None,
        }
    }
}

#[derive(Debug)]
pub enum MatcherKind {
    Query(NodeQuery),
    Taint(TaintSpec),
}

#[derive(Debug)]
/// Structural predicate over a node and its ancestor path.
pub struct NodeQuery {
    pub kind: NodeKind,
    pub within: Option<NodeKind>,
    pub not_within: Option<NodeKind>,
    pub childless: Option<bool>,
    pub attrs: Vec<AttrMatcher>,
}

impl NodeQuery {
    /// Pure predicate: does `node`, seen under `ancestors`, match?
    pub fn matches(&self, node: &Node, ancestors: &[&Node]) -> bool {
        if node.kind != self.kind {
            return false;
        }
        if let Some(k) = self.within {
            if !ancestors.iter().any(|a| a.kind == k) {
                return false;
            }
        }
        if let Some(k) = self.not_within {
            if ancestors.iter().any(|a| a.kind == k) {
                return false;
            }
        }
        if let Some(childless) = self.childless {
            if node.children.is_empty() != childless {
                return false;
            }
        }
        self.attrs.iter().all(|a| a.matches(node))
    }
}

#[derive(Debug)]
pub struct AttrMatcher {
    pub name: String,
    pub equals: Option<JsonValue>,
    pub matches: Option<Regex>,
    pub absent: bool,
}

impl AttrMatcher {
    fn matches(&self, node: &Node) -> bool {
        let value = node.attrs.get(&self.name);
        if self.absent {
            return value.is_none();
        }
        let Some(value) = value else {
            return false;
        };
        if let Some(expected) = &self.equals {
            return value == expected;
        }
        if let Some(re) = &self.matches {
            let text = match value {
                JsonValue::String(s) => s.clone(),
                other => other.to_string(),
            };
            return re.is_match(&text);
        }
        // presence-only predicate
        true
    }
}

#[derive(Debug, Default)]
/// Taint rule: sources, sanitizers and sinks as attribute patterns over
/// node kinds, never concrete instances.
pub struct TaintSpec {
    pub sources: Vec<TaintSource>,
    pub sanitizers: Vec<TaintSanitizer>,
    pub sinks: Vec<TaintSink>,
}

#[derive(Debug)]
pub struct TaintSource {
    pub call: Option<Regex>,
    pub name: Option<Regex>,
}

#[derive(Debug)]
pub struct TaintSanitizer {
    pub call: Regex,
    pub completeness: SanitizerCompleteness,
}

#[derive(Debug)]
pub struct TaintSink {
    pub call: Regex,
}

pub(crate) fn parse_rule_file(path: &Path, content: &str) -> Result<Vec<RuleDef>, RuleError> {
    let file = path.display().to_string();
    let parsed: RuleFile = match path.extension().and_then(|e| e.to_str()) {
        Some("json") => serde_json::from_str(content).map_err(|e| RuleError::Format {
            file: file.clone(),
            detail: e.to_string(),
        })?,
        _ => serde_yaml::from_str(content).map_err(|e| RuleError::Format {
            file: file.clone(),
            detail: e.to_string(),
        })?,
    };
    Ok(parsed.rules)
}

fn build_regex(id: &str, pattern: &str) -> Result<Regex, RuleError> {
    Regex::new(pattern).map_err(|e| RuleError::InvalidRulePattern {
        id: id.to_string(),
        detail: e.to_string(),
    })
}

/// Compiles one definition, validating severity, languages and every
/// pattern. All failures are load-time fatal.
pub fn compile(def: RuleDef, source_file: Option<String>) -> Result<CompiledRule, RuleError> {
    let id = def.id;
    let invalid = |detail: &str| RuleError::InvalidRulePattern {
        id: id.clone(),
        detail: detail.to_string(),
    };

    let severity = match def.severity.as_deref() {
        Some(s) => s
            .parse::<Severity>()
            .map_err(|e| invalid(&e))?,
        None => Severity::Warning,
    };
    let mut languages = Vec::new();
    for lang in &def.languages {
        languages.push(lang.parse::<Language>().map_err(|e| invalid(&e))?);
    }

    let matcher = match (def.kind, def.taint) {
        (Some(_), Some(_)) => {
            return Err(invalid("rule cannot be both a query and a taint rule"));
        }
        (None, None) => {
            return Err(invalid("rule needs either a node kind or a taint block"));
        }
        (Some(kind), None) => {
            let mut attrs = Vec::new();
            for cond in def.conditions {
                let picked =
                    usize::from(cond.equals.is_some()) + usize::from(cond.matches.is_some());
                if picked > 1 || (picked == 1 && cond.absent) {
                    return Err(invalid(
                        "a where clause takes at most one of equals/matches/absent",
                    ));
                }
                let matches = match cond.matches {
                    Some(p) => Some(build_regex(&id, &p)?),
                    None => None,
                };
                attrs.push(AttrMatcher {
                    name: cond.attr,
                    equals: cond.equals,
                    matches,
                    absent: cond.absent,
                });
            }
            MatcherKind::Query(NodeQuery {
                kind,
                within: def.within,
                not_within: def.not_within,
                childless: def.childless,
                attrs,
            })
        }
        (None, Some(taint)) => {
            if taint.sinks.is_empty() {
                return Err(invalid("taint rule declares no sinks"));
            }
            if taint.sources.is_empty() {
                return Err(invalid("taint rule declares no sources"));
            }
            let mut sources = Vec::new();
            for s in taint.sources {
                if s.call.is_none() && s.name.is_none() {
                    return Err(invalid("taint source needs a call or name pattern"));
                }
                sources.push(TaintSource {
                    call: s.call.map(|p| build_regex(&id, &p)).transpose()?,
                    name: s.name.map(|p| build_regex(&id, &p)).transpose()?,
                });
            }
            let mut sanitizers = Vec::new();
            for s in taint.sanitizers {
                sanitizers.push(TaintSanitizer {
                    call: build_regex(&id, &s.call)?,
                    completeness: s.completeness,
                });
            }
            let mut sinks = Vec::new();
            for s in taint.sinks {
                sinks.push(TaintSink {
                    call: build_regex(&id, &s.call)?,
                });
            }
            MatcherKind::Taint(TaintSpec {
                sources,
                sanitizers,
                sinks,
            })
        }
    };

    Ok(CompiledRule {
        id,
        severity,
        category: def.category.unwrap_or_else(|| "general".into()),
        message: def.message.unwrap_or_default(),
        remediation: def.remediation,
        languages,
        matcher,
        source_file,
    })
}
