//! End-to-end scenarios: real JavaScript through the front end, rules
//! loaded from YAML, findings out of the engine.

use engine::{analyze_tree, AnalyzeOptions, Severity};
use ir::Language;
use loader::load_rules;
use std::fs;
use tempfile::TempDir;

const SCENARIO_RULES: &str = r#"
rules:
  - id: command-injection
    severity: critical
    category: injection
    message: user input reaches a shell command
    taint:
      sources:
        - name: "(?i)^userinput$"
        - call: "^readInput$"
      sinks:
        - call: "^(child\\.)?exec(Sync)?$"
  - id: hardcoded-secret
    severity: critical
    category: secret-detection
    message: hard-coded credential in source
    kind: literal
    where:
      - attr: value
        matches: "sk_(live|test)_[0-9A-Za-z]+"
"#;

fn rules_from(yaml: &str) -> loader::RuleSet {
    let tmp = TempDir::new().unwrap();
    fs::write(tmp.path().join("rules.yaml"), yaml).unwrap();
    load_rules(tmp.path()).unwrap()
}

fn analyze_js(src: &str, rules: &loader::RuleSet) -> Vec<engine::Finding> {
    let tree = parsers::parse_source(src, Language::Javascript, "scenario.js", None).unwrap();
    analyze_tree(&tree, rules, &AnalyzeOptions::default()).unwrap()
}

#[test]
fn command_injection_scenario_fires_at_the_sink() {
    let rules = rules_from(SCENARIO_RULES);
    let findings = analyze_js("const cmd = \"ls \" + userInput;\nexec(cmd);\n", &rules);
    assert_eq!(findings.len(), 1);
    assert_eq!(findings[0].rule_id, "command-injection");
    assert_eq!(findings[0].severity, Severity::Critical);
    assert_eq!(findings[0].line, 2);
    assert_eq!(findings[0].snippet, "exec(cmd);");
}

#[test]
fn hardcoded_secret_scenario_is_independent_of_taint() {
    let rules = rules_from(SCENARIO_RULES);
    let findings = analyze_js(
        "const API_KEY = 'sk_test_ABCDEFGHIJKLMNOP123456';\n",
        &rules,
    );
    assert_eq!(findings.len(), 1);
    assert_eq!(findings[0].rule_id, "hardcoded-secret");
    assert_eq!(findings[0].line, 1);
}

#[test]
fn clean_source_produces_no_findings() {
    let rules = rules_from(SCENARIO_RULES);
    let findings = analyze_js("const greeting = 'hello';\nconsole.log(greeting);\n", &rules);
    assert!(findings.is_empty());
}

#[test]
fn partial_sanitizer_before_eval_still_reports() {
    let eval_rules = |completeness: &str| {
        rules_from(&format!(
            r#"
rules:
  - id: eval-injection
    severity: critical
    category: injection
    message: user input reaches eval
    taint:
      sources:
        - call: "^readInput$"
      sanitizers:
        - call: "^stripSemis$"
          completeness: {completeness}
      sinks:
        - call: "^eval$"
"#
        ))
    };
    let src = "const expr = readInput();\nconst cleaned = stripSemis(expr);\neval(cleaned);\n";

    let partial = analyze_js(src, &eval_rules("partial"));
    assert_eq!(partial.len(), 1);
    assert_eq!(partial[0].rule_id, "eval-injection");
    assert_eq!(partial[0].line, 3);

    let full = analyze_js(src, &eval_rules("full"));
    assert!(full.is_empty());
}

#[test]
fn template_interpolation_reaches_the_sink() {
    let rules = rules_from(SCENARIO_RULES);
    let findings = analyze_js("exec(`ls ${userInput}`);\n", &rules);
    assert_eq!(findings.len(), 1);
    assert_eq!(findings[0].rule_id, "command-injection");
}
