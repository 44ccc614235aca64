use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use tempfile::TempDir;

const RULES: &str = r#"
rules:
  - id: command-injection
    severity: critical
    category: injection
    message: user input reaches a shell command
    taint:
      sources:
        - name: "(?i)^userinput$"
      sinks:
        - call: "^exec$"
  - id: weak-random
    severity: warning
    category: weak-crypto
    message: non-crypto RNG
    kind: call
    where:
      - attr: callee
        matches: 'Math\.random'
"#;

fn setup(source: &str) -> (TempDir, std::path::PathBuf, std::path::PathBuf) {
    let tmp = TempDir::new().unwrap();
    let src_dir = tmp.path().join("src");
    fs::create_dir(&src_dir).unwrap();
    fs::write(src_dir.join("app.js"), source).unwrap();
    let rules = tmp.path().join("rules.yaml");
    fs::write(&rules, RULES).unwrap();
    (tmp, src_dir, rules)
}

fn thistle() -> Command {
    Command::cargo_bin("thistle").unwrap()
}

#[test]
fn critical_findings_fail_the_run() {
    let (_tmp, src, rules) = setup("exec(userInput);\n");
    thistle()
        .arg("scan")
        .arg(&src)
        .arg("--rules")
        .arg(&rules)
        .assert()
        .failure()
        .stdout(predicate::str::contains("command-injection"));
}

#[test]
fn clean_sources_exit_zero() {
    let (_tmp, src, rules) = setup("const x = 1;\nconsole.log(x);\n");
    thistle()
        .arg("scan")
        .arg(&src)
        .arg("--rules")
        .arg(&rules)
        .assert()
        .success()
        .stdout(predicate::str::contains("No issues found"));
}

#[test]
fn fail_on_threshold_is_configurable() {
    let (_tmp, src, rules) = setup("const t = Math.random();\n");
    // a warning does not trip the default critical threshold
    thistle()
        .arg("scan")
        .arg(&src)
        .arg("--rules")
        .arg(&rules)
        .assert()
        .success();
    // lowering the threshold makes it blocking
    thistle()
        .arg("scan")
        .arg(&src)
        .arg("--rules")
        .arg(&rules)
        .arg("--fail-on")
        .arg("warning")
        .assert()
        .failure();
}

#[test]
fn json_output_reports_parse_failures_separately() {
    let (_tmp, src, rules) = setup("exec(userInput);\n");
    fs::write(src.join("broken.js"), "function ( {{{\n").unwrap();

    let output = thistle()
        .arg("scan")
        .arg(&src)
        .arg("--rules")
        .arg(&rules)
        .arg("--format")
        .arg("json")
        .assert()
        .failure()
        .get_output()
        .stdout
        .clone();
    let value: serde_json::Value = serde_json::from_slice(&output).unwrap();
    assert_eq!(value["total"], 1);
    assert_eq!(value["findings"][0]["rule_id"], "command-injection");
    assert_eq!(value["failures"].as_array().unwrap().len(), 1);
    assert_eq!(value["failures"][0]["kind"], "parse");
}

#[test]
fn sarif_output_is_valid_json() {
    let (_tmp, src, rules) = setup("exec(userInput);\n");
    let output = thistle()
        .arg("scan")
        .arg(&src)
        .arg("--rules")
        .arg(&rules)
        .arg("--format")
        .arg("sarif")
        .assert()
        .failure()
        .get_output()
        .stdout
        .clone();
    let value: serde_json::Value = serde_json::from_slice(&output).unwrap();
    assert_eq!(value["version"], "2.1.0");
    assert_eq!(value["runs"][0]["tool"]["driver"]["name"], "Thistle");
}

#[test]
fn suppression_comments_are_honored() {
    let (_tmp, src, rules) = setup("exec(userInput); // thistle-ignore\n");
    thistle()
        .arg("scan")
        .arg(&src)
        .arg("--rules")
        .arg(&rules)
        .assert()
        .success();
}

#[test]
fn missing_rules_directory_is_fatal() {
    let (_tmp, src, _rules) = setup("const x = 1;\n");
    thistle()
        .arg("scan")
        .arg(&src)
        .arg("--rules")
        .arg("/nonexistent/rules")
        .assert()
        .failure()
        .stderr(predicate::str::contains("loading rules"));
}

#[test]
fn bad_rule_sets_fail_before_scanning() {
    let (tmp, src, _rules) = setup("const x = 1;\n");
    let bad = tmp.path().join("bad.yaml");
    fs::write(
        &bad,
        "rules:\n  - id: broken\n    kind: literal\n    where:\n      - attr: value\n        matches: '([unclosed'\n",
    )
    .unwrap();
    thistle()
        .arg("scan")
        .arg(&src)
        .arg("--rules")
        .arg(&bad)
        .assert()
        .failure()
        .stderr(predicate::str::contains("broken"));
}
