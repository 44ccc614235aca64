use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use tempfile::TempDir;

fn thistle() -> Command {
    Command::cargo_bin("thistle").unwrap()
}

#[test]
fn verify_reports_counts_per_category() {
    let tmp = TempDir::new().unwrap();
    fs::write(
        tmp.path().join("rules.yaml"),
        r#"
rules:
  - id: a
    kind: call
    category: injection
    message: m
  - id: b
    kind: literal
    category: secret-detection
    message: m
"#,
    )
    .unwrap();
    thistle()
        .arg("rules")
        .arg("verify")
        .arg(tmp.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("2 rule(s) loaded"))
        .stdout(predicate::str::contains("injection"));
}

#[test]
fn verify_rejects_duplicate_ids() {
    let tmp = TempDir::new().unwrap();
    fs::write(
        tmp.path().join("rules.yaml"),
        "rules:\n  - id: dup\n    kind: call\n  - id: dup\n    kind: call\n",
    )
    .unwrap();
    thistle()
        .arg("rules")
        .arg("verify")
        .arg(tmp.path())
        .assert()
        .failure()
        .stderr(predicate::str::contains("duplicate rule id"));
}

#[test]
fn list_prints_ids_and_languages() {
    let tmp = TempDir::new().unwrap();
    fs::write(
        tmp.path().join("rules.yaml"),
        r#"
rules:
  - id: force-unwrap
    kind: unary-op
    languages: [swift]
    severity: warning
    category: null-safety
    message: m
"#,
    )
    .unwrap();
    thistle()
        .arg("rules")
        .arg("list")
        .arg(tmp.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("force-unwrap"))
        .stdout(predicate::str::contains("swift"));
}

#[test]
fn the_bundled_rule_pack_verifies() {
    let pack = std::path::Path::new(env!("CARGO_MANIFEST_DIR")).join("../../rules");
    thistle()
        .arg("rules")
        .arg("verify")
        .arg(&pack)
        .assert()
        .success()
        .stdout(predicate::str::contains("rule(s) loaded"));
}
