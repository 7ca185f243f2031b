//! CLI integration tests using assert_cmd.

use assert_cmd::Command;
use predicates::prelude::*;
use std::io::Write;

const ALBUM_SCORE: &str = "tests/fixtures/album_score.json";

fn rubric() -> Command {
    #[allow(deprecated)]
    Command::cargo_bin("rubric").unwrap()
}

#[test]
fn validate_reports_document_size() {
    rubric()
        .arg("validate")
        .arg(ALBUM_SCORE)
        .assert()
        .success()
        .stdout(predicate::str::contains("ok: 3 components, 2 leaves"));
}

#[test]
fn evaluate_fills_named_values() {
    let output = rubric()
        .args(["evaluate", ALBUM_SCORE])
        .args(["--value", "Production=8", "--value", "Lyrics=6"])
        .output()
        .unwrap();
    assert!(output.status.success());

    let evaluation: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(evaluation["grade"], 14.0);
    assert_eq!(evaluation["min"], 2.0);
    assert_eq!(evaluation["max"], 20.0);
    assert_eq!(evaluation["normalized"], 7.0);
}

#[test]
fn evaluate_rejects_out_of_range_value() {
    rubric()
        .args(["evaluate", ALBUM_SCORE, "--value", "Lyrics=10.6"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("is outside [1, 10]"));
}

#[test]
fn evaluate_rejects_unknown_leaf() {
    rubric()
        .args(["evaluate", ALBUM_SCORE, "--value", "Vocals=5"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Vocals"));
}

#[test]
fn flatten_prints_rows() {
    let output = rubric().args(["flatten", ALBUM_SCORE]).output().unwrap();
    assert!(output.status.success());

    let rows: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(rows["components"].as_array().unwrap().len(), 3);
    assert_eq!(rows["actions"][0]["operator"], "add");
    assert_eq!(rows["actions"][0]["operator_index"], 0);
}

#[test]
fn invalid_document_is_reported() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    write!(
        file,
        r#"{{ "kind": "block", "name": "Broken", "children": [
            {{ "kind": "grade", "name": "A", "min": 0, "max": 1, "step": 1 }},
            {{ "kind": "grade", "name": "B", "min": 0, "max": 1, "step": 1 }}
        ] }}"#
    )
    .unwrap();

    rubric()
        .arg("validate")
        .arg(file.path())
        .assert()
        .failure()
        .stderr(predicate::str::contains("invalid rubric document"));
}

#[test]
fn fill_error_names_document_and_cause() {
    rubric()
        .args(["evaluate", ALBUM_SCORE, "--value", "Lyrics=10.6"])
        .assert()
        .failure()
        .stderr(predicate::str::starts_with("Error: failed to fill `"))
        .stderr(predicate::str::contains("album_score.json`: value 10.6 is outside"));
}

#[test]
fn missing_config_reports_path() {
    rubric()
        .args(["--config", "/definitely/not/here/rubric.json", "validate", ALBUM_SCORE])
        .assert()
        .failure()
        .stderr(predicate::str::contains(
            "Error: failed to read config `/definitely/not/here/rubric.json`: ",
        ));
}

#[test]
fn inverted_range_document_reports_cause() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    write!(
        file,
        r#"{{ "kind": "grade", "name": "Solo", "min": 5, "max": 1, "step": 1 }}"#
    )
    .unwrap();

    rubric()
        .arg("validate")
        .arg(file.path())
        .assert()
        .failure()
        .stderr(predicate::str::contains("invalid rubric document"))
        .stderr(predicate::str::contains("requires min < max"));
}
