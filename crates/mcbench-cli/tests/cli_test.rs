use assert_cmd::Command;
use predicates::prelude::*;
use serde_json::Value;
use std::fs;
use std::io::Write;
use std::path::Path;
use tempfile::tempdir;

fn write_min_config(path: &Path) {
    let mut file = fs::File::create(path).unwrap();
    writeln!(
        file,
        r#"
run_name: smoke
seed: 7
providers:
  - provider: openai
    model: gpt-test
benchmark:
  dataset_path: "data/mmlu_subset/dev.jsonl"
  max_samples: 5
"#
    )
    .unwrap();
}

fn mcbench() -> Command {
    Command::new(assert_cmd::cargo::cargo_bin!("mcbench"))
}

#[test]
fn show_config_prints_parsed_configuration() {
    let dir = tempdir().unwrap();
    let config_path = dir.path().join("run.yaml");
    write_min_config(&config_path);

    let output = mcbench()
        .current_dir(dir.path())
        .arg("--config")
        .arg(&config_path)
        .arg("show-config")
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();

    let parsed: Value = serde_json::from_slice(&output).unwrap();
    assert_eq!(parsed["run_name"], "smoke");
    assert_eq!(parsed["seed"], 7);
    assert_eq!(parsed["providers"][0]["model"], "gpt-test");
    // Policy defaults are materialized even when the file omits them.
    assert_eq!(parsed["policy"]["reliability"]["retry"]["max_attempts"], 3);
}

#[test]
fn missing_config_is_a_hard_failure() {
    let dir = tempdir().unwrap();

    mcbench()
        .current_dir(dir.path())
        .arg("--config")
        .arg("does-not-exist.yaml")
        .arg("show-config")
        .assert()
        .failure()
        .stderr(predicate::str::contains("failed to load config"));
}

#[test]
fn config_without_providers_is_rejected() {
    let dir = tempdir().unwrap();
    let config_path = dir.path().join("run.yaml");
    fs::write(&config_path, "run_name: empty\nproviders: []\n").unwrap();

    mcbench()
        .current_dir(dir.path())
        .arg("--config")
        .arg(&config_path)
        .arg("show-config")
        .assert()
        .failure();
}

#[test]
fn report_renders_markdown_and_json_from_run_artifacts() {
    let dir = tempdir().unwrap();
    let config_path = dir.path().join("run.yaml");
    write_min_config(&config_path);

    let run_dir = dir.path().join("artifacts").join("runs").join("run1");
    fs::create_dir_all(&run_dir).unwrap();

    fs::write(
        run_dir.join("summary.json"),
        r#"{
  "run_id": "run1",
  "status": "completed",
  "total_requests": 2,
  "total_errors": 0,
  "provider_metrics": {
    "openai:gpt-test": {
      "requests": 2,
      "errors": 0,
      "correct": 1,
      "attempted": 2,
      "accuracy": 0.5
    }
  }
}"#,
    )
    .unwrap();

    let mut results = fs::File::create(run_dir.join("results.jsonl")).unwrap();
    for (sample_id, predicted, correct) in [("q1", "A", true), ("q2", "C", false)] {
        let row = serde_json::json!({
            "run_id": "run1",
            "system_id": "openai:gpt-test",
            "provider": "openai",
            "model": "gpt-test",
            "sample_id": sample_id,
            "category": "math",
            "request_fingerprint": format!("fp-{sample_id}"),
            "predicted": predicted,
            "expected": "A",
            "is_correct": correct,
            "latency_ms": 12,
            "usage": null,
            "response_text": predicted,
        });
        writeln!(results, "{row}").unwrap();
    }

    let reports_root = dir.path().join("reports");
    mcbench()
        .current_dir(dir.path())
        .arg("--config")
        .arg(&config_path)
        .arg("--artifacts-root")
        .arg(dir.path().join("artifacts"))
        .arg("report")
        .arg("--run-id")
        .arg("run1")
        .arg("--reports-root")
        .arg(&reports_root)
        .assert()
        .success()
        .stdout(predicate::str::contains("run1.md"));

    let markdown = fs::read_to_string(reports_root.join("run1.md")).unwrap();
    assert!(markdown.contains("openai:gpt-test"));
    assert!(markdown.contains("0.500"));

    let json: Value =
        serde_json::from_str(&fs::read_to_string(reports_root.join("run1.json")).unwrap()).unwrap();
    assert_eq!(json["run_id"], "run1");
    assert_eq!(
        json["scored"]["systems"]["openai:gpt-test"]["attempted"]
            .as_u64()
            .unwrap(),
        2
    );
}

#[test]
fn report_for_a_run_without_a_summary_fails_with_context() {
    let dir = tempdir().unwrap();
    let config_path = dir.path().join("run.yaml");
    write_min_config(&config_path);

    mcbench()
        .current_dir(dir.path())
        .arg("--config")
        .arg(&config_path)
        .arg("--artifacts-root")
        .arg(dir.path().join("artifacts"))
        .arg("report")
        .arg("--run-id")
        .arg("ghost")
        .assert()
        .failure()
        .stderr(predicate::str::contains("no summary found"));
}
