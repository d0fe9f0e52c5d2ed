//! Integration tests for `flakelab collect`.
//!
//! Suite commands use `/bin/sh`, so the process-spawning tests are
//! unix-only. Argument validation is tested everywhere.

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::tempdir;

#[test]
fn collect_without_command_fails() {
    let dir = tempdir().unwrap();

    let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("flakelab"));
    cmd.current_dir(dir.path()).arg("collect").arg("--name").arg("all_flaky");

    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("no suite command"));
}

#[cfg(unix)]
mod unix {
    use super::*;
    use std::fs;

    #[test]
    fn collect_runs_suite_and_writes_receipt() {
        let dir = tempdir().unwrap();
        let report = dir.path().join("report.json");
        let out = dir.path().join("trials.json");

        // The stub suite writes a report claiming 9 of 10 tests passed.
        let script = format!(
            "echo '{{\"summary\": {{\"total\": 10, \"passed\": 9}}}}' > {}",
            report.display()
        );

        let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("flakelab"));
        cmd.arg("collect")
            .arg("--name")
            .arg("all_flaky")
            .arg("--runs")
            .arg("2")
            .arg("--seed")
            .arg("7")
            .arg("--report-file")
            .arg(&report)
            .arg("--out")
            .arg(&out)
            .arg("--")
            .arg("/bin/sh")
            .arg("-c")
            .arg(&script);

        cmd.assert()
            .success()
            .stdout(predicate::str::contains("all_flaky: 2 runs, 2 valid"));

        let receipt: serde_json::Value =
            serde_json::from_slice(&fs::read(&out).unwrap()).unwrap();

        assert_eq!(receipt["schema"].as_str(), Some("flakelab.trials.v1"));
        assert_eq!(receipt["suite"]["name"].as_str(), Some("all_flaky"));
        assert_eq!(receipt["suite"]["seeds"], serde_json::json!([7]));
        assert_eq!(receipt["trials"].as_array().map(Vec::len), Some(2));
        assert_eq!(receipt["trials"][0]["tests_passed"].as_u64(), Some(9));
        assert_eq!(receipt["trials"][0]["tests_total"].as_u64(), Some(10));
        assert!((receipt["stats"]["avg_pass_rate"].as_f64().unwrap() - 0.9).abs() < 1e-9);
    }

    #[test]
    fn collect_without_report_records_no_signal() {
        let dir = tempdir().unwrap();
        let out = dir.path().join("trials.json");

        let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("flakelab"));
        cmd.arg("collect")
            .arg("--name")
            .arg("stable_only")
            .arg("--runs")
            .arg("1")
            .arg("--seed")
            .arg("1")
            .arg("--out")
            .arg(&out)
            .arg("--")
            .arg("/bin/sh")
            .arg("-c")
            .arg("exit 0");

        // No --report-file: every run is a no-signal trial. Collection
        // still succeeds; the warning lands on stderr.
        cmd.assert()
            .success()
            .stderr(predicate::str::contains("no usable report"));

        let receipt: serde_json::Value =
            serde_json::from_slice(&fs::read(&out).unwrap()).unwrap();

        assert_eq!(receipt["trials"][0]["tests_total"].as_u64(), Some(0));
        assert!(receipt["trials"][0].get("pass_rate").is_none());
        assert_eq!(receipt["stats"]["valid_runs"].as_u64(), Some(0));
        assert_eq!(receipt["stats"]["total_runs"].as_u64(), Some(1));
    }

    #[test]
    fn collect_from_config_file() {
        let dir = tempdir().unwrap();
        let config = dir.path().join("flakelab.toml");
        let out = dir.path().join("trials.json");

        fs::write(
            &config,
            r#"
[defaults]
runs = 1
seeds = [5]

[[suite]]
name = "order"
command = ["/bin/sh", "-c", "exit 0"]
markers = "order_dependent"
"#,
        )
        .unwrap();

        let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("flakelab"));
        cmd.arg("collect")
            .arg("--name")
            .arg("order")
            .arg("--config")
            .arg(&config)
            .arg("--out")
            .arg(&out);

        cmd.assert().success();

        let receipt: serde_json::Value =
            serde_json::from_slice(&fs::read(&out).unwrap()).unwrap();

        assert_eq!(receipt["suite"]["markers"].as_str(), Some("order_dependent"));
        assert_eq!(receipt["suite"]["runs"].as_u64(), Some(1));
        assert_eq!(receipt["suite"]["seeds"], serde_json::json!([5]));
    }

    #[test]
    fn collect_unknown_config_suite_fails() {
        let dir = tempdir().unwrap();
        let config = dir.path().join("flakelab.toml");

        fs::write(
            &config,
            r#"
[[suite]]
name = "order"
command = ["/bin/sh", "-c", "exit 0"]
"#,
        )
        .unwrap();

        let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("flakelab"));
        cmd.arg("collect")
            .arg("--name")
            .arg("race")
            .arg("--config")
            .arg(&config)
            .arg("--out")
            .arg(dir.path().join("trials.json"));

        cmd.assert()
            .failure()
            .stderr(predicate::str::contains("not found"));
    }
}
