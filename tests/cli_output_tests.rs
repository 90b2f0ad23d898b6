//! Integration tests for the lamp binary: output formats and options
#![allow(deprecated)] // suppress assert_cmd::Command::cargo_bin deprecation in tests

mod utils;

use predicates::prelude::*;
use std::fs;

fn lamp() -> assert_cmd::Command {
    assert_cmd::cargo::cargo_bin_cmd!("lamp")
}

#[test]
fn test_text_report() {
    lamp()
        .arg(utils::items())
        .arg(utils::values())
        .arg("0.05")
        .assert()
        .success()
        .stdout(predicate::str::contains("# LAMP ver."))
        .stdout(predicate::str::contains(
            "# P-value computing procedure: fisher (greater)",
        ))
        .stdout(predicate::str::contains(
            "# # of tested elements: 4, # of samples: 15, # of positive samples: 7",
        ))
        .stdout(predicate::str::contains(
            "Correction factor: 5 (# of target rows >= 5)",
        ))
        .stdout(predicate::str::contains("# # of significant combinations: 1"))
        .stdout(predicate::str::contains(
            "1\t0.006993\t0.034965\tTF1,TF2,TF3\t3\t5\t5",
        ))
        .stdout(predicate::str::contains("Time (sec.): Computing correction factor"));
}

#[test]
fn test_text_report_u_test() {
    lamp()
        .args(["-p", "u-test"])
        .arg(utils::items())
        .arg(utils::expression())
        .assert()
        .success()
        .stdout(predicate::str::contains("u-test (greater)"))
        .stdout(predicate::str::contains("z-score"))
        .stdout(predicate::str::contains("TF1,TF2,TF3\t3\t5\t2.510727"))
        .stdout(predicate::str::contains("# of positive samples").not());
}

#[test]
fn test_max_comb_option() {
    lamp()
        .args(["--max-comb", "2"])
        .arg(utils::items())
        .arg(utils::values())
        .assert()
        .success()
        .stdout(predicate::str::contains("# Maximum arity: 2"))
        .stdout(predicate::str::contains("# # of significant combinations: 3"))
        .stdout(predicate::str::contains("TF2,TF3\t2\t5\t5"));
}

#[test]
fn test_json_output_parses() {
    let output = lamp()
        .args(["--format", "json"])
        .arg(utils::items())
        .arg(utils::values())
        .output()
        .unwrap();
    assert!(output.status.success());

    let stdout = String::from_utf8_lossy(&output.stdout);
    let parsed: serde_json::Value = serde_json::from_str(&stdout).unwrap();
    assert_eq!(parsed["format"], "lamp-json-v1");
    assert_eq!(parsed["procedure"], "lamp");
    assert_eq!(parsed["run"]["positives"], 7);
    assert_eq!(parsed["correction"]["lambda"], 5);
    assert_eq!(parsed["correction"]["correction_factor"], 5);
    assert_eq!(parsed["correction"]["strategy"], "depth-first");

    let combinations = parsed["combinations"].as_array().unwrap();
    assert_eq!(combinations.len(), 1);
    assert_eq!(combinations[0]["items"], serde_json::json!(["TF1", "TF2", "TF3"]));
    assert_eq!(combinations[0]["statistic"]["kind"], "positive_count");
    assert_eq!(combinations[0]["statistic"]["value"], 5);
}

#[test]
fn test_csv_output() {
    lamp()
        .args(["--format", "csv"])
        .arg(utils::items())
        .arg(utils::values())
        .assert()
        .success()
        .stdout(predicate::str::starts_with(
            "rank,p_value,adjusted_p_value,combination,arity,support,statistic\n",
        ))
        .stdout(predicate::str::contains(",\"TF1,TF2,TF3\",3,5,5"));
}

#[test]
fn test_less_alternative_on_reversed_values() {
    lamp()
        .args(["--alternative", "less"])
        .arg(utils::items())
        .arg(utils::values_reversed())
        .assert()
        .success()
        .stdout(predicate::str::contains("fisher (less)"))
        .stdout(predicate::str::contains("TF1,TF2,TF3\t3\t5\t0"));
}

#[test]
fn test_single_combination_report() {
    lamp()
        .args(["--combination", "TF1,TF2"])
        .arg(utils::items())
        .arg(utils::values())
        .assert()
        .success()
        .stdout(predicate::str::contains(
            "Combination\tArity\t# of target rows\tRaw p-value",
        ))
        .stdout(predicate::str::contains("TF1,TF2\t2\t5\t0.006993\t5"));
}

#[test]
fn test_fastwy_report_and_distribution_file() {
    let workspace = utils::Workspace::new();
    let distribution = workspace.path("minp.tsv");

    lamp()
        .args(["-k", "25", "--min-p-dist"])
        .arg(&distribution)
        .arg(utils::items())
        .arg(utils::values())
        .assert()
        .success()
        .stdout(predicate::str::contains("# FastWY ver."))
        .stdout(predicate::str::contains("# # of permutations: 25"))
        .stdout(predicate::str::contains("# Adjusted significance level:"));

    let content = fs::read_to_string(&distribution).unwrap();
    let lines: Vec<&str> = content.lines().collect();
    assert_eq!(lines.len(), 26);
    assert!(lines[0].starts_with("Seed\tMinimum p-value"));
    assert!(lines[1].starts_with("0\t"));
}

#[test]
fn test_config_file_sets_defaults() {
    let workspace = utils::Workspace::new();
    let config = workspace.write(
        "lamp.toml",
        "method = \"u-test\"\nmax_arity = \"all\"\nalpha = 0.05\n",
    );

    lamp()
        .arg("--config")
        .arg(&config)
        .arg(utils::items())
        .arg(utils::expression())
        .assert()
        .success()
        .stdout(predicate::str::contains("u-test (greater)"));
}

#[test]
fn test_flag_overrides_config_file() {
    let workspace = utils::Workspace::new();
    let config = workspace.write("lamp.toml", "method = \"u-test\"\n");

    lamp()
        .arg("--config")
        .arg(&config)
        .args(["-p", "fisher"])
        .arg(utils::items())
        .arg(utils::values())
        .assert()
        .success()
        .stdout(predicate::str::contains("fisher (greater)"));
}

#[test]
fn test_unknown_config_key_fails() {
    let workspace = utils::Workspace::new();
    let config = workspace.write("lamp.toml", "significance = 0.05\n");

    lamp()
        .arg("--config")
        .arg(&config)
        .arg(utils::items())
        .arg(utils::values())
        .assert()
        .failure()
        .stderr(predicate::str::contains("Failed to parse TOML"));
}

#[test]
fn test_log_file_receives_debug_events() {
    let workspace = utils::Workspace::new();
    let log = workspace.path("run.log");

    lamp()
        .arg("-e")
        .arg(&log)
        .arg(utils::items())
        .arg(utils::values())
        .assert()
        .success();

    let content = fs::read_to_string(&log).unwrap();
    assert!(content.contains("selected minimum support"));
    assert!(content.contains("admissibility check"));
}

#[test]
fn test_missing_item_file_fails() {
    lamp()
        .arg("does-not-exist.csv")
        .arg(utils::values())
        .assert()
        .failure()
        .stderr(predicate::str::contains("does-not-exist.csv"));
}

#[test]
fn test_continuous_values_with_fisher_fail() {
    lamp()
        .arg(utils::items())
        .arg(utils::expression())
        .assert()
        .failure()
        .stderr(predicate::str::contains("LAMP run failed"))
        .stderr(predicate::str::contains("requires 0 or 1"));
}

#[test]
fn test_alpha_out_of_range_is_a_usage_error() {
    lamp()
        .arg(utils::items())
        .arg(utils::values())
        .arg("1.5")
        .assert()
        .failure()
        .stderr(predicate::str::contains("significance level must be in (0, 1]"));
}
