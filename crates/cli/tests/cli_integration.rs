//! CLI integration tests for the `unmdx` binary.
//!
//! Uses `assert_cmd` to spawn the binary and verify exit codes, stdout
//! and stderr content. Inputs go through stdin or temp files so the
//! tests carry no fixture directory.

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use tempfile::TempDir;

fn unmdx() -> Command {
    Command::cargo_bin("unmdx").expect("binary exists")
}

const SIMPLE: &str = "SELECT {[Measures].[Sales Amount]} ON 0 FROM [Adventure Works]";

// ──────────────────────────────────────────────
// 1. Help and version
// ──────────────────────────────────────────────

#[test]
fn help_exits_0_with_description() {
    unmdx()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("MDX to DAX transcompiler"));
}

#[test]
fn version_subcommand_prints_version() {
    unmdx()
        .arg("version")
        .assert()
        .success()
        .stdout(predicate::str::contains("unmdx"));
}

#[test]
fn unknown_flag_is_a_usage_error() {
    unmdx()
        .args(["convert", "--definitely-not-a-flag"])
        .assert()
        .failure()
        .code(2);
}

// ──────────────────────────────────────────────
// 2. Convert subcommand
// ──────────────────────────────────────────────

#[test]
fn convert_from_stdin_prints_dax() {
    unmdx()
        .arg("convert")
        .write_stdin(SIMPLE)
        .assert()
        .success()
        .stdout(predicate::str::contains("EVALUATE"))
        .stdout(predicate::str::contains("{ [Sales Amount] }"));
}

#[test]
fn convert_from_file_to_file() {
    let tmp = TempDir::new().unwrap();
    let input = tmp.path().join("query.mdx");
    let output = tmp.path().join("query.dax");
    fs::write(&input, SIMPLE).unwrap();

    unmdx()
        .args(["convert", input.to_str().unwrap(), "-o", output.to_str().unwrap()])
        .assert()
        .success();

    let dax = fs::read_to_string(&output).unwrap();
    assert!(dax.contains("EVALUATE"));
}

#[test]
fn convert_invalid_mdx_exits_1_with_diagnostics() {
    unmdx()
        .arg("convert")
        .write_stdin("SELECT {[Measures].[X]} ON 0")
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("missing FROM clause"));
}

#[test]
fn convert_nonexistent_input_exits_1() {
    unmdx()
        .args(["convert", "no_such_file.mdx"])
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("cannot read"));
}

#[test]
fn convert_reports_warnings_on_stderr_but_succeeds() {
    unmdx()
        .arg("convert")
        .write_stdin(
            "SELECT {[Measures].[X], [Measures].[X]} ON 0 FROM [C]",
        )
        .assert()
        .success()
        .stderr(predicate::str::contains("duplicate_measure"));
}

#[test]
fn optimization_level_flag_is_accepted() {
    unmdx()
        .args(["convert", "--optimization-level", "aggressive"])
        .write_stdin(SIMPLE)
        .assert()
        .success();
}

#[test]
fn no_linter_flag_is_accepted() {
    unmdx()
        .args(["convert", "--no-linter"])
        .write_stdin(SIMPLE)
        .assert()
        .success()
        .stdout(predicate::str::contains("EVALUATE"));
}

// ──────────────────────────────────────────────
// 3. Explain subcommand
// ──────────────────────────────────────────────

#[test]
fn explain_defaults_to_sql_format() {
    unmdx()
        .arg("explain")
        .write_stdin(
            "SELECT {[Measures].[Sales]} ON 0, {[Product].[Category].Members} ON 1 FROM [C]",
        )
        .assert()
        .success()
        .stdout(predicate::str::contains("SELECT"))
        .stdout(predicate::str::contains("GROUP BY Category"));
}

#[test]
fn explain_natural_format() {
    unmdx()
        .args(["explain", "-f", "natural"])
        .write_stdin(SIMPLE)
        .assert()
        .success()
        .stdout(predicate::str::contains("This query calculates"));
}

#[test]
fn explain_json_format_is_parseable() {
    let output = unmdx()
        .args(["explain", "-f", "json"])
        .write_stdin(SIMPLE)
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();
    let v: serde_json::Value = serde_json::from_slice(&output).expect("valid json");
    assert_eq!(v["cube"]["name"], "Adventure Works");
}

#[test]
fn explain_include_dax_embeds_the_query() {
    unmdx()
        .args(["explain", "-f", "markdown", "--include-dax"])
        .write_stdin(SIMPLE)
        .assert()
        .success()
        .stdout(predicate::str::contains("```dax"))
        .stdout(predicate::str::contains("EVALUATE"));
}

// ──────────────────────────────────────────────
// 4. Configuration file and environment
// ──────────────────────────────────────────────

#[test]
fn json_config_file_is_honored() {
    let tmp = TempDir::new().unwrap();
    let config = tmp.path().join("unmdx.json");
    fs::write(&config, r#"{"dax": {"format_output": false}}"#).unwrap();

    unmdx()
        .args(["--config", config.to_str().unwrap(), "convert"])
        .write_stdin(
            "SELECT {[Measures].[X]} ON 0, {[Product].[Category].Members} ON 1 FROM [C]",
        )
        .assert()
        .success()
        .stdout(predicate::str::contains(
            "SUMMARIZECOLUMNS(Product[Category], \"X\", [X])",
        ));
}

#[test]
fn yaml_config_file_is_honored() {
    let tmp = TempDir::new().unwrap();
    let config = tmp.path().join("unmdx.yaml");
    fs::write(&config, "dax:\n  format_output: false\n").unwrap();

    unmdx()
        .args(["--config", config.to_str().unwrap(), "convert"])
        .write_stdin(
            "SELECT {[Measures].[X]} ON 0, {[Product].[Category].Members} ON 1 FROM [C]",
        )
        .assert()
        .success()
        .stdout(predicate::str::contains("SUMMARIZECOLUMNS(Product[Category]"));
}

#[test]
fn invalid_config_file_exits_1() {
    let tmp = TempDir::new().unwrap();
    let config = tmp.path().join("bad.json");
    fs::write(&config, "{not json").unwrap();

    unmdx()
        .args(["--config", config.to_str().unwrap(), "convert"])
        .write_stdin(SIMPLE)
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("invalid JSON config"));
}

#[test]
fn env_variable_overrides_config_file() {
    let tmp = TempDir::new().unwrap();
    let config = tmp.path().join("unmdx.json");
    fs::write(&config, r#"{"explanation": {"format": "sql"}}"#).unwrap();

    unmdx()
        .args(["--config", config.to_str().unwrap(), "explain"])
        .env("UNMDX_EXPLANATION_FORMAT", "natural")
        .write_stdin(SIMPLE)
        .assert()
        .success()
        .stdout(predicate::str::contains("This query calculates"));
}

#[test]
fn env_strict_mode_turns_warnings_into_failure() {
    unmdx()
        .arg("convert")
        .env("UNMDX_PARSER_STRICT_MODE", "true")
        .write_stdin("SELECT {[Measures].[X], [Measures].[X]} ON 0 FROM [C]")
        .assert()
        .failure()
        .code(1);
}
