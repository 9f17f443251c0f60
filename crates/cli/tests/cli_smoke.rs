//! CLI smoke tests for stackctl.
//!
//! These run the binary without AWS credentials, so they only cover paths
//! that finish before the first service call: argument parsing, template
//! loading and confirmation prompts.

use assert_cmd::Command;
use assert_cmd::cargo::cargo_bin_cmd;
use predicates::prelude::*;
use tempfile::TempDir;

fn stackctl() -> Command {
  let mut cmd = cargo_bin_cmd!("stackctl");
  cmd.env_remove("RUST_LOG").env("NO_COLOR", "1");
  cmd
}

fn temp_template(content: &str) -> (TempDir, String) {
  let temp = TempDir::new().unwrap();
  let path = temp.path().join("template.json");
  std::fs::write(&path, content).unwrap();
  let path = path.to_string_lossy().into_owned();
  (temp, path)
}

const TEMPLATE: &str = r#"{"Resources": {"Bucket": {"Type": "AWS::S3::Bucket"}}}"#;

// =============================================================================
// Help & Version
// =============================================================================

#[test]
fn help_flag_works() {
  stackctl()
    .arg("--help")
    .assert()
    .success()
    .stdout(predicate::str::contains("Usage"));
}

#[test]
fn version_flag_works() {
  stackctl()
    .arg("--version")
    .assert()
    .success()
    .stdout(predicate::str::contains("stackctl"));
}

#[test]
fn every_subcommand_has_help() {
  for sub in [
    "apply", "create", "update", "delete", "recreate", "diff", "events", "status", "show", "validate", "outputs",
  ] {
    stackctl()
      .args([sub, "--help"])
      .assert()
      .success()
      .stdout(predicate::str::contains("Usage"));
  }
}

#[test]
fn no_subcommand_fails() {
  stackctl().assert().failure();
}

// =============================================================================
// Argument validation
// =============================================================================

#[test]
fn apply_requires_a_stack_name() {
  stackctl()
    .args(["apply", "--template", TEMPLATE])
    .assert()
    .failure()
    .stderr(predicate::str::contains("required"));
}

#[test]
fn deploy_commands_require_a_template() {
  stackctl()
    .args(["create", "web"])
    .assert()
    .failure()
    .stderr(predicate::str::contains("--template"));
}

#[test]
fn malformed_parameter_is_rejected() {
  stackctl()
    .args(["create", "web", "--template", TEMPLATE, "--param", "novalue"])
    .assert()
    .failure()
    .stderr(predicate::str::contains("expected KEY=VALUE"));
}

#[test]
fn malformed_duration_is_rejected() {
  stackctl()
    .args(["--poll-interval", "soon", "status", "web"])
    .assert()
    .failure()
    .stderr(predicate::str::contains("poll-interval"));
}

// =============================================================================
// Template loading
// =============================================================================

#[test]
fn missing_template_file_fails_before_any_service_call() {
  let temp = TempDir::new().unwrap();
  let missing = temp.path().join("missing.json");

  stackctl()
    .args(["create", "web", "--template"])
    .arg(&missing)
    .assert()
    .failure()
    .stderr(predicate::str::contains("template file not found"));
}

#[test]
fn unsupported_locator_scheme_fails() {
  stackctl()
    .args(["update", "web", "--template", "s3://bucket/template.json"])
    .assert()
    .failure()
    .stderr(predicate::str::contains("invalid template locator"));
}

// =============================================================================
// Confirmation
// =============================================================================

#[test]
fn delete_without_force_fails_in_non_interactive_mode() {
  stackctl()
    .args(["delete", "web"])
    .assert()
    .failure()
    .stderr(predicate::str::contains("Cannot prompt for confirmation in non-interactive mode"));
}

#[test]
fn delete_many_without_force_fails_in_non_interactive_mode() {
  stackctl()
    .args(["delete", "web", "worker", "-p", "2"])
    .assert()
    .failure()
    .stderr(predicate::str::contains("--force"));
}

#[test]
fn recreate_loads_template_before_prompting() {
  let (_temp, path) = temp_template(TEMPLATE);

  stackctl()
    .args(["recreate", "web", "--template", &path])
    .assert()
    .failure()
    .stderr(predicate::str::contains("non-interactive"));
}
