//! Implementation of the `diff` command.

use std::process::ExitCode;

use anyhow::{Context, Result};

use super::common::{Globals, connect, load_template, runtime};
use crate::output::{print_diff, print_info, print_json, print_stat};

/// Compare a candidate template against the deployed one.
///
/// Both sides are normalized first, so key order and whitespace never show
/// up as changes. A stack that does not exist diffs against nothing.
pub fn cmd_diff(globals: &Globals, name: &str, template: &str, context: usize) -> Result<ExitCode> {
  runtime()?.block_on(diff(globals, name, template, context))
}

async fn diff(globals: &Globals, name: &str, template: &str, context: usize) -> Result<ExitCode> {
  let candidate = load_template(template).await?;
  let stack = connect(globals, name, false).await;
  let diff = stack
    .diff(&candidate)
    .await
    .with_context(|| format!("Failed to diff stack '{name}'"))?;

  if globals.json {
    print_json(&diff)?;
    return Ok(ExitCode::SUCCESS);
  }

  if diff.is_empty() {
    print_info(&format!("No changes for stack '{name}'"));
    return Ok(ExitCode::SUCCESS);
  }

  print_diff(&diff.unified(&format!("{name} (deployed)"), template, context));
  println!();
  print_stat("Added", &diff.added().to_string());
  print_stat("Removed", &diff.removed().to_string());
  Ok(ExitCode::SUCCESS)
}
