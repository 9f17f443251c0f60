//! Implementation of the `status` and `outputs` commands.

use std::process::ExitCode;

use anyhow::{Context, Result};
use owo_colors::{OwoColorize, Stream};

use stackctl_lib::StatusClass;

use super::common::{Globals, connect, runtime};
use crate::output::{print_info, print_json, print_stat};

/// Show the current status of a stack.
///
/// Exits with failure when the stack does not exist or sits in a failed
/// state, so the command can gate scripts.
pub fn cmd_status(globals: &Globals, name: &str) -> Result<ExitCode> {
  runtime()?.block_on(status(globals, name))
}

/// Print the outputs of a stack as `key: value` lines.
pub fn cmd_outputs(globals: &Globals, name: &str) -> Result<ExitCode> {
  runtime()?.block_on(outputs(globals, name))
}

async fn status(globals: &Globals, name: &str) -> Result<ExitCode> {
  let stack = connect(globals, name, false).await;
  let status = stack
    .status()
    .await
    .with_context(|| format!("Failed to fetch status for stack '{name}'"))?;

  if globals.json {
    print_json(&status)?;
  } else {
    let raw = status.raw.as_deref().unwrap_or("NOT_CREATED");
    let styled = match status.class {
      StatusClass::Complete => raw.if_supports_color(Stream::Stdout, |s| s.green()).to_string(),
      StatusClass::InProgress => raw.if_supports_color(Stream::Stdout, |s| s.yellow()).to_string(),
      StatusClass::Failed | StatusClass::RollbackComplete => {
        raw.if_supports_color(Stream::Stdout, |s| s.red()).to_string()
      }
      StatusClass::NotCreated | StatusClass::Unknown => raw.to_string(),
    };
    println!("Stack: {name}");
    print_stat("Status", &styled);
    print_stat("Class", status.class.as_str());
    if let Some(reason) = &status.reason {
      print_stat("Reason", reason);
    }
  }

  let healthy = matches!(status.class, StatusClass::Complete | StatusClass::InProgress);
  Ok(if healthy { ExitCode::SUCCESS } else { ExitCode::FAILURE })
}

async fn outputs(globals: &Globals, name: &str) -> Result<ExitCode> {
  let stack = connect(globals, name, false).await;
  let outputs = stack
    .outputs()
    .await
    .with_context(|| format!("Failed to fetch outputs for stack '{name}'"))?;

  if globals.json {
    print_json(&outputs)?;
  } else if outputs.is_empty() {
    print_info(&format!("Stack '{name}' has no outputs"));
  } else {
    for output in &outputs {
      print_stat(&output.key, &output.value);
    }
  }
  Ok(ExitCode::SUCCESS)
}
