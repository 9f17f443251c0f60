//! Implementation of the `validate` command.

use std::process::ExitCode;

use anyhow::Result;

use stackctl_lib::{OperationOptions, StackError};

use super::common::{Globals, connect, load_template, runtime};
use crate::output::{print_error, print_json, print_stat, print_success, print_warning};

/// Ask the service to validate a template. Nothing is deployed.
pub fn cmd_validate(globals: &Globals, name: &str, template: &str) -> Result<ExitCode> {
  runtime()?.block_on(validate(globals, name, template))
}

async fn validate(globals: &Globals, name: &str, template: &str) -> Result<ExitCode> {
  let body = load_template(template).await?;
  let options = OperationOptions::new().with_template_body(body);
  let stack = connect(globals, name, false).await;

  let report = match stack.validate(&options).await {
    Ok(report) => report,
    Err(StackError::ValidationFailed { message }) => {
      print_error(&format!("Template '{template}' is invalid: {message}"));
      return Ok(ExitCode::FAILURE);
    }
    Err(e) => return Err(e.into()),
  };

  if globals.json {
    print_json(&report)?;
    return Ok(ExitCode::SUCCESS);
  }

  print_success(&format!("Template '{template}' is valid"));
  if let Some(description) = &report.description {
    print_stat("Description", description);
  }
  if !report.parameters.is_empty() {
    print_stat("Parameters", &report.parameters.join(", "));
  }
  if !report.capabilities.is_empty() {
    print_stat("Capabilities", &report.capabilities.join(", "));
    print_warning("Deploying this template requires acknowledging the capabilities above with --capability");
  }
  Ok(ExitCode::SUCCESS)
}
