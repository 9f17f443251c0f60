//! Implementation of the `show` command.

use std::process::ExitCode;

use anyhow::{Context, Result};

use super::common::{Globals, connect, runtime};
use crate::output::print_error;

/// Print the deployed template, normalized unless `raw` is set.
pub fn cmd_show(globals: &Globals, name: &str, raw: bool) -> Result<ExitCode> {
  runtime()?.block_on(show(globals, name, raw))
}

async fn show(globals: &Globals, name: &str, raw: bool) -> Result<ExitCode> {
  let stack = connect(globals, name, false).await;
  let template = stack
    .template(!raw)
    .await
    .with_context(|| format!("Failed to fetch template for stack '{name}'"))?;

  match template {
    Some(body) => {
      println!("{body}");
      Ok(ExitCode::SUCCESS)
    }
    None => {
      print_error(&format!("Stack '{name}' does not exist"));
      Ok(ExitCode::FAILURE)
    }
  }
}
