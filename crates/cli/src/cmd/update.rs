//! Implementation of the `update` command.

use std::process::ExitCode;
use std::time::Instant;

use anyhow::Result;

use stackctl_lib::StackEvent;

use super::common::{Globals, TemplateArgs, connect, exit_code, print_outputs, report, runtime};
use crate::output::{format_duration, print_event, print_stat};

/// Update an existing stack. "Nothing to update" is reported as skipped and
/// exits successfully.
pub fn cmd_update(globals: &Globals, name: &str, template: &TemplateArgs, skip_unchanged: bool) -> Result<ExitCode> {
  runtime()?.block_on(update(globals, name, template, skip_unchanged))
}

async fn update(globals: &Globals, name: &str, template: &TemplateArgs, skip_unchanged: bool) -> Result<ExitCode> {
  let options = template.options().await?;
  let stack = connect(globals, name, skip_unchanged).await;

  let started = Instant::now();
  let mut sink = |event: &StackEvent| print_event(event);
  let outcome = stack.update(&options, Some(&mut sink)).await;

  let ok = report("Update", name, &outcome);
  if !outcome.is_no_op() {
    print_stat("Elapsed", &format_duration(started.elapsed()));
  }
  if outcome.is_succeeded() {
    print_outputs(&stack).await?;
  }
  Ok(exit_code(ok))
}
