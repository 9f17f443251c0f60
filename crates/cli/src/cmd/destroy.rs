//! Implementation of the `delete` command.
//!
//! Deleting a stack that does not exist succeeds without calling the service.

use std::process::ExitCode;
use std::sync::Arc;
use std::time::Instant;

use anyhow::Result;

use stackctl_lib::stack::parallel::{Job, JobKind, run_all_observed};
use stackctl_lib::{OperationOptions, Stack, StackEvent};

use super::common::{Globals, config, exit_code, gateway, report, runtime};
use crate::output::{format_duration, print_event, print_info, print_stack_event, print_stat};
use crate::prompts::confirm;

/// Delete one or more stacks after confirmation.
pub fn cmd_delete(globals: &Globals, names: &[String], force: bool, parallelism: usize) -> Result<ExitCode> {
  let prompt = match names {
    [name] => format!("Delete stack '{name}' and all of its resources?"),
    _ => format!("Delete {} stacks ({}) and all of their resources?", names.len(), names.join(", ")),
  };
  if !confirm(&prompt, force)? {
    print_info("Aborted.");
    return Ok(ExitCode::SUCCESS);
  }

  runtime()?.block_on(delete(globals, names, parallelism))
}

async fn delete(globals: &Globals, names: &[String], parallelism: usize) -> Result<ExitCode> {
  let gateway = gateway(globals).await;
  let config = config(globals, false);

  if let [name] = names {
    let stack = Stack::new(name, gateway).with_config(config);
    let started = Instant::now();
    let mut sink = |event: &StackEvent| print_event(event);
    let outcome = stack.delete(Some(&mut sink)).await;

    let ok = report("Delete", name, &outcome);
    print_stat("Elapsed", &format_duration(started.elapsed()));
    return Ok(exit_code(ok));
  }

  let jobs = names
    .iter()
    .map(|name| {
      let stack = Stack::new(name, gateway.clone()).with_config(config.clone());
      Job::new(stack, JobKind::Delete, OperationOptions::new())
    })
    .collect();

  let mut ok = true;
  for (name, outcome) in run_all_observed(jobs, parallelism, Arc::new(print_stack_event)).await {
    ok &= report("Delete", &name, &outcome);
  }
  Ok(exit_code(ok))
}
