//! Implementation of the `apply`, `create` and `recreate` commands.
//!
//! Each resolves the template before touching the service, streams stack
//! events while waiting, and prints outputs once the stack is up.

use std::process::ExitCode;
use std::sync::Arc;
use std::time::Instant;

use anyhow::Result;

use stackctl_lib::stack::parallel::{Job, JobKind, run_all_observed};
use stackctl_lib::{Stack, StackEvent};

use super::common::{Globals, TemplateArgs, config, connect, exit_code, gateway, print_outputs, report, runtime};
use crate::output::{format_duration, print_event, print_info, print_stack_event, print_stat};
use crate::prompts::confirm;

/// Create or update one or more stacks from the same template.
///
/// A single stack streams its events to stdout. Several stacks run
/// concurrently, at most `parallelism` at a time, with each event prefixed
/// by the stack it belongs to.
pub fn cmd_apply(
  globals: &Globals,
  names: &[String],
  template: &TemplateArgs,
  skip_unchanged: bool,
  parallelism: usize,
) -> Result<ExitCode> {
  runtime()?.block_on(apply(globals, names, template, skip_unchanged, parallelism))
}

/// Create a stack that must not exist yet.
pub fn cmd_create(globals: &Globals, name: &str, template: &TemplateArgs) -> Result<ExitCode> {
  runtime()?.block_on(create(globals, name, template))
}

/// Delete (if present) and create a stack again, after confirmation.
pub fn cmd_recreate(globals: &Globals, name: &str, template: &TemplateArgs, force: bool) -> Result<ExitCode> {
  runtime()?.block_on(recreate(globals, name, template, force))
}

async fn apply(
  globals: &Globals,
  names: &[String],
  template: &TemplateArgs,
  skip_unchanged: bool,
  parallelism: usize,
) -> Result<ExitCode> {
  let options = template.options().await?;

  if let [name] = names {
    let stack = connect(globals, name, skip_unchanged).await;
    let started = Instant::now();
    let mut sink = |event: &StackEvent| print_event(event);
    let result = stack.create_or_update(&options, Some(&mut sink)).await;

    let action = result.action.map_or("Apply", |action| action.as_str());
    let ok = report(action, name, &result.outcome);
    print_stat("Elapsed", &format_duration(started.elapsed()));
    if result.outcome.is_succeeded() {
      print_outputs(&stack).await?;
    }
    return Ok(exit_code(ok));
  }

  let gateway = gateway(globals).await;
  let config = config(globals, skip_unchanged);
  let jobs = names
    .iter()
    .map(|name| {
      let stack = Stack::new(name, gateway.clone()).with_config(config.clone());
      Job::new(stack, JobKind::CreateOrUpdate, options.clone())
    })
    .collect();

  print_info(&format!("Applying {} stacks", names.len()));
  let mut ok = true;
  for (name, outcome) in run_all_observed(jobs, parallelism, Arc::new(print_stack_event)).await {
    ok &= report("Apply", &name, &outcome);
  }
  Ok(exit_code(ok))
}

async fn create(globals: &Globals, name: &str, template: &TemplateArgs) -> Result<ExitCode> {
  let options = template.options().await?;
  let stack = connect(globals, name, false).await;

  let started = Instant::now();
  let mut sink = |event: &StackEvent| print_event(event);
  let outcome = stack.create(&options, Some(&mut sink)).await;

  let ok = report("Create", name, &outcome);
  print_stat("Elapsed", &format_duration(started.elapsed()));
  if outcome.is_succeeded() {
    print_outputs(&stack).await?;
  }
  Ok(exit_code(ok))
}

async fn recreate(globals: &Globals, name: &str, template: &TemplateArgs, force: bool) -> Result<ExitCode> {
  let options = template.options().await?;

  let prompt = format!("Recreate stack '{name}'? All of its resources will be deleted first.");
  if !confirm(&prompt, force)? {
    print_info("Aborted.");
    return Ok(ExitCode::SUCCESS);
  }

  let stack = connect(globals, name, false).await;
  let started = Instant::now();
  let mut sink = |event: &StackEvent| print_event(event);
  let outcome = stack.recreate(&options, Some(&mut sink)).await;

  let ok = report("Recreate", name, &outcome);
  print_stat("Elapsed", &format_duration(started.elapsed()));
  if outcome.is_succeeded() {
    print_outputs(&stack).await?;
  }
  Ok(exit_code(ok))
}
