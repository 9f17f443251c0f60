//! Implementation of the `events` command.

use std::process::ExitCode;

use anyhow::{Context, Result};

use super::common::{Globals, connect, runtime};
use crate::output::{print_event, print_info, print_json};

/// Print the event history of a stack, oldest first.
pub fn cmd_events(globals: &Globals, name: &str) -> Result<ExitCode> {
  runtime()?.block_on(events(globals, name))
}

async fn events(globals: &Globals, name: &str) -> Result<ExitCode> {
  let stack = connect(globals, name, false).await;
  let events = stack
    .events()
    .await
    .with_context(|| format!("Failed to fetch events for stack '{name}'"))?;

  if globals.json {
    print_json(&events)?;
  } else if events.is_empty() {
    print_info(&format!("No events for stack '{name}'"));
  } else {
    events.iter().for_each(print_event);
  }
  Ok(ExitCode::SUCCESS)
}
