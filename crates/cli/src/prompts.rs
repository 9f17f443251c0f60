//! Confirmation prompts for destructive commands.

use std::io::{self, BufRead, IsTerminal, Write};

use anyhow::{Context, Result, bail};

/// Ask `message` on stderr and read a yes/no answer from stdin.
///
/// `force` answers yes without asking. Without a terminal there is nobody to
/// ask, so the command fails.
pub fn confirm(message: &str, force: bool) -> Result<bool> {
  if force {
    return Ok(true);
  }
  ensure_interactive(io::stdin().is_terminal() && io::stderr().is_terminal())?;

  let mut stderr = io::stderr().lock();
  write!(stderr, "{message} [y/N] ")?;
  stderr.flush()?;

  let mut input = String::new();
  io::stdin()
    .lock()
    .read_line(&mut input)
    .context("Failed to read confirmation")?;

  Ok(is_yes(&input))
}

fn ensure_interactive(interactive: bool) -> Result<()> {
  if !interactive {
    bail!("Cannot prompt for confirmation in non-interactive mode. Use --force to proceed.");
  }
  Ok(())
}

fn is_yes(answer: &str) -> bool {
  matches!(answer.trim().to_ascii_lowercase().as_str(), "y" | "yes")
}
