//! CLI output formatting utilities.
//!
//! Provides consistent formatting for terminal output: colored status
//! messages, stack events, template diffs and durations.

use std::time::Duration;

use anyhow::Context;
use owo_colors::{OwoColorize, Stream};

use stackctl_lib::{StackEvent, StatusClass};

pub mod symbols {
  pub const SUCCESS: &str = "✓";
  pub const ERROR: &str = "✗";
  pub const WARNING: &str = "⚠";
  pub const INFO: &str = "•";
}

pub fn format_duration(duration: Duration) -> String {
  let secs = duration.as_secs();
  let millis = duration.subsec_millis();

  if secs >= 60 {
    let mins = secs / 60;
    let remaining_secs = secs % 60;
    format!("{}m {}s", mins, remaining_secs)
  } else if secs > 0 {
    format!("{}.{:02}s", secs, millis / 10)
  } else {
    format!("{}ms", millis)
  }
}

/// `timestamp resource status reason`, one line per event.
pub fn format_event(event: &StackEvent) -> String {
  let timestamp = event.timestamp.format("%Y-%m-%d %H:%M:%S");
  match event.resource_status_reason.as_deref() {
    Some(reason) if !reason.is_empty() => format!(
      "{} {} {} {}",
      timestamp, event.logical_resource_id, event.resource_status, reason
    ),
    _ => format!("{} {} {}", timestamp, event.logical_resource_id, event.resource_status),
  }
}

pub fn print_event(event: &StackEvent) {
  print_event_line(event, format_event(event));
}

/// An event of one of several stacks running at once, prefixed with its stack.
pub fn print_stack_event(stack: &str, event: &StackEvent) {
  print_event_line(event, format!("[{stack}] {}", format_event(event)));
}

fn print_event_line(event: &StackEvent, line: String) {
  match StatusClass::classify(Some(&event.resource_status)) {
    StatusClass::Complete => println!("{}", line.if_supports_color(Stream::Stdout, |s| s.green())),
    StatusClass::InProgress => println!("{}", line.if_supports_color(Stream::Stdout, |s| s.yellow())),
    StatusClass::Failed | StatusClass::RollbackComplete => {
      println!("{}", line.if_supports_color(Stream::Stdout, |s| s.red()))
    }
    StatusClass::NotCreated | StatusClass::Unknown => println!("{}", line),
  }
}

/// Print a unified diff with added lines green and removed lines red.
pub fn print_diff(rendered: &str) {
  for line in rendered.lines() {
    if line.starts_with("---") || line.starts_with("+++") {
      println!("{}", line.if_supports_color(Stream::Stdout, |s| s.bold()));
    } else if line.starts_with("@@") {
      println!("{}", line.if_supports_color(Stream::Stdout, |s| s.cyan()));
    } else if line.starts_with('+') {
      println!("{}", line.if_supports_color(Stream::Stdout, |s| s.green()));
    } else if line.starts_with('-') {
      println!("{}", line.if_supports_color(Stream::Stdout, |s| s.red()));
    } else {
      println!("{}", line);
    }
  }
}

pub fn print_success(message: &str) {
  println!(
    "{} {}",
    symbols::SUCCESS.if_supports_color(Stream::Stdout, |s| s.green()),
    message
  );
}

pub fn print_error(message: &str) {
  eprintln!(
    "{} {}",
    symbols::ERROR.if_supports_color(Stream::Stderr, |s| s.red()),
    message.if_supports_color(Stream::Stderr, |s| s.red())
  );
}

pub fn print_warning(message: &str) {
  eprintln!(
    "{} {}",
    symbols::WARNING.if_supports_color(Stream::Stderr, |s| s.yellow()),
    message.if_supports_color(Stream::Stderr, |s| s.yellow())
  );
}

pub fn print_info(message: &str) {
  println!(
    "{} {}",
    symbols::INFO.if_supports_color(Stream::Stdout, |s| s.blue()),
    message
  );
}

pub fn print_stat(label: &str, value: &str) {
  println!(
    "  {}: {}",
    label.if_supports_color(Stream::Stdout, |s| s.dimmed()),
    value
  );
}

pub fn print_json<T: serde::Serialize>(value: &T) -> anyhow::Result<()> {
  let json = serde_json::to_string_pretty(value).context("Failed to serialize to JSON")?;
  println!("{}", json);
  Ok(())
}
