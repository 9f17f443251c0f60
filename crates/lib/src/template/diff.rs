//! Line diff between the deployed and a candidate template.

use std::fmt;
use std::time::{Duration, Instant};

use serde::Serialize;
use similar::{Algorithm, DiffTag, capture_diff_slices_deadline};

use super::normalize;

/// Past this, the diff stays correct but may no longer be minimal.
const DIFF_DEADLINE: Duration = Duration::from_secs(2);

/// One line of a diff, tagged with how it changed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "line", rename_all = "snake_case")]
pub enum DiffLine {
  Unchanged(String),
  Added(String),
  Removed(String),
}

impl DiffLine {
  pub fn text(&self) -> &str {
    match self {
      DiffLine::Unchanged(line) | DiffLine::Added(line) | DiffLine::Removed(line) => line,
    }
  }

  pub fn prefix(&self) -> char {
    match self {
      DiffLine::Unchanged(_) => ' ',
      DiffLine::Added(_) => '+',
      DiffLine::Removed(_) => '-',
    }
  }

  pub fn is_change(&self) -> bool {
    !matches!(self, DiffLine::Unchanged(_))
  }

  fn same_kind(&self, other: &DiffLine) -> bool {
    std::mem::discriminant(self) == std::mem::discriminant(other)
  }
}

/// Consecutive lines of the same kind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DiffRun<'a> {
  Unchanged(Vec<&'a str>),
  Added(Vec<&'a str>),
  Removed(Vec<&'a str>),
}

/// Structured diff of two normalized templates.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TemplateDiff {
  lines: Vec<DiffLine>,
}

impl TemplateDiff {
  /// Diff the deployed template (`None` when the stack does not exist)
  /// against a candidate. Both sides are normalized first.
  pub fn between(current: Option<&str>, candidate: &str) -> Self {
    let current = current.map(normalize).unwrap_or_default();
    let candidate = normalize(candidate);
    Self::of_lines(&lines_of(&current), &lines_of(&candidate))
  }

  /// Diff two line sequences as given.
  pub fn of_lines(old: &[&str], new: &[&str]) -> Self {
    let deadline = Instant::now() + DIFF_DEADLINE;
    let ops = capture_diff_slices_deadline(Algorithm::Myers, old, new, Some(deadline));

    let mut lines = Vec::with_capacity(old.len().max(new.len()));
    for op in ops {
      let (tag, old_range, new_range) = op.as_tag_tuple();
      match tag {
        DiffTag::Equal => lines.extend(old[old_range].iter().map(|l| DiffLine::Unchanged(l.to_string()))),
        DiffTag::Delete => lines.extend(old[old_range].iter().map(|l| DiffLine::Removed(l.to_string()))),
        DiffTag::Insert => lines.extend(new[new_range].iter().map(|l| DiffLine::Added(l.to_string()))),
        DiffTag::Replace => {
          lines.extend(old[old_range].iter().map(|l| DiffLine::Removed(l.to_string())));
          lines.extend(new[new_range].iter().map(|l| DiffLine::Added(l.to_string())));
        }
      }
    }

    Self { lines }
  }

  pub fn lines(&self) -> &[DiffLine] {
    &self.lines
  }

  pub fn added(&self) -> usize {
    self.lines.iter().filter(|l| matches!(l, DiffLine::Added(_))).count()
  }

  pub fn removed(&self) -> usize {
    self.lines.iter().filter(|l| matches!(l, DiffLine::Removed(_))).count()
  }

  /// True when nothing was added or removed.
  pub fn is_empty(&self) -> bool {
    !self.lines.iter().any(DiffLine::is_change)
  }

  /// The diff grouped into runs of same-kind lines.
  pub fn runs(&self) -> Vec<DiffRun<'_>> {
    let mut runs = Vec::new();
    let mut start = 0;
    while start < self.lines.len() {
      let first = &self.lines[start];
      let end = start
        + self.lines[start..]
          .iter()
          .take_while(|line| line.same_kind(first))
          .count();
      let text: Vec<&str> = self.lines[start..end].iter().map(DiffLine::text).collect();
      runs.push(match first {
        DiffLine::Unchanged(_) => DiffRun::Unchanged(text),
        DiffLine::Added(_) => DiffRun::Added(text),
        DiffLine::Removed(_) => DiffRun::Removed(text),
      });
      start = end;
    }
    runs
  }

  /// Unified-diff rendering with `context` unchanged lines around each hunk.
  pub fn unified(&self, from: &str, to: &str, context: usize) -> String {
    let mut out = format!("--- {from}\n+++ {to}\n");

    for (start, end) in self.hunks(context) {
      let old_before = self.lines[..start].iter().filter(|l| !matches!(l, DiffLine::Added(_))).count();
      let new_before = self.lines[..start].iter().filter(|l| !matches!(l, DiffLine::Removed(_))).count();
      let hunk = &self.lines[start..end];
      let old_len = hunk.iter().filter(|l| !matches!(l, DiffLine::Added(_))).count();
      let new_len = hunk.iter().filter(|l| !matches!(l, DiffLine::Removed(_))).count();

      out.push_str(&format!(
        "@@ -{},{} +{},{} @@\n",
        hunk_start(old_before, old_len),
        old_len,
        hunk_start(new_before, new_len),
        new_len
      ));
      for line in hunk {
        out.push(line.prefix());
        out.push_str(line.text());
        out.push('\n');
      }
    }

    out
  }

  /// Index ranges of changed lines widened by `context`, overlapping ranges merged.
  fn hunks(&self, context: usize) -> Vec<(usize, usize)> {
    let mut hunks: Vec<(usize, usize)> = Vec::new();
    for (index, _) in self.lines.iter().enumerate().filter(|(_, line)| line.is_change()) {
      let start = index.saturating_sub(context);
      let end = (index + context + 1).min(self.lines.len());
      match hunks.last_mut() {
        Some(last) if start <= last.1 => last.1 = end,
        _ => hunks.push((start, end)),
      }
    }
    hunks
  }
}

impl fmt::Display for TemplateDiff {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    for line in &self.lines {
      writeln!(f, "{}{}", line.prefix(), line.text())?;
    }
    Ok(())
  }
}

// unified format numbers an empty side by the line before it
fn hunk_start(before: usize, len: usize) -> usize {
  if len == 0 { before } else { before + 1 }
}

fn lines_of(text: &str) -> Vec<&str> {
  if text.is_empty() { Vec::new() } else { text.lines().collect() }
}
