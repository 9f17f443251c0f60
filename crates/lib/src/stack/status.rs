//! Classification of raw remote status strings.
//!
//! The provisioning service reports free-form status names grouped in
//! families (`CREATE_IN_PROGRESS`, `UPDATE_FAILED`, ...). Everything the
//! orchestrator decides is driven by [`StatusClass`], so a new remote status
//! only ever needs a rule here.

use std::fmt;

use serde::Serialize;

/// Semantic state of a stack.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StatusClass {
  NotCreated,
  InProgress,
  Complete,
  Failed,
  /// The remote side undid a failed create/update. Reported as complete by
  /// the service, treated as a failure here.
  RollbackComplete,
  Unknown,
}

impl StatusClass {
  /// Classify a raw status. `None` means the stack does not exist.
  pub fn classify(raw: Option<&str>) -> Self {
    let Some(raw) = raw else {
      return StatusClass::NotCreated;
    };

    // Order matters: `UPDATE_ROLLBACK_COMPLETE_CLEANUP_IN_PROGRESS` is still
    // running, and every `*ROLLBACK_COMPLETE` also ends in `_COMPLETE`.
    if raw.ends_with("_IN_PROGRESS") {
      StatusClass::InProgress
    } else if raw.ends_with("_FAILED") {
      StatusClass::Failed
    } else if raw == "ROLLBACK_COMPLETE" || raw.ends_with("_ROLLBACK_COMPLETE") {
      StatusClass::RollbackComplete
    } else if raw.ends_with("_COMPLETE") {
      StatusClass::Complete
    } else {
      StatusClass::Unknown
    }
  }

  /// Whether no further transition happens without a new operation.
  pub fn is_terminal(self) -> bool {
    !matches!(self, StatusClass::InProgress)
  }

  /// Whether a terminal state means the operation worked.
  ///
  /// `None` for non-terminal states and for `NotCreated`, whose meaning
  /// depends on the operation (success for delete, failure otherwise).
  pub fn is_success(self) -> Option<bool> {
    match self {
      StatusClass::Complete => Some(true),
      StatusClass::Failed | StatusClass::RollbackComplete | StatusClass::Unknown => Some(false),
      StatusClass::InProgress | StatusClass::NotCreated => None,
    }
  }

  pub fn as_str(self) -> &'static str {
    match self {
      StatusClass::NotCreated => "not created",
      StatusClass::InProgress => "in progress",
      StatusClass::Complete => "complete",
      StatusClass::Failed => "failed",
      StatusClass::RollbackComplete => "rolled back",
      StatusClass::Unknown => "unknown",
    }
  }
}

impl fmt::Display for StatusClass {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

/// Current status of a stack as seen by the caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StackStatus {
  pub name: String,
  /// Raw status string, `None` when the stack does not exist.
  pub raw: Option<String>,
  pub class: StatusClass,
  pub reason: Option<String>,
}

impl StackStatus {
  pub fn new(name: impl Into<String>, raw: Option<String>, reason: Option<String>) -> Self {
    let class = StatusClass::classify(raw.as_deref());
    Self {
      name: name.into(),
      raw,
      class,
      reason,
    }
  }

  pub fn exists(&self) -> bool {
    self.class != StatusClass::NotCreated
  }
}

impl fmt::Display for StackStatus {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match (&self.raw, &self.reason) {
      (None, _) => write!(f, "Stack '{}' does not exist", self.name),
      (Some(raw), Some(reason)) => write!(f, "Stack '{}' has status {} ({})", self.name, raw, reason),
      (Some(raw), None) => write!(f, "Stack '{}' has status {}", self.name, raw),
    }
  }
}
