//! Boundary to the remote provisioning service.
//!
//! [`StackGateway`] is a thin translation layer: it initiates operations and
//! reports what the service says, without deciding anything. Mutations return
//! as soon as the service accepts them; completion is observed by polling.

pub mod cloudformation;
#[cfg(test)]
pub mod memory;

use async_trait::async_trait;
use serde::Serialize;
use thiserror::Error;

use crate::consts::NO_UPDATES_MESSAGES;
use crate::stack::types::{OperationOptions, StackDescription, StackEvent};

pub use cloudformation::CloudFormationGateway;

/// Errors reported by a gateway call.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum GatewayError {
  /// The stack does not exist.
  #[error("stack '{stack}' does not exist")]
  NotFound { stack: String },

  /// An update was rejected because it would change nothing.
  #[error("no changes: {message}")]
  NoChanges { message: String },

  /// The request was rejected synchronously (bad template, bad parameters).
  #[error("validation failed: {message}")]
  Validation { message: String },

  /// Network, throttling or credential refresh problem. Worth retrying.
  #[error("transient gateway error: {message}")]
  Transient { message: String },

  /// Any other error surfaced by the service.
  #[error("{code}: {message}")]
  Remote { code: String, message: String },
}

impl GatewayError {
  pub fn is_transient(&self) -> bool {
    matches!(self, GatewayError::Transient { .. })
  }

  pub fn is_not_found(&self) -> bool {
    matches!(self, GatewayError::NotFound { .. })
  }

  /// The human-readable part, without the variant prefix.
  pub fn message(&self) -> String {
    match self {
      GatewayError::NotFound { stack } => format!("stack '{stack}' does not exist"),
      GatewayError::NoChanges { message }
      | GatewayError::Validation { message }
      | GatewayError::Transient { message }
      | GatewayError::Remote { message, .. } => message.clone(),
    }
  }
}

/// Outcome of a template validation call.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct ValidationReport {
  pub description: Option<String>,
  pub parameters: Vec<String>,
  pub capabilities: Vec<String>,
}

/// Decides whether a remote error message means "nothing to update".
///
/// The service signals this through error text only, so matching is kept in
/// one overridable place.
#[derive(Debug, Clone)]
pub struct NoOpDetector {
  fragments: Vec<String>,
}

impl Default for NoOpDetector {
  fn default() -> Self {
    Self::new(NO_UPDATES_MESSAGES.iter().copied())
  }
}

impl NoOpDetector {
  pub fn new<I, S>(fragments: I) -> Self
  where
    I: IntoIterator<Item = S>,
    S: Into<String>,
  {
    Self {
      fragments: fragments.into_iter().map(Into::into).collect(),
    }
  }

  pub fn matches(&self, message: &str) -> bool {
    self.fragments.iter().any(|fragment| message.contains(fragment.as_str()))
  }
}

/// Operations offered by a provisioning backend, all scoped to one stack name.
#[async_trait]
pub trait StackGateway: Send + Sync {
  /// Start creating the stack.
  async fn create(&self, name: &str, options: &OperationOptions) -> Result<(), GatewayError>;

  /// Start updating the stack. Returns [`GatewayError::NoChanges`] when the
  /// service decides there is nothing to do.
  async fn update(&self, name: &str, options: &OperationOptions) -> Result<(), GatewayError>;

  /// Start deleting the stack. Succeeds silently when it does not exist.
  async fn delete(&self, name: &str) -> Result<(), GatewayError>;

  /// Describe the stack, or [`GatewayError::NotFound`].
  async fn describe_stack(&self, name: &str) -> Result<StackDescription, GatewayError>;

  /// Events for the stack, most recent first. With `since`, fetching may
  /// stop once the event with that id has been returned; without it the
  /// whole history is listed. May repeat events across calls; callers
  /// deduplicate.
  async fn describe_events(&self, name: &str, since: Option<&str>) -> Result<Vec<StackEvent>, GatewayError>;

  /// The newest event, if the stack has any.
  async fn latest_event(&self, name: &str) -> Result<Option<StackEvent>, GatewayError> {
    Ok(self.describe_events(name, None).await?.into_iter().next())
  }

  /// The template body currently deployed, `None` when the stack is absent.
  async fn get_template(&self, name: &str) -> Result<Option<String>, GatewayError>;

  /// Check a template without side effects.
  async fn validate(&self, options: &OperationOptions) -> Result<ValidationReport, GatewayError>;

  /// Raw status string, or [`GatewayError::NotFound`].
  async fn describe_status(&self, name: &str) -> Result<String, GatewayError> {
    self.describe_stack(name).await.map(|description| description.status)
  }
}
