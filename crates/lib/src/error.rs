//! Caller-facing error taxonomy.

use thiserror::Error;

use crate::gateway::GatewayError;
use crate::template::resolve::ResolveError;

/// Errors returned by stack inspection operations and template resolution.
///
/// Lifecycle operations report remote failures as
/// [`Outcome::Failed`](crate::stack::Outcome) instead.
#[derive(Debug, Error)]
pub enum StackError {
  #[error("stack '{stack}' does not exist")]
  NotFound { stack: String },

  #[error("template source unavailable: {0}")]
  SourceUnavailable(#[from] ResolveError),

  #[error("validation failed: {message}")]
  ValidationFailed { message: String },

  #[error("gateway unavailable after {attempts} attempt(s): {message}")]
  Transient { attempts: u32, message: String },

  #[error("stack '{stack}' rolled back ({status}): {reason}")]
  RollbackDetected {
    stack: String,
    status: String,
    reason: String,
  },

  #[error(transparent)]
  Gateway(GatewayError),
}

impl From<GatewayError> for StackError {
  fn from(err: GatewayError) -> Self {
    match err {
      GatewayError::NotFound { stack } => StackError::NotFound { stack },
      GatewayError::Validation { message } => StackError::ValidationFailed { message },
      GatewayError::Transient { message } => StackError::Transient { attempts: 1, message },
      other => StackError::Gateway(other),
    }
  }
}

impl StackError {
  pub fn is_not_found(&self) -> bool {
    matches!(self, StackError::NotFound { .. })
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn gateway_errors_map_onto_taxonomy() {
    let err: StackError = GatewayError::NotFound { stack: "web".into() }.into();
    assert!(err.is_not_found());

    let err: StackError = GatewayError::Validation {
      message: "Template format error".into(),
    }
    .into();
    assert_eq!(err.to_string(), "validation failed: Template format error");

    let err: StackError = GatewayError::Transient {
      message: "throttled".into(),
    }
    .into();
    assert!(matches!(err, StackError::Transient { attempts: 1, .. }));

    let err: StackError = GatewayError::Remote {
      code: "AccessDenied".into(),
      message: "nope".into(),
    }
    .into();
    assert_eq!(err.to_string(), "AccessDenied: nope");
  }

  #[test]
  fn rollback_message_names_stack_and_reason() {
    let err = StackError::RollbackDetected {
      stack: "web-prod".into(),
      status: "UPDATE_ROLLBACK_COMPLETE".into(),
      reason: "Resource creation cancelled".into(),
    };
    assert_eq!(
      err.to_string(),
      "stack 'web-prod' rolled back (UPDATE_ROLLBACK_COMPLETE): Resource creation cancelled"
    );
  }
}
