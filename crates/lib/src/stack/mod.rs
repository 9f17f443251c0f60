//! The stack handle and everything it orchestrates.
//!
//! A [`Stack`] is a name plus the collaborators needed to act on it. It keeps
//! no state between calls: existence and status are fetched fresh every time,
//! and event markers live only for the duration of one lifecycle operation.

pub mod events;
mod lifecycle;
pub mod lock;
pub mod parallel;
pub mod status;
pub mod types;

use std::fmt;
use std::sync::Arc;

use tracing::debug;

use crate::config::OrchestratorConfig;
use crate::error::StackError;
use crate::gateway::{GatewayError, StackGateway, ValidationReport};
use crate::template::{self, TemplateDiff};

pub use events::{Clock, EventSink, EventTracker, FixedClock, SystemClock};
pub use lock::{StackLockGuard, StackLocks};
pub use status::{StackStatus, StatusClass};
pub use types::{
  ApplyResult, OperationOptions, Outcome, StackAction, StackDescription, StackEvent, StackOutput, keys,
};

/// Handle to one named stack.
#[derive(Clone)]
pub struct Stack {
  name: String,
  gateway: Arc<dyn StackGateway>,
  config: OrchestratorConfig,
  clock: Arc<dyn Clock>,
  locks: StackLocks,
}

impl fmt::Debug for Stack {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("Stack")
      .field("name", &self.name)
      .field("config", &self.config)
      .finish_non_exhaustive()
  }
}

impl Stack {
  pub fn new(name: impl Into<String>, gateway: Arc<dyn StackGateway>) -> Self {
    Self {
      name: name.into(),
      gateway,
      config: OrchestratorConfig::default(),
      clock: Arc::new(SystemClock),
      locks: StackLocks::global(),
    }
  }

  pub fn with_config(mut self, config: OrchestratorConfig) -> Self {
    self.config = config;
    self
  }

  pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
    self.clock = clock;
    self
  }

  pub fn with_locks(mut self, locks: StackLocks) -> Self {
    self.locks = locks;
    self
  }

  pub fn name(&self) -> &str {
    &self.name
  }

  pub fn config(&self) -> &OrchestratorConfig {
    &self.config
  }

  /// Current status, fetched now. A missing stack is reported as
  /// [`StatusClass::NotCreated`], not as an error.
  pub async fn status(&self) -> Result<StackStatus, StackError> {
    Ok(match self.lookup().await? {
      Some(description) => StackStatus::new(&self.name, Some(description.status), description.status_reason),
      None => StackStatus::new(&self.name, None, None),
    })
  }

  pub async fn exists(&self) -> Result<bool, StackError> {
    Ok(self.lookup().await?.is_some())
  }

  /// Full description, `None` when the stack does not exist.
  pub async fn describe(&self) -> Result<Option<StackDescription>, StackError> {
    Ok(self.lookup().await?)
  }

  /// Stack outputs, empty when the stack does not exist.
  pub async fn outputs(&self) -> Result<Vec<StackOutput>, StackError> {
    Ok(self.lookup().await?.map(|d| d.outputs).unwrap_or_default())
  }

  /// Complete event history, oldest first.
  pub async fn events(&self) -> Result<Vec<StackEvent>, StackError> {
    match self.gateway.describe_events(&self.name, None).await {
      Ok(events) => Ok(EventTracker::new().absorb(&events)),
      Err(GatewayError::NotFound { .. }) => Ok(Vec::new()),
      Err(e) => Err(e.into()),
    }
  }

  /// Deployed template, normalized when `pretty` is set.
  pub async fn template(&self, pretty: bool) -> Result<Option<String>, StackError> {
    let body = match self.gateway.get_template(&self.name).await {
      Ok(body) => body,
      Err(GatewayError::NotFound { .. }) => None,
      Err(e) => return Err(e.into()),
    };
    Ok(body.map(|body| if pretty { template::normalize(&body) } else { body }))
  }

  /// Diff between the deployed template and `candidate`. Everything is an
  /// addition when the stack does not exist yet.
  pub async fn diff(&self, candidate: &str) -> Result<TemplateDiff, StackError> {
    let current = self.template(false).await?;
    debug!(stack = %self.name, deployed = current.is_some(), "computing template diff");
    Ok(TemplateDiff::between(current.as_deref(), candidate))
  }

  /// Ask the remote side to check the template in `options`.
  pub async fn validate(&self, options: &OperationOptions) -> Result<ValidationReport, StackError> {
    Ok(self.gateway.validate(&options.template_only()).await?)
  }

  async fn lookup(&self) -> Result<Option<StackDescription>, GatewayError> {
    match self.gateway.describe_stack(&self.name).await {
      Ok(description) => Ok(Some(description)),
      Err(GatewayError::NotFound { .. }) => Ok(None),
      Err(e) => Err(e),
    }
  }
}
