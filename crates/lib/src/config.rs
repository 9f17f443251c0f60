//! Orchestrator configuration.
//!
//! Defaults are tuned for CloudFormation, which rarely reports progress more
//! often than every few seconds. Every field can be overlaid from the
//! environment (see [`OrchestratorConfig::from_env`]) and again by CLI flags.

use std::time::Duration;

use tracing::warn;

use crate::consts::{ENV_MAX_RETRIES, ENV_POLL_INTERVAL, ENV_TIMEOUT};

/// Tuning knobs for the lifecycle poll loop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrchestratorConfig {
  /// Sleep between two polls of the remote status.
  pub poll_interval: Duration,

  /// Consecutive transient gateway failures tolerated while polling before
  /// the operation is reported as failed.
  pub max_transient_retries: u32,

  /// Optional client-side limit on a single poll loop. `None` waits for the
  /// remote side to reach a terminal state, however long that takes.
  pub timeout: Option<Duration>,

  /// When set, `update` compares the normalized current and candidate
  /// templates first and reports a no-op without calling the remote API.
  /// Only safe when parameters and tags are unchanged as well.
  pub skip_unchanged_templates: bool,
}

impl Default for OrchestratorConfig {
  fn default() -> Self {
    Self {
      poll_interval: Duration::from_secs(5),
      max_transient_retries: 3,
      timeout: None,
      skip_unchanged_templates: false,
    }
  }
}

impl OrchestratorConfig {
  /// Defaults overlaid with `STACKCTL_*` environment variables.
  pub fn from_env() -> Self {
    let mut config = Self::default();

    if let Some(secs) = read_env_u64(ENV_POLL_INTERVAL) {
      config.poll_interval = Duration::from_secs(secs);
    }
    if let Some(retries) = read_env_u64(ENV_MAX_RETRIES) {
      config.max_transient_retries = u32::try_from(retries).unwrap_or(u32::MAX);
    }
    if let Some(secs) = read_env_u64(ENV_TIMEOUT) {
      config.timeout = (secs > 0).then(|| Duration::from_secs(secs));
    }

    config
  }

  pub fn with_poll_interval(mut self, interval: Duration) -> Self {
    self.poll_interval = interval;
    self
  }

  pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
    self.timeout = timeout;
    self
  }

  pub fn with_max_transient_retries(mut self, retries: u32) -> Self {
    self.max_transient_retries = retries;
    self
  }

  pub fn with_skip_unchanged_templates(mut self, skip: bool) -> Self {
    self.skip_unchanged_templates = skip;
    self
  }
}

fn read_env_u64(name: &str) -> Option<u64> {
  let raw = std::env::var(name).ok()?;
  match raw.trim().parse::<u64>() {
    Ok(value) => Some(value),
    Err(_) => {
      warn!(var = name, value = %raw, "ignoring unparsable environment override");
      None
    }
  }
}
