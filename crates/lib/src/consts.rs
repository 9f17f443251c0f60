//! Crate-wide constants.

/// Sent to AWS as the user agent application name.
pub const APP_NAME: &str = "stackctl";

/// Environment variable overriding the poll interval, in whole seconds.
pub const ENV_POLL_INTERVAL: &str = "STACKCTL_POLL_INTERVAL_SECS";

/// Environment variable overriding the transient retry budget.
pub const ENV_MAX_RETRIES: &str = "STACKCTL_MAX_RETRIES";

/// Environment variable setting a client-side operation timeout, in whole seconds.
pub const ENV_TIMEOUT: &str = "STACKCTL_TIMEOUT_SECS";

/// Message fragments CloudFormation uses to say an update has nothing to do.
pub const NO_UPDATES_MESSAGES: &[&str] = &["No updates are to be performed"];

/// Message fragment CloudFormation uses when a stack does not exist.
pub const STACK_MISSING_MESSAGE: &str = "does not exist";
