//! Pieces shared by every command: global flags, template arguments, the
//! async runtime and result reporting.

use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Args;
use tokio::runtime::Runtime;

use stackctl_lib::template::resolve::{resolve, resolve_parameter};
use stackctl_lib::{CloudFormationGateway, OperationOptions, OrchestratorConfig, Outcome, Stack, StackGateway};

use crate::output::{print_error, print_info, print_stat, print_success};

/// Flags accepted by every command.
#[derive(Debug, Clone, Default)]
pub struct Globals {
  pub region: Option<String>,
  pub poll_interval: Option<Duration>,
  pub timeout: Option<Duration>,
  pub json: bool,
}

/// Template and pass-through options for commands that deploy.
#[derive(Debug, Clone, Args)]
pub struct TemplateArgs {
  /// Template locator: path, file://, http(s):// or inline body
  #[arg(short, long)]
  pub template: String,

  /// Template parameter (repeatable). `localfile://?<path>` reads the value from a file
  #[arg(short = 'P', long = "param", value_name = "KEY=VALUE", value_parser = parse_key_value)]
  pub params: Vec<(String, String)>,

  /// Capability to acknowledge, e.g. CAPABILITY_IAM (repeatable)
  #[arg(long = "capability", value_name = "CAPABILITY")]
  pub capabilities: Vec<String>,

  /// Stack tag (repeatable)
  #[arg(long = "tag", value_name = "KEY=VALUE", value_parser = parse_key_value)]
  pub tags: Vec<(String, String)>,

  /// IAM role the service assumes for this operation
  #[arg(long)]
  pub role_arn: Option<String>,
}

impl TemplateArgs {
  /// Resolve the template and build the option bag.
  pub async fn options(&self) -> Result<OperationOptions> {
    let body = load_template(&self.template).await?;

    let mut options = OperationOptions::new().with_template_body(body);
    for (key, value) in &self.params {
      let value = resolve_parameter(value)
        .await
        .with_context(|| format!("Failed to resolve parameter '{key}'"))?;
      options = options.with_parameter(key, value);
    }
    for capability in &self.capabilities {
      options = options.with_capability(capability);
    }
    for (key, value) in &self.tags {
      options = options.with_tag(key, value);
    }
    if let Some(arn) = &self.role_arn {
      options = options.with_role_arn(arn);
    }

    Ok(options)
  }
}

pub fn parse_key_value(raw: &str) -> std::result::Result<(String, String), String> {
  match raw.split_once('=') {
    Some((key, value)) if !key.trim().is_empty() => Ok((key.trim().to_string(), value.to_string())),
    _ => Err(format!("expected KEY=VALUE, got '{raw}'")),
  }
}

pub async fn load_template(locator: &str) -> Result<String> {
  resolve(locator)
    .await
    .with_context(|| format!("Failed to load template '{locator}'"))
}

pub fn runtime() -> Result<Runtime> {
  Runtime::new().context("Failed to create async runtime")
}

pub fn config(globals: &Globals, skip_unchanged: bool) -> OrchestratorConfig {
  let mut config = OrchestratorConfig::from_env();
  if let Some(interval) = globals.poll_interval {
    config = config.with_poll_interval(interval);
  }
  if globals.timeout.is_some() {
    config = config.with_timeout(globals.timeout);
  }
  if skip_unchanged {
    config = config.with_skip_unchanged_templates(true);
  }
  config
}

pub async fn gateway(globals: &Globals) -> Arc<dyn StackGateway> {
  Arc::new(CloudFormationGateway::from_env(globals.region.clone()).await)
}

/// A stack handle with configuration from the environment and flags.
pub async fn connect(globals: &Globals, name: &str, skip_unchanged: bool) -> Stack {
  Stack::new(name, gateway(globals).await).with_config(config(globals, skip_unchanged))
}

/// Print the final line for one lifecycle operation. Returns false on failure.
pub fn report(action: &str, name: &str, outcome: &Outcome) -> bool {
  match outcome {
    Outcome::Succeeded => {
      print_success(&format!("{action} stack '{name}' completed successfully"));
      true
    }
    Outcome::NoOp => {
      print_info(&format!("{action} stack '{name}' skipped as template has not changed"));
      true
    }
    Outcome::Failed { reason } => {
      print_error(&format!("{action} stack '{name}' failed: {reason}"));
      false
    }
  }
}

pub async fn print_outputs(stack: &Stack) -> Result<()> {
  let outputs = stack.outputs().await.context("Failed to fetch stack outputs")?;
  if outputs.is_empty() {
    return Ok(());
  }
  println!();
  println!("Outputs:");
  for output in &outputs {
    print_stat(&output.key, &output.value);
  }
  Ok(())
}

pub fn exit_code(ok: bool) -> ExitCode {
  if ok { ExitCode::SUCCESS } else { ExitCode::FAILURE }
}
