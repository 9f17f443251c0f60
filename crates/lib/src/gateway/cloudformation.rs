//! AWS CloudFormation implementation of [`StackGateway`].

use async_trait::async_trait;
use aws_sdk_cloudformation::Client;
use aws_sdk_cloudformation::config::Region;
use aws_sdk_cloudformation::error::{DisplayErrorContext, ProvideErrorMetadata, SdkError};
use aws_sdk_cloudformation::types::{Capability, Parameter, Tag};
use chrono::{DateTime, Utc};
use serde_json::Value;
use tracing::debug;

use crate::consts::{APP_NAME, STACK_MISSING_MESSAGE};
use crate::stack::types::{OperationOptions, StackDescription, StackEvent, StackOutput, keys};

use super::{GatewayError, NoOpDetector, StackGateway, ValidationReport};

/// Error codes CloudFormation uses for throttling and server-side hiccups.
const TRANSIENT_CODES: &[&str] = &[
  "Throttling",
  "ThrottlingException",
  "RequestLimitExceeded",
  "ServiceUnavailable",
  "InternalFailure",
  "RequestExpired",
];

/// Error codes meaning the request itself was rejected.
const VALIDATION_CODES: &[&str] = &[
  "ValidationError",
  "InsufficientCapabilitiesException",
  "AlreadyExistsException",
  "LimitExceededException",
  "TokenAlreadyExistsException",
];

/// Keys of the option bag this adapter understands.
const KNOWN_KEYS: &[&str] = &[
  keys::STACK_NAME,
  keys::TEMPLATE_BODY,
  keys::TEMPLATE_URL,
  keys::PARAMETERS,
  keys::CAPABILITIES,
  keys::TAGS,
  keys::ROLE_ARN,
  keys::DISABLE_ROLLBACK,
  keys::TIMEOUT_IN_MINUTES,
];

pub struct CloudFormationGateway {
  client: Client,
  no_op: NoOpDetector,
}

impl CloudFormationGateway {
  pub fn new(client: Client) -> Self {
    Self {
      client,
      no_op: NoOpDetector::default(),
    }
  }

  /// Build a client from the default AWS provider chain, optionally pinned to
  /// `region`.
  pub async fn from_env(region: Option<String>) -> Self {
    let mut loader = aws_config::defaults(aws_config::BehaviorVersion::latest());
    if let Ok(app_name) = aws_config::AppName::new(APP_NAME) {
      loader = loader.app_name(app_name);
    }
    if let Some(region) = region {
      loader = loader.region(Region::new(region));
    }
    let config = loader.load().await;
    Self::new(Client::new(&config))
  }

  pub fn with_no_op_detector(mut self, detector: NoOpDetector) -> Self {
    self.no_op = detector;
    self
  }

  fn map_error<E, R>(&self, stack: &str, err: SdkError<E, R>) -> GatewayError
  where
    E: ProvideErrorMetadata + std::error::Error + 'static,
    R: std::fmt::Debug,
  {
    match &err {
      SdkError::TimeoutError(_) | SdkError::DispatchFailure(_) | SdkError::ResponseError(_) => {
        return GatewayError::Transient {
          message: DisplayErrorContext(&err).to_string(),
        };
      }
      _ => {}
    }

    let code = err.code().unwrap_or("Unknown").to_string();
    let message = err
      .message()
      .map(str::to_string)
      .unwrap_or_else(|| DisplayErrorContext(&err).to_string());
    classify_remote_error(stack, code, message, &self.no_op)
  }
}

/// Translate a service error code/message pair into a [`GatewayError`].
fn classify_remote_error(stack: &str, code: String, message: String, no_op: &NoOpDetector) -> GatewayError {
  if code == "ValidationError" && is_stack_missing(stack, &message) {
    GatewayError::NotFound {
      stack: stack.to_string(),
    }
  } else if no_op.matches(&message) {
    GatewayError::NoChanges { message }
  } else if TRANSIENT_CODES.contains(&code.as_str()) {
    GatewayError::Transient { message }
  } else if VALIDATION_CODES.contains(&code.as_str()) {
    GatewayError::Validation { message }
  } else {
    GatewayError::Remote { code, message }
  }
}

/// Only "Stack with id X does not exist" and "Stack [X] does not exist" name
/// the stack itself; other resources (buckets, roles) can be missing too.
fn is_stack_missing(stack: &str, message: &str) -> bool {
  !stack.is_empty()
    && message.starts_with("Stack ")
    && (message.contains(&format!("id {stack} ")) || message.contains(&format!("[{stack}]")))
    && message.contains(STACK_MISSING_MESSAGE)
}

fn value_to_string(value: &Value) -> String {
  match value {
    Value::String(s) => s.clone(),
    other => other.to_string(),
  }
}

fn parameters(options: &OperationOptions) -> Option<Vec<Parameter>> {
  let map = options.get(keys::PARAMETERS)?.as_object()?;
  let params = map
    .iter()
    .map(|(key, value)| {
      let builder = Parameter::builder().parameter_key(key);
      // `null` keeps whatever value the stack already has
      match value {
        Value::Null => builder.use_previous_value(true).build(),
        other => builder.parameter_value(value_to_string(other)).build(),
      }
    })
    .collect();
  Some(params)
}

fn capabilities(options: &OperationOptions) -> Option<Vec<Capability>> {
  let items = options.get(keys::CAPABILITIES)?.as_array()?;
  Some(
    items
      .iter()
      .filter_map(Value::as_str)
      .map(Capability::from)
      .collect(),
  )
}

fn tags(options: &OperationOptions) -> Option<Vec<Tag>> {
  let map = options.get(keys::TAGS)?.as_object()?;
  Some(
    map
      .iter()
      .map(|(key, value)| Tag::builder().key(key).value(value_to_string(value)).build())
      .collect(),
  )
}

/// Follow `next_token` pagination, stopping after the page that contains
/// `since`.
async fn collect_pages<F, Fut>(since: Option<&str>, mut fetch: F) -> Result<Vec<StackEvent>, GatewayError>
where
  F: FnMut(Option<String>) -> Fut,
  Fut: Future<Output = Result<(Vec<StackEvent>, Option<String>), GatewayError>>,
{
  let mut events = Vec::new();
  let mut token = None;
  let mut pages = 0;

  loop {
    let (page, next) = fetch(token.take()).await?;
    pages += 1;
    let reached = since.is_some_and(|marker| page.iter().any(|event| event.id == marker));
    events.extend(page);

    match next {
      Some(next) if !reached => token = Some(next),
      _ => break,
    }
  }

  debug!(pages, events = events.len(), "listed stack events");
  Ok(events)
}

fn log_ignored_keys(options: &OperationOptions) {
  for (key, _) in options.iter() {
    if !KNOWN_KEYS.contains(&key.as_str()) {
      debug!(key = %key, "ignoring option not understood by CloudFormation");
    }
  }
}

fn to_chrono(timestamp: &aws_sdk_cloudformation::primitives::DateTime) -> DateTime<Utc> {
  DateTime::from_timestamp(timestamp.secs(), timestamp.subsec_nanos()).unwrap_or_default()
}

fn convert_event(event: &aws_sdk_cloudformation::types::StackEvent) -> Option<StackEvent> {
  Some(StackEvent {
    id: event.event_id()?.to_string(),
    timestamp: event.timestamp().map(to_chrono).unwrap_or_default(),
    logical_resource_id: event.logical_resource_id().unwrap_or_default().to_string(),
    resource_status: event
      .resource_status()
      .map(|status| status.as_str().to_string())
      .unwrap_or_default(),
    resource_status_reason: event.resource_status_reason().map(str::to_string),
  })
}

#[async_trait]
impl StackGateway for CloudFormationGateway {
  async fn create(&self, name: &str, options: &OperationOptions) -> Result<(), GatewayError> {
    log_ignored_keys(options);
    self
      .client
      .create_stack()
      .stack_name(name)
      .set_template_body(options.template_body().map(str::to_string))
      .set_template_url(options.get_str(keys::TEMPLATE_URL).map(str::to_string))
      .set_parameters(parameters(options))
      .set_capabilities(capabilities(options))
      .set_tags(tags(options))
      .set_role_arn(options.get_str(keys::ROLE_ARN).map(str::to_string))
      .set_disable_rollback(options.get(keys::DISABLE_ROLLBACK).and_then(Value::as_bool))
      .set_timeout_in_minutes(
        options
          .get(keys::TIMEOUT_IN_MINUTES)
          .and_then(Value::as_i64)
          .and_then(|minutes| i32::try_from(minutes).ok()),
      )
      .send()
      .await
      .map_err(|e| self.map_error(name, e))?;
    Ok(())
  }

  async fn update(&self, name: &str, options: &OperationOptions) -> Result<(), GatewayError> {
    log_ignored_keys(options);
    self
      .client
      .update_stack()
      .stack_name(name)
      .set_template_body(options.template_body().map(str::to_string))
      .set_template_url(options.get_str(keys::TEMPLATE_URL).map(str::to_string))
      .set_parameters(parameters(options))
      .set_capabilities(capabilities(options))
      .set_tags(tags(options))
      .set_role_arn(options.get_str(keys::ROLE_ARN).map(str::to_string))
      .send()
      .await
      .map_err(|e| self.map_error(name, e))?;
    Ok(())
  }

  async fn delete(&self, name: &str) -> Result<(), GatewayError> {
    match self.describe_stack(name).await {
      Err(GatewayError::NotFound { .. }) => {
        debug!(stack = name, "delete requested for missing stack");
        return Ok(());
      }
      Err(e) => return Err(e),
      Ok(_) => {}
    }

    self
      .client
      .delete_stack()
      .stack_name(name)
      .send()
      .await
      .map_err(|e| self.map_error(name, e))?;
    Ok(())
  }

  async fn describe_stack(&self, name: &str) -> Result<StackDescription, GatewayError> {
    let output = self
      .client
      .describe_stacks()
      .stack_name(name)
      .send()
      .await
      .map_err(|e| self.map_error(name, e))?;

    let stack = output.stacks().first().ok_or_else(|| GatewayError::NotFound {
      stack: name.to_string(),
    })?;

    let mut description = StackDescription::new(
      stack.stack_name().unwrap_or(name),
      stack
        .stack_status()
        .map(|status| status.as_str().to_string())
        .unwrap_or_default(),
    );
    description.status_reason = stack.stack_status_reason().map(str::to_string);
    description.outputs = stack
      .outputs()
      .iter()
      .map(|output| StackOutput {
        key: output.output_key().unwrap_or_default().to_string(),
        value: output.output_value().unwrap_or_default().to_string(),
        description: output.description().map(str::to_string),
      })
      .collect();
    description.parameters = stack
      .parameters()
      .iter()
      .filter_map(|param| {
        Some((
          param.parameter_key()?.to_string(),
          param.parameter_value().unwrap_or_default().to_string(),
        ))
      })
      .collect();

    Ok(description)
  }

  async fn describe_events(&self, name: &str, since: Option<&str>) -> Result<Vec<StackEvent>, GatewayError> {
    collect_pages(since, move |token| async move {
      let output = self
        .client
        .describe_stack_events()
        .stack_name(name)
        .set_next_token(token)
        .send()
        .await
        .map_err(|e| self.map_error(name, e))?;
      let events = output.stack_events().iter().filter_map(convert_event).collect();
      Ok((events, output.next_token().map(str::to_string)))
    })
    .await
  }

  async fn latest_event(&self, name: &str) -> Result<Option<StackEvent>, GatewayError> {
    let output = self
      .client
      .describe_stack_events()
      .stack_name(name)
      .send()
      .await
      .map_err(|e| self.map_error(name, e))?;
    Ok(output.stack_events().iter().find_map(convert_event))
  }

  async fn get_template(&self, name: &str) -> Result<Option<String>, GatewayError> {
    match self.client.get_template().stack_name(name).send().await {
      Ok(output) => Ok(output.template_body().map(str::to_string)),
      Err(e) => match self.map_error(name, e) {
        GatewayError::NotFound { .. } => Ok(None),
        other => Err(other),
      },
    }
  }

  async fn validate(&self, options: &OperationOptions) -> Result<ValidationReport, GatewayError> {
    let output = self
      .client
      .validate_template()
      .set_template_body(options.template_body().map(str::to_string))
      .set_template_url(options.get_str(keys::TEMPLATE_URL).map(str::to_string))
      .send()
      .await
      .map_err(|e| self.map_error("", e))?;

    Ok(ValidationReport {
      description: output.description().map(str::to_string),
      parameters: output
        .parameters()
        .iter()
        .filter_map(|param| param.parameter_key().map(str::to_string))
        .collect(),
      capabilities: output
        .capabilities()
        .iter()
        .map(|capability| capability.as_str().to_string())
        .collect(),
    })
  }
}
