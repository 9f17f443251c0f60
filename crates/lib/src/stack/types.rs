//! Value types shared by the gateway, the event tracker and the orchestrator.

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Well-known keys of the option bag.
///
/// The orchestrator only ever touches [`keys::STACK_NAME`]; the others are
/// read by gateway adapters.
pub mod keys {
  pub const STACK_NAME: &str = "stack_name";
  pub const TEMPLATE_BODY: &str = "template_body";
  pub const TEMPLATE_URL: &str = "template_url";
  pub const PARAMETERS: &str = "parameters";
  pub const CAPABILITIES: &str = "capabilities";
  pub const TAGS: &str = "tags";
  pub const ROLE_ARN: &str = "role_arn";
  pub const DISABLE_ROLLBACK: &str = "disable_rollback";
  pub const TIMEOUT_IN_MINUTES: &str = "timeout_in_minutes";
}

/// A single progress record reported by the provisioning service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StackEvent {
  /// Unique identifier, used for deduplication.
  pub id: String,
  pub timestamp: DateTime<Utc>,
  pub logical_resource_id: String,
  pub resource_status: String,
  pub resource_status_reason: Option<String>,
}

/// An output value exported by a stack.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StackOutput {
  pub key: String,
  pub value: String,
  pub description: Option<String>,
}

/// Snapshot of a stack as reported by a describe call. Never cached.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StackDescription {
  pub name: String,
  pub status: String,
  pub status_reason: Option<String>,
  pub outputs: Vec<StackOutput>,
  pub parameters: BTreeMap<String, String>,
}

impl StackDescription {
  pub fn new(name: impl Into<String>, status: impl Into<String>) -> Self {
    Self {
      name: name.into(),
      status: status.into(),
      status_reason: None,
      outputs: Vec::new(),
      parameters: BTreeMap::new(),
    }
  }
}

/// Opaque key/value bag handed through to the gateway.
///
/// Values are JSON so adapters can carry nested shapes (parameter maps, tag
/// maps, capability lists) without this crate enumerating them.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OperationOptions {
  entries: BTreeMap<String, Value>,
}

impl OperationOptions {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn get(&self, key: &str) -> Option<&Value> {
    self.entries.get(key)
  }

  pub fn get_str(&self, key: &str) -> Option<&str> {
    self.entries.get(key).and_then(Value::as_str)
  }

  pub fn set(&mut self, key: impl Into<String>, value: impl Into<Value>) {
    self.entries.insert(key.into(), value.into());
  }

  pub fn remove(&mut self, key: &str) -> Option<Value> {
    self.entries.remove(key)
  }

  pub fn contains(&self, key: &str) -> bool {
    self.entries.contains_key(key)
  }

  pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
    self.entries.iter()
  }

  pub fn is_empty(&self) -> bool {
    self.entries.is_empty()
  }

  pub fn template_body(&self) -> Option<&str> {
    self.get_str(keys::TEMPLATE_BODY)
  }

  pub fn stack_name(&self) -> Option<&str> {
    self.get_str(keys::STACK_NAME)
  }

  pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
    self.set(key, value);
    self
  }

  pub fn with_stack_name(self, name: impl Into<String>) -> Self {
    self.with(keys::STACK_NAME, name.into())
  }

  pub fn with_template_body(self, body: impl Into<String>) -> Self {
    self.with(keys::TEMPLATE_BODY, body.into())
  }

  pub fn with_template_url(self, url: impl Into<String>) -> Self {
    self.with(keys::TEMPLATE_URL, url.into())
  }

  pub fn with_role_arn(self, arn: impl Into<String>) -> Self {
    self.with(keys::ROLE_ARN, arn.into())
  }

  pub fn with_parameter(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
    self.insert_nested(keys::PARAMETERS, key.into(), value.into());
    self
  }

  pub fn with_tag(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
    self.insert_nested(keys::TAGS, key.into(), value.into());
    self
  }

  pub fn with_capability(mut self, capability: impl Into<String>) -> Self {
    let mut items = match self.entries.remove(keys::CAPABILITIES) {
      Some(Value::Array(items)) => items,
      _ => Vec::new(),
    };
    items.push(Value::String(capability.into()));
    self.entries.insert(keys::CAPABILITIES.to_string(), Value::Array(items));
    self
  }

  /// The subset a template validation call accepts.
  pub fn template_only(&self) -> Self {
    let entries = self
      .entries
      .iter()
      .filter(|(key, _)| key.as_str() == keys::TEMPLATE_BODY || key.as_str() == keys::TEMPLATE_URL)
      .map(|(key, value)| (key.clone(), value.clone()))
      .collect();
    Self { entries }
  }

  fn insert_nested(&mut self, key: &str, name: String, value: String) {
    let mut map = match self.entries.remove(key) {
      Some(Value::Object(map)) => map,
      _ => serde_json::Map::new(),
    };
    map.insert(name, Value::String(value));
    self.entries.insert(key.to_string(), Value::Object(map));
  }
}

/// Which remote mutation a lifecycle call ended up issuing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StackAction {
  Create,
  Update,
  Delete,
  Recreate,
}

impl StackAction {
  pub fn as_str(self) -> &'static str {
    match self {
      StackAction::Create => "Create",
      StackAction::Update => "Update",
      StackAction::Delete => "Delete",
      StackAction::Recreate => "Recreate",
    }
  }
}

impl fmt::Display for StackAction {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

/// Final answer of every lifecycle operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum Outcome {
  Succeeded,
  /// The remote side (or a local template comparison) found nothing to change.
  NoOp,
  Failed {
    reason: String,
  },
}

impl Outcome {
  pub fn failed(reason: impl Into<String>) -> Self {
    Outcome::Failed { reason: reason.into() }
  }

  pub fn is_succeeded(&self) -> bool {
    matches!(self, Outcome::Succeeded)
  }

  pub fn is_no_op(&self) -> bool {
    matches!(self, Outcome::NoOp)
  }

  pub fn is_failed(&self) -> bool {
    matches!(self, Outcome::Failed { .. })
  }

  pub fn reason(&self) -> Option<&str> {
    match self {
      Outcome::Failed { reason } => Some(reason),
      _ => None,
    }
  }
}

/// Result of `create_or_update`: the routed action plus its outcome.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApplyResult {
  /// `None` when the existence check itself failed.
  pub action: Option<StackAction>,
  pub outcome: Outcome,
}
