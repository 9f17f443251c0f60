//! Scripted in-memory gateway for tests.
//!
//! Mutations push a first `*_IN_PROGRESS` event and queue a script of status
//! steps. Every `describe_stack` call advances the script by one step and
//! records an event for it, so a poll loop observes a realistic progression.

use std::collections::{HashMap, VecDeque};
use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use chrono::DateTime;

use crate::stack::types::{OperationOptions, StackDescription, StackEvent, StackOutput, keys};

use super::{GatewayError, StackGateway, ValidationReport};

const EPOCH: i64 = 1_704_067_200;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Op {
  Create,
  Update,
  Delete,
  DescribeStack,
  DescribeEvents,
  GetTemplate,
  Validate,
}

impl Op {
  pub fn is_mutation(self) -> bool {
    matches!(self, Op::Create | Op::Update | Op::Delete)
  }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Call {
  pub op: Op,
  pub stack: String,
}

/// How events were asked for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventQuery {
  Latest,
  All,
  Since(String),
}

/// One scripted status transition.
#[derive(Debug, Clone)]
pub struct Step {
  pub status: String,
  pub reason: Option<String>,
}

impl Step {
  pub fn new(status: &str) -> Self {
    Self {
      status: status.to_string(),
      reason: None,
    }
  }

  pub fn because(status: &str, reason: &str) -> Self {
    Self {
      status: status.to_string(),
      reason: Some(reason.to_string()),
    }
  }
}

#[derive(Debug, Default)]
struct MemStack {
  status: String,
  reason: Option<String>,
  options: OperationOptions,
  outputs: Vec<StackOutput>,
  /// Oldest first.
  events: Vec<StackEvent>,
  pending: VecDeque<Step>,
  deleted: bool,
}

#[derive(Debug, Default)]
struct State {
  stacks: HashMap<String, MemStack>,
  calls: Vec<Call>,
  scripts: HashMap<Op, Vec<Step>>,
  failures: HashMap<Op, VecDeque<GatewayError>>,
  event_queries: Vec<EventQuery>,
  next_event: i64,
}

impl State {
  fn push_event(&mut self, name: &str, status: &str, reason: Option<String>) {
    self.next_event += 1;
    let event = StackEvent {
      id: format!("evt-{}", self.next_event),
      timestamp: DateTime::from_timestamp(EPOCH + self.next_event, 0).unwrap_or_default(),
      logical_resource_id: name.to_string(),
      resource_status: status.to_string(),
      resource_status_reason: reason,
    };
    if let Some(stack) = self.stacks.get_mut(name) {
      stack.events.push(event);
    }
  }

  fn take_failure(&mut self, op: Op) -> Result<(), GatewayError> {
    match self.failures.get_mut(&op).and_then(VecDeque::pop_front) {
      Some(err) => Err(err),
      None => Ok(()),
    }
  }

  fn script(&mut self, op: Op, default: &str) -> VecDeque<Step> {
    self
      .scripts
      .remove(&op)
      .unwrap_or_else(|| vec![Step::new(default)])
      .into()
  }

  fn live(&self, name: &str) -> Option<&MemStack> {
    self.stacks.get(name).filter(|stack| !stack.deleted)
  }
}

/// In-memory stand-in for the provisioning service.
#[derive(Debug, Default)]
pub struct MemoryGateway {
  state: Mutex<State>,
}

impl MemoryGateway {
  pub fn new() -> Self {
    Self::default()
  }

  /// Seed an existing stack with some earlier history.
  pub fn with_stack(self, name: &str, status: &str, template: &str) -> Self {
    {
      let mut state = self.state();
      state.stacks.insert(
        name.to_string(),
        MemStack {
          status: status.to_string(),
          options: OperationOptions::new().with_template_body(template),
          ..MemStack::default()
        },
      );
      state.push_event(name, "CREATE_IN_PROGRESS", Some("User Initiated".into()));
      state.push_event(name, status, None);
    }
    self
  }

  pub fn with_output(self, name: &str, key: &str, value: &str) -> Self {
    if let Some(stack) = self.state().stacks.get_mut(name) {
      stack.outputs.push(StackOutput {
        key: key.to_string(),
        value: value.to_string(),
        description: None,
      });
    }
    self
  }

  /// Status progression for the next call of `op`.
  pub fn script(&self, op: Op, steps: Vec<Step>) {
    self.state().scripts.insert(op, steps);
  }

  /// Make the next call of `op` fail with `err`. Repeated calls queue up.
  pub fn fail_next(&self, op: Op, err: GatewayError) {
    self.state().failures.entry(op).or_default().push_back(err);
  }

  pub fn calls(&self) -> Vec<Call> {
    self.state().calls.clone()
  }

  pub fn count(&self, op: Op) -> usize {
    self.state().calls.iter().filter(|call| call.op == op).count()
  }

  pub fn mutations(&self) -> Vec<Op> {
    self
      .state()
      .calls
      .iter()
      .map(|call| call.op)
      .filter(|op| op.is_mutation())
      .collect()
  }

  pub fn event_queries(&self) -> Vec<EventQuery> {
    self.state().event_queries.clone()
  }

  pub fn status_of(&self, name: &str) -> Option<String> {
    self.state().live(name).map(|stack| stack.status.clone())
  }

  fn state(&self) -> MutexGuard<'_, State> {
    self.state.lock().unwrap_or_else(PoisonError::into_inner)
  }

  fn begin(&self, op: Op, name: &str) -> Result<MutexGuard<'_, State>, GatewayError> {
    let mut state = self.state();
    state.calls.push(Call {
      op,
      stack: name.to_string(),
    });
    state.take_failure(op)?;
    Ok(state)
  }
}

fn not_found(name: &str) -> GatewayError {
  GatewayError::NotFound {
    stack: name.to_string(),
  }
}

#[async_trait]
impl StackGateway for MemoryGateway {
  async fn create(&self, name: &str, options: &OperationOptions) -> Result<(), GatewayError> {
    let mut state = self.begin(Op::Create, name)?;
    if state.live(name).is_some() {
      return Err(GatewayError::Remote {
        code: "AlreadyExistsException".into(),
        message: format!("Stack [{name}] already exists"),
      });
    }
    let pending = state.script(Op::Create, "CREATE_COMPLETE");
    state.stacks.insert(
      name.to_string(),
      MemStack {
        status: "CREATE_IN_PROGRESS".into(),
        options: options.clone(),
        pending,
        ..MemStack::default()
      },
    );
    state.push_event(name, "CREATE_IN_PROGRESS", Some("User Initiated".into()));
    Ok(())
  }

  async fn update(&self, name: &str, options: &OperationOptions) -> Result<(), GatewayError> {
    let mut state = self.begin(Op::Update, name)?;
    let stack = state.live(name).ok_or_else(|| GatewayError::Validation {
      message: format!("Stack with id {name} does not exist"),
    })?;
    let unchanged = stack.options.template_body() == options.template_body()
      && stack.options.get(keys::PARAMETERS) == options.get(keys::PARAMETERS);
    if unchanged {
      return Err(GatewayError::NoChanges {
        message: "No updates are to be performed.".into(),
      });
    }
    let pending = state.script(Op::Update, "UPDATE_COMPLETE");
    if let Some(stack) = state.stacks.get_mut(name) {
      stack.status = "UPDATE_IN_PROGRESS".into();
      stack.options = options.clone();
      stack.pending = pending;
    }
    state.push_event(name, "UPDATE_IN_PROGRESS", Some("User Initiated".into()));
    Ok(())
  }

  async fn delete(&self, name: &str) -> Result<(), GatewayError> {
    let mut state = self.begin(Op::Delete, name)?;
    if state.live(name).is_none() {
      return Ok(());
    }
    let pending = state.script(Op::Delete, "DELETE_COMPLETE");
    if let Some(stack) = state.stacks.get_mut(name) {
      stack.status = "DELETE_IN_PROGRESS".into();
      stack.pending = pending;
    }
    state.push_event(name, "DELETE_IN_PROGRESS", Some("User Initiated".into()));
    Ok(())
  }

  async fn describe_stack(&self, name: &str) -> Result<StackDescription, GatewayError> {
    let mut state = self.begin(Op::DescribeStack, name)?;
    let step = match state.stacks.get_mut(name) {
      Some(stack) if !stack.deleted => stack.pending.pop_front(),
      _ => return Err(not_found(name)),
    };

    if let Some(step) = step {
      state.push_event(name, &step.status, step.reason.clone());
      if let Some(stack) = state.stacks.get_mut(name) {
        stack.status = step.status.clone();
        stack.reason = step.reason;
        if stack.status == "DELETE_COMPLETE" {
          stack.deleted = true;
        }
      }
    }

    let stack = state.stacks.get(name).ok_or_else(|| not_found(name))?;
    Ok(StackDescription {
      name: name.to_string(),
      status: stack.status.clone(),
      status_reason: stack.reason.clone(),
      outputs: stack.outputs.clone(),
      parameters: Default::default(),
    })
  }

  async fn describe_events(&self, name: &str, since: Option<&str>) -> Result<Vec<StackEvent>, GatewayError> {
    let mut state = self.begin(Op::DescribeEvents, name)?;
    state.event_queries.push(match since {
      Some(marker) => EventQuery::Since(marker.to_string()),
      None => EventQuery::All,
    });

    // deleted stacks keep their history, as when addressed by stack id
    let stack = state.stacks.get(name).ok_or_else(|| not_found(name))?;
    let mut events = Vec::new();
    for event in stack.events.iter().rev() {
      events.push(event.clone());
      if since == Some(event.id.as_str()) {
        break;
      }
    }
    Ok(events)
  }

  async fn latest_event(&self, name: &str) -> Result<Option<StackEvent>, GatewayError> {
    let mut state = self.begin(Op::DescribeEvents, name)?;
    state.event_queries.push(EventQuery::Latest);
    let stack = state.stacks.get(name).ok_or_else(|| not_found(name))?;
    Ok(stack.events.last().cloned())
  }

  async fn get_template(&self, name: &str) -> Result<Option<String>, GatewayError> {
    let state = self.begin(Op::GetTemplate, name)?;
    Ok(
      state
        .live(name)
        .and_then(|stack| stack.options.template_body())
        .map(str::to_string),
    )
  }

  async fn validate(&self, options: &OperationOptions) -> Result<ValidationReport, GatewayError> {
    let _state = self.begin(Op::Validate, "")?;
    let body = options.get_str(keys::TEMPLATE_BODY).ok_or_else(|| GatewayError::Validation {
      message: "Either Template URL or Template Body must be specified.".into(),
    })?;
    let template: serde_json::Value = serde_yaml::from_str(body).map_err(|e| GatewayError::Validation {
      message: format!("Template format error: {e}"),
    })?;
    if !template.is_object() {
      return Err(GatewayError::Validation {
        message: "Template format error: unsupported structure.".into(),
      });
    }
    Ok(ValidationReport {
      description: template.get("Description").and_then(|d| d.as_str()).map(str::to_string),
      parameters: template
        .get("Parameters")
        .and_then(|p| p.as_object())
        .map(|p| p.keys().cloned().collect())
        .unwrap_or_default(),
      capabilities: Vec::new(),
    })
  }
}
