//! Lifecycle operations: issue one remote mutation, then poll until the
//! stack reaches a terminal state.
//!
//! Every operation resolves to an [`Outcome`]. Remote failures, rollbacks and
//! timeouts are reported as [`Outcome::Failed`], never as `Err`.

use tokio::time::{Instant, sleep};
use tracing::{debug, info, warn};

use crate::error::StackError;
use crate::gateway::GatewayError;
use crate::template::templates_equivalent;

use super::Stack;
use super::events::{EventSink, EventTracker};
use super::status::StatusClass;
use super::types::{ApplyResult, OperationOptions, Outcome, StackAction, StackEvent};

/// Caller sink, shared by every phase of one operation.
type Sink<'a> = Option<&'a mut dyn EventSink>;

/// Reason text gathered from events while polling.
#[derive(Debug, Default)]
struct Reasons {
  /// Reason of the newest `*_FAILED` event.
  failure: Option<String>,
  /// Newest reason of any kind, except the service's own "User Initiated".
  latest: Option<String>,
}

impl Reasons {
  fn record(&mut self, event: &StackEvent) {
    let Some(reason) = event.resource_status_reason.as_deref().filter(|r| !r.is_empty()) else {
      return;
    };
    if event.resource_status.ends_with("_FAILED") {
      self.failure = Some(reason.to_string());
    }
    if reason != "User Initiated" {
      self.latest = Some(reason.to_string());
    }
  }

  fn best(&self, status_reason: Option<&str>) -> Option<String> {
    self
      .failure
      .clone()
      .or_else(|| self.latest.clone())
      .or_else(|| status_reason.map(str::to_string))
  }
}

impl Stack {
  /// Create the stack and wait for the result.
  pub async fn create(&self, options: &OperationOptions, sink: Option<&mut dyn EventSink>) -> Outcome {
    let _lock = self.locks.acquire(&self.name).await;
    let mut sink = sink;
    self.create_unlocked(options, &mut sink).await
  }

  /// Update the stack and wait for the result. A remote "nothing to update"
  /// answer is [`Outcome::NoOp`].
  pub async fn update(&self, options: &OperationOptions, sink: Option<&mut dyn EventSink>) -> Outcome {
    let _lock = self.locks.acquire(&self.name).await;
    let mut sink = sink;
    self.update_unlocked(options, &mut sink).await
  }

  /// Delete the stack and wait until it is gone. Deleting a missing stack
  /// succeeds without calling the remote side.
  pub async fn delete(&self, sink: Option<&mut dyn EventSink>) -> Outcome {
    let _lock = self.locks.acquire(&self.name).await;
    let mut sink = sink;
    self.delete_unlocked(&mut sink).await
  }

  /// Delete (when present) then create, holding the stack's lock across
  /// both. A failed delete aborts before anything is created.
  pub async fn recreate(&self, options: &OperationOptions, sink: Option<&mut dyn EventSink>) -> Outcome {
    let _lock = self.locks.acquire(&self.name).await;
    let mut sink = sink;

    let deleted = self.delete_unlocked(&mut sink).await;
    if !deleted.is_succeeded() {
      warn!(stack = %self.name, "delete failed, not recreating");
      return deleted;
    }

    self.create_unlocked(options, &mut sink).await
  }

  /// Create the stack when it does not exist, update it otherwise.
  pub async fn create_or_update(&self, options: &OperationOptions, sink: Option<&mut dyn EventSink>) -> ApplyResult {
    let _lock = self.locks.acquire(&self.name).await;
    let mut sink = sink;

    match self.lookup().await {
      Ok(None) => ApplyResult {
        action: Some(StackAction::Create),
        outcome: self.create_unlocked(options, &mut sink).await,
      },
      Ok(Some(_)) => ApplyResult {
        action: Some(StackAction::Update),
        outcome: self.update_unlocked(options, &mut sink).await,
      },
      Err(e) => ApplyResult {
        action: None,
        outcome: Outcome::failed(e.message()),
      },
    }
  }

  async fn create_unlocked(&self, options: &OperationOptions, sink: &mut Sink<'_>) -> Outcome {
    info!(stack = %self.name, "creating stack");
    let tracker = self.baseline().await;

    let options = options.clone().with_stack_name(&self.name);
    if let Err(e) = self.gateway.create(&self.name, &options).await {
      warn!(stack = %self.name, error = %e, "create rejected");
      return Outcome::failed(e.message());
    }

    self.wait(StackAction::Create, tracker, sink).await
  }

  async fn update_unlocked(&self, options: &OperationOptions, sink: &mut Sink<'_>) -> Outcome {
    if self.config.skip_unchanged_templates && self.template_unchanged(options).await {
      info!(stack = %self.name, "template has not changed, skipping update");
      return Outcome::NoOp;
    }

    info!(stack = %self.name, "updating stack");
    let tracker = self.baseline().await;

    let options = options.clone().with_stack_name(&self.name);
    match self.gateway.update(&self.name, &options).await {
      Ok(()) => self.wait(StackAction::Update, tracker, sink).await,
      Err(GatewayError::NoChanges { message }) => {
        info!(stack = %self.name, %message, "no updates to perform");
        Outcome::NoOp
      }
      Err(e) => {
        warn!(stack = %self.name, error = %e, "update rejected");
        Outcome::failed(e.message())
      }
    }
  }

  async fn delete_unlocked(&self, sink: &mut Sink<'_>) -> Outcome {
    match self.lookup().await {
      Ok(Some(_)) => {}
      Ok(None) => {
        info!(stack = %self.name, "stack does not exist, nothing to delete");
        return Outcome::Succeeded;
      }
      Err(e) => return Outcome::failed(e.message()),
    }

    info!(stack = %self.name, "deleting stack");
    let tracker = self.baseline().await;

    if let Err(e) = self.gateway.delete(&self.name).await {
      warn!(stack = %self.name, error = %e, "delete rejected");
      return Outcome::failed(e.message());
    }

    self.wait(StackAction::Delete, tracker, sink).await
  }

  async fn baseline(&self) -> EventTracker {
    EventTracker::baseline(self.gateway.as_ref(), &self.name, self.clock.as_ref()).await
  }

  async fn template_unchanged(&self, options: &OperationOptions) -> bool {
    let Some(candidate) = options.template_body() else {
      return false;
    };
    match self.gateway.get_template(&self.name).await {
      Ok(Some(current)) => templates_equivalent(&current, candidate),
      Ok(None) => false,
      Err(e) => {
        debug!(stack = %self.name, error = %e, "could not fetch current template");
        false
      }
    }
  }

  /// Poll until terminal, streaming new events to `sink`.
  async fn wait(&self, action: StackAction, mut tracker: EventTracker, sink: &mut Sink<'_>) -> Outcome {
    let deadline = self.config.timeout.map(|timeout| Instant::now() + timeout);
    let mut reasons = Reasons::default();
    let mut misses: u32 = 0;

    loop {
      if let (Some(deadline), Some(timeout)) = (deadline, self.config.timeout) {
        if Instant::now() >= deadline {
          warn!(stack = %self.name, action = %action, "gave up waiting");
          return Outcome::failed(format!("timed out after {timeout:?}"));
        }
      }

      sleep(self.config.poll_interval).await;

      match tracker.poll(self.gateway.as_ref(), &self.name).await {
        Ok(events) => deliver(events, sink, &mut reasons),
        Err(e) => match self.tolerate(&mut misses, e) {
          Ok(()) => continue,
          Err(outcome) => return outcome,
        },
      }

      let description = match self.lookup().await {
        Ok(description) => description,
        Err(e) => match self.tolerate(&mut misses, e) {
          Ok(()) => continue,
          Err(outcome) => return outcome,
        },
      };

      let raw = description.as_ref().map(|d| d.status.as_str());
      let status_reason = description.as_ref().and_then(|d| d.status_reason.as_deref());
      let class = StatusClass::classify(raw);
      debug!(stack = %self.name, status = raw.unwrap_or("-"), %class, "polled status");

      match class {
        StatusClass::InProgress => {
          misses = 0;
          continue;
        }
        StatusClass::NotCreated if action == StackAction::Delete => {
          self.drain(&mut tracker, sink, &mut reasons).await;
          info!(stack = %self.name, "stack deleted");
          return Outcome::Succeeded;
        }
        StatusClass::NotCreated => {
          // freshly created stacks can take a moment to become visible
          let missing = GatewayError::Transient {
            message: format!("stack '{}' is not visible", self.name),
          };
          match self.tolerate(&mut misses, missing) {
            Ok(()) => continue,
            Err(_) => return Outcome::failed(format!("stack '{}' disappeared during {action}", self.name)),
          }
        }
        StatusClass::Complete => {
          self.drain(&mut tracker, sink, &mut reasons).await;
          info!(stack = %self.name, action = %action, status = raw.unwrap_or_default(), "operation complete");
          return Outcome::Succeeded;
        }
        StatusClass::RollbackComplete => {
          self.drain(&mut tracker, sink, &mut reasons).await;
          let status = raw.unwrap_or_default().to_string();
          let reason = reasons
            .best(status_reason)
            .unwrap_or_else(|| "no reason reported".to_string());
          warn!(stack = %self.name, %status, %reason, "stack rolled back");
          let err = StackError::RollbackDetected {
            stack: self.name.clone(),
            status,
            reason,
          };
          return Outcome::failed(err.to_string());
        }
        StatusClass::Failed | StatusClass::Unknown => {
          self.drain(&mut tracker, sink, &mut reasons).await;
          let status = raw.unwrap_or_default();
          warn!(stack = %self.name, %status, "operation failed");
          return Outcome::failed(match reasons.best(status_reason) {
            Some(reason) => format!("{status}: {reason}"),
            None => status.to_string(),
          });
        }
      }
    }
  }

  /// Count one transient failure. Anything else, or one failure too many,
  /// ends the poll loop with the returned outcome.
  fn tolerate(&self, misses: &mut u32, err: GatewayError) -> Result<(), Outcome> {
    if !err.is_transient() {
      warn!(stack = %self.name, error = %err, "polling failed");
      return Err(Outcome::failed(err.message()));
    }

    *misses += 1;
    if *misses > self.config.max_transient_retries {
      let err = StackError::Transient {
        attempts: *misses,
        message: err.message(),
      };
      warn!(stack = %self.name, error = %err, "giving up");
      return Err(Outcome::failed(err.to_string()));
    }

    debug!(stack = %self.name, attempt = *misses, error = %err, "transient error while polling, retrying");
    Ok(())
  }

  /// Deliver whatever arrived between the last poll and the terminal status.
  async fn drain(&self, tracker: &mut EventTracker, sink: &mut Sink<'_>, reasons: &mut Reasons) {
    match tracker.poll(self.gateway.as_ref(), &self.name).await {
      Ok(events) => deliver(events, sink, reasons),
      Err(e) => debug!(stack = %self.name, error = %e, "could not fetch final events"),
    }
  }
}

fn deliver(events: Vec<StackEvent>, sink: &mut Sink<'_>, reasons: &mut Reasons) {
  for event in events {
    debug!(
      resource = %event.logical_resource_id,
      status = %event.resource_status,
      "stack event"
    );
    reasons.record(&event);
    if let Some(sink) = sink.as_mut() {
      sink.on_event(&event);
    }
  }
}
