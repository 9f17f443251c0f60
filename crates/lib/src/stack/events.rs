//! Incremental, deduplicated delivery of stack events.
//!
//! The provisioning service only offers "give me every event, newest first".
//! [`EventTracker`] turns that into a stream of events nobody has seen yet,
//! oldest first, for the lifetime of one poll loop.

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use tracing::{debug, warn};

use crate::gateway::{GatewayError, StackGateway};

use super::types::StackEvent;

/// Source of "now", injectable for deterministic tests.
pub trait Clock: Send + Sync {
  fn now(&self) -> DateTime<Utc>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
  fn now(&self) -> DateTime<Utc> {
    Utc::now()
  }
}

/// A clock frozen at a given instant.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub DateTime<Utc>);

impl Clock for FixedClock {
  fn now(&self) -> DateTime<Utc> {
    self.0
  }
}

/// Receives each newly observed event exactly once, oldest first.
pub trait EventSink: Send {
  fn on_event(&mut self, event: &StackEvent);
}

impl<F> EventSink for F
where
  F: FnMut(&StackEvent) + Send,
{
  fn on_event(&mut self, event: &StackEvent) {
    self(event)
  }
}

/// Per-invocation deduplication state.
#[derive(Debug, Clone, Default)]
pub struct EventTracker {
  /// Identifier of the newest event already accounted for.
  marker: Option<String>,
  /// Lower time bound, only used when no marker could be established.
  since: Option<DateTime<Utc>>,
  seen: HashSet<String>,
}

impl EventTracker {
  /// A tracker that treats every event as new.
  pub fn new() -> Self {
    Self::default()
  }

  /// A tracker that ignores everything up to and including `marker`.
  pub fn with_marker(marker: impl Into<String>) -> Self {
    Self {
      marker: Some(marker.into()),
      ..Self::default()
    }
  }

  /// A tracker that ignores events older than `since`.
  pub fn since(since: DateTime<Utc>) -> Self {
    Self {
      since: Some(since),
      ..Self::default()
    }
  }

  /// Record the current newest event before an operation is issued, so that
  /// history from earlier operations is never replayed.
  ///
  /// A missing stack has no history, so every later event is new. If the
  /// events cannot be read for another reason, fall back to ignoring events
  /// older than `clock.now()`.
  pub async fn baseline(gateway: &dyn StackGateway, stack: &str, clock: &dyn Clock) -> Self {
    match gateway.latest_event(stack).await {
      Ok(Some(newest)) => {
        debug!(stack, marker = %newest.id, "event baseline established");
        Self::with_marker(newest.id)
      }
      Ok(None) => Self::new(),
      Err(GatewayError::NotFound { .. }) => Self::new(),
      Err(e) => {
        let now = clock.now();
        warn!(stack, error = %e, since = %now, "could not read event baseline, filtering by time");
        Self::since(now)
      }
    }
  }

  pub fn marker(&self) -> Option<&str> {
    self.marker.as_deref()
  }

  /// Fold one most-recent-first event listing into the tracker and return
  /// the events not delivered before, oldest first.
  pub fn absorb(&mut self, events: &[StackEvent]) -> Vec<StackEvent> {
    let mut fresh = Vec::new();

    for event in events {
      if self.marker.as_deref() == Some(event.id.as_str()) {
        break;
      }
      if self.marker.is_none() && self.since.is_some_and(|since| event.timestamp < since) {
        break;
      }
      if self.seen.contains(&event.id) {
        continue;
      }
      fresh.push(event.clone());
    }

    fresh.reverse();
    // stable: equal timestamps keep the service's own ordering
    fresh.sort_by_key(|event| event.timestamp);

    if let Some(newest) = events.first() {
      self.marker = Some(newest.id.clone());
    }
    for event in &fresh {
      self.seen.insert(event.id.clone());
    }

    fresh
  }

  /// Fetch events newer than the marker and return those not seen before.
  /// A missing stack has no new events.
  pub async fn poll(&mut self, gateway: &dyn StackGateway, stack: &str) -> Result<Vec<StackEvent>, GatewayError> {
    match gateway.describe_events(stack, self.marker.as_deref()).await {
      Ok(events) => Ok(self.absorb(&events)),
      Err(GatewayError::NotFound { .. }) => Ok(Vec::new()),
      Err(e) => Err(e),
    }
  }
}
