//! Running lifecycle operations on several stacks at once.
//!
//! Each job owns its own poll loop and event tracker; nothing is shared
//! between jobs except the gateway and the lock registry.

use std::sync::Arc;

use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{error, info};

use super::Stack;
use super::types::{OperationOptions, Outcome, StackEvent};

/// What to do with a stack.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobKind {
  CreateOrUpdate,
  Create,
  Update,
  Delete,
  Recreate,
}

/// Told about every event of every job, with the name of its stack.
pub type JobObserver = Arc<dyn Fn(&str, &StackEvent) + Send + Sync>;

/// One lifecycle operation on one stack.
#[derive(Debug, Clone)]
pub struct Job {
  pub stack: Stack,
  pub kind: JobKind,
  pub options: OperationOptions,
}

impl Job {
  pub fn new(stack: Stack, kind: JobKind, options: OperationOptions) -> Self {
    Self { stack, kind, options }
  }

  async fn run(self, observer: JobObserver) -> Outcome {
    let name = self.stack.name().to_string();
    let mut sink = |event: &StackEvent| observer(&name, event);

    match self.kind {
      JobKind::CreateOrUpdate => {
        self
          .stack
          .create_or_update(&self.options, Some(&mut sink))
          .await
          .outcome
      }
      JobKind::Create => self.stack.create(&self.options, Some(&mut sink)).await,
      JobKind::Update => self.stack.update(&self.options, Some(&mut sink)).await,
      JobKind::Delete => self.stack.delete(Some(&mut sink)).await,
      JobKind::Recreate => self.stack.recreate(&self.options, Some(&mut sink)).await,
    }
  }
}

fn log_event(stack: &str, event: &StackEvent) {
  info!(
    stack,
    resource = %event.logical_resource_id,
    status = %event.resource_status,
    reason = event.resource_status_reason.as_deref().unwrap_or(""),
    "stack event"
  );
}

/// Run `jobs` with at most `parallelism` in flight, logging their events.
/// Results come back in input order, one per job. A job that panics is
/// reported as failed.
pub async fn run_all(jobs: Vec<Job>, parallelism: usize) -> Vec<(String, Outcome)> {
  run_all_observed(jobs, parallelism, Arc::new(log_event)).await
}

/// [`run_all`], handing every event to `observer` instead of the log.
pub async fn run_all_observed(jobs: Vec<Job>, parallelism: usize, observer: JobObserver) -> Vec<(String, Outcome)> {
  let semaphore = Arc::new(Semaphore::new(parallelism.max(1)));
  let mut join_set = JoinSet::new();
  let mut results: Vec<(String, Option<Outcome>)> = Vec::with_capacity(jobs.len());

  for (index, job) in jobs.into_iter().enumerate() {
    results.push((job.stack.name().to_string(), None));
    let semaphore = semaphore.clone();
    let observer = observer.clone();
    join_set.spawn(async move {
      let Ok(_permit) = semaphore.acquire_owned().await else {
        return (index, Outcome::failed("job runner shut down"));
      };
      (index, job.run(observer).await)
    });
  }

  while let Some(joined) = join_set.join_next().await {
    match joined {
      Ok((index, outcome)) => results[index].1 = Some(outcome),
      Err(e) => error!(error = %e, "stack job panicked"),
    }
  }

  results
    .into_iter()
    .map(|(name, outcome)| (name, outcome.unwrap_or_else(|| Outcome::failed("job panicked"))))
    .collect()
}
