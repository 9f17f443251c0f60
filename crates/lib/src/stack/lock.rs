//! Name-keyed mutual exclusion for lifecycle operations.
//!
//! The remote service rejects some concurrent operations on one stack but not
//! all of them, and two poll loops on the same stack would each report the
//! other's events. Every mutating operation therefore holds its stack name's
//! lock for the whole invocation.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, OnceLock, PoisonError};

use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};
use tracing::info;

/// Held for the duration of one lifecycle invocation.
#[derive(Debug)]
pub struct StackLockGuard {
  _guard: OwnedMutexGuard<()>,
}

/// Registry of per-name locks. Cheap to clone; clones share the registry.
#[derive(Debug, Clone, Default)]
pub struct StackLocks {
  inner: Arc<Mutex<HashMap<String, Arc<AsyncMutex<()>>>>>,
}

impl StackLocks {
  pub fn new() -> Self {
    Self::default()
  }

  /// The registry shared by every [`Stack`](super::Stack) of the process
  /// unless one is given explicitly.
  pub fn global() -> Self {
    static GLOBAL: OnceLock<StackLocks> = OnceLock::new();
    GLOBAL.get_or_init(StackLocks::new).clone()
  }

  /// Wait for exclusive access to `name`.
  pub async fn acquire(&self, name: &str) -> StackLockGuard {
    let lock = {
      let mut locks = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
      locks.entry(name.to_string()).or_default().clone()
    };

    let guard = match lock.clone().try_lock_owned() {
      Ok(guard) => guard,
      Err(_) => {
        info!(stack = name, "waiting for another operation on this stack to finish");
        lock.lock_owned().await
      }
    };

    StackLockGuard { _guard: guard }
  }

  /// Whether an operation currently holds `name`.
  pub fn is_locked(&self, name: &str) -> bool {
    let locks = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
    locks.get(name).is_some_and(|lock| lock.try_lock().is_err())
  }
}
