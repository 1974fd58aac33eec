//! Per-task in-flight registry
//!
//! A status operation holds a token for its task id until it finishes. A
//! second request for the same id while the token is held is dropped, not
//! queued.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use uuid::Uuid;

#[derive(Debug, Default)]
struct Registry {
    pending: Mutex<HashMap<Uuid, u64>>,
    next_token: AtomicU64,
}

/// Map of task id to the token of its pending operation
#[derive(Debug, Clone, Default)]
pub struct InFlight {
    registry: Arc<Registry>,
}

impl InFlight {
    pub fn new() -> Self {
        Self::default()
    }

    /// Claim `task_id`, or `None` when an operation for it is already running
    pub fn try_acquire(&self, task_id: Uuid) -> Option<InFlightToken> {
        let token = self.registry.next_token.fetch_add(1, Ordering::Relaxed);
        let mut pending = self
            .registry
            .pending
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        if pending.contains_key(&task_id) {
            return None;
        }
        pending.insert(task_id, token);
        Some(InFlightToken {
            registry: Arc::clone(&self.registry),
            task_id,
            token,
        })
    }

    pub fn is_pending(&self, task_id: Uuid) -> bool {
        self.registry
            .pending
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .contains_key(&task_id)
    }
}

/// Releases its task id when dropped
#[derive(Debug)]
pub struct InFlightToken {
    registry: Arc<Registry>,
    task_id: Uuid,
    token: u64,
}

impl InFlightToken {
    pub fn task_id(&self) -> Uuid {
        self.task_id
    }
}

impl Drop for InFlightToken {
    fn drop(&mut self) {
        let mut pending = self
            .registry
            .pending
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        if pending.get(&self.task_id) == Some(&self.token) {
            pending.remove(&self.task_id);
        }
    }
}
