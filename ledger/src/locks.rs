//! Per-entry lock registry.
//!
//! Mutations of one entry run one at a time within this process; mutations
//! of different entries never wait on each other. The store's version check
//! still guards against writers in other processes.

use crate::types::EntryId;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

/// Lazily created async mutex per entry id.
#[derive(Debug, Default)]
pub struct EntryLocks {
    locks: Mutex<HashMap<EntryId, Arc<AsyncMutex<()>>>>,
}

impl EntryLocks {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait for exclusive access to `id`.
    ///
    /// The guard must be held across the whole load-validate-save sequence.
    pub async fn acquire(&self, id: EntryId) -> OwnedMutexGuard<()> {
        let lock = {
            let mut locks = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
            // Drop idle locks; only the map holds a reference to them.
            locks.retain(|_, lock| Arc::strong_count(lock) > 1);
            Arc::clone(locks.entry(id).or_default())
        };
        lock.lock_owned().await
    }

    /// Number of entries with a live lock.
    #[must_use]
    pub fn tracked(&self) -> usize {
        self.locks
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}
