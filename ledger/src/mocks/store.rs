//! In-memory ledger store.

use crate::error::{LedgerError, Result};
use crate::providers::LedgerStore;
use crate::types::{EntryId, LedgerEntry, MessageId};
use chrono::NaiveDate;
use std::collections::HashMap;
use std::future::Future;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

/// In-memory ledger store.
///
/// Clones share storage. Enforces the same optimistic version check a
/// database-backed store would, and can be told to fail the next saves
/// with a conflict.
#[derive(Debug, Clone, Default)]
pub struct InMemoryLedgerStore {
    entries: Arc<Mutex<HashMap<EntryId, LedgerEntry>>>,
    forced_conflicts: Arc<AtomicUsize>,
    saves: Arc<AtomicUsize>,
}

impl InMemoryLedgerStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the next `count` saves fail with `StorageConflict`.
    pub fn force_conflicts(&self, count: usize) {
        self.forced_conflicts.store(count, Ordering::SeqCst);
    }

    /// Number of successful saves so far.
    #[must_use]
    pub fn save_count(&self) -> usize {
        self.saves.load(Ordering::SeqCst)
    }

    /// Number of stored entries, deleted ones included.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.lock().map_or(0, |entries| entries.len())
    }

    /// Returns `true` if nothing has been stored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn take_forced_conflict(&self) -> bool {
        self.forced_conflicts
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
    }

    fn active_sorted(
        entries: &HashMap<EntryId, LedgerEntry>,
        keep: impl Fn(&LedgerEntry) -> bool,
    ) -> Vec<LedgerEntry> {
        let mut active: Vec<LedgerEntry> = entries
            .values()
            .filter(|entry| entry.is_active() && keep(entry))
            .cloned()
            .collect();
        active.sort_by_key(|entry| (entry.date(), entry.created_at()));
        active
    }
}

fn poisoned() -> LedgerError {
    LedgerError::Storage("in-memory store lock poisoned".to_string())
}

impl LedgerStore for InMemoryLedgerStore {
    fn load(&self, id: EntryId) -> impl Future<Output = Result<Option<LedgerEntry>>> + Send {
        let entries = Arc::clone(&self.entries);

        async move { Ok(entries.lock().map_err(|_| poisoned())?.get(&id).cloned()) }
    }

    fn save(&self, entry: &LedgerEntry) -> impl Future<Output = Result<LedgerEntry>> + Send {
        let entries = Arc::clone(&self.entries);
        let saves = Arc::clone(&self.saves);
        let forced = self.take_forced_conflict();
        let entry = entry.clone();

        async move {
            let id = entry.id();
            if forced {
                return Err(LedgerError::StorageConflict { id });
            }

            let mut guard = entries.lock().map_err(|_| poisoned())?;
            match guard.get(&id) {
                Some(stored) if stored.version() != entry.version() => {
                    return Err(LedgerError::StorageConflict { id });
                }
                None if entry.version() != 0 => return Err(LedgerError::EntryNotFound { id }),
                _ => {}
            }

            let saved = entry.next_version();
            guard.insert(id, saved.clone());
            saves.fetch_add(1, Ordering::SeqCst);
            Ok(saved)
        }
    }

    fn list_active(&self) -> impl Future<Output = Result<Vec<LedgerEntry>>> + Send {
        let entries = Arc::clone(&self.entries);

        async move {
            let guard = entries.lock().map_err(|_| poisoned())?;
            Ok(Self::active_sorted(&guard, |_| true))
        }
    }

    fn list_active_in_date_range(
        &self,
        start: NaiveDate,
        end: NaiveDate,
    ) -> impl Future<Output = Result<Vec<LedgerEntry>>> + Send {
        let entries = Arc::clone(&self.entries);

        async move {
            let guard = entries.lock().map_err(|_| poisoned())?;
            Ok(Self::active_sorted(&guard, |entry| {
                (start..=end).contains(&entry.date())
            }))
        }
    }

    fn find_by_message_id(
        &self,
        message_id: MessageId,
    ) -> impl Future<Output = Result<Option<LedgerEntry>>> + Send {
        let entries = Arc::clone(&self.entries);

        async move {
            let guard = entries.lock().map_err(|_| poisoned())?;
            Ok(guard
                .values()
                .find(|entry| entry.is_active() && entry.message_id() == Some(message_id))
                .cloned())
        }
    }
}
