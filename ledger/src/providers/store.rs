//! Ledger entry persistence.

use crate::error::Result;
use crate::types::{EntryId, LedgerEntry, MessageId};
use chrono::NaiveDate;
use std::future::Future;

/// Entry repository with optimistic concurrency.
///
/// Deleted entries stay loadable; only the `list_*` queries hide them.
pub trait LedgerStore: Send + Sync {
    /// Load an entry by id, deleted or not.
    ///
    /// # Errors
    ///
    /// Returns error if the backend fails. A missing entry is `Ok(None)`.
    fn load(&self, id: EntryId) -> impl Future<Output = Result<Option<LedgerEntry>>> + Send;

    /// Persist an entry.
    ///
    /// `entry.version()` must equal the stored version (0 for a new entry).
    /// On success the stored copy carries the next version and is returned.
    ///
    /// # Errors
    ///
    /// Returns error if:
    /// - Stored version differs → `LedgerError::StorageConflict`
    /// - Non-zero version but nothing stored → `LedgerError::EntryNotFound`
    /// - Backend fails → `LedgerError::Storage`
    fn save(&self, entry: &LedgerEntry) -> impl Future<Output = Result<LedgerEntry>> + Send;

    /// All non-deleted entries, ordered by date then creation time.
    ///
    /// # Errors
    ///
    /// Returns error if the backend fails.
    fn list_active(&self) -> impl Future<Output = Result<Vec<LedgerEntry>>> + Send;

    /// Non-deleted entries dated within `start..=end`, same order.
    ///
    /// # Errors
    ///
    /// Returns error if the backend fails.
    fn list_active_in_date_range(
        &self,
        start: NaiveDate,
        end: NaiveDate,
    ) -> impl Future<Output = Result<Vec<LedgerEntry>>> + Send;

    /// The non-deleted entry linked to a chat message.
    ///
    /// # Errors
    ///
    /// Returns error if the backend fails.
    fn find_by_message_id(
        &self,
        message_id: MessageId,
    ) -> impl Future<Output = Result<Option<LedgerEntry>>> + Send;
}
