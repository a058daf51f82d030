//! Payment audit log.

use crate::error::Result;
use crate::types::{EntryId, PaymentRecord};
use std::future::Future;

/// Append-only log of clearing calls.
pub trait PaymentLog: Send + Sync {
    /// Append one record. Records are never modified afterwards.
    ///
    /// # Errors
    ///
    /// Returns error if the backend fails.
    fn append(&self, record: &PaymentRecord) -> impl Future<Output = Result<()>> + Send;

    /// Records for one entry, oldest first.
    ///
    /// # Errors
    ///
    /// Returns error if the backend fails.
    fn list_for_entry(
        &self,
        entry_id: EntryId,
    ) -> impl Future<Output = Result<Vec<PaymentRecord>>> + Send;
}
