//! In-memory payment log.

use crate::error::{LedgerError, Result};
use crate::providers::PaymentLog;
use crate::types::{EntryId, PaymentRecord};
use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

/// In-memory payment log. Clones share the same records.
#[derive(Debug, Clone, Default)]
pub struct InMemoryPaymentLog {
    records: Arc<Mutex<Vec<PaymentRecord>>>,
    unavailable: Arc<AtomicBool>,
}

impl InMemoryPaymentLog {
    /// Create an empty log.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every append fail until switched back.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    /// Every record, oldest first.
    #[must_use]
    pub fn all(&self) -> Vec<PaymentRecord> {
        self.records
            .lock()
            .map(|records| records.clone())
            .unwrap_or_default()
    }
}

fn poisoned() -> LedgerError {
    LedgerError::Storage("in-memory payment log lock poisoned".to_string())
}

impl PaymentLog for InMemoryPaymentLog {
    fn append(&self, record: &PaymentRecord) -> impl Future<Output = Result<()>> + Send {
        let records = Arc::clone(&self.records);
        let unavailable = self.unavailable.load(Ordering::SeqCst);
        let record = record.clone();

        async move {
            if unavailable {
                return Err(LedgerError::Storage("payment log unavailable".to_string()));
            }
            records.lock().map_err(|_| poisoned())?.push(record);
            Ok(())
        }
    }

    fn list_for_entry(
        &self,
        entry_id: EntryId,
    ) -> impl Future<Output = Result<Vec<PaymentRecord>>> + Send {
        let records = Arc::clone(&self.records);

        async move {
            Ok(records
                .lock()
                .map_err(|_| poisoned())?
                .iter()
                .filter(|record| record.entry_id == entry_id)
                .cloned()
                .collect())
        }
    }
}
