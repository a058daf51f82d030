//! Bounded export history.
//!
//! A fixed-capacity ring buffer that forgets the oldest item once full.
//! Shared between tasks behind `&self`; the lock is held only for the
//! push or copy.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::fmt;
use std::sync::Mutex;

/// Concurrent ring buffer with evict-oldest policy.
#[derive(Debug)]
pub struct BoundedHistory<T> {
    items: Mutex<VecDeque<T>>,
    capacity: usize,
}

impl<T: Clone> BoundedHistory<T> {
    /// Create an empty history. A capacity of zero is raised to one.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            items: Mutex::new(VecDeque::with_capacity(capacity)),
            capacity,
        }
    }

    /// Append an item, returning the evicted oldest item if the buffer was full.
    pub fn push(&self, item: T) -> Option<T> {
        let mut items = self
            .items
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        let evicted = if items.len() == self.capacity {
            items.pop_front()
        } else {
            None
        };
        items.push_back(item);
        evicted
    }

    /// Copy of the contents, oldest first.
    #[must_use]
    pub fn snapshot(&self) -> Vec<T> {
        self.items
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .iter()
            .cloned()
            .collect()
    }

    /// Number of items held.
    #[must_use]
    pub fn len(&self) -> usize {
        self.items
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .len()
    }

    /// Returns `true` if nothing has been pushed yet.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Maximum number of items held.
    #[must_use]
    pub const fn capacity(&self) -> usize {
        self.capacity
    }
}

/// What was exported.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ExportKind {
    /// Every active expense
    All,
    /// One calendar month
    Monthly,
    /// One calendar year
    Yearly,
    /// Arbitrary date range
    Range,
}

impl fmt::Display for ExportKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::All => "All",
            Self::Monthly => "Monthly",
            Self::Yearly => "Yearly",
            Self::Range => "Range",
        };
        f.write_str(name)
    }
}

/// One export performed by a transport.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExportRecord {
    /// Export type
    pub kind: ExportKind,
    /// When the export was produced
    pub timestamp: DateTime<Utc>,
    /// File name handed to the user
    pub filename: String,
    /// Size of the produced file
    pub size_bytes: u64,
}

impl ExportRecord {
    /// Human-readable size: bytes below 1 KiB, otherwise KB with one decimal.
    #[must_use]
    pub fn display_size(&self) -> String {
        if self.size_bytes < 1024 {
            format!("{} B", self.size_bytes)
        } else {
            let (whole, rest) = (self.size_bytes / 1024, self.size_bytes % 1024);
            let tenths = whole * 10 + (rest * 10 + 512) / 1024;
            format!("{}.{} KB", tenths / 10, tenths % 10)
        }
    }
}
