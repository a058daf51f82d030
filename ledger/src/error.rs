//! Error types for ledger, settlement and command-parsing operations.

use crate::capability::Permission;
use crate::types::{EntryId, ExternalIdentity, MemberId, MessageId};
use chrono::{DateTime, NaiveDate, Utc};
use roomledger_core::{Money, MoneyError};
use thiserror::Error;

/// Result type alias for ledger operations.
pub type Result<T> = std::result::Result<T, LedgerError>;

/// Broad classification of a [`LedgerError`].
///
/// Transports map a kind to a response class (not found, bad request,
/// forbidden, conflict) without matching on every variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Entry, member or correlation target absent
    NotFound,
    /// Malformed amount, date, description or mobile field
    InvalidInput,
    /// The request would break a settlement invariant
    InvariantViolation,
    /// The actor lacks the capability for the operation
    AccessDenied,
    /// Concurrent write detected under optimistic concurrency
    StorageConflict,
    /// Storage or other infrastructure failure
    Internal,
}

/// Comprehensive error taxonomy for the ledger.
///
/// Variants carry the numeric context (attempted and remaining amounts,
/// totals) so the caller can tell the user exactly what to correct.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum LedgerError {
    // ═══════════════════════════════════════════════════════════
    // Not Found
    // ═══════════════════════════════════════════════════════════

    /// No entry with this id.
    #[error("Expense {id} not found")]
    EntryNotFound {
        /// Requested entry
        id: EntryId,
    },

    /// No active entry is linked to this chat message.
    #[error("No expense is linked to message {message_id}")]
    NoEntryForMessage {
        /// Message the reply pointed at
        message_id: MessageId,
    },

    /// No member with this id.
    #[error("Member {id} not found")]
    MemberNotFound {
        /// Requested member
        id: MemberId,
    },

    /// The external identity is not linked to any member.
    #[error("You are not registered ({identity})")]
    UnregisteredActor {
        /// Identity supplied by the transport
        identity: ExternalIdentity,
    },

    // ═══════════════════════════════════════════════════════════
    // Invalid Input
    // ═══════════════════════════════════════════════════════════

    /// Wrong number of fields or missing keyword.
    #[error("Invalid format: {reason}")]
    MalformedInput {
        /// What was expected
        reason: String,
    },

    /// The amount is not a number with at most two decimals.
    #[error("Invalid amount '{input}'. Use numbers only (e.g. 2500 or 29.99)")]
    InvalidAmount {
        /// The raw amount field
        input: String,
    },

    /// The date is not `dd/MM/yyyy`.
    #[error("Invalid date '{input}'. Use DD/MM/YYYY")]
    InvalidDate {
        /// The raw date field
        input: String,
    },

    /// Empty or over-long description.
    #[error("Invalid description: {reason}")]
    InvalidDescription {
        /// Why the description was rejected
        reason: String,
    },

    /// Mobile number is not `+` followed by 10 to 14 digits.
    #[error("Invalid mobile number '{input}'. Use international format, e.g. +919876543210")]
    InvalidMobile {
        /// The raw mobile field
        input: String,
    },

    /// Range start is after range end.
    #[error("Invalid date range: {start} is after {end}")]
    InvalidDateRange {
        /// Range start
        start: NaiveDate,
        /// Range end
        end: NaiveDate,
    },

    // ═══════════════════════════════════════════════════════════
    // Invariant Violations
    // ═══════════════════════════════════════════════════════════

    /// The clearing amount is larger than what is left on the entry.
    #[error("Cannot clear {attempted}: only {remaining} remaining")]
    AmountExceedsRemaining {
        /// Amount requested
        attempted: Money,
        /// Amount still open
        remaining: Money,
    },

    /// Amounts must be strictly positive.
    #[error("Amount must be greater than zero (got {amount})")]
    NonPositiveAmount {
        /// The rejected amount
        amount: Money,
    },

    /// The entry was soft-deleted and can no longer change.
    #[error("Expense {id} has been deleted")]
    EntryDeleted {
        /// Deleted entry
        id: EntryId,
    },

    /// The entry is already settled in full.
    #[error("Expense {id} is already fully cleared (total {total})")]
    AlreadyCleared {
        /// Settled entry
        id: EntryId,
        /// Entry total
        total: Money,
        /// Who completed the settlement
        cleared_by: Option<MemberId>,
        /// When the settlement completed
        cleared_at: Option<DateTime<Utc>>,
    },

    /// An edit would push the total below what has already been paid.
    #[error("Amount {amount} is below the already cleared {cleared}")]
    AmountBelowCleared {
        /// Requested new total
        amount: Money,
        /// Already cleared
        cleared: Money,
    },

    /// This reply was already processed.
    #[error("Reply {message_id} was already processed")]
    DuplicateReply {
        /// The reply's own message id
        message_id: MessageId,
    },

    // ═══════════════════════════════════════════════════════════
    // Access Denied
    // ═══════════════════════════════════════════════════════════

    /// The actor lacks a capability.
    #[error("Permission denied: {permission} requires an admin")]
    PermissionDenied {
        /// Capability that was missing
        permission: Permission,
    },

    /// Cleared entries are read-only.
    #[error("Expense {id} is cleared and can no longer be edited")]
    EditLocked {
        /// Locked entry
        id: EntryId,
    },

    // ═══════════════════════════════════════════════════════════
    // System Errors
    // ═══════════════════════════════════════════════════════════

    /// Another writer saved the entry first.
    #[error("Concurrent update of expense {id}, please retry")]
    StorageConflict {
        /// Contended entry
        id: EntryId,
    },

    /// The clearing was saved but its payment record was not.
    ///
    /// The entry already reflects the payment; repeating the request would
    /// clear it twice.
    #[error("Clearing of expense {id} was saved but its payment record was not: {reason}")]
    PaymentRecordMissing {
        /// Cleared entry
        id: EntryId,
        /// Payment log failure
        reason: String,
    },

    /// A stored entry breaks the settlement invariants.
    #[error("Stored expense {id} is inconsistent: {reason}")]
    CorruptEntry {
        /// Offending entry
        id: EntryId,
        /// Broken invariant
        reason: String,
    },

    /// A running total left the supported amount range.
    #[error("Amount total exceeds the supported range")]
    AmountOverflow,

    /// Storage backend failure (should not be exposed to users verbatim).
    #[error("Storage error: {0}")]
    Storage(String),
}

impl LedgerError {
    /// Classifies this error.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::EntryNotFound { .. }
            | Self::NoEntryForMessage { .. }
            | Self::MemberNotFound { .. }
            | Self::UnregisteredActor { .. } => ErrorKind::NotFound,
            Self::MalformedInput { .. }
            | Self::InvalidAmount { .. }
            | Self::InvalidDate { .. }
            | Self::InvalidDescription { .. }
            | Self::InvalidMobile { .. }
            | Self::InvalidDateRange { .. } => ErrorKind::InvalidInput,
            Self::AmountExceedsRemaining { .. }
            | Self::NonPositiveAmount { .. }
            | Self::EntryDeleted { .. }
            | Self::AlreadyCleared { .. }
            | Self::AmountBelowCleared { .. }
            | Self::DuplicateReply { .. } => ErrorKind::InvariantViolation,
            Self::PermissionDenied { .. } | Self::EditLocked { .. } => ErrorKind::AccessDenied,
            Self::StorageConflict { .. } => ErrorKind::StorageConflict,
            Self::PaymentRecordMissing { .. }
            | Self::CorruptEntry { .. }
            | Self::AmountOverflow
            | Self::Storage(_) => ErrorKind::Internal,
        }
    }

    /// Returns `true` if the user can fix this by changing their request.
    ///
    /// # Examples
    ///
    /// ```
    /// # use roomledger::LedgerError;
    /// let err = LedgerError::InvalidAmount { input: "abc".to_string() };
    /// assert!(err.is_user_error());
    /// assert!(!LedgerError::Storage("disk full".to_string()).is_user_error());
    /// ```
    #[must_use]
    pub const fn is_user_error(&self) -> bool {
        matches!(
            self.kind(),
            ErrorKind::NotFound | ErrorKind::InvalidInput | ErrorKind::InvariantViolation
        )
    }

    /// Returns `true` if re-running the whole read-validate-write sequence
    /// may succeed.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::StorageConflict { .. })
    }

    /// Returns `true` if the state change was saved despite the error.
    #[must_use]
    pub const fn is_committed(&self) -> bool {
        matches!(self, Self::PaymentRecordMissing { .. })
    }
}

impl From<MoneyError> for LedgerError {
    fn from(err: MoneyError) -> Self {
        let input = match err {
            MoneyError::Invalid { input } => input,
            MoneyError::TooPrecise { value } => value.to_string(),
            MoneyError::Overflow => "overflow".to_string(),
        };
        Self::InvalidAmount { input }
    }
}
