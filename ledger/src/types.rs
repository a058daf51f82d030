//! Domain types for the room ledger.
//!
//! - [`MemberRef`]: a member as seen through the directory (never owned here)
//! - [`LedgerEntry`]: one expense and its settlement state
//! - [`PaymentRecord`]: immutable audit record of a single clearing call
//!
//! `LedgerEntry` keeps its fields private. The only ways to change an entry
//! are the transitions in [`crate::settlement`], which is what keeps
//! `0 <= cleared_amount <= amount` and the `cleared` flag in lockstep. The
//! remaining amount is always computed, never stored.

use crate::error::LedgerError;
use chrono::{DateTime, NaiveDate, Utc};
use roomledger_core::Money;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

macro_rules! uuid_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        pub struct $name(Uuid);

        impl $name {
            #[doc = concat!("Creates a new random `", stringify!($name), "`")]
            #[must_use]
            pub fn new() -> Self {
                Self(Uuid::new_v4())
            }

            #[doc = concat!("Creates a `", stringify!($name), "` from a UUID")]
            #[must_use]
            pub const fn from_uuid(id: Uuid) -> Self {
                Self(id)
            }

            /// Returns the inner UUID
            #[must_use]
            pub const fn as_uuid(&self) -> &Uuid {
                &self.0
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

uuid_id!(
    /// Unique identifier for a ledger entry (expense)
    EntryId
);

uuid_id!(
    /// Unique identifier for a member
    MemberId
);

uuid_id!(
    /// Unique identifier for a payment-history record
    PaymentId
);

/// Chat message id supplied by the transport.
///
/// The message that announced an expense is linked to the entry so that a
/// reply to it can find the entry again.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct MessageId(pub i64);

impl fmt::Display for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// An identity assigned by an external system (chat platform).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ExternalIdentity {
    /// The chat platform's per-user id
    User(i64),
    /// The chat id the member talks to the bot from
    Chat(i64),
}

impl fmt::Display for ExternalIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::User(id) => write!(f, "user:{id}"),
            Self::Chat(id) => write!(f, "chat:{id}"),
        }
    }
}

/// A member as resolved by the member directory.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemberRef {
    /// Member identifier
    pub id: MemberId,
    /// Display name
    pub name: String,
    /// Whether the member holds administrative capabilities
    pub admin: bool,
    /// Chat the member is registered from
    pub chat_id: Option<i64>,
    /// Chat platform user id
    pub user_id: Option<i64>,
}

impl MemberRef {
    /// Creates a non-admin member with no external identities.
    #[must_use]
    pub fn new(id: MemberId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            admin: false,
            chat_id: None,
            user_id: None,
        }
    }

    /// Marks the member as an admin.
    #[must_use]
    pub const fn with_admin(mut self, admin: bool) -> Self {
        self.admin = admin;
        self
    }

    /// Sets the chat platform user id.
    #[must_use]
    pub const fn with_user_id(mut self, user_id: i64) -> Self {
        self.user_id = Some(user_id);
        self
    }

    /// Sets the chat id.
    #[must_use]
    pub const fn with_chat_id(mut self, chat_id: i64) -> Self {
        self.chat_id = Some(chat_id);
        self
    }

    /// Returns `true` if `identity` belongs to this member.
    #[must_use]
    pub fn matches(&self, identity: ExternalIdentity) -> bool {
        match identity {
            ExternalIdentity::User(id) => self.user_id == Some(id),
            ExternalIdentity::Chat(id) => self.chat_id == Some(id),
        }
    }
}

/// Where an entry is in its lifecycle.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EntryStatus {
    /// Nothing cleared yet
    Open,
    /// Some but not all of the amount cleared
    PartiallyCleared,
    /// Cleared in full
    Cleared,
    /// Soft-deleted, kept for audit
    Deleted,
}

impl fmt::Display for EntryStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Open => "OPEN",
            Self::PartiallyCleared => "PARTIALLY CLEARED",
            Self::Cleared => "FULLY CLEARED",
            Self::Deleted => "DELETED",
        };
        f.write_str(label)
    }
}

/// One recorded expense and its settlement state.
///
/// Deserialized entries are checked against the settlement invariants and
/// rejected with [`LedgerError::CorruptEntry`] if they break one.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "StoredEntry")]
pub struct LedgerEntry {
    id: EntryId,
    description: String,
    amount: Money,
    date: NaiveDate,
    owed_by: Option<MemberId>,
    cleared_amount: Money,
    cleared: bool,
    last_cleared_by: Option<MemberId>,
    last_cleared_at: Option<DateTime<Utc>>,
    last_cleared_amount: Option<Money>,
    cleared_by: Option<MemberId>,
    cleared_at: Option<DateTime<Utc>>,
    deleted: bool,
    deleted_by: Option<MemberId>,
    deleted_at: Option<DateTime<Utc>>,
    message_id: Option<MessageId>,
    created_at: DateTime<Utc>,
    version: u64,
}

impl LedgerEntry {
    /// Creates an open entry. Callers validate input first
    /// (see [`crate::settlement::open_entry`]).
    pub(crate) const fn new(
        id: EntryId,
        description: String,
        amount: Money,
        date: NaiveDate,
        owed_by: Option<MemberId>,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            description,
            amount,
            date,
            owed_by,
            cleared_amount: Money::ZERO,
            cleared: false,
            last_cleared_by: None,
            last_cleared_at: None,
            last_cleared_amount: None,
            cleared_by: None,
            cleared_at: None,
            deleted: false,
            deleted_by: None,
            deleted_at: None,
            message_id: None,
            created_at,
            version: 0,
        }
    }

    /// Entry identifier
    #[must_use]
    pub const fn id(&self) -> EntryId {
        self.id
    }

    /// Normalized description
    #[must_use]
    pub fn description(&self) -> &str {
        &self.description
    }

    /// Original claimed total
    #[must_use]
    pub const fn amount(&self) -> Money {
        self.amount
    }

    /// Expense date
    #[must_use]
    pub const fn date(&self) -> NaiveDate {
        self.date
    }

    /// Member who incurred the expense; `None` for general expenses
    #[must_use]
    pub const fn owed_by(&self) -> Option<MemberId> {
        self.owed_by
    }

    /// Cumulative amount settled so far
    #[must_use]
    pub const fn cleared_amount(&self) -> Money {
        self.cleared_amount
    }

    /// Amount not yet settled, always `amount - cleared_amount`
    #[must_use]
    pub fn remaining_amount(&self) -> Money {
        self.amount - self.cleared_amount
    }

    /// `true` once the full amount has been cleared
    #[must_use]
    pub const fn is_cleared(&self) -> bool {
        self.cleared
    }

    /// Payer of the most recent clearing
    #[must_use]
    pub const fn last_cleared_by(&self) -> Option<MemberId> {
        self.last_cleared_by
    }

    /// Time of the most recent clearing
    #[must_use]
    pub const fn last_cleared_at(&self) -> Option<DateTime<Utc>> {
        self.last_cleared_at
    }

    /// Amount of the most recent clearing
    #[must_use]
    pub const fn last_cleared_amount(&self) -> Option<Money> {
        self.last_cleared_amount
    }

    /// Member whose clearing completed the settlement
    #[must_use]
    pub const fn cleared_by(&self) -> Option<MemberId> {
        self.cleared_by
    }

    /// When the settlement completed
    #[must_use]
    pub const fn cleared_at(&self) -> Option<DateTime<Utc>> {
        self.cleared_at
    }

    /// Soft-delete marker
    #[must_use]
    pub const fn is_deleted(&self) -> bool {
        self.deleted
    }

    /// Who deleted the entry
    #[must_use]
    pub const fn deleted_by(&self) -> Option<MemberId> {
        self.deleted_by
    }

    /// When the entry was deleted
    #[must_use]
    pub const fn deleted_at(&self) -> Option<DateTime<Utc>> {
        self.deleted_at
    }

    /// Linked chat message, if any
    #[must_use]
    pub const fn message_id(&self) -> Option<MessageId> {
        self.message_id
    }

    /// Creation timestamp
    #[must_use]
    pub const fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Optimistic-concurrency version; 0 means never persisted.
    #[must_use]
    pub const fn version(&self) -> u64 {
        self.version
    }

    /// Lifecycle status derived from the settlement fields.
    #[must_use]
    pub fn status(&self) -> EntryStatus {
        if self.deleted {
            EntryStatus::Deleted
        } else if self.cleared {
            EntryStatus::Cleared
        } else if self.cleared_amount.is_positive() {
            EntryStatus::PartiallyCleared
        } else {
            EntryStatus::Open
        }
    }

    /// Returns `true` if the entry is visible in active views.
    #[must_use]
    pub const fn is_active(&self) -> bool {
        !self.deleted
    }

    /// Copy of this entry stamped with the next version.
    ///
    /// Stores call this when a save succeeds.
    #[must_use]
    pub fn next_version(&self) -> Self {
        let mut next = self.clone();
        next.version += 1;
        next
    }

    pub(crate) fn record_clearing(
        &mut self,
        payer: MemberId,
        amount: Money,
        new_cleared: Money,
        at: DateTime<Utc>,
    ) {
        self.cleared_amount = new_cleared;
        self.last_cleared_by = Some(payer);
        self.last_cleared_at = Some(at);
        self.last_cleared_amount = Some(amount);

        if new_cleared == self.amount {
            self.cleared = true;
            if self.cleared_by.is_none() {
                self.cleared_by = Some(payer);
                self.cleared_at = Some(at);
            }
        }
    }

    pub(crate) fn mark_deleted(&mut self, actor: MemberId, at: DateTime<Utc>) {
        self.deleted = true;
        self.deleted_by = Some(actor);
        self.deleted_at = Some(at);
    }

    pub(crate) const fn link_message(&mut self, message_id: MessageId) {
        self.message_id = Some(message_id);
    }

    pub(crate) fn apply_edit(
        &mut self,
        description: String,
        amount: Money,
        date: NaiveDate,
        owed_by: Option<MemberId>,
    ) {
        self.description = description;
        self.amount = amount;
        self.date = date;
        self.owed_by = owed_by;
    }
}

/// Wire shape of a [`LedgerEntry`] before validation.
#[derive(Deserialize)]
struct StoredEntry {
    id: EntryId,
    description: String,
    amount: Money,
    date: NaiveDate,
    owed_by: Option<MemberId>,
    cleared_amount: Money,
    cleared: bool,
    last_cleared_by: Option<MemberId>,
    last_cleared_at: Option<DateTime<Utc>>,
    last_cleared_amount: Option<Money>,
    cleared_by: Option<MemberId>,
    cleared_at: Option<DateTime<Utc>>,
    deleted: bool,
    deleted_by: Option<MemberId>,
    deleted_at: Option<DateTime<Utc>>,
    message_id: Option<MessageId>,
    created_at: DateTime<Utc>,
    version: u64,
}

impl StoredEntry {
    fn broken_invariant(&self) -> Option<&'static str> {
        if !self.amount.is_positive() {
            Some("amount must be positive")
        } else if self.cleared_amount.is_negative() || self.cleared_amount > self.amount {
            Some("cleared amount must lie between zero and the amount")
        } else if self.cleared != (self.cleared_amount == self.amount) {
            Some("cleared flag disagrees with the cleared amount")
        } else if self.cleared && (self.cleared_by.is_none() || self.cleared_at.is_none()) {
            Some("cleared entry lacks cleared_by or cleared_at")
        } else if self.cleared_amount.is_positive() && self.last_cleared_by.is_none() {
            Some("partially cleared entry lacks last_cleared_by")
        } else if self.deleted && (self.deleted_by.is_none() || self.deleted_at.is_none()) {
            Some("deleted entry lacks deleted_by or deleted_at")
        } else {
            None
        }
    }
}

impl TryFrom<StoredEntry> for LedgerEntry {
    type Error = LedgerError;

    fn try_from(stored: StoredEntry) -> Result<Self, Self::Error> {
        if let Some(reason) = stored.broken_invariant() {
            return Err(LedgerError::CorruptEntry {
                id: stored.id,
                reason: reason.to_string(),
            });
        }
        Ok(Self {
            id: stored.id,
            description: stored.description,
            amount: stored.amount,
            date: stored.date,
            owed_by: stored.owed_by,
            cleared_amount: stored.cleared_amount,
            cleared: stored.cleared,
            last_cleared_by: stored.last_cleared_by,
            last_cleared_at: stored.last_cleared_at,
            last_cleared_amount: stored.last_cleared_amount,
            cleared_by: stored.cleared_by,
            cleared_at: stored.cleared_at,
            deleted: stored.deleted,
            deleted_by: stored.deleted_by,
            deleted_at: stored.deleted_at,
            message_id: stored.message_id,
            created_at: stored.created_at,
            version: stored.version,
        })
    }
}

/// Administrative edit of an uncleared entry.
///
/// `None` fields keep their current value; `owed_by` uses a nested option
/// so an edit can turn an expense into a general one.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExpenseEdit {
    /// New description
    pub description: Option<String>,
    /// New total
    pub amount: Option<Money>,
    /// New date
    pub date: Option<NaiveDate>,
    /// New owner (`Some(None)` clears it)
    pub owed_by: Option<Option<MemberId>>,
}

/// Immutable audit record written once per successful clearing call.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentRecord {
    /// Record identifier
    pub id: PaymentId,
    /// Entry the payment was applied to
    pub entry_id: EntryId,
    /// Amount applied by this call
    pub amount: Money,
    /// Who paid
    pub cleared_by: MemberId,
    /// When
    pub cleared_at: DateTime<Utc>,
    /// Remaining balance right after this payment
    pub remaining_after: Money,
    /// Whether this payment completed the settlement
    pub completed: bool,
}

/// Result of a successful clearing call.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ClearingOutcome {
    /// The entry as committed
    pub entry: LedgerEntry,
    /// Amount applied by this call
    pub applied: Money,
    /// Audit record, if payment history is enabled
    pub payment: Option<PaymentRecord>,
}

impl ClearingOutcome {
    /// Remaining balance after this payment
    #[must_use]
    pub fn remaining(&self) -> Money {
        self.entry.remaining_amount()
    }

    /// Whether this payment completed the settlement
    #[must_use]
    pub const fn fully_cleared(&self) -> bool {
        self.entry.is_cleared()
    }

    /// Status after this payment
    #[must_use]
    pub fn status(&self) -> EntryStatus {
        self.entry.status()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use roomledger_testing::test_clock;
    use roomledger_core::environment::Clock;

    fn entry(amount: Money) -> LedgerEntry {
        let clock = test_clock();
        LedgerEntry::new(
            EntryId::new(),
            "Groceries".to_string(),
            amount,
            clock.today(),
            Some(MemberId::new()),
            clock.now(),
        )
    }

    #[test]
    fn stored_entries_are_validated_on_load() {
        let clock = test_clock();
        let mut entry = entry(Money::from_major(100));
        let forty = Money::from_major(40);
        entry.record_clearing(MemberId::new(), forty, forty, clock.now());

        let json = serde_json::to_value(&entry).unwrap();
        let loaded: LedgerEntry = serde_json::from_value(json.clone()).unwrap();
        assert_eq!(loaded, entry);

        let tampered = [
            ("cleared_amount", serde_json::json!("150.00")),
            ("cleared", serde_json::json!(true)),
            ("amount", serde_json::json!("0.00")),
            ("deleted", serde_json::json!(true)),
        ];
        for (field, value) in tampered {
            let mut bad = json.clone();
            bad[field] = value;
            let err = serde_json::from_value::<LedgerEntry>(bad).unwrap_err();
            assert!(err.to_string().contains("inconsistent"), "{field}: {err}");
        }
    }

    #[test]
    fn new_entry_is_open_with_full_remaining() {
        let entry = entry(Money::from_major(100));
        assert_eq!(entry.status(), EntryStatus::Open);
        assert_eq!(entry.remaining_amount(), Money::from_major(100));
        assert_eq!(entry.version(), 0);
    }

    #[test]
    fn cleared_by_is_set_once() {
        let clock = test_clock();
        let mut entry = entry(Money::from_major(100));
        let first = MemberId::new();
        let second = MemberId::new();

        entry.record_clearing(first, Money::from_major(40), Money::from_major(40), clock.now());
        assert_eq!(entry.status(), EntryStatus::PartiallyCleared);
        assert_eq!(entry.cleared_by(), None);

        entry.record_clearing(second, Money::from_major(60), Money::from_major(100), clock.now());
        assert_eq!(entry.status(), EntryStatus::Cleared);
        assert_eq!(entry.cleared_by(), Some(second));
        assert_eq!(entry.last_cleared_by(), Some(second));
        assert_eq!(entry.remaining_amount(), Money::ZERO);
    }

    #[test]
    fn member_matches_external_identity() {
        let member = MemberRef::new(MemberId::new(), "Anand")
            .with_user_id(42)
            .with_chat_id(7);
        assert!(member.matches(ExternalIdentity::User(42)));
        assert!(member.matches(ExternalIdentity::Chat(7)));
        assert!(!member.matches(ExternalIdentity::User(7)));
    }

    #[test]
    fn entry_round_trips_through_json() {
        let entry = entry(Money::from_cents(2_550));
        let json = serde_json::to_string(&entry).unwrap();
        let back: LedgerEntry = serde_json::from_str(&json).unwrap();
        assert_eq!(back, entry);
    }
}
