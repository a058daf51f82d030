//! Expense ledger service.
//!
//! The imperative shell around [`crate::settlement`]: resolve members, take
//! the per-entry lock, load, apply the pure transition, save with an
//! optimistic version check, and re-run the whole sequence on a storage
//! conflict up to `max_conflict_retries` times.

use crate::balance::{self, BalanceReport, DetailedBalanceReport, LedgerTotals};
use crate::config::LedgerConfig;
use crate::error::{ErrorKind, LedgerError, Result};
use crate::locks::EntryLocks;
use crate::metrics;
use crate::providers::{LedgerStore, MemberDirectory, PaymentLog};
use crate::settlement;
use crate::types::{
    ClearingOutcome, EntryId, ExpenseEdit, LedgerEntry, MemberId, MemberRef, MessageId,
    PaymentRecord,
};
use chrono::{Datelike, NaiveDate};
use roomledger_core::Money;
use roomledger_core::environment::Clock;

/// Expense ledger over pluggable store, directory, payment log and clock.
pub struct ExpenseLedger<S, D, P, C> {
    store: S,
    directory: D,
    payments: P,
    clock: C,
    config: LedgerConfig,
    locks: EntryLocks,
}

impl<S, D, P, C> ExpenseLedger<S, D, P, C>
where
    S: LedgerStore,
    D: MemberDirectory,
    P: PaymentLog,
    C: Clock,
{
    /// Create a ledger with the default configuration.
    #[must_use]
    pub fn new(store: S, directory: D, payments: P, clock: C) -> Self {
        Self {
            store,
            directory,
            payments,
            clock,
            config: LedgerConfig::default(),
            locks: EntryLocks::new(),
        }
    }

    /// Replace the configuration.
    #[must_use]
    pub fn with_config(mut self, config: LedgerConfig) -> Self {
        self.config = config;
        self
    }

    /// Active configuration.
    #[must_use]
    pub const fn config(&self) -> &LedgerConfig {
        &self.config
    }

    /// Member directory.
    #[must_use]
    pub const fn directory(&self) -> &D {
        &self.directory
    }

    /// Clock used for timestamps and default dates.
    #[must_use]
    pub const fn clock(&self) -> &C {
        &self.clock
    }

    // ═══════════════════════════════════════════════════════════════════════
    // Commands
    // ═══════════════════════════════════════════════════════════════════════

    /// Record a new expense.
    ///
    /// `owner` is `None` for general expenses nobody in particular owes.
    ///
    /// # Errors
    ///
    /// Returns error if:
    /// - the owner is unknown → `LedgerError::MemberNotFound`
    /// - `amount <= 0` → `LedgerError::NonPositiveAmount`
    /// - the description is empty or too long → `LedgerError::InvalidDescription`
    /// - the store fails
    #[tracing::instrument(skip(self, description))]
    pub async fn create_expense(
        &self,
        owner: Option<MemberId>,
        description: &str,
        amount: Money,
        date: Option<NaiveDate>,
    ) -> Result<LedgerEntry> {
        if let Some(owner) = owner {
            self.member(owner).await?;
        }

        let entry = settlement::open_entry(
            owner,
            description,
            amount,
            date,
            &self.clock,
            self.config.max_description_len,
        )?;
        let saved = self.store.save(&entry).await?;

        metrics::record_expense_created();
        tracing::info!(entry = %saved.id(), date = %saved.date(), "Expense recorded");
        Ok(saved)
    }

    /// Apply a clearing payment from `payer`.
    ///
    /// Serialized with every other mutation of the same entry. When payment
    /// history is enabled, the payment record is appended before the entry
    /// lock is released, so records for one entry follow commit order.
    ///
    /// # Errors
    ///
    /// Returns error if:
    /// - the payer is unknown → `LedgerError::MemberNotFound`
    /// - the entry is missing → `LedgerError::EntryNotFound`
    /// - any settlement rule rejects the payment (see [`settlement::apply_clearing`])
    /// - conflicts persist past the retry budget → `LedgerError::StorageConflict`
    /// - the clearing was saved but its payment record was not →
    ///   `LedgerError::PaymentRecordMissing` (do not repeat the request)
    #[tracing::instrument(skip(self))]
    pub async fn clear(
        &self,
        entry_id: EntryId,
        payer: MemberId,
        amount: Money,
    ) -> Result<ClearingOutcome> {
        self.member(payer).await?;

        let at = self.clock.now();
        let _guard = self.locks.acquire(entry_id).await;
        let result = self
            .commit_locked(entry_id, |entry| {
                settlement::apply_clearing(entry, payer, amount, at)
            })
            .await;

        let entry = match result {
            Ok(entry) => entry,
            Err(err) => {
                if err.kind() == ErrorKind::InvariantViolation {
                    metrics::record_clearing_rejected();
                }
                tracing::warn!(entry = %entry_id, error = %err, "Clearing rejected");
                return Err(err);
            }
        };

        metrics::record_clearing(entry.is_cleared());
        tracing::info!(
            entry = %entry_id,
            remaining = %entry.remaining_amount(),
            status = %entry.status(),
            "Clearing applied"
        );

        let payment = if self.config.record_payment_history {
            let record = settlement::payment_record(&entry, payer, amount);
            self.append_payment(&record).await?;
            Some(record)
        } else {
            None
        };

        Ok(ClearingOutcome {
            entry,
            applied: amount,
            payment,
        })
    }

    /// Soft-delete an entry. It stays loadable but leaves every active view.
    ///
    /// # Errors
    ///
    /// Returns error if:
    /// - the actor is unknown → `LedgerError::MemberNotFound`
    /// - the entry is missing → `LedgerError::EntryNotFound`
    /// - the entry is already deleted → `LedgerError::EntryDeleted`
    #[tracing::instrument(skip(self))]
    pub async fn soft_delete(&self, entry_id: EntryId, actor: MemberId) -> Result<()> {
        self.member(actor).await?;

        let at = self.clock.now();
        self.commit(entry_id, |entry| {
            settlement::apply_soft_delete(entry, actor, at)
        })
        .await?;

        metrics::record_expense_deleted();
        tracing::info!(entry = %entry_id, actor = %actor, "Expense deleted");
        Ok(())
    }

    /// Administrative edit of an uncleared entry.
    ///
    /// # Errors
    ///
    /// Returns error if:
    /// - a new owner is unknown → `LedgerError::MemberNotFound`
    /// - the entry is cleared → `LedgerError::EditLocked`
    /// - any rule in [`settlement::apply_edit`] rejects the edit
    #[tracing::instrument(skip(self, edit))]
    pub async fn edit_expense(&self, entry_id: EntryId, edit: ExpenseEdit) -> Result<LedgerEntry> {
        if let Some(Some(owner)) = edit.owed_by {
            self.member(owner).await?;
        }

        let max_len = self.config.max_description_len;
        let entry = self
            .commit(entry_id, |entry| settlement::apply_edit(entry, &edit, max_len))
            .await?;

        tracing::info!(entry = %entry_id, "Expense edited");
        Ok(entry)
    }

    /// Link the chat message that announced the entry.
    ///
    /// # Errors
    ///
    /// Returns error if the entry is missing or deleted.
    #[tracing::instrument(skip(self))]
    pub async fn attach_message_id(
        &self,
        entry_id: EntryId,
        message_id: MessageId,
    ) -> Result<LedgerEntry> {
        self.commit(entry_id, |entry| settlement::link_message(entry, message_id))
            .await
    }

    // ═══════════════════════════════════════════════════════════════════════
    // Queries
    // ═══════════════════════════════════════════════════════════════════════

    /// Load an entry, deleted or not.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::EntryNotFound`] if absent.
    pub async fn get_expense(&self, entry_id: EntryId) -> Result<LedgerEntry> {
        self.store
            .load(entry_id)
            .await?
            .ok_or(LedgerError::EntryNotFound { id: entry_id })
    }

    /// Active entry linked to a chat message.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::NoEntryForMessage`] if none.
    pub async fn find_by_message_id(&self, message_id: MessageId) -> Result<LedgerEntry> {
        self.store
            .find_by_message_id(message_id)
            .await?
            .ok_or(LedgerError::NoEntryForMessage { message_id })
    }

    /// All active entries.
    ///
    /// # Errors
    ///
    /// Returns error if the store fails.
    pub async fn list_active(&self) -> Result<Vec<LedgerEntry>> {
        self.store.list_active().await
    }

    /// Active entries dated within `start..=end`.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::InvalidDateRange`] if `start > end`.
    pub async fn list_in_range(
        &self,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<LedgerEntry>> {
        if start > end {
            return Err(LedgerError::InvalidDateRange { start, end });
        }
        self.store.list_active_in_date_range(start, end).await
    }

    /// Active entries in the calendar month containing `date`.
    ///
    /// # Errors
    ///
    /// Returns error if the store fails.
    pub async fn list_for_month(&self, date: NaiveDate) -> Result<Vec<LedgerEntry>> {
        let (start, end) = month_bounds(date)?;
        self.list_in_range(start, end).await
    }

    /// Active entries in the calendar year containing `date`.
    ///
    /// # Errors
    ///
    /// Returns error if the store fails.
    pub async fn list_for_year(&self, date: NaiveDate) -> Result<Vec<LedgerEntry>> {
        let (start, end) = year_bounds(date)?;
        self.list_in_range(start, end).await
    }

    /// Active entries owned by `member`.
    ///
    /// # Errors
    ///
    /// Returns error if the store fails.
    pub async fn list_for_member(&self, member: MemberId) -> Result<Vec<LedgerEntry>> {
        let mut entries = self.store.list_active().await?;
        entries.retain(|entry| entry.owed_by() == Some(member));
        Ok(entries)
    }

    /// Active general expenses with no owner.
    ///
    /// # Errors
    ///
    /// Returns error if the store fails.
    pub async fn list_unassigned(&self) -> Result<Vec<LedgerEntry>> {
        let mut entries = self.store.list_active().await?;
        entries.retain(|entry| entry.owed_by().is_none());
        Ok(entries)
    }

    /// Payment records for an entry, oldest first.
    ///
    /// # Errors
    ///
    /// Returns error if the payment log fails.
    pub async fn payment_history(&self, entry_id: EntryId) -> Result<Vec<PaymentRecord>> {
        self.payments.list_for_entry(entry_id).await
    }

    /// Per-member balances over active entries.
    ///
    /// # Errors
    ///
    /// Returns error if the store fails or a total overflows.
    pub async fn summarize(&self) -> Result<BalanceReport> {
        balance::summarize(&self.store.list_active().await?)
    }

    /// `debtor -> payer -> amount` breakdown over active entries.
    ///
    /// # Errors
    ///
    /// Returns error if the store fails or a total overflows.
    pub async fn detailed_summarize(&self) -> Result<DetailedBalanceReport> {
        balance::detailed_summarize(&self.store.list_active().await?)
    }

    /// Grand totals over active entries.
    ///
    /// # Errors
    ///
    /// Returns error if the store fails or a total overflows.
    pub async fn totals(&self) -> Result<LedgerTotals> {
        balance::totals(&self.store.list_active().await?)
    }

    // ═══════════════════════════════════════════════════════════════════════
    // Internals
    // ═══════════════════════════════════════════════════════════════════════

    async fn member(&self, id: MemberId) -> Result<MemberRef> {
        self.directory
            .resolve_by_id(id)
            .await?
            .ok_or(LedgerError::MemberNotFound { id })
    }

    /// Lock, load, transform, save; retried on storage conflicts.
    async fn commit<F>(&self, entry_id: EntryId, transition: F) -> Result<LedgerEntry>
    where
        F: Fn(&LedgerEntry) -> Result<LedgerEntry> + Sync,
    {
        let _guard = self.locks.acquire(entry_id).await;
        self.commit_locked(entry_id, transition).await
    }

    /// [`Self::commit`] for callers already holding the entry lock.
    async fn commit_locked<F>(&self, entry_id: EntryId, transition: F) -> Result<LedgerEntry>
    where
        F: Fn(&LedgerEntry) -> Result<LedgerEntry> + Sync,
    {
        let mut attempt = 0;

        loop {
            let current = self
                .store
                .load(entry_id)
                .await?
                .ok_or(LedgerError::EntryNotFound { id: entry_id })?;
            let next = transition(&current)?;

            match self.store.save(&next).await {
                Err(err) if err.is_retryable() && attempt < self.config.max_conflict_retries => {
                    attempt += 1;
                    metrics::record_storage_conflict();
                    tracing::warn!(entry = %entry_id, attempt, "Storage conflict, retrying");
                }
                Err(err) => {
                    if err.is_retryable() {
                        metrics::record_storage_conflict();
                    }
                    return Err(err);
                }
                Ok(saved) => return Ok(saved),
            }
        }
    }

    async fn append_payment(&self, record: &PaymentRecord) -> Result<()> {
        self.payments.append(record).await.map_err(|err| {
            tracing::error!(
                entry = %record.entry_id,
                payment = %record.id,
                error = %err,
                "Failed to write payment record"
            );
            LedgerError::PaymentRecordMissing {
                id: record.entry_id,
                reason: err.to_string(),
            }
        })
    }
}

/// First and last day of the month containing `date`.
fn month_bounds(date: NaiveDate) -> Result<(NaiveDate, NaiveDate)> {
    let invalid = || LedgerError::InvalidDate {
        input: date.to_string(),
    };
    let start = date.with_day(1).ok_or_else(invalid)?;
    let next_month = if date.month() == 12 {
        NaiveDate::from_ymd_opt(date.year() + 1, 1, 1)
    } else {
        NaiveDate::from_ymd_opt(date.year(), date.month() + 1, 1)
    };
    let end = next_month.and_then(|d| d.pred_opt()).ok_or_else(invalid)?;
    Ok((start, end))
}

/// First and last day of the year containing `date`.
fn year_bounds(date: NaiveDate) -> Result<(NaiveDate, NaiveDate)> {
    let invalid = || LedgerError::InvalidDate {
        input: date.to_string(),
    };
    let start = NaiveDate::from_ymd_opt(date.year(), 1, 1).ok_or_else(invalid)?;
    let end = NaiveDate::from_ymd_opt(date.year(), 12, 31).ok_or_else(invalid)?;
    Ok((start, end))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::mocks::{InMemoryLedgerStore, InMemoryMemberDirectory, InMemoryPaymentLog};
    use crate::types::EntryStatus;
    use roomledger_testing::{FixedClock, test_clock};

    type TestLedger =
        ExpenseLedger<InMemoryLedgerStore, InMemoryMemberDirectory, InMemoryPaymentLog, FixedClock>;

    struct Fixture {
        ledger: TestLedger,
        store: InMemoryLedgerStore,
        payments: InMemoryPaymentLog,
        owner: MemberId,
        admin: MemberId,
    }

    fn fixture() -> Fixture {
        let owner = MemberRef::new(MemberId::new(), "Ravi").with_user_id(1);
        let admin = MemberRef::new(MemberId::new(), "Meera").with_admin(true).with_user_id(2);
        let directory = InMemoryMemberDirectory::new()
            .with_member(owner.clone())
            .with_member(admin.clone());
        let store = InMemoryLedgerStore::new();
        let payments = InMemoryPaymentLog::new();
        let ledger = ExpenseLedger::new(store.clone(), directory, payments.clone(), test_clock());
        Fixture {
            ledger,
            store,
            payments,
            owner: owner.id,
            admin: admin.id,
        }
    }

    #[tokio::test]
    async fn create_expense_requires_known_owner() {
        let f = fixture();
        let stranger = MemberId::new();
        let err = f
            .ledger
            .create_expense(Some(stranger), "Milk", Money::from_major(5), None)
            .await
            .unwrap_err();
        assert_eq!(err, LedgerError::MemberNotFound { id: stranger });
        assert!(f.store.is_empty());
    }

    #[tokio::test]
    async fn clearing_appends_one_payment_record_per_call() {
        let f = fixture();
        let entry = f
            .ledger
            .create_expense(Some(f.owner), "Groceries", Money::from_major(100), None)
            .await
            .unwrap();

        let first = f.ledger.clear(entry.id(), f.admin, Money::from_major(40)).await.unwrap();
        assert_eq!(first.applied, Money::from_major(40));
        assert_eq!(first.remaining(), Money::from_major(60));
        assert_eq!(first.status(), EntryStatus::PartiallyCleared);

        let second = f.ledger.clear(entry.id(), f.admin, Money::from_major(60)).await.unwrap();
        assert!(second.fully_cleared());

        let history = f.ledger.payment_history(entry.id()).await.unwrap();
        assert_eq!(history.len(), 2);
        assert!(history[1].completed);
        assert_eq!(history[0].remaining_after, Money::from_major(60));
    }

    #[tokio::test]
    async fn payment_history_can_be_disabled() {
        let f = fixture();
        let ledger = f
            .ledger
            .with_config(LedgerConfig::default().with_payment_history(false));
        let entry = ledger
            .create_expense(None, "Gas", Money::from_major(10), None)
            .await
            .unwrap();

        let outcome = ledger.clear(entry.id(), f.admin, Money::from_major(10)).await.unwrap();
        assert!(outcome.payment.is_none());
        assert!(f.payments.all().is_empty());
    }

    #[tokio::test]
    async fn failed_payment_record_is_surfaced() {
        let f = fixture();
        let entry = f
            .ledger
            .create_expense(Some(f.owner), "Water", Money::from_major(30), None)
            .await
            .unwrap();
        f.payments.set_unavailable(true);

        let err = f
            .ledger
            .clear(entry.id(), f.admin, Money::from_major(30))
            .await
            .unwrap_err();
        assert_eq!(
            err,
            LedgerError::PaymentRecordMissing {
                id: entry.id(),
                reason: "Storage error: payment log unavailable".to_string(),
            }
        );
        assert!(err.is_committed());

        // The clearing itself stands; only the audit record is missing.
        assert!(f.ledger.get_expense(entry.id()).await.unwrap().is_cleared());
        assert!(f.payments.all().is_empty());
    }

    #[tokio::test]
    async fn single_conflict_is_retried() {
        let f = fixture();
        let entry = f
            .ledger
            .create_expense(Some(f.owner), "Rent", Money::from_major(100), None)
            .await
            .unwrap();

        f.store.force_conflicts(1);
        let outcome = f.ledger.clear(entry.id(), f.admin, Money::from_major(50)).await.unwrap();
        assert_eq!(outcome.entry.cleared_amount(), Money::from_major(50));
    }

    #[tokio::test]
    async fn persistent_conflict_is_surfaced_without_mutation() {
        let f = fixture();
        let entry = f
            .ledger
            .create_expense(Some(f.owner), "Rent", Money::from_major(100), None)
            .await
            .unwrap();

        f.store.force_conflicts(2);
        let err = f
            .ledger
            .clear(entry.id(), f.admin, Money::from_major(50))
            .await
            .unwrap_err();
        assert_eq!(err, LedgerError::StorageConflict { id: entry.id() });
        assert!(err.is_retryable());

        let stored = f.ledger.get_expense(entry.id()).await.unwrap();
        assert_eq!(stored.cleared_amount(), Money::ZERO);
        assert!(f.payments.all().is_empty());
    }

    #[tokio::test]
    async fn edit_changes_owner_and_amount() {
        let f = fixture();
        let entry = f
            .ledger
            .create_expense(Some(f.owner), "Internet", Money::from_major(40), None)
            .await
            .unwrap();

        let edit = ExpenseEdit {
            amount: Some(Money::from_major(45)),
            owed_by: Some(Some(f.admin)),
            ..ExpenseEdit::default()
        };
        let edited = f.ledger.edit_expense(entry.id(), edit).await.unwrap();
        assert_eq!(edited.amount(), Money::from_major(45));
        assert_eq!(edited.owed_by(), Some(f.admin));
        assert_eq!(edited.version(), 2);
    }

    #[tokio::test]
    async fn month_and_year_listings_use_calendar_bounds() {
        let f = fixture();
        let dates = [(2024, 12, 31), (2025, 1, 1), (2025, 1, 31), (2025, 2, 1)];
        for (y, m, d) in dates {
            f.ledger
                .create_expense(
                    Some(f.owner),
                    "Item",
                    Money::from_major(1),
                    NaiveDate::from_ymd_opt(y, m, d),
                )
                .await
                .unwrap();
        }

        let january = NaiveDate::from_ymd_opt(2025, 1, 15).unwrap();
        assert_eq!(f.ledger.list_for_month(january).await.unwrap().len(), 2);
        assert_eq!(f.ledger.list_for_year(january).await.unwrap().len(), 3);

        let december = NaiveDate::from_ymd_opt(2024, 12, 1).unwrap();
        assert_eq!(f.ledger.list_for_month(december).await.unwrap().len(), 1);

        let err = f.ledger.list_in_range(january, december).await.unwrap_err();
        assert_eq!(
            err,
            LedgerError::InvalidDateRange {
                start: january,
                end: december
            }
        );
    }

    #[test]
    fn month_bounds_handle_leap_february() {
        let (start, end) = month_bounds(NaiveDate::from_ymd_opt(2024, 2, 10).unwrap()).unwrap();
        assert_eq!(start, NaiveDate::from_ymd_opt(2024, 2, 1).unwrap());
        assert_eq!(end, NaiveDate::from_ymd_opt(2024, 2, 29).unwrap());
    }
}
