//! Settlement engine.
//!
//! Pure state transitions over [`LedgerEntry`]. Every function takes the
//! current entry by reference and returns either the next entry or an
//! error; on error the input is untouched, so a rejected clearing can
//! never leave a half-applied state behind.
//!
//! The I/O shell (load, lock, save, retry) lives in [`crate::service`].
//!
//! # Clearing rules
//!
//! For `clear(entry, payer, amount)`:
//!
//! 1. a deleted entry is rejected (`EntryDeleted`)
//! 2. `amount <= 0` is rejected (`NonPositiveAmount`)
//! 3. a fully cleared entry is rejected (`AlreadyCleared`)
//! 4. `amount > remaining` is rejected (`AmountExceedsRemaining`)
//! 5. otherwise `cleared_amount += amount` and the `last_cleared_*` fields
//!    are overwritten; if the new cleared amount equals the total exactly,
//!    the entry becomes cleared and `cleared_by`/`cleared_at` are set

use crate::error::{LedgerError, Result};
use crate::types::{
    EntryId, ExpenseEdit, LedgerEntry, MemberId, MessageId, PaymentId, PaymentRecord,
};
use chrono::{DateTime, NaiveDate, Utc};
use roomledger_core::Money;
use roomledger_core::environment::Clock;

/// Trims and collapses internal whitespace, then checks the length.
///
/// # Errors
///
/// Returns [`LedgerError::InvalidDescription`] if the result is empty or
/// longer than `max_len` characters.
pub fn normalize_description(raw: &str, max_len: usize) -> Result<String> {
    let normalized = raw.split_whitespace().collect::<Vec<_>>().join(" ");
    if normalized.is_empty() {
        return Err(LedgerError::InvalidDescription {
            reason: "description cannot be empty".to_string(),
        });
    }
    if normalized.chars().count() > max_len {
        return Err(LedgerError::InvalidDescription {
            reason: format!("description must be at most {max_len} characters"),
        });
    }
    Ok(normalized)
}

/// Builds a new open entry, dated today unless `date` is given.
///
/// # Errors
///
/// Returns error if:
/// - `amount <= 0` → `LedgerError::NonPositiveAmount`
/// - `amount` above [`Money::MAX`] → `LedgerError::InvalidAmount`
/// - description empty or too long → `LedgerError::InvalidDescription`
pub fn open_entry(
    owner: Option<MemberId>,
    description: &str,
    amount: Money,
    date: Option<NaiveDate>,
    clock: &impl Clock,
    max_description_len: usize,
) -> Result<LedgerEntry> {
    ensure_valid_total(amount)?;
    let description = normalize_description(description, max_description_len)?;
    Ok(LedgerEntry::new(
        EntryId::new(),
        description,
        amount,
        date.unwrap_or_else(|| clock.today()),
        owner,
        clock.now(),
    ))
}

/// Applies one clearing payment.
///
/// # Errors
///
/// See the module docs for the rejection order.
pub fn apply_clearing(
    entry: &LedgerEntry,
    payer: MemberId,
    amount: Money,
    at: DateTime<Utc>,
) -> Result<LedgerEntry> {
    ensure_not_deleted(entry)?;
    ensure_positive(amount)?;
    if entry.is_cleared() {
        return Err(already_cleared(entry));
    }

    let remaining = entry.remaining_amount();
    if amount > remaining {
        return Err(LedgerError::AmountExceedsRemaining {
            attempted: amount,
            remaining,
        });
    }

    let new_cleared = entry
        .cleared_amount()
        .checked_add(amount)
        .ok_or_else(|| LedgerError::InvalidAmount {
            input: amount.to_string(),
        })?;

    let mut next = entry.clone();
    next.record_clearing(payer, amount, new_cleared, at);
    Ok(next)
}

/// Audit record for a clearing that produced `cleared`.
#[must_use]
pub fn payment_record(cleared: &LedgerEntry, payer: MemberId, amount: Money) -> PaymentRecord {
    PaymentRecord {
        id: PaymentId::new(),
        entry_id: cleared.id(),
        amount,
        cleared_by: payer,
        cleared_at: cleared.last_cleared_at().unwrap_or_else(|| cleared.created_at()),
        remaining_after: cleared.remaining_amount(),
        completed: cleared.is_cleared(),
    }
}

/// Marks an entry deleted.
///
/// # Errors
///
/// Returns [`LedgerError::EntryDeleted`] if it already is.
pub fn apply_soft_delete(
    entry: &LedgerEntry,
    actor: MemberId,
    at: DateTime<Utc>,
) -> Result<LedgerEntry> {
    ensure_not_deleted(entry)?;
    let mut next = entry.clone();
    next.mark_deleted(actor, at);
    Ok(next)
}

/// Applies an administrative edit.
///
/// The total may change, but it must stay above what was already paid.
/// Setting it equal to the cleared amount would settle the entry without
/// a payer, so that is rejected too.
///
/// # Errors
///
/// Returns error if:
/// - entry deleted → `LedgerError::EntryDeleted`
/// - entry cleared → `LedgerError::EditLocked`
/// - new amount not positive → `LedgerError::NonPositiveAmount`
/// - new amount above [`Money::MAX`] → `LedgerError::InvalidAmount`
/// - new amount not above the cleared amount → `LedgerError::AmountBelowCleared`
/// - new description invalid → `LedgerError::InvalidDescription`
pub fn apply_edit(
    entry: &LedgerEntry,
    edit: &ExpenseEdit,
    max_description_len: usize,
) -> Result<LedgerEntry> {
    ensure_not_deleted(entry)?;
    if entry.is_cleared() {
        return Err(LedgerError::EditLocked { id: entry.id() });
    }

    let amount = edit.amount.unwrap_or_else(|| entry.amount());
    ensure_valid_total(amount)?;
    let cleared = entry.cleared_amount();
    if cleared.is_positive() && amount <= cleared {
        return Err(LedgerError::AmountBelowCleared { amount, cleared });
    }

    let description = match &edit.description {
        Some(raw) => normalize_description(raw, max_description_len)?,
        None => entry.description().to_string(),
    };

    let mut next = entry.clone();
    next.apply_edit(
        description,
        amount,
        edit.date.unwrap_or_else(|| entry.date()),
        edit.owed_by.unwrap_or_else(|| entry.owed_by()),
    );
    Ok(next)
}

/// Links the chat message that announced the entry.
///
/// # Errors
///
/// Returns [`LedgerError::EntryDeleted`] for deleted entries.
pub fn link_message(entry: &LedgerEntry, message_id: MessageId) -> Result<LedgerEntry> {
    ensure_not_deleted(entry)?;
    let mut next = entry.clone();
    next.link_message(message_id);
    Ok(next)
}

/// The error reported for an entry that is already settled.
#[must_use]
pub fn already_cleared(entry: &LedgerEntry) -> LedgerError {
    LedgerError::AlreadyCleared {
        id: entry.id(),
        total: entry.amount(),
        cleared_by: entry.cleared_by(),
        cleared_at: entry.cleared_at(),
    }
}

fn ensure_positive(amount: Money) -> Result<()> {
    if amount.is_positive() {
        Ok(())
    } else {
        Err(LedgerError::NonPositiveAmount { amount })
    }
}

fn ensure_valid_total(amount: Money) -> Result<()> {
    ensure_positive(amount)?;
    if amount.is_within_limit() {
        Ok(())
    } else {
        Err(LedgerError::InvalidAmount {
            input: amount.to_string(),
        })
    }
}

const fn ensure_not_deleted(entry: &LedgerEntry) -> Result<()> {
    if entry.is_deleted() {
        Err(LedgerError::EntryDeleted { id: entry.id() })
    } else {
        Ok(())
    }
}
