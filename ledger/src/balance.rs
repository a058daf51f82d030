//! Balance aggregation.
//!
//! Summaries are computed on demand from a snapshot of entries. Nothing
//! here is cached or mutated; deleted entries in the input are skipped.
//! Sums are checked, and a total that leaves the decimal range is reported
//! as [`LedgerError::AmountOverflow`].

use crate::error::{LedgerError, Result};
use crate::types::{LedgerEntry, MemberId};
use roomledger_core::Money;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Raised, cleared and outstanding amounts for one member.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemberBalance {
    /// Sum of entry amounts
    pub total: Money,
    /// Sum of cleared amounts
    pub cleared: Money,
    /// `total - cleared`
    pub remaining: Money,
    /// Number of entries counted
    pub entries: usize,
}

impl MemberBalance {
    fn add(&mut self, entry: &LedgerEntry) -> Result<()> {
        self.total = checked_sum(self.total, entry.amount())?;
        self.cleared = checked_sum(self.cleared, entry.cleared_amount())?;
        self.remaining = self
            .total
            .checked_sub(self.cleared)
            .ok_or(LedgerError::AmountOverflow)?;
        self.entries += 1;
        Ok(())
    }
}

fn checked_sum(acc: Money, amount: Money) -> Result<Money> {
    acc.checked_add(amount).ok_or(LedgerError::AmountOverflow)
}

/// Per-member balances plus the general (unassigned) bucket.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BalanceReport {
    /// Balances keyed by owning member
    pub members: BTreeMap<MemberId, MemberBalance>,
    /// Entries without an owner, kept out of `members`
    pub unassigned: MemberBalance,
}

impl BalanceReport {
    /// Balance for one member, zero if they own nothing.
    #[must_use]
    pub fn for_member(&self, member: MemberId) -> MemberBalance {
        self.members.get(&member).copied().unwrap_or_default()
    }
}

/// Who paid what towards each member's expenses.
///
/// `debtor -> payer -> amount`. The payer is the entry's most recent
/// clearer (`last_cleared_by`), and the amount is the entry's whole
/// cleared amount.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DetailedBalanceReport {
    /// Breakdown keyed by debtor, then payer
    pub by_debtor: BTreeMap<MemberId, BTreeMap<MemberId, Money>>,
}

impl DetailedBalanceReport {
    /// Amount `payer` cleared on `debtor`'s entries.
    #[must_use]
    pub fn paid(&self, debtor: MemberId, payer: MemberId) -> Money {
        self.by_debtor
            .get(&debtor)
            .and_then(|payers| payers.get(&payer))
            .copied()
            .unwrap_or(Money::ZERO)
    }
}

/// Grand totals across all active entries.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerTotals {
    /// Sum of entry amounts
    pub total: Money,
    /// Sum of cleared amounts
    pub cleared: Money,
    /// `total - cleared`
    pub remaining: Money,
    /// Number of active entries
    pub entries: usize,
    /// Number of fully cleared entries
    pub fully_cleared: usize,
}

/// Per-member totals over active entries.
///
/// # Errors
///
/// Returns [`LedgerError::AmountOverflow`] if a total leaves the decimal range.
pub fn summarize(entries: &[LedgerEntry]) -> Result<BalanceReport> {
    let mut report = BalanceReport::default();
    for entry in entries.iter().filter(|entry| entry.is_active()) {
        match entry.owed_by() {
            Some(owner) => report.members.entry(owner).or_default().add(entry)?,
            None => report.unassigned.add(entry)?,
        }
    }
    Ok(report)
}

/// `debtor -> payer -> amount` over active entries with both an owner and
/// a clearing payer.
///
/// # Errors
///
/// Returns [`LedgerError::AmountOverflow`] if a total leaves the decimal range.
pub fn detailed_summarize(entries: &[LedgerEntry]) -> Result<DetailedBalanceReport> {
    let mut report = DetailedBalanceReport::default();
    for entry in entries.iter().filter(|entry| entry.is_active()) {
        let (Some(debtor), Some(payer)) = (entry.owed_by(), entry.last_cleared_by()) else {
            continue;
        };
        if !entry.cleared_amount().is_positive() {
            continue;
        }
        let paid = report
            .by_debtor
            .entry(debtor)
            .or_default()
            .entry(payer)
            .or_insert(Money::ZERO);
        *paid = checked_sum(*paid, entry.cleared_amount())?;
    }
    Ok(report)
}

/// Grand totals over active entries, assigned or not.
///
/// # Errors
///
/// Returns [`LedgerError::AmountOverflow`] if a total leaves the decimal range.
pub fn totals(entries: &[LedgerEntry]) -> Result<LedgerTotals> {
    entries
        .iter()
        .filter(|entry| entry.is_active())
        .try_fold(LedgerTotals::default(), |mut acc, entry| {
            acc.total = checked_sum(acc.total, entry.amount())?;
            acc.cleared = checked_sum(acc.cleared, entry.cleared_amount())?;
            acc.remaining = acc
                .total
                .checked_sub(acc.cleared)
                .ok_or(LedgerError::AmountOverflow)?;
            acc.entries += 1;
            if entry.is_cleared() {
                acc.fully_cleared += 1;
            }
            Ok(acc)
        })
}
