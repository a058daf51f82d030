//! Ledger metrics.
//!
//! # Exported Metrics
//!
//! ## Counters
//! - `roomledger_expenses_created_total` - Expenses recorded
//! - `roomledger_clears_total{outcome}` - Clearing calls by outcome
//!   (`partial`, `full`, `rejected`)
//! - `roomledger_storage_conflicts_total` - Optimistic-concurrency conflicts
//! - `roomledger_expenses_deleted_total` - Soft deletes

use metrics::describe_counter;

/// Register all ledger metric descriptions.
///
/// Call once at startup, before any metric is recorded.
pub fn register_ledger_metrics() {
    describe_counter!(
        "roomledger_expenses_created_total",
        "Total number of expenses recorded"
    );
    describe_counter!(
        "roomledger_clears_total",
        "Total number of clearing calls by outcome (partial, full, rejected)"
    );
    describe_counter!(
        "roomledger_storage_conflicts_total",
        "Total number of optimistic-concurrency conflicts on save"
    );
    describe_counter!(
        "roomledger_expenses_deleted_total",
        "Total number of soft-deleted expenses"
    );

    tracing::info!("Ledger metrics registered");
}

/// Record an expense created.
pub fn record_expense_created() {
    metrics::counter!("roomledger_expenses_created_total").increment(1);
}

/// Record a successful clearing.
pub fn record_clearing(fully_cleared: bool) {
    let outcome = if fully_cleared { "full" } else { "partial" };
    metrics::counter!("roomledger_clears_total", "outcome" => outcome).increment(1);
    tracing::debug!(outcome, "Recorded clearing metric");
}

/// Record a clearing rejected by validation.
pub fn record_clearing_rejected() {
    metrics::counter!("roomledger_clears_total", "outcome" => "rejected").increment(1);
}

/// Record a storage conflict.
pub fn record_storage_conflict() {
    metrics::counter!("roomledger_storage_conflicts_total").increment(1);
}

/// Record a soft delete.
pub fn record_expense_deleted() {
    metrics::counter!("roomledger_expenses_deleted_total").increment(1);
}
