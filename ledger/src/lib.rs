//! # Room Ledger
//!
//! Shared-expense settlement ledger for a group of room-mates, with a chat
//! command front end.
//!
//! ## Features
//!
//! - **Exact settlement**: partial and full clearing on fixed-point money,
//!   never over-cleared
//! - **Concurrent-safe**: per-entry serialization plus optimistic versioning
//! - **Auditable**: soft deletes and an optional per-payment history
//! - **Chat commands**: `Groceries, 2500` to record, `50 given` to clear
//! - **Testable**: every collaborator is a trait with an in-memory mock
//!
//! ## Architecture
//!
//! ```text
//! chat text ─▶ commands ─▶ ChatLedger ─▶ ExpenseLedger ─▶ settlement (pure)
//!                              │               │
//!                        capability      LedgerStore / MemberDirectory / PaymentLog
//! ```
//!
//! ## Example
//!
//! ```rust,ignore
//! use roomledger::{ExpenseLedger, mocks::*};
//! use roomledger_core::{Money, environment::SystemClock};
//!
//! let ledger = ExpenseLedger::new(
//!     InMemoryLedgerStore::new(),
//!     directory,
//!     InMemoryPaymentLog::new(),
//!     SystemClock,
//! );
//! let entry = ledger.create_expense(Some(ravi), "Groceries", Money::from_major(100), None).await?;
//! ledger.clear(entry.id(), meera, Money::from_major(40)).await?;
//! let outcome = ledger.clear(entry.id(), meera, Money::from_major(60)).await?;
//! assert!(outcome.fully_cleared());
//! ```

#![deny(missing_docs)]
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]
#![deny(clippy::todo)]
#![deny(clippy::unimplemented)]

// Public modules
pub mod balance;
pub mod capability;
pub mod chat;
pub mod commands;
pub mod config;
pub mod error;
pub mod history;
pub mod locks;
pub mod metrics;
pub mod providers;
pub mod service;
pub mod settlement;
pub mod types;

#[cfg(any(test, feature = "test-utils"))]
pub mod mocks;

// Re-export main types for convenience
pub use balance::{BalanceReport, DetailedBalanceReport, LedgerTotals, MemberBalance};
pub use capability::{Permission, authorize, authorize_with};
pub use chat::ChatLedger;
pub use commands::{
    ClearingRequest, CreationRequest, RegistrationRequest, parse_clearing_command,
    parse_creation_command, parse_registration_command,
};
pub use config::LedgerConfig;
pub use error::{ErrorKind, LedgerError, Result};
pub use history::{BoundedHistory, ExportKind, ExportRecord};
pub use service::ExpenseLedger;
pub use types::{
    ClearingOutcome, EntryId, EntryStatus, ExpenseEdit, ExternalIdentity, LedgerEntry, MemberId,
    MemberRef, MessageId, PaymentId, PaymentRecord,
};
