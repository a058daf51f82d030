//! Mock provider implementations for testing.
//!
//! Simple in-memory implementations of every provider trait, used by the
//! unit and integration tests and by the demo binary.

pub mod directory;
pub mod payment_log;
pub mod store;

pub use directory::InMemoryMemberDirectory;
pub use payment_log::InMemoryPaymentLog;
pub use store::InMemoryLedgerStore;
