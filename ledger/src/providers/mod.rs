//! Ledger providers.
//!
//! Traits for everything the ledger consumes from its collaborators:
//! entry persistence, the member directory and the payment audit log.
//!
//! Providers are **interfaces**, not implementations. The service is
//! generic over them so that:
//! - **Testing** uses the in-memory mocks (deterministic, failure injection)
//! - **Production** plugs in a database and the bot's member registry
//!
//! Every method returns a `Send` future so a shared ledger can be driven
//! from spawned tasks.

pub mod directory;
pub mod payment_log;
pub mod store;

pub use directory::MemberDirectory;
pub use payment_log::PaymentLog;
pub use store::LedgerStore;
