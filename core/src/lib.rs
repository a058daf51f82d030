//! # Room Ledger Core
//!
//! Shared building blocks for the room ledger crates.
//!
//! This crate provides the two things every other crate in the workspace
//! leans on:
//!
//! - **Money**: a fixed-point amount with exactly two fractional digits
//!   backed by [`rust_decimal::Decimal`], so clearing checks compare exact
//!   values instead of floats
//! - **Environment**: injected dependencies (currently the [`Clock`]) so
//!   timestamps and "today" are deterministic in tests
//!
//! ## Example
//!
//! ```
//! use roomledger_core::Money;
//!
//! let amount: Money = "2500".parse().unwrap_or(Money::ZERO);
//! let cleared = Money::from_major(1000);
//! assert_eq!((amount - cleared).to_string(), "1500.00");
//! ```
//!
//! [`Clock`]: environment::Clock

// Re-export commonly used types
pub use chrono::{DateTime, NaiveDate, Utc};

pub mod money;

pub use money::{Money, MoneyError};

/// Environment module - Dependency injection traits
///
/// All time-dependent behavior in the ledger goes through these traits so a
/// test can pin the clock and assert exact `cleared_at` / `deleted_at`
/// values.
pub mod environment {
    use chrono::{DateTime, NaiveDate, Utc};

    /// Clock trait - abstracts time operations for testability
    ///
    /// # Examples
    ///
    /// ```
    /// use roomledger_core::environment::{Clock, SystemClock};
    ///
    /// let clock = SystemClock;
    /// assert_eq!(clock.today(), clock.now().date_naive());
    /// ```
    pub trait Clock: Send + Sync {
        /// Get the current time
        fn now(&self) -> DateTime<Utc>;

        /// Get the current calendar date.
        ///
        /// Expenses created without an explicit date are dated with this.
        fn today(&self) -> NaiveDate {
            self.now().date_naive()
        }
    }

    /// Production clock backed by the system time.
    #[derive(Debug, Clone, Copy, Default)]
    pub struct SystemClock;

    impl Clock for SystemClock {
        fn now(&self) -> DateTime<Utc> {
            Utc::now()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::environment::{Clock, SystemClock};

    #[test]
    fn system_clock_today_matches_now() {
        let clock = SystemClock;
        let now = clock.now();
        let today = clock.today();
        assert!(today >= now.date_naive());
    }
}
