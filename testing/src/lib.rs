//! # Room Ledger Testing
//!
//! Testing utilities and helpers for the room ledger crates.
//!
//! This crate provides:
//! - A deterministic [`FixedClock`] for the `Clock` environment trait
//! - Property-based testing strategies for money amounts
//! - A one-shot tracing subscriber for noisy test debugging
//!
//! ## Example
//!
//! ```ignore
//! use roomledger_testing::test_clock;
//!
//! #[tokio::test]
//! async fn test_clearing_flow() {
//!     let ledger = ExpenseLedger::new(store, directory, payments, test_clock());
//!     let entry = ledger.create_expense(Some(owner), "Groceries", amount, None).await?;
//!     assert_eq!(entry.date, test_clock().today());
//! }
//! ```

use chrono::{DateTime, Duration, Utc};
use roomledger_core::environment::Clock;
use std::sync::{Arc, Mutex};

/// Mock implementations of Environment traits
pub mod mocks {
    use super::{Arc, Clock, DateTime, Duration, Mutex, Utc};

    /// Fixed clock for deterministic tests
    ///
    /// Returns the same time until explicitly advanced, making tests
    /// reproducible. Clones share the same underlying time.
    ///
    /// # Example
    ///
    /// ```
    /// use roomledger_testing::mocks::FixedClock;
    /// use roomledger_core::environment::Clock;
    /// use chrono::{Duration, Utc};
    ///
    /// let clock = FixedClock::new(Utc::now());
    /// let time1 = clock.now();
    /// assert_eq!(time1, clock.now()); // Always the same!
    ///
    /// clock.advance(Duration::minutes(5));
    /// assert_eq!(clock.now() - time1, Duration::minutes(5));
    /// ```
    #[derive(Debug, Clone)]
    pub struct FixedClock {
        time: Arc<Mutex<DateTime<Utc>>>,
    }

    impl FixedClock {
        /// Create a new fixed clock with the given time
        #[must_use]
        pub fn new(time: DateTime<Utc>) -> Self {
            Self {
                time: Arc::new(Mutex::new(time)),
            }
        }

        /// Move the clock forward.
        pub fn advance(&self, by: Duration) {
            if let Ok(mut time) = self.time.lock() {
                *time += by;
            }
        }

        /// Pin the clock to a new instant.
        pub fn set(&self, to: DateTime<Utc>) {
            if let Ok(mut time) = self.time.lock() {
                *time = to;
            }
        }
    }

    impl Clock for FixedClock {
        fn now(&self) -> DateTime<Utc> {
            self.time
                .lock()
                .map_or_else(|poisoned| *poisoned.into_inner(), |time| *time)
        }
    }

    /// Create a default fixed clock for tests (2025-01-15 10:30:00 UTC)
    ///
    /// # Panics
    ///
    /// This function will panic if the hardcoded timestamp fails to parse,
    /// which should never happen in practice.
    #[must_use]
    #[allow(clippy::expect_used)]
    pub fn test_clock() -> FixedClock {
        FixedClock::new(
            DateTime::parse_from_rfc3339("2025-01-15T10:30:00Z")
                .expect("hardcoded timestamp should always parse")
                .with_timezone(&Utc),
        )
    }
}

/// Test helpers and utilities
pub mod helpers {
    use std::sync::Once;

    static TRACING: Once = Once::new();

    /// Install a `fmt` subscriber honoring `RUST_LOG`, once per process.
    ///
    /// Safe to call from every test; only the first call installs anything.
    pub fn init_test_tracing() {
        TRACING.call_once(|| {
            let _ = tracing_subscriber::fmt()
                .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
                .with_test_writer()
                .try_init();
        });
    }
}

/// Property-based testing utilities using proptest.
pub mod properties {
    use proptest::prelude::*;
    use roomledger_core::Money;

    /// Strictly positive amounts up to `max_cents` minor units.
    pub fn positive_money(max_cents: i64) -> impl Strategy<Value = Money> {
        (1..=max_cents.max(1)).prop_map(Money::from_cents)
    }

    /// Any amount (including zero and negatives) within `±max_cents`.
    pub fn any_money(max_cents: i64) -> impl Strategy<Value = Money> {
        let bound = max_cents.abs();
        (-bound..=bound).prop_map(Money::from_cents)
    }

    /// A split of `total_cents` into up to `max_parts` positive pieces that
    /// add up exactly to the total.
    pub fn exact_split(total_cents: i64, max_parts: usize) -> impl Strategy<Value = Vec<Money>> {
        let total = total_cents.max(1);
        proptest::collection::vec(1..=total, 0..max_parts.max(1)).prop_map(move |mut cuts| {
            cuts.sort_unstable();
            cuts.dedup();
            cuts.retain(|cut| *cut < total);
            let mut parts = Vec::with_capacity(cuts.len() + 1);
            let mut previous = 0;
            for cut in cuts {
                parts.push(Money::from_cents(cut - previous));
                previous = cut;
            }
            parts.push(Money::from_cents(total - previous));
            parts
        })
    }
}

// Re-export commonly used items
pub use helpers::init_test_tracing;
pub use mocks::{FixedClock, test_clock};

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use roomledger_core::Money;

    #[test]
    fn test_fixed_clock() {
        let clock = test_clock();
        let time1 = clock.now();
        let time2 = clock.now();
        assert_eq!(time1, time2);
    }

    #[test]
    fn test_fixed_clock_clones_share_time() {
        let clock = test_clock();
        let other = clock.clone();
        clock.advance(Duration::hours(2));
        assert_eq!(clock.now(), other.now());
        assert_eq!(other.today().to_string(), "2025-01-15");
    }

    proptest! {
        #[test]
        fn exact_split_sums_to_total(parts in properties::exact_split(10_000, 6)) {
            let total: Money = parts.iter().sum();
            prop_assert_eq!(total, Money::from_cents(10_000));
            prop_assert!(parts.iter().all(Money::is_positive));
        }
    }
}
