//! Ledger configuration.
//!
//! Values are provided by the host application. [`LedgerConfig::from_env`]
//! reads `ROOMLEDGER_*` variables and falls back to the defaults for
//! anything unset or unparsable.

use serde::{Deserialize, Serialize};
use std::env;
use std::str::FromStr;

/// Default maximum description length after whitespace normalization.
pub const DEFAULT_MAX_DESCRIPTION_LEN: usize = 100;

/// Default number of export records kept in memory.
pub const DEFAULT_EXPORT_HISTORY_CAPACITY: usize = 50;

/// Default number of recently processed reply ids remembered for dedup.
pub const DEFAULT_REPLY_DEDUP_CAPACITY: usize = 1024;

/// Ledger configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LedgerConfig {
    /// Append a payment record for every successful clearing.
    ///
    /// Default: true
    pub record_payment_history: bool,

    /// How many times a clearing is re-run after a storage conflict.
    ///
    /// Default: 1
    pub max_conflict_retries: u32,

    /// Maximum description length in characters.
    ///
    /// Default: 100
    pub max_description_len: usize,

    /// Capacity of the export history ring buffer.
    ///
    /// Default: 50
    pub export_history_capacity: usize,

    /// Capacity of the processed-reply cache in the chat flow.
    ///
    /// Default: 1024
    pub reply_dedup_capacity: usize,
}

impl LedgerConfig {
    /// Enable or disable payment history.
    #[must_use]
    pub const fn with_payment_history(mut self, enabled: bool) -> Self {
        self.record_payment_history = enabled;
        self
    }

    /// Set the conflict retry budget.
    #[must_use]
    pub const fn with_max_conflict_retries(mut self, retries: u32) -> Self {
        self.max_conflict_retries = retries;
        self
    }

    /// Set the maximum description length.
    #[must_use]
    pub const fn with_max_description_len(mut self, len: usize) -> Self {
        self.max_description_len = len;
        self
    }

    /// Set the export history capacity.
    #[must_use]
    pub const fn with_export_history_capacity(mut self, capacity: usize) -> Self {
        self.export_history_capacity = capacity;
        self
    }

    /// Set the reply dedup capacity.
    #[must_use]
    pub const fn with_reply_dedup_capacity(mut self, capacity: usize) -> Self {
        self.reply_dedup_capacity = capacity;
        self
    }

    /// Load configuration from environment variables.
    ///
    /// | variable | field |
    /// |----------|-------|
    /// | `ROOMLEDGER_RECORD_PAYMENT_HISTORY` | `record_payment_history` |
    /// | `ROOMLEDGER_MAX_CONFLICT_RETRIES` | `max_conflict_retries` |
    /// | `ROOMLEDGER_MAX_DESCRIPTION_LEN` | `max_description_len` |
    /// | `ROOMLEDGER_EXPORT_HISTORY_CAPACITY` | `export_history_capacity` |
    /// | `ROOMLEDGER_REPLY_DEDUP_CAPACITY` | `reply_dedup_capacity` |
    #[must_use]
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            record_payment_history: env_or(
                "ROOMLEDGER_RECORD_PAYMENT_HISTORY",
                defaults.record_payment_history,
            ),
            max_conflict_retries: env_or(
                "ROOMLEDGER_MAX_CONFLICT_RETRIES",
                defaults.max_conflict_retries,
            ),
            max_description_len: env_or(
                "ROOMLEDGER_MAX_DESCRIPTION_LEN",
                defaults.max_description_len,
            )
            .max(1),
            export_history_capacity: env_or(
                "ROOMLEDGER_EXPORT_HISTORY_CAPACITY",
                defaults.export_history_capacity,
            )
            .max(1),
            reply_dedup_capacity: env_or(
                "ROOMLEDGER_REPLY_DEDUP_CAPACITY",
                defaults.reply_dedup_capacity,
            )
            .max(1),
        }
    }
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            record_payment_history: true,
            max_conflict_retries: 1,
            max_description_len: DEFAULT_MAX_DESCRIPTION_LEN,
            export_history_capacity: DEFAULT_EXPORT_HISTORY_CAPACITY,
            reply_dedup_capacity: DEFAULT_REPLY_DEDUP_CAPACITY,
        }
    }
}

fn env_or<T: FromStr>(key: &str, default: T) -> T {
    match env::var(key) {
        Ok(raw) => raw.trim().parse().unwrap_or_else(|_| {
            tracing::warn!(key, value = %raw, "Ignoring unparsable configuration value");
            default
        }),
        Err(_) => default,
    }
}
