//! Chat command parsing.
//!
//! Three fixed-arity formats, rejected outright on any deviation:
//!
//! | command | format | example |
//! |---------|--------|---------|
//! | create expense | `<description>, <amount>[, <dd/MM/yyyy>]` | `Groceries, 2500` |
//! | clear expense (reply) | `<amount> given` | `50 given` |
//! | register | `<name> <+mobile>` | `Anand +917013209225` |
//!
//! Amounts accept thousands separators (`1,000`, `2.500`) and a decimal
//! comma (`40,50`). A leading `-` is kept so the settlement engine can
//! reject it as non-positive instead of it silently becoming positive.

use crate::error::{LedgerError, Result};
use chrono::NaiveDate;
use regex::Regex;
use roomledger_core::Money;
use roomledger_core::environment::Clock;
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;

/// Date format for the optional creation date.
pub const DATE_FORMAT: &str = "%d/%m/%Y";

/// Keyword that marks a clearing reply.
pub const CLEARING_KEYWORD: &str = "given";

#[allow(clippy::expect_used)]
static RAW_AMOUNT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^-?[\d.,]+$").expect("hardcoded pattern should compile"));

#[allow(clippy::expect_used)]
static NORMALIZED_AMOUNT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\d+(\.\d{1,2})?$").expect("hardcoded pattern should compile"));

#[allow(clippy::expect_used)]
static MOBILE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\+\d{10,14}$").expect("hardcoded pattern should compile"));

/// A parsed expense-creation command.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreationRequest {
    /// Whitespace-normalized description
    pub description: String,
    /// Parsed amount (sign preserved)
    pub amount: Money,
    /// Given date, or today
    pub date: NaiveDate,
}

/// A parsed clearing reply.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClearingRequest {
    /// Amount to clear (sign preserved)
    pub amount: Money,
}

/// A parsed registration command.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistrationRequest {
    /// Display name
    pub name: String,
    /// Mobile number in `+<digits>` form
    pub mobile: String,
}

/// Parses `<description>, <amount>[, <date>]`.
///
/// # Errors
///
/// Returns error if:
/// - fewer than two comma-separated fields → `LedgerError::MalformedInput`
/// - the amount is not numeric → `LedgerError::InvalidAmount`
/// - the date is not `dd/MM/yyyy` → `LedgerError::InvalidDate`
/// - the description is empty or too long → `LedgerError::InvalidDescription`
pub fn parse_creation_command(
    text: &str,
    clock: &impl Clock,
    max_description_len: usize,
) -> Result<CreationRequest> {
    let fields: Vec<&str> = text.splitn(3, ',').map(str::trim).collect();
    let [description, amount, rest @ ..] = fields.as_slice() else {
        return Err(LedgerError::MalformedInput {
            reason: "use '<description>, <amount>[, DD/MM/YYYY]', e.g. 'Groceries, 2500'"
                .to_string(),
        });
    };

    let amount = parse_amount(amount)?;
    let date = match rest.first() {
        Some(raw) if !raw.is_empty() => parse_date(raw)?,
        _ => clock.today(),
    };
    let description = crate::settlement::normalize_description(description, max_description_len)?;

    Ok(CreationRequest {
        description,
        amount,
        date,
    })
}

/// Parses `<amount> given`, keyword case-insensitive.
///
/// Non-positive amounts parse fine; the settlement engine rejects them.
///
/// # Errors
///
/// Returns error if:
/// - not exactly two tokens, or the keyword is missing → `LedgerError::MalformedInput`
/// - the amount is not numeric → `LedgerError::InvalidAmount`
pub fn parse_clearing_command(text: &str) -> Result<ClearingRequest> {
    let tokens: Vec<&str> = text.split_whitespace().collect();
    match tokens.as_slice() {
        [amount, keyword] if keyword.eq_ignore_ascii_case(CLEARING_KEYWORD) => {
            Ok(ClearingRequest {
                amount: parse_amount(amount)?,
            })
        }
        _ => Err(LedgerError::MalformedInput {
            reason: "use '<amount> given', e.g. '50 given'".to_string(),
        }),
    }
}

/// Parses `<name> <+mobile>`. The name may contain spaces.
///
/// # Errors
///
/// Returns error if:
/// - the name or the `+`-prefixed mobile is missing → `LedgerError::MalformedInput`
/// - the mobile is not `+` and 10 to 14 digits → `LedgerError::InvalidMobile`
pub fn parse_registration_command(text: &str) -> Result<RegistrationRequest> {
    let malformed = || LedgerError::MalformedInput {
        reason: "use '<name> <+mobile>', e.g. 'Anand +917013209225'".to_string(),
    };

    let (name, mobile) = text.trim().rsplit_once(char::is_whitespace).ok_or_else(malformed)?;
    let name = name.split_whitespace().collect::<Vec<_>>().join(" ");
    if name.is_empty() || !mobile.starts_with('+') {
        return Err(malformed());
    }
    validate_mobile(mobile)?;

    Ok(RegistrationRequest {
        name,
        mobile: mobile.to_string(),
    })
}

/// Checks the `+<10..14 digits>` mobile format.
///
/// # Errors
///
/// Returns [`LedgerError::InvalidMobile`] on mismatch.
pub fn validate_mobile(mobile: &str) -> Result<()> {
    if MOBILE.is_match(mobile) {
        Ok(())
    } else {
        Err(LedgerError::InvalidMobile {
            input: mobile.to_string(),
        })
    }
}

/// Parses a user-typed amount.
///
/// `1,000` and `2.500` are thousands; `40,50` is forty and a half.
///
/// # Errors
///
/// Returns [`LedgerError::InvalidAmount`] if the input is not a number with
/// at most two decimals after normalization, or is larger than [`Money::MAX`].
pub fn parse_amount(raw: &str) -> Result<Money> {
    let invalid = || LedgerError::InvalidAmount {
        input: raw.to_string(),
    };

    let trimmed = raw.trim();
    if !RAW_AMOUNT.is_match(trimmed) {
        return Err(invalid());
    }
    let (negative, digits) = match trimmed.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, trimmed),
    };

    let normalized = strip_thousands_separators(digits).replace(',', ".");
    if !NORMALIZED_AMOUNT.is_match(&normalized) {
        return Err(invalid());
    }

    let signed = if negative {
        format!("-{normalized}")
    } else {
        normalized
    };
    signed.parse::<Money>().map_err(|_| invalid())
}

/// Parses a `dd/MM/yyyy` date.
///
/// # Errors
///
/// Returns [`LedgerError::InvalidDate`] on mismatch.
pub fn parse_date(raw: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(raw.trim(), DATE_FORMAT).map_err(|_| LedgerError::InvalidDate {
        input: raw.to_string(),
    })
}

/// Drops every `.` or `,` that sits between a digit and three more digits.
fn strip_thousands_separators(input: &str) -> String {
    let chars: Vec<char> = input.chars().collect();
    chars
        .iter()
        .enumerate()
        .filter(|&(i, &c)| {
            let separator = c == '.' || c == ',';
            let after_digit = i > 0 && chars[i - 1].is_ascii_digit();
            let before_three_digits = chars
                .get(i + 1..i + 4)
                .is_some_and(|next| next.iter().all(char::is_ascii_digit));
            !(separator && after_digit && before_three_digits)
        })
        .map(|(_, &c)| c)
        .collect()
}
