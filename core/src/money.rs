//! Fixed-point money amounts.
//!
//! Every amount in the ledger is a [`Money`]: a [`Decimal`] held at exactly
//! two fractional digits. Equality is exact, so "the clearing brought the
//! cleared amount up to the expense amount" is a plain `==`, never a float
//! tolerance check.
//!
//! Magnitudes are capped at [`Money::MAX`] (one trillion major units) so
//! that sums over any realistic ledger stay far from the decimal bounds.
//!
//! Amounts are signed. The ledger itself only stores non-negative values,
//! but parsed input keeps its sign so that a negative clearing request is
//! rejected with a meaningful error rather than silently losing the `-`.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::iter::Sum;
use std::ops::{Add, Sub};
use std::str::FromStr;
use thiserror::Error;

/// Number of fractional digits every [`Money`] value carries.
pub const MONEY_SCALE: u32 = 2;

/// Errors produced when building a [`Money`] value.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum MoneyError {
    /// The input is not `[-]digits[.digits]` with at most two fractional digits.
    #[error("invalid amount '{input}'")]
    Invalid {
        /// The offending input
        input: String,
    },

    /// The value has more than two significant fractional digits.
    #[error("amount {value} has more than two decimal places")]
    TooPrecise {
        /// The offending value
        value: Decimal,
    },

    /// The value is larger in magnitude than [`Money::MAX`].
    #[error("amount is outside the supported range (at most 1000000000000.00)")]
    Overflow,
}

/// Money amount with two fractional digits.
///
/// Deserialization goes through [`Money::try_from_decimal`], so stored data
/// is held to the same scale and range rules as parsed input.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "Decimal", into = "Decimal")]
pub struct Money(Decimal);

impl Money {
    /// Zero.
    pub const ZERO: Self = Self(Decimal::ZERO);

    /// Largest accepted magnitude: `1000000000000.00`.
    pub const MAX: Self = Self(Decimal::from_parts(276_447_232, 23_283, 0, false, MONEY_SCALE));

    /// Creates an amount from minor units (cents, paise, ...).
    #[must_use]
    pub fn from_cents(cents: i64) -> Self {
        Self(Decimal::new(cents, MONEY_SCALE))
    }

    /// Creates an amount from whole major units.
    #[must_use]
    pub fn from_major(major: i64) -> Self {
        let mut value = Decimal::from(major);
        value.rescale(MONEY_SCALE);
        Self(value)
    }

    /// Creates an amount from an arbitrary decimal.
    ///
    /// Trailing zeros beyond the second fractional digit are accepted
    /// (`12.500` is `12.50`); anything more precise is rejected.
    ///
    /// # Errors
    ///
    /// Returns error if:
    /// - more than two significant fractional digits → `MoneyError::TooPrecise`
    /// - magnitude above [`Money::MAX`] → `MoneyError::Overflow`
    pub fn try_from_decimal(value: Decimal) -> Result<Self, MoneyError> {
        let normalized = value.normalize();
        if normalized.scale() > MONEY_SCALE {
            return Err(MoneyError::TooPrecise { value });
        }
        let mut value = normalized;
        // rescale leaves the scale untouched when the mantissa cannot grow
        value.rescale(MONEY_SCALE);
        if value.scale() != MONEY_SCALE || value.abs() > Self::MAX.0 {
            return Err(MoneyError::Overflow);
        }
        Ok(Self(value))
    }

    /// Returns the underlying decimal (always at scale 2).
    #[must_use]
    pub const fn as_decimal(&self) -> Decimal {
        self.0
    }

    /// Returns `true` if the amount is exactly zero.
    #[must_use]
    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }

    /// Returns `true` if the amount is strictly greater than zero.
    #[must_use]
    pub fn is_positive(&self) -> bool {
        self.0 > Decimal::ZERO
    }

    /// Returns `true` if the magnitude is at most [`Money::MAX`].
    ///
    /// Always `true` for parsed or deserialized values; [`Money::from_major`]
    /// can build larger ones.
    #[must_use]
    pub fn is_within_limit(&self) -> bool {
        self.0.abs() <= Self::MAX.0
    }

    /// Returns `true` if the amount is strictly less than zero.
    #[must_use]
    pub fn is_negative(&self) -> bool {
        self.0 < Decimal::ZERO
    }

    /// Checked addition.
    #[must_use]
    pub fn checked_add(self, rhs: Self) -> Option<Self> {
        self.0.checked_add(rhs.0).map(Self)
    }

    /// Checked subtraction.
    #[must_use]
    pub fn checked_sub(self, rhs: Self) -> Option<Self> {
        self.0.checked_sub(rhs.0).map(Self)
    }
}

/// Saturates at the decimal bounds. Use [`Money::checked_add`] where an
/// overflow has to be reported.
impl Add for Money {
    type Output = Self;

    fn add(self, rhs: Self) -> Self::Output {
        Self(self.0.saturating_add(rhs.0))
    }
}

/// Saturates at the decimal bounds. Use [`Money::checked_sub`] where an
/// overflow has to be reported.
impl Sub for Money {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self::Output {
        Self(self.0.saturating_sub(rhs.0))
    }
}

impl Sum for Money {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::ZERO, Add::add)
    }
}

impl<'a> Sum<&'a Money> for Money {
    fn sum<I: Iterator<Item = &'a Money>>(iter: I) -> Self {
        iter.copied().sum()
    }
}

impl From<Money> for Decimal {
    fn from(money: Money) -> Self {
        money.0
    }
}

impl TryFrom<Decimal> for Money {
    type Error = MoneyError;

    fn try_from(value: Decimal) -> Result<Self, Self::Error> {
        Self::try_from_decimal(value)
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.2}", self.0)
    }
}

/// Strict parse: `[-]digits[.d[d]]`, no separators, no whitespace.
///
/// Thousands separators and decimal commas are the command parser's job;
/// this accepts only the canonical form it produces.
impl FromStr for Money {
    type Err = MoneyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || MoneyError::Invalid {
            input: s.to_string(),
        };

        let unsigned = s.strip_prefix('-').unwrap_or(s);
        let (whole, fraction) = match unsigned.split_once('.') {
            Some((whole, fraction)) => (whole, Some(fraction)),
            None => (unsigned, None),
        };

        if whole.is_empty() || !whole.bytes().all(|b| b.is_ascii_digit()) {
            return Err(invalid());
        }
        if let Some(fraction) = fraction {
            let valid_len = (1..=MONEY_SCALE as usize).contains(&fraction.len());
            if !valid_len || !fraction.bytes().all(|b| b.is_ascii_digit()) {
                return Err(invalid());
            }
        }

        let value = Decimal::from_str(s).map_err(|_| MoneyError::Overflow)?;
        Self::try_from_decimal(value)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use rust_decimal_macros::dec;

    #[test]
    fn display_always_has_two_decimals() {
        assert_eq!(Money::from_major(2500).to_string(), "2500.00");
        assert_eq!(Money::from_cents(4050).to_string(), "40.50");
        assert_eq!(Money::ZERO.to_string(), "0.00");
        assert_eq!(Money::from_cents(-500).to_string(), "-5.00");
    }

    #[test]
    fn parse_accepts_canonical_forms() {
        assert_eq!("50".parse::<Money>().unwrap(), Money::from_major(50));
        assert_eq!("29.99".parse::<Money>().unwrap(), Money::from_cents(2999));
        assert_eq!("40.5".parse::<Money>().unwrap(), Money::from_cents(4050));
        assert_eq!("-5".parse::<Money>().unwrap(), Money::from_major(-5));
    }

    #[test]
    fn parse_rejects_non_canonical_forms() {
        for input in ["", "-", "abc", "1,000", "12.345", "1.", ".5", " 5", "5 ", "+5", "1e3"] {
            assert!(input.parse::<Money>().is_err(), "{input:?} should be rejected");
        }
    }

    #[test]
    fn try_from_decimal_drops_trailing_zeros_only() {
        assert_eq!(
            Money::try_from_decimal(dec!(12.500)).unwrap(),
            Money::from_cents(1250)
        );
        assert_eq!(
            Money::try_from_decimal(dec!(12.345)),
            Err(MoneyError::TooPrecise { value: dec!(12.345) })
        );
    }

    #[test]
    fn equality_is_exact_across_scales() {
        let forty = Money::try_from_decimal(dec!(40)).unwrap();
        let sixty = Money::try_from_decimal(dec!(60.0)).unwrap();
        assert_eq!(forty + sixty, Money::from_major(100));
        assert_eq!(Money::from_major(100) - forty - sixty, Money::ZERO);
    }

    #[test]
    fn values_beyond_the_cap_are_rejected() {
        assert_eq!(Money::MAX, Money::from_major(1_000_000_000_000));
        assert_eq!(Money::MAX.to_string(), "1000000000000.00");
        assert_eq!("1000000000000".parse::<Money>().unwrap(), Money::MAX);

        for input in ["1000000000000.01", "-1000000000000.01", "50000000000000000000000000000"] {
            assert_eq!(input.parse::<Money>(), Err(MoneyError::Overflow), "{input}");
        }
        // 29 digits: the mantissa cannot take two more, so rescale is a no-op.
        let huge = Decimal::from_str("50000000000000000000000000000").unwrap();
        assert_eq!(Money::try_from_decimal(huge), Err(MoneyError::Overflow));
        assert!(!Money::from_major(i64::MAX).is_within_limit());
    }

    #[test]
    fn arithmetic_saturates_instead_of_panicking() {
        let top = Money(Decimal::MAX);
        assert_eq!(top + Money::from_major(1), top);
        assert_eq!(top.checked_add(Money::from_major(1)), None);
        assert_eq!(Money(Decimal::MIN) - Money::from_major(1), Money(Decimal::MIN));
    }

    #[test]
    fn sum_of_empty_iterator_is_zero() {
        let amounts: Vec<Money> = Vec::new();
        assert_eq!(amounts.iter().sum::<Money>(), Money::ZERO);
    }

    #[test]
    fn serializes_as_decimal_string() {
        let json = serde_json::to_string(&Money::from_cents(123_456)).unwrap();
        assert_eq!(json, "\"1234.56\"");
        let back: Money = serde_json::from_str(&json).unwrap();
        assert_eq!(back, Money::from_cents(123_456));
    }

    #[test]
    fn deserialization_enforces_scale_and_range() {
        let trimmed: Money = serde_json::from_str("\"12.500\"").unwrap();
        assert_eq!(trimmed.as_decimal().scale(), MONEY_SCALE);
        assert!(serde_json::from_str::<Money>("\"12.345\"").is_err());
        assert!(serde_json::from_str::<Money>("\"50000000000000000000000000000\"").is_err());
    }

    proptest! {
        #[test]
        fn display_parses_back_to_same_value(cents in -10_000_000i64..10_000_000) {
            let money = Money::from_cents(cents);
            prop_assert_eq!(money.to_string().parse::<Money>().unwrap(), money);
        }

        #[test]
        fn subtraction_undoes_addition(a in 0i64..1_000_000, b in 0i64..1_000_000) {
            let (a, b) = (Money::from_cents(a), Money::from_cents(b));
            prop_assert_eq!((a + b) - b, a);
        }
    }
}
