//! Currencies and exact monetary values.
//!
//! Amounts are `rust_decimal::Decimal` everywhere: arithmetic is exact and
//! serialization uses the textual decimal representation, never binary
//! floating point. [`Money`] pairs an amount with a currency and refuses
//! arithmetic between mismatched currencies.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// A currency code from the closed set the ledger supports.
///
/// Currencies are compared by equality only; there is no implicit conversion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Currency {
    /// United States dollar
    USD,
    /// Euro
    EUR,
    /// Pound sterling
    GBP,
}

impl Currency {
    /// The three-letter code for this currency.
    pub const fn code(self) -> &'static str {
        match self {
            Self::USD => "USD",
            Self::EUR => "EUR",
            Self::GBP => "GBP",
        }
    }
}

impl fmt::Display for Currency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// Error returned when parsing an unknown currency code.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown currency: {0}")]
pub struct ParseCurrencyError(String);

impl FromStr for Currency {
    type Err = ParseCurrencyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "USD" => Ok(Self::USD),
            "EUR" => Ok(Self::EUR),
            "GBP" => Ok(Self::GBP),
            other => Err(ParseCurrencyError(other.to_owned())),
        }
    }
}

/// Errors from operations on [`Money`] values.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MoneyError {
    /// The two operands carry different currencies.
    #[error("currency mismatch: cannot combine {left} and {right}")]
    CurrencyMismatch {
        /// Currency of the left operand
        left: Currency,
        /// Currency of the right operand
        right: Currency,
    },
}

/// An exact amount of one currency.
///
/// Arithmetic between two `Money` values is defined only when their
/// currencies are equal; mismatched operands fail with
/// [`MoneyError::CurrencyMismatch`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Money {
    /// The amount, exact and signed.
    pub amount: Decimal,
    /// The currency the amount is denominated in.
    pub currency: Currency,
}

impl Money {
    /// Pairs an amount with a currency.
    pub const fn new(amount: Decimal, currency: Currency) -> Self {
        Self { amount, currency }
    }

    /// Zero in the given currency.
    pub const fn zero(currency: Currency) -> Self {
        Self::new(Decimal::ZERO, currency)
    }

    /// Adds two amounts of the same currency.
    pub fn add(&self, other: &Self) -> Result<Self, MoneyError> {
        self.require_same_currency(other)?;
        Ok(Self::new(self.amount + other.amount, self.currency))
    }

    /// Subtracts an amount of the same currency.
    pub fn subtract(&self, other: &Self) -> Result<Self, MoneyError> {
        self.require_same_currency(other)?;
        Ok(Self::new(self.amount - other.amount, self.currency))
    }

    /// Compares two amounts of the same currency.
    pub fn compare(&self, other: &Self) -> Result<Ordering, MoneyError> {
        self.require_same_currency(other)?;
        Ok(self.amount.cmp(&other.amount))
    }

    /// Whether the amount is exactly zero.
    pub fn is_zero(&self) -> bool {
        self.amount.is_zero()
    }

    /// Whether the amount is strictly negative.
    pub fn is_negative(&self) -> bool {
        self.amount < Decimal::ZERO
    }

    /// Whether the amount is strictly positive.
    pub fn is_positive(&self) -> bool {
        self.amount > Decimal::ZERO
    }

    fn require_same_currency(&self, other: &Self) -> Result<(), MoneyError> {
        if self.currency == other.currency {
            Ok(())
        } else {
            Err(MoneyError::CurrencyMismatch {
                left: self.currency,
                right: other.currency,
            })
        }
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.amount, self.currency)
    }
}

/// One per-currency entry of an account's initial balances.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BalanceEntry {
    /// The currency held.
    pub currency: Currency,
    /// The amount held; never negative in a committed event.
    pub amount: Decimal,
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use rust_decimal_macros::dec;

    #[test]
    fn add_same_currency() {
        let a = Money::new(dec!(10.50), Currency::USD);
        let b = Money::new(dec!(5.25), Currency::USD);
        assert_eq!(a.add(&b).unwrap().amount, dec!(15.75));
    }

    #[test]
    fn subtract_may_go_negative() {
        let a = Money::new(dec!(5), Currency::EUR);
        let b = Money::new(dec!(10), Currency::EUR);
        let diff = a.subtract(&b).unwrap();
        assert!(diff.is_negative());
        assert_eq!(diff.amount, dec!(-5));
    }

    #[test]
    fn mixed_currencies_are_rejected() {
        let usd = Money::new(dec!(1), Currency::USD);
        let gbp = Money::new(dec!(1), Currency::GBP);
        assert!(matches!(
            usd.add(&gbp),
            Err(MoneyError::CurrencyMismatch {
                left: Currency::USD,
                right: Currency::GBP,
            })
        ));
        assert!(usd.subtract(&gbp).is_err());
        assert!(usd.compare(&gbp).is_err());
    }

    #[test]
    fn compare_orders_amounts() {
        let small = Money::new(dec!(1), Currency::USD);
        let large = Money::new(dec!(2), Currency::USD);
        assert_eq!(small.compare(&large).unwrap(), Ordering::Less);
        assert_eq!(large.compare(&small).unwrap(), Ordering::Greater);
        assert_eq!(small.compare(&small).unwrap(), Ordering::Equal);
    }

    #[test]
    fn currency_parses_case_insensitively() {
        assert_eq!("usd".parse::<Currency>().unwrap(), Currency::USD);
        assert_eq!("GBP".parse::<Currency>().unwrap(), Currency::GBP);
        assert!("CHF".parse::<Currency>().is_err());
    }

    #[test]
    fn currency_serializes_as_code() {
        let json = serde_json::to_string(&Currency::EUR).unwrap();
        assert_eq!(json, "\"EUR\"");
    }

    proptest! {
        #[test]
        fn addition_is_exact(cents_a in 0i64..1_000_000_000, cents_b in 0i64..1_000_000_000) {
            let a = Money::new(Decimal::new(cents_a, 2), Currency::USD);
            let b = Money::new(Decimal::new(cents_b, 2), Currency::USD);
            let sum = a.add(&b).unwrap();
            prop_assert_eq!(sum.amount, Decimal::new(cents_a + cents_b, 2));
        }

        #[test]
        fn money_roundtrip_serialization(cents in 0i64..1_000_000_000) {
            let money = Money::new(Decimal::new(cents, 2), Currency::GBP);
            let json = serde_json::to_string(&money).unwrap();
            let back: Money = serde_json::from_str(&json).unwrap();
            prop_assert_eq!(money, back);
        }
    }
}
