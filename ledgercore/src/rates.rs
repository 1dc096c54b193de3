//! The exchange-rate oracle the ledger consumes.
//!
//! The core treats rates as an external fact: a positive scalar for an
//! ordered currency pair, `1` for the identity pair. [`FixedRateTable`] is
//! the shipped implementation, a seeded in-memory table that composes
//! inverses when only the opposite direction is stored.

use async_trait::async_trait;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::collections::HashMap;

use crate::errors::RateError;
use crate::money::Currency;

/// Supplies exchange rates for currency conversions.
#[async_trait]
pub trait ExchangeRateProvider: Send + Sync {
    /// Returns the positive rate converting `from` into `to`.
    ///
    /// Must return `1` when `from == to`.
    async fn rate(&self, from: Currency, to: Currency) -> Result<Decimal, RateError>;
}

/// A fixed in-memory rate table.
///
/// Looks up the direct pair first; failing that, composes the inverse of the
/// opposite pair (`1 / rate(to, from)`).
#[derive(Debug, Clone, Default)]
pub struct FixedRateTable {
    rates: HashMap<(Currency, Currency), Decimal>,
}

impl FixedRateTable {
    /// An empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// A table seeded with the reference rates.
    pub fn seeded() -> Self {
        Self::new()
            .with_rate(Currency::USD, Currency::EUR, dec!(0.92))
            .with_rate(Currency::USD, Currency::GBP, dec!(0.80))
            .with_rate(Currency::EUR, Currency::USD, dec!(1.08))
            .with_rate(Currency::EUR, Currency::GBP, dec!(0.87))
            .with_rate(Currency::GBP, Currency::USD, dec!(1.25))
            .with_rate(Currency::GBP, Currency::EUR, dec!(1.15))
    }

    /// Adds or replaces the rate for an ordered pair.
    #[must_use]
    pub fn with_rate(mut self, from: Currency, to: Currency, rate: Decimal) -> Self {
        self.rates.insert((from, to), rate);
        self
    }
}

#[async_trait]
impl ExchangeRateProvider for FixedRateTable {
    async fn rate(&self, from: Currency, to: Currency) -> Result<Decimal, RateError> {
        if from == to {
            return Ok(Decimal::ONE);
        }

        if let Some(rate) = self.rates.get(&(from, to)) {
            return Ok(*rate);
        }

        if let Some(inverse) = self.rates.get(&(to, from)) {
            if inverse.is_zero() {
                return Err(RateError::ZeroRate { from, to });
            }
            return Ok(Decimal::ONE / inverse);
        }

        Err(RateError::NotFound { from, to })
    }
}
