//! Command and query inputs for the ledger service.
//!
//! Commands express the intent to change an account; queries read without
//! mutating. These are plain data carriers: validation happens in the
//! aggregate, against current state.

use rust_decimal::Decimal;
use std::collections::HashMap;

use crate::money::Currency;
use crate::types::AccountId;

/// Create a new account with opening balances.
#[derive(Debug, Clone, Default)]
pub struct CreateAccount {
    /// Identity for the new account; generated when absent.
    pub account_id: Option<AccountId>,
    /// Opening balances, one entry per currency, each non-negative.
    pub initial_balances: HashMap<Currency, Decimal>,
}

/// Deposit money into an account.
#[derive(Debug, Clone)]
pub struct Deposit {
    /// The target account.
    pub account_id: AccountId,
    /// Amount to deposit, strictly positive.
    pub amount: Decimal,
    /// Currency to deposit.
    pub currency: Currency,
}

/// Withdraw money from an account.
#[derive(Debug, Clone)]
pub struct Withdraw {
    /// The target account.
    pub account_id: AccountId,
    /// Amount to withdraw, strictly positive.
    pub amount: Decimal,
    /// Currency to withdraw.
    pub currency: Currency,
}

/// Convert part of one balance into another currency.
///
/// The rate comes from the service's exchange-rate provider.
#[derive(Debug, Clone)]
pub struct ConvertCurrency {
    /// The target account.
    pub account_id: AccountId,
    /// Amount to convert, strictly positive.
    pub from_amount: Decimal,
    /// Currency to convert from.
    pub from_currency: Currency,
    /// Currency to convert into; must differ from the source.
    pub to_currency: Currency,
}

/// Move money between two accounts in the same currency.
///
/// Cross-currency transfers are out of scope at this entry point: decompose
/// into a conversion plus a same-currency transfer.
#[derive(Debug, Clone)]
pub struct TransferMoney {
    /// The account to debit.
    pub source_account_id: AccountId,
    /// The account to credit; must differ from the source.
    pub target_account_id: AccountId,
    /// Amount to move, strictly positive.
    pub amount: Decimal,
    /// Currency of both legs.
    pub currency: Currency,
}

/// Read an account's balances.
#[derive(Debug, Clone)]
pub struct GetBalance {
    /// The account to read.
    pub account_id: AccountId,
    /// When set, only this currency is returned (zero if not held);
    /// when unset, all held balances are returned.
    pub currency: Option<Currency>,
}

/// Read a page of an account's event history.
#[derive(Debug, Clone)]
pub struct GetHistory {
    /// The account to read.
    pub account_id: AccountId,
    /// Events to skip from the start of the stream.
    pub skip: usize,
    /// Maximum events to return; `None` means no upper bound.
    pub limit: Option<usize>,
}
