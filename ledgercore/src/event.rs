//! The closed family of ledger events.
//!
//! Every event is a [`LedgerEvent`]: an envelope (`eventId`, `aggregateId`,
//! `version`, `timestamp`) around one variant of [`EventPayload`]. Events
//! serialize as self-describing records discriminated by a `type` tag, with
//! decimal amounts encoded textually; `decode(encode(e)) == e` value-wise.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::money::{BalanceEntry, Currency};
use crate::types::{AccountId, EventId, EventVersion, Timestamp, TransferId};

/// A new account came into existence with the given opening balances.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountCreated {
    /// Opening balances, one entry per currency, each amount non-negative.
    pub initial_balances: Vec<BalanceEntry>,
}

/// Money was deposited into the account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DepositMade {
    /// Deposited amount, strictly positive.
    pub amount: Decimal,
    /// Currency deposited.
    pub currency: Currency,
}

/// Money was withdrawn from the account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WithdrawalMade {
    /// Withdrawn amount, strictly positive.
    pub amount: Decimal,
    /// Currency withdrawn.
    pub currency: Currency,
}

/// Part of one balance was converted into another currency at a recorded rate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CurrencyConverted {
    /// Amount debited from the source currency, strictly positive.
    pub from_amount: Decimal,
    /// Source currency.
    pub from_currency: Currency,
    /// Amount credited to the target currency (`from_amount * exchange_rate`, exact).
    pub to_amount: Decimal,
    /// Target currency, never equal to the source.
    pub to_currency: Currency,
    /// Rate used, strictly positive.
    pub exchange_rate: Decimal,
}

/// One leg of a cross-account transfer.
///
/// The same payload is recorded twice under the same `transfer_id`: once
/// under the source aggregate (where applying it debits) and once under the
/// target aggregate (where applying it credits). Observers distinguish the
/// legs only by the envelope's aggregate id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MoneyTransferred {
    /// Correlation id shared by both legs.
    pub transfer_id: TransferId,
    /// The debited account.
    pub source_account_id: AccountId,
    /// The credited account, never equal to the source.
    pub target_account_id: AccountId,
    /// Amount debited from the source, strictly positive.
    pub debited_amount: Decimal,
    /// Currency debited.
    pub debited_currency: Currency,
    /// Amount credited to the target, strictly positive.
    pub credited_amount: Decimal,
    /// Currency credited.
    pub credited_currency: Currency,
    /// Rate relating debit to credit; `1` for same-currency transfers.
    pub exchange_rate: Decimal,
}

/// The closed, tagged set of ledger event payloads.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum EventPayload {
    /// An account was created.
    AccountCreated(AccountCreated),
    /// A deposit was made.
    DepositMade(DepositMade),
    /// A withdrawal was made.
    WithdrawalMade(WithdrawalMade),
    /// A currency conversion took place.
    CurrencyConverted(CurrencyConverted),
    /// One leg of a cross-account transfer was recorded.
    MoneyTransferred(MoneyTransferred),
}

impl EventPayload {
    /// The wire tag of this payload variant.
    pub const fn event_type(&self) -> &'static str {
        match self {
            Self::AccountCreated(_) => "AccountCreated",
            Self::DepositMade(_) => "DepositMade",
            Self::WithdrawalMade(_) => "WithdrawalMade",
            Self::CurrencyConverted(_) => "CurrencyConverted",
            Self::MoneyTransferred(_) => "MoneyTransferred",
        }
    }
}

impl From<AccountCreated> for EventPayload {
    fn from(event: AccountCreated) -> Self {
        Self::AccountCreated(event)
    }
}

impl From<DepositMade> for EventPayload {
    fn from(event: DepositMade) -> Self {
        Self::DepositMade(event)
    }
}

impl From<WithdrawalMade> for EventPayload {
    fn from(event: WithdrawalMade) -> Self {
        Self::WithdrawalMade(event)
    }
}

impl From<CurrencyConverted> for EventPayload {
    fn from(event: CurrencyConverted) -> Self {
        Self::CurrencyConverted(event)
    }
}

impl From<MoneyTransferred> for EventPayload {
    fn from(event: MoneyTransferred) -> Self {
        Self::MoneyTransferred(event)
    }
}

/// A domain event with its full envelope.
///
/// `version` is the aggregate version *after* this event is applied.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LedgerEvent {
    /// Globally unique event id, assigned at emission.
    pub event_id: EventId,
    /// The aggregate this event belongs to.
    pub aggregate_id: AccountId,
    /// Aggregate version after application, starting at `1`.
    pub version: EventVersion,
    /// Emission instant, UTC.
    pub timestamp: Timestamp,
    /// The type-specific payload.
    #[serde(flatten)]
    pub payload: EventPayload,
}

impl LedgerEvent {
    /// Stamps a payload with a fresh envelope for the given aggregate and version.
    pub fn new(
        aggregate_id: AccountId,
        version: EventVersion,
        payload: impl Into<EventPayload>,
    ) -> Self {
        Self {
            event_id: EventId::generate(),
            aggregate_id,
            version,
            timestamp: Timestamp::now(),
            payload: payload.into(),
        }
    }

    /// The wire tag of the payload.
    pub const fn event_type(&self) -> &'static str {
        self.payload.event_type()
    }
}
