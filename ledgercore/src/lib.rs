//! # ledgercore
//!
//! An event-sourced, multi-currency financial ledger core: the account
//! aggregate, an append-only per-account event log with optimistic
//! concurrency, and snapshot-bounded state reconstruction.
//!
//! ## How it fits together
//!
//! State is never stored directly. Every change to an account is an immutable
//! [`LedgerEvent`] appended to that account's stream; current state is a fold
//! over the stream, bounded by the latest [`Snapshot`]. The [`Account`]
//! aggregate enforces the business rules: commands validate against current
//! state and emit events, events deterministically mutate state, and the two
//! are kept consistent by construction.
//!
//! Concurrent writers against one account each load their own aggregate
//! instance and race on [`EventStore::append`]: the store compares the
//! writer's expected base version with the stored one and rejects the loser
//! with a version conflict. Nothing is locked across the read.
//!
//! ## Quick start
//!
//! ```rust,ignore
//! use ledgercore::{CreateAccount, Deposit, Currency, FixedRateTable, LedgerService};
//! use ledgercore_memory::{InMemoryEventStore, InMemorySnapshotStore};
//! use rust_decimal_macros::dec;
//! use std::collections::HashMap;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let service = LedgerService::new(
//!         InMemoryEventStore::new(),
//!         InMemorySnapshotStore::new(),
//!         FixedRateTable::seeded(),
//!     );
//!
//!     let account_id = service
//!         .create_account(CreateAccount {
//!             account_id: None,
//!             initial_balances: HashMap::from([(Currency::USD, dec!(1000.50))]),
//!         })
//!         .await?;
//!
//!     service
//!         .deposit(Deposit {
//!             account_id: account_id.clone(),
//!             amount: dec!(200),
//!             currency: Currency::USD,
//!         })
//!         .await?;
//!
//!     Ok(())
//! }
//! ```
//!
//! ## What this crate does not do
//!
//! No multi-aggregate atomic transactions: the two-account transfer commits
//! one leg at a time and reports partial failures for a caller-side saga to
//! compensate. No durable storage: adapters implement the [`EventStore`] and
//! [`SnapshotStore`] ports (`ledgercore-memory` ships the in-memory pair).

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod aggregate;
mod commands;
mod errors;
mod event;
mod event_store;
mod money;
mod rates;
mod service;
mod snapshot;
mod types;

pub use aggregate::Account;
pub use commands::{
    ConvertCurrency, CreateAccount, Deposit, GetBalance, GetHistory, TransferMoney, Withdraw,
};
pub use errors::{
    AccountError, AccountResult, EventStoreError, EventStoreResult, LedgerError, LedgerResult,
    RateError, SnapshotError, SnapshotResult,
};
pub use event::{
    AccountCreated, CurrencyConverted, DepositMade, EventPayload, LedgerEvent, MoneyTransferred,
    WithdrawalMade,
};
pub use event_store::{validate_batch, EventStore};
pub use money::{BalanceEntry, Currency, Money, MoneyError, ParseCurrencyError};
pub use rates::{ExchangeRateProvider, FixedRateTable};
pub use service::{LedgerService, DEFAULT_SNAPSHOT_FREQUENCY};
pub use snapshot::{Snapshot, SnapshotStore};
pub use types::{AccountId, EventId, EventVersion, Timestamp, TransferId};
