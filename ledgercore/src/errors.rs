//! Error types for the ledger, layered the way the crates are.
//!
//! Each seam gets its own enum: [`AccountError`] for the aggregate,
//! [`EventStoreError`] and [`SnapshotError`] for the stores, [`RateError`]
//! for the exchange-rate oracle, and [`LedgerError`] as the service surface
//! that wraps them. Domain rejections and optimistic-lock conflicts are
//! recoverable; version mismatches and invariant violations during replay
//! indicate a corrupt log and are fatal for the operation that hit them.

use rust_decimal::Decimal;
use thiserror::Error;

use crate::money::{Currency, Money, MoneyError};
use crate::types::{AccountId, EventId, EventVersion, TransferId};

/// Errors surfaced by the account aggregate's command handlers and event
/// applicator.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AccountError {
    /// A caller-supplied input violates a business rule. Recoverable.
    #[error("{0}")]
    Domain(String),

    /// The requested debit exceeds the held balance. Recoverable.
    #[error("insufficient funds in account {account}: requested {requested}, available {available}")]
    InsufficientFunds {
        /// The account that lacked funds
        account: AccountId,
        /// What the command asked for
        requested: Money,
        /// What the account held
        available: Money,
    },

    /// A create command was issued for an already-live aggregate. Recoverable.
    #[error("account {id} already exists (version {version})")]
    AccountExists {
        /// The live account
        id: AccountId,
        /// Its current version
        version: EventVersion,
    },

    /// An event arrived out of sequence during application. Fatal: the
    /// stream is corrupt relative to this aggregate instance.
    #[error("version mismatch on account {account}: expected {expected}, event {event_id} carries {actual}")]
    VersionMismatch {
        /// The aggregate being mutated
        account: AccountId,
        /// The only version it would accept
        expected: EventVersion,
        /// The version the event carried
        actual: EventVersion,
        /// The offending event
        event_id: EventId,
    },

    /// Applying a stored event would drive a balance negative. Fatal data
    /// corruption: the event log contradicts itself.
    #[error(
        "invariant violation: applying {event_type} v{version} to account {account} \
         would drive the {currency} balance negative ({balance} - {debit})"
    )]
    InvariantViolation {
        /// The aggregate being mutated
        account: AccountId,
        /// The balance that would go negative
        currency: Currency,
        /// Wire tag of the offending event
        event_type: &'static str,
        /// Version the event carried
        version: EventVersion,
        /// Balance before the debit
        balance: Decimal,
        /// Amount the event tried to debit
        debit: Decimal,
    },

    /// The event does not belong to this aggregate.
    #[error("event {event_id} does not belong to account {account} (targets {aggregate_id})")]
    ForeignEvent {
        /// The aggregate that rejected the event
        account: AccountId,
        /// The offending event
        event_id: EventId,
        /// The aggregate the event names
        aggregate_id: AccountId,
    },
}

impl From<MoneyError> for AccountError {
    fn from(err: MoneyError) -> Self {
        Self::Domain(err.to_string())
    }
}

/// Errors from the append-only event store.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EventStoreError {
    /// The stored version did not match the expected base version. The
    /// caller lost an optimistic-concurrency race and may reload and retry.
    #[error("version conflict on account {aggregate}: expected {expected}, current version is {current}")]
    VersionConflict {
        /// The contended aggregate
        aggregate: AccountId,
        /// The base version the writer expected
        expected: EventVersion,
        /// The version actually stored
        current: EventVersion,
    },

    /// The batch's versions are not contiguous from the expected base.
    /// Programmer error; the batch is rejected wholesale.
    #[error("event sequence error for account {aggregate}: expected version {expected}, event {event_id} carries {actual}")]
    SequenceError {
        /// The target aggregate
        aggregate: AccountId,
        /// The version the batch position required
        expected: EventVersion,
        /// The version the event carried
        actual: EventVersion,
        /// The offending event
        event_id: EventId,
    },

    /// An event in the batch names a different aggregate than the stream.
    /// Programmer error; the batch is rejected wholesale.
    #[error("aggregate id mismatch: stream is for {aggregate}, event {event_id} targets {actual}")]
    IdMismatch {
        /// The stream's aggregate
        aggregate: AccountId,
        /// The aggregate the event names
        actual: AccountId,
        /// The offending event
        event_id: EventId,
    },

    /// The backing store failed.
    #[error("event store failure: {0}")]
    Storage(String),
}

/// Errors from the snapshot codec and store.
#[derive(Debug, Error)]
pub enum SnapshotError {
    /// The aggregate's state could not be encoded.
    #[error("failed to encode state of account {aggregate} at version {version}")]
    Encode {
        /// The aggregate being captured
        aggregate: AccountId,
        /// Its version at capture time
        version: EventVersion,
        /// The underlying serializer error
        #[source]
        source: serde_json::Error,
    },

    /// The snapshot blob could not be decoded back into an aggregate.
    #[error("failed to decode snapshot of account {aggregate} at version {version}")]
    Decode {
        /// The aggregate named by the snapshot envelope
        aggregate: AccountId,
        /// The version named by the snapshot envelope
        version: EventVersion,
        /// The underlying deserializer error
        #[source]
        source: serde_json::Error,
    },

    /// The backing store failed.
    #[error("snapshot store failure: {0}")]
    Storage(String),
}

/// Errors from the exchange-rate oracle.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RateError {
    /// No rate is known for the ordered pair.
    #[error("exchange rate not found for {from} -> {to}")]
    NotFound {
        /// Source currency
        from: Currency,
        /// Target currency
        to: Currency,
    },

    /// A stored inverse rate is zero and cannot be composed.
    #[error("cannot invert zero rate for {from} -> {to}")]
    ZeroRate {
        /// Source currency
        from: Currency,
        /// Target currency
        to: Currency,
    },
}

/// The error surface of [`LedgerService`](crate::service::LedgerService).
#[derive(Debug, Error)]
pub enum LedgerError {
    /// No events and no snapshot exist for the requested account.
    #[error("account not found: {0}")]
    AccountNotFound(AccountId),

    /// An aggregate-level failure, domain or corruption class.
    #[error(transparent)]
    Account(#[from] AccountError),

    /// An event-store failure, including optimistic-lock conflicts.
    #[error(transparent)]
    Store(#[from] EventStoreError),

    /// The oracle had no rate for a conversion.
    #[error(transparent)]
    Rate(#[from] RateError),

    /// A transfer debited the source but failed to credit the target.
    /// The ledger is inconsistent; an operator or saga must compensate.
    #[error(
        "transfer {transfer_id} left the ledger inconsistent: source {debited} was debited \
         but target {target} was not credited: {reason}"
    )]
    TransferInconsistent {
        /// Correlation id of the broken transfer
        transfer_id: TransferId,
        /// The account that was debited
        debited: AccountId,
        /// The account that was not credited
        target: AccountId,
        /// What went wrong on the credit leg
        reason: String,
    },
}

/// Result alias for aggregate operations.
pub type AccountResult<T> = Result<T, AccountError>;

/// Result alias for event-store operations.
pub type EventStoreResult<T> = Result<T, EventStoreError>;

/// Result alias for snapshot operations.
pub type SnapshotResult<T> = Result<T, SnapshotError>;

/// Result alias for service operations.
pub type LedgerResult<T> = Result<T, LedgerError>;

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn account(id: &str) -> AccountId {
        AccountId::try_new(id).unwrap()
    }

    #[test]
    fn insufficient_funds_message_names_amounts() {
        let err = AccountError::InsufficientFunds {
            account: account("acc-1"),
            requested: Money::new(dec!(1000), Currency::GBP),
            available: Money::new(dec!(800), Currency::GBP),
        };
        assert_eq!(
            err.to_string(),
            "insufficient funds in account acc-1: requested 1000 GBP, available 800 GBP"
        );
    }

    #[test]
    fn version_conflict_message_names_versions() {
        let err = EventStoreError::VersionConflict {
            aggregate: account("acc-1"),
            expected: EventVersion::try_new(3).unwrap(),
            current: EventVersion::try_new(4).unwrap(),
        };
        assert_eq!(
            err.to_string(),
            "version conflict on account acc-1: expected 3, current version is 4"
        );
    }

    #[test]
    fn money_errors_become_domain_errors() {
        let mismatch = MoneyError::CurrencyMismatch {
            left: Currency::USD,
            right: Currency::EUR,
        };
        let err: AccountError = mismatch.into();
        assert!(matches!(err, AccountError::Domain(_)));
    }

    #[test]
    fn store_errors_convert_to_ledger_errors() {
        let err: LedgerError = EventStoreError::Storage("disk on fire".into()).into();
        assert!(matches!(err, LedgerError::Store(_)));
    }
}
