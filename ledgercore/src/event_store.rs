//! The append-only event store port.
//!
//! This trait is the persistence seam of the ledger: backend-independent,
//! per-aggregate streams, optimistic concurrency on append. The in-memory
//! adapter lives in the `ledgercore-memory` crate; durable adapters implement
//! the same contract.

use async_trait::async_trait;

use crate::errors::{EventStoreError, EventStoreResult};
use crate::event::LedgerEvent;
use crate::types::{AccountId, EventVersion};

/// An append-only, per-aggregate event log with optimistic concurrency.
#[async_trait]
pub trait EventStore: Send + Sync {
    /// Appends a batch of events to one aggregate's stream.
    ///
    /// Atomically with respect to `aggregate_id`: if the highest stored
    /// version differs from `expected_version` the append fails with
    /// [`EventStoreError::VersionConflict`] and nothing is written. The batch
    /// must be contiguous from `expected_version + 1` and every event must
    /// name `aggregate_id`; violations reject the batch wholesale
    /// ([`EventStoreError::SequenceError`] / [`EventStoreError::IdMismatch`]).
    /// An empty batch is a successful no-op.
    ///
    /// Concurrent appends to the same aggregate serialize: of two writers
    /// with the same `expected_version`, exactly one succeeds. Appends to
    /// different aggregates must not corrupt one another.
    async fn append(
        &self,
        aggregate_id: &AccountId,
        expected_version: EventVersion,
        events: Vec<LedgerEvent>,
    ) -> EventStoreResult<()>;

    /// Returns the full ordered stream for an aggregate, empty if unknown.
    ///
    /// The result is a copy: later appends are not observable through it.
    async fn events(&self, aggregate_id: &AccountId) -> EventStoreResult<Vec<LedgerEvent>>;

    /// Returns all events with version strictly greater than `version`, in order.
    async fn events_after(
        &self,
        aggregate_id: &AccountId,
        version: EventVersion,
    ) -> EventStoreResult<Vec<LedgerEvent>>;
}

/// Checks that a batch is contiguous from `expected_version + 1` and that
/// every event targets `aggregate_id`.
///
/// Adapters call this under their write synchronization so the batch rules
/// are enforced identically everywhere.
pub fn validate_batch(
    aggregate_id: &AccountId,
    expected_version: EventVersion,
    events: &[LedgerEvent],
) -> EventStoreResult<()> {
    let mut next = expected_version;
    for event in events {
        next = next.next();
        if event.version != next {
            return Err(EventStoreError::SequenceError {
                aggregate: aggregate_id.clone(),
                expected: next,
                actual: event.version,
                event_id: event.event_id,
            });
        }
        if event.aggregate_id != *aggregate_id {
            return Err(EventStoreError::IdMismatch {
                aggregate: aggregate_id.clone(),
                actual: event.aggregate_id.clone(),
                event_id: event.event_id,
            });
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::DepositMade;
    use crate::money::Currency;
    use rust_decimal_macros::dec;

    fn account(id: &str) -> AccountId {
        AccountId::try_new(id).unwrap()
    }

    fn deposit(aggregate: &AccountId, version: u64) -> LedgerEvent {
        LedgerEvent::new(
            aggregate.clone(),
            EventVersion::try_new(version).unwrap(),
            DepositMade {
                amount: dec!(1),
                currency: Currency::USD,
            },
        )
    }

    #[test]
    fn contiguous_batch_passes() {
        let id = account("acc-1");
        let batch = vec![deposit(&id, 3), deposit(&id, 4), deposit(&id, 5)];
        assert!(validate_batch(&id, EventVersion::try_new(2).unwrap(), &batch).is_ok());
    }

    #[test]
    fn empty_batch_passes() {
        let id = account("acc-1");
        assert!(validate_batch(&id, EventVersion::initial(), &[]).is_ok());
    }

    #[test]
    fn gap_in_versions_is_a_sequence_error() {
        let id = account("acc-1");
        let batch = vec![deposit(&id, 3), deposit(&id, 5)];
        let err = validate_batch(&id, EventVersion::try_new(2).unwrap(), &batch).unwrap_err();
        assert!(matches!(err, EventStoreError::SequenceError { .. }));
    }

    #[test]
    fn wrong_starting_version_is_a_sequence_error() {
        let id = account("acc-1");
        let batch = vec![deposit(&id, 7)];
        let err = validate_batch(&id, EventVersion::try_new(2).unwrap(), &batch).unwrap_err();
        assert!(matches!(err, EventStoreError::SequenceError { .. }));
    }

    #[test]
    fn foreign_aggregate_id_is_a_mismatch() {
        let id = account("acc-1");
        let other = account("acc-2");
        let batch = vec![deposit(&other, 1)];
        let err = validate_batch(&id, EventVersion::initial(), &batch).unwrap_err();
        assert!(matches!(err, EventStoreError::IdMismatch { .. }));
    }
}
