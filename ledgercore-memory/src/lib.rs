//! In-memory adapters for the `ledgercore` store ports.
//!
//! Thread-safe, non-durable implementations of
//! [`EventStore`](ledgercore::EventStore) and
//! [`SnapshotStore`](ledgercore::SnapshotStore), for tests, development, and
//! the reference CLI. Data lives for the life of the process.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use tracing::warn;

use ledgercore::{
    validate_batch, AccountId, EventStore, EventStoreError, EventStoreResult, EventVersion,
    LedgerEvent, Snapshot, SnapshotResult, SnapshotStore, Timestamp,
};

/// Thread-safe in-memory event store.
///
/// A single `RwLock` guards all streams, so appends to different aggregates
/// serialize against each other here; durable adapters should synchronize
/// per stream instead.
#[derive(Debug, Clone, Default)]
pub struct InMemoryEventStore {
    streams: Arc<RwLock<HashMap<AccountId, Vec<LedgerEvent>>>>,
}

impl InMemoryEventStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl EventStore for InMemoryEventStore {
    async fn append(
        &self,
        aggregate_id: &AccountId,
        expected_version: EventVersion,
        events: Vec<LedgerEvent>,
    ) -> EventStoreResult<()> {
        if events.is_empty() {
            warn!(aggregate = %aggregate_id, "append called with an empty batch");
            return Ok(());
        }

        let mut streams = self.streams.write().expect("RwLock poisoned");
        let stream = streams.entry(aggregate_id.clone()).or_default();

        let current = stream
            .last()
            .map(|event| event.version)
            .unwrap_or_else(EventVersion::initial);
        if current != expected_version {
            return Err(EventStoreError::VersionConflict {
                aggregate: aggregate_id.clone(),
                expected: expected_version,
                current,
            });
        }

        validate_batch(aggregate_id, expected_version, &events)?;

        stream.extend(events);
        Ok(())
    }

    async fn events(&self, aggregate_id: &AccountId) -> EventStoreResult<Vec<LedgerEvent>> {
        let streams = self.streams.read().expect("RwLock poisoned");
        Ok(streams.get(aggregate_id).cloned().unwrap_or_default())
    }

    async fn events_after(
        &self,
        aggregate_id: &AccountId,
        version: EventVersion,
    ) -> EventStoreResult<Vec<LedgerEvent>> {
        let streams = self.streams.read().expect("RwLock poisoned");
        Ok(streams
            .get(aggregate_id)
            .map(|stream| {
                stream
                    .iter()
                    .filter(|event| event.version > version)
                    .cloned()
                    .collect()
            })
            .unwrap_or_default())
    }
}

/// Thread-safe in-memory single-latest-snapshot store.
#[derive(Debug, Clone, Default)]
pub struct InMemorySnapshotStore {
    snapshots: Arc<RwLock<HashMap<AccountId, Snapshot>>>,
}

impl InMemorySnapshotStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SnapshotStore for InMemorySnapshotStore {
    async fn save(&self, mut snapshot: Snapshot) -> SnapshotResult<()> {
        snapshot.timestamp = Timestamp::now();
        let mut snapshots = self.snapshots.write().expect("RwLock poisoned");
        snapshots.insert(snapshot.aggregate_id.clone(), snapshot);
        Ok(())
    }

    async fn latest(&self, aggregate_id: &AccountId) -> SnapshotResult<Option<Snapshot>> {
        let snapshots = self.snapshots.read().expect("RwLock poisoned");
        Ok(snapshots.get(aggregate_id).cloned())
    }
}
