//! State snapshots: the codec and the store port.
//!
//! A snapshot bounds reconstruction cost: the service decodes the latest one
//! and replays only the events past its version. The event log stays
//! authoritative; a snapshot is a hint that may lawfully lag or lead the log.

use async_trait::async_trait;
use tracing::warn;

use crate::aggregate::Account;
use crate::errors::{SnapshotError, SnapshotResult};
use crate::types::{AccountId, EventVersion, Timestamp};

/// An aggregate's materialized state at some version, as an opaque blob.
#[derive(Debug, Clone)]
pub struct Snapshot {
    /// The aggregate this snapshot belongs to.
    pub aggregate_id: AccountId,
    /// The aggregate version the state was captured at.
    pub version: EventVersion,
    /// Encoded state; decodes to an [`Account`] with no pending changes.
    pub state: Vec<u8>,
    /// When the snapshot was captured; stores overwrite this at save time.
    pub timestamp: Timestamp,
}

impl Snapshot {
    /// Captures an account's current state.
    pub fn capture(account: &Account) -> SnapshotResult<Self> {
        let state = serde_json::to_vec(account).map_err(|source| SnapshotError::Encode {
            aggregate: account.id().clone(),
            version: account.version(),
            source,
        })?;
        Ok(Self {
            aggregate_id: account.id().clone(),
            version: account.version(),
            state,
            timestamp: Timestamp::now(),
        })
    }

    /// Decodes the blob back into an account.
    ///
    /// If the decoded state disagrees with the envelope on id or version the
    /// envelope wins and a warning is logged. The restored account never
    /// carries pending changes.
    pub fn restore(&self) -> SnapshotResult<Account> {
        let mut account: Account =
            serde_json::from_slice(&self.state).map_err(|source| SnapshotError::Decode {
                aggregate: self.aggregate_id.clone(),
                version: self.version,
                source,
            })?;

        if account.id() != &self.aggregate_id || account.version() != self.version {
            warn!(
                snapshot_id = %self.aggregate_id,
                snapshot_version = %self.version,
                state_id = %account.id(),
                state_version = %account.version(),
                "snapshot envelope disagrees with decoded state; trusting the envelope"
            );
            account.force_identity(self.aggregate_id.clone(), self.version);
        }

        Ok(account)
    }
}

/// A single-latest-snapshot store keyed by aggregate id.
///
/// No history is kept; `save` overwrites. No ordering or atomicity is
/// guaranteed across different aggregates.
#[async_trait]
pub trait SnapshotStore: Send + Sync {
    /// Overwrites the entry for `snapshot.aggregate_id`, stamping the stored
    /// timestamp with the save time.
    async fn save(&self, snapshot: Snapshot) -> SnapshotResult<()>;

    /// Returns the latest snapshot for an aggregate, if any.
    ///
    /// The returned value is a deep copy; mutating it cannot corrupt the store.
    async fn latest(&self, aggregate_id: &AccountId) -> SnapshotResult<Option<Snapshot>>;
}
