//! Identifier and versioning types for the ledger.
//!
//! All types follow the "parse, don't validate" principle: smart constructors
//! guarantee validity at construction time, so a value of one of these types
//! is valid for the lifetime of the program.
//!
//! - [`AccountId`]: non-empty, at most 255 characters
//! - [`TransferId`]: non-empty correlation id shared by both legs of a transfer
//! - [`EventId`]: always a valid UUIDv7, giving time-based ordering
//! - [`EventVersion`]: non-negative aggregate version, contiguous from zero
//! - [`Timestamp`]: UTC instants only

use chrono::{DateTime, Utc};
use nutype::nutype;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// The stable identity of an account aggregate.
///
/// Account ids key the event log and the snapshot store. They are guaranteed
/// to be non-empty (after trimming) and at most 255 characters.
///
/// # Examples
///
/// ```
/// use ledgercore::AccountId;
///
/// let id = AccountId::try_new("acc-alice").expect("valid account id");
/// assert_eq!(id.as_ref(), "acc-alice");
///
/// assert!(AccountId::try_new("").is_err());
/// assert!(AccountId::try_new("   ").is_err());
/// ```
#[nutype(
    sanitize(trim),
    validate(not_empty, len_char_max = 255),
    derive(
        Debug,
        Clone,
        PartialEq,
        Eq,
        PartialOrd,
        Ord,
        Hash,
        AsRef,
        Deref,
        Display,
        Serialize,
        Deserialize
    )
)]
pub struct AccountId(String);

impl AccountId {
    /// Generates a fresh, unique `AccountId`.
    ///
    /// Used by the service layer when a create command does not supply one.
    pub fn generate() -> Self {
        Self::try_new(format!("acc-{}", Uuid::now_v7().simple()))
            .expect("generated account id is always valid")
    }
}

/// Correlation identifier shared by the two `MoneyTransferred` events (debit
/// on the source, credit on the target) that together represent one logical
/// cross-account movement.
#[nutype(
    sanitize(trim),
    validate(not_empty, len_char_max = 255),
    derive(
        Debug,
        Clone,
        PartialEq,
        Eq,
        Hash,
        AsRef,
        Deref,
        Display,
        Serialize,
        Deserialize
    )
)]
pub struct TransferId(String);

impl TransferId {
    /// Generates a fresh, unique `TransferId`.
    pub fn generate() -> Self {
        Self::try_new(format!("txf-{}", Uuid::now_v7().simple()))
            .expect("generated transfer id is always valid")
    }
}

/// A globally unique event identifier in UUIDv7 format.
///
/// UUIDv7 embeds a timestamp, so event ids created later compare greater,
/// which keeps them usable for chronological ordering without coordination.
/// Only v7 values are accepted.
#[nutype(
    validate(predicate = |id: &Uuid| id.get_version() == Some(uuid::Version::SortRand)),
    derive(
        Debug,
        Clone,
        Copy,
        PartialEq,
        Eq,
        PartialOrd,
        Ord,
        Hash,
        AsRef,
        Deref,
        Display,
        Serialize,
        Deserialize
    )
)]
pub struct EventId(Uuid);

impl EventId {
    /// Creates a new `EventId` stamped with the current time.
    pub fn generate() -> Self {
        Self::try_new(Uuid::now_v7()).expect("Uuid::now_v7() always returns a valid v7 UUID")
    }
}

impl Default for EventId {
    fn default() -> Self {
        Self::generate()
    }
}

/// The version of an account aggregate.
///
/// `0` means "not yet created"; the first applied event carries version `1`.
/// An event's version is the aggregate version *after* that event is applied,
/// so versions in a stream form the contiguous sequence `1, 2, …, N`.
/// Optimistic concurrency control compares an expected base version against
/// the stored one at append time.
///
/// # Examples
///
/// ```
/// use ledgercore::EventVersion;
///
/// let v0 = EventVersion::initial();
/// let v1 = v0.next();
/// assert_eq!(u64::from(v0), 0);
/// assert_eq!(u64::from(v1), 1);
/// assert!(v1 > v0);
/// ```
#[nutype(
    validate(greater_or_equal = 0),
    derive(
        Debug,
        Clone,
        Copy,
        PartialEq,
        Eq,
        PartialOrd,
        Ord,
        Hash,
        Display,
        Into,
        Serialize,
        Deserialize
    )
)]
pub struct EventVersion(u64);

impl EventVersion {
    /// The version of an aggregate that has no events yet.
    pub fn initial() -> Self {
        Self::try_new(0).expect("0 is always a valid version")
    }

    /// The version after this one.
    #[must_use]
    pub fn next(self) -> Self {
        let current: u64 = self.into();
        Self::try_new(current + 1).expect("incremented version is always valid")
    }
}

/// A UTC timestamp.
///
/// Wrapping `DateTime<Utc>` keeps every timestamp in the system UTC and gives
/// the serialized form a single, consistent representation (RFC 3339).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Timestamp(DateTime<Utc>);

impl Timestamp {
    /// Creates a timestamp from a UTC `DateTime`.
    pub const fn new(datetime: DateTime<Utc>) -> Self {
        Self(datetime)
    }

    /// The current moment.
    pub fn now() -> Self {
        Self(Utc::now())
    }

    /// Borrows the underlying `DateTime`.
    pub const fn as_datetime(&self) -> &DateTime<Utc> {
        &self.0
    }
}

impl From<DateTime<Utc>> for Timestamp {
    fn from(datetime: DateTime<Utc>) -> Self {
        Self::new(datetime)
    }
}

impl From<Timestamp> for DateTime<Utc> {
    fn from(timestamp: Timestamp) -> Self {
        timestamp.0
    }
}

impl std::fmt::Display for Timestamp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.to_rfc3339().fmt(f)
    }
}
