//! Versioned snapshots of materialised state.
//!
//! Snapshots let a runtime skip replaying a long event history. This module
//! provides:
//!
//! - [`SnapshotStore`] - Trait for snapshot persistence with an optimistic
//!   write path
//! - [`SnapshotState`] / [`Snapshot`] / [`SnapshotRecord`] - Opaque state,
//!   the latest row, and a full history row
//! - [`read_state`] / [`write_state`] - Typed helpers that encode through a
//!   [`Codec`]
//! - [`inmemory`] - In-memory reference implementation
//!
//! Every write inserts a new row flagged latest and demotes the previous one;
//! rows are never updated in place or deleted. Should more than one row for a
//! key end up flagged latest, the highest version wins (see
//! [`select_latest`]).

use std::future::Future;

use chrono::{DateTime, Utc};
use serde::{Serialize, de::DeserializeOwned};
use thiserror::Error;

use crate::{codec::Codec, concurrency::SnapshotConflict};

pub mod inmemory;

/// Encoded state plus the identifier of the type it was encoded from.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SnapshotState {
    pub type_id: String,
    pub data: Vec<u8>,
}

impl SnapshotState {
    #[must_use]
    pub fn new(type_id: impl Into<String>, data: Vec<u8>) -> Self {
        Self {
            type_id: type_id.into(),
            data,
        }
    }
}

/// The current snapshot of a key.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Snapshot {
    pub version: u64,
    pub state: SnapshotState,
}

/// One stored snapshot row, current or demoted.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SnapshotRecord {
    pub version: u64,
    pub state: SnapshotState,
    /// Whether the row is flagged as the key's current snapshot.
    pub latest: bool,
    pub created_at: DateTime<Utc>,
}

impl From<SnapshotRecord> for Snapshot {
    fn from(record: SnapshotRecord) -> Self {
        Self {
            version: record.version,
            state: record.state,
        }
    }
}

/// Pick the current row among a key's rows: the highest version flagged
/// latest.
pub fn select_latest<'a, I>(rows: I) -> Option<&'a SnapshotRecord>
where
    I: IntoIterator<Item = &'a SnapshotRecord>,
{
    rows.into_iter()
        .filter(|row| row.latest)
        .max_by_key(|row| row.version)
}

/// Error returned by [`SnapshotStore::write`].
#[derive(Debug, Error)]
pub enum SnapshotWriteError<StoreError>
where
    StoreError: std::error::Error + 'static,
{
    /// Another writer changed the key first.
    #[error(transparent)]
    Conflict(#[from] SnapshotConflict),
    /// Underlying store error.
    #[error("snapshot operation failed: {0}")]
    Store(#[source] StoreError),
}

/// Trait for versioned snapshot persistence.
// ANCHOR: snapshot_store_trait
pub trait SnapshotStore: Send + Sync {
    /// Error type for snapshot operations.
    type Error: std::error::Error + Send + Sync + 'static;

    /// Load the current snapshot for `key`.
    ///
    /// Returns `Ok(None)` if no row for the key is flagged latest.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying storage fails.
    fn read<'a>(
        &'a self,
        key: &'a str,
    ) -> impl Future<Output = Result<Option<Snapshot>, Self::Error>> + Send + 'a;

    /// Replace the snapshot at `old_version` with `state` at `new_version`.
    ///
    /// The write checks the current latest version, inserts a new latest row,
    /// then demotes the rows it supersedes. Nothing is written when any step
    /// finds another writer got there first.
    ///
    /// # Errors
    ///
    /// Returns [`SnapshotWriteError::Conflict`] when the latest version is not
    /// `old_version`, when a row already exists at `new_version`, or when the
    /// demoted rows do not match `old_version`. Returns
    /// [`SnapshotWriteError::Store`] if persistence fails.
    fn write<'a>(
        &'a self,
        key: &'a str,
        state: &'a SnapshotState,
        old_version: Option<u64>,
        new_version: u64,
    ) -> impl Future<Output = Result<(), SnapshotWriteError<Self::Error>>> + Send + 'a;

    /// Every row stored for `key`, newest first, demoted rows included.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying storage fails.
    fn history<'a>(
        &'a self,
        key: &'a str,
    ) -> impl Future<Output = Result<Vec<SnapshotRecord>, Self::Error>> + Send + 'a;
}
// ANCHOR_END: snapshot_store_trait

/// Identifier stored next to encoded state of this type.
pub trait StateType {
    const TYPE_ID: &'static str;
}

/// Decoded snapshot state at a version.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Versioned<T> {
    pub version: u64,
    pub state: T,
}

/// Error returned by [`read_state`] and [`write_state`].
#[derive(Debug, Error)]
pub enum StateError<StoreError, CodecError>
where
    StoreError: std::error::Error + 'static,
    CodecError: std::error::Error + 'static,
{
    #[error(transparent)]
    Conflict(#[from] SnapshotConflict),
    #[error("snapshot operation failed: {0}")]
    Store(#[source] StoreError),
    #[error("failed to encode or decode snapshot state: {0}")]
    Codec(#[source] CodecError),
    /// The stored state was written for a different type.
    #[error("snapshot holds `{found}`, expected `{expected}`")]
    TypeMismatch {
        expected: &'static str,
        found: String,
    },
}

impl<S, C> From<SnapshotWriteError<S>> for StateError<S, C>
where
    S: std::error::Error + 'static,
    C: std::error::Error + 'static,
{
    fn from(error: SnapshotWriteError<S>) -> Self {
        match error {
            SnapshotWriteError::Conflict(conflict) => Self::Conflict(conflict),
            SnapshotWriteError::Store(error) => Self::Store(error),
        }
    }
}

/// Read and decode the current snapshot of `key`.
///
/// # Errors
///
/// Returns [`StateError::TypeMismatch`] if the stored type id is not
/// `T::TYPE_ID`, [`StateError::Codec`] if decoding fails, or
/// [`StateError::Store`] if the read fails.
pub async fn read_state<S, C, T>(
    store: &S,
    codec: &C,
    key: &str,
) -> Result<Option<Versioned<T>>, StateError<S::Error, C::Error>>
where
    S: SnapshotStore,
    C: Codec,
    T: StateType + DeserializeOwned,
{
    let Some(snapshot) = store.read(key).await.map_err(StateError::Store)? else {
        return Ok(None);
    };
    if snapshot.state.type_id != T::TYPE_ID {
        return Err(StateError::TypeMismatch {
            expected: T::TYPE_ID,
            found: snapshot.state.type_id,
        });
    }
    let state = codec
        .deserialize(&snapshot.state.data)
        .map_err(StateError::Codec)?;
    Ok(Some(Versioned {
        version: snapshot.version,
        state,
    }))
}

/// Encode `state` and write it as the snapshot of `key` at `new_version`.
///
/// Encoding happens before any storage access.
///
/// # Errors
///
/// Returns [`StateError::Codec`] if encoding fails, otherwise the errors of
/// [`SnapshotStore::write`].
pub async fn write_state<S, C, T>(
    store: &S,
    codec: &C,
    key: &str,
    state: &T,
    old_version: Option<u64>,
    new_version: u64,
) -> Result<(), StateError<S::Error, C::Error>>
where
    S: SnapshotStore,
    C: Codec,
    T: StateType + Serialize + Sync,
{
    let data = codec.serialize(state).map_err(StateError::Codec)?;
    let state = SnapshotState::new(T::TYPE_ID, data);
    store
        .write(key, &state, old_version, new_version)
        .await
        .map_err(StateError::from)
}
