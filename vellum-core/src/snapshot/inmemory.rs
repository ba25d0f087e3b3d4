//! In-memory snapshot store implementation.

use std::{
    collections::{BTreeMap, HashMap},
    future::Future,
    sync::{Arc, RwLock},
};

use chrono::Utc;

use super::{
    Snapshot, SnapshotRecord, SnapshotState, SnapshotStore, SnapshotWriteError, select_latest,
};
use crate::concurrency::SnapshotConflict;

/// Error type for in-memory snapshot store.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("snapshot store lock poisoned")]
    Poisoned,
}

/// Rows of one key ordered by version.
type Rows = BTreeMap<u64, SnapshotRecord>;

fn latest_version(rows: Option<&Rows>) -> Option<u64> {
    rows.and_then(|rows| select_latest(rows.values()))
        .map(|row| row.version)
}

/// In-memory snapshot store.
///
/// This is a reference implementation suitable for testing and development.
/// Each write runs its version check, insert and demotion under one lock, so
/// a rejected write leaves no trace.
#[derive(Clone, Debug, Default)]
pub struct Store {
    keys: Arc<RwLock<HashMap<String, Rows>>>,
}

impl Store {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl SnapshotStore for Store {
    type Error = Error;

    #[tracing::instrument(skip(self))]
    fn read<'a>(
        &'a self,
        key: &'a str,
    ) -> impl Future<Output = Result<Option<Snapshot>, Self::Error>> + Send + 'a {
        let snapshot = self.keys.read().map_err(|_| Error::Poisoned).map(|keys| {
            keys.get(key)
                .and_then(|rows| select_latest(rows.values()))
                .cloned()
                .map(Snapshot::from)
        });
        tracing::trace!(
            found = matches!(snapshot, Ok(Some(_))),
            "snapshot lookup"
        );
        std::future::ready(snapshot)
    }

    #[tracing::instrument(skip(self, state), fields(type_id = %state.type_id))]
    fn write<'a>(
        &'a self,
        key: &'a str,
        state: &'a SnapshotState,
        old_version: Option<u64>,
        new_version: u64,
    ) -> impl Future<Output = Result<(), SnapshotWriteError<Self::Error>>> + Send + 'a {
        let result = (|| {
            let mut keys = self
                .keys
                .write()
                .map_err(|_| SnapshotWriteError::Store(Error::Poisoned))?;
            let existing = keys.get(key);
            let actual = latest_version(existing);
            let conflict = SnapshotConflict {
                expected: old_version,
                actual,
            };

            if actual != old_version {
                tracing::debug!(?actual, "stale snapshot version, rejecting write");
                return Err(conflict.into());
            }
            if existing.is_some_and(|rows| rows.contains_key(&new_version)) {
                tracing::debug!("snapshot version already taken, rejecting write");
                return Err(conflict.into());
            }
            let demoted: Vec<u64> = existing
                .map(|rows| {
                    rows.range(..new_version)
                        .filter(|(_, row)| row.latest)
                        .map(|(version, _)| *version)
                        .collect()
                })
                .unwrap_or_default();
            if demoted.iter().max().copied() != old_version {
                tracing::debug!(?demoted, "superseded rows do not match, rejecting write");
                return Err(conflict.into());
            }

            // Checks passed; only now may the key gain an entry.
            let rows = keys.entry(key.to_string()).or_default();
            for version in &demoted {
                if let Some(row) = rows.get_mut(version) {
                    row.latest = false;
                }
            }
            rows.insert(
                new_version,
                SnapshotRecord {
                    version: new_version,
                    state: state.clone(),
                    latest: true,
                    created_at: Utc::now(),
                },
            );
            drop(keys);
            tracing::debug!(demoted = demoted.len(), "snapshot written");
            Ok(())
        })();

        std::future::ready(result)
    }

    #[tracing::instrument(skip(self))]
    fn history<'a>(
        &'a self,
        key: &'a str,
    ) -> impl Future<Output = Result<Vec<SnapshotRecord>, Self::Error>> + Send + 'a {
        let history = self.keys.read().map_err(|_| Error::Poisoned).map(|keys| {
            keys.get(key)
                .map(|rows| rows.values().rev().cloned().collect())
                .unwrap_or_default()
        });
        std::future::ready(history)
    }
}
