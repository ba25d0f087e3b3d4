//! In-memory commit store implementation for testing.
//!
//! This module provides [`Store`], a thread-safe in-memory implementation of
//! [`CommitStore`](super::CommitStore) suitable for unit tests, examples and
//! single-process tools.
//!
//! # Example
//!
//! ```
//! use vellum_core::store::inmemory;
//!
//! let store: inmemory::Store<()> = inmemory::Store::new();
//! ```

use std::{
    collections::BTreeMap,
    future::Future,
    ops::Bound,
    sync::{Arc, RwLock, RwLockReadGuard},
};

use crate::{
    commit::Commit,
    store::{CommitStore, CommitStream, InsertError, Scope},
};

/// Commits of one stream keyed by base version. `None` sorts first, so
/// iteration follows stream order.
type StreamCommits<M> = BTreeMap<Option<u64>, Commit<M>>;

type Streams<M> = BTreeMap<String, StreamCommits<M>>;

/// In-memory commit store that keeps streams in an ordered map.
///
/// The map key doubles as the `(stream, base_version)` uniqueness constraint.
/// Unscoped reads walk streams in name order.
///
/// Generic over the metadata type `M` (use `()` when not needed).
#[derive(Clone)]
pub struct Store<M> {
    streams: Arc<RwLock<Streams<M>>>,
}

impl<M> Store<M> {
    #[must_use]
    pub fn new() -> Self {
        Self {
            streams: Arc::new(RwLock::new(BTreeMap::new())),
        }
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, Streams<M>>, InMemoryError> {
        self.streams.read().map_err(|_| InMemoryError::Poisoned)
    }
}

impl<M> Default for Store<M> {
    fn default() -> Self {
        Self::new()
    }
}

/// Error type for in-memory store.
#[derive(Debug, thiserror::Error)]
pub enum InMemoryError {
    #[error("in-memory store lock poisoned")]
    Poisoned,
}

impl<M: Clone> Store<M> {
    /// Find the commit that follows `after` within `scope`.
    ///
    /// The lock is taken per call, so a reader never holds it between items.
    fn next_commit(
        &self,
        scope: Scope<'_>,
        after: Option<&(String, Option<u64>)>,
    ) -> Result<Option<Commit<M>>, InMemoryError> {
        let streams = self.read()?;
        let first = |commits: &StreamCommits<M>| commits.values().next().cloned();
        let following = |commits: &StreamCommits<M>, base: Option<u64>| {
            commits
                .range((Bound::Excluded(base), Bound::Unbounded))
                .next()
                .map(|(_, commit)| commit.clone())
        };

        let found = match (scope, after) {
            (Scope::Stream(name), None) => streams.get(name).and_then(first),
            (Scope::Stream(name), Some((_, base))) => {
                streams.get(name).and_then(|commits| following(commits, *base))
            }
            (Scope::All, None) => streams.values().find_map(first),
            (Scope::All, Some((name, base))) => streams
                .get(name.as_str())
                .and_then(|commits| following(commits, *base))
                .or_else(|| {
                    streams
                        .range::<str, _>((Bound::Excluded(name.as_str()), Bound::Unbounded))
                        .find_map(|(_, commits)| first(commits))
                }),
        };
        Ok(found)
    }
}

impl<M> CommitStore for Store<M>
where
    M: Clone + Send + Sync + 'static,
{
    type Error = InMemoryError;
    type Metadata = M;

    #[tracing::instrument(skip(self))]
    fn commit_event_counts<'a>(
        &'a self,
        stream: &'a str,
    ) -> impl Future<Output = Result<Vec<u64>, Self::Error>> + Send + 'a {
        let counts = self.read().map(|streams| {
            streams
                .get(stream)
                .map(|commits| commits.values().map(Commit::event_count).collect())
                .unwrap_or_default()
        });
        tracing::trace!(?counts, "retrieved commit event counts");
        std::future::ready(counts)
    }

    #[tracing::instrument(
        skip(self, commit),
        fields(
            stream = %commit.stream,
            base_version = ?commit.base_version,
            event_count = commit.event_count()
        )
    )]
    fn insert_commit<'a>(
        &'a self,
        commit: &'a Commit<Self::Metadata>,
    ) -> impl Future<Output = Result<(), InsertError<Self::Error>>> + Send + 'a {
        let result = (|| {
            let mut streams = self
                .streams
                .write()
                .map_err(|_| InsertError::Store(InMemoryError::Poisoned))?;
            let commits = streams.entry(commit.stream.clone()).or_default();
            if commits.contains_key(&commit.base_version) {
                tracing::debug!("base version already taken, rejecting commit");
                return Err(InsertError::Duplicate);
            }
            commits.insert(commit.base_version, commit.clone());
            drop(streams);
            tracing::debug!("commit stored");
            Ok(())
        })();

        std::future::ready(result)
    }

    fn load_commits<'a>(&'a self, scope: Scope<'a>) -> CommitStream<'a, M, Self::Error> {
        Box::pin(async_stream::stream! {
            let mut cursor: Option<(String, Option<u64>)> = None;
            loop {
                match self.next_commit(scope, cursor.as_ref()) {
                    Ok(Some(commit)) => {
                        cursor = Some((commit.stream.clone(), commit.base_version));
                        yield Ok(commit);
                    }
                    Ok(None) => break,
                    Err(error) => {
                        yield Err(error);
                        break;
                    }
                }
            }
        })
    }
}
