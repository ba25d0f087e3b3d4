//! Commit writer and stream reader.
//!
//! [`EventStore`] wraps a [`CommitStore`] backend and owns the semantics every
//! backend shares: version resolution, the expected-version precondition,
//! classification of uniqueness violations as conflicts, and flattening
//! commits into an ordered event stream.
//!
//! Reading lives in [`read`]; this module holds the write path.

use nonempty::NonEmpty;
use thiserror::Error;
use uuid::Uuid;

use crate::{
    commit::Commit,
    concurrency::ConcurrencyConflict,
    event::Event,
    store::{CommitStore, InsertError},
    version,
};

pub mod read;

pub use read::{AdminAccess, EventStream};

/// Error returned by [`EventStore::append`].
#[derive(Debug, Error)]
pub enum AppendError<StoreError>
where
    StoreError: std::error::Error + 'static,
{
    /// The stream was not at the expected version.
    #[error(transparent)]
    Conflict(#[from] ConcurrencyConflict),
    /// Underlying store error.
    #[error("failed to persist commit: {0}")]
    Store(#[source] StoreError),
}

/// Outcome of a successful, non-empty append.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Committed {
    pub commit_id: Uuid,
    /// Version of the first appended event.
    pub first_version: u64,
    /// Version of the last appended event; the stream's new version.
    pub last_version: u64,
}

/// Append-only event store over a commit log backend.
///
/// Cheap to share: all state lives in the backend. Versions are resolved from
/// stored commits on every call and never cached.
#[derive(Clone, Debug)]
pub struct EventStore<S> {
    store: S,
}

impl<S> EventStore<S> {
    #[must_use]
    pub const fn new(store: S) -> Self {
        Self { store }
    }

    /// Access the underlying commit store.
    #[must_use]
    pub const fn inner(&self) -> &S {
        &self.store
    }

    #[must_use]
    pub fn into_inner(self) -> S {
        self.store
    }
}

impl<S> EventStore<S>
where
    S: CommitStore,
{
    /// Resolve the current version of `stream`.
    ///
    /// Returns `None` for a stream with no commits.
    ///
    /// # Errors
    ///
    /// Returns the store error if the commit counts cannot be read.
    #[tracing::instrument(skip(self))]
    pub async fn current_version(&self, stream: &str) -> Result<Option<u64>, S::Error> {
        let counts = self.store.commit_event_counts(stream).await?;
        let version = version::resolve(counts);
        tracing::trace!(?version, "resolved stream version");
        Ok(version)
    }

    /// Append `events` to `stream` if it is still at `expected`.
    ///
    /// The events are written as a single commit: either all of them become
    /// durable or none do. An empty batch is a no-op that returns `Ok(None)`
    /// without touching storage.
    ///
    /// A rejected write is not retried; the caller reloads and decides.
    ///
    /// # Errors
    ///
    /// Returns [`AppendError::Conflict`] when the stream version differs from
    /// `expected`, either up front or because a concurrent writer committed at
    /// the same base version first. Returns [`AppendError::Store`] if the
    /// backend fails.
    #[tracing::instrument(skip(self, events), fields(event_count = events.len()))]
    pub async fn append(
        &self,
        stream: &str,
        expected: Option<u64>,
        events: Vec<Event<S::Metadata>>,
    ) -> Result<Option<Committed>, AppendError<S::Error>> {
        let Some(events) = NonEmpty::from_vec(events) else {
            tracing::trace!("empty append, nothing to write");
            return Ok(None);
        };

        let current = self
            .current_version(stream)
            .await
            .map_err(AppendError::Store)?;
        if current != expected {
            tracing::debug!(?current, "stale expected version, rejecting append");
            return Err(ConcurrencyConflict {
                expected,
                actual: current,
            }
            .into());
        }

        let commit = Commit::new(stream, expected, events);
        match self.store.insert_commit(&commit).await {
            Ok(()) => {
                let committed = Committed {
                    commit_id: commit.id,
                    first_version: commit.first_version(),
                    last_version: commit.last_version(),
                };
                tracing::debug!(
                    commit_id = %committed.commit_id,
                    version = committed.last_version,
                    "commit appended"
                );
                Ok(Some(committed))
            }
            Err(InsertError::Duplicate) => {
                let actual = self
                    .current_version(stream)
                    .await
                    .map_err(AppendError::Store)?;
                tracing::debug!(?actual, "concurrent writer claimed base version");
                Err(ConcurrencyConflict { expected, actual }.into())
            }
            Err(InsertError::Store(error)) => Err(AppendError::Store(error)),
        }
    }
}
