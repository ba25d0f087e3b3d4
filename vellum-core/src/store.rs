//! The durable commit log boundary.
//!
//! [`CommitStore`] is everything the writer and reader need from a backend:
//!
//! - an insert that enforces uniqueness of `(stream, base_version)` and reports
//!   a violation as [`InsertError::Duplicate`]
//! - an indexed query projecting the event counts of one stream's commits
//! - an ordered, lazily evaluated range query over commits
//!
//! Version checks, commit construction and conflict classification live in
//! [`EventStore`](crate::event_store::EventStore) so every backend shares the
//! same semantics.
use std::{future::Future, pin::Pin};

use futures_core::Stream;
use thiserror::Error;

use crate::commit::Commit;

pub mod inmemory;
#[cfg(test)]
pub(crate) mod probe;

/// Which commits a range query covers.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Scope<'a> {
    /// Commits of one stream, ascending by base version.
    Stream(&'a str),
    /// Every commit in the store. Commits of one stream stay in base-version
    /// order; no ordering is promised across streams.
    All,
}

/// Boxed, lazily evaluated sequence of commits returned by
/// [`CommitStore::load_commits`].
///
/// An `Err` item is terminal: implementations end the stream after yielding
/// it.
pub type CommitStream<'a, M, E> = Pin<Box<dyn Stream<Item = Result<Commit<M>, E>> + Send + 'a>>;

/// Error from [`CommitStore::insert_commit`].
#[derive(Debug, Error)]
pub enum InsertError<StoreError>
where
    StoreError: std::error::Error,
{
    /// A commit with the same stream and base version already exists.
    #[error("a commit already exists for this stream at this base version")]
    Duplicate,
    /// Underlying store error.
    #[error("store error: {0}")]
    Store(#[source] StoreError),
}

/// Abstraction over the persistence layer for commit logs.
// ANCHOR: commit_store_trait
pub trait CommitStore: Send + Sync {
    /// Metadata type carried by every event.
    type Metadata: Clone + Send + Sync + 'static;

    /// Store-specific error type.
    type Error: std::error::Error + Send + Sync + 'static;

    /// Event counts of every commit in `stream`, in any order.
    ///
    /// Returns an empty list for a stream with no commits.
    ///
    /// # Errors
    ///
    /// Returns a store-specific error when the query fails.
    fn commit_event_counts<'a>(
        &'a self,
        stream: &'a str,
    ) -> impl Future<Output = Result<Vec<u64>, Self::Error>> + Send + 'a;

    /// Persist `commit` as one atomic record.
    ///
    /// Either every event of the commit becomes durable or none does.
    ///
    /// # Errors
    ///
    /// Returns [`InsertError::Duplicate`] when a commit already exists for
    /// `(commit.stream, commit.base_version)`, or [`InsertError::Store`] if
    /// persistence fails.
    fn insert_commit<'a>(
        &'a self,
        commit: &'a Commit<Self::Metadata>,
    ) -> impl Future<Output = Result<(), InsertError<Self::Error>>> + Send + 'a;

    /// Lazily load the commits covered by `scope`.
    ///
    /// Commits are fetched as the stream is polled; dropping the stream stops
    /// the query. Storage failures are yielded as a final `Err` item.
    fn load_commits<'a>(
        &'a self,
        scope: Scope<'a>,
    ) -> CommitStream<'a, Self::Metadata, Self::Error>;
}
// ANCHOR_END: commit_store_trait
