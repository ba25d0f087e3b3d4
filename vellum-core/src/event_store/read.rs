//! Lazy event stream reading.

use std::pin::Pin;

use futures_core::Stream;
use tokio_stream::StreamExt as _;

use super::EventStore;
use crate::{
    event::RecordedEvent,
    store::{CommitStore, CommitStream, Scope},
};

/// Boxed, lazily evaluated sequence of recorded events.
///
/// Events arrive ordered by commit base version, then by position within the
/// commit. An `Err` item is always the last item. Dropping the stream stops the
/// read.
pub type EventStream<'a, M, E> =
    Pin<Box<dyn Stream<Item = Result<RecordedEvent<M>, E>> + Send + 'a>>;

/// Capability required for reads that span every stream.
///
/// Unscoped reads exist for projection rebuilds and similar tooling; normal
/// request paths read a single stream. Acquiring the capability is logged.
#[derive(Debug)]
pub struct AdminAccess {
    _private: (),
}

impl AdminAccess {
    /// Acquire unscoped read access, recording why it was needed.
    #[must_use]
    pub fn acquire(reason: &str) -> Self {
        tracing::warn!(reason, "unscoped event store access granted");
        Self { _private: () }
    }
}

impl<S> EventStore<S>
where
    S: CommitStore,
{
    /// Lazily read every event of `stream`, oldest first.
    ///
    /// Each call starts from the beginning of the stream. A stream with no
    /// commits yields nothing.
    #[must_use]
    pub fn read_stream<'a>(&'a self, stream: &'a str) -> EventStream<'a, S::Metadata, S::Error> {
        tracing::trace!(stream, "reading stream");
        flatten(self.store.load_commits(Scope::Stream(stream)))
    }

    /// Lazily read every event of every stream.
    ///
    /// Events of one stream stay in order; no ordering is promised across
    /// streams.
    #[must_use]
    pub fn read_all<'a>(&'a self, _access: &AdminAccess) -> EventStream<'a, S::Metadata, S::Error> {
        tracing::trace!("reading all streams");
        flatten(self.store.load_commits(Scope::All))
    }
}

/// Expand each commit into its events, pulling the next commit only once the
/// previous one is exhausted.
fn flatten<'a, M, E>(mut commits: CommitStream<'a, M, E>) -> EventStream<'a, M, E>
where
    M: Clone + Send + 'a,
    E: Send + 'a,
{
    Box::pin(async_stream::stream! {
        while let Some(item) = commits.next().await {
            match item {
                Ok(commit) => {
                    for event in commit.into_recorded() {
                        yield Ok(event);
                    }
                }
                Err(error) => {
                    tracing::debug!("commit read failed, ending stream");
                    yield Err(error);
                    break;
                }
            }
        }
    })
}
