//! Instrumented commit store used to drive writer and reader edge cases.
//!
//! Wraps the in-memory store and records how it is used. It can hold the
//! first N version lookups at a barrier (forcing writers past the version check
//! together), fail inserts, or yield a storage error part way through a read.

use std::{
    future::Future,
    sync::{
        Arc,
        atomic::{AtomicUsize, Ordering},
    },
};

use tokio::sync::Barrier;
use tokio_stream::StreamExt as _;

use super::{
    CommitStore, CommitStream, InsertError, Scope,
    inmemory::{self, InMemoryError},
};
use crate::commit::Commit;

#[derive(Default)]
pub struct Probe {
    inner: inmemory::Store<()>,
    pub count_calls: AtomicUsize,
    pub insert_calls: AtomicUsize,
    pub commits_pulled: AtomicUsize,
    gate: Option<(Arc<Barrier>, usize)>,
    fail_after: Option<usize>,
    fail_inserts: bool,
}

impl Probe {
    pub fn new() -> Self {
        Self::default()
    }

    /// Hold the first `calls` version lookups until all of them arrive.
    pub fn gated(calls: usize) -> Self {
        Self {
            gate: Some((Arc::new(Barrier::new(calls)), calls)),
            ..Self::default()
        }
    }

    /// Yield an error once `commits` commits have been read.
    pub fn failing_after(commits: usize) -> Self {
        Self {
            fail_after: Some(commits),
            ..Self::default()
        }
    }

    pub fn failing_inserts() -> Self {
        Self {
            fail_inserts: true,
            ..Self::default()
        }
    }
}

impl CommitStore for Probe {
    type Error = InMemoryError;
    type Metadata = ();

    fn commit_event_counts<'a>(
        &'a self,
        stream: &'a str,
    ) -> impl Future<Output = Result<Vec<u64>, Self::Error>> + Send + 'a {
        async move {
            let call = self.count_calls.fetch_add(1, Ordering::SeqCst);
            let counts = self.inner.commit_event_counts(stream).await?;
            if let Some((barrier, calls)) = &self.gate
                && call < *calls
            {
                barrier.wait().await;
            }
            Ok(counts)
        }
    }

    fn insert_commit<'a>(
        &'a self,
        commit: &'a Commit<()>,
    ) -> impl Future<Output = Result<(), InsertError<Self::Error>>> + Send + 'a {
        async move {
            self.insert_calls.fetch_add(1, Ordering::SeqCst);
            if self.fail_inserts {
                return Err(InsertError::Store(InMemoryError::Poisoned));
            }
            self.inner.insert_commit(commit).await
        }
    }

    fn load_commits<'a>(&'a self, scope: Scope<'a>) -> CommitStream<'a, (), Self::Error> {
        let mut commits = self.inner.load_commits(scope);
        Box::pin(async_stream::stream! {
            let mut pulled = 0;
            // Keeps yielding after the error so callers must stop on their own.
            while let Some(item) = commits.next().await {
                if self.fail_after == Some(pulled) {
                    yield Err(InMemoryError::Poisoned);
                }
                pulled += 1;
                self.commits_pulled.fetch_add(1, Ordering::SeqCst);
                yield item;
            }
        })
    }
}
