mod commit;
mod load;

use std::{fmt, marker::PhantomData};

use serde::{Serialize, de::DeserializeOwned};
use sqlx::PgPool;
use vellum_core::{
    commit::Commit,
    store::{CommitStore, CommitStream, InsertError, Scope},
};

use crate::Error;

/// A PostgreSQL-backed [`CommitStore`].
///
/// Each commit is one row of `es_commits`, holding its events as a `jsonb`
/// array. The `(stream_name, base_version)` unique constraint is what
/// serialises concurrent writers; no row is ever updated or deleted.
///
/// # Schema
///
/// Created by [`migrate()`](Self::migrate):
///
/// ```sql
/// CREATE TABLE IF NOT EXISTS es_commits (
///     commit_id    UUID PRIMARY KEY,
///     stream_name  TEXT NOT NULL,
///     base_version BIGINT NOT NULL CHECK (base_version >= -1),
///     event_count  BIGINT NOT NULL CHECK (event_count > 0),
///     events       JSONB NOT NULL,
///     committed_at TIMESTAMPTZ NOT NULL DEFAULT now(),
///     CONSTRAINT es_commits_stream_base_version UNIQUE (stream_name, base_version)
/// )
/// ```
///
/// A stream's first commit is stored with `base_version = -1`.
pub struct Store<M> {
    pub(crate) pool: PgPool,
    _metadata: PhantomData<fn() -> M>,
}

impl<M> Clone for Store<M> {
    fn clone(&self) -> Self {
        Self::new(self.pool.clone())
    }
}

impl<M> fmt::Debug for Store<M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Store").finish_non_exhaustive()
    }
}

impl<M> Store<M> {
    pub(crate) const UNIQUE_BASE_VERSION: &'static str = "es_commits_stream_base_version";

    /// Construct a `PostgreSQL` commit store from a connection pool.
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self {
            pool,
            _metadata: PhantomData,
        }
    }

    /// Apply the schema (idempotent).
    ///
    /// This uses `CREATE TABLE IF NOT EXISTS` style DDL so it can be run on
    /// startup.
    ///
    /// # Errors
    ///
    /// Returns a `sqlx::Error` if any of the schema creation queries fail.
    #[tracing::instrument(skip(self))]
    pub async fn migrate(&self) -> Result<(), sqlx::Error> {
        sqlx::query(
            r"
            CREATE TABLE IF NOT EXISTS es_commits (
                commit_id    UUID PRIMARY KEY,
                stream_name  TEXT NOT NULL,
                base_version BIGINT NOT NULL CHECK (base_version >= -1),
                event_count  BIGINT NOT NULL CHECK (event_count > 0),
                events       JSONB NOT NULL,
                committed_at TIMESTAMPTZ NOT NULL DEFAULT now(),
                CONSTRAINT es_commits_stream_base_version UNIQUE (stream_name, base_version)
            )
            ",
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}

impl<M> CommitStore for Store<M>
where
    M: Serialize + DeserializeOwned + Clone + Send + Sync + 'static,
{
    type Error = Error;
    type Metadata = M;

    #[tracing::instrument(skip(self))]
    async fn commit_event_counts<'a>(&'a self, stream: &'a str) -> Result<Vec<u64>, Self::Error> {
        let counts: Vec<i64> =
            sqlx::query_scalar("SELECT event_count FROM es_commits WHERE stream_name = $1")
                .bind(stream)
                .fetch_all(&self.pool)
                .await?;

        tracing::trace!(commits = counts.len(), "retrieved commit event counts");
        counts
            .into_iter()
            .map(|count| u64::try_from(count).map_err(|_| Error::InvalidEventCount(count)))
            .collect()
    }

    #[tracing::instrument(
        skip(self, commit),
        fields(
            stream = %commit.stream,
            base_version = ?commit.base_version,
            event_count = commit.event_count()
        )
    )]
    async fn insert_commit<'a>(
        &'a self,
        commit: &'a Commit<Self::Metadata>,
    ) -> Result<(), InsertError<Self::Error>> {
        self.insert(commit).await
    }

    fn load_commits<'a>(&'a self, scope: Scope<'a>) -> CommitStream<'a, M, Self::Error> {
        self.load(scope)
    }
}
