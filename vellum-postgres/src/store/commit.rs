use serde::{Serialize, de::DeserializeOwned};
use vellum_core::{commit::Commit, event::Event, store::InsertError, version};

use super::Store;
use crate::Error;

impl<M> Store<M>
where
    M: Serialize + DeserializeOwned + Clone + Send + Sync + 'static,
{
    /// Insert `commit` as a single row.
    ///
    /// A violation of the `(stream_name, base_version)` constraint is reported
    /// as [`InsertError::Duplicate`]. A rejected commit leaves nothing behind.
    pub(in crate::store) async fn insert(
        &self,
        commit: &Commit<M>,
    ) -> Result<(), InsertError<Error>> {
        let events = Self::prepare_events(commit).map_err(InsertError::Store)?;
        let base_version = version::to_stored(commit.base_version)
            .map_err(|error| InsertError::Store(error.into()))?;
        let event_count = i64::try_from(commit.events.len())
            .map_err(|_| InsertError::Store(Error::InvalidEventCount(i64::MAX)))?;

        let result = sqlx::query(
            r"
                INSERT INTO es_commits (commit_id, stream_name, base_version, event_count, events, committed_at)
                VALUES ($1, $2, $3, $4, $5, $6)
                ",
        )
        .bind(commit.id)
        .bind(&commit.stream)
        .bind(base_version)
        .bind(event_count)
        .bind(sqlx::types::Json(events))
        .bind(commit.timestamp)
        .execute(&self.pool)
        .await;

        match result {
            Ok(_) => {
                tracing::debug!(commit_id = %commit.id, "commit stored");
                Ok(())
            }
            Err(sqlx::Error::Database(db))
                if db.is_unique_violation() && db.constraint() == Some(Self::UNIQUE_BASE_VERSION) =>
            {
                tracing::debug!("base version already taken, rejecting commit");
                Err(InsertError::Duplicate)
            }
            Err(error) => Err(InsertError::Store(Error::Database(error))),
        }
    }

    /// Serialise the events of `commit` to the stored `jsonb` array.
    pub(in crate::store) fn prepare_events(commit: &Commit<M>) -> Result<serde_json::Value, Error> {
        let events: Vec<&Event<M>> = commit.events.iter().collect();
        serde_json::to_value(events).map_err(Error::Serialization)
    }
}
