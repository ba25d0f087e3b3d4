use chrono::{DateTime, Utc};
use nonempty::NonEmpty;
use serde::{Serialize, de::DeserializeOwned};
use sqlx::{Row, postgres::PgRow};
use tokio_stream::StreamExt as _;
use uuid::Uuid;
use vellum_core::{
    commit::Commit,
    event::Event,
    store::{CommitStream, Scope},
    version,
};

use super::Store;
use crate::Error;

impl<M> Store<M>
where
    M: Serialize + DeserializeOwned + Clone + Send + Sync + 'static,
{
    /// Stream the commits covered by `scope` straight off a server cursor.
    ///
    /// Rows are decoded as they are polled. The query is abandoned when the
    /// stream is dropped.
    pub(in crate::store) fn load<'a>(&'a self, scope: Scope<'a>) -> CommitStream<'a, M, Error> {
        Box::pin(async_stream::stream! {
            let mut rows = match scope {
                Scope::Stream(stream) => sqlx::query(
                    r"
                    SELECT commit_id, stream_name, base_version, event_count, events, committed_at
                    FROM es_commits
                    WHERE stream_name = $1
                    ORDER BY base_version ASC
                    ",
                )
                .bind(stream)
                .fetch(&self.pool),
                Scope::All => sqlx::query(
                    r"
                    SELECT commit_id, stream_name, base_version, event_count, events, committed_at
                    FROM es_commits
                    ORDER BY stream_name ASC, base_version ASC
                    ",
                )
                .fetch(&self.pool),
            };

            while let Some(row) = rows.next().await {
                let decoded = row
                    .map_err(Error::from)
                    .and_then(|row| CommitRow::from_row(&row)?.into_commit::<M>());
                match decoded {
                    Ok(commit) => {
                        yield Ok(commit);
                    }
                    Err(error) => {
                        tracing::debug!(%error, "commit load failed, ending stream");
                        yield Err(error);
                        break;
                    }
                }
            }
        })
    }
}

/// One raw `es_commits` row.
#[derive(Debug)]
pub(in crate::store) struct CommitRow {
    pub commit_id: Uuid,
    pub stream_name: String,
    pub base_version: i64,
    pub event_count: i64,
    pub events: serde_json::Value,
    pub committed_at: DateTime<Utc>,
}

impl CommitRow {
    pub(in crate::store) fn from_row(row: &PgRow) -> Result<Self, Error> {
        Ok(Self {
            commit_id: row.try_get("commit_id")?,
            stream_name: row.try_get("stream_name")?,
            base_version: row.try_get("base_version")?,
            event_count: row.try_get("event_count")?,
            events: row.try_get::<sqlx::types::Json<serde_json::Value>, _>("events")?.0,
            committed_at: row.try_get("committed_at")?,
        })
    }

    /// Validate the row and rebuild the commit it stores.
    pub(in crate::store) fn into_commit<M>(self) -> Result<Commit<M>, Error>
    where
        M: DeserializeOwned,
    {
        let commit_id = self.commit_id;
        let corrupt = |reason: String| Error::CorruptCommit { commit_id, reason };

        let base_version = version::from_stored(self.base_version)?;
        let events: Vec<Event<M>> = serde_json::from_value(self.events)
            .map_err(|error| corrupt(format!("undecodable events: {error}")))?;
        let events = NonEmpty::from_vec(events)
            .ok_or_else(|| corrupt("commit holds no events".to_string()))?;
        if u64::try_from(self.event_count) != Ok(events.len() as u64) {
            return Err(corrupt(format!(
                "event count {} does not match {} stored events",
                self.event_count,
                events.len()
            )));
        }

        Ok(Commit {
            id: commit_id,
            stream: self.stream_name,
            base_version,
            events,
            timestamp: self.committed_at,
        })
    }
}
