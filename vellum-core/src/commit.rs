//! The unit of atomic append.

use chrono::{DateTime, Utc};
use nonempty::NonEmpty;
use uuid::Uuid;

use crate::{
    event::{Event, RecordedEvent},
    version,
};

/// An immutable batch of events appended to one stream in a single write.
///
/// `base_version` is the stream version immediately before the batch (`None`
/// for the first commit of a stream). Storage backends must reject a second
/// commit with the same `(stream, base_version)`; that constraint is what
/// serialises concurrent writers.
#[derive(Clone, Debug, PartialEq)]
pub struct Commit<M> {
    pub id: Uuid,
    pub stream: String,
    pub base_version: Option<u64>,
    pub events: NonEmpty<Event<M>>,
    pub timestamp: DateTime<Utc>,
}

impl<M> Commit<M> {
    /// Build a new commit stamped with a time-ordered id and the current time.
    #[must_use]
    pub fn new(
        stream: impl Into<String>,
        base_version: Option<u64>,
        events: NonEmpty<Event<M>>,
    ) -> Self {
        Self {
            id: Uuid::now_v7(),
            stream: stream.into(),
            base_version,
            events,
            timestamp: Utc::now(),
        }
    }

    /// Number of events in the batch (always at least one).
    #[must_use]
    pub fn event_count(&self) -> u64 {
        self.events.len() as u64
    }

    /// Version of the first event in the batch.
    #[must_use]
    pub const fn first_version(&self) -> u64 {
        version::next(self.base_version)
    }

    /// Version of the last event in the batch; the stream version after the
    /// commit.
    #[must_use]
    pub fn last_version(&self) -> u64 {
        self.first_version() + self.event_count() - 1
    }

    /// Split the commit into its events, each tagged with its stream version.
    pub fn into_recorded(self) -> impl Iterator<Item = RecordedEvent<M>>
    where
        M: Clone,
    {
        let Self {
            id,
            stream,
            base_version,
            events,
            ..
        } = self;
        events
            .into_iter()
            .zip(version::next(base_version)..)
            .map(move |(event, version)| RecordedEvent {
                stream: stream.clone(),
                commit_id: id,
                version,
                event,
            })
    }
}

#[cfg(test)]
mod tests {
    use nonempty::nonempty;
    use serde_json::json;

    use super::*;

    fn event(n: i64) -> Event<()> {
        Event::new("counter.incremented", json!({ "n": n }), ())
    }

    #[test]
    fn first_commit_starts_at_version_zero() {
        let commit = Commit::new("s1", None, nonempty![event(1), event(2), event(3)]);

        assert_eq!(commit.event_count(), 3);
        assert_eq!(commit.first_version(), 0);
        assert_eq!(commit.last_version(), 2);
    }

    #[test]
    fn later_commit_continues_after_base_version() {
        let commit = Commit::new("s1", Some(2), nonempty![event(4), event(5)]);

        assert_eq!(commit.first_version(), 3);
        assert_eq!(commit.last_version(), 4);
    }

    #[test]
    fn into_recorded_preserves_order_and_numbers_versions() {
        let commit = Commit::new("s1", Some(4), nonempty![event(6), event(7)]);
        let id = commit.id;

        let recorded: Vec<_> = commit.into_recorded().collect();

        assert_eq!(recorded.len(), 2);
        assert_eq!(recorded[0].version, 5);
        assert_eq!(recorded[1].version, 6);
        assert_eq!(recorded[0].event.data, json!({ "n": 6 }));
        assert_eq!(recorded[1].event.data, json!({ "n": 7 }));
        assert!(recorded.iter().all(|e| e.commit_id == id && e.stream == "s1"));
    }

    #[test]
    fn commit_ids_are_unique() {
        let a = Commit::new("s1", None, nonempty![event(1)]);
        let b = Commit::new("s1", None, nonempty![event(1)]);
        assert_ne!(a.id, b.id);
    }
}
