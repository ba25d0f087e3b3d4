//! Conflicts reported by optimistic writes.
//!
//! Neither the commit writer nor the snapshot store takes a lock. Each write
//! states the version it last observed and the storage layer's uniqueness
//! constraints decide who wins. The loser receives one of the conflict types in
//! this module and is expected to reload and decide whether to retry.

use thiserror::Error;

/// Error indicating a concurrency conflict during append.
///
/// Returned when the stream's current version differs from the version the
/// caller expected, either on the up-front check or because a concurrent
/// writer claimed the same base version first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("{}", format_conflict("stream", .expected.as_ref(), .actual.as_ref()))]
pub struct ConcurrencyConflict {
    /// The version the caller expected. `None` means a never-written stream.
    pub expected: Option<u64>,
    /// The stream version observed after the failed write. `None` means the
    /// stream still has no commits.
    pub actual: Option<u64>,
}

/// Error indicating a snapshot write lost against another writer.
///
/// `actual` is the version of the snapshot currently flagged latest for the
/// key, re-read after the write was rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("{}", format_conflict("snapshot", .expected.as_ref(), .actual.as_ref()))]
pub struct SnapshotConflict {
    /// The latest version the caller expected to replace.
    pub expected: Option<u64>,
    /// The latest stored version at the time the conflict was detected.
    pub actual: Option<u64>,
}

fn describe(version: Option<&u64>) -> String {
    version.map_or_else(|| "none".to_string(), ToString::to_string)
}

/// Build a human-readable message for a conflict, including an actionable hint
/// for the caller.
fn format_conflict(subject: &str, expected: Option<&u64>, actual: Option<&u64>) -> String {
    match (expected, actual) {
        (None, Some(actual)) => format!(
            "{subject} conflict: expected nothing stored yet, found version {actual} (hint: \
             another process wrote first; reload and retry)"
        ),
        (expected, actual) if expected == actual => format!(
            "{subject} conflict: a concurrent write was rejected at version {} (hint: reload \
             and retry)",
            describe(expected)
        ),
        (expected, actual) => format!(
            "{subject} conflict: expected version {}, found {} (hint: {subject} was modified; \
             reload and retry)",
            describe(expected),
            describe(actual)
        ),
    }
}
