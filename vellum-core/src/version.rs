//! Stream version resolution.
//!
//! A stream's version is derived from the data already stored rather than from
//! a separately maintained counter: it is the number of events across every
//! commit of the stream, minus one. A stream with no commits has no version
//! (`None`), and its first event is version `0`.
//!
//! Resolving a version reads only the `event_count` of each commit, so the
//! cost grows linearly with the number of commits in the stream. Streams with
//! very many small commits pay for this on every append.
//!
//! Storage backends persist versions as signed integers with [`NOT_FOUND`]
//! standing in for "no version"; [`to_stored`] and [`from_stored`] convert at
//! that boundary.

use thiserror::Error;

/// Persisted representation of a missing version (a never-written stream or
/// key).
pub const NOT_FOUND: i64 = -1;

/// A persisted version that does not map back to a valid in-memory version.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("version {0} is outside the representable range")]
pub struct InvalidVersion(pub i64);

/// Resolve a stream version from the event counts of its commits.
///
/// Returns `None` when the counts sum to zero (no commits).
///
/// ```
/// use vellum_core::version::resolve;
///
/// assert_eq!(resolve([]), None);
/// assert_eq!(resolve([1]), Some(0));
/// assert_eq!(resolve([3, 2]), Some(4));
/// ```
#[must_use]
pub fn resolve<I>(event_counts: I) -> Option<u64>
where
    I: IntoIterator<Item = u64>,
{
    let total = event_counts
        .into_iter()
        .fold(0_u64, u64::saturating_add);
    total.checked_sub(1)
}

/// The version the next appended event will receive.
#[must_use]
pub const fn next(version: Option<u64>) -> u64 {
    match version {
        Some(version) => version.saturating_add(1),
        None => 0,
    }
}

/// Convert a version to its persisted form.
///
/// # Errors
///
/// Returns [`InvalidVersion`] if the version does not fit in an `i64`.
pub fn to_stored(version: Option<u64>) -> Result<i64, InvalidVersion> {
    match version {
        None => Ok(NOT_FOUND),
        Some(version) => i64::try_from(version).map_err(|_| InvalidVersion(i64::MAX)),
    }
}

/// Convert a persisted version back to its in-memory form.
///
/// # Errors
///
/// Returns [`InvalidVersion`] for negative values other than [`NOT_FOUND`].
pub fn from_stored(raw: i64) -> Result<Option<u64>, InvalidVersion> {
    if raw == NOT_FOUND {
        return Ok(None);
    }
    u64::try_from(raw).map(Some).map_err(|_| InvalidVersion(raw))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_commits_resolves_to_not_found() {
        assert_eq!(resolve(Vec::new()), None);
    }

    #[test]
    fn single_first_event_is_version_zero() {
        assert_eq!(resolve([1]), Some(0));
    }

    #[test]
    fn version_is_total_event_count_minus_one() {
        assert_eq!(resolve([3, 2, 1, 4]), Some(9));
    }

    #[test]
    fn next_version_starts_at_zero() {
        assert_eq!(next(None), 0);
        assert_eq!(next(Some(0)), 1);
        assert_eq!(next(Some(41)), 42);
    }

    #[test]
    fn next_version_saturates_like_resolve() {
        assert_eq!(next(Some(u64::MAX)), u64::MAX);
        assert_eq!(resolve([u64::MAX, 1]), Some(u64::MAX - 1));
    }

    #[test]
    fn stored_form_uses_sentinel_for_not_found() {
        assert_eq!(to_stored(None), Ok(NOT_FOUND));
        assert_eq!(to_stored(Some(5)), Ok(5));
        assert_eq!(from_stored(NOT_FOUND), Ok(None));
        assert_eq!(from_stored(5), Ok(Some(5)));
    }

    #[test]
    fn stored_form_rejects_other_negative_values() {
        assert_eq!(from_stored(-2), Err(InvalidVersion(-2)));
    }

    #[test]
    fn stored_form_rejects_versions_beyond_i64() {
        assert!(to_stored(Some(u64::MAX)).is_err());
    }
}
