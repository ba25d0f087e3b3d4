use uuid::Uuid;
use vellum_core::version::InvalidVersion;

/// Error type for `PostgreSQL` commit store operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Query execution or transaction failure.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    /// A version that cannot be stored, or a stored one that cannot be read.
    #[error("invalid version value from database: {0}")]
    InvalidVersion(i64),
    /// A stored event count that is not a positive integer.
    #[error("invalid event count from database: {0}")]
    InvalidEventCount(i64),
    /// A stored commit that does not decode into a valid commit.
    #[error("commit {commit_id} is corrupt: {reason}")]
    CorruptCommit { commit_id: Uuid, reason: String },
    /// Events could not be serialised before writing.
    #[error("serialization error: {0}")]
    Serialization(#[source] serde_json::Error),
}

impl From<InvalidVersion> for Error {
    fn from(error: InvalidVersion) -> Self {
        Self::InvalidVersion(error.0)
    }
}
