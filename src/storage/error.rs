//! Store error types.

use thiserror::Error;

/// Errors returned by store operations.
///
/// A missing key is never an error: `get`, `delete` and `ttl` report absence
/// through their return values.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The TTL could not be read as a non-negative number of seconds
    #[error("invalid TTL {0:?}: expected a non-negative integer number of seconds")]
    InvalidTtl(String),

    /// Reading or writing the snapshot file failed
    #[error("snapshot I/O error: {0}")]
    Persistence(#[from] std::io::Error),

    /// The mapping could not be encoded as a snapshot
    #[error("snapshot encoding error: {0}")]
    Encode(#[from] serde_json::Error),
}

/// Result type for store operations.
pub type StoreResult<T> = Result<T, StoreError>;
