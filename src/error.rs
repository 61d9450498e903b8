//! Service-level error kinds. Backends translate substrate errors into
//! these before they cross the service boundary.

use crate::db::DbError;
use thiserror::Error;

pub type CoreResult<T> = Result<T, CoreError>;

#[derive(Debug, Error)]
pub enum CoreError {
    /// Entity lookup failed
    #[error("not found")]
    NotFound,

    /// Optimistic concurrency failure, e.g. a stale move count or a
    /// duplicate unique constraint. The client should re-read and retry.
    #[error("conflict: {0}")]
    Conflict(String),

    /// Move fails local validation (tile not in rack, bad coordinate,
    /// invalid word with validation enabled)
    #[error("illegal move: {0}")]
    IllegalMove(String),

    /// Operation not allowed in the current state (move on a finished
    /// game, accept of a nonexistent challenge)
    #[error("illegal state: {0}")]
    IllegalState(String),

    /// User not authorized for the operation
    #[error("forbidden")]
    Forbidden,

    /// Underlying database error, wrapped so service code never sees
    /// substrate-specific exceptions
    #[error("backend failure: {0}")]
    Backend(DbError),

    /// Raised only by the nightly pipeline, which handles it by
    /// graceful resume
    #[error("deadline exceeded")]
    DeadlineExceeded,
}

impl From<DbError> for CoreError {
    fn from(err: DbError) -> Self {
        match err {
            // Substrate-level write conflicts surface as Conflict so the
            // caller can re-read instead of treating them as failures
            DbError::Conflict(what) => CoreError::Conflict(what),
            other => CoreError::Backend(other),
        }
    }
}
