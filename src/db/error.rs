//! Persistence-layer error type, wrapping both substrates so that no
//! substrate-specific error ever crosses the repository boundary.

use thiserror::Error;

pub type DbResult<T> = Result<T, DbError>;

#[derive(Debug, Error)]
pub enum DbError {
    /// Relational substrate failure
    #[error("database error: {0}")]
    Sql(#[from] sea_orm::DbErr),

    /// Document store failure
    #[error("document store error: {0}")]
    Doc(String),

    /// Optimistic concurrency failure inside a nested transaction scope
    #[error("write conflict on {0}")]
    Conflict(String),

    /// Operation issued outside an open session
    #[error("no active database session")]
    NoSession,

    /// Invalid or incomplete backend configuration
    #[error("configuration error: {0}")]
    Config(String),

    /// Document (de)serialization failure
    #[error("serialization error: {0}")]
    Codec(#[from] serde_json::Error),

    /// Document store persistence failure
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
}
