//! Error kinds for the durable job store and the result cache. Mirrors the
//! teacher's `storage::errors::Error` shape: a boxed DB error so the enum
//! stays small, plus the handful of not-found/not-created cases the CRUD
//! layer itself can raise.

use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum StorageError {
    #[cfg(feature = "db")]
    #[error("database error: {0}")]
    Db(#[from] Box<surrealdb::Error>),

    #[error("job {0} not found")]
    NotFound(String),

    #[error("job was not created")]
    NotCreated,

    #[error("cache entry missing or incomplete at {0}")]
    CacheMiss(PathBuf),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),
}

#[cfg(feature = "db")]
impl From<surrealdb::Error> for StorageError {
    fn from(e: surrealdb::Error) -> Self {
        Self::Db(Box::new(e))
    }
}

pub type StorageResult<T> = Result<T, StorageError>;
