use thiserror::Error;

#[derive(Debug, Error)]
pub enum SchedulerError {
    #[error("invalid job request: {0}")]
    InvalidParameters(String),
    #[error(transparent)]
    Store(#[from] setlist_storage::StorageError),
    #[error(transparent)]
    Driver(#[from] setlist_core::errors::DriverError),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("job {0} timed out")]
    Timeout(String),
}
