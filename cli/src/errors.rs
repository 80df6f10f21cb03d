//! The CLI's own error type: wraps every lower crate's error and carries
//! the exit code a caller should surface (§6 EXTERNAL INTERFACES: 0
//! success, 1 unrecoverable runtime error, 2 invalid arguments/config).

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CliError {
    #[error("{0}")]
    InvalidArgs(String),
    #[error(transparent)]
    Config(#[from] config::ConfigError),
    #[error(transparent)]
    Engine(#[from] setlist_engine::EngineError),
    #[error(transparent)]
    Scheduler(#[from] setlist_scheduler::SchedulerError),
    #[error(transparent)]
    Store(#[from] setlist_storage::StorageError),
    #[error(transparent)]
    Db(#[from] surrealdb::Error),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error("job {0} not found")]
    JobNotFound(String),
}

impl CliError {
    /// Maps this error to the process exit code named in the external
    /// interfaces section: invalid input is always 2, everything else
    /// that reached the CLI unhandled is an unrecoverable runtime error.
    #[must_use]
    pub fn exit_code(&self) -> u8 {
        match self {
            Self::InvalidArgs(_) | Self::Config(_) | Self::Engine(setlist_engine::EngineError::InvalidParameters(_)) => 2,
            _ => 1,
        }
    }
}
