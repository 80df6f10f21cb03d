//! Error kinds raised by core logic, split by layer the way the teacher
//! splits `LibraryError` from `DatabaseError` and wraps with `#[from]`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CoreError {
    #[error("sample rate mismatch: expected {expected}, found {found}")]
    SampleRateMismatch { expected: u32, found: u32 },

    #[error("config error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Wraps a failure from an [`crate::adapters::AnalyzerDriver`] or
/// [`crate::adapters::AlignerDriver`] call, preserving the driver's own
/// message so a `Failed` job can surface it without translation.
#[derive(Debug, Error)]
pub enum DriverError {
    #[error("analyzer driver error: {0}")]
    Analyzer(String),
    #[error("aligner driver error: {0}")]
    Aligner(String),
    #[error("object store error: {0}")]
    ObjectStore(String),
}
