use thiserror::Error;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("invalid transition parameters: {0}")]
    InvalidParameters(String),
    #[error(transparent)]
    StemsUnavailable(#[from] setlist_stems::StemsError),
    #[error("sample rate mismatch: expected {expected}, found {found}")]
    SampleRateMismatch { expected: u32, found: u32 },
    #[error("source missing at {0}")]
    SourceMissing(std::path::PathBuf),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("encode error: {0}")]
    Encode(String),
}

impl From<setlist_core::CoreError> for EngineError {
    fn from(e: setlist_core::CoreError) -> Self {
        match e {
            setlist_core::CoreError::SampleRateMismatch { expected, found } => {
                Self::SampleRateMismatch { expected, found }
            }
            other => Self::Encode(other.to_string()),
        }
    }
}

impl From<setlist_types::transition::InvalidParameters> for EngineError {
    fn from(e: setlist_types::transition::InvalidParameters) -> Self {
        Self::InvalidParameters(e.0)
    }
}
