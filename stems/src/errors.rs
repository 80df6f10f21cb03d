use setlist_types::SongId;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StemsError {
    #[error("stems unavailable for song {0}")]
    StemsUnavailable(SongId),
    #[error("failed to decode stem at {path}: {source}")]
    Decode {
        path: std::path::PathBuf,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
