//! External boundary adapters: the object store, the analyzer driver, and
//! the aligner driver. Only their contracts matter to this crate — real
//! implementations of the analyzer/aligner are out of scope (they wrap the
//! ML stem-separator and transcription models), but a trivial
//! [`LocalFsObjectStore`] is provided so the scheduler and its tests can run
//! end to end without network access.

use std::path::{Path, PathBuf};

use setlist_types::AnalysisRecord;

use crate::errors::DriverError;

/// `download`/`upload`/`exists` against URLs of the form
/// `<scheme>://<bucket>/<key>`.
pub trait ObjectStoreAdapter: Send + Sync {
    fn download(&self, url: &str, local_path: &Path) -> Result<(), DriverError>;
    fn upload(&self, local_path: &Path, key: &str) -> Result<String, DriverError>;
    fn exists(&self, url: &str) -> Result<bool, DriverError>;
}

/// Blocking; called from a worker thread by the scheduler.
pub trait AnalyzerDriver: Send + Sync {
    fn analyze(&self, path: &Path) -> Result<AnalysisRecord, DriverError>;
}

/// Transcript output of an [`AlignerDriver`] call, kept separate from the
/// produced LRC file so the scheduler can cache it independently by
/// `audio_hash` alone.
#[derive(Debug, Clone, PartialEq)]
pub struct AlignedPhrase {
    pub text: String,
    pub start: f64,
    pub end: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AlignmentOptions {
    pub youtube_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AlignmentOutput {
    pub lrc_path: PathBuf,
    pub line_count: usize,
    pub phrases: Vec<AlignedPhrase>,
}

/// May internally choose a YouTube-transcript path vs. Whisper+LLM; returns
/// the intermediate phrases so the scheduler can cache them separately.
pub trait AlignerDriver: Send + Sync {
    fn align(
        &self,
        audio_path: &Path,
        lyrics_text: &str,
        options: &AlignmentOptions,
    ) -> Result<AlignmentOutput, DriverError>;
}

/// Parses a `<scheme>://<bucket>/<key>` URL into its bucket and key parts.
///
/// # Errors
/// Returns a [`DriverError::ObjectStore`] if the URL has no `scheme://` or
/// no `/` separating bucket from key.
pub fn parse_object_url(url: &str) -> Result<(String, String), DriverError> {
    let without_scheme = url
        .split_once("://")
        .map(|(_, rest)| rest)
        .ok_or_else(|| DriverError::ObjectStore(format!("malformed object url: {url}")))?;
    without_scheme
        .split_once('/')
        .map(|(bucket, key)| (bucket.to_owned(), key.to_owned()))
        .ok_or_else(|| DriverError::ObjectStore(format!("object url missing key: {url}")))
}

/// A reference [`ObjectStoreAdapter`] that treats its "bucket" as a
/// directory prefix under `root`, satisfying the `<scheme>://<bucket>/<key>`
/// contract for `file://` URLs. Grounded on the teacher's plain `std::fs`
/// file-copy idiom for local backup/export paths.
pub struct LocalFsObjectStore {
    root: PathBuf,
}

impl LocalFsObjectStore {
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn resolve(&self, bucket: &str, key: &str) -> PathBuf {
        self.root.join(bucket).join(key)
    }
}

impl ObjectStoreAdapter for LocalFsObjectStore {
    fn download(&self, url: &str, local_path: &Path) -> Result<(), DriverError> {
        let (bucket, key) = parse_object_url(url)?;
        let source = self.resolve(&bucket, &key);
        std::fs::copy(&source, local_path)
            .map_err(|e| DriverError::ObjectStore(format!("download failed: {e}")))?;
        Ok(())
    }

    fn upload(&self, local_path: &Path, key: &str) -> Result<String, DriverError> {
        let bucket = "local";
        let dest = self.resolve(bucket, key);
        if let Some(parent) = dest.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| DriverError::ObjectStore(format!("upload mkdir failed: {e}")))?;
        }
        std::fs::copy(local_path, &dest)
            .map_err(|e| DriverError::ObjectStore(format!("upload failed: {e}")))?;
        Ok(format!("file://{bucket}/{key}"))
    }

    fn exists(&self, url: &str) -> Result<bool, DriverError> {
        let (bucket, key) = parse_object_url(url)?;
        Ok(self.resolve(&bucket, &key).exists())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn parses_bucket_and_key() {
        let (bucket, key) = parse_object_url("file://my-bucket/path/to/file.wav").unwrap();
        assert_eq!(bucket, "my-bucket");
        assert_eq!(key, "path/to/file.wav");
    }

    #[test]
    fn rejects_url_without_scheme() {
        assert!(parse_object_url("not-a-url").is_err());
    }

    #[test]
    fn round_trips_through_local_fs_store() {
        let dir = tempdir().unwrap();
        let store = LocalFsObjectStore::new(dir.path());

        let src = dir.path().join("source.txt");
        std::fs::write(&src, b"hello").unwrap();

        let url = store.upload(&src, "songs/a.txt").unwrap();
        assert!(store.exists(&url).unwrap());

        let dest = dir.path().join("downloaded.txt");
        store.download(&url, &dest).unwrap();
        assert_eq!(std::fs::read(&dest).unwrap(), b"hello");
    }
}
