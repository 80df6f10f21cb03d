//! Content-addressed result cache: analysis records, stem sets, Whisper
//! transcriptions, and LRC outputs, all keyed off a hash prefix. Grounded
//! on the original Python `CacheManager`'s directory layout, but every
//! write here goes through a temp-file-then-rename so a crash mid-write
//! can never leave a partial entry that a later `exists` check accepts.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};
use setlist_types::AnalysisRecord;
use sha2::{Digest, Sha256};

use crate::errors::{StorageError, StorageResult};

const STEM_NAMES: [&str; 4] = ["bass", "drums", "other", "vocals"];

/// SHA-256 hex digest of `bytes`, truncated to the 32-char cache-key
/// prefix (see external interfaces: "first 32 hex characters").
#[must_use]
pub fn hash_prefix(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    let full = format!("{:x}", hasher.finalize());
    full[..32].to_owned()
}

/// Composite key for an Lrc job: `sha256(audio_hash ':' sha256(lyrics)[:16])`,
/// first 32 hex chars.
#[must_use]
pub fn lrc_composite_key(audio_hash: &str, lyrics_text: &str) -> String {
    let lyrics_prefix = hash_prefix(lyrics_text.as_bytes());
    let combined = format!("{audio_hash}:{}", &lyrics_prefix[..16]);
    hash_prefix(combined.as_bytes())
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CachedPhrase {
    pub text: String,
    pub start: f64,
    pub end: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct WhisperEntry {
    phrases: Vec<CachedPhrase>,
    cached_at: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LrcCacheEntry {
    pub lrc_url: String,
    pub line_count: usize,
    pub cached_at: String,
}

/// A content-addressed directory cache rooted at `root`.
pub struct ResultCache {
    root: PathBuf,
}

impl ResultCache {
    /// Creates `root` (and its `stems/` subdirectory) if they don't exist.
    ///
    /// # Errors
    /// Returns an error if the directories can't be created.
    pub fn open(root: impl Into<PathBuf>) -> StorageResult<Self> {
        let root = root.into();
        fs::create_dir_all(root.join("stems"))?;
        Ok(Self { root })
    }

    fn analysis_path(&self, hash: &str) -> PathBuf {
        self.root.join(format!("{hash}.json"))
    }

    fn whisper_path(&self, audio_hash: &str) -> PathBuf {
        self.root.join(format!("{audio_hash}_whisper.json"))
    }

    fn lrc_path(&self, composite_key: &str) -> PathBuf {
        self.root.join(format!("{composite_key}_lrc.json"))
    }

    fn stems_dir(&self, hash: &str) -> PathBuf {
        self.root.join("stems").join(hash)
    }

    /// Writes `bytes` to `path` via a sibling temp file followed by a
    /// rename, so readers never observe a partially-written file.
    fn write_atomic(path: &Path, bytes: &[u8]) -> StorageResult<()> {
        let parent = path.parent().unwrap_or_else(|| Path::new("."));
        let tmp = parent.join(format!(
            ".{}.tmp-{}",
            path.file_name().and_then(|n| n.to_str()).unwrap_or("cache"),
            std::process::id()
        ));
        fs::write(&tmp, bytes)?;
        fs::rename(&tmp, path)?;
        Ok(())
    }

    /// # Errors
    /// Returns an error if an existing entry fails to parse.
    pub fn get_analysis(&self, content_hash: &str) -> StorageResult<Option<AnalysisRecord>> {
        let path = self.analysis_path(content_hash);
        if !path.is_file() {
            return Ok(None);
        }
        let bytes = fs::read(&path)?;
        Ok(Some(serde_json::from_slice(&bytes)?))
    }

    /// # Errors
    /// Returns an error if `record` can't be serialized or the write fails.
    pub fn put_analysis(&self, content_hash: &str, record: &AnalysisRecord) -> StorageResult<PathBuf> {
        let path = self.analysis_path(content_hash);
        let bytes = serde_json::to_vec_pretty(record)?;
        Self::write_atomic(&path, &bytes)?;
        Ok(path)
    }

    /// `Some(dir)` only when all four stem files are present.
    #[must_use]
    pub fn get_stems_dir(&self, content_hash: &str) -> Option<PathBuf> {
        let dir = self.stems_dir(content_hash);
        let complete = STEM_NAMES.iter().all(|name| dir.join(format!("{name}.wav")).is_file());
        complete.then_some(dir)
    }

    /// Copies whichever of the four canonical stem files exist in
    /// `source_dir` into the cache, one rename per file.
    ///
    /// # Errors
    /// Returns an error if the cache directory can't be created or a copy
    /// fails.
    pub fn put_stems(&self, content_hash: &str, source_dir: &Path) -> StorageResult<PathBuf> {
        let dest = self.stems_dir(content_hash);
        fs::create_dir_all(&dest)?;
        for name in STEM_NAMES {
            let source = source_dir.join(format!("{name}.wav"));
            if !source.is_file() {
                continue;
            }
            let bytes = fs::read(&source)?;
            Self::write_atomic(&dest.join(format!("{name}.wav")), &bytes)?;
        }
        Ok(dest)
    }

    /// # Errors
    /// Returns an error if an existing entry fails to parse.
    pub fn get_whisper_transcription(&self, audio_hash: &str) -> StorageResult<Option<Vec<CachedPhrase>>> {
        let path = self.whisper_path(audio_hash);
        if !path.is_file() {
            return Ok(None);
        }
        let bytes = fs::read(&path)?;
        let entry: WhisperEntry = serde_json::from_slice(&bytes)?;
        Ok(Some(entry.phrases))
    }

    /// # Errors
    /// Returns an error if serialization or the write fails.
    pub fn put_whisper_transcription(&self, audio_hash: &str, phrases: &[CachedPhrase]) -> StorageResult<PathBuf> {
        let path = self.whisper_path(audio_hash);
        let entry = WhisperEntry {
            phrases: phrases.to_vec(),
            cached_at: iso_now(),
        };
        let bytes = serde_json::to_vec_pretty(&entry)?;
        Self::write_atomic(&path, &bytes)?;
        Ok(path)
    }

    /// # Errors
    /// Returns an error if an existing entry fails to parse.
    pub fn get_lrc(&self, composite_key: &str) -> StorageResult<Option<LrcCacheEntry>> {
        let path = self.lrc_path(composite_key);
        if !path.is_file() {
            return Ok(None);
        }
        let bytes = fs::read(&path)?;
        Ok(Some(serde_json::from_slice(&bytes)?))
    }

    /// # Errors
    /// Returns an error if serialization or the write fails.
    pub fn put_lrc(&self, composite_key: &str, lrc_url: &str, line_count: usize) -> StorageResult<PathBuf> {
        let path = self.lrc_path(composite_key);
        let entry = LrcCacheEntry {
            lrc_url: lrc_url.to_owned(),
            line_count,
            cached_at: iso_now(),
        };
        let bytes = serde_json::to_vec_pretty(&entry)?;
        Self::write_atomic(&path, &bytes)?;
        Ok(path)
    }

    /// Removes everything under the cache root and recreates the empty
    /// directory structure.
    ///
    /// # Errors
    /// Returns an error if the removal or recreation fails.
    pub fn clear(&self) -> StorageResult<()> {
        if self.root.is_dir() {
            fs::remove_dir_all(&self.root)?;
        }
        fs::create_dir_all(self.root.join("stems"))?;
        Ok(())
    }
}

/// A minimal RFC 3339 timestamp; the reference cache only ever reads this
/// back as an opaque display string, so no `chrono`/`time` dependency is
/// pulled in just to print one.
fn iso_now() -> String {
    let secs = SystemTime::now().duration_since(UNIX_EPOCH).unwrap_or_default().as_secs();
    let days = secs / 86400;
    let time_of_day = secs % 86400;
    let (h, m, s) = (time_of_day / 3600, (time_of_day % 3600) / 60, time_of_day % 60);
    let (y, mo, d) = civil_from_days(days as i64);
    format!("{y:04}-{mo:02}-{d:02}T{h:02}:{m:02}:{s:02}Z")
}

/// Howard Hinnant's `civil_from_days`: days since the Unix epoch to a
/// proleptic Gregorian `(year, month, day)`, used only so [`iso_now`] can
/// stamp cache entries without a date/time crate.
fn civil_from_days(z: i64) -> (i64, u32, u32) {
    let z = z + 719_468;
    let era = if z >= 0 { z } else { z - 146_096 } / 146_097;
    let doe = (z - era * 146_097) as u64;
    let yoe = (doe - doe / 1460 + doe / 36524 - doe / 146_096) / 365;
    let y = yoe as i64 + era * 400;
    let doy = doe - (365 * yoe + yoe / 4 - yoe / 100);
    let mp = (5 * doy + 2) / 153;
    let d = (doy - (153 * mp + 2) / 5 + 1) as u32;
    let m = if mp < 10 { mp + 3 } else { mp - 9 } as u32;
    (if m <= 2 { y + 1 } else { y }, m, d)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn sample_record() -> AnalysisRecord {
        AnalysisRecord {
            duration_seconds: 180.0,
            tempo_bpm: 120.0,
            musical_key: "C".to_owned(),
            musical_mode: "major".to_owned(),
            key_confidence: 0.9,
            loudness_db: -14.0,
            beats: vec![0.0, 0.5, 1.0],
            downbeats: vec![0.0, 2.0],
            sections: vec![],
            embeddings_shape: vec![1, 128],
        }
    }

    #[test]
    fn analysis_round_trips_bitwise_on_numeric_fields() {
        let dir = tempdir().unwrap();
        let cache = ResultCache::open(dir.path()).unwrap();
        let record = sample_record();
        let hash = hash_prefix(b"some audio bytes");

        assert!(cache.get_analysis(&hash).unwrap().is_none());
        cache.put_analysis(&hash, &record).unwrap();
        let fetched = cache.get_analysis(&hash).unwrap().unwrap();
        assert_eq!(fetched.beats, record.beats);
        assert_eq!(fetched.downbeats, record.downbeats);
        assert!((fetched.tempo_bpm - record.tempo_bpm).abs() < f64::EPSILON);
    }

    #[test]
    fn stems_require_all_four_files_to_count_as_hit() {
        let dir = tempdir().unwrap();
        let cache = ResultCache::open(dir.path()).unwrap();
        let hash = hash_prefix(b"song bytes");

        let source = tempdir().unwrap();
        for name in ["bass", "drums", "other"] {
            std::fs::write(source.path().join(format!("{name}.wav")), b"x").unwrap();
        }
        cache.put_stems(&hash, source.path()).unwrap();
        assert!(cache.get_stems_dir(&hash).is_none());

        std::fs::write(source.path().join("vocals.wav"), b"x").unwrap();
        cache.put_stems(&hash, source.path()).unwrap();
        assert!(cache.get_stems_dir(&hash).is_some());
    }

    #[test]
    fn whisper_and_lrc_caches_are_independent_entries() {
        let dir = tempdir().unwrap();
        let cache = ResultCache::open(dir.path()).unwrap();
        let audio_hash = hash_prefix(b"audio");
        let composite = lrc_composite_key(&audio_hash, "la la la");

        cache
            .put_whisper_transcription(
                &audio_hash,
                &[CachedPhrase {
                    text: "la la la".to_owned(),
                    start: 0.0,
                    end: 1.2,
                }],
            )
            .unwrap();
        cache.put_lrc(&composite, "file://bucket/song.lrc", 12).unwrap();

        assert!(cache.get_whisper_transcription(&audio_hash).unwrap().is_some());
        assert!(cache.get_lrc(&composite).unwrap().is_some());
        assert_ne!(audio_hash, composite);
    }

    #[test]
    fn clear_removes_all_entries() {
        let dir = tempdir().unwrap();
        let cache = ResultCache::open(dir.path()).unwrap();
        let hash = hash_prefix(b"x");
        cache.put_analysis(&hash, &sample_record()).unwrap();
        cache.clear().unwrap();
        assert!(cache.get_analysis(&hash).unwrap().is_none());
    }
}
