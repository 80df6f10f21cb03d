//! Lookup and lazy load of per-song separated stems, with an LRU over
//! whole-section decoded buffers.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use setlist_core::AudioBuffer;
use setlist_types::{SongId, Stem};

use crate::decoder::decode_stem;
use crate::errors::StemsError;
use crate::lru::Lru;

pub type StemSet = HashMap<Stem, AudioBuffer>;

pub struct StemStore {
    stems_root: PathBuf,
    target_sample_rate: u32,
    cache: Lru<(SongId, usize), StemSet>,
}

impl StemStore {
    #[must_use]
    pub fn new(stems_root: impl Into<PathBuf>, target_sample_rate: u32, cache_capacity: usize) -> Self {
        Self {
            stems_root: stems_root.into(),
            target_sample_rate,
            cache: Lru::new(cache_capacity),
        }
    }

    fn stem_path(&self, song_id: &SongId, stem: Stem) -> PathBuf {
        self.stems_root
            .join(song_id.as_str())
            .join(format!("{}.wav", stem.as_str()))
    }

    fn decode_all_stems(&self, song_id: &SongId) -> Result<StemSet, StemsError> {
        let dir = self.stems_root.join(song_id.as_str());
        if !dir.is_dir() {
            return Err(StemsError::StemsUnavailable(song_id.clone()));
        }
        let mut set = StemSet::new();
        for stem in Stem::ALL {
            let path = self.stem_path(song_id, stem);
            if !path.is_file() {
                return Err(StemsError::StemsUnavailable(song_id.clone()));
            }
            set.insert(stem, decode_stem(&path, self.target_sample_rate)?);
        }
        Ok(set)
    }

    fn slice_set(set: &StemSet, start_sec: f64, end_sec: f64, sample_rate: u32) -> StemSet {
        let start = (start_sec * f64::from(sample_rate)).round() as usize;
        let end = (end_sec * f64::from(sample_rate)).round() as usize;
        set.iter()
            .map(|(stem, buf)| (*stem, buf.slice(start, end)))
            .collect()
    }

    /// Returns the four stems for the `[start_sec, end_sec)` interval of a
    /// section. The decoded whole-section buffer is what gets cached, keyed
    /// by `(song_id, section_index)`; the requested interval is sliced from
    /// it on every call, so two calls for the same section with different
    /// windows (e.g. a full-section load followed by a narrower transition
    /// sub-window) each get the slice they actually asked for instead of
    /// whichever slice happened to populate the cache first.
    pub fn load_section(
        &mut self,
        song_id: &SongId,
        section_index: usize,
        start_sec: f64,
        end_sec: f64,
    ) -> Result<StemSet, StemsError> {
        let key = (song_id.clone(), section_index);
        let whole = if let Some(cached) = self.cache.get(&key) {
            cached.clone()
        } else {
            let whole = self.decode_all_stems(song_id)?;
            self.cache.put(key, whole.clone());
            whole
        };
        Ok(Self::slice_set(&whole, start_sec, end_sec, self.target_sample_rate))
    }

    /// Returns the four stems for an arbitrary `[start_sec, end_sec)` range,
    /// bypassing the cache since these are cheap slices taken on demand
    /// (e.g. a fade window narrower than its enclosing section).
    pub fn load_range(
        &self,
        song_id: &SongId,
        start_sec: f64,
        end_sec: f64,
    ) -> Result<StemSet, StemsError> {
        let full = self.decode_all_stems(song_id)?;
        Ok(Self::slice_set(&full, start_sec, end_sec, self.target_sample_rate))
    }

    #[must_use]
    pub fn stems_dir_for(&self, song_id: &SongId) -> PathBuf {
        self.stems_root.join(song_id.as_str())
    }

    #[must_use]
    pub fn has_stems(&self, song_id: &SongId) -> bool {
        Stem::ALL
            .iter()
            .all(|s| self.stem_path(song_id, *s).is_file())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn missing_stem_directory_reports_unavailable() {
        let dir = tempdir().unwrap();
        let store = StemStore::new(dir.path(), 44100, 4);
        let id = SongId::new("a".repeat(32));
        assert!(matches!(
            store.load_range(&id, 0.0, 1.0),
            Err(StemsError::StemsUnavailable(_))
        ));
    }

    #[test]
    fn has_stems_false_when_any_file_missing() {
        let dir = tempdir().unwrap();
        let id = SongId::new("b".repeat(32));
        std::fs::create_dir_all(dir.path().join(id.as_str())).unwrap();
        std::fs::write(dir.path().join(id.as_str()).join("vocals.wav"), b"").unwrap();
        let store = StemStore::new(dir.path(), 44100, 4);
        assert!(!store.has_stems(&id));
    }

    fn write_stub_wav(path: &Path, n_samples: usize, sample_rate: u32) {
        let spec = hound::WavSpec {
            channels: 2,
            sample_rate,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };
        let mut writer = hound::WavWriter::create(path, spec).unwrap();
        for i in 0..n_samples {
            let sample = (i % i16::MAX as usize) as i16;
            writer.write_sample(sample).unwrap();
            writer.write_sample(sample).unwrap();
        }
        writer.finalize().unwrap();
    }

    #[test]
    fn second_window_for_same_section_is_not_the_first_windows_stale_slice() {
        let dir = tempdir().unwrap();
        let sample_rate = 44100;
        let id = SongId::new("c".repeat(32));
        std::fs::create_dir_all(dir.path().join(id.as_str())).unwrap();
        for stem in Stem::ALL {
            write_stub_wav(
                &dir.path().join(id.as_str()).join(format!("{}.wav", stem.as_str())),
                10 * sample_rate as usize,
                sample_rate,
            );
        }

        let mut store = StemStore::new(dir.path(), sample_rate, 4);

        // First call: the "whole section" load, as playlist.rs's
        // concat_song_range would make it.
        let whole = store.load_section(&id, 0, 0.0, 10.0).unwrap();
        assert_eq!(whole.get(&Stem::Vocals).unwrap().len(), 10 * sample_rate as usize);

        // Second call: a narrower sub-window of the same section, as a
        // Crossfade/Overlap transition would ask for. Must return the
        // sub-window's own length, not the first call's cached slice.
        let window = store.load_section(&id, 0, 8.0, 10.0).unwrap();
        assert_eq!(window.get(&Stem::Vocals).unwrap().len(), 2 * sample_rate as usize);
    }
}
