//! Song schema: immutable once analyzed.

use serde::{Deserialize, Serialize};

use crate::section::Section;

/// Stable identifier for a song, derived from the first 32 hex characters of
/// the SHA-256 of its source audio bytes. Construction is not validated here
/// (the hash is computed by whoever reads the bytes); this type just carries
/// the invariant that it is always that same 32-character prefix.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SongId(pub String);

impl SongId {
    #[must_use]
    pub fn new(hash_prefix: impl Into<String>) -> Self {
        Self(hash_prefix.into())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for SongId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for SongId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

/// Pitch class of a detected musical key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Key {
    C,
    #[serde(rename = "C#")]
    CSharp,
    D,
    #[serde(rename = "D#")]
    DSharp,
    E,
    F,
    #[serde(rename = "F#")]
    FSharp,
    G,
    #[serde(rename = "G#")]
    GSharp,
    A,
    #[serde(rename = "A#")]
    ASharp,
    B,
}

/// Mode paired with a [`Key`] to form a full musical key (e.g. "C major").
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    Major,
    Minor,
}

/// A fully analyzed song. Immutable once constructed: every field here is
/// produced once by the analyzer driver and never mutated afterward.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Song {
    pub id: SongId,
    pub source_filename: String,
    pub duration_seconds: f64,
    pub tempo_bpm: f64,
    pub key: Key,
    pub mode: Mode,
    pub key_confidence: f64,
    pub loudness_db: f64,
    pub spectral_centroid_hz: f64,
    /// Strictly increasing beat onset times in seconds. May be empty for an
    /// un-analyzed song.
    pub beats: Vec<f64>,
    /// Subset of `beats` marking bar starts. May be empty.
    pub downbeats: Vec<f64>,
    pub sections: Vec<Section>,
}

impl Song {
    /// Seconds per beat at this song's tempo.
    #[must_use]
    pub fn beat_duration_seconds(&self) -> f64 {
        60.0 / self.tempo_bpm
    }

    /// A song with no sections cannot participate in synthesis, but it is
    /// otherwise a legal value (e.g. freshly inserted, pending analysis).
    #[must_use]
    pub fn can_synthesize(&self) -> bool {
        !self.sections.is_empty()
    }

    #[must_use]
    pub fn section(&self, index: usize) -> Option<&Section> {
        self.sections.get(index)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn song(sections: Vec<Section>) -> Song {
        Song {
            id: SongId::new("a".repeat(32)),
            source_filename: "a.mp3".to_owned(),
            duration_seconds: 180.0,
            tempo_bpm: 120.0,
            key: Key::C,
            mode: Mode::Major,
            key_confidence: 0.9,
            loudness_db: -14.0,
            spectral_centroid_hz: 2000.0,
            beats: vec![],
            downbeats: vec![],
            sections,
        }
    }

    #[test]
    fn beat_duration_is_sixty_over_bpm() {
        let s = song(vec![]);
        assert!((s.beat_duration_seconds() - 0.5).abs() < 1e-9);
    }

    #[test]
    fn cannot_synthesize_without_sections() {
        assert!(!song(vec![]).can_synthesize());
    }
}
