//! Section schema: a labeled, contiguous time span within exactly one song.
//!
//! A `Section` stores only its parent song's [`SongId`], not a reference or
//! owned copy of the `Song` itself. Anything that needs the parent's tempo
//! or sample rate looks it up through a registry; this is the "back-pointers
//! are lookups, not ownership" rule for the Song/Section cycle.

use serde::{Deserialize, Serialize};

use crate::song::SongId;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Section {
    pub song_id: SongId,
    pub index: usize,
    pub label: String,
    pub start_seconds: f64,
    pub end_seconds: f64,
    pub tempo_bpm: f64,
    pub key: String,
    pub energy: f64,
    pub loudness_db: f64,
    pub spectral_centroid_hz: f64,
}

impl Section {
    #[must_use]
    pub fn duration_seconds(&self) -> f64 {
        self.end_seconds - self.start_seconds
    }

    /// A section is well-formed when its span lies inside `[0, song_duration]`
    /// and its duration agrees with `end - start` to within a millisecond.
    #[must_use]
    pub fn is_well_formed(&self, song_duration_seconds: f64) -> bool {
        self.start_seconds >= 0.0
            && self.start_seconds < self.end_seconds
            && self.end_seconds <= song_duration_seconds
            && (self.duration_seconds() - (self.end_seconds - self.start_seconds)).abs() < 1e-3
    }

    /// Seconds per beat, derived from this section's own tempo (which may
    /// differ slightly from the parent song's average tempo).
    #[must_use]
    pub fn beat_duration_seconds(&self) -> f64 {
        60.0 / self.tempo_bpm
    }
}
