//! Transition parameters and results.
//!
//! `TransitionParameters` is a closed sum type: each variant carries only
//! its own fields, there is no shared base struct, and validation is one
//! `validate()` match instead of per-field checks scattered across layers.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

/// One of the four source-separated components a transition can fade
/// independently.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Stem {
    Vocals,
    Drums,
    Bass,
    Other,
}

impl Stem {
    pub const ALL: [Stem; 4] = [Stem::Vocals, Stem::Drums, Stem::Bass, Stem::Other];

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Stem::Vocals => "vocals",
            Stem::Drums => "drums",
            Stem::Bass => "bass",
            Stem::Other => "other",
        }
    }
}

/// Per-side start/end nudges, in beats, applied before synthesis. Each must
/// lie in `[-4, 4]`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct BeatAdjustments {
    pub a_start: i32,
    pub a_end: i32,
    pub b_start: i32,
    pub b_end: i32,
}

impl BeatAdjustments {
    const BOUND: i32 = 4;

    #[must_use]
    pub fn in_bounds(&self) -> bool {
        [self.a_start, self.a_end, self.b_start, self.b_end]
            .iter()
            .all(|v| (-Self::BOUND..=Self::BOUND).contains(v))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum TransitionParameters {
    Gap {
        gap_beats: f64,
        fade_window_beats: f64,
        fade_bottom: f64,
        stems_to_fade: BTreeSet<Stem>,
        #[serde(default)]
        beat_adjustments: BeatAdjustments,
    },
    Crossfade {
        overlap_window_seconds: f64,
        fade_window_pct: f64,
        fade_bottom: f64,
        stems_to_fade: BTreeSet<Stem>,
        #[serde(default)]
        beat_adjustments: BeatAdjustments,
    },
    Overlap {
        transition_window_seconds: f64,
        overlap_window_seconds: f64,
        fade_window_pct: f64,
        stems_to_fade: BTreeSet<Stem>,
        #[serde(default)]
        beat_adjustments: BeatAdjustments,
    },
}

/// Raised by [`TransitionParameters::validate`]; matches the engine's
/// `InvalidParameters` error kind one-to-one but lives here so the type and
/// its own validation travel together.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("invalid transition parameters: {0}")]
pub struct InvalidParameters(pub String);

impl TransitionParameters {
    #[must_use]
    pub fn beat_adjustments(&self) -> BeatAdjustments {
        match self {
            Self::Gap {
                beat_adjustments, ..
            }
            | Self::Crossfade {
                beat_adjustments, ..
            }
            | Self::Overlap {
                beat_adjustments, ..
            } => *beat_adjustments,
        }
    }

    /// Total, synchronous validation. Matches once on the variant; no
    /// variant inherits checks from another.
    pub fn validate(&self) -> Result<(), InvalidParameters> {
        if !self.beat_adjustments().in_bounds() {
            return Err(InvalidParameters(
                "beat adjustments must each lie in [-4, 4]".to_owned(),
            ));
        }
        match self {
            Self::Gap {
                gap_beats,
                fade_window_beats,
                fade_bottom,
                ..
            } => {
                if *gap_beats <= 0.0 {
                    return Err(InvalidParameters(format!(
                        "gap_beats must be > 0, got {gap_beats}"
                    )));
                }
                if *fade_window_beats < 0.0 {
                    return Err(InvalidParameters(format!(
                        "fade_window_beats must be >= 0, got {fade_window_beats}"
                    )));
                }
                check_fade_bottom(*fade_bottom)?;
                Ok(())
            }
            Self::Crossfade {
                overlap_window_seconds,
                fade_window_pct,
                fade_bottom,
                ..
            } => {
                if *overlap_window_seconds <= 0.0 {
                    return Err(InvalidParameters(format!(
                        "overlap_window must be > 0, got {overlap_window_seconds}"
                    )));
                }
                check_fade_window_pct(*fade_window_pct)?;
                check_fade_bottom(*fade_bottom)?;
                Ok(())
            }
            Self::Overlap {
                transition_window_seconds,
                overlap_window_seconds,
                fade_window_pct,
                ..
            } => {
                if *transition_window_seconds <= 0.0 {
                    return Err(InvalidParameters(format!(
                        "transition_window must be > 0, got {transition_window_seconds}"
                    )));
                }
                if *overlap_window_seconds > *transition_window_seconds {
                    return Err(InvalidParameters(format!(
                        "overlap_window ({overlap_window_seconds}) must be <= transition_window ({transition_window_seconds})"
                    )));
                }
                check_fade_window_pct(*fade_window_pct)?;
                Ok(())
            }
        }
    }
}

fn check_fade_bottom(fade_bottom: f64) -> Result<(), InvalidParameters> {
    if !(0.0..=1.0).contains(&fade_bottom) {
        return Err(InvalidParameters(format!(
            "fade_bottom must be in [0, 1], got {fade_bottom}"
        )));
    }
    Ok(())
}

fn check_fade_window_pct(pct: f64) -> Result<(), InvalidParameters> {
    if !(0.0..=100.0).contains(&pct) {
        return Err(InvalidParameters(format!(
            "fade_window_pct must be in [0, 100], got {pct}"
        )));
    }
    Ok(())
}

/// Sample offsets computed during synthesis, recorded for audit/replay and
/// so tests can re-verify geometry independent of audio content.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct TransitionMetadata {
    pub a_start_sample: usize,
    pub fade_start_sample: usize,
    pub junction_start_sample: usize,
    pub b_start_sample: usize,
    pub total_length_samples: usize,
    /// True when the fallback full-mixdown path fired and therefore every
    /// stem was faded regardless of the caller's requested `stems_to_fade`.
    pub stems_faded_actual_all: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransitionResult {
    pub output_path: std::path::PathBuf,
    pub duration_seconds: f64,
    pub sample_rate: u32,
    pub parameters: TransitionParameters,
    pub metadata: TransitionMetadata,
}
