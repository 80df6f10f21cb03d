//! The transition synthesis engine: `synthesize()` and its three transition
//! bodies (Gap, Crossfade, Overlap). Preview rendering reuses the exact same
//! path with a reduced parameter set, so there is no separate "preview mode".

use setlist_core::buffer::{self, AudioBuffer, FadeKind};
use setlist_stems::{StemSet, StemStore};
use setlist_types::{Section, Song, Stem, TransitionMetadata, TransitionParameters};

use crate::errors::EngineError;
use crate::junction::{windowed_junction, CurveFamily};

fn clamp_seconds(value: f64, song_duration: f64) -> f64 {
    value.clamp(0.0, song_duration)
}

/// Applies the four beat adjustments to a section's raw boundaries and
/// clamps the result into `[0, song.duration_seconds]`.
fn effective_bounds(section: &Section, song: &Song, start_adj_beats: i32, end_adj_beats: i32) -> (f64, f64) {
    let beat_dur = song.beat_duration_seconds();
    let start = clamp_seconds(
        section.start_seconds + f64::from(start_adj_beats) * beat_dur,
        song.duration_seconds,
    );
    let end = clamp_seconds(
        section.end_seconds + f64::from(end_adj_beats) * beat_dur,
        song.duration_seconds,
    );
    (start, end)
}

fn to_samples(seconds: f64, sample_rate: u32) -> usize {
    (seconds * f64::from(sample_rate)).round().max(0.0) as usize
}

fn full_mixdown(stems: &StemSet) -> AudioBuffer {
    let buffers: Vec<&AudioBuffer> = Stem::ALL.iter().filter_map(|s| stems.get(s)).collect();
    buffer::mix(&buffers)
}

fn section_for<'a>(song: &'a Song, index: usize) -> Result<&'a Section, EngineError> {
    song.section(index)
        .ok_or_else(|| EngineError::InvalidParameters(format!("song {} has no section {index}", song.id)))
}

/// Loads the four stems for `[start, end)` of `song`'s `section`. An
/// unavailable-stems error propagates directly: the fallback-mixdown path
/// (see [`full_mixdown`]) only covers an empty `stems_to_fade`, not a
/// missing separation, since recovering a raw pre-separation mix is the
/// object-store/analyzer boundary's job, not the synthesis engine's.
fn load_stems(stems: &mut StemStore, song: &Song, section: &Section, start: f64, end: f64) -> Result<StemSet, EngineError> {
    Ok(stems.load_section(&song.id, section.index, start, end)?)
}

fn check_preconditions(section_a: &Section, section_b: &Section, required_window_seconds: f64) -> Result<(), EngineError> {
    if section_a.duration_seconds() < required_window_seconds
        || section_b.duration_seconds() < required_window_seconds
    {
        return Err(EngineError::InvalidParameters(format!(
            "section durations must be >= the effective transition window ({required_window_seconds}s)"
        )));
    }
    Ok(())
}

/// Runs a Gap transition (with optional fade). See the type's module docs
/// for the exact procedure; this follows it verbatim.
fn synthesize_gap(
    song_a: &Song,
    section_a: &Section,
    song_b: &Song,
    section_b: &Section,
    gap_beats: f64,
    fade_window_beats: f64,
    fade_bottom: f64,
    stems_to_fade: &std::collections::BTreeSet<Stem>,
    adjustments: setlist_types::BeatAdjustments,
    stems: &mut StemStore,
    output_sample_rate: u32,
) -> Result<(AudioBuffer, TransitionMetadata), EngineError> {
    check_preconditions(section_a, section_b, 0.0)?;

    let (start_a, end_a) = effective_bounds(section_a, song_a, adjustments.a_start, adjustments.a_end);
    let (start_b, end_b) = effective_bounds(section_b, song_b, adjustments.b_start, adjustments.b_end);

    let stems_a = load_stems(stems, song_a, section_a, start_a, end_a)?;
    let stems_b = load_stems(stems, song_b, section_b, start_b, end_b)?;
    let fell_back = stems_to_fade.is_empty();

    let half_fade_beats = fade_window_beats / 2.0;
    let fade_a_samples = to_samples(half_fade_beats * song_a.beat_duration_seconds(), output_sample_rate);
    let fade_b_samples = to_samples(half_fade_beats * song_b.beat_duration_seconds(), output_sample_rate);

    let (mut mix_a, mut mix_b) = if fell_back {
        (full_mixdown(&stems_a), full_mixdown(&stems_b))
    } else {
        let mut a_bufs: Vec<AudioBuffer> = Vec::new();
        for stem in Stem::ALL {
            let Some(buf) = stems_a.get(&stem) else { continue };
            let mut buf = buf.clone();
            if stems_to_fade.contains(&stem) {
                buffer::apply_fade(&mut buf, FadeKind::Out, fade_a_samples, false, fade_bottom);
            }
            a_bufs.push(buf);
        }
        let mut b_bufs: Vec<AudioBuffer> = Vec::new();
        for stem in Stem::ALL {
            let Some(buf) = stems_b.get(&stem) else { continue };
            let mut buf = buf.clone();
            if stems_to_fade.contains(&stem) {
                buffer::apply_fade(&mut buf, FadeKind::In, fade_b_samples, true, fade_bottom);
            }
            b_bufs.push(buf);
        }
        let refs_a: Vec<&AudioBuffer> = a_bufs.iter().collect();
        let refs_b: Vec<&AudioBuffer> = b_bufs.iter().collect();
        (buffer::mix(&refs_a), buffer::mix(&refs_b))
    };

    if fell_back {
        buffer::apply_fade(&mut mix_a, FadeKind::Out, fade_a_samples, false, fade_bottom);
        buffer::apply_fade(&mut mix_b, FadeKind::In, fade_b_samples, true, fade_bottom);
    }

    let silence_len = to_samples(gap_beats * song_a.beat_duration_seconds(), output_sample_rate);
    let silence = AudioBuffer::silence(silence_len, output_sample_rate);

    let a_start_sample = 0;
    let fade_start_sample = mix_a.len().saturating_sub(fade_a_samples);
    let junction_start_sample = mix_a.len();
    let b_start_sample = mix_a.len() + silence_len;

    let mut out = buffer::concat(&[mix_a, silence, mix_b])?;
    out.clip();

    let metadata = TransitionMetadata {
        a_start_sample,
        fade_start_sample,
        junction_start_sample,
        b_start_sample,
        total_length_samples: out.len(),
        stems_faded_actual_all: fell_back,
    };

    Ok((out, metadata))
}

#[allow(clippy::too_many_arguments)]
fn synthesize_crossfade(
    song_a: &Song,
    section_a: &Section,
    song_b: &Song,
    section_b: &Section,
    overlap_window_seconds: f64,
    fade_window_pct: f64,
    stems_to_fade: &std::collections::BTreeSet<Stem>,
    adjustments: setlist_types::BeatAdjustments,
    stems: &mut StemStore,
    output_sample_rate: u32,
) -> Result<(AudioBuffer, TransitionMetadata), EngineError> {
    // The summed overlap region is exactly the crossfade length: the split
    // length driving `windowed_junction` must match the fade ramp length, or
    // whatever falls outside the ramp sums at full amplitude unfaded.
    let crossfade_len_seconds = overlap_window_seconds * fade_window_pct / 100.0;
    synthesize_windowed(
        song_a,
        section_a,
        song_b,
        section_b,
        overlap_window_seconds,
        crossfade_len_seconds,
        fade_window_pct,
        stems_to_fade,
        adjustments,
        stems,
        output_sample_rate,
        CurveFamily::EqualPower,
        false,
    )
}

#[allow(clippy::too_many_arguments)]
fn synthesize_overlap(
    song_a: &Song,
    section_a: &Section,
    song_b: &Song,
    section_b: &Section,
    transition_window_seconds: f64,
    overlap_window_seconds: f64,
    fade_window_pct: f64,
    stems_to_fade: &std::collections::BTreeSet<Stem>,
    adjustments: setlist_types::BeatAdjustments,
    stems: &mut StemStore,
    output_sample_rate: u32,
) -> Result<(AudioBuffer, TransitionMetadata), EngineError> {
    synthesize_windowed(
        song_a,
        section_a,
        song_b,
        section_b,
        transition_window_seconds,
        overlap_window_seconds,
        fade_window_pct,
        stems_to_fade,
        adjustments,
        stems,
        output_sample_rate,
        CurveFamily::Linear,
        true,
    )
}

#[allow(clippy::too_many_arguments)]
fn synthesize_windowed(
    song_a: &Song,
    section_a: &Section,
    song_b: &Song,
    section_b: &Section,
    transition_window_seconds: f64,
    junction_window_seconds: f64,
    fade_window_pct: f64,
    stems_to_fade: &std::collections::BTreeSet<Stem>,
    adjustments: setlist_types::BeatAdjustments,
    stems: &mut StemStore,
    output_sample_rate: u32,
    curve: CurveFamily,
    asymmetric: bool,
) -> Result<(AudioBuffer, TransitionMetadata), EngineError> {
    check_preconditions(section_a, section_b, transition_window_seconds)?;

    let (_, eff_end_a) = effective_bounds(section_a, song_a, adjustments.a_start, adjustments.a_end);
    let (eff_start_b, _) = effective_bounds(section_b, song_b, adjustments.b_start, adjustments.b_end);

    let a_window_start = (eff_end_a - transition_window_seconds).max(0.0);
    let b_window_end = eff_start_b + transition_window_seconds;

    let a_window = load_stems(stems, song_a, section_a, a_window_start, eff_end_a)?;
    let b_window = load_stems(stems, song_b, section_b, eff_start_b, b_window_end)?;
    let fell_back = stems_to_fade.is_empty();

    let fade_len_samples = to_samples(transition_window_seconds * fade_window_pct / 100.0, output_sample_rate);
    let junction_len_samples = to_samples(junction_window_seconds, output_sample_rate);

    let effective_fade: std::collections::BTreeSet<Stem> = if fell_back {
        Stem::ALL.into_iter().collect()
    } else {
        stems_to_fade.clone()
    };

    let (out, offsets) = windowed_junction(
        &a_window,
        &b_window,
        &effective_fade,
        junction_len_samples,
        fade_len_samples,
        curve,
        asymmetric,
    )?;

    let metadata = TransitionMetadata {
        a_start_sample: 0,
        fade_start_sample: offsets.fade_start_sample,
        junction_start_sample: offsets.junction_start_sample,
        b_start_sample: offsets.junction_start_sample,
        total_length_samples: offsets.total_length_samples,
        stems_faded_actual_all: fell_back,
    };

    Ok((out, metadata))
}

/// Synthesizes the transition between two chosen sections. Validates
/// `params` before touching any audio; every precondition failure raises
/// [`EngineError::InvalidParameters`] and leaves no partial output.
pub fn synthesize(
    song_a: &Song,
    section_a_idx: usize,
    song_b: &Song,
    section_b_idx: usize,
    params: &TransitionParameters,
    stems: &mut StemStore,
    output_sample_rate: u32,
) -> Result<(AudioBuffer, TransitionMetadata), EngineError> {
    params.validate()?;

    let section_a = section_for(song_a, section_a_idx)?;
    let section_b = section_for(song_b, section_b_idx)?;
    let adjustments = params.beat_adjustments();

    match params {
        TransitionParameters::Gap {
            gap_beats,
            fade_window_beats,
            fade_bottom,
            stems_to_fade,
            ..
        } => synthesize_gap(
            song_a,
            section_a,
            song_b,
            section_b,
            *gap_beats,
            *fade_window_beats,
            *fade_bottom,
            stems_to_fade,
            adjustments,
            stems,
            output_sample_rate,
        ),
        TransitionParameters::Crossfade {
            overlap_window_seconds,
            fade_window_pct,
            stems_to_fade,
            ..
        } => synthesize_crossfade(
            song_a,
            section_a,
            song_b,
            section_b,
            *overlap_window_seconds,
            *fade_window_pct,
            stems_to_fade,
            adjustments,
            stems,
            output_sample_rate,
        ),
        TransitionParameters::Overlap {
            transition_window_seconds,
            overlap_window_seconds,
            fade_window_pct,
            stems_to_fade,
            ..
        } => synthesize_overlap(
            song_a,
            section_a,
            song_b,
            section_b,
            *transition_window_seconds,
            *overlap_window_seconds,
            *fade_window_pct,
            stems_to_fade,
            adjustments,
            stems,
            output_sample_rate,
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use setlist_types::{BeatAdjustments, Key, Mode, SongId};
    use std::path::Path;
    use tempfile::tempdir;

    fn write_stub_wav(path: &Path, n_samples: usize, sample_rate: u32, value: f32) {
        let spec = hound::WavSpec {
            channels: 2,
            sample_rate,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };
        let mut writer = hound::WavWriter::create(path, spec).unwrap();
        for _ in 0..n_samples {
            writer.write_sample((value * 32767.0) as i16).unwrap();
            writer.write_sample((value * 32767.0) as i16).unwrap();
        }
        writer.finalize().unwrap();
    }

    fn seed_stems(root: &Path, id: &SongId, seconds: f64, sample_rate: u32) {
        let dir = root.join(id.as_str());
        std::fs::create_dir_all(&dir).unwrap();
        let n = (seconds * f64::from(sample_rate)) as usize;
        for stem in Stem::ALL {
            write_stub_wav(&dir.join(format!("{}.wav", stem.as_str())), n, sample_rate, 0.2);
        }
    }

    fn song(id: SongId, duration: f64, tempo: f64, sections: Vec<Section>) -> Song {
        Song {
            id,
            source_filename: "x.mp3".to_owned(),
            duration_seconds: duration,
            tempo_bpm: tempo,
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

    fn section(song_id: &SongId, index: usize, start: f64, end: f64, tempo: f64) -> Section {
        Section {
            song_id: song_id.clone(),
            index,
            label: "s".to_owned(),
            start_seconds: start,
            end_seconds: end,
            tempo_bpm: tempo,
            key: "C".to_owned(),
            energy: 60.0,
            loudness_db: -14.0,
            spectral_centroid_hz: 2000.0,
        }
    }

    /// S2: gap_beats=2.0, fade_window_beats=8.0, fade_bottom=0.33,
    /// stems_to_fade=[drums,bass,other], both 120 BPM sections 30s wide.
    /// Output length is additive over the two windows plus the silence, and
    /// B's first post-gap sample lands at exactly `(30 + 1.0) * 44100`.
    #[test]
    fn gap_geometry_matches_seed_scenario() {
        let dir = tempdir().unwrap();
        let sample_rate = 44100;
        let id_a = SongId::new("a".repeat(32));
        let id_b = SongId::new("b".repeat(32));
        seed_stems(dir.path(), &id_a, 75.0, sample_rate);
        seed_stems(dir.path(), &id_b, 40.0, sample_rate);

        let sec_a = section(&id_a, 0, 45.0, 75.0, 120.0);
        let sec_b = section(&id_b, 0, 10.0, 40.0, 120.0);
        let song_a = song(id_a, 180.0, 120.0, vec![sec_a]);
        let song_b = song(id_b, 180.0, 120.0, vec![sec_b]);

        let mut store = StemStore::new(dir.path(), sample_rate, 4);

        let params = TransitionParameters::Gap {
            gap_beats: 2.0,
            fade_window_beats: 8.0,
            fade_bottom: 0.33,
            stems_to_fade: [Stem::Drums, Stem::Bass, Stem::Other].into_iter().collect(),
            beat_adjustments: BeatAdjustments::default(),
        };

        let (out, metadata) = synthesize(&song_a, 0, &song_b, 0, &params, &mut store, sample_rate).unwrap();

        let window_a_samples = 30 * sample_rate as usize;
        let gap_samples = to_samples(2.0 * 0.5, sample_rate);
        let window_b_samples = 30 * sample_rate as usize;
        assert_eq!(out.len(), window_a_samples + gap_samples + window_b_samples);
        assert_eq!(metadata.b_start_sample, 1_367_100);
        assert!(!metadata.stems_faded_actual_all);
    }

    #[test]
    fn empty_stems_to_fade_triggers_full_mixdown_fallback() {
        let dir = tempdir().unwrap();
        let sample_rate = 44100;
        let id_a = SongId::new("c".repeat(32));
        let id_b = SongId::new("d".repeat(32));
        seed_stems(dir.path(), &id_a, 20.0, sample_rate);
        seed_stems(dir.path(), &id_b, 20.0, sample_rate);

        let sec_a = section(&id_a, 0, 0.0, 10.0, 120.0);
        let sec_b = section(&id_b, 0, 0.0, 10.0, 120.0);
        let song_a = song(id_a, 20.0, 120.0, vec![sec_a]);
        let song_b = song(id_b, 20.0, 120.0, vec![sec_b]);
        let mut store = StemStore::new(dir.path(), sample_rate, 4);

        let params = TransitionParameters::Gap {
            gap_beats: 1.0,
            fade_window_beats: 2.0,
            fade_bottom: 0.1,
            stems_to_fade: Default::default(),
            beat_adjustments: BeatAdjustments::default(),
        };
        let (_, metadata) = synthesize(&song_a, 0, &song_b, 0, &params, &mut store, sample_rate).unwrap();
        assert!(metadata.stems_faded_actual_all);
    }

    /// S6: overlap_window (12s) exceeds transition_window (10s) — rejected
    /// before any audio is touched.
    #[test]
    fn invalid_overlap_parameters_rejected_before_audio() {
        let dir = tempdir().unwrap();
        let sample_rate = 44100;
        let id_a = SongId::new("e".repeat(32));
        let id_b = SongId::new("f".repeat(32));
        // deliberately no stems written: if synthesize touched audio it
        // would fail with StemsUnavailable, not InvalidParameters.
        let sec_a = section(&id_a, 0, 0.0, 30.0, 120.0);
        let sec_b = section(&id_b, 0, 0.0, 30.0, 120.0);
        let song_a = song(id_a, 30.0, 120.0, vec![sec_a]);
        let song_b = song(id_b, 30.0, 120.0, vec![sec_b]);
        let mut store = StemStore::new(dir.path(), sample_rate, 4);

        let params = TransitionParameters::Overlap {
            transition_window_seconds: 10.0,
            overlap_window_seconds: 12.0,
            fade_window_pct: 100.0,
            stems_to_fade: [Stem::Vocals].into_iter().collect(),
            beat_adjustments: BeatAdjustments::default(),
        };
        let err = synthesize(&song_a, 0, &song_b, 0, &params, &mut store, sample_rate).unwrap_err();
        assert!(matches!(err, EngineError::InvalidParameters(_)));
    }

    #[test]
    fn crossfade_produces_overlap_add_geometry() {
        let dir = tempdir().unwrap();
        let sample_rate = 44100;
        let id_a = SongId::new("g".repeat(32));
        let id_b = SongId::new("h".repeat(32));
        seed_stems(dir.path(), &id_a, 20.0, sample_rate);
        seed_stems(dir.path(), &id_b, 20.0, sample_rate);
        let sec_a = section(&id_a, 0, 0.0, 16.0, 120.0);
        let sec_b = section(&id_b, 0, 0.0, 16.0, 120.0);
        let song_a = song(id_a, 20.0, 120.0, vec![sec_a]);
        let song_b = song(id_b, 20.0, 120.0, vec![sec_b]);
        let mut store = StemStore::new(dir.path(), sample_rate, 4);

        let params = TransitionParameters::Crossfade {
            overlap_window_seconds: 8.0,
            fade_window_pct: 100.0,
            fade_bottom: 0.1,
            stems_to_fade: Stem::ALL.into_iter().collect(),
            beat_adjustments: BeatAdjustments::default(),
        };
        let (out, metadata) = synthesize(&song_a, 0, &song_b, 0, &params, &mut store, sample_rate).unwrap();
        let crossfade_len = to_samples(8.0, sample_rate);
        assert_eq!(out.len(), crossfade_len + crossfade_len);
        assert_eq!(metadata.total_length_samples, out.len());
    }

    /// With `fade_window_pct < 100`, the summed overlap-add region must be
    /// exactly `overlap_window_seconds * fade_window_pct / 100`, not the
    /// full `overlap_window_seconds` window — the untapered remainder of
    /// each side's window plays back to back with the other, not summed.
    #[test]
    fn crossfade_with_partial_fade_pct_overlaps_only_the_crossfade_length() {
        let dir = tempdir().unwrap();
        let sample_rate = 44100;
        let id_a = SongId::new("i".repeat(32));
        let id_b = SongId::new("j".repeat(32));
        seed_stems(dir.path(), &id_a, 20.0, sample_rate);
        seed_stems(dir.path(), &id_b, 20.0, sample_rate);
        let sec_a = section(&id_a, 0, 0.0, 16.0, 120.0);
        let sec_b = section(&id_b, 0, 0.0, 16.0, 120.0);
        let song_a = song(id_a, 20.0, 120.0, vec![sec_a]);
        let song_b = song(id_b, 20.0, 120.0, vec![sec_b]);
        let mut store = StemStore::new(dir.path(), sample_rate, 4);

        let params = TransitionParameters::Crossfade {
            overlap_window_seconds: 8.0,
            fade_window_pct: 50.0,
            fade_bottom: 0.1,
            stems_to_fade: Stem::ALL.into_iter().collect(),
            beat_adjustments: BeatAdjustments::default(),
        };
        let (out, metadata) = synthesize(&song_a, 0, &song_b, 0, &params, &mut store, sample_rate).unwrap();

        let overlap_samples = to_samples(8.0, sample_rate);
        let crossfade_len = to_samples(8.0 * 0.5, sample_rate);
        assert_eq!(out.len(), 2 * overlap_samples - crossfade_len);
        assert_eq!(metadata.total_length_samples, out.len());
    }
}
