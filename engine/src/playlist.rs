//! Playlist assembler: stitches per-song section runs together with the
//! engine's own transition output spliced at each junction. Never re-runs
//! analysis — it only calls [`crate::synth::synthesize`] with parameters the
//! caller already prepared.

use setlist_core::buffer::{self, AudioBuffer};
use setlist_stems::StemStore;
use setlist_types::{Section, Song, TransitionMetadata, TransitionParameters};

use crate::errors::EngineError;
use crate::synth::synthesize;

/// One song's contribution to a playlist: the inclusive range of section
/// indices to play, and the transition to use going into the next entry
/// (`None` for the last entry).
pub struct PlaylistEntry<'a> {
    pub song: &'a Song,
    pub start_section: usize,
    pub end_section: usize,
    pub transition_to_next: Option<TransitionParameters>,
}

pub struct AssembledTransition {
    pub parameters: TransitionParameters,
    pub metadata: TransitionMetadata,
}

/// Concatenates a song's `[start_section, end_section]` sections without
/// modification.
fn concat_song_range(song: &Song, start_section: usize, end_section: usize, stems: &mut StemStore) -> Result<AudioBuffer, EngineError> {
    let mut buffers = Vec::new();
    for idx in start_section..=end_section {
        let section: &Section = song
            .section(idx)
            .ok_or_else(|| EngineError::InvalidParameters(format!("song {} has no section {idx}", song.id)))?;
        let set = stems.load_section(&song.id, section.index, section.start_seconds, section.end_seconds)?;
        let combined: Vec<&AudioBuffer> = setlist_types::Stem::ALL.iter().filter_map(|s| set.get(s)).collect();
        buffers.push(buffer::mix(&combined));
    }
    Ok(buffer::concat(&buffers)?)
}

/// The portion of a transition's effective window already consumed from the
/// enclosing section's tail/head, so the assembler knows how much to trim
/// before splicing the engine's output in.
fn transition_window_seconds(params: &TransitionParameters) -> f64 {
    match params {
        TransitionParameters::Gap { .. } => 0.0,
        TransitionParameters::Crossfade {
            overlap_window_seconds,
            ..
        } => *overlap_window_seconds,
        TransitionParameters::Overlap {
            transition_window_seconds,
            ..
        } => *transition_window_seconds,
    }
}

/// Assembles a full playlist buffer from an ordered list of entries.
///
/// For each song, concatenates its chosen sections, then at each junction
/// trims the outgoing song's tail window and the incoming song's head
/// window (the amount each transition type already re-synthesizes) and
/// splices in the engine's transition output in their place.
pub fn assemble(entries: &[PlaylistEntry<'_>], stems: &mut StemStore, output_sample_rate: u32) -> Result<(AudioBuffer, Vec<AssembledTransition>), EngineError> {
    if entries.is_empty() {
        return Ok((AudioBuffer::silence(0, output_sample_rate), Vec::new()));
    }

    let mut pieces: Vec<AudioBuffer> = Vec::with_capacity(entries.len() * 2 - 1);
    let mut transitions = Vec::new();
    let mut pending_head_trim = 0usize;

    for (i, entry) in entries.iter().enumerate() {
        let mut song_buf = concat_song_range(entry.song, entry.start_section, entry.end_section, stems)?;

        if pending_head_trim > 0 {
            let len = song_buf.len();
            song_buf = song_buf.slice(pending_head_trim.min(len), len);
            pending_head_trim = 0;
        }

        match &entry.transition_to_next {
            Some(params) => {
                let next = entries
                    .get(i + 1)
                    .ok_or_else(|| EngineError::InvalidParameters("transition_to_next set on last entry".to_owned()))?;

                let window_samples = (transition_window_seconds(params) * f64::from(output_sample_rate)).round() as usize;
                let trimmed_len = song_buf.len().saturating_sub(window_samples);
                song_buf = song_buf.slice(0, trimmed_len);

                let (transition_audio, metadata) = synthesize(
                    entry.song,
                    entry.end_section,
                    next.song,
                    next.start_section,
                    params,
                    stems,
                    output_sample_rate,
                )?;

                pieces.push(song_buf);
                pieces.push(transition_audio);
                transitions.push(AssembledTransition {
                    parameters: params.clone(),
                    metadata,
                });
                pending_head_trim = window_samples;
            }
            None => pieces.push(song_buf),
        }
    }

    let mut out = buffer::concat(&pieces)?;
    out.clip();
    Ok((out, transitions))
}
