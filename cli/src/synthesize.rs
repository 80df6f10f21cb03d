//! `setlist synthesize`: loads a request describing two songs, the
//! sections to transition between, and the transition parameters, then
//! writes the rendered FLAC plus its sidecar JSON.
//!
//! The request shape reuses `setlist_types::{Song, TransitionParameters}`
//! directly rather than inventing a parallel CLI-only schema, since both
//! already round-trip through serde for the job store and cache.

use std::path::{Path, PathBuf};
use std::time::SystemTime;

use serde::Deserialize;
use setlist_engine::output::{file_sha256, hex_digest, output_filename, write_flac, write_sidecar, OutputSidecar};
use setlist_stems::StemStore;
use setlist_types::{Song, TransitionParameters};

use crate::errors::CliError;

#[derive(Debug, Deserialize)]
pub struct SynthesizeRequest {
    pub song_a: Song,
    pub section_a: usize,
    pub song_b: Song,
    pub section_b: usize,
    pub parameters: TransitionParameters,
    /// Directory holding `<song_id>/<stem>.wav` layouts, as read by
    /// [`setlist_stems::StemStore`].
    pub stems_root: PathBuf,
    pub output_dir: PathBuf,
    /// Used only in the output filename, e.g. `"1.0beats"`.
    pub param_tag: String,
}

fn kind_tag(params: &TransitionParameters) -> &'static str {
    match params {
        TransitionParameters::Gap { .. } => "gap",
        TransitionParameters::Crossfade { .. } => "crossfade",
        TransitionParameters::Overlap { .. } => "overlap",
    }
}

/// Source hash for a `Song` is the hash of its own serialized analysis
/// record, not its raw audio bytes: the CLI never re-reads the original
/// file at synthesis time, only the already-separated stems.
fn song_source_hash(song: &Song) -> Result<String, CliError> {
    Ok(hex_digest(&serde_json::to_vec(song)?))
}

pub fn run(request_path: &Path, output_sample_rate: u32, stems_cache_capacity: usize) -> Result<PathBuf, CliError> {
    let raw = std::fs::read(request_path)?;
    let request: SynthesizeRequest = serde_json::from_slice(&raw)?;

    let mut stems = StemStore::new(&request.stems_root, output_sample_rate, stems_cache_capacity);
    let (buffer, metadata) = setlist_engine::synthesize(
        &request.song_a,
        request.section_a,
        &request.song_b,
        request.section_b,
        &request.parameters,
        &mut stems,
        output_sample_rate,
    )?;

    std::fs::create_dir_all(&request.output_dir)?;
    let filename = output_filename(
        kind_tag(&request.parameters),
        &request.song_a.id,
        request.section_a,
        &request.song_b.id,
        request.section_b,
        &request.param_tag,
    );
    let output_path = request.output_dir.join(filename);
    write_flac(&buffer, &output_path)?;

    let sidecar = OutputSidecar {
        parameters: request.parameters,
        metadata,
        source_hash_a: song_source_hash(&request.song_a)?,
        source_hash_b: song_source_hash(&request.song_b)?,
        output_hash: file_sha256(&output_path)?,
        generated_at: SystemTime::now(),
    };
    write_sidecar(&output_path, &sidecar)?;

    Ok(output_path)
}
