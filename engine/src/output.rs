//! Writes a synthesized transition to a FLAC file plus its sidecar `.json`,
//! and computes the content hashes used by the cache and job store.
//!
//! FLAC/WAV writing has no counterpart in the stem decoder, which only ever
//! reads audio. Grounded instead on the FFmpeg-free encoder path in the
//! reference pack's offline rendering crate, which drives `hound` for WAV
//! and `flac_bound` for FLAC the same way.

use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use flac_bound::{FlacEncoder, WriteWrapper};
use serde::Serialize;
use setlist_core::AudioBuffer;
use setlist_types::{SongId, TransitionMetadata, TransitionParameters};
use sha2::{Digest, Sha256};

use crate::errors::EngineError;

/// Default FLAC compression level (0-8); matches the reference encoder's
/// middle-of-the-road default.
const FLAC_COMPRESSION_LEVEL: u32 = 5;
const BITS_PER_SAMPLE: u32 = 16;

/// `transition_<type>_<songA>_<sectionA>_<songB>_<sectionB>_<param>.flac`
#[must_use]
pub fn output_filename(
    kind: &str,
    song_a: &SongId,
    section_a: usize,
    song_b: &SongId,
    section_b: usize,
    param_tag: &str,
) -> String {
    format!(
        "transition_{kind}_{}_{section_a}_{}_{section_b}_{param_tag}.flac",
        song_a.as_str(),
        song_b.as_str()
    )
}

/// Encodes `buffer` as 16-bit PCM FLAC and writes it to `path`.
pub fn write_flac(buffer: &AudioBuffer, path: &Path) -> Result<(), EngineError> {
    let file = File::create(path)?;
    let mut writer = BufWriter::new(file);
    let mut wrapper = WriteWrapper(&mut writer);

    let mut encoder = FlacEncoder::new()
        .ok_or_else(|| EngineError::Encode("FLAC encoder init failed".to_owned()))?
        .channels(2)
        .sample_rate(buffer.sample_rate)
        .bits_per_sample(BITS_PER_SAMPLE)
        .compression_level(FLAC_COMPRESSION_LEVEL)
        .init_write(&mut wrapper)
        .map_err(|e| EngineError::Encode(format!("FLAC init failed: {e:?}")))?;

    let max_val = f64::from(1i32 << (BITS_PER_SAMPLE - 1));
    let frames = buffer.len();
    const BLOCK_SIZE: usize = 4096;
    for block_start in (0..frames).step_by(BLOCK_SIZE) {
        let block_end = (block_start + BLOCK_SIZE).min(frames);
        let mut interleaved = Vec::with_capacity((block_end - block_start) * 2);
        for i in block_start..block_end {
            interleaved.push((buffer.left[i].clamp(-1.0, 1.0) as f64 * max_val) as i32);
            interleaved.push((buffer.right[i].clamp(-1.0, 1.0) as f64 * max_val) as i32);
        }
        encoder
            .process_interleaved(&interleaved, (block_end - block_start) as u32)
            .map_err(|e| EngineError::Encode(format!("FLAC encode failed: {e:?}")))?;
    }
    encoder
        .finish()
        .map_err(|e| EngineError::Encode(format!("FLAC finish failed: {e:?}")))?;
    Ok(())
}

/// Writes `buffer` as a 16-bit PCM WAV, used for previews where FLAC's
/// framing overhead is not worth paying.
pub fn write_wav(buffer: &AudioBuffer, path: &Path) -> Result<(), EngineError> {
    let spec = hound::WavSpec {
        channels: 2,
        sample_rate: buffer.sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };
    let mut writer = hound::WavWriter::create(path, spec)
        .map_err(|e| EngineError::Encode(e.to_string()))?;
    for i in 0..buffer.len() {
        writer
            .write_sample((buffer.left[i].clamp(-1.0, 1.0) * 32767.0) as i16)
            .map_err(|e| EngineError::Encode(e.to_string()))?;
        writer
            .write_sample((buffer.right[i].clamp(-1.0, 1.0) * 32767.0) as i16)
            .map_err(|e| EngineError::Encode(e.to_string()))?;
    }
    writer.finalize().map_err(|e| EngineError::Encode(e.to_string()))?;
    Ok(())
}

/// SHA-256 hex digest of a file's bytes, used both for job `content_hash`
/// and for the cache's content address.
pub fn file_sha256(path: &Path) -> Result<String, EngineError> {
    let bytes = std::fs::read(path)?;
    Ok(hex_digest(&bytes))
}

#[must_use]
pub fn hex_digest(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    format!("{:x}", hasher.finalize())
}

#[derive(Debug, Clone, Serialize)]
pub struct OutputSidecar {
    pub parameters: TransitionParameters,
    pub metadata: TransitionMetadata,
    pub source_hash_a: String,
    pub source_hash_b: String,
    pub output_hash: String,
    pub generated_at: SystemTime,
}

/// Writes the sibling `.json` next to an engine output: full parameter set,
/// computed sample offsets, both sources' content hashes, and generation
/// time.
pub fn write_sidecar(output_path: &Path, sidecar: &OutputSidecar) -> Result<PathBuf, EngineError> {
    let sidecar_path = output_path.with_extension("json");
    let json = serde_json::to_vec_pretty(sidecar).map_err(|e| EngineError::Encode(e.to_string()))?;
    std::fs::write(&sidecar_path, json)?;
    Ok(sidecar_path)
}
