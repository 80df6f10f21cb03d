//! Reference analyzer/aligner drivers.
//!
//! Real analyzer/aligner implementations wrap ML models (source separation,
//! tempo/key estimation, Whisper transcription) and are out of scope here,
//! exactly as `setlist_core::adapters`' own doc comment says. These two
//! drivers exist so `setlist job submit` has something to actually call:
//! the analyzer decodes the file to learn its true duration and otherwise
//! reports conservative constants, and the aligner distributes the
//! caller's lyric lines evenly across that duration instead of aligning
//! them to anything. Neither is a substitute for the real thing.

use std::path::Path;

use setlist_core::adapters::{AlignedPhrase, AlignerDriver, AlignmentOptions, AlignmentOutput, AnalyzerDriver};
use setlist_core::errors::DriverError;
use setlist_types::AnalysisRecord;

/// Assumed sample rate for decoding; only used to recover a duration, so
/// any rate the source actually decodes to works equally well here.
const PROBE_SAMPLE_RATE: u32 = 44100;

fn probe_duration_seconds(path: &Path) -> Result<f64, DriverError> {
    let buffer = setlist_stems::decoder::decode_stem(path, PROBE_SAMPLE_RATE)
        .map_err(|e| DriverError::Analyzer(e.to_string()))?;
    Ok(buffer.len() as f64 / f64::from(PROBE_SAMPLE_RATE))
}

/// Reports duration from the actual decode and fills every other field
/// with a fixed placeholder value.
pub struct PlaceholderAnalyzerDriver;

impl AnalyzerDriver for PlaceholderAnalyzerDriver {
    fn analyze(&self, path: &Path) -> Result<AnalysisRecord, DriverError> {
        let duration_seconds = probe_duration_seconds(path)?;
        Ok(AnalysisRecord {
            duration_seconds,
            tempo_bpm: 120.0,
            musical_key: "C".to_owned(),
            musical_mode: "major".to_owned(),
            key_confidence: 0.0,
            loudness_db: -14.0,
            beats: Vec::new(),
            downbeats: Vec::new(),
            sections: Vec::new(),
            embeddings_shape: vec![0],
        })
    }
}

fn format_lrc_timestamp(seconds: f64) -> String {
    let clamped = seconds.max(0.0);
    let minutes = (clamped / 60.0).floor() as u64;
    let remainder = clamped - (minutes as f64) * 60.0;
    format!("{minutes:02}:{remainder:05.2}")
}

/// Splits `lyrics_text` into non-empty lines and spaces them evenly across
/// the source audio's duration; writes the result as a `.lrc` sibling of
/// `audio_path` and reports the same phrases back for caching.
pub struct PlaceholderAlignerDriver;

impl AlignerDriver for PlaceholderAlignerDriver {
    fn align(&self, audio_path: &Path, lyrics_text: &str, _options: &AlignmentOptions) -> Result<AlignmentOutput, DriverError> {
        let duration_seconds = probe_duration_seconds(audio_path)?;
        let lines: Vec<&str> = lyrics_text.lines().map(str::trim).filter(|l| !l.is_empty()).collect();
        if lines.is_empty() {
            return Err(DriverError::Aligner("lyrics_text has no non-empty lines".to_owned()));
        }

        let step = duration_seconds / lines.len() as f64;
        let phrases: Vec<AlignedPhrase> = lines
            .iter()
            .enumerate()
            .map(|(i, text)| {
                let start = (i as f64 * step).min(duration_seconds);
                let end = (start + step).min(duration_seconds);
                AlignedPhrase {
                    text: (*text).to_owned(),
                    start,
                    end,
                }
            })
            .collect();

        let mut lrc = String::new();
        for phrase in &phrases {
            lrc.push_str(&format!("[{}]{}\n", format_lrc_timestamp(phrase.start), phrase.text));
        }
        let lrc_path = audio_path.with_extension("lrc");
        std::fs::write(&lrc_path, &lrc).map_err(|e| DriverError::Aligner(format!("failed to write lrc: {e}")))?;

        Ok(AlignmentOutput {
            lrc_path,
            line_count: phrases.len(),
            phrases,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timestamp_formatting_matches_lrc_convention() {
        assert_eq!(format_lrc_timestamp(0.0), "00:00.00");
        assert_eq!(format_lrc_timestamp(65.5), "01:05.50");
    }
}
