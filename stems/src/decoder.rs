//! Stem WAV decoding: `rodio` for container/codec decode, `rubato` for
//! resampling. Grounded on the teacher's `analysis/src/decoder/mecomp.rs`,
//! generalized from a fixed mono-22050Hz analysis target to a
//! stereo-preserving buffer resampled to the engine's configured output
//! rate. Mono sources are duplicated to stereo rather than collapsed,
//! matching the external-interfaces "mono is duplicated to stereo on load"
//! rule.

use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use rodio::Source;
use rubato::{FastFixedIn, PolynomialDegree, Resampler};
use setlist_core::AudioBuffer;

use crate::errors::StemsError;

/// Decodes `path` and resamples it (if needed) to `target_sample_rate`,
/// returning a stereo buffer. Mono input is duplicated across both
/// channels; anything beyond 2 channels is downmixed by averaging.
pub fn decode_stem(path: &Path, target_sample_rate: u32) -> Result<AudioBuffer, StemsError> {
    let file = BufReader::new(File::open(path)?);
    let source = rodio::Decoder::new(file).map_err(|e| StemsError::Decode {
        path: path.to_owned(),
        source: Box::new(e),
    })?;

    let num_channels = source.channels() as usize;
    let source_rate = source.sample_rate();
    let samples: Vec<f32> = source.collect();

    let (left, right) = match num_channels {
        0 => {
            return Err(StemsError::Decode {
                path: path.to_owned(),
                source: "audio source has no channels".into(),
            })
        }
        1 => (samples.clone(), samples),
        2 => {
            let left: Vec<f32> = samples.iter().step_by(2).copied().collect();
            let right: Vec<f32> = samples.iter().skip(1).step_by(2).copied().collect();
            (left, right)
        }
        n => {
            log::warn!(
                "stem at {} has {n} channels, downmixing to stereo by averaging",
                path.display()
            );
            let left: Vec<f32> = samples
                .chunks_exact(n)
                .map(|c| c[..n / 2].iter().sum::<f32>() / (n / 2) as f32)
                .collect();
            let right: Vec<f32> = samples
                .chunks_exact(n)
                .map(|c| c[n / 2..].iter().sum::<f32>() / (n - n / 2) as f32)
                .collect();
            (left, right)
        }
    };

    if source_rate == target_sample_rate {
        return Ok(AudioBuffer::new(left, right, target_sample_rate));
    }

    let resample_channel = |channel: &[f32]| -> Result<Vec<f32>, StemsError> {
        let mut resampler = FastFixedIn::new(
            f64::from(target_sample_rate) / f64::from(source_rate),
            1.0,
            PolynomialDegree::Cubic,
            channel.len(),
            1,
        )
        .map_err(|e| StemsError::Decode {
            path: path.to_owned(),
            source: Box::new(e),
        })?;
        Ok(resampler
            .process(&[channel], None)
            .map_err(|e| StemsError::Decode {
                path: path.to_owned(),
                source: Box::new(e),
            })?
            .remove(0))
    };

    let left = resample_channel(&left)?;
    let right = resample_channel(&right)?;
    Ok(AudioBuffer::new(left, right, target_sample_rate))
}
