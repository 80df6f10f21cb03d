//! Stereo float32 audio buffer primitives: fade curves, mixing, and
//! concatenation.
//!
//! Grounded on the teacher's own sample-buffer handling (`core/src/audio`'s
//! move-semantics ownership of decoded audio, `analysis/src/decoder/mecomp.rs`'s
//! per-channel interleaving idioms) but generalized from mono-collapse to a
//! stereo-preserving buffer, since transitions must synthesize in stereo.

use crate::errors::CoreError;

/// A stereo PCM buffer: two equal-length channels of 32-bit float samples,
/// plus the sample rate they were captured/resampled at. Samples are
/// unconstrained in range until an explicit [`AudioBuffer::clip`] call.
#[derive(Debug, Clone, PartialEq)]
pub struct AudioBuffer {
    pub left: Vec<f32>,
    pub right: Vec<f32>,
    pub sample_rate: u32,
}

impl AudioBuffer {
    /// # Panics
    /// Panics if `left.len() != right.len()` or `sample_rate == 0`; both are
    /// invariants every producer in this crate upholds by construction.
    #[must_use]
    pub fn new(left: Vec<f32>, right: Vec<f32>, sample_rate: u32) -> Self {
        assert_eq!(left.len(), right.len(), "channel length mismatch");
        assert!(sample_rate > 0, "sample rate must be positive");
        Self {
            left,
            right,
            sample_rate,
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.left.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.left.is_empty()
    }

    #[must_use]
    pub fn duration_seconds(&self) -> f64 {
        self.len() as f64 / f64::from(self.sample_rate)
    }

    /// Stereo zeros of the given length.
    #[must_use]
    pub fn silence(n_samples: usize, sample_rate: u32) -> Self {
        Self::new(vec![0.0; n_samples], vec![0.0; n_samples], sample_rate)
    }

    /// A half-open sample-index slice `[start, end)`, clamped to bounds.
    #[must_use]
    pub fn slice(&self, start: usize, end: usize) -> Self {
        let end = end.min(self.len());
        let start = start.min(end);
        Self::new(
            self.left[start..end].to_vec(),
            self.right[start..end].to_vec(),
            self.sample_rate,
        )
    }

    /// Clips every sample into `[-1.0, 1.0]` in place.
    pub fn clip(&mut self) {
        for s in self.left.iter_mut().chain(self.right.iter_mut()) {
            *s = s.clamp(-1.0, 1.0);
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FadeKind {
    Out,
    In,
}

/// The floor fade-bottom uses to avoid `log10(0)`: -60 dB, i.e. `10^(-60/20)`.
pub const FADE_FLOOR_DB: f64 = -60.0;

/// Constructs a logarithmic (dB-linear) gain ramp of `n_samples` values.
///
/// - `fade_bottom >= 1.0` returns all-ones (no attenuation).
/// - `fade_bottom <= 0.001` clamps the floor to -60 dB.
/// - Otherwise `min_db = 20*log10(fade_bottom)`, interpolated linearly in dB
///   across the curve (0 -> min_db for Out, min_db -> 0 for In), then
///   converted back to linear gain via `10^(db/20)`.
/// - `n_samples == 0` yields an empty curve, never an error.
#[must_use]
pub fn fade_curve(kind: FadeKind, n_samples: usize, fade_bottom: f64) -> Vec<f32> {
    if n_samples == 0 {
        return Vec::new();
    }
    if fade_bottom >= 1.0 {
        return vec![1.0; n_samples];
    }
    let min_db = if fade_bottom <= 0.001 {
        FADE_FLOOR_DB
    } else {
        20.0 * fade_bottom.log10()
    };

    let mut curve = Vec::with_capacity(n_samples);
    let denom = (n_samples.max(2) - 1) as f64;
    for i in 0..n_samples {
        let t = if n_samples == 1 { 0.0 } else { i as f64 / denom };
        let db = match kind {
            FadeKind::Out => min_db * t,
            FadeKind::In => min_db * (1.0 - t),
        };
        curve.push((10f64.powf(db / 20.0)) as f32);
    }
    curve
}

/// Multiplies the first (`at_start = true`) or last (`at_start = false`)
/// `min(n_samples, len)` samples of `buffer` by a [`fade_curve`], broadcast
/// across both channels. The rest of the buffer is untouched.
pub fn apply_fade(
    buffer: &mut AudioBuffer,
    kind: FadeKind,
    n_samples: usize,
    at_start: bool,
    fade_bottom: f64,
) {
    let n = n_samples.min(buffer.len());
    let curve = fade_curve(kind, n, fade_bottom);
    let len = buffer.len();
    let range = if at_start { 0..n } else { (len - n)..len };
    for (i, idx) in range.enumerate() {
        buffer.left[idx] *= curve[i];
        buffer.right[idx] *= curve[i];
    }
}

/// Element-wise sum of all input buffers. Output length is the max input
/// length; shorter inputs are zero-padded at the tail. Final clip to
/// `[-1.0, 1.0]` is applied once, at the end.
#[must_use]
pub fn mix(buffers: &[&AudioBuffer]) -> AudioBuffer {
    let sample_rate = buffers.first().map_or(44100, |b| b.sample_rate);
    let max_len = buffers.iter().map(|b| b.len()).max().unwrap_or(0);

    let mut left = vec![0.0f32; max_len];
    let mut right = vec![0.0f32; max_len];
    for b in buffers {
        for (i, &s) in b.left.iter().enumerate() {
            left[i] += s;
        }
        for (i, &s) in b.right.iter().enumerate() {
            right[i] += s;
        }
    }
    let mut out = AudioBuffer::new(left, right, sample_rate);
    out.clip();
    out
}

/// Sample-exact concatenation. All inputs must share a sample rate.
pub fn concat(buffers: &[AudioBuffer]) -> Result<AudioBuffer, CoreError> {
    let Some(first) = buffers.first() else {
        return Ok(AudioBuffer::new(Vec::new(), Vec::new(), 44100));
    };
    let sample_rate = first.sample_rate;
    for b in buffers {
        if b.sample_rate != sample_rate {
            return Err(CoreError::SampleRateMismatch {
                expected: sample_rate,
                found: b.sample_rate,
            });
        }
    }
    let total: usize = buffers.iter().map(AudioBuffer::len).sum();
    let mut left = Vec::with_capacity(total);
    let mut right = Vec::with_capacity(total);
    for b in buffers {
        left.extend_from_slice(&b.left);
        right.extend_from_slice(&b.right);
    }
    Ok(AudioBuffer::new(left, right, sample_rate))
}
