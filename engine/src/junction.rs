//! The shared primitive behind Crossfade and Overlap. Per the Open Question
//! in the design notes, these two transition families share substantial
//! structure in the source implementation; here they are unified behind one
//! `windowed_junction` parameterized by curve family and an asymmetry flag,
//! rather than duplicated. This is a refactor, not a behaviour change — the
//! public `crossfade`/`overlap` functions still produce the exact sample
//! geometry the seed scenarios require.

use std::collections::BTreeSet;

use setlist_core::buffer::{self, AudioBuffer};
use setlist_stems::StemSet;
use setlist_types::Stem;

use crate::errors::EngineError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CurveFamily {
    /// Linear in amplitude: Overlap's "(linearly)" fade-out, distinct from
    /// the dB-linear ramp Gap uses.
    Linear,
    EqualPower,
}

fn t_values(n: usize) -> Vec<f64> {
    let denom = (n.max(2) - 1) as f64;
    (0..n).map(|i| if n == 1 { 0.0 } else { i as f64 / denom }).collect()
}

fn curve_pair(family: CurveFamily, n: usize) -> (Vec<f32>, Vec<f32>) {
    let t = t_values(n);
    match family {
        CurveFamily::Linear => (
            t.iter().map(|t| (1.0 - t) as f32).collect(),
            t.iter().map(|t| *t as f32).collect(),
        ),
        CurveFamily::EqualPower => (
            t.iter().map(|t| (1.0 - t).sqrt() as f32).collect(),
            t.iter().map(|t| t.sqrt() as f32).collect(),
        ),
    }
}

fn apply_curve_to_tail(buf: &mut AudioBuffer, curve: &[f32]) {
    let n = curve.len().min(buf.len());
    let len = buf.len();
    for (i, gain) in curve[curve.len() - n..].iter().enumerate() {
        let idx = len - n + i;
        buf.left[idx] *= gain;
        buf.right[idx] *= gain;
    }
}

fn apply_curve_to_head(buf: &mut AudioBuffer, curve: &[f32]) {
    let n = curve.len().min(buf.len());
    for (i, gain) in curve[..n].iter().enumerate() {
        buf.left[i] *= gain;
        buf.right[i] *= gain;
    }
}

fn mix_selected(stems: &StemSet, stems_to_fade: &BTreeSet<Stem>, fade: Option<(&[f32], bool)>) -> AudioBuffer {
    let mut buffers: Vec<AudioBuffer> = Vec::with_capacity(Stem::ALL.len());
    for stem in Stem::ALL {
        let Some(buf) = stems.get(&stem) else {
            continue;
        };
        let mut buf = buf.clone();
        if stems_to_fade.contains(&stem) {
            if let Some((curve, at_tail)) = fade {
                if at_tail {
                    apply_curve_to_tail(&mut buf, curve);
                } else {
                    apply_curve_to_head(&mut buf, curve);
                }
            }
        }
        buffers.push(buf);
    }
    let refs: Vec<&AudioBuffer> = buffers.iter().collect();
    buffer::mix(&refs)
}

/// Sample offsets for the junction region, relative to the start of the
/// combined `a_window ++ junction ++ b_window` output.
#[derive(Debug, Clone, Copy, Default)]
pub struct JunctionOffsets {
    pub fade_start_sample: usize,
    pub junction_start_sample: usize,
    pub total_length_samples: usize,
}

/// Builds the full `A[:len_a-L] ++ (A[len_a-L:] + B[:L]) ++ B[L:]` output
/// for a windowed transition. `fade_len_samples` is the length of the fade
/// ramp itself (may be shorter than `junction_len_samples`, as happens for
/// Overlap); `asymmetric` suppresses the fade on B's side so only A's
/// selected stems taper (Overlap's contract — B plays unattenuated).
pub fn windowed_junction(
    a_window: &StemSet,
    b_window: &StemSet,
    stems_to_fade: &BTreeSet<Stem>,
    junction_len_samples: usize,
    fade_len_samples: usize,
    curve: CurveFamily,
    asymmetric: bool,
) -> Result<(AudioBuffer, JunctionOffsets), EngineError> {
    let (fade_out, fade_in) = curve_pair(curve, fade_len_samples);

    let mixed_a = mix_selected(a_window, stems_to_fade, Some((&fade_out, true)));
    let mixed_b = if asymmetric {
        mix_selected(b_window, stems_to_fade, None)
    } else {
        mix_selected(b_window, stems_to_fade, Some((&fade_in, false)))
    };

    if mixed_a.sample_rate != mixed_b.sample_rate {
        return Err(EngineError::SampleRateMismatch {
            expected: mixed_a.sample_rate,
            found: mixed_b.sample_rate,
        });
    }

    let len_a = mixed_a.len();
    let len_b = mixed_b.len();
    let junction_len = junction_len_samples.min(len_a).min(len_b);

    let a_head = mixed_a.slice(0, len_a - junction_len);
    let a_tail = mixed_a.slice(len_a - junction_len, len_a);
    let b_head = mixed_b.slice(0, junction_len);
    let b_tail = mixed_b.slice(junction_len, len_b);

    let overlap = buffer::mix(&[&a_tail, &b_head]);
    let mut out = buffer::concat(&[a_head, overlap, b_tail])?;
    out.clip();

    let offsets = JunctionOffsets {
        fade_start_sample: len_a - junction_len,
        junction_start_sample: len_a - junction_len,
        total_length_samples: out.len(),
    };

    Ok((out, offsets))
}

#[cfg(test)]
mod tests {
    use super::*;
    use setlist_core::AudioBuffer;

    fn flat_stems(value: f32, len: usize, sample_rate: u32) -> StemSet {
        Stem::ALL
            .iter()
            .map(|s| (*s, AudioBuffer::new(vec![value; len], vec![value; len], sample_rate)))
            .collect()
    }

    #[test]
    fn junction_output_length_is_additive() {
        let a = flat_stems(0.1, 100, 44100);
        let b = flat_stems(0.1, 100, 44100);
        let stems_to_fade: BTreeSet<Stem> = [Stem::Vocals].into_iter().collect();
        let (out, _) = windowed_junction(&a, &b, &stems_to_fade, 20, 20, CurveFamily::EqualPower, false).unwrap();
        assert_eq!(out.len(), 100 - 20 + 20 + (100 - 20));
    }

    #[test]
    fn asymmetric_leaves_b_unattenuated_at_head() {
        let a = flat_stems(0.5, 50, 44100);
        let b = flat_stems(0.5, 50, 44100);
        let stems_to_fade: BTreeSet<Stem> = Stem::ALL.into_iter().collect();
        let (out, offsets) =
            windowed_junction(&a, &b, &stems_to_fade, 10, 10, CurveFamily::Linear, true).unwrap();
        // the very first post-junction B sample should be un-attenuated (full amplitude)
        let last_sample_idx = out.len() - 1;
        assert!(out.left[last_sample_idx].abs() > 1.9);
        assert!(offsets.total_length_samples == out.len());
    }
}
