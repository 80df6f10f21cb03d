//! Compatibility scorer: a pure function from a pair of sections to a
//! weighted [`CompatibilityScore`]. Section comparison lives here, on
//! sections, never on songs — junction decisions are always between
//! sections.

use setlist_types::{CompatibilityScore, Section};

/// `score(a, b, embeddings_score?)`. An absent embeddings model substitutes
/// the neutral default.
#[must_use]
pub fn score(a: &Section, b: &Section, embeddings_score: Option<f64>) -> CompatibilityScore {
    let tempo = tempo_subscore(a.tempo_bpm, b.tempo_bpm);
    let key = key_subscore(&a.key, &b.key);
    let energy = energy_subscore(a.energy, b.energy);
    let embeddings = embeddings_score.unwrap_or(CompatibilityScore::NEUTRAL_EMBEDDINGS);

    let overall = CompatibilityScore::TEMPO_WEIGHT * tempo
        + CompatibilityScore::KEY_WEIGHT * key
        + CompatibilityScore::ENERGY_WEIGHT * energy
        + CompatibilityScore::EMBEDDINGS_WEIGHT * embeddings;

    CompatibilityScore {
        overall: round_one_decimal(overall),
        tempo,
        key,
        energy,
        embeddings,
    }
}

/// `d` is the absolute BPM difference as a percentage of the mean BPM.
/// Piecewise-linear tolerance curve mirroring the human ear: small drift is
/// inaudible, 10% is already perceptible, beyond 20% the songs are in
/// different tempo classes.
fn tempo_subscore(bpm_a: f64, bpm_b: f64) -> f64 {
    let d = (bpm_a - bpm_b).abs() / ((bpm_a + bpm_b) / 2.0) * 100.0;
    if d <= 5.0 {
        100.0
    } else if d <= 10.0 {
        90.0 - 2.0 * (d - 5.0)
    } else if d <= 20.0 {
        80.0 - 3.0 * (d - 10.0)
    } else {
        (50.0 - 2.0 * (d - 20.0)).max(0.0)
    }
}

/// Deliberately coarse: identical full key -> 100, same root different mode
/// -> 80, anything else -> 60. A circle-of-fifths refinement was considered
/// and rejected; these numbers are the contract.
fn key_subscore(key_a: &str, key_b: &str) -> f64 {
    if key_a == key_b {
        return 100.0;
    }
    let root_a = key_root(key_a);
    let root_b = key_root(key_b);
    if !root_a.is_empty() && root_a == root_b {
        80.0
    } else {
        60.0
    }
}

/// Extracts the pitch-class prefix of a key string like `"C"`, `"C#"`,
/// `"C major"`, or `"C#m"`, stopping before any mode suffix.
fn key_root(key: &str) -> String {
    let mut root = String::new();
    for ch in key.chars() {
        if ch.is_ascii_alphabetic() && !root.is_empty() {
            break;
        }
        if ch == '#' || ch.is_ascii_alphabetic() {
            root.push(ch);
        } else {
            break;
        }
    }
    root
}

fn energy_subscore(energy_a: f64, energy_b: f64) -> f64 {
    let e = (energy_a - energy_b).abs();
    if e <= 5.0 {
        100.0
    } else if e <= 10.0 {
        90.0 - (e - 5.0)
    } else if e <= 20.0 {
        85.0 - 1.5 * (e - 10.0)
    } else {
        (70.0 - (e - 20.0)).max(50.0)
    }
}

fn round_one_decimal(v: f64) -> f64 {
    (v * 10.0).round() / 10.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use setlist_types::SongId;

    fn section(bpm: f64, key: &str, energy: f64) -> Section {
        Section {
            song_id: SongId::new("a".repeat(32)),
            index: 0,
            label: "chorus".to_owned(),
            start_seconds: 0.0,
            end_seconds: 30.0,
            tempo_bpm: bpm,
            key: key.to_owned(),
            energy,
            loudness_db: -12.0,
            spectral_centroid_hz: 1800.0,
        }
    }

    #[test]
    fn seed_scenario_s1() {
        let a = section(120.0, "C major", 60.0);
        let b = section(120.0, "C major", 65.0);
        let result = score(&a, &b, None);
        assert_eq!(result.tempo, 100.0);
        assert_eq!(result.key, 100.0);
        assert_eq!(result.energy, 95.0);
        assert_eq!(result.embeddings, 75.0);
        assert_eq!(result.overall, 90.5);
    }

    #[test]
    fn overall_matches_weighted_sum() {
        let a = section(100.0, "A minor", 40.0);
        let b = section(130.0, "E minor", 70.0);
        let result = score(&a, &b, Some(60.0));
        let expected = 0.25 * result.tempo + 0.25 * result.key + 0.15 * result.energy + 0.35 * result.embeddings;
        assert!((result.overall - round_one_decimal(expected)).abs() < 1e-9);
        for component in [result.tempo, result.key, result.energy, result.embeddings] {
            assert!((0.0..=100.0).contains(&component));
        }
    }

    #[test]
    fn tempo_subscore_is_monotonic_in_gap_size() {
        let a = section(120.0, "C major", 50.0);
        let near = tempo_subscore(a.tempo_bpm, 121.0);
        let mid = tempo_subscore(a.tempo_bpm, 132.0);
        let far = tempo_subscore(a.tempo_bpm, 160.0);
        assert!(near >= mid);
        assert!(mid >= far);
    }

    #[test]
    fn key_subscore_same_root_different_mode() {
        assert_eq!(key_subscore("C major", "C minor"), 80.0);
        assert_eq!(key_subscore("C major", "C major"), 100.0);
        assert_eq!(key_subscore("C major", "G major"), 60.0);
    }
}
