//! The transient result of comparing two sections. The scoring function
//! itself lives in `setlist-core::scoring`; this crate only owns the shape
//! of its output so every downstream crate can depend on it without pulling
//! in the scoring logic.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CompatibilityScore {
    pub overall: f64,
    pub tempo: f64,
    pub key: f64,
    pub energy: f64,
    pub embeddings: f64,
}

impl CompatibilityScore {
    pub const TEMPO_WEIGHT: f64 = 0.25;
    pub const KEY_WEIGHT: f64 = 0.25;
    pub const ENERGY_WEIGHT: f64 = 0.15;
    pub const EMBEDDINGS_WEIGHT: f64 = 0.35;

    /// The default substitute for an absent embeddings model.
    pub const NEUTRAL_EMBEDDINGS: f64 = 75.0;
}
