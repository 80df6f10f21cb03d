//! Transition synthesis engine and playlist assembler.

pub mod errors;
pub mod junction;
pub mod output;
pub mod playlist;
pub mod synth;

pub use errors::EngineError;
pub use synth::synthesize;
