//! Shared data model for the setlist assembler.
//!
//! This crate owns the types that cross every other crate boundary: the
//! song/section schema, transition parameters and results, and the job
//! model used by the scheduler and its durable store. Nothing in here
//! touches audio samples, the filesystem, or a database; those live in
//! `setlist-core`, `setlist-stems`, `setlist-engine`, and `setlist-storage`.

pub mod job;
pub mod scoring;
pub mod section;
pub mod song;
pub mod transition;

pub use job::{AnalysisRecord, AnalyzeRequest, Job, JobId, JobRequest, JobResult, JobStatus, JobType, LrcRequest, Stage};
pub use scoring::CompatibilityScore;
pub use section::Section;
pub use song::{Key, Mode, Song, SongId};
pub use transition::{BeatAdjustments, Stem, TransitionMetadata, TransitionParameters, TransitionResult};
