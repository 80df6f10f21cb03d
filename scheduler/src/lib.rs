//! Async job scheduler: submission, durable recovery, bounded concurrency,
//! and the Analyze/Lrc job bodies (§4.7-§4.8). Owns everything between a
//! client's job request and a terminal, durably-recorded result; core
//! logic (scoring, synthesis, playlist assembly) has no knowledge this
//! crate exists.

pub mod errors;
pub mod jobs;
pub mod queue;
pub mod scheduler;
pub mod termination;

use std::sync::Arc;

use setlist_core::adapters::{AlignerDriver, AnalyzerDriver, ObjectStoreAdapter};
use setlist_storage::cache::ResultCache;

pub use errors::SchedulerError;
pub use queue::JobQueue;
pub use scheduler::Scheduler;
pub use termination::{create_shutdown, ShutdownReceiver, Terminator};

/// The external-boundary dependencies every job body needs. Assembled once
/// at startup from the process's chosen adapters and handed to the
/// scheduler as a single unit.
pub struct JobContext {
    pub object_store: Arc<dyn ObjectStoreAdapter>,
    pub analyzer: Arc<dyn AnalyzerDriver>,
    pub aligner: Arc<dyn AlignerDriver>,
    pub cache: Arc<ResultCache>,
}

/// Scheduler tuning knobs, taken from [`setlist_core::config::SchedulerSettings`]
/// at the call site rather than re-deriving `Deserialize` here: this crate
/// has no business knowing how settings are loaded.
#[derive(Debug, Clone, Copy)]
pub struct SchedulerConfig {
    pub max_concurrent_lrc: usize,
    pub analyze_timeout_seconds: u64,
    pub lrc_timeout_seconds: u64,
}

impl From<&setlist_core::config::SchedulerSettings> for SchedulerConfig {
    fn from(settings: &setlist_core::config::SchedulerSettings) -> Self {
        Self {
            max_concurrent_lrc: settings.max_concurrent_lrc,
            analyze_timeout_seconds: settings.analyze_timeout_seconds,
            lrc_timeout_seconds: settings.lrc_timeout_seconds,
        }
    }
}
