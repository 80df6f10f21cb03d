//! The dispatch loop: pulls queued job ids, enforces the Analyze
//! serialization lock and the Lrc concurrency semaphore, wraps each job
//! body in a hard timeout, and persists the terminal state. Grounded on
//! `process_jobs`/`_process_job_with_semaphore` in the original
//! `JobQueue` class.

use std::sync::Arc;
use std::time::Duration;

use setlist_storage::db::job_store::JobPatch;
use setlist_types::{JobId, JobRequest, JobStatus, Stage};
use tokio::sync::{mpsc, Mutex, Semaphore};

use crate::queue::JobQueue;
use crate::termination::ShutdownReceiver;
use crate::{jobs, JobContext, SchedulerConfig};

#[derive(Clone)]
pub struct Scheduler {
    queue: Arc<JobQueue>,
    context: Arc<JobContext>,
    analysis_lock: Arc<Mutex<()>>,
    lrc_semaphore: Arc<Semaphore>,
    config: Arc<SchedulerConfig>,
}

impl Scheduler {
    #[must_use]
    pub fn new(queue: Arc<JobQueue>, context: Arc<JobContext>, config: SchedulerConfig) -> Self {
        let lrc_semaphore = Arc::new(Semaphore::new(config.max_concurrent_lrc.max(1)));
        Self {
            queue,
            context,
            analysis_lock: Arc::new(Mutex::new(())),
            lrc_semaphore,
            config: Arc::new(config),
        }
    }

    /// Drains `rx` for newly submitted job ids, spawning one task per job,
    /// until `shutdown` fires. In-flight jobs are left to finish; only
    /// intake of new work stops.
    pub async fn run(&self, mut rx: mpsc::UnboundedReceiver<JobId>, mut shutdown: ShutdownReceiver) {
        loop {
            tokio::select! {
                maybe_id = rx.recv() => {
                    match maybe_id {
                        Some(id) => {
                            let scheduler = self.clone();
                            tokio::spawn(async move { scheduler.process_job(id).await });
                        }
                        None => break,
                    }
                }
                () = shutdown.recv() => {
                    log::info!("scheduler shutdown signaled, no longer accepting new jobs");
                    break;
                }
            }
        }
    }

    async fn process_job(&self, id: JobId) {
        let job = match self.queue.get(&id).await {
            Ok(Some(job)) => job,
            Ok(None) => {
                log::error!("job {id} vanished before dispatch");
                return;
            }
            Err(e) => {
                log::error!("failed to load job {id} for dispatch: {e}");
                return;
            }
        };

        let mark_processing = |id: &JobId| {
            let queue = Arc::clone(&self.queue);
            let id = id.clone();
            async move {
                if let Err(e) = queue
                    .apply_patch(
                        &id,
                        JobPatch {
                            status: Some(JobStatus::Processing),
                            ..Default::default()
                        },
                    )
                    .await
                {
                    log::error!("failed to mark job {id} processing: {e}");
                }
            }
        };

        let (timeout, outcome) = match &job.request {
            JobRequest::Analyze(request) => {
                let _permit = self.analysis_lock.lock().await;
                mark_processing(&id).await;
                let timeout = Duration::from_secs(self.config.analyze_timeout_seconds);
                let result = tokio::time::timeout(timeout, jobs::analyze::run(&self.queue, &self.context, &id, request)).await;
                (timeout, result)
            }
            JobRequest::Lrc(request) => {
                let _permit = self.lrc_semaphore.acquire().await.expect("semaphore never closed");
                mark_processing(&id).await;
                let timeout = Duration::from_secs(self.config.lrc_timeout_seconds);
                let result = tokio::time::timeout(timeout, jobs::lrc::run(&self.queue, &self.context, &id, request)).await;
                (timeout, result)
            }
        };

        let patch = match outcome {
            Ok(Ok((result, stage))) => JobPatch {
                status: Some(JobStatus::Completed),
                stage: Some(stage),
                progress: Some(1.0),
                result: Some(result),
                ..Default::default()
            },
            Ok(Err(e)) => {
                log::warn!("job {id} failed: {e}");
                JobPatch {
                    status: Some(JobStatus::Failed),
                    stage: Some(Stage::Error),
                    error_message: Some(Some(e.to_string())),
                    ..Default::default()
                }
            }
            Err(_elapsed) => {
                let message = format!("job exceeded {}s timeout", timeout.as_secs());
                log::warn!("job {id} timed out: {message}");
                JobPatch {
                    status: Some(JobStatus::Failed),
                    stage: Some(Stage::Error),
                    error_message: Some(Some(message)),
                    ..Default::default()
                }
            }
        };

        if let Err(e) = self.queue.apply_patch(&id, patch).await {
            log::error!("failed to persist final state for job {id}: {e}");
        }

        self.queue.schedule_eviction(id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use setlist_core::adapters::{AlignedPhrase, AlignmentOptions, AlignmentOutput, AlignerDriver, AnalyzerDriver, LocalFsObjectStore};
    use setlist_core::errors::DriverError;
    use setlist_storage::cache::ResultCache;
    use setlist_types::{AnalysisRecord, AnalyzeRequest, JobRequest, LrcRequest};
    use std::path::Path;
    use std::time::Duration as StdDuration;
    use tempfile::tempdir;

    struct StubAnalyzer;
    impl AnalyzerDriver for StubAnalyzer {
        fn analyze(&self, _path: &Path) -> Result<AnalysisRecord, DriverError> {
            Ok(AnalysisRecord {
                duration_seconds: 10.0,
                tempo_bpm: 120.0,
                musical_key: "C".to_owned(),
                musical_mode: "major".to_owned(),
                key_confidence: 0.9,
                loudness_db: -12.0,
                beats: vec![0.0, 0.5],
                downbeats: vec![0.0],
                sections: vec![],
                embeddings_shape: vec![1],
            })
        }
    }

    struct StubAligner;
    impl AlignerDriver for StubAligner {
        fn align(&self, audio_path: &Path, _lyrics_text: &str, _options: &AlignmentOptions) -> Result<AlignmentOutput, DriverError> {
            let lrc_path = audio_path.with_extension("lrc");
            std::fs::write(&lrc_path, "[00:00.00]la la la\n").unwrap();
            Ok(AlignmentOutput {
                lrc_path,
                line_count: 1,
                phrases: vec![AlignedPhrase {
                    text: "la la la".to_owned(),
                    start: 0.0,
                    end: 1.0,
                }],
            })
        }
    }

    async fn test_harness() -> (Scheduler, mpsc::UnboundedReceiver<JobId>, tempfile::TempDir) {
        let bucket_dir = tempdir().unwrap();
        let store = LocalFsObjectStore::new(bucket_dir.path());
        std::fs::create_dir_all(bucket_dir.path().join("bucket")).unwrap();
        std::fs::write(bucket_dir.path().join("bucket/a.mp3"), b"fake audio bytes").unwrap();

        let cache_dir = tempdir().unwrap();
        let context = Arc::new(JobContext {
            object_store: Arc::new(store),
            analyzer: Arc::new(StubAnalyzer),
            aligner: Arc::new(StubAligner),
            cache: Arc::new(ResultCache::open(cache_dir.path()).unwrap()),
        });

        let db = setlist_storage::db::init_test_database().await.unwrap();
        let (queue, rx) = JobQueue::initialize(db, StdDuration::from_secs(7 * 24 * 3600)).await.unwrap();

        let scheduler = Scheduler::new(
            queue,
            context,
            SchedulerConfig {
                max_concurrent_lrc: 2,
                analyze_timeout_seconds: 5,
                lrc_timeout_seconds: 5,
            },
        );
        (scheduler, rx, bucket_dir)
    }

    #[tokio::test]
    async fn analyze_job_runs_to_completion() {
        let (scheduler, mut rx, _bucket) = test_harness().await;
        let job = scheduler
            .queue
            .submit(JobRequest::Analyze(AnalyzeRequest {
                source_url: "file://bucket/a.mp3".to_owned(),
                separate_stems: false,
            }))
            .await
            .unwrap();
        let queued_id = rx.recv().await.unwrap();
        scheduler.process_job(queued_id).await;

        let finished = scheduler.queue.get(&job.id).await.unwrap().unwrap();
        assert_eq!(finished.status, JobStatus::Completed);
        assert_eq!(finished.stage, Stage::Complete);
        assert!(finished.content_hash.is_some());
    }

    #[tokio::test]
    async fn repeated_analyze_job_hits_cache() {
        let (scheduler, mut rx, _bucket) = test_harness().await;
        for _ in 0..2 {
            scheduler
                .queue
                .submit(JobRequest::Analyze(AnalyzeRequest {
                    source_url: "file://bucket/a.mp3".to_owned(),
                    separate_stems: false,
                }))
                .await
                .unwrap();
        }
        let first = rx.recv().await.unwrap();
        scheduler.process_job(first).await;
        let second = rx.recv().await.unwrap();
        scheduler.process_job(second).await;

        let finished = scheduler.queue.get(&second).await.unwrap().unwrap();
        assert_eq!(finished.stage, Stage::Cached);
    }

    #[tokio::test]
    async fn lrc_job_runs_to_completion() {
        let (scheduler, mut rx, _bucket) = test_harness().await;
        let job = scheduler
            .queue
            .submit(JobRequest::Lrc(LrcRequest {
                source_url: "file://bucket/a.mp3".to_owned(),
                lyrics_text: "la la la".to_owned(),
                youtube_url: None,
            }))
            .await
            .unwrap();
        let queued_id = rx.recv().await.unwrap();
        scheduler.process_job(queued_id).await;

        let finished = scheduler.queue.get(&job.id).await.unwrap().unwrap();
        assert_eq!(finished.status, JobStatus::Completed);
        assert!(matches!(finished.result, Some(setlist_types::JobResult::Lrc { .. })));
    }
}
