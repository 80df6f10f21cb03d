//! The durable-backed in-memory job map and submission queue. Grounded on
//! the original `JobQueue` class (`workers/queue.py`): an `_jobs` map for
//! fast reads of live jobs, a queue of ids waiting for a worker, and a
//! persistent store that survives a crash. `asyncio.Queue`/`asyncio.Lock`/
//! `asyncio.Semaphore` become `tokio::sync::mpsc`/`Mutex`/`Semaphore`.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, SystemTime};

use setlist_storage::db::job_store::{self, JobFilter, JobPatch};
use setlist_types::{Job, JobId, JobRequest, JobStatus, JobType, Stage};
use surrealdb::engine::local::Db;
use surrealdb::Surreal;
use tokio::sync::{mpsc, Mutex};

use crate::errors::SchedulerError;

/// Grace period a finished job stays in the in-memory map after
/// completion, so an immediate poll doesn't have to round-trip the store.
const FINISHED_JOB_GRACE: Duration = Duration::from_secs(300);

fn new_job_id() -> JobId {
    use rand::Rng;
    let suffix: String = (0..12)
        .map(|_| {
            let n = rand::thread_rng().gen_range(0..16);
            std::char::from_digit(n, 16).unwrap()
        })
        .collect();
    JobId(format!("job_{suffix}"))
}

pub struct JobQueue {
    db: Surreal<Db>,
    jobs: Mutex<HashMap<String, Job>>,
    tx: mpsc::UnboundedSender<JobId>,
}

impl JobQueue {
    /// Opens the store, reaps expired terminal jobs, requeues anything
    /// left `Queued`/`Processing` from a prior crash, and returns the
    /// queue plus the receiver a process loop should drain. This is the
    /// recovery property from spec.md §4.8: any job ever accepted is
    /// either durably `Completed`/`Failed` or will be re-attempted.
    ///
    /// # Errors
    /// Returns an error if the store can't be reached.
    pub async fn initialize(db: Surreal<Db>, retention: Duration) -> Result<(Arc<Self>, mpsc::UnboundedReceiver<JobId>), SchedulerError> {
        let cutoff = SystemTime::now() - retention;
        let reaped = job_store::reap(&db, cutoff).await?;
        if reaped > 0 {
            log::info!("reaped {reaped} expired job rows");
        }

        let interrupted = job_store::interrupted(&db).await?;
        let (tx, rx) = mpsc::unbounded_channel();
        let mut jobs = HashMap::new();

        for mut job in interrupted {
            log::info!("recovering interrupted job {} (was {:?})", job.id, job.status);
            job_store::update(
                &db,
                &job.id,
                JobPatch {
                    status: Some(JobStatus::Queued),
                    progress: Some(0.0),
                    stage: Some(Stage::Requeued),
                    ..Default::default()
                },
            )
            .await?;
            job.status = JobStatus::Queued;
            job.progress = 0.0;
            job.stage = Stage::Requeued;
            let _ = tx.send(job.id.clone());
            jobs.insert(job.id.0.clone(), job);
        }

        Ok((
            Arc::new(Self {
                db,
                jobs: Mutex::new(jobs),
                tx,
            }),
            rx,
        ))
    }

    #[must_use]
    pub fn db(&self) -> &Surreal<Db> {
        &self.db
    }

    /// Validates the request cheaply, creates a job id, inserts it
    /// `Queued`, and enqueues it for processing.
    ///
    /// # Errors
    /// Returns [`SchedulerError::InvalidParameters`] for an empty
    /// `source_url`/`lyrics_text`, or a store error.
    pub async fn submit(&self, request: JobRequest) -> Result<Job, SchedulerError> {
        let job_type = match &request {
            JobRequest::Analyze(r) => {
                if r.source_url.trim().is_empty() {
                    return Err(SchedulerError::InvalidParameters("source_url is empty".to_owned()));
                }
                JobType::Analyze
            }
            JobRequest::Lrc(r) => {
                if r.source_url.trim().is_empty() || r.lyrics_text.trim().is_empty() {
                    return Err(SchedulerError::InvalidParameters("source_url/lyrics_text is empty".to_owned()));
                }
                JobType::Lrc
            }
        };

        let now = SystemTime::now();
        let job = Job {
            id: new_job_id(),
            job_type,
            status: JobStatus::Queued,
            progress: 0.0,
            stage: Stage::Downloading,
            error_message: None,
            request,
            result: None,
            created_at: now,
            updated_at: now,
            content_hash: None,
        };

        job_store::insert(&self.db, &job).await?;
        self.jobs.lock().await.insert(job.id.0.clone(), job.clone());
        let _ = self.tx.send(job.id.clone());
        Ok(job)
    }

    /// In-memory map first (live progress), store fallback (evicted or
    /// never-loaded jobs).
    ///
    /// # Errors
    /// Returns a store error.
    pub async fn get(&self, id: &JobId) -> Result<Option<Job>, SchedulerError> {
        if let Some(job) = self.jobs.lock().await.get(&id.0) {
            return Ok(Some(job.clone()));
        }
        Ok(job_store::get(&self.db, id).await?)
    }

    /// Always resolves from the store: the canonical newest-first source.
    ///
    /// # Errors
    /// Returns a store error.
    pub async fn list(&self, filter: &JobFilter, limit: usize) -> Result<Vec<Job>, SchedulerError> {
        Ok(job_store::list(&self.db, filter, limit).await?)
    }

    /// Applies `patch`, persists it, and refreshes the in-memory copy.
    ///
    /// # Errors
    /// Returns a store error.
    pub(crate) async fn apply_patch(&self, id: &JobId, patch: JobPatch) -> Result<Job, SchedulerError> {
        let job = job_store::update(&self.db, id, patch).await?;
        self.jobs.lock().await.insert(id.0.clone(), job.clone());
        Ok(job)
    }

    /// Schedules removal of a finished job from the in-memory map after
    /// the grace period; subsequent lookups fall through to the store.
    pub(crate) fn schedule_eviction(self: &Arc<Self>, id: JobId) {
        let queue = Arc::clone(self);
        tokio::spawn(async move {
            tokio::time::sleep(FINISHED_JOB_GRACE).await;
            queue.jobs.lock().await.remove(&id.0);
        });
    }
}
