//! `setlist job submit|get|list`: runs the scheduler in-process against a
//! durable store on disk. There is no daemon/client split here — unlike
//! the teacher, which talks to an already-running daemon over `tarpc`,
//! this CLI opens the store, drives the job to a terminal state itself,
//! and exits. The Job API (spec §6) is explicitly transport-agnostic, and
//! this workspace carries no RPC crate, so "one process per invocation"
//! is the faithful rendition rather than a shortcut.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use clap::{Args, Subcommand, ValueEnum};
use setlist_core::adapters::LocalFsObjectStore;
use setlist_core::config::Settings;
use setlist_scheduler::{create_shutdown, JobContext, JobQueue, Scheduler, SchedulerConfig};
use setlist_storage::cache::ResultCache;
use setlist_storage::db::job_store::{self, JobFilter};
use setlist_types::{AnalyzeRequest, Job, JobId, JobRequest, JobStatus, JobType, LrcRequest};

use crate::drivers::{PlaceholderAlignerDriver, PlaceholderAnalyzerDriver};
use crate::errors::CliError;

/// How often to poll the store for the submitted job's terminal state.
const POLL_INTERVAL: Duration = Duration::from_millis(200);

#[derive(Debug, Subcommand)]
pub enum JobCommand {
    /// Submit a new job and wait for it to reach a terminal state.
    Submit {
        #[command(subcommand)]
        request: SubmitRequest,
    },
    /// Fetch a single job by id.
    Get { job_id: String },
    /// List jobs, newest first.
    List(ListArgs),
}

#[derive(Debug, Subcommand)]
pub enum SubmitRequest {
    /// Analyze a source audio file: tempo, key, sections, embeddings shape.
    Analyze {
        source_url: String,
        #[arg(long)]
        separate_stems: bool,
    },
    /// Align `lyrics_file`'s contents to `source_url`'s audio, producing an
    /// uploaded `.lrc`.
    Lrc {
        source_url: String,
        lyrics_file: std::path::PathBuf,
        #[arg(long)]
        youtube_url: Option<String>,
    },
}

#[derive(Debug, Args)]
pub struct ListArgs {
    #[arg(long, value_enum)]
    status: Option<JobStatusArg>,
    #[arg(long = "type", value_enum)]
    job_type: Option<JobTypeArg>,
    #[arg(long, default_value_t = 20)]
    limit: usize,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum JobStatusArg {
    Queued,
    Processing,
    Completed,
    Failed,
}

impl From<JobStatusArg> for JobStatus {
    fn from(value: JobStatusArg) -> Self {
        match value {
            JobStatusArg::Queued => JobStatus::Queued,
            JobStatusArg::Processing => JobStatus::Processing,
            JobStatusArg::Completed => JobStatus::Completed,
            JobStatusArg::Failed => JobStatus::Failed,
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum JobTypeArg {
    Analyze,
    Lrc,
}

impl From<JobTypeArg> for JobType {
    fn from(value: JobTypeArg) -> Self {
        match value {
            JobTypeArg::Analyze => JobType::Analyze,
            JobTypeArg::Lrc => JobType::Lrc,
        }
    }
}

fn build_context(settings: &Settings) -> Result<Arc<JobContext>, CliError> {
    let bucket_root = settings
        .object_store
        .endpoint
        .as_ref()
        .map_or_else(|| Path::new(".").to_path_buf(), std::path::PathBuf::from);
    Ok(Arc::new(JobContext {
        object_store: Arc::new(LocalFsObjectStore::new(bucket_root)),
        analyzer: Arc::new(PlaceholderAnalyzerDriver),
        aligner: Arc::new(PlaceholderAlignerDriver),
        cache: Arc::new(ResultCache::open(settings.cache.root.clone())?),
    }))
}

async fn submit_and_await(settings: &Settings, request: JobRequest) -> Result<Job, CliError> {
    let db = setlist_storage::db::init_database(&settings.scheduler.job_store_path).await?;
    let retention = Duration::from_secs(settings.scheduler.retention_days * 24 * 3600);
    let (queue, rx) = JobQueue::initialize(db, retention).await?;

    let context = build_context(settings)?;
    let config = SchedulerConfig::from(&settings.scheduler);
    let scheduler = Scheduler::new(Arc::clone(&queue), context, config);
    let (terminator, shutdown_rx) = create_shutdown();

    let run_handle = tokio::spawn(async move { scheduler.run(rx, shutdown_rx).await });

    let job = queue.submit(request).await?;
    loop {
        let current = queue.get(&job.id).await?.ok_or_else(|| CliError::JobNotFound(job.id.0.clone()))?;
        if current.is_terminal() {
            let _ = terminator.shutdown();
            let _ = run_handle.await;
            return Ok(current);
        }
        tokio::time::sleep(POLL_INTERVAL).await;
    }
}

async fn get(settings: &Settings, job_id: &str) -> Result<Job, CliError> {
    let db = setlist_storage::db::init_database(&settings.scheduler.job_store_path).await?;
    job_store::get(&db, &JobId(job_id.to_owned()))
        .await?
        .ok_or_else(|| CliError::JobNotFound(job_id.to_owned()))
}

async fn list(settings: &Settings, args: &ListArgs) -> Result<Vec<Job>, CliError> {
    let db = setlist_storage::db::init_database(&settings.scheduler.job_store_path).await?;
    let filter = JobFilter {
        status: args.status.map(Into::into),
        job_type: args.job_type.map(Into::into),
    };
    Ok(job_store::list(&db, &filter, args.limit).await?)
}

pub async fn run(settings: &Settings, command: &JobCommand) -> Result<serde_json::Value, CliError> {
    match command {
        JobCommand::Submit { request } => {
            let request = match request {
                SubmitRequest::Analyze { source_url, separate_stems } => JobRequest::Analyze(AnalyzeRequest {
                    source_url: source_url.clone(),
                    separate_stems: *separate_stems,
                }),
                SubmitRequest::Lrc {
                    source_url,
                    lyrics_file,
                    youtube_url,
                } => {
                    let lyrics_text = std::fs::read_to_string(lyrics_file)?;
                    JobRequest::Lrc(LrcRequest {
                        source_url: source_url.clone(),
                        lyrics_text,
                        youtube_url: youtube_url.clone(),
                    })
                }
            };
            let job = submit_and_await(settings, request).await?;
            Ok(serde_json::to_value(job)?)
        }
        JobCommand::Get { job_id } => Ok(serde_json::to_value(get(settings, job_id).await?)?),
        JobCommand::List(args) => Ok(serde_json::to_value(list(settings, args).await?)?),
    }
}
