//! Analyze job body: download, hash, cache check, analyze, cache write.
//! Grounded on `_process_analysis_job` in the original `JobQueue` class.

use std::sync::Arc;

use setlist_storage::cache::hash_prefix;
use setlist_storage::db::job_store::JobPatch;
use setlist_types::{AnalyzeRequest, JobId, JobResult, Stage};

use crate::errors::SchedulerError;
use crate::queue::JobQueue;
use crate::JobContext;

/// Runs one Analyze job to completion (or failure) and reports the stage
/// the caller should record alongside the result: `Cached` on a cache
/// hit, `Complete` on a freshly-produced one.
pub async fn run(
    queue: &Arc<JobQueue>,
    context: &Arc<JobContext>,
    id: &JobId,
    request: &AnalyzeRequest,
) -> Result<(JobResult, Stage), SchedulerError> {
    queue
        .apply_patch(
            id,
            JobPatch {
                stage: Some(Stage::Downloading),
                progress: Some(0.05),
                ..Default::default()
            },
        )
        .await?;

    let work_dir = tempfile::tempdir()?;
    let local_path = work_dir.path().join("input.audio");
    let object_store = Arc::clone(&context.object_store);
    let url = request.source_url.clone();
    let download_path = local_path.clone();
    tokio::task::spawn_blocking(move || object_store.download(&url, &download_path))
        .await
        .expect("download task panicked")?;

    let bytes = tokio::fs::read(&local_path).await?;
    let content_hash = hash_prefix(&bytes);

    queue
        .apply_patch(
            id,
            JobPatch {
                content_hash: Some(Some(content_hash.clone())),
                progress: Some(0.15),
                ..Default::default()
            },
        )
        .await?;

    let cache = Arc::clone(&context.cache);
    let cache_lookup = Arc::clone(&cache);
    let lookup_hash = content_hash.clone();
    let cached = tokio::task::spawn_blocking(move || cache_lookup.get_analysis(&lookup_hash))
        .await
        .expect("cache lookup task panicked")?;

    if let Some(record) = cached {
        return Ok((JobResult::Analyze(record), Stage::Cached));
    }

    queue
        .apply_patch(
            id,
            JobPatch {
                stage: Some(Stage::Analyzing),
                progress: Some(0.3),
                ..Default::default()
            },
        )
        .await?;

    let analyzer = Arc::clone(&context.analyzer);
    let analyze_path = local_path.clone();
    let record = tokio::task::spawn_blocking(move || analyzer.analyze(&analyze_path))
        .await
        .expect("analyze task panicked")?;

    if request.separate_stems {
        // The analyzer driver's contract (setlist_core::adapters::AnalyzerDriver)
        // yields an AnalysisRecord only, with no stem-separation output, so
        // this stage is reported for client observability without a real
        // stems directory to persist.
        queue
            .apply_patch(
                id,
                JobPatch {
                    stage: Some(Stage::Separating),
                    progress: Some(0.7),
                    ..Default::default()
                },
            )
            .await?;
    }

    let put_hash = content_hash.clone();
    let put_record = record.clone();
    tokio::task::spawn_blocking(move || cache.put_analysis(&put_hash, &put_record))
        .await
        .expect("cache write task panicked")?;

    Ok((JobResult::Analyze(record), Stage::Complete))
}
