//! Lrc job body: download, hash, composite-key cache check, align, upload,
//! and dual cache write (the LRC itself plus the raw transcript so a later
//! request with different lyrics over the same audio can skip Whisper).
//! Grounded on `_process_lrc_job` and `_compute_lrc_cache_key` in the
//! original `JobQueue` class.

use std::sync::Arc;

use setlist_core::adapters::{AlignedPhrase, AlignmentOptions};
use setlist_storage::cache::{hash_prefix, lrc_composite_key, CachedPhrase};
use setlist_storage::db::job_store::JobPatch;
use setlist_types::{JobId, JobResult, LrcRequest, Stage};

use crate::errors::SchedulerError;
use crate::queue::JobQueue;
use crate::JobContext;

fn to_cached_phrases(phrases: &[AlignedPhrase]) -> Vec<CachedPhrase> {
    phrases
        .iter()
        .map(|p| CachedPhrase {
            text: p.text.clone(),
            start: p.start,
            end: p.end,
        })
        .collect()
}

/// Runs one Lrc job to completion (or failure); see [`crate::jobs::analyze::run`]
/// for the terminal-stage convention.
pub async fn run(
    queue: &Arc<JobQueue>,
    context: &Arc<JobContext>,
    id: &JobId,
    request: &LrcRequest,
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
    let audio_hash = hash_prefix(&bytes);
    let composite_key = lrc_composite_key(&audio_hash, &request.lyrics_text);

    queue
        .apply_patch(
            id,
            JobPatch {
                content_hash: Some(Some(composite_key.clone())),
                progress: Some(0.15),
                ..Default::default()
            },
        )
        .await?;

    let cache = Arc::clone(&context.cache);
    let cache_lookup = Arc::clone(&cache);
    let lookup_key = composite_key.clone();
    let cached = tokio::task::spawn_blocking(move || cache_lookup.get_lrc(&lookup_key))
        .await
        .expect("cache lookup task panicked")?;

    if let Some(entry) = cached {
        return Ok((
            JobResult::Lrc {
                lrc_url: entry.lrc_url,
                line_count: entry.line_count,
            },
            Stage::Cached,
        ));
    }

    let cache_has_transcript = Arc::clone(&cache);
    let transcript_hash = audio_hash.clone();
    let existing_transcript = tokio::task::spawn_blocking(move || cache_has_transcript.get_whisper_transcription(&transcript_hash))
        .await
        .expect("whisper cache lookup task panicked")?
        .is_some();

    queue
        .apply_patch(
            id,
            JobPatch {
                stage: Some(Stage::Aligning),
                progress: Some(0.4),
                ..Default::default()
            },
        )
        .await?;

    let aligner = Arc::clone(&context.aligner);
    let align_path = local_path.clone();
    let lyrics_text = request.lyrics_text.clone();
    let options = AlignmentOptions {
        youtube_url: request.youtube_url.clone(),
    };
    let output = tokio::task::spawn_blocking(move || aligner.align(&align_path, &lyrics_text, &options))
        .await
        .expect("align task panicked")?;

    queue
        .apply_patch(
            id,
            JobPatch {
                stage: Some(Stage::Uploading),
                progress: Some(0.8),
                ..Default::default()
            },
        )
        .await?;

    let upload_store = Arc::clone(&context.object_store);
    let upload_path = output.lrc_path.clone();
    let upload_key = format!("lrc/{composite_key}.lrc");
    let lrc_url = tokio::task::spawn_blocking(move || upload_store.upload(&upload_path, &upload_key))
        .await
        .expect("upload task panicked")?;

    let line_count = output.line_count;
    let put_cache = Arc::clone(&cache);
    let put_key = composite_key.clone();
    let put_url = lrc_url.clone();
    tokio::task::spawn_blocking(move || put_cache.put_lrc(&put_key, &put_url, line_count))
        .await
        .expect("lrc cache write task panicked")?;

    if !existing_transcript {
        let phrases = to_cached_phrases(&output.phrases);
        let put_transcript_hash = audio_hash.clone();
        tokio::task::spawn_blocking(move || cache.put_whisper_transcription(&put_transcript_hash, &phrases))
            .await
            .expect("whisper cache write task panicked")?;
    }

    Ok((JobResult::Lrc { lrc_url, line_count }, Stage::Complete))
}
