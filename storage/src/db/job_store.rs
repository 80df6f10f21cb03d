//! CRUD operations for the `job` table: the durable half of the scheduler's
//! job model. Rows are stored as a flat, serde-friendly shape (`JobRow`)
//! rather than `Job` directly, since `Job`'s `SystemTime` fields don't map
//! cleanly onto SurrealDB's own `datetime` type — timestamps round-trip as
//! fractional Unix seconds instead.

use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};
use serde_json::Value;
use surrealdb::{Connection, Surreal};
use setlist_types::{Job, JobId, JobRequest, JobResult, JobStatus, JobType, Stage};

use crate::errors::{StorageError, StorageResult};

const TABLE_NAME: &str = "job";

#[derive(Debug, Clone, Serialize, Deserialize)]
struct JobRow {
    job_type: String,
    status: String,
    progress: f64,
    stage: String,
    error_message: Option<String>,
    request: Value,
    result: Option<Value>,
    created_at: f64,
    updated_at: f64,
    content_hash: Option<String>,
}

fn job_type_str(t: JobType) -> &'static str {
    match t {
        JobType::Analyze => "analyze",
        JobType::Lrc => "lrc",
    }
}

fn job_type_from_str(s: &str) -> StorageResult<JobType> {
    match s {
        "analyze" => Ok(JobType::Analyze),
        "lrc" => Ok(JobType::Lrc),
        other => Err(StorageError::Serde(serde::de::Error::custom(format!("unknown job_type {other}")))),
    }
}

fn status_str(s: JobStatus) -> &'static str {
    match s {
        JobStatus::Queued => "queued",
        JobStatus::Processing => "processing",
        JobStatus::Completed => "completed",
        JobStatus::Failed => "failed",
    }
}

fn status_from_str(s: &str) -> StorageResult<JobStatus> {
    match s {
        "queued" => Ok(JobStatus::Queued),
        "processing" => Ok(JobStatus::Processing),
        "completed" => Ok(JobStatus::Completed),
        "failed" => Ok(JobStatus::Failed),
        other => Err(StorageError::Serde(serde::de::Error::custom(format!("unknown status {other}")))),
    }
}

fn stage_str(s: Stage) -> &'static str {
    match s {
        Stage::Downloading => "downloading",
        Stage::Analyzing => "analyzing",
        Stage::Separating => "separating",
        Stage::Transcribing => "transcribing",
        Stage::Aligning => "aligning",
        Stage::Uploading => "uploading",
        Stage::Complete => "complete",
        Stage::Cached => "cached",
        Stage::Error => "error",
        Stage::Requeued => "requeued",
    }
}

fn stage_from_str(s: &str) -> StorageResult<Stage> {
    match s {
        "downloading" => Ok(Stage::Downloading),
        "analyzing" => Ok(Stage::Analyzing),
        "separating" => Ok(Stage::Separating),
        "transcribing" => Ok(Stage::Transcribing),
        "aligning" => Ok(Stage::Aligning),
        "uploading" => Ok(Stage::Uploading),
        "complete" => Ok(Stage::Complete),
        "cached" => Ok(Stage::Cached),
        "error" => Ok(Stage::Error),
        "requeued" => Ok(Stage::Requeued),
        other => Err(StorageError::Serde(serde::de::Error::custom(format!("unknown stage {other}")))),
    }
}

fn secs_since_epoch(t: SystemTime) -> f64 {
    t.duration_since(UNIX_EPOCH).unwrap_or_default().as_secs_f64()
}

fn system_time_from_secs(secs: f64) -> SystemTime {
    UNIX_EPOCH + std::time::Duration::from_secs_f64(secs.max(0.0))
}

fn to_row(job: &Job) -> StorageResult<JobRow> {
    Ok(JobRow {
        job_type: job_type_str(job.job_type).to_owned(),
        status: status_str(job.status).to_owned(),
        progress: job.progress,
        stage: stage_str(job.stage).to_owned(),
        error_message: job.error_message.clone(),
        request: serde_json::to_value(&job.request)?,
        result: job.result.as_ref().map(serde_json::to_value).transpose()?,
        created_at: secs_since_epoch(job.created_at),
        updated_at: secs_since_epoch(job.updated_at),
        content_hash: job.content_hash.clone(),
    })
}

fn from_row(id: JobId, row: JobRow) -> StorageResult<Job> {
    Ok(Job {
        id,
        job_type: job_type_from_str(&row.job_type)?,
        status: status_from_str(&row.status)?,
        progress: row.progress,
        stage: stage_from_str(&row.stage)?,
        error_message: row.error_message,
        request: serde_json::from_value::<JobRequest>(row.request)?,
        result: row.result.map(serde_json::from_value::<JobResult>).transpose()?,
        created_at: system_time_from_secs(row.created_at),
        updated_at: system_time_from_secs(row.updated_at),
        content_hash: row.content_hash,
    })
}

/// A partial update applied to an existing job row. Always bumps
/// `updated_at`, even when every field below is `None`.
#[derive(Debug, Clone, Default)]
pub struct JobPatch {
    pub status: Option<JobStatus>,
    pub progress: Option<f64>,
    pub stage: Option<Stage>,
    pub error_message: Option<Option<String>>,
    pub result: Option<JobResult>,
    pub content_hash: Option<Option<String>>,
}

/// `{status?, type?}` filter for [`list`].
#[derive(Debug, Clone, Default)]
pub struct JobFilter {
    pub status: Option<JobStatus>,
    pub job_type: Option<JobType>,
}

/// Inserts a new job row. Atomic: either the full row lands or nothing
/// does.
///
/// # Errors
/// Returns [`StorageError::NotCreated`] if the table refused the insert
/// (e.g. the id already exists), or a DB/serde error.
pub async fn insert<C: Connection>(db: &Surreal<C>, job: &Job) -> StorageResult<()> {
    let row = to_row(job)?;
    let created: Option<JobRow> = db.create((TABLE_NAME, job.id.0.clone())).content(row).await?;
    if created.is_none() {
        return Err(StorageError::NotCreated);
    }
    Ok(())
}

/// Applies `patch` to the job with id `id`, always bumping `updated_at`.
///
/// # Errors
/// Returns [`StorageError::NotFound`] if no row has this id.
pub async fn update<C: Connection>(db: &Surreal<C>, id: &JobId, patch: JobPatch) -> StorageResult<Job> {
    let Some(existing) = get(db, id).await? else {
        return Err(StorageError::NotFound(id.0.clone()));
    };

    let mut job = existing;
    if let Some(status) = patch.status {
        job.status = status;
    }
    if let Some(progress) = patch.progress {
        job.progress = progress;
    }
    if let Some(stage) = patch.stage {
        job.stage = stage;
    }
    if let Some(error_message) = patch.error_message {
        job.error_message = error_message;
    }
    if let Some(result) = patch.result {
        job.result = Some(result);
    }
    if let Some(content_hash) = patch.content_hash {
        job.content_hash = content_hash;
    }
    job.updated_at = SystemTime::now();

    let row = to_row(&job)?;
    let updated: Option<JobRow> = db.update((TABLE_NAME, id.0.clone())).content(row).await?;
    updated.ok_or_else(|| StorageError::NotFound(id.0.clone()))?;
    Ok(job)
}

/// # Errors
/// Returns a DB/serde error; a missing row is `Ok(None)`, not an error.
pub async fn get<C: Connection>(db: &Surreal<C>, id: &JobId) -> StorageResult<Option<Job>> {
    let row: Option<JobRow> = db.select((TABLE_NAME, id.0.clone())).await?;
    row.map(|r| from_row(id.clone(), r)).transpose()
}

/// Newest-first, optionally filtered by status and/or type.
///
/// # Errors
/// Returns a DB/serde error.
pub async fn list<C: Connection>(db: &Surreal<C>, filter: &JobFilter, limit: usize) -> StorageResult<Vec<Job>> {
    let mut clauses = Vec::new();
    if let Some(status) = filter.status {
        clauses.push(format!("status = '{}'", status_str(status)));
    }
    if let Some(job_type) = filter.job_type {
        clauses.push(format!("job_type = '{}'", job_type_str(job_type)));
    }
    let where_clause = if clauses.is_empty() {
        String::new()
    } else {
        format!("WHERE {}", clauses.join(" AND "))
    };
    let surql = format!("SELECT * FROM {TABLE_NAME} {where_clause} ORDER BY created_at DESC LIMIT $limit");

    let rows: Vec<RowWithId> = db.query(surql).bind(("limit", limit as i64)).await?.take(0)?;
    decode_rows(rows)
}

/// Rows in `Queued` or `Processing`. Called once at scheduler startup
/// before accepting new submissions.
///
/// # Errors
/// Returns a DB/serde error.
pub async fn interrupted<C: Connection>(db: &Surreal<C>) -> StorageResult<Vec<Job>> {
    let surql = format!("SELECT * FROM {TABLE_NAME} WHERE status = 'queued' OR status = 'processing'");
    let rows: Vec<RowWithId> = db.query(surql).await?.take(0)?;
    decode_rows(rows)
}

/// Deletes rows in `Completed` or `Failed` created before `older_than`.
/// Returns the number of rows removed.
///
/// # Errors
/// Returns a DB/serde error.
pub async fn reap<C: Connection>(db: &Surreal<C>, older_than: SystemTime) -> StorageResult<usize> {
    let cutoff = secs_since_epoch(older_than);
    let surql = format!("SELECT * FROM {TABLE_NAME} WHERE (status = 'completed' OR status = 'failed') AND created_at < $cutoff");
    let rows: Vec<RowWithId> = db.query(surql).bind(("cutoff", cutoff)).await?.take(0)?;
    let doomed = decode_rows(rows)?;
    for job in &doomed {
        let _: Option<JobRow> = db.delete((TABLE_NAME, job.id.0.clone())).await?;
    }
    Ok(doomed.len())
}

fn decode_rows(rows: Vec<RowWithId>) -> StorageResult<Vec<Job>> {
    rows.into_iter().map(|row| from_row(JobId(row.id.id.to_string()), row.row)).collect()
}

/// Intermediate shape used only to recover the job id out of a raw
/// `SELECT *` row, since [`JobRow`] itself has no `id` field.
#[derive(Debug, Deserialize)]
struct RowWithId {
    id: surrealdb::sql::Thing,
    #[serde(flatten)]
    row: JobRow,
}

#[cfg(test)]
mod tests {
    use super::*;
    use setlist_types::{AnalyzeRequest, JobRequest};
    use std::time::Duration;

    fn sample_job(id: &str) -> Job {
        Job {
            id: JobId(id.to_owned()),
            job_type: JobType::Analyze,
            status: JobStatus::Queued,
            progress: 0.0,
            stage: Stage::Requeued,
            error_message: None,
            request: JobRequest::Analyze(AnalyzeRequest {
                source_url: "file://bucket/a.mp3".to_owned(),
                separate_stems: true,
            }),
            result: None,
            created_at: SystemTime::now(),
            updated_at: SystemTime::now(),
            content_hash: None,
        }
    }

    #[tokio::test]
    async fn insert_then_get_round_trips() {
        let db = crate::db::init_test_database().await.unwrap();
        let job = sample_job("job_1");
        insert(&db, &job).await.unwrap();

        let fetched = get(&db, &job.id).await.unwrap().unwrap();
        assert_eq!(fetched.id, job.id);
        assert_eq!(fetched.status, JobStatus::Queued);
    }

    #[tokio::test]
    async fn update_bumps_timestamp_and_applies_patch() {
        let db = crate::db::init_test_database().await.unwrap();
        let job = sample_job("job_2");
        insert(&db, &job).await.unwrap();

        let patch = JobPatch {
            status: Some(JobStatus::Processing),
            stage: Some(Stage::Analyzing),
            progress: Some(0.5),
            ..Default::default()
        };
        let updated = update(&db, &job.id, patch).await.unwrap();
        assert_eq!(updated.status, JobStatus::Processing);
        assert_eq!(updated.stage, Stage::Analyzing);
        assert!(updated.updated_at >= job.updated_at);
    }

    #[tokio::test]
    async fn interrupted_returns_only_queued_and_processing() {
        let db = crate::db::init_test_database().await.unwrap();
        let mut queued = sample_job("job_queued");
        queued.status = JobStatus::Queued;
        let mut done = sample_job("job_done");
        done.status = JobStatus::Completed;
        insert(&db, &queued).await.unwrap();
        insert(&db, &done).await.unwrap();

        let rows = interrupted(&db).await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].id, queued.id);
    }

    #[tokio::test]
    async fn reap_deletes_old_terminal_jobs_only() {
        let db = crate::db::init_test_database().await.unwrap();
        let mut old_done = sample_job("job_old");
        old_done.status = JobStatus::Completed;
        old_done.created_at = SystemTime::now() - Duration::from_secs(8 * 24 * 3600);
        let mut fresh = sample_job("job_fresh");
        fresh.status = JobStatus::Completed;

        insert(&db, &old_done).await.unwrap();
        insert(&db, &fresh).await.unwrap();

        let cutoff = SystemTime::now() - Duration::from_secs(7 * 24 * 3600);
        let removed = reap(&db, cutoff).await.unwrap();
        assert_eq!(removed, 1);
        assert!(get(&db, &old_done.id).await.unwrap().is_none());
        assert!(get(&db, &fresh.id).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn list_orders_newest_first_and_respects_filter() {
        let db = crate::db::init_test_database().await.unwrap();
        let mut a = sample_job("job_a");
        a.created_at = SystemTime::now() - Duration::from_secs(10);
        let mut b = sample_job("job_b");
        b.created_at = SystemTime::now();
        b.job_type = JobType::Lrc;
        insert(&db, &a).await.unwrap();
        insert(&db, &b).await.unwrap();

        let all = list(&db, &JobFilter::default(), 10).await.unwrap();
        assert_eq!(all.len(), 2);
        assert_eq!(all[0].id, b.id);

        let only_analyze = list(
            &db,
            &JobFilter {
                job_type: Some(JobType::Analyze),
                ..Default::default()
            },
            10,
        )
        .await
        .unwrap();
        assert_eq!(only_analyze.len(), 1);
        assert_eq!(only_analyze[0].id, a.id);
    }
}
