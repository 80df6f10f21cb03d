//! Job model: typed jobs, their closed stage set, and the wire shape of an
//! analysis record. The durable store for these lives in
//! `setlist-storage::db`; this crate only owns the schema.

use std::time::SystemTime;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct JobId(pub String);

impl std::fmt::Display for JobId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobType {
    Analyze,
    Lrc,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Queued,
    Processing,
    Completed,
    Failed,
}

/// The closed set of stage tags a job can report. Exhaustiveness checking
/// here replaces the free-string stage dispatch the scheduler would
/// otherwise need.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Stage {
    Downloading,
    Analyzing,
    Separating,
    Transcribing,
    Aligning,
    Uploading,
    Complete,
    Cached,
    Error,
    Requeued,
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
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
        };
        f.write_str(s)
    }
}

/// Request payload for an Analyze job. Preserved verbatim so the job can be
/// re-executed after a crash.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalyzeRequest {
    pub source_url: String,
    pub separate_stems: bool,
}

/// Request payload for an Lrc (lyric alignment) job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LrcRequest {
    pub source_url: String,
    pub lyrics_text: String,
    pub youtube_url: Option<String>,
}

/// The canonical analysis record shape (see external interfaces): what the
/// analyzer driver produces and the cache round-trips byte-for-byte on all
/// numeric fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct AnalysisRecord {
    pub duration_seconds: f64,
    pub tempo_bpm: f64,
    pub musical_key: String,
    pub musical_mode: String,
    pub key_confidence: f64,
    pub loudness_db: f64,
    pub beats: Vec<f64>,
    pub downbeats: Vec<f64>,
    pub sections: Vec<AnalysisSection>,
    pub embeddings_shape: Vec<usize>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisSection {
    pub label: String,
    pub start: f64,
    pub end: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum JobRequest {
    Analyze(AnalyzeRequest),
    Lrc(LrcRequest),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum JobResult {
    Analyze(AnalysisRecord),
    Lrc { lrc_url: String, line_count: usize },
}

/// One row in the durable job store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Job {
    pub id: JobId,
    pub job_type: JobType,
    pub status: JobStatus,
    pub progress: f64,
    pub stage: Stage,
    pub error_message: Option<String>,
    pub request: JobRequest,
    pub result: Option<JobResult>,
    pub created_at: SystemTime,
    pub updated_at: SystemTime,
    pub content_hash: Option<String>,
}

impl Job {
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(self.status, JobStatus::Completed | JobStatus::Failed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stage_display_matches_wire_strings() {
        assert_eq!(Stage::Downloading.to_string(), "downloading");
        assert_eq!(Stage::Requeued.to_string(), "requeued");
        assert_eq!(Stage::Complete.to_string(), "complete");
    }

    #[test]
    fn terminal_statuses() {
        let mut job = Job {
            id: JobId("job_abc123".to_owned()),
            job_type: JobType::Analyze,
            status: JobStatus::Queued,
            progress: 0.0,
            stage: Stage::Requeued,
            error_message: None,
            request: JobRequest::Analyze(AnalyzeRequest {
                source_url: "file:///a.mp3".to_owned(),
                separate_stems: true,
            }),
            result: None,
            created_at: SystemTime::UNIX_EPOCH,
            updated_at: SystemTime::UNIX_EPOCH,
            content_hash: None,
        };
        assert!(!job.is_terminal());
        job.status = JobStatus::Completed;
        assert!(job.is_terminal());
    }
}
