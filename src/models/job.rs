use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

use crate::models::analysis::AnalysisOutcome;

/// Status of an analysis job.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum JobStatus {
    Pending,
    Processing,
    Completed,
    Failed,
}

impl JobStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, JobStatus::Completed | JobStatus::Failed)
    }
}

/// Kind of photo analysis requested.
#[derive(
    Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Display, EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum AnalysisType {
    Meal,
    Body,
}

/// A tracked unit of asynchronous analysis work.
///
/// `result` is set only while `status` is `Completed`, and `error` only while
/// it is `Failed`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Job {
    pub id: String,
    pub photo_id: String,
    pub user_id: String,
    pub analysis_type: AnalysisType,
    pub status: JobStatus,
    pub created_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub result: Option<AnalysisOutcome>,
    pub error: Option<String>,
    pub retry_count: u32,
    pub max_retries: u32,
}

impl Job {
    pub fn new(
        photo_id: &str,
        user_id: &str,
        analysis_type: AnalysisType,
        max_retries: u32,
    ) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            photo_id: photo_id.to_string(),
            user_id: user_id.to_string(),
            analysis_type,
            status: JobStatus::Pending,
            created_at: Utc::now(),
            started_at: None,
            completed_at: None,
            result: None,
            error: None,
            retry_count: 0,
            max_retries,
        }
    }

    /// Key under which this job's result is cached.
    pub fn cache_key(&self) -> String {
        cache_key(&self.photo_id, self.analysis_type, &self.user_id)
    }

    /// Wall-clock processing time for a completed job.
    pub fn processing_time(&self) -> Option<chrono::Duration> {
        match (self.status, self.started_at, self.completed_at) {
            (JobStatus::Completed, Some(start), Some(end)) => Some(end - start),
            _ => None,
        }
    }

    pub(crate) fn mark_processing(&mut self) {
        self.status = JobStatus::Processing;
        self.started_at = Some(Utc::now());
        self.error = None;
    }

    pub(crate) fn mark_completed(&mut self, outcome: AnalysisOutcome) {
        self.status = JobStatus::Completed;
        self.completed_at = Some(Utc::now());
        self.result = Some(outcome);
        self.error = None;
    }

    pub(crate) fn mark_failed(&mut self, message: String) {
        self.status = JobStatus::Failed;
        self.completed_at = Some(Utc::now());
        self.result = None;
        self.error = Some(message);
    }

    pub(crate) fn mark_retrying(&mut self) {
        self.retry_count += 1;
        self.status = JobStatus::Pending;
    }
}

/// Deterministic cache key for a `(photo, analysis type, user)` triple.
///
/// The photo ID is length-prefixed and the analysis type never contains `:`,
/// so distinct triples always map to distinct keys whatever the IDs contain.
pub fn cache_key(photo_id: &str, analysis_type: AnalysisType, user_id: &str) -> String {
    format!("{}:{}:{}:{}", photo_id.len(), photo_id, analysis_type, user_id)
}

/// Response after submitting a photo for analysis.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitResponse {
    pub job_id: String,
    pub status: JobStatus,
}

/// Full job view returned by polling.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobStatusResponse {
    pub job_id: String,
    pub status: JobStatus,
    #[serde(rename = "type")]
    pub analysis_type: AnalysisType,
    pub created_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub started_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<AnalysisOutcome>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl From<Job> for JobStatusResponse {
    fn from(job: Job) -> Self {
        Self {
            job_id: job.id,
            status: job.status,
            analysis_type: job.analysis_type,
            created_at: job.created_at,
            started_at: job.started_at,
            completed_at: job.completed_at,
            result: job.result,
            error: job.error,
        }
    }
}

/// Job listing entry without the result payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobSummary {
    pub job_id: String,
    pub photo_id: String,
    pub status: JobStatus,
    #[serde(rename = "type")]
    pub analysis_type: AnalysisType,
    pub created_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
    pub retry_count: u32,
}

impl From<&Job> for JobSummary {
    fn from(job: &Job) -> Self {
        Self {
            job_id: job.id.clone(),
            photo_id: job.photo_id.clone(),
            status: job.status,
            analysis_type: job.analysis_type,
            created_at: job.created_at,
            completed_at: job.completed_at,
            retry_count: job.retry_count,
        }
    }
}
