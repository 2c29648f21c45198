use chrono::{DateTime, Utc};
use paper_flow::Job;
use serde::Serialize;

/// Response to a job submission.
#[derive(Debug, Serialize)]
pub struct JobResponse {
    pub job_id: String,
    pub message: String,
    pub status: String,
}

/// Response to a status poll.
#[derive(Debug, Serialize)]
pub struct StatusResponse {
    pub job_id: String,
    pub status: String,
    pub progress: Option<String>,
    pub final_score: Option<i32>,
    pub iterations: Option<u32>,
    pub error: Option<String>,
    pub created_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl From<&Job> for StatusResponse {
    fn from(job: &Job) -> Self {
        Self {
            job_id: job.id.clone(),
            status: job.status.as_str().to_string(),
            progress: job.progress.clone(),
            final_score: job.result.as_ref().map(|r| r.total_score),
            iterations: job.result.as_ref().map(|r| r.iterations),
            error: job.error.clone(),
            created_at: job.created_at,
            completed_at: job.completed_at,
        }
    }
}

/// One row of the jobs listing.
#[derive(Debug, Serialize)]
pub struct JobSummary {
    pub job_id: String,
    pub title: String,
    pub status: String,
    pub created_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl From<&Job> for JobSummary {
    fn from(job: &Job) -> Self {
        Self {
            job_id: job.id.clone(),
            title: job.title.clone(),
            status: job.status.as_str().to_string(),
            created_at: job.created_at,
            completed_at: job.completed_at,
        }
    }
}
