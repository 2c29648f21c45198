use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::Serialize;
use std::sync::Arc;
use uuid::Uuid;

use crate::error::Result;
use crate::models::WorkflowResult;

/// Lifecycle state of a paper-generation job. Strictly forward-only:
/// pending -> processing -> {completed, failed}.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Pending,
    Processing,
    Completed,
    Failed,
}

impl JobStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobStatus::Completed | JobStatus::Failed)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Pending => "pending",
            JobStatus::Processing => "processing",
            JobStatus::Completed => "completed",
            JobStatus::Failed => "failed",
        }
    }
}

/// One asynchronous paper-generation request and, once completed, its
/// result. Transition methods ignore calls that would move a job backwards
/// or out of a terminal state.
#[derive(Debug, Clone, Serialize)]
pub struct Job {
    pub id: String,
    pub title: String,
    pub status: JobStatus,
    pub progress: Option<String>,
    pub created_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    pub error: Option<String>,
    pub result: Option<WorkflowResult>,
}

impl Job {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            title: title.into(),
            status: JobStatus::Pending,
            progress: Some("Job queued".to_string()),
            created_at: Utc::now(),
            completed_at: None,
            error: None,
            result: None,
        }
    }

    pub fn mark_processing(&mut self, progress: impl Into<String>) {
        if self.status != JobStatus::Pending {
            return;
        }
        self.status = JobStatus::Processing;
        self.progress = Some(progress.into());
    }

    pub fn set_progress(&mut self, progress: impl Into<String>) {
        if !self.status.is_terminal() {
            self.progress = Some(progress.into());
        }
    }

    pub fn complete(&mut self, result: WorkflowResult) {
        if self.status.is_terminal() {
            return;
        }
        self.status = JobStatus::Completed;
        self.progress = None;
        self.result = Some(result);
        self.completed_at = Some(Utc::now());
    }

    pub fn fail(&mut self, error: impl Into<String>) {
        if self.status.is_terminal() {
            return;
        }
        self.status = JobStatus::Failed;
        self.progress = None;
        self.error = Some(error.into());
        self.completed_at = Some(Utc::now());
    }
}

/// Store for job records, injected into request handlers. One writer per
/// job id (the background run); readers never block writers.
#[async_trait]
pub trait JobStore: Send + Sync {
    async fn put(&self, job: Job) -> Result<()>;
    async fn get(&self, id: &str) -> Result<Option<Job>>;
    async fn list(&self) -> Result<Vec<Job>>;
    /// Update only the progress message of a stored job, in place. A no-op
    /// for unknown ids and terminal jobs, so a late update cannot clobber a
    /// published outcome.
    async fn update_progress(&self, id: &str, progress: &str) -> Result<()>;
}

/// In-memory implementation of JobStore.
pub struct InMemoryJobStore {
    jobs: Arc<DashMap<String, Job>>,
}

impl InMemoryJobStore {
    pub fn new() -> Self {
        Self {
            jobs: Arc::new(DashMap::new()),
        }
    }
}

impl Default for InMemoryJobStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl JobStore for InMemoryJobStore {
    async fn put(&self, job: Job) -> Result<()> {
        self.jobs.insert(job.id.clone(), job);
        Ok(())
    }

    async fn get(&self, id: &str) -> Result<Option<Job>> {
        Ok(self.jobs.get(id).map(|entry| entry.clone()))
    }

    async fn list(&self) -> Result<Vec<Job>> {
        let mut jobs: Vec<Job> = self.jobs.iter().map(|entry| entry.clone()).collect();
        jobs.sort_by_key(|job| job.created_at);
        Ok(jobs)
    }

    async fn update_progress(&self, id: &str, progress: &str) -> Result<()> {
        if let Some(mut entry) = self.jobs.get_mut(id) {
            entry.set_progress(progress);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{PaperEvaluation, SectionContent, WorkflowResult};

    fn dummy_result() -> WorkflowResult {
        WorkflowResult {
            title: "T".to_string(),
            sections: SectionContent::new(),
            evaluations: PaperEvaluation::new(),
            total_score: 0,
            iterations: 1,
            threshold_met: true,
            latex: String::new(),
        }
    }

    #[test]
    fn lifecycle_is_forward_only() {
        let mut job = Job::new("T");
        assert_eq!(job.status, JobStatus::Pending);

        job.mark_processing("working");
        assert_eq!(job.status, JobStatus::Processing);

        job.complete(dummy_result());
        assert_eq!(job.status, JobStatus::Completed);
        assert!(job.completed_at.is_some());

        // Terminal states are sticky.
        job.fail("late failure");
        assert_eq!(job.status, JobStatus::Completed);
        assert!(job.error.is_none());
    }

    #[test]
    fn mark_processing_only_applies_to_pending_jobs() {
        let mut job = Job::new("T");
        job.fail("boom");
        job.mark_processing("working");
        assert_eq!(job.status, JobStatus::Failed);
    }

    #[tokio::test]
    async fn store_round_trips_and_lists_jobs() {
        let store = InMemoryJobStore::new();

        let first = Job::new("first");
        let first_id = first.id.clone();
        store.put(first).await.unwrap();
        store.put(Job::new("second")).await.unwrap();

        let fetched = store.get(&first_id).await.unwrap().unwrap();
        assert_eq!(fetched.title, "first");
        assert!(store.get("missing").await.unwrap().is_none());

        let jobs = store.list().await.unwrap();
        assert_eq!(jobs.len(), 2);
    }

    #[tokio::test]
    async fn update_progress_skips_terminal_and_unknown_jobs() {
        let store = InMemoryJobStore::new();

        let mut job = Job::new("T");
        let job_id = job.id.clone();
        job.mark_processing("working");
        store.put(job).await.unwrap();

        store.update_progress(&job_id, "still working").await.unwrap();
        let job = store.get(&job_id).await.unwrap().unwrap();
        assert_eq!(job.progress.as_deref(), Some("still working"));

        let mut job = job;
        job.fail("boom");
        store.put(job).await.unwrap();

        store.update_progress(&job_id, "late update").await.unwrap();
        let job = store.get(&job_id).await.unwrap().unwrap();
        assert_eq!(job.progress, None);

        // Unknown ids are ignored rather than erroring.
        store.update_progress("missing", "whatever").await.unwrap();
    }
}
