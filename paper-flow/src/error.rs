use thiserror::Error;

/// Errors that abort a workflow run or a job-store operation.
///
/// Recoverable conditions (a failed generation call, a scoring response that
/// does not match the protocol) are deliberately absent: those are degraded
/// to sentinel values close to where they occur and never surface as `Err`.
#[derive(Error, Debug)]
pub enum WorkflowError {
    /// The request is structurally invalid; raised before any service call.
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// An unexpected failure inside the run loop.
    #[error("Workflow run failed: {0}")]
    RunFailed(String),

    #[error("Job not found: {0}")]
    JobNotFound(String),

    #[error("Storage error: {0}")]
    Storage(String),
}

pub type Result<T> = std::result::Result<T, WorkflowError>;
