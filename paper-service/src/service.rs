use axum::{
    Router,
    extract::{Path, State},
    http::{HeaderValue, Request, StatusCode},
    middleware::{Next, from_fn},
    response::Json,
    routing::{get, post},
};
use paper_flow::{
    InMemoryJobStore, Job, JobStatus, JobStore, OpenRouterCompletion, PaperRequest, PaperWorkflow,
    ProgressReporter, WorkflowError,
};
use serde_json::{Value, json};
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{Instrument, error, info};
use uuid::Uuid;

use crate::config;
use crate::models::{JobResponse, JobSummary, StatusResponse};

type ApiResult<T> = Result<Json<T>, ApiError>;
type ApiError = (StatusCode, Json<Value>);

fn bad_request_error(message: &str) -> ApiError {
    (StatusCode::BAD_REQUEST, Json(json!({ "error": message })))
}

fn not_found_error(message: &str, id: &str) -> ApiError {
    (
        StatusCode::NOT_FOUND,
        Json(json!({
            "error": message,
            "job_id": id
        })),
    )
}

fn internal_error(message: &str, details: &str) -> ApiError {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(json!({
            "error": message,
            "details": details
        })),
    )
}

#[derive(Clone)]
pub struct AppState {
    pub job_store: Arc<dyn JobStore>,
    pub workflow: Arc<PaperWorkflow>,
}

/// Build the application with the OpenRouter-backed workflow and an
/// in-memory job store.
pub async fn create_app() -> Router {
    let generation = Arc::new(OpenRouterCompletion::new(
        config::generator_model(),
        config::GENERATOR_PREAMBLE,
    ));
    let scoring = Arc::new(OpenRouterCompletion::new(
        config::evaluator_model(),
        config::EVALUATOR_PREAMBLE,
    ));

    let app_state = AppState {
        job_store: Arc::new(InMemoryJobStore::new()),
        workflow: Arc::new(PaperWorkflow::new(generation, scoring)),
    };

    build_router(app_state)
}

pub fn build_router(app_state: AppState) -> Router {
    Router::new()
        .route("/", get(root))
        .route("/health", get(health_check))
        .route("/papers", post(submit_paper))
        .route("/papers/{job_id}/status", get(get_job_status))
        .route("/papers/{job_id}/json", get(get_paper_json))
        .route("/papers/{job_id}/latex", get(get_paper_latex))
        .route("/jobs", get(list_jobs))
        .layer(from_fn(correlation_id_middleware))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(app_state)
}

/// Middleware that tags every request with a correlation id span.
async fn correlation_id_middleware(
    mut request: Request<axum::body::Body>,
    next: Next,
) -> axum::response::Response {
    let correlation_id = Uuid::new_v4().to_string();

    if let Ok(value) = HeaderValue::from_str(&correlation_id) {
        request.headers_mut().insert("x-correlation-id", value);
    }

    let span = tracing::info_span!("http_request", correlation_id = %correlation_id);
    next.run(request).instrument(span).await
}

async fn root() -> Json<Value> {
    Json(json!({
        "service": "Research Paper Generator",
        "version": "1.0.0",
        "endpoints": {
            "POST /papers": "Start paper generation (returns job_id)",
            "GET /papers/{job_id}/status": "Check generation status",
            "GET /papers/{job_id}/json": "Get generated paper as JSON",
            "GET /papers/{job_id}/latex": "Get generated paper as LaTeX source",
            "GET /jobs": "List all jobs",
            "GET /health": "Health check"
        },
        "workflow": {
            "1": "POST /papers with title and sections to get a job_id",
            "2": "Poll GET /papers/{job_id}/status until status is 'completed'",
            "3": "GET /papers/{job_id}/json or /papers/{job_id}/latex"
        }
    }))
}

async fn health_check() -> Json<Value> {
    Json(json!({
        "status": "healthy",
        "timestamp": chrono::Utc::now().to_rfc3339()
    }))
}

async fn submit_paper(
    State(state): State<AppState>,
    Json(request): Json<PaperRequest>,
) -> ApiResult<JobResponse> {
    if request.sections.is_empty() {
        return Err(bad_request_error("At least one section is required"));
    }

    let job = Job::new(request.title.clone());
    let job_id = job.id.clone();

    info!(job_id = %job_id, title = %request.title, "job created");

    state.job_store.put(job).await.map_err(|e| {
        error!(job_id = %job_id, error = %e, "failed to store job");
        internal_error("Failed to create job", &e.to_string())
    })?;

    tokio::spawn(run_job(state.clone(), job_id.clone(), request));

    Ok(Json(JobResponse {
        message: format!("Paper generation started. Use job_id '{job_id}' to check status."),
        job_id,
        status: JobStatus::Pending.as_str().to_string(),
    }))
}

/// Forwards workflow phase updates into the job store. Updates are applied
/// off the workflow's critical path and only touch the progress field, so a
/// late update cannot clobber a published outcome.
struct StoreProgress {
    store: Arc<dyn JobStore>,
    job_id: String,
}

impl ProgressReporter for StoreProgress {
    fn report(&self, message: &str) {
        let store = self.store.clone();
        let job_id = self.job_id.clone();
        let message = message.to_string();
        tokio::spawn(async move {
            if let Err(e) = store.update_progress(&job_id, &message).await {
                error!(job_id = %job_id, error = %e, "failed to update job progress");
            }
        });
    }
}

/// Background task: advances the job through its lifecycle while the
/// workflow runs. The run's outcome is published exactly once; a panicking
/// run is caught at the join and recorded as a failure rather than leaving
/// the job stuck in processing.
async fn run_job(state: AppState, job_id: String, request: PaperRequest) {
    let Ok(Some(mut job)) = state.job_store.get(&job_id).await else {
        error!(job_id = %job_id, "job disappeared before processing");
        return;
    };

    job.mark_processing("Generating paper content...");
    if let Err(e) = state.job_store.put(job.clone()).await {
        error!(job_id = %job_id, error = %e, "failed to mark job processing");
        return;
    }

    let workflow = state.workflow.clone();
    let progress = StoreProgress {
        store: state.job_store.clone(),
        job_id: job_id.clone(),
    };
    let run = tokio::spawn(async move { workflow.run_with_progress(&request, &progress).await });

    match run.await {
        Ok(Ok(result)) => {
            info!(
                job_id = %job_id,
                total_score = result.total_score,
                iterations = result.iterations,
                "job completed"
            );
            job.complete(result);
        }
        Ok(Err(e)) => {
            error!(job_id = %job_id, error = %e, "job failed");
            job.fail(e.to_string());
        }
        Err(e) => {
            error!(job_id = %job_id, error = %e, "workflow task aborted");
            job.fail(WorkflowError::RunFailed(e.to_string()).to_string());
        }
    }

    if let Err(e) = state.job_store.put(job).await {
        error!(job_id = %job_id, error = %e, "failed to store job outcome");
    }
}

async fn get_job_status(
    State(state): State<AppState>,
    Path(job_id): Path<String>,
) -> ApiResult<StatusResponse> {
    match state.job_store.get(&job_id).await {
        Ok(Some(job)) => Ok(Json(StatusResponse::from(&job))),
        Ok(None) => Err(not_found_error("Job not found", &job_id)),
        Err(e) => {
            error!(job_id = %job_id, error = %e, "failed to load job");
            Err(internal_error("Failed to load job", &e.to_string()))
        }
    }
}

/// Load a completed job, distinguishing unknown ids from jobs that are
/// still in flight.
async fn completed_job(state: &AppState, job_id: &str) -> Result<Job, ApiError> {
    match state.job_store.get(job_id).await {
        Ok(Some(job)) => {
            if job.status != JobStatus::Completed {
                return Err(bad_request_error(&format!(
                    "Job {job_id} is not completed yet. Current status: {}",
                    job.status.as_str()
                )));
            }
            Ok(job)
        }
        Ok(None) => Err(not_found_error("Job not found", job_id)),
        Err(e) => {
            error!(job_id = %job_id, error = %e, "failed to load job");
            Err(internal_error("Failed to load job", &e.to_string()))
        }
    }
}

async fn get_paper_json(
    State(state): State<AppState>,
    Path(job_id): Path<String>,
) -> ApiResult<Value> {
    let job = completed_job(&state, &job_id).await?;
    let result = job
        .result
        .as_ref()
        .ok_or_else(|| internal_error("Paper data not available", &job_id))?;
    serde_json::to_value(result)
        .map(Json)
        .map_err(|e| internal_error("Failed to serialize paper", &e.to_string()))
}

async fn get_paper_latex(
    State(state): State<AppState>,
    Path(job_id): Path<String>,
) -> Result<String, ApiError> {
    let job = completed_job(&state, &job_id).await?;
    job.result
        .map(|result| result.latex)
        .ok_or_else(|| internal_error("LaTeX data not available", &job_id))
}

async fn list_jobs(State(state): State<AppState>) -> ApiResult<Value> {
    match state.job_store.list().await {
        Ok(jobs) => {
            let summaries: Vec<JobSummary> = jobs.iter().map(JobSummary::from).collect();
            Ok(Json(json!({
                "total_jobs": summaries.len(),
                "jobs": summaries
            })))
        }
        Err(e) => {
            error!(error = %e, "failed to list jobs");
            Err(internal_error("Failed to list jobs", &e.to_string()))
        }
    }
}
