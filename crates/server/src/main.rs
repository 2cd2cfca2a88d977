//! Pourfix server and CLI.
//!
//! `pourfix serve` exposes the pipeline over HTTP (job submission, status
//! polling, artifacts, SSE events); `pourfix run <dir>` processes one
//! directory inline and prints the Markdown report.

use anyhow::{bail, Context, Result};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::sse::{Event, KeepAlive, Sse},
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use clap::{Parser, Subcommand};
use futures::Stream;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::collections::HashMap;
use std::convert::Infallible;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::{broadcast, mpsc, RwLock, Semaphore};
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::StreamExt;
use tracing::{error, info, warn};
use utoipa::{OpenApi, ToSchema};

use pourfix_core::pipeline::events::PipelineEvent;
use pourfix_core::report::{render_markdown, ReportBuilder};
use pourfix_core::state::JobDb;
use pourfix_core::{FileSet, Job, JobCommand, JobStore, Orchestrator};

#[derive(Parser)]
#[command(name = "pourfix", about = "WCAG POUR accessibility fix pipeline")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP server
    Serve {
        #[arg(long, default_value_t = 8585)]
        port: u16,
        /// SQLite database path for job persistence
        #[arg(long, default_value = "pourfix.db")]
        db: PathBuf,
        /// Maximum concurrently running jobs
        #[arg(long, default_value_t = 4)]
        max_jobs: usize,
    },
    /// Process a directory and print the report
    Run {
        /// Directory containing the site to fix
        dir: PathBuf,
        /// Write the patched files next to the originals in this directory
        #[arg(long)]
        out: Option<PathBuf>,
    },
}

#[derive(Clone)]
struct AppState {
    store: JobStore,
    events: broadcast::Sender<PipelineEvent>,
    cancels: Arc<RwLock<HashMap<String, mpsc::Sender<JobCommand>>>>,
    job_limit: Arc<Semaphore>,
}

#[derive(Debug, Deserialize, ToSchema)]
struct FileEntry {
    path: String,
    content: String,
}

#[derive(Debug, Deserialize, ToSchema)]
struct CreateJobRequest {
    files: Vec<FileEntry>,
}

#[derive(Debug, Serialize, ToSchema)]
struct CreateJobResponse {
    job_id: String,
}

#[derive(OpenApi)]
#[openapi(
    paths(create_job, job_status, job_report, job_patched, job_report_md, cancel_job, health),
    components(schemas(CreateJobRequest, CreateJobResponse, FileEntry)),
    info(
        title = "Pourfix API",
        description = "WCAG POUR accessibility fix pipeline"
    )
)]
struct ApiDoc;

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,pourfix_core=debug".into()),
        )
        .init();

    match Cli::parse().command {
        Commands::Serve { port, db, max_jobs } => serve(port, db, max_jobs).await,
        Commands::Run { dir, out } => run_once(dir, out).await,
    }
}

async fn serve(port: u16, db_path: PathBuf, max_jobs: usize) -> Result<()> {
    let db = JobDb::open(&db_path)?;
    let store = JobStore::with_db(db);
    let restored = store.hydrate().await?;
    if restored > 0 {
        info!(restored, "restored persisted jobs");
    }

    let (events, _) = broadcast::channel(256);
    let state = AppState {
        store,
        events,
        cancels: Arc::new(RwLock::new(HashMap::new())),
        job_limit: Arc::new(Semaphore::new(max_jobs.max(1))),
    };

    let app = Router::new()
        .route("/health", get(health))
        .route("/api/openapi.json", get(openapi_doc))
        .route("/api/v1/jobs", post(create_job))
        .route("/api/v1/jobs/:id/status", get(job_status))
        .route("/api/v1/jobs/:id/report", get(job_report))
        .route("/api/v1/jobs/:id/artifacts/patched", get(job_patched))
        .route("/api/v1/jobs/:id/artifacts/report.md", get(job_report_md))
        .route("/api/v1/jobs/:id/cancel", post(cancel_job))
        .route("/api/v1/events", get(event_stream))
        .with_state(state);

    let addr = format!("0.0.0.0:{port}");
    info!(%addr, "pourfix server listening");
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    axum::serve(listener, app).await?;
    Ok(())
}

/// Run one job inline and print its Markdown report.
async fn run_once(dir: PathBuf, out: Option<PathBuf>) -> Result<()> {
    let files = FileSet::load_dir(&dir)?;
    if files.is_empty() {
        bail!("no scannable files found under {}", dir.display());
    }
    info!(count = files.len(), "loaded file set");

    let store = JobStore::new();
    let job = Orchestrator::new(store).run(Job::new(), files).await;

    if job.status != pourfix_core::JobStatus::Complete {
        bail!("job ended in {:?}: {}", job.status, job.message);
    }

    let report = ReportBuilder::build(&job)?;
    println!("{}", render_markdown(&report));

    if let Some(out_dir) = out {
        if let Some(patched) = &job.patched {
            for (path, content) in patched.iter() {
                let target = out_dir.join(path);
                if let Some(parent) = target.parent() {
                    tokio::fs::create_dir_all(parent).await?;
                }
                tokio::fs::write(&target, content).await?;
            }
            info!(dir = %out_dir.display(), "patched files written");
        }
    }
    Ok(())
}

async fn openapi_doc() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDoc::openapi())
}

#[utoipa::path(get, path = "/health", responses((status = 200, description = "Server is up")))]
async fn health() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

#[utoipa::path(
    post,
    path = "/api/v1/jobs",
    request_body = CreateJobRequest,
    responses(
        (status = 202, description = "Job accepted", body = CreateJobResponse),
        (status = 400, description = "Empty or invalid file set")
    )
)]
async fn create_job(
    State(state): State<AppState>,
    Json(request): Json<CreateJobRequest>,
) -> impl IntoResponse {
    if request.files.is_empty() {
        return api_error(StatusCode::BAD_REQUEST, "file set is empty");
    }
    let files = FileSet::from_entries(
        request.files.into_iter().map(|f| (f.path, f.content)),
    );

    let job = Job::new();
    let job_id = job.id.clone();
    state.store.publish(&job).await;

    let (cancel_tx, cancel_rx) = mpsc::channel(1);
    state.cancels.write().await.insert(job_id.clone(), cancel_tx);

    let (event_tx, mut event_rx) = mpsc::channel(64);
    let broadcast_tx = state.events.clone();
    tokio::spawn(async move {
        while let Some(event) = event_rx.recv().await {
            // No subscribers is fine.
            let _ = broadcast_tx.send(event);
        }
    });

    let store = state.store.clone();
    let cancels = state.cancels.clone();
    let limit = state.job_limit.clone();
    let spawned_id = job_id.clone();
    tokio::spawn(async move {
        let _permit = match limit.acquire_owned().await {
            Ok(permit) => permit,
            Err(_) => {
                error!(job_id = %spawned_id, "job semaphore closed");
                return;
            }
        };
        let orchestrator = Orchestrator::new(store)
            .with_event_channel(event_tx)
            .with_command_channel(cancel_rx);
        let done = orchestrator.run(job, files).await;
        info!(job_id = %done.id, status = ?done.status, "job finished");
        cancels.write().await.remove(&done.id);
    });

    (
        StatusCode::ACCEPTED,
        Json(json!({ "job_id": job_id })),
    )
}

#[utoipa::path(
    get,
    path = "/api/v1/jobs/{id}/status",
    params(("id" = String, Path, description = "Job id")),
    responses(
        (status = 200, description = "Current job snapshot"),
        (status = 404, description = "Unknown job")
    )
)]
async fn job_status(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> impl IntoResponse {
    match state.store.snapshot(&id).await {
        Some(job) => (
            StatusCode::OK,
            Json(json!({
                "job_id": job.id,
                "status": job.status,
                "progress": job.progress,
                "message": job.message,
                "summary": job.summary,
            })),
        ),
        None => api_error(StatusCode::NOT_FOUND, "unknown job"),
    }
}

#[utoipa::path(
    get,
    path = "/api/v1/jobs/{id}/report",
    params(("id" = String, Path, description = "Job id")),
    responses(
        (status = 200, description = "Full report for a completed job"),
        (status = 400, description = "Job not complete yet"),
        (status = 404, description = "Unknown job")
    )
)]
async fn job_report(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> impl IntoResponse {
    let Some(job) = state.store.snapshot(&id).await else {
        return api_error(StatusCode::NOT_FOUND, "unknown job");
    };
    match ReportBuilder::build(&job) {
        Ok(report) => match serde_json::to_value(&report) {
            Ok(value) => (StatusCode::OK, Json(value)),
            Err(e) => api_error(StatusCode::INTERNAL_SERVER_ERROR, &e.to_string()),
        },
        Err(e) => api_error(StatusCode::BAD_REQUEST, &e.to_string()),
    }
}

#[utoipa::path(
    get,
    path = "/api/v1/jobs/{id}/artifacts/patched",
    params(("id" = String, Path, description = "Job id")),
    responses(
        (status = 200, description = "Patched file set"),
        (status = 400, description = "Job not complete yet"),
        (status = 404, description = "Unknown job")
    )
)]
async fn job_patched(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> impl IntoResponse {
    let Some(job) = state.store.snapshot(&id).await else {
        return api_error(StatusCode::NOT_FOUND, "unknown job");
    };
    if job.status != pourfix_core::JobStatus::Complete {
        return api_error(StatusCode::BAD_REQUEST, "job not complete");
    }
    match &job.patched {
        Some(patched) => (
            StatusCode::OK,
            Json(json!({ "files": patched.files })),
        ),
        None => api_error(StatusCode::BAD_REQUEST, "no patched artifacts"),
    }
}

#[utoipa::path(
    get,
    path = "/api/v1/jobs/{id}/artifacts/report.md",
    params(("id" = String, Path, description = "Job id")),
    responses(
        (status = 200, description = "Rendered Markdown report", content_type = "text/markdown"),
        (status = 400, description = "Job not complete yet"),
        (status = 404, description = "Unknown job")
    )
)]
async fn job_report_md(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let Some(job) = state.store.snapshot(&id).await else {
        return api_error(StatusCode::NOT_FOUND, "unknown job").into_response();
    };
    match ReportBuilder::build(&job) {
        Ok(report) => (
            StatusCode::OK,
            [("content-type", "text/markdown; charset=utf-8")],
            render_markdown(&report),
        )
            .into_response(),
        Err(e) => api_error(StatusCode::BAD_REQUEST, &e.to_string()).into_response(),
    }
}

#[utoipa::path(
    post,
    path = "/api/v1/jobs/{id}/cancel",
    params(("id" = String, Path, description = "Job id")),
    responses(
        (status = 200, description = "Cancellation requested"),
        (status = 404, description = "Unknown job"),
        (status = 409, description = "Job already finished")
    )
)]
async fn cancel_job(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> impl IntoResponse {
    if state.store.snapshot(&id).await.is_none() {
        return api_error(StatusCode::NOT_FOUND, "unknown job");
    }
    let sender = state.cancels.read().await.get(&id).cloned();
    match sender {
        Some(tx) => {
            if tx.send(JobCommand::Cancel).await.is_err() {
                warn!(job_id = %id, "cancel requested but job just finished");
            }
            (StatusCode::OK, Json(json!({ "job_id": id, "cancelled": true })))
        }
        None => api_error(StatusCode::CONFLICT, "job already finished"),
    }
}

/// SSE stream of pipeline events, shared across all jobs.
async fn event_stream(
    State(state): State<AppState>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let rx = state.events.subscribe();
    let stream = BroadcastStream::new(rx).filter_map(|event| match event {
        Ok(event) => match Event::default().json_data(&event) {
            Ok(sse) => Some(Ok::<_, Infallible>(sse)),
            Err(e) => {
                warn!(error = %e, "failed to encode event");
                None
            }
        },
        // Lagged subscriber: skip the gap and continue.
        Err(_) => None,
    });
    Sse::new(stream).keep_alive(
        KeepAlive::new()
            .interval(std::time::Duration::from_secs(15))
            .text("heartbeat"),
    )
}

fn api_error(status: StatusCode, message: &str) -> (StatusCode, Json<serde_json::Value>) {
    (status, Json(json!({ "error": message })))
}
