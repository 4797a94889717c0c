//! HTTP route handlers for the router API.

use axum::Router;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{Html, IntoResponse, Json, Response};
use axum::routing::{get, post};
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::warn;

use router::dashboard::{self, DashboardSnapshot};
use router::pipeline::{self, PipelineError, TaskRequest, TaskVerdict};
use router::store::{RunDetail, StoreError};

use crate::html::render_dashboard_html;
use crate::state::AppState;

const DEFAULT_LIMIT: i64 = 5;

/// Build the application router.
pub fn app_router() -> Router<AppState> {
    Router::new()
        .route("/health", get(health))
        .route("/task/code", post(task_code))
        .route("/dashboard", get(dashboard_summary))
        .route("/dashboard/run/{status}/{project}/{run_id}", get(dashboard_run))
        .route("/dashboard/html", get(dashboard_html))
}

/// Error payload rendered as a `{"detail": ...}` body.
#[derive(Debug)]
struct ApiError {
    status: StatusCode,
    detail: String,
}

impl ApiError {
    fn new(status: StatusCode, detail: impl Into<String>) -> Self {
        Self {
            status,
            detail: detail.into(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if self.status.is_server_error() {
            warn!(status = %self.status, detail = %self.detail, "request failed");
        }
        (self.status, Json(json!({ "detail": self.detail }))).into_response()
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        let status = match &err {
            StoreError::UnknownStatus(_) | StoreError::RunNotFound(_) => StatusCode::NOT_FOUND,
            StoreError::PathEscapes(_) => StatusCode::BAD_GATEWAY,
            StoreError::Io { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        };
        ApiError::new(status, err.to_string())
    }
}

impl From<PipelineError> for ApiError {
    fn from(err: PipelineError) -> Self {
        match err {
            PipelineError::NoFilesProduced => {
                ApiError::new(StatusCode::BAD_REQUEST, "Author returned no files.")
            }
            PipelineError::AuthorJsonInvalid | PipelineError::VerifyJsonInvalid => ApiError::new(
                StatusCode::BAD_GATEWAY,
                "Upstream model returned invalid JSON",
            ),
            PipelineError::Gateway(inner) => {
                ApiError::new(StatusCode::BAD_GATEWAY, inner.to_string())
            }
            PipelineError::Store(inner) => inner.into(),
        }
    }
}

async fn health(State(state): State<AppState>) -> Json<Value> {
    Json(json!({
        "status": "ok",
        "ollama": state.config.ollama_base_url,
        "models": {
            "author": state.config.author_model,
            "reproduce": state.config.reproduce_model,
            "security": state.config.security_model,
        },
        "author_remote": state.config.author_uses_remote(),
        "local_only": state.config.final_output_local_only,
    }))
}

/// POST /task/code - run one task through the pipeline.
async fn task_code(
    State(state): State<AppState>,
    Json(request): Json<TaskRequest>,
) -> Result<Json<TaskVerdict>, ApiError> {
    if request.task.trim().is_empty() {
        return Err(ApiError::new(
            StatusCode::BAD_REQUEST,
            "Task must not be empty.",
        ));
    }
    let outcome = pipeline::run_code_task(
        &state.config,
        state.gateway.as_ref(),
        &state.store,
        &request,
    )
    .await?;
    Ok(Json(outcome.verdict))
}

#[derive(Debug, Default, Deserialize)]
struct DashboardParams {
    project: Option<String>,
    limit: Option<i64>,
}

/// GET /dashboard - summary snapshot as JSON.
async fn dashboard_summary(
    State(state): State<AppState>,
    Query(params): Query<DashboardParams>,
) -> Result<Json<DashboardSnapshot>, ApiError> {
    Ok(Json(snapshot(&state, &params)?))
}

/// GET /dashboard/run/:status/:project/:run_id - full run detail.
async fn dashboard_run(
    State(state): State<AppState>,
    Path((status, project, run_id)): Path<(String, String, String)>,
) -> Result<Json<RunDetail>, ApiError> {
    let detail = dashboard::detail(&state.store, &status, &project, &run_id)?;
    Ok(Json(detail))
}

/// GET /dashboard/html - summary snapshot rendered as a page.
async fn dashboard_html(
    State(state): State<AppState>,
    Query(params): Query<DashboardParams>,
) -> Result<Html<String>, ApiError> {
    let snapshot = snapshot(&state, &params)?;
    let page = render_dashboard_html(&snapshot).map_err(|err| {
        ApiError::new(StatusCode::INTERNAL_SERVER_ERROR, format!("{err:#}"))
    })?;
    Ok(Html(page))
}

fn snapshot(state: &AppState, params: &DashboardParams) -> Result<DashboardSnapshot, ApiError> {
    let project = params
        .project
        .clone()
        .unwrap_or_else(|| state.config.default_project.clone());
    let limit = params.limit.unwrap_or(DEFAULT_LIMIT);
    Ok(dashboard::summary(
        &state.store,
        &state.config,
        &project,
        limit,
    )?)
}
