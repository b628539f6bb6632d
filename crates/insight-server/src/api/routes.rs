//! REST API routes.

use std::sync::Arc;

use axum::{
    extract::{Query, State},
    http::StatusCode,
    middleware,
    routing::{get, post},
    Json, Router,
};
use insight_core::{
    apply_actions, parse_batch, AnalysisReport, Analyzer, Batch, Flight, FlightAction,
    InsightError,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::api::request_id::ensure_request_id;
use crate::state::AppState;
use crate::store::StoreError;

type ApiError = (StatusCode, Json<Value>);
type ApiResult<T> = Result<Json<T>, ApiError>;

/// Create the API router.
pub fn create_router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/health", get(|| async { "OK" }))
        .route("/v1/flights", get(load_flights).put(save_flights))
        .route("/v1/analyze", post(analyze))
        .route("/v1/apply", post(apply))
        .route("/v1/validate", post(validate))
        .route("/v1/trajectories", post(trajectories))
        .route("/v1/conflicts", post(conflicts))
        .route("/v1/hotspots", post(hotspots))
        .route("/v1/proposals", post(proposals))
        .layer(middleware::from_fn(ensure_request_id))
}

fn error_body(status: StatusCode, message: impl Into<String>) -> ApiError {
    (status, Json(json!({ "error": message.into() })))
}

fn insight_error(err: InsightError) -> ApiError {
    let status = match &err {
        InsightError::NoData | InsightError::UnknownFlight(_) => StatusCode::NOT_FOUND,
        InsightError::AnalysisTimeout { .. } => StatusCode::SERVICE_UNAVAILABLE,
        InsightError::MalformedRoute { .. } | InsightError::InvalidWaypoint(_) => {
            StatusCode::UNPROCESSABLE_ENTITY
        }
        InsightError::InvalidConfig(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };
    if status.is_server_error() {
        tracing::warn!(error = %err, "analysis request failed");
    }
    error_body(status, err.to_string())
}

fn store_error(err: StoreError) -> ApiError {
    match err {
        StoreError::NoData => insight_error(InsightError::NoData),
        other => {
            tracing::error!("Flight store failure: {}", other);
            error_body(StatusCode::INTERNAL_SERVER_ERROR, "Flight store unavailable")
        }
    }
}

/// Run a CPU-bound analysis off the async runtime.
async fn run_blocking<T, F>(state: &AppState, job: F) -> Result<T, ApiError>
where
    T: Send + 'static,
    F: FnOnce(&Analyzer) -> insight_core::Result<T> + Send + 'static,
{
    let analyzer = state.analyzer();
    tokio::task::spawn_blocking(move || job(&analyzer))
        .await
        .map_err(|err| {
            tracing::error!("Analysis task failed: {}", err);
            error_body(StatusCode::INTERNAL_SERVER_ERROR, "Analysis task failed")
        })?
        .map_err(insight_error)
}

fn merge_issues(mut intake: Vec<String>, stage: Vec<String>) -> Vec<String> {
    intake.extend(stage);
    intake
}

// ========== Load / Save ==========

async fn load_flights(State(state): State<Arc<AppState>>) -> ApiResult<Vec<Flight>> {
    state.store().load().await.map(Json).map_err(store_error)
}

#[derive(Debug, Serialize)]
struct SaveResponse {
    count: usize,
}

async fn save_flights(
    State(state): State<Arc<AppState>>,
    Json(flights): Json<Vec<Flight>>,
) -> ApiResult<SaveResponse> {
    state.store().save(&flights).await.map_err(store_error)?;
    Ok(Json(SaveResponse {
        count: flights.len(),
    }))
}

// ========== Analysis ==========

#[derive(Debug, Default, Deserialize)]
struct AnalyzeQuery {
    #[serde(default)]
    include_trajectories: bool,
}

async fn analyze(
    State(state): State<Arc<AppState>>,
    Query(query): Query<AnalyzeQuery>,
    Json(batch): Json<Vec<Value>>,
) -> ApiResult<AnalysisReport> {
    let Batch { flights, issues } = parse_batch(&batch);
    let mut report = run_blocking(&state, move |analyzer| {
        analyzer.analyze(&flights, query.include_trajectories)
    })
    .await?;
    report.issues = merge_issues(issues, report.issues);
    Ok(Json(report))
}

async fn validate(
    State(state): State<Arc<AppState>>,
    Json(batch): Json<Vec<Value>>,
) -> ApiResult<Value> {
    let Batch { flights, issues } = parse_batch(&batch);
    let simulated = run_blocking(&state, move |analyzer| analyzer.trajectories(&flights)).await?;
    Ok(Json(json!({
        "valid": simulated.trajectories.len(),
        "issues": merge_issues(issues, simulated.issues),
    })))
}

async fn trajectories(
    State(state): State<Arc<AppState>>,
    Json(batch): Json<Vec<Value>>,
) -> ApiResult<Value> {
    let Batch { flights, issues } = parse_batch(&batch);
    let simulated = run_blocking(&state, move |analyzer| analyzer.trajectories(&flights)).await?;
    Ok(Json(json!({
        "trajectories": simulated.trajectories,
        "issues": merge_issues(issues, simulated.issues),
    })))
}

async fn conflicts(
    State(state): State<Arc<AppState>>,
    Json(batch): Json<Vec<Value>>,
) -> ApiResult<Value> {
    let Batch { flights, issues } = parse_batch(&batch);
    let (conflicts, stage_issues) =
        run_blocking(&state, move |analyzer| analyzer.conflicts(&flights)).await?;
    Ok(Json(json!({
        "conflicts": conflicts,
        "issues": merge_issues(issues, stage_issues),
    })))
}

async fn hotspots(
    State(state): State<Arc<AppState>>,
    Json(batch): Json<Vec<Value>>,
) -> ApiResult<Value> {
    let Batch { flights, issues } = parse_batch(&batch);
    let (hotspots, stage_issues) =
        run_blocking(&state, move |analyzer| analyzer.hotspots(&flights)).await?;
    Ok(Json(json!({
        "hotspots": hotspots,
        "issues": merge_issues(issues, stage_issues),
    })))
}

async fn proposals(
    State(state): State<Arc<AppState>>,
    Json(batch): Json<Vec<Value>>,
) -> ApiResult<Value> {
    let Batch { flights, issues } = parse_batch(&batch);
    let report = run_blocking(&state, move |analyzer| analyzer.analyze(&flights, false)).await?;
    Ok(Json(json!({
        "proposals": report.proposals,
        "issues": merge_issues(issues, report.issues),
    })))
}

// ========== Apply ==========

#[derive(Debug, Deserialize)]
struct ApplyRequest {
    flights: Vec<Flight>,
    #[serde(default)]
    actions: Vec<FlightAction>,
}

#[derive(Debug, Serialize)]
struct ApplyResponse {
    revised: Vec<Flight>,
}

async fn apply(Json(request): Json<ApplyRequest>) -> ApiResult<ApplyResponse> {
    let revised = apply_actions(request.flights, &request.actions).map_err(insight_error)?;
    Ok(Json(ApplyResponse { revised }))
}
