//! API Handlers
//!
//! HTTP request handlers for the quiz and goal endpoints.

use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    response::Html,
    Json,
};
use serde_json::Value;

use crate::cache::{CacheCoordinator, DistributedCache};
use crate::error::{AppError, Result};
use crate::models::{
    BulkResponse, Collection, GoalRequest, HealthResponse, MessageResponse, QuizRequest, Snapshot,
    StatsResponse,
};
use crate::render::Templates;
use crate::service::RecordService;
use crate::store::DurableStore;

/// Greeting served at the root path.
pub const WELCOME: &str = "Welcome to quiz/goal API!";

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    pub records: Arc<RecordService>,
}

impl AppState {
    pub fn new(records: RecordService) -> Self {
        Self {
            records: Arc::new(records),
        }
    }

    /// Wires a coordinator over the given tiers with default settings.
    pub fn with_backends(
        store: Arc<dyn DurableStore>,
        distributed: Arc<dyn DistributedCache>,
        templates: Templates,
    ) -> Self {
        let coordinator = CacheCoordinator::new(store, distributed);
        Self::new(RecordService::new(Arc::new(coordinator), templates))
    }
}

// == Root ==
pub async fn root_handler() -> &'static str {
    WELCOME
}

// == Create ==
/// Handler for POST /quiz
pub async fn create_quiz_handler(
    State(state): State<AppState>,
    payload: std::result::Result<Json<QuizRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<MessageResponse>)> {
    let Json(req) = payload.map_err(|e| AppError::rejected(e, QuizRequest::SHAPE))?;
    state.records.create_quiz(&req).await?;
    Ok((StatusCode::CREATED, Json(MessageResponse::created())))
}

/// Handler for POST /goal
pub async fn create_goal_handler(
    State(state): State<AppState>,
    payload: std::result::Result<Json<GoalRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<MessageResponse>)> {
    let Json(req) = payload.map_err(|e| AppError::rejected(e, GoalRequest::SHAPE))?;
    state.records.create_goal(&req).await?;
    Ok((StatusCode::CREATED, Json(MessageResponse::created())))
}

/// Handler for POST /goal/uploadJSON
///
/// The batch is rejected as a whole if any entry fails validation.
pub async fn upload_goals_handler(
    State(state): State<AppState>,
    payload: std::result::Result<Json<Vec<GoalRequest>>, JsonRejection>,
) -> Result<Json<BulkResponse>> {
    let Json(requests) =
        payload.map_err(|e| AppError::rejected(e, &format!("[{}]", GoalRequest::SHAPE)))?;
    let count = state.records.bulk_create_goals(&requests).await?;
    Ok(Json(BulkResponse::new(count)))
}

// == List ==
async fn list(state: &AppState, collection: Collection) -> Result<Json<Arc<Snapshot>>> {
    Ok(Json(state.records.list_records(collection).await?))
}

async fn render(state: &AppState, collection: Collection) -> Result<Html<String>> {
    Ok(Html(state.records.render_list(collection).await?))
}

/// Handler for GET /quiz
pub async fn list_quiz_handler(State(state): State<AppState>) -> Result<Json<Arc<Snapshot>>> {
    list(&state, Collection::Quiz).await
}

/// Handler for GET /goal
pub async fn list_goal_handler(State(state): State<AppState>) -> Result<Json<Arc<Snapshot>>> {
    list(&state, Collection::Goal).await
}

/// Handler for GET /quiz/render
pub async fn render_quiz_handler(State(state): State<AppState>) -> Result<Html<String>> {
    render(&state, Collection::Quiz).await
}

/// Handler for GET /goal/render
pub async fn render_goal_handler(State(state): State<AppState>) -> Result<Html<String>> {
    render(&state, Collection::Goal).await
}

// == Point Reads ==
/// Handler for GET /quiz/:email
pub async fn get_quiz_handler(
    State(state): State<AppState>,
    Path(email): Path<String>,
) -> Result<Json<Value>> {
    Ok(Json(state.records.get_record(Collection::Quiz, &email).await?))
}

/// Handler for GET /goal/:email
pub async fn get_goal_handler(
    State(state): State<AppState>,
    Path(email): Path<String>,
) -> Result<Json<Value>> {
    Ok(Json(state.records.get_record(Collection::Goal, &email).await?))
}

// == Delete ==
/// Handler for DELETE /quiz/:email
pub async fn delete_quiz_handler(
    State(state): State<AppState>,
    Path(email): Path<String>,
) -> Result<Json<MessageResponse>> {
    state.records.delete_record(Collection::Quiz, &email).await?;
    Ok(Json(MessageResponse::deleted()))
}

/// Handler for DELETE /goal/:email
pub async fn delete_goal_handler(
    State(state): State<AppState>,
    Path(email): Path<String>,
) -> Result<Json<MessageResponse>> {
    state.records.delete_record(Collection::Goal, &email).await?;
    Ok(Json(MessageResponse::deleted()))
}

/// Handler for GET and DELETE on `/quiz/` and `/goal/` with no email segment
pub async fn missing_email_handler() -> AppError {
    AppError::MissingEmail
}

// == Operational ==
/// Handler for GET /stats
pub async fn stats_handler(State(state): State<AppState>) -> Json<StatsResponse> {
    Json(state.records.stats().into())
}

/// Handler for GET /health
pub async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse::healthy())
}
