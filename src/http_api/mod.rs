use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, patch, post},
};
use chrono::NaiveDate;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::persistence::SnapshotStore;
use crate::placement::{DependentMovePolicy, PlacementError};
use crate::projection::{ScheduleProjection, TaskView};
use crate::row::{RegistryError, RowId, RowKind};
use crate::session::{EngineError, ScheduleSession, TransactionError};
use crate::task::{NewTask, TaskEdit, TaskId};

#[derive(Clone)]
pub struct AppState {
    session: Arc<RwLock<ScheduleSession>>,
    store: Arc<dyn SnapshotStore + Send + Sync>,
}

impl AppState {
    pub fn new(session: ScheduleSession, store: Arc<dyn SnapshotStore + Send + Sync>) -> Self {
        Self {
            session: Arc::new(RwLock::new(session)),
            store,
        }
    }
}

#[derive(Debug, Serialize)]
struct ErrorBody<'a> {
    error: &'a str,
    message: String,
}

#[derive(Debug)]
enum ApiError {
    NotFound(String),
    Forbidden(String),
    Conflict(String),
    Invalid(String),
}

impl From<EngineError> for ApiError {
    fn from(err: EngineError) -> Self {
        let message = err.to_string();
        match &err {
            EngineError::TaskNotFound(_)
            | EngineError::Placement(PlacementError::RowNotFound(_))
            | EngineError::Registry(RegistryError::RowNotFound(_)) => ApiError::NotFound(message),
            EngineError::PermissionDenied => ApiError::Forbidden(message),
            EngineError::Transaction(TransactionError::CommitInProgress) => {
                ApiError::Conflict(message)
            }
            _ => ApiError::Invalid(message),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error, message) = match self {
            ApiError::NotFound(message) => (StatusCode::NOT_FOUND, "not_found", message),
            ApiError::Forbidden(message) => (StatusCode::FORBIDDEN, "forbidden", message),
            ApiError::Conflict(message) => (StatusCode::CONFLICT, "conflict", message),
            ApiError::Invalid(message) => (StatusCode::BAD_REQUEST, "invalid_request", message),
        };
        let body = Json(ErrorBody { error, message });
        (status, body).into_response()
    }
}

#[derive(Debug, Deserialize)]
struct MovePayload {
    row_id: RowId,
    start_date: NaiveDate,
    #[serde(default)]
    cascade: bool,
}

#[derive(Debug, Deserialize)]
struct ResizePayload {
    end_date: NaiveDate,
    #[serde(default)]
    cascade: bool,
}

#[derive(Debug, Deserialize)]
struct DependencyPayload {
    on: TaskId,
}

#[derive(Debug, Deserialize)]
struct AddRowPayload {
    kind: RowKind,
}

#[derive(Debug, Deserialize)]
struct RenameRowPayload {
    label: String,
}

#[derive(Debug, Deserialize)]
struct AddHolidayPayload {
    name: String,
    start_date: NaiveDate,
    end_date: NaiveDate,
}

fn policy(cascade: bool) -> DependentMovePolicy {
    if cascade {
        DependentMovePolicy::Cascade
    } else {
        DependentMovePolicy::Reject
    }
}

fn task_view(projection: &ScheduleProjection, id: TaskId) -> Result<TaskView, ApiError> {
    projection
        .task(id)
        .cloned()
        .ok_or_else(|| ApiError::NotFound(format!("task {id} not found")))
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/schedule", get(get_schedule))
        .route("/schedule/commit", post(commit))
        .route("/schedule/discard", post(discard))
        .route("/schedule/undo", post(undo))
        .route("/schedule/redo", post(redo))
        .route("/tasks", get(list_tasks).post(create_task))
        .route("/tasks/:id", get(get_task).patch(edit_task).delete(delete_task))
        .route("/tasks/:id/move", post(move_task))
        .route("/tasks/:id/resize", post(resize_task))
        .route("/tasks/:id/dependencies", post(add_dependency))
        .route("/tasks/:id/dependencies/:dep", axum::routing::delete(remove_dependency))
        .route("/rows", post(add_row))
        .route("/rows/:id", patch(rename_row).delete(delete_row))
        .route("/holidays", get(list_holidays).post(add_holiday))
        .with_state(state)
}

async fn get_schedule(State(state): State<AppState>) -> Json<ScheduleProjection> {
    Json(state.session.read().projection())
}

async fn list_tasks(State(state): State<AppState>) -> Json<Vec<TaskView>> {
    Json(state.session.read().projection().tasks)
}

async fn get_task(
    State(state): State<AppState>,
    Path(id): Path<TaskId>,
) -> Result<Json<TaskView>, ApiError> {
    let projection = state.session.read().projection();
    task_view(&projection, id).map(Json)
}

async fn create_task(
    State(state): State<AppState>,
    Json(new_task): Json<NewTask>,
) -> Result<(StatusCode, Json<TaskView>), ApiError> {
    let mut session = state.session.write();
    let id = session.add_task(new_task)?;
    let projection = session.projection();
    Ok((StatusCode::CREATED, Json(task_view(&projection, id)?)))
}

async fn edit_task(
    State(state): State<AppState>,
    Path(id): Path<TaskId>,
    Json(edit): Json<TaskEdit>,
) -> Result<Json<TaskView>, ApiError> {
    let mut session = state.session.write();
    session.edit_task(id, edit)?;
    let projection = session.projection();
    task_view(&projection, id).map(Json)
}

async fn delete_task(
    State(state): State<AppState>,
    Path(id): Path<TaskId>,
) -> Result<StatusCode, ApiError> {
    state.session.write().delete_task(id)?;
    Ok(StatusCode::NO_CONTENT)
}

async fn move_task(
    State(state): State<AppState>,
    Path(id): Path<TaskId>,
    Json(payload): Json<MovePayload>,
) -> Result<Json<TaskView>, ApiError> {
    let mut session = state.session.write();
    session.move_task(id, payload.row_id, payload.start_date, policy(payload.cascade))?;
    let projection = session.projection();
    task_view(&projection, id).map(Json)
}

async fn resize_task(
    State(state): State<AppState>,
    Path(id): Path<TaskId>,
    Json(payload): Json<ResizePayload>,
) -> Result<Json<TaskView>, ApiError> {
    let mut session = state.session.write();
    session.resize_task(id, payload.end_date, policy(payload.cascade))?;
    let projection = session.projection();
    task_view(&projection, id).map(Json)
}

async fn add_dependency(
    State(state): State<AppState>,
    Path(id): Path<TaskId>,
    Json(payload): Json<DependencyPayload>,
) -> Result<Json<TaskView>, ApiError> {
    let mut session = state.session.write();
    session.add_dependency(payload.on, id)?;
    let projection = session.projection();
    task_view(&projection, id).map(Json)
}

async fn remove_dependency(
    State(state): State<AppState>,
    Path((id, dep)): Path<(TaskId, TaskId)>,
) -> Result<StatusCode, ApiError> {
    state.session.write().remove_dependency(dep, id)?;
    Ok(StatusCode::NO_CONTENT)
}

async fn add_row(
    State(state): State<AppState>,
    Json(payload): Json<AddRowPayload>,
) -> Result<(StatusCode, Json<serde_json::Value>), ApiError> {
    let mut session = state.session.write();
    let id = session.add_row(payload.kind)?;
    Ok((
        StatusCode::CREATED,
        Json(json!({ "id": id.to_string() })),
    ))
}

async fn rename_row(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(payload): Json<RenameRowPayload>,
) -> Result<StatusCode, ApiError> {
    let row_id: RowId = id
        .parse()
        .map_err(|err: crate::row::RowIdParseError| ApiError::Invalid(err.to_string()))?;
    state.session.write().rename_row(row_id, payload.label)?;
    Ok(StatusCode::OK)
}

#[derive(Debug, Deserialize)]
struct DeleteRowQuery {
    #[serde(default)]
    cascade: bool,
}

async fn delete_row(
    State(state): State<AppState>,
    Path(id): Path<String>,
    axum::extract::Query(query): axum::extract::Query<DeleteRowQuery>,
) -> Result<StatusCode, ApiError> {
    let row_id: RowId = id
        .parse()
        .map_err(|err: crate::row::RowIdParseError| ApiError::Invalid(err.to_string()))?;
    state.session.write().delete_row(row_id, query.cascade)?;
    Ok(StatusCode::NO_CONTENT)
}

async fn list_holidays(State(state): State<AppState>) -> Json<serde_json::Value> {
    let session = state.session.read();
    let holidays: Vec<_> = session.overlay().holidays().cloned().collect();
    Json(json!({ "holidays": holidays }))
}

async fn add_holiday(
    State(state): State<AppState>,
    Json(payload): Json<AddHolidayPayload>,
) -> Result<(StatusCode, Json<serde_json::Value>), ApiError> {
    let mut session = state.session.write();
    let id = session.add_holiday(payload.name, payload.start_date, payload.end_date)?;
    Ok((StatusCode::CREATED, Json(json!({ "id": id }))))
}

async fn undo(State(state): State<AppState>) -> Result<Json<serde_json::Value>, ApiError> {
    let undone = state.session.write().undo()?;
    Ok(Json(json!({ "undone": undone })))
}

async fn redo(State(state): State<AppState>) -> Result<Json<serde_json::Value>, ApiError> {
    let redone = state.session.write().redo()?;
    Ok(Json(json!({ "redone": redone })))
}

async fn commit(State(state): State<AppState>) -> Result<Json<serde_json::Value>, ApiError> {
    let mut session = state.session.write();
    session.commit(state.store.as_ref())?;
    Ok(Json(json!({ "committed": true })))
}

async fn discard(State(state): State<AppState>) -> Result<Json<serde_json::Value>, ApiError> {
    state.session.write().discard()?;
    Ok(Json(json!({ "discarded": true })))
}
