//! Status handler: `GET /api/status/:id`.

use axum::extract::{Path, State};
use axum::Json;
use petreel_models::{is_valid_task_id, TaskId, TaskRecord};
use tracing::{debug, error};

use crate::error::{ApiError, ApiResult, TASK_NOT_FOUND};
use crate::services::Reconciler;
use crate::state::AppState;

/// Return a task's record, reconciled against the results list, the task
/// log and the files on disk.
pub async fn get_status(
    State(state): State<AppState>,
    Path(task_id): Path<String>,
) -> ApiResult<Json<TaskRecord>> {
    if !is_valid_task_id(&task_id) {
        return Err(ApiError::not_found(TASK_NOT_FOUND));
    }
    let id = TaskId::from(task_id);

    match load_status(&state, &id).await {
        Ok(Some(record)) => Ok(Json(record)),
        Ok(None) => Err(ApiError::not_found(TASK_NOT_FOUND)),
        Err(e) => {
            error!(task_id = %id, "Failed to check status: {}", e);
            Err(ApiError::StatusCheckFailed)
        }
    }
}

async fn load_status(state: &AppState, id: &TaskId) -> ApiResult<Option<TaskRecord>> {
    if let Some(record) = state.status.read(id).await? {
        return Reconciler::new(state, id).run(record).await.map(Some);
    }

    if state.status.inputs_exist(id).await? {
        debug!(task_id = %id, "Inputs present without a status file");
        return Ok(Some(TaskRecord::initializing()));
    }
    Ok(None)
}
