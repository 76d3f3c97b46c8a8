//! Result handler: `GET /api/result/:id`.

use axum::body::Body;
use axum::extract::{Path, State};
use axum::http::{header, HeaderValue};
use axum::response::{IntoResponse, Response};
use petreel_models::{is_valid_task_id, TaskId};
use tokio_util::io::ReaderStream;
use tracing::{error, info, warn};

use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

const RESULT_NOT_FOUND: &str = "Result not found";

/// Download name offered to the browser.
pub fn download_filename(id: &TaskId) -> String {
    format!("dog_birthday_card_{id}.mp4")
}

/// Stream the generated video for a task.
pub async fn get_result(
    State(state): State<AppState>,
    Path(task_id): Path<String>,
) -> ApiResult<Response> {
    if !is_valid_task_id(&task_id) {
        return Err(ApiError::not_found(RESULT_NOT_FOUND));
    }
    let id = TaskId::from(task_id);

    // An unreadable record only costs us its videoPath hint.
    let record = match state.status.read(&id).await {
        Ok(record) => record,
        Err(e) => {
            warn!(task_id = %id, "Ignoring unreadable status record: {}", e);
            None
        }
    };

    let path = state
        .videos
        .resolve(&id, record.as_ref())
        .await?
        .ok_or_else(|| ApiError::not_found(RESULT_NOT_FOUND))?;

    let file = tokio::fs::File::open(&path).await.map_err(|e| {
        error!(task_id = %id, "Failed to open {}: {}", path.display(), e);
        ApiError::not_found(RESULT_NOT_FOUND)
    })?;
    let len = file.metadata().await.map(|m| m.len()).ok();

    info!(task_id = %id, "Serving video {}", path.display());

    let body = Body::from_stream(ReaderStream::new(file));
    let mut headers = vec![
        (header::CONTENT_TYPE, "video/mp4".to_string()),
        (
            header::CONTENT_DISPOSITION,
            format!("attachment; filename=\"{}\"", download_filename(&id)),
        ),
    ];
    if let Some(len) = len {
        headers.push((header::CONTENT_LENGTH, len.to_string()));
    }

    let mut response = body.into_response();
    for (name, value) in headers {
        if let Ok(value) = HeaderValue::from_str(&value) {
            response.headers_mut().insert(name, value);
        }
    }
    Ok(response)
}
