//! Upload handler: `POST /api/upload`.

use axum::extract::multipart::MultipartRejection;
use axum::extract::{Multipart, State};
use axum::Json;
use petreel_models::{stages, ModelError, TaskId, TaskRecord, UploadFields, VideoJob};
use serde::Serialize;
use tracing::{debug, error, info, warn};

use crate::error::{ApiError, ApiResult};
use crate::metrics;
use crate::state::AppState;

const UPLOAD_ACCEPTED: &str =
    "Upload successful, processing queued. You will receive an email with the video link.";
const QUEUE_FAILED: &str = "Failed to queue task for processing";
const UPLOAD_FAILED: &str = "Upload failed due to an unexpected error";

/// Upload response.
#[derive(Debug, Serialize)]
pub struct UploadResponse {
    pub success: bool,
    pub task_id: TaskId,
    pub message: &'static str,
}

/// Raw form fields.
#[derive(Debug, Default)]
struct UploadForm {
    photo: Vec<u8>,
    photo_name: Option<String>,
    message: Option<String>,
    email: Option<String>,
}

/// Accept a photo, prompt and email, record the task and hand it to the
/// pipeline. Returns as soon as the job is submitted.
pub async fn upload(
    State(state): State<AppState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> ApiResult<Json<UploadResponse>> {
    let multipart = multipart.map_err(|e| {
        debug!("Rejected upload body: {}", e);
        ApiError::from(ModelError::MissingFields)
    })?;
    let form = read_form(multipart, state.config.max_body_size).await?;

    let fields = UploadFields::from_parts(
        form.photo_name,
        form.photo.len(),
        form.message,
        form.email,
    )?;

    let id = TaskId::new();
    let record = persist_inputs(&state, &id, &fields, form.photo)
        .await
        .map_err(|e| {
            error!(task_id = %id, "Failed to persist upload: {}", e);
            ApiError::internal(UPLOAD_FAILED)
        })?;
    metrics::record_upload(state.artifacts.backend());

    let job = VideoJob::new(
        id.clone(),
        record.photo_location,
        fields.message.clone(),
        fields.email.clone(),
    );
    let submitter = state.submitter.name();

    match state.submitter.submit(&job).await {
        Ok(()) => {
            metrics::record_job_submitted(submitter);
            append_log(&state, &id, &format!("Task submitted to {submitter} pipeline")).await;

            let mut queued = record.record.clone();
            queued.mark_queued(state.mark_queued);
            if let Err(e) = state
                .status
                .write_if_unchanged(&id, &record.record, queued)
                .await
            {
                // The job is already with the pipeline; the record catches up later.
                warn!(task_id = %id, "Failed to record queued state: {}", e);
            }

            info!(task_id = %id, submitter, "Upload accepted");
            Ok(Json(UploadResponse {
                success: true,
                task_id: id,
                message: UPLOAD_ACCEPTED,
            }))
        }
        Err(e) => {
            error!(task_id = %id, submitter, "Failed to submit job: {}", e);
            metrics::record_job_submit_failed(submitter);

            let mut failed = record.record.clone();
            failed.fail(stages::QUEUE_FAILED, e.to_string());
            if let Err(write_err) = state.status.write(&id, &failed).await {
                error!(task_id = %id, "Failed to record queue failure: {}", write_err);
            }
            append_log(&state, &id, &format!("Failed to queue task: {e}")).await;

            Err(ApiError::internal(QUEUE_FAILED))
        }
    }
}

/// Files written for a new upload.
struct PersistedUpload {
    record: TaskRecord,
    photo_location: String,
}

async fn persist_inputs(
    state: &AppState,
    id: &TaskId,
    fields: &UploadFields,
    photo: Vec<u8>,
) -> Result<PersistedUpload, petreel_storage::StorageError> {
    state.status.layout().ensure_dir().await?;

    let photo_location = state
        .artifacts
        .store_photo(id, &fields.extension(), photo)
        .await?;
    state
        .status
        .write_inputs(id, &fields.message, &fields.email)
        .await?;

    let record = TaskRecord::pending(Some(fields.email.clone()));
    state.status.write(id, &record).await?;

    state
        .task_log
        .create(
            id,
            &[
                format!("Task {id} queued for processing"),
                format!("Email: {}", fields.email),
            ],
        )
        .await?;

    Ok(PersistedUpload {
        record,
        photo_location,
    })
}

async fn append_log(state: &AppState, id: &TaskId, line: &str) {
    if let Err(e) = state.task_log.append(id, line).await {
        warn!(task_id = %id, "Failed to write task log: {}", e);
    }
}

/// Collect the form fields. Unknown fields are ignored.
async fn read_form(mut multipart: Multipart, max_photo_size: usize) -> ApiResult<UploadForm> {
    let mut form = UploadForm::default();

    while let Some(mut field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::bad_request(format!("Failed to read multipart field: {e}")))?
    {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "dogPhoto" | "photo" => {
                form.photo_name = field.file_name().map(str::to_string);
                let mut data = Vec::new();
                while let Some(chunk) = field
                    .chunk()
                    .await
                    .map_err(|e| ApiError::bad_request(format!("Failed to read photo: {e}")))?
                {
                    data.extend_from_slice(&chunk);
                    if data.len() > max_photo_size {
                        return Err(ApiError::bad_request(format!(
                            "Photo too large: exceeds {} bytes",
                            max_photo_size
                        )));
                    }
                }
                form.photo = data;
            }
            "message" | "text" | "email" => {
                let value = field
                    .text()
                    .await
                    .map_err(|e| ApiError::bad_request(format!("Failed to read {name}: {e}")))?;
                if name == "email" {
                    form.email = Some(value);
                } else {
                    form.message = Some(value);
                }
            }
            other => debug!(field = other, "Ignoring unknown upload field"),
        }
    }

    Ok(form)
}
