//! Batch lifecycle endpoints: upload, observe, reset, retry, image bytes

use axum::{
    extract::{Multipart, Path, State},
    http::header,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::processing::{BatchState, JobInput};
use crate::server::state::AppState;
use crate::types::{BatchProgress, ImageBlob, ImageJob, JobStatus, Operation, Quality};

/// Observable batch state returned by every batch endpoint
#[derive(Debug, Serialize)]
pub struct BatchView {
    pub generation: u64,
    pub operation: Option<Operation>,
    pub quality: Quality,
    pub progress: BatchProgress,
    pub selected: Vec<Uuid>,
    pub jobs: Vec<JobView>,
}

/// One job record as the presentation layer sees it
#[derive(Debug, Serialize)]
pub struct JobView {
    pub id: Uuid,
    pub filename: String,
    pub status: JobStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub source_url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output_url: Option<String>,
}

impl BatchView {
    pub fn from_state(state: &BatchState) -> Self {
        let selected = state
            .jobs
            .iter()
            .filter(|j| state.selection.contains(&j.id))
            .map(|j| j.id)
            .collect();
        Self {
            generation: state.generation,
            operation: state.operation,
            quality: state.quality,
            progress: state.progress(),
            selected,
            jobs: state.jobs.iter().map(JobView::from_job).collect(),
        }
    }
}

impl JobView {
    fn from_job(job: &ImageJob) -> Self {
        Self {
            id: job.id,
            filename: job.filename.clone(),
            status: job.status,
            error: job.error.clone(),
            source_url: format!("/api/batch/jobs/{}/source", job.id),
            output_url: job
                .output
                .as_ref()
                .map(|_| format!("/api/batch/jobs/{}/output", job.id)),
        }
    }
}

fn parse_operation(text: &str) -> Result<Operation> {
    serde_json::from_value(serde_json::Value::String(text.trim().to_string()))
        .map_err(|_| Error::InvalidRequest(format!("Unknown operation '{}'", text.trim())))
}

fn parse_quality(text: &str) -> Result<Quality> {
    serde_json::from_value(serde_json::Value::String(text.trim().to_string()))
        .map_err(|_| Error::InvalidRequest(format!("Unknown quality '{}'", text.trim())))
}

/// POST /api/batch - Upload images and start processing
pub async fn start_batch(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<BatchView>> {
    let mut operation: Option<Operation> = None;
    let mut quality = Quality::default();
    let mut uploads = Vec::new();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| Error::InvalidRequest(format!("Failed to read multipart field: {}", e)))?
    {
        let name = field.name().unwrap_or("").to_string();

        match name.as_str() {
            "operation" => {
                let text = field.text().await.map_err(|e| {
                    Error::InvalidRequest(format!("Failed to read operation: {}", e))
                })?;
                operation = Some(parse_operation(&text)?);
            }
            "quality" => {
                let text = field.text().await.map_err(|e| {
                    Error::InvalidRequest(format!("Failed to read quality: {}", e))
                })?;
                quality = parse_quality(&text)?;
            }
            _ => {
                let filename = field
                    .file_name()
                    .map(|s| s.to_string())
                    .unwrap_or_else(|| format!("image-{}.png", Uuid::new_v4()));
                let media_type = field
                    .content_type()
                    .map(|s| s.to_string())
                    .unwrap_or_else(|| {
                        mime_guess::from_path(&filename)
                            .first_or_octet_stream()
                            .to_string()
                    });
                let data = field.bytes().await.map_err(|e| {
                    Error::InvalidRequest(format!("Failed to read '{}': {}", filename, e))
                })?;

                tracing::info!("Received upload: {} ({} bytes)", filename, data.len());
                uploads.push(JobInput {
                    filename,
                    source: ImageBlob::new(data, media_type),
                });
            }
        }
    }

    let operation =
        operation.ok_or_else(|| Error::InvalidRequest("Missing 'operation' field".to_string()))?;

    let snapshot = state
        .controller()
        .start_batch(operation, quality, uploads)
        .await?;
    Ok(Json(BatchView::from_state(&snapshot)))
}

/// GET /api/batch - Current batch state
pub async fn get_batch(State(state): State<AppState>) -> Json<BatchView> {
    Json(BatchView::from_state(&state.controller().snapshot()))
}

/// DELETE /api/batch - Discard the batch
pub async fn reset_batch(State(state): State<AppState>) -> Json<BatchView> {
    Json(BatchView::from_state(&state.controller().reset()))
}

/// POST /api/batch/jobs/:id/retry - Re-enqueue one terminal job
pub async fn retry_job(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<BatchView>> {
    let snapshot = state.controller().retry_job(id).await?;
    Ok(Json(BatchView::from_state(&snapshot)))
}

/// GET /api/batch/jobs/:id/source - Original image bytes
pub async fn job_source(State(state): State<AppState>, Path(id): Path<Uuid>) -> Result<Response> {
    let snapshot = state.controller().snapshot();
    let job = snapshot
        .job(id)
        .ok_or_else(|| Error::JobNotFound(id.to_string()))?;
    Ok(image_response(&job.source))
}

/// GET /api/batch/jobs/:id/output - Transformed image bytes
pub async fn job_output(State(state): State<AppState>, Path(id): Path<Uuid>) -> Result<Response> {
    let snapshot = state.controller().snapshot();
    let job = snapshot
        .job(id)
        .ok_or_else(|| Error::JobNotFound(id.to_string()))?;
    let output = job
        .output
        .as_ref()
        .ok_or_else(|| Error::JobNotFound(format!("Job {} has no output yet", id)))?;
    Ok(image_response(output))
}

fn image_response(blob: &ImageBlob) -> Response {
    (
        [(header::CONTENT_TYPE, blob.media_type.clone())],
        blob.data.clone(),
    )
        .into_response()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_operation_accepts_wire_names() {
        assert_eq!(
            parse_operation("watermark-removal").unwrap(),
            Operation::WatermarkRemoval
        );
        assert_eq!(
            parse_operation(" background-removal \n").unwrap(),
            Operation::BackgroundRemoval
        );
        assert!(parse_operation("sharpen").is_err());
    }

    #[test]
    fn test_parse_quality() {
        assert_eq!(parse_quality("high").unwrap(), Quality::High);
        assert!(parse_quality("ultra").is_err());
    }

    #[test]
    fn test_view_exposes_output_url_only_when_present() {
        let mut state = BatchState::new_batch(
            1,
            Operation::BackgroundRemoval,
            Quality::Medium,
            vec![
                ("a.png".to_string(), ImageBlob::new(vec![1u8], "image/png")),
                ("b.png".to_string(), ImageBlob::new(vec![2u8], "image/png")),
            ],
        );
        let done = state.jobs[0].id;
        state.mark_processing(done);
        state.complete_job(done, ImageBlob::new(vec![3u8], "image/png"));

        let view = BatchView::from_state(&state);
        assert!(view.jobs[0].output_url.is_some());
        assert!(view.jobs[1].output_url.is_none());
        assert_eq!(view.progress, BatchProgress { completed: 1, total: 2 });
    }
}
