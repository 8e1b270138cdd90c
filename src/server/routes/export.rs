//! Export endpoints: single-file and archive downloads

use axum::{
    extract::{Path, Query, State},
    http::header,
    response::{IntoResponse, Response},
};
use bytes::Bytes;
use serde::Deserialize;
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::export::{build_archive, convert_image, export_filename, ExportFormat, ARCHIVE_NAME};
use crate::server::state::AppState;

#[derive(Debug, Deserialize)]
pub struct ExportQuery {
    #[serde(default)]
    pub format: ExportFormat,
}

/// GET /api/export/jobs/:id?format= - Download one converted output
pub async fn export_job(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Query(query): Query<ExportQuery>,
) -> Result<Response> {
    let snapshot = state.controller().snapshot();
    let job = snapshot
        .job(id)
        .ok_or_else(|| Error::JobNotFound(id.to_string()))?;
    if !job.is_done() {
        return Err(Error::InvalidRequest(format!(
            "Job {} is not done (status: {:?})",
            id, job.status
        )));
    }
    let output = job
        .output
        .as_ref()
        .ok_or_else(|| Error::JobNotFound(format!("Job {} has no stored output", id)))?;

    let converted = convert_image(output, query.format)?;
    let filename = export_filename(&job.filename, query.format);
    tracing::info!("Exporting job {} as {}", id, filename);

    Ok(attachment(
        converted.data.clone(),
        &converted.media_type,
        &filename,
    ))
}

/// GET /api/export/archive?format= - Download the selection as one zip
///
/// An empty selection yields a valid zero-entry archive, not an error.
pub async fn export_archive(
    State(state): State<AppState>,
    Query(query): Query<ExportQuery>,
) -> Result<Response> {
    let snapshot = state.controller().snapshot();
    let selected = snapshot.selected_outputs();
    let count = selected.len();

    let bytes = build_archive(&selected, query.format)?;
    tracing::info!(
        "Exporting archive: {} selected outputs as {:?}",
        count,
        query.format
    );

    Ok(attachment(bytes.into(), "application/zip", ARCHIVE_NAME))
}

fn attachment(data: Bytes, media_type: &str, filename: &str) -> Response {
    (
        [
            (header::CONTENT_TYPE, media_type.to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{}\"", filename),
            ),
        ],
        data,
    )
        .into_response()
}
