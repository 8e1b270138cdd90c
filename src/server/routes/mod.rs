//! API routes for the batch retouch server

pub mod batch;
pub mod export;
pub mod selection;

use axum::{
    extract::DefaultBodyLimit,
    routing::{delete, get, post},
    Router,
};

use crate::server::state::AppState;

/// Build all API routes
pub fn api_routes(max_upload_size: usize) -> Router<AppState> {
    Router::new()
        // Batch lifecycle - upload gets a larger body limit
        .route(
            "/batch",
            post(batch::start_batch).layer(DefaultBodyLimit::max(max_upload_size)),
        )
        .route("/batch", get(batch::get_batch).delete(batch::reset_batch))
        .route("/batch/jobs/:id/retry", post(batch::retry_job))
        .route("/batch/jobs/:id/source", get(batch::job_source))
        .route("/batch/jobs/:id/output", get(batch::job_output))
        // Selection
        .route("/selection/:id/toggle", post(selection::toggle))
        .route("/selection/select-all", post(selection::select_all))
        .route("/selection", delete(selection::clear))
        // Export
        .route("/export/jobs/:id", get(export::export_job))
        .route("/export/archive", get(export::export_archive))
        // Info
        .route("/info", get(info))
}

/// API info endpoint
async fn info() -> axum::Json<serde_json::Value> {
    axum::Json(serde_json::json!({
        "name": "batch-retouch",
        "version": env!("CARGO_PKG_VERSION"),
        "description": "Batch image retouching with watermark and background removal",
        "endpoints": {
            "POST /api/batch": "Upload images and start processing",
            "GET /api/batch": "Current batch state and progress",
            "DELETE /api/batch": "Discard the batch",
            "POST /api/batch/jobs/:id/retry": "Re-enqueue one finished job",
            "GET /api/batch/jobs/:id/source": "Original image bytes",
            "GET /api/batch/jobs/:id/output": "Transformed image bytes",
            "POST /api/selection/:id/toggle": "Toggle selection of a done job",
            "POST /api/selection/select-all": "Select all done jobs",
            "DELETE /api/selection": "Clear the selection",
            "GET /api/export/jobs/:id": "Download one converted output",
            "GET /api/export/archive": "Download the selection as a zip"
        },
        "operations": ["watermark-removal", "background-removal"],
        "formats": ["png", "jpeg", "webp"]
    }))
}
