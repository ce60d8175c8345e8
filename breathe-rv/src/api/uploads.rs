//! Serving of stored upload content
//!
//! Resolution goes through the content store so traversal attempts fail
//! before any file is opened.

use axum::{
    extract::{Path, State},
    http::header,
    response::{IntoResponse, Response},
    routing::get,
    Router,
};

use crate::error::{ApiError, ApiResult};
use crate::services::content_store::Partition;
use crate::AppState;

/// Build upload-serving routes
pub fn upload_routes() -> Router<AppState> {
    Router::new().route("/uploads/:status/*filename", get(serve_upload))
}

/// GET /uploads/:status/*filename
///
/// The status segment selects the partition; approved and finalized resolve
/// against the verified partition since the stored file never moves. The
/// filename may include the proofs sub-path.
pub async fn serve_upload(
    State(state): State<AppState>,
    Path((status, filename)): Path<(String, String)>,
) -> ApiResult<Response> {
    let partition = Partition::from_status_segment(&status)
        .ok_or_else(|| ApiError::BadRequest("Invalid status".to_string()))?;

    let path = state.store.resolve(partition, &filename)?;

    let bytes = tokio::fs::read(&path).await.map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            ApiError::NotFound("No stored content".to_string())
        } else {
            tracing::error!(error = %e, "Failed reading stored content");
            ApiError::Internal("IO failure".to_string())
        }
    })?;

    let content_type = infer::get(&bytes)
        .map(|kind| kind.mime_type())
        .unwrap_or("application/octet-stream");

    Ok(([(header::CONTENT_TYPE, content_type)], bytes).into_response())
}
