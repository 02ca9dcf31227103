use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::Response,
};
use std::path::Path as StdPath;
use tokio_util::io::ReaderStream;

use crate::errors::{AppError, Result};
use crate::state::AppState;

/// GET /api/payment/proof/:file_name
///
/// Streams a stored payment screenshot back to the admin dashboard.
pub async fn serve_proof(
    State(state): State<AppState>,
    Path(file_name): Path<String>,
) -> Result<Response> {
    // Security: prevent path traversal
    if file_name.contains("..") || file_name.contains('/') || file_name.contains('\\') {
        return Err(AppError::DocumentNotFound);
    }

    let file_path = format!("{}/payment_proofs/{}", state.upload_dir, file_name);

    // Check if file exists and is a file (not a directory)
    if !StdPath::new(&file_path).is_file() {
        return Err(AppError::DocumentNotFound);
    }

    let file = tokio::fs::File::open(&file_path)
        .await
        .map_err(|_| AppError::DocumentNotFound)?;

    let stream = ReaderStream::new(file);

    let content_type = if file_path.ends_with(".png") {
        "image/png"
    } else if file_path.ends_with(".jpg") || file_path.ends_with(".jpeg") {
        "image/jpeg"
    } else if file_path.ends_with(".gif") {
        "image/gif"
    } else {
        "application/octet-stream"
    };

    let response = Response::builder()
        .status(StatusCode::OK)
        .header("content-type", content_type)
        .header("cache-control", "private, max-age=0")
        .body(axum::body::Body::from_stream(stream))
        .unwrap();

    Ok(response)
}
