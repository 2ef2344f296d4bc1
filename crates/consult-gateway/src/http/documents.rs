//! `/session/{id}/documents/upload` (§4.9).

use std::sync::Arc;

use axum::extract::{Multipart, Path, State};
use axum::Json;
use serde::Serialize;
use tracing::warn;

use consult_documents::UploadedFile;

use crate::app::AppState;
use crate::http::error::{bad_request, ApiError};

#[derive(Serialize)]
pub struct UploadResponse {
    pub summary: String,
    pub documents: usize,
}

/// Parses the multipart body into [`UploadedFile`]s, runs the upload
/// pipeline, persists the resulting context, and drives extraction
/// synchronously — `on_document_context_updated` already backgrounds the
/// actual extraction work internally, so no further spawn is needed here.
pub async fn upload_documents(
    State(state): State<Arc<AppState>>,
    Path(session_id): Path<String>,
    mut multipart: Multipart,
) -> Result<Json<UploadResponse>, ApiError> {
    let mut files = Vec::new();

    while let Some(field) = multipart.next_field().await.map_err(|e| bad_request(e.to_string()))? {
        let filename = field.file_name().unwrap_or("upload").to_string();
        let content_type = field.content_type().map(str::to_string);
        let bytes = field.bytes().await.map_err(|e| bad_request(e.to_string()))?;
        files.push(UploadedFile { filename, content_type, bytes: bytes.to_vec() });
    }

    if files.is_empty() {
        return Err(bad_request("no files in upload"));
    }

    let context = consult_documents::process_upload(
        &state.upload_dir,
        &session_id,
        files,
        state.document_parser.as_ref(),
        state.document_analyzer.as_ref(),
    )
    .await?;

    let documents = context.documents.len();
    let summary = context.summary.clone();

    state.orchestrator.on_document_context_updated(&session_id, context).await?;

    let session = state.store.get_session(&session_id)?;
    if let Err(e) = state.room_service.update_room_metadata(&session.room_name, "documents_updated").await {
        warn!(error = %e, session_id, "failed to ping room metadata after upload");
    }

    Ok(Json(UploadResponse { summary, documents }))
}
