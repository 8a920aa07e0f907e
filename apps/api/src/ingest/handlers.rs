//! Axum route handlers for the parse-only endpoint.

use axum::{
    extract::{Multipart, State},
    Json,
};
use tracing::info;

use crate::alignment::collaborators::Stage;
use crate::alignment::orchestrator::AlignmentError;
use crate::errors::AppError;
use crate::ingest::extract::extract_text;
use crate::ingest::parser::ParsedDocument;
use crate::ingest::upload::{UploadForm, UploadedFile};
use crate::state::AppState;

/// Extracts the file's text and parses it into a structured document.
pub async fn parse_upload(state: &AppState, file: UploadedFile) -> Result<ParsedDocument, AppError> {
    let raw_text = extract_text(&file.filename, file.bytes).await?;
    let parsed = state
        .document_parser
        .parse(&raw_text)
        .await
        .map_err(|e| AlignmentError::from_collaborator(Stage::DocumentParsing, None, e))?;
    info!(
        "Parsed '{}' from {} ({} experiences, {} dropped entries)",
        parsed.document.full_name,
        file.filename,
        parsed.document.experiences.len(),
        parsed.warnings.len()
    );
    Ok(parsed)
}

/// POST /api/v1/documents/parse
///
/// Multipart field `file` (.pdf, .txt or .md). Returns the structured document.
pub async fn handle_parse_document(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<Json<ParsedDocument>, AppError> {
    let mut form = UploadForm::read(multipart).await?;
    let file = form.take_file("file")?;
    Ok(Json(parse_upload(&state, file).await?))
}
