//! Axum route handlers for the Alignment API.

use axum::{
    extract::{Multipart, Path, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::alignment::orchestrator::RunWarning;
use crate::alignment::service::{AlignmentRequest, AlignmentResponse};
use crate::errors::AppError;
use crate::ingest::handlers::parse_upload;
use crate::ingest::upload::UploadForm;
use crate::models::terms::{dedup_terms, split_list};
use crate::models::{Document, JobPosting};
use crate::state::AppState;

// ────────────────────────────────────────────────────────────────────────────
// Request types
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct StructuredAlignmentRequest {
    pub document: Document,
    pub posting: JobPosting,
    #[serde(default)]
    pub max_iterations: Option<u32>,
    #[serde(default)]
    pub template_id: Option<String>,
    #[serde(default)]
    pub alignment_id: Option<Uuid>,
}

/// Builds the posting from the upload form's text fields.
pub fn posting_from_form(form: &UploadForm) -> Result<JobPosting, AppError> {
    let lines = |name: &str| form.text(name).map(|t| split_list(t, '\n')).unwrap_or_default();
    Ok(JobPosting {
        title: form.require_text("job_title")?.to_string(),
        company: form.require_text("company")?.to_string(),
        description: form.require_text("job_description")?.to_string(),
        requirements: lines("requirements"),
        responsibilities: lines("responsibilities"),
        required_skills: form
            .text("required_skills")
            .map(|t| dedup_terms(split_list(t, ',')))
            .unwrap_or_default(),
        ..Default::default()
    })
}

fn validate_posting(posting: &JobPosting) -> Result<(), AppError> {
    match posting.missing_field() {
        Some(field) => Err(AppError::Validation(format!("posting `{field}` cannot be empty"))),
        None => Ok(()),
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Handlers
// ────────────────────────────────────────────────────────────────────────────

/// POST /api/v1/alignments
///
/// Multipart: `resume_file` plus posting fields. Parses the upload, then runs
/// the full alignment.
pub async fn handle_align_upload(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<Json<AlignmentResponse>, AppError> {
    let mut form = UploadForm::read(multipart).await?;
    let posting = posting_from_form(&form)?;
    validate_posting(&posting)?;
    let max_iterations = form
        .parse::<u32>("max_iterations")?
        .unwrap_or(state.config.max_iterations);
    let alignment_id = form.parse::<Uuid>("alignment_id")?;
    let template_id = form.text("template_id").map(str::to_string);

    let file = form.take_file("resume_file")?;
    let parsed = parse_upload(&state, file).await?;

    let mut response = state
        .alignment
        .align(AlignmentRequest {
            alignment_id,
            document: parsed.document,
            posting,
            max_iterations,
            template_id,
        })
        .await?;

    // iteration 0 marks entries dropped while parsing the upload
    let mut warnings: Vec<RunWarning> = parsed
        .warnings
        .into_iter()
        .map(|w| RunWarning::EntryDropped {
            iteration: 0,
            section: w.section,
            index: w.index,
            reason: w.reason,
        })
        .collect();
    warnings.append(&mut response.warnings);
    response.warnings = warnings;

    Ok(Json(response))
}

/// POST /api/v1/alignments/structured
///
/// Same pipeline for callers that already hold a structured document.
pub async fn handle_align_structured(
    State(state): State<AppState>,
    Json(request): Json<StructuredAlignmentRequest>,
) -> Result<Json<AlignmentResponse>, AppError> {
    validate_posting(&request.posting)?;

    let response = state
        .alignment
        .align(AlignmentRequest {
            alignment_id: request.alignment_id,
            document: request.document,
            posting: request.posting,
            max_iterations: request.max_iterations.unwrap_or(state.config.max_iterations),
            template_id: request.template_id,
        })
        .await?;

    Ok(Json(response))
}

/// DELETE /api/v1/alignments/:id
///
/// Signals an in-flight run. The run stops before its next iteration and
/// returns its partial result to the original caller.
pub async fn handle_cancel_alignment(
    State(state): State<AppState>,
    Path(alignment_id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    if state.alignment.cancel(alignment_id) {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(AppError::NotFound(format!(
            "no alignment {alignment_id} is running"
        )))
    }
}
