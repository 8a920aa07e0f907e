use axum::{
    extract::{Path, State},
    http::header,
    response::{IntoResponse, Response},
};

use crate::artifacts::read_artifact;
use crate::errors::AppError;
use crate::state::AppState;

/// GET /api/v1/artifacts/:name
///
/// Streams a rendered artifact from the artifact directory.
pub async fn handle_get_artifact(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Result<Response, AppError> {
    let artifact = read_artifact(&state.config.artifact_dir, &name).await?;
    let disposition = format!("inline; filename=\"{}\"", artifact.name);
    Ok((
        [
            (header::CONTENT_TYPE, artifact.content_type.to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        artifact.bytes,
    )
        .into_response())
}
