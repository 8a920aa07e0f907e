//! Rendered-artifact retrieval. Rendering itself happens elsewhere; this
//! module only serves what the renderer left in `ARTIFACT_DIR`.

pub mod handlers;

use std::path::{Component, Path};

use bytes::Bytes;
use thiserror::Error;

use crate::errors::AppError;

#[derive(Debug, Error)]
pub enum ArtifactError {
    #[error("invalid artifact name `{0}`")]
    InvalidName(String),

    #[error("artifact `{0}` not found")]
    NotFound(String),

    #[error("failed to read artifact: {0}")]
    Io(#[from] std::io::Error),
}

impl From<ArtifactError> for AppError {
    fn from(err: ArtifactError) -> Self {
        match err {
            ArtifactError::InvalidName(_) => AppError::Validation(err.to_string()),
            ArtifactError::NotFound(_) => AppError::NotFound(err.to_string()),
            ArtifactError::Io(e) => AppError::Internal(e.into()),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Artifact {
    pub name: String,
    pub content_type: &'static str,
    pub bytes: Bytes,
}

/// A name is accepted only when it is a single plain path component.
pub fn is_safe_name(name: &str) -> bool {
    if name.is_empty() || name.starts_with('.') || name.contains(['\\', '\0']) {
        return false;
    }
    let mut components = Path::new(name).components();
    matches!(
        (components.next(), components.next()),
        (Some(Component::Normal(_)), None)
    )
}

pub fn content_type_for(name: &str) -> &'static str {
    let ext = Path::new(name)
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .unwrap_or_default();
    match ext.as_str() {
        "pdf" => "application/pdf",
        "tex" => "application/x-tex",
        "txt" => "text/plain; charset=utf-8",
        "md" => "text/markdown; charset=utf-8",
        "html" | "htm" => "text/html; charset=utf-8",
        "json" => "application/json",
        "png" => "image/png",
        "docx" => "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
        _ => "application/octet-stream",
    }
}

pub async fn read_artifact(dir: &Path, name: &str) -> Result<Artifact, ArtifactError> {
    if !is_safe_name(name) {
        return Err(ArtifactError::InvalidName(name.to_string()));
    }
    let path = dir.join(name);
    let bytes = match tokio::fs::read(&path).await {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(ArtifactError::NotFound(name.to_string()))
        }
        Err(e) => return Err(e.into()),
    };
    Ok(Artifact {
        name: name.to_string(),
        content_type: content_type_for(name),
        bytes: Bytes::from(bytes),
    })
}
