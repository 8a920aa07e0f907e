//! Multipart form collection shared by the upload endpoints.

use std::collections::HashMap;

use axum::extract::Multipart;
use bytes::Bytes;

use crate::errors::AppError;

#[derive(Debug, Clone)]
pub struct UploadedFile {
    pub filename: String,
    pub bytes: Bytes,
}

/// Every part of a multipart body: parts with a filename are files, the rest text.
#[derive(Debug, Default)]
pub struct UploadForm {
    files: HashMap<String, UploadedFile>,
    fields: HashMap<String, String>,
}

impl UploadForm {
    pub async fn read(mut multipart: Multipart) -> Result<Self, AppError> {
        let mut form = UploadForm::default();
        while let Some(field) = multipart
            .next_field()
            .await
            .map_err(|e| AppError::Validation(format!("invalid multipart body: {e}")))?
        {
            let name = field.name().unwrap_or_default().to_string();
            match field.file_name().map(str::to_string) {
                Some(filename) => {
                    let bytes = field.bytes().await.map_err(|e| {
                        AppError::Validation(format!("failed to read `{name}`: {e}"))
                    })?;
                    form.files.insert(name, UploadedFile { filename, bytes });
                }
                None => {
                    let text = field.text().await.map_err(|e| {
                        AppError::Validation(format!("failed to read `{name}`: {e}"))
                    })?;
                    form.fields.insert(name, text);
                }
            }
        }
        Ok(form)
    }

    pub fn take_file(&mut self, name: &str) -> Result<UploadedFile, AppError> {
        self.files
            .remove(name)
            .ok_or_else(|| AppError::Validation(format!("missing file field `{name}`")))
    }

    /// A text field, trimmed; blank counts as absent.
    pub fn text(&self, name: &str) -> Option<&str> {
        self.fields
            .get(name)
            .map(|v| v.trim())
            .filter(|v| !v.is_empty())
    }

    pub fn require_text(&self, name: &str) -> Result<&str, AppError> {
        self.text(name)
            .ok_or_else(|| AppError::Validation(format!("`{name}` is required")))
    }

    /// Parses an optional field, naming the field in the error.
    pub fn parse<T: std::str::FromStr>(&self, name: &str) -> Result<Option<T>, AppError> {
        self.text(name)
            .map(|raw| {
                raw.parse::<T>()
                    .map_err(|_| AppError::Validation(format!("`{name}` has an invalid value: {raw}")))
            })
            .transpose()
    }

    #[cfg(test)]
    pub fn with_field(mut self, name: &str, value: &str) -> Self {
        self.fields.insert(name.to_string(), value.to_string());
        self
    }
}
