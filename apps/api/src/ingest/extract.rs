//! Raw-text extraction from uploaded résumé files.

use bytes::Bytes;
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("unsupported file type `{0}`; expected .pdf, .txt or .md")]
    Unsupported(String),

    #[error("failed to extract PDF text: {0}")]
    Pdf(String),

    #[error("file is not valid UTF-8 text")]
    NotUtf8,

    #[error("no text could be extracted from the file")]
    Empty,
}

impl ExtractError {
    /// True when the client sent a file type we never accept.
    pub fn is_unsupported(&self) -> bool {
        matches!(self, ExtractError::Unsupported(_))
    }
}

/// Lowercased extension without the dot; empty when the name has none.
pub fn file_extension(filename: &str) -> String {
    std::path::Path::new(filename)
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .unwrap_or_default()
}

/// Extracts plain text, choosing the decoder by file extension.
///
/// PDF decoding runs on the blocking pool; a panic inside the decoder is
/// reported as `ExtractError::Pdf`.
pub async fn extract_text(filename: &str, bytes: Bytes) -> Result<String, ExtractError> {
    let text = match file_extension(filename).as_str() {
        "pdf" => tokio::task::spawn_blocking(move || pdf_extract::extract_text_from_mem(&bytes))
            .await
            .map_err(|e| ExtractError::Pdf(format!("decoder aborted: {e}")))?
            .map_err(|e| ExtractError::Pdf(e.to_string()))?,
        "txt" | "md" => String::from_utf8(bytes.to_vec()).map_err(|_| ExtractError::NotUtf8)?,
        other => {
            let shown = if other.is_empty() { "(none)" } else { other };
            return Err(ExtractError::Unsupported(shown.to_string()));
        }
    };

    let text = text.trim();
    if text.is_empty() {
        return Err(ExtractError::Empty);
    }
    debug!("Extracted {} chars from {}", text.len(), filename);
    Ok(text.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_extension_is_lowercased() {
        assert_eq!(file_extension("Resume.PDF"), "pdf");
        assert_eq!(file_extension("notes.md"), "md");
        assert_eq!(file_extension("README"), "");
    }

    #[tokio::test]
    async fn test_plain_text_is_trimmed() {
        let text = extract_text("resume.txt", Bytes::from_static(b"\n  Jane Roe\nEngineer  \n"))
            .await
            .unwrap();
        assert_eq!(text, "Jane Roe\nEngineer");
    }

    #[tokio::test]
    async fn test_markdown_is_accepted() {
        let text = extract_text("resume.md", Bytes::from_static(b"# Jane Roe"))
            .await
            .unwrap();
        assert_eq!(text, "# Jane Roe");
    }

    #[tokio::test]
    async fn test_docx_is_unsupported() {
        let err = extract_text("resume.docx", Bytes::from_static(b"PK\x03\x04"))
            .await
            .unwrap_err();
        assert!(err.is_unsupported());
        assert!(err.to_string().contains("docx"));
    }

    #[tokio::test]
    async fn test_invalid_utf8_is_rejected() {
        let err = extract_text("resume.txt", Bytes::from_static(&[0xff, 0xfe, 0xfd]))
            .await
            .unwrap_err();
        assert!(matches!(err, ExtractError::NotUtf8));
    }

    #[tokio::test]
    async fn test_blank_text_is_empty() {
        let err = extract_text("resume.txt", Bytes::from_static(b"   \n\t"))
            .await
            .unwrap_err();
        assert!(matches!(err, ExtractError::Empty));
    }

    #[tokio::test]
    async fn test_garbage_pdf_is_a_pdf_error() {
        let err = extract_text("resume.pdf", Bytes::from_static(b"definitely not a pdf"))
            .await
            .unwrap_err();
        assert!(matches!(err, ExtractError::Pdf(_)));
    }
}
