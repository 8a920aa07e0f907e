//! Parse-only path: raw résumé text → structured `Document`.

use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;

use crate::alignment::collaborators::CollaboratorError;
use crate::alignment::draft::{document_from_value, ConversionWarning};
use crate::ingest::prompts::{DOCUMENT_PARSE_PROMPT, DOCUMENT_PARSE_SYSTEM};
use crate::llm_client::LlmClient;
use crate::models::Document;

#[derive(Debug, Clone, Serialize)]
pub struct ParsedDocument {
    pub document: Document,
    /// Entries the parser returned that could not be converted.
    pub warnings: Vec<ConversionWarning>,
}

/// Pluggable so the HTTP layer can be exercised without a model behind it.
#[async_trait]
pub trait DocumentParser: Send + Sync {
    async fn parse(&self, raw_text: &str) -> Result<ParsedDocument, CollaboratorError>;
}

#[derive(Clone)]
pub struct LlmDocumentParser {
    llm: LlmClient,
}

impl LlmDocumentParser {
    pub fn new(llm: LlmClient) -> Self {
        Self { llm }
    }
}

#[async_trait]
impl DocumentParser for LlmDocumentParser {
    async fn parse(&self, raw_text: &str) -> Result<ParsedDocument, CollaboratorError> {
        parse_document(raw_text, &self.llm).await
    }
}

pub async fn parse_document(
    raw_text: &str,
    llm: &LlmClient,
) -> Result<ParsedDocument, CollaboratorError> {
    let prompt = DOCUMENT_PARSE_PROMPT.replace("{raw_text}", raw_text);
    let value: Value = llm.call_json(&prompt, DOCUMENT_PARSE_SYSTEM).await?;
    document_from_reply(&value)
}

/// Converts a parser reply, accepting an optional `{"resume": {...}}` wrapper.
pub fn document_from_reply(value: &Value) -> Result<ParsedDocument, CollaboratorError> {
    let inner = match value.get("resume") {
        Some(wrapped @ Value::Object(_)) => wrapped,
        _ => value,
    };
    let (document, warnings) =
        document_from_value(inner).map_err(|reason| CollaboratorError::Malformed {
            reason,
            raw: value.to_string(),
        })?;
    Ok(ParsedDocument { document, warnings })
}
