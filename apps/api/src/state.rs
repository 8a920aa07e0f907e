use std::sync::Arc;

use crate::alignment::service::AlignmentService;
use crate::config::Config;
use crate::ingest::parser::DocumentParser;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    /// Pluggable résumé parser. Default: LlmDocumentParser.
    pub document_parser: Arc<dyn DocumentParser>,
    /// Owns the collaborators and the in-flight cancellation registry.
    pub alignment: AlignmentService,
}
