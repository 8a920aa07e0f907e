pub mod health;

use axum::{
    routing::{delete, get, post},
    Router,
};

use crate::alignment::handlers as alignment;
use crate::artifacts::handlers as artifacts;
use crate::ingest::handlers as ingest;
use crate::state::AppState;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_handler))
        // Parse-only
        .route("/api/v1/documents/parse", post(ingest::handle_parse_document))
        // Alignment
        .route("/api/v1/alignments", post(alignment::handle_align_upload))
        .route(
            "/api/v1/alignments/structured",
            post(alignment::handle_align_structured),
        )
        .route(
            "/api/v1/alignments/:id",
            delete(alignment::handle_cancel_alignment),
        )
        // Rendered artifacts
        .route("/api/v1/artifacts/:name", get(artifacts::handle_get_artifact))
        .with_state(state)
}
