//! Alignment service: the host-facing entry point.
//!
//! Pipeline: validate → register cancellation token → posting analysis →
//! refinement loop → response. Runs are independent; the only shared state is
//! the in-flight registry used by `cancel`.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use serde::Serialize;
use tokio_util::sync::CancellationToken;
use tracing::info;
use uuid::Uuid;

use crate::alignment::collaborators::{PostingAnalyzer, Stage};
use crate::alignment::ledger::ChangeRecord;
use crate::alignment::orchestrator::{
    validate_inputs, AlignmentError, RefinementOrchestrator, RunMetrics, RunStatus, RunWarning,
};
use crate::models::{Document, JobPosting, TargetRequirements};

/// One submit-for-alignment call, already validated at the HTTP edge.
#[derive(Debug, Clone)]
pub struct AlignmentRequest {
    pub alignment_id: Option<Uuid>,
    pub document: Document,
    pub posting: JobPosting,
    pub max_iterations: u32,
    /// Passed through by reference to the rendering side.
    pub template_id: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct AlignmentResponse {
    pub alignment_id: Uuid,
    pub status: RunStatus,
    pub aligned_document: Document,
    pub original_document: Document,
    pub target_requirements: TargetRequirements,
    pub changes: Vec<ChangeRecord>,
    pub metrics: RunMetrics,
    pub warnings: Vec<RunWarning>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub template_id: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Registry slot for one running alignment. `run` tells apart two runs that
/// reuse an id after the first was cancelled.
#[derive(Debug, Clone)]
struct InFlight {
    run: Uuid,
    token: CancellationToken,
}

impl InFlight {
    fn new(token: CancellationToken) -> Self {
        Self {
            run: Uuid::new_v4(),
            token,
        }
    }
}

type Registry = Arc<DashMap<Uuid, InFlight>>;

/// Holds a run's registry slot. Dropping it frees the slot even when the
/// request future is dropped mid-run, but never a slot taken by a later run.
struct Registration {
    registry: Registry,
    alignment_id: Uuid,
    run: Uuid,
}

impl Registration {
    fn claim(
        registry: &Registry,
        alignment_id: Uuid,
    ) -> Result<(Self, CancellationToken), AlignmentError> {
        let slot = InFlight::new(CancellationToken::new());
        let (run, token) = (slot.run, slot.token.clone());
        match registry.entry(alignment_id) {
            Entry::Occupied(_) => return Err(AlignmentError::AlreadyRunning(alignment_id)),
            Entry::Vacant(vacant) => {
                vacant.insert(slot);
            }
        }
        let registration = Registration {
            registry: registry.clone(),
            alignment_id,
            run,
        };
        Ok((registration, token))
    }
}

impl Drop for Registration {
    fn drop(&mut self) {
        self.registry.remove_if(&self.alignment_id, |_, slot| slot.run == self.run);
    }
}

#[derive(Clone)]
pub struct AlignmentService {
    posting_analyzer: Arc<dyn PostingAnalyzer>,
    orchestrator: RefinementOrchestrator,
    in_flight: Registry,
}

impl AlignmentService {
    pub fn new(posting_analyzer: Arc<dyn PostingAnalyzer>, orchestrator: RefinementOrchestrator) -> Self {
        Self {
            posting_analyzer,
            orchestrator,
            in_flight: Arc::new(DashMap::new()),
        }
    }

    pub async fn align(&self, request: AlignmentRequest) -> Result<AlignmentResponse, AlignmentError> {
        validate_inputs(&request.document, request.max_iterations)?;

        let alignment_id = request.alignment_id.unwrap_or_else(Uuid::new_v4);
        let (_registration, token) = Registration::claim(&self.in_flight, alignment_id)?;

        info!(
            "Alignment {alignment_id}: '{}' for {} at {}",
            request.document.full_name, request.posting.title, request.posting.company
        );

        self.run(alignment_id, request, &token).await
    }

    async fn run(
        &self,
        alignment_id: Uuid,
        request: AlignmentRequest,
        token: &CancellationToken,
    ) -> Result<AlignmentResponse, AlignmentError> {
        let AlignmentRequest {
            document,
            posting,
            max_iterations,
            template_id,
            ..
        } = request;

        let target = self
            .posting_analyzer
            .analyze(&posting)
            .await
            .map_err(|e| AlignmentError::from_collaborator(Stage::PostingAnalysis, None, e))?;
        info!(
            "Alignment {alignment_id}: {} must-have terms, {} keywords",
            target.must_have.len(),
            target.keywords.len()
        );

        let outcome = self
            .orchestrator
            .run(document.clone(), &target, max_iterations, token)
            .await?;

        info!(
            "Alignment {alignment_id} finished: {:?}, {} iterations, score {:.1}",
            outcome.status, outcome.metrics.iterations_run, outcome.metrics.final_score
        );

        Ok(AlignmentResponse {
            alignment_id,
            status: outcome.status,
            aligned_document: outcome.document,
            original_document: document,
            target_requirements: target,
            changes: outcome.ledger.into_records(),
            metrics: outcome.metrics,
            warnings: outcome.warnings,
            template_id,
            created_at: Utc::now(),
        })
    }

    /// Signals an in-flight run. Returns false when no run has this id.
    pub fn cancel(&self, alignment_id: Uuid) -> bool {
        match self.in_flight.remove(&alignment_id) {
            Some((_, slot)) => {
                slot.token.cancel();
                info!("Alignment {alignment_id}: cancellation requested");
                true
            }
            None => false,
        }
    }

    pub fn in_flight_count(&self) -> usize {
        self.in_flight.len()
    }
}
