//! Refinement orchestrator. Drives the bounded rewrite → score → critique loop.
//!
//! Flow: cold gap analysis (once) → for each iteration: rewrite → merge into the
//! draft → append changes to the ledger → score → termination test → fold the
//! critique into the next deficiency report.
//!
//! States: ColdAnalysis → Rewriting → Scoring → Deciding → {Rewriting,
//! Done(Success), Done(Exhausted)}; any collaborator error → Failed. Cooperative
//! cancellation is observed only between iterations, never mid-call.
//!
//! The loop is strictly sequential: each call consumes the previous call's
//! output. Independent runs share nothing and can run concurrently.

use std::sync::Arc;
use std::time::{Duration, Instant};

use serde::Serialize;
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use uuid::Uuid;

use crate::alignment::collaborators::{
    CollaboratorError, DeficiencyReport, GapAnalyzer, Rewriter, ScoreResult, Scorer, Stage,
};
use crate::alignment::draft::{document_from_value, merge};
use crate::alignment::ledger::ChangeLedger;
use crate::models::{Document, TargetRequirements};

// ────────────────────────────────────────────────────────────────────────────
// Errors
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum AlignmentError {
    #[error("document is missing required field `{field}`")]
    MissingRequiredField { field: &'static str },

    #[error("iteration budget must be at least 1")]
    InvalidIterationBudget,

    /// Always fatal to the run. `raw` is the unparsed payload for diagnosis.
    #[error("{stage} returned a malformed response{}: {reason}", at_iteration(.iteration))]
    MalformedResponse {
        stage: Stage,
        iteration: Option<u32>,
        reason: String,
        raw: String,
    },

    #[error("{stage} failed{}: {message}", at_iteration(.iteration))]
    CollaboratorUnavailable {
        stage: Stage,
        iteration: Option<u32>,
        message: String,
    },

    #[error("alignment {0} is already running")]
    AlreadyRunning(Uuid),
}

fn at_iteration(iteration: &Option<u32>) -> String {
    iteration
        .map(|i| format!(" in iteration {i}"))
        .unwrap_or_default()
}

impl AlignmentError {
    pub fn from_collaborator(stage: Stage, iteration: Option<u32>, err: CollaboratorError) -> Self {
        match err {
            CollaboratorError::Malformed { reason, raw } => AlignmentError::MalformedResponse {
                stage,
                iteration,
                reason,
                raw,
            },
            CollaboratorError::Unavailable(message) => AlignmentError::CollaboratorUnavailable {
                stage,
                iteration,
                message,
            },
        }
    }
}

/// Checks made before any collaborator call.
pub fn validate_inputs(document: &Document, max_iterations: u32) -> Result<(), AlignmentError> {
    if !document.has_identity() {
        return Err(AlignmentError::MissingRequiredField { field: "full_name" });
    }
    if max_iterations == 0 {
        return Err(AlignmentError::InvalidIterationBudget);
    }
    Ok(())
}

// ────────────────────────────────────────────────────────────────────────────
// Output types
// ────────────────────────────────────────────────────────────────────────────

/// How a run ended. Exhausting the budget is a normal outcome, not a failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    Success,
    Exhausted,
    Cancelled,
}

/// Summary built once at loop exit.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunMetrics {
    pub final_coverage: f64,
    /// Captured from the cold analysis, before any rewriting.
    pub initial_coverage: f64,
    pub final_score: f64,
    pub total_changes: usize,
    pub sections_modified: usize,
    pub iterations_run: u32,
    pub avg_confidence: f64,
    pub duration_ms: u64,
}

impl RunMetrics {
    fn compute(
        initial_coverage: f64,
        last_score: Option<&ScoreResult>,
        ledger: &ChangeLedger,
        iterations_run: u32,
        elapsed: Duration,
    ) -> Self {
        RunMetrics {
            final_coverage: last_score.map(|s| s.coverage).unwrap_or(0.0),
            initial_coverage,
            final_score: last_score.map(|s| s.fitness_score).unwrap_or(0.0),
            total_changes: ledger.len(),
            sections_modified: ledger.distinct_locations().len(),
            iterations_run,
            avg_confidence: ledger.mean_confidence(),
            duration_ms: elapsed.as_millis() as u64,
        }
    }
}

/// Non-fatal problems recovered during a run.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RunWarning {
    /// A nested entry in a rewrite reply failed to convert and was dropped.
    EntryDropped {
        iteration: u32,
        section: String,
        index: Option<usize>,
        reason: String,
    },
    /// A change item failed to convert and was left out of the ledger.
    ChangeSkipped {
        iteration: u32,
        index: usize,
        reason: String,
    },
}

#[derive(Debug, Clone, Serialize)]
pub struct RunOutcome {
    pub status: RunStatus,
    pub document: Document,
    pub ledger: ChangeLedger,
    pub metrics: RunMetrics,
    pub warnings: Vec<RunWarning>,
}

// ────────────────────────────────────────────────────────────────────────────
// Orchestrator
// ────────────────────────────────────────────────────────────────────────────

/// Holds pre-built collaborator capabilities; stateless across runs.
#[derive(Clone)]
pub struct RefinementOrchestrator {
    gap_analyzer: Arc<dyn GapAnalyzer>,
    rewriter: Arc<dyn Rewriter>,
    scorer: Arc<dyn Scorer>,
}

impl RefinementOrchestrator {
    pub fn new(
        gap_analyzer: Arc<dyn GapAnalyzer>,
        rewriter: Arc<dyn Rewriter>,
        scorer: Arc<dyn Scorer>,
    ) -> Self {
        Self {
            gap_analyzer,
            rewriter,
            scorer,
        }
    }

    /// Runs one alignment.
    ///
    /// Fails before any collaborator call when the document has no identity or the
    /// budget is zero. Any collaborator failure aborts the run; no iteration is
    /// retried or accepted half-done.
    pub async fn run(
        &self,
        document: Document,
        target: &TargetRequirements,
        max_iterations: u32,
        cancel: &CancellationToken,
    ) -> Result<RunOutcome, AlignmentError> {
        validate_inputs(&document, max_iterations)?;

        let started = Instant::now();

        // ColdAnalysis
        let cold: DeficiencyReport = self
            .gap_analyzer
            .analyze_gaps(&document, target)
            .await
            .map_err(|e| AlignmentError::from_collaborator(Stage::ColdAnalysis, None, e))?;
        let initial_coverage = cold.initial_coverage();
        info!(
            "Cold analysis for '{}': initial coverage {:.2}, {} missing terms",
            document.full_name,
            initial_coverage,
            cold.missing_terms.len()
        );

        let mut draft = document;
        let mut report = cold;
        let mut ledger = ChangeLedger::new();
        let mut warnings: Vec<RunWarning> = Vec::new();
        let mut last_score: Option<ScoreResult> = None;
        let mut iterations_run = 0u32;
        let mut status = RunStatus::Exhausted;

        for iteration in 1..=max_iterations {
            if cancel.is_cancelled() {
                info!("Run cancelled before iteration {iteration}");
                status = RunStatus::Cancelled;
                break;
            }
            iterations_run = iteration;

            // Rewriting
            let reply = self
                .rewriter
                .rewrite(&draft, &report, target)
                .await
                .map_err(|e| {
                    AlignmentError::from_collaborator(Stage::Rewrite, Some(iteration), e)
                })?;

            let (candidate, dropped) =
                document_from_value(&reply.updated_document).map_err(|reason| {
                    AlignmentError::MalformedResponse {
                        stage: Stage::Rewrite,
                        iteration: Some(iteration),
                        reason,
                        raw: reply.updated_document.to_string(),
                    }
                })?;
            warnings.extend(dropped.into_iter().map(|w| RunWarning::EntryDropped {
                iteration,
                section: w.section,
                index: w.index,
                reason: w.reason,
            }));

            let merged = merge(&draft, candidate);

            let before = ledger.len();
            let skipped = ledger.append_items(&reply.changes, iteration);
            for s in &skipped {
                warn!(
                    "Iteration {}: skipping change item {}: {}",
                    iteration, s.index, s.reason
                );
            }
            warnings.extend(skipped.into_iter().map(|s| RunWarning::ChangeSkipped {
                iteration: s.iteration,
                index: s.index,
                reason: s.reason,
            }));

            // Scoring
            let score = self
                .scorer
                .score(&merged, target)
                .await
                .map_err(|e| {
                    AlignmentError::from_collaborator(Stage::Scoring, Some(iteration), e)
                })?;

            draft = merged;
            info!(
                "Iteration {}/{}: {} changes, score {:.1}, coverage {:.2}",
                iteration,
                max_iterations,
                ledger.len() - before,
                score.fitness_score,
                score.coverage
            );

            // Deciding
            if score.meets_threshold() {
                info!(
                    "Target reached in iteration {} (score {:.1}, approved={})",
                    iteration, score.fitness_score, score.approved
                );
                status = RunStatus::Success;
                last_score = Some(score);
                break;
            }

            report = report.with_feedback(&score);
            last_score = Some(score);
        }

        if status == RunStatus::Exhausted {
            info!(
                "Iteration budget ({}) exhausted, final score {:.1}",
                max_iterations,
                last_score.as_ref().map(|s| s.fitness_score).unwrap_or(0.0)
            );
        }

        let metrics = RunMetrics::compute(
            initial_coverage,
            last_score.as_ref(),
            &ledger,
            iterations_run,
            started.elapsed(),
        );

        Ok(RunOutcome {
            status,
            document: draft,
            ledger,
            metrics,
            warnings,
        })
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Tests
// ────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::alignment::collaborators::{Improvement, RewriteReply};
    use crate::models::Experience;
    use async_trait::async_trait;
    use serde_json::{json, Value};
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    // ── fakes ───────────────────────────────────────────────────────────────

    struct FakeGap {
        reply: Mutex<Option<Result<DeficiencyReport, CollaboratorError>>>,
        calls: AtomicUsize,
    }

    impl FakeGap {
        fn ok(report: DeficiencyReport) -> Self {
            Self {
                reply: Mutex::new(Some(Ok(report))),
                calls: AtomicUsize::new(0),
            }
        }

        fn failing(err: CollaboratorError) -> Self {
            Self {
                reply: Mutex::new(Some(Err(err))),
                calls: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl GapAnalyzer for FakeGap {
        async fn analyze_gaps(
            &self,
            _document: &Document,
            _target: &TargetRequirements,
        ) -> Result<DeficiencyReport, CollaboratorError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.reply
                .lock()
                .unwrap()
                .take()
                .unwrap_or_else(|| Ok(DeficiencyReport::default()))
        }
    }

    /// Pops scripted replies; once the script runs out, repeats a one-change summary edit.
    struct ScriptedRewriter {
        script: Mutex<VecDeque<Result<RewriteReply, CollaboratorError>>>,
        seen_reports: Mutex<Vec<DeficiencyReport>>,
        calls: AtomicUsize,
    }

    impl ScriptedRewriter {
        fn new(script: Vec<Result<RewriteReply, CollaboratorError>>) -> Self {
            Self {
                script: Mutex::new(script.into()),
                seen_reports: Mutex::new(Vec::new()),
                calls: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl Rewriter for ScriptedRewriter {
        async fn rewrite(
            &self,
            _document: &Document,
            report: &DeficiencyReport,
            _target: &TargetRequirements,
        ) -> Result<RewriteReply, CollaboratorError> {
            let n = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
            self.seen_reports.lock().unwrap().push(report.clone());
            self.script
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Ok(summary_reply(&format!("Summary v{n}"), 0.5)))
        }
    }

    struct ScriptedScorer {
        script: Mutex<VecDeque<Result<ScoreResult, CollaboratorError>>>,
        fallback: ScoreResult,
        seen_docs: Mutex<Vec<Document>>,
        cancel_on_call: Option<CancellationToken>,
        calls: AtomicUsize,
    }

    impl ScriptedScorer {
        fn always(score: ScoreResult) -> Self {
            Self::scripted(vec![], score)
        }

        fn scripted(script: Vec<Result<ScoreResult, CollaboratorError>>, fallback: ScoreResult) -> Self {
            Self {
                script: Mutex::new(script.into()),
                fallback,
                seen_docs: Mutex::new(Vec::new()),
                cancel_on_call: None,
                calls: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl Scorer for ScriptedScorer {
        async fn score(
            &self,
            document: &Document,
            _target: &TargetRequirements,
        ) -> Result<ScoreResult, CollaboratorError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.seen_docs.lock().unwrap().push(document.clone());
            if let Some(token) = &self.cancel_on_call {
                token.cancel();
            }
            self.script
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Ok(self.fallback.clone()))
        }
    }

    // ── helpers ─────────────────────────────────────────────────────────────

    fn source_document() -> Document {
        Document {
            full_name: "John Doe".into(),
            summary: Some("Software engineer with 3 years of experience.".into()),
            technical_skills: vec!["Python".into(), "SQL".into()],
            experiences: vec![Experience {
                company: "Tech Startup Inc".into(),
                title: "Software Engineer".into(),
                bullet_points: vec!["Built REST APIs using Python and Flask".into()],
                ..Default::default()
            }],
            ..Default::default()
        }
    }

    fn target() -> TargetRequirements {
        TargetRequirements {
            must_have: vec!["Python".into(), "Kubernetes".into()],
            keywords: vec!["scalable".into()],
            ..Default::default()
        }
    }

    fn cold_report() -> DeficiencyReport {
        DeficiencyReport {
            missing_terms: vec!["Kubernetes".into()],
            missing_keywords: vec!["scalable".into()],
            overall_match: Some(62.0),
            ..Default::default()
        }
    }

    fn change(section: &str, confidence: f64) -> Value {
        json!({
            "section": section,
            "change_type": "modified",
            "original_value": "old",
            "new_value": "new",
            "reason": "keyword",
            "confidence_score": confidence
        })
    }

    fn summary_reply(summary: &str, confidence: f64) -> RewriteReply {
        RewriteReply {
            updated_document: json!({ "full_name": "John Doe", "summary": summary }),
            changes: vec![change("summary", confidence)],
        }
    }

    fn score(fitness: f64, coverage: f64, approved: bool) -> ScoreResult {
        ScoreResult {
            fitness_score: fitness,
            coverage,
            critique: format!("critique at {fitness}"),
            approved,
            missing_keywords: vec!["CI/CD".into()],
            prioritized_improvements: vec![Improvement::from("Mention pipelines".to_string())],
            ..Default::default()
        }
    }

    fn orchestrator(
        gap: Arc<FakeGap>,
        rewriter: Arc<ScriptedRewriter>,
        scorer: Arc<ScriptedScorer>,
    ) -> RefinementOrchestrator {
        RefinementOrchestrator::new(gap, rewriter, scorer)
    }

    // ── scenarios ───────────────────────────────────────────────────────────

    #[tokio::test]
    async fn test_single_iteration_budget_exhausts() {
        let rewriter = Arc::new(ScriptedRewriter::new(vec![Ok(RewriteReply {
            updated_document: json!({"summary": "Backend engineer"}),
            changes: vec![change("summary", 0.9), change("technical_skills", 0.7)],
        })]));
        let scorer = Arc::new(ScriptedScorer::always(score(40.0, 0.4, false)));
        let orch = orchestrator(Arc::new(FakeGap::ok(cold_report())), rewriter, scorer);

        let outcome = orch
            .run(source_document(), &target(), 1, &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(outcome.status, RunStatus::Exhausted);
        assert_eq!(outcome.metrics.iterations_run, 1);
        assert_eq!(outcome.ledger.len(), 2);
        assert_eq!(outcome.metrics.total_changes, 2);
        assert_eq!(outcome.metrics.final_score, 40.0);
    }

    #[tokio::test]
    async fn test_high_score_stops_on_first_iteration() {
        let rewriter = Arc::new(ScriptedRewriter::new(vec![]));
        let scorer = Arc::new(ScriptedScorer::always(score(97.0, 0.96, false)));
        let orch = orchestrator(
            Arc::new(FakeGap::ok(cold_report())),
            rewriter.clone(),
            scorer.clone(),
        );

        let outcome = orch
            .run(source_document(), &target(), 3, &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(outcome.status, RunStatus::Success);
        assert_eq!(outcome.metrics.iterations_run, 1);
        assert_eq!(rewriter.calls.load(Ordering::SeqCst), 1);
        assert_eq!(scorer.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_empty_name_fails_before_any_call() {
        let gap = Arc::new(FakeGap::ok(cold_report()));
        let rewriter = Arc::new(ScriptedRewriter::new(vec![]));
        let scorer = Arc::new(ScriptedScorer::always(score(97.0, 1.0, true)));
        let orch = orchestrator(gap.clone(), rewriter.clone(), scorer.clone());

        let mut doc = source_document();
        doc.full_name = String::new();
        let err = orch
            .run(doc, &target(), 3, &CancellationToken::new())
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            AlignmentError::MissingRequiredField { field: "full_name" }
        ));
        assert_eq!(gap.calls.load(Ordering::SeqCst), 0);
        assert_eq!(rewriter.calls.load(Ordering::SeqCst), 0);
        assert_eq!(scorer.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_omitted_skills_keep_previous_skills() {
        let rewriter = Arc::new(ScriptedRewriter::new(vec![Ok(RewriteReply {
            updated_document: json!({
                "full_name": "John Doe",
                "summary": "Backend engineer building scalable APIs",
                "technical_skills": []
            }),
            changes: vec![change("summary", 0.8)],
        })]));
        let scorer = Arc::new(ScriptedScorer::always(score(50.0, 0.5, false)));
        let orch = orchestrator(
            Arc::new(FakeGap::ok(cold_report())),
            rewriter,
            scorer.clone(),
        );

        let outcome = orch
            .run(source_document(), &target(), 1, &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(outcome.document.technical_skills, vec!["Python", "SQL"]);
        assert_eq!(
            outcome.document.summary.as_deref(),
            Some("Backend engineer building scalable APIs")
        );
        // the scorer saw the merged draft, not the raw candidate
        assert_eq!(
            scorer.seen_docs.lock().unwrap()[0].technical_skills,
            vec!["Python", "SQL"]
        );
    }

    #[tokio::test]
    async fn test_malformed_experience_entry_is_dropped_and_run_continues() {
        let rewriter = Arc::new(ScriptedRewriter::new(vec![Ok(RewriteReply {
            updated_document: json!({
                "full_name": "John Doe",
                "experiences": [
                    {"title": "Software Engineer", "bullet_points": ["Led migration"]},
                    {"company": "Web Agency LLC", "title": "Junior Developer",
                     "bullet_points": ["Created client websites with JavaScript"]}
                ]
            }),
            changes: vec![change("experiences[1].bullet_points[0]", 0.6)],
        })]));
        let scorer = Arc::new(ScriptedScorer::always(score(60.0, 0.6, false)));
        let orch = orchestrator(Arc::new(FakeGap::ok(cold_report())), rewriter, scorer);

        let outcome = orch
            .run(source_document(), &target(), 1, &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(outcome.document.experiences.len(), 1);
        assert_eq!(outcome.document.experiences[0].company, "Web Agency LLC");
        assert_eq!(outcome.warnings.len(), 1);
        assert!(matches!(
            &outcome.warnings[0],
            RunWarning::EntryDropped { iteration: 1, index: Some(0), section, .. } if section == "experiences"
        ));
    }

    // ── properties ──────────────────────────────────────────────────────────

    #[tokio::test]
    async fn test_iterations_bounded_by_budget() {
        for budget in 1..=4u32 {
            let orch = orchestrator(
                Arc::new(FakeGap::ok(cold_report())),
                Arc::new(ScriptedRewriter::new(vec![])),
                Arc::new(ScriptedScorer::always(score(10.0, 0.1, false))),
            );
            let outcome = orch
                .run(source_document(), &target(), budget, &CancellationToken::new())
                .await
                .unwrap();
            assert_eq!(outcome.metrics.iterations_run, budget);
            assert_eq!(outcome.status, RunStatus::Exhausted);
            assert_eq!(outcome.metrics.total_changes, outcome.ledger.len());
        }
    }

    #[tokio::test]
    async fn test_stops_at_first_approving_iteration() {
        let scorer = Arc::new(ScriptedScorer::scripted(
            vec![Ok(score(70.0, 0.7, false)), Ok(score(82.0, 0.8, true))],
            score(99.0, 1.0, true),
        ));
        let orch = orchestrator(
            Arc::new(FakeGap::ok(cold_report())),
            Arc::new(ScriptedRewriter::new(vec![])),
            scorer,
        );

        let outcome = orch
            .run(source_document(), &target(), 5, &CancellationToken::new())
            .await
            .unwrap();

        // approved with a sub-threshold score still terminates (inclusive OR)
        assert_eq!(outcome.status, RunStatus::Success);
        assert_eq!(outcome.metrics.iterations_run, 2);
        assert_eq!(outcome.metrics.final_score, 82.0);
        assert_eq!(outcome.metrics.final_coverage, 0.8);
    }

    #[tokio::test]
    async fn test_zero_budget_is_rejected() {
        let gap = Arc::new(FakeGap::ok(cold_report()));
        let orch = orchestrator(
            gap.clone(),
            Arc::new(ScriptedRewriter::new(vec![])),
            Arc::new(ScriptedScorer::always(score(10.0, 0.1, false))),
        );
        let err = orch
            .run(source_document(), &target(), 0, &CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(err, AlignmentError::InvalidIterationBudget));
        assert_eq!(gap.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_critique_feeds_next_rewrite_and_cold_fields_persist() {
        let rewriter = Arc::new(ScriptedRewriter::new(vec![]));
        let orch = orchestrator(
            Arc::new(FakeGap::ok(cold_report())),
            rewriter.clone(),
            Arc::new(ScriptedScorer::always(score(55.0, 0.5, false))),
        );

        orch.run(source_document(), &target(), 2, &CancellationToken::new())
            .await
            .unwrap();

        let seen = rewriter.seen_reports.lock().unwrap();
        assert_eq!(seen.len(), 2);
        assert!(seen[0].critique.is_none());
        assert_eq!(seen[0].missing_keywords, vec!["scalable"]);
        assert_eq!(seen[1].critique.as_deref(), Some("critique at 55"));
        assert_eq!(seen[1].missing_keywords, vec!["CI/CD"]);
        assert_eq!(seen[1].improvement_priority.len(), 1);
        assert_eq!(seen[1].missing_terms, vec!["Kubernetes"]);
        assert_eq!(seen[1].overall_match, Some(62.0));
    }

    #[tokio::test]
    async fn test_metrics_from_ledger_and_cold_analysis() {
        let rewriter = Arc::new(ScriptedRewriter::new(vec![
            Ok(RewriteReply {
                updated_document: json!({"summary": "v1"}),
                changes: vec![
                    change("summary", 0.9),
                    json!({"section": "technical_skills", "change_type": "added"}),
                    json!({"section": "bad", "confidence_score": 7.0}),
                ],
            }),
            Ok(RewriteReply {
                updated_document: json!({"summary": "v2"}),
                changes: vec![change("summary", 0.6)],
            }),
        ]));
        let orch = orchestrator(
            Arc::new(FakeGap::ok(cold_report())),
            rewriter,
            Arc::new(ScriptedScorer::always(score(80.0, 0.75, false))),
        );

        let outcome = orch
            .run(source_document(), &target(), 2, &CancellationToken::new())
            .await
            .unwrap();

        let m = &outcome.metrics;
        assert_eq!(m.total_changes, 3);
        assert_eq!(m.sections_modified, 2);
        assert!((m.avg_confidence - 0.5).abs() < 1e-9);
        assert!((m.initial_coverage - 0.62).abs() < 1e-9);
        assert_eq!(m.final_coverage, 0.75);
        assert_eq!(outcome.document.summary.as_deref(), Some("v2"));
        assert!(outcome
            .warnings
            .iter()
            .any(|w| matches!(w, RunWarning::ChangeSkipped { iteration: 1, index: 2, .. })));
    }

    #[tokio::test]
    async fn test_empty_ledger_has_zero_confidence() {
        let rewriter = Arc::new(ScriptedRewriter::new(vec![Ok(RewriteReply {
            updated_document: json!({}),
            changes: vec![],
        })]));
        let orch = orchestrator(
            Arc::new(FakeGap::ok(DeficiencyReport::default())),
            rewriter,
            Arc::new(ScriptedScorer::always(score(30.0, 0.2, false))),
        );

        let outcome = orch
            .run(source_document(), &target(), 1, &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(outcome.metrics.avg_confidence, 0.0);
        assert_eq!(outcome.metrics.initial_coverage, 0.0);
        assert_eq!(outcome.document, source_document());
    }

    // ── failures ────────────────────────────────────────────────────────────

    #[tokio::test]
    async fn test_gap_failure_fails_before_iterations() {
        let rewriter = Arc::new(ScriptedRewriter::new(vec![]));
        let orch = orchestrator(
            Arc::new(FakeGap::failing(CollaboratorError::Malformed {
                reason: "expected value".into(),
                raw: "I cannot help".into(),
            })),
            rewriter.clone(),
            Arc::new(ScriptedScorer::always(score(99.0, 1.0, true))),
        );

        let err = orch
            .run(source_document(), &target(), 3, &CancellationToken::new())
            .await
            .unwrap_err();

        match err {
            AlignmentError::MalformedResponse {
                stage,
                iteration,
                raw,
                ..
            } => {
                assert_eq!(stage, Stage::ColdAnalysis);
                assert_eq!(iteration, None);
                assert_eq!(raw, "I cannot help");
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert_eq!(rewriter.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_rewrite_failure_names_stage_and_iteration() {
        let rewriter = Arc::new(ScriptedRewriter::new(vec![
            Ok(summary_reply("v1", 0.5)),
            Err(CollaboratorError::Malformed {
                reason: "missing field `updated_resume`".into(),
                raw: "{\"changes\": []}".into(),
            }),
        ]));
        let orch = orchestrator(
            Arc::new(FakeGap::ok(cold_report())),
            rewriter,
            Arc::new(ScriptedScorer::always(score(20.0, 0.2, false))),
        );

        let err = orch
            .run(source_document(), &target(), 3, &CancellationToken::new())
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            AlignmentError::MalformedResponse {
                stage: Stage::Rewrite,
                iteration: Some(2),
                ..
            }
        ));
        assert!(err.to_string().contains("rewrite"));
        assert!(err.to_string().contains("iteration 2"));
    }

    #[tokio::test]
    async fn test_non_object_candidate_is_malformed() {
        let rewriter = Arc::new(ScriptedRewriter::new(vec![Ok(RewriteReply {
            updated_document: json!("the whole resume as text"),
            changes: vec![],
        })]));
        let orch = orchestrator(
            Arc::new(FakeGap::ok(cold_report())),
            rewriter,
            Arc::new(ScriptedScorer::always(score(20.0, 0.2, false))),
        );

        let err = orch
            .run(source_document(), &target(), 1, &CancellationToken::new())
            .await
            .unwrap_err();

        match err {
            AlignmentError::MalformedResponse { stage, raw, .. } => {
                assert_eq!(stage, Stage::Rewrite);
                assert!(raw.contains("the whole resume as text"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_scoring_unavailable_fails_run() {
        let scorer = Arc::new(ScriptedScorer::scripted(
            vec![Err(CollaboratorError::Unavailable("timeout".into()))],
            score(99.0, 1.0, true),
        ));
        let orch = orchestrator(
            Arc::new(FakeGap::ok(cold_report())),
            Arc::new(ScriptedRewriter::new(vec![])),
            scorer,
        );

        let err = orch
            .run(source_document(), &target(), 3, &CancellationToken::new())
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            AlignmentError::CollaboratorUnavailable {
                stage: Stage::Scoring,
                iteration: Some(1),
                ..
            }
        ));
    }

    // ── cancellation ────────────────────────────────────────────────────────

    #[tokio::test]
    async fn test_cancellation_between_iterations_returns_partial() {
        let token = CancellationToken::new();
        let mut scorer = ScriptedScorer::always(score(30.0, 0.3, false));
        scorer.cancel_on_call = Some(token.clone());
        let rewriter = Arc::new(ScriptedRewriter::new(vec![]));
        let orch = orchestrator(
            Arc::new(FakeGap::ok(cold_report())),
            rewriter.clone(),
            Arc::new(scorer),
        );

        let outcome = orch
            .run(source_document(), &target(), 3, &token)
            .await
            .unwrap();

        // iteration 1 completed in full; the signal is seen before iteration 2
        assert_eq!(outcome.status, RunStatus::Cancelled);
        assert_eq!(outcome.metrics.iterations_run, 1);
        assert_eq!(outcome.ledger.len(), 1);
        assert_eq!(outcome.metrics.final_score, 30.0);
        assert_eq!(rewriter.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_cancelled_before_first_iteration() {
        let token = CancellationToken::new();
        token.cancel();
        let rewriter = Arc::new(ScriptedRewriter::new(vec![]));
        let orch = orchestrator(
            Arc::new(FakeGap::ok(cold_report())),
            rewriter.clone(),
            Arc::new(ScriptedScorer::always(score(30.0, 0.3, false))),
        );

        let outcome = orch
            .run(source_document(), &target(), 3, &token)
            .await
            .unwrap();

        assert_eq!(outcome.status, RunStatus::Cancelled);
        assert_eq!(outcome.metrics.iterations_run, 0);
        assert_eq!(outcome.metrics.final_coverage, 0.0);
        assert!((outcome.metrics.initial_coverage - 0.62).abs() < 1e-9);
        assert_eq!(outcome.document, source_document());
        assert_eq!(rewriter.calls.load(Ordering::SeqCst), 0);
    }
}
