//! Contracts for the external text-generation capabilities the
//! refinement orchestrator drives.
//!
//! Each capability is a trait so the orchestrator never sees request
//! construction or payload unwrapping. Production implementations live in
//! `alignment::agents`; tests substitute scripted fakes.
//!
//! `AppState` carries pre-built `Arc<dyn ...>` instances; credentials stay inside
//! those instances and never reach the orchestrator.

use std::fmt;

use async_trait::async_trait;
use serde::{Deserialize, Deserializer, Serialize};
use thiserror::Error;

use crate::llm_client::LlmError;
use crate::models::terms::{deserialize_lines, deserialize_terms};
use crate::models::{Document, JobPosting, TargetRequirements};

/// Fitness score at or above which a draft counts as aligned.
pub const APPROVAL_THRESHOLD: f64 = 95.0;

// ────────────────────────────────────────────────────────────────────────────
// Stages and errors
// ────────────────────────────────────────────────────────────────────────────

/// Which collaborator call a failure came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    DocumentParsing,
    PostingAnalysis,
    ColdAnalysis,
    Rewrite,
    Scoring,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::DocumentParsing => "document parsing",
            Stage::PostingAnalysis => "posting analysis",
            Stage::ColdAnalysis => "gap analysis",
            Stage::Rewrite => "rewrite",
            Stage::Scoring => "scoring",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Error)]
pub enum CollaboratorError {
    /// The service answered, but not with the structure the contract requires.
    #[error("malformed response: {reason}")]
    Malformed { reason: String, raw: String },

    /// Transport or API failure. Retry/backoff already happened inside the client.
    #[error("collaborator unavailable: {0}")]
    Unavailable(String),
}

impl From<LlmError> for CollaboratorError {
    fn from(err: LlmError) -> Self {
        if err.is_malformed() {
            CollaboratorError::Malformed {
                raw: err.raw_payload().unwrap_or_default().to_string(),
                reason: err.to_string(),
            }
        } else {
            CollaboratorError::Unavailable(err.to_string())
        }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Payload types
// ────────────────────────────────────────────────────────────────────────────

/// An improvement the scorer wants in the next rewrite.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Improvement {
    #[serde(default)]
    pub section: String,
    #[serde(default)]
    pub issue: String,
    #[serde(default)]
    pub suggestion: String,
}

impl From<String> for Improvement {
    fn from(issue: String) -> Self {
        Improvement {
            issue,
            ..Default::default()
        }
    }
}

/// A gap between the résumé and the posting, with a suggested remediation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GapItem {
    #[serde(default)]
    pub gap: String,
    #[serde(default)]
    pub suggestion: String,
}

impl From<String> for GapItem {
    fn from(gap: String) -> Self {
        GapItem {
            gap,
            ..Default::default()
        }
    }
}

/// A résumé section the gap analysis wants worked on first.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SectionPriority {
    #[serde(default)]
    pub section: String,
    #[serde(default)]
    pub reason: String,
    #[serde(default)]
    pub priority: String,
}

impl From<String> for SectionPriority {
    fn from(section: String) -> Self {
        SectionPriority {
            section,
            ..Default::default()
        }
    }
}

/// Existing résumé content that can be reframed toward a requirement.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PotentialMatch {
    #[serde(default)]
    pub resume_item: String,
    #[serde(default)]
    pub jd_requirement: String,
    #[serde(default)]
    pub alignment_strategy: String,
}

impl From<String> for PotentialMatch {
    fn from(resume_item: String) -> Self {
        PotentialMatch {
            resume_item,
            ..Default::default()
        }
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum TextOr<T> {
    Text(String),
    Item(T),
}

/// Models alternate between bare strings and objects for list items; accept both.
fn deserialize_items<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + From<String>,
{
    let raw = Option::<Vec<TextOr<T>>>::deserialize(deserializer)?;
    Ok(raw
        .unwrap_or_default()
        .into_iter()
        .map(|item| match item {
            TextOr::Text(s) => T::from(s),
            TextOr::Item(t) => t,
        })
        .collect())
}

/// Gap analysis plus the running feedback channel between iterations.
///
/// Built once by the cold analysis; from iteration 2 onward a fresh copy is
/// produced by `with_feedback`, never mutated in place.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DeficiencyReport {
    #[serde(default, alias = "missing_must_have_skills", deserialize_with = "deserialize_terms")]
    pub missing_terms: Vec<String>,
    #[serde(default, deserialize_with = "deserialize_terms")]
    pub missing_keywords: Vec<String>,
    #[serde(default, deserialize_with = "deserialize_lines")]
    pub underemphasized_strengths: Vec<String>,
    #[serde(default, alias = "experience_gaps", deserialize_with = "deserialize_items")]
    pub gaps: Vec<GapItem>,
    #[serde(default, alias = "sections_to_enhance", deserialize_with = "deserialize_items")]
    pub section_priorities: Vec<SectionPriority>,
    #[serde(default, deserialize_with = "deserialize_items")]
    pub potential_matches: Vec<PotentialMatch>,
    /// Overall match as reported by the gap analysis, as a percentage (0–100).
    #[serde(default, alias = "overall_match_percentage")]
    pub overall_match: Option<f64>,
    #[serde(default, deserialize_with = "deserialize_lines")]
    pub priority_improvements: Vec<String>,
    /// Previous iteration's critique. Absent on the first rewrite.
    #[serde(default)]
    pub critique: Option<String>,
    /// Previous iteration's prioritized improvements. Empty on the first rewrite.
    #[serde(default, deserialize_with = "deserialize_items")]
    pub improvement_priority: Vec<Improvement>,
}

impl DeficiencyReport {
    /// The cold analysis' overall match as a ratio in [0, 1]; 0 when absent.
    pub fn initial_coverage(&self) -> f64 {
        self.overall_match.map(percent_to_ratio).unwrap_or(0.0)
    }

    /// Next iteration's report: critique, missing keywords and priorities come
    /// from `score`; everything from the cold analysis is carried unchanged.
    pub fn with_feedback(&self, score: &ScoreResult) -> DeficiencyReport {
        DeficiencyReport {
            critique: Some(score.critique.clone()),
            missing_keywords: score.missing_keywords.clone(),
            improvement_priority: score.prioritized_improvements.clone(),
            ..self.clone()
        }
    }
}

/// One scoring pass over a draft.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScoreResult {
    /// 0–100.
    #[serde(alias = "ats_score")]
    pub fitness_score: f64,
    /// Keyword coverage ratio, 0–1.
    #[serde(default, alias = "keyword_match_score")]
    pub coverage: f64,
    #[serde(default)]
    pub critique: String,
    #[serde(default)]
    pub approved: bool,
    #[serde(default, deserialize_with = "deserialize_terms")]
    pub missing_keywords: Vec<String>,
    #[serde(default, alias = "improvement_priority", deserialize_with = "deserialize_items")]
    pub prioritized_improvements: Vec<Improvement>,
    #[serde(default, deserialize_with = "deserialize_lines")]
    pub strengths: Vec<String>,
    #[serde(default, deserialize_with = "deserialize_lines")]
    pub weaknesses: Vec<String>,
}

impl ScoreResult {
    /// Termination test: approval flag OR fitness at/above the threshold.
    pub fn meets_threshold(&self) -> bool {
        self.approved || self.fitness_score >= APPROVAL_THRESHOLD
    }
}

/// What the rewrite collaborator hands back: the candidate document as raw
/// structured data plus raw change items. Conversion (nested-entry recovery,
/// change-kind defaults) is the orchestrator's job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RewriteReply {
    #[serde(alias = "updated_resume")]
    pub updated_document: serde_json::Value,
    #[serde(default)]
    pub changes: Vec<serde_json::Value>,
}

/// Maps a 0–100 percentage onto [0, 1]. Small values stay small: 1 is 1%.
pub fn percent_to_ratio(percent: f64) -> f64 {
    if !percent.is_finite() {
        return 0.0;
    }
    (percent / 100.0).clamp(0.0, 1.0)
}

/// Maps a scorer's coverage figure onto [0, 1]. Scorers report either a
/// ratio or a percentage, so anything above 1 is read as a percentage.
pub fn normalize_ratio(value: f64) -> f64 {
    if !value.is_finite() {
        return 0.0;
    }
    let ratio = if value > 1.0 { value / 100.0 } else { value };
    ratio.clamp(0.0, 1.0)
}

// ────────────────────────────────────────────────────────────────────────────
// Traits
// ────────────────────────────────────────────────────────────────────────────

/// Derives `TargetRequirements` from a posting. Called once per run, by the host.
#[async_trait]
pub trait PostingAnalyzer: Send + Sync {
    async fn analyze(&self, posting: &JobPosting) -> Result<TargetRequirements, CollaboratorError>;
}

/// Cold analysis: deficiencies of the source document against the target.
#[async_trait]
pub trait GapAnalyzer: Send + Sync {
    async fn analyze_gaps(
        &self,
        document: &Document,
        target: &TargetRequirements,
    ) -> Result<DeficiencyReport, CollaboratorError>;
}

/// Produces a complete replacement draft plus itemized changes.
#[async_trait]
pub trait Rewriter: Send + Sync {
    async fn rewrite(
        &self,
        document: &Document,
        report: &DeficiencyReport,
        target: &TargetRequirements,
    ) -> Result<RewriteReply, CollaboratorError>;
}

/// Scores a draft. Must only set `approved` when `fitness_score >= APPROVAL_THRESHOLD`.
#[async_trait]
pub trait Scorer: Send + Sync {
    async fn score(
        &self,
        document: &Document,
        target: &TargetRequirements,
    ) -> Result<ScoreResult, CollaboratorError>;
}
