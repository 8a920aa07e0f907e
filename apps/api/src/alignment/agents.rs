//! LLM-backed collaborators. Each one builds a prompt, makes a single call
//! through `LlmClient`, and decodes the reply with a pure `parse_*` function so
//! the decoding rules are testable without the network.

use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, warn};

use crate::alignment::collaborators::{
    normalize_ratio, CollaboratorError, DeficiencyReport, GapAnalyzer, PostingAnalyzer,
    RewriteReply, Rewriter, ScoreResult, Scorer, APPROVAL_THRESHOLD,
};
use crate::alignment::prompts::{
    json_system, GAP_ANALYSIS_PROMPT_TEMPLATE, GAP_ANALYSIS_SYSTEM,
    POSTING_ANALYSIS_PROMPT_TEMPLATE, POSTING_ANALYSIS_SYSTEM, REWRITE_PROMPT_TEMPLATE,
    REWRITE_SYSTEM, SCORING_PROMPT_TEMPLATE, SCORING_SYSTEM,
};
use crate::llm_client::prompts::{COMPLETE_OBJECT_INSTRUCTION, TRUTHFULNESS_INSTRUCTION};
use crate::llm_client::{decode_json, LlmClient};
use crate::models::posting::keyword_coverage;
use crate::models::{Document, JobPosting, TargetRequirements};

/// Upper bound on keywords listed in the rewrite prompt.
const MAX_PROMPT_KEYWORDS: usize = 20;

fn pretty<T: Serialize>(value: &T) -> String {
    serde_json::to_string_pretty(value).unwrap_or_else(|_| "{}".to_string())
}

// ────────────────────────────────────────────────────────────────────────────
// Posting analysis
// ────────────────────────────────────────────────────────────────────────────

#[derive(Clone)]
pub struct LlmPostingAnalyzer {
    llm: LlmClient,
}

impl LlmPostingAnalyzer {
    pub fn new(llm: LlmClient) -> Self {
        Self { llm }
    }
}

#[async_trait]
impl PostingAnalyzer for LlmPostingAnalyzer {
    async fn analyze(&self, posting: &JobPosting) -> Result<TargetRequirements, CollaboratorError> {
        let prompt =
            POSTING_ANALYSIS_PROMPT_TEMPLATE.replace("{posting_text}", &posting_text(posting));
        let text = self
            .llm
            .call_text(&prompt, &json_system(POSTING_ANALYSIS_SYSTEM))
            .await?;
        parse_target_reply(&text, posting)
    }
}

/// Flattens a posting into the plain-text block the analysis prompt embeds.
pub fn posting_text(posting: &JobPosting) -> String {
    fn block(lines: &[String], fallback: &str) -> String {
        if lines.is_empty() {
            fallback.to_string()
        } else {
            lines.join("\n")
        }
    }

    fn skills(terms: &[String]) -> String {
        if terms.is_empty() {
            "None specified".to_string()
        } else {
            terms.join(", ")
        }
    }

    format!(
        "Title: {}\nCompany: {}\nLocation: {}\nExperience level: {}\n\nDescription:\n{}\n\n\
         Requirements:\n{}\n\nResponsibilities:\n{}\n\nPreferred qualifications:\n{}\n\n\
         Required skills: {}\nPreferred skills: {}",
        posting.title,
        posting.company,
        posting.location.as_deref().unwrap_or("Not specified"),
        posting.experience_level.as_deref().unwrap_or("Not specified"),
        posting.description,
        block(&posting.requirements, "See description"),
        block(&posting.responsibilities, "See description"),
        block(&posting.preferred_qualifications, "None specified"),
        skills(&posting.required_skills),
        skills(&posting.preferred_skills),
    )
}

/// Decodes the analyzer reply and unions in the posting's explicit skills.
pub fn parse_target_reply(
    text: &str,
    posting: &JobPosting,
) -> Result<TargetRequirements, CollaboratorError> {
    let target: TargetRequirements = decode_json(text)?;
    Ok(target.with_posting_skills(posting))
}

// ────────────────────────────────────────────────────────────────────────────
// Gap analysis
// ────────────────────────────────────────────────────────────────────────────

#[derive(Clone)]
pub struct LlmGapAnalyzer {
    llm: LlmClient,
}

impl LlmGapAnalyzer {
    pub fn new(llm: LlmClient) -> Self {
        Self { llm }
    }
}

#[async_trait]
impl GapAnalyzer for LlmGapAnalyzer {
    async fn analyze_gaps(
        &self,
        document: &Document,
        target: &TargetRequirements,
    ) -> Result<DeficiencyReport, CollaboratorError> {
        let prompt = GAP_ANALYSIS_PROMPT_TEMPLATE
            .replace("{truthfulness_instruction}", TRUTHFULNESS_INSTRUCTION)
            .replace("{target_json}", &pretty(target))
            .replace("{resume_json}", &pretty(document));
        let text = self
            .llm
            .call_text(&prompt, &json_system(GAP_ANALYSIS_SYSTEM))
            .await?;
        parse_gap_reply(&text)
    }
}

pub fn parse_gap_reply(text: &str) -> Result<DeficiencyReport, CollaboratorError> {
    Ok(decode_json(text)?)
}

// ────────────────────────────────────────────────────────────────────────────
// Rewrite
// ────────────────────────────────────────────────────────────────────────────

#[derive(Clone)]
pub struct LlmRewriter {
    llm: LlmClient,
}

impl LlmRewriter {
    pub fn new(llm: LlmClient) -> Self {
        Self { llm }
    }
}

#[async_trait]
impl Rewriter for LlmRewriter {
    async fn rewrite(
        &self,
        document: &Document,
        report: &DeficiencyReport,
        target: &TargetRequirements,
    ) -> Result<RewriteReply, CollaboratorError> {
        let keywords: Vec<String> = target
            .target_terms()
            .into_iter()
            .take(MAX_PROMPT_KEYWORDS)
            .collect();
        let prompt = REWRITE_PROMPT_TEMPLATE
            .replace("{truthfulness_instruction}", TRUTHFULNESS_INSTRUCTION)
            .replace("{complete_object_instruction}", COMPLETE_OBJECT_INSTRUCTION)
            .replace("{target_keywords}", &pretty(&keywords))
            .replace("{report_json}", &pretty(report))
            .replace("{resume_json}", &pretty(document));
        let text = self.llm.call_text(&prompt, &json_system(REWRITE_SYSTEM)).await?;
        let reply = parse_rewrite_reply(&text)?;
        debug!("Rewrite reply carried {} change items", reply.changes.len());
        Ok(reply)
    }
}

/// The reply must carry the candidate document; change items are optional.
pub fn parse_rewrite_reply(text: &str) -> Result<RewriteReply, CollaboratorError> {
    Ok(decode_json(text)?)
}

// ────────────────────────────────────────────────────────────────────────────
// Scoring
// ────────────────────────────────────────────────────────────────────────────

#[derive(Clone)]
pub struct LlmScorer {
    llm: LlmClient,
}

impl LlmScorer {
    pub fn new(llm: LlmClient) -> Self {
        Self { llm }
    }
}

#[async_trait]
impl Scorer for LlmScorer {
    async fn score(
        &self,
        document: &Document,
        target: &TargetRequirements,
    ) -> Result<ScoreResult, CollaboratorError> {
        let prompt = SCORING_PROMPT_TEMPLATE
            .replace("{target_json}", &pretty(target))
            .replace("{resume_json}", &pretty(document));
        let text = self.llm.call_text(&prompt, &json_system(SCORING_SYSTEM)).await?;
        parse_score_reply(&text, document, target)
    }
}

/// Decodes and normalises a scoring reply.
///
/// - A bare `APPROVED` reply reads as fitness 95, coverage 0.95, approved.
/// - Fitness is clamped to [0, 100]; coverage given as a percentage is scaled.
/// - A reply without any coverage figure falls back to local keyword coverage.
/// - `approved` survives only when fitness reaches the approval threshold.
pub fn parse_score_reply(
    text: &str,
    document: &Document,
    target: &TargetRequirements,
) -> Result<ScoreResult, CollaboratorError> {
    let bare = text.trim().trim_matches(|c: char| c == '"' || c == '.' || c == '!');
    if bare.eq_ignore_ascii_case("APPROVED") {
        return Ok(ScoreResult {
            fitness_score: APPROVAL_THRESHOLD,
            coverage: 0.95,
            critique: "APPROVED".to_string(),
            approved: true,
            ..Default::default()
        });
    }

    let raw: Value = decode_json(text)?;
    let has_coverage = raw
        .as_object()
        .map(|o| o.contains_key("coverage") || o.contains_key("keyword_match_score"))
        .unwrap_or(false);

    let mut score: ScoreResult =
        serde_json::from_value(raw).map_err(|e| CollaboratorError::Malformed {
            reason: format!("invalid score payload: {e}"),
            raw: text.to_string(),
        })?;

    score.fitness_score = if score.fitness_score.is_finite() {
        score.fitness_score.clamp(0.0, 100.0)
    } else {
        0.0
    };
    score.coverage = if has_coverage {
        normalize_ratio(score.coverage)
    } else {
        keyword_coverage(document, target)
    };
    if score.approved && score.fitness_score < APPROVAL_THRESHOLD {
        warn!(
            "Scorer approved a draft at {:.1}, below the {} threshold; clearing approval",
            score.fitness_score, APPROVAL_THRESHOLD
        );
        score.approved = false;
    }
    Ok(score)
}
