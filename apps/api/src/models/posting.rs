//! Job posting (host input) and the normalized target requirements derived from it.

use serde::{Deserialize, Serialize};

use crate::models::document::Document;
use crate::models::terms::{dedup_terms, deserialize_lines, deserialize_terms};

/// A job posting as submitted by the host.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct JobPosting {
    pub title: String,
    pub company: String,
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(default, deserialize_with = "deserialize_lines")]
    pub requirements: Vec<String>,
    #[serde(default, deserialize_with = "deserialize_lines")]
    pub responsibilities: Vec<String>,
    #[serde(default, deserialize_with = "deserialize_lines")]
    pub preferred_qualifications: Vec<String>,
    #[serde(default, deserialize_with = "deserialize_terms")]
    pub required_skills: Vec<String>,
    #[serde(default, deserialize_with = "deserialize_terms")]
    pub preferred_skills: Vec<String>,
    #[serde(default, deserialize_with = "deserialize_terms")]
    pub keywords: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub experience_level: Option<String>,
}

impl JobPosting {
    /// Title, company and description must be non-blank.
    pub fn missing_field(&self) -> Option<&'static str> {
        if self.title.trim().is_empty() {
            Some("title")
        } else if self.company.trim().is_empty() {
            Some("company")
        } else if self.description.trim().is_empty() {
            Some("description")
        } else {
            None
        }
    }
}

/// Normalized view of a posting. Derived once per alignment run and never
/// mutated afterwards.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TargetRequirements {
    #[serde(default, alias = "must_have_skills", deserialize_with = "deserialize_terms")]
    pub must_have: Vec<String>,
    #[serde(default, alias = "nice_to_have_skills", deserialize_with = "deserialize_terms")]
    pub nice_to_have: Vec<String>,
    #[serde(default, alias = "key_responsibilities", deserialize_with = "deserialize_lines")]
    pub responsibilities: Vec<String>,
    #[serde(default, alias = "important_keywords", deserialize_with = "deserialize_terms")]
    pub keywords: Vec<String>,
    #[serde(default)]
    pub seniority: Option<String>,
    #[serde(default, deserialize_with = "deserialize_terms")]
    pub domain_knowledge: Vec<String>,
    #[serde(default, deserialize_with = "deserialize_terms")]
    pub soft_skills: Vec<String>,
}

impl TargetRequirements {
    /// Unions the skills the posting lists explicitly into the derived sets, so a
    /// model that forgets a stated requirement cannot drop it.
    pub fn with_posting_skills(mut self, posting: &JobPosting) -> Self {
        self.must_have = dedup_terms(self.must_have.iter().chain(&posting.required_skills));
        self.nice_to_have =
            dedup_terms(self.nice_to_have.iter().chain(&posting.preferred_skills));
        self.keywords = dedup_terms(self.keywords.iter().chain(&posting.keywords));
        if self.seniority.is_none() {
            self.seniority = posting.experience_level.clone();
        }
        self
    }

    /// Every term the document should mention: must-haves first, then keywords,
    /// then nice-to-haves.
    pub fn target_terms(&self) -> Vec<String> {
        dedup_terms(
            self.must_have
                .iter()
                .chain(&self.keywords)
                .chain(&self.nice_to_have),
        )
    }
}

/// Fraction of target terms found (substring, case-insensitive) in the document.
/// Returns 0.0 when there are no target terms.
pub fn keyword_coverage(document: &Document, target: &TargetRequirements) -> f64 {
    let terms = target.target_terms();
    if terms.is_empty() {
        return 0.0;
    }
    let haystack = document.searchable_text();
    let found = terms
        .iter()
        .filter(|t| haystack.contains(&t.to_lowercase()))
        .count();
    found as f64 / terms.len() as f64
}
