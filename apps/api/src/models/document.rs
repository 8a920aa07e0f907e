//! The structured résumé being aligned.
//!
//! Only `full_name` carries meaning when missing; every other field defaults to
//! empty/absent so consumers never need to tell `null` from "not sent".

use serde::{Deserialize, Serialize};

use crate::models::terms::{deserialize_lines, deserialize_terms, dedup_terms};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Experience {
    pub company: String,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_date: Option<String>,
    #[serde(default)]
    pub is_current: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, deserialize_with = "deserialize_lines")]
    pub bullet_points: Vec<String>,
    #[serde(default, deserialize_with = "deserialize_terms")]
    pub technologies: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Education {
    pub institution: String,
    pub degree: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub field_of_study: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub graduation_date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gpa: Option<String>,
    #[serde(default, deserialize_with = "deserialize_lines")]
    pub honors: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Project {
    pub name: String,
    pub description: String,
    #[serde(default, deserialize_with = "deserialize_terms")]
    pub technologies: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, deserialize_with = "deserialize_lines")]
    pub bullet_points: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Certification {
    pub name: String,
    pub issuer: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date_obtained: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expiry_date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub credential_id: Option<String>,
}

/// The résumé under alignment. Replaced wholesale every refinement iteration
/// (see `alignment::draft::merge`), never patched field by field.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Document {
    #[serde(default)]
    pub full_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub linkedin: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub github: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub website: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,

    #[serde(default, deserialize_with = "deserialize_terms")]
    pub technical_skills: Vec<String>,
    #[serde(default, deserialize_with = "deserialize_terms")]
    pub soft_skills: Vec<String>,
    #[serde(default, deserialize_with = "deserialize_terms")]
    pub languages: Vec<String>,

    #[serde(default)]
    pub experiences: Vec<Experience>,
    #[serde(default)]
    pub education: Vec<Education>,
    #[serde(default)]
    pub projects: Vec<Project>,
    #[serde(default)]
    pub certifications: Vec<Certification>,

    #[serde(default, deserialize_with = "deserialize_lines")]
    pub publications: Vec<String>,
    #[serde(default, deserialize_with = "deserialize_lines")]
    pub awards: Vec<String>,
}

impl Document {
    /// True when the identity field is present and not blank.
    pub fn has_identity(&self) -> bool {
        !self.full_name.trim().is_empty()
    }

    /// Re-applies the term-list invariant (case-insensitive dedup, first seen wins).
    /// Needed after any construction path that bypasses serde.
    pub fn normalize_terms(&mut self) {
        self.technical_skills = dedup_terms(&self.technical_skills);
        self.soft_skills = dedup_terms(&self.soft_skills);
        self.languages = dedup_terms(&self.languages);
    }

    /// Every keyword-bearing string in the document, lowercased. Used for local
    /// keyword coverage checks.
    pub fn searchable_text(&self) -> String {
        let mut parts: Vec<&str> = Vec::new();
        parts.extend(self.summary.as_deref());
        parts.extend(self.technical_skills.iter().map(String::as_str));
        parts.extend(self.soft_skills.iter().map(String::as_str));
        for exp in &self.experiences {
            parts.push(&exp.title);
            parts.extend(exp.description.as_deref());
            parts.extend(exp.bullet_points.iter().map(String::as_str));
            parts.extend(exp.technologies.iter().map(String::as_str));
        }
        for proj in &self.projects {
            parts.push(&proj.name);
            parts.push(&proj.description);
            parts.extend(proj.bullet_points.iter().map(String::as_str));
            parts.extend(proj.technologies.iter().map(String::as_str));
        }
        for cert in &self.certifications {
            parts.push(&cert.name);
        }
        parts.join("\n").to_lowercase()
    }
}
