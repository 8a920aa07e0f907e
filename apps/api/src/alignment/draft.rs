//! Draft store: turns raw rewrite payloads into `Document`s and merges each
//! candidate over the previous draft.
//!
//! # Merge policy
//! Shallow, at top-level-field granularity: a candidate field that is present
//! and non-empty wins; anything absent or empty keeps the base value. Generation
//! calls drop fields as an artifact of instruction-following, not as deletions.
//!
//! # Conversion policy
//! A payload that is not a JSON object, or whose top-level fields have the wrong
//! shape, is rejected. A single bad Experience/Education/Project/Certification
//! entry is dropped and reported as a `ConversionWarning`; the rest survive.

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{Map, Value};
use tracing::warn;

use crate::models::{Certification, Document, Education, Experience, Project};

/// A nested entry (or a whole nested list) that could not be converted and was dropped.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConversionWarning {
    pub section: String,
    /// Position of the dropped entry, `None` when the whole list had the wrong shape.
    pub index: Option<usize>,
    pub reason: String,
}

const ENTRY_SECTIONS: [&str; 4] = ["experiences", "education", "projects", "certifications"];

/// Converts a raw document payload, recovering from malformed nested entries.
///
/// Returns `Err(reason)` when the payload as a whole is unusable.
pub fn document_from_value(value: &Value) -> Result<(Document, Vec<ConversionWarning>), String> {
    let Value::Object(fields) = value else {
        return Err(format!("expected a JSON object, got {}", kind_of(value)));
    };

    let mut scalars: Map<String, Value> = fields.clone();
    let mut nested: Map<String, Value> = Map::new();
    for section in ENTRY_SECTIONS {
        if let Some(v) = scalars.remove(section) {
            nested.insert(section.to_string(), v);
        }
    }

    let mut document: Document = serde_json::from_value(Value::Object(scalars))
        .map_err(|e| format!("invalid document fields: {e}"))?;

    let mut warnings = Vec::new();
    document.experiences = convert_entries::<Experience>("experiences", &nested, &mut warnings);
    document.education = convert_entries::<Education>("education", &nested, &mut warnings);
    document.projects = convert_entries::<Project>("projects", &nested, &mut warnings);
    document.certifications =
        convert_entries::<Certification>("certifications", &nested, &mut warnings);

    Ok((document, warnings))
}

fn convert_entries<T: DeserializeOwned>(
    section: &str,
    nested: &Map<String, Value>,
    warnings: &mut Vec<ConversionWarning>,
) -> Vec<T> {
    let items = match nested.get(section) {
        None | Some(Value::Null) => return Vec::new(),
        Some(Value::Array(items)) => items,
        Some(other) => {
            let reason = format!("expected a list, got {}", kind_of(other));
            warn!("Dropping {section}: {reason}");
            warnings.push(ConversionWarning {
                section: section.to_string(),
                index: None,
                reason,
            });
            return Vec::new();
        }
    };

    let mut out = Vec::with_capacity(items.len());
    for (index, item) in items.iter().enumerate() {
        match serde_json::from_value::<T>(item.clone()) {
            Ok(entry) => out.push(entry),
            Err(e) => {
                warn!("Dropping {section}[{index}]: {e}");
                warnings.push(ConversionWarning {
                    section: section.to_string(),
                    index: Some(index),
                    reason: e.to_string(),
                });
            }
        }
    }
    out
}

fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "a list",
        Value::Object(_) => "an object",
    }
}

/// Merges `candidate` over `base`: non-empty candidate fields win.
pub fn merge(base: &Document, candidate: Document) -> Document {
    let Document {
        full_name,
        email,
        phone,
        location,
        linkedin,
        github,
        website,
        summary,
        technical_skills,
        soft_skills,
        languages,
        experiences,
        education,
        projects,
        certifications,
        publications,
        awards,
    } = candidate;

    let mut merged = Document {
        full_name: pick_text(&base.full_name, full_name),
        email: pick_opt(&base.email, email),
        phone: pick_opt(&base.phone, phone),
        location: pick_opt(&base.location, location),
        linkedin: pick_opt(&base.linkedin, linkedin),
        github: pick_opt(&base.github, github),
        website: pick_opt(&base.website, website),
        summary: pick_opt(&base.summary, summary),
        technical_skills: pick_list(&base.technical_skills, technical_skills),
        soft_skills: pick_list(&base.soft_skills, soft_skills),
        languages: pick_list(&base.languages, languages),
        experiences: pick_list(&base.experiences, experiences),
        education: pick_list(&base.education, education),
        projects: pick_list(&base.projects, projects),
        certifications: pick_list(&base.certifications, certifications),
        publications: pick_list(&base.publications, publications),
        awards: pick_list(&base.awards, awards),
    };
    merged.normalize_terms();
    merged
}

fn pick_text(base: &str, candidate: String) -> String {
    if candidate.trim().is_empty() {
        base.to_string()
    } else {
        candidate
    }
}

fn pick_opt(base: &Option<String>, candidate: Option<String>) -> Option<String> {
    match candidate {
        Some(c) if !c.trim().is_empty() => Some(c),
        _ => base.clone(),
    }
}

fn pick_list<T: Clone>(base: &[T], candidate: Vec<T>) -> Vec<T> {
    if candidate.is_empty() {
        base.to_vec()
    } else {
        candidate
    }
}
