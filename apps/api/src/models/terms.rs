//! Term lists: skills, keywords and similar set-like string lists.
//!
//! Every term list in the service behaves the same way: case-insensitive dedup,
//! first-seen spelling and order win, blank items are dropped. LLM payloads
//! sometimes send these lists as a single comma-separated string, so the serde
//! helper accepts both shapes.

use std::collections::HashSet;

use serde::{Deserialize, Deserializer};

/// Deduplicates terms case-insensitively, keeping the first-seen spelling.
pub fn dedup_terms<I, S>(terms: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut seen = HashSet::new();
    let mut out = Vec::new();
    for term in terms {
        let trimmed = term.as_ref().trim();
        if trimmed.is_empty() {
            continue;
        }
        if seen.insert(trimmed.to_lowercase()) {
            out.push(trimmed.to_string());
        }
    }
    out
}

/// Splits `text` on `sep`, trimming items and dropping blanks.
pub fn split_list(text: &str, sep: char) -> Vec<String> {
    text.split(sep)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect()
}

#[derive(Deserialize)]
#[serde(untagged)]
enum StringOrList {
    One(String),
    Many(Vec<Option<String>>),
}

/// Deserializes a term list from either a JSON array or a comma-separated string.
/// `null` reads as an empty list.
pub fn deserialize_terms<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<StringOrList>::deserialize(deserializer)?;
    Ok(match raw {
        None => Vec::new(),
        Some(StringOrList::One(s)) => dedup_terms(split_list(&s, ',')),
        Some(StringOrList::Many(items)) => dedup_terms(items.into_iter().flatten()),
    })
}

/// Deserializes a free-text line list from either a JSON array or a
/// newline-separated string. Order and duplicates are preserved.
pub fn deserialize_lines<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<StringOrList>::deserialize(deserializer)?;
    Ok(match raw {
        None => Vec::new(),
        Some(StringOrList::One(s)) => split_list(&s, '\n'),
        Some(StringOrList::Many(items)) => items
            .into_iter()
            .flatten()
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect(),
    })
}
