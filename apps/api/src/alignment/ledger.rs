//! Append-only record of every edit the rewrite passes made.
//!
//! No deduplication: a location touched in two iterations appears twice so the
//! history stays auditable and the UI can show how a bullet evolved.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeKind {
    Added,
    Modified,
    Removed,
    Reordered,
}

impl ChangeKind {
    /// Unknown or missing kinds read as `Modified`.
    pub fn parse_lenient(raw: Option<&str>) -> Self {
        match raw.map(|s| s.trim().to_ascii_lowercase()).as_deref() {
            Some("added") => ChangeKind::Added,
            Some("removed") => ChangeKind::Removed,
            Some("reordered") => ChangeKind::Reordered,
            _ => ChangeKind::Modified,
        }
    }
}

/// One atomic edit. Immutable once appended.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChangeRecord {
    /// Field/index path, e.g. `experiences[0].bullet_points[2]`.
    pub location: String,
    pub field: String,
    pub kind: ChangeKind,
    pub original_value: Option<Value>,
    pub new_value: Option<Value>,
    pub justification: Option<String>,
    /// In [0, 1] when present.
    pub confidence: Option<f64>,
    /// 1-based refinement iteration that emitted this change.
    pub iteration: u32,
}

impl ChangeRecord {
    /// Converts one raw change item from a rewrite reply.
    pub fn from_item(item: &Value, iteration: u32) -> Result<Self, String> {
        let Value::Object(obj) = item else {
            return Err("change item is not an object".to_string());
        };

        let text = |keys: &[&str]| -> Result<Option<String>, String> {
            for key in keys {
                match obj.get(*key) {
                    None | Some(Value::Null) => continue,
                    Some(Value::String(s)) => return Ok(Some(s.clone())),
                    Some(other) => return Err(format!("`{key}` must be a string, got {other}")),
                }
            }
            Ok(None)
        };

        let location = text(&["section", "location"])?
            .filter(|s| !s.trim().is_empty())
            .unwrap_or_else(|| "unknown".to_string());
        let field = text(&["field"])?.unwrap_or_else(|| "text".to_string());
        let kind = ChangeKind::parse_lenient(
            obj.get("change_type")
                .or_else(|| obj.get("kind"))
                .and_then(Value::as_str),
        );
        let justification = text(&["reason", "justification"])?;

        let confidence = match obj.get("confidence_score").or_else(|| obj.get("confidence")) {
            None | Some(Value::Null) => None,
            Some(Value::Number(n)) => match n.as_f64() {
                Some(c) if (0.0..=1.0).contains(&c) => Some(c),
                _ => return Err(format!("confidence {n} outside [0, 1]")),
            },
            Some(other) => return Err(format!("confidence must be a number, got {other}")),
        };

        let value_of = |key: &str| obj.get(key).filter(|v| !v.is_null()).cloned();

        Ok(ChangeRecord {
            location,
            field,
            kind,
            original_value: value_of("original_value"),
            new_value: value_of("new_value"),
            justification,
            confidence,
            iteration,
        })
    }
}

/// A change item that could not be converted and was left out of the ledger.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SkippedChange {
    pub iteration: u32,
    pub index: usize,
    pub reason: String,
}

#[derive(Debug, Clone, Default, Serialize)]
#[serde(transparent)]
pub struct ChangeLedger {
    records: Vec<ChangeRecord>,
}

impl ChangeLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn append(&mut self, record: ChangeRecord) {
        self.records.push(record);
    }

    /// Converts and appends a batch of raw items in emission order.
    /// Items that fail conversion are returned, never appended.
    pub fn append_items(&mut self, items: &[Value], iteration: u32) -> Vec<SkippedChange> {
        let mut skipped = Vec::new();
        for (index, item) in items.iter().enumerate() {
            match ChangeRecord::from_item(item, iteration) {
                Ok(record) => self.append(record),
                Err(reason) => skipped.push(SkippedChange {
                    iteration,
                    index,
                    reason,
                }),
            }
        }
        skipped
    }

    pub fn all(&self) -> &[ChangeRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn distinct_locations(&self) -> HashSet<&str> {
        self.records.iter().map(|r| r.location.as_str()).collect()
    }

    /// Mean confidence with a missing confidence counted as 0; 0 for an empty ledger.
    pub fn mean_confidence(&self) -> f64 {
        if self.records.is_empty() {
            return 0.0;
        }
        let total: f64 = self.records.iter().map(|r| r.confidence.unwrap_or(0.0)).sum();
        total / self.records.len() as f64
    }

    pub fn into_records(self) -> Vec<ChangeRecord> {
        self.records
    }
}
