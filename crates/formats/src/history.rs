//! Applied scene documents, oldest first.

use serde::Serialize;
use serde_json::{Map, Value};

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryEntry {
    /// blake3 of the canonical JSON text.
    pub content_hash: String,
    pub document: String,
    /// Top-level members that are new or changed relative to the previous entry.
    pub changed: Map<String, Value>,
}

#[derive(Debug, Clone, Default)]
pub struct SpecHistory {
    entries: Vec<HistoryEntry>,
    last: Option<Value>,
}

impl SpecHistory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `document`. Re-applying the current document records nothing.
    ///
    /// Returns whether an entry was added.
    pub fn push(&mut self, document: &Value) -> bool {
        let text = document.to_string();
        let content_hash = blake3::hash(text.as_bytes()).to_hex().to_string();
        if self
            .entries
            .last()
            .is_some_and(|e| e.content_hash == content_hash)
        {
            return false;
        }
        let changed = top_level_diff(self.last.as_ref(), document);
        self.entries.push(HistoryEntry {
            content_hash,
            document: text,
            changed,
        });
        self.last = Some(document.clone());
        true
    }

    pub fn entries(&self) -> &[HistoryEntry] {
        &self.entries
    }

    pub fn latest(&self) -> Option<&HistoryEntry> {
        self.entries.last()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Members of `next` that are absent from or different in `prev`.
///
/// Removed members are not reported.
pub fn top_level_diff(prev: Option<&Value>, next: &Value) -> Map<String, Value> {
    let Some(next) = next.as_object() else {
        return Map::new();
    };
    let prev = prev.and_then(Value::as_object);
    next.iter()
        .filter(|(k, v)| prev.and_then(|p| p.get(*k)) != Some(*v))
        .map(|(k, v)| (k.clone(), v.clone()))
        .collect()
}
