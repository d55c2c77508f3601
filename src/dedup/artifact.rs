//! Extracted artifact types for semantic deduplication

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;

/// The kind of project artifact extracted from a meeting
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArtifactKind {
    Risk,
    Task,
    Blocker,
    Lesson,
}

/// A candidate artifact freshly extracted by the AI
///
/// Transient: created per sync batch, consumed by the deduplicator, then
/// discarded after classification.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractedArtifact {
    pub kind: ArtifactKind,
    pub title: String,
    pub description: String,
    /// Domain fields (severity, assignee, status, mitigation, ...)
    #[serde(default)]
    pub fields: HashMap<String, serde_json::Value>,
}

/// An already-persisted artifact of the same kind
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArtifactRecord {
    pub id: Uuid,
    pub kind: ArtifactKind,
    pub title: String,
    pub description: String,
    #[serde(default)]
    pub fields: HashMap<String, serde_json::Value>,
}

/// Build the embedding input text for an artifact.
///
/// The construction rule is `"<title>. <description>"` with both parts
/// trimmed, falling back to whichever is present, or the literal
/// `"untitled"` when both are empty. The same rule MUST be applied to both
/// sides of every similarity comparison; embeddings are regenerated fresh
/// each run rather than cached, so historical encodings can never skew the
/// metric.
pub fn embedding_text(title: &str, description: &str) -> String {
    let title = title.trim();
    let description = description.trim();
    match (title.is_empty(), description.is_empty()) {
        (false, false) => format!("{}. {}", title, description),
        (false, true) => title.to_string(),
        (true, false) => description.to_string(),
        (true, true) => "untitled".to_string(),
    }
}

impl ExtractedArtifact {
    /// Embedding input text for this candidate
    pub fn embedding_text(&self) -> String {
        embedding_text(&self.title, &self.description)
    }
}

impl ArtifactRecord {
    /// Embedding input text for this record
    pub fn embedding_text(&self) -> String {
        embedding_text(&self.title, &self.description)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_embedding_text_title_and_description() {
        assert_eq!(
            embedding_text("Budget Risk", "cost overrun in Q3"),
            "Budget Risk. cost overrun in Q3"
        );
    }

    #[test]
    fn test_embedding_text_trims() {
        assert_eq!(
            embedding_text("  Budget Risk  ", "  cost overrun  "),
            "Budget Risk. cost overrun"
        );
    }

    #[test]
    fn test_embedding_text_fallbacks() {
        assert_eq!(embedding_text("Only title", ""), "Only title");
        assert_eq!(embedding_text("", "only description"), "only description");
        assert_eq!(embedding_text("", "   "), "untitled");
    }
}
