//! Persisted insight data types
//!
//! An Insight is the durable record behind a detected question or action
//! item. It is created by the corresponding handler when an object arrives
//! on the analysis stream, mutated in place as new information arrives, and
//! never physically deleted during a session — only status-transitioned.
//! Kind-specific fields (owner, deadline, completeness, answer, merge and
//! update history) live in the free-form metadata map.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;

/// The kind of insight
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InsightKind {
    Question,
    Action,
}

/// Lifecycle status of an insight
///
/// Questions move `Searching → {Answered | Unanswered}` and never backwards.
/// Actions move `Tracked → Complete` once completeness reaches 1.0.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InsightStatus {
    Searching,
    Answered,
    Unanswered,
    Tracked,
    Complete,
}

/// Which discovery tier produced a question's answer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnswerSource {
    KnowledgeBase,
    MeetingContext,
    LiveMonitoring,
    AiGenerated,
}

impl std::fmt::Display for AnswerSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::KnowledgeBase => write!(f, "knowledge_base"),
            Self::MeetingContext => write!(f, "meeting_context"),
            Self::LiveMonitoring => write!(f, "live_monitoring"),
            Self::AiGenerated => write!(f, "ai_generated"),
        }
    }
}

/// A persisted question or action item owned by a meeting session
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Insight {
    /// Unique insight identifier
    pub id: Uuid,
    /// Owning meeting session
    pub session_id: String,
    /// Insight kind
    pub kind: InsightKind,
    /// Free-text content (question text or action description)
    pub content: String,
    /// Speaker attribution, if detected
    pub speaker: Option<String>,
    /// When the insight was detected in the stream
    pub detected_at: DateTime<Utc>,
    /// Current lifecycle status
    pub status: InsightStatus,
    /// Kind-specific fields (gpt_id, owner, deadline, completeness,
    /// confidence, answer, related_ids, update_history, ...)
    pub metadata: HashMap<String, serde_json::Value>,
}

impl Insight {
    /// The stream-assigned external ID (`q_*` / `a_*`), if recorded
    pub fn gpt_id(&self) -> Option<&str> {
        self.metadata.get("gpt_id").and_then(|v| v.as_str())
    }

    /// Detection confidence, defaulting to 0.0 when absent
    pub fn confidence(&self) -> f64 {
        self.metadata
            .get("confidence")
            .and_then(|v| v.as_f64())
            .unwrap_or(0.0)
    }

    /// Completeness score, defaulting to 0.0 when absent
    pub fn completeness(&self) -> f64 {
        self.metadata
            .get("completeness")
            .and_then(|v| v.as_f64())
            .unwrap_or(0.0)
    }

    /// Action owner, if assigned
    pub fn owner(&self) -> Option<&str> {
        self.metadata.get("owner").and_then(|v| v.as_str())
    }

    /// Action deadline, if assigned
    pub fn deadline(&self) -> Option<&str> {
        self.metadata.get("deadline").and_then(|v| v.as_str())
    }

    /// Set a metadata field
    pub fn set_meta(&mut self, key: impl Into<String>, value: serde_json::Value) {
        self.metadata.insert(key.into(), value);
    }

    /// Append an external ID to the merge history (`related_ids`)
    pub fn push_related_id(&mut self, external_id: &str) {
        let list = self
            .metadata
            .entry("related_ids".to_string())
            .or_insert_with(|| serde_json::Value::Array(Vec::new()));
        if let Some(arr) = list.as_array_mut() {
            arr.push(serde_json::Value::String(external_id.to_string()));
        }
    }

    /// Append a timestamped field-level diff to `update_history`
    pub fn push_update_record(&mut self, changes: &HashMap<String, FieldChange>) {
        let record = serde_json::json!({
            "at": Utc::now().to_rfc3339(),
            "changes": changes,
        });
        let list = self
            .metadata
            .entry("update_history".to_string())
            .or_insert_with(|| serde_json::Value::Array(Vec::new()));
        if let Some(arr) = list.as_array_mut() {
            arr.push(record);
        }
    }
}

/// A single field-level change recorded in an action's update history
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FieldChange {
    pub from: Option<String>,
    pub to: Option<String>,
}

/// Builder for constructing `Insight` instances
pub struct InsightBuilder {
    session_id: String,
    kind: InsightKind,
    content: Option<String>,
    speaker: Option<String>,
    status: InsightStatus,
    metadata: HashMap<String, serde_json::Value>,
}

impl InsightBuilder {
    /// Create a new builder for the given session and kind
    pub fn new(session_id: impl Into<String>, kind: InsightKind) -> Self {
        let status = match kind {
            InsightKind::Question => InsightStatus::Searching,
            InsightKind::Action => InsightStatus::Tracked,
        };
        Self {
            session_id: session_id.into(),
            kind,
            content: None,
            speaker: None,
            status,
            metadata: HashMap::new(),
        }
    }

    /// Set the free-text content
    pub fn content(mut self, content: impl Into<String>) -> Self {
        self.content = Some(content.into());
        self
    }

    /// Set the speaker attribution
    pub fn speaker(mut self, speaker: Option<String>) -> Self {
        self.speaker = speaker;
        self
    }

    /// Add a metadata entry
    pub fn metadata(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.metadata.insert(key.into(), value);
        self
    }

    /// Build the insight, returning an error if content is missing
    pub fn build(self) -> crate::Result<Insight> {
        let content = self
            .content
            .filter(|c| !c.is_empty())
            .ok_or_else(|| crate::Error::Internal("insight content is required".to_string()))?;

        Ok(Insight {
            id: Uuid::new_v4(),
            session_id: self.session_id,
            kind: self.kind,
            content,
            speaker: self.speaker,
            detected_at: Utc::now(),
            status: self.status,
            metadata: self.metadata,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_question_defaults() {
        let insight = InsightBuilder::new("session-1", InsightKind::Question)
            .content("What is the budget for Q3?")
            .speaker(Some("alice".to_string()))
            .metadata("gpt_id", serde_json::json!("q_123"))
            .build()
            .unwrap();

        assert_eq!(insight.kind, InsightKind::Question);
        assert_eq!(insight.status, InsightStatus::Searching);
        assert_eq!(insight.gpt_id(), Some("q_123"));
        assert_eq!(insight.speaker.as_deref(), Some("alice"));
    }

    #[test]
    fn test_builder_action_defaults() {
        let insight = InsightBuilder::new("session-1", InsightKind::Action)
            .content("Send the report to finance")
            .build()
            .unwrap();

        assert_eq!(insight.status, InsightStatus::Tracked);
        assert_eq!(insight.confidence(), 0.0);
        assert!(insight.owner().is_none());
    }

    #[test]
    fn test_builder_missing_content() {
        assert!(InsightBuilder::new("s", InsightKind::Question).build().is_err());
        assert!(InsightBuilder::new("s", InsightKind::Question)
            .content("")
            .build()
            .is_err());
    }

    #[test]
    fn test_related_ids_accumulate() {
        let mut insight = InsightBuilder::new("s", InsightKind::Action)
            .content("review the contract")
            .build()
            .unwrap();

        insight.push_related_id("a_111");
        insight.push_related_id("a_222");

        let related = insight.metadata.get("related_ids").unwrap();
        assert_eq!(related.as_array().unwrap().len(), 2);
    }

    #[test]
    fn test_update_history_records_diff() {
        let mut insight = InsightBuilder::new("s", InsightKind::Action)
            .content("review the contract")
            .build()
            .unwrap();

        let mut changes = HashMap::new();
        changes.insert(
            "owner".to_string(),
            FieldChange {
                from: None,
                to: Some("bob".to_string()),
            },
        );
        insight.push_update_record(&changes);

        let history = insight.metadata.get("update_history").unwrap();
        let arr = history.as_array().unwrap();
        assert_eq!(arr.len(), 1);
        assert!(arr[0].get("at").is_some());
        assert_eq!(arr[0]["changes"]["owner"]["to"], "bob");
    }

    #[test]
    fn test_insight_serialization_round_trip() {
        let insight = InsightBuilder::new("session-9", InsightKind::Question)
            .content("round trip?")
            .metadata("confidence", serde_json::json!(0.9))
            .build()
            .unwrap();

        let json = serde_json::to_string(&insight).unwrap();
        let parsed: Insight = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.id, insight.id);
        assert_eq!(parsed.status, InsightStatus::Searching);
        assert!((parsed.confidence() - 0.9).abs() < f64::EPSILON);
    }
}
