//! Broadcast event wire types
//!
//! Events delivered to the transport collaborator (browser clients in
//! production). Each carries the full serialized insight plus an
//! event-specific payload.

use crate::insight::{AnswerSource, Insight};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// An outbound event for browser clients
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BroadcastEvent {
    QuestionDetected {
        insight: Insight,
    },
    QuestionAnswered {
        insight: Insight,
        answer_source: AnswerSource,
    },
    QuestionUnanswered {
        insight: Insight,
    },
    ActionTracked {
        insight: Insight,
    },
    ActionUpdated {
        insight: Insight,
        /// Field-level diff for this update
        changes: HashMap<String, crate::insight::FieldChange>,
    },
    ActionAlert {
        insight: Insight,
        /// Exactly which fields the facilitator still needs to collect
        missing_fields: Vec<String>,
    },
}

impl BroadcastEvent {
    /// Event name as sent on the wire
    pub fn name(&self) -> &'static str {
        match self {
            Self::QuestionDetected { .. } => "QUESTION_DETECTED",
            Self::QuestionAnswered { .. } => "QUESTION_ANSWERED",
            Self::QuestionUnanswered { .. } => "QUESTION_UNANSWERED",
            Self::ActionTracked { .. } => "ACTION_TRACKED",
            Self::ActionUpdated { .. } => "ACTION_UPDATED",
            Self::ActionAlert { .. } => "ACTION_ALERT",
        }
    }

    /// The insight this event carries
    pub fn insight(&self) -> &Insight {
        match self {
            Self::QuestionDetected { insight }
            | Self::QuestionAnswered { insight, .. }
            | Self::QuestionUnanswered { insight }
            | Self::ActionTracked { insight }
            | Self::ActionUpdated { insight, .. }
            | Self::ActionAlert { insight, .. } => insight,
        }
    }
}
