//! Typed stream-object protocol
//!
//! The analysis LLM emits one JSON object per logical unit, discriminated
//! by a `type` string. Parsing into the sum type happens at the router
//! boundary: anything that does not match a variant is classified malformed
//! and dropped without disturbing the stream. Creation objects (`question`,
//! `action`) carry opaque stream-assigned IDs of the form `q_<uuid>` /
//! `a_<uuid>`; updates and answers may instead reference their target by
//! exact text.

use serde::{Deserialize, Serialize};
use std::sync::OnceLock;

/// Top-level stream object (parsed from raw JSON values)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StreamObject {
    Question(QuestionObject),
    Action(ActionObject),
    ActionUpdate(ActionUpdateObject),
    Answer(AnswerObject),
}

/// A detected question
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuestionObject {
    pub id: String,
    pub text: String,
    pub speaker: Option<String>,
    pub timestamp: f64,
    pub category: Option<String>,
    #[serde(default)]
    pub confidence: f64,
}

/// A detected action item
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActionObject {
    pub id: String,
    pub description: String,
    pub owner: Option<String>,
    pub deadline: Option<String>,
    pub speaker: Option<String>,
    pub timestamp: f64,
    pub completeness: Option<f64>,
    #[serde(default)]
    pub confidence: f64,
}

/// An update to a previously detected action
///
/// References the target either by stream-assigned ID or, when the ID is
/// absent, by the exact action description text.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActionUpdateObject {
    pub id: Option<String>,
    pub action_text: Option<String>,
    pub owner: Option<String>,
    pub deadline: Option<String>,
    pub completeness: Option<f64>,
    #[serde(default)]
    pub confidence: f64,
}

/// A detected spoken answer to an open question
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnswerObject {
    pub question_id: Option<String>,
    pub question_text: Option<String>,
    pub answer_text: String,
    pub speaker: Option<String>,
    pub timestamp: f64,
    #[serde(default)]
    pub confidence: f64,
}

/// Object kind, used for per-type metrics and routing decisions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ObjectKind {
    Question,
    Action,
    ActionUpdate,
    Answer,
}

impl std::fmt::Display for ObjectKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Question => write!(f, "question"),
            Self::Action => write!(f, "action"),
            Self::ActionUpdate => write!(f, "action_update"),
            Self::Answer => write!(f, "answer"),
        }
    }
}

impl StreamObject {
    /// Parse a raw wire value, returning the parse error text on mismatch
    pub fn parse(raw: serde_json::Value) -> std::result::Result<Self, String> {
        serde_json::from_value(raw).map_err(|e| e.to_string())
    }

    /// This object's kind
    pub fn kind(&self) -> ObjectKind {
        match self {
            Self::Question(_) => ObjectKind::Question,
            Self::Action(_) => ObjectKind::Action,
            Self::ActionUpdate(_) => ObjectKind::ActionUpdate,
            Self::Answer(_) => ObjectKind::Answer,
        }
    }
}

/// Check a stream-assigned ID against the `<prefix>_<uuid>` convention.
///
/// Style violations are tolerated by the router (logged, still dispatched);
/// this check exists so drifting LLM output is visible in the logs.
pub fn id_style_ok(id: &str, expected_prefix: char) -> bool {
    static ID_RE: OnceLock<regex::Regex> = OnceLock::new();
    let re = ID_RE.get_or_init(|| {
        regex::Regex::new(
            r"^(?P<prefix>[a-z])_[0-9a-fA-F]{8}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{12}$",
        )
        .expect("static regex")
    });
    match re.captures(id) {
        Some(caps) => caps["prefix"].chars().next() == Some(expected_prefix),
        None => false,
    }
}
