//! Stream protocol — wire types, LLM client seam, and per-session routing

pub mod client;
pub mod router;
pub mod types;

pub use client::{AnalysisContext, LlmStreamClient, LlmStreamError, ObjectStream, ScriptedStreamClient};
pub use router::{
    HandlesAction, HandlesActionUpdate, HandlesAnswer, HandlesQuestion, RouteOutcome,
    RouterMetricsSnapshot, StreamRouter, StreamRouterBuilder,
};
pub use types::{
    ActionObject, ActionUpdateObject, AnswerObject, ObjectKind, QuestionObject, StreamObject,
};
