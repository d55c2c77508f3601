//! LLM streaming client interface
//!
//! The analysis model consumes accumulated transcript context and yields a
//! stream of raw JSON objects, one per detected unit. Provider failures
//! (rate limits, timeouts, overload) must surface as typed errors, never be
//! silently swallowed; the orchestrator decides what they mean for the
//! session.

use async_trait::async_trait;
use futures::stream::BoxStream;
use futures::StreamExt;
use std::collections::VecDeque;
use thiserror::Error;
use tokio::sync::Mutex;

/// Typed LLM provider errors
#[derive(Error, Debug, Clone)]
pub enum LlmStreamError {
    #[error("rate limited: {0}")]
    RateLimited(String),

    #[error("request timed out: {0}")]
    Timeout(String),

    #[error("provider overloaded: {0}")]
    Overloaded(String),

    #[error("provider error: {0}")]
    Provider(String),
}

/// Accumulated context handed to the analysis model per invocation
#[derive(Debug, Clone, Default)]
pub struct AnalysisContext {
    /// Finalized transcript sentences, oldest first
    pub transcript: Vec<String>,
    /// Recent open question texts (best effort, may be empty)
    pub open_questions: Vec<String>,
    /// Recent open action descriptions (best effort, may be empty)
    pub open_actions: Vec<String>,
}

/// A stream of raw wire objects from the analysis model
pub type ObjectStream = BoxStream<'static, std::result::Result<serde_json::Value, LlmStreamError>>;

/// Streaming client for the analysis LLM
#[async_trait]
pub trait LlmStreamClient: Send + Sync {
    /// Start one analysis pass over the given context.
    async fn stream(
        &self,
        context: &AnalysisContext,
    ) -> std::result::Result<ObjectStream, LlmStreamError>;

    /// Cheap reachability probe for health reporting
    fn is_available(&self) -> bool {
        true
    }
}

/// Scripted client for tests and replay: each `stream` call yields the next
/// queued batch of raw objects (empty stream once exhausted).
pub struct ScriptedStreamClient {
    batches: Mutex<VecDeque<Vec<serde_json::Value>>>,
}

impl ScriptedStreamClient {
    /// Create a client that will serve the given batches in order
    pub fn new(batches: Vec<Vec<serde_json::Value>>) -> Self {
        Self {
            batches: Mutex::new(batches.into()),
        }
    }
}

#[async_trait]
impl LlmStreamClient for ScriptedStreamClient {
    async fn stream(
        &self,
        _context: &AnalysisContext,
    ) -> std::result::Result<ObjectStream, LlmStreamError> {
        let batch = self.batches.lock().await.pop_front().unwrap_or_default();
        Ok(futures::stream::iter(batch.into_iter().map(Ok)).boxed())
    }
}
