//! Answer-discovery collaborators
//!
//! Tier 1 of question discovery queries the project's indexed document
//! store; tier 3 asks the LLM for a best-effort generated answer. Both are
//! external services behind traits here, with in-memory implementations
//! for tests and the replay CLI.

use crate::error::Result;
use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::RwLock;

/// Indexed knowledge-base search (discovery tier 1)
#[async_trait]
pub trait KnowledgeSearch: Send + Sync {
    /// Find a passage answering the question, if the index has one.
    /// Any result found is authoritative.
    async fn search_answer(&self, session_id: &str, question: &str) -> Result<Option<String>>;
}

/// Best-effort AI answer generation (discovery tier 3)
#[async_trait]
pub trait AnswerGenerator: Send + Sync {
    /// Generate an answer from general/project knowledge, or `None` when
    /// the model declines to answer.
    async fn generate_answer(&self, question: &str, context: &[String]) -> Result<Option<String>>;
}

/// Keyword-matched in-memory knowledge base
///
/// Returns the passage of the first entry whose keyword occurs in the
/// question (case-insensitive). Empty by default, which makes tier 1 a
/// guaranteed miss in tests that exercise the other tiers.
#[derive(Default)]
pub struct MemoryKnowledgeBase {
    entries: RwLock<HashMap<String, String>>,
}

impl MemoryKnowledgeBase {
    /// Create an empty knowledge base
    pub fn new() -> Self {
        Self::default()
    }

    /// Index a passage under a keyword
    pub async fn index(&self, keyword: impl Into<String>, passage: impl Into<String>) {
        self.entries
            .write()
            .await
            .insert(keyword.into().to_lowercase(), passage.into());
    }
}

#[async_trait]
impl KnowledgeSearch for MemoryKnowledgeBase {
    async fn search_answer(&self, _session_id: &str, question: &str) -> Result<Option<String>> {
        let question = question.to_lowercase();
        let entries = self.entries.read().await;
        Ok(entries
            .iter()
            .find(|(keyword, _)| question.contains(keyword.as_str()))
            .map(|(_, passage)| passage.clone()))
    }
}

/// Canned answer generator for tests and replay
///
/// Always returns the configured answer (or `None`).
pub struct CannedAnswerGenerator {
    answer: Option<String>,
}

impl CannedAnswerGenerator {
    /// Generator that always produces the given answer
    pub fn new(answer: impl Into<String>) -> Self {
        Self {
            answer: Some(answer.into()),
        }
    }

    /// Generator that always declines
    pub fn silent() -> Self {
        Self { answer: None }
    }
}

#[async_trait]
impl AnswerGenerator for CannedAnswerGenerator {
    async fn generate_answer(&self, _question: &str, _context: &[String]) -> Result<Option<String>> {
        Ok(self.answer.clone())
    }
}
