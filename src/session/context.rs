//! Transcript context buffer and the lightweight context cache
//!
//! The buffer holds finalized sentences of the current meeting and backs
//! two consumers: the orchestrator's rolling LLM context, and discovery
//! tier 2's in-meeting answer search. The context cache supplies recent
//! open questions/actions for the LLM prompt; it is best effort and the
//! orchestrator falls back to an empty snapshot when it is unreachable.

use crate::error::Result;
use crate::insight::{InsightKind, InsightStatus, InsightStore};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::Arc;
use tokio::sync::RwLock;

/// One transcription result delivered to the orchestrator
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranscriptChunk {
    pub text: String,
    /// Interim results are discarded; only final chunks advance state
    pub is_final: bool,
    pub speaker: Option<String>,
    pub timestamp: f64,
}

/// Rolling buffer of finalized transcript sentences
pub struct TranscriptBuffer {
    max_sentences: usize,
    sentences: RwLock<Vec<String>>,
}

impl TranscriptBuffer {
    /// Create a buffer retaining at most `max_sentences` recent sentences
    pub fn new(max_sentences: usize) -> Self {
        Self {
            max_sentences,
            sentences: RwLock::new(Vec::new()),
        }
    }

    /// Append a finalized sentence, evicting the oldest past capacity
    pub async fn push(&self, sentence: impl Into<String>) {
        let mut sentences = self.sentences.write().await;
        sentences.push(sentence.into());
        if sentences.len() > self.max_sentences {
            let excess = sentences.len() - self.max_sentences;
            sentences.drain(..excess);
        }
    }

    /// Current buffer contents, oldest first
    pub async fn sentences(&self) -> Vec<String> {
        self.sentences.read().await.clone()
    }

    /// Number of buffered sentences
    pub async fn len(&self) -> usize {
        self.sentences.read().await.len()
    }

    /// Whether the buffer is empty
    pub async fn is_empty(&self) -> bool {
        self.sentences.read().await.is_empty()
    }

    /// Scan already-processed sentences for a textual answer to the
    /// question (discovery tier 2).
    ///
    /// A sentence qualifies when it shares more than half of the
    /// question's content words (tokens of 4+ characters) and is not the
    /// question itself.
    pub async fn find_answer(&self, question: &str) -> Option<String> {
        let question_tokens: HashSet<String> = question
            .to_lowercase()
            .split_whitespace()
            .map(|t| t.trim_matches(|c: char| !c.is_alphanumeric()).to_string())
            .filter(|t| t.len() >= 4)
            .collect();
        if question_tokens.is_empty() {
            return None;
        }

        let sentences = self.sentences.read().await;
        let mut best: Option<(f64, &String)> = None;
        for sentence in sentences.iter() {
            if sentence.trim().eq_ignore_ascii_case(question.trim()) {
                continue;
            }
            let sentence_tokens: HashSet<String> = sentence
                .to_lowercase()
                .split_whitespace()
                .map(|t| t.trim_matches(|c: char| !c.is_alphanumeric()).to_string())
                .filter(|t| t.len() >= 4)
                .collect();
            let overlap = question_tokens.intersection(&sentence_tokens).count();
            let score = overlap as f64 / question_tokens.len() as f64;
            if score > 0.5 && best.map_or(true, |(b, _)| score > b) {
                best = Some((score, sentence));
            }
        }
        best.map(|(_, s)| s.clone())
    }
}

/// Recent open questions/actions for the LLM prompt
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MeetingSnapshot {
    pub open_questions: Vec<String>,
    pub open_actions: Vec<String>,
}

/// Fast cache of recent session state
#[async_trait]
pub trait ContextCache: Send + Sync {
    /// Fetch up to `limit` recent open questions and actions
    async fn snapshot(&self, session_id: &str, limit: usize) -> Result<MeetingSnapshot>;

    /// Cheap reachability probe for health reporting
    fn is_available(&self) -> bool {
        true
    }
}

/// Cache implementation reading through to the insight store
pub struct StoreBackedCache {
    store: Arc<dyn InsightStore>,
}

impl StoreBackedCache {
    /// Create a read-through cache over the given store
    pub fn new(store: Arc<dyn InsightStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl ContextCache for StoreBackedCache {
    async fn snapshot(&self, session_id: &str, limit: usize) -> Result<MeetingSnapshot> {
        let questions = self
            .store
            .find(session_id, InsightKind::Question, Some(InsightStatus::Searching))
            .await?;
        let actions = self
            .store
            .find(session_id, InsightKind::Action, Some(InsightStatus::Tracked))
            .await?;

        let tail = |mut items: Vec<String>| {
            let start = items.len().saturating_sub(limit);
            items.drain(..start);
            items
        };

        Ok(MeetingSnapshot {
            open_questions: tail(questions.into_iter().map(|i| i.content).collect()),
            open_actions: tail(actions.into_iter().map(|i| i.content).collect()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::insight::{InsightBuilder, MemoryInsightStore};

    #[tokio::test]
    async fn test_buffer_evicts_oldest() {
        let buffer = TranscriptBuffer::new(3);
        for i in 0..5 {
            buffer.push(format!("sentence {i}")).await;
        }
        let sentences = buffer.sentences().await;
        assert_eq!(sentences, vec!["sentence 2", "sentence 3", "sentence 4"]);
    }

    #[tokio::test]
    async fn test_find_answer_matches_overlapping_sentence() {
        let buffer = TranscriptBuffer::new(10);
        buffer.push("We kicked off the meeting at nine.").await;
        buffer
            .push("The vendor contract renewal deadline is next Friday.")
            .await;

        let answer = buffer
            .find_answer("What is the vendor contract renewal deadline?")
            .await;
        assert_eq!(
            answer.as_deref(),
            Some("The vendor contract renewal deadline is next Friday.")
        );
    }

    #[tokio::test]
    async fn test_find_answer_ignores_the_question_itself() {
        let buffer = TranscriptBuffer::new(10);
        buffer
            .push("What is the vendor contract renewal deadline?")
            .await;

        let answer = buffer
            .find_answer("What is the vendor contract renewal deadline?")
            .await;
        assert!(answer.is_none());
    }

    #[tokio::test]
    async fn test_find_answer_requires_majority_overlap() {
        let buffer = TranscriptBuffer::new(10);
        buffer.push("Someone mentioned lunch plans.").await;

        let answer = buffer.find_answer("What is the deployment schedule?").await;
        assert!(answer.is_none());
    }

    #[tokio::test]
    async fn test_store_backed_cache_snapshot() {
        let store = Arc::new(MemoryInsightStore::new());
        for i in 0..3 {
            store
                .create(
                    InsightBuilder::new("s1", InsightKind::Question)
                        .content(format!("question {i}?"))
                        .build()
                        .unwrap(),
                )
                .await
                .unwrap();
        }
        store
            .create(
                InsightBuilder::new("s1", InsightKind::Action)
                    .content("review the proposal")
                    .build()
                    .unwrap(),
            )
            .await
            .unwrap();

        let cache = StoreBackedCache::new(store as Arc<dyn InsightStore>);
        let snapshot = cache.snapshot("s1", 2).await.unwrap();
        assert_eq!(snapshot.open_questions.len(), 2);
        assert_eq!(snapshot.open_actions, vec!["review the proposal"]);
    }
}
