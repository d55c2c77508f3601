//! Insight persistence interface and in-memory implementation
//!
//! The store is the single source of truth for final status. In-memory
//! handler state (monitoring task maps, router ID sets) is a coordination
//! aid only; when a race is possible the persisted status wins, which is
//! why `answer_question` performs its status check and write under one
//! lock.

use super::model::{AnswerSource, Insight, InsightKind, InsightStatus};
use crate::error::Result;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

/// Persistence interface for insights
#[async_trait]
pub trait InsightStore: Send + Sync {
    /// Persist a new insight
    async fn create(&self, insight: Insight) -> Result<()>;

    /// Fetch an insight by ID
    async fn get(&self, id: Uuid) -> Result<Option<Insight>>;

    /// Replace an insight record
    async fn update(&self, insight: &Insight) -> Result<()>;

    /// Query insights by session, kind, and (optionally) status
    async fn find(
        &self,
        session_id: &str,
        kind: InsightKind,
        status: Option<InsightStatus>,
    ) -> Result<Vec<Insight>>;

    /// Record an answer for a question, but only if its persisted status is
    /// still `Searching`. Returns the updated insight on success, `None` if
    /// another writer already resolved the question.
    async fn answer_question(
        &self,
        id: Uuid,
        answer: &str,
        source: AnswerSource,
    ) -> Result<Option<Insight>>;

    /// Transition a question to `Unanswered`, but only if its persisted
    /// status is still `Searching`. This is the authoritative re-check
    /// before broadcasting an unanswered verdict: an answer persisted by a
    /// concurrent writer just as discovery times out must win.
    async fn mark_unanswered_if_searching(&self, id: Uuid) -> Result<Option<Insight>>;
}

/// In-memory insight store
pub struct MemoryInsightStore {
    insights: Arc<RwLock<HashMap<Uuid, Insight>>>,
}

impl MemoryInsightStore {
    /// Create a new empty store
    pub fn new() -> Self {
        Self {
            insights: Arc::new(RwLock::new(HashMap::new())),
        }
    }
}

impl Default for MemoryInsightStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl InsightStore for MemoryInsightStore {
    async fn create(&self, insight: Insight) -> Result<()> {
        self.insights.write().await.insert(insight.id, insight);
        Ok(())
    }

    async fn get(&self, id: Uuid) -> Result<Option<Insight>> {
        Ok(self.insights.read().await.get(&id).cloned())
    }

    async fn update(&self, insight: &Insight) -> Result<()> {
        let mut map = self.insights.write().await;
        if !map.contains_key(&insight.id) {
            return Err(crate::Error::Persistence(format!(
                "insight {} does not exist",
                insight.id
            )));
        }
        map.insert(insight.id, insight.clone());
        Ok(())
    }

    async fn find(
        &self,
        session_id: &str,
        kind: InsightKind,
        status: Option<InsightStatus>,
    ) -> Result<Vec<Insight>> {
        let map = self.insights.read().await;
        let mut found: Vec<Insight> = map
            .values()
            .filter(|i| i.session_id == session_id && i.kind == kind)
            .filter(|i| status.map_or(true, |s| i.status == s))
            .cloned()
            .collect();
        found.sort_by_key(|i| i.detected_at);
        Ok(found)
    }

    async fn answer_question(
        &self,
        id: Uuid,
        answer: &str,
        source: AnswerSource,
    ) -> Result<Option<Insight>> {
        let mut map = self.insights.write().await;
        let insight = match map.get_mut(&id) {
            Some(i) => i,
            None => {
                return Err(crate::Error::Persistence(format!(
                    "insight {} does not exist",
                    id
                )))
            }
        };

        if insight.status != InsightStatus::Searching {
            return Ok(None);
        }

        insight.status = InsightStatus::Answered;
        insight.set_meta("answer", serde_json::json!(answer));
        insight.set_meta("answer_source", serde_json::json!(source));
        Ok(Some(insight.clone()))
    }

    async fn mark_unanswered_if_searching(&self, id: Uuid) -> Result<Option<Insight>> {
        let mut map = self.insights.write().await;
        let insight = match map.get_mut(&id) {
            Some(i) => i,
            None => {
                return Err(crate::Error::Persistence(format!(
                    "insight {} does not exist",
                    id
                )))
            }
        };

        if insight.status != InsightStatus::Searching {
            return Ok(None);
        }

        insight.status = InsightStatus::Unanswered;
        Ok(Some(insight.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::insight::model::InsightBuilder;

    fn question(session: &str, text: &str) -> Insight {
        InsightBuilder::new(session, InsightKind::Question)
            .content(text)
            .build()
            .unwrap()
    }

    #[tokio::test]
    async fn test_create_and_get() {
        let store = MemoryInsightStore::new();
        let insight = question("s1", "what changed?");
        let id = insight.id;

        store.create(insight).await.unwrap();
        let fetched = store.get(id).await.unwrap().unwrap();
        assert_eq!(fetched.content, "what changed?");
    }

    #[tokio::test]
    async fn test_update_missing_fails() {
        let store = MemoryInsightStore::new();
        let insight = question("s1", "never created");
        assert!(store.update(&insight).await.is_err());
    }

    #[tokio::test]
    async fn test_find_filters_by_session_kind_status() {
        let store = MemoryInsightStore::new();
        store.create(question("s1", "q one")).await.unwrap();
        store.create(question("s2", "q two")).await.unwrap();
        let action = InsightBuilder::new("s1", InsightKind::Action)
            .content("do the thing")
            .build()
            .unwrap();
        store.create(action).await.unwrap();

        let questions = store
            .find("s1", InsightKind::Question, None)
            .await
            .unwrap();
        assert_eq!(questions.len(), 1);

        let searching = store
            .find("s1", InsightKind::Question, Some(InsightStatus::Searching))
            .await
            .unwrap();
        assert_eq!(searching.len(), 1);

        let answered = store
            .find("s1", InsightKind::Question, Some(InsightStatus::Answered))
            .await
            .unwrap();
        assert!(answered.is_empty());
    }

    #[tokio::test]
    async fn test_answer_question_first_writer_wins() {
        let store = MemoryInsightStore::new();
        let insight = question("s1", "who owns this?");
        let id = insight.id;
        store.create(insight).await.unwrap();

        let first = store
            .answer_question(id, "alice does", AnswerSource::LiveMonitoring)
            .await
            .unwrap();
        assert!(first.is_some());
        let answered = first.unwrap();
        assert_eq!(answered.status, InsightStatus::Answered);
        assert_eq!(
            answered.metadata.get("answer_source").unwrap(),
            &serde_json::json!("live_monitoring")
        );

        // A second writer must not overwrite the recorded answer
        let second = store
            .answer_question(id, "bob does", AnswerSource::AiGenerated)
            .await
            .unwrap();
        assert!(second.is_none());

        let current = store.get(id).await.unwrap().unwrap();
        assert_eq!(
            current.metadata.get("answer").unwrap(),
            &serde_json::json!("alice does")
        );
    }

    #[tokio::test]
    async fn test_mark_unanswered_only_while_searching() {
        let store = MemoryInsightStore::new();
        let insight = question("s1", "does anyone know?");
        let id = insight.id;
        store.create(insight).await.unwrap();

        let marked = store.mark_unanswered_if_searching(id).await.unwrap();
        assert_eq!(marked.unwrap().status, InsightStatus::Unanswered);

        // Already unanswered: no further transition
        assert!(store.mark_unanswered_if_searching(id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_mark_unanswered_loses_to_persisted_answer() {
        let store = MemoryInsightStore::new();
        let insight = question("s1", "who signs off?");
        let id = insight.id;
        store.create(insight).await.unwrap();

        store
            .answer_question(id, "legal does", AnswerSource::MeetingContext)
            .await
            .unwrap();

        assert!(store.mark_unanswered_if_searching(id).await.unwrap().is_none());
        assert_eq!(
            store.get(id).await.unwrap().unwrap().status,
            InsightStatus::Answered
        );
    }
}
