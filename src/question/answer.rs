//! Answer handling
//!
//! Peer of the question handler: receives detected spoken answers from the
//! router (identity already resolved by exact text match where possible)
//! and delivers them to the matching question. The common path hands the
//! answer to the question's live monitor (discovery tier 4); if discovery
//! has already finished, the answer is applied directly against the store,
//! which only accepts it while the question is still searching.

use super::monitor::{LiveAnswer, LiveMonitorRegistry};
use crate::error::Result;
use crate::events::{BroadcastEvent, EventBroadcaster};
use crate::insight::{AnswerSource, InsightKind, InsightStore};
use crate::stream::{AnswerObject, HandlesAnswer};
use async_trait::async_trait;
use std::sync::Arc;

/// Per-session answer handler
pub struct AnswerHandler {
    session_id: String,
    store: Arc<dyn InsightStore>,
    monitors: Arc<LiveMonitorRegistry>,
    broadcaster: EventBroadcaster,
}

impl AnswerHandler {
    /// Create a handler for the given session
    pub fn new(
        session_id: impl Into<String>,
        store: Arc<dyn InsightStore>,
        monitors: Arc<LiveMonitorRegistry>,
        broadcaster: EventBroadcaster,
    ) -> Self {
        Self {
            session_id: session_id.into(),
            store,
            monitors,
            broadcaster,
        }
    }
}

#[async_trait]
impl HandlesAnswer for AnswerHandler {
    async fn handle_answer(&self, object: AnswerObject) -> Result<()> {
        let question_id = match object.question_id.as_deref() {
            Some(id) => id,
            None => {
                tracing::warn!(
                    session_id = %self.session_id,
                    "answer could not be matched to any open question, dropping"
                );
                return Ok(());
            }
        };

        let live = LiveAnswer {
            text: object.answer_text.clone(),
            speaker: object.speaker.clone(),
        };

        if self.monitors.resolve(question_id, live).await {
            // The discovery task owns persistence and broadcast from here
            tracing::debug!(
                session_id = %self.session_id,
                question_id,
                "answer delivered to live monitor"
            );
            return Ok(());
        }

        // No active monitor: apply the answer directly. The store refuses
        // it if the question already has a verdict.
        let questions = self
            .store
            .find(&self.session_id, InsightKind::Question, None)
            .await?;
        let target = questions.into_iter().find(|q| q.gpt_id() == Some(question_id));

        match target {
            Some(q) => {
                match self
                    .store
                    .answer_question(q.id, &object.answer_text, AnswerSource::LiveMonitoring)
                    .await?
                {
                    Some(updated) => {
                        tracing::info!(
                            session_id = %self.session_id,
                            insight_id = %updated.id,
                            "question answered out of band"
                        );
                        self.broadcaster.broadcast(BroadcastEvent::QuestionAnswered {
                            insight: updated,
                            answer_source: AnswerSource::LiveMonitoring,
                        });
                    }
                    None => {
                        tracing::debug!(
                            session_id = %self.session_id,
                            question_id,
                            "question already resolved, ignoring late answer"
                        );
                    }
                }
            }
            None => {
                tracing::warn!(
                    session_id = %self.session_id,
                    question_id,
                    "answer references a question with no persisted record"
                );
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::{EventTransport, MemoryTransport};
    use crate::insight::{InsightBuilder, InsightStatus, MemoryInsightStore};
    use std::time::Duration;
    use tokio_util::sync::CancellationToken;

    struct Fixture {
        handler: AnswerHandler,
        store: Arc<MemoryInsightStore>,
        transport: Arc<MemoryTransport>,
        monitors: Arc<LiveMonitorRegistry>,
    }

    fn fixture() -> Fixture {
        let store = Arc::new(MemoryInsightStore::new());
        let transport = Arc::new(MemoryTransport::new());
        let monitors = Arc::new(LiveMonitorRegistry::new());
        let broadcaster = EventBroadcaster::start(
            "session-1",
            transport.clone() as Arc<dyn EventTransport>,
            CancellationToken::new(),
        );
        let handler = AnswerHandler::new(
            "session-1",
            store.clone() as Arc<dyn InsightStore>,
            monitors.clone(),
            broadcaster,
        );
        Fixture {
            handler,
            store,
            transport,
            monitors,
        }
    }

    fn answer(question_id: Option<&str>, text: &str) -> AnswerObject {
        AnswerObject {
            question_id: question_id.map(String::from),
            question_text: None,
            answer_text: text.to_string(),
            speaker: Some("bob".to_string()),
            timestamp: 9.0,
            confidence: 0.8,
        }
    }

    #[tokio::test]
    async fn test_answer_delivered_to_active_monitor() {
        let f = fixture();
        let insight = InsightBuilder::new("session-1", InsightKind::Question)
            .content("when do we launch?")
            .metadata("gpt_id", serde_json::json!("q_1"))
            .build()
            .unwrap();
        f.store.create(insight.clone()).await.unwrap();
        let rx = f.monitors.register("q_1", insight.id).await;

        f.handler
            .handle_answer(answer(Some("q_1"), "we launch in May"))
            .await
            .unwrap();

        let delivered = rx.await.unwrap();
        assert_eq!(delivered.text, "we launch in May");
        // Persistence is the discovery task's job on this path
        let current = f.store.get(insight.id).await.unwrap().unwrap();
        assert_eq!(current.status, InsightStatus::Searching);
    }

    #[tokio::test]
    async fn test_answer_without_monitor_persists_directly() {
        let f = fixture();
        let insight = InsightBuilder::new("session-1", InsightKind::Question)
            .content("who reviews the PR?")
            .metadata("gpt_id", serde_json::json!("q_2"))
            .build()
            .unwrap();
        f.store.create(insight.clone()).await.unwrap();

        f.handler
            .handle_answer(answer(Some("q_2"), "the platform team"))
            .await
            .unwrap();
        tokio::time::sleep(Duration::from_millis(20)).await;

        let current = f.store.get(insight.id).await.unwrap().unwrap();
        assert_eq!(current.status, InsightStatus::Answered);
        assert_eq!(
            current.metadata.get("answer_source").unwrap(),
            &serde_json::json!("live_monitoring")
        );
        assert_eq!(f.transport.event_names().await, vec!["QUESTION_ANSWERED"]);
    }

    #[tokio::test]
    async fn test_unmatched_answer_is_dropped() {
        let f = fixture();
        f.handler
            .handle_answer(answer(None, "orphan answer"))
            .await
            .unwrap();
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(f.transport.events().await.is_empty());
    }

    #[tokio::test]
    async fn test_late_answer_does_not_downgrade_verdict() {
        let f = fixture();
        let insight = InsightBuilder::new("session-1", InsightKind::Question)
            .content("already answered?")
            .metadata("gpt_id", serde_json::json!("q_3"))
            .build()
            .unwrap();
        let id = insight.id;
        f.store.create(insight).await.unwrap();
        f.store
            .answer_question(id, "first answer", AnswerSource::KnowledgeBase)
            .await
            .unwrap();

        f.handler
            .handle_answer(answer(Some("q_3"), "a different late answer"))
            .await
            .unwrap();

        let current = f.store.get(id).await.unwrap().unwrap();
        assert_eq!(
            current.metadata.get("answer").unwrap(),
            &serde_json::json!("first answer")
        );
        assert_eq!(
            current.metadata.get("answer_source").unwrap(),
            &serde_json::json!("knowledge_base")
        );
    }
}
