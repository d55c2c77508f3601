//! Question lifecycle handling
//!
//! Owns a detected question from `Searching` through concurrent answer
//! discovery to `Answered` or `Unanswered`. The persisted status is the
//! single source of truth for the final verdict: an unanswered broadcast
//! happens only if the store still says `Searching` once every tier has
//! completed.

use super::discovery::Discovery;
use super::monitor::LiveMonitorRegistry;
use crate::error::Result;
use crate::events::{BroadcastEvent, EventBroadcaster};
use crate::insight::{InsightBuilder, InsightKind, InsightStore};
use crate::stream::{HandlesQuestion, QuestionObject};
use async_trait::async_trait;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Per-session question handler
pub struct QuestionHandler {
    session_id: String,
    discovery: Arc<Discovery>,
    store: Arc<dyn InsightStore>,
    broadcaster: EventBroadcaster,
    monitors: Arc<LiveMonitorRegistry>,
    cancel: CancellationToken,
}

impl QuestionHandler {
    /// Create a handler for the given session
    pub fn new(
        session_id: impl Into<String>,
        discovery: Arc<Discovery>,
        store: Arc<dyn InsightStore>,
        broadcaster: EventBroadcaster,
        monitors: Arc<LiveMonitorRegistry>,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            session_id: session_id.into(),
            discovery,
            store,
            broadcaster,
            monitors,
            cancel,
        }
    }
}

#[async_trait]
impl HandlesQuestion for QuestionHandler {
    async fn handle_question(&self, object: QuestionObject) -> Result<()> {
        // Questions are not confidence-filtered, unlike actions
        let mut builder = InsightBuilder::new(&self.session_id, InsightKind::Question)
            .content(&object.text)
            .speaker(object.speaker.clone())
            .metadata("gpt_id", serde_json::json!(object.id))
            .metadata("confidence", serde_json::json!(object.confidence))
            .metadata("timestamp", serde_json::json!(object.timestamp));
        if let Some(category) = object.category.as_deref() {
            builder = builder.metadata("category", serde_json::json!(category));
        }
        let insight = builder.build()?;

        self.store.create(insight.clone()).await?;
        tracing::info!(
            session_id = %self.session_id,
            insight_id = %insight.id,
            "question detected, starting answer discovery"
        );
        self.broadcaster.broadcast(BroadcastEvent::QuestionDetected {
            insight: insight.clone(),
        });

        let live_rx = self.monitors.register(&object.id, insight.id).await;

        let discovery = self.discovery.clone();
        let store = self.store.clone();
        let broadcaster = self.broadcaster.clone();
        let monitors = self.monitors.clone();
        let cancel = self.cancel.clone();
        let session_id = self.session_id.clone();
        let gpt_id = object.id.clone();
        let question_text = object.text.clone();
        let insight_id = insight.id;

        tokio::spawn(async move {
            let outcome = discovery
                .run(&session_id, &question_text, live_rx, cancel.clone())
                .await;
            monitors.remove(&gpt_id).await;

            if cancel.is_cancelled() {
                // Session teardown: leave the record as-is, no verdict
                return;
            }

            match outcome {
                Some(answer) => {
                    match store
                        .answer_question(insight_id, &answer.text, answer.source)
                        .await
                    {
                        Ok(Some(updated)) => {
                            tracing::info!(
                                session_id = %session_id,
                                insight_id = %insight_id,
                                source = %answer.source,
                                "question answered"
                            );
                            broadcaster.broadcast(BroadcastEvent::QuestionAnswered {
                                insight: updated,
                                answer_source: answer.source,
                            });
                        }
                        Ok(None) => {
                            tracing::debug!(
                                session_id = %session_id,
                                insight_id = %insight_id,
                                "question was already resolved by another writer"
                            );
                        }
                        Err(e) => {
                            tracing::warn!(
                                session_id = %session_id,
                                insight_id = %insight_id,
                                "failed to persist answer: {}",
                                e
                            );
                        }
                    }
                }
                None => {
                    // Every tier completed empty. The store has the final
                    // word: an answer persisted concurrently wins over the
                    // timeout.
                    match store.mark_unanswered_if_searching(insight_id).await {
                        Ok(Some(updated)) => {
                            tracing::info!(
                                session_id = %session_id,
                                insight_id = %insight_id,
                                "question unanswered after all discovery tiers"
                            );
                            broadcaster
                                .broadcast(BroadcastEvent::QuestionUnanswered { insight: updated });
                        }
                        Ok(None) => {
                            tracing::debug!(
                                session_id = %session_id,
                                insight_id = %insight_id,
                                "answer landed during finalization, suppressing unanswered verdict"
                            );
                        }
                        Err(e) => {
                            tracing::warn!(
                                session_id = %session_id,
                                insight_id = %insight_id,
                                "failed to finalize question: {}",
                                e
                            );
                        }
                    }
                }
            }
        });

        Ok(())
    }
}
