//! Action item tracking
//!
//! Owns the lifecycle of detected action items: confidence filtering at
//! creation, completeness scoring, fuzzy merge of duplicate mentions,
//! field updates by stream-assigned ID, and end-of-segment alerting for
//! incomplete high-confidence actions.

use super::merge::{completeness_score, token_set_jaccard};
use crate::config::ActionConfig;
use crate::error::Result;
use crate::events::{BroadcastEvent, EventBroadcaster};
use crate::insight::{
    FieldChange, Insight, InsightBuilder, InsightKind, InsightStatus, InsightStore,
};
use crate::stream::{ActionObject, ActionUpdateObject, HandlesAction, HandlesActionUpdate};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;

/// Per-session action handler
pub struct ActionHandler {
    session_id: String,
    config: ActionConfig,
    store: Arc<dyn InsightStore>,
    broadcaster: EventBroadcaster,
}

impl ActionHandler {
    /// Create a handler for the given session
    pub fn new(
        session_id: impl Into<String>,
        config: ActionConfig,
        store: Arc<dyn InsightStore>,
        broadcaster: EventBroadcaster,
    ) -> Self {
        Self {
            session_id: session_id.into(),
            config,
            store,
            broadcaster,
        }
    }

    /// Scan tracked actions at a meeting-segment boundary and alert on
    /// high-confidence items that still miss owner or deadline.
    pub async fn on_segment_boundary(&self) -> Result<()> {
        let tracked = self
            .store
            .find(&self.session_id, InsightKind::Action, Some(InsightStatus::Tracked))
            .await?;

        for insight in tracked {
            if insight.confidence() < self.config.alert_confidence || insight.completeness() >= 1.0
            {
                continue;
            }
            let mut missing = Vec::new();
            if insight.owner().is_none() {
                missing.push("owner".to_string());
            }
            if insight.deadline().is_none() {
                missing.push("deadline".to_string());
            }
            if missing.is_empty() {
                continue;
            }
            tracing::info!(
                session_id = %self.session_id,
                insight_id = %insight.id,
                missing = ?missing,
                "incomplete high-confidence action at segment boundary"
            );
            self.broadcaster.broadcast(BroadcastEvent::ActionAlert {
                insight,
                missing_fields: missing,
            });
        }
        Ok(())
    }

    /// Merge a duplicate mention into an existing action record: fill only
    /// missing owner/deadline, remember the external ID, recompute
    /// completeness. No new record is created.
    async fn merge_into(&self, mut existing: Insight, object: &ActionObject) -> Result<()> {
        let mut changes: HashMap<String, FieldChange> = HashMap::new();

        if existing.owner().is_none() {
            if let Some(owner) = object.owner.as_deref().filter(|o| !o.trim().is_empty()) {
                changes.insert(
                    "owner".to_string(),
                    FieldChange {
                        from: None,
                        to: Some(owner.to_string()),
                    },
                );
                existing.set_meta("owner", serde_json::json!(owner));
            }
        }
        if existing.deadline().is_none() {
            if let Some(deadline) = object.deadline.as_deref().filter(|d| !d.trim().is_empty()) {
                changes.insert(
                    "deadline".to_string(),
                    FieldChange {
                        from: None,
                        to: Some(deadline.to_string()),
                    },
                );
                existing.set_meta("deadline", serde_json::json!(deadline));
            }
        }

        existing.push_related_id(&object.id);

        let completeness =
            completeness_score(&existing.content, existing.owner(), existing.deadline());
        existing.set_meta("completeness", serde_json::json!(completeness));
        if completeness >= 1.0 && existing.status == InsightStatus::Tracked {
            existing.status = InsightStatus::Complete;
        }

        self.store.update(&existing).await?;
        tracing::info!(
            session_id = %self.session_id,
            insight_id = %existing.id,
            external_id = %object.id,
            "merged duplicate action mention"
        );
        self.broadcaster
            .broadcast(BroadcastEvent::ActionUpdated {
                insight: existing,
                changes,
            });
        Ok(())
    }
}

#[async_trait]
impl HandlesAction for ActionHandler {
    async fn handle_action(&self, object: ActionObject) -> Result<()> {
        if object.confidence < self.config.confidence_floor {
            tracing::debug!(
                session_id = %self.session_id,
                confidence = object.confidence,
                "dropping low-confidence action"
            );
            return Ok(());
        }

        // Fuzzy dedup against the most recent tracked/complete actions
        let existing = self
            .store
            .find(&self.session_id, InsightKind::Action, None)
            .await?;
        let candidates: Vec<&Insight> = existing
            .iter()
            .filter(|i| matches!(i.status, InsightStatus::Tracked | InsightStatus::Complete))
            .collect();
        let start = candidates
            .len()
            .saturating_sub(self.config.merge_candidate_window);
        for candidate in &candidates[start..] {
            let similarity = token_set_jaccard(&object.description, &candidate.content);
            if similarity > self.config.merge_threshold {
                return self.merge_into((*candidate).clone(), &object).await;
            }
        }

        let completeness = completeness_score(
            &object.description,
            object.owner.as_deref(),
            object.deadline.as_deref(),
        );

        let mut builder = InsightBuilder::new(&self.session_id, InsightKind::Action)
            .content(&object.description)
            .speaker(object.speaker.clone())
            .metadata("gpt_id", serde_json::json!(object.id))
            .metadata("confidence", serde_json::json!(object.confidence))
            .metadata("completeness", serde_json::json!(completeness))
            .metadata("timestamp", serde_json::json!(object.timestamp));
        if let Some(owner) = object.owner.as_deref() {
            builder = builder.metadata("owner", serde_json::json!(owner));
        }
        if let Some(deadline) = object.deadline.as_deref() {
            builder = builder.metadata("deadline", serde_json::json!(deadline));
        }

        let mut insight = builder.build()?;
        if completeness >= 1.0 {
            insight.status = InsightStatus::Complete;
        }

        self.store.create(insight.clone()).await?;
        tracing::info!(
            session_id = %self.session_id,
            insight_id = %insight.id,
            completeness,
            "tracking new action"
        );
        self.broadcaster
            .broadcast(BroadcastEvent::ActionTracked { insight });
        Ok(())
    }
}

#[async_trait]
impl HandlesActionUpdate for ActionHandler {
    async fn handle_action_update(&self, object: ActionUpdateObject) -> Result<()> {
        let external_id = match object.id.as_deref() {
            Some(id) => id,
            None => {
                tracing::warn!(
                    session_id = %self.session_id,
                    "action_update without resolvable target, skipping"
                );
                return Ok(());
            }
        };

        // Updates address the persisted record by its stream-assigned ID,
        // not the router's text map
        let all = self
            .store
            .find(&self.session_id, InsightKind::Action, None)
            .await?;
        let mut insight = match all.into_iter().find(|i| i.gpt_id() == Some(external_id)) {
            Some(i) => i,
            None => {
                tracing::warn!(
                    session_id = %self.session_id,
                    external_id,
                    "action_update for unknown action"
                );
                return Ok(());
            }
        };

        let mut changes: HashMap<String, FieldChange> = HashMap::new();

        if let Some(owner) = object.owner.as_deref().filter(|o| !o.trim().is_empty()) {
            if insight.owner() != Some(owner) {
                changes.insert(
                    "owner".to_string(),
                    FieldChange {
                        from: insight.owner().map(String::from),
                        to: Some(owner.to_string()),
                    },
                );
                insight.set_meta("owner", serde_json::json!(owner));
            }
        }
        if let Some(deadline) = object.deadline.as_deref().filter(|d| !d.trim().is_empty()) {
            if insight.deadline() != Some(deadline) {
                changes.insert(
                    "deadline".to_string(),
                    FieldChange {
                        from: insight.deadline().map(String::from),
                        to: Some(deadline.to_string()),
                    },
                );
                insight.set_meta("deadline", serde_json::json!(deadline));
            }
        }

        if changes.is_empty() {
            tracing::debug!(
                session_id = %self.session_id,
                external_id,
                "action_update carried no new field values"
            );
            return Ok(());
        }

        insight.push_update_record(&changes);

        let completeness =
            completeness_score(&insight.content, insight.owner(), insight.deadline());
        insight.set_meta("completeness", serde_json::json!(completeness));
        if completeness >= 1.0 && insight.status == InsightStatus::Tracked {
            insight.status = InsightStatus::Complete;
            tracing::info!(
                session_id = %self.session_id,
                insight_id = %insight.id,
                "action is now complete"
            );
        }

        self.store.update(&insight).await?;
        self.broadcaster
            .broadcast(BroadcastEvent::ActionUpdated { insight, changes });
        Ok(())
    }
}
