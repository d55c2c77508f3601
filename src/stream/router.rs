//! Per-session stream routing
//!
//! One router exists per meeting session. It parses raw wire objects,
//! repairs identity for text-referenced updates/answers, tracks seen IDs so
//! duplicate creations are never re-dispatched, and forwards each object to
//! exactly one registered handler. Malformed objects are dropped and
//! counted; a handler failure is wrapped and re-raised so the orchestrator
//! can decide whether the session survives.

use super::types::{
    id_style_ok, ActionObject, ActionUpdateObject, AnswerObject, ObjectKind, QuestionObject,
    StreamObject,
};
use crate::error::{Error, Result};
use async_trait::async_trait;
use serde::Serialize;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::RwLock;

// =============================================================================
// Handler capability traits
// =============================================================================

/// Receives newly detected questions
#[async_trait]
pub trait HandlesQuestion: Send + Sync {
    async fn handle_question(&self, object: QuestionObject) -> Result<()>;
}

/// Receives newly detected action items
#[async_trait]
pub trait HandlesAction: Send + Sync {
    async fn handle_action(&self, object: ActionObject) -> Result<()>;
}

/// Receives updates to previously detected actions (identity pre-resolved
/// by the router where possible)
#[async_trait]
pub trait HandlesActionUpdate: Send + Sync {
    async fn handle_action_update(&self, object: ActionUpdateObject) -> Result<()>;
}

/// Receives detected spoken answers (question identity pre-resolved by the
/// router where possible)
#[async_trait]
pub trait HandlesAnswer: Send + Sync {
    async fn handle_answer(&self, object: AnswerObject) -> Result<()>;
}

// =============================================================================
// Router state and metrics
// =============================================================================

/// Session-scoped identity state
///
/// A cache and coordination aid only — never authoritative where a race is
/// possible. Text keys are trimmed; matching is exact beyond that (fuzzy
/// matching lives in the action handler's merge logic, not here).
#[derive(Debug, Default)]
struct RouterState {
    seen_question_ids: HashSet<String>,
    seen_action_ids: HashSet<String>,
    question_text_to_id: HashMap<String, String>,
    action_text_to_id: HashMap<String, String>,
}

/// Router counters (atomics; snapshot for reporting)
#[derive(Debug, Default)]
struct RouterMetrics {
    total_objects: AtomicU64,
    questions_routed: AtomicU64,
    actions_routed: AtomicU64,
    action_updates_routed: AtomicU64,
    answers_routed: AtomicU64,
    duplicate_objects: AtomicU64,
    malformed_objects: AtomicU64,
    routing_errors: AtomicU64,
    latency_total_us: AtomicU64,
    latency_samples: AtomicU64,
}

/// Serializable view of the router counters
#[derive(Debug, Clone, Serialize)]
pub struct RouterMetricsSnapshot {
    pub total_objects_processed: u64,
    pub questions_routed: u64,
    pub actions_routed: u64,
    pub action_updates_routed: u64,
    pub answers_routed: u64,
    pub duplicate_objects: u64,
    pub malformed_objects: u64,
    pub routing_errors: u64,
    /// Average per-object routing latency in microseconds
    pub avg_latency_us: f64,
}

/// Result of routing one raw wire object
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteOutcome {
    /// Dispatched to its handler
    Routed(ObjectKind),
    /// Valid creation object whose ID was already seen; tracked, not
    /// re-dispatched
    Duplicate(ObjectKind),
    /// Dropped at the parse boundary
    Malformed,
}

// =============================================================================
// StreamRouter
// =============================================================================

/// Validates, classifies and dispatches stream objects for one session
pub struct StreamRouter {
    session_id: String,
    question_handler: Arc<dyn HandlesQuestion>,
    action_handler: Arc<dyn HandlesAction>,
    action_update_handler: Arc<dyn HandlesActionUpdate>,
    answer_handler: Arc<dyn HandlesAnswer>,
    state: RwLock<RouterState>,
    metrics: RouterMetrics,
}

/// Builder assembling a router's handler set at session start
pub struct StreamRouterBuilder {
    session_id: String,
    question_handler: Option<Arc<dyn HandlesQuestion>>,
    action_handler: Option<Arc<dyn HandlesAction>>,
    action_update_handler: Option<Arc<dyn HandlesActionUpdate>>,
    answer_handler: Option<Arc<dyn HandlesAnswer>>,
}

impl StreamRouterBuilder {
    /// Start a builder for the given session
    pub fn new(session_id: impl Into<String>) -> Self {
        Self {
            session_id: session_id.into(),
            question_handler: None,
            action_handler: None,
            action_update_handler: None,
            answer_handler: None,
        }
    }

    /// Register the question handler
    pub fn question(mut self, handler: Arc<dyn HandlesQuestion>) -> Self {
        self.question_handler = Some(handler);
        self
    }

    /// Register the action handler
    pub fn action(mut self, handler: Arc<dyn HandlesAction>) -> Self {
        self.action_handler = Some(handler);
        self
    }

    /// Register the action-update handler
    pub fn action_update(mut self, handler: Arc<dyn HandlesActionUpdate>) -> Self {
        self.action_update_handler = Some(handler);
        self
    }

    /// Register the answer handler
    pub fn answer(mut self, handler: Arc<dyn HandlesAnswer>) -> Self {
        self.answer_handler = Some(handler);
        self
    }

    /// Build the router; every capability must be registered
    pub fn build(self) -> Result<StreamRouter> {
        let missing = |what: &str| Error::Internal(format!("router requires {} handler", what));
        Ok(StreamRouter {
            session_id: self.session_id,
            question_handler: self.question_handler.ok_or_else(|| missing("a question"))?,
            action_handler: self.action_handler.ok_or_else(|| missing("an action"))?,
            action_update_handler: self
                .action_update_handler
                .ok_or_else(|| missing("an action-update"))?,
            answer_handler: self.answer_handler.ok_or_else(|| missing("an answer"))?,
            state: RwLock::new(RouterState::default()),
            metrics: RouterMetrics::default(),
        })
    }
}

impl StreamRouter {
    /// Route one raw wire object.
    ///
    /// Malformed objects are dropped (counted, logged) and the stream
    /// continues; a handler failure increments the error counter and is
    /// wrapped into [`Error::Routing`] for the caller to decide on.
    pub async fn route(&self, raw: serde_json::Value) -> Result<RouteOutcome> {
        let started = Instant::now();

        let object = match StreamObject::parse(raw) {
            Ok(object) => object,
            Err(reason) => {
                self.metrics.malformed_objects.fetch_add(1, Ordering::Relaxed);
                tracing::warn!(
                    session_id = %self.session_id,
                    "dropping malformed stream object: {}",
                    reason
                );
                return Ok(RouteOutcome::Malformed);
            }
        };

        let kind = object.kind();
        self.metrics.total_objects.fetch_add(1, Ordering::Relaxed);

        let outcome = match object {
            StreamObject::Question(q) => self.route_question(q).await?,
            StreamObject::Action(a) => self.route_action(a).await?,
            StreamObject::ActionUpdate(u) => self.route_action_update(u).await?,
            StreamObject::Answer(ans) => self.route_answer(ans).await?,
        };

        let elapsed_us = started.elapsed().as_micros() as u64;
        self.metrics
            .latency_total_us
            .fetch_add(elapsed_us, Ordering::Relaxed);
        self.metrics.latency_samples.fetch_add(1, Ordering::Relaxed);

        tracing::debug!(
            session_id = %self.session_id,
            kind = %kind,
            outcome = ?outcome,
            elapsed_us,
            "routed stream object"
        );

        Ok(outcome)
    }

    async fn route_question(&self, object: QuestionObject) -> Result<RouteOutcome> {
        if !id_style_ok(&object.id, 'q') {
            tracing::warn!(
                session_id = %self.session_id,
                id = %object.id,
                "question ID does not match q_<uuid> convention, accepting anyway"
            );
        }

        {
            let mut state = self.state.write().await;
            if !state.seen_question_ids.insert(object.id.clone()) {
                self.metrics.duplicate_objects.fetch_add(1, Ordering::Relaxed);
                return Ok(RouteOutcome::Duplicate(ObjectKind::Question));
            }
            state
                .question_text_to_id
                .insert(object.text.trim().to_string(), object.id.clone());
        }

        self.dispatch(ObjectKind::Question, self.question_handler.handle_question(object))
            .await?;
        self.metrics.questions_routed.fetch_add(1, Ordering::Relaxed);
        Ok(RouteOutcome::Routed(ObjectKind::Question))
    }

    async fn route_action(&self, object: ActionObject) -> Result<RouteOutcome> {
        if !id_style_ok(&object.id, 'a') {
            tracing::warn!(
                session_id = %self.session_id,
                id = %object.id,
                "action ID does not match a_<uuid> convention, accepting anyway"
            );
        }

        {
            let mut state = self.state.write().await;
            if !state.seen_action_ids.insert(object.id.clone()) {
                self.metrics.duplicate_objects.fetch_add(1, Ordering::Relaxed);
                return Ok(RouteOutcome::Duplicate(ObjectKind::Action));
            }
            state
                .action_text_to_id
                .insert(object.description.trim().to_string(), object.id.clone());
        }

        self.dispatch(ObjectKind::Action, self.action_handler.handle_action(object))
            .await?;
        self.metrics.actions_routed.fetch_add(1, Ordering::Relaxed);
        Ok(RouteOutcome::Routed(ObjectKind::Action))
    }

    async fn route_action_update(&self, mut object: ActionUpdateObject) -> Result<RouteOutcome> {
        // Identity repair: exact text match, no fuzzy matching at this layer
        if object.id.is_none() {
            if let Some(text) = object.action_text.as_deref() {
                let state = self.state.read().await;
                object.id = state.action_text_to_id.get(text.trim()).cloned();
            }
            if object.id.is_none() {
                tracing::warn!(
                    session_id = %self.session_id,
                    action_text = object.action_text.as_deref().unwrap_or(""),
                    "action_update references unknown action text"
                );
            }
        }

        self.dispatch(
            ObjectKind::ActionUpdate,
            self.action_update_handler.handle_action_update(object),
        )
        .await?;
        self.metrics
            .action_updates_routed
            .fetch_add(1, Ordering::Relaxed);
        Ok(RouteOutcome::Routed(ObjectKind::ActionUpdate))
    }

    async fn route_answer(&self, mut object: AnswerObject) -> Result<RouteOutcome> {
        if object.question_id.is_none() {
            if let Some(text) = object.question_text.as_deref() {
                let state = self.state.read().await;
                object.question_id = state.question_text_to_id.get(text.trim()).cloned();
            }
            if object.question_id.is_none() {
                tracing::warn!(
                    session_id = %self.session_id,
                    question_text = object.question_text.as_deref().unwrap_or(""),
                    "answer references unknown question text"
                );
            }
        }

        self.dispatch(ObjectKind::Answer, self.answer_handler.handle_answer(object))
            .await?;
        self.metrics.answers_routed.fetch_add(1, Ordering::Relaxed);
        Ok(RouteOutcome::Routed(ObjectKind::Answer))
    }

    async fn dispatch(
        &self,
        kind: ObjectKind,
        fut: impl std::future::Future<Output = Result<()>>,
    ) -> Result<()> {
        match fut.await {
            Ok(()) => Ok(()),
            Err(e) => {
                self.metrics.routing_errors.fetch_add(1, Ordering::Relaxed);
                Err(Error::Routing(format!("{} handler failed: {}", kind, e)))
            }
        }
    }

    /// Current counter values
    pub fn metrics(&self) -> RouterMetricsSnapshot {
        let samples = self.metrics.latency_samples.load(Ordering::Relaxed);
        let total_us = self.metrics.latency_total_us.load(Ordering::Relaxed);
        RouterMetricsSnapshot {
            total_objects_processed: self.metrics.total_objects.load(Ordering::Relaxed),
            questions_routed: self.metrics.questions_routed.load(Ordering::Relaxed),
            actions_routed: self.metrics.actions_routed.load(Ordering::Relaxed),
            action_updates_routed: self.metrics.action_updates_routed.load(Ordering::Relaxed),
            answers_routed: self.metrics.answers_routed.load(Ordering::Relaxed),
            duplicate_objects: self.metrics.duplicate_objects.load(Ordering::Relaxed),
            malformed_objects: self.metrics.malformed_objects.load(Ordering::Relaxed),
            routing_errors: self.metrics.routing_errors.load(Ordering::Relaxed),
            avg_latency_us: if samples == 0 {
                0.0
            } else {
                total_us as f64 / samples as f64
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::Mutex;

    /// Recording stub implementing all four capabilities
    #[derive(Default)]
    struct Recorder {
        questions: Mutex<Vec<QuestionObject>>,
        actions: Mutex<Vec<ActionObject>>,
        updates: Mutex<Vec<ActionUpdateObject>>,
        answers: Mutex<Vec<AnswerObject>>,
        fail: bool,
    }

    #[async_trait]
    impl HandlesQuestion for Recorder {
        async fn handle_question(&self, object: QuestionObject) -> Result<()> {
            if self.fail {
                return Err(Error::Internal("boom".to_string()));
            }
            self.questions.lock().await.push(object);
            Ok(())
        }
    }

    #[async_trait]
    impl HandlesAction for Recorder {
        async fn handle_action(&self, object: ActionObject) -> Result<()> {
            self.actions.lock().await.push(object);
            Ok(())
        }
    }

    #[async_trait]
    impl HandlesActionUpdate for Recorder {
        async fn handle_action_update(&self, object: ActionUpdateObject) -> Result<()> {
            self.updates.lock().await.push(object);
            Ok(())
        }
    }

    #[async_trait]
    impl HandlesAnswer for Recorder {
        async fn handle_answer(&self, object: AnswerObject) -> Result<()> {
            self.answers.lock().await.push(object);
            Ok(())
        }
    }

    fn router_with(recorder: Arc<Recorder>) -> StreamRouter {
        StreamRouterBuilder::new("session-test")
            .question(recorder.clone())
            .action(recorder.clone())
            .action_update(recorder.clone())
            .answer(recorder)
            .build()
            .unwrap()
    }

    fn question_value(id: &str, text: &str) -> serde_json::Value {
        serde_json::json!({
            "type": "question",
            "id": id,
            "text": text,
            "timestamp": 1.0,
            "confidence": 0.9,
        })
    }

    #[tokio::test]
    async fn test_malformed_object_dropped_and_counted() {
        let recorder = Arc::new(Recorder::default());
        let router = router_with(recorder.clone());

        let outcome = router
            .route(serde_json::json!({"id": "x", "some_field": 1}))
            .await
            .unwrap();
        assert_eq!(outcome, RouteOutcome::Malformed);

        let metrics = router.metrics();
        assert_eq!(metrics.malformed_objects, 1);
        assert_eq!(metrics.total_objects_processed, 0);
        assert!(recorder.questions.lock().await.is_empty());
    }

    #[tokio::test]
    async fn test_duplicate_id_not_redispatched() {
        let recorder = Arc::new(Recorder::default());
        let router = router_with(recorder.clone());

        let id = "q_3f2c8a10-9f6a-4d2b-8a3e-1c2d3e4f5a6b";
        router.route(question_value(id, "first?")).await.unwrap();
        let outcome = router.route(question_value(id, "first?")).await.unwrap();

        assert_eq!(outcome, RouteOutcome::Duplicate(ObjectKind::Question));
        assert_eq!(recorder.questions.lock().await.len(), 1);

        let metrics = router.metrics();
        assert_eq!(metrics.questions_routed, 1);
        assert_eq!(metrics.duplicate_objects, 1);
        assert_eq!(metrics.total_objects_processed, 2);
    }

    #[tokio::test]
    async fn test_nonconforming_id_still_dispatched() {
        let recorder = Arc::new(Recorder::default());
        let router = router_with(recorder.clone());

        let outcome = router
            .route(question_value("totally-freeform-id", "style?"))
            .await
            .unwrap();
        assert_eq!(outcome, RouteOutcome::Routed(ObjectKind::Question));
        assert_eq!(recorder.questions.lock().await.len(), 1);
    }

    #[tokio::test]
    async fn test_answer_identity_repair_by_exact_text() {
        let recorder = Arc::new(Recorder::default());
        let router = router_with(recorder.clone());

        let id = "q_3f2c8a10-9f6a-4d2b-8a3e-1c2d3e4f5a6b";
        router
            .route(question_value(id, "What is the deadline?"))
            .await
            .unwrap();

        router
            .route(serde_json::json!({
                "type": "answer",
                "question_text": "What is the deadline?",
                "answer_text": "Friday",
                "timestamp": 4.2,
            }))
            .await
            .unwrap();

        let answers = recorder.answers.lock().await;
        assert_eq!(answers.len(), 1);
        assert_eq!(answers[0].question_id.as_deref(), Some(id));
    }

    #[tokio::test]
    async fn test_answer_unknown_text_dispatched_unresolved() {
        let recorder = Arc::new(Recorder::default());
        let router = router_with(recorder.clone());

        router
            .route(serde_json::json!({
                "type": "answer",
                "question_text": "never asked",
                "answer_text": "42",
                "timestamp": 1.0,
            }))
            .await
            .unwrap();

        let answers = recorder.answers.lock().await;
        assert_eq!(answers.len(), 1);
        assert!(answers[0].question_id.is_none());
    }

    #[tokio::test]
    async fn test_action_update_identity_repair() {
        let recorder = Arc::new(Recorder::default());
        let router = router_with(recorder.clone());

        let id = "a_3f2c8a10-9f6a-4d2b-8a3e-1c2d3e4f5a6b";
        router
            .route(serde_json::json!({
                "type": "action",
                "id": id,
                "description": "send the budget report",
                "timestamp": 2.0,
                "confidence": 0.9,
            }))
            .await
            .unwrap();

        router
            .route(serde_json::json!({
                "type": "action_update",
                "action_text": "send the budget report",
                "owner": "erin",
            }))
            .await
            .unwrap();

        let updates = recorder.updates.lock().await;
        assert_eq!(updates.len(), 1);
        assert_eq!(updates[0].id.as_deref(), Some(id));
    }

    #[tokio::test]
    async fn test_handler_error_wrapped_and_counted() {
        let recorder = Arc::new(Recorder {
            fail: true,
            ..Default::default()
        });
        let router = router_with(recorder);

        let result = router
            .route(question_value(
                "q_3f2c8a10-9f6a-4d2b-8a3e-1c2d3e4f5a6b",
                "will this fail?",
            ))
            .await;

        match result {
            Err(Error::Routing(msg)) => assert!(msg.contains("question handler failed")),
            other => panic!("expected routing error, got {:?}", other),
        }
        assert_eq!(router.metrics().routing_errors, 1);
    }

    #[tokio::test]
    async fn test_latency_recorded() {
        let recorder = Arc::new(Recorder::default());
        let router = router_with(recorder);

        router
            .route(question_value(
                "q_3f2c8a10-9f6a-4d2b-8a3e-1c2d3e4f5a6b",
                "latency?",
            ))
            .await
            .unwrap();

        // One sample recorded; the average is defined (possibly sub-µs on
        // fast machines, so only assert non-negative)
        assert!(router.metrics().avg_latency_us >= 0.0);
    }
}
