//! Session registry — lookup-or-create and explicit teardown
//!
//! Sessions share no mutable state; the registry wires one pipeline per
//! meeting (router, handlers, orchestrator, event consumer) around shared
//! collaborators. Teardown cancels the session token, which cooperatively
//! stops every in-flight discovery task and the event consumer for that
//! session without touching the others.

use super::context::{ContextCache, TranscriptBuffer, TranscriptChunk};
use super::orchestrator::{SessionHealth, SessionOrchestrator};
use crate::action::ActionHandler;
use crate::config::MeetwiseConfig;
use crate::error::{Error, Result};
use crate::events::{EventBroadcaster, EventTransport};
use crate::insight::InsightStore;
use crate::knowledge::{AnswerGenerator, KnowledgeSearch};
use crate::question::{AnswerHandler, Discovery, LiveMonitorRegistry, QuestionHandler};
use crate::stream::{LlmStreamClient, RouterMetricsSnapshot, StreamRouterBuilder};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tokio_util::sync::CancellationToken;

/// Everything wired up for one active meeting session
pub struct SessionPipeline {
    pub session_id: String,
    orchestrator: Arc<SessionOrchestrator>,
    action_handler: Arc<ActionHandler>,
    cancel: CancellationToken,
}

impl SessionPipeline {
    /// Feed one transcription result through the pipeline
    pub async fn process_chunk(&self, chunk: TranscriptChunk) -> Result<()> {
        self.orchestrator.process_chunk(chunk).await
    }

    /// Signal a meeting-segment boundary (triggers incomplete-action alerts)
    pub async fn segment_boundary(&self) -> Result<()> {
        self.action_handler.on_segment_boundary().await
    }

    /// Health and detection counters
    pub fn health(&self) -> SessionHealth {
        self.orchestrator.health()
    }

    /// Router counters
    pub fn router_metrics(&self) -> RouterMetricsSnapshot {
        self.orchestrator.router_metrics()
    }
}

/// Shared collaborators injected into every session pipeline
struct Collaborators {
    store: Arc<dyn InsightStore>,
    transport: Arc<dyn EventTransport>,
    llm: Arc<dyn LlmStreamClient>,
    knowledge: Arc<dyn KnowledgeSearch>,
    generator: Arc<dyn AnswerGenerator>,
    cache: Arc<dyn ContextCache>,
}

/// Registry of active session pipelines
pub struct SessionRegistry {
    config: MeetwiseConfig,
    collaborators: Collaborators,
    sessions: RwLock<HashMap<String, Arc<SessionPipeline>>>,
}

/// Builder assembling a registry's collaborator set at startup
pub struct SessionRegistryBuilder {
    config: MeetwiseConfig,
    store: Option<Arc<dyn InsightStore>>,
    transport: Option<Arc<dyn EventTransport>>,
    llm: Option<Arc<dyn LlmStreamClient>>,
    knowledge: Option<Arc<dyn KnowledgeSearch>>,
    generator: Option<Arc<dyn AnswerGenerator>>,
    cache: Option<Arc<dyn ContextCache>>,
}

impl SessionRegistryBuilder {
    /// Start a builder with the given configuration
    pub fn new(config: MeetwiseConfig) -> Self {
        Self {
            config,
            store: None,
            transport: None,
            llm: None,
            knowledge: None,
            generator: None,
            cache: None,
        }
    }

    /// Set the insight store
    pub fn store(mut self, store: Arc<dyn InsightStore>) -> Self {
        self.store = Some(store);
        self
    }

    /// Set the broadcast transport
    pub fn transport(mut self, transport: Arc<dyn EventTransport>) -> Self {
        self.transport = Some(transport);
        self
    }

    /// Set the LLM streaming client
    pub fn llm(mut self, llm: Arc<dyn LlmStreamClient>) -> Self {
        self.llm = Some(llm);
        self
    }

    /// Set the knowledge-base search
    pub fn knowledge(mut self, knowledge: Arc<dyn KnowledgeSearch>) -> Self {
        self.knowledge = Some(knowledge);
        self
    }

    /// Set the AI answer generator
    pub fn generator(mut self, generator: Arc<dyn AnswerGenerator>) -> Self {
        self.generator = Some(generator);
        self
    }

    /// Set the context cache
    pub fn cache(mut self, cache: Arc<dyn ContextCache>) -> Self {
        self.cache = Some(cache);
        self
    }

    /// Build the registry; every collaborator must be provided
    pub fn build(self) -> Result<SessionRegistry> {
        let missing = |what: &str| Error::Config(format!("session registry requires {}", what));
        Ok(SessionRegistry {
            config: self.config,
            collaborators: Collaborators {
                store: self.store.ok_or_else(|| missing("an insight store"))?,
                transport: self.transport.ok_or_else(|| missing("an event transport"))?,
                llm: self.llm.ok_or_else(|| missing("an LLM stream client"))?,
                knowledge: self
                    .knowledge
                    .ok_or_else(|| missing("a knowledge-base search"))?,
                generator: self.generator.ok_or_else(|| missing("an answer generator"))?,
                cache: self.cache.ok_or_else(|| missing("a context cache"))?,
            },
            sessions: RwLock::new(HashMap::new()),
        })
    }
}

impl SessionRegistry {
    /// Get the pipeline for a session, creating it on first use
    pub async fn get_or_create(&self, session_id: &str) -> Result<Arc<SessionPipeline>> {
        if let Some(pipeline) = self.sessions.read().await.get(session_id) {
            return Ok(pipeline.clone());
        }

        let mut sessions = self.sessions.write().await;
        if let Some(pipeline) = sessions.get(session_id) {
            return Ok(pipeline.clone());
        }

        let pipeline = Arc::new(self.build_pipeline(session_id)?);
        sessions.insert(session_id.to_string(), pipeline.clone());
        tracing::info!(session_id, "created session pipeline");
        Ok(pipeline)
    }

    /// Get an existing pipeline
    pub async fn get(&self, session_id: &str) -> Option<Arc<SessionPipeline>> {
        self.sessions.read().await.get(session_id).cloned()
    }

    /// Tear a session down: cancels all in-flight background tasks for the
    /// session and drops the pipeline. Other sessions are unaffected.
    pub async fn teardown(&self, session_id: &str) {
        if let Some(pipeline) = self.sessions.write().await.remove(session_id) {
            pipeline.cancel.cancel();
            tracing::info!(session_id, "tore down session pipeline");
        }
    }

    /// Number of active sessions
    pub async fn session_count(&self) -> usize {
        self.sessions.read().await.len()
    }

    fn build_pipeline(&self, session_id: &str) -> Result<SessionPipeline> {
        let c = &self.collaborators;
        let cancel = CancellationToken::new();
        let broadcaster =
            EventBroadcaster::start(session_id, c.transport.clone(), cancel.clone());
        let transcript = Arc::new(TranscriptBuffer::new(
            self.config.orchestrator.context_buffer_size,
        ));
        let monitors = Arc::new(LiveMonitorRegistry::new());

        let discovery = Arc::new(Discovery::new(
            self.config.discovery.clone(),
            c.knowledge.clone(),
            transcript.clone(),
            c.generator.clone(),
        ));
        let question_handler = Arc::new(QuestionHandler::new(
            session_id,
            discovery,
            c.store.clone(),
            broadcaster.clone(),
            monitors.clone(),
            cancel.clone(),
        ));
        let action_handler = Arc::new(ActionHandler::new(
            session_id,
            self.config.actions.clone(),
            c.store.clone(),
            broadcaster.clone(),
        ));
        let answer_handler = Arc::new(AnswerHandler::new(
            session_id,
            c.store.clone(),
            monitors,
            broadcaster,
        ));

        let router = Arc::new(
            StreamRouterBuilder::new(session_id)
                .question(question_handler)
                .action(action_handler.clone())
                .action_update(action_handler.clone())
                .answer(answer_handler)
                .build()?,
        );

        let orchestrator = Arc::new(SessionOrchestrator::new(
            session_id,
            self.config.orchestrator.clone(),
            transcript,
            c.cache.clone(),
            c.llm.clone(),
            router,
        ));

        Ok(SessionPipeline {
            session_id: session_id.to_string(),
            orchestrator,
            action_handler,
            cancel,
        })
    }
}
