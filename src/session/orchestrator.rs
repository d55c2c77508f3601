//! Per-session streaming orchestrator
//!
//! Top-level coordinator for one meeting session: accepts finalized
//! transcript sentences, maintains the rolling context buffer, invokes the
//! analysis LLM with accumulated context, and forwards every yielded
//! object to the stream router. Chunk processing is sequential per
//! session; one stream invocation completes before the next chunk is
//! submitted.

use super::context::{ContextCache, MeetingSnapshot, TranscriptBuffer, TranscriptChunk};
use crate::config::OrchestratorConfig;
use crate::error::Result;
use crate::stream::{
    AnalysisContext, LlmStreamClient, ObjectKind, RouteOutcome, RouterMetricsSnapshot,
    StreamRouter,
};
use futures::StreamExt;
use serde::Serialize;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::Mutex;

/// Composite health status
///
/// `Degraded` means a supporting service (cache, LLM client) is currently
/// unreachable; the orchestrator itself keeps running, so there is no
/// `down` state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum HealthStatus {
    Healthy,
    Degraded,
}

/// Serializable health and metrics surface for one session
#[derive(Debug, Clone, Serialize)]
pub struct SessionHealth {
    pub status: HealthStatus,
    pub chunks_processed: u64,
    pub questions_detected: u64,
    pub actions_detected: u64,
    pub action_updates_detected: u64,
    pub answers_detected: u64,
    pub objects_routed: u64,
    pub error_count: u64,
}

#[derive(Debug, Default)]
struct OrchestratorMetrics {
    chunks_processed: AtomicU64,
    questions_detected: AtomicU64,
    actions_detected: AtomicU64,
    action_updates_detected: AtomicU64,
    answers_detected: AtomicU64,
    objects_routed: AtomicU64,
    errors: AtomicU64,
}

/// One orchestrator exists per active meeting session
pub struct SessionOrchestrator {
    session_id: String,
    config: OrchestratorConfig,
    transcript: Arc<TranscriptBuffer>,
    cache: Arc<dyn ContextCache>,
    llm: Arc<dyn LlmStreamClient>,
    router: Arc<StreamRouter>,
    chunk_lock: Mutex<()>,
    metrics: OrchestratorMetrics,
    cache_degraded: AtomicBool,
    llm_degraded: AtomicBool,
}

impl SessionOrchestrator {
    /// Assemble the orchestrator for one session
    pub fn new(
        session_id: impl Into<String>,
        config: OrchestratorConfig,
        transcript: Arc<TranscriptBuffer>,
        cache: Arc<dyn ContextCache>,
        llm: Arc<dyn LlmStreamClient>,
        router: Arc<StreamRouter>,
    ) -> Self {
        Self {
            session_id: session_id.into(),
            config,
            transcript,
            cache,
            llm,
            router,
            chunk_lock: Mutex::new(()),
            metrics: OrchestratorMetrics::default(),
            cache_degraded: AtomicBool::new(false),
            llm_degraded: AtomicBool::new(false),
        }
    }

    /// Feed one transcription result through the pipeline.
    ///
    /// Interim results are discarded; only final chunks advance state. LLM
    /// provider errors and handler failures propagate typed to the caller,
    /// which decides whether the session's stream processing continues.
    pub async fn process_chunk(&self, chunk: TranscriptChunk) -> Result<()> {
        if !chunk.is_final {
            tracing::trace!(
                session_id = %self.session_id,
                "discarding interim transcript chunk"
            );
            return Ok(());
        }

        let _guard = self.chunk_lock.lock().await;

        self.transcript.push(chunk.text).await;
        self.metrics.chunks_processed.fetch_add(1, Ordering::Relaxed);

        // Lightweight context from the cache, falling back to empty when
        // it is unreachable
        let snapshot = match self
            .cache
            .snapshot(&self.session_id, self.config.snapshot_limit)
            .await
        {
            Ok(snapshot) => {
                self.cache_degraded.store(false, Ordering::Relaxed);
                snapshot
            }
            Err(e) => {
                tracing::warn!(
                    session_id = %self.session_id,
                    "context cache unavailable, continuing with empty context: {}",
                    e
                );
                self.cache_degraded.store(true, Ordering::Relaxed);
                MeetingSnapshot::default()
            }
        };

        let context = AnalysisContext {
            transcript: self.transcript.sentences().await,
            open_questions: snapshot.open_questions,
            open_actions: snapshot.open_actions,
        };

        let mut stream = match self.llm.stream(&context).await {
            Ok(stream) => {
                self.llm_degraded.store(false, Ordering::Relaxed);
                stream
            }
            Err(e) => {
                self.llm_degraded.store(true, Ordering::Relaxed);
                self.metrics.errors.fetch_add(1, Ordering::Relaxed);
                return Err(e.into());
            }
        };

        while let Some(item) = stream.next().await {
            match item {
                Ok(raw) => match self.router.route(raw).await {
                    Ok(RouteOutcome::Routed(kind)) => {
                        self.metrics.objects_routed.fetch_add(1, Ordering::Relaxed);
                        self.count_detection(kind);
                    }
                    Ok(_) => {}
                    Err(e) => {
                        self.metrics.errors.fetch_add(1, Ordering::Relaxed);
                        tracing::error!(
                            session_id = %self.session_id,
                            "handler failure during routing: {}",
                            e
                        );
                        return Err(e);
                    }
                },
                Err(e) => {
                    self.llm_degraded.store(true, Ordering::Relaxed);
                    self.metrics.errors.fetch_add(1, Ordering::Relaxed);
                    return Err(e.into());
                }
            }
        }

        Ok(())
    }

    fn count_detection(&self, kind: ObjectKind) {
        let counter = match kind {
            ObjectKind::Question => &self.metrics.questions_detected,
            ObjectKind::Action => &self.metrics.actions_detected,
            ObjectKind::ActionUpdate => &self.metrics.action_updates_detected,
            ObjectKind::Answer => &self.metrics.answers_detected,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    /// Composite health and per-type detection counters
    pub fn health(&self) -> SessionHealth {
        let degraded = self.cache_degraded.load(Ordering::Relaxed)
            || self.llm_degraded.load(Ordering::Relaxed)
            || !self.cache.is_available()
            || !self.llm.is_available();

        SessionHealth {
            status: if degraded {
                HealthStatus::Degraded
            } else {
                HealthStatus::Healthy
            },
            chunks_processed: self.metrics.chunks_processed.load(Ordering::Relaxed),
            questions_detected: self.metrics.questions_detected.load(Ordering::Relaxed),
            actions_detected: self.metrics.actions_detected.load(Ordering::Relaxed),
            action_updates_detected: self
                .metrics
                .action_updates_detected
                .load(Ordering::Relaxed),
            answers_detected: self.metrics.answers_detected.load(Ordering::Relaxed),
            objects_routed: self.metrics.objects_routed.load(Ordering::Relaxed),
            error_count: self.metrics.errors.load(Ordering::Relaxed),
        }
    }

    /// Router counter snapshot for this session
    pub fn router_metrics(&self) -> RouterMetricsSnapshot {
        self.router.metrics()
    }
}
