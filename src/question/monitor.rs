//! Live answer monitoring registry
//!
//! Discovery tier 4 passively waits for a later `answer` object to arrive
//! for its question. The registry is the rendezvous: the question handler
//! registers a one-shot channel per open question, and the answer handler
//! resolves it when the router delivers a matching answer. Entries are
//! keyed by the stream-assigned question ID.

use std::collections::HashMap;
use tokio::sync::{oneshot, RwLock};
use uuid::Uuid;

/// A spoken answer delivered to a waiting monitor
#[derive(Debug, Clone)]
pub struct LiveAnswer {
    pub text: String,
    pub speaker: Option<String>,
}

struct MonitorEntry {
    insight_id: Uuid,
    tx: oneshot::Sender<LiveAnswer>,
}

/// Per-session registry of active tier-4 monitors
#[derive(Default)]
pub struct LiveMonitorRegistry {
    monitors: RwLock<HashMap<String, MonitorEntry>>,
}

impl LiveMonitorRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a monitor for a question, returning the receiving end the
    /// discovery task waits on.
    pub async fn register(
        &self,
        question_gpt_id: impl Into<String>,
        insight_id: Uuid,
    ) -> oneshot::Receiver<LiveAnswer> {
        let (tx, rx) = oneshot::channel();
        self.monitors
            .write()
            .await
            .insert(question_gpt_id.into(), MonitorEntry { insight_id, tx });
        rx
    }

    /// Deliver an answer to the monitor for `question_gpt_id`, consuming
    /// the entry. Returns `true` if a monitor was waiting.
    pub async fn resolve(&self, question_gpt_id: &str, answer: LiveAnswer) -> bool {
        let entry = self.monitors.write().await.remove(question_gpt_id);
        match entry {
            Some(entry) => {
                // The receiver may have timed out between lookup and send;
                // that is fine, the answer handler then falls back to the
                // store.
                entry.tx.send(answer).is_ok()
            }
            None => false,
        }
    }

    /// Remove a monitor (discovery finished without a live answer)
    pub async fn remove(&self, question_gpt_id: &str) {
        self.monitors.write().await.remove(question_gpt_id);
    }

    /// The insight behind an active monitor, if any
    pub async fn insight_id(&self, question_gpt_id: &str) -> Option<Uuid> {
        self.monitors
            .read()
            .await
            .get(question_gpt_id)
            .map(|e| e.insight_id)
    }

    /// Number of questions currently under live monitoring
    pub async fn active_count(&self) -> usize {
        self.monitors.read().await.len()
    }
}
