//! Outbound event channel
//!
//! Handlers never talk to the transport directly. They push events into a
//! per-session unbounded channel; a dedicated consumer task drains the
//! channel into the `EventTransport`, so a slow or unavailable transport
//! cannot stall stream handling.

use super::types::BroadcastEvent;
use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::{mpsc, RwLock};
use tokio_util::sync::CancellationToken;

/// Transport collaborator that delivers events to connected clients
#[async_trait]
pub trait EventTransport: Send + Sync {
    /// Deliver one event. Errors are logged by the consumer, not retried.
    async fn deliver(&self, session_id: &str, event: BroadcastEvent) -> crate::Result<()>;
}

/// Collecting transport for tests and the replay CLI
#[derive(Default)]
pub struct MemoryTransport {
    events: Arc<RwLock<Vec<BroadcastEvent>>>,
}

impl MemoryTransport {
    /// Create a new empty transport
    pub fn new() -> Self {
        Self::default()
    }

    /// All events delivered so far
    pub async fn events(&self) -> Vec<BroadcastEvent> {
        self.events.read().await.clone()
    }

    /// Names of all events delivered so far, in order
    pub async fn event_names(&self) -> Vec<&'static str> {
        self.events.read().await.iter().map(|e| e.name()).collect()
    }
}

#[async_trait]
impl EventTransport for MemoryTransport {
    async fn deliver(&self, _session_id: &str, event: BroadcastEvent) -> crate::Result<()> {
        self.events.write().await.push(event);
        Ok(())
    }
}

/// Per-session event fan-out handle
///
/// Cloneable sender side of the outbound channel. `spawn_consumer` starts
/// the drain task; it exits when the session token is cancelled and the
/// channel has been drained.
#[derive(Clone)]
pub struct EventBroadcaster {
    session_id: String,
    tx: mpsc::UnboundedSender<BroadcastEvent>,
}

impl EventBroadcaster {
    /// Create a broadcaster and spawn its consumer task.
    pub fn start(
        session_id: impl Into<String>,
        transport: Arc<dyn EventTransport>,
        cancel: CancellationToken,
    ) -> Self {
        let session_id = session_id.into();
        let (tx, rx) = mpsc::unbounded_channel();
        Self::spawn_consumer(session_id.clone(), rx, transport, cancel);
        Self { session_id, tx }
    }

    /// Queue an event for delivery. A closed channel means the session is
    /// tearing down; the event is dropped with a debug log.
    pub fn broadcast(&self, event: BroadcastEvent) {
        if self.tx.send(event).is_err() {
            tracing::debug!(
                session_id = %self.session_id,
                "event channel closed, dropping broadcast"
            );
        }
    }

    fn spawn_consumer(
        session_id: String,
        mut rx: mpsc::UnboundedReceiver<BroadcastEvent>,
        transport: Arc<dyn EventTransport>,
        cancel: CancellationToken,
    ) {
        tokio::spawn(async move {
            loop {
                tokio::select! {
                    maybe_event = rx.recv() => {
                        match maybe_event {
                            Some(event) => {
                                let name = event.name();
                                if let Err(e) = transport.deliver(&session_id, event).await {
                                    tracing::warn!(
                                        session_id = %session_id,
                                        event = name,
                                        "event delivery failed: {}",
                                        e
                                    );
                                }
                            }
                            None => break,
                        }
                    }
                    _ = cancel.cancelled() => {
                        // Drain whatever is already queued, then exit
                        while let Ok(event) = rx.try_recv() {
                            let name = event.name();
                            if let Err(e) = transport.deliver(&session_id, event).await {
                                tracing::warn!(
                                    session_id = %session_id,
                                    event = name,
                                    "event delivery failed during drain: {}",
                                    e
                                );
                            }
                        }
                        break;
                    }
                }
            }
            tracing::debug!(session_id = %session_id, "event consumer stopped");
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::insight::{InsightBuilder, InsightKind};

    fn detected(session: &str) -> BroadcastEvent {
        BroadcastEvent::QuestionDetected {
            insight: InsightBuilder::new(session, InsightKind::Question)
                .content("test?")
                .build()
                .unwrap(),
        }
    }

    #[tokio::test]
    async fn test_events_reach_transport() {
        let transport = Arc::new(MemoryTransport::new());
        let cancel = CancellationToken::new();
        let broadcaster =
            EventBroadcaster::start("s1", transport.clone() as Arc<dyn EventTransport>, cancel);

        broadcaster.broadcast(detected("s1"));
        broadcaster.broadcast(detected("s1"));

        // Give the consumer task a beat to drain
        tokio::time::sleep(std::time::Duration::from_millis(20)).await;
        assert_eq!(transport.events().await.len(), 2);
    }

    #[tokio::test]
    async fn test_cancel_drains_queue() {
        let transport = Arc::new(MemoryTransport::new());
        let cancel = CancellationToken::new();
        let broadcaster = EventBroadcaster::start(
            "s1",
            transport.clone() as Arc<dyn EventTransport>,
            cancel.clone(),
        );

        broadcaster.broadcast(detected("s1"));
        cancel.cancel();

        tokio::time::sleep(std::time::Duration::from_millis(20)).await;
        assert_eq!(transport.events().await.len(), 1);
    }
}
