//! Four-tier answer discovery
//!
//! Tiers 1 (knowledge base), 2 (meeting context) and 4 (live monitoring)
//! run as concurrent cancellable tasks, each under its own timeout. The
//! first success wins and cancels the rest. Tier 3 (AI generation) is the
//! fallback of last resort: it runs only once tiers 1, 2 and 4 have all
//! completed without success. A failing tier is simply "no answer from
//! this tier" and never aborts the others.

use super::monitor::LiveAnswer;
use crate::config::DiscoveryConfig;
use crate::insight::AnswerSource;
use crate::knowledge::{AnswerGenerator, KnowledgeSearch};
use crate::session::context::TranscriptBuffer;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::oneshot;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;

/// A successful tier result
#[derive(Debug, Clone)]
pub struct TierAnswer {
    pub text: String,
    pub source: AnswerSource,
}

/// Discovery tier collaborators and timeouts for one session
pub struct Discovery {
    config: DiscoveryConfig,
    knowledge: Arc<dyn KnowledgeSearch>,
    transcript: Arc<TranscriptBuffer>,
    generator: Arc<dyn AnswerGenerator>,
}

impl Discovery {
    /// Assemble the discovery engine
    pub fn new(
        config: DiscoveryConfig,
        knowledge: Arc<dyn KnowledgeSearch>,
        transcript: Arc<TranscriptBuffer>,
        generator: Arc<dyn AnswerGenerator>,
    ) -> Self {
        Self {
            config,
            knowledge,
            transcript,
            generator,
        }
    }

    /// Run discovery for one question to completion.
    ///
    /// Returns the first successful tier answer, or `None` when every tier
    /// (including the tier-3 fallback) came up empty. Cancelling `cancel`
    /// makes all tiers exit cleanly with no answer.
    pub async fn run(
        &self,
        session_id: &str,
        question: &str,
        live_rx: oneshot::Receiver<LiveAnswer>,
        cancel: CancellationToken,
    ) -> Option<TierAnswer> {
        let tier_cancel = cancel.child_token();
        let mut tiers: JoinSet<Option<TierAnswer>> = JoinSet::new();

        // Tier 1 — indexed knowledge-base search
        {
            let knowledge = self.knowledge.clone();
            let session_id = session_id.to_string();
            let question = question.to_string();
            let timeout = Duration::from_millis(self.config.knowledge_base_timeout_ms);
            let cancel = tier_cancel.clone();
            tiers.spawn(async move {
                run_tier("knowledge_base", cancel, timeout, async move {
                    match knowledge.search_answer(&session_id, &question).await {
                        Ok(found) => found,
                        Err(e) => {
                            tracing::debug!("knowledge-base tier failed: {}", e);
                            None
                        }
                    }
                })
                .await
                .map(|text| TierAnswer {
                    text,
                    source: AnswerSource::KnowledgeBase,
                })
            });
        }

        // Tier 2 — current-meeting context search
        {
            let transcript = self.transcript.clone();
            let question = question.to_string();
            let timeout = Duration::from_millis(self.config.meeting_context_timeout_ms);
            let cancel = tier_cancel.clone();
            tiers.spawn(async move {
                run_tier("meeting_context", cancel, timeout, async move {
                    transcript.find_answer(&question).await
                })
                .await
                .map(|text| TierAnswer {
                    text,
                    source: AnswerSource::MeetingContext,
                })
            });
        }

        // Tier 4 — live monitoring window
        {
            let timeout = Duration::from_millis(self.config.live_monitor_timeout_ms);
            let cancel = tier_cancel.clone();
            tiers.spawn(async move {
                run_tier("live_monitoring", cancel, timeout, async move {
                    live_rx.await.ok().map(|answer| answer.text)
                })
                .await
                .map(|text| TierAnswer {
                    text,
                    source: AnswerSource::LiveMonitoring,
                })
            });
        }

        let mut winner: Option<TierAnswer> = None;
        while let Some(joined) = tiers.join_next().await {
            match joined {
                Ok(Some(answer)) => {
                    winner = Some(answer);
                    tier_cancel.cancel();
                    break;
                }
                Ok(None) => {}
                Err(e) => tracing::debug!("discovery tier task failed: {}", e),
            }
        }
        // Remaining tiers observe the cancellation and finish quickly
        while tiers.join_next().await.is_some() {}

        if winner.is_some() {
            return winner;
        }
        if cancel.is_cancelled() {
            return None;
        }

        // Tier 3 — AI generation, only after 1, 2 and 4 all missed
        let context = self.transcript.sentences().await;
        let generator = self.generator.clone();
        let question = question.to_string();
        let timeout = Duration::from_millis(self.config.generation_timeout_ms);
        run_tier("ai_generation", cancel.child_token(), timeout, async move {
            match generator.generate_answer(&question, &context).await {
                Ok(found) => found,
                Err(e) => {
                    tracing::debug!("generation tier failed: {}", e);
                    None
                }
            }
        })
        .await
        .map(|text| TierAnswer {
            text,
            source: AnswerSource::AiGenerated,
        })
    }
}

/// Run one tier under its timeout, exiting early on cancellation.
async fn run_tier(
    name: &'static str,
    cancel: CancellationToken,
    timeout: Duration,
    fut: impl Future<Output = Option<String>>,
) -> Option<String> {
    tokio::select! {
        _ = cancel.cancelled() => None,
        result = tokio::time::timeout(timeout, fut) => match result {
            Ok(found) => found,
            Err(_) => {
                tracing::debug!(tier = name, "tier timed out");
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Result;
    use crate::knowledge::{CannedAnswerGenerator, MemoryKnowledgeBase};
    use async_trait::async_trait;
    use std::time::Instant;

    fn fast_config() -> DiscoveryConfig {
        DiscoveryConfig {
            knowledge_base_timeout_ms: 100,
            meeting_context_timeout_ms: 100,
            generation_timeout_ms: 100,
            live_monitor_timeout_ms: 200,
        }
    }

    fn discovery(
        config: DiscoveryConfig,
        knowledge: Arc<dyn KnowledgeSearch>,
        transcript: Arc<TranscriptBuffer>,
        generator: Arc<dyn AnswerGenerator>,
    ) -> Discovery {
        Discovery::new(config, knowledge, transcript, generator)
    }

    fn empty_parts() -> (Arc<MemoryKnowledgeBase>, Arc<TranscriptBuffer>) {
        (
            Arc::new(MemoryKnowledgeBase::new()),
            Arc::new(TranscriptBuffer::new(50)),
        )
    }

    #[tokio::test]
    async fn test_knowledge_base_tier_wins() {
        let (kb, transcript) = empty_parts();
        kb.index("roadmap", "The roadmap is published on the wiki.").await;
        let d = discovery(
            fast_config(),
            kb,
            transcript,
            Arc::new(CannedAnswerGenerator::silent()),
        );

        let (_tx, rx) = oneshot::channel();
        let answer = d
            .run("s1", "Where is the roadmap?", rx, CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(answer.source, AnswerSource::KnowledgeBase);
        assert_eq!(answer.text, "The roadmap is published on the wiki.");
    }

    #[tokio::test]
    async fn test_meeting_context_tier_wins() {
        let (kb, transcript) = empty_parts();
        transcript
            .push("The migration window opens on Saturday night.")
            .await;
        let d = discovery(
            fast_config(),
            kb,
            transcript,
            Arc::new(CannedAnswerGenerator::silent()),
        );

        let (_tx, rx) = oneshot::channel();
        let answer = d
            .run(
                "s1",
                "When does the migration window open?",
                rx,
                CancellationToken::new(),
            )
            .await
            .unwrap();
        assert_eq!(answer.source, AnswerSource::MeetingContext);
    }

    #[tokio::test]
    async fn test_live_monitoring_tier_wins() {
        let (kb, transcript) = empty_parts();
        let d = discovery(
            fast_config(),
            kb,
            transcript,
            Arc::new(CannedAnswerGenerator::silent()),
        );

        let (tx, rx) = oneshot::channel();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(30)).await;
            let _ = tx.send(LiveAnswer {
                text: "Sarah said it ships next week.".to_string(),
                speaker: Some("sarah".to_string()),
            });
        });

        let answer = d
            .run("s1", "When does it ship?", rx, CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(answer.source, AnswerSource::LiveMonitoring);
        assert_eq!(answer.text, "Sarah said it ships next week.");
    }

    #[tokio::test]
    async fn test_generation_runs_only_after_all_tiers_miss() {
        let (kb, transcript) = empty_parts();
        let d = discovery(
            fast_config(),
            kb,
            transcript,
            Arc::new(CannedAnswerGenerator::new("a generated guess")),
        );

        let (_tx, rx) = oneshot::channel();
        let started = Instant::now();
        let answer = d
            .run("s1", "Something nobody knows?", rx, CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(answer.source, AnswerSource::AiGenerated);
        // Tier 3 must not start before the tier-4 window has elapsed
        assert!(started.elapsed() >= Duration::from_millis(200));
    }

    #[tokio::test]
    async fn test_first_success_short_circuits_live_window() {
        let (kb, transcript) = empty_parts();
        kb.index("owner", "Priya owns the integration.").await;
        let mut config = fast_config();
        config.live_monitor_timeout_ms = 5_000;
        let d = discovery(
            config,
            kb,
            transcript,
            Arc::new(CannedAnswerGenerator::silent()),
        );

        let (_tx, rx) = oneshot::channel();
        let started = Instant::now();
        let answer = d
            .run(
                "s1",
                "Who is the owner of the integration?",
                rx,
                CancellationToken::new(),
            )
            .await
            .unwrap();
        assert_eq!(answer.source, AnswerSource::KnowledgeBase);
        assert!(
            started.elapsed() < Duration::from_millis(1_000),
            "a tier-1 hit must not wait out the monitoring window"
        );
    }

    /// Tier collaborator that always errors
    struct BrokenKnowledgeBase;

    #[async_trait]
    impl KnowledgeSearch for BrokenKnowledgeBase {
        async fn search_answer(&self, _: &str, _: &str) -> Result<Option<String>> {
            Err(crate::Error::Internal("index offline".to_string()))
        }
    }

    #[tokio::test]
    async fn test_failing_tier_does_not_abort_the_others() {
        let transcript = Arc::new(TranscriptBuffer::new(50));
        transcript.push("The budget review happens on Thursday.").await;
        let d = discovery(
            fast_config(),
            Arc::new(BrokenKnowledgeBase),
            transcript,
            Arc::new(CannedAnswerGenerator::silent()),
        );

        let (_tx, rx) = oneshot::channel();
        let answer = d
            .run(
                "s1",
                "When does the budget review happen?",
                rx,
                CancellationToken::new(),
            )
            .await
            .unwrap();
        assert_eq!(answer.source, AnswerSource::MeetingContext);
    }

    #[tokio::test]
    async fn test_cancellation_stops_discovery_without_answer() {
        let (kb, transcript) = empty_parts();
        let mut config = fast_config();
        config.live_monitor_timeout_ms = 10_000;
        let d = discovery(
            config,
            kb,
            transcript,
            Arc::new(CannedAnswerGenerator::new("should never be used")),
        );

        let cancel = CancellationToken::new();
        let cancel_clone = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(30)).await;
            cancel_clone.cancel();
        });

        let (_tx, rx) = oneshot::channel();
        let started = Instant::now();
        let answer = d.run("s1", "Anything?", rx, cancel).await;
        assert!(answer.is_none());
        assert!(started.elapsed() < Duration::from_millis(5_000));
    }
}
