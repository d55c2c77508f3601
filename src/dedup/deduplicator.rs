//! Semantic deduplication of extracted artifacts
//!
//! Given a batch of freshly extracted artifacts and the existing records
//! of the same kind, classify each candidate as unique, duplicate with
//! extractable updates, or exact repeat. Classification is embedding
//! cosine similarity with an AI tie-breaker for the ambiguous band; on
//! judge failure it fails closed to "exact duplicate, no new info" so a
//! flaky model can never flood the project with near-identical records.

use super::artifact::{ArtifactRecord, ExtractedArtifact};
use super::judge::{CandidatePair, DedupJudge};
use crate::config::DedupConfig;
use crate::embeddings::{cosine_similarity, EmbeddingProvider};
use crate::error::Result;
use std::collections::HashMap;
use std::sync::Arc;

/// A unique artifact to insert, with its freshly computed embedding
#[derive(Debug, Clone)]
pub struct UniqueArtifact {
    pub artifact: ExtractedArtifact,
    /// Absent when the embedding gateway was unreachable (degraded mode)
    pub embedding: Option<Vec<f32>>,
}

/// A duplicate mention carrying extractable updates for an existing record
#[derive(Debug, Clone)]
pub struct ArtifactUpdate {
    pub artifact: ExtractedArtifact,
    pub existing_id: uuid::Uuid,
    pub new_info: HashMap<String, serde_json::Value>,
}

/// Classification result for one batch
#[derive(Debug, Default)]
pub struct DedupOutcome {
    pub unique: Vec<UniqueArtifact>,
    pub updates: Vec<ArtifactUpdate>,
    pub exact_duplicates: Vec<ExtractedArtifact>,
    /// True when the embedding gateway was unreachable and similarity
    /// screening was skipped
    pub degraded: bool,
}

enum Screen {
    Unique(Vec<f32>),
    Candidate(CandidatePair, Vec<f32>),
}

/// Embedding-similarity deduplicator with AI tie-breaking
pub struct SemanticDeduplicator {
    config: DedupConfig,
    embeddings: Arc<dyn EmbeddingProvider>,
    judge: Arc<dyn DedupJudge>,
}

impl SemanticDeduplicator {
    /// Assemble the deduplicator
    pub fn new(
        config: DedupConfig,
        embeddings: Arc<dyn EmbeddingProvider>,
        judge: Arc<dyn DedupJudge>,
    ) -> Self {
        Self {
            config,
            embeddings,
            judge,
        }
    }

    /// Classify a batch of new artifacts against the existing records.
    pub async fn dedupe(
        &self,
        new_items: Vec<ExtractedArtifact>,
        existing: &[ArtifactRecord],
    ) -> Result<DedupOutcome> {
        if new_items.is_empty() {
            return Ok(DedupOutcome::default());
        }

        // Both sides are embedded fresh with the same construction rule;
        // cached historical encodings would invalidate the metric.
        let existing_texts: Vec<String> =
            existing.iter().map(|record| record.embedding_text()).collect();
        let existing_embeddings = match self.embeddings.embed_batch(&existing_texts).await {
            Ok(embeddings) => embeddings,
            Err(e) => {
                tracing::warn!(
                    "embedding gateway unreachable, passing batch through unscreened: {}",
                    e
                );
                return Ok(DedupOutcome {
                    unique: new_items
                        .into_iter()
                        .map(|artifact| UniqueArtifact {
                            artifact,
                            embedding: None,
                        })
                        .collect(),
                    degraded: true,
                    ..Default::default()
                });
            }
        };

        let mut outcome = DedupOutcome::default();
        let mut candidates: Vec<CandidatePair> = Vec::new();
        let mut candidate_embeddings: Vec<Vec<f32>> = Vec::new();

        for artifact in new_items {
            match self.screen(&artifact, existing, &existing_embeddings).await {
                Ok(Screen::Unique(embedding)) => outcome.unique.push(UniqueArtifact {
                    artifact,
                    embedding: Some(embedding),
                }),
                Ok(Screen::Candidate(pair, embedding)) => {
                    candidates.push(pair);
                    candidate_embeddings.push(embedding);
                }
                Err(e) => {
                    // Gateway died mid-batch: this item cannot be screened,
                    // pass it through and surface the degradation
                    tracing::warn!(
                        title = %artifact.title,
                        "embedding failed mid-batch, passing artifact through unscreened: {}",
                        e
                    );
                    outcome.degraded = true;
                    outcome.unique.push(UniqueArtifact {
                        artifact,
                        embedding: None,
                    });
                }
            }
        }

        if candidates.is_empty() {
            return Ok(outcome);
        }

        // One batched judge call for every likely-duplicate and
        // medium-band candidate
        match self.judge.judge_pairs(&candidates).await {
            Ok(verdicts) if verdicts.len() == candidates.len() => {
                for ((pair, verdict), embedding) in candidates
                    .into_iter()
                    .zip(verdicts)
                    .zip(candidate_embeddings)
                {
                    if !verdict.same_item {
                        outcome.unique.push(UniqueArtifact {
                            artifact: pair.new,
                            embedding: Some(embedding),
                        });
                    } else if verdict.has_new_info {
                        outcome.updates.push(ArtifactUpdate {
                            artifact: pair.new,
                            existing_id: pair.existing.id,
                            new_info: verdict.new_info,
                        });
                    } else {
                        outcome.exact_duplicates.push(pair.new);
                    }
                }
            }
            Ok(verdicts) => {
                tracing::warn!(
                    expected = candidates.len(),
                    got = verdicts.len(),
                    "judge returned a short verdict list, failing closed"
                );
                outcome
                    .exact_duplicates
                    .extend(candidates.into_iter().map(|pair| pair.new));
            }
            Err(e) => {
                // Fail closed: duplicates are the safe default
                tracing::warn!("dedup judge failed, treating candidates as duplicates: {}", e);
                outcome
                    .exact_duplicates
                    .extend(candidates.into_iter().map(|pair| pair.new));
            }
        }

        Ok(outcome)
    }

    async fn screen(
        &self,
        artifact: &ExtractedArtifact,
        existing: &[ArtifactRecord],
        existing_embeddings: &[Vec<f32>],
    ) -> Result<Screen> {
        let embedding = self
            .embeddings
            .embed(&artifact.embedding_text())
            .await
            .map_err(|e| crate::Error::Dedup(e.to_string()))?;

        let best = existing_embeddings
            .iter()
            .enumerate()
            .map(|(i, other)| (i, cosine_similarity(&embedding, other)))
            .max_by(|(_, a), (_, b)| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));

        let (index, similarity) = match best {
            Some((i, s)) if s >= self.config.similarity_floor => (i, s),
            _ => return Ok(Screen::Unique(embedding)),
        };

        if similarity >= self.config.judgment_threshold {
            // High band is a likely duplicate, medium band defers to AI
            // judgment; both go through the same batched call
            tracing::debug!(
                title = %artifact.title,
                similarity,
                "duplicate candidate for judgment"
            );
            Ok(Screen::Candidate(
                CandidatePair {
                    new: artifact.clone(),
                    existing: existing[index].clone(),
                    similarity,
                },
                embedding,
            ))
        } else {
            // Above the floor but below the judgment band: unique
            Ok(Screen::Unique(embedding))
        }
    }
}
