//! AI tie-breaker for ambiguous duplicate candidates
//!
//! High- and medium-similarity pairs are batched into a single judge call
//! that decides, per pair, whether the mentions are truly the same item
//! and whether the new mention carries new information (status change, new
//! mitigation, new progress). On judge failure the deduplicator fails
//! closed and treats every candidate as an exact duplicate.

use super::artifact::{ArtifactRecord, ExtractedArtifact};
use crate::error::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// A pair submitted for judgment
#[derive(Debug, Clone)]
pub struct CandidatePair {
    pub new: ExtractedArtifact,
    pub existing: ArtifactRecord,
    pub similarity: f64,
}

/// Per-pair judge verdict
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PairJudgment {
    /// Is the new mention truly the same item as the existing record?
    pub same_item: bool,
    /// Does it carry information the record lacks?
    pub has_new_info: bool,
    /// What changed, keyed by field name, when `has_new_info`
    #[serde(default)]
    pub new_info: HashMap<String, serde_json::Value>,
}

/// Batched pair judgment
#[async_trait]
pub trait DedupJudge: Send + Sync {
    /// Judge all candidate pairs in one call, returning one verdict per
    /// pair in input order.
    async fn judge_pairs(&self, pairs: &[CandidatePair]) -> Result<Vec<PairJudgment>>;
}

/// Deterministic field-diff judge
///
/// Stands in for the AI judge in tests and the replay CLI: a candidate
/// pair is the same item (it already cleared the similarity bands), and
/// carries new information exactly when a domain field differs from the
/// existing record.
#[derive(Default)]
pub struct FieldDiffJudge;

impl FieldDiffJudge {
    /// Create the judge
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl DedupJudge for FieldDiffJudge {
    async fn judge_pairs(&self, pairs: &[CandidatePair]) -> Result<Vec<PairJudgment>> {
        Ok(pairs
            .iter()
            .map(|pair| {
                let mut new_info = HashMap::new();
                for (key, value) in &pair.new.fields {
                    if pair.existing.fields.get(key) != Some(value) {
                        new_info.insert(
                            key.clone(),
                            serde_json::json!({
                                "from": pair.existing.fields.get(key),
                                "to": value,
                            }),
                        );
                    }
                }
                PairJudgment {
                    same_item: true,
                    has_new_info: !new_info.is_empty(),
                    new_info,
                }
            })
            .collect())
    }
}
