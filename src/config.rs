//! Meetwise configuration management

use serde::{Deserialize, Serialize};

/// Main Meetwise configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MeetwiseConfig {
    /// Streaming orchestrator configuration
    #[serde(default)]
    pub orchestrator: OrchestratorConfig,

    /// Question answer-discovery configuration
    #[serde(default)]
    pub discovery: DiscoveryConfig,

    /// Action tracking configuration
    #[serde(default)]
    pub actions: ActionConfig,

    /// Semantic deduplication configuration
    #[serde(default)]
    pub dedup: DedupConfig,

    /// Embedding gateway configuration
    #[serde(default)]
    pub embeddings: EmbeddingConfig,
}

/// Streaming orchestrator configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrchestratorConfig {
    /// Maximum finalized sentences kept in the rolling context buffer
    pub context_buffer_size: usize,

    /// Maximum recent open questions/actions pulled into the LLM context
    pub snapshot_limit: usize,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            context_buffer_size: 50,
            snapshot_limit: 10,
        }
    }
}

/// Question answer-discovery configuration
///
/// Timeouts for the four concurrent discovery tiers. Tier 4's monitoring
/// window is the gating factor for the overall discovery lifetime.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiscoveryConfig {
    /// Tier 1: indexed knowledge-base search timeout (ms)
    pub knowledge_base_timeout_ms: u64,

    /// Tier 2: meeting-context search timeout (ms)
    pub meeting_context_timeout_ms: u64,

    /// Tier 3: AI-generated answer timeout (ms)
    pub generation_timeout_ms: u64,

    /// Tier 4: live monitoring window (ms)
    pub live_monitor_timeout_ms: u64,
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self {
            knowledge_base_timeout_ms: 2_000,
            meeting_context_timeout_ms: 1_500,
            generation_timeout_ms: 3_000,
            live_monitor_timeout_ms: 60_000,
        }
    }
}

/// Action tracking configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActionConfig {
    /// Confidence floor below which detected actions are dropped
    pub confidence_floor: f64,

    /// Token-set Jaccard similarity above which two descriptions merge
    pub merge_threshold: f64,

    /// How many recent actions are considered as merge candidates
    pub merge_candidate_window: usize,

    /// Confidence at or above which incomplete actions trigger segment alerts
    pub alert_confidence: f64,
}

impl Default for ActionConfig {
    fn default() -> Self {
        Self {
            confidence_floor: 0.6,
            merge_threshold: 0.6,
            merge_candidate_window: 10,
            alert_confidence: 0.8,
        }
    }
}

/// Semantic deduplication configuration
///
/// The similarity constants are empirically chosen; keep them unless a
/// calibration dataset justifies retuning.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DedupConfig {
    /// Minimum cosine similarity for a match to be considered at all
    pub similarity_floor: f64,

    /// Similarity at or above which the AI judge is consulted
    pub judgment_threshold: f64,

    /// Similarity at or above which a pair is a likely duplicate
    pub duplicate_threshold: f64,
}

impl Default for DedupConfig {
    fn default() -> Self {
        Self {
            similarity_floor: 0.65,
            judgment_threshold: 0.75,
            duplicate_threshold: 0.85,
        }
    }
}

/// Embedding gateway configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingConfig {
    /// Dimensionality of the vectors produced by the gateway
    pub dimensions: usize,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self { dimensions: 768 }
    }
}

impl MeetwiseConfig {
    /// Load configuration from a TOML file
    pub fn from_file(path: &std::path::Path) -> crate::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        toml::from_str(&content).map_err(|e| crate::Error::Config(e.to_string()))
    }
}
