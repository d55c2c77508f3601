//! Meetwise - Real-time meeting intelligence streaming pipeline
//!
//! Meetwise consumes a continuous, typed object stream produced by an LLM
//! analyzing a live meeting transcript and turns it into persisted,
//! race-safe meeting intelligence: answered questions, tracked action
//! items, and deduplicated project artifacts.
//!
//! ## Architecture
//!
//! ```text
//! transcript chunks (is_final only)
//!         │
//! ┌───────▼────────────────────────────────────────────────────────┐
//! │                  Streaming Orchestrator (per session)           │
//! │  rolling context buffer ── LLM stream client ── health/metrics  │
//! └───────┬────────────────────────────────────────────────────────┘
//!         │ raw JSON objects
//! ┌───────▼────────────────────────────────────────────────────────┐
//! │                        Stream Router                            │
//! │  parse + validate ── identity state ── idempotent dispatch      │
//! └──┬──────────────┬──────────────────┬───────────────────────────┘
//!    │ question     │ action / update  │ answer
//! ┌──▼───────────┐ ┌▼───────────────┐ ┌▼──────────────┐
//! │  Question    │ │    Action      │ │    Answer     │
//! │  Handler     │ │    Handler     │ │    Handler    │
//! │  4-tier      │ │  completeness  │ │  live monitor │
//! │  discovery   │ │  fuzzy merge   │ │  rendezvous   │
//! └──┬───────────┘ └┬───────────────┘ └┬──────────────┘
//!    │     insight store (source of truth)  │
//!    └───────┬──────────────────────────────┘
//!            ▼
//!     outbound event channel ── broadcast transport
//! ```
//!
//! The semantic deduplicator sits beside the stream pipeline: it screens
//! freshly extracted project artifacts (risks, tasks, blockers, lessons)
//! against existing records with embedding cosine similarity and an AI
//! tie-breaker, failing closed to "duplicate" when the judge is down.
//!
//! ## Modules
//!
//! - [`stream`]: wire protocol, LLM client seam, per-session router
//! - [`question`]: question lifecycle and four-tier answer discovery
//! - [`action`]: action tracking, completeness, merge, segment alerts
//! - [`session`]: orchestrator, transcript context, session registry
//! - [`dedup`]: semantic deduplication of extracted artifacts
//! - [`insight`]: persisted records and the store seam
//! - [`events`]: broadcast events and the outbound channel
//! - [`embeddings`]: embedding gateway seam
//! - [`knowledge`]: knowledge-base search and answer generation seams
//! - [`config`]: configuration management

pub mod action;
pub mod config;
pub mod dedup;
pub mod embeddings;
pub mod error;
pub mod events;
pub mod insight;
pub mod knowledge;
pub mod question;
pub mod session;
pub mod stream;

pub use config::MeetwiseConfig;
pub use error::{Error, Result};
