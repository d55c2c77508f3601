//! Insight persistence — detected questions and action items
//!
//! The `Insight` record is the durable form of everything the stream
//! handlers detect. The store trait is the seam to the real persistence
//! layer; `MemoryInsightStore` backs tests and the replay CLI.

pub mod model;
pub mod store;

pub use model::{AnswerSource, FieldChange, Insight, InsightBuilder, InsightKind, InsightStatus};
pub use store::{InsightStore, MemoryInsightStore};
