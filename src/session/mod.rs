//! Session lifecycle — context buffer, orchestrator, and registry

pub mod context;
pub mod orchestrator;
pub mod registry;

pub use context::{ContextCache, MeetingSnapshot, StoreBackedCache, TranscriptBuffer, TranscriptChunk};
pub use orchestrator::{HealthStatus, SessionHealth, SessionOrchestrator};
pub use registry::{SessionPipeline, SessionRegistry, SessionRegistryBuilder};
