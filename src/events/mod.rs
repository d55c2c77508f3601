//! Broadcast events and the per-session outbound channel

pub mod broadcaster;
pub mod types;

pub use broadcaster::{EventBroadcaster, EventTransport, MemoryTransport};
pub use types::BroadcastEvent;
