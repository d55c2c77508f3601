//! Question lifecycle — detection, four-tier answer discovery, live answers

pub mod answer;
pub mod discovery;
pub mod handler;
pub mod monitor;

pub use answer::AnswerHandler;
pub use discovery::{Discovery, TierAnswer};
pub use handler::QuestionHandler;
pub use monitor::{LiveAnswer, LiveMonitorRegistry};
