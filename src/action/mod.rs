//! Action item tracking — completeness, merge, updates, segment alerts

pub mod handler;
pub mod merge;

pub use handler::ActionHandler;
pub use merge::{completeness_score, token_set_jaccard};
