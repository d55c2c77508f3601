//! Meetwise error types

use thiserror::Error;

/// Meetwise error type
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Stream protocol error
    #[error("Stream error: {0}")]
    Stream(String),

    /// Routing error (a handler failed during dispatch)
    #[error("Routing error: {0}")]
    Routing(String),

    /// Session error
    #[error("Session error: {0}")]
    Session(String),

    /// Persistence error
    #[error("Persistence error: {0}")]
    Persistence(String),

    /// Embedding gateway error
    #[error("Embedding error: {0}")]
    Embedding(String),

    /// LLM provider error
    #[error("LLM error: {0}")]
    Llm(#[from] crate::stream::LlmStreamError),

    /// Deduplication error
    #[error("Dedup error: {0}")]
    Dedup(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Result type alias for Meetwise operations
pub type Result<T> = std::result::Result<T, Error>;
