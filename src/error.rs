//! Error types for the banking agent

use thiserror::Error;

/// Result type alias for agent operations
pub type Result<T> = std::result::Result<T, AgentError>;

#[derive(Error, Debug)]
pub enum AgentError {

    // =============================
    // Retrieval Errors
    // =============================

    #[error("Retrieval error: {0}")]
    Retrieval(String),

    #[error("Vectorizer not fitted: {0}")]
    VectorizerNotFitted(String),

    // =============================
    // Tool Errors
    // =============================

    #[error("Tool not found: {0}")]
    ToolNotFound(String),

    #[error("Invalid tool input: {0}")]
    InvalidToolInput(String),

    // =============================
    // Model Errors
    // =============================

    /// Provider signalled quota exhaustion (HTTP 429 / RESOURCE_EXHAUSTED).
    /// The payload is the raw provider error text, which may carry a
    /// retry-delay hint.
    #[error("Rate limited: {0}")]
    RateLimited(String),

    /// Malformed request rejected by the provider. Never retried.
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("LLM error: {0}")]
    Llm(String),

    // =============================
    // External Library Conversions
    // =============================

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("HTTP client error: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

impl AgentError {
    /// True when the failure class should be retried with backoff.
    pub fn is_rate_limit(&self) -> bool {
        matches!(self, AgentError::RateLimited(_))
    }
}
