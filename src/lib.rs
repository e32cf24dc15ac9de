//! Banking AI Agent
//!
//! RAG-assisted customer service agent for banking:
//! - TF-IDF retrieval over the banking knowledge base
//! - Gemini tool calling over a closed set of banking operations
//! - Rate-limit-aware model gateway (retry, backoff, throttle)
//! - Bounded conversation history
//!
//! QUERY CYCLE:
//! RETRIEVE → PROMPT → (TOOL DISPATCH → PROMPT)? → ANSWER

pub mod agent;
pub mod api;
pub mod config;
pub mod error;
pub mod gemini;
pub mod models;
pub mod rag;
pub mod tools;

pub use error::Result;

// Re-export common types
pub use error::AgentError;
pub use models::*;
