//! Core data models for the banking agent

use serde::{Deserialize, Serialize};
use std::fmt;

//
// ================= Documents =================
//

/// Metadata attached to every indexed chunk
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DocumentMetadata {
    pub doc_id: String,
    pub source: String,
    #[serde(default)]
    pub chunk: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub city: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub branch_id: Option<String>,
}

impl DocumentMetadata {
    pub fn new(doc_id: impl Into<String>, source: impl Into<String>, chunk: usize) -> Self {
        Self {
            doc_id: doc_id.into(),
            source: source.into(),
            chunk,
            city: None,
            branch_id: None,
        }
    }
}

/// Immutable unit of indexing and retrieval
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Document {
    pub content: String,
    pub metadata: DocumentMetadata,
}

/// A retrieval result: a document plus its distance score (lower = closer)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrievedChunk {
    pub content: String,
    pub metadata: DocumentMetadata,
    pub score: f32,
}

//
// ================= Conversation =================
//

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::User => write!(f, "user"),
            Role::Assistant => write!(f, "assistant"),
        }
    }
}

/// One entry of the rolling conversation history
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversationTurn {
    pub role: Role,
    pub content: String,
}

impl ConversationTurn {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

//
// ================= Tool I/O =================
//

/// A structured tool request extracted from model output
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolCall {
    pub name: String,
    #[serde(default)]
    pub args: serde_json::Value,
}

/// Tagged result of a tool dispatch. Tool failures are data, not faults.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolOutcome {
    pub success: bool,
    pub data: serde_json::Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ToolOutcome {
    pub fn ok(data: serde_json::Value) -> Self {
        Self {
            success: true,
            data,
            error: None,
        }
    }

    pub fn err(message: impl Into<String>) -> Self {
        Self {
            success: false,
            data: serde_json::Value::Null,
            error: Some(message.into()),
        }
    }
}

//
// ================= Final Result =================
//

/// Outcome of one `process_query` cycle, consumed by any outer transport
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryOutcome {
    pub response: String,
    pub tool_calls: Vec<ToolCall>,
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tool_outcome_tagging() {
        let ok = ToolOutcome::ok(serde_json::json!({"balance": 250000}));
        assert!(ok.success);
        assert!(ok.error.is_none());

        let err = ToolOutcome::err("Account ACC999 not found");
        assert!(!err.success);
        assert_eq!(err.error.as_deref(), Some("Account ACC999 not found"));
    }

    #[test]
    fn test_role_serialization() {
        let turn = ConversationTurn::user("hello");
        let json = serde_json::to_string(&turn).unwrap();
        assert!(json.contains("\"role\":\"user\""));
    }
}
