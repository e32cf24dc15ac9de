//! REST API server for the banking agent
//!
//! Thin HTTP layer over `BankingAgent`: chat, conversation reset, health
//! and capability info. Transport errors map to status codes; degraded
//! agent outcomes still come back 200 with `success: false`.

use axum::{extract::State, http::StatusCode, routing::get, routing::post, Json, Router};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tracing::info;

use crate::agent::BankingAgent;
use crate::models::ToolCall;

/// =============================
/// Request/Response Models
/// =============================

fn default_conversation_id() -> String {
    "default".to_string()
}

#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    pub message: String,
    #[serde(default = "default_conversation_id")]
    pub conversation_id: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ChatResponse {
    pub response: String,
    pub tool_calls: Vec<ToolCall>,
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub rag_ready: bool,
    pub agent_ready: bool,
}

/// =============================
/// API State
/// =============================

#[derive(Clone)]
pub struct ApiState {
    pub agent: Arc<BankingAgent>,
    pub model: String,
    pub rag_entries: usize,
}

/// =============================
/// Handlers
/// =============================

async fn health(State(state): State<ApiState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        rag_ready: state.rag_entries > 0,
        agent_ready: true,
    })
}

async fn chat(
    State(state): State<ApiState>,
    Json(req): Json<ChatRequest>,
) -> (StatusCode, Json<ChatResponse>) {
    if req.message.trim().is_empty() {
        return (
            StatusCode::BAD_REQUEST,
            Json(ChatResponse {
                response: "Please enter a message.".to_string(),
                tool_calls: Vec::new(),
                success: false,
                error: Some("empty message".to_string()),
            }),
        );
    }

    let request_id = uuid::Uuid::new_v4();
    info!(
        %request_id,
        conversation_id = %req.conversation_id,
        "Processing message: {}...",
        truncate_for_log(&req.message)
    );

    let outcome = state.agent.process_query(&req.message).await;

    (
        StatusCode::OK,
        Json(ChatResponse {
            response: outcome.response,
            tool_calls: outcome.tool_calls,
            success: outcome.success,
            error: outcome.error,
        }),
    )
}

async fn reset(State(state): State<ApiState>) -> Json<serde_json::Value> {
    state.agent.reset().await;
    Json(serde_json::json!({
        "message": "Conversation reset successfully"
    }))
}

async fn get_info(State(state): State<ApiState>) -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "name": "Banking AI Agent",
        "version": env!("CARGO_PKG_VERSION"),
        "capabilities": [
            "Account information retrieval",
            "Transaction history lookup",
            "Branch location finder",
            "Loan eligibility check",
            "Query escalation to human agents",
            "Context-aware responses using RAG"
        ],
        "model": state.model,
        "rag_enabled": state.rag_entries > 0,
    }))
}

fn truncate_for_log(message: &str) -> String {
    message.chars().take(100).collect()
}

/// =============================
/// Router
/// =============================

pub fn create_router(state: ApiState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/chat", post(chat))
        .route("/reset", post(reset))
        .route("/info", get(get_info))
        .with_state(state)
        .layer(CorsLayer::permissive())
}

/// =============================
/// Server Startup
/// =============================

pub async fn start_server(
    state: ApiState,
    port: u16,
) -> std::result::Result<(), Box<dyn std::error::Error>> {
    let router = create_router(state);

    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{}", port)).await?;

    info!("API Server listening on http://0.0.0.0:{}", port);
    info!("Local: http://127.0.0.1:{}", port);

    axum::serve(listener, router).await?;

    Ok(())
}
