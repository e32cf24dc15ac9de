//! Conversation orchestrator
//!
//! One query cycle: fetch retrieval context, ask the model, and either
//! return its answer directly or execute the single tool it requested
//! and ask again with the tool result. At most one tool dispatch per
//! query; the model never loops. Failures never escape as errors — every
//! query produces a `QueryOutcome`, degraded ones carry a customer-safe
//! message plus a truncated diagnostic.

use crate::config::Settings;
use crate::error::AgentError;
use crate::gemini::{GeminiClient, ModelGateway, RetryPolicy};
use crate::models::{ConversationTurn, QueryOutcome, ToolCall};
use crate::rag::BankingRag;
use crate::tools::BankingToolkit;
use crate::Result;
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{error, info};

/// Rolling history cap (three user/assistant exchanges)
const HISTORY_LIMIT: usize = 6;

/// Banking customer service agent: RAG context + tool calling over Gemini
pub struct BankingAgent {
    rag: Arc<BankingRag>,
    gateway: ModelGateway,
    toolkit: BankingToolkit,
    model: String,
    history: Mutex<Vec<ConversationTurn>>,
}

impl BankingAgent {
    pub fn new(
        rag: Arc<BankingRag>,
        gateway: ModelGateway,
        toolkit: BankingToolkit,
        model: impl Into<String>,
    ) -> Self {
        let model = model.into();
        info!(model, "Agent initialized");
        Self {
            rag,
            gateway,
            toolkit,
            model,
            history: Mutex::new(Vec::new()),
        }
    }

    /// Production wiring: real Gemini transport, file-backed dataset
    pub fn from_settings(settings: &Settings, rag: Arc<BankingRag>) -> Self {
        let transport = Box::new(GeminiClient::new(settings.gemini_api_key.clone()));
        let policy = RetryPolicy::new(
            settings.max_retries,
            settings.retry_base_delay_secs,
            settings.retry_max_wait_secs,
        );
        let gateway = ModelGateway::with_throttle(
            transport,
            policy,
            Duration::from_secs_f64(settings.min_request_interval_secs),
            crate::gemini::new_throttle(),
        );
        let toolkit = BankingToolkit::new(&settings.data_dir);

        Self::new(rag, gateway, toolkit, settings.gemini_model.clone())
    }

    /// Process one customer query end to end. Infallible by contract:
    /// model failures map to customer-safe responses with `success:
    /// false` and a truncated diagnostic in `error`.
    pub async fn process_query(&self, user_message: &str) -> QueryOutcome {
        match self.answer(user_message).await {
            Ok((response, tool_calls)) => {
                let mut history = self.history.lock().await;
                history.push(ConversationTurn::user(user_message));
                history.push(ConversationTurn::assistant(response.clone()));
                let overflow = history.len().saturating_sub(HISTORY_LIMIT);
                history.drain(..overflow);

                QueryOutcome {
                    response,
                    tool_calls,
                    success: true,
                    error: None,
                }
            }
            Err(e) => {
                error!("Query processing failed: {}", e);
                let detail = e.to_string();
                let response = match e {
                    AgentError::RateLimited(_) => {
                        "I'm experiencing high demand right now. Please wait a few seconds \
                         and try your question again. I apologize for the inconvenience."
                            .to_string()
                    }
                    AgentError::InvalidArgument(_) => {
                        "I encountered an issue processing your request. Could you please \
                         rephrase your question?"
                            .to_string()
                    }
                    _ => format!(
                        "I'm temporarily unable to process your request. Error: {}",
                        truncate(&detail, 100)
                    ),
                };

                QueryOutcome {
                    response,
                    tool_calls: Vec::new(),
                    success: false,
                    error: Some(truncate(&detail, 200)),
                }
            }
        }
    }

    /// The fallible inner cycle: prompt, optional single tool round-trip,
    /// final answer.
    async fn answer(&self, user_message: &str) -> Result<(String, Vec<ToolCall>)> {
        let context = self.rag.get_context(user_message);
        let prompt = self.build_query_prompt(&context, user_message);

        let text = self.gateway.generate(&self.model, &prompt).await?;
        let text = strip_code_fences(&text);

        let mut tool_calls = Vec::new();
        let mut final_answer = text.to_string();

        if let Some(call) = parse_tool_request(text) {
            info!(tool = %call.name, "Model requested tool");
            let outcome = self.toolkit.dispatch(&call.name, call.args.clone());
            let tool_result = serde_json::to_string(&outcome)?;
            tool_calls.push(call.clone());

            let final_prompt = build_final_prompt(user_message, &call.name, &tool_result);
            final_answer = self.gateway.generate(&self.model, &final_prompt).await?;
        }

        Ok((final_answer.trim().to_string(), tool_calls))
    }

    fn build_query_prompt(&self, context: &str, user_message: &str) -> String {
        format!(
            r#"{system}

[Banking Knowledge Base Context]
{context}

[Customer Query]
{user_message}

Instructions:
- If tool is required, respond ONLY in JSON:
{{
  "tool_call": {{
    "name": "tool_name_here",
    "args": {{
      "param1": "value1"
    }}
  }}
}}

- If tool is not required, respond normally with final answer."#,
            system = system_prompt(),
        )
    }

    pub async fn reset(&self) {
        self.history.lock().await.clear();
        info!("Conversation history reset");
    }

    pub async fn history(&self) -> Vec<ConversationTurn> {
        self.history.lock().await.clone()
    }
}

fn system_prompt() -> String {
    format!(
        r#"You are an expert Banking Customer Service AI Agent.

## Responsibilities:
- Answer customer banking queries professionally
- Use context from knowledge base
- Use tools when required:
    - get_account_details
    - get_transaction_history
    - find_nearest_branch
    - check_loan_eligibility
    - escalate_to_human

## Rules:
- Be concise, accurate, professional.
- Never hallucinate account balances or transaction info.
- If user asks account-related queries, use tools.
- If fraud/unauthorized transaction is mentioned, escalate immediately.
- If you cannot answer, ask a clarifying question.

Current date/time: {now}"#,
        now = chrono::Local::now().format("%Y-%m-%d %H:%M:%S"),
    )
}

fn build_final_prompt(user_message: &str, tool_name: &str, tool_result: &str) -> String {
    format!(
        r#"Customer Query:
{user_message}

Tool Executed:
{tool_name}

Tool Result (JSON):
{tool_result}

Now generate a final professional banking response to the customer.
- Explain the tool output clearly.
- Provide next steps if required."#,
    )
}

/// Strip a surrounding markdown code fence, if present
fn strip_code_fences(text: &str) -> &str {
    let trimmed = text.trim();
    let inner = trimmed
        .strip_prefix("```json")
        .or_else(|| trimmed.strip_prefix("```"));
    match inner {
        Some(rest) => rest.strip_suffix("```").unwrap_or(rest).trim(),
        None => trimmed,
    }
}

#[derive(Debug, Deserialize)]
struct ToolEnvelope {
    tool_call: Option<ToolCall>,
}

/// Detect the tool-request envelope in model output. Anything that is
/// not a clean `{"tool_call": ...}` object is treated as a final answer,
/// malformed JSON included.
fn parse_tool_request(text: &str) -> Option<ToolCall> {
    if !text.starts_with('{') || !text.contains("tool_call") {
        return None;
    }
    serde_json::from_str::<ToolEnvelope>(text)
        .ok()
        .and_then(|envelope| envelope.tool_call)
}

/// Character-boundary-safe prefix truncation
fn truncate(text: &str, limit: usize) -> String {
    text.chars().take(limit).collect()
}
