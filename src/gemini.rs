//! Gemini API client and rate-limit-aware model gateway
//!
//! `GeminiClient` is the raw transport (long-lived reqwest::Client for
//! connection pooling). `ModelGateway` wraps any transport with the
//! retry policy: capped exponential backoff plus jitter on rate-limit
//! failures, an optional provider retry hint, and a shared
//! minimum-interval throttle spacing all outbound requests.

use crate::error::AgentError;
use crate::Result;
use rand::Rng;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::{debug, error, info, warn};

//
// ================= Transport =================
//

/// Model-invocation transport: (model identifier, prompt) → response text,
/// raising a distinguishable rate-limit condition.
#[async_trait::async_trait]
pub trait ModelTransport: Send + Sync {
    async fn generate(&self, model: &str, prompt: &str) -> Result<String>;
}

/// Reusable Gemini REST client (connection-pooled)
pub struct GeminiClient {
    client: Client,
    api_key: String,
    base_url: String,
}

impl GeminiClient {
    pub fn new(api_key: String) -> Self {
        let client = Client::builder()
            .pool_idle_timeout(Duration::from_secs(90))
            .pool_max_idle_per_host(8)
            .build()
            .expect("Failed to build HTTP client");

        Self {
            client,
            api_key,
            base_url: "https://generativelanguage.googleapis.com/v1beta".to_string(),
        }
    }
}

#[async_trait::async_trait]
impl ModelTransport for GeminiClient {
    async fn generate(&self, model: &str, prompt: &str) -> Result<String> {
        if self.api_key.is_empty() {
            return Err(AgentError::Llm("GEMINI_API_KEY not configured".to_string()));
        }

        let url = format!(
            "{}/models/{}:generateContent?key={}",
            self.base_url, model, self.api_key
        );

        let request = GeminiRequest {
            contents: vec![Content {
                parts: vec![Part {
                    text: prompt.to_string(),
                }],
            }],
            generation_config: GenerationConfig {
                temperature: 0.7,
                max_output_tokens: 1024,
            },
        };

        debug!(model, "Calling Gemini API");

        let response = self.client.post(&url).json(&request).send().await?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            error!(status = %status, "Gemini API error response: {}", error_text);
            return Err(classify_provider_error(status.as_u16(), error_text));
        }

        let gemini_response: GeminiResponse = response
            .json()
            .await
            .map_err(|e| AgentError::Llm(format!("Gemini parse error: {}", e)))?;

        let text = gemini_response
            .candidates
            .first()
            .and_then(|c| c.content.parts.first())
            .map(|p| p.text.trim().to_string())
            .ok_or_else(|| AgentError::Llm("Empty response from Gemini".to_string()))?;

        Ok(text)
    }
}

/// Map a provider error body to the failure taxonomy. Rate-limit and
/// invalid-argument classes are the only ones the caller treats
/// specially.
fn classify_provider_error(status: u16, error_text: String) -> AgentError {
    if status == 429 || error_text.contains("RESOURCE_EXHAUSTED") {
        AgentError::RateLimited(error_text)
    } else if status == 400 || error_text.contains("INVALID_ARGUMENT") {
        AgentError::InvalidArgument(error_text)
    } else {
        AgentError::Llm(error_text)
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiRequest {
    contents: Vec<Content>,
    generation_config: GenerationConfig,
}

#[derive(Debug, Serialize, Deserialize)]
struct Content {
    parts: Vec<Part>,
}

#[derive(Debug, Serialize, Deserialize)]
struct Part {
    text: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    temperature: f32,
    max_output_tokens: i32,
}

#[derive(Debug, Deserialize)]
struct GeminiResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Content,
}

//
// ================= Retry Policy =================
//

/// Bounded backoff for rate-limit failures
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub retries: u32,
    pub base_delay_secs: f64,
    pub max_wait_secs: f64,
}

impl RetryPolicy {
    pub fn new(retries: u32, base_delay_secs: f64, max_wait_secs: f64) -> Self {
        Self {
            retries,
            base_delay_secs,
            max_wait_secs,
        }
    }

    /// Wait before retry `attempt` (0-based), given the provider's raw
    /// error text. A parsed retry hint is scaled down and capped; the
    /// backoff fallback is the primary contract. Both paths carry small
    /// random jitter against thundering-herd resubmission.
    pub fn wait_for(&self, attempt: u32, error_text: &str) -> Duration {
        let mut rng = rand::thread_rng();
        let secs = match parse_retry_hint(error_text) {
            Some(hint) => {
                let wait = (hint * 0.3).min(self.max_wait_secs) + rng.gen_range(0.5..1.5);
                warn!(
                    "Rate limit hit. Provider requested {:.1}s, waiting {:.2}s (attempt {}/{})",
                    hint,
                    wait,
                    attempt + 1,
                    self.retries
                );
                wait
            }
            None => {
                let backoff = self.base_delay_secs * f64::from(2u32.pow(attempt));
                let wait = backoff.min(self.max_wait_secs) + rng.gen_range(0.0..1.0);
                warn!(
                    "Rate limit hit. Retrying in {:.2}s (attempt {}/{})",
                    wait,
                    attempt + 1,
                    self.retries
                );
                wait
            }
        };
        Duration::from_secs_f64(secs)
    }

    /// Upper bound on any single wait: the cap plus the jitter ceiling
    pub fn max_single_wait(&self) -> Duration {
        Duration::from_secs_f64(self.max_wait_secs + 1.5)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(3, 2.0, 8.0)
    }
}

/// Extract a `retryDelay` hint (seconds) from a provider error body.
/// Matches both `"retryDelay": "40.35s"` and `'retryDelay': '40.35s'`;
/// absent or malformed hints fall back to exponential backoff.
pub fn parse_retry_hint(error_text: &str) -> Option<f64> {
    let start = error_text.find("retryDelay")?;
    let rest = &error_text[start + "retryDelay".len()..];

    let digits: String = rest
        .chars()
        .skip_while(|c| !c.is_ascii_digit())
        .take_while(|c| c.is_ascii_digit() || *c == '.')
        .collect();

    digits.parse().ok()
}

//
// ================= Gateway =================
//

/// Shared "time of last request" watermark. One handle spaces requests
/// across every gateway that holds a clone of it.
pub type ThrottleWatermark = Arc<Mutex<Option<Instant>>>;

pub fn new_throttle() -> ThrottleWatermark {
    Arc::new(Mutex::new(None))
}

/// Rate-limit-aware wrapper around a model transport
pub struct ModelGateway {
    transport: Box<dyn ModelTransport>,
    policy: RetryPolicy,
    min_request_interval: Duration,
    last_request: ThrottleWatermark,
}

impl ModelGateway {
    pub fn new(transport: Box<dyn ModelTransport>, policy: RetryPolicy) -> Self {
        Self::with_throttle(transport, policy, Duration::from_secs_f64(1.5), new_throttle())
    }

    /// Inject the throttle explicitly so multiple gateways (or tests)
    /// share one request-spacing watermark.
    pub fn with_throttle(
        transport: Box<dyn ModelTransport>,
        policy: RetryPolicy,
        min_request_interval: Duration,
        last_request: ThrottleWatermark,
    ) -> Self {
        Self {
            transport,
            policy,
            min_request_interval,
            last_request,
        }
    }

    /// Enforce the minimum spacing between outbound requests, across all
    /// callers sharing the watermark, before any attempt is made.
    async fn throttle(&self) {
        let mut last = self.last_request.lock().await;
        if let Some(previous) = *last {
            let elapsed = previous.elapsed();
            if elapsed < self.min_request_interval {
                let wait = self.min_request_interval - elapsed;
                info!("Throttling request, waiting {:.2}s", wait.as_secs_f64());
                tokio::time::sleep(wait).await;
            }
        }
        *last = Some(Instant::now());
    }

    /// Invoke the model with the retry policy applied. Only rate-limit
    /// failures are retried; anything else propagates immediately.
    /// Exhausting the budget surfaces the last rate-limit failure.
    pub async fn generate(&self, model: &str, prompt: &str) -> Result<String> {
        self.throttle().await;

        let mut attempt = 0;
        loop {
            match self.transport.generate(model, prompt).await {
                Ok(text) => return Ok(text),
                Err(AgentError::RateLimited(detail)) => {
                    if attempt + 1 >= self.policy.retries {
                        error!("Max retries ({}) exceeded for rate limit", self.policy.retries);
                        return Err(AgentError::RateLimited(detail));
                    }
                    let wait = self.policy.wait_for(attempt, &detail);
                    tokio::time::sleep(wait).await;
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    /// Scripted transport: fails with the given errors, then succeeds.
    struct ScriptedTransport {
        failures: Vec<&'static str>,
        calls: Arc<AtomicU32>,
    }

    impl ScriptedTransport {
        fn rate_limited(times: usize) -> Self {
            Self {
                failures: vec!["429 RESOURCE_EXHAUSTED"; times],
                calls: Arc::new(AtomicU32::new(0)),
            }
        }
    }

    #[async_trait::async_trait]
    impl ModelTransport for ScriptedTransport {
        async fn generate(&self, _model: &str, _prompt: &str) -> Result<String> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst) as usize;
            match self.failures.get(call) {
                Some(detail) => Err(AgentError::RateLimited(detail.to_string())),
                None => Ok("final answer".to_string()),
            }
        }
    }

    struct FailingTransport;

    #[async_trait::async_trait]
    impl ModelTransport for FailingTransport {
        async fn generate(&self, _model: &str, _prompt: &str) -> Result<String> {
            Err(AgentError::InvalidArgument("bad request".to_string()))
        }
    }

    #[test]
    fn test_parse_retry_hint_json_style() {
        let body = r#"{"error": {"details": [{"retryDelay": "40.35s"}]}}"#;
        assert_eq!(parse_retry_hint(body), Some(40.35));
    }

    #[test]
    fn test_parse_retry_hint_quoted_style() {
        let body = "429 RESOURCE_EXHAUSTED 'retryDelay': '12s'";
        assert_eq!(parse_retry_hint(body), Some(12.0));
    }

    #[test]
    fn test_parse_retry_hint_absent() {
        assert_eq!(parse_retry_hint("429 RESOURCE_EXHAUSTED"), None);
        assert_eq!(parse_retry_hint("retryDelay but no number"), None);
    }

    #[test]
    fn test_wait_bounded_backoff_path() {
        let policy = RetryPolicy::default();
        for attempt in 0..policy.retries {
            for _ in 0..50 {
                let wait = policy.wait_for(attempt, "429 RESOURCE_EXHAUSTED");
                assert!(wait <= policy.max_single_wait());
            }
        }
    }

    #[test]
    fn test_wait_bounded_hint_path() {
        let policy = RetryPolicy::default();
        for hint in ["1s", "40.35s", "3600s"] {
            let body = format!("\"retryDelay\": \"{}\"", hint);
            for _ in 0..50 {
                let wait = policy.wait_for(0, &body);
                assert!(wait <= policy.max_single_wait());
            }
        }
    }

    #[test]
    fn test_classify_provider_error() {
        assert!(matches!(
            classify_provider_error(429, "quota".into()),
            AgentError::RateLimited(_)
        ));
        assert!(matches!(
            classify_provider_error(503, "RESOURCE_EXHAUSTED".into()),
            AgentError::RateLimited(_)
        ));
        assert!(matches!(
            classify_provider_error(400, "INVALID_ARGUMENT".into()),
            AgentError::InvalidArgument(_)
        ));
        assert!(matches!(
            classify_provider_error(500, "boom".into()),
            AgentError::Llm(_)
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn test_gateway_recovers_within_retry_budget() {
        let transport = ScriptedTransport::rate_limited(2);
        let calls = transport.calls.clone();
        let gateway = ModelGateway::new(Box::new(transport), RetryPolicy::default());

        let started = Instant::now();
        let result = gateway.generate("gemini-2.0-flash", "hello").await.unwrap();
        assert_eq!(result, "final answer");
        assert_eq!(calls.load(Ordering::SeqCst), 3);

        // Two waits, each capped at max_wait + jitter ceiling.
        let elapsed = started.elapsed();
        let bound = gateway.policy.max_single_wait() * 2;
        assert!(elapsed <= bound, "waited {:?}, bound {:?}", elapsed, bound);
    }

    #[tokio::test(start_paused = true)]
    async fn test_gateway_exhausts_budget() {
        let transport = Box::new(ScriptedTransport::rate_limited(5));
        let gateway = ModelGateway::new(transport, RetryPolicy::default());

        let result = gateway.generate("gemini-2.0-flash", "hello").await;
        assert!(matches!(result, Err(AgentError::RateLimited(_))));
    }

    #[tokio::test(start_paused = true)]
    async fn test_gateway_does_not_retry_invalid_argument() {
        let gateway = ModelGateway::new(Box::new(FailingTransport), RetryPolicy::default());

        let result = gateway.generate("gemini-2.0-flash", "hello").await;
        assert!(matches!(result, Err(AgentError::InvalidArgument(_))));
    }

    #[tokio::test(start_paused = true)]
    async fn test_throttle_spaces_requests() {
        let interval = Duration::from_secs_f64(1.5);
        let watermark = new_throttle();
        let gateway = ModelGateway::with_throttle(
            Box::new(ScriptedTransport::rate_limited(0)),
            RetryPolicy::default(),
            interval,
            watermark,
        );

        let started = Instant::now();
        gateway.generate("m", "a").await.unwrap();
        gateway.generate("m", "b").await.unwrap();
        gateway.generate("m", "c").await.unwrap();

        // Three requests: at least two full intervals apart.
        assert!(started.elapsed() >= interval * 2);
    }
}
