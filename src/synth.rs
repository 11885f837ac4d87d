//! synth.rs — Insight synthesizer: provider abstraction + retry/timeout shell.
//!
//! The only component with an external, non-deterministic dependency. The
//! provider trait isolates the network call so the rest of the pipeline is
//! testable with a mock. One blocking network-bound call per invocation,
//! no shared state between concurrent calls, no cache.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use metrics::counter;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::config::model::ModelConfig;
use crate::insight::{output_schema, AiInsights, SynthesisError};

/// Low-level provider: does a *real* remote call. Separated so the same
/// retry/validation shell wraps production and tests.
#[async_trait]
pub trait ModelProvider: Send + Sync {
    /// One completion attempt. Returns the raw model text.
    async fn complete(&self, prompt: &str) -> Result<String, SynthesisError>;
    /// Provider name for diagnostics/headers.
    fn name(&self) -> &'static str;
}

/// Convenient alias used by callers.
pub type DynProvider = Arc<dyn ModelProvider>;

/// Factory: build a provider according to config and environment variables.
///
/// * If `AI_TEST_MODE=mock`, returns a deterministic mock provider.
/// * Else if `config.enabled==false`, returns a disabled provider.
/// * Else builds the real chat-completions provider (Groq or OpenAI).
pub fn build_provider(config: &ModelConfig) -> DynProvider {
    if std::env::var("AI_TEST_MODE")
        .map(|v| v == "mock")
        .unwrap_or(false)
    {
        return Arc::new(MockProvider::canned());
    }

    if !config.enabled {
        return Arc::new(DisabledProvider);
    }

    match config.provider.as_str() {
        "groq" | "openai" => Arc::new(ChatCompletionsProvider::new(config)),
        _ => Arc::new(DisabledProvider),
    }
}

const SYSTEM_PROMPT: &str = "You are an expert Web3 momentum analyst. Given the \
multi-channel data and recent anomalies, return ONLY a JSON object conforming to \
the schema below. Fields: summary (concise overview of current project momentum), \
outlook (bullish|bearish|neutral), keySignals (key metric changes, e.g. spike in \
commits, drop in liquidity), riskLevel (low|medium|high), confidence (float 0-1 \
for your analytical certainty), reason (multi-paragraph explanation combining \
GitHub, Twitter, Onchain, and Community data along with anomaly patterns), review \
(which data stream might be a weak point). No prose outside the JSON object.";

/// OpenAI-compatible chat-completions provider (Groq by default).
/// Requires an API key resolved by `ModelConfig`.
pub struct ChatCompletionsProvider {
    http: reqwest::Client,
    endpoint: String,
    api_key: String,
    model: String,
}

impl ChatCompletionsProvider {
    pub fn new(config: &ModelConfig) -> Self {
        let http = reqwest::Client::builder()
            .user_agent("momentum-tracker/0.1")
            .connect_timeout(Duration::from_secs(4))
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .expect("reqwest client");
        let endpoint = match config.provider.as_str() {
            "openai" => "https://api.openai.com/v1/chat/completions".to_string(),
            _ => "https://api.groq.com/openai/v1/chat/completions".to_string(),
        };
        Self {
            http,
            endpoint,
            api_key: config.api_key.clone(),
            model: config.model.clone(),
        }
    }
}

#[async_trait]
impl ModelProvider for ChatCompletionsProvider {
    async fn complete(&self, prompt: &str) -> Result<String, SynthesisError> {
        if self.api_key.is_empty() {
            return Err(SynthesisError::Disabled);
        }

        #[derive(Serialize)]
        struct Msg<'a> {
            role: &'a str,
            content: &'a str,
        }
        #[derive(Serialize)]
        struct Req<'a> {
            model: &'a str,
            messages: Vec<Msg<'a>>,
            temperature: f32,
            max_tokens: u32,
            response_format: serde_json::Value,
        }
        #[derive(Deserialize)]
        struct Resp {
            choices: Vec<Choice>,
        }
        #[derive(Deserialize)]
        struct Choice {
            message: ChoiceMsg,
        }
        #[derive(Deserialize)]
        struct ChoiceMsg {
            content: String,
        }

        // Declare the schema up front so the model is constrained to emit
        // only conforming structures; the payload is still re-validated on
        // return.
        let schema = output_schema();
        let system = format!("{SYSTEM_PROMPT}\n\nSchema:\n{schema}");
        let req = Req {
            model: &self.model,
            messages: vec![
                Msg {
                    role: "system",
                    content: &system,
                },
                Msg {
                    role: "user",
                    content: prompt,
                },
            ],
            temperature: 0.2,
            max_tokens: 1024,
            response_format: serde_json::json!({ "type": "json_object" }),
        };

        let resp = self
            .http
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&req)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    SynthesisError::Transport("request timed out".to_string())
                } else {
                    SynthesisError::Transport(e.to_string())
                }
            })?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(SynthesisError::Transport(format!(
                "{} {status}: {body}",
                self.name()
            )));
        }

        let body: Resp = resp
            .json()
            .await
            .map_err(|e| SynthesisError::Transport(format!("invalid response body: {e}")))?;
        body.choices
            .into_iter()
            .next()
            .map(|c| c.message.content)
            .ok_or_else(|| SynthesisError::Transport("empty completion response".to_string()))
    }

    fn name(&self) -> &'static str {
        "chat-completions"
    }
}

/// Fails with `Disabled` always; used when synthesis is off.
pub struct DisabledProvider;

#[async_trait]
impl ModelProvider for DisabledProvider {
    async fn complete(&self, _prompt: &str) -> Result<String, SynthesisError> {
        Err(SynthesisError::Disabled)
    }
    fn name(&self) -> &'static str {
        "disabled"
    }
}

/// Deterministic provider for tests/local runs.
#[derive(Clone)]
pub struct MockProvider {
    pub payload: String,
}

impl MockProvider {
    /// A conforming payload so end-to-end runs succeed without a key.
    pub fn canned() -> Self {
        Self {
            payload: serde_json::json!({
                "summary": "Momentum is steady across channels (mock).",
                "outlook": "neutral",
                "keySignals": ["mock signal"],
                "riskLevel": "low",
                "confidence": 0.5,
                "reason": "Deterministic mock response.",
                "review": "No live data stream was consulted."
            })
            .to_string(),
        }
    }
}

#[async_trait]
impl ModelProvider for MockProvider {
    async fn complete(&self, _prompt: &str) -> Result<String, SynthesisError> {
        Ok(self.payload.clone())
    }
    fn name(&self) -> &'static str {
        "mock"
    }
}

/// Retry/timeout shell around a provider. Each synthesize call is
/// independent: no cache, no dedup of identical contexts, no ordering
/// guarantee between concurrent calls.
pub struct Synthesizer {
    provider: DynProvider,
    timeout: Duration,
    max_attempts: u32,
    backoff_base: Duration,
}

impl Synthesizer {
    pub fn new(provider: DynProvider, config: &ModelConfig) -> Self {
        Self {
            provider,
            timeout: Duration::from_secs(config.timeout_secs),
            max_attempts: config.max_attempts.max(1),
            backoff_base: Duration::from_millis(250),
        }
    }

    pub fn provider_name(&self) -> &'static str {
        self.provider.name()
    }

    /// Send the formatted context and return a schema-validated insight.
    ///
    /// Transient failures (timeout/transport) retry with doubling backoff
    /// up to the attempt budget. A schema rejection is terminal: the input
    /// was accepted but the output was malformed, so retrying identical
    /// input is not attempted. Cancellation drops the in-flight attempt
    /// future, which aborts the request and releases the connection.
    pub async fn synthesize(&self, context: &str) -> Result<AiInsights, SynthesisError> {
        let mut attempt = 0u32;
        let mut delay = self.backoff_base;

        loop {
            attempt += 1;
            let outcome = match tokio::time::timeout(self.timeout, self.provider.complete(context))
                .await
            {
                Err(_) => Err(SynthesisError::Timeout(self.timeout.as_secs())),
                Ok(result) => result,
            };

            match outcome {
                // Schema errors from the gate below are terminal: no retry.
                Ok(text) => return AiInsights::from_text(&text),
                Err(e) if e.is_retryable() && attempt < self.max_attempts => {
                    counter!("synthesis_retries_total").increment(1);
                    warn!(
                        provider = self.provider.name(),
                        attempt, "synthesis attempt failed, retrying: {e}"
                    );
                    tokio::time::sleep(delay).await;
                    delay = delay.saturating_mul(2);
                }
                Err(e) => {
                    counter!("synthesis_failures_total").increment(1);
                    return Err(e);
                }
            }
        }
    }
}
