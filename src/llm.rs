//! LLM API interaction with exponential backoff retry logic.
//!
//! Every translation, summary and chat answer goes through one interface,
//! [`Generate`]. Callers treat it as a black box that may fail and decide
//! for themselves what a failure means (see `collectors::Enricher`).
//!
//! # Architecture
//!
//! - [`Generate`]: core trait, `generate(request) -> text`
//! - [`ChatClient`]: OpenAI-compatible `chat/completions` client (xAI Grok by default)
//! - [`RetryGenerate`]: decorator that adds retry logic to any `Generate` implementation
//!
//! # Retry Strategy
//!
//! ```text
//! delay = min(base_delay * 2^(attempt-1), max_delay) + random_jitter(0..250ms)
//! ```

use crate::config::LlmConfig;
use crate::error::LlmError;
use crate::utils::truncate_for_log;
use rand::{Rng, rng};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::{Duration as StdDuration, Instant};
use tokio::time::sleep;
use tracing::{debug, error, instrument, warn};

/// A single chat turn.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

impl ChatMessage {
    pub fn new(role: &str, content: impl Into<String>) -> Self {
        Self {
            role: role.to_string(),
            content: content.into(),
        }
    }
}

/// Input to [`Generate::generate`].
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationRequest {
    pub prompt: String,
    pub system_instruction: Option<String>,
    /// Earlier turns, sent between the system instruction and the prompt.
    pub history: Vec<ChatMessage>,
    pub temperature: f64,
    pub max_tokens: u32,
}

impl GenerationRequest {
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            system_instruction: None,
            history: Vec::new(),
            temperature: 0.7,
            max_tokens: 1000,
        }
    }

    pub fn system(mut self, instruction: impl Into<String>) -> Self {
        self.system_instruction = Some(instruction.into());
        self
    }

    pub fn history(mut self, history: Vec<ChatMessage>) -> Self {
        self.history = history;
        self
    }

    pub fn temperature(mut self, temperature: f64) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    /// Messages in wire order: system, history, then the prompt.
    pub fn messages(&self) -> Vec<ChatMessage> {
        let mut messages = Vec::with_capacity(self.history.len() + 2);
        if let Some(system) = &self.system_instruction {
            messages.push(ChatMessage::new("system", system.clone()));
        }
        messages.extend(self.history.iter().cloned());
        if !self.prompt.is_empty() {
            messages.push(ChatMessage::new("user", self.prompt.clone()));
        }
        messages
    }
}

/// Text generation backend.
pub trait Generate {
    async fn generate(&self, request: &GenerationRequest) -> Result<String, LlmError>;
}

/// Wrapper that adds exponential backoff retry logic to any [`Generate`] implementation.
pub struct RetryGenerate<T> {
    inner: T,
    /// Maximum number of retry attempts before giving up.
    max_retries: usize,
    /// Initial delay between retries (doubles with each attempt).
    base_delay: StdDuration,
    /// Maximum delay cap to prevent excessive waiting.
    max_delay: StdDuration,
}

impl<T> RetryGenerate<T>
where
    T: Generate,
{
    pub fn new(inner: T, max_retries: usize, base_delay: StdDuration) -> Self {
        Self {
            inner,
            max_retries,
            base_delay,
            max_delay: StdDuration::from_secs(30),
        }
    }

    pub fn max_delay(mut self, max_delay: StdDuration) -> Self {
        self.max_delay = max_delay;
        self
    }
}

impl<T> fmt::Debug for RetryGenerate<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RetryGenerate")
            .field("max_retries", &self.max_retries)
            .field("base_delay", &self.base_delay)
            .field("max_delay", &self.max_delay)
            .finish()
    }
}

impl<T> Generate for RetryGenerate<T>
where
    T: Generate,
{
    #[instrument(level = "debug", skip_all)]
    async fn generate(&self, request: &GenerationRequest) -> Result<String, LlmError> {
        let total_t0 = Instant::now();
        let mut attempt = 0usize;

        loop {
            let attempt_t0 = Instant::now();
            let err = match self.inner.generate(request).await {
                Ok(text) => return Ok(text),
                Err(e) => e,
            };
            attempt += 1;
            let attempt_dt = attempt_t0.elapsed();
            let total_dt = total_t0.elapsed();

            if attempt > self.max_retries || matches!(err, LlmError::MissingApiKey) {
                error!(
                    attempt,
                    max = self.max_retries,
                    elapsed_ms_attempt = attempt_dt.as_millis(),
                    elapsed_ms_total = total_dt.as_millis(),
                    error = %err,
                    "generate() exhausted retries"
                );
                return Err(err);
            }

            // backoff calc
            let mut delay = self.base_delay.saturating_mul(1 << (attempt - 1).min(16));
            if delay > self.max_delay {
                delay = self.max_delay;
            }
            let jitter_ms: u64 = rng().random_range(0..=250);
            let delay = delay + StdDuration::from_millis(jitter_ms);

            warn!(
                attempt,
                max = self.max_retries,
                elapsed_ms_attempt = attempt_dt.as_millis(),
                elapsed_ms_total = total_dt.as_millis(),
                ?delay,
                error = %err,
                "generate() attempt failed; backing off"
            );
            sleep(delay).await;
        }
    }
}

/// Client for an OpenAI-compatible `chat/completions` endpoint.
pub struct ChatClient {
    http: reqwest::Client,
    api_base: String,
    api_key: String,
    model: String,
}

impl fmt::Debug for ChatClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChatClient")
            .field("api_base", &self.api_base)
            .field("model", &self.model)
            .finish_non_exhaustive()
    }
}

#[derive(Serialize)]
struct CompletionRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage>,
    temperature: f64,
    max_tokens: u32,
}

#[derive(Deserialize)]
struct CompletionResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Deserialize)]
struct ChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

impl ChatClient {
    /// Build a client; fails with [`LlmError::MissingApiKey`] when no key is set.
    pub fn new(config: &LlmConfig, api_key: Option<&str>) -> Result<Self, LlmError> {
        let api_key = api_key
            .map(str::trim)
            .filter(|key| !key.is_empty())
            .ok_or(LlmError::MissingApiKey)?;
        let http = reqwest::Client::builder()
            .timeout(StdDuration::from_secs(config.timeout_secs))
            .build()?;
        Ok(Self {
            http,
            api_base: config.api_base.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
            model: config.model.clone(),
        })
    }
}

impl Generate for ChatClient {
    #[instrument(level = "debug", skip_all, fields(model = %self.model))]
    async fn generate(&self, request: &GenerationRequest) -> Result<String, LlmError> {
        let t0 = Instant::now();
        let body = CompletionRequest {
            model: &self.model,
            messages: request.messages(),
            temperature: request.temperature,
            max_tokens: request.max_tokens,
        };

        let response = self
            .http
            .post(format!("{}/chat/completions", self.api_base))
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!(status = status.as_u16(), body = %truncate_for_log(&body, 300), "API call failed");
            return Err(LlmError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let parsed: CompletionResponse = response.json().await?;
        let text = parsed
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or(LlmError::EmptyResponse)?;
        debug!(elapsed_ms = t0.elapsed().as_millis(), chars = text.len(), "API call succeeded");
        Ok(text)
    }
}

/// The production client: [`ChatClient`] behind [`RetryGenerate`].
pub type LlmClient = RetryGenerate<ChatClient>;

/// Build the retrying production client from configuration.
pub fn build_client(config: &LlmConfig, api_key: Option<&str>) -> Result<LlmClient, LlmError> {
    let client = ChatClient::new(config, api_key)?;
    Ok(
        RetryGenerate::new(client, config.max_retries, StdDuration::from_millis(config.base_delay_ms))
            .max_delay(StdDuration::from_millis(config.max_delay_ms)),
    )
}
