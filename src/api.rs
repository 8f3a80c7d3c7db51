//! Generative text model access with exponential backoff retry logic.
//!
//! # Architecture
//!
//! - [`TextModel`]: core trait defining async prompt → text interaction
//! - [`OpenAiCompatModel`]: OpenAI-compatible chat completions over `reqwest`
//! - [`RetryAsk`]: decorator that adds retry logic to any `TextModel`
//!
//! The model is always optional. Every caller keeps a deterministic fallback
//! and treats any error from here as "use the fallback".
//!
//! # Retry Strategy
//!
//! - Configurable maximum retry attempts
//! - Exponential backoff starting at `base_delay`
//! - Maximum delay capped at 30 seconds
//! - Random jitter (0-250ms) added to prevent thundering herd

use async_trait::async_trait;
use rand::{Rng, rng};
use reqwest::Client;
use serde_json::json;
use std::fmt;
use std::time::{Duration as StdDuration, Instant};
use tokio::time::sleep;
use tracing::{error, instrument, warn};

use crate::config::ModelConfig;
use crate::error::{IngestError, Result};

/// Send a prompt to a text-generation model and get its reply.
#[async_trait]
pub trait TextModel: Send + Sync {
    async fn ask(&self, prompt: &str) -> Result<String>;
}

/// Wrapper that adds exponential backoff retry logic to any [`TextModel`].
///
/// ```text
/// delay = min(base_delay * 2^(attempt-1), max_delay) + random_jitter(0..250ms)
/// ```
pub struct RetryAsk<T> {
    inner: T,
    max_retries: usize,
    base_delay: StdDuration,
    max_delay: StdDuration,
}

impl<T> RetryAsk<T>
where
    T: TextModel,
{
    pub fn new(inner: T, max_retries: usize, base_delay: StdDuration) -> Self {
        Self {
            inner,
            max_retries,
            base_delay,
            max_delay: StdDuration::from_secs(30),
        }
    }
}

impl<T> fmt::Debug for RetryAsk<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RetryAsk")
            .field("max_retries", &self.max_retries)
            .field("base_delay", &self.base_delay)
            .field("max_delay", &self.max_delay)
            .finish()
    }
}

#[async_trait]
impl<T> TextModel for RetryAsk<T>
where
    T: TextModel,
{
    #[instrument(level = "info", skip_all)]
    async fn ask(&self, prompt: &str) -> Result<String> {
        let total_t0 = Instant::now();
        let mut attempt = 0usize;

        loop {
            let attempt_t0 = Instant::now();
            match self.inner.ask(prompt).await {
                Ok(resp) => return Ok(resp),
                Err(e) => {
                    attempt += 1;
                    let attempt_dt = attempt_t0.elapsed();
                    let total_dt = total_t0.elapsed();

                    if attempt > self.max_retries {
                        error!(
                            attempt,
                            max = self.max_retries,
                            elapsed_ms_attempt = attempt_dt.as_millis() as u64,
                            elapsed_ms_total = total_dt.as_millis() as u64,
                            error = %e,
                            "ask() exhausted retries"
                        );
                        return Err(e);
                    }

                    let mut delay = self.base_delay.saturating_mul(1 << (attempt - 1).min(16));
                    if delay > self.max_delay {
                        delay = self.max_delay;
                    }
                    let jitter_ms: u64 = rng().random_range(0..=250);
                    let delay = delay + StdDuration::from_millis(jitter_ms);

                    warn!(
                        attempt,
                        max = self.max_retries,
                        elapsed_ms_attempt = attempt_dt.as_millis() as u64,
                        elapsed_ms_total = total_dt.as_millis() as u64,
                        ?delay,
                        error = %e,
                        "ask() attempt failed; backing off"
                    );
                    sleep(delay).await;
                }
            }
        }
    }
}

/// OpenAI-compatible chat completions client.
pub struct OpenAiCompatModel {
    client: Client,
    endpoint: String,
    model: String,
    api_key: Option<String>,
}

impl OpenAiCompatModel {
    pub fn new(config: &ModelConfig, api_key: Option<String>) -> Result<Self> {
        let client = Client::builder()
            .timeout(StdDuration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| IngestError::Config(format!("failed to build model client: {e}")))?;
        Ok(Self {
            client,
            endpoint: chat_endpoint(&config.base_url),
            model: config.model.clone(),
            api_key: api_key.filter(|k| !k.is_empty()),
        })
    }
}

/// Resolve the chat completions endpoint from a base URL.
fn chat_endpoint(base_url: &str) -> String {
    let base = base_url.trim_end_matches('/');
    if base.ends_with("/chat/completions") {
        base.to_string()
    } else if base.ends_with("/v1") {
        format!("{base}/chat/completions")
    } else {
        format!("{base}/v1/chat/completions")
    }
}

#[async_trait]
impl TextModel for OpenAiCompatModel {
    #[instrument(level = "info", skip_all, fields(model = %self.model))]
    async fn ask(&self, prompt: &str) -> Result<String> {
        let t0 = Instant::now();
        let body = json!({
            "model": self.model,
            "messages": [{ "role": "user", "content": prompt }],
            "temperature": 0.2,
            "max_tokens": 1200,
        });

        let mut req = self.client.post(&self.endpoint).json(&body);
        if let Some(key) = &self.api_key {
            req = req.bearer_auth(key);
        }

        let resp = req
            .send()
            .await
            .map_err(|e| IngestError::Model(format!("request failed: {e}")))?;
        let status = resp.status();
        if !status.is_success() {
            warn!(elapsed_ms = t0.elapsed().as_millis() as u64, %status, "API call failed");
            return Err(IngestError::Model(format!("model returned {status}")));
        }
        let value: serde_json::Value = resp
            .json()
            .await
            .map_err(|e| IngestError::Model(format!("invalid response body: {e}")))?;

        value["choices"]
            .get(0)
            .and_then(|c| c["message"]["content"].as_str())
            .map(str::to_string)
            .ok_or_else(|| IngestError::Model("response had no message content".into()))
    }
}

/// Build the configured model wrapped in [`RetryAsk`].
pub fn build_model(config: &ModelConfig, api_key: Option<String>) -> Result<RetryAsk<OpenAiCompatModel>> {
    let model = OpenAiCompatModel::new(config, api_key)?;
    Ok(RetryAsk::new(
        model,
        config.max_retries,
        StdDuration::from_millis(config.base_delay_ms),
    ))
}

/// Pull the first JSON object out of a model reply, tolerating code fences
/// and surrounding prose.
pub fn extract_json_object(reply: &str) -> Option<&str> {
    let start = reply.find('{')?;
    let end = reply.rfind('}')?;
    (end > start).then(|| &reply[start..=end])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::MockModel;

    #[test]
    fn test_chat_endpoint_variants() {
        assert_eq!(
            chat_endpoint("http://localhost:1234/v1"),
            "http://localhost:1234/v1/chat/completions"
        );
        assert_eq!(
            chat_endpoint("https://api.example.com/"),
            "https://api.example.com/v1/chat/completions"
        );
        assert_eq!(
            chat_endpoint("https://api.example.com/v1/chat/completions"),
            "https://api.example.com/v1/chat/completions"
        );
    }

    #[test]
    fn test_extract_json_object() {
        let reply = "Sure!\n```json\n{\"category\": \"sports\"}\n```";
        assert_eq!(extract_json_object(reply), Some("{\"category\": \"sports\"}"));
        assert_eq!(extract_json_object("no json here"), None);
    }

    #[tokio::test]
    async fn test_retry_ask_recovers_after_failures() {
        let model = MockModel::failing_then(2, "ok");
        let retry = RetryAsk::new(model, 3, StdDuration::from_millis(1));
        assert_eq!(retry.ask("prompt").await.unwrap(), "ok");
    }

    #[tokio::test]
    async fn test_retry_ask_gives_up() {
        let model = MockModel::failing_then(5, "never");
        let retry = RetryAsk::new(model, 1, StdDuration::from_millis(1));
        assert!(retry.ask("prompt").await.is_err());
    }
}
