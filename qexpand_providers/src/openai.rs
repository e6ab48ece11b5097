use async_trait::async_trait;
use qexpand_core::{ChatMessage, LLMProvider, LLMResponse, Usage};
use reqwest::{Client, StatusCode};
use serde_json::{Value, json};
use tracing::{debug, info};

use crate::client::{build_client, post_json};
use crate::retry::{RetryPolicy, retry_with_backoff};

/// Any endpoint speaking the `/chat/completions` protocol.
pub struct OpenAiCompatProvider {
    client: Client,
    api_key: String,
    base_url: String,
    model: String,
    retry: RetryPolicy,
}

impl OpenAiCompatProvider {
    pub fn new(
        api_key: String,
        base_url: &str,
        model: String,
        timeout_secs: u64,
    ) -> anyhow::Result<Self> {
        info!("Creating OpenAiCompatProvider for {}", base_url);
        Ok(Self {
            client: build_client(timeout_secs)?,
            api_key,
            base_url: base_url.trim_end_matches('/').to_string(),
            model,
            retry: RetryPolicy::default(),
        })
    }

    #[must_use]
    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    async fn try_send(&self, request: &Value) -> anyhow::Result<LLMResponse> {
        let response = post_json(
            &self.client,
            &format!("{}/chat/completions", self.base_url),
            Some(&self.api_key),
            request,
        )
        .await?;
        parse_completion(&response)
    }
}

/// Decode a `/chat/completions` reply.
pub fn parse_completion(response: &Value) -> anyhow::Result<LLMResponse> {
    let content = response["choices"][0]["message"]["content"]
        .as_str()
        .ok_or_else(|| anyhow::anyhow!("Invalid response format: missing content"))?
        .to_string();

    let count = |u: &serde_json::Map<String, Value>, key: &str| {
        u.get(key)
            .and_then(Value::as_u64)
            .and_then(|n| u32::try_from(n).ok())
            .unwrap_or(0)
    };
    let usage = response["usage"].as_object().map(|u| Usage {
        prompt_tokens: count(u, "prompt_tokens"),
        completion_tokens: count(u, "completion_tokens"),
        total_tokens: count(u, "total_tokens"),
    });

    Ok(LLMResponse { content, usage })
}

#[async_trait]
impl LLMProvider for OpenAiCompatProvider {
    async fn chat(&self, messages: &[ChatMessage], model: &str) -> anyhow::Result<LLMResponse> {
        let request = json!({
            "model": model,
            "messages": messages,
        });

        debug!("Sending completion request: model={}", model);
        let response = retry_with_backoff(|| self.try_send(&request), &self.retry).await?;

        if let Some(usage) = &response.usage {
            debug!(
                "Completion used {} prompt + {} completion tokens",
                usage.prompt_tokens, usage.completion_tokens
            );
        }
        Ok(response)
    }

    fn get_default_model(&self) -> &str {
        &self.model
    }

    /// Credentials are present and the endpoint answers without rejecting them.
    async fn health_check(&self) -> anyhow::Result<()> {
        if self.api_key.trim().is_empty() || self.api_key.starts_with("your-") {
            anyhow::bail!("no completion API key configured");
        }

        let response = self
            .client
            .get(format!("{}/models", self.base_url))
            .bearer_auth(&self.api_key)
            .send()
            .await?;

        match response.status() {
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                anyhow::bail!("completion endpoint rejected the API key")
            }
            status if status.is_server_error() => {
                anyhow::bail!("completion endpoint unavailable: {status}")
            }
            _ => Ok(()),
        }
    }
}
