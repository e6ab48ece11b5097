use async_trait::async_trait;
use qexpand_core::{ExtractedSpan, ExtractionService};
use reqwest::Client;
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::debug;

use crate::client::{build_client, post_json};
use crate::retry::{RetryPolicy, retry_with_backoff};

#[derive(Debug, Deserialize)]
struct SpansResponse {
    spans: Vec<ExtractedSpan>,
}

/// Remote NLP service: `{"text"}` in, `{"spans": [{"text", "kind", "label"}]}` out.
pub struct HttpExtractionClient {
    client: Client,
    endpoint: String,
    api_key: Option<String>,
    retry: RetryPolicy,
}

impl HttpExtractionClient {
    pub fn new(endpoint: String, api_key: Option<String>, timeout_secs: u64) -> anyhow::Result<Self> {
        Ok(Self {
            client: build_client(timeout_secs)?,
            endpoint,
            api_key,
            retry: RetryPolicy::default(),
        })
    }

    #[must_use]
    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }
}

/// Decode an extraction reply. Spans of an unknown kind make the whole reply invalid.
pub fn parse_spans(response: Value) -> anyhow::Result<Vec<ExtractedSpan>> {
    let decoded: SpansResponse = serde_json::from_value(response)
        .map_err(|e| anyhow::anyhow!("Invalid extraction response: {e}"))?;
    Ok(decoded.spans)
}

#[async_trait]
impl ExtractionService for HttpExtractionClient {
    async fn analyze(&self, text: &str) -> anyhow::Result<Vec<ExtractedSpan>> {
        let body = json!({ "text": text });
        let response = retry_with_backoff(
            || post_json(&self.client, &self.endpoint, self.api_key.as_deref(), &body),
            &self.retry,
        )
        .await?;

        let spans = parse_spans(response)?;
        debug!("Extraction service returned {} spans", spans.len());
        Ok(spans)
    }
}
