//! Context retrievers for grounded answers: web search and a document datastore.

use async_trait::async_trait;
use qexpand_core::{ContextRetriever, Passage};
use reqwest::Client;
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::debug;

use crate::client::{build_client, post_json};
use crate::retry::{RetryPolicy, retry_with_backoff};

#[derive(Debug, Deserialize)]
struct SearchResult {
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    snippet: String,
    #[serde(default)]
    url: Option<String>,
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    results: Vec<SearchResult>,
}

#[derive(Debug, Deserialize)]
struct DatastoreResponse {
    #[serde(default)]
    passages: Vec<Passage>,
}

fn keep(passages: impl IntoIterator<Item = Passage>, limit: usize) -> Vec<Passage> {
    passages
        .into_iter()
        .filter(|p| !p.content.trim().is_empty())
        .take(limit)
        .collect()
}

/// Decode `{"results": [{"title", "snippet", "url"}]}`; results without a snippet are dropped.
pub fn parse_search_results(response: Value, limit: usize) -> anyhow::Result<Vec<Passage>> {
    let decoded: SearchResponse = serde_json::from_value(response)
        .map_err(|e| anyhow::anyhow!("Invalid search response: {e}"))?;
    let passages = decoded.results.into_iter().map(|r| Passage {
        title: r.title,
        content: r.snippet,
        uri: r.url,
    });
    Ok(keep(passages, limit))
}

/// Decode `{"passages": [{"title", "content", "uri"}]}`.
pub fn parse_datastore_passages(response: Value, limit: usize) -> anyhow::Result<Vec<Passage>> {
    let decoded: DatastoreResponse = serde_json::from_value(response)
        .map_err(|e| anyhow::anyhow!("Invalid datastore response: {e}"))?;
    Ok(keep(decoded.passages, limit))
}

pub struct HttpSearchClient {
    client: Client,
    endpoint: String,
    api_key: Option<String>,
    retry: RetryPolicy,
}

impl HttpSearchClient {
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

#[async_trait]
impl ContextRetriever for HttpSearchClient {
    async fn retrieve(&self, query: &str, limit: usize) -> anyhow::Result<Vec<Passage>> {
        let body = json!({ "query": query, "limit": limit });
        let response = retry_with_backoff(
            || post_json(&self.client, &self.endpoint, self.api_key.as_deref(), &body),
            &self.retry,
        )
        .await?;

        let passages = parse_search_results(response, limit)?;
        debug!("Search returned {} passages", passages.len());
        Ok(passages)
    }
}

pub struct HttpDatastoreClient {
    client: Client,
    endpoint: String,
    datastore_id: String,
    api_key: Option<String>,
    retry: RetryPolicy,
}

impl HttpDatastoreClient {
    pub fn new(
        endpoint: String,
        datastore_id: String,
        api_key: Option<String>,
        timeout_secs: u64,
    ) -> anyhow::Result<Self> {
        Ok(Self {
            client: build_client(timeout_secs)?,
            endpoint,
            datastore_id,
            api_key,
            retry: RetryPolicy::default(),
        })
    }

    #[must_use]
    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    #[must_use]
    pub fn datastore_id(&self) -> &str {
        &self.datastore_id
    }
}

#[async_trait]
impl ContextRetriever for HttpDatastoreClient {
    async fn retrieve(&self, query: &str, limit: usize) -> anyhow::Result<Vec<Passage>> {
        let body = json!({
            "datastore_id": self.datastore_id,
            "query": query,
            "limit": limit,
        });
        let response = retry_with_backoff(
            || post_json(&self.client, &self.endpoint, self.api_key.as_deref(), &body),
            &self.retry,
        )
        .await?;

        let passages = parse_datastore_passages(response, limit)?;
        debug!(
            "Datastore {} returned {} passages",
            self.datastore_id,
            passages.len()
        );
        Ok(passages)
    }
}
