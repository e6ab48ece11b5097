//! Answer routing across direct completion, web search grounding and datastore retrieval.
//!
//! Every route ends in exactly one completion call. Grounded routes fall back to direct
//! completion (one level, never to the other grounded route) when they have no context.

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::LLMProvider;
use crate::error::{Error, Result};

#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum AnswerSource {
    /// Direct completion with no retrieved context
    #[default]
    Llm,
    /// Grounded in passages from the configured document index
    Datastore,
    /// Grounded in web search snippets
    Search,
}

impl AnswerSource {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Llm => "llm",
            Self::Datastore => "datastore",
            Self::Search => "search",
        }
    }
}

impl std::fmt::Display for AnswerSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for AnswerSource {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "llm" => Ok(Self::Llm),
            "datastore" => Ok(Self::Datastore),
            "search" | "google" => Ok(Self::Search),
            _ => Err(anyhow::anyhow!("unknown answer source: {s}")),
        }
    }
}

/// A unit of retrieved context.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Passage {
    #[serde(default)]
    pub title: Option<String>,
    pub content: String,
    #[serde(default)]
    pub uri: Option<String>,
}

impl Passage {
    #[must_use]
    pub fn new(content: impl Into<String>) -> Self {
        Self {
            title: None,
            content: content.into(),
            uri: None,
        }
    }
}

/// Search or datastore backend returning context passages for a query.
#[async_trait]
pub trait ContextRetriever: Send + Sync {
    async fn retrieve(&self, query: &str, limit: usize) -> anyhow::Result<Vec<Passage>>;
}

/// An answer and the route that actually produced it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Answer {
    pub text: String,
    pub source: AnswerSource,
}

pub struct AnswerRouter {
    provider: Arc<dyn LLMProvider>,
    search: Option<Arc<dyn ContextRetriever>>,
    datastore: Option<Arc<dyn ContextRetriever>>,
    context_passages: usize,
    context_target_length: usize,
}

impl AnswerRouter {
    #[must_use]
    pub fn new(provider: Arc<dyn LLMProvider>) -> Self {
        Self {
            provider,
            search: None,
            datastore: None,
            context_passages: 5,
            context_target_length: 4000,
        }
    }

    #[must_use]
    pub fn with_search(mut self, search: Option<Arc<dyn ContextRetriever>>) -> Self {
        self.search = search;
        self
    }

    #[must_use]
    pub fn with_datastore(mut self, datastore: Option<Arc<dyn ContextRetriever>>) -> Self {
        self.datastore = datastore;
        self
    }

    /// Number of passages requested from a retriever.
    #[must_use]
    pub const fn with_context_passages(mut self, context_passages: usize) -> Self {
        self.context_passages = context_passages;
        self
    }

    /// Character budget for the context block.
    #[must_use]
    pub const fn with_context_target_length(mut self, context_target_length: usize) -> Self {
        self.context_target_length = context_target_length;
        self
    }

    fn retriever_for(&self, source: AnswerSource) -> Option<&Arc<dyn ContextRetriever>> {
        match source {
            AnswerSource::Llm => None,
            AnswerSource::Datastore => self.datastore.as_ref(),
            AnswerSource::Search => self.search.as_ref(),
        }
    }

    pub async fn answer(
        &self,
        question: &str,
        source: AnswerSource,
        domain: Option<&str>,
    ) -> Result<Answer> {
        if source != AnswerSource::Llm {
            if let Some(context) = self.grounding_context(question, source).await {
                let prompt = grounded_prompt(question, &context, domain);
                let text = self.complete(&prompt).await?;
                return Ok(Answer { text, source });
            }
        }

        let text = self.complete(question).await?;
        Ok(Answer {
            text,
            source: AnswerSource::Llm,
        })
    }

    /// Context block for a grounded route, or `None` when the route has to fall back.
    async fn grounding_context(&self, question: &str, source: AnswerSource) -> Option<String> {
        let Some(retriever) = self.retriever_for(source) else {
            debug!("No {} backend configured, answering directly", source);
            return None;
        };

        match retriever.retrieve(question, self.context_passages).await {
            Ok(passages) if passages.is_empty() => {
                info!("No {} context for question, falling back to llm", source);
                None
            }
            Ok(passages) => {
                let context = self.build_context(&passages);
                (!context.is_empty()).then_some(context)
            }
            Err(e) => {
                warn!("{} retrieval failed: {e}, falling back to llm", source);
                None
            }
        }
    }

    fn build_context(&self, passages: &[Passage]) -> String {
        let mut parts = Vec::new();
        let mut total_length = 0_usize;

        for (i, passage) in passages.iter().enumerate() {
            let content = passage.content.trim();
            if content.is_empty() {
                continue;
            }
            let text = match &passage.title {
                Some(title) => format!("[{}] {title}\n{content}", i + 1),
                None => format!("[{}] {content}", i + 1),
            };
            if !parts.is_empty() && total_length + text.len() > self.context_target_length {
                break;
            }
            total_length += text.len();
            parts.push(text);
        }

        debug!(
            "Built context with {} chars from {} passages",
            total_length,
            parts.len()
        );
        parts.join("\n\n")
    }

    async fn complete(&self, prompt: &str) -> Result<String> {
        let text = self
            .provider
            .complete(prompt)
            .await
            .map_err(Error::AnswerGeneration)?;
        let text = text.trim();
        if text.is_empty() {
            return Err(Error::AnswerGeneration(anyhow::anyhow!(
                "completion service returned an empty answer"
            )));
        }
        Ok(text.to_string())
    }
}

fn grounded_prompt(question: &str, context: &str, domain: Option<&str>) -> String {
    let scope = domain.map_or_else(String::new, |d| format!(" in the {d} domain"));
    format!(
        "Answer the question{scope} using the context below. If the context is incomplete, \
         say what is missing rather than guessing.\n\n# Context\n\n{context}\n\n# Question\n\n{question}"
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{ChatMessage, LLMResponse};
    use std::sync::Mutex;

    struct RecordingProvider {
        reply: Option<String>,
        prompts: Mutex<Vec<String>>,
    }

    impl RecordingProvider {
        fn replying(reply: &str) -> Arc<Self> {
            Arc::new(Self {
                reply: Some(reply.to_string()),
                prompts: Mutex::new(Vec::new()),
            })
        }

        fn failing() -> Arc<Self> {
            Arc::new(Self {
                reply: None,
                prompts: Mutex::new(Vec::new()),
            })
        }

        fn prompts(&self) -> Vec<String> {
            self.prompts.lock().map(|p| p.clone()).unwrap_or_default()
        }
    }

    #[async_trait]
    impl LLMProvider for RecordingProvider {
        async fn chat(&self, messages: &[ChatMessage], _model: &str) -> anyhow::Result<LLMResponse> {
            if let Ok(mut prompts) = self.prompts.lock() {
                prompts.extend(messages.iter().map(|m| m.content.clone()));
            }
            let content = self
                .reply
                .clone()
                .ok_or_else(|| anyhow::anyhow!("service unavailable"))?;
            Ok(LLMResponse {
                content,
                usage: None,
            })
        }

        fn get_default_model(&self) -> &str {
            "mock"
        }
    }

    struct FixedRetriever(Vec<Passage>);

    #[async_trait]
    impl ContextRetriever for FixedRetriever {
        async fn retrieve(&self, _query: &str, limit: usize) -> anyhow::Result<Vec<Passage>> {
            Ok(self.0.iter().take(limit).cloned().collect())
        }
    }

    struct BrokenRetriever;

    #[async_trait]
    impl ContextRetriever for BrokenRetriever {
        async fn retrieve(&self, _query: &str, _limit: usize) -> anyhow::Result<Vec<Passage>> {
            anyhow::bail!("index offline")
        }
    }

    fn retriever(passages: Vec<Passage>) -> Option<Arc<dyn ContextRetriever>> {
        Some(Arc::new(FixedRetriever(passages)))
    }

    #[tokio::test]
    #[expect(clippy::expect_used, reason = "Test failure should panic with context")]
    async fn test_llm_route_sends_bare_question() {
        let provider = RecordingProvider::replying("  Attention layers.  ");
        let router = AnswerRouter::new(provider.clone());

        let answer = router
            .answer("How does a transformer work?", AnswerSource::Llm, None)
            .await
            .expect("answer should succeed");

        assert_eq!(answer.text, "Attention layers.");
        assert_eq!(answer.source, AnswerSource::Llm);
        assert_eq!(provider.prompts(), vec!["How does a transformer work?"]);
    }

    #[tokio::test]
    #[expect(clippy::expect_used, reason = "Test failure should panic with context")]
    async fn test_datastore_without_passages_records_llm() {
        let provider = RecordingProvider::replying("direct");
        let router = AnswerRouter::new(provider.clone()).with_datastore(retriever(Vec::new()));

        let answer = router
            .answer("What is agile?", AnswerSource::Datastore, Some("business"))
            .await
            .expect("fallback should succeed");

        assert_eq!(answer.source, AnswerSource::Llm);
        assert_eq!(provider.prompts(), vec!["What is agile?"]);
    }

    #[tokio::test]
    #[expect(clippy::expect_used, reason = "Test failure should panic with context")]
    async fn test_search_route_grounds_prompt() {
        let provider = RecordingProvider::replying("grounded");
        let router = AnswerRouter::new(provider.clone())
            .with_search(retriever(vec![
                Passage {
                    title: Some("Pike Place".to_string()),
                    content: "A public market overlooking Elliott Bay.".to_string(),
                    uri: None,
                },
                Passage::new("   "),
            ]))
            .with_datastore(retriever(vec![Passage::new("unused datastore passage")]));

        let answer = router
            .answer(
                "What are attractions in Seattle?",
                AnswerSource::Search,
                Some("travel"),
            )
            .await
            .expect("grounded answer should succeed");

        assert_eq!(answer.source, AnswerSource::Search);
        let prompts = provider.prompts();
        assert_eq!(prompts.len(), 1);
        assert!(prompts[0].contains("[1] Pike Place\nA public market"));
        assert!(prompts[0].contains("in the travel domain"));
        assert!(!prompts[0].contains("unused datastore passage"));
    }

    #[tokio::test]
    #[expect(clippy::expect_used, reason = "Test failure should panic with context")]
    async fn test_missing_backend_and_retrieval_error_fall_back() {
        let provider = RecordingProvider::replying("direct");
        let router = AnswerRouter::new(provider.clone()).with_datastore(Some(Arc::new(BrokenRetriever)));

        let unconfigured = router
            .answer("q?", AnswerSource::Search, None)
            .await
            .expect("fallback should succeed");
        let broken = router
            .answer("q?", AnswerSource::Datastore, None)
            .await
            .expect("fallback should succeed");

        assert_eq!(unconfigured.source, AnswerSource::Llm);
        assert_eq!(broken.source, AnswerSource::Llm);
    }

    #[tokio::test]
    async fn test_final_completion_failure_is_answer_error() {
        let router = AnswerRouter::new(RecordingProvider::failing());
        let result = router.answer("q?", AnswerSource::Llm, None).await;
        assert!(matches!(result, Err(Error::AnswerGeneration(_))));

        let empty = AnswerRouter::new(RecordingProvider::replying("   "));
        let result = empty.answer("q?", AnswerSource::Llm, None).await;
        assert!(matches!(result, Err(Error::AnswerGeneration(_))));
    }

    #[test]
    fn test_context_respects_budget() {
        let router = AnswerRouter::new(RecordingProvider::replying("x")).with_context_target_length(30);
        let context = router.build_context(&[
            Passage::new("first passage text"),
            Passage::new("second passage that will not fit"),
        ]);
        assert_eq!(context, "[1] first passage text");
    }

    #[test]
    fn test_source_parsing_accepts_google_alias() {
        assert_eq!("google".parse::<AnswerSource>().ok(), Some(AnswerSource::Search));
        assert_eq!("LLM".parse::<AnswerSource>().ok(), Some(AnswerSource::Llm));
        assert!("all".parse::<AnswerSource>().is_err());
    }
}
