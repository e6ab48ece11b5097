#![deny(
    clippy::all,
    clippy::nursery,
    clippy::pedantic,
    clippy::style,
    clippy::complexity,
    clippy::perf,
    clippy::correctness,
    clippy::suspicious,
    clippy::unwrap_used,
    clippy::expect_used
)]
#![allow(
    clippy::similar_names,
    clippy::missing_safety_doc,
    clippy::missing_panics_doc,
    clippy::missing_errors_doc,
    clippy::cast_precision_loss
)]

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

pub mod answer;
pub mod dataset;
pub mod documents;
pub mod element;
mod error;
pub mod extraction;
pub mod generation;
pub mod graph;
pub mod orchestrator;
mod util;

pub use answer::{Answer, AnswerRouter, AnswerSource, ContextRetriever, Passage};
pub use dataset::{QAPair, SeedQuery};
pub use documents::{Document, DocumentChunk, DocumentQaGenerator, DocumentQaPair};
pub use element::{ElementKind, SemanticElement};
pub use error::{Error, Result};
pub use extraction::{ElementExtractor, ExtractedSpan, ExtractionService, HeuristicExtractor};
pub use generation::{GeneratedBatch, GeneratedQuestion, QuestionGenerator, SeenQuestions};
pub use graph::{ConceptEdge, ConceptGraph, ConceptNode, GraphExport, NodeId};
pub use orchestrator::{
    CancellationFlag, ExpansionConfig, ExpansionOrchestrator, ExpansionReport, RunSummary,
    ServiceHandles, SessionState, SkipCounts, TerminationReason, expand_domains,
};
pub use util::{content_hash, normalize_question, normalize_text};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
    System,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    #[must_use]
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct LLMResponse {
    pub content: String,
    pub usage: Option<Usage>,
}

#[derive(Debug, Clone)]
pub struct Usage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub total_tokens: u32,
}

/// Completion service capability shared by question generation and answering.
#[async_trait]
pub trait LLMProvider: Send + Sync {
    async fn chat(&self, messages: &[ChatMessage], model: &str) -> anyhow::Result<LLMResponse>;

    fn get_default_model(&self) -> &str;

    /// Single-prompt completion against the default model.
    async fn complete(&self, prompt: &str) -> anyhow::Result<String> {
        let messages = [ChatMessage::user(prompt)];
        let response = self.chat(&messages, self.get_default_model()).await?;
        Ok(response.content)
    }

    /// Cheap reachability probe run once before a session starts.
    async fn health_check(&self) -> anyhow::Result<()> {
        Ok(())
    }
}
