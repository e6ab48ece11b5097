//! Semantic element extraction.
//!
//! The NLP service is a black box returning typed spans; `ElementExtractor` turns those
//! spans into normalized, deduplicated `SemanticElement`s tagged with their query.

mod heuristic;

pub use heuristic::HeuristicExtractor;

use std::collections::BTreeSet;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::element::{ElementKind, SemanticElement};
use crate::error::{Error, Result};

/// A typed span as reported by the extraction service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractedSpan {
    pub text: String,
    pub kind: ElementKind,
    #[serde(default)]
    pub label: Option<String>,
}

impl ExtractedSpan {
    #[must_use]
    pub fn new(text: impl Into<String>, kind: ElementKind) -> Self {
        Self {
            text: text.into(),
            kind,
            label: None,
        }
    }

    #[must_use]
    pub fn labelled(text: impl Into<String>, kind: ElementKind, label: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            kind,
            label: Some(label.into()),
        }
    }
}

/// NLP extraction capability. Retries, if any, live behind this trait.
#[async_trait]
pub trait ExtractionService: Send + Sync {
    async fn analyze(&self, text: &str) -> anyhow::Result<Vec<ExtractedSpan>>;
}

pub struct ElementExtractor {
    service: Arc<dyn ExtractionService>,
}

impl ElementExtractor {
    #[must_use]
    pub fn new(service: Arc<dyn ExtractionService>) -> Self {
        Self { service }
    }

    /// Extract the element set of one query.
    ///
    /// Spans that normalize to empty text are dropped; repeated `(text, kind)` pairs keep
    /// the first occurrence and the first non-empty label seen.
    pub async fn extract(&self, query_id: &str, text: &str) -> Result<BTreeSet<SemanticElement>> {
        let spans = self.service.analyze(text).await.map_err(Error::Extraction)?;
        let span_count = spans.len();

        let mut elements = BTreeSet::new();
        for span in spans {
            let Some(element) = SemanticElement::new(&span.text, span.kind, query_id)
                .map(|e| e.with_label(span.label))
            else {
                continue;
            };
            match elements.get(&element) {
                None => {
                    elements.insert(element);
                }
                Some(existing) if existing.label.is_none() && element.label.is_some() => {
                    if let Some(mut first) = elements.take(&element) {
                        first.label = element.label;
                        elements.insert(first);
                    }
                }
                Some(_) => {}
            }
        }

        debug!(
            "Extracted {} elements from {} spans for query {}",
            elements.len(),
            span_count,
            query_id
        );
        Ok(elements)
    }
}
