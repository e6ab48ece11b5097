//! Golden QA pairs generated straight from document text.
//!
//! Documents are split into overlapping character windows and each window is sent to the
//! completion service with a request for a JSON array of question/answer objects.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::LLMProvider;
use crate::error::{Error, Result};
use crate::generation::SeenQuestions;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    pub id: String,
    /// Where the text came from, usually a file path.
    pub source: String,
    pub content: String,
}

impl Document {
    #[must_use]
    pub fn new(id: impl Into<String>, source: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            source: source.into(),
            content: content.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentChunk {
    pub doc_id: String,
    pub source: String,
    /// Character offsets into the document, end exclusive.
    pub start: usize,
    pub end: usize,
    pub text: String,
}

/// One row of the document dataset. Field order is the CSV column order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentQaPair {
    pub question: String,
    pub answer: String,
    pub source: String,
    pub doc_id: String,
}

#[derive(Debug, Deserialize)]
struct RawPair {
    #[serde(default)]
    question: String,
    #[serde(default)]
    answer: String,
}

pub struct DocumentQaGenerator {
    provider: Arc<dyn LLMProvider>,
    chunk_size: usize,
    overlap: usize,
    min_chunk_chars: usize,
}

impl DocumentQaGenerator {
    #[must_use]
    pub fn new(provider: Arc<dyn LLMProvider>) -> Self {
        Self {
            provider,
            chunk_size: 3000,
            overlap: 1000,
            min_chunk_chars: 200,
        }
    }

    /// Window size and overlap in characters. An overlap at or above the size is clamped.
    #[must_use]
    pub const fn with_chunking(mut self, chunk_size: usize, overlap: usize) -> Self {
        self.chunk_size = chunk_size;
        self.overlap = overlap;
        self
    }

    #[must_use]
    pub const fn with_min_chunk_chars(mut self, min_chunk_chars: usize) -> Self {
        self.min_chunk_chars = min_chunk_chars;
        self
    }

    /// Windows start every `chunk_size - overlap` characters; windows shorter than the
    /// minimum are skipped.
    #[must_use]
    pub fn chunk_document(&self, document: &Document) -> Vec<DocumentChunk> {
        let chars: Vec<char> = document.content.chars().collect();
        let size = self.chunk_size.max(1);
        let stride = size.saturating_sub(self.overlap).max(1);

        (0..chars.len())
            .step_by(stride)
            .filter_map(|start| {
                let end = (start + size).min(chars.len());
                if end - start < self.min_chunk_chars {
                    return None;
                }
                Some(DocumentChunk {
                    doc_id: document.id.clone(),
                    source: document.source.clone(),
                    start,
                    end,
                    text: chars[start..end].iter().collect(),
                })
            })
            .collect()
    }

    pub async fn generate_pairs(
        &self,
        chunk: &DocumentChunk,
        count: usize,
    ) -> Result<Vec<DocumentQaPair>> {
        let prompt = format!(
            "Based on the following text, generate {count} diverse and natural question-answer pairs.\n\n\
             TEXT:\n{}\n\n\
             Every answer must be fully supported by the text. Vary the difficulty and cover \
             different aspects of the content. Keep answers accurate and concise.\n\n\
             Format your response as a JSON array of objects with \"question\" and \"answer\" fields.",
            chunk.text
        );

        let response = self
            .provider
            .complete(&prompt)
            .await
            .map_err(Error::DocumentQa)?;

        let pairs = parse_qa_pairs(&response)
            .map_err(Error::DocumentQa)?
            .into_iter()
            .map(|(question, answer)| DocumentQaPair {
                question,
                answer,
                source: chunk.source.clone(),
                doc_id: chunk.doc_id.clone(),
            })
            .collect();
        Ok(pairs)
    }

    /// Chunk every document and spread `total_questions` evenly over the chunks
    /// (at least one per chunk). Failed chunks are skipped; repeated questions keep the
    /// first pair.
    pub async fn generate_dataset(
        &self,
        documents: &[Document],
        total_questions: usize,
    ) -> Vec<DocumentQaPair> {
        let chunks: Vec<DocumentChunk> = documents
            .iter()
            .flat_map(|doc| self.chunk_document(doc))
            .collect();

        if chunks.is_empty() {
            warn!("No usable chunks in {} documents", documents.len());
            return Vec::new();
        }

        let per_chunk = (total_questions / chunks.len()).max(1);
        info!(
            "Generating {} pairs for each of {} chunks",
            per_chunk,
            chunks.len()
        );

        let mut seen = SeenQuestions::new();
        let mut dataset = Vec::new();
        for chunk in &chunks {
            match self.generate_pairs(chunk, per_chunk).await {
                Ok(pairs) => {
                    let before = dataset.len();
                    dataset.extend(pairs.into_iter().filter(|pair| seen.insert(&pair.question)));
                    info!(
                        "Generated {} QA pairs from chunk {}..{} of {}",
                        dataset.len() - before,
                        chunk.start,
                        chunk.end,
                        chunk.source
                    );
                }
                Err(e) => warn!("Skipping chunk of {}: {e}", chunk.source),
            }
        }

        info!("Created document dataset with {} pairs", dataset.len());
        dataset
    }
}

/// Question/answer pairs from the JSON array between the first `[` and the last `]`.
fn parse_qa_pairs(content: &str) -> anyhow::Result<Vec<(String, String)>> {
    let (Some(start), Some(end)) = (content.find('['), content.rfind(']')) else {
        anyhow::bail!("response holds no JSON array");
    };
    if end < start {
        anyhow::bail!("response holds no JSON array");
    }

    let raw: Vec<RawPair> = serde_json::from_str(&content[start..=end])?;
    Ok(raw
        .into_iter()
        .map(|pair| (pair.question.trim().to_string(), pair.answer.trim().to_string()))
        .filter(|(question, answer)| !question.is_empty() && !answer.is_empty())
        .collect())
}
