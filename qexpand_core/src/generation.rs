//! LLM-backed question generation from graph neighborhoods.

use std::collections::HashSet;
use std::sync::Arc;

use serde::Serialize;
use tracing::debug;
use uuid::Uuid;

use crate::LLMProvider;
use crate::element::{ElementKind, SemanticElement};
use crate::error::{Error, Result};
use crate::util::{content_hash, normalize_question};

const QUESTION_PREFIX: &str = "question:";

#[derive(Debug, Clone, Serialize)]
pub struct GeneratedQuestion {
    pub id: String,
    pub text: String,
    /// The context elements the question was generated from, anchor first.
    pub origin_elements: Vec<SemanticElement>,
    pub generation_round: u32,
}

/// Every question text a session has produced or accepted, keyed by normalized content hash.
#[derive(Debug, Clone, Default)]
pub struct SeenQuestions {
    hashes: HashSet<String>,
}

impl SeenQuestions {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn key(text: &str) -> String {
        content_hash("question", &normalize_question(text))
    }

    /// Returns `false` when an equal question was already present.
    pub fn insert(&mut self, text: &str) -> bool {
        self.hashes.insert(Self::key(text))
    }

    #[must_use]
    pub fn contains(&self, text: &str) -> bool {
        self.hashes.contains(&Self::key(text))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.hashes.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.hashes.is_empty()
    }
}

/// Accepted questions of one generation call plus how many candidates were rejected as
/// already seen or repeated within the response.
#[derive(Debug, Clone, Default)]
pub struct GeneratedBatch {
    pub questions: Vec<GeneratedQuestion>,
    pub duplicates: usize,
}

pub struct QuestionGenerator {
    provider: Arc<dyn LLMProvider>,
}

impl QuestionGenerator {
    #[must_use]
    pub fn new(provider: Arc<dyn LLMProvider>) -> Self {
        Self { provider }
    }

    /// One completion call, at most `count` unseen questions back. Shortfalls are not retried.
    pub async fn generate(
        &self,
        elements: &[SemanticElement],
        count: usize,
        domain_hint: Option<&str>,
        seen: &SeenQuestions,
        round: u32,
    ) -> Result<GeneratedBatch> {
        if count == 0 {
            return Ok(GeneratedBatch::default());
        }

        let prompt = build_prompt(elements, count, domain_hint);
        let response = self
            .provider
            .complete(&prompt)
            .await
            .map_err(Error::Generation)?;

        let candidates = parse_questions(&response);
        if candidates.is_empty() {
            return Err(Error::Generation(anyhow::anyhow!(
                "completion service returned no questions"
            )));
        }

        let candidate_count = candidates.len();
        let mut batch = HashSet::new();
        let mut fresh: Vec<String> = candidates
            .into_iter()
            .filter(|text| !seen.contains(text) && batch.insert(normalize_question(text)))
            .collect();
        let duplicates = candidate_count - fresh.len();
        fresh.truncate(count);

        let questions: Vec<GeneratedQuestion> = fresh
            .into_iter()
            .map(|text| GeneratedQuestion {
                id: format!("gen-{}", Uuid::now_v7()),
                text,
                origin_elements: elements.to_vec(),
                generation_round: round,
            })
            .collect();

        debug!(
            "Round {}: {} of {} candidate questions are new, {} duplicates",
            round,
            questions.len(),
            candidate_count,
            duplicates
        );
        Ok(GeneratedBatch {
            questions,
            duplicates,
        })
    }
}

fn build_prompt(elements: &[SemanticElement], count: usize, domain_hint: Option<&str>) -> String {
    let mut prompt = format!("Generate {count} diverse questions");
    if let Some(domain) = domain_hint {
        prompt.push_str(&format!(" for the {domain} domain"));
    }
    prompt.push_str(" based on these elements:\n\n");

    for kind in ElementKind::ALL {
        let items: Vec<String> = elements
            .iter()
            .filter(|e| e.kind == kind)
            .map(|e| match (&e.label, kind) {
                (Some(label), ElementKind::Entity) => format!("{} ({label})", e.text),
                _ => e.text.clone(),
            })
            .collect();
        if !items.is_empty() {
            prompt.push_str(&format!("{}: {}\n", kind.plural_label(), items.join(", ")));
        }
    }

    prompt.push_str(
        "\nThe questions should be different from each other, cover different aspects of \
         these elements and be specific enough to have a clear answer.\n\
         Format each question on a new line starting with 'Question: '",
    );
    prompt
}

fn strip_list_marker(line: &str) -> &str {
    let line = line.trim();
    if let Some(rest) = line.strip_prefix(|c: char| matches!(c, '-' | '*' | '•')) {
        return rest.trim_start();
    }
    let digits = line
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(line.len());
    if digits > 0 {
        if let Some(rest) = line[digits..].strip_prefix(|c: char| matches!(c, '.' | ')')) {
            return rest.trim_start();
        }
    }
    line
}

fn strip_question_prefix(line: &str) -> Option<&str> {
    let line = strip_list_marker(line.trim_start_matches('*')).trim_start_matches('*');
    let head = line.get(..QUESTION_PREFIX.len())?;
    if !head.eq_ignore_ascii_case(QUESTION_PREFIX) {
        return None;
    }
    Some(line[QUESTION_PREFIX.len()..].trim_start_matches('*').trim())
}

/// Candidate question lines of a completion response, in response order.
///
/// If any line carries a `Question:` prefix only those lines count; otherwise every
/// non-empty line counts with list markers removed.
#[must_use]
pub fn parse_questions(response: &str) -> Vec<String> {
    let lines: Vec<&str> = response
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .collect();

    let prefixed: Vec<&str> = lines
        .iter()
        .filter_map(|line| strip_question_prefix(line))
        .collect();

    let chosen = if prefixed.is_empty() {
        lines.into_iter().map(strip_list_marker).collect()
    } else {
        prefixed
    };

    chosen
        .into_iter()
        .filter(|text| !text.is_empty())
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{ChatMessage, LLMResponse};
    use async_trait::async_trait;
    use std::sync::Mutex;

    struct ScriptedProvider {
        reply: anyhow::Result<String>,
        prompts: Mutex<Vec<String>>,
    }

    impl ScriptedProvider {
        fn new(reply: anyhow::Result<String>) -> Self {
            Self {
                reply,
                prompts: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl LLMProvider for ScriptedProvider {
        async fn chat(&self, messages: &[ChatMessage], _model: &str) -> anyhow::Result<LLMResponse> {
            if let Ok(mut prompts) = self.prompts.lock() {
                prompts.extend(messages.iter().map(|m| m.content.clone()));
            }
            match &self.reply {
                Ok(content) => Ok(LLMResponse {
                    content: content.clone(),
                    usage: None,
                }),
                Err(e) => Err(anyhow::anyhow!("{e}")),
            }
        }

        fn get_default_model(&self) -> &str {
            "scripted"
        }
    }

    fn elements() -> Vec<SemanticElement> {
        [
            ("Seattle", ElementKind::Entity, Some("GPE")),
            ("popular attractions", ElementKind::NounPhrase, None),
            ("visit", ElementKind::Verb, None),
        ]
        .into_iter()
        .filter_map(|(text, kind, label)| {
            SemanticElement::new(text, kind, "q1").map(|e| e.with_label(label.map(String::from)))
        })
        .collect()
    }

    #[test]
    fn test_parse_prefixed_lines_only() {
        let response = "Here are some questions:\n\
                        1. Question: What is Pike Place?\n\
                        \n\
                        Question:   Where is the Space Needle?  \n\
                        **Question:** Is Seattle rainy?\n\
                        Hope this helps!";
        assert_eq!(
            parse_questions(response),
            vec![
                "What is Pike Place?",
                "Where is the Space Needle?",
                "Is Seattle rainy?"
            ]
        );
    }

    #[test]
    fn test_parse_plain_list_strips_markers() {
        let response = "1. What is Pike Place?\n2) Where is the ferry?\n- How tall is it?\n\n* Why?";
        assert_eq!(
            parse_questions(response),
            vec![
                "What is Pike Place?",
                "Where is the ferry?",
                "How tall is it?",
                "Why?"
            ]
        );
    }

    #[test]
    fn test_parse_keeps_leading_numbers_that_are_not_markers() {
        assert_eq!(
            parse_questions("2024 budget: what changed?"),
            vec!["2024 budget: what changed?"]
        );
    }

    #[test]
    fn test_prompt_groups_elements_by_kind() {
        let prompt = build_prompt(&elements(), 3, Some("travel"));
        assert!(prompt.starts_with("Generate 3 diverse questions for the travel domain"));
        assert!(prompt.contains("entities: seattle (GPE)\n"));
        assert!(prompt.contains("noun_phrases: popular attractions\n"));
        assert!(prompt.contains("verbs: visit\n"));
        assert!(!prompt.contains("concepts:"));
        assert!(prompt.ends_with("starting with 'Question: '"));
    }

    #[tokio::test]
    #[expect(clippy::expect_used, reason = "Test failure should panic with context")]
    async fn test_generate_filters_seen_and_batch_duplicates() {
        let provider = Arc::new(ScriptedProvider::new(Ok(
            "Question: What are popular attractions in Seattle?\n\
             Question: What is the best time to visit Seattle?\n\
             Question: what is the best  time to visit seattle?\n\
             Question: Where do ferries leave from?\n\
             Question: Is the monorail still running?"
                .to_string(),
        )));
        let generator = QuestionGenerator::new(provider.clone());
        let mut seen = SeenQuestions::new();
        seen.insert("What are popular attractions in Seattle?");

        let batch = generator
            .generate(&elements(), 2, Some("travel"), &seen, 4)
            .await
            .expect("generation should succeed");
        assert_eq!(batch.duplicates, 2);

        let questions = batch.questions;
        let texts: Vec<&str> = questions.iter().map(|q| q.text.as_str()).collect();
        assert_eq!(
            texts,
            vec![
                "What is the best time to visit Seattle?",
                "Where do ferries leave from?"
            ]
        );
        assert!(questions.iter().all(|q| q.generation_round == 4));
        assert!(questions.iter().all(|q| q.origin_elements.len() == 3));
        assert_ne!(questions[0].id, questions[1].id);
        assert_eq!(provider.prompts.lock().map(|p| p.len()).unwrap_or(0), 1);
    }

    #[tokio::test]
    #[expect(clippy::expect_used, reason = "Test failure should panic with context")]
    async fn test_generate_accepts_shortfall() {
        let generator = QuestionGenerator::new(Arc::new(ScriptedProvider::new(Ok(
            "Question: Only one?".to_string(),
        ))));
        let batch = generator
            .generate(&elements(), 5, None, &SeenQuestions::new(), 1)
            .await
            .expect("generation should succeed");
        assert_eq!(batch.questions.len(), 1);
        assert_eq!(batch.duplicates, 0);
    }

    #[tokio::test]
    async fn test_generate_errors() {
        let empty = QuestionGenerator::new(Arc::new(ScriptedProvider::new(Ok(" \n\n ".to_string()))));
        let result = empty
            .generate(&elements(), 3, None, &SeenQuestions::new(), 1)
            .await;
        assert!(matches!(result, Err(Error::Generation(_))));

        let down = QuestionGenerator::new(Arc::new(ScriptedProvider::new(Err(anyhow::anyhow!(
            "503"
        )))));
        let result = down
            .generate(&elements(), 3, None, &SeenQuestions::new(), 1)
            .await;
        assert!(matches!(result, Err(Error::Generation(_))));
    }

    #[test]
    fn test_seen_questions_normalize() {
        let mut seen = SeenQuestions::new();
        assert!(seen.insert("How does a transformer model work?"));
        assert!(!seen.insert("  how does a TRANSFORMER model   work? "));
        assert!(seen.contains("HOW DOES A TRANSFORMER MODEL WORK?"));
        assert_eq!(seen.len(), 1);
    }
}
