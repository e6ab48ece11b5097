//! Rule-based extraction used when no NLP endpoint is configured.
//!
//! Tokens come from a regex; punctuation between tokens splits phrases. Capitalized runs
//! away from the sentence start are entities, lexicon verbs (or words after "to") are verbs,
//! runs of two or more remaining content words are noun phrases, and content words longer
//! than three characters are concepts.

use std::collections::HashSet;

use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;

use super::{ExtractedSpan, ExtractionService};
use crate::element::ElementKind;

#[expect(clippy::expect_used, reason = "literal pattern is known to compile")]
static TOKEN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[A-Za-z0-9][A-Za-z0-9'\-]*").expect("token pattern compiles"));

static STOPWORDS: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    [
        // question words
        "what", "how", "where", "which", "who", "when", "why", "whose", "whom",
        // auxiliaries
        "is", "are", "was", "were", "be", "been", "being", "am", "do", "does", "did", "can",
        "could", "would", "should", "will", "shall", "may", "might", "must", "has", "have",
        "had",
        // determiners, pronouns, particles
        "a", "an", "the", "this", "that", "these", "those", "some", "any", "each", "every",
        "my", "your", "our", "their", "its", "his", "her", "i", "you", "we", "they", "he",
        "she", "it", "me", "us", "them", "there", "here", "not", "no", "so", "as", "if",
        "than", "then", "also", "just", "more", "most", "very", "good", "best", "nearest",
        // conjunctions and prepositions
        "and", "or", "but", "of", "in", "on", "at", "to", "for", "with", "from", "by",
        "about", "into", "over", "under", "between", "during", "through", "near",
    ]
    .into_iter()
    .collect()
});

static VERBS: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    [
        "affect", "apply", "build", "calculate", "cause", "change", "choose", "compare",
        "compute", "connect", "convert", "create", "deploy", "design", "develop", "differ",
        "encrypt", "explain", "find", "generate", "get", "go", "grow", "handle", "help",
        "implement", "improve", "know", "learn", "maintain", "make", "manage", "measure",
        "need", "optimize", "play", "prevent", "process", "produce", "protect", "provide",
        "reduce", "renew", "replicate", "require", "run", "scale", "secure", "serve", "store",
        "support", "test", "train", "use", "visit", "work",
    ]
    .into_iter()
    .collect()
});

const SUFFIXES: [(&str, &str); 7] = [
    ("ies", "y"),
    ("es", ""),
    ("s", ""),
    ("ed", ""),
    ("ed", "e"),
    ("ing", ""),
    ("ing", "e"),
];

/// Base form of `word` when it (or a suffix-stripped variant) is a lexicon verb.
fn verb_lemma(word: &str) -> Option<String> {
    if VERBS.contains(word) {
        return Some(word.to_string());
    }
    SUFFIXES.iter().find_map(|(suffix, replacement)| {
        let stem = word.strip_suffix(suffix)?;
        let candidate = format!("{stem}{replacement}");
        VERBS.contains(candidate.as_str()).then_some(candidate)
    })
}

#[derive(Debug)]
struct Token<'a> {
    raw: &'a str,
    lower: String,
    sentence_start: bool,
    break_before: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Role {
    Stop,
    Entity,
    Verb,
    Content,
}

fn tokenize(text: &str) -> Vec<Token<'_>> {
    let mut tokens = Vec::new();
    let mut previous_end = None;

    for m in TOKEN.find_iter(text) {
        let gap = previous_end.map_or("", |end| &text[end..m.start()]);
        let sentence_start = previous_end.is_none()
            || gap.chars().any(|c| matches!(c, '.' | '?' | '!' | ';' | ':'));
        let break_before = sentence_start || gap.chars().any(|c| c.is_ascii_punctuation());
        tokens.push(Token {
            raw: m.as_str(),
            lower: m.as_str().to_lowercase(),
            sentence_start,
            break_before,
        });
        previous_end = Some(m.end());
    }

    tokens
}

fn is_acronym(raw: &str) -> bool {
    raw.len() >= 2 && raw.chars().all(|c| c.is_ascii_uppercase() || c.is_ascii_digit())
}

fn classify(tokens: &[Token<'_>], index: usize) -> Role {
    let token = &tokens[index];
    if STOPWORDS.contains(token.lower.as_str()) {
        return Role::Stop;
    }
    let capitalized = token.raw.chars().next().is_some_and(char::is_uppercase);
    if is_acronym(token.raw) || (capitalized && !token.sentence_start) {
        return Role::Entity;
    }
    let after_to = index > 0 && tokens[index - 1].lower == "to" && !token.break_before;
    if after_to || verb_lemma(&token.lower).is_some() {
        return Role::Verb;
    }
    Role::Content
}

/// Offline `ExtractionService` built from token rules.
#[derive(Debug, Default, Clone, Copy)]
pub struct HeuristicExtractor;

impl HeuristicExtractor {
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Synchronous extraction; the trait method delegates here.
    #[must_use]
    pub fn spans(&self, text: &str) -> Vec<ExtractedSpan> {
        let tokens = tokenize(text);
        let roles: Vec<Role> = (0..tokens.len()).map(|i| classify(&tokens, i)).collect();

        let mut spans = Vec::new();
        let mut run: Vec<usize> = Vec::new();

        // Runs of same-role tokens with no punctuation between them
        let flush = |run: &mut Vec<usize>, spans: &mut Vec<ExtractedSpan>| {
            let Some(&first) = run.first() else {
                return;
            };
            match roles[first] {
                Role::Entity => {
                    let text: Vec<&str> = run.iter().map(|&i| tokens[i].raw).collect();
                    let label = if run.len() == 1 && is_acronym(tokens[first].raw) {
                        "ACRONYM"
                    } else {
                        "PROPER_NOUN"
                    };
                    spans.push(ExtractedSpan::labelled(
                        text.join(" "),
                        ElementKind::Entity,
                        label,
                    ));
                }
                Role::Content if run.len() >= 2 => {
                    let text: Vec<&str> = run.iter().map(|&i| tokens[i].lower.as_str()).collect();
                    spans.push(ExtractedSpan::new(text.join(" "), ElementKind::NounPhrase));
                }
                _ => {}
            }
            run.clear();
        };

        for (i, token) in tokens.iter().enumerate() {
            let continues = run
                .last()
                .is_some_and(|&last| roles[last] == roles[i] && !token.break_before);
            if !continues {
                flush(&mut run, &mut spans);
            }
            if matches!(roles[i], Role::Entity | Role::Content) {
                run.push(i);
            } else {
                flush(&mut run, &mut spans);
            }

            match roles[i] {
                Role::Verb => {
                    let lemma = verb_lemma(&token.lower).unwrap_or_else(|| token.lower.clone());
                    spans.push(ExtractedSpan::new(lemma, ElementKind::Verb));
                }
                Role::Content
                    if token.lower.chars().count() > 3
                        && !token.lower.chars().all(|c| c.is_ascii_digit()) =>
                {
                    spans.push(ExtractedSpan::new(token.lower.clone(), ElementKind::Concept));
                }
                _ => {}
            }
        }
        flush(&mut run, &mut spans);

        spans
    }
}

#[async_trait]
impl ExtractionService for HeuristicExtractor {
    async fn analyze(&self, text: &str) -> anyhow::Result<Vec<ExtractedSpan>> {
        Ok(self.spans(text))
    }
}
