use serde::{Deserialize, Serialize};

use crate::util::normalize_text;

/// Kind of a typed span extracted from a query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ElementKind {
    /// Named entity: "Seattle", "HTTPS"
    Entity,
    /// Multi-word noun chunk: "transformer model"
    NounPhrase,
    /// Main verb, lemmatized: "work"
    Verb,
    /// Derived key concept: "mitochondria"
    Concept,
}

impl ElementKind {
    pub const ALL: [Self; 4] = [Self::Entity, Self::NounPhrase, Self::Verb, Self::Concept];

    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Entity => "entity",
            Self::NounPhrase => "noun_phrase",
            Self::Verb => "verb",
            Self::Concept => "concept",
        }
    }

    /// Heading used when listing elements of this kind in a prompt.
    #[must_use]
    pub const fn plural_label(&self) -> &'static str {
        match self {
            Self::Entity => "entities",
            Self::NounPhrase => "noun_phrases",
            Self::Verb => "verbs",
            Self::Concept => "concepts",
        }
    }
}

impl std::fmt::Display for ElementKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ElementKind {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "entity" | "entities" | "ent" => Ok(Self::Entity),
            "noun_phrase" | "noun_phrases" | "noun_chunk" => Ok(Self::NounPhrase),
            "verb" | "verbs" => Ok(Self::Verb),
            "concept" | "concepts" => Ok(Self::Concept),
            _ => Err(anyhow::anyhow!("unknown element kind: {s}")),
        }
    }
}

/// A typed, normalized span of query text.
///
/// Identity is `(text, kind)`; the label and source query are provenance only.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SemanticElement {
    pub text: String,
    pub kind: ElementKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    pub source_query_id: String,
}

impl SemanticElement {
    /// Build an element, normalizing its text. Returns `None` when nothing is left.
    #[must_use]
    pub fn new(text: &str, kind: ElementKind, source_query_id: impl Into<String>) -> Option<Self> {
        let text = normalize_text(text);
        if text.is_empty() {
            return None;
        }
        Some(Self {
            text,
            kind,
            label: None,
            source_query_id: source_query_id.into(),
        })
    }

    #[must_use]
    pub fn with_label(mut self, label: Option<String>) -> Self {
        self.label = label.filter(|l| !l.trim().is_empty());
        self
    }
}

impl PartialEq for SemanticElement {
    fn eq(&self, other: &Self) -> bool {
        self.kind == other.kind && self.text == other.text
    }
}

impl Eq for SemanticElement {}

impl std::hash::Hash for SemanticElement {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.text.hash(state);
        self.kind.hash(state);
    }
}

impl PartialOrd for SemanticElement {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for SemanticElement {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.text
            .cmp(&other.text)
            .then_with(|| self.kind.cmp(&other.kind))
    }
}
