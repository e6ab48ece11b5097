//! Session inputs and terminal dataset records.

use serde::{Deserialize, Serialize};

use crate::answer::AnswerSource;

/// A caller-supplied seed question. Ids must be unique within a session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeedQuery {
    pub id: String,
    pub text: String,
}

impl SeedQuery {
    #[must_use]
    pub fn new(id: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            text: text.into(),
        }
    }
}

impl<T: Into<String>, I: Into<String>> From<(T, I)> for SeedQuery {
    /// Seeds are conventionally written as `(question_text, unique_id)`.
    fn from((text, id): (T, I)) -> Self {
        Self::new(id, text)
    }
}

/// One row of the generated dataset. Field order is the CSV column order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QAPair {
    pub question: String,
    pub answer: String,
    pub source: AnswerSource,
    pub domain: String,
    pub query_id: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_seed_from_text_id_tuple() {
        let seed = SeedQuery::from(("What is DNA replication?", "sci3"));
        assert_eq!(seed.id, "sci3");
        assert_eq!(seed.text, "What is DNA replication?");
    }

    #[test]
    #[expect(clippy::expect_used, reason = "Test failure should panic with context")]
    fn test_qa_pair_serializes_source_lowercase() {
        let pair = QAPair {
            question: "q".to_string(),
            answer: "a".to_string(),
            source: AnswerSource::Search,
            domain: "general".to_string(),
            query_id: "q1".to_string(),
        };
        let json = serde_json::to_value(&pair).expect("pair should serialize");
        assert_eq!(json["source"], "search");
    }
}
