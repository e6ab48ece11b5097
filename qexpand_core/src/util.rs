//! Text normalization and content hashing shared by the graph and dedup layers.

use sha2::{Digest, Sha256};

/// Lowercase, trim and collapse inner whitespace runs to a single space.
#[must_use]
pub fn normalize_text(text: &str) -> String {
    text.split_whitespace()
        .map(str::to_lowercase)
        .collect::<Vec<_>>()
        .join(" ")
}

/// Normalized form used for question dedup.
///
/// Exact match after case folding and whitespace collapsing; no fuzzy matching.
#[must_use]
pub fn normalize_question(text: &str) -> String {
    normalize_text(text)
}

/// Compute a SHA-256 content hash for deduplication.
///
/// Concatenates a namespace and the content, then returns the hex-encoded digest.
#[must_use]
pub fn content_hash(namespace: &str, content: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(namespace.as_bytes());
    hasher.update(b":");
    hasher.update(content.as_bytes());
    format!("{:x}", hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_collapses_whitespace_and_case() {
        assert_eq!(
            normalize_text("  How does\ta  Transformer\nwork? "),
            "how does a transformer work?"
        );
        assert_eq!(normalize_text("   "), "");
    }

    #[test]
    fn question_normalization_is_case_insensitive() {
        assert_eq!(
            normalize_question("What is DNA?"),
            normalize_question("what  is dna?")
        );
        assert_ne!(
            normalize_question("What is DNA?"),
            normalize_question("What is DNA")
        );
    }

    #[test]
    fn deterministic_hash() {
        let h1 = content_hash("question", "what is dna?");
        let h2 = content_hash("question", "what is dna?");
        assert_eq!(h1, h2);
        assert_eq!(h1.len(), 64); // SHA-256 hex length
    }

    #[test]
    fn namespaces_separate_hashes() {
        let h1 = content_hash("question", "what is dna?");
        let h2 = content_hash("answer", "what is dna?");
        assert_ne!(h1, h2);
    }
}
