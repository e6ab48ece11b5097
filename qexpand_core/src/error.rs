use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    /// Fatal, raised before any service call of a session.
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Element extraction failed: {0}")]
    Extraction(anyhow::Error),

    #[error("Question generation failed: {0}")]
    Generation(anyhow::Error),

    #[error("Answer generation failed: {0}")]
    AnswerGeneration(anyhow::Error),

    #[error("Document QA generation failed: {0}")]
    DocumentQa(anyhow::Error),
}

impl Error {
    pub(crate) fn config(message: impl Into<String>) -> Self {
        Self::Configuration(message.into())
    }
}
