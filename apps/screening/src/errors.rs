use thiserror::Error;
use uuid::Uuid;

use crate::llm::LlmError;

/// Fatal pipeline errors. Candidate-level degradations are not errors —
/// they travel as `models::Annotation` values inside the report.
#[derive(Debug, Error)]
pub enum ScreenError {
    /// The query interpreter could not produce structured criteria.
    #[error("query interpretation failed: {0}")]
    Interpretation(String),

    /// The vector index was unreachable or returned an invalid response.
    /// Always retryable: the whole query fails with a retryable status.
    #[error("retrieval failed: {0}")]
    Retrieval(String),

    /// The embedding provider failed.
    #[error("embedding failed: {0}")]
    Embedding(String),

    #[error("unknown query: {0}")]
    QueryNotFound(Uuid),

    #[error("unknown resume: {0}")]
    ResumeNotFound(Uuid),

    #[error("LLM error: {0}")]
    Llm(#[from] LlmError),
}

impl ScreenError {
    /// Whether the caller may retry the same operation unchanged.
    pub fn is_retryable(&self) -> bool {
        match self {
            ScreenError::Retrieval(_) | ScreenError::Embedding(_) => true,
            ScreenError::Llm(e) => e.is_retryable(),
            ScreenError::Interpretation(_)
            | ScreenError::QueryNotFound(_)
            | ScreenError::ResumeNotFound(_) => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retrieval_is_retryable() {
        assert!(ScreenError::Retrieval("index down".to_string()).is_retryable());
        assert!(ScreenError::Embedding("timeout".to_string()).is_retryable());
    }

    #[test]
    fn test_not_found_is_not_retryable() {
        assert!(!ScreenError::QueryNotFound(Uuid::new_v4()).is_retryable());
        assert!(!ScreenError::Interpretation("empty".to_string()).is_retryable());
    }
}
