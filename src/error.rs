//! Error types for oraculo.

use thiserror::Error;

/// Result type alias using oraculo's Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while answering a question.
#[derive(Error, Debug)]
pub enum Error {
    /// Scoring pipeline failure (caught at the decision gate)
    #[error("Scoring error: {0}")]
    Scoring(#[from] ScoringError),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// LLM API error
    #[error("LLM API error: {provider} - {message}")]
    LlmApi { provider: String, message: String },

    /// Conversation context storage error
    #[error("Context store error: {0}")]
    ContextStore(String),

    /// Serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Timeout during operation
    #[error("Operation timed out after {duration_ms}ms")]
    Timeout { duration_ms: u64 },

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Create an LLM API error.
    pub fn llm_api(provider: impl Into<String>, message: impl Into<String>) -> Self {
        Self::LlmApi {
            provider: provider.into(),
            message: message.into(),
        }
    }

    /// Create a timeout error.
    pub fn timeout(duration_ms: u64) -> Self {
        Self::Timeout { duration_ms }
    }

    /// Create a configuration error.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Whether this error came out of the scoring pipeline.
    pub fn is_scoring(&self) -> bool {
        matches!(self, Self::Scoring(_))
    }
}

/// Failures inside the confidence-scoring pipeline.
///
/// None of these are ever surfaced to a chat user; the decision gate maps
/// them to a rejection with minimum confidence.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ScoringError {
    /// Answer text longer than the scorer accepts
    #[error("answer too long to score: {len} chars (max {max})")]
    InputTooLong { len: usize, max: usize },

    /// Nothing to score
    #[error("answer is empty")]
    EmptyAnswer,

    /// Self-reported confidence is NaN, infinite or outside [0, 1]
    #[error("invalid LLM confidence: {0}")]
    InvalidConfidence(f64),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scoring_error_converts() {
        let err: Error = ScoringError::EmptyAnswer.into();
        assert!(err.is_scoring());
        assert_eq!(err.to_string(), "Scoring error: answer is empty");
    }

    #[test]
    fn test_llm_api_display() {
        let err = Error::llm_api("gemini", "quota exceeded");
        assert_eq!(err.to_string(), "LLM API error: gemini - quota exceeded");
        assert!(!err.is_scoring());
    }
}
