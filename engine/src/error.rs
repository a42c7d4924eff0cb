//! Error types and handling
//!
//! This module provides the error types used throughout the finchat
//! engine. The taxonomy mirrors the turn pipeline: classification never
//! fails, retrieval and duplicate-evidence problems are recovered
//! locally and never appear here, while synthesis and persistence
//! failures surface as turn failures.

use thiserror::Error;

/// Main engine error type
///
/// Only errors that cross a component boundary live here. Provider
/// modules have their own error enums (`LLMError`, `SearchError`) which
/// get folded into these variants at the seam.
#[derive(Debug, Error)]
pub enum EngineError {
    // Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    // Database errors
    #[error("Database error: {0}")]
    Database(String),

    #[error("Thread not found: {0}")]
    ThreadNotFound(String),

    // Turn pipeline errors
    #[error("Synthesis failed: {0}")]
    SynthesisFailed(String),

    #[error("Persistence failed: {0}")]
    PersistenceFailed(String),

    // Network errors (HTTP server binding and the like)
    #[error("Network error: {0}")]
    Network(String),
}

impl EngineError {
    /// Whether a retried submission of the same turn could succeed.
    ///
    /// Failed turns leave the user message in history and the thread
    /// counters untouched, so everything except a configuration
    /// problem is retryable by resubmission.
    pub fn is_retryable(&self) -> bool {
        !matches!(self, EngineError::Config(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = EngineError::SynthesisFailed("provider returned 500".to_string());
        assert_eq!(err.to_string(), "Synthesis failed: provider returned 500");

        let err = EngineError::ThreadNotFound("abc-123".to_string());
        assert!(err.to_string().contains("abc-123"));
    }

    #[test]
    fn test_retryable() {
        assert!(EngineError::SynthesisFailed("boom".into()).is_retryable());
        assert!(EngineError::Database("locked".into()).is_retryable());
        assert!(!EngineError::Config("bad toml".into()).is_retryable());
    }
}
