//! Error types for survey records and the survey store.

use thiserror::Error;

use crate::SurveyId;

/// Survey store errors.
#[derive(Error, Debug)]
pub enum SurveyError {
    /// A field failed validation (coordinate range, non-finite value).
    #[error("Validation error: {0}")]
    Validation(String),

    /// The survey id is not registered in the store.
    #[error("Survey not found: {0}")]
    NotFound(SurveyId),

    /// A description referenced a point index that does not exist.
    #[error("Point index {index} out of range for survey {survey} ({len} points)")]
    Index {
        survey: SurveyId,
        index: usize,
        len: usize,
    },

    /// IO error while persisting or restoring.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Persisted survey could not be encoded or decoded.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type for survey operations.
pub type Result<T> = std::result::Result<T, SurveyError>;
