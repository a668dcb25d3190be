//! Error types for knowledge queries, interpolation and map generation.

use std::path::PathBuf;

use survey_model::SurveyId;
use thiserror::Error;

use crate::knowledge_base::RecordKind;

/// A search expression that could not be parsed.
///
/// `position` is the byte offset of `token` in the expression; `token` is
/// `<end>` when the expression stopped early.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{message} at position {position} near `{token}`")]
pub struct QuerySyntaxError {
    pub token: String,
    pub position: usize,
    pub message: String,
}

impl QuerySyntaxError {
    pub(crate) fn new(token: impl Into<String>, position: usize, message: impl Into<String>) -> Self {
        Self {
            token: token.into(),
            position,
            message: message.into(),
        }
    }
}

/// Knowledge base errors.
#[derive(Error, Debug)]
pub enum KnowledgeError {
    /// A source redefined an existing record with different attributes.
    #[error("Conflicting definition for {kind} {name:?}")]
    DuplicateRecord { kind: RecordKind, name: String },

    /// A catalog entry could not be turned into a record.
    #[error("Invalid record: {0}")]
    InvalidRecord(String),

    /// Named record does not exist in either catalog.
    #[error("Record not found: {0}")]
    NotFound(String),

    #[error("IO error reading {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Catalog {path} is not valid JSON: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// An online-learning source failed to deliver records.
    #[error("Knowledge source failed: {0}")]
    Source(String),
}

/// Interpolation errors. Numerical edge cases are never errors.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum InterpolationError {
    /// No samples to interpolate from.
    #[error("Insufficient data: at least one point is required")]
    InsufficientData,

    #[error("Invalid grid configuration: {0}")]
    InvalidGrid(String),
}

/// Rendering collaborator errors.
#[derive(Error, Debug)]
pub enum RenderError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Encoding error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Map generation errors.
#[derive(Error, Debug)]
pub enum MapError {
    /// The survey has no points to map.
    #[error("Insufficient data: survey {0} has no points")]
    InsufficientData(SurveyId),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error(transparent)]
    Interpolation(#[from] InterpolationError),

    #[error("Render failed: {0}")]
    Render(#[from] RenderError),
}

/// Image classifier collaborator errors.
#[derive(Error, Debug)]
pub enum ClassifierError {
    /// The image could not be decoded or is in an unsupported format.
    #[error("Unsupported image: {0}")]
    UnsupportedImage(String),

    #[error("Classification failed: {0}")]
    Failed(String),
}

/// Configuration errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error reading {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Result type for knowledge base operations.
pub type Result<T> = std::result::Result<T, KnowledgeError>;
