//! Image classifier seam.
//!
//! Model training and inference are owned by an external ML runtime. The
//! pipeline only needs a label and a confidence for an image.

use serde::{Deserialize, Serialize};

use crate::ClassifierError;

/// Result of classifying a sample image.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Classification {
    pub label: String,
    /// In `[0, 1]`.
    pub confidence: f64,
}

impl Classification {
    /// Create a classification, clamping the confidence into `[0, 1]`.
    ///
    /// A NaN confidence is treated as no confidence at all.
    pub fn new(label: impl Into<String>, confidence: f64) -> Self {
        let confidence = if confidence.is_nan() {
            0.0
        } else {
            confidence.clamp(0.0, 1.0)
        };
        Self {
            label: label.into(),
            confidence,
        }
    }
}

/// External collaborator that identifies a rock or mineral from image bytes.
pub trait ImageClassifier: Send + Sync {
    fn classify(&self, image: &[u8]) -> Result<Classification, ClassifierError>;
}
