//! Free-text annotations attached to survey points.

use serde::{Deserialize, Serialize};

/// A field note about the sample at `location_index`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Description {
    /// 0-based index into the survey's coordinates.
    pub location_index: usize,

    pub text: String,

    /// Best-guess rock/mineral name; `None` until inference resolves one.
    pub inferred_type: Option<String>,
}

impl Description {
    /// Create a new description with no inferred type.
    pub fn new(location_index: usize, text: impl Into<String>) -> Self {
        Self {
            location_index,
            text: text.into(),
            inferred_type: None,
        }
    }

    /// Set the inferred type.
    pub fn with_inferred_type(mut self, inferred_type: impl Into<String>) -> Self {
        self.inferred_type = Some(inferred_type.into());
        self
    }

    /// Whether inference still has to run for this description.
    pub fn needs_inference(&self) -> bool {
        self.inferred_type.is_none()
    }
}
