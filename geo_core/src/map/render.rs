//! Renderer seam and the default JSON renderer.

use std::fs;
use std::path::{Path, PathBuf};

use super::MapArtifact;
use crate::RenderError;

/// Turns a map artifact into a file on disk.
pub trait MapRenderer {
    /// Render `artifact` and return the path written.
    fn render(&self, artifact: &MapArtifact) -> Result<PathBuf, RenderError>;
}

/// Writes the artifact as pretty JSON to `geological_map_<id>.json`.
#[derive(Debug, Clone)]
pub struct JsonRenderer {
    output_dir: PathBuf,
}

impl JsonRenderer {
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
        }
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    pub fn path_for(&self, artifact: &MapArtifact) -> PathBuf {
        self.output_dir
            .join(format!("geological_map_{}.json", artifact.survey_id))
    }
}

impl MapRenderer for JsonRenderer {
    fn render(&self, artifact: &MapArtifact) -> Result<PathBuf, RenderError> {
        fs::create_dir_all(&self.output_dir)?;
        let path = self.path_for(artifact);
        let json = serde_json::to_string_pretty(artifact)?;
        fs::write(&path, json)?;
        tracing::info!(target: "geo::map", path = %path.display(), "Map rendered");
        Ok(path)
    }
}
