//! Pipeline configuration loaded from TOML.
//!
//! Every field has a default, so an empty or missing file is a valid
//! configuration.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::{ConfigError, InferenceConfig, MapConfig};

/// Where the knowledge base comes from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct KnowledgeConfig {
    /// Catalog files loaded at startup, in order.
    pub sources: Vec<PathBuf>,

    /// Catalog written by `update` and loaded after `sources`.
    pub learned: PathBuf,
}

impl Default for KnowledgeConfig {
    fn default() -> Self {
        Self {
            sources: vec![
                PathBuf::from("data/minerals.json"),
                PathBuf::from("data/rocks.json"),
            ],
            learned: PathBuf::from("data/learned_catalog.json"),
        }
    }
}

/// Top-level configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeoConfig {
    /// Directory holding one JSON document per survey.
    pub data_dir: PathBuf,

    /// Directory for rendered maps.
    pub output_dir: PathBuf,

    pub knowledge: KnowledgeConfig,
    pub inference: InferenceConfig,
    pub map: MapConfig,
}

impl Default for GeoConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("data/user_surveys"),
            output_dir: PathBuf::from("output"),
            knowledge: KnowledgeConfig::default(),
            inference: InferenceConfig::default(),
            map: MapConfig::default(),
        }
    }
}

impl GeoConfig {
    /// Parse and validate a TOML document.
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load from `path`, falling back to defaults when the file does not exist.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        match fs::read_to_string(path) {
            Ok(content) => {
                let config = Self::from_toml_str(&content)?;
                tracing::debug!(target: "geo::config", path = %path.display(), "Configuration loaded");
                Ok(config)
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                tracing::debug!(target: "geo::config", path = %path.display(), "No configuration file, using defaults");
                Ok(Self::default())
            }
            Err(source) => Err(ConfigError::Io {
                path: path.to_path_buf(),
                source,
            }),
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let inference = &self.inference;
        if !(inference.min_confidence > 0.0 && inference.min_confidence <= 1.0) {
            return Err(invalid(format!(
                "inference.min_confidence must be in (0, 1], got {}",
                inference.min_confidence
            )));
        }
        if !(0.0..=1.0).contains(&inference.classifier_threshold) {
            return Err(invalid(format!(
                "inference.classifier_threshold must be in [0, 1], got {}",
                inference.classifier_threshold
            )));
        }
        for hint in &inference.hints {
            if hint.all_of.is_empty() {
                return Err(invalid(format!(
                    "hint for {:?} needs at least one keyword",
                    hint.category
                )));
            }
        }

        self.map
            .grid
            .validate()
            .map_err(|e| invalid(format!("map.grid: {e}")))?;
        if self.map.contact_samples < 2 {
            return Err(invalid(format!(
                "map.contact_samples must be at least 2, got {}",
                self.map.contact_samples
            )));
        }
        if self.map.fault_threshold.is_nan() || self.map.fault_threshold < 0.0 {
            return Err(invalid(format!(
                "map.fault_threshold must be non-negative, got {}",
                self.map.fault_threshold
            )));
        }
        Ok(())
    }
}

fn invalid(message: String) -> ConfigError {
    ConfigError::Invalid(message)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_empty_document_is_default() {
        assert_eq!(GeoConfig::from_toml_str("").unwrap(), GeoConfig::default());
    }

    #[test]
    fn test_partial_override() {
        let config = GeoConfig::from_toml_str(
            r##"
            data_dir = "/srv/surveys"

            [inference]
            min_confidence = 0.75

            [map]
            fault_threshold = 20.0

            [map.grid]
            rows = 10
            cols = 12

            [map.palette]
            dolerite = "#334455"
            "##,
        )
        .unwrap();

        assert_eq!(config.data_dir, PathBuf::from("/srv/surveys"));
        assert_eq!(config.output_dir, PathBuf::from("output"));
        assert_eq!(config.inference.min_confidence, 0.75);
        assert_eq!(config.inference.classifier_threshold, 0.7);
        assert_eq!(config.inference.hints.len(), 3);
        assert_eq!(config.map.fault_threshold, 20.0);
        assert_eq!(config.map.grid.rows, 10);
        assert_eq!(config.map.grid.cols, 12);
        assert_eq!(config.map.grid.power, 2.0);
        assert_eq!(config.map.color_for("Dolerite"), "#334455");
        // A palette table replaces the defaults.
        assert_eq!(config.map.color_for("granite"), "#777777");
    }

    #[test]
    fn test_custom_hints() {
        let config = GeoConfig::from_toml_str(
            r#"
            [[inference.hints]]
            category = "Pumice"
            all_of = ["floats"]
            "#,
        )
        .unwrap();
        assert_eq!(config.inference.hints.len(), 1);
        assert_eq!(config.inference.hints[0].score, 0.8);
    }

    #[test]
    fn test_invalid_values() {
        for toml in [
            "[inference]\nmin_confidence = 0.0",
            "[inference]\nmin_confidence = 1.5",
            "[inference]\nclassifier_threshold = -0.1",
            "[map.grid]\nrows = 0",
            "[map.grid]\nrows = 9223372036854775807\ncols = 4",
            "[map.grid]\nmargin = -0.5",
            "[map.grid]\npower = 0.0",
            "[map]\ncontact_samples = 1",
            "[map]\nfault_threshold = -1.0",
            "[[inference.hints]]\ncategory = \"Granite\"\nall_of = []",
        ] {
            assert!(
                matches!(GeoConfig::from_toml_str(toml), Err(ConfigError::Invalid(_))),
                "accepted {toml:?}"
            );
        }
    }

    #[test]
    fn test_parse_error() {
        assert!(matches!(
            GeoConfig::from_toml_str("data_dir = ["),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn test_load_missing_file_uses_defaults() {
        let dir = TempDir::new().unwrap();
        let config = GeoConfig::load(&dir.path().join("geo.toml")).unwrap();
        assert_eq!(config, GeoConfig::default());
    }

    #[test]
    fn test_load_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("geo.toml");
        fs::write(&path, "output_dir = \"maps\"\n").unwrap();
        let config = GeoConfig::load(&path).unwrap();
        assert_eq!(config.output_dir, PathBuf::from("maps"));
    }
}
