//! Map Generation - package a survey into a renderable geological map.
//!
//! Generation runs in a fixed order:
//! 1. **Inference**: Descriptions without a category get one from the text
//!    (and an optional classifier label)
//! 2. **Attachment**: Each point takes the latest category among its descriptions
//! 3. **Interpolation**: Elevation and category grids over the survey extent
//! 4. **Packaging**: Legend and structural overlay
//!
//! The generator never mutates the survey. New inferences are returned in the
//! artifact so the caller can write them back through the store.

mod features;
mod render;

pub use features::*;
pub use render::*;

use std::collections::{BTreeMap, BTreeSet};
use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use survey_model::{Survey, SurveyId};

use crate::{
    Bounds, CategoryGrid, CategoryInferencer, Classification, ElevationGrid, GridConfig,
    KnowledgeBase, MapError, Sample, SpatialInterpolator,
};

/// Legend key for cells no sample category reaches.
pub const UNCLASSIFIED: &str = "unclassified";

/// Map generation settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MapConfig {
    pub grid: GridConfig,

    /// Minimum consecutive elevation change (metres) reported as a fault.
    pub fault_threshold: f64,

    /// Points per contact line.
    pub contact_samples: usize,

    /// Category colours, matched case-insensitively.
    pub palette: BTreeMap<String, String>,

    /// Colour for categories missing from the palette.
    pub unknown_color: String,

    pub unclassified_color: String,
}

impl Default for MapConfig {
    fn default() -> Self {
        let palette = [
            ("granite", "#FF9999"),
            ("basalt", "#9999FF"),
            ("sandstone", "#FFCC99"),
            ("limestone", "#99FF99"),
            ("shale", "#CCCCCC"),
            ("quartz", "#FFFFFF"),
            ("feldspar", "#FFFF99"),
        ]
        .into_iter()
        .map(|(name, color)| (name.to_string(), color.to_string()))
        .collect();

        Self {
            grid: GridConfig::default(),
            fault_threshold: 50.0,
            contact_samples: 5,
            palette,
            unknown_color: "#777777".to_string(),
            unclassified_color: "#D9D9D9".to_string(),
        }
    }
}

impl MapConfig {
    /// Colour for a category; unknown categories get `unknown_color`.
    pub fn color_for(&self, category: &str) -> &str {
        self.palette
            .iter()
            .find(|(name, _)| name.eq_ignore_ascii_case(category))
            .map_or(self.unknown_color.as_str(), |(_, color)| color.as_str())
    }
}

/// A survey point with its attached category.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MapPoint {
    pub lat: f64,
    pub lon: f64,
    pub elevation: f64,
    pub category: Option<String>,
}

/// A category inferred during generation, for write-back by the caller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DescriptionInference {
    pub description_index: usize,
    pub inferred_type: Option<String>,
}

/// Everything a renderer needs to draw one survey.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MapArtifact {
    pub survey_id: SurveyId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub formation: Option<String>,
    pub bounds: Bounds,
    pub elevation: ElevationGrid,
    pub categories: CategoryGrid,
    pub points: Vec<MapPoint>,
    /// Category (or `unclassified`) to colour.
    pub legend: BTreeMap<String, String>,
    pub features: Vec<StructuralFeature>,
    pub inferences: Vec<DescriptionInference>,
}

/// Produces map artifacts from surveys.
#[derive(Debug, Clone, Default)]
pub struct MapGenerator {
    config: MapConfig,
    inferencer: CategoryInferencer,
}

impl MapGenerator {
    pub fn new(config: MapConfig, inferencer: CategoryInferencer) -> Self {
        Self { config, inferencer }
    }

    pub fn config(&self) -> &MapConfig {
        &self.config
    }

    /// Generate a map from text inference alone.
    pub fn generate(&self, survey: &Survey, kb: &KnowledgeBase) -> Result<MapArtifact, MapError> {
        self.generate_with_classifications(survey, kb, &BTreeMap::new())
    }

    /// Generate a map, using classifier labels keyed by description index.
    pub fn generate_with_classifications(
        &self,
        survey: &Survey,
        kb: &KnowledgeBase,
        classifications: &BTreeMap<usize, Classification>,
    ) -> Result<MapArtifact, MapError> {
        if survey.point_count() == 0 {
            return Err(MapError::InsufficientData(survey.id().clone()));
        }

        let mut inferences = Vec::new();
        let mut categories: Vec<Option<String>> = vec![None; survey.point_count()];
        for (index, description) in survey.descriptions().iter().enumerate() {
            let category = if description.needs_inference() {
                let inferred = self
                    .inferencer
                    .infer_with_classification(description, kb, classifications.get(&index))
                    .map(|i| i.category);
                tracing::debug!(
                    target: "geo::map",
                    description = index,
                    category = ?inferred,
                    "Inferred description category"
                );
                inferences.push(DescriptionInference {
                    description_index: index,
                    inferred_type: inferred.clone(),
                });
                inferred
            } else {
                description.inferred_type.clone()
            };

            let slot = categories.get_mut(description.location_index).ok_or_else(|| {
                MapError::Validation(format!(
                    "description {index} references missing point {}",
                    description.location_index
                ))
            })?;
            if category.is_some() {
                *slot = category;
            }
        }

        let points: Vec<MapPoint> = survey
            .coordinates()
            .iter()
            .zip(categories)
            .map(|(p, category)| MapPoint {
                lat: p.lat,
                lon: p.lon,
                elevation: p.elevation,
                category,
            })
            .collect();

        let samples: Vec<Sample> = points
            .iter()
            .map(|p| Sample::new(p.lat, p.lon, p.elevation, p.category.clone()))
            .collect();
        let grids = SpatialInterpolator::new(self.config.grid.clone()).interpolate(&samples)?;

        let legend = self.legend(&grids.categories, &points);
        let mut features = detect_contacts(&points, self.config.contact_samples);
        features.extend(detect_fault(&points, self.config.fault_threshold));

        tracing::info!(
            target: "geo::map",
            survey = %survey.id(),
            points = points.len(),
            inferred = inferences.len(),
            features = features.len(),
            "Map generated"
        );

        Ok(MapArtifact {
            survey_id: survey.id().clone(),
            formation: survey.formation().map(str::to_string),
            bounds: grids.bounds,
            elevation: grids.elevation,
            categories: grids.categories,
            points,
            legend,
            features,
            inferences,
        })
    }

    /// Hand a finished artifact to a renderer.
    pub fn render(
        &self,
        artifact: &MapArtifact,
        renderer: &dyn MapRenderer,
    ) -> Result<PathBuf, MapError> {
        Ok(renderer.render(artifact)?)
    }

    fn legend(&self, grid: &CategoryGrid, points: &[MapPoint]) -> BTreeMap<String, String> {
        let mut seen = BTreeSet::new();
        let mut unclassified = false;
        for cell in grid.cells() {
            match cell {
                Some(category) => {
                    seen.insert(category.as_str());
                }
                None => unclassified = true,
            }
        }
        seen.extend(points.iter().filter_map(|p| p.category.as_deref()));

        let mut legend: BTreeMap<String, String> = seen
            .into_iter()
            .map(|category| (category.to_string(), self.config.color_for(category).to_string()))
            .collect();
        if unclassified {
            legend.insert(UNCLASSIFIED.to_string(), self.config.unclassified_color.clone());
        }
        legend
    }
}
