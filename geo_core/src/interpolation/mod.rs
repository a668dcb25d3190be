//! Spatial Interpolation - scattered survey samples to regular grids.
//!
//! For every cell centre:
//! 1. **Elevation**: Inverse-distance weighting over all samples, accumulated
//!    in input order so identical input always gives bit-identical output
//! 2. **Category**: The category of the nearest sample that has one
//!
//! Distances use a local flat-earth approximation: longitude differences are
//! scaled by the cosine of the mean sample latitude.

mod grid;

pub use grid::*;

use serde::{Deserialize, Serialize};

use crate::InterpolationError;

/// One input sample.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sample {
    pub lat: f64,
    pub lon: f64,
    pub elevation: f64,
    pub category: Option<String>,
}

impl Sample {
    pub fn new(lat: f64, lon: f64, elevation: f64, category: Option<String>) -> Self {
        Self {
            lat,
            lon,
            elevation,
            category,
        }
    }
}

/// Grid resolution and interpolation parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GridConfig {
    pub rows: usize,
    pub cols: usize,

    /// Degrees added on every side of the sample bounding box.
    pub margin: f64,

    /// IDW exponent.
    pub power: f64,
}

impl Default for GridConfig {
    fn default() -> Self {
        Self {
            rows: 50,
            cols: 50,
            margin: 0.1,
            power: 2.0,
        }
    }
}

impl GridConfig {
    /// Largest number of cells a grid may hold.
    pub const MAX_CELLS: usize = 16 * 1024 * 1024;

    pub fn validate(&self) -> Result<(), InterpolationError> {
        if self.rows == 0 || self.cols == 0 {
            return Err(InterpolationError::InvalidGrid(format!(
                "grid must have at least one row and column, got {}x{}",
                self.rows, self.cols
            )));
        }
        match self.rows.checked_mul(self.cols) {
            Some(cells) if cells <= Self::MAX_CELLS => {}
            _ => {
                return Err(InterpolationError::InvalidGrid(format!(
                    "grid of {}x{} exceeds {} cells",
                    self.rows,
                    self.cols,
                    Self::MAX_CELLS
                )))
            }
        }
        if !self.margin.is_finite() || self.margin < 0.0 {
            return Err(InterpolationError::InvalidGrid(format!(
                "margin must be a non-negative number, got {}",
                self.margin
            )));
        }
        if !self.power.is_finite() || self.power <= 0.0 {
            return Err(InterpolationError::InvalidGrid(format!(
                "power must be positive, got {}",
                self.power
            )));
        }
        Ok(())
    }
}

/// Interpolated rasters over a shared extent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Interpolation {
    pub bounds: Bounds,
    pub elevation: ElevationGrid,
    pub categories: CategoryGrid,
}

/// Turns scattered samples into elevation and category grids.
#[derive(Debug, Clone, Default)]
pub struct SpatialInterpolator {
    config: GridConfig,
}

impl SpatialInterpolator {
    pub fn new(config: GridConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &GridConfig {
        &self.config
    }

    /// Interpolate `samples` onto the configured grid.
    pub fn interpolate(&self, samples: &[Sample]) -> Result<Interpolation, InterpolationError> {
        self.config.validate()?;
        let bounds = Bounds::enclosing(samples.iter().map(|s| (s.lat, s.lon)))
            .ok_or(InterpolationError::InsufficientData)?
            .expanded(self.config.margin);

        let (rows, cols) = (self.config.rows, self.config.cols);

        if let [only] = samples {
            return Ok(Interpolation {
                bounds,
                elevation: Grid::filled(rows, cols, only.elevation).ok_or_else(oversized)?,
                categories: Grid::filled(rows, cols, only.category.clone())
                    .ok_or_else(oversized)?,
            });
        }

        let mean_lat = samples.iter().map(|s| s.lat).sum::<f64>() / samples.len() as f64;
        let metric = FlatEarth::new(mean_lat);
        let lat_step = bounds.lat_span() / rows as f64;
        let lon_step = bounds.lon_span() / cols as f64;

        let mut elevation = Vec::with_capacity(rows * cols);
        let mut categories = Vec::with_capacity(rows * cols);
        for row in 0..rows {
            let lat = bounds.north - (row as f64 + 0.5) * lat_step;
            for col in 0..cols {
                let lon = bounds.west + (col as f64 + 0.5) * lon_step;
                elevation.push(self.idw(samples, &metric, lat, lon));
                categories.push(nearest_category(samples, &metric, lat, lon));
            }
        }

        Ok(Interpolation {
            bounds,
            elevation: Grid::from_cells(rows, cols, elevation)
                .ok_or_else(|| InterpolationError::InvalidGrid("cell count mismatch".into()))?,
            categories: Grid::from_cells(rows, cols, categories)
                .ok_or_else(|| InterpolationError::InvalidGrid("cell count mismatch".into()))?,
        })
    }

    /// Inverse-distance weighted elevation at one point.
    fn idw(&self, samples: &[Sample], metric: &FlatEarth, lat: f64, lon: f64) -> f64 {
        let half_power = self.config.power / 2.0;
        let mut weighted = 0.0;
        let mut total_weight = 0.0;
        for sample in samples {
            let d2 = metric.distance_squared(lat, lon, sample.lat, sample.lon);
            if d2 == 0.0 {
                return sample.elevation;
            }
            let weight = d2.powf(-half_power);
            weighted += weight * sample.elevation;
            total_weight += weight;
        }

        let value = weighted / total_weight;
        if value.is_finite() {
            value
        } else {
            // Weights under- or overflowed for an extreme exponent.
            nearest(samples, metric, lat, lon, |_| true)
                .map(|i| samples[i].elevation)
                .unwrap_or(0.0)
        }
    }
}

fn oversized() -> InterpolationError {
    InterpolationError::InvalidGrid("grid size overflows".into())
}

/// Local planar distance in degrees.
struct FlatEarth {
    lon_scale: f64,
}

impl FlatEarth {
    fn new(mean_lat: f64) -> Self {
        Self {
            lon_scale: mean_lat.to_radians().cos(),
        }
    }

    fn distance_squared(&self, lat_a: f64, lon_a: f64, lat_b: f64, lon_b: f64) -> f64 {
        let dy = lat_a - lat_b;
        let dx = (lon_a - lon_b) * self.lon_scale;
        dx * dx + dy * dy
    }
}

/// Index of the closest sample accepted by `filter`; ties go to the lowest index.
fn nearest(
    samples: &[Sample],
    metric: &FlatEarth,
    lat: f64,
    lon: f64,
    filter: impl Fn(&Sample) -> bool,
) -> Option<usize> {
    let mut best: Option<(usize, f64)> = None;
    for (i, sample) in samples.iter().enumerate() {
        if !filter(sample) {
            continue;
        }
        let d2 = metric.distance_squared(lat, lon, sample.lat, sample.lon);
        if best.map_or(true, |(_, best_d2)| d2 < best_d2) {
            best = Some((i, d2));
        }
    }
    best.map(|(i, _)| i)
}

fn nearest_category(samples: &[Sample], metric: &FlatEarth, lat: f64, lon: f64) -> Option<String> {
    nearest(samples, metric, lat, lon, |s| s.category.is_some())
        .and_then(|i| samples[i].category.clone())
}
