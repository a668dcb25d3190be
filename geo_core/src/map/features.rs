//! Structural overlay: contacts and faults along the surveyed traverse.

use serde::{Deserialize, Serialize};

use super::MapPoint;

/// A vertex of an overlay line.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LinePoint {
    pub lat: f64,
    pub lon: f64,
    pub elevation: f64,
}

/// A structural feature drawn over the map.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StructuralFeature {
    /// Boundary between two consecutive points of different category.
    Contact {
        between: [String; 2],
        line: Vec<LinePoint>,
    },
    /// Largest elevation step along the traverse.
    Fault {
        from_index: usize,
        to_index: usize,
        /// Signed elevation change in metres.
        displacement: f64,
        line: Vec<LinePoint>,
    },
}

/// Contact lines between consecutive classified points of differing category.
///
/// Unclassified points are skipped, so a contact can span several survey stops.
pub fn detect_contacts(points: &[MapPoint], samples: usize) -> Vec<StructuralFeature> {
    let classified: Vec<(&MapPoint, &str)> = points
        .iter()
        .filter_map(|p| p.category.as_deref().map(|c| (p, c)))
        .collect();

    classified
        .windows(2)
        .filter_map(|pair| {
            let [(a, a_cat), (b, b_cat)] = pair else {
                return None;
            };
            (!a_cat.eq_ignore_ascii_case(b_cat)).then(|| StructuralFeature::Contact {
                between: [a_cat.to_string(), b_cat.to_string()],
                line: linspace(a, b, samples),
            })
        })
        .collect()
}

/// The fault at the largest consecutive elevation change above `threshold`.
///
/// The first step wins a tie.
pub fn detect_fault(points: &[MapPoint], threshold: f64) -> Option<StructuralFeature> {
    let mut steepest: Option<(usize, f64)> = None;
    for (i, pair) in points.windows(2).enumerate() {
        let change = pair[1].elevation - pair[0].elevation;
        if steepest.map_or(true, |(_, best)| change.abs() > best.abs()) {
            steepest = Some((i, change));
        }
    }

    let (from_index, displacement) = steepest?;
    if displacement.abs() <= threshold {
        return None;
    }
    let (a, b) = (&points[from_index], &points[from_index + 1]);
    Some(StructuralFeature::Fault {
        from_index,
        to_index: from_index + 1,
        displacement,
        line: vec![LinePoint::from(a), LinePoint::from(b)],
    })
}

impl From<&MapPoint> for LinePoint {
    fn from(point: &MapPoint) -> Self {
        Self {
            lat: point.lat,
            lon: point.lon,
            elevation: point.elevation,
        }
    }
}

/// `samples` evenly spaced points from `a` to `b` inclusive (at least two).
fn linspace(a: &MapPoint, b: &MapPoint, samples: usize) -> Vec<LinePoint> {
    let samples = samples.max(2);
    let last = (samples - 1) as f64;
    (0..samples)
        .map(|i| {
            let t = i as f64 / last;
            LinePoint {
                lat: lerp(a.lat, b.lat, t),
                lon: lerp(a.lon, b.lon, t),
                elevation: lerp(a.elevation, b.elevation, t),
            }
        })
        .collect()
}

/// Exact at both ends.
fn lerp(a: f64, b: f64, t: f64) -> f64 {
    a * (1.0 - t) + b * t
}
