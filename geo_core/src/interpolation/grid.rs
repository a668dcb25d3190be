//! Regular raster grids and their geographic extent.

use serde::{Deserialize, Serialize};

/// Geographic extent of a grid in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bounds {
    pub south: f64,
    pub north: f64,
    pub west: f64,
    pub east: f64,
}

impl Bounds {
    /// Smallest box containing every `(lat, lon)`, or `None` for no points.
    pub fn enclosing(points: impl IntoIterator<Item = (f64, f64)>) -> Option<Self> {
        points.into_iter().fold(None, |bounds, (lat, lon)| {
            Some(match bounds {
                None => Bounds {
                    south: lat,
                    north: lat,
                    west: lon,
                    east: lon,
                },
                Some(b) => Bounds {
                    south: b.south.min(lat),
                    north: b.north.max(lat),
                    west: b.west.min(lon),
                    east: b.east.max(lon),
                },
            })
        })
    }

    /// Grow the box by `margin` degrees on every side.
    pub fn expanded(&self, margin: f64) -> Self {
        Self {
            south: self.south - margin,
            north: self.north + margin,
            west: self.west - margin,
            east: self.east + margin,
        }
    }

    pub fn lat_span(&self) -> f64 {
        self.north - self.south
    }

    pub fn lon_span(&self) -> f64 {
        self.east - self.west
    }

    pub fn contains(&self, lat: f64, lon: f64) -> bool {
        (self.south..=self.north).contains(&lat) && (self.west..=self.east).contains(&lon)
    }
}

/// A row-major raster. Row 0 is the northern edge, column 0 the western edge.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Grid<T> {
    rows: usize,
    cols: usize,
    cells: Vec<T>,
}

impl<T> Grid<T> {
    /// Build a grid from row-major cells. Returns `None` on a size mismatch.
    pub fn from_cells(rows: usize, cols: usize, cells: Vec<T>) -> Option<Self> {
        (rows.checked_mul(cols) == Some(cells.len())).then_some(Self { rows, cols, cells })
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    pub fn get(&self, row: usize, col: usize) -> Option<&T> {
        if row >= self.rows || col >= self.cols {
            return None;
        }
        self.cells.get(row * self.cols + col)
    }

    /// Iterate rows from north to south.
    pub fn iter_rows(&self) -> impl Iterator<Item = &[T]> {
        self.cells.chunks(self.cols.max(1))
    }

    pub fn cells(&self) -> &[T] {
        &self.cells
    }
}

impl<T: Clone> Grid<T> {
    /// A grid with every cell set to `value`, or `None` if the size overflows.
    pub fn filled(rows: usize, cols: usize, value: T) -> Option<Self> {
        let len = rows.checked_mul(cols)?;
        Some(Self {
            rows,
            cols,
            cells: vec![value; len],
        })
    }
}

/// Interpolated elevation in metres.
pub type ElevationGrid = Grid<f64>;

/// Nearest category per cell; `None` is unclassified.
pub type CategoryGrid = Grid<Option<String>>;
