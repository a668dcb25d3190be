//! # Geo Core
//!
//! Turns field surveys into geological maps. This crate reads surveys from
//! `survey_model`, answers attribute queries over the rock/mineral knowledge
//! base, and interpolates scattered samples into renderable rasters.
//!
//! ## Core Components
//!
//! - **knowledge_base**: Rock and mineral catalogs with a comparison query engine
//! - **inference**: Best-guess category for free-text field descriptions
//! - **interpolation**: IDW elevation and nearest-neighbour category grids
//! - **map**: Packages grids, legend and overlays for a renderer
//! - **classifier**: Seam for the external image classifier
//! - **config**: TOML configuration with defaults for every setting
//!
//! ## Design Philosophy
//!
//! - **Read-only knowledge**: The knowledge base is built once and shared by reference
//! - **Pure computation**: Inference and interpolation are deterministic functions of their inputs
//! - **Collaborators at the edge**: Classification, rendering and fetching are traits

pub mod classifier;
pub mod config;
pub mod error;
pub mod inference;
pub mod interpolation;
pub mod knowledge_base;
pub mod map;

pub use classifier::*;
pub use config::*;
pub use error::*;
pub use inference::*;
pub use interpolation::*;
pub use knowledge_base::*;
pub use map::*;
