//! # Survey Model
//!
//! The field record crate - survey points, free-text descriptions, and the
//! store that owns every survey. This crate is the single source of truth for
//! survey data and does not contain any inference or mapping logic.

pub mod error;
pub mod store;
pub mod survey;

pub use error::*;
pub use store::*;
pub use survey::*;
