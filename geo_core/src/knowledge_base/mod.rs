//! Knowledge Base module - read-only catalogs of rocks and minerals.
//!
//! The knowledge base consists of:
//! - **Records**: Named entries with sparse, typed attributes
//! - **Catalogs**: One per record kind, keyed by case-insensitive name
//! - **Queries**: Comparison expressions evaluated against every record
//! - **Sources**: Catalog documents merged under a conflict-reject policy

mod catalog;
mod query;
mod record;
mod source;

pub use catalog::*;
pub use query::*;
pub use record::*;
pub use source::*;
