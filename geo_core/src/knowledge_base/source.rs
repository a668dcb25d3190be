//! Catalog documents and the sources that deliver them.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use super::{Record, RecordKind};
use crate::{KnowledgeError, Result};

/// On-disk catalog layout: `{"minerals": [...], "rocks": [...]}`.
///
/// Either list may be absent, so a file holding only minerals is valid.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CatalogDocument {
    #[serde(default)]
    pub minerals: Vec<Record>,

    #[serde(default)]
    pub rocks: Vec<Record>,
}

impl CatalogDocument {
    /// Add a record of the given kind.
    pub fn with_record(mut self, kind: RecordKind, record: Record) -> Self {
        match kind {
            RecordKind::Mineral => self.minerals.push(record),
            RecordKind::Rock => self.rocks.push(record),
        }
        self
    }

    /// All records tagged with their kind, minerals first.
    pub fn into_records(self) -> impl Iterator<Item = (RecordKind, Record)> {
        self.minerals
            .into_iter()
            .map(|r| (RecordKind::Mineral, r))
            .chain(self.rocks.into_iter().map(|r| (RecordKind::Rock, r)))
    }

    pub fn len(&self) -> usize {
        self.minerals.len() + self.rocks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Read a catalog document from a JSON file.
    pub fn read(path: &Path) -> Result<Self> {
        let json = fs::read_to_string(path).map_err(|source| KnowledgeError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&json).map_err(|source| KnowledgeError::Json {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Write the document as pretty JSON, creating parent directories.
    pub fn write(&self, path: &Path) -> Result<()> {
        let io_err = |source| KnowledgeError::Io {
            path: path.to_path_buf(),
            source,
        };
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(io_err)?;
        }
        let json = serde_json::to_string_pretty(self).map_err(|source| KnowledgeError::Json {
            path: path.to_path_buf(),
            source,
        })?;
        fs::write(path, json).map_err(io_err)
    }
}

/// Collaborator that delivers new records to merge into the knowledge base.
///
/// Network fetching lives outside this crate; implementations only hand
/// back a document.
pub trait KnowledgeSource {
    /// Human-readable source name for logs.
    fn name(&self) -> String;

    fn fetch(&self) -> Result<CatalogDocument>;
}

/// A catalog document stored on disk.
#[derive(Debug, Clone)]
pub struct CatalogFile {
    path: PathBuf,
}

impl CatalogFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl KnowledgeSource for CatalogFile {
    fn name(&self) -> String {
        self.path.display().to_string()
    }

    fn fetch(&self) -> Result<CatalogDocument> {
        CatalogDocument::read(&self.path)
    }
}
