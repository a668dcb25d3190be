//! Knowledge Base - the catalog of rock and mineral records.

use std::collections::BTreeMap;
use std::path::Path;

use super::{CatalogDocument, KnowledgeSource, Query, Record, RecordKind};
use crate::{KnowledgeError, QuerySyntaxError, Result};

/// Records of one kind, keyed by lowercase name.
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    records: BTreeMap<String, Record>,
}

impl Catalog {
    /// Look up a record by name, ignoring case.
    pub fn get(&self, name: &str) -> Option<&Record> {
        self.records.get(&name.trim().to_lowercase())
    }

    /// Records in name order.
    pub fn iter(&self) -> impl Iterator<Item = &Record> {
        self.records.values()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// Outcome of merging a batch of records.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MergeReport {
    /// Records that were not present before.
    pub added: usize,
    /// Records identical to an existing definition.
    pub unchanged: usize,
}

/// The rock and mineral knowledge base.
///
/// Built once at startup and then shared by reference. Every merge follows the
/// same policy: a record whose name already exists with different attributes
/// is rejected with [`KnowledgeError::DuplicateRecord`], an identical
/// redefinition is a no-op, and a rejected batch leaves the catalogs untouched.
#[derive(Debug, Clone, Default)]
pub struct KnowledgeBase {
    minerals: Catalog,
    rocks: Catalog,
}

impl KnowledgeBase {
    /// Create a new empty knowledge base.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a knowledge base from catalog documents, merged in order.
    pub fn load(sources: impl IntoIterator<Item = CatalogDocument>) -> Result<Self> {
        let mut kb = Self::new();
        for document in sources {
            kb.merge(document)?;
        }
        tracing::info!(
            target: "geo::knowledge",
            minerals = kb.minerals.len(),
            rocks = kb.rocks.len(),
            "Knowledge base loaded"
        );
        Ok(kb)
    }

    /// Build a knowledge base from catalog files, merged in order.
    pub fn load_files<P: AsRef<Path>>(paths: impl IntoIterator<Item = P>) -> Result<Self> {
        let documents = paths
            .into_iter()
            .map(|p| CatalogDocument::read(p.as_ref()))
            .collect::<Result<Vec<_>>>()?;
        Self::load(documents)
    }

    /// Merge a batch of records. The batch is applied entirely or not at all.
    pub fn merge(&mut self, document: CatalogDocument) -> Result<MergeReport> {
        let mut staged: BTreeMap<(RecordKind, String), Record> = BTreeMap::new();
        let mut report = MergeReport::default();

        for (kind, record) in document.into_records() {
            let key = record.key();
            let existing = self
                .catalog(kind)
                .records
                .get(&key)
                .or_else(|| staged.get(&(kind, key.clone())));

            match existing {
                Some(current) if current.attributes == record.attributes => {
                    report.unchanged += 1;
                }
                Some(_) => {
                    tracing::debug!(
                        target: "geo::knowledge",
                        %kind,
                        name = %record.name,
                        "Rejecting conflicting record"
                    );
                    return Err(KnowledgeError::DuplicateRecord {
                        kind,
                        name: record.name,
                    });
                }
                None => {
                    staged.insert((kind, key), record);
                }
            }
        }

        report.added = staged.len();
        for ((kind, key), record) in staged {
            self.catalog_mut(kind).records.insert(key, record);
        }
        Ok(report)
    }

    /// Add a single record under the same conflict policy as [`Self::merge`].
    pub fn insert(&mut self, kind: RecordKind, record: Record) -> Result<bool> {
        let report = self.merge(CatalogDocument::default().with_record(kind, record))?;
        Ok(report.added == 1)
    }

    /// Fetch from an online-learning source and merge the result.
    pub fn update_from(&mut self, source: &dyn KnowledgeSource) -> Result<MergeReport> {
        let document = source.fetch()?;
        let fetched = document.len();
        let report = self.merge(document)?;
        tracing::info!(
            target: "geo::knowledge",
            source = %source.name(),
            fetched,
            added = report.added,
            unchanged = report.unchanged,
            "Knowledge base updated"
        );
        Ok(report)
    }

    pub fn catalog(&self, kind: RecordKind) -> &Catalog {
        match kind {
            RecordKind::Mineral => &self.minerals,
            RecordKind::Rock => &self.rocks,
        }
    }

    fn catalog_mut(&mut self, kind: RecordKind) -> &mut Catalog {
        match kind {
            RecordKind::Mineral => &mut self.minerals,
            RecordKind::Rock => &mut self.rocks,
        }
    }

    /// Get a record of a specific kind by name.
    pub fn get(&self, kind: RecordKind, name: &str) -> Option<&Record> {
        self.catalog(kind).get(name)
    }

    /// Find a record by name in either catalog, minerals first.
    pub fn find(&self, name: &str) -> Option<(RecordKind, &Record)> {
        RecordKind::ALL
            .into_iter()
            .find_map(|kind| self.get(kind, name).map(|r| (kind, r)))
    }

    /// Like [`Self::find`] but reports a missing name as an error.
    pub fn require(&self, name: &str) -> Result<(RecordKind, &Record)> {
        self.find(name)
            .ok_or_else(|| KnowledgeError::NotFound(name.to_string()))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.find(name).is_some()
    }

    /// All records tagged with their kind: minerals first, each in name order.
    pub fn records(&self) -> impl Iterator<Item = (RecordKind, &Record)> {
        RecordKind::ALL
            .into_iter()
            .flat_map(move |kind| self.catalog(kind).iter().map(move |r| (kind, r)))
    }

    /// Search both catalogs with a comparison expression.
    pub fn search(&self, expression: &str) -> std::result::Result<Vec<&Record>, QuerySyntaxError> {
        let query = Query::parse(expression)?;
        Ok(self.search_query(&query))
    }

    /// Search one catalog with a comparison expression.
    pub fn search_in(
        &self,
        kind: RecordKind,
        expression: &str,
    ) -> std::result::Result<Vec<&Record>, QuerySyntaxError> {
        let query = Query::parse(expression)?;
        Ok(self.catalog(kind).iter().filter(|r| query.matches(r)).collect())
    }

    /// Evaluate an already parsed query against both catalogs.
    pub fn search_query(&self, query: &Query) -> Vec<&Record> {
        self.records()
            .filter(|(_, r)| query.matches(r))
            .map(|(_, r)| r)
            .collect()
    }

    /// Snapshot every record as a catalog document.
    pub fn to_document(&self) -> CatalogDocument {
        CatalogDocument {
            minerals: self.minerals.iter().cloned().collect(),
            rocks: self.rocks.iter().cloned().collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.minerals.len() + self.rocks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::AttributeValue;

    fn minerals() -> CatalogDocument {
        CatalogDocument::default()
            .with_record(
                RecordKind::Mineral,
                Record::new("Quartz")
                    .with_attribute("hardness", 7.0)
                    .with_attribute("color", "white"),
            )
            .with_record(
                RecordKind::Mineral,
                Record::new("Talc")
                    .with_attribute("hardness", 1.0)
                    .with_attribute("color", "white"),
            )
            .with_record(
                RecordKind::Mineral,
                Record::new("Corundum")
                    .with_attribute("hardness", 9.0)
                    .with_attribute("color", "red"),
            )
    }

    fn rocks() -> CatalogDocument {
        CatalogDocument::default()
            .with_record(RecordKind::Rock, Record::new("Granite").with_attribute("grain", "coarse"))
            .with_record(RecordKind::Rock, Record::new("Basalt").with_attribute("grain", "fine"))
    }

    fn names(records: Vec<&Record>) -> Vec<&str> {
        records.into_iter().map(|r| r.name.as_str()).collect()
    }

    #[test]
    fn test_load_and_lookup() {
        let kb = KnowledgeBase::load([minerals(), rocks()]).unwrap();

        assert_eq!(kb.len(), 5);
        assert_eq!(kb.catalog(RecordKind::Mineral).len(), 3);
        assert!(kb.get(RecordKind::Mineral, "quartz").is_some());
        assert!(kb.get(RecordKind::Rock, "quartz").is_none());

        let (kind, record) = kb.find("GRANITE").unwrap();
        assert_eq!(kind, RecordKind::Rock);
        assert_eq!(record.name, "Granite");
        assert!(matches!(kb.require("Obsidian"), Err(KnowledgeError::NotFound(_))));
    }

    #[test]
    fn test_search_hardness() {
        let kb = KnowledgeBase::load([CatalogDocument::default()
            .with_record(RecordKind::Mineral, Record::new("Quartz").with_attribute("hardness", 7.0))
            .with_record(RecordKind::Mineral, Record::new("Talc").with_attribute("hardness", 1.0))])
        .unwrap();

        assert_eq!(names(kb.search("hardness>5").unwrap()), vec!["Quartz"]);
    }

    #[test]
    fn test_search_conjunction() {
        let kb = KnowledgeBase::load([minerals(), rocks()]).unwrap();
        let hits = kb.search(r#"hardness>5 AND color=="white""#).unwrap();
        assert_eq!(names(hits), vec!["Quartz"]);
    }

    #[test]
    fn test_search_spans_catalogs_in_order() {
        let kb = KnowledgeBase::load([rocks(), minerals()]).unwrap();
        let hits = kb.search("hardness > 5 OR grain == 'coarse'").unwrap();
        assert_eq!(names(hits), vec!["Corundum", "Quartz", "Granite"]);

        let rocks_only = kb.search_in(RecordKind::Rock, "grain != 'fine'").unwrap();
        assert_eq!(names(rocks_only), vec!["Granite"]);
    }

    #[test]
    fn test_search_syntax_error() {
        let kb = KnowledgeBase::load([minerals()]).unwrap();
        let err = kb.search("hardness >").unwrap_err();
        assert_eq!(err.token, "<end>");
    }

    #[test]
    fn test_conflicting_redefinition_rejected() {
        let mut kb = KnowledgeBase::load([minerals()]).unwrap();
        let conflicting = CatalogDocument::default()
            .with_record(RecordKind::Mineral, Record::new("Fluorite").with_attribute("hardness", 4.0))
            .with_record(RecordKind::Mineral, Record::new("quartz").with_attribute("hardness", 6.0));

        let err = kb.merge(conflicting).unwrap_err();
        assert!(matches!(
            err,
            KnowledgeError::DuplicateRecord { kind: RecordKind::Mineral, ref name } if name == "quartz"
        ));
        // Nothing from the rejected batch is applied.
        assert!(kb.find("Fluorite").is_none());
        assert_eq!(
            kb.get(RecordKind::Mineral, "Quartz").unwrap().attribute("hardness"),
            Some(&AttributeValue::Number(7.0))
        );
    }

    #[test]
    fn test_conflict_within_one_batch() {
        let batch = CatalogDocument::default()
            .with_record(RecordKind::Rock, Record::new("Shale").with_attribute("grain", "fine"))
            .with_record(RecordKind::Rock, Record::new("Shale").with_attribute("grain", "medium"));
        assert!(matches!(
            KnowledgeBase::load([batch]),
            Err(KnowledgeError::DuplicateRecord { .. })
        ));
    }

    #[test]
    fn test_identical_redefinition_is_noop() {
        let mut kb = KnowledgeBase::load([minerals()]).unwrap();
        let report = kb.merge(minerals()).unwrap();
        assert_eq!(report, MergeReport { added: 0, unchanged: 3 });
        assert_eq!(kb.len(), 3);
    }

    #[test]
    fn test_same_name_in_both_catalogs() {
        let mut kb = KnowledgeBase::new();
        assert!(kb.insert(RecordKind::Mineral, Record::new("Jade")).unwrap());
        assert!(kb.insert(RecordKind::Rock, Record::new("Jade")).unwrap());
        assert!(!kb.insert(RecordKind::Rock, Record::new("jade")).unwrap());
        assert_eq!(kb.find("jade").unwrap().0, RecordKind::Mineral);
    }

    struct StaticSource(CatalogDocument);

    impl KnowledgeSource for StaticSource {
        fn name(&self) -> String {
            "static".to_string()
        }

        fn fetch(&self) -> Result<CatalogDocument> {
            Ok(self.0.clone())
        }
    }

    #[test]
    fn test_update_from_source() {
        let mut kb = KnowledgeBase::load([minerals()]).unwrap();
        let report = kb.update_from(&StaticSource(rocks())).unwrap();
        assert_eq!(report.added, 2);
        assert!(kb.contains("Basalt"));

        let snapshot = kb.to_document();
        assert_eq!(snapshot.minerals.len(), 3);
        assert_eq!(snapshot.rocks.len(), 2);
    }
}
