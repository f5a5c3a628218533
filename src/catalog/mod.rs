//! The persisted video catalog
//!
//! The catalog is an ordered list of records. Merging is pure and only ever
//! appends: existing records keep their position and content, and a
//! discovered record is added only if the catalog does not already know it.

mod store;

pub use store::{CatalogError, LoadStatus};

use std::collections::BTreeMap;

use crate::scraping::{DedupIndex, Discovery};
use crate::types::VideoRecord;

/// Ordered collection of video records
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Catalog {
    records: Vec<VideoRecord>,
}

impl Catalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_records(records: Vec<VideoRecord>) -> Self {
        Self { records }
    }

    pub fn records(&self) -> &[VideoRecord] {
        &self.records
    }

    pub fn into_records(self) -> Vec<VideoRecord> {
        self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Membership index over all records
    pub fn index(&self) -> DedupIndex {
        DedupIndex::from_records(&self.records)
    }

    /// Number of records per category, sorted by category
    pub fn category_counts(&self) -> BTreeMap<String, usize> {
        let mut counts = BTreeMap::new();
        for record in &self.records {
            *counts.entry(record.category.clone()).or_insert(0) += 1;
        }
        counts
    }
}

/// Result of merging discoveries into a catalog
#[derive(Debug, Clone)]
pub struct MergeOutcome {
    pub catalog: Catalog,
    /// Records appended
    pub added: usize,
    /// Discoveries already present
    pub skipped: usize,
}

/// Append the discoveries `existing` does not already contain.
///
/// Each discovery is checked by its site's dedup key; ids are unique
/// regardless. Order of both inputs is preserved.
pub fn merge(existing: &Catalog, discovered: &[Discovery]) -> MergeOutcome {
    let mut index = existing.index();
    let mut records = existing.records.clone();
    let mut added = 0;
    let mut skipped = 0;

    for discovery in discovered {
        if index.is_known(&discovery.record, discovery.dedup_key) {
            skipped += 1;
            continue;
        }
        index.insert(&discovery.record);
        records.push(discovery.record.clone());
        added += 1;
    }

    MergeOutcome {
        catalog: Catalog { records },
        added,
        skipped,
    }
}
