//! Catalog membership checks
//!
//! A site checks new records against the catalog by one key, held fixed for
//! the site's lifetime. Ids are always unique regardless of the key.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use super::identity::canonical_url;
use crate::types::VideoRecord;

/// Field a site's records are deduplicated by
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DedupKey {
    /// Record id
    Id,
    /// Canonical embed URL
    #[default]
    EmbedUrl,
}

/// Identifiers already present in a catalog
#[derive(Debug, Clone, Default)]
pub struct DedupIndex {
    ids: HashSet<String>,
    embed_urls: HashSet<String>,
}

impl DedupIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build the index from existing records
    pub fn from_records<'a>(records: impl IntoIterator<Item = &'a VideoRecord>) -> Self {
        let mut index = Self::new();
        for record in records {
            index.insert(record);
        }
        index
    }

    /// Whether a record with this id is present
    pub fn contains_id(&self, id: &str) -> bool {
        self.ids.contains(id)
    }

    /// Whether a record with this embed URL is present
    pub fn contains_embed_url(&self, embed_url: &str) -> bool {
        self.embed_urls.contains(&canonical_url(embed_url))
    }

    /// Whether `record` is already known under `key`
    pub fn is_known(&self, record: &VideoRecord, key: DedupKey) -> bool {
        if self.contains_id(&record.id) {
            return true;
        }
        match key {
            DedupKey::Id => false,
            DedupKey::EmbedUrl => self.contains_embed_url(&record.embed_url),
        }
    }

    /// Register a record
    pub fn insert(&mut self, record: &VideoRecord) {
        self.ids.insert(record.id.clone());
        self.embed_urls.insert(canonical_url(&record.embed_url));
    }

    /// Number of distinct ids
    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
}
