//! In-memory catalog backend.

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use pdx_core::{CatalogEntry, FxHashMap};

use crate::query::listing_order;
use crate::{Catalog, CatalogError, CatalogPage, CatalogQuery, UpsertOutcome};

/// A catalog held entirely in memory.
///
/// Reads take a shared lock; upserts take the write lock for the whole
/// compare-and-store so two writers for one path cannot interleave.
#[derive(Debug, Default)]
pub struct MemoryCatalog {
    entries: RwLock<FxHashMap<String, CatalogEntry>>,
    last_sync: RwLock<Option<DateTime<Utc>>>,
}

impl MemoryCatalog {
    /// Creates an empty catalog.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns every entry in listing order.
    #[must_use]
    pub fn snapshot(&self) -> Vec<CatalogEntry> {
        let mut entries: Vec<_> = self.entries.read().values().cloned().collect();
        entries.sort_by(listing_order);
        entries
    }
}

impl Catalog for MemoryCatalog {
    fn upsert(&self, entry: &CatalogEntry) -> Result<UpsertOutcome, CatalogError> {
        let mut entries = self.entries.write();
        let outcome = match entries.get(&entry.path) {
            None => UpsertOutcome::Inserted,
            Some(existing) if existing == entry => return Ok(UpsertOutcome::Unchanged),
            Some(_) => UpsertOutcome::Updated,
        };
        entries.insert(entry.path.clone(), entry.clone());
        Ok(outcome)
    }

    fn get(&self, path: &str) -> Result<Option<CatalogEntry>, CatalogError> {
        Ok(self.entries.read().get(path).cloned())
    }

    fn len(&self) -> Result<usize, CatalogError> {
        Ok(self.entries.read().len())
    }

    fn query(&self, query: &CatalogQuery) -> Result<CatalogPage, CatalogError> {
        let mut matching: Vec<_> = self
            .entries
            .read()
            .values()
            .filter(|entry| query.matches(entry))
            .cloned()
            .collect();
        matching.sort_by(listing_order);

        let total = matching.len();
        let entries = matching
            .into_iter()
            .skip(query.offset())
            .take(query.effective_per_page())
            .collect();

        Ok(CatalogPage {
            entries,
            total,
            page: query.effective_page(),
            per_page: query.effective_per_page(),
        })
    }

    fn last_sync(&self) -> Result<Option<DateTime<Utc>>, CatalogError> {
        Ok(*self.last_sync.read())
    }

    fn set_last_sync(&self, at: DateTime<Utc>) -> Result<(), CatalogError> {
        *self.last_sync.write() = Some(at);
        Ok(())
    }
}
