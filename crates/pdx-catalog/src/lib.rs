//! Upsert-by-path catalog of dated PDF documents.
//!
//! The scanner only needs one write operation, [`Catalog::upsert`], keyed by
//! the normalized relative path. Entries are never deleted here; a path that
//! disappears from the share keeps its row until something else removes it.
//!
//! # Backends
//!
//! - [`SqliteCatalog`]: the persistent store, one `pdf_documents` table with a
//!   unique `path` column plus a small key/value table for the last-sync
//!   marker.
//! - [`MemoryCatalog`]: an `FxHashMap` behind a `RwLock`, for tests and dry
//!   tooling.
//!
//! # Example
//!
//! ```
//! use pdx_catalog::{Catalog, MemoryCatalog, UpsertOutcome};
//! use pdx_core::{CatalogEntry, ResolvedDate};
//!
//! let catalog = MemoryCatalog::new();
//! let date = ResolvedDate::with_max_year(2025, 7, 19, 2027).unwrap();
//! let entry = CatalogEntry::remote("2025/07/19/1174621.pdf", "1174621.pdf", date);
//!
//! assert_eq!(catalog.upsert(&entry).unwrap(), UpsertOutcome::Inserted);
//! assert_eq!(catalog.upsert(&entry).unwrap(), UpsertOutcome::Unchanged);
//! assert_eq!(catalog.len().unwrap(), 1);
//! ```

#![deny(clippy::all)]
#![warn(missing_docs)]

mod error;
mod memory;
pub mod query;
mod sqlite;

pub use error::CatalogError;
pub use memory::MemoryCatalog;
pub use query::{CatalogPage, CatalogQuery};
pub use sqlite::SqliteCatalog;

use chrono::{DateTime, Utc};
use pdx_core::CatalogEntry;
use serde::Serialize;

/// What an upsert did to the stored row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum UpsertOutcome {
    /// No row existed for the path.
    Inserted,
    /// A row existed and at least one field changed.
    Updated,
    /// A row existed with identical fields; nothing was written.
    Unchanged,
}

/// The catalog collaborator.
///
/// Implementations take `&self` and synchronize internally so a single
/// catalog can be shared by the scanner and the watcher loop. Upserts for the
/// same path must never race; both backends serialize writes.
pub trait Catalog: Send + Sync {
    /// Inserts or refreshes the entry stored under `entry.path`.
    fn upsert(&self, entry: &CatalogEntry) -> Result<UpsertOutcome, CatalogError>;

    /// Looks up a single entry by path.
    fn get(&self, path: &str) -> Result<Option<CatalogEntry>, CatalogError>;

    /// Number of stored entries.
    fn len(&self) -> Result<usize, CatalogError>;

    /// Returns `true` if the catalog holds no entries.
    fn is_empty(&self) -> Result<bool, CatalogError> {
        Ok(self.len()? == 0)
    }

    /// Lists one page of entries matching `query`.
    fn query(&self, query: &CatalogQuery) -> Result<CatalogPage, CatalogError>;

    /// When the last non-dry scan completed, if ever.
    fn last_sync(&self) -> Result<Option<DateTime<Utc>>, CatalogError>;

    /// Records the completion time of a non-dry scan.
    fn set_last_sync(&self, at: DateTime<Utc>) -> Result<(), CatalogError>;
}
