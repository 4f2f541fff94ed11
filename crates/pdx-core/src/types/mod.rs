//! Domain types for pdfdex.
//!
//! # Module Organization
//!
//! - [`date`] - Resolved and partial calendar dates
//! - [`entry`] - Catalog records and their provenance
//! - [`segments`] - Relative paths split into directory segments
//! - [`window`] - Explicit day sets for windowed scans
//!
//! All public types are re-exported here and at the crate root:
//!
//! ```
//! use pdx_core::{PathSegments, ResolvedDate, ScanWindow};
//! ```

mod date;
mod entry;
mod segments;
mod window;

pub use date::{MIN_YEAR, PartialDate, ResolvedDate};
pub use entry::{CatalogEntry, Provenance};
pub use segments::PathSegments;
pub use window::ScanWindow;
