//! Core types, errors, and configuration for pdfdex.
//!
//! This crate provides the foundational types used across the workspace:
//!
//! - [`PathSegments`] - a relative file path split into directories and filename
//! - [`ResolvedDate`] / [`PartialDate`] - dates inferred from directory names
//! - [`ScanWindow`] - the explicit set of days a windowed scan may match
//! - [`CatalogEntry`] / [`Provenance`] - the persisted catalog record
//! - [`Config`] - configuration for every component
//! - [`ConfigError`] - configuration loading and validation failures

#![deny(clippy::all)]
#![warn(missing_docs)]

pub mod config;
pub mod error;
pub mod types;

pub use config::{CatalogConfig, Config, LockConfig, ScanConfig, WatchConfig};
pub use error::ConfigError;
pub use types::{
    CatalogEntry, MIN_YEAR, PartialDate, PathSegments, Provenance, ResolvedDate, ScanWindow,
};

/// Type alias for a fast hash map using `FxHash`.
pub type FxHashMap<K, V> = rustc_hash::FxHashMap<K, V>;

/// Type alias for a fast hash set using `FxHash`.
pub type FxHashSet<T> = rustc_hash::FxHashSet<T>;
