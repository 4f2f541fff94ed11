//! Catalog records.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::ResolvedDate;

/// Where a cataloged document was found.
///
/// # Examples
///
/// ```
/// use pdx_core::Provenance;
///
/// assert_eq!(Provenance::Remote.as_str(), "remote");
/// assert_eq!("local".parse::<Provenance>(), Ok(Provenance::Local));
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Provenance {
    /// Found on the shared network location by the scanner.
    #[default]
    Remote,
    /// Uploaded directly to local storage.
    Local,
}

impl Provenance {
    /// Returns the stored tag for this provenance.
    #[inline]
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Remote => "remote",
            Self::Local => "local",
        }
    }
}

impl fmt::Display for Provenance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Provenance {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "remote" => Ok(Self::Remote),
            "local" => Ok(Self::Local),
            other => Err(format!("unknown provenance tag: {other}")),
        }
    }
}

/// A persisted catalog record, keyed by its normalized relative path.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct CatalogEntry {
    /// Normalized relative path (forward slashes), unique in the catalog.
    pub path: String,
    /// Display name: the original filename.
    pub name: String,
    /// Date inferred from the directory path.
    pub date: ResolvedDate,
    /// Where the file was found.
    pub provenance: Provenance,
}

impl CatalogEntry {
    /// Creates an entry for a file found on the share.
    #[must_use]
    pub fn remote(path: impl Into<String>, name: impl Into<String>, date: ResolvedDate) -> Self {
        Self {
            path: path.into(),
            name: name.into(),
            date,
            provenance: Provenance::Remote,
        }
    }
}
