//! Error types for the pdx-catalog crate.

use camino::Utf8PathBuf;

/// Errors raised by a [`Catalog`](crate::Catalog) backend.
///
/// # Examples
///
/// ```
/// use pdx_catalog::CatalogError;
///
/// let err = CatalogError::invalid_value("2025/07/19/x.pdf", "source", "unknown tag");
/// assert!(err.is_recoverable());
/// assert!(err.to_string().contains("2025/07/19/x.pdf"));
/// ```
#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    /// The underlying SQLite database failed.
    #[error("catalog database error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// A stored row could not be turned back into a catalog entry.
    #[error("invalid stored value in column '{column}' for {path}: {reason}")]
    InvalidValue {
        /// Catalog key of the offending row.
        path: String,
        /// Column holding the bad value.
        column: &'static str,
        /// What was wrong with it.
        reason: String,
    },

    /// The directory holding the catalog file could not be prepared.
    #[error("failed to prepare catalog location {path}: {source}")]
    Io {
        /// Catalog file path.
        path: Utf8PathBuf,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },
}

impl CatalogError {
    /// Creates a new [`CatalogError::InvalidValue`] error.
    #[inline]
    pub fn invalid_value(
        path: impl Into<String>,
        column: &'static str,
        reason: impl Into<String>,
    ) -> Self {
        Self::InvalidValue {
            path: path.into(),
            column,
            reason: reason.into(),
        }
    }

    /// Returns `true` if the database reported a busy or locked condition.
    #[must_use]
    pub fn is_busy(&self) -> bool {
        matches!(
            self,
            Self::Sqlite(rusqlite::Error::SqliteFailure(err, _))
                if matches!(
                    err.code,
                    rusqlite::ErrorCode::DatabaseBusy | rusqlite::ErrorCode::DatabaseLocked
                )
        )
    }

    /// Returns `true` if the error concerns a single row and the caller may
    /// carry on with the next one.
    #[inline]
    #[must_use]
    pub const fn is_recoverable(&self) -> bool {
        matches!(self, Self::InvalidValue { .. })
    }

    /// Returns `true` if the catalog cannot be used any further.
    #[inline]
    #[must_use]
    pub const fn is_fatal(&self) -> bool {
        !self.is_recoverable()
    }
}
