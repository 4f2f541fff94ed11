//! Error types for the pdx-scanner crate.
//!
//! This module provides [`ScanError`] for traversal and orchestration
//! failures, and [`LockError`] for the scan mutual-exclusion lease.

use std::time::Duration;

use camino::Utf8PathBuf;
use pdx_catalog::CatalogError;

/// Errors that can occur during scanning operations.
///
/// # Error Recovery Strategy
///
/// - **Directory errors** ([`ScanError::ReadDir`], [`ScanError::Timeout`]):
///   log a warning, leave that subtree out of this run, continue
/// - **Primary walk errors** ([`ScanError::Walk`]): fall back to the native
///   traversal tier; fatal only if that fails too
/// - **Catalog and lock errors**: fatal, propagate to the invoker
///
/// # Examples
///
/// ```
/// use pdx_scanner::ScanError;
///
/// fn handle_error(err: &ScanError) -> i32 {
///     match err {
///         err if err.is_busy() => 75,
///         err if err.is_recoverable() => 0,
///         _ => 1,
///     }
/// }
///
/// assert_eq!(handle_error(&ScanError::config("bad root")), 1);
/// ```
#[derive(Debug, thiserror::Error)]
pub enum ScanError {
    /// The primary traversal tier could not walk the tree.
    #[error("failed to walk directory: {0}")]
    Walk(#[from] ignore::Error),

    /// A directory could not be listed.
    #[error("failed to read directory {path}: {source}")]
    ReadDir {
        /// Directory that could not be listed.
        path: Utf8PathBuf,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// A filesystem call exceeded its time budget.
    #[error("filesystem call on {path} timed out after {}ms", after.as_millis())]
    Timeout {
        /// Path being accessed.
        path: Utf8PathBuf,
        /// Budget that was exceeded.
        after: Duration,
    },

    /// Invalid scanner configuration or request.
    #[error("invalid configuration: {0}")]
    Config(String),

    /// A path is not valid UTF-8.
    #[error("path is not valid UTF-8: {}", _0.display())]
    NonUtf8Path(std::path::PathBuf),

    /// The catalog rejected a write or lookup.
    #[error(transparent)]
    Catalog(#[from] CatalogError),

    /// The scan lease could not be taken.
    #[error(transparent)]
    Lock(#[from] LockError),
}

impl ScanError {
    /// Creates a new [`ScanError::ReadDir`] error.
    #[inline]
    pub fn read_dir(path: impl Into<Utf8PathBuf>, source: std::io::Error) -> Self {
        Self::ReadDir {
            path: path.into(),
            source,
        }
    }

    /// Creates a new [`ScanError::Config`] error.
    #[inline]
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Returns `true` if this error only affects one directory or file and
    /// scanning can continue.
    #[inline]
    #[must_use]
    pub const fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Self::ReadDir { .. } | Self::Timeout { .. } | Self::NonUtf8Path(_)
        )
    }

    /// Returns `true` if this error is fatal (scanning should stop).
    #[inline]
    #[must_use]
    pub const fn is_fatal(&self) -> bool {
        !self.is_recoverable()
    }

    /// Returns `true` if another scan holds the lease.
    #[inline]
    #[must_use]
    pub const fn is_busy(&self) -> bool {
        matches!(self, Self::Lock(LockError::Busy { .. }))
    }

    /// Suggested delay before retrying, for busy errors.
    #[must_use]
    pub const fn retry_after(&self) -> Option<Duration> {
        match self {
            Self::Lock(LockError::Busy { retry_after, .. }) => Some(*retry_after),
            _ => None,
        }
    }
}

/// Errors from the scan mutual-exclusion lease.
#[derive(Debug, thiserror::Error)]
pub enum LockError {
    /// Another scan holds the lease and it did not free up within the wait
    /// budget.
    #[error("another scan is running (lease {path}); retry in {}s", retry_after.as_secs())]
    Busy {
        /// Lease file.
        path: Utf8PathBuf,
        /// Suggested delay before retrying.
        retry_after: Duration,
    },

    /// The lease file could not be created, read or removed.
    #[error("lease file {path}: {source}")]
    Io {
        /// Lease file.
        path: Utf8PathBuf,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },
}

impl LockError {
    /// Creates a new [`LockError::Io`] error.
    #[inline]
    pub fn io(path: impl Into<Utf8PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::io;

    use super::*;

    #[test]
    fn test_read_dir_is_recoverable() {
        let err = ScanError::read_dir(
            "HEMATOLOGIA 2026",
            io::Error::new(io::ErrorKind::PermissionDenied, "denied"),
        );
        assert!(err.is_recoverable());
        assert!(!err.is_fatal());
        assert!(err.to_string().contains("HEMATOLOGIA 2026"));
    }

    #[test]
    fn test_timeout_display() {
        let err = ScanError::Timeout {
            path: Utf8PathBuf::from("2025/07"),
            after: Duration::from_millis(1500),
        };
        assert!(err.is_recoverable());
        assert!(err.to_string().contains("1500ms"));
    }

    #[test]
    fn test_config_is_fatal() {
        let err = ScanError::config("root missing");
        assert!(err.is_fatal());
        assert!(!err.is_busy());
        assert_eq!(err.to_string(), "invalid configuration: root missing");
    }

    #[test]
    fn test_busy_carries_retry_after() {
        let err = ScanError::from(LockError::Busy {
            path: Utf8PathBuf::from("pdfdex.lock"),
            retry_after: Duration::from_secs(5),
        });
        assert!(err.is_busy());
        assert!(err.is_fatal());
        assert_eq!(err.retry_after(), Some(Duration::from_secs(5)));
        assert!(err.to_string().contains("retry in 5s"));
    }
}
