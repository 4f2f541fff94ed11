//! Configuration errors.
//!
//! Everything here is detected before a scan starts, so none of it is
//! recoverable: the invoker fixes the file, the flags or the mount and runs
//! again.

use camino::{Utf8Path, Utf8PathBuf};

/// Why a configuration cannot be used.
///
/// # Examples
///
/// ```
/// use camino::Utf8Path;
/// use pdx_core::ConfigError;
///
/// let err = ConfigError::unreachable_root(
///     Utf8Path::new("//lab-nas/pdfs"),
///     std::io::Error::from(std::io::ErrorKind::NotFound),
/// );
/// assert!(err.to_string().starts_with("share root //lab-nas/pdfs is unreachable"));
/// assert!(err.is_share_problem());
/// ```
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// No share root was given in the file, the flags or the environment.
    #[error("no share root configured (set scan.root, --root or PDFDEX_ROOT)")]
    RootNotSet,

    /// The share root could not be stat'ed: missing, not mounted, or a UNC
    /// host that does not answer.
    #[error("share root {root} is unreachable: {source}")]
    UnreachableRoot {
        /// The configured root.
        root: Utf8PathBuf,
        /// The error from the stat call.
        #[source]
        source: std::io::Error,
    },

    /// The share root names a file rather than a directory.
    #[error("share root {0} is a file, not a directory")]
    RootNotDirectory(Utf8PathBuf),

    /// A numeric tunable is outside its usable range.
    #[error("{key} = {value} cannot be used: {reason}")]
    BadTunable {
        /// Dotted config key, e.g. `lock.ttl_secs`.
        key: &'static str,
        /// The rejected value.
        value: u64,
        /// What the value must satisfy.
        reason: &'static str,
    },

    /// The config file could not be read.
    #[error("cannot read config file {path}: {source}")]
    Read {
        /// The config file.
        path: Utf8PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The config file is not valid JSON for [`Config`](crate::Config).
    #[error("config file {path} is malformed: {source}")]
    Malformed {
        /// The config file.
        path: Utf8PathBuf,
        /// Underlying parse error.
        #[source]
        source: serde_json::Error,
    },
}

impl ConfigError {
    /// Creates a [`ConfigError::UnreachableRoot`].
    #[inline]
    pub fn unreachable_root(root: &Utf8Path, source: std::io::Error) -> Self {
        Self::UnreachableRoot {
            root: root.to_owned(),
            source,
        }
    }

    /// Returns `true` when the share root itself is the problem, as opposed
    /// to the config file or a tunable.
    #[must_use]
    pub const fn is_share_problem(&self) -> bool {
        matches!(
            self,
            Self::RootNotSet | Self::UnreachableRoot { .. } | Self::RootNotDirectory(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unreachable_unc_root_names_host_path() {
        let err = ConfigError::unreachable_root(
            Utf8Path::new("//server/share"),
            std::io::Error::new(std::io::ErrorKind::TimedOut, "host did not answer"),
        );
        let msg = err.to_string();
        assert!(msg.contains("//server/share"));
        assert!(msg.contains("host did not answer"));
        assert!(std::error::Error::source(&err).is_some());
    }

    #[test]
    fn test_bad_tunable_display() {
        let err = ConfigError::BadTunable {
            key: "lock.ttl_secs",
            value: 0,
            reason: "must be greater than zero",
        };
        assert_eq!(
            err.to_string(),
            "lock.ttl_secs = 0 cannot be used: must be greater than zero"
        );
        assert!(!err.is_share_problem());
    }

    #[test]
    fn test_share_problems() {
        assert!(ConfigError::RootNotSet.is_share_problem());
        assert!(ConfigError::RootNotDirectory(Utf8PathBuf::from("/mnt/pdfs/readme.txt")).is_share_problem());
    }
}
