//! Configuration structures for pdfdex.
//!
//! This module provides configuration types for all components of the application:
//!
//! - [`ScanConfig`] - Share root, traversal tunables, targeted lookup settings
//! - [`CatalogConfig`] - Catalog database location
//! - [`LockConfig`] - Scan mutual-exclusion lease settings
//! - [`WatchConfig`] - File watcher settings (debouncing, rescan window)
//! - [`Config`] - Root configuration combining all settings
//!
//! All configuration types implement [`Default`] and deserialize with
//! `#[serde(default)]`, so a configuration file only needs the keys it changes.

use std::time::Duration;

use camino::{Utf8Path, Utf8PathBuf};
use serde::{Deserialize, Serialize};

use crate::ConfigError;

/// Configuration for the directory scanner.
///
/// # Examples
///
/// ```
/// use pdx_core::ScanConfig;
///
/// let config = ScanConfig::default();
/// assert_eq!(config.native_stat_skip_threshold, 50_000);
/// assert_eq!(config.targeted_max_days, 7);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScanConfig {
    /// Root of the shared PDF tree.
    pub root: Utf8PathBuf,

    /// Known subject prefixes for the nested Spanish layout
    /// (`"<SUBJECT> <YEAR>"`). Root directories that look like
    /// `"<text> <year>"` are discovered automatically in addition to these.
    pub subjects: Vec<String>,

    /// Above this many files listed by the native fallback under a time
    /// filter, the per-file modification-time check is skipped and every
    /// matching PDF is indexed.
    pub native_stat_skip_threshold: usize,

    /// Largest window (in days) served by the targeted date locator.
    pub targeted_max_days: usize,

    /// Budget for a single filesystem call (and for a primary walk that
    /// stops making progress), in milliseconds. `0` disables the timeout.
    pub io_timeout_ms: u64,

    /// Whether to follow symbolic links while walking.
    pub follow_links: bool,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            root: Utf8PathBuf::new(),
            subjects: Vec::new(),
            native_stat_skip_threshold: 50_000,
            targeted_max_days: 7,
            io_timeout_ms: 30_000,
            follow_links: false,
        }
    }
}

impl ScanConfig {
    /// Returns the filesystem call timeout, if enabled.
    #[must_use]
    pub const fn io_timeout(&self) -> Option<Duration> {
        if self.io_timeout_ms == 0 {
            None
        } else {
            Some(Duration::from_millis(self.io_timeout_ms))
        }
    }
}

/// Configuration for the catalog store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CatalogConfig {
    /// Path to the SQLite catalog file.
    pub path: Utf8PathBuf,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            path: Utf8PathBuf::from("pdfdex.sqlite3"),
        }
    }
}

/// Configuration for the scan mutual-exclusion lease.
///
/// A scan holds the lease for at most `ttl_secs`; after that a new scan may
/// take it over even if the previous holder never released it.
///
/// # Examples
///
/// ```
/// use pdx_core::LockConfig;
///
/// let config = LockConfig::default();
/// assert_eq!(config.ttl_secs, 60);
/// assert_eq!(config.wait_secs, 5);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LockConfig {
    /// Path to the lease file.
    pub path: Utf8PathBuf,
    /// Lease lifetime in seconds.
    pub ttl_secs: u64,
    /// How long to wait for a held lease before giving up.
    pub wait_secs: u64,
    /// Retry delay suggested to callers that found the lease busy.
    pub retry_after_secs: u64,
}

impl Default for LockConfig {
    fn default() -> Self {
        Self {
            path: Utf8PathBuf::from("pdfdex.lock"),
            ttl_secs: 60,
            wait_secs: 5,
            retry_after_secs: 5,
        }
    }
}

impl LockConfig {
    /// Lease lifetime.
    #[must_use]
    pub const fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_secs)
    }

    /// Maximum wait for a held lease.
    #[must_use]
    pub const fn wait(&self) -> Duration {
        Duration::from_secs(self.wait_secs)
    }

    /// Suggested retry delay after a busy result.
    #[must_use]
    pub const fn retry_after(&self) -> Duration {
        Duration::from_secs(self.retry_after_secs)
    }
}

/// Configuration for the file watcher.
///
/// # Examples
///
/// ```
/// use pdx_core::WatchConfig;
///
/// let config = WatchConfig::default();
/// assert_eq!(config.debounce_ms, 1_000);
/// assert!(config.recursive);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(default)]
pub struct WatchConfig {
    /// Debounce window in milliseconds.
    pub debounce_ms: u64,

    /// Whether to watch subdirectories recursively.
    pub recursive: bool,

    /// Look-back window, in minutes, of the scan triggered by a change batch.
    pub since_minutes: u32,
}

impl Default for WatchConfig {
    fn default() -> Self {
        Self {
            debounce_ms: 1_000,
            recursive: true,
            since_minutes: 60,
        }
    }
}

/// Root configuration for pdfdex.
///
/// # Examples
///
/// ```
/// use pdx_core::Config;
///
/// let config = Config::default();
/// let json = serde_json::to_string_pretty(&config).unwrap();
/// assert!(json.contains("native_stat_skip_threshold"));
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Scanner configuration.
    pub scan: ScanConfig,

    /// Catalog configuration.
    pub catalog: CatalogConfig,

    /// Scan lock configuration.
    pub lock: LockConfig,

    /// File watcher configuration.
    pub watch: WatchConfig,
}

impl Config {
    /// Loads configuration from a JSON file. Missing keys take their defaults.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Read`] if the file cannot be read and
    /// [`ConfigError::Malformed`] if it is not valid JSON.
    pub fn load(path: &Utf8Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_owned(),
            source,
        })?;
        serde_json::from_str(&raw).map_err(|source| ConfigError::Malformed {
            path: path.to_owned(),
            source,
        })
    }

    /// Checks that the share root is reachable and that tunables are usable.
    ///
    /// # Errors
    ///
    /// Returns a share error ([`ConfigError::is_share_problem`]) when the root
    /// is unset, unreachable or not a directory, and
    /// [`ConfigError::BadTunable`] for unusable lock settings.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let root = &self.scan.root;
        if root.as_str().is_empty() {
            return Err(ConfigError::RootNotSet);
        }
        let meta = std::fs::metadata(root)
            .map_err(|source| ConfigError::unreachable_root(root, source))?;
        if !meta.is_dir() {
            return Err(ConfigError::RootNotDirectory(root.clone()));
        }
        if self.lock.ttl_secs == 0 {
            return Err(ConfigError::BadTunable {
                key: "lock.ttl_secs",
                value: 0,
                reason: "must be greater than zero",
            });
        }
        if self.lock.ttl_secs <= self.lock.wait_secs {
            return Err(ConfigError::BadTunable {
                key: "lock.wait_secs",
                value: self.lock.wait_secs,
                reason: "must be shorter than lock.ttl_secs",
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scan_config_defaults() {
        let config = ScanConfig::default();
        assert!(config.subjects.is_empty());
        assert_eq!(config.native_stat_skip_threshold, 50_000);
        assert_eq!(config.io_timeout(), Some(Duration::from_secs(30)));
        assert!(!config.follow_links);
    }

    #[test]
    fn test_io_timeout_disabled() {
        let config = ScanConfig {
            io_timeout_ms: 0,
            ..ScanConfig::default()
        };
        assert_eq!(config.io_timeout(), None);
    }

    #[test]
    fn test_lock_config_durations() {
        let config = LockConfig::default();
        assert_eq!(config.ttl(), Duration::from_secs(60));
        assert_eq!(config.wait(), Duration::from_secs(5));
        assert_eq!(config.retry_after(), Duration::from_secs(5));
    }

    #[test]
    fn test_config_serialization() {
        let config = Config::default();
        let json = serde_json::to_string(&config).unwrap();
        let parsed: Config = serde_json::from_str(&json).unwrap();
        assert_eq!(config, parsed);
    }

    #[test]
    fn test_config_deserialize_with_missing_fields() {
        let json = r#"{"scan": {"root": "/mnt/labs", "subjects": ["HEMATOLOGIA"]}}"#;
        let config: Config = serde_json::from_str(json).unwrap();
        assert_eq!(config.scan.root, "/mnt/labs");
        assert_eq!(config.scan.subjects, vec!["HEMATOLOGIA"]);
        assert_eq!(config.scan.targeted_max_days, 7);
        assert_eq!(config.lock.ttl_secs, 60);
        assert_eq!(config.watch.since_minutes, 60);
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = Utf8PathBuf::from_path_buf(dir.path().join("pdfdex.json")).unwrap();
        std::fs::write(&path, r#"{"lock": {"wait_secs": 2}}"#).unwrap();
        let config = Config::load(&path).unwrap();
        assert_eq!(config.lock.wait_secs, 2);
    }

    #[test]
    fn test_validate_rejects_missing_root() {
        let mut config = Config::default();
        assert!(matches!(config.validate(), Err(ConfigError::RootNotSet)));
        config.scan.root = Utf8PathBuf::from("/nonexistent/pdfdex/share");
        assert!(matches!(
            config.validate(),
            Err(ConfigError::UnreachableRoot { .. })
        ));
    }

    #[test]
    fn test_validate_rejects_file_root() {
        let dir = tempfile::TempDir::new().unwrap();
        let file = dir.path().join("share.pdf");
        std::fs::write(&file, b"%PDF").unwrap();
        let mut config = Config::default();
        config.scan.root = Utf8PathBuf::from_path_buf(file).unwrap();
        assert!(matches!(
            config.validate(),
            Err(ConfigError::RootNotDirectory(_))
        ));
    }

    #[test]
    fn test_load_reports_file_path() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = Utf8PathBuf::from_path_buf(dir.path().join("pdfdex.json")).unwrap();
        std::fs::write(&path, "{ not json").unwrap();
        let err = Config::load(&path).unwrap_err();
        assert!(matches!(err, ConfigError::Malformed { .. }));
        assert!(err.to_string().contains("pdfdex.json"));

        let missing = Utf8PathBuf::from_path_buf(dir.path().join("absent.json")).unwrap();
        assert!(matches!(
            Config::load(&missing),
            Err(ConfigError::Read { .. })
        ));
    }

    #[test]
    fn test_validate_rejects_wait_longer_than_ttl() {
        let dir = tempfile::TempDir::new().unwrap();
        let mut config = Config::default();
        config.scan.root = Utf8PathBuf::from_path_buf(dir.path().to_path_buf()).unwrap();
        assert!(config.validate().is_ok());
        config.lock.wait_secs = 90;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::BadTunable { key: "lock.wait_secs", value: 90, .. })
        ));
    }
}
