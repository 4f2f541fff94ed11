//! Scan mutual exclusion.
//!
//! A scan holds a lease file for at most its TTL. The file is created with
//! `create_new`, so exactly one process wins, and carries a small JSON record
//! naming the holder and the expiry. A lease past its expiry is taken over
//! even if its holder never released it; a crashed scan therefore blocks
//! others for at most one TTL.
//!
//! Removing a lease file is only done while holding an advisory lock on a
//! sibling `.takeover` file, and only after re-reading the lease under it.
//! Two contenders that both saw the same expired lease thus cannot delete
//! each other's fresh one.

use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::time::{Duration, Instant, SystemTime};

use camino::{Utf8Path, Utf8PathBuf};
use chrono::{DateTime, TimeDelta, Utc};
use fs2::FileExt;
use pdx_core::LockConfig;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::LockError;

const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Contents of the lease file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LeaseRecord {
    /// Holder's process id.
    pub pid: u32,
    /// Unique token of this acquisition.
    pub token: String,
    /// When the lease was taken.
    pub acquired_at: DateTime<Utc>,
    /// When the lease may be taken over.
    pub expires_at: DateTime<Utc>,
}

/// The scan lease.
#[derive(Debug, Clone)]
pub struct ScanLock {
    path: Utf8PathBuf,
    ttl: Duration,
    wait: Duration,
    retry_after: Duration,
}

/// Releases the lease on drop.
#[derive(Debug)]
pub struct LockGuard {
    path: Utf8PathBuf,
    token: String,
}

enum Attempt {
    Acquired(LockGuard),
    Held(Option<LeaseRecord>),
}

impl ScanLock {
    /// Creates a lease handle from configuration.
    #[must_use]
    pub fn new(config: &LockConfig) -> Self {
        Self {
            path: config.path.clone(),
            ttl: config.ttl(),
            wait: config.wait(),
            retry_after: config.retry_after(),
        }
    }

    /// Returns the lease file path.
    #[inline]
    #[must_use]
    pub fn path(&self) -> &Utf8Path {
        &self.path
    }

    /// Takes the lease, waiting up to the configured budget.
    ///
    /// # Errors
    ///
    /// Returns [`LockError::Busy`] when another holder keeps the lease past
    /// the wait budget, and [`LockError::Io`] when the lease file cannot be
    /// written.
    pub fn acquire(&self) -> Result<LockGuard, LockError> {
        let deadline = Instant::now() + self.wait;
        loop {
            match self.try_acquire()? {
                Attempt::Acquired(guard) => {
                    info!(lease = %self.path, "scan lease acquired");
                    return Ok(guard);
                }
                Attempt::Held(holder) => {
                    let now = Instant::now();
                    if now >= deadline {
                        debug!(lease = %self.path, holder = ?holder.map(|h| h.pid), "scan lease busy");
                        return Err(LockError::Busy {
                            path: self.path.clone(),
                            retry_after: self.retry_after,
                        });
                    }
                    std::thread::sleep(POLL_INTERVAL.min(deadline - now));
                }
            }
        }
    }

    fn try_acquire(&self) -> Result<Attempt, LockError> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|source| LockError::io(&self.path, source))?;
        }

        let record = self.new_record();
        if let Some(guard) = self.create(&record)? {
            return Ok(Attempt::Acquired(guard));
        }
        let holder = self.read_record();
        if !self.is_expired(holder.as_ref()) {
            return Ok(Attempt::Held(holder));
        }
        self.take_over(&record)
    }

    fn new_record(&self) -> LeaseRecord {
        let acquired_at = Utc::now();
        let ttl = TimeDelta::from_std(self.ttl).unwrap_or(TimeDelta::MAX);
        LeaseRecord {
            pid: std::process::id(),
            token: format!(
                "{}-{:?}-{}",
                std::process::id(),
                std::thread::current().id(),
                acquired_at.timestamp_nanos_opt().unwrap_or_default()
            ),
            acquired_at,
            expires_at: acquired_at.checked_add_signed(ttl).unwrap_or(DateTime::<Utc>::MAX_UTC),
        }
    }

    /// Creates the lease file; `None` when it already exists.
    fn create(&self, record: &LeaseRecord) -> Result<Option<LockGuard>, LockError> {
        match OpenOptions::new().write(true).create_new(true).open(&self.path) {
            Ok(mut file) => {
                let payload = serde_json::to_vec_pretty(record).map_err(io::Error::other);
                if let Err(source) = payload.and_then(|bytes| file.write_all(&bytes)) {
                    fs::remove_file(&self.path).ok();
                    return Err(LockError::io(&self.path, source));
                }
                Ok(Some(LockGuard {
                    path: self.path.clone(),
                    token: record.token.clone(),
                }))
            }
            Err(err) if err.kind() == io::ErrorKind::AlreadyExists => Ok(None),
            Err(source) => Err(LockError::io(&self.path, source)),
        }
    }

    /// Replaces an expired lease. The expiry is checked again under the
    /// takeover lock; a contender that got there first has already written
    /// a live lease by then.
    fn take_over(&self, record: &LeaseRecord) -> Result<Attempt, LockError> {
        let _takeover = TakeoverLock::acquire(&self.path)?;

        let holder = self.read_record();
        if !self.is_expired(holder.as_ref()) {
            return Ok(Attempt::Held(holder));
        }
        warn!(
            lease = %self.path,
            holder = ?holder.as_ref().map(|h| h.pid),
            "taking over expired scan lease"
        );
        match fs::remove_file(&self.path) {
            Ok(()) => {}
            Err(err) if err.kind() == io::ErrorKind::NotFound => {}
            Err(source) => return Err(LockError::io(&self.path, source)),
        }
        match self.create(record)? {
            Some(guard) => Ok(Attempt::Acquired(guard)),
            None => Ok(Attempt::Held(self.read_record())),
        }
    }

    fn read_record(&self) -> Option<LeaseRecord> {
        let raw = fs::read(&self.path).ok()?;
        serde_json::from_slice(&raw).ok()
    }

    /// A readable record decides by its expiry; otherwise the file's age is
    /// compared against the TTL. A file whose age cannot be read counts as
    /// live.
    fn is_expired(&self, holder: Option<&LeaseRecord>) -> bool {
        if let Some(record) = holder {
            return record.expires_at <= Utc::now();
        }
        fs::metadata(&self.path)
            .and_then(|meta| meta.modified())
            .ok()
            .and_then(|modified| SystemTime::now().duration_since(modified).ok())
            .is_some_and(|age| age >= self.ttl)
    }
}

impl LockGuard {
    /// Returns the lease file path.
    #[inline]
    #[must_use]
    pub fn path(&self) -> &Utf8Path {
        &self.path
    }
}

impl Drop for LockGuard {
    fn drop(&mut self) {
        let _takeover = match TakeoverLock::acquire(&self.path) {
            Ok(lock) => lock,
            Err(err) => {
                warn!(lease = %self.path, error = %err, "failed to release scan lease");
                return;
            }
        };
        // Only remove the file if the lease was not taken over meanwhile
        let still_ours = fs::read(&self.path)
            .ok()
            .and_then(|raw| serde_json::from_slice::<LeaseRecord>(&raw).ok())
            .is_some_and(|record| record.token == self.token);
        if !still_ours {
            debug!(lease = %self.path, "scan lease no longer ours, leaving it");
            return;
        }
        match fs::remove_file(&self.path) {
            Ok(()) => debug!(lease = %self.path, "scan lease released"),
            Err(err) => warn!(lease = %self.path, error = %err, "failed to release scan lease"),
        }
    }
}

/// Exclusive advisory lock on `<lease>.takeover`, held while a lease file
/// is removed. The file itself is never deleted.
struct TakeoverLock {
    file: File,
}

impl TakeoverLock {
    fn acquire(lease: &Utf8Path) -> Result<Self, LockError> {
        let path = Utf8PathBuf::from(format!("{lease}.takeover"));
        let file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(false)
            .open(&path)
            .map_err(|source| LockError::io(&path, source))?;
        FileExt::lock_exclusive(&file).map_err(|source| LockError::io(&path, source))?;
        Ok(Self { file })
    }
}

impl Drop for TakeoverLock {
    fn drop(&mut self) {
        FileExt::unlock(&self.file).ok();
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Barrier;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use filetime::FileTime;
    use tempfile::TempDir;

    use super::*;

    fn config(dir: &TempDir, ttl_secs: u64, wait_secs: u64) -> LockConfig {
        LockConfig {
            path: Utf8PathBuf::from_path_buf(dir.path().join("pdfdex.lock")).unwrap(),
            ttl_secs,
            wait_secs,
            retry_after_secs: 7,
        }
    }

    #[test]
    fn test_acquire_and_release() {
        let dir = TempDir::new().unwrap();
        let lock = ScanLock::new(&config(&dir, 60, 0));
        {
            let guard = lock.acquire().unwrap();
            assert!(guard.path().exists());
            let raw = fs::read(guard.path()).unwrap();
            let record: LeaseRecord = serde_json::from_slice(&raw).unwrap();
            assert_eq!(record.pid, std::process::id());
            assert!(record.expires_at > record.acquired_at);
        }
        assert!(!lock.path().exists());
        drop(lock.acquire().unwrap());
    }

    #[test]
    fn test_second_holder_is_busy() {
        let dir = TempDir::new().unwrap();
        let lock = ScanLock::new(&config(&dir, 60, 0));
        let _guard = lock.acquire().unwrap();
        let err = lock.acquire().unwrap_err();
        assert!(matches!(
            err,
            LockError::Busy { retry_after, .. } if retry_after == Duration::from_secs(7)
        ));
    }

    #[test]
    fn test_waits_for_release() {
        let dir = TempDir::new().unwrap();
        let lock = ScanLock::new(&config(&dir, 60, 5));
        let guard = lock.acquire().unwrap();
        let handle = std::thread::spawn(move || {
            std::thread::sleep(Duration::from_millis(200));
            drop(guard);
        });
        let second = lock.acquire();
        handle.join().unwrap();
        assert!(second.is_ok());
    }

    fn write_stale(path: &Utf8Path) {
        let stale = LeaseRecord {
            pid: 1,
            token: "stale".to_owned(),
            acquired_at: Utc::now() - TimeDelta::minutes(5),
            expires_at: Utc::now() - TimeDelta::minutes(4),
        };
        fs::write(path, serde_json::to_vec(&stale).unwrap()).unwrap();
    }

    #[test]
    fn test_expired_lease_is_taken_over() {
        let dir = TempDir::new().unwrap();
        let cfg = config(&dir, 60, 0);
        write_stale(&cfg.path);

        let guard = ScanLock::new(&cfg).acquire().unwrap();
        let raw = fs::read(guard.path()).unwrap();
        let record: LeaseRecord = serde_json::from_slice(&raw).unwrap();
        assert_ne!(record.token, "stale");
    }

    #[test]
    fn test_unreadable_record_falls_back_to_file_age() {
        let dir = TempDir::new().unwrap();
        let cfg = config(&dir, 60, 0);
        fs::write(&cfg.path, b"garbage").unwrap();
        assert!(ScanLock::new(&cfg).acquire().is_err());

        filetime::set_file_mtime(&cfg.path, FileTime::from_unix_time(1_000_000_000, 0)).unwrap();
        assert!(ScanLock::new(&cfg).acquire().is_ok());
    }

    #[test]
    fn test_guard_leaves_foreign_lease() {
        let dir = TempDir::new().unwrap();
        let cfg = config(&dir, 60, 0);
        let guard = ScanLock::new(&cfg).acquire().unwrap();
        let other = LeaseRecord {
            pid: 2,
            token: "other".to_owned(),
            acquired_at: Utc::now(),
            expires_at: Utc::now() + TimeDelta::minutes(1),
        };
        fs::write(&cfg.path, serde_json::to_vec(&other).unwrap()).unwrap();
        drop(guard);
        assert!(cfg.path.exists());
    }

    #[test]
    fn test_expired_lease_has_single_successor() {
        let dir = TempDir::new().unwrap();
        let cfg = config(&dir, 60, 0);
        let contenders = 8;

        for _ in 0..50 {
            write_stale(&cfg.path);
            let barrier = Barrier::new(contenders);
            let holding = AtomicUsize::new(0);
            let overlaps = AtomicUsize::new(0);
            let winners = AtomicUsize::new(0);

            std::thread::scope(|scope| {
                for _ in 0..contenders {
                    scope.spawn(|| {
                        let lock = ScanLock::new(&cfg);
                        barrier.wait();
                        if let Ok(guard) = lock.acquire() {
                            winners.fetch_add(1, Ordering::SeqCst);
                            if holding.fetch_add(1, Ordering::SeqCst) > 0 {
                                overlaps.fetch_add(1, Ordering::SeqCst);
                            }
                            std::thread::sleep(Duration::from_millis(5));
                            holding.fetch_sub(1, Ordering::SeqCst);
                            drop(guard);
                        }
                    });
                }
            });

            assert_eq!(overlaps.load(Ordering::SeqCst), 0);
            assert!(winners.load(Ordering::SeqCst) >= 1);
            assert!(!cfg.path.exists());
        }
    }
}
