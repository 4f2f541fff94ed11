//! Filesystem capability interface.
//!
//! The native traversal tier and the targeted locator only need three
//! operations on paths relative to the share root: list a directory, read a
//! modification time, and check that a constructed path is a directory.
//! [`NativeFs`] implements them with `std::fs`, optionally bounding every
//! call by a timeout so a stalled network mount cannot hang a scan.
//!
//! Bounded calls run on one long-lived I/O worker thread shared by all
//! clones of a [`NativeFs`]. A call that overruns its budget retires that
//! worker: it finishes the stuck call and exits, and the next call starts a
//! fresh one.

use std::io;
use std::sync::{Arc, mpsc};
use std::time::{Duration, SystemTime};

use camino::{Utf8Path, Utf8PathBuf};
use parking_lot::Mutex;
use tracing::{debug, warn};

use crate::ScanError;

/// One child of a listed directory.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DirEntry {
    /// Entry name (a single path component).
    pub name: String,
    /// Whether the entry is a directory.
    pub is_dir: bool,
}

impl DirEntry {
    /// Creates a file entry.
    #[must_use]
    pub fn file(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            is_dir: false,
        }
    }

    /// Creates a directory entry.
    #[must_use]
    pub fn dir(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            is_dir: true,
        }
    }
}

/// Operations the native tier needs from the filesystem.
///
/// Paths are relative to the share root, `/`-separated, with `""` naming the
/// root itself.
pub trait FileSystem: Send + Sync {
    /// Lists the direct children of a directory.
    fn list_dir(&self, rel: &str) -> Result<Vec<DirEntry>, ScanError>;

    /// Returns the modification time, or `None` when it cannot be read.
    /// An unknown time must never be taken to mean "old".
    fn modified(&self, rel: &str) -> Option<SystemTime>;

    /// Returns `true` if `rel` exists and is a directory.
    fn is_dir(&self, rel: &str) -> bool;
}

/// Joins a relative directory and a child name.
pub(crate) fn join_rel(parent: &str, name: &str) -> String {
    if parent.is_empty() {
        name.to_owned()
    } else {
        format!("{parent}/{name}")
    }
}

type Job = Box<dyn FnOnce() + Send>;

/// A single background thread that runs bounded filesystem calls.
#[derive(Debug, Default)]
pub(crate) struct IoWorker {
    sender: Mutex<Option<mpsc::Sender<Job>>>,
}

impl IoWorker {
    /// Runs `op` on the worker and waits at most `budget` for its result.
    pub(crate) fn run<T, F>(&self, path: &Utf8Path, budget: Duration, op: F) -> Result<T, ScanError>
    where
        T: Send + 'static,
        F: FnOnce() -> T + Send + 'static,
    {
        let (reply_tx, reply_rx) = mpsc::sync_channel(1);
        self.submit(
            Box::new(move || {
                reply_tx.send(op()).ok();
            }),
            path,
        )?;

        match reply_rx.recv_timeout(budget) {
            Ok(value) => Ok(value),
            Err(mpsc::RecvTimeoutError::Timeout) => {
                debug!(path = %path, "retiring stalled filesystem worker");
                self.retire();
                Err(ScanError::Timeout {
                    path: path.to_owned(),
                    after: budget,
                })
            }
            Err(mpsc::RecvTimeoutError::Disconnected) => {
                self.retire();
                Err(ScanError::read_dir(path, io::Error::other("filesystem worker exited")))
            }
        }
    }

    fn submit(&self, job: Job, path: &Utf8Path) -> Result<(), ScanError> {
        let mut sender = self.sender.lock();
        let job = match sender.as_ref() {
            Some(tx) => match tx.send(job) {
                Ok(()) => return Ok(()),
                Err(mpsc::SendError(job)) => job,
            },
            None => job,
        };

        let (tx, rx) = mpsc::channel::<Job>();
        std::thread::Builder::new()
            .name("pdx-io".to_owned())
            .spawn(move || {
                for job in rx {
                    job();
                }
            })
            .map_err(|source| ScanError::read_dir(path, source))?;
        tx.send(job)
            .map_err(|_| ScanError::read_dir(path, io::Error::other("filesystem worker exited")))?;
        *sender = Some(tx);
        Ok(())
    }

    /// Drops the current worker's queue; the thread exits once its
    /// in-flight call returns.
    fn retire(&self) {
        self.sender.lock().take();
    }
}

/// `std::fs` backed [`FileSystem`] rooted at the share.
#[derive(Debug, Clone)]
pub struct NativeFs {
    root: Utf8PathBuf,
    io_timeout: Option<Duration>,
    follow_links: bool,
    worker: Arc<IoWorker>,
}

impl NativeFs {
    /// Creates a filesystem view of `root` with no timeout.
    #[must_use]
    pub fn new(root: impl Into<Utf8PathBuf>) -> Self {
        Self {
            root: root.into(),
            io_timeout: None,
            follow_links: false,
            worker: Arc::default(),
        }
    }

    /// Bounds every call by `timeout` (`None` disables the bound).
    #[must_use]
    pub const fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.io_timeout = timeout;
        self
    }

    /// Classifies symlinks by their target instead of treating them as files.
    #[must_use]
    pub const fn with_follow_links(mut self, follow: bool) -> Self {
        self.follow_links = follow;
        self
    }

    /// Returns the share root.
    #[inline]
    #[must_use]
    pub fn root(&self) -> &Utf8Path {
        &self.root
    }

    fn absolute(&self, rel: &str) -> Utf8PathBuf {
        if rel.is_empty() {
            self.root.clone()
        } else {
            self.root.join(rel)
        }
    }

    /// Runs `op` on the I/O worker and waits at most the configured budget.
    fn bounded<T, F>(&self, path: &Utf8Path, op: F) -> Result<T, ScanError>
    where
        T: Send + 'static,
        F: FnOnce() -> T + Send + 'static,
    {
        match self.io_timeout {
            Some(budget) => self.worker.run(path, budget, op),
            None => Ok(op()),
        }
    }
}

fn read_entries(dir: &Utf8Path, follow_links: bool) -> io::Result<Vec<DirEntry>> {
    let mut entries = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        let Ok(name) = entry.file_name().into_string() else {
            warn!(dir = %dir, name = ?entry.file_name(), "skipping non UTF-8 entry");
            continue;
        };
        let file_type = entry.file_type()?;
        let is_dir = if file_type.is_symlink() {
            follow_links && entry.path().is_dir()
        } else {
            file_type.is_dir()
        };
        entries.push(DirEntry { name, is_dir });
    }
    Ok(entries)
}

impl FileSystem for NativeFs {
    fn list_dir(&self, rel: &str) -> Result<Vec<DirEntry>, ScanError> {
        let path = self.absolute(rel);
        let dir = path.clone();
        let follow_links = self.follow_links;
        self.bounded(&path, move || read_entries(&dir, follow_links))?
            .map_err(|source| ScanError::read_dir(rel, source))
    }

    fn modified(&self, rel: &str) -> Option<SystemTime> {
        let path = self.absolute(rel);
        let target = path.clone();
        self.bounded(&path, move || {
            std::fs::metadata(&target).and_then(|meta| meta.modified()).ok()
        })
        .ok()
        .flatten()
    }

    fn is_dir(&self, rel: &str) -> bool {
        let path = self.absolute(rel);
        let target = path.clone();
        self.bounded(&path, move || target.is_dir()).unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use std::fs;

    use tempfile::TempDir;

    use super::*;

    fn setup() -> (TempDir, NativeFs) {
        let dir = TempDir::new().unwrap();
        let root = Utf8PathBuf::from_path_buf(dir.path().to_path_buf()).unwrap();
        fs::create_dir_all(root.join("2025/07/19")).unwrap();
        fs::write(root.join("2025/07/19/a.pdf"), b"%PDF").unwrap();
        fs::write(root.join("readme.txt"), b"x").unwrap();
        (dir, NativeFs::new(root))
    }

    #[test]
    fn test_join_rel() {
        assert_eq!(join_rel("", "2025"), "2025");
        assert_eq!(join_rel("2025", "07"), "2025/07");
    }

    #[test]
    fn test_list_root() {
        let (_dir, fs) = setup();
        let mut entries = fs.list_dir("").unwrap();
        entries.sort_by(|a, b| a.name.cmp(&b.name));
        assert_eq!(entries, [DirEntry::dir("2025"), DirEntry::file("readme.txt")]);
    }

    #[test]
    fn test_list_missing_dir_is_read_error() {
        let (_dir, fs) = setup();
        let err = fs.list_dir("2024").unwrap_err();
        assert!(matches!(err, ScanError::ReadDir { .. }));
        assert!(err.is_recoverable());
    }

    #[test]
    fn test_is_dir_and_modified() {
        let (_dir, fs) = setup();
        assert!(fs.is_dir("2025/07/19"));
        assert!(!fs.is_dir("2025/07/19/a.pdf"));
        assert!(!fs.is_dir("2025/7/19"));
        assert!(fs.modified("2025/07/19/a.pdf").is_some());
        assert!(fs.modified("missing.pdf").is_none());
    }

    #[test]
    fn test_bounded_calls_with_timeout() {
        let (_dir, fs) = setup();
        let fs = fs.with_timeout(Some(Duration::from_secs(10)));
        assert_eq!(fs.list_dir("2025/07/19").unwrap(), [DirEntry::file("a.pdf")]);
        assert!(fs.is_dir("2025"));
    }

    #[test]
    fn test_worker_thread_is_reused() {
        let worker = IoWorker::default();
        let path = Utf8Path::new("2025/07/19");
        let budget = Duration::from_secs(10);
        let first = worker.run(path, budget, || std::thread::current().id()).unwrap();
        let second = worker.run(path, budget, || std::thread::current().id()).unwrap();
        assert_eq!(first, second);
        assert_ne!(first, std::thread::current().id());
    }

    #[test]
    fn test_stalled_call_times_out_and_worker_recovers() {
        let worker = IoWorker::default();
        let path = Utf8Path::new("2025/07/19/a.pdf");
        let stalled_on = worker
            .run(path, Duration::from_secs(10), || std::thread::current().id())
            .unwrap();

        let err = worker
            .run(path, Duration::from_millis(50), || {
                std::thread::sleep(Duration::from_millis(500));
                Some(SystemTime::now())
            })
            .unwrap_err();
        assert!(matches!(err, ScanError::Timeout { after, .. } if after == Duration::from_millis(50)));
        assert!(err.is_recoverable());

        let fresh = worker
            .run(path, Duration::from_secs(10), || std::thread::current().id())
            .unwrap();
        assert_ne!(fresh, stalled_on);
    }
}
