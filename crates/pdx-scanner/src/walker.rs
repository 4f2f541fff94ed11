//! Directory traversal over the share.
//!
//! Two interchangeable tiers implement [`Traversal`]:
//!
//! - [`PrimaryWalker`]: the `ignore` crate's walker, with every ignore-file
//!   filter switched off so nothing on the share is hidden from the scan.
//! - [`NativeWalker`]: an explicit-stack walk over a [`FileSystem`], used when
//!   the primary tier cannot operate on the root at all (some network path
//!   forms trip it up).
//!
//! [`TieredWalker`] tries the primary tier and falls back to the native one
//! on a whole-walk failure. Both tiers share the same descend predicate, so
//! the three [`WalkMode`]s prune identically.
//!
//! # Time pruning caveat
//!
//! [`WalkMode::ModifiedSince`] skips a subtree whose directory mtime predates
//! the cutoff. That only finds nested changes on filesystems that bump
//! ancestor mtimes; most only touch the direct parent, so this mode can miss
//! files and must not be relied on where completeness matters.

use std::sync::mpsc;
use std::time::{Duration, SystemTime};

use camino::{Utf8Path, Utf8PathBuf};
use ignore::WalkBuilder;
use pdx_core::ScanWindow;
use pdx_dates::PathDateResolver;
use serde::Serialize;
use tracing::{debug, warn};

use crate::ScanError;
use crate::fs::{FileSystem, join_rel};

/// Directory depth past which the native tier stops descending.
pub const MAX_DEPTH: usize = 64;

/// Which subtrees a walk may skip.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WalkMode {
    /// Visit everything.
    Full,
    /// Skip directories whose modification time is known to predate the
    /// cutoff.
    ModifiedSince(SystemTime),
    /// Skip directories whose partial date is provably outside the window.
    Window(ScanWindow),
}

/// Which traversal tier produced a file list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Backend {
    /// The `ignore` crate walker.
    Primary,
    /// The explicit-stack walk over [`NativeFs`](crate::NativeFs).
    Native,
}

impl Backend {
    /// Short label for reports.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Primary => "primary",
            Self::Native => "native",
        }
    }
}

/// Files found by a walk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WalkOutput {
    /// Relative file paths, `/`-separated, as named on disk.
    pub files: Vec<String>,
    /// Tier that produced the list.
    pub backend: Backend,
    /// Directories that could not be listed and were skipped.
    pub unreadable_dirs: usize,
}

/// A traversal tier.
pub trait Traversal: Send + Sync {
    /// Walks the whole share under `mode`.
    ///
    /// Per-directory failures are logged and counted; only a failure to walk
    /// at all is returned as an error.
    fn walk(&self, mode: &WalkMode) -> Result<WalkOutput, ScanError>;
}

/// The descend predicate shared by both tiers.
#[derive(Debug, Clone)]
pub(crate) struct Pruner {
    mode: WalkMode,
    resolver: PathDateResolver,
}

impl Pruner {
    pub(crate) const fn new(mode: WalkMode, resolver: PathDateResolver) -> Self {
        Self { mode, resolver }
    }

    /// Decides whether to enter a directory, given its segments from the root
    /// and a lazy modification-time probe.
    pub(crate) fn should_descend<S: AsRef<str>>(
        &self,
        dirs: &[S],
        modified: impl FnOnce() -> Option<SystemTime>,
    ) -> bool {
        match &self.mode {
            WalkMode::Full => true,
            WalkMode::ModifiedSince(cutoff) => modified().is_none_or(|mtime| mtime >= *cutoff),
            WalkMode::Window(window) => window.admits(&self.resolver.resolve_partial(dirs)),
        }
    }
}

/// Primary tier built on [`ignore::WalkBuilder`].
///
/// With a stall budget the walk runs on its own thread and is abandoned with
/// [`ScanError::Timeout`] once no entry has arrived for that long, which
/// hands the scan over to the native tier.
#[derive(Debug, Clone)]
pub struct PrimaryWalker {
    root: Utf8PathBuf,
    follow_links: bool,
    stall_budget: Option<Duration>,
    resolver: PathDateResolver,
}

/// One step of a primary walk, owned so it can leave the walk thread.
#[derive(Debug)]
enum Visit {
    Root,
    File(String),
    NonUtf8(std::path::PathBuf),
    Failed(ignore::Error),
}

impl PrimaryWalker {
    /// Creates a primary walker for `root`.
    #[must_use]
    pub fn new(root: impl Into<Utf8PathBuf>, resolver: PathDateResolver) -> Self {
        Self {
            root: root.into(),
            follow_links: false,
            stall_budget: None,
            resolver,
        }
    }

    /// Gives up when the walk makes no progress for `budget` (`None` waits
    /// indefinitely).
    #[must_use]
    pub const fn with_stall_budget(mut self, budget: Option<Duration>) -> Self {
        self.stall_budget = budget;
        self
    }

    /// Configures whether to follow symbolic links.
    #[must_use]
    pub const fn with_follow_links(mut self, follow: bool) -> Self {
        self.follow_links = follow;
        self
    }

    fn build_walker(&self, mode: &WalkMode) -> ignore::Walk {
        let root = self.root.clone();
        let pruner = Pruner::new(mode.clone(), self.resolver);
        WalkBuilder::new(&self.root)
            // Nothing on the share is hidden from the catalog
            .standard_filters(false)
            .follow_links(self.follow_links)
            .threads(1)
            .filter_entry(move |entry| {
                if entry.depth() == 0 || !entry.file_type().is_some_and(|ft| ft.is_dir()) {
                    return true;
                }
                let Some(rel) = relative_to(&root, entry.path()) else {
                    return true;
                };
                let dirs: Vec<&str> = rel.split('/').collect();
                pruner.should_descend(&dirs, || {
                    entry.metadata().ok().and_then(|meta| meta.modified().ok())
                })
            })
            .build()
    }

    fn visits(&self, mode: &WalkMode) -> impl Iterator<Item = Visit> + use<> {
        let root = self.root.clone();
        self.build_walker(mode).filter_map(move |result| match result {
            Err(err) => Some(Visit::Failed(err)),
            Ok(entry) if entry.depth() == 0 => Some(Visit::Root),
            Ok(entry) if !entry.file_type().is_some_and(|ft| ft.is_file()) => None,
            Ok(entry) => Some(match relative_to(&root, entry.path()) {
                Some(rel) => Visit::File(rel),
                None => Visit::NonUtf8(entry.into_path()),
            }),
        })
    }
}

/// Drains `make()` on a dedicated thread, giving up once no item has
/// arrived within `budget`. A thread stuck in the kernel is left behind.
pub(crate) fn drain_within<T, I, M>(
    label: &Utf8Path,
    budget: Duration,
    make: M,
) -> Result<Vec<T>, ScanError>
where
    T: Send + 'static,
    I: Iterator<Item = T>,
    M: FnOnce() -> I + Send + 'static,
{
    let (tx, rx) = mpsc::sync_channel(256);
    std::thread::Builder::new()
        .name("pdx-walk".to_owned())
        .spawn(move || {
            for item in make() {
                if tx.send(item).is_err() {
                    break;
                }
            }
        })
        .map_err(|source| ScanError::read_dir(label, source))?;

    let mut items = Vec::new();
    loop {
        match rx.recv_timeout(budget) {
            Ok(item) => items.push(item),
            Err(mpsc::RecvTimeoutError::Disconnected) => return Ok(items),
            Err(mpsc::RecvTimeoutError::Timeout) => {
                return Err(ScanError::Timeout {
                    path: label.to_owned(),
                    after: budget,
                });
            }
        }
    }
}

/// Converts an absolute path under `root` into a `/`-separated relative one.
fn relative_to(root: &Utf8Path, path: &std::path::Path) -> Option<String> {
    let rel = path.strip_prefix(root.as_std_path()).ok()?;
    let parts: Option<Vec<&str>> = rel.components().map(|c| c.as_os_str().to_str()).collect();
    Some(parts?.join("/"))
}

impl Traversal for PrimaryWalker {
    fn walk(&self, mode: &WalkMode) -> Result<WalkOutput, ScanError> {
        let visits: Box<dyn Iterator<Item = Visit>> = match self.stall_budget {
            Some(budget) => {
                let walker = self.clone();
                let mode = mode.clone();
                Box::new(drain_within(&self.root, budget, move || walker.visits(&mode))?.into_iter())
            }
            None => Box::new(self.visits(mode)),
        };

        let mut files = Vec::new();
        let mut unreadable_dirs = 0;
        let mut reached_root = false;

        for visit in visits {
            match visit {
                Visit::Root => reached_root = true,
                Visit::File(rel) => files.push(rel),
                Visit::NonUtf8(path) => warn!(path = %path.display(), "skipping non UTF-8 path"),
                // The root itself could not be read: the tier does not work here
                Visit::Failed(err) if !reached_root => return Err(ScanError::Walk(err)),
                Visit::Failed(err) => {
                    warn!(error = %err, "skipping unreadable directory");
                    unreadable_dirs += 1;
                }
            }
        }

        if !reached_root {
            return Err(ScanError::config(format!(
                "primary walker produced nothing for {}",
                self.root
            )));
        }

        debug!(files = files.len(), unreadable_dirs, "primary walk finished");
        Ok(WalkOutput {
            files,
            backend: Backend::Primary,
            unreadable_dirs,
        })
    }
}

/// Native tier: explicit-stack walk over a [`FileSystem`].
#[derive(Debug, Clone)]
pub struct NativeWalker<F> {
    fs: F,
    resolver: PathDateResolver,
}

impl<F: FileSystem> NativeWalker<F> {
    /// Creates a native walker over `fs`.
    #[must_use]
    pub const fn new(fs: F, resolver: PathDateResolver) -> Self {
        Self { fs, resolver }
    }
}

impl<F: FileSystem> Traversal for NativeWalker<F> {
    fn walk(&self, mode: &WalkMode) -> Result<WalkOutput, ScanError> {
        let pruner = Pruner::new(mode.clone(), self.resolver);
        let mut files = Vec::new();
        let mut unreadable_dirs = 0;

        // The root must be listable; everything below is best effort
        let mut stack: Vec<(String, usize)> = Vec::new();
        for entry in self.fs.list_dir("")? {
            stack_or_collect(&pruner, &self.fs, "", entry, 1, &mut stack, &mut files);
        }

        while let Some((dir, depth)) = stack.pop() {
            let entries = match self.fs.list_dir(&dir) {
                Ok(entries) => entries,
                Err(err) => {
                    warn!(dir = %dir, error = %err, "skipping unreadable directory");
                    unreadable_dirs += 1;
                    continue;
                }
            };
            for entry in entries {
                stack_or_collect(&pruner, &self.fs, &dir, entry, depth + 1, &mut stack, &mut files);
            }
        }

        debug!(files = files.len(), unreadable_dirs, "native walk finished");
        Ok(WalkOutput {
            files,
            backend: Backend::Native,
            unreadable_dirs,
        })
    }
}

fn stack_or_collect<F: FileSystem>(
    pruner: &Pruner,
    fs: &F,
    parent: &str,
    entry: crate::fs::DirEntry,
    depth: usize,
    stack: &mut Vec<(String, usize)>,
    files: &mut Vec<String>,
) {
    let rel = join_rel(parent, &entry.name);
    if !entry.is_dir {
        files.push(rel);
        return;
    }
    if depth > MAX_DEPTH {
        warn!(dir = %rel, max_depth = MAX_DEPTH, "not descending past depth limit");
        return;
    }
    let dirs: Vec<&str> = rel.split('/').collect();
    if pruner.should_descend(&dirs, || fs.modified(&rel)) {
        stack.push((rel, depth));
    }
}

/// Primary tier with native fallback, selected by the first failure.
pub struct TieredWalker {
    primary: Box<dyn Traversal>,
    fallback: Box<dyn Traversal>,
}

impl TieredWalker {
    /// Combines a primary and a fallback tier.
    #[must_use]
    pub fn new(primary: Box<dyn Traversal>, fallback: Box<dyn Traversal>) -> Self {
        Self { primary, fallback }
    }
}

impl std::fmt::Debug for TieredWalker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TieredWalker").finish_non_exhaustive()
    }
}

impl Traversal for TieredWalker {
    fn walk(&self, mode: &WalkMode) -> Result<WalkOutput, ScanError> {
        match self.primary.walk(mode) {
            Ok(output) => Ok(output),
            Err(err) => {
                warn!(error = %err, "primary traversal failed, falling back to native walk");
                self.fallback.walk(mode)
            }
        }
    }
}

/// Returns `true` if a relative path names a PDF (case-insensitive).
#[must_use]
pub fn is_pdf(rel: &str) -> bool {
    Utf8Path::new(rel)
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("pdf"))
}
