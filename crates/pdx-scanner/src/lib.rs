//! Incremental scanner that catalogs dated PDFs on a network share.
//!
//! # Overview
//!
//! The main entry point is [`Scanner`], which combines:
//!
//! - [`TargetedLocator`]: direct probing of day folders for short windows
//! - [`TieredWalker`]: the `ignore`-based walker with a native explicit-stack
//!   fallback, each supporting full, time-pruned and name-pruned walks
//! - [`PathDateResolver`]: date inference from directory names
//! - [`ScanLock`]: the lease that keeps two scans from running at once
//! - [`ScanStats`]: atomic ok/skipped/bad tallies
//!
//! # Strategy ladder
//!
//! | Request                          | Strategies tried, in order                   |
//! |----------------------------------|----------------------------------------------|
//! | full scan, or no time filter     | full                                         |
//! | window of up to 7 days           | targeted, name-pruned, time-pruned, full     |
//! | longer window                    | name-pruned, time-pruned, full               |
//!
//! A strategy that yields no PDF candidates hands over to the next one.
//!
//! # Example
//!
//! ```no_run
//! use pdx_catalog::SqliteCatalog;
//! use pdx_core::Config;
//! use pdx_scanner::{ScanRequest, Scanner};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let config = Config::default();
//! let catalog = SqliteCatalog::open(&config.catalog.path)?;
//! let scanner = Scanner::new(config.scan.clone())?.with_lock(&config.lock);
//!
//! let report = scanner.run(&ScanRequest::new().since_minutes(60), &catalog)?;
//! println!("ok={} skipped={} bad={}", report.stats.ok, report.stats.skipped, report.stats.bad);
//! # Ok(())
//! # }
//! ```
//!
//! # Architecture
//!
//! ```text
//! Scanner
//!     │
//!     ├── plan (request → window, cutoff, strategy ladder)
//!     │
//!     ├── collect
//!     │       ├── TargetedLocator ──┐
//!     │       └── TieredWalker      ├── NativeFs (bounded std::fs calls)
//!     │               ├── PrimaryWalker (ignore crate, stall budget)
//!     │               └── NativeWalker ─┘
//!     │
//!     ├── evaluate (extension, mtime/window, resolver, year)
//!     │
//!     └── Catalog::upsert (serialized, under ScanLock)
//! ```

#![deny(clippy::all)]
#![warn(missing_docs)]

mod error;
pub mod fs;
mod locator;
mod lock;
mod stats;
pub mod walker;

pub use error::{LockError, ScanError};
pub use fs::{FileSystem, NativeFs};
pub use locator::{LocateOutput, TargetedLocator};
pub use lock::{LeaseRecord, LockGuard, ScanLock};
pub use stats::{ScanStats, StatsSnapshot};
pub use walker::{
    Backend, NativeWalker, PrimaryWalker, TieredWalker, Traversal, WalkMode, WalkOutput, is_pdf,
};

use std::time::{Instant, SystemTime};

use chrono::{DateTime, Local, TimeDelta, Utc};
use pdx_catalog::Catalog;
use pdx_core::{CatalogEntry, LockConfig, PathSegments, ScanConfig, ScanWindow};
use pdx_dates::{PathDateResolver, Strategy, Unresolved};
use serde::Serialize;
use smallvec::{SmallVec, smallvec};
use tracing::{debug, info, warn};

/// Filter intent for one scan.
///
/// `full_scan` ignores any time filter; `today_only` takes precedence over
/// `since_minutes`. The year filter applies on top of either.
///
/// # Examples
///
/// ```
/// use pdx_scanner::ScanRequest;
///
/// let request = ScanRequest::new().since_minutes(90).year(2026).dry_run(true);
/// assert!(request.has_time_filter());
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ScanRequest {
    /// Re-index everything regardless of time filters.
    pub full_scan: bool,
    /// Only catalog files whose inferred year matches.
    pub year: Option<i32>,
    /// Only consider files changed in the last N minutes.
    pub since_minutes: Option<u32>,
    /// Only consider files from today (local time).
    pub today_only: bool,
    /// Evaluate without writing to the catalog.
    pub dry_run: bool,
}

impl ScanRequest {
    /// Creates an unfiltered request.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a full re-indexing request.
    #[must_use]
    pub fn full() -> Self {
        Self {
            full_scan: true,
            ..Self::default()
        }
    }

    /// Sets the year filter.
    #[must_use]
    pub const fn year(mut self, year: i32) -> Self {
        self.year = Some(year);
        self
    }

    /// Sets the look-back window in minutes.
    #[must_use]
    pub const fn since_minutes(mut self, minutes: u32) -> Self {
        self.since_minutes = Some(minutes);
        self
    }

    /// Restricts the scan to today.
    #[must_use]
    pub const fn today_only(mut self, today: bool) -> Self {
        self.today_only = today;
        self
    }

    /// Sets dry-run mode.
    #[must_use]
    pub const fn dry_run(mut self, dry: bool) -> Self {
        self.dry_run = dry;
        self
    }

    /// Returns `true` if a time window applies.
    #[must_use]
    pub const fn has_time_filter(&self) -> bool {
        !self.full_scan && (self.today_only || self.since_minutes.is_some())
    }
}

/// How candidates were collected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ScanStrategy {
    /// Direct probing of day folders.
    Targeted,
    /// Walk skipping subtrees dated outside the window.
    NamePruned,
    /// Walk skipping subtrees with old directory mtimes.
    TimePruned,
    /// Walk everything.
    Full,
}

impl ScanStrategy {
    /// Short label for reports.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Targeted => "targeted",
            Self::NamePruned => "name_pruned",
            Self::TimePruned => "time_pruned",
            Self::Full => "full",
        }
    }
}

/// Why a file was not cataloged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    /// Not a `.pdf` file.
    NotPdf,
    /// Modified before the cutoff.
    NotModified,
    /// Dated outside the scan window.
    OutsideWindow,
    /// Dated in a year other than the requested one.
    OtherYear,
}

/// Outcome for one candidate file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScanItem {
    /// Dated; upserted, or printed in a dry run.
    Ok {
        /// The catalog record.
        entry: CatalogEntry,
        /// Which resolver strategy dated it.
        strategy: Strategy,
    },
    /// Left out by a filter.
    Skipped {
        /// Relative path as found.
        path: String,
        /// Which filter.
        reason: SkipReason,
    },
    /// A PDF whose date could not be inferred.
    Bad {
        /// Relative path as found.
        path: String,
        /// Why resolution failed.
        reason: Unresolved,
    },
}

impl ScanItem {
    /// Relative path of the file (normalized for dated files).
    #[must_use]
    pub fn path(&self) -> &str {
        match self {
            Self::Ok { entry, .. } => &entry.path,
            Self::Skipped { path, .. } | Self::Bad { path, .. } => path,
        }
    }
}

/// Final tallies of a scan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ScanReport {
    /// Per-file outcome counts.
    #[serde(flatten)]
    pub stats: StatsSnapshot,
    /// Strategy that produced the candidates.
    pub strategy: ScanStrategy,
    /// Traversal tier behind that strategy.
    pub backend: Backend,
    /// Files collected before filtering.
    pub candidates: usize,
    /// Directories skipped because they could not be listed.
    pub unreadable_dirs: usize,
    /// Whether the per-file mtime check was skipped for a large native
    /// listing.
    pub stat_check_skipped: bool,
    /// Whether the catalog was left untouched.
    pub dry_run: bool,
    /// Wall time in milliseconds.
    pub elapsed_ms: u64,
}

/// Window, cutoff and strategy ladder derived from a request.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Plan {
    ladder: SmallVec<[ScanStrategy; 4]>,
    window: ScanWindow,
    cutoff: Option<SystemTime>,
}

/// Files gathered by one rung of the ladder.
#[derive(Debug)]
struct Candidates {
    files: Vec<String>,
    strategy: ScanStrategy,
    backend: Backend,
    unreadable_dirs: usize,
}

/// Per-file time filter.
#[derive(Debug, Clone)]
enum FileFilter {
    None,
    Window(ScanWindow),
    ModifiedSince(SystemTime),
}

/// Turns a candidate path into a [`ScanItem`].
#[derive(Debug, Clone)]
struct Evaluator {
    fs: NativeFs,
    resolver: PathDateResolver,
    year: Option<i32>,
    filter: FileFilter,
}

impl Evaluator {
    fn evaluate(&self, rel: &str) -> ScanItem {
        let skipped = |reason| ScanItem::Skipped {
            path: rel.to_owned(),
            reason,
        };

        if !is_pdf(rel) {
            return skipped(SkipReason::NotPdf);
        }
        if let FileFilter::ModifiedSince(cutoff) = &self.filter {
            // an unreadable mtime is not evidence the file is old
            if self.fs.modified(rel).is_some_and(|mtime| mtime < *cutoff) {
                return skipped(SkipReason::NotModified);
            }
        }

        let Some(segments) = PathSegments::parse(rel) else {
            return ScanItem::Bad {
                path: rel.to_owned(),
                reason: Unresolved::Malformed,
            };
        };
        let resolution = match self.resolver.resolve_segments(&segments) {
            Ok(resolution) => resolution,
            Err(reason) => {
                return ScanItem::Bad {
                    path: rel.to_owned(),
                    reason,
                };
            }
        };

        if let FileFilter::Window(window) = &self.filter {
            if !window.contains(resolution.date) {
                return skipped(SkipReason::OutsideWindow);
            }
        }
        if self.year.is_some_and(|year| resolution.date.year() != year) {
            return skipped(SkipReason::OtherYear);
        }

        ScanItem::Ok {
            entry: CatalogEntry::remote(
                segments.normalized(),
                segments.file_name(),
                resolution.date,
            ),
            strategy: resolution.strategy,
        }
    }
}

/// Tallies and logs one outcome. Upsert sub-counts are tallied by the caller.
fn record(stats: &ScanStats, item: &ScanItem) {
    match item {
        ScanItem::Ok { entry, strategy } => {
            stats.increment_ok();
            debug!(path = %entry.path, date = %entry.date, strategy = strategy.label(), "dated");
        }
        ScanItem::Skipped { path, reason } => {
            stats.increment_skipped();
            debug!(path = %path, reason = ?reason, "skipped");
        }
        ScanItem::Bad { path, reason } => {
            stats.increment_bad();
            warn!(path = %path, reason = reason.label(), "could not infer date");
        }
    }
}

/// Everything a scan needs after collection.
#[derive(Debug)]
struct Prepared {
    files: Vec<String>,
    evaluator: Evaluator,
    strategy: ScanStrategy,
    backend: Backend,
    unreadable_dirs: usize,
    stat_check_skipped: bool,
    started: Instant,
}

impl Prepared {
    fn report(&self, stats: StatsSnapshot, candidates: usize, dry_run: bool) -> ScanReport {
        ScanReport {
            stats,
            strategy: self.strategy,
            backend: self.backend,
            candidates,
            unreadable_dirs: self.unreadable_dirs,
            stat_check_skipped: self.stat_check_skipped,
            dry_run,
            elapsed_ms: u64::try_from(self.started.elapsed().as_millis()).unwrap_or(u64::MAX),
        }
    }
}

/// A dry run: a lazy sequence of per-file outcomes that never touches the
/// catalog.
///
/// Tallies accumulate as the iterator is consumed; [`report`](Self::report)
/// reflects what has been yielded so far.
#[derive(Debug)]
pub struct DryRun {
    prepared: Prepared,
    candidates: usize,
    next: usize,
    stats: ScanStats,
}

impl DryRun {
    /// Report of the items yielded so far.
    #[must_use]
    pub fn report(&self) -> ScanReport {
        self.prepared
            .report(self.stats.snapshot(), self.candidates, true)
    }
}

impl Iterator for DryRun {
    type Item = ScanItem;

    fn next(&mut self) -> Option<ScanItem> {
        let rel = self.prepared.files.get(self.next)?;
        self.next += 1;
        let item = self.prepared.evaluator.evaluate(rel);
        record(&self.stats, &item);
        Some(item)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.candidates - self.next;
        (remaining, Some(remaining))
    }
}

/// The scan orchestrator.
#[derive(Debug)]
pub struct Scanner {
    config: ScanConfig,
    resolver: PathDateResolver,
    fs: NativeFs,
    walker: TieredWalker,
    lock: Option<ScanLock>,
}

fn build_walker(config: &ScanConfig, fs: &NativeFs, resolver: PathDateResolver) -> TieredWalker {
    TieredWalker::new(
        Box::new(
            PrimaryWalker::new(config.root.clone(), resolver)
                .with_follow_links(config.follow_links)
                .with_stall_budget(config.io_timeout()),
        ),
        Box::new(NativeWalker::new(fs.clone(), resolver)),
    )
}

impl Scanner {
    /// Creates a scanner for the configured share root.
    ///
    /// # Errors
    ///
    /// Returns [`ScanError::Config`] if the root does not exist or is not a
    /// directory.
    pub fn new(config: ScanConfig) -> Result<Self, ScanError> {
        if !config.root.exists() {
            return Err(ScanError::config(format!(
                "share root does not exist: {}",
                config.root
            )));
        }
        if !config.root.is_dir() {
            return Err(ScanError::config(format!(
                "share root is not a directory: {}",
                config.root
            )));
        }

        let resolver = PathDateResolver::new();
        let fs = NativeFs::new(config.root.clone())
            .with_timeout(config.io_timeout())
            .with_follow_links(config.follow_links);
        let walker = build_walker(&config, &fs, resolver);

        Ok(Self {
            config,
            resolver,
            fs,
            walker,
            lock: None,
        })
    }

    /// Requires the scan lease for every non-dry run.
    #[must_use]
    pub fn with_lock(mut self, lock: &LockConfig) -> Self {
        self.lock = Some(ScanLock::new(lock));
        self
    }

    /// Replaces the date resolver (for a fixed year bound).
    #[must_use]
    pub fn with_resolver(mut self, resolver: PathDateResolver) -> Self {
        self.resolver = resolver;
        self.walker = build_walker(&self.config, &self.fs, resolver);
        self
    }

    /// Returns the scanner configuration.
    #[inline]
    #[must_use]
    pub fn config(&self) -> &ScanConfig {
        &self.config
    }

    /// Runs a scan as of now.
    ///
    /// # Errors
    ///
    /// See [`run_at`](Self::run_at).
    pub fn run(&self, request: &ScanRequest, catalog: &dyn Catalog) -> Result<ScanReport, ScanError> {
        self.run_at(request, catalog, Local::now())
    }

    /// Runs a scan as of `now`, upserting every dated PDF.
    ///
    /// A dry-run request is evaluated without taking the lease or touching
    /// the catalog.
    ///
    /// # Errors
    ///
    /// Returns [`ScanError::Lock`] when another scan holds the lease,
    /// [`ScanError::Catalog`] when a write fails, and a traversal error when
    /// neither tier can walk the share.
    pub fn run_at(
        &self,
        request: &ScanRequest,
        catalog: &dyn Catalog,
        now: DateTime<Local>,
    ) -> Result<ScanReport, ScanError> {
        if request.dry_run {
            let mut dry = self.dry_run_at(request, now)?;
            dry.by_ref().for_each(drop);
            return Ok(dry.report());
        }

        let _guard = self.lock.as_ref().map(ScanLock::acquire).transpose()?;
        let prepared = self.prepare(request, now)?;
        let stats = ScanStats::new();

        for rel in &prepared.files {
            let item = prepared.evaluator.evaluate(rel);
            record(&stats, &item);
            if let ScanItem::Ok { entry, .. } = &item {
                stats.record_upsert(catalog.upsert(entry)?);
            }
        }

        catalog.set_last_sync(Utc::now())?;

        let report = prepared.report(stats.snapshot(), prepared.files.len(), false);
        info!(
            strategy = ?report.strategy,
            backend = ?report.backend,
            ok = report.stats.ok,
            skipped = report.stats.skipped,
            bad = report.stats.bad,
            inserted = report.stats.inserted,
            updated = report.stats.updated,
            elapsed_ms = report.elapsed_ms,
            "scan finished"
        );
        Ok(report)
    }

    /// Starts a dry run as of now.
    ///
    /// # Errors
    ///
    /// See [`dry_run_at`](Self::dry_run_at).
    pub fn dry_run(&self, request: &ScanRequest) -> Result<DryRun, ScanError> {
        self.dry_run_at(request, Local::now())
    }

    /// Collects candidates as of `now` and returns a lazy evaluation over
    /// them.
    ///
    /// # Errors
    ///
    /// Returns a traversal error when neither tier can walk the share, or
    /// [`ScanError::Config`] for a window that cannot be computed.
    pub fn dry_run_at(
        &self,
        request: &ScanRequest,
        now: DateTime<Local>,
    ) -> Result<DryRun, ScanError> {
        let prepared = self.prepare(request, now)?;
        Ok(DryRun {
            candidates: prepared.files.len(),
            prepared,
            next: 0,
            stats: ScanStats::new(),
        })
    }

    fn prepare(&self, request: &ScanRequest, now: DateTime<Local>) -> Result<Prepared, ScanError> {
        let started = Instant::now();
        let plan = self.plan(request, now)?;
        let candidates = self.collect(&plan)?;

        let mut stat_check_skipped = false;
        let filter = match (candidates.strategy, plan.cutoff) {
            (_, None) => FileFilter::None,
            (ScanStrategy::Targeted | ScanStrategy::NamePruned, Some(_)) => {
                FileFilter::Window(plan.window.clone())
            }
            (ScanStrategy::TimePruned | ScanStrategy::Full, Some(cutoff)) => {
                if candidates.backend == Backend::Native
                    && candidates.files.len() > self.config.native_stat_skip_threshold
                {
                    info!(
                        files = candidates.files.len(),
                        threshold = self.config.native_stat_skip_threshold,
                        "large native listing, skipping per-file modification check"
                    );
                    stat_check_skipped = true;
                    FileFilter::None
                } else {
                    FileFilter::ModifiedSince(cutoff)
                }
            }
        };

        Ok(Prepared {
            files: candidates.files,
            evaluator: Evaluator {
                fs: self.fs.clone(),
                resolver: self.resolver,
                year: request.year,
                filter,
            },
            strategy: candidates.strategy,
            backend: candidates.backend,
            unreadable_dirs: candidates.unreadable_dirs,
            stat_check_skipped,
            started,
        })
    }

    fn plan(&self, request: &ScanRequest, now: DateTime<Local>) -> Result<Plan, ScanError> {
        let full = Plan {
            ladder: smallvec![ScanStrategy::Full],
            window: ScanWindow::empty(),
            cutoff: None,
        };
        if !request.has_time_filter() {
            return Ok(full);
        }

        let (cutoff, window) = if request.today_only {
            let midnight = now
                .date_naive()
                .and_hms_opt(0, 0, 0)
                .and_then(|naive| naive.and_local_timezone(Local).earliest())
                .ok_or_else(|| ScanError::config("cannot compute local midnight"))?;
            (midnight, ScanWindow::today(&now))
        } else {
            let minutes = request.since_minutes.unwrap_or_default();
            let cutoff = TimeDelta::try_minutes(i64::from(minutes))
                .and_then(|delta| now.checked_sub_signed(delta))
                .ok_or_else(|| ScanError::config(format!("--since={minutes} is out of range")))?;
            (cutoff, ScanWindow::since(&cutoff, &now))
        };

        let ladder = if window.len() <= self.config.targeted_max_days {
            smallvec![
                ScanStrategy::Targeted,
                ScanStrategy::NamePruned,
                ScanStrategy::TimePruned,
                ScanStrategy::Full,
            ]
        } else {
            smallvec![
                ScanStrategy::NamePruned,
                ScanStrategy::TimePruned,
                ScanStrategy::Full,
            ]
        };

        debug!(cutoff = %cutoff, days = window.len(), ladder = ?ladder, "scan planned");
        Ok(Plan {
            ladder,
            window,
            cutoff: Some(SystemTime::from(cutoff)),
        })
    }

    fn collect(&self, plan: &Plan) -> Result<Candidates, ScanError> {
        let mut unreadable_dirs = 0;
        let mut last = None;

        for &strategy in &plan.ladder {
            let mut found = match strategy {
                ScanStrategy::Targeted => {
                    let out = TargetedLocator::new(&self.fs, &self.config.subjects)
                        .locate(&plan.window);
                    Candidates {
                        files: out.files,
                        strategy,
                        backend: Backend::Native,
                        unreadable_dirs: out.unreadable_dirs,
                    }
                }
                ScanStrategy::NamePruned => {
                    self.walk(strategy, &WalkMode::Window(plan.window.clone()))?
                }
                ScanStrategy::TimePruned => match plan.cutoff {
                    Some(cutoff) => self.walk(strategy, &WalkMode::ModifiedSince(cutoff))?,
                    None => continue,
                },
                ScanStrategy::Full => self.walk(strategy, &WalkMode::Full)?,
            };

            unreadable_dirs += found.unreadable_dirs;
            found.unreadable_dirs = unreadable_dirs;
            let pdfs = found.files.iter().filter(|rel| is_pdf(rel)).count();
            info!(
                strategy = ?strategy,
                backend = ?found.backend,
                files = found.files.len(),
                pdfs,
                "candidates collected"
            );
            if pdfs > 0 {
                return Ok(found);
            }
            last = Some(found);
        }

        last.ok_or_else(|| ScanError::config("no scan strategy applies"))
    }

    fn walk(&self, strategy: ScanStrategy, mode: &WalkMode) -> Result<Candidates, ScanError> {
        let output = self.walker.walk(mode)?;
        Ok(Candidates {
            files: output.files,
            strategy,
            backend: output.backend,
            unreadable_dirs: output.unreadable_dirs,
        })
    }
}
