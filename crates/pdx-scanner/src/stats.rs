//! Scan statistics with atomic counters.
//!
//! This module provides [`ScanStats`] for tallying per-file outcomes and
//! [`StatsSnapshot`] for point-in-time views.
//!
//! # Thread Safety
//!
//! All counters use [`AtomicU64`] with [`Relaxed`](std::sync::atomic::Ordering::Relaxed)
//! ordering. The tallies are reported, never used for synchronization.
//!
//! # Examples
//!
//! ```
//! use pdx_catalog::UpsertOutcome;
//! use pdx_scanner::ScanStats;
//!
//! let stats = ScanStats::new();
//! stats.increment_ok();
//! stats.record_upsert(UpsertOutcome::Inserted);
//! stats.increment_bad();
//!
//! let snapshot = stats.snapshot();
//! assert_eq!((snapshot.ok, snapshot.bad, snapshot.inserted), (1, 1, 1));
//! ```

use std::sync::atomic::{AtomicU64, Ordering};

use pdx_catalog::UpsertOutcome;
use serde::{Deserialize, Serialize};

/// Atomic counters for scan statistics.
#[derive(Debug, Default)]
pub struct ScanStats {
    /// PDFs resolved and upserted (or printed, in a dry run).
    ok: AtomicU64,
    /// Non-PDFs and files outside the time or year filter.
    skipped: AtomicU64,
    /// PDFs whose date could not be inferred.
    bad: AtomicU64,
    /// Upserts that created a row.
    inserted: AtomicU64,
    /// Upserts that changed a row.
    updated: AtomicU64,
    /// Upserts that found an identical row.
    unchanged: AtomicU64,
}

impl ScanStats {
    /// Creates a new [`ScanStats`] with all counters at zero.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Increments the ok counter.
    #[inline]
    pub fn increment_ok(&self) {
        self.ok.fetch_add(1, Ordering::Relaxed);
    }

    /// Increments the skipped counter.
    #[inline]
    pub fn increment_skipped(&self) {
        self.skipped.fetch_add(1, Ordering::Relaxed);
    }

    /// Increments the bad counter.
    #[inline]
    pub fn increment_bad(&self) {
        self.bad.fetch_add(1, Ordering::Relaxed);
    }

    /// Tallies what an upsert did.
    #[inline]
    pub fn record_upsert(&self, outcome: UpsertOutcome) {
        let counter = match outcome {
            UpsertOutcome::Inserted => &self.inserted,
            UpsertOutcome::Updated => &self.updated,
            UpsertOutcome::Unchanged => &self.unchanged,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    /// Returns a point-in-time snapshot of all statistics.
    #[must_use]
    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            ok: self.ok.load(Ordering::Relaxed),
            skipped: self.skipped.load(Ordering::Relaxed),
            bad: self.bad.load(Ordering::Relaxed),
            inserted: self.inserted.load(Ordering::Relaxed),
            updated: self.updated.load(Ordering::Relaxed),
            unchanged: self.unchanged.load(Ordering::Relaxed),
        }
    }
}

/// A point-in-time snapshot of scan statistics.
///
/// `inserted + updated + unchanged == ok` for a scan that wrote to the
/// catalog; all three stay zero in a dry run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct StatsSnapshot {
    /// PDFs resolved and upserted (or printed, in a dry run).
    pub ok: u64,
    /// Non-PDFs and files outside the time or year filter.
    pub skipped: u64,
    /// PDFs whose date could not be inferred.
    pub bad: u64,
    /// Upserts that created a row.
    pub inserted: u64,
    /// Upserts that changed a row.
    pub updated: u64,
    /// Upserts that found an identical row.
    pub unchanged: u64,
}

impl StatsSnapshot {
    /// Total files considered.
    ///
    /// # Examples
    ///
    /// ```
    /// use pdx_scanner::StatsSnapshot;
    ///
    /// let snap = StatsSnapshot { ok: 10, skipped: 3, bad: 2, ..Default::default() };
    /// assert_eq!(snap.total(), 15);
    /// ```
    #[inline]
    #[must_use]
    pub const fn total(&self) -> u64 {
        self.ok + self.skipped + self.bad
    }

    /// Rows the scan actually wrote.
    #[inline]
    #[must_use]
    pub const fn written(&self) -> u64 {
        self.inserted + self.updated
    }
}
