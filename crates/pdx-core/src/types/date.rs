//! Calendar dates inferred from directory names.
//!
//! This module provides [`ResolvedDate`], a fully validated (year, month, day)
//! triple, and [`PartialDate`], the incomplete form produced while descending
//! a directory tree before the deeper segments are known.

use std::fmt;

use chrono::{Datelike, Local, NaiveDate};
use serde::Serialize;

/// Earliest year accepted for a resolved date.
pub const MIN_YEAR: i32 = 1990;

/// A (year, month, day) triple that passed range validation.
///
/// The invariant is enforced uniformly no matter which strategy produced the
/// values: `year` is in `[MIN_YEAR, current_year + 1]`, `month` in `[1, 12]`
/// and `day` in `[1, 31]`. There is no calendar check beyond the ranges, so
/// `2025-02-31` is accepted.
///
/// # Examples
///
/// ```
/// use pdx_core::ResolvedDate;
///
/// let date = ResolvedDate::with_max_year(2025, 7, 19, 2026).unwrap();
/// assert_eq!(date.to_string(), "2025-07-19");
///
/// assert!(ResolvedDate::with_max_year(1989, 7, 19, 2026).is_none());
/// assert!(ResolvedDate::with_max_year(2025, 13, 1, 2026).is_none());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct ResolvedDate {
    year: i32,
    month: u32,
    day: u32,
}

impl ResolvedDate {
    /// Validates a triple against the current local year.
    ///
    /// Returns `None` when any component falls outside its range; the triple
    /// is never clamped or partially trusted.
    #[must_use]
    pub fn new(year: i32, month: u32, day: u32) -> Option<Self> {
        Self::with_max_year(year, month, day, Self::max_year())
    }

    /// Validates a triple against an explicit upper year bound.
    #[must_use]
    pub const fn with_max_year(year: i32, month: u32, day: u32, max_year: i32) -> Option<Self> {
        if year < MIN_YEAR || year > max_year {
            return None;
        }
        if month < 1 || month > 12 {
            return None;
        }
        if day < 1 || day > 31 {
            return None;
        }
        Some(Self { year, month, day })
    }

    /// Returns the latest accepted year (`current local year + 1`).
    #[must_use]
    pub fn max_year() -> i32 {
        Local::now().year() + 1
    }

    /// Returns the year.
    #[inline]
    #[must_use]
    pub const fn year(self) -> i32 {
        self.year
    }

    /// Returns the month (1-12).
    #[inline]
    #[must_use]
    pub const fn month(self) -> u32 {
        self.month
    }

    /// Returns the day of month (1-31).
    #[inline]
    #[must_use]
    pub const fn day(self) -> u32 {
        self.day
    }

    /// Converts to a [`NaiveDate`], or `None` for lenient dates such as
    /// February 31 that are not real calendar days.
    #[must_use]
    pub fn to_naive(self) -> Option<NaiveDate> {
        NaiveDate::from_ymd_opt(self.year, self.month, self.day)
    }
}

impl fmt::Display for ResolvedDate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}-{:02}", self.year, self.month, self.day)
    }
}

/// A date with some components still unknown.
///
/// Produced from the directory segments seen so far while walking, and
/// compared against a [`ScanWindow`](crate::ScanWindow) to decide whether a
/// subtree can be skipped.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct PartialDate {
    /// Year, if known.
    pub year: Option<i32>,
    /// Month (1-12), if known.
    pub month: Option<u32>,
    /// Day of month, if known.
    pub day: Option<u32>,
}

impl PartialDate {
    /// Returns `true` when no component is known.
    #[inline]
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.year.is_none() && self.month.is_none() && self.day.is_none()
    }

    /// Returns `true` when every component is known.
    #[inline]
    #[must_use]
    pub const fn is_complete(&self) -> bool {
        self.year.is_some() && self.month.is_some() && self.day.is_some()
    }

    /// Validates a complete partial date into a [`ResolvedDate`].
    #[must_use]
    pub const fn to_resolved(&self, max_year: i32) -> Option<ResolvedDate> {
        match (self.year, self.month, self.day) {
            (Some(y), Some(m), Some(d)) => ResolvedDate::with_max_year(y, m, d, max_year),
            _ => None,
        }
    }
}

impl From<ResolvedDate> for PartialDate {
    fn from(date: ResolvedDate) -> Self {
        Self {
            year: Some(date.year),
            month: Some(date.month),
            day: Some(date.day),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolved_date_bounds() {
        assert!(ResolvedDate::with_max_year(MIN_YEAR, 1, 1, 2027).is_some());
        assert!(ResolvedDate::with_max_year(2027, 12, 31, 2027).is_some());
        assert!(ResolvedDate::with_max_year(2028, 1, 1, 2027).is_none());
        assert!(ResolvedDate::with_max_year(MIN_YEAR - 1, 1, 1, 2027).is_none());
        assert!(ResolvedDate::with_max_year(2025, 0, 1, 2027).is_none());
        assert!(ResolvedDate::with_max_year(2025, 1, 0, 2027).is_none());
        assert!(ResolvedDate::with_max_year(2025, 1, 32, 2027).is_none());
    }

    #[test]
    fn test_resolved_date_is_lenient_about_calendar() {
        let date = ResolvedDate::with_max_year(2025, 2, 31, 2027).unwrap();
        assert_eq!(date.day(), 31);
        assert!(date.to_naive().is_none());
    }

    #[test]
    fn test_resolved_date_display() {
        let date = ResolvedDate::with_max_year(2026, 1, 5, 2027).unwrap();
        assert_eq!(date.to_string(), "2026-01-05");
    }

    #[test]
    fn test_new_uses_current_year_ceiling() {
        let next = Local::now().year() + 1;
        assert!(ResolvedDate::new(next, 1, 1).is_some());
        assert!(ResolvedDate::new(next + 1, 1, 1).is_none());
    }

    #[test]
    fn test_partial_date_completeness() {
        let mut partial = PartialDate::default();
        assert!(partial.is_empty());
        partial.year = Some(2026);
        assert!(!partial.is_empty());
        assert!(!partial.is_complete());
        assert!(partial.to_resolved(2027).is_none());
        partial.month = Some(1);
        partial.day = Some(30);
        assert!(partial.is_complete());
        assert_eq!(
            partial.to_resolved(2027),
            ResolvedDate::with_max_year(2026, 1, 30, 2027)
        );
    }
}
