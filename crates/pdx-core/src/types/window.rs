//! Explicit day sets for windowed scans.
//!
//! A [`ScanWindow`] lists every calendar day a windowed scan is allowed to
//! match. It is derived from a cutoff instant and the current moment, and is
//! consulted both by the name-pruned walker and by the targeted locator.

use std::collections::BTreeSet;

use chrono::{DateTime, Datelike, Local, NaiveDate, TimeZone};

use crate::{FxHashSet, PartialDate, ResolvedDate};

/// The explicit set of days of interest for a scan.
///
/// An empty window means no time filter was requested, so no window pruning
/// applies and [`admits`](Self::admits) accepts everything.
///
/// # Examples
///
/// ```
/// use chrono::NaiveDate;
/// use pdx_core::{PartialDate, ScanWindow};
///
/// let day = NaiveDate::from_ymd_opt(2026, 1, 29).unwrap();
/// let window = ScanWindow::from_days([day]);
///
/// let year_2025 = PartialDate { year: Some(2025), ..PartialDate::default() };
/// let year_2026 = PartialDate { year: Some(2026), ..PartialDate::default() };
/// assert!(!window.admits(&year_2025));
/// assert!(window.admits(&year_2026));
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScanWindow {
    days: BTreeSet<NaiveDate>,
    years: FxHashSet<i32>,
    year_months: FxHashSet<(i32, u32)>,
}

impl ScanWindow {
    /// Creates an empty window (no time filter).
    #[inline]
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    /// Creates a window from explicit days. Duplicates collapse.
    #[must_use]
    pub fn from_days(days: impl IntoIterator<Item = NaiveDate>) -> Self {
        let mut window = Self::default();
        for day in days {
            window.years.insert(day.year());
            window.year_months.insert((day.year(), day.month()));
            window.days.insert(day);
        }
        window
    }

    /// Creates a window covering every day from `first` through `last`
    /// inclusive. Empty when `first` is after `last`.
    #[must_use]
    pub fn between(first: NaiveDate, last: NaiveDate) -> Self {
        Self::from_days(first.iter_days().take_while(|day| *day <= last))
    }

    /// Creates a window covering the local days from `cutoff` to `now`.
    #[must_use]
    pub fn since<Tz: TimeZone>(cutoff: &DateTime<Tz>, now: &DateTime<Tz>) -> Self {
        Self::between(cutoff.date_naive(), now.date_naive())
    }

    /// Creates a window holding only the local day of `now`.
    #[must_use]
    pub fn today(now: &DateTime<Local>) -> Self {
        Self::from_days([now.date_naive()])
    }

    /// Returns `true` when no time filter applies.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.days.is_empty()
    }

    /// Number of days in the window.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.days.len()
    }

    /// Iterates the days in ascending order.
    pub fn days(&self) -> impl Iterator<Item = NaiveDate> + '_ {
        self.days.iter().copied()
    }

    /// Returns `true` if any window day falls in `year`.
    #[inline]
    #[must_use]
    pub fn contains_year(&self, year: i32) -> bool {
        self.years.contains(&year)
    }

    /// Returns `true` if any window day falls in `year`/`month`.
    #[inline]
    #[must_use]
    pub fn contains_year_month(&self, year: i32, month: u32) -> bool {
        self.year_months.contains(&(year, month))
    }

    /// Returns `true` if `date` is exactly one of the window days.
    ///
    /// Lenient dates that are not real calendar days never match.
    #[must_use]
    pub fn contains(&self, date: ResolvedDate) -> bool {
        date.to_naive().is_some_and(|day| self.days.contains(&day))
    }

    /// Decides whether a subtree with the given partial date may still hold
    /// files inside the window.
    ///
    /// Returns `false` only when the partial date is provably outside every
    /// window day. Month or day without a year never prunes.
    #[must_use]
    pub fn admits(&self, partial: &PartialDate) -> bool {
        if self.is_empty() {
            return true;
        }
        match (partial.year, partial.month, partial.day) {
            (Some(y), Some(m), Some(d)) => NaiveDate::from_ymd_opt(y, m, d)
                .is_some_and(|day| self.days.contains(&day)),
            (Some(y), Some(m), None) => self.contains_year_month(y, m),
            (Some(y), None, _) => self.contains_year(y),
            (None, _, _) => true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn partial(year: Option<i32>, month: Option<u32>, day: Option<u32>) -> PartialDate {
        PartialDate { year, month, day }
    }

    #[test]
    fn test_empty_window_admits_everything() {
        let window = ScanWindow::empty();
        assert!(window.is_empty());
        assert!(window.admits(&partial(Some(1999), Some(1), Some(1))));
    }

    #[test]
    fn test_between_spans_month_boundary() {
        let window = ScanWindow::between(day(2026, 1, 30), day(2026, 2, 2));
        assert_eq!(window.len(), 4);
        assert!(window.contains_year_month(2026, 1));
        assert!(window.contains_year_month(2026, 2));
        assert!(!window.contains_year_month(2026, 3));
    }

    #[test]
    fn test_between_inverted_is_empty() {
        let window = ScanWindow::between(day(2026, 2, 2), day(2026, 1, 30));
        assert!(window.is_empty());
    }

    #[test]
    fn test_from_days_dedupes() {
        let window = ScanWindow::from_days([day(2026, 1, 29), day(2026, 1, 29)]);
        assert_eq!(window.len(), 1);
    }

    #[test]
    fn test_since_uses_calendar_days() {
        let now = Local.with_ymd_and_hms(2026, 1, 29, 0, 30, 0).unwrap();
        let cutoff = now - chrono::Duration::minutes(60);
        let window = ScanWindow::since(&cutoff, &now);
        let days: Vec<_> = window.days().collect();
        assert_eq!(days, vec![day(2026, 1, 28), day(2026, 1, 29)]);
    }

    #[test]
    fn test_admits_prunes_by_year_month_and_day() {
        let window = ScanWindow::from_days([day(2026, 1, 29)]);
        assert!(!window.admits(&partial(Some(2025), None, None)));
        assert!(window.admits(&partial(Some(2026), None, None)));
        assert!(!window.admits(&partial(Some(2026), Some(2), None)));
        assert!(window.admits(&partial(Some(2026), Some(1), None)));
        assert!(!window.admits(&partial(Some(2026), Some(1), Some(28))));
        assert!(window.admits(&partial(Some(2026), Some(1), Some(29))));
        assert!(window.admits(&partial(None, Some(7), Some(3))));
    }

    #[test]
    fn test_contains_resolved_date() {
        let window = ScanWindow::from_days([day(2026, 1, 29)]);
        let inside = ResolvedDate::with_max_year(2026, 1, 29, 2027).unwrap();
        let outside = ResolvedDate::with_max_year(2026, 1, 30, 2027).unwrap();
        assert!(window.contains(inside));
        assert!(!window.contains(outside));
    }
}
