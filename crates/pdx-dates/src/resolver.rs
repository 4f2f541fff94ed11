//! Path Date Resolver.
//!
//! Turns the directory segments of a relative path into a [`ResolvedDate`]
//! by trying an ordered list of [`Strategy`] values; the first strategy whose
//! shape matches wins, and its triple then goes through range validation.
//!
//! # Strategy priority
//!
//! 1. [`Strategy::NumericTriple`]: the last three segments are `YYYY`,
//!    `M(M)`, `D(D)`.
//! 2. [`Strategy::MonthYearDayMonth`]: the first "Month Year" segment and the
//!    first "Day Month" segment found anywhere in the path, so category or
//!    subject folders may sit between or around them.
//!
//! When neither yields a complete triple the path is unresolved; nothing is
//! guessed.
//!
//! # Partial resolution
//!
//! [`PathDateResolver::resolve_partial`] applies the same readings to an
//! incomplete prefix of directories (root to the directory about to be
//! entered) and reports whatever it can: a year alone, a year and month, or a
//! full triple. The name-pruned walker compares it against a scan window.

use pdx_core::{PartialDate, PathSegments, ResolvedDate};
use serde::Serialize;

use crate::Unresolved;
use crate::token::{parse_day_month, parse_month_year, parse_small, parse_year};

/// A named heuristic producing a candidate (year, month, day).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Strategy {
    /// `.../YYYY/MM/DD/file.pdf`
    NumericTriple,
    /// `.../<MONTH> <YEAR>/.../<DAY> <MONTH>/.../file.pdf`
    MonthYearDayMonth,
}

impl Strategy {
    /// Strategies in priority order.
    pub const ORDER: [Self; 2] = [Self::NumericTriple, Self::MonthYearDayMonth];

    /// Applies this strategy, returning the raw (unvalidated) triple when its
    /// shape matches.
    #[must_use]
    pub fn apply<S: AsRef<str>>(self, dirs: &[S]) -> Option<(i32, u32, u32)> {
        match self {
            Self::NumericTriple => numeric_triple(dirs),
            Self::MonthYearDayMonth => {
                let partial = scan_month_year_day_month(dirs);
                Some((partial.year?, partial.month?, partial.day?))
            }
        }
    }

    /// Short label for logs and reports.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::NumericTriple => "numeric_triple",
            Self::MonthYearDayMonth => "month_year_day_month",
        }
    }
}

/// A successfully resolved date and the strategy that produced it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct Resolution {
    /// The validated date.
    pub date: ResolvedDate,
    /// The strategy that matched.
    pub strategy: Strategy,
}

/// Resolves directory segments to dates.
///
/// Holds the upper year bound used for range validation; [`new`](Self::new)
/// takes it from the current local year.
///
/// # Examples
///
/// ```
/// use pdx_dates::PathDateResolver;
///
/// let resolver = PathDateResolver::with_max_year(2027);
/// let date = resolver.resolve_dirs(&["2025", "07", "19"]).unwrap().date;
/// assert_eq!((date.year(), date.month(), date.day()), (2025, 7, 19));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PathDateResolver {
    max_year: i32,
}

impl Default for PathDateResolver {
    fn default() -> Self {
        Self::new()
    }
}

impl PathDateResolver {
    /// Creates a resolver bounded by `current local year + 1`.
    #[must_use]
    pub fn new() -> Self {
        Self {
            max_year: ResolvedDate::max_year(),
        }
    }

    /// Creates a resolver with an explicit upper year bound.
    #[must_use]
    pub const fn with_max_year(max_year: i32) -> Self {
        Self { max_year }
    }

    /// Returns the upper year bound.
    #[inline]
    #[must_use]
    pub const fn max_year(&self) -> i32 {
        self.max_year
    }

    /// Resolves a raw relative file path.
    ///
    /// # Errors
    ///
    /// Returns [`Unresolved::Malformed`] when the path has no directory,
    /// otherwise as [`resolve_dirs`](Self::resolve_dirs).
    pub fn resolve_path(&self, relative: &str) -> Result<Resolution, Unresolved> {
        let segments = PathSegments::parse(relative).ok_or(Unresolved::Malformed)?;
        self.resolve_segments(&segments)
    }

    /// Resolves already split path segments.
    ///
    /// # Errors
    ///
    /// As [`resolve_dirs`](Self::resolve_dirs).
    pub fn resolve_segments(&self, segments: &PathSegments) -> Result<Resolution, Unresolved> {
        self.resolve_dirs(segments.dirs())
    }

    /// Resolves the directory segments of a path (filename excluded).
    ///
    /// # Errors
    ///
    /// Returns [`Unresolved::Malformed`] for an empty slice,
    /// [`Unresolved::NoPattern`] when no strategy matches, and
    /// [`Unresolved::OutOfRange`] when the first matching strategy produced
    /// values outside the accepted ranges.
    pub fn resolve_dirs<S: AsRef<str>>(&self, dirs: &[S]) -> Result<Resolution, Unresolved> {
        if dirs.is_empty() {
            return Err(Unresolved::Malformed);
        }

        let (strategy, (year, month, day)) = Strategy::ORDER
            .into_iter()
            .find_map(|strategy| strategy.apply(dirs).map(|triple| (strategy, triple)))
            .ok_or(Unresolved::NoPattern)?;

        let date = ResolvedDate::with_max_year(year, month, day, self.max_year)
            .ok_or(Unresolved::OutOfRange { year, month, day })?;

        Ok(Resolution { date, strategy })
    }

    /// Reads whatever date components an incomplete directory prefix
    /// already determines.
    ///
    /// Priority mirrors full resolution: a complete numeric triple first,
    /// then the "Month Year"/"Day Month" scan, then a trailing numeric
    /// year or year/month run.
    ///
    /// # Examples
    ///
    /// ```
    /// use pdx_dates::PathDateResolver;
    ///
    /// let resolver = PathDateResolver::with_max_year(2027);
    /// let partial = resolver.resolve_partial(&["2026"]);
    /// assert_eq!(partial.year, Some(2026));
    /// assert_eq!(partial.month, None);
    /// ```
    #[must_use]
    pub fn resolve_partial<S: AsRef<str>>(&self, dirs: &[S]) -> PartialDate {
        if let Some((year, month, day)) = numeric_triple(dirs) {
            return PartialDate {
                year: Some(year),
                month: Some(month),
                day: Some(day),
            };
        }

        let spanish = scan_month_year_day_month(dirs);
        if !spanish.is_empty() {
            return spanish;
        }

        trailing_numeric_prefix(dirs)
    }
}

fn numeric_triple<S: AsRef<str>>(dirs: &[S]) -> Option<(i32, u32, u32)> {
    let [year, month, day] = dirs.last_chunk::<3>()?;
    Some((
        parse_year(year.as_ref())?,
        parse_small(month.as_ref())?,
        parse_small(day.as_ref())?,
    ))
}

fn scan_month_year_day_month<S: AsRef<str>>(dirs: &[S]) -> PartialDate {
    let mut month_year = None;
    let mut day_month = None;

    for dir in dirs {
        let dir = dir.as_ref();
        if month_year.is_none() {
            month_year = parse_month_year(dir);
        }
        if day_month.is_none() {
            day_month = parse_day_month(dir);
        }
        if month_year.is_some() && day_month.is_some() {
            break;
        }
    }

    let mut partial = PartialDate::default();
    if let Some(my) = month_year {
        partial.year = Some(my.year);
        partial.month = Some(my.month);
    }
    if let Some(dm) = day_month {
        partial.day = Some(dm.day);
        if partial.month.is_none() {
            partial.month = Some(dm.month);
        }
        if partial.year.is_none() {
            partial.year = dm.year;
        }
    }
    partial
}

fn trailing_numeric_prefix<S: AsRef<str>>(dirs: &[S]) -> PartialDate {
    if let Some([year, month]) = dirs.last_chunk::<2>() {
        if let (Some(year), Some(month)) = (parse_year(year.as_ref()), parse_small(month.as_ref())) {
            return PartialDate {
                year: Some(year),
                month: Some(month),
                day: None,
            };
        }
    }
    if let Some(year) = dirs.last().and_then(|last| parse_year(last.as_ref())) {
        return PartialDate {
            year: Some(year),
            ..PartialDate::default()
        };
    }
    PartialDate::default()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn resolver() -> PathDateResolver {
        PathDateResolver::with_max_year(2027)
    }

    fn ymd(resolution: Resolution) -> (i32, u32, u32) {
        let date = resolution.date;
        (date.year(), date.month(), date.day())
    }

    #[test]
    fn test_numeric_triple() {
        let resolution = resolver().resolve_path("2025/07/19/x.pdf").unwrap();
        assert_eq!(ymd(resolution), (2025, 7, 19));
        assert_eq!(resolution.strategy, Strategy::NumericTriple);
    }

    #[test]
    fn test_numeric_triple_unpadded() {
        let resolution = resolver().resolve_dirs(&["2025", "7", "9"]).unwrap();
        assert_eq!(ymd(resolution), (2025, 7, 9));
    }

    #[test]
    fn test_numeric_beats_month_year_ancestor() {
        let resolution = resolver()
            .resolve_path("ENERO 2024/2025/07/19/x.pdf")
            .unwrap();
        assert_eq!(ymd(resolution), (2025, 7, 19));
        assert_eq!(resolution.strategy, Strategy::NumericTriple);
    }

    #[test]
    fn test_upload_subtree() {
        let resolution = resolver()
            .resolve_path("SubidosApp/2026/01/29/abc_informe.pdf")
            .unwrap();
        assert_eq!(ymd(resolution), (2026, 1, 29));
    }

    #[test]
    fn test_spanish_nested_convention() {
        let resolution = resolver()
            .resolve_dirs(&["HEMATOLOGIA 2026", "ENERO 2026", "30 ENERO"])
            .unwrap();
        assert_eq!(ymd(resolution), (2026, 1, 30));
        assert_eq!(resolution.strategy, Strategy::MonthYearDayMonth);
    }

    #[test]
    fn test_padded_segments_still_resolve() {
        let resolution = resolver()
            .resolve_path("HEMATOLOGIA 2026/ENERO 2026 / 30 ENERO/x.pdf")
            .unwrap();
        assert_eq!(ymd(resolution), (2026, 1, 30));
        assert_eq!(
            resolver().resolve_path("2025/ 07/19 /x.pdf").map(ymd),
            Ok((2025, 7, 19))
        );
    }

    #[test]
    fn test_spanish_with_numeric_subfolder() {
        let resolution = resolver()
            .resolve_path("JULIO 2025/19 JULIO/123456/x.pdf")
            .unwrap();
        assert_eq!(ymd(resolution), (2025, 7, 19));
    }

    #[test]
    fn test_spanish_with_intervening_subject_folders() {
        let resolution = resolver()
            .resolve_path("LAB/10. OCTUBRE 2025/QUIMICA/SECCION B/5 OCTUBRE/x.pdf")
            .unwrap();
        assert_eq!(ymd(resolution), (2025, 10, 5));
    }

    #[test]
    fn test_month_from_month_year_wins() {
        let resolution = resolver()
            .resolve_dirs(&["JULIO 2025", "19 AGOSTO"])
            .unwrap();
        assert_eq!(ymd(resolution), (2025, 7, 19));
    }

    #[test]
    fn test_day_month_trailing_year_adopted() {
        let resolution = resolver().resolve_dirs(&["INFORMES", "31 MAYO 2024"]).unwrap();
        assert_eq!(ymd(resolution), (2024, 5, 31));
    }

    #[test]
    fn test_day_month_trailing_year_does_not_override() {
        let resolution = resolver()
            .resolve_dirs(&["MAYO 2024", "31 MAYO 2023"])
            .unwrap();
        assert_eq!(ymd(resolution), (2024, 5, 31));
    }

    #[test]
    fn test_setiembre_variant() {
        let a = resolver().resolve_dirs(&["SEPTIEMBRE 2025", "3 SEPTIEMBRE"]).unwrap();
        let b = resolver().resolve_dirs(&["SETIEMBRE 2025", "3 SETIEMBRE"]).unwrap();
        assert_eq!(ymd(a), (2025, 9, 3));
        assert_eq!(ymd(a), ymd(b));
    }

    #[test]
    fn test_accented_lowercase_segments() {
        let resolution = resolver()
            .resolve_dirs(&["Microbiología 2025", "diciembre 2025", "1 diciembre"])
            .unwrap();
        assert_eq!(ymd(resolution), (2025, 12, 1));
    }

    #[test]
    fn test_malformed_root_file() {
        assert_eq!(resolver().resolve_path("file.pdf"), Err(Unresolved::Malformed));
        let empty: [&str; 0] = [];
        assert_eq!(resolver().resolve_dirs(&empty), Err(Unresolved::Malformed));
    }

    #[test]
    fn test_no_pattern() {
        assert_eq!(
            resolver().resolve_path("VARIOS/escaneos/x.pdf"),
            Err(Unresolved::NoPattern)
        );
        // month year without a day is incomplete
        assert_eq!(
            resolver().resolve_dirs(&["ENERO 2026", "pendientes"]),
            Err(Unresolved::NoPattern)
        );
    }

    #[test]
    fn test_out_of_range_is_not_clamped() {
        assert_eq!(
            resolver().resolve_dirs(&["1850", "07", "19"]),
            Err(Unresolved::OutOfRange {
                year: 1850,
                month: 7,
                day: 19
            })
        );
        assert_eq!(
            resolver().resolve_dirs(&["2025", "13", "01"]),
            Err(Unresolved::OutOfRange {
                year: 2025,
                month: 13,
                day: 1
            })
        );
        assert_eq!(
            resolver().resolve_dirs(&["2028", "01", "01"]),
            Err(Unresolved::OutOfRange {
                year: 2028,
                month: 1,
                day: 1
            })
        );
        assert!(matches!(
            resolver().resolve_dirs(&["ENERO 2026", "45 ENERO"]),
            Err(Unresolved::OutOfRange { day: 45, .. })
        ));
    }

    #[test]
    fn test_thirty_first_of_short_month_accepted() {
        let resolution = resolver().resolve_dirs(&["2025", "04", "31"]).unwrap();
        assert_eq!(ymd(resolution), (2025, 4, 31));
    }

    #[test]
    fn test_partial_numeric_prefixes() {
        let r = resolver();
        assert_eq!(r.resolve_partial(&["2026"]).year, Some(2026));
        let ym = r.resolve_partial(&["SubidosApp", "2026", "01"]);
        assert_eq!((ym.year, ym.month, ym.day), (Some(2026), Some(1), None));
        let full = r.resolve_partial(&["2026", "01", "29"]);
        assert!(full.is_complete());
    }

    #[test]
    fn test_partial_spanish_prefixes() {
        let r = resolver();
        assert!(r.resolve_partial(&["HEMATOLOGIA 2026"]).is_empty());
        let ym = r.resolve_partial(&["HEMATOLOGIA 2026", "ENERO 2026"]);
        assert_eq!((ym.year, ym.month, ym.day), (Some(2026), Some(1), None));
        let full = r.resolve_partial(&["HEMATOLOGIA 2026", "ENERO 2026", "30 ENERO"]);
        assert_eq!((full.year, full.month, full.day), (Some(2026), Some(1), Some(30)));
        let day_only = r.resolve_partial(&["30 ENERO"]);
        assert_eq!((day_only.year, day_only.month), (None, Some(1)));
    }

    #[test]
    fn test_partial_unknown_prefix() {
        assert!(resolver().resolve_partial(&["VARIOS", "123456"]).is_empty());
        let empty: [&str; 0] = [];
        assert!(resolver().resolve_partial(&empty).is_empty());
    }

    #[test]
    fn test_strategy_serialization() {
        assert_eq!(
            serde_json::to_string(&Strategy::NumericTriple).unwrap(),
            r#""numeric_triple""#
        );
        assert_eq!(Strategy::MonthYearDayMonth.label(), "month_year_day_month");
    }
}
