//! Filtered, paginated listing of catalog entries.

use std::cmp::Ordering;

use pdx_core::CatalogEntry;
use serde::Serialize;

/// Default page size.
pub const DEFAULT_PER_PAGE: usize = 20;

/// Largest accepted page size.
pub const MAX_PER_PAGE: usize = 500;

/// Listing filters.
///
/// Year, month and day are equality filters; `search` is a case-insensitive
/// substring match on the display name. Results are ordered newest date
/// first, ties broken by path.
///
/// # Examples
///
/// ```
/// use pdx_catalog::CatalogQuery;
///
/// let query = CatalogQuery::new().year(2026).month(1).search("informe").page(2);
/// assert_eq!(query.offset(), 20);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CatalogQuery {
    /// Year filter.
    pub year: Option<i32>,
    /// Month filter.
    pub month: Option<u32>,
    /// Day filter.
    pub day: Option<u32>,
    /// Display-name substring.
    pub search: Option<String>,
    /// 1-based page number.
    pub page: usize,
    /// Entries per page.
    pub per_page: usize,
}

impl Default for CatalogQuery {
    fn default() -> Self {
        Self {
            year: None,
            month: None,
            day: None,
            search: None,
            page: 1,
            per_page: DEFAULT_PER_PAGE,
        }
    }
}

impl CatalogQuery {
    /// Creates an unfiltered query for the first page.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Filters on year.
    #[must_use]
    pub const fn year(mut self, year: i32) -> Self {
        self.year = Some(year);
        self
    }

    /// Filters on month.
    #[must_use]
    pub const fn month(mut self, month: u32) -> Self {
        self.month = Some(month);
        self
    }

    /// Filters on day.
    #[must_use]
    pub const fn day(mut self, day: u32) -> Self {
        self.day = Some(day);
        self
    }

    /// Filters on a display-name substring. Blank input clears the filter.
    #[must_use]
    pub fn search(mut self, needle: impl Into<String>) -> Self {
        let needle = needle.into();
        self.search = if needle.trim().is_empty() {
            None
        } else {
            Some(needle)
        };
        self
    }

    /// Selects a page (`0` is treated as `1`).
    #[must_use]
    pub const fn page(mut self, page: usize) -> Self {
        self.page = page;
        self
    }

    /// Sets the page size.
    #[must_use]
    pub const fn per_page(mut self, per_page: usize) -> Self {
        self.per_page = per_page;
        self
    }

    /// Page number after clamping to at least 1.
    #[must_use]
    pub const fn effective_page(&self) -> usize {
        if self.page == 0 { 1 } else { self.page }
    }

    /// Page size after clamping to `1..=MAX_PER_PAGE`.
    #[must_use]
    pub fn effective_per_page(&self) -> usize {
        self.per_page.clamp(1, MAX_PER_PAGE)
    }

    /// Number of entries preceding the selected page.
    #[must_use]
    pub fn offset(&self) -> usize {
        (self.effective_page() - 1).saturating_mul(self.effective_per_page())
    }

    /// Returns `true` if `entry` passes every filter.
    #[must_use]
    pub fn matches(&self, entry: &CatalogEntry) -> bool {
        if self.year.is_some_and(|year| entry.date.year() != year) {
            return false;
        }
        if self.month.is_some_and(|month| entry.date.month() != month) {
            return false;
        }
        if self.day.is_some_and(|day| entry.date.day() != day) {
            return false;
        }
        match &self.search {
            Some(needle) => entry
                .name
                .to_lowercase()
                .contains(&needle.to_lowercase()),
            None => true,
        }
    }
}

/// Listing order: newest date first, then path.
#[must_use]
pub fn listing_order(a: &CatalogEntry, b: &CatalogEntry) -> Ordering {
    b.date.cmp(&a.date).then_with(|| a.path.cmp(&b.path))
}

/// One page of listing results.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CatalogPage {
    /// Entries on this page.
    pub entries: Vec<CatalogEntry>,
    /// Matching entries across all pages.
    pub total: usize,
    /// 1-based page number.
    pub page: usize,
    /// Page size used.
    pub per_page: usize,
}

impl CatalogPage {
    /// Number of the last page (at least 1).
    #[must_use]
    pub const fn last_page(&self) -> usize {
        if self.total == 0 {
            1
        } else {
            self.total.div_ceil(self.per_page)
        }
    }
}

#[cfg(test)]
mod tests {
    use pdx_core::ResolvedDate;

    use super::*;

    fn entry(path: &str, name: &str, y: i32, m: u32, d: u32) -> CatalogEntry {
        CatalogEntry::remote(path, name, ResolvedDate::with_max_year(y, m, d, 2027).unwrap())
    }

    #[test]
    fn test_matches_filters() {
        let e = entry("2026/01/29/Informe-A.pdf", "Informe-A.pdf", 2026, 1, 29);
        assert!(CatalogQuery::new().matches(&e));
        assert!(CatalogQuery::new().year(2026).month(1).day(29).matches(&e));
        assert!(!CatalogQuery::new().year(2025).matches(&e));
        assert!(CatalogQuery::new().search("informe").matches(&e));
        assert!(!CatalogQuery::new().search("hemograma").matches(&e));
    }

    #[test]
    fn test_blank_search_is_ignored() {
        assert_eq!(CatalogQuery::new().search("   ").search, None);
    }

    #[test]
    fn test_pagination_clamps() {
        let query = CatalogQuery::new().page(0).per_page(0);
        assert_eq!(query.effective_page(), 1);
        assert_eq!(query.effective_per_page(), 1);
        assert_eq!(query.offset(), 0);
        let query = CatalogQuery::new().per_page(10_000);
        assert_eq!(query.effective_per_page(), MAX_PER_PAGE);
    }

    #[test]
    fn test_listing_order() {
        let mut entries = [
            entry("b.pdf", "b", 2025, 7, 19),
            entry("c.pdf", "c", 2026, 1, 1),
            entry("a.pdf", "a", 2025, 7, 19),
        ];
        entries.sort_by(listing_order);
        let paths: Vec<_> = entries.iter().map(|e| e.path.as_str()).collect();
        assert_eq!(paths, ["c.pdf", "a.pdf", "b.pdf"]);
    }

    #[test]
    fn test_last_page() {
        let page = CatalogPage {
            entries: Vec::new(),
            total: 41,
            page: 1,
            per_page: 20,
        };
        assert_eq!(page.last_page(), 3);
    }
}
