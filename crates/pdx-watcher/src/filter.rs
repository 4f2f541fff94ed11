//! File filtering for watch events.
//!
//! Filtering happens on the watcher thread, before events reach the channel,
//! so a burst of unrelated writes on the share never wakes the consumer.
//!
//! # Examples
//!
//! ```
//! use camino::Utf8Path;
//! use pdx_watcher::{FileFilter, PdfFilter};
//!
//! let filter = PdfFilter::default();
//! assert!(filter.should_process(Utf8Path::new("/mnt/pdfs/2026/01/29/1254871.PDF")));
//! assert!(!filter.should_process(Utf8Path::new("/mnt/pdfs/2026/01/29/notes.txt")));
//! assert!(!filter.should_process(Utf8Path::new("/mnt/pdfs/2026/01/29/~$draft.pdf")));
//! ```

use camino::Utf8Path;
use smallvec::{SmallVec, smallvec};

/// A predicate deciding which changed paths are forwarded.
///
/// Filters run on the blocking watcher thread and are moved into it, hence
/// the `Send + Sync + 'static` bound.
pub trait FileFilter: Send + Sync + 'static {
    /// Returns `true` if the change at `path` should be forwarded.
    fn should_process(&self, path: &Utf8Path) -> bool;
}

/// Forwards every change.
#[derive(Debug, Clone, Copy, Default)]
pub struct AcceptAllFilter;

impl FileFilter for AcceptAllFilter {
    #[inline]
    fn should_process(&self, _path: &Utf8Path) -> bool {
        true
    }
}

/// Forwards changes to `.pdf` files (case-insensitive).
///
/// File names starting with one of the ignored prefixes are dropped; by
/// default these are hidden files (`.`) and Office lock files (`~$`), which
/// scanners and editors drop next to real documents.
#[derive(Debug, Clone)]
pub struct PdfFilter {
    ignored_prefixes: SmallVec<[String; 4]>,
}

impl Default for PdfFilter {
    fn default() -> Self {
        Self {
            ignored_prefixes: smallvec![".".to_owned(), "~$".to_owned()],
        }
    }
}

impl PdfFilter {
    /// Creates a filter with the default ignored prefixes.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Also drops file names starting with `prefix`.
    #[must_use]
    pub fn ignore_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.ignored_prefixes.push(prefix.into());
        self
    }

    /// Returns `true` for a path naming a PDF, regardless of prefixes.
    #[inline]
    #[must_use]
    pub fn is_pdf(path: &Utf8Path) -> bool {
        path.extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("pdf"))
    }
}

impl FileFilter for PdfFilter {
    fn should_process(&self, path: &Utf8Path) -> bool {
        let Some(name) = path.file_name() else {
            return false;
        };
        Self::is_pdf(path)
            && !self
                .ignored_prefixes
                .iter()
                .any(|prefix| name.starts_with(prefix.as_str()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_accept_all() {
        assert!(AcceptAllFilter.should_process(Utf8Path::new("anything.txt")));
    }

    #[test]
    fn test_pdf_extension_any_case() {
        let filter = PdfFilter::new();
        assert!(filter.should_process(Utf8Path::new("ENERO 2026/30 ENERO/a.pdf")));
        assert!(filter.should_process(Utf8Path::new("ENERO 2026/30 ENERO/a.Pdf")));
        assert!(!filter.should_process(Utf8Path::new("ENERO 2026/30 ENERO/a.pdf.tmp")));
        assert!(!filter.should_process(Utf8Path::new("ENERO 2026/30 ENERO")));
    }

    #[test]
    fn test_ignored_prefixes() {
        let filter = PdfFilter::new().ignore_prefix("scan_tmp");
        assert!(!filter.should_process(Utf8Path::new("2026/01/29/.hidden.pdf")));
        assert!(!filter.should_process(Utf8Path::new("2026/01/29/~$a.pdf")));
        assert!(!filter.should_process(Utf8Path::new("2026/01/29/scan_tmp01.pdf")));
        assert!(filter.should_process(Utf8Path::new("2026/01/29/scan01.pdf")));
    }
}
