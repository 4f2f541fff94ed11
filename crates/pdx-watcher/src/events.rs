//! Change events and batches.
//!
//! # Event Flow
//!
//! ```text
//! Share change
//!        │
//!        ▼
//! notify-debouncer-mini (debounce window)
//!        │
//!        ▼
//!   FileFilter → FileEvent
//!        │
//!        ▼
//!   FileWatcher::next_batch → FileEventBatch → rescan
//! ```

use std::time::Instant;

use camino::{Utf8Path, Utf8PathBuf};
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

/// A debounced change to one path.
///
/// The debouncer does not distinguish create, modify or delete; a rescan
/// treats them alike.
///
/// # Examples
///
/// ```
/// use camino::{Utf8Path, Utf8PathBuf};
/// use pdx_watcher::FileEvent;
///
/// let event = FileEvent::new(Utf8PathBuf::from("/mnt/pdfs/2026/01/29/a.pdf"));
/// assert_eq!(
///     event.relative_to(Utf8Path::new("/mnt/pdfs")).as_deref(),
///     Some("2026/01/29/a.pdf")
/// );
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileEvent {
    /// Absolute path that changed.
    pub path: Utf8PathBuf,

    /// When the event was received.
    pub timestamp: Instant,
}

impl FileEvent {
    /// Creates an event stamped now.
    #[inline]
    #[must_use]
    pub fn new(path: Utf8PathBuf) -> Self {
        Self {
            path,
            timestamp: Instant::now(),
        }
    }

    /// Returns the path relative to `root`, `/`-separated, or `None` if the
    /// event lies outside it.
    #[must_use]
    pub fn relative_to(&self, root: &Utf8Path) -> Option<String> {
        let rel = self.path.strip_prefix(root).ok()?;
        let parts: Vec<&str> = rel.components().map(|c| c.as_str()).collect();
        if parts.is_empty() {
            return None;
        }
        Some(parts.join("/"))
    }

    /// Returns the file name, if any.
    #[inline]
    #[must_use]
    pub fn file_name(&self) -> Option<&str> {
        self.path.file_name()
    }
}

/// Events collected together and handled by one rescan.
///
/// Inline storage covers the common burst of a handful of uploads.
#[derive(Debug, Clone)]
pub struct FileEventBatch {
    /// The events in arrival order.
    pub events: SmallVec<[FileEvent; 8]>,

    /// When the batch was started.
    pub received_at: Instant,
}

impl FileEventBatch {
    /// Creates an empty batch.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self {
            events: SmallVec::new(),
            received_at: Instant::now(),
        }
    }

    /// Adds an event.
    #[inline]
    pub fn push(&mut self, event: FileEvent) {
        self.events.push(event);
    }

    /// Returns the number of events.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.events.len()
    }

    /// Returns `true` if the batch holds no events.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Returns the distinct paths, sorted.
    #[must_use]
    pub fn unique_paths(&self) -> Vec<&Utf8PathBuf> {
        let mut paths: Vec<&Utf8PathBuf> = self.events.iter().map(|e| &e.path).collect();
        paths.sort();
        paths.dedup();
        paths
    }

    /// Summarizes the batch for logging.
    #[must_use]
    pub fn summary(&self) -> BatchSummary {
        BatchSummary {
            total_events: self.len(),
            unique_files: self.unique_paths().len(),
        }
    }
}

impl Default for FileEventBatch {
    fn default() -> Self {
        Self::new()
    }
}

impl FromIterator<FileEvent> for FileEventBatch {
    fn from_iter<T: IntoIterator<Item = FileEvent>>(iter: T) -> Self {
        Self {
            events: iter.into_iter().collect(),
            received_at: Instant::now(),
        }
    }
}

impl<'a> IntoIterator for &'a FileEventBatch {
    type Item = &'a FileEvent;
    type IntoIter = std::slice::Iter<'a, FileEvent>;

    fn into_iter(self) -> Self::IntoIter {
        self.events.iter()
    }
}

/// Counts for one batch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchSummary {
    /// Events in the batch.
    pub total_events: usize,
    /// Distinct files touched.
    pub unique_files: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn event(path: &str) -> FileEvent {
        FileEvent::new(Utf8PathBuf::from(path))
    }

    #[test]
    fn test_relative_to_root() {
        let root = Utf8Path::new("/mnt/pdfs");
        assert_eq!(
            event("/mnt/pdfs/JULIO 2025/19 JULIO/a.pdf")
                .relative_to(root)
                .as_deref(),
            Some("JULIO 2025/19 JULIO/a.pdf")
        );
        assert_eq!(event("/mnt/other/a.pdf").relative_to(root), None);
        assert_eq!(event("/mnt/pdfs").relative_to(root), None);
    }

    #[test]
    fn test_batch_unique_paths_and_summary() {
        let batch: FileEventBatch = [
            event("/s/2026/01/29/a.pdf"),
            event("/s/2026/01/29/a.pdf"),
            event("/s/2026/01/29/b.pdf"),
        ]
        .into_iter()
        .collect();

        assert_eq!(batch.len(), 3);
        assert_eq!(batch.unique_paths().len(), 2);
        assert_eq!(
            batch.summary(),
            BatchSummary {
                total_events: 3,
                unique_files: 2,
            }
        );
        assert_eq!((&batch).into_iter().count(), 3);
    }

    #[test]
    fn test_empty_batch() {
        let mut batch = FileEventBatch::default();
        assert!(batch.is_empty());
        batch.push(event("/s/x.pdf"));
        assert_eq!(batch.events[0].file_name(), Some("x.pdf"));
    }

    #[test]
    fn test_summary_serializes() {
        let json = serde_json::to_string(&BatchSummary {
            total_events: 2,
            unique_files: 1,
        })
        .unwrap();
        assert_eq!(json, r#"{"total_events":2,"unique_files":1}"#);
    }
}
