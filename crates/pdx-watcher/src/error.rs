//! Error types for the pdx-watcher crate.

use camino::Utf8PathBuf;

/// Errors that can occur while watching the share.
///
/// # Error Recovery Strategy
///
/// - **Notify errors** ([`WatchError::Notify`]): fatal, the watch cannot be set up
/// - **Path not found** ([`WatchError::PathNotFound`]): fatal, the share root must exist
/// - **Channel closed** ([`WatchError::ChannelClosed`]): fatal, the consumer is gone
/// - **Non-UTF-8 path** ([`WatchError::NonUtf8Path`]): recoverable, the event is dropped
/// - **I/O errors** ([`WatchError::Io`]): fatal
///
/// # Examples
///
/// ```
/// use pdx_watcher::WatchError;
///
/// let err = WatchError::path_not_found("/mnt/pdfs");
/// assert!(err.is_fatal());
/// assert_eq!(err.to_string(), "watch path does not exist: /mnt/pdfs");
/// ```
#[derive(Debug, thiserror::Error)]
pub enum WatchError {
    /// Failed to initialize or operate the notify watcher.
    #[error("notify watcher error: {0}")]
    Notify(#[from] notify::Error),

    /// The share root does not exist.
    #[error("watch path does not exist: {0}")]
    PathNotFound(Utf8PathBuf),

    /// The watcher task stopped unexpectedly.
    #[error("event channel closed unexpectedly")]
    ChannelClosed,

    /// An event carried a path that is not valid UTF-8.
    #[error("path is not valid UTF-8: {}", _0.display())]
    NonUtf8Path(std::path::PathBuf),

    /// An I/O error occurred while resolving the watch path.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl WatchError {
    /// Creates a new [`WatchError::PathNotFound`] error.
    #[inline]
    pub fn path_not_found(path: impl Into<Utf8PathBuf>) -> Self {
        Self::PathNotFound(path.into())
    }

    /// Returns `true` if watching can continue after this error.
    #[inline]
    #[must_use]
    pub const fn is_recoverable(&self) -> bool {
        matches!(self, Self::NonUtf8Path(_))
    }

    /// Returns `true` if watching should stop.
    #[inline]
    #[must_use]
    pub const fn is_fatal(&self) -> bool {
        !self.is_recoverable()
    }
}

#[cfg(test)]
mod tests {
    use std::io;
    use std::path::PathBuf;

    use super::*;

    #[test]
    fn test_path_not_found_is_fatal() {
        let err = WatchError::path_not_found("/mnt/share");
        assert!(err.is_fatal());
        assert!(err.to_string().contains("/mnt/share"));
    }

    #[test]
    fn test_non_utf8_is_recoverable() {
        let err = WatchError::NonUtf8Path(PathBuf::from("x"));
        assert!(err.is_recoverable());
        assert!(err.to_string().contains("not valid UTF-8"));
    }

    #[test]
    fn test_io_and_channel_are_fatal() {
        assert!(WatchError::ChannelClosed.is_fatal());
        let err = WatchError::from(io::Error::new(io::ErrorKind::PermissionDenied, "denied"));
        assert!(err.is_fatal());
        assert!(err.to_string().starts_with("I/O error"));
    }
}
