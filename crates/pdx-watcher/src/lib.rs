//! Debounced PDF change watcher for the pdfdex share.
//!
//! Change notification on a network share is best effort: events can be
//! late, coalesced or missing entirely. This crate therefore only *triggers*
//! work. Each debounced batch of PDF changes is meant to start an
//! incremental `--since` scan, and the scheduled scan remains the source of
//! truth.
//!
//! # Overview
//!
//! - [`FileWatcher`] bridges `notify` + `notify-debouncer-mini` to tokio
//! - [`PdfFilter`] drops everything that is not a `.pdf`, on the watcher thread
//! - [`FileEventBatch`] groups the events a single rescan will handle
//!
//! # Crate Dependencies
//!
//! ```text
//! pdx-cli ──► pdx-watcher ──► pdx-core
//!         └─► pdx-scanner (rescan per batch)
//! ```
//!
//! # Error Handling
//!
//! ```
//! use pdx_watcher::WatchError;
//!
//! fn handle_watch_error(err: &WatchError) {
//!     if err.is_fatal() {
//!         eprintln!("watcher stopped: {err}");
//!     } else {
//!         eprintln!("warning: {err}");
//!     }
//! }
//! # handle_watch_error(&WatchError::ChannelClosed);
//! ```

#![deny(clippy::all)]
#![warn(missing_docs)]

pub mod error;
pub mod events;
pub mod filter;
pub mod watcher;

pub use error::WatchError;
pub use events::{BatchSummary, FileEvent, FileEventBatch};
pub use filter::{AcceptAllFilter, FileFilter, PdfFilter};
pub use watcher::FileWatcher;
