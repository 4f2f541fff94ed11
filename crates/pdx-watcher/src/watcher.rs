//! Share watcher with async event streaming.
//!
//! [`FileWatcher`] runs the synchronous `notify` debouncer on a blocking
//! thread and forwards filtered events through a tokio channel.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                    Blocking Thread (spawn_blocking)             │
//! │  ┌──────────────────┐    ┌────────────────┐    ┌────────────┐  │
//! │  │ RecommendedWatcher│ -> │ Debouncer      │ -> │ PdfFilter  │  │
//! │  └──────────────────┘    └────────────────┘    └─────┬──────┘  │
//! └──────────────────────────────────────────────────────│─────────┘
//!                                          blocking_send │
//!                                                        ▼
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                    Async Runtime (tokio)                        │
//! │   FileWatcher::next_batch  ──>  scan trigger                    │
//! └─────────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Usage
//!
//! ```no_run
//! use camino::Utf8Path;
//! use pdx_core::WatchConfig;
//! use pdx_watcher::{FileWatcher, PdfFilter};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = WatchConfig::default();
//!     let mut watcher = FileWatcher::new(Utf8Path::new("/mnt/pdfs"), &config, PdfFilter::new()).await?;
//!
//!     while let Some(batch) = watcher.next_batch().await {
//!         println!("{} PDFs changed, rescanning", batch.unique_paths().len());
//!     }
//!     Ok(())
//! }
//! ```

use std::time::Duration;

use camino::{Utf8Path, Utf8PathBuf};
use notify::RecursiveMode;
use notify_debouncer_mini::{DebounceEventResult, Debouncer, new_debouncer};
use pdx_core::WatchConfig;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, info, trace, warn};

use crate::error::WatchError;
use crate::events::{FileEvent, FileEventBatch};
use crate::filter::FileFilter;

/// Default channel capacity for file events.
const DEFAULT_CHANNEL_CAPACITY: usize = 256;

/// Watches the share and streams debounced, filtered events.
///
/// Dropping the watcher signals the blocking task to stop; call
/// [`shutdown`](Self::shutdown) to also wait for it.
pub struct FileWatcher {
    shutdown_tx: Option<oneshot::Sender<()>>,
    task_handle: Option<JoinHandle<Result<(), WatchError>>>,
    event_rx: mpsc::Receiver<FileEvent>,
    watch_path: Utf8PathBuf,
}

impl std::fmt::Debug for FileWatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FileWatcher")
            .field("watch_path", &self.watch_path)
            .field("is_running", &self.is_running())
            .finish_non_exhaustive()
    }
}

impl FileWatcher {
    /// Starts watching `path`.
    ///
    /// # Errors
    ///
    /// Returns [`WatchError::PathNotFound`] if the path doesn't exist and
    /// [`WatchError::Io`] if it cannot be canonicalized. Notify setup
    /// failures surface from [`shutdown`](Self::shutdown), or as a closed
    /// stream.
    pub async fn new<F: FileFilter>(
        path: &Utf8Path,
        config: &WatchConfig,
        filter: F,
    ) -> Result<Self, WatchError> {
        Self::with_capacity(path, config, filter, DEFAULT_CHANNEL_CAPACITY).await
    }

    /// Starts watching `path` with a custom channel capacity.
    ///
    /// # Errors
    ///
    /// See [`new`](Self::new).
    #[allow(clippy::unused_async)] // Async so callers are inside a runtime for spawn_blocking
    pub async fn with_capacity<F: FileFilter>(
        path: &Utf8Path,
        config: &WatchConfig,
        filter: F,
        channel_capacity: usize,
    ) -> Result<Self, WatchError> {
        if !path.exists() {
            return Err(WatchError::path_not_found(path));
        }
        let watch_path = path.canonicalize_utf8()?;

        let (event_tx, event_rx) = mpsc::channel(channel_capacity.max(1));
        let (shutdown_tx, shutdown_rx) = oneshot::channel();

        let task_path = watch_path.clone();
        let config = *config;
        let task_handle = tokio::task::spawn_blocking(move || {
            run_watcher_loop(&task_path, config, event_tx, shutdown_rx, filter)
        });

        Ok(Self {
            shutdown_tx: Some(shutdown_tx),
            task_handle: Some(task_handle),
            event_rx,
            watch_path,
        })
    }

    /// Receives the next event; `None` once the watcher has stopped.
    pub async fn recv(&mut self) -> Option<FileEvent> {
        self.event_rx.recv().await
    }

    /// Waits for the next event, then takes everything else already queued
    /// with it.
    ///
    /// The debouncer has already coalesced the burst, so whatever is queued
    /// at that point belongs to the same change.
    pub async fn next_batch(&mut self) -> Option<FileEventBatch> {
        let first = self.event_rx.recv().await?;
        let mut batch = FileEventBatch::new();
        batch.push(first);
        while let Ok(event) = self.event_rx.try_recv() {
            batch.push(event);
        }
        debug!(events = batch.len(), "change batch collected");
        Some(batch)
    }

    /// Returns the canonical path being watched.
    #[must_use]
    pub fn watch_path(&self) -> &Utf8Path {
        &self.watch_path
    }

    /// Returns `true` while the blocking task is alive.
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.shutdown_tx.is_some() && self.task_handle.as_ref().is_some_and(|h| !h.is_finished())
    }

    /// Stops the watcher and waits for the blocking task.
    ///
    /// # Errors
    ///
    /// Returns the error the watcher task stopped with, or
    /// [`WatchError::ChannelClosed`] if it panicked.
    pub async fn shutdown(mut self) -> Result<(), WatchError> {
        if let Some(tx) = self.shutdown_tx.take() {
            // The task may already be gone
            let _ = tx.send(());
        }
        if let Some(handle) = self.task_handle.take() {
            match handle.await {
                Ok(result) => result?,
                Err(_join_error) => return Err(WatchError::ChannelClosed),
            }
        }
        Ok(())
    }
}

impl Drop for FileWatcher {
    fn drop(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
    }
}

/// Runs the debouncer until shutdown is signalled.
fn run_watcher_loop<F: FileFilter>(
    path: &Utf8Path,
    config: WatchConfig,
    event_tx: mpsc::Sender<FileEvent>,
    shutdown_rx: oneshot::Receiver<()>,
    filter: F,
) -> Result<(), WatchError> {
    let timeout = Duration::from_millis(config.debounce_ms);

    let mut debouncer: Debouncer<notify::RecommendedWatcher> =
        new_debouncer(timeout, move |res: DebounceEventResult| match res {
            Ok(events) => {
                for event in events {
                    let path = match Utf8PathBuf::try_from(event.path) {
                        Ok(path) => path,
                        Err(err) => {
                            warn!(path = %err.into_path_buf().display(), "skipping non UTF-8 path in change event");
                            continue;
                        }
                    };
                    if !filter.should_process(&path) {
                        trace!(path = %path, "filtered out change event");
                        continue;
                    }
                    if event_tx.blocking_send(FileEvent::new(path)).is_err() {
                        debug!("event channel closed, dropping change events");
                        break;
                    }
                }
            }
            Err(error) => warn!(error = %error, "debouncer error"),
        })?;

    let mode = if config.recursive {
        RecursiveMode::Recursive
    } else {
        RecursiveMode::NonRecursive
    };
    debouncer.watcher().watch(path.as_std_path(), mode)?;

    info!(path = %path, recursive = config.recursive, debounce_ms = config.debounce_ms, "share watcher started");

    // Blocks this thread until shutdown or the watcher is dropped
    let _ = shutdown_rx.blocking_recv();

    info!(path = %path, "share watcher stopped");
    Ok(())
}
