//! Scan progress tracking and reporting

use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use tokio::sync::mpsc;

/// Progress update sent during scanning
#[derive(Debug, Clone)]
pub enum ScanProgress {
    /// Discovery finished; ingestion starts
    Started { root: PathBuf, total_files: u64 },
    /// A file was added to the library
    Imported {
        current: u64,
        total: u64,
        name: String,
    },
    /// A file was not added
    Skipped {
        current: u64,
        total: u64,
        name: String,
        reason: SkipReason,
    },
    /// Scanning completed
    Completed {
        imported: u64,
        skipped: u64,
        errors: u64,
        duration_secs: f64,
    },
    /// Scanning was cancelled
    Cancelled,
}

/// Reason why a file was skipped
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    /// Same name and size already in the library
    AlreadyExists,
    /// Bytes could not be read
    Unreadable(String),
    /// The store rejected the write
    StorageError(String),
    /// Store is full; nothing further is attempted
    QuotaExceeded,
}

/// Shared state for tracking scan progress
#[derive(Debug, Default)]
pub struct ScanState {
    /// Total files to scan
    pub total: AtomicU64,
    /// Current file being processed
    pub current: AtomicU64,
    /// Successfully imported count
    pub imported: AtomicU64,
    /// Skipped count
    pub skipped: AtomicU64,
    /// Error count
    pub errors: AtomicU64,
    /// Whether scan was cancelled
    pub cancelled: AtomicBool,
}

impl ScanState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reset counters for a new scan; cancellation is kept
    pub fn begin(&self) {
        self.total.store(0, Ordering::SeqCst);
        self.current.store(0, Ordering::SeqCst);
        self.imported.store(0, Ordering::SeqCst);
        self.skipped.store(0, Ordering::SeqCst);
        self.errors.store(0, Ordering::SeqCst);
    }

    pub fn set_total(&self, total: u64) {
        self.total.store(total, Ordering::SeqCst);
    }

    pub fn increment_current(&self) -> u64 {
        self.current.fetch_add(1, Ordering::SeqCst) + 1
    }

    pub fn increment_imported(&self) {
        self.imported.fetch_add(1, Ordering::SeqCst);
    }

    pub fn increment_skipped(&self) {
        self.skipped.fetch_add(1, Ordering::SeqCst);
    }

    pub fn add_errors(&self, count: u64) {
        self.errors.fetch_add(count, Ordering::SeqCst);
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    /// Clear an earlier cancellation before starting new work
    pub fn rearm(&self) {
        self.cancelled.store(false, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    pub fn get_stats(&self) -> (u64, u64, u64, u64, u64) {
        (
            self.total.load(Ordering::SeqCst),
            self.current.load(Ordering::SeqCst),
            self.imported.load(Ordering::SeqCst),
            self.skipped.load(Ordering::SeqCst),
            self.errors.load(Ordering::SeqCst),
        )
    }
}

/// Handle for controlling and monitoring a scan operation
#[derive(Debug, Clone)]
pub struct ScanHandle {
    state: Arc<ScanState>,
}

impl ScanHandle {
    pub fn new(state: Arc<ScanState>) -> Self {
        Self { state }
    }

    /// Cancel the ongoing scan
    pub fn cancel(&self) {
        self.state.cancel();
    }
}

/// Progress sender for reporting scan updates
pub type ProgressSender = mpsc::UnboundedSender<ScanProgress>;
/// Progress receiver for receiving scan updates
pub type ProgressReceiver = mpsc::UnboundedReceiver<ScanProgress>;

/// Create a new progress channel
pub fn progress_channel() -> (ProgressSender, ProgressReceiver) {
    mpsc::unbounded_channel()
}
