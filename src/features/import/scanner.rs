//! Bounded recursive directory scanner
//!
//! Discovers media files on a blocking thread, then feeds them to the ingest
//! pipeline one at a time and reports progress via channels.

use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use std::time::Instant;

use thiserror::Error;
use walkdir::WalkDir;

use super::ingest::{IngestError, IngestFile, IngestOutcome, ingest};
use super::{file_name_of, is_media_file};
use super::progress::{ProgressSender, ScanProgress, ScanState, SkipReason};
use crate::database::MediaStore;
use crate::features::picker::DirectoryPicker;
use crate::features::settings::{MAX_SCAN_DEPTH, MIN_SCAN_DEPTH};
use crate::library::Library;

/// Directory names never descended into
const RESERVED_DIRS: &[&str] = &["Android", "iOS"];

/// Scanner configuration
#[derive(Debug, Clone)]
pub struct ScanConfig {
    /// Directory levels below the root that are still visited
    pub max_depth: usize,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            max_depth: MIN_SCAN_DEPTH,
        }
    }
}

impl ScanConfig {
    pub fn with_max_depth(max_depth: usize) -> Self {
        Self {
            max_depth: max_depth.clamp(MIN_SCAN_DEPTH, MAX_SCAN_DEPTH),
        }
    }
}

/// Per-entry scan failures; logged and counted, never fatal to a scan
#[derive(Error, Debug)]
pub enum ScanError {
    #[error("Permission denied: {}", .0.display())]
    PermissionDenied(PathBuf),

    #[error("Cannot access {}: {reason}", .path.display())]
    Inaccessible { path: PathBuf, reason: String },

    #[error("Scan task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

impl From<walkdir::Error> for ScanError {
    fn from(e: walkdir::Error) -> Self {
        let path = e.path().map(Path::to_path_buf).unwrap_or_default();
        match e.io_error().map(|io| io.kind()) {
            Some(std::io::ErrorKind::PermissionDenied) => ScanError::PermissionDenied(path),
            _ => ScanError::Inaccessible {
                path,
                reason: e.to_string(),
            },
        }
    }
}

/// Files found under a root
#[derive(Debug, Default)]
pub struct Discovery {
    pub files: Vec<PathBuf>,
    pub access_errors: u64,
}

/// Outcome of one directory scan
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ScanSummary {
    pub imported: usize,
    pub duplicates: usize,
    pub skipped: usize,
    pub access_errors: u64,
    pub quota_exceeded: bool,
    pub cancelled: bool,
}

fn is_skipped_dir(name: &OsStr) -> bool {
    let name = name.to_string_lossy();
    name.starts_with('.') || name.starts_with("__") || RESERVED_DIRS.contains(&name.as_ref())
}

/// Walk `root` depth-first in name order and collect media files
pub fn discover_media_files(root: &Path, config: &ScanConfig) -> Discovery {
    let mut discovery = Discovery::default();

    // Files inside the deepest visited directory sit one level further down
    let walker = WalkDir::new(root)
        .max_depth(config.max_depth + 1)
        .follow_links(true)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|e| e.depth() == 0 || !e.file_type().is_dir() || !is_skipped_dir(e.file_name()));

    for entry in walker {
        match entry {
            Ok(entry) if entry.file_type().is_file() => {
                if is_media_file(&entry.file_name().to_string_lossy()) {
                    discovery.files.push(entry.into_path());
                }
            }
            Ok(_) => {}
            Err(e) => {
                tracing::warn!("{}", ScanError::from(e));
                discovery.access_errors += 1;
            }
        }
    }

    discovery
}

/// Scan a directory and ingest every media file found
///
/// Already-ingested files stay in the library when the scan is cancelled or
/// the store fills up.
pub async fn scan_directory<S: MediaStore>(
    library: &mut Library<S>,
    root: PathBuf,
    config: &ScanConfig,
    state: &ScanState,
    progress_tx: &ProgressSender,
) -> Result<ScanSummary, ScanError> {
    let start_time = Instant::now();
    state.begin();
    tracing::info!("Scanning {}", root.display());

    let discovery = tokio::task::spawn_blocking({
        let root = root.clone();
        let config = config.clone();
        move || discover_media_files(&root, &config)
    })
    .await?;

    let total = discovery.files.len() as u64;
    state.set_total(total);
    state.add_errors(discovery.access_errors);

    let mut summary = ScanSummary {
        access_errors: discovery.access_errors,
        ..ScanSummary::default()
    };

    let _ = progress_tx.send(ScanProgress::Started {
        root,
        total_files: total,
    });

    for path in discovery.files {
        if state.is_cancelled() {
            tracing::info!("Scan cancelled");
            summary.cancelled = true;
            let _ = progress_tx.send(ScanProgress::Cancelled);
            return Ok(summary);
        }

        let current = state.increment_current();
        let name = file_name_of(&path);

        let result = match IngestFile::from_path(&path) {
            Ok(file) => ingest(library, file).await,
            Err(e) => Err(IngestError::SourceUnreadable {
                name: name.clone(),
                reason: e.to_string(),
            }),
        };

        let reason = match result {
            Ok(IngestOutcome::Added(_)) => {
                summary.imported += 1;
                state.increment_imported();
                let _ = progress_tx.send(ScanProgress::Imported {
                    current,
                    total,
                    name,
                });
                continue;
            }
            Ok(IngestOutcome::Duplicate) => {
                summary.duplicates += 1;
                SkipReason::AlreadyExists
            }
            Err(IngestError::QuotaExceeded) => {
                summary.quota_exceeded = true;
                SkipReason::QuotaExceeded
            }
            Err(IngestError::SourceUnreadable { reason, .. }) => {
                tracing::warn!("Cannot access file {}: {}", path.display(), reason);
                summary.skipped += 1;
                state.add_errors(1);
                SkipReason::Unreadable(reason)
            }
            Err(IngestError::Storage(e)) => {
                tracing::warn!("Failed to store {}: {}", name, e);
                summary.skipped += 1;
                state.add_errors(1);
                SkipReason::StorageError(e.to_string())
            }
        };

        state.increment_skipped();
        let _ = progress_tx.send(ScanProgress::Skipped {
            current,
            total,
            name,
            reason,
        });

        if summary.quota_exceeded {
            tracing::error!(imported = summary.imported, "Storage full, scan stopped");
            break;
        }
    }

    let (_, _, imported, skipped, errors) = state.get_stats();
    let _ = progress_tx.send(ScanProgress::Completed {
        imported,
        skipped,
        errors,
        duration_secs: start_time.elapsed().as_secs_f64(),
    });

    tracing::info!(
        imported = summary.imported,
        duplicates = summary.duplicates,
        skipped = summary.skipped,
        access_errors = summary.access_errors,
        "Scan finished"
    );
    Ok(summary)
}

/// Outcome of the launch-time scan
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AutoScanReport {
    /// Picker prompts shown
    pub attempts: u32,
    /// Files ingested across all attempts
    pub imported: usize,
    pub quota_exceeded: bool,
}

/// Prompt for a directory and scan it, retrying up to `max_attempts` times
///
/// Stops for good as soon as the library is non-empty, the store is full, or
/// the attempts run out. A dismissed picker uses up one attempt.
pub async fn auto_scan<S: MediaStore, P: DirectoryPicker>(
    library: &mut Library<S>,
    picker: &mut P,
    max_attempts: u32,
    config: &ScanConfig,
    state: &ScanState,
    progress_tx: &ProgressSender,
) -> AutoScanReport {
    let mut report = AutoScanReport::default();

    while report.attempts < max_attempts && library.is_empty() && !state.is_cancelled() {
        report.attempts += 1;

        let Some(root) = picker.pick_directory().await else {
            tracing::info!(attempt = report.attempts, "Directory picker dismissed");
            continue;
        };

        match scan_directory(library, root, config, state, progress_tx).await {
            Ok(summary) => {
                report.imported += summary.imported;
                if summary.quota_exceeded {
                    report.quota_exceeded = true;
                    break;
                }
            }
            Err(e) => tracing::warn!("Scan failed: {}", e),
        }
    }

    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::{MemoryStore, SerializedStore};
    use crate::features::import::progress_channel;
    use crate::features::picker::FixedPicker;

    fn touch(path: &Path) {
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, b"media").unwrap();
    }

    fn names(discovery: &Discovery) -> Vec<String> {
        discovery
            .files
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().to_string())
            .collect()
    }

    #[test]
    fn test_depth_bound() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        touch(&root.join("top.mp3"));
        touch(&root.join("1/2/3/at_three.mp3"));
        touch(&root.join("1/2/3/4/5/6/deep.mp3"));

        let discovery = discover_media_files(root, &ScanConfig::default());
        assert_eq!(names(&discovery), vec!["at_three.mp3", "top.mp3"]);
    }

    #[test]
    fn test_deeper_config_reaches_further() {
        let dir = tempfile::tempdir().unwrap();
        touch(&dir.path().join("1/2/3/4/5/five.mp3"));

        assert!(discover_media_files(dir.path(), &ScanConfig::default()).files.is_empty());
        let discovery = discover_media_files(dir.path(), &ScanConfig::with_max_depth(5));
        assert_eq!(names(&discovery), vec!["five.mp3"]);
    }

    #[test]
    fn test_skips_reserved_directories_and_other_files() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        touch(&root.join(".hidden/a.mp3"));
        touch(&root.join("__MACOSX/b.mp3"));
        touch(&root.join("Android/c.mp3"));
        touch(&root.join("iOS/d.mp3"));
        touch(&root.join("music/e.MP4"));
        touch(&root.join("music/cover.jpg"));

        let discovery = discover_media_files(root, &ScanConfig::default());
        assert_eq!(names(&discovery), vec!["e.MP4"]);
    }

    #[test]
    fn test_hidden_root_is_still_scanned() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().join(".music");
        touch(&root.join("a.wav"));

        let discovery = discover_media_files(&root, &ScanConfig::default());
        assert_eq!(names(&discovery), vec!["a.wav"]);
    }

    #[tokio::test]
    async fn test_scan_ingests_and_reports() {
        let dir = tempfile::tempdir().unwrap();
        touch(&dir.path().join("a.mp3"));
        touch(&dir.path().join("sub/b.ogg"));

        let mut library = Library::new(MemoryStore::new());
        let state = ScanState::new();
        let (tx, mut rx) = progress_channel();

        let summary = scan_directory(
            &mut library,
            dir.path().to_path_buf(),
            &ScanConfig::default(),
            &state,
            &tx,
        )
        .await
        .unwrap();
        assert_eq!(summary.imported, 2);
        assert_eq!(library.len(), 2);

        // Scanning again adds nothing
        let summary = scan_directory(
            &mut library,
            dir.path().to_path_buf(),
            &ScanConfig::default(),
            &state,
            &tx,
        )
        .await
        .unwrap();
        assert_eq!(summary.imported, 0);
        assert_eq!(summary.duplicates, 2);

        assert!(matches!(
            rx.recv().await,
            Some(ScanProgress::Started { total_files: 2, .. })
        ));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_permission_denied_entries_are_skipped() {
        use std::os::unix::fs::PermissionsExt;

        use crate::database::RecordStore;

        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().join("music");
        touch(&root.join("a.mp3"));
        touch(&root.join("locked.mp3"));
        touch(&root.join("private/hidden.mp3"));
        touch(&root.join("sub/b.ogg"));

        let locked = root.join("locked.mp3");
        let private = root.join("private");
        std::fs::set_permissions(&locked, std::fs::Permissions::from_mode(0o000)).unwrap();
        std::fs::set_permissions(&private, std::fs::Permissions::from_mode(0o000)).unwrap();
        let restore = || {
            std::fs::set_permissions(&private, std::fs::Permissions::from_mode(0o755)).unwrap();
        };
        if std::fs::File::open(&locked).is_ok() || std::fs::read_dir(&private).is_ok() {
            // Running with privileges that ignore file modes
            restore();
            return;
        }

        let mut store = RecordStore::new(dir.path().join("library.db"), dir.path().join("blobs"));
        store.initialize().await.unwrap();
        let mut library = Library::new(store);
        let state = ScanState::new();
        let (tx, _rx) = progress_channel();

        let summary = scan_directory(&mut library, root.clone(), &ScanConfig::default(), &state, &tx)
            .await
            .unwrap();
        restore();

        assert_eq!(summary.imported, 2);
        assert_eq!(summary.skipped, 1);
        assert_eq!(summary.access_errors, 1);
        let names: Vec<&str> = library.entries().iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, vec!["a.mp3", "b.ogg"]);
        assert_eq!(state.get_stats().4, 2);
    }

    #[tokio::test]
    async fn test_file_only_at_depth_six_is_not_ingested() {
        let dir = tempfile::tempdir().unwrap();
        touch(&dir.path().join("1/2/3/4/5/6/deep.mp3"));

        let mut library = Library::new(MemoryStore::new());
        let (tx, _rx) = progress_channel();
        let summary = scan_directory(
            &mut library,
            dir.path().to_path_buf(),
            &ScanConfig::default(),
            &ScanState::new(),
            &tx,
        )
        .await
        .unwrap();

        assert_eq!(summary.imported, 0);
        assert!(library.is_empty());
    }

    #[tokio::test]
    async fn test_cancelled_scan_keeps_nothing_new() {
        let dir = tempfile::tempdir().unwrap();
        touch(&dir.path().join("a.mp3"));

        let mut library = Library::new(MemoryStore::new());
        let state = ScanState::new();
        state.cancel();
        let (tx, _rx) = progress_channel();

        let summary = scan_directory(
            &mut library,
            dir.path().to_path_buf(),
            &ScanConfig::default(),
            &state,
            &tx,
        )
        .await
        .unwrap();
        assert!(summary.cancelled);
        assert!(library.is_empty());
    }

    #[tokio::test]
    async fn test_scan_stops_when_store_is_full() {
        let dir = tempfile::tempdir().unwrap();
        for i in 0..4 {
            touch(&dir.path().join(format!("music/{}.mp3", i)));
        }

        let mut store = SerializedStore::new(dir.path().join("local_storage.json"), 200);
        store.initialize().await.unwrap();
        let mut library = Library::new(store);
        let (tx, _rx) = progress_channel();

        let summary = scan_directory(
            &mut library,
            dir.path().join("music"),
            &ScanConfig::default(),
            &ScanState::new(),
            &tx,
        )
        .await
        .unwrap();
        assert!(summary.quota_exceeded);
        assert_eq!(summary.imported, library.len());
        assert!(library.len() < 4);
    }

    #[tokio::test]
    async fn test_auto_scan_retries_after_dismissal() {
        let dir = tempfile::tempdir().unwrap();
        touch(&dir.path().join("a.mp3"));

        let mut library = Library::new(MemoryStore::new());
        let mut picker = FixedPicker::new([None, Some(dir.path().to_path_buf()), None]);
        let (tx, _rx) = progress_channel();

        let report = auto_scan(
            &mut library,
            &mut picker,
            3,
            &ScanConfig::default(),
            &ScanState::new(),
            &tx,
        )
        .await;
        assert_eq!(report.attempts, 2);
        assert_eq!(report.imported, 1);
        assert_eq!(picker.calls(), 2);
    }

    #[tokio::test]
    async fn test_auto_scan_gives_up_after_cap() {
        let mut library = Library::new(MemoryStore::new());
        let mut picker = FixedPicker::default();
        let (tx, _rx) = progress_channel();

        let report = auto_scan(
            &mut library,
            &mut picker,
            3,
            &ScanConfig::default(),
            &ScanState::new(),
            &tx,
        )
        .await;
        assert_eq!(report.attempts, 3);
        assert!(library.is_empty());
    }

    #[tokio::test]
    async fn test_auto_scan_skipped_for_non_empty_library() {
        let mut library = Library::new(MemoryStore::new());
        crate::features::import::ingest(
            &mut library,
            IngestFile::from_bytes("a.mp3", None, b"x".to_vec()),
        )
        .await
        .unwrap();
        let mut picker = FixedPicker::default();
        let (tx, _rx) = progress_channel();

        let report = auto_scan(
            &mut library,
            &mut picker,
            3,
            &ScanConfig::default(),
            &ScanState::new(),
            &tx,
        )
        .await;
        assert_eq!(report.attempts, 0);
        assert_eq!(picker.calls(), 0);
    }
}
