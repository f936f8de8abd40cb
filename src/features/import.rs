//! Local media import module
//!
//! Handles:
//! - Type classification by declared type or extension
//! - Sequential, deduplicated ingestion into the library
//! - Bounded recursive directory scanning
//! - Scan progress reporting and cancellation

mod ingest;
mod progress;
mod scanner;

pub use ingest::{BatchReport, FileAccessor, IngestError, IngestFile, IngestOutcome, ingest, ingest_batch};
pub use progress::{
    ProgressReceiver, ProgressSender, ScanHandle, ScanProgress, ScanState, SkipReason,
    progress_channel,
};
pub use scanner::{
    AutoScanReport, Discovery, ScanConfig, ScanError, ScanSummary, auto_scan, discover_media_files,
    scan_directory,
};

use std::path::Path;

/// Supported audio file extensions
pub const AUDIO_EXTENSIONS: &[&str] = &["mp3", "wav", "ogg", "flac", "aac", "m4a", "wma"];

/// Supported video file extensions
pub const VIDEO_EXTENSIONS: &[&str] = &["mp4", "webm", "mkv", "avi", "mov", "m4v", "3gp"];

/// Type used when neither a declared type nor a known extension is available
pub const FALLBACK_MEDIA_TYPE: &str = "audio/mpeg";

fn extension_of(name: &str) -> Option<String> {
    Path::new(name)
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.to_lowercase())
}

/// Display name of a file
///
/// Names that are not valid UTF-8 are shown with their bytes escaped, so two
/// different names never collapse into the same string.
pub fn file_name_of(path: &Path) -> String {
    match path.file_name() {
        Some(name) => match name.to_str() {
            Some(name) => name.to_string(),
            None => name.as_encoded_bytes().escape_ascii().to_string(),
        },
        None => path.display().to_string(),
    }
}

/// Check if a file name has a supported audio or video extension
pub fn is_media_file(name: &str) -> bool {
    extension_of(name)
        .map(|ext| {
            AUDIO_EXTENSIONS.contains(&ext.as_str()) || VIDEO_EXTENSIONS.contains(&ext.as_str())
        })
        .unwrap_or(false)
}

/// Declared type if non-empty, else `audio/<ext>` / `video/<ext>`, else the fallback
pub fn classify_media_type(name: &str, declared_type: Option<&str>) -> String {
    if let Some(declared) = declared_type.map(str::trim).filter(|t| !t.is_empty()) {
        return declared.to_string();
    }

    match extension_of(name) {
        Some(ext) if AUDIO_EXTENSIONS.contains(&ext.as_str()) => format!("audio/{}", ext),
        Some(ext) if VIDEO_EXTENSIONS.contains(&ext.as_str()) => format!("video/{}", ext),
        _ => FALLBACK_MEDIA_TYPE.to_string(),
    }
}
