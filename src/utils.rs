//! Utility functions

use std::path::PathBuf;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;

// ============================================================================
// Time Formatting
// ============================================================================

/// Format a position in seconds as `M:SS`
///
/// Non-finite or negative values render as `0:00`.
pub fn format_time(seconds: f64) -> String {
    if !seconds.is_finite() || seconds < 0.0 {
        return "0:00".to_string();
    }
    let total = seconds.floor() as u64;
    format!("{}:{:02}", total / 60, total % 60)
}

/// Human readable summary of the playlist size
pub fn song_count_label(count: usize) -> String {
    match count {
        0 => "No songs yet".to_string(),
        1 => "1 song".to_string(),
        n => format!("{} songs", n),
    }
}

// ============================================================================
// Data URLs
// ============================================================================

/// Encode bytes as a self-contained `data:` URL
pub fn encode_data_url(media_type: &str, bytes: &[u8]) -> String {
    format!("data:{};base64,{}", media_type, STANDARD.encode(bytes))
}

/// Decode a base64 `data:` URL into its media type and payload
pub fn decode_data_url(url: &str) -> Option<(String, Vec<u8>)> {
    let rest = url.strip_prefix("data:")?;
    let (header, payload) = rest.split_once(',')?;
    let media_type = header.strip_suffix(";base64")?;
    let bytes = STANDARD.decode(payload.trim()).ok()?;
    Some((media_type.to_string(), bytes))
}

// ============================================================================
// Directories
// ============================================================================

/// Default directory for the library database, legacy storage and blobs
pub fn default_data_dir() -> PathBuf {
    directories::ProjectDirs::from("com", "mediadeck", "Mediadeck")
        .map(|dirs| dirs.data_dir().to_path_buf())
        .unwrap_or_else(|| PathBuf::from(".mediadeck"))
}
