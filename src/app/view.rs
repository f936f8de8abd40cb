//! Console rendering
//!
//! Turns published snapshots into text. Nothing here reads the library or the
//! controller directly.

use crate::database::MediaKind;
use crate::features::import::{ScanProgress, SkipReason};
use crate::library::LibrarySnapshot;
use crate::playback::{PlaybackStatus, SessionState};

use super::message::Notice;

pub const HELP: &str = "\
Commands:
  add <file>...     add files to the playlist
  scan [dir]        scan a folder (opens a picker without a dir)
  list              show the playlist
  play <n>          play entry n
  toggle            play / pause
  next, prev        skip forward / back
  seek <percent>    jump within the current item
  remove <n>        remove entry n
  clear             remove everything
  close             pause and hide the player
  help              show this help
  quit              exit";

fn icon(kind: MediaKind) -> &'static str {
    match kind {
        MediaKind::Audio => "🎵",
        MediaKind::Video => "🎬",
    }
}

/// Playlist with the current entry marked
pub fn render_playlist(snapshot: &LibrarySnapshot, status: &PlaybackStatus) -> String {
    if snapshot.items.is_empty() {
        return format!("{}\n  Add files or scan a folder to get started.", snapshot.count_label());
    }

    let mut out = snapshot.count_label();
    for (i, item) in snapshot.items.iter().enumerate() {
        let marker = if i == status.current_index { '>' } else { ' ' };
        out.push_str(&format!(
            "\n{} {:>3}. {} {}  [{}]",
            marker,
            i + 1,
            icon(item.kind),
            item.name,
            item.kind.label()
        ));
    }
    out
}

/// One-line playback status
pub fn render_status(status: &PlaybackStatus) -> String {
    let symbol = match status.state {
        SessionState::Playing => "▶",
        SessionState::Paused => "⏸",
        SessionState::Stopped | SessionState::Empty => "■",
    };

    let Some(now) = &status.now_playing else {
        return format!("{} Nothing playing", symbol);
    };

    let hidden = if status.player_visible { "" } else { " (player closed)" };
    format!(
        "{} {} {}  {:.0}%  {} / {}{}",
        symbol,
        icon(now.kind),
        now.name,
        status.progress.percent,
        status.progress.elapsed,
        status.progress.total,
        hidden
    )
}

pub fn render_notice(notice: &Notice) -> String {
    match notice {
        Notice::Info(text) => format!("* {}", text),
        Notice::Error(text) => format!("! {}", text),
    }
}

/// Scan progress line, if the event is worth showing
pub fn render_progress(progress: &ScanProgress) -> Option<String> {
    match progress {
        ScanProgress::Started { root, total_files } => Some(format!(
            "Scanning {} ({} media files found)",
            root.display(),
            total_files
        )),
        ScanProgress::Imported {
            current,
            total,
            name,
        } => Some(format!("  [{}/{}] + {}", current, total, name)),
        ScanProgress::Skipped {
            reason: SkipReason::AlreadyExists,
            ..
        } => None,
        ScanProgress::Skipped {
            current,
            total,
            name,
            reason,
        } => {
            let why = match reason {
                SkipReason::Unreadable(e) | SkipReason::StorageError(e) => e.as_str(),
                SkipReason::QuotaExceeded => "storage full",
                SkipReason::AlreadyExists => "already added",
            };
            Some(format!("  [{}/{}] - {} ({})", current, total, name, why))
        }
        ScanProgress::Completed {
            imported,
            skipped,
            errors,
            duration_secs,
        } => Some(format!(
            "Scan finished in {:.1}s: {} added, {} skipped, {} errors",
            duration_secs, imported, skipped, errors
        )),
        ScanProgress::Cancelled => Some("Scan cancelled".to_string()),
    }
}
