//! Process-wide playback state, owned by the controller

use crate::database::MediaKind;
use crate::utils::format_time;

/// Where the session is in its lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SessionState {
    /// No entries at all
    #[default]
    Empty,
    /// Entries exist, nothing playing
    Stopped,
    Playing,
    Paused,
}

impl SessionState {
    pub fn is_active(&self) -> bool {
        matches!(self, SessionState::Playing | SessionState::Paused)
    }
}

/// The entry currently loaded into an element
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NowPlaying {
    pub index: usize,
    pub name: String,
    pub kind: MediaKind,
}

/// Percent and formatted times for the active item
#[derive(Debug, Clone, PartialEq)]
pub struct PlaybackProgress {
    pub percent: f64,
    pub elapsed: String,
    pub total: String,
}

impl Default for PlaybackProgress {
    fn default() -> Self {
        Self::from_seconds(0.0, f64::NAN)
    }
}

impl PlaybackProgress {
    /// Unknown or non-finite durations report 0% and `0:00`
    pub fn from_seconds(position: f64, duration: f64) -> Self {
        let percent = if duration.is_finite() && duration > 0.0 {
            (position / duration * 100.0).clamp(0.0, 100.0)
        } else {
            0.0
        };

        Self {
            percent,
            elapsed: format_time(position),
            total: format_time(duration),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct PlaybackSession {
    pub current_index: usize,
    pub state: SessionState,
    pub active_kind: MediaKind,
    pub now_playing: Option<NowPlaying>,
    /// Whether the full player view is shown
    pub player_visible: bool,
}

impl PlaybackSession {
    /// Back to the initial stopped state for a library of `len` entries
    pub fn reset(&mut self, len: usize) {
        *self = Self::default();
        if len > 0 {
            self.state = SessionState::Stopped;
        }
    }

    /// Keep `current_index` inside a library of `len` entries
    pub fn clamp(&mut self, len: usize) {
        if len == 0 {
            self.current_index = 0;
            self.state = SessionState::Empty;
        } else {
            if self.current_index >= len {
                self.current_index = len - 1;
            }
            if self.state == SessionState::Empty {
                self.state = SessionState::Stopped;
            }
        }
    }
}

/// What the renderer sees of the session
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PlaybackStatus {
    pub state: SessionState,
    pub current_index: usize,
    pub now_playing: Option<NowPlaying>,
    pub player_visible: bool,
    pub progress: PlaybackProgress,
}
