//! Playback session controller
//!
//! Owns the session and one element per media kind. Every operation takes the
//! current entry list from the library; the controller never mutates it.

use thiserror::Error;
use tokio::sync::watch;

use super::navigator::Navigator;
use super::session::{NowPlaying, PlaybackProgress, PlaybackSession, PlaybackStatus, SessionState};
use crate::audio::{ElementError, ElementStatus, MediaElement};
use crate::database::{MediaEntry, MediaKind};

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PlaybackError {
    #[error("No entry at index {index} (library has {len})")]
    InvalidIndex { index: usize, len: usize },

    #[error("Unable to play {name}: the format may not be supported ({reason})")]
    UnsupportedFormat { name: String, reason: String },

    #[error("Unable to read {name}: {reason}")]
    SourceUnreadable { name: String, reason: String },

    #[error("No audio output device available")]
    NoOutput,
}

impl PlaybackError {
    fn from_element(entry: &MediaEntry, e: ElementError) -> Self {
        let name = entry.name.clone();
        match e {
            ElementError::Unsupported(reason) => PlaybackError::UnsupportedFormat { name, reason },
            ElementError::Unreadable(reason) => PlaybackError::SourceUnreadable { name, reason },
            ElementError::NotLoaded => PlaybackError::SourceUnreadable {
                name,
                reason: e.to_string(),
            },
            ElementError::NoOutput => PlaybackError::NoOutput,
        }
    }

    /// Out-of-range requests are logged and otherwise ignored
    pub fn is_silent(&self) -> bool {
        matches!(self, PlaybackError::InvalidIndex { .. })
    }
}

pub struct PlaybackController<E> {
    audio: E,
    video: E,
    session: PlaybackSession,
    status_tx: watch::Sender<PlaybackStatus>,
}

impl<E: MediaElement> PlaybackController<E> {
    pub fn new(audio: E, video: E) -> Self {
        let (status_tx, _) = watch::channel(PlaybackStatus::default());
        Self {
            audio,
            video,
            session: PlaybackSession::default(),
            status_tx,
        }
    }

    pub fn session(&self) -> &PlaybackSession {
        &self.session
    }

    pub fn state(&self) -> SessionState {
        self.session.state
    }

    pub fn current_index(&self) -> usize {
        self.session.current_index
    }

    pub fn subscribe(&self) -> watch::Receiver<PlaybackStatus> {
        self.status_tx.subscribe()
    }

    fn element(&self, kind: MediaKind) -> &E {
        match kind {
            MediaKind::Audio => &self.audio,
            MediaKind::Video => &self.video,
        }
    }

    fn element_mut(&mut self, kind: MediaKind) -> &mut E {
        match kind {
            MediaKind::Audio => &mut self.audio,
            MediaKind::Video => &mut self.video,
        }
    }

    fn active(&self) -> &E {
        self.element(self.session.active_kind)
    }

    fn active_mut(&mut self) -> &mut E {
        self.element_mut(self.session.active_kind)
    }

    /// Load entry `index` into the matching element and start it
    pub fn play(&mut self, entries: &[MediaEntry], index: usize) -> Result<(), PlaybackError> {
        let Some(entry) = entries.get(index) else {
            tracing::warn!(index, len = entries.len(), "Ignoring play of invalid index");
            return Err(PlaybackError::InvalidIndex {
                index,
                len: entries.len(),
            });
        };

        self.session.current_index = index;
        let kind = entry.kind();

        // Only one element may be active
        let other = match kind {
            MediaKind::Audio => MediaKind::Video,
            MediaKind::Video => MediaKind::Audio,
        };
        self.element_mut(other).stop();
        self.session.active_kind = kind;

        tracing::info!("Playing: {} ({})", entry.name, entry.media_type);
        let element = self.element_mut(kind);
        let started = match element.load(&entry.source) {
            Ok(()) => element.play(),
            Err(e) => Err(e),
        };

        let result = match started {
            Ok(()) => {
                self.session.state = SessionState::Playing;
                self.session.player_visible = true;
                self.session.now_playing = Some(NowPlaying {
                    index,
                    name: entry.name.clone(),
                    kind,
                });
                Ok(())
            }
            Err(e) => {
                self.element_mut(kind).stop();
                self.session.state = SessionState::Stopped;
                self.session.now_playing = None;
                let err = PlaybackError::from_element(entry, e);
                tracing::error!("{}", err);
                Err(err)
            }
        };

        self.publish();
        result
    }

    /// Pause when playing, otherwise start or resume
    pub fn toggle(&mut self, entries: &[MediaEntry]) -> Result<(), PlaybackError> {
        if entries.is_empty() {
            return Ok(());
        }

        match self.session.state {
            SessionState::Playing => {
                self.active_mut().pause();
                self.session.state = SessionState::Paused;
            }
            SessionState::Paused | SessionState::Stopped if self.active().is_loaded() => {
                if let Err(e) = self.active_mut().play() {
                    tracing::warn!("Resume failed, reloading: {}", e);
                    return self.play(entries, self.session.current_index);
                }
                self.session.state = SessionState::Playing;
                self.session.player_visible = true;
            }
            _ => return self.play(entries, self.session.current_index),
        }

        self.publish();
        Ok(())
    }

    pub fn next(&mut self, entries: &[MediaEntry]) -> Result<(), PlaybackError> {
        match Navigator::new(entries.len(), self.session.current_index).next_index() {
            Some(index) => self.play(entries, index),
            None => Ok(()),
        }
    }

    pub fn prev(&mut self, entries: &[MediaEntry]) -> Result<(), PlaybackError> {
        match Navigator::new(entries.len(), self.session.current_index).prev_index() {
            Some(index) => self.play(entries, index),
            None => Ok(()),
        }
    }

    /// Jump to `fraction` (0..=1) of the active item
    ///
    /// Ignored when nothing is loaded or the duration is unknown.
    pub fn seek(&mut self, fraction: f64) {
        if !self.session.state.is_active() || !fraction.is_finite() {
            return;
        }

        let Some(duration) = self.active().duration().filter(|d| !d.is_zero()) else {
            tracing::debug!("Seek ignored, duration unknown");
            return;
        };

        let target = duration.mul_f64(fraction.clamp(0.0, 1.0));
        if let Err(e) = self.active_mut().seek(target) {
            tracing::warn!("Seek to {:?} failed: {}", target, e);
        }
        self.publish();
    }

    /// Periodic update: advance on end of media, then republish progress
    pub fn tick(&mut self, entries: &[MediaEntry]) -> Result<(), PlaybackError> {
        if self.session.state == SessionState::Playing
            && self.active().status() == ElementStatus::Ended
        {
            tracing::debug!("End of media, advancing");
            return self.next(entries);
        }

        self.publish();
        Ok(())
    }

    /// Start the first entry when nothing has been loaded yet
    ///
    /// Returns whether playback was started.
    pub fn autoplay_first(&mut self, entries: &[MediaEntry]) -> Result<bool, PlaybackError> {
        let idle = self.session.now_playing.is_none()
            && !self.audio.is_loaded()
            && !self.video.is_loaded();

        if entries.is_empty() || self.session.current_index != 0 || !idle {
            return Ok(false);
        }

        self.play(entries, 0)?;
        Ok(true)
    }

    /// Entries were appended
    pub fn on_library_changed(&mut self, entries: &[MediaEntry]) {
        self.session.clamp(entries.len());
        self.publish();
    }

    /// Entry `removed` was deleted; `entries` is the list after deletion
    pub fn on_entry_removed(&mut self, entries: &[MediaEntry], removed: usize) {
        let playing_removed = self
            .session
            .now_playing
            .as_ref()
            .is_some_and(|now| now.index == removed);

        if playing_removed {
            tracing::info!("Current entry removed, stopping playback");
            self.stop_all();
            self.session.state = SessionState::Stopped;
        } else {
            if removed < self.session.current_index {
                self.session.current_index -= 1;
            }
            if let Some(now) = self.session.now_playing.as_mut() {
                if removed < now.index {
                    now.index -= 1;
                }
            }
        }

        self.session.clamp(entries.len());
        self.publish();
    }

    /// The library was emptied
    pub fn on_cleared(&mut self) {
        self.stop_all();
        self.session.reset(0);
        self.publish();
    }

    /// Pause and hide the player view; the item stays loaded
    pub fn close(&mut self) {
        self.audio.pause();
        self.video.pause();
        if self.session.state == SessionState::Playing {
            self.session.state = SessionState::Paused;
        }
        self.session.player_visible = false;
        self.publish();
    }

    pub fn set_volume(&mut self, volume: f32) {
        self.audio.set_volume(volume);
        self.video.set_volume(volume);
    }

    pub fn status(&self) -> PlaybackStatus {
        let progress = if self.session.state.is_active() {
            let element = self.active();
            PlaybackProgress::from_seconds(
                element.position().as_secs_f64(),
                element.duration().map_or(f64::NAN, |d| d.as_secs_f64()),
            )
        } else {
            PlaybackProgress::default()
        };

        PlaybackStatus {
            state: self.session.state,
            current_index: self.session.current_index,
            now_playing: self.session.now_playing.clone(),
            player_visible: self.session.player_visible,
            progress,
        }
    }

    fn stop_all(&mut self) {
        self.audio.stop();
        self.video.stop();
        self.session.now_playing = None;
        self.session.player_visible = false;
    }

    fn publish(&self) {
        let status = self.status();
        self.status_tx.send_if_modified(|current| {
            if *current == status {
                false
            } else {
                *current = status;
                true
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::audio::mock::MockElement;
    use crate::database::MediaSource;

    fn entry(name: &str, media_type: &str) -> MediaEntry {
        MediaEntry {
            id: None,
            name: name.to_string(),
            media_type: media_type.to_string(),
            size: 1,
            source: MediaSource::Embedded {
                data_url: format!("data:{};base64,AA==", media_type),
            },
            date_added: None,
        }
    }

    fn library(n: usize) -> Vec<MediaEntry> {
        (0..n)
            .map(|i| entry(&format!("{}.mp3", i), "audio/mpeg"))
            .collect()
    }

    fn controller() -> PlaybackController<MockElement> {
        PlaybackController::new(MockElement::new(), MockElement::new())
    }

    #[test]
    fn test_play_enters_playing() {
        let entries = library(1);
        let mut c = controller();
        c.on_library_changed(&entries);
        assert_eq!(c.state(), SessionState::Stopped);

        c.play(&entries, 0).unwrap();
        assert_eq!(c.state(), SessionState::Playing);
        assert_eq!(c.session().now_playing.as_ref().unwrap().name, "0.mp3");
        assert_eq!(c.audio.status(), ElementStatus::Playing);
    }

    #[test]
    fn test_invalid_index_is_noop() {
        let entries = library(2);
        let mut c = controller();
        c.play(&entries, 1).unwrap();

        let err = c.play(&entries, 5).unwrap_err();
        assert!(err.is_silent());
        assert_eq!(c.current_index(), 1);
        assert_eq!(c.state(), SessionState::Playing);
    }

    #[test]
    fn test_video_uses_video_element_only() {
        let entries = vec![entry("a.mp3", "audio/mpeg"), entry("b.mp4", "video/mp4")];
        let mut c = controller();

        c.play(&entries, 0).unwrap();
        c.play(&entries, 1).unwrap();
        assert_eq!(c.session().active_kind, MediaKind::Video);
        assert_eq!(c.video.status(), ElementStatus::Playing);
        assert_eq!(c.audio.status(), ElementStatus::Idle);
    }

    #[test]
    fn test_unsupported_format_stays_stopped() {
        let entries = library(2);
        let mut c = controller();
        c.audio.fail_load = Some(ElementError::Unsupported("bad codec".into()));

        let err = c.play(&entries, 1).unwrap_err();
        assert!(matches!(err, PlaybackError::UnsupportedFormat { .. }));
        assert_eq!(c.state(), SessionState::Stopped);
        assert_eq!(c.current_index(), 1);
        assert!(c.session().now_playing.is_none());
    }

    #[test]
    fn test_toggle() {
        let entries = library(2);
        let mut c = controller();

        c.toggle(&[]).unwrap();
        assert_eq!(c.state(), SessionState::Empty);

        c.on_library_changed(&entries);
        c.toggle(&entries).unwrap();
        assert_eq!(c.state(), SessionState::Playing);

        c.toggle(&entries).unwrap();
        assert_eq!(c.state(), SessionState::Paused);
        assert_eq!(c.audio.status(), ElementStatus::Paused);

        c.toggle(&entries).unwrap();
        assert_eq!(c.state(), SessionState::Playing);
        assert_eq!(c.audio.loads, 1);
    }

    #[test]
    fn test_next_from_last_wraps_to_first() {
        let entries = library(3);
        let mut c = controller();
        c.play(&entries, 2).unwrap();

        c.next(&entries).unwrap();
        assert_eq!(c.current_index(), 0);
        assert_eq!(c.state(), SessionState::Playing);
        assert_eq!(c.session().now_playing.as_ref().unwrap().index, 0);
    }

    #[test]
    fn test_prev_from_first_wraps_to_last() {
        let entries = library(4);
        let mut c = controller();
        c.play(&entries, 0).unwrap();

        c.prev(&entries).unwrap();
        assert_eq!(c.current_index(), 3);
    }

    #[test]
    fn test_next_k_times_returns_to_start() {
        let entries = library(5);
        let mut c = controller();
        c.play(&entries, 3).unwrap();
        for _ in 0..5 {
            c.next(&entries).unwrap();
        }
        assert_eq!(c.current_index(), 3);
    }

    #[test]
    fn test_next_on_empty_is_noop() {
        let mut c = controller();
        c.next(&[]).unwrap();
        c.prev(&[]).unwrap();
        assert_eq!(c.state(), SessionState::Empty);
    }

    #[test]
    fn test_end_of_media_advances() {
        let entries = library(2);
        let mut c = controller();
        c.play(&entries, 1).unwrap();

        c.audio.finish();
        c.tick(&entries).unwrap();
        assert_eq!(c.current_index(), 0);
        assert_eq!(c.state(), SessionState::Playing);
        assert_eq!(c.audio.loads, 2);
    }

    #[test]
    fn test_end_of_video_advances() {
        let entries = vec![entry("a.mp4", "video/mp4"), entry("b.mp3", "audio/mpeg")];
        let mut c = controller();
        c.play(&entries, 0).unwrap();

        c.video.finish();
        c.tick(&entries).unwrap();
        assert_eq!(c.current_index(), 1);
        assert_eq!(c.session().active_kind, MediaKind::Audio);
    }

    #[test]
    fn test_seek_maps_fraction_to_time() {
        let entries = library(1);
        let mut c = controller();
        c.play(&entries, 0).unwrap();

        c.seek(0.25);
        c.seek(7.0);
        assert_eq!(
            c.audio.seeks,
            vec![Duration::from_secs(50), Duration::from_secs(200)]
        );
    }

    #[test]
    fn test_seek_ignored_without_duration() {
        let entries = library(1);
        let mut c = controller();
        c.audio.next_duration = None;
        c.play(&entries, 0).unwrap();

        c.seek(0.5);
        c.seek(f64::NAN);
        assert!(c.audio.seeks.is_empty());
    }

    #[test]
    fn test_progress_is_published() {
        let entries = library(1);
        let mut c = controller();
        let rx = c.subscribe();
        c.play(&entries, 0).unwrap();

        c.audio.position = Duration::from_secs(125);
        c.tick(&entries).unwrap();

        let status = rx.borrow().clone();
        assert_eq!(status.progress.elapsed, "2:05");
        assert_eq!(status.progress.total, "3:20");
        assert_eq!(status.progress.percent, 62.5);
    }

    #[test]
    fn test_removing_current_entry_stops_playback() {
        let mut entries = library(3);
        let mut c = controller();
        c.play(&entries, 1).unwrap();

        entries.remove(1);
        c.on_entry_removed(&entries, 1);
        assert_eq!(c.state(), SessionState::Stopped);
        assert!(c.session().now_playing.is_none());
        assert_eq!(c.audio.status(), ElementStatus::Idle);
        assert!(c.current_index() < entries.len());
    }

    #[test]
    fn test_removing_only_entry_empties_session() {
        let mut entries = library(1);
        let mut c = controller();
        c.play(&entries, 0).unwrap();

        entries.remove(0);
        c.on_entry_removed(&entries, 0);
        assert_eq!(c.state(), SessionState::Empty);
        assert_eq!(c.current_index(), 0);
    }

    #[test]
    fn test_removing_earlier_entry_keeps_current_item() {
        let mut entries = library(3);
        let mut c = controller();
        c.play(&entries, 2).unwrap();

        entries.remove(0);
        c.on_entry_removed(&entries, 0);
        assert_eq!(c.current_index(), 1);
        assert_eq!(c.state(), SessionState::Playing);
        assert_eq!(entries[c.current_index()].name, "2.mp3");
        assert_eq!(c.session().now_playing.as_ref().unwrap().index, 1);
    }

    #[test]
    fn test_removing_tail_reclamps_index() {
        let mut entries = library(3);
        let mut c = controller();
        c.on_library_changed(&entries);
        c.session.current_index = 2;

        entries.truncate(2);
        c.on_entry_removed(&entries, 2);
        assert_eq!(c.current_index(), 1);
    }

    #[test]
    fn test_clear_tears_down_session() {
        let entries = library(2);
        let mut c = controller();
        c.play(&entries, 1).unwrap();

        c.on_cleared();
        assert_eq!(c.state(), SessionState::Empty);
        assert_eq!(c.current_index(), 0);
        assert!(c.session().now_playing.is_none());
        assert_eq!(c.audio.status(), ElementStatus::Idle);
    }

    #[test]
    fn test_close_pauses_and_hides() {
        let entries = library(1);
        let mut c = controller();
        c.play(&entries, 0).unwrap();

        c.close();
        assert_eq!(c.state(), SessionState::Paused);
        assert!(!c.session().player_visible);
        assert!(c.session().now_playing.is_some());
    }

    #[test]
    fn test_autoplay_first_only_once() {
        let entries = library(2);
        let mut c = controller();

        assert!(c.autoplay_first(&entries).unwrap());
        assert_eq!(c.state(), SessionState::Playing);
        assert!(!c.autoplay_first(&entries).unwrap());
        assert!(!c.autoplay_first(&[]).unwrap());
    }

    #[test]
    fn test_stale_reference_reports_unreadable() {
        let entries = vec![MediaEntry {
            source: MediaSource::External {
                path: "/definitely/not/here.mp3".into(),
            },
            ..entry("here.mp3", "audio/mpeg")
        }];
        let mut c = controller();

        let err = c.play(&entries, 0).unwrap_err();
        assert!(matches!(err, PlaybackError::SourceUnreadable { .. }));
        assert_eq!(c.state(), SessionState::Stopped);
    }
}
