//! Rendering primitive interface
//!
//! One element exists per media kind. The playback controller owns both and
//! only ever has one of them loaded.

use std::time::Duration;

use thiserror::Error;

use crate::database::MediaSource;

/// What the element is doing right now
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ElementStatus {
    /// Nothing loaded
    Idle,
    Playing,
    Paused,
    /// Reached the end of the loaded media
    Ended,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ElementError {
    #[error("Cannot read source: {0}")]
    Unreadable(String),

    #[error("Unsupported format: {0}")]
    Unsupported(String),

    #[error("No audio output device")]
    NoOutput,

    #[error("Nothing loaded")]
    NotLoaded,
}

pub trait MediaElement {
    /// Replace whatever is loaded with `source`, ready but not playing
    fn load(&mut self, source: &MediaSource) -> Result<(), ElementError>;

    /// Start or resume the loaded source
    fn play(&mut self) -> Result<(), ElementError>;

    fn pause(&mut self);

    /// Unload the current source
    fn stop(&mut self);

    fn seek(&mut self, position: Duration) -> Result<(), ElementError>;

    fn position(&self) -> Duration;

    /// Total length, when the decoder knows it
    fn duration(&self) -> Option<Duration>;

    fn status(&self) -> ElementStatus;

    fn set_volume(&mut self, volume: f32);

    fn is_loaded(&self) -> bool {
        self.status() != ElementStatus::Idle
    }
}
