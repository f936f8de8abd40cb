//! Scriptable element for controller tests

use std::time::Duration;

use super::element::{ElementError, ElementStatus, MediaElement};
use crate::database::MediaSource;

#[derive(Debug, Default)]
pub struct MockElement {
    pub loaded: Option<MediaSource>,
    pub status: Option<ElementStatus>,
    pub position: Duration,
    pub duration: Option<Duration>,
    /// Duration reported for every subsequent load
    pub next_duration: Option<Duration>,
    /// Error returned by the next load
    pub fail_load: Option<ElementError>,
    pub volume: f32,
    pub loads: usize,
    pub seeks: Vec<Duration>,
}

impl MockElement {
    pub fn new() -> Self {
        Self {
            next_duration: Some(Duration::from_secs(200)),
            volume: 1.0,
            ..Self::default()
        }
    }

    /// Simulate the media running out
    pub fn finish(&mut self) {
        if self.loaded.is_some() {
            self.status = Some(ElementStatus::Ended);
        }
    }
}

impl MediaElement for MockElement {
    fn load(&mut self, source: &MediaSource) -> Result<(), ElementError> {
        self.stop();
        if let Some(err) = self.fail_load.take() {
            return Err(err);
        }
        if matches!(source, MediaSource::External { path } if !path.exists()) {
            return Err(ElementError::Unreadable("missing file".to_string()));
        }

        self.loads += 1;
        self.loaded = Some(source.clone());
        self.duration = self.next_duration;
        self.status = Some(ElementStatus::Paused);
        Ok(())
    }

    fn play(&mut self) -> Result<(), ElementError> {
        if self.loaded.is_none() {
            return Err(ElementError::NotLoaded);
        }
        if self.status == Some(ElementStatus::Ended) {
            self.position = Duration::ZERO;
        }
        self.status = Some(ElementStatus::Playing);
        Ok(())
    }

    fn pause(&mut self) {
        if self.status == Some(ElementStatus::Playing) {
            self.status = Some(ElementStatus::Paused);
        }
    }

    fn stop(&mut self) {
        self.loaded = None;
        self.status = None;
        self.position = Duration::ZERO;
        self.duration = None;
    }

    fn seek(&mut self, position: Duration) -> Result<(), ElementError> {
        if self.loaded.is_none() {
            return Err(ElementError::NotLoaded);
        }
        self.seeks.push(position);
        self.position = position;
        Ok(())
    }

    fn position(&self) -> Duration {
        self.position
    }

    fn duration(&self) -> Option<Duration> {
        self.duration
    }

    fn status(&self) -> ElementStatus {
        self.status.unwrap_or(ElementStatus::Idle)
    }

    fn set_volume(&mut self, volume: f32) {
        self.volume = volume;
    }
}
