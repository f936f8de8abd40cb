//! Media element backed by a rodio sink
//!
//! Video entries are rendered through the same decoder stack, which plays the
//! container's audio track.

use std::fs::File;
use std::io::{BufReader, Cursor, Read, Seek};
use std::time::Duration;

use rodio::{Decoder, OutputStream, OutputStreamBuilder, Sink, Source, mixer::Mixer};

use super::element::{ElementError, ElementStatus, MediaElement};
use crate::database::MediaSource;
use crate::utils::decode_data_url;

/// Open the default output device
///
/// Returns `None` when there is no usable device; elements created without a
/// mixer refuse to load anything.
pub fn open_output() -> Option<OutputStream> {
    match OutputStreamBuilder::open_default_stream() {
        Ok(mut stream) => {
            stream.log_on_drop(false);
            Some(stream)
        }
        Err(e) => {
            tracing::error!("Failed to create audio output: {}", e);
            None
        }
    }
}

pub struct RodioElement {
    label: &'static str,
    mixer: Option<Mixer>,
    sink: Option<Sink>,
    source: Option<MediaSource>,
    duration: Option<Duration>,
    status: ElementStatus,
    paused_position: Option<Duration>,
    volume: f32,
}

impl RodioElement {
    pub fn new(label: &'static str, mixer: Option<Mixer>, volume: f32) -> Self {
        Self {
            label,
            mixer,
            sink: None,
            source: None,
            duration: None,
            status: ElementStatus::Idle,
            paused_position: None,
            volume: volume.clamp(0.0, 1.0),
        }
    }

    fn open_sink(&self, source: &MediaSource) -> Result<(Sink, Option<Duration>), ElementError> {
        let mixer = self.mixer.as_ref().ok_or(ElementError::NoOutput)?;

        match source {
            MediaSource::External { path } => {
                let file = File::open(path)
                    .map_err(|e| ElementError::Unreadable(format!("{}: {}", path.display(), e)))?;
                attach(mixer, BufReader::new(file), self.volume)
            }
            MediaSource::Embedded { data_url } => {
                let (_, bytes) = decode_data_url(data_url)
                    .ok_or_else(|| ElementError::Unreadable("malformed data URL".to_string()))?;
                attach(mixer, Cursor::new(bytes), self.volume)
            }
        }
    }
}

/// Decode `reader` into a new paused sink
fn attach<R>(mixer: &Mixer, reader: R, volume: f32) -> Result<(Sink, Option<Duration>), ElementError>
where
    R: Read + Seek + Send + Sync + 'static,
{
    let source = Decoder::new(reader).map_err(|e| ElementError::Unsupported(e.to_string()))?;
    let duration = source.total_duration();

    let sink = Sink::connect_new(mixer);
    sink.append(source);
    sink.set_volume(volume);
    sink.pause();
    Ok((sink, duration))
}

impl MediaElement for RodioElement {
    fn load(&mut self, source: &MediaSource) -> Result<(), ElementError> {
        self.stop();

        let (sink, duration) = self.open_sink(source)?;
        tracing::debug!(element = self.label, ?duration, "Source loaded");

        self.sink = Some(sink);
        self.source = Some(source.clone());
        self.duration = duration;
        self.status = ElementStatus::Paused;
        Ok(())
    }

    fn play(&mut self) -> Result<(), ElementError> {
        if self.status() == ElementStatus::Ended {
            // Replay from the start, like a finished element does
            let source = self.source.clone().ok_or(ElementError::NotLoaded)?;
            self.load(&source)?;
        }

        let sink = self.sink.as_ref().ok_or(ElementError::NotLoaded)?;
        sink.set_volume(self.volume);
        sink.play();
        self.status = ElementStatus::Playing;
        self.paused_position = None;
        Ok(())
    }

    fn pause(&mut self) {
        if let Some(sink) = &self.sink {
            if self.status == ElementStatus::Playing {
                self.paused_position = Some(sink.get_pos());
                sink.pause();
                self.status = ElementStatus::Paused;
            }
        }
    }

    fn stop(&mut self) {
        if let Some(sink) = self.sink.take() {
            sink.stop();
        }
        self.source = None;
        self.duration = None;
        self.paused_position = None;
        self.status = ElementStatus::Idle;
    }

    fn seek(&mut self, position: Duration) -> Result<(), ElementError> {
        let sink = self.sink.as_ref().ok_or(ElementError::NotLoaded)?;
        match sink.try_seek(position) {
            Ok(()) => {
                tracing::debug!("Seek to {:?} successful", position);
                if self.status == ElementStatus::Paused {
                    self.paused_position = Some(position);
                }
                Ok(())
            }
            Err(e) => {
                tracing::warn!("Seek failed: {:?}", e);
                Err(ElementError::Unsupported(format!("seek: {:?}", e)))
            }
        }
    }

    fn position(&self) -> Duration {
        match (&self.sink, self.status) {
            (Some(sink), ElementStatus::Paused) => {
                self.paused_position.unwrap_or_else(|| sink.get_pos())
            }
            (Some(sink), _) => sink.get_pos(),
            (None, _) => Duration::ZERO,
        }
    }

    fn duration(&self) -> Option<Duration> {
        self.duration
    }

    fn status(&self) -> ElementStatus {
        let Some(sink) = &self.sink else {
            return ElementStatus::Idle;
        };

        if self.status != ElementStatus::Playing {
            return self.status;
        }

        if sink.empty() {
            return ElementStatus::Ended;
        }

        // Consider finished within 500ms of the end; some decoders never drain
        if let Some(duration) = self.duration {
            if duration.as_secs_f32() > 0.0
                && sink.get_pos().as_secs_f32() >= duration.as_secs_f32() - 0.5
            {
                return ElementStatus::Ended;
            }
        }

        ElementStatus::Playing
    }

    fn set_volume(&mut self, volume: f32) {
        self.volume = volume.clamp(0.0, 1.0);
        if let Some(sink) = &self.sink {
            sink.set_volume(self.volume);
        }
    }
}
