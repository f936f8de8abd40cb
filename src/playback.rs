//! Playback session management
//!
//! - `PlaybackController`: play/toggle/next/prev/seek and auto-advance
//! - `PlaybackSession`: current index, state and active media kind
//! - `Navigator`: wrap-around index calculation

mod controller;
mod navigator;
mod session;

pub use controller::{PlaybackController, PlaybackError};
pub use session::{NowPlaying, PlaybackProgress, PlaybackSession, PlaybackStatus, SessionState};
