//! Media rendering module
//!
//! - `MediaElement`: the primitive the playback controller drives
//! - `RodioElement`: rodio sink implementation, one instance per media kind

mod element;
#[cfg(test)]
pub(crate) mod mock;
mod player;

pub use element::{ElementError, ElementStatus, MediaElement};
pub use player::{RodioElement, open_output};
