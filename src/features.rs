//! Feature modules - business logic separated from the front-end
//!
//! Each feature module contains the core logic for a specific functionality.
//! Features should not depend on the console renderer directly.

pub mod import;
pub mod picker;
pub mod settings;

pub use picker::{DirectoryPicker, FixedPicker, RfdPicker};
pub use settings::{Settings, StorageBackend};
