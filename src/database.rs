//! Media reference store
//!
//! A single `MediaStore` interface with interchangeable backends:
//! - `RecordStore`: SQLite via sqlx, autoincrement ids, external file references
//! - `SerializedStore`: one JSON array under a fixed key, embedded bytes, small quota
//! - `MemoryStore`: session-only fallback when persistence is unavailable

mod error;
mod memory_store;
mod migration;
mod models;
mod record_store;
mod repository;
mod schema;
mod serialized_store;

pub use error::StoreError;
pub use memory_store::MemoryStore;
pub use migration::{MigrationReport, migrate_legacy};
pub use models::*;
pub use record_store::RecordStore;
pub(crate) use record_store::write_blob;
pub use repository::{MediaStore, Store};
pub use serialized_store::{DEFAULT_QUOTA_BYTES, PLAYLIST_KEY, SerializedStore};
