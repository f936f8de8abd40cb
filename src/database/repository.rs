//! Store interface - main entry point
//! Delegates to the backend selected at startup

use std::path::Path;

use super::error::StoreError;
use super::memory_store::MemoryStore;
use super::models::{EntryId, MediaEntry, NewEntry, SourceKind};
use super::record_store::RecordStore;
use super::serialized_store::SerializedStore;

/// Durable catalogue of media entries
///
/// All operations are awaited one at a time by the library; implementations
/// never see interleaved writes.
#[allow(async_fn_in_trait)]
pub trait MediaStore {
    /// Short backend name for logs
    fn backend_name(&self) -> &'static str;

    /// Which source representation new entries should carry
    fn source_kind(&self) -> SourceKind;

    /// Directory where in-memory bytes are materialised for external references
    fn blob_dir(&self) -> Option<&Path> {
        None
    }

    /// Prepare the backing store. Calling it again is a no-op.
    async fn initialize(&mut self) -> Result<(), StoreError>;

    /// All entries in insertion order, read from durable state
    async fn list_all(&self) -> Result<Vec<MediaEntry>, StoreError>;

    /// Persist one entry at the end of the playlist
    async fn insert(&self, entry: &NewEntry) -> Result<EntryId, StoreError>;

    /// Delete one entry; unknown ids are ignored
    async fn remove_by_id(&self, id: EntryId) -> Result<(), StoreError>;

    /// Delete every entry in a single step
    async fn clear(&self) -> Result<(), StoreError>;
}

/// Backend chosen at startup
#[derive(Debug)]
pub enum Store {
    Records(RecordStore),
    Serialized(SerializedStore),
    Memory(MemoryStore),
}

impl MediaStore for Store {
    fn backend_name(&self) -> &'static str {
        match self {
            Store::Records(s) => s.backend_name(),
            Store::Serialized(s) => s.backend_name(),
            Store::Memory(s) => s.backend_name(),
        }
    }

    fn source_kind(&self) -> SourceKind {
        match self {
            Store::Records(s) => s.source_kind(),
            Store::Serialized(s) => s.source_kind(),
            Store::Memory(s) => s.source_kind(),
        }
    }

    fn blob_dir(&self) -> Option<&Path> {
        match self {
            Store::Records(s) => s.blob_dir(),
            Store::Serialized(s) => s.blob_dir(),
            Store::Memory(s) => s.blob_dir(),
        }
    }

    async fn initialize(&mut self) -> Result<(), StoreError> {
        match self {
            Store::Records(s) => s.initialize().await,
            Store::Serialized(s) => s.initialize().await,
            Store::Memory(s) => s.initialize().await,
        }
    }

    async fn list_all(&self) -> Result<Vec<MediaEntry>, StoreError> {
        match self {
            Store::Records(s) => s.list_all().await,
            Store::Serialized(s) => s.list_all().await,
            Store::Memory(s) => s.list_all().await,
        }
    }

    async fn insert(&self, entry: &NewEntry) -> Result<EntryId, StoreError> {
        match self {
            Store::Records(s) => s.insert(entry).await,
            Store::Serialized(s) => s.insert(entry).await,
            Store::Memory(s) => s.insert(entry).await,
        }
    }

    async fn remove_by_id(&self, id: EntryId) -> Result<(), StoreError> {
        match self {
            Store::Records(s) => s.remove_by_id(id).await,
            Store::Serialized(s) => s.remove_by_id(id).await,
            Store::Memory(s) => s.remove_by_id(id).await,
        }
    }

    async fn clear(&self) -> Result<(), StoreError> {
        match self {
            Store::Records(s) => s.clear().await,
            Store::Serialized(s) => s.clear().await,
            Store::Memory(s) => s.clear().await,
        }
    }
}
