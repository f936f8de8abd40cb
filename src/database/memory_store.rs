//! Session-only backend
//!
//! Used when the configured store cannot be opened: the library keeps working
//! for the current run but nothing survives a restart.

use parking_lot::Mutex;

use super::error::StoreError;
use super::models::{EntryId, MediaEntry, NewEntry, SourceKind};
use super::repository::MediaStore;

#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: Mutex<Vec<MediaEntry>>,
    next_id: Mutex<i64>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl MediaStore for MemoryStore {
    fn backend_name(&self) -> &'static str {
        "memory"
    }

    fn source_kind(&self) -> SourceKind {
        SourceKind::External
    }

    async fn initialize(&mut self) -> Result<(), StoreError> {
        Ok(())
    }

    async fn list_all(&self) -> Result<Vec<MediaEntry>, StoreError> {
        Ok(self.entries.lock().clone())
    }

    async fn insert(&self, entry: &NewEntry) -> Result<EntryId, StoreError> {
        let id = {
            let mut next_id = self.next_id.lock();
            *next_id += 1;
            *next_id
        };
        self.entries
            .lock()
            .push(entry.clone().into_entry(EntryId::Record(id)));
        Ok(EntryId::Record(id))
    }

    async fn remove_by_id(&self, id: EntryId) -> Result<(), StoreError> {
        let mut entries = self.entries.lock();
        match id {
            EntryId::Record(id) => entries.retain(|e| e.id != Some(id)),
            EntryId::Position(position) => {
                if position < entries.len() {
                    entries.remove(position);
                }
            }
        }
        Ok(())
    }

    async fn clear(&self) -> Result<(), StoreError> {
        self.entries.lock().clear();
        Ok(())
    }
}
