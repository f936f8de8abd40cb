//! In-memory playlist backed by a `MediaStore`
//!
//! The entry list only changes after the matching store call has succeeded,
//! so the in-memory view never runs ahead of durable state. Every change bumps
//! the snapshot revision and is published to subscribers.

use tokio::sync::watch;

use crate::database::{DedupKey, MediaEntry, MediaKind, MediaStore, NewEntry, StoreError};
use crate::utils::song_count_label;

/// One row as the renderer sees it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlaylistItem {
    pub name: String,
    pub kind: MediaKind,
}

/// Ordered playlist published to the rendering layer
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LibrarySnapshot {
    pub items: Vec<PlaylistItem>,
    pub revision: u64,
}

impl LibrarySnapshot {
    pub fn count_label(&self) -> String {
        song_count_label(self.items.len())
    }
}

/// Summary of a `load`
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LoadReport {
    pub entries: usize,
    /// External references whose file no longer exists
    pub stale: usize,
}

pub struct Library<S> {
    store: S,
    entries: Vec<MediaEntry>,
    revision: u64,
    snapshot_tx: watch::Sender<LibrarySnapshot>,
}

impl<S: MediaStore> Library<S> {
    pub fn new(store: S) -> Self {
        let (snapshot_tx, _) = watch::channel(LibrarySnapshot::default());
        Self {
            store,
            entries: Vec::new(),
            revision: 0,
            snapshot_tx,
        }
    }

    /// Replace the in-memory list with what the store holds
    pub async fn load(&mut self) -> Result<LoadReport, StoreError> {
        let entries = self.store.list_all().await?;

        let mut stale = 0;
        for entry in &entries {
            if entry.source.is_stale().await {
                tracing::warn!("Stale reference, file is gone: {}", entry.name);
                stale += 1;
            }
        }

        self.entries = entries;
        self.publish();

        tracing::info!(
            backend = self.store.backend_name(),
            entries = self.entries.len(),
            stale,
            "Library loaded"
        );
        Ok(LoadReport {
            entries: self.entries.len(),
            stale,
        })
    }

    pub fn entries(&self) -> &[MediaEntry] {
        &self.entries
    }

    pub fn get(&self, index: usize) -> Option<&MediaEntry> {
        self.entries.get(index)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains_key(&self, key: &DedupKey) -> bool {
        self.entries.iter().any(|e| e.matches(key))
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn subscribe(&self) -> watch::Receiver<LibrarySnapshot> {
        self.snapshot_tx.subscribe()
    }

    pub fn snapshot(&self) -> LibrarySnapshot {
        self.snapshot_tx.borrow().clone()
    }

    /// Persist a new entry, then append it
    pub async fn commit(&mut self, entry: NewEntry) -> Result<&MediaEntry, StoreError> {
        let id = self.store.insert(&entry).await?;
        self.entries.push(entry.into_entry(id));
        self.publish();

        let index = self.entries.len() - 1;
        Ok(&self.entries[index])
    }

    /// Remove the entry at `index`
    ///
    /// Returns `None` for an out-of-range index, which is logged and ignored.
    pub async fn remove_at(&mut self, index: usize) -> Result<Option<MediaEntry>, StoreError> {
        let Some(entry) = self.entries.get(index) else {
            tracing::warn!(index, len = self.entries.len(), "Ignoring removal of invalid index");
            return Ok(None);
        };

        self.store.remove_by_id(entry.locator(index)).await?;
        let removed = self.entries.remove(index);
        self.publish();

        tracing::info!("Removed: {}", removed.name);
        Ok(Some(removed))
    }

    /// Remove every entry
    pub async fn clear(&mut self) -> Result<(), StoreError> {
        self.store.clear().await?;
        self.entries.clear();
        self.publish();

        tracing::info!("Library cleared");
        Ok(())
    }

    fn publish(&mut self) {
        self.revision += 1;
        let snapshot = LibrarySnapshot {
            items: self
                .entries
                .iter()
                .map(|e| PlaylistItem {
                    name: e.name.clone(),
                    kind: e.kind(),
                })
                .collect(),
            revision: self.revision,
        };
        self.snapshot_tx.send_replace(snapshot);
    }
}
