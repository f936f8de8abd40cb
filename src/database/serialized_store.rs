//! Serialized key/value backend
//!
//! A small JSON file of string keys to string values. The playlist lives under
//! a single key as one JSON array of `{name, type, data, size}` where `data`
//! embeds the whole file as a `data:` URL, so the quota fills up quickly.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use super::error::StoreError;
use super::models::{EntryId, MediaEntry, MediaSource, NewEntry, SerializedEntry, SourceKind};
use super::repository::MediaStore;
use crate::utils::encode_data_url;

/// Key holding the serialized playlist
pub const PLAYLIST_KEY: &str = "playlist";

/// Default capacity, in bytes of keys plus values
pub const DEFAULT_QUOTA_BYTES: u64 = 5 * 1024 * 1024;

type KeyValues = BTreeMap<String, String>;

/// Quota-limited key/value file holding a serialized playlist
#[derive(Debug)]
pub struct SerializedStore {
    path: PathBuf,
    quota_bytes: u64,
    initialized: bool,
}

impl SerializedStore {
    pub fn new(path: impl Into<PathBuf>, quota_bytes: u64) -> Self {
        Self {
            path: path.into(),
            quota_bytes,
            initialized: false,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Whether the backing file exists at all
    pub fn exists(&self) -> bool {
        self.path.exists()
    }

    async fn read_map(&self) -> Result<KeyValues, StoreError> {
        match tokio::fs::read_to_string(&self.path).await {
            Ok(content) if content.trim().is_empty() => Ok(KeyValues::new()),
            Ok(content) => Ok(serde_json::from_str(&content)?),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(KeyValues::new()),
            Err(e) => Err(e.into()),
        }
    }

    /// Replace the whole file, refusing writes that would exceed the quota
    async fn write_map(&self, map: &KeyValues) -> Result<(), StoreError> {
        let used: u64 = map
            .iter()
            .map(|(k, v)| (k.len() + v.len()) as u64)
            .sum();
        if used > self.quota_bytes {
            tracing::warn!(used, quota = self.quota_bytes, "Serialized store is full");
            return Err(StoreError::QuotaExceeded);
        }

        let content = serde_json::to_string(map)?;
        let tmp = self.path.with_extension("json.tmp");
        tokio::fs::write(&tmp, content)
            .await
            .map_err(StoreError::from_write)?;
        tokio::fs::rename(&tmp, &self.path).await?;
        Ok(())
    }

    /// Entries currently stored under the playlist key
    pub async fn read_entries(&self) -> Result<Vec<SerializedEntry>, StoreError> {
        let map = self.read_map().await?;
        match map.get(PLAYLIST_KEY) {
            Some(value) => Ok(serde_json::from_str(value)?),
            None => Ok(Vec::new()),
        }
    }

    async fn write_entries(&self, entries: &[SerializedEntry]) -> Result<(), StoreError> {
        let mut map = self.read_map().await?;
        if entries.is_empty() {
            map.remove(PLAYLIST_KEY);
        } else {
            map.insert(PLAYLIST_KEY.to_string(), serde_json::to_string(entries)?);
        }
        self.write_map(&map).await
    }

    /// Drop a key entirely
    pub async fn remove_key(&self, key: &str) -> Result<(), StoreError> {
        let mut map = self.read_map().await?;
        if map.remove(key).is_some() {
            self.write_map(&map).await?;
        }
        Ok(())
    }

    async fn embed(&self, entry: &NewEntry) -> Result<String, StoreError> {
        match &entry.source {
            MediaSource::Embedded { data_url } => Ok(data_url.clone()),
            MediaSource::External { path } => {
                let bytes = tokio::fs::read(path).await?;
                Ok(encode_data_url(&entry.media_type, &bytes))
            }
        }
    }
}

impl MediaStore for SerializedStore {
    fn backend_name(&self) -> &'static str {
        "serialized"
    }

    fn source_kind(&self) -> SourceKind {
        SourceKind::Embedded
    }

    async fn initialize(&mut self) -> Result<(), StoreError> {
        if self.initialized {
            return Ok(());
        }

        let unavailable = |e: &dyn std::fmt::Display| StoreError::StorageUnavailable(e.to_string());

        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| unavailable(&e))?;
        }

        // A corrupt playlist is dropped rather than blocking startup
        if let Err(e) = self.read_entries().await {
            tracing::warn!("Discarding unreadable serialized playlist: {}", e);
            let mut map = self.read_map().await.unwrap_or_default();
            map.remove(PLAYLIST_KEY);
            self.write_map(&map).await.map_err(|e| unavailable(&e))?;
        } else if !self.path.exists() {
            self.write_map(&KeyValues::new())
                .await
                .map_err(|e| unavailable(&e))?;
        }

        tracing::info!("Serialized store ready at: {}", self.path.display());
        self.initialized = true;
        Ok(())
    }

    async fn list_all(&self) -> Result<Vec<MediaEntry>, StoreError> {
        Ok(self
            .read_entries()
            .await?
            .into_iter()
            .map(SerializedEntry::into_entry)
            .collect())
    }

    async fn insert(&self, entry: &NewEntry) -> Result<EntryId, StoreError> {
        let mut entries = self.read_entries().await?;
        let position = entries.len();
        entries.push(SerializedEntry {
            name: entry.name.clone(),
            media_type: entry.media_type.clone(),
            data: self.embed(entry).await?,
            size: entry.size,
        });
        self.write_entries(&entries).await?;
        Ok(EntryId::Position(position))
    }

    async fn remove_by_id(&self, id: EntryId) -> Result<(), StoreError> {
        let EntryId::Position(position) = id else {
            tracing::debug!(?id, "Serialized store has no record ids");
            return Ok(());
        };

        let mut entries = self.read_entries().await?;
        if position >= entries.len() {
            return Ok(());
        }
        entries.remove(position);
        self.write_entries(&entries).await
    }

    async fn clear(&self) -> Result<(), StoreError> {
        self.remove_key(PLAYLIST_KEY).await
    }
}
