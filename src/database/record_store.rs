//! Structured record backend (SQLite)
//!
//! Records hold a reference to the original file instead of its bytes, so the
//! library can grow without duplicating media on disk.

use std::path::{Path, PathBuf};

use sqlx::{Pool, Sqlite, sqlite::SqlitePoolOptions};

use super::error::StoreError;
use super::models::{DedupKey, EntryId, MediaEntry, MediaRecord, MediaSource, NewEntry, SourceKind};
use super::repository::MediaStore;
use super::schema;
use crate::utils::decode_data_url;

/// SQLite-backed record store with autoincrement ids
#[derive(Debug)]
pub struct RecordStore {
    db_path: PathBuf,
    blob_dir: PathBuf,
    pool: Option<Pool<Sqlite>>,
}

impl RecordStore {
    pub fn new(db_path: impl Into<PathBuf>, blob_dir: impl Into<PathBuf>) -> Self {
        Self {
            db_path: db_path.into(),
            blob_dir: blob_dir.into(),
            pool: None,
        }
    }

    fn pool(&self) -> Result<&Pool<Sqlite>, StoreError> {
        self.pool
            .as_ref()
            .ok_or_else(|| StoreError::StorageUnavailable("record store not initialized".into()))
    }

    /// Whether a record with this dedup key exists
    pub async fn contains(&self, key: &DedupKey) -> Result<bool, StoreError> {
        let found: Option<i64> =
            sqlx::query_scalar("SELECT id FROM media WHERE name = ? AND size = ? LIMIT 1")
                .bind(&key.name)
                .bind(key.size as i64)
                .fetch_optional(self.pool()?)
                .await?;
        Ok(found.is_some())
    }

    async fn reference_for(&self, entry: &NewEntry) -> Result<PathBuf, StoreError> {
        match &entry.source {
            MediaSource::External { path } => Ok(path.clone()),
            MediaSource::Embedded { data_url } => {
                let (_, bytes) = decode_data_url(data_url).ok_or_else(|| {
                    StoreError::Io(std::io::Error::new(
                        std::io::ErrorKind::InvalidData,
                        format!("invalid embedded data for {}", entry.name),
                    ))
                })?;
                write_blob(&self.blob_dir, &entry.dedup_key(), &bytes).await
            }
        }
    }

    /// Drop a blob whose record never made it into the table
    async fn discard_blob(&self, path: &Path) {
        if path.starts_with(&self.blob_dir) {
            remove_blob(path).await;
        }
    }

    async fn delete_record(&self, id: i64) -> Result<(), StoreError> {
        let pool = self.pool()?;
        let record = sqlx::query_as::<_, MediaRecord>(
            "SELECT id, name, media_type, url, size, date_added FROM media WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(pool)
        .await?;

        let Some(record) = record else {
            tracing::debug!(id, "remove_by_id: no such record");
            return Ok(());
        };

        sqlx::query("DELETE FROM media WHERE id = ?")
            .bind(id)
            .execute(pool)
            .await?;

        if record.is_inside(&self.blob_dir) {
            remove_blob(Path::new(&record.url)).await;
        }
        Ok(())
    }
}

impl MediaStore for RecordStore {
    fn backend_name(&self) -> &'static str {
        "records"
    }

    fn source_kind(&self) -> SourceKind {
        SourceKind::External
    }

    fn blob_dir(&self) -> Option<&Path> {
        Some(&self.blob_dir)
    }

    async fn initialize(&mut self) -> Result<(), StoreError> {
        if self.pool.is_some() {
            return Ok(());
        }

        let unavailable = |e: &dyn std::fmt::Display| StoreError::StorageUnavailable(e.to_string());

        if let Some(parent) = self.db_path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| unavailable(&e))?;
        }

        let db_url = format!("sqlite:{}?mode=rwc", self.db_path.display());

        // One connection keeps every write strictly ordered
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect(&db_url)
            .await
            .map_err(|e| unavailable(&e))?;

        sqlx::query("PRAGMA journal_mode = WAL")
            .execute(&pool)
            .await
            .map_err(|e| unavailable(&e))?;

        schema::run_migrations(&pool)
            .await
            .map_err(|e| unavailable(&e))?;

        tracing::info!("Record store ready at: {}", self.db_path.display());
        self.pool = Some(pool);
        Ok(())
    }

    async fn list_all(&self) -> Result<Vec<MediaEntry>, StoreError> {
        let records = sqlx::query_as::<_, MediaRecord>(
            "SELECT id, name, media_type, url, size, date_added FROM media ORDER BY id",
        )
        .fetch_all(self.pool()?)
        .await?;
        Ok(records.into_iter().map(MediaRecord::into_entry).collect())
    }

    async fn insert(&self, entry: &NewEntry) -> Result<EntryId, StoreError> {
        let pool = self.pool()?;
        let path = self.reference_for(entry).await?;
        let url = match path.to_str() {
            Some(url) => url.to_string(),
            None => {
                self.discard_blob(&path).await;
                return Err(StoreError::Io(std::io::Error::new(
                    std::io::ErrorKind::InvalidData,
                    format!("path is not valid UTF-8: {}", path.display()),
                )));
            }
        };

        let result = sqlx::query(
            r#"
            INSERT INTO media (name, media_type, url, size, date_added)
            VALUES (?, ?, ?, ?, ?)
            "#,
        )
        .bind(&entry.name)
        .bind(&entry.media_type)
        .bind(url)
        .bind(entry.size as i64)
        .bind(entry.date_added.timestamp())
        .execute(pool)
        .await;

        match result {
            Ok(result) => Ok(EntryId::Record(result.last_insert_rowid())),
            Err(e) => {
                self.discard_blob(&path).await;
                Err(StoreError::from_insert(e))
            }
        }
    }

    async fn remove_by_id(&self, id: EntryId) -> Result<(), StoreError> {
        match id {
            EntryId::Record(id) => self.delete_record(id).await,
            EntryId::Position(position) => {
                let id: Option<i64> =
                    sqlx::query_scalar("SELECT id FROM media ORDER BY id LIMIT 1 OFFSET ?")
                        .bind(position as i64)
                        .fetch_optional(self.pool()?)
                        .await?;
                match id {
                    Some(id) => self.delete_record(id).await,
                    None => Ok(()),
                }
            }
        }
    }

    async fn clear(&self) -> Result<(), StoreError> {
        let pool = self.pool()?;
        let urls: Vec<String> = sqlx::query_scalar("SELECT url FROM media")
            .fetch_all(pool)
            .await?;

        sqlx::query("DELETE FROM media").execute(pool).await?;

        for url in urls {
            let path = Path::new(&url);
            if path.starts_with(&self.blob_dir) {
                remove_blob(path).await;
            }
        }
        Ok(())
    }
}

/// Write bytes that have no file of their own into the blob directory
///
/// The file name is derived from the dedup key, so the same entry always maps
/// to the same blob.
pub(crate) async fn write_blob(
    blob_dir: &Path,
    key: &DedupKey,
    bytes: &[u8],
) -> Result<PathBuf, StoreError> {
    tokio::fs::create_dir_all(blob_dir)
        .await
        .map_err(StoreError::from_write)?;

    let file_name = format!("{}-{}", key.size, key.name.replace(['/', '\\'], "_"));
    let path = blob_dir.join(file_name);
    tokio::fs::write(&path, bytes)
        .await
        .map_err(StoreError::from_write)?;

    tracing::debug!("Materialised blob: {}", path.display());
    Ok(path)
}

async fn remove_blob(path: &Path) {
    if let Err(e) = tokio::fs::remove_file(path).await {
        if e.kind() != std::io::ErrorKind::NotFound {
            tracing::warn!("Failed to remove blob {}: {}", path.display(), e);
        }
    }
}
