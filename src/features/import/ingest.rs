//! Turns selected or scanned files into library entries

use std::path::{Path, PathBuf};

use thiserror::Error;

use super::{classify_media_type, file_name_of};
use crate::database::{
    DedupKey, MediaEntry, MediaSource, MediaStore, NewEntry, SourceKind, StoreError, write_blob,
};
use crate::library::Library;
use crate::utils::encode_data_url;

/// How an ingested file's bytes are reached
#[derive(Debug, Clone)]
pub enum FileAccessor {
    /// File on disk; read lazily
    Path(PathBuf),
    /// Bytes already in memory
    Memory(Vec<u8>),
}

/// A file offered to the library
#[derive(Debug, Clone)]
pub struct IngestFile {
    pub name: String,
    pub declared_type: Option<String>,
    pub size: u64,
    pub accessor: FileAccessor,
}

impl IngestFile {
    /// Describe a file on disk
    pub fn from_path(path: &Path) -> std::io::Result<Self> {
        let metadata = std::fs::metadata(path)?;
        Ok(Self {
            name: file_name_of(path),
            declared_type: None,
            size: metadata.len(),
            accessor: FileAccessor::Path(path.to_path_buf()),
        })
    }

    pub fn from_bytes(name: impl Into<String>, declared_type: Option<String>, bytes: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            declared_type,
            size: bytes.len() as u64,
            accessor: FileAccessor::Memory(bytes),
        }
    }

    pub fn dedup_key(&self) -> DedupKey {
        DedupKey {
            name: self.name.clone(),
            size: self.size,
        }
    }
}

/// Result of ingesting one file
#[derive(Debug, Clone, PartialEq)]
pub enum IngestOutcome {
    Added(MediaEntry),
    /// An entry with the same name and size already exists
    Duplicate,
}

#[derive(Error, Debug)]
pub enum IngestError {
    /// The file's bytes could not be obtained; skip it and continue
    #[error("Cannot read {name}: {reason}")]
    SourceUnreadable { name: String, reason: String },

    /// The store is full; the rest of the batch is abandoned
    #[error("Storage quota exceeded")]
    QuotaExceeded,

    #[error(transparent)]
    Storage(StoreError),
}

impl From<StoreError> for IngestError {
    fn from(e: StoreError) -> Self {
        if e.is_quota() {
            IngestError::QuotaExceeded
        } else {
            IngestError::Storage(e)
        }
    }
}

impl IngestError {
    fn unreadable(name: &str, reason: impl std::fmt::Display) -> Self {
        IngestError::SourceUnreadable {
            name: name.to_string(),
            reason: reason.to_string(),
        }
    }
}

/// Tally of a sequential batch
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatchReport {
    pub added: usize,
    pub duplicates: usize,
    pub unreadable: usize,
    /// Files whose write failed for reasons other than quota
    pub failed: usize,
    /// Files never stored because the quota ran out, the failing one included
    pub not_attempted: usize,
    pub quota_exceeded: bool,
}

impl BatchReport {
    pub fn record(&mut self, result: &Result<IngestOutcome, IngestError>) {
        match result {
            Ok(IngestOutcome::Added(_)) => self.added += 1,
            Ok(IngestOutcome::Duplicate) => self.duplicates += 1,
            Err(IngestError::SourceUnreadable { .. }) => self.unreadable += 1,
            Err(IngestError::QuotaExceeded) => self.quota_exceeded = true,
            Err(IngestError::Storage(_)) => self.failed += 1,
        }
    }
}

/// Ingest a single file
///
/// A file whose (name, size) is already in the library is a silent no-op.
pub async fn ingest<S: MediaStore>(
    library: &mut Library<S>,
    file: IngestFile,
) -> Result<IngestOutcome, IngestError> {
    let key = file.dedup_key();
    if library.contains_key(&key) {
        tracing::debug!("Already in library: {}", file.name);
        return Ok(IngestOutcome::Duplicate);
    }

    let media_type = classify_media_type(&file.name, file.declared_type.as_deref());
    let source = resolve_source(library.store(), &file, &media_type, &key).await?;

    let entry = NewEntry {
        name: file.name,
        media_type,
        size: file.size,
        source,
        date_added: chrono::Utc::now(),
    };

    let stored = library.commit(entry).await?;
    tracing::info!("Added: {}", stored.name);
    Ok(IngestOutcome::Added(stored.clone()))
}

/// Ingest files one at a time, in order
///
/// Per-file problems are counted and skipped; a full store stops the batch.
pub async fn ingest_batch<S: MediaStore>(
    library: &mut Library<S>,
    files: Vec<IngestFile>,
) -> BatchReport {
    let total = files.len();
    let mut report = BatchReport::default();

    for (index, file) in files.into_iter().enumerate() {
        let name = file.name.clone();
        let result = ingest(library, file).await;
        report.record(&result);

        match result {
            Err(IngestError::QuotaExceeded) => {
                report.not_attempted = total - index;
                tracing::error!(
                    added = report.added,
                    not_attempted = report.not_attempted,
                    "Storage full, stopping batch at {}",
                    name
                );
                break;
            }
            Err(e) => tracing::warn!("Skipping {}: {}", name, e),
            Ok(_) => {}
        }
    }

    report
}

async fn resolve_source<S: MediaStore>(
    store: &S,
    file: &IngestFile,
    media_type: &str,
    key: &DedupKey,
) -> Result<MediaSource, IngestError> {
    match (store.source_kind(), &file.accessor) {
        (SourceKind::Embedded, FileAccessor::Path(path)) => {
            let bytes = tokio::fs::read(path)
                .await
                .map_err(|e| IngestError::unreadable(&file.name, e))?;
            Ok(MediaSource::Embedded {
                data_url: encode_data_url(media_type, &bytes),
            })
        }
        (SourceKind::Embedded, FileAccessor::Memory(bytes)) => Ok(MediaSource::Embedded {
            data_url: encode_data_url(media_type, bytes),
        }),
        (SourceKind::External, FileAccessor::Path(path)) => {
            let path = tokio::fs::canonicalize(path)
                .await
                .map_err(|e| IngestError::unreadable(&file.name, e))?;
            // Resolving a path says nothing about whether its bytes can be read
            tokio::fs::File::open(&path)
                .await
                .map_err(|e| IngestError::unreadable(&file.name, e))?;
            Ok(MediaSource::External { path })
        }
        (SourceKind::External, FileAccessor::Memory(bytes)) => match store.blob_dir() {
            Some(dir) => Ok(MediaSource::External {
                path: write_blob(dir, key, bytes).await?,
            }),
            None => Ok(MediaSource::Embedded {
                data_url: encode_data_url(media_type, bytes),
            }),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::{MemoryStore, RecordStore, SerializedStore};

    async fn serialized_library(dir: &Path, quota: u64) -> Library<SerializedStore> {
        let mut store = SerializedStore::new(dir.join("local_storage.json"), quota);
        store.initialize().await.unwrap();
        Library::new(store)
    }

    #[tokio::test]
    async fn test_select_one_audio_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a.mp3");
        std::fs::write(&path, vec![0u8; 500_000]).unwrap();

        let mut library = Library::new(MemoryStore::new());
        let outcome = ingest(&mut library, IngestFile::from_path(&path).unwrap())
            .await
            .unwrap();

        let IngestOutcome::Added(entry) = outcome else {
            panic!("expected a new entry");
        };
        assert_eq!(entry.media_type, "audio/mp3");
        assert_eq!(entry.size, 500_000);
        assert!(matches!(entry.source, MediaSource::External { .. }));
        assert_eq!(library.store().list_all().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_same_name_and_size_is_ingested_once() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a.mp3");
        std::fs::write(&path, b"abc").unwrap();

        let mut library = Library::new(MemoryStore::new());
        let file = IngestFile::from_path(&path).unwrap();
        let report = ingest_batch(&mut library, vec![file.clone(), file]).await;

        assert_eq!(report.added, 1);
        assert_eq!(report.duplicates, 1);
        assert_eq!(library.len(), 1);
    }

    #[tokio::test]
    async fn test_same_name_other_size_is_new() {
        let mut library = Library::new(MemoryStore::new());
        ingest(&mut library, IngestFile::from_bytes("a.mp3", None, vec![1; 3]))
            .await
            .unwrap();
        ingest(&mut library, IngestFile::from_bytes("a.mp3", None, vec![1; 4]))
            .await
            .unwrap();
        assert_eq!(library.len(), 2);
    }

    #[tokio::test]
    async fn test_unreadable_file_is_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let good = dir.path().join("good.mp3");
        std::fs::write(&good, b"abc").unwrap();

        let missing = IngestFile {
            name: "gone.mp3".into(),
            declared_type: None,
            size: 3,
            accessor: FileAccessor::Path(dir.path().join("gone.mp3")),
        };

        let mut library = Library::new(MemoryStore::new());
        let report = ingest_batch(
            &mut library,
            vec![missing, IngestFile::from_path(&good).unwrap()],
        )
        .await;

        assert_eq!(report.unreadable, 1);
        assert_eq!(report.added, 1);
        assert!(!report.quota_exceeded);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_permission_denied_file_is_skipped_on_record_backend() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let locked = dir.path().join("locked.mp3");
        let open = dir.path().join("open.mp3");
        std::fs::write(&locked, b"secret").unwrap();
        std::fs::write(&open, b"music").unwrap();
        std::fs::set_permissions(&locked, std::fs::Permissions::from_mode(0o000)).unwrap();
        if std::fs::File::open(&locked).is_ok() {
            // Running with privileges that ignore file modes
            return;
        }

        let mut store = RecordStore::new(dir.path().join("library.db"), dir.path().join("blobs"));
        store.initialize().await.unwrap();
        let mut library = Library::new(store);

        let files = vec![
            IngestFile::from_path(&locked).unwrap(),
            IngestFile::from_path(&open).unwrap(),
        ];
        let report = ingest_batch(&mut library, files).await;

        assert_eq!(report.unreadable, 1);
        assert_eq!(report.added, 1);
        assert_eq!(library.entries()[0].name, "open.mp3");
        assert_eq!(library.store().list_all().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_quota_aborts_rest_of_batch() {
        let dir = tempfile::tempdir().unwrap();
        // Each 100-byte file serializes to 214 bytes, so only two fit
        let mut library = serialized_library(dir.path(), 500).await;

        let files: Vec<IngestFile> = (0..5)
            .map(|i| IngestFile::from_bytes(format!("{}.mp3", i), None, vec![i as u8; 100]))
            .collect();
        let report = ingest_batch(&mut library, files).await;

        assert!(report.quota_exceeded);
        assert_eq!(report.added, 2);
        assert_eq!(report.not_attempted, 3);
        assert_eq!(library.len(), 2);
        assert_eq!(library.store().list_all().await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_embedded_backend_reads_file_bytes() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("clip.webm");
        std::fs::write(&path, b"hello").unwrap();

        let mut library = serialized_library(dir.path(), 1024 * 1024).await;
        ingest(&mut library, IngestFile::from_path(&path).unwrap())
            .await
            .unwrap();

        let entry = &library.entries()[0];
        assert_eq!(entry.media_type, "video/webm");
        assert_eq!(
            entry.source,
            MediaSource::Embedded {
                data_url: encode_data_url("video/webm", b"hello")
            }
        );
    }

    #[tokio::test]
    async fn test_record_backend_materialises_memory_bytes() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = RecordStore::new(dir.path().join("library.db"), dir.path().join("blobs"));
        store.initialize().await.unwrap();
        let mut library = Library::new(store);

        ingest(
            &mut library,
            IngestFile::from_bytes("a.ogg", Some("audio/ogg".into()), b"xyz".to_vec()),
        )
        .await
        .unwrap();

        let MediaSource::External { path } = &library.entries()[0].source else {
            panic!("expected an external reference");
        };
        assert!(path.starts_with(dir.path().join("blobs")));
        assert_eq!(std::fs::read(path).unwrap(), b"xyz");
    }
}
