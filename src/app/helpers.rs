//! Startup helpers: choosing and opening the store

use std::path::{Path, PathBuf};

use crate::database::{
    MediaStore, MemoryStore, RecordStore, SerializedStore, Store, StoreError, migrate_legacy,
};
use crate::features::StorageBackend;
use crate::features::Settings;
use crate::features::import::IngestFile;
use crate::library::Library;

use super::message::Notice;

/// File names inside the data directory
pub const DATABASE_FILE: &str = "library.db";
pub const LEGACY_FILE: &str = "local_storage.json";
pub const BLOB_DIR: &str = "blobs";

/// Open the configured backend, migrating legacy data into the record store
async fn open_store(settings: &Settings, data_dir: &Path) -> Result<Store, StoreError> {
    let legacy_path = data_dir.join(LEGACY_FILE);
    let quota = settings.storage.serialized_quota_bytes;

    match settings.storage.backend {
        StorageBackend::Records => {
            let mut records =
                RecordStore::new(data_dir.join(DATABASE_FILE), data_dir.join(BLOB_DIR));
            records.initialize().await?;

            let legacy = SerializedStore::new(legacy_path, quota);
            migrate_legacy(&legacy, &records).await;
            Ok(Store::Records(records))
        }
        StorageBackend::Serialized => {
            let mut serialized = SerializedStore::new(legacy_path, quota);
            serialized.initialize().await?;
            Ok(Store::Serialized(serialized))
        }
    }
}

/// Open and load the library
///
/// Never fails: when persistence is unavailable the library runs on a
/// session-only store and the user is told once.
pub async fn open_library(settings: &Settings, data_dir: &Path) -> (Library<Store>, Vec<Notice>) {
    let mut notices = Vec::new();

    tracing::info!(
        backend = %settings.storage.backend,
        "Opening library in {}",
        data_dir.display()
    );

    let store = match open_store(settings, data_dir).await {
        Ok(store) => Some(store),
        Err(e) => {
            tracing::error!("Failed to open store: {}", e);
            notices.push(degraded_notice(&e));
            None
        }
    };

    if let Some(store) = store {
        let mut library = Library::new(store);
        match library.load().await {
            Ok(report) => {
                if report.stale > 0 {
                    notices.push(Notice::info(format!(
                        "{} entries point at files that no longer exist",
                        report.stale
                    )));
                }
                return (library, notices);
            }
            Err(e) => {
                tracing::error!("Failed to load library: {}", e);
                notices.push(degraded_notice(&e));
            }
        }
    }

    (Library::new(Store::Memory(MemoryStore::new())), notices)
}

fn degraded_notice(e: &StoreError) -> Notice {
    Notice::error(format!(
        "Storage unavailable ({}). Your playlist will not be saved this session.",
        e
    ))
}

/// Describe user-selected paths, skipping those that cannot be read
pub fn collect_files(paths: &[PathBuf]) -> (Vec<IngestFile>, Vec<Notice>) {
    let mut files = Vec::with_capacity(paths.len());
    let mut notices = Vec::new();

    for path in paths {
        match IngestFile::from_path(path) {
            Ok(file) if path.is_file() => files.push(file),
            Ok(_) => notices.push(Notice::error(format!("Not a file: {}", path.display()))),
            Err(e) => {
                tracing::warn!("Cannot read {}: {}", path.display(), e);
                notices.push(Notice::error(format!("Cannot read {}: {}", path.display(), e)));
            }
        }
    }

    (files, notices)
}
