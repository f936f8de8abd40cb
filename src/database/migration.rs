//! One-shot migration from the legacy serialized playlist into the record store

use super::models::{NewEntry, SerializedEntry};
use super::record_store::RecordStore;
use super::repository::MediaStore;
use super::serialized_store::{PLAYLIST_KEY, SerializedStore};
use crate::database::MediaSource;

/// Outcome of a legacy migration run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MigrationReport {
    pub migrated: usize,
    pub duplicates: usize,
    pub failed: usize,
}

/// Move every legacy entry into `records`, then drop the legacy key
///
/// Never fails: problems are logged and counted. The legacy copy is kept when
/// any entry could not be moved, so the next launch retries the remainder
/// (already-moved entries are skipped by their dedup key).
pub async fn migrate_legacy(legacy: &SerializedStore, records: &RecordStore) -> MigrationReport {
    let mut report = MigrationReport::default();

    if !legacy.exists() {
        return report;
    }

    let entries = match legacy.read_entries().await {
        Ok(entries) => entries,
        Err(e) => {
            tracing::warn!("Legacy playlist unreadable, skipping migration: {}", e);
            return report;
        }
    };

    if entries.is_empty() {
        return report;
    }

    tracing::info!("Migrating {} legacy entries", entries.len());

    for entry in entries {
        let new_entry = to_new_entry(entry);
        let key = new_entry.dedup_key();

        match records.contains(&key).await {
            Ok(true) => {
                report.duplicates += 1;
                continue;
            }
            Ok(false) => {}
            Err(e) => {
                tracing::warn!("Migration lookup failed for {}: {}", key.name, e);
                report.failed += 1;
                continue;
            }
        }

        match records.insert(&new_entry).await {
            Ok(_) => report.migrated += 1,
            Err(e) => {
                tracing::warn!("Failed to migrate {}: {}", key.name, e);
                report.failed += 1;
            }
        }
    }

    if report.failed == 0 {
        if let Err(e) = legacy.remove_key(PLAYLIST_KEY).await {
            tracing::warn!("Failed to remove legacy playlist: {}", e);
        }
    } else {
        tracing::warn!(
            failed = report.failed,
            "Keeping legacy playlist until every entry has been migrated"
        );
    }

    tracing::info!(
        migrated = report.migrated,
        duplicates = report.duplicates,
        failed = report.failed,
        "Legacy migration finished"
    );
    report
}

fn to_new_entry(entry: SerializedEntry) -> NewEntry {
    NewEntry {
        name: entry.name,
        media_type: entry.media_type,
        size: entry.size,
        source: MediaSource::Embedded {
            data_url: entry.data,
        },
        date_added: chrono::Utc::now(),
    }
}
