//! Library data model
//! `MediaEntry` is what the rest of the app sees; the `*Record` types map
//! directly to the persisted layouts of each backend.

use std::path::{Path, PathBuf};

use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Broad media category, decides which rendering primitive plays an entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum MediaKind {
    #[default]
    Audio,
    Video,
}

impl MediaKind {
    /// Classify a MIME-like type string (`video/...` is video, everything else audio)
    pub fn from_media_type(media_type: &str) -> Self {
        if media_type.starts_with("video") {
            MediaKind::Video
        } else {
            MediaKind::Audio
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            MediaKind::Audio => "Audio",
            MediaKind::Video => "Video",
        }
    }
}

/// Deduplication key: two files with the same name and size are the same entry
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DedupKey {
    pub name: String,
    pub size: u64,
}

/// Where an entry's bytes come from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MediaSource {
    /// Self-contained `data:` URL holding the whole file
    Embedded { data_url: String },
    /// Reference to a file on disk; nothing is copied
    External { path: PathBuf },
}

impl MediaSource {
    /// Whether an external reference still resolves
    ///
    /// A path whose existence cannot be determined counts as stale.
    pub async fn is_stale(&self) -> bool {
        match self {
            MediaSource::Embedded { .. } => false,
            MediaSource::External { path } => !tokio::fs::try_exists(path).await.unwrap_or(false),
        }
    }
}

/// Which source representation a backend stores
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceKind {
    Embedded,
    External,
}

/// Identifier handed out by a store on insert
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryId {
    /// Autoincrement key of the record backend
    Record(i64),
    /// Position in a serialized list
    Position(usize),
}

/// One playlist item
#[derive(Debug, Clone, PartialEq)]
pub struct MediaEntry {
    /// Assigned by record stores on insert; `None` for positional storage
    pub id: Option<i64>,
    pub name: String,
    /// MIME-like type, `audio/<subtype>` or `video/<subtype>`
    pub media_type: String,
    pub size: u64,
    pub source: MediaSource,
    pub date_added: Option<DateTime<Utc>>,
}

impl MediaEntry {
    pub fn kind(&self) -> MediaKind {
        MediaKind::from_media_type(&self.media_type)
    }

    pub fn dedup_key(&self) -> DedupKey {
        DedupKey {
            name: self.name.clone(),
            size: self.size,
        }
    }

    pub fn matches(&self, key: &DedupKey) -> bool {
        self.name == key.name && self.size == key.size
    }

    /// Locator used to remove this entry from the store it came from
    pub fn locator(&self, position: usize) -> EntryId {
        match self.id {
            Some(id) => EntryId::Record(id),
            None => EntryId::Position(position),
        }
    }
}

/// An entry that has not been persisted yet
#[derive(Debug, Clone, PartialEq)]
pub struct NewEntry {
    pub name: String,
    pub media_type: String,
    pub size: u64,
    pub source: MediaSource,
    pub date_added: DateTime<Utc>,
}

impl NewEntry {
    /// Attach the id the store handed out
    pub fn into_entry(self, id: EntryId) -> MediaEntry {
        MediaEntry {
            id: match id {
                EntryId::Record(id) => Some(id),
                EntryId::Position(_) => None,
            },
            name: self.name,
            media_type: self.media_type,
            size: self.size,
            source: self.source,
            date_added: Some(self.date_added),
        }
    }

    pub fn dedup_key(&self) -> DedupKey {
        DedupKey {
            name: self.name.clone(),
            size: self.size,
        }
    }
}

/// Row of the `media` table
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct MediaRecord {
    /// Unique identifier (auto-increment)
    pub id: i64,
    /// Original file name
    pub name: String,
    /// MIME-like type
    pub media_type: String,
    /// Absolute path of the referenced file
    pub url: String,
    /// File size in bytes
    pub size: i64,
    /// Created timestamp
    pub date_added: i64,
}

impl MediaRecord {
    pub fn into_entry(self) -> MediaEntry {
        MediaEntry {
            id: Some(self.id),
            name: self.name,
            media_type: self.media_type,
            size: self.size.max(0) as u64,
            source: MediaSource::External {
                path: PathBuf::from(self.url),
            },
            date_added: Utc.timestamp_opt(self.date_added, 0).single(),
        }
    }

    /// Whether the referenced file lives inside `dir`
    pub fn is_inside(&self, dir: &Path) -> bool {
        Path::new(&self.url).starts_with(dir)
    }
}

/// Element of the serialized playlist array: `{name, type, data, size}`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SerializedEntry {
    pub name: String,
    #[serde(rename = "type")]
    pub media_type: String,
    pub data: String,
    pub size: u64,
}

impl SerializedEntry {
    pub fn into_entry(self) -> MediaEntry {
        MediaEntry {
            id: None,
            name: self.name,
            media_type: self.media_type,
            size: self.size,
            source: MediaSource::Embedded {
                data_url: self.data,
            },
            date_added: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_media_kind_classification() {
        assert_eq!(MediaKind::from_media_type("video/mp4"), MediaKind::Video);
        assert_eq!(MediaKind::from_media_type("audio/mpeg"), MediaKind::Audio);
        assert_eq!(MediaKind::from_media_type(""), MediaKind::Audio);
    }

    #[test]
    fn test_serialized_entry_layout() {
        let entry = SerializedEntry {
            name: "a.mp3".to_string(),
            media_type: "audio/mpeg".to_string(),
            data: "data:audio/mpeg;base64,AAAA".to_string(),
            size: 3,
        };
        let json = serde_json::to_value(&entry).unwrap();
        assert_eq!(json["type"], "audio/mpeg");
        assert_eq!(json["data"], "data:audio/mpeg;base64,AAAA");
        assert!(json.get("media_type").is_none());
    }

    #[test]
    fn test_locator_prefers_record_id() {
        let mut entry = SerializedEntry {
            name: "a.mp3".to_string(),
            media_type: "audio/mpeg".to_string(),
            data: String::new(),
            size: 1,
        }
        .into_entry();
        assert_eq!(entry.locator(4), EntryId::Position(4));

        entry.id = Some(9);
        assert_eq!(entry.locator(4), EntryId::Record(9));
    }
}
