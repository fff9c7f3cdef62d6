//! File-backed read-marker cache.

use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use directories::ProjectDirs;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::domain::entities::{ChannelKey, ReadMarker};
use crate::domain::errors::CacheError;
use crate::domain::ports::ReadCachePort;

use super::config::{APP_NAME, APP_ORGANIZATION, APP_QUALIFIER};

pub const READ_MARKERS_FILE_NAME: &str = "read_markers.toml";

/// One cached marker. The channel address is stored beside the timestamp so
/// ids containing `-` survive a reload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
struct CachedMarker {
    community: String,
    channel: String,
    read_at: String,
}

impl CachedMarker {
    fn new(key: &ChannelKey, marker: ReadMarker) -> Self {
        Self {
            community: key.community.to_string(),
            channel: key.channel.to_string(),
            read_at: marker.to_rfc3339(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
enum CacheEntry {
    Marker(CachedMarker),
    /// Bare timestamp from files written before entries carried their address.
    Timestamp(String),
}

impl CacheEntry {
    fn read_at(&self) -> &str {
        match self {
            Self::Marker(entry) => &entry.read_at,
            Self::Timestamp(value) => value,
        }
    }

    fn marker(&self) -> Option<ReadMarker> {
        ReadMarker::parse_rfc3339(self.read_at())
    }

    fn channel_key(&self, raw_key: &str) -> Option<ChannelKey> {
        match self {
            Self::Marker(entry) if !entry.community.is_empty() && !entry.channel.is_empty() => {
                Some(ChannelKey::new(entry.community.as_str(), entry.channel.as_str()))
            }
            Self::Marker(_) => None,
            Self::Timestamp(_) => ChannelKey::from_cache_key(raw_key),
        }
    }
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct ReadMarkersFile {
    #[serde(default)]
    read_timestamps: BTreeMap<String, CacheEntry>,
}

/// Read markers persisted as a TOML table keyed by channel.
pub struct FileReadCache {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl FileReadCache {
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    /// Cache in the platform data directory.
    ///
    /// # Errors
    ///
    /// Returns `CacheError::Unavailable` if no data directory can be determined.
    pub fn in_data_dir() -> Result<Self, CacheError> {
        let dirs = ProjectDirs::from(APP_QUALIFIER, APP_ORGANIZATION, APP_NAME)
            .ok_or_else(|| CacheError::Unavailable("no data directory".to_string()))?;
        Ok(Self::new(dirs.data_dir().join(READ_MARKERS_FILE_NAME)))
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_file(&self) -> Result<ReadMarkersFile, CacheError> {
        if !self.path.exists() {
            return Ok(ReadMarkersFile::default());
        }

        let content = fs::read_to_string(&self.path)?;
        match toml::from_str(&content) {
            Ok(file) => Ok(file),
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "Unreadable read marker cache, ignoring it");
                Ok(ReadMarkersFile::default())
            }
        }
    }

    fn write_file(&self, file: &ReadMarkersFile) -> Result<(), CacheError> {
        let content =
            toml::to_string_pretty(file).map_err(|e| CacheError::Serialize(e.to_string()))?;

        let parent = self
            .path
            .parent()
            .ok_or_else(|| CacheError::Io("cache path has no parent".to_string()))?;
        fs::create_dir_all(parent)?;

        let mut temp_file = tempfile::NamedTempFile::new_in(parent)?;
        temp_file.write_all(content.as_bytes())?;
        temp_file.persist(&self.path).map_err(|e| e.error)?;
        Ok(())
    }
}

impl ReadCachePort for FileReadCache {
    fn load_all(&self) -> Result<HashMap<ChannelKey, ReadMarker>, CacheError> {
        let file = self.read_file()?;
        let mut markers = HashMap::with_capacity(file.read_timestamps.len());

        for (raw_key, entry) in file.read_timestamps {
            let Some(key) = entry.channel_key(&raw_key) else {
                warn!(key = %raw_key, "Skipping read marker without a usable channel");
                continue;
            };
            let Some(marker) = entry.marker() else {
                warn!(key = %raw_key, value = %entry.read_at(), "Skipping malformed read marker");
                continue;
            };
            markers.insert(key, marker);
        }

        Ok(markers)
    }

    fn get(&self, key: &ChannelKey) -> Result<Option<ReadMarker>, CacheError> {
        let file = self.read_file()?;
        Ok(file
            .read_timestamps
            .get(&key.cache_key())
            .and_then(CacheEntry::marker))
    }

    fn store(&self, key: &ChannelKey, marker: ReadMarker) -> Result<(), CacheError> {
        let _guard = self.write_lock.lock();
        let mut file = self.read_file()?;
        let cache_key = key.cache_key();

        let held = file
            .read_timestamps
            .get(&cache_key)
            .and_then(CacheEntry::marker);
        if held.is_some_and(|held| held >= marker) {
            return Ok(());
        }

        file.read_timestamps
            .insert(cache_key, CacheEntry::Marker(CachedMarker::new(key, marker)));
        self.write_file(&file)?;
        debug!(channel = %key, "Read marker cached");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, TimeZone, Utc};
    use tempfile::tempdir;

    use super::*;

    fn marker(secs: i64) -> ReadMarker {
        ReadMarker::at(Utc.with_ymd_and_hms(2025, 3, 1, 12, 0, 0).unwrap() + Duration::seconds(secs))
    }

    #[test]
    fn test_missing_file_is_empty() {
        let dir = tempdir().unwrap();
        let cache = FileReadCache::new(dir.path().join(READ_MARKERS_FILE_NAME));
        assert!(cache.load_all().unwrap().is_empty());
        assert!(cache.get(&ChannelKey::new("c1", "ch1")).unwrap().is_none());
    }

    #[test]
    fn test_store_creates_parent_and_keeps_newest() {
        let dir = tempdir().unwrap();
        let cache = FileReadCache::new(dir.path().join("nested").join(READ_MARKERS_FILE_NAME));
        let key = ChannelKey::new("c1", "ch1");

        cache.store(&key, marker(10)).unwrap();
        cache.store(&key, marker(5)).unwrap();
        assert_eq!(cache.get(&key).unwrap(), Some(marker(10)));

        cache.store(&key, marker(20)).unwrap();
        assert_eq!(cache.get(&key).unwrap(), Some(marker(20)));

        let content = fs::read_to_string(cache.path()).unwrap();
        assert!(content.contains("read_timestamps"));
        assert!(content.contains("c1-ch1"));
        assert!(content.contains("community = \"c1\""));
    }

    #[test]
    fn test_hyphenated_ids_survive_reload() {
        let dir = tempdir().unwrap();
        let path = dir.path().join(READ_MARKERS_FILE_NAME);
        let study = ChannelKey::new("study-group", "general");
        let split = ChannelKey::new("study", "group-general");

        let cache = FileReadCache::new(&path);
        cache.store(&study, marker(1)).unwrap();
        cache.store(&split, marker(2)).unwrap();

        let markers = FileReadCache::new(&path).load_all().unwrap();
        assert_eq!(markers.len(), 2);
        assert_eq!(markers[&study], marker(1));
        assert_eq!(markers[&split], marker(2));
    }

    #[test]
    fn test_malformed_entries_are_skipped() {
        let dir = tempdir().unwrap();
        let path = dir.path().join(READ_MARKERS_FILE_NAME);
        fs::write(
            &path,
            "[read_timestamps]\n\"c1-ch1\" = \"2025-03-01T12:00:00Z\"\n\"c1-ch2\" = \"yesterday\"\nnodash = \"2025-03-01T12:00:00Z\"\n\"a-b-c\" = \"2025-03-01T12:00:00Z\"\n\n[read_timestamps.\"x-y-z\"]\ncommunity = \"x-y\"\nchannel = \"z\"\nread_at = \"2025-03-01T12:00:05Z\"\n",
        )
        .unwrap();

        let markers = FileReadCache::new(path).load_all().unwrap();
        assert_eq!(markers.len(), 2);
        assert_eq!(markers[&ChannelKey::new("c1", "ch1")], marker(0));
        assert_eq!(markers[&ChannelKey::new("x-y", "z")], marker(5));
    }

    #[test]
    fn test_unparseable_file_is_treated_as_empty() {
        let dir = tempdir().unwrap();
        let path = dir.path().join(READ_MARKERS_FILE_NAME);
        fs::write(&path, "read_timestamps = [").unwrap();

        let cache = FileReadCache::new(path);
        assert!(cache.load_all().unwrap().is_empty());

        let key = ChannelKey::new("c1", "ch1");
        cache.store(&key, marker(1)).unwrap();
        assert_eq!(cache.get(&key).unwrap(), Some(marker(1)));
    }
}
