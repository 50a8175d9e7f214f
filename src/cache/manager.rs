//! Cache manager for persisting API responses to disk
//!
//! Provides a `CacheManager` that stores JSON payloads in files stamped with the
//! time they were cached. Freshness is decided at read time against the
//! configured TTL, so changing the TTL re-interprets existing entries without
//! rewriting them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tempfile::NamedTempFile;
use tracing::{debug, warn};

use super::key::storage_id;
use crate::config::Config;

/// Extension of every cache file; anything else in the directory is ignored
const CACHE_FILE_EXTENSION: &str = "json";

/// A cache entry as read back from disk
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct CacheEntry {
    /// The cached payload
    pub data: Value,
    /// When the payload was written
    pub cached_at: DateTime<Utc>,
}

/// On-disk form of an entry being written
#[derive(Serialize)]
struct StoredEntry<'a> {
    data: &'a Value,
    cached_at: DateTime<Utc>,
}

/// Manages reading and writing cached responses on disk
///
/// Each logical key maps to `<cache_dir>/<storage id>.json`. Writes replace the
/// file atomically, so a concurrent reader sees either the old or the new entry.
/// Concurrent writers for the same key are not coordinated; the last one wins.
#[derive(Debug, Clone)]
pub struct CacheManager {
    /// Directory where cache files are stored
    cache_dir: PathBuf,
    /// Maximum age of a fresh entry
    ttl: Duration,
}

impl CacheManager {
    /// Creates a CacheManager rooted at `cache_dir`
    ///
    /// The directory is created lazily on the first write.
    pub fn new(cache_dir: PathBuf, ttl: Duration) -> Self {
        Self { cache_dir, ttl }
    }

    /// Creates a CacheManager from the cache settings of a `Config`
    pub fn from_config(config: &Config) -> Self {
        Self::new(config.cache_dir.clone(), config.cache_ttl)
    }

    /// Directory holding the cache files
    pub fn cache_dir(&self) -> &Path {
        &self.cache_dir
    }

    /// Configured time-to-live
    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Returns the path to a cache file for the given key
    fn cache_path(&self, key: &str) -> PathBuf {
        self.cache_dir
            .join(format!("{}.{}", storage_id(key), CACHE_FILE_EXTENSION))
    }

    /// Ensures the cache directory exists
    fn ensure_dir(&self) -> io::Result<()> {
        fs::create_dir_all(&self.cache_dir)
    }

    /// Reads a fresh entry from the cache
    ///
    /// Returns `None` if the entry doesn't exist, cannot be parsed, or is older
    /// than the TTL. Corrupt and expired files are deleted before returning.
    pub fn get(&self, key: &str) -> Option<CacheEntry> {
        let path = self.cache_path(key);

        let content = match fs::read_to_string(&path) {
            Ok(content) => content,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return None,
            Err(e) => {
                debug!(key, error = %e, "discarding unreadable cache entry");
                self.discard(&path);
                return None;
            }
        };

        let Some(entry) = parse_entry(&content) else {
            debug!(key, "discarding corrupt cache entry");
            self.discard(&path);
            return None;
        };

        if self.is_expired(&entry, Utc::now()) {
            debug!(key, cached_at = %entry.cached_at, "discarding expired cache entry");
            self.discard(&path);
            return None;
        }

        debug!(key, cached_at = %entry.cached_at, "cache hit");
        Some(entry)
    }

    /// Stores `data` under `key`, replacing any previous entry
    ///
    /// Failures are logged at `warn` and otherwise ignored.
    pub fn set(&self, key: &str, data: &Value) {
        if let Err(e) = self.try_set(key, data) {
            warn!(key, error = %e, "failed to write cache entry");
        }
    }

    fn try_set(&self, key: &str, data: &Value) -> io::Result<()> {
        self.ensure_dir()?;

        let entry = StoredEntry {
            data,
            cached_at: Utc::now(),
        };

        let json = serde_json::to_string_pretty(&entry)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;

        let mut file = NamedTempFile::new_in(&self.cache_dir)?;
        file.write_all(json.as_bytes())?;
        file.persist(self.cache_path(key)).map_err(|e| e.error)?;

        debug!(key, "cache entry written");
        Ok(())
    }

    /// Deletes every cache entry regardless of age
    ///
    /// Returns the number of files deleted. A file that cannot be deleted is
    /// logged and skipped.
    pub fn clear(&self) -> usize {
        let count = self
            .entry_paths()
            .iter()
            .filter(|path| self.discard(path))
            .count();
        debug!(count, "cleared cache");
        count
    }

    /// Deletes expired and unreadable cache entries
    ///
    /// Returns the number of files deleted.
    pub fn clear_expired(&self) -> usize {
        let now = Utc::now();
        let count = self
            .entry_paths()
            .iter()
            .filter(|path| {
                fs::read_to_string(path)
                    .ok()
                    .and_then(|content| parse_entry(&content))
                    .map_or(true, |entry| self.is_expired(&entry, now))
            })
            .filter(|path| self.discard(path))
            .count();
        debug!(count, "cleared expired cache entries");
        count
    }

    /// Storage ids of all entries currently on disk, sorted
    pub fn storage_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self
            .entry_paths()
            .iter()
            .filter_map(|path| path.file_stem())
            .map(|stem| stem.to_string_lossy().into_owned())
            .collect();
        ids.sort();
        ids
    }

    /// Number of entries currently on disk, fresh or not
    pub fn len(&self) -> usize {
        self.entry_paths().len()
    }

    /// Whether the cache directory holds no entries
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Paths of every `*.json` file in the cache directory
    fn entry_paths(&self) -> Vec<PathBuf> {
        let Ok(dir) = fs::read_dir(&self.cache_dir) else {
            return Vec::new();
        };

        dir.filter_map(|entry| entry.ok())
            .map(|entry| entry.path())
            .filter(|path| {
                path.is_file()
                    && path
                        .extension()
                        .is_some_and(|ext| ext == CACHE_FILE_EXTENSION)
            })
            .collect()
    }

    /// An entry is expired once its age exceeds the TTL
    ///
    /// Entries stamped in the future (clock moved backwards) count as fresh.
    fn is_expired(&self, entry: &CacheEntry, now: DateTime<Utc>) -> bool {
        match (now - entry.cached_at).to_std() {
            Ok(age) => age > self.ttl,
            Err(_) => false,
        }
    }

    /// Removes a cache file, returning whether this call deleted it
    fn discard(&self, path: &Path) -> bool {
        match fs::remove_file(path) {
            Ok(()) => true,
            Err(e) if e.kind() == io::ErrorKind::NotFound => false,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "failed to delete cache file");
                false
            }
        }
    }
}

/// Parses a cache file, returning `None` for anything malformed
fn parse_entry(content: &str) -> Option<CacheEntry> {
    serde_json::from_str(content).ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    const TTL_SECS: u64 = 60;

    fn create_test_cache() -> (CacheManager, TempDir) {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let cache = CacheManager::new(
            temp_dir.path().to_path_buf(),
            Duration::from_secs(TTL_SECS),
        );
        (cache, temp_dir)
    }

    /// Writes a cache file by hand with `cached_at` set `age_secs` in the past
    fn write_aged(cache: &CacheManager, key: &str, data: Value, age_secs: i64) {
        let cached_at = Utc::now() - chrono::Duration::seconds(age_secs);
        let content = json!({ "data": data, "cached_at": cached_at.to_rfc3339() });
        write_raw(cache, key, &content.to_string());
    }

    fn write_raw(cache: &CacheManager, key: &str, content: &str) {
        fs::create_dir_all(cache.cache_dir()).expect("Should create cache dir");
        fs::write(cache.cache_path(key), content).expect("Should write cache file");
    }

    #[test]
    fn test_set_creates_file_in_cache_directory() {
        let (cache, temp_dir) = create_test_cache();

        cache.set("weather?q=London", &json!({ "name": "London" }));

        let expected_path = temp_dir.path().join("weather_q=London.json");
        assert!(expected_path.exists(), "Cache file should exist");

        let content = fs::read_to_string(&expected_path).expect("Should read file");
        let raw: Value = serde_json::from_str(&content).expect("Should be valid JSON");
        assert_eq!(raw["data"]["name"], "London");
        assert!(raw["cached_at"].is_string());
    }

    #[test]
    fn test_get_returns_none_for_missing_key() {
        let (cache, _temp_dir) = create_test_cache();
        assert!(cache.get("nonexistent").is_none());
    }

    #[test]
    fn test_get_returns_fresh_entry() {
        let (cache, _temp_dir) = create_test_cache();
        let data = json!({ "temp": 12.5 });

        let before = Utc::now();
        cache.set("fresh", &data);
        let after = Utc::now();

        let entry = cache.get("fresh").expect("Should read fresh entry");
        assert_eq!(entry.data, data);
        assert!(entry.cached_at >= before && entry.cached_at <= after);
    }

    #[test]
    fn test_ttl_boundary() {
        let (cache, _temp_dir) = create_test_cache();

        write_aged(&cache, "inside", json!(1), TTL_SECS as i64 - 5);
        write_aged(&cache, "outside", json!(2), TTL_SECS as i64 + 5);

        assert_eq!(cache.get("inside").map(|e| e.data), Some(json!(1)));
        assert!(cache.get("outside").is_none());
        assert!(
            !cache.cache_path("outside").exists(),
            "Expired entry should be removed on read"
        );
    }

    #[test]
    fn test_repeated_reads_keep_original_timestamp() {
        let (cache, _temp_dir) = create_test_cache();
        write_aged(&cache, "stable", json!({ "v": 1 }), 10);

        let first = cache.get("stable").expect("first read");
        let second = cache.get("stable").expect("second read");
        assert_eq!(first, second);
    }

    #[test]
    fn test_overwrite_replaces_entry() {
        let (cache, _temp_dir) = create_test_cache();

        cache.set("key", &json!("first"));
        cache.set("key", &json!("second"));

        assert_eq!(cache.get("key").map(|e| e.data), Some(json!("second")));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_corrupt_entry_is_removed() {
        let (cache, _temp_dir) = create_test_cache();
        write_raw(&cache, "broken", "{ not json");

        assert!(cache.get("broken").is_none());
        assert!(cache.storage_ids().is_empty(), "Corrupt entry should be gone");
    }

    #[test]
    fn test_entry_without_timestamp_is_invalid() {
        let (cache, _temp_dir) = create_test_cache();
        write_raw(&cache, "no_ts", r#"{"data": {"a": 1}}"#);
        write_raw(&cache, "bad_ts", r#"{"data": {"a": 1}, "cached_at": "yesterday"}"#);

        assert!(cache.get("no_ts").is_none());
        assert!(cache.get("bad_ts").is_none());
        assert!(cache.is_empty());
    }

    #[test]
    fn test_naive_local_timestamp_is_invalid() {
        let (cache, _temp_dir) = create_test_cache();
        write_raw(
            &cache,
            "legacy",
            r#"{"data": 1, "cached_at": "2024-07-15T14:00:00.123456"}"#,
        );

        assert!(cache.get("legacy").is_none());
        assert!(cache.is_empty());
    }

    #[test]
    fn test_future_timestamp_is_fresh() {
        let (cache, _temp_dir) = create_test_cache();
        write_aged(&cache, "skewed", json!(true), -30);

        assert!(cache.get("skewed").is_some());
    }

    #[test]
    fn test_set_creates_directory_if_missing() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let nested_path = temp_dir.path().join("nested").join("cache");
        let cache = CacheManager::new(nested_path.clone(), Duration::from_secs(TTL_SECS));

        cache.set("nested", &json!(1));

        assert!(nested_path.join("nested.json").exists());
    }

    #[test]
    fn test_set_failure_is_swallowed() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let blocker = temp_dir.path().join("blocker");
        fs::write(&blocker, "not a directory").expect("Should write blocker");
        let cache = CacheManager::new(blocker.join("cache"), Duration::from_secs(TTL_SECS));

        cache.set("key", &json!(1));

        assert!(cache.get("key").is_none());
        assert_eq!(cache.clear(), 0);
    }

    #[test]
    fn test_bulk_eviction() {
        let (cache, _temp_dir) = create_test_cache();
        write_aged(&cache, "old_a", json!("a"), 600);
        write_aged(&cache, "old_b", json!("b"), 120);
        write_aged(&cache, "new_c", json!("c"), 1);
        write_aged(&cache, "new_d", json!("d"), 30);
        cache.set("new_e", &json!("e"));

        assert_eq!(cache.clear_expired(), 2);
        assert_eq!(cache.storage_ids(), vec!["new_c", "new_d", "new_e"]);

        assert_eq!(cache.clear(), 3);
        assert!(cache.is_empty());
    }

    #[test]
    fn test_clear_expired_removes_unreadable_entries() {
        let (cache, _temp_dir) = create_test_cache();
        write_raw(&cache, "garbage", "\u{0}\u{1}garbage");
        cache.set("good", &json!(1));

        assert_eq!(cache.clear_expired(), 1);
        assert_eq!(cache.storage_ids(), vec!["good"]);
    }

    #[test]
    fn test_clear_ignores_foreign_files() {
        let (cache, temp_dir) = create_test_cache();
        cache.set("one", &json!(1));
        fs::write(temp_dir.path().join("notes.txt"), "keep me").expect("Should write");

        assert_eq!(cache.clear(), 1);
        assert!(temp_dir.path().join("notes.txt").exists());
    }

    #[test]
    fn test_clear_on_missing_directory() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let cache = CacheManager::new(temp_dir.path().join("absent"), Duration::from_secs(1));

        assert_eq!(cache.clear(), 0);
        assert_eq!(cache.clear_expired(), 0);
    }

    #[test]
    fn test_changing_ttl_reinterprets_existing_entries() {
        let (cache, temp_dir) = create_test_cache();
        write_aged(&cache, "entry", json!(1), 90);

        let longer = CacheManager::new(temp_dir.path().to_path_buf(), Duration::from_secs(120));
        assert!(longer.get("entry").is_some());

        assert!(cache.get("entry").is_none());
    }
}
