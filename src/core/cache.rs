//! Two-tier cache for raw FACEIT payloads
//!
//! - L1: in-memory LRU for payloads touched in this run
//! - L2: JSON files under the cache directory, so re-running an ingest does
//!   not refetch matches that have already been downloaded
//!
//! Disk failures are never fatal: a payload that cannot be read from or
//! written to disk is simply fetched again next time.

use lru::LruCache;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::{
    fs,
    hash::Hash,
    io::{Read, Write},
    num::NonZeroUsize,
    path::{Path, PathBuf},
    sync::{Mutex, MutexGuard, PoisonError},
};

use crate::cli::types::MatchId;
use crate::pipeline::PayloadKind;

/// Default in-memory capacity of the payload cache.
pub const DEFAULT_MEMORY_CAPACITY: usize = 256;

/// `<cache dir>/faceit-ow`, falling back to `~/.cache/faceit-ow`.
pub fn default_cache_dir() -> PathBuf {
    let base = dirs::cache_dir().unwrap_or_else(|| {
        let mut home = dirs::home_dir().unwrap_or_else(|| PathBuf::from("."));
        home.push(".cache");
        home
    });
    base.join("faceit-ow")
}

/// Try to read a file into a String
pub fn try_read_to_string(path: &Path) -> Option<String> {
    let mut f = fs::File::open(path).ok()?;
    let mut s = String::new();

    f.read_to_string(&mut s).ok()?;

    Some(s)
}

/// Write a string to file, creating parent directories
pub fn write_string(path: &Path, contents: &str) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }

    let mut f = fs::File::create(path)?;
    f.write_all(contents.as_bytes())
}

/// Key usable for both memory and disk caching
pub trait CacheKey: Hash + Eq + Clone + Send + Sync {
    /// File-system safe name for this entry, without extension
    fn to_file_key(&self) -> String;
}

/// One raw payload of one match.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PayloadCacheKey {
    pub match_id: MatchId,
    pub kind: PayloadKind,
}

impl PayloadCacheKey {
    pub fn details(match_id: &MatchId) -> Self {
        Self {
            match_id: match_id.clone(),
            kind: PayloadKind::Details,
        }
    }

    pub fn stats(match_id: &MatchId) -> Self {
        Self {
            match_id: match_id.clone(),
            kind: PayloadKind::Stats,
        }
    }
}

impl CacheKey for PayloadCacheKey {
    fn to_file_key(&self) -> String {
        let safe_id: String = self
            .match_id
            .as_str()
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() || c == '-' { c } else { '_' })
            .collect();
        format!("match_{}_{}", self.kind, safe_id)
    }
}

/// LRU memory cache backed by JSON files in `root`
pub struct UnifiedCache<K, V>
where
    K: CacheKey,
    V: Clone + Serialize + for<'de> Deserialize<'de>,
{
    memory_cache: Mutex<LruCache<K, V>>,
    memory_capacity: usize,
    root: PathBuf,
}

impl<K, V> UnifiedCache<K, V>
where
    K: CacheKey,
    V: Clone + Serialize + for<'de> Deserialize<'de>,
{
    /// Create a cache holding up to `memory_capacity` entries in memory
    pub fn new(root: impl Into<PathBuf>, memory_capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(memory_capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            memory_cache: Mutex::new(LruCache::new(capacity)),
            memory_capacity: capacity.get(),
            root: root.into(),
        }
    }

    fn memory(&self) -> MutexGuard<'_, LruCache<K, V>> {
        // A panic while holding the lock cannot leave the LRU half-updated.
        self.memory_cache
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    fn file_path(&self, key: &K) -> PathBuf {
        self.root.join(format!("{}.json", key.to_file_key()))
    }

    /// Get an item from cache (checks memory first, then disk)
    pub fn get(&self, key: &K) -> Option<V> {
        if let Some(value) = self.memory().get(key) {
            return Some(value.clone());
        }

        let value = self.get_from_disk(key)?;
        // Promote to memory cache
        self.memory().put(key.clone(), value.clone());
        Some(value)
    }

    /// Put an item into cache (stores in both memory and disk)
    pub fn put(&self, key: K, value: V) {
        if let Err(err) = self.put_to_disk(&key, &value) {
            tracing::debug!(file_key = %key.to_file_key(), error = %err, "cache write failed");
        }
        self.memory().put(key, value);
    }

    fn get_from_disk(&self, key: &K) -> Option<V> {
        let content = try_read_to_string(&self.file_path(key))?;
        serde_json::from_str(&content).ok()
    }

    fn put_to_disk(&self, key: &K, value: &V) -> std::io::Result<()> {
        let content = serde_json::to_string(value)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
        write_string(&self.file_path(key), &content)
    }

    /// Clear memory cache only (keeps disk cache)
    pub fn clear_memory(&self) {
        self.memory().clear();
    }

    /// (entries in memory, memory capacity)
    pub fn memory_stats(&self) -> (usize, usize) {
        (self.memory().len(), self.memory_capacity)
    }
}

/// Cache of raw match details and stats payloads.
pub type PayloadCache = UnifiedCache<PayloadCacheKey, Value>;

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::tempdir;

    #[test]
    fn test_default_cache_dir() {
        assert!(default_cache_dir().ends_with("faceit-ow"));
    }

    #[test]
    fn test_try_read_to_string_nonexistent_file() {
        let dir = tempdir().unwrap();
        assert_eq!(try_read_to_string(&dir.path().join("missing.json")), None);
    }

    #[test]
    fn test_write_string_creates_parent_dirs() {
        let dir = tempdir().unwrap();
        let file_path = dir.path().join("subdir").join("output.txt");

        write_string(&file_path, "test content").unwrap();

        assert_eq!(fs::read_to_string(&file_path).unwrap(), "test content");
    }

    #[test]
    fn test_payload_key_is_file_safe() {
        let key = PayloadCacheKey::stats(&MatchId::new("1-abc/../x"));
        assert_eq!(key.to_file_key(), "match_stats_1-abc____x");
        assert_eq!(
            PayloadCacheKey::details(&MatchId::new("1-abc")).to_file_key(),
            "match_details_1-abc"
        );
    }

    #[test]
    fn test_memory_eviction() {
        let dir = tempdir().unwrap();
        let cache: PayloadCache = UnifiedCache::new(dir.path(), 2);

        for id in ["a", "b", "c"] {
            cache.put(PayloadCacheKey::details(&MatchId::new(id)), json!({"match_id": id}));
        }

        assert_eq!(cache.memory_stats(), (2, 2));
    }

    #[test]
    fn test_disk_tier_survives_memory_clear() {
        let dir = tempdir().unwrap();
        let cache: PayloadCache = UnifiedCache::new(dir.path(), 4);
        let key = PayloadCacheKey::stats(&MatchId::new("m1"));
        let payload = json!({"rounds": []});

        cache.put(key.clone(), payload.clone());
        cache.clear_memory();
        assert_eq!(cache.memory_stats().0, 0);

        assert_eq!(cache.get(&key), Some(payload));
        // Promoted back into memory.
        assert_eq!(cache.memory_stats().0, 1);
    }

    #[test]
    fn test_zero_capacity_is_clamped() {
        let dir = tempdir().unwrap();
        let cache: PayloadCache = UnifiedCache::new(dir.path(), 0);
        assert_eq!(cache.memory_stats(), (0, 1));
    }
}
