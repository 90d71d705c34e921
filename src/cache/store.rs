//! Tagged cache storage.
//!
//! A bounded LRU map of serialized payloads plus a side index from tag to
//! the keys carrying it. The two structures are kept consistent under the
//! store locks (entries lock is always taken before the index lock).
//! Expired entries are treated as misses and dropped lazily on access.

use std::collections::{HashMap, HashSet};
use std::sync::RwLock;
use std::time::{Duration, Instant};

use bytes::Bytes;
use lru::LruCache;
use metrics::counter;

use super::config::CacheConfig;
use super::lock::{read_or_recover, write_or_recover};
use super::tags::CacheTag;

struct StoredEntry {
    payload: Bytes,
    tags: Vec<CacheTag>,
    expires_at: Instant,
}

/// Tag-indexed, TTL-aware cache store.
pub struct TaggedStore {
    entries: RwLock<LruCache<String, StoredEntry>>,
    tag_index: RwLock<HashMap<CacheTag, HashSet<String>>>,
}

impl TaggedStore {
    pub fn new(config: &CacheConfig) -> Self {
        Self {
            entries: RwLock::new(LruCache::new(config.entry_limit_non_zero())),
            tag_index: RwLock::new(HashMap::new()),
        }
    }

    /// Fetch a live entry. Expired entries are removed and reported as a
    /// miss.
    pub fn get(&self, key: &str) -> Option<Bytes> {
        let mut entries = write_or_recover(&self.entries, "entries");

        let expired = match entries.get(key) {
            Some(entry) if entry.expires_at > Instant::now() => {
                counter!("orgatlas_cache_hit_total").increment(1);
                return Some(entry.payload.clone());
            }
            Some(_) => true,
            None => false,
        };

        if expired {
            if let Some(entry) = entries.pop(key) {
                let mut index = write_or_recover(&self.tag_index, "tag_index");
                unindex(&mut index, key, &entry.tags);
            }
        }

        counter!("orgatlas_cache_miss_total").increment(1);
        None
    }

    /// Store a payload under `key` with its tag set and TTL. Re-inserting an
    /// existing key replaces the entry and its tag registrations. Within one
    /// key, last write wins.
    pub fn insert(&self, key: &str, payload: Bytes, tags: &[CacheTag], ttl: Duration) {
        debug_assert!(!tags.is_empty(), "cache entries must carry at least one tag");

        let entry = StoredEntry {
            payload,
            tags: tags.to_vec(),
            expires_at: Instant::now() + ttl,
        };

        let mut entries = write_or_recover(&self.entries, "entries");
        let mut index = write_or_recover(&self.tag_index, "tag_index");

        if let Some(previous) = entries.peek(key) {
            let stale_tags = previous.tags.clone();
            unindex(&mut index, key, &stale_tags);
        }

        if let Some((evicted_key, evicted)) = entries.push(key.to_string(), entry) {
            // push returns the displaced pair: either the old value for this
            // key or the LRU victim once at capacity.
            if evicted_key != key {
                counter!("orgatlas_cache_evict_total").increment(1);
                unindex(&mut index, &evicted_key, &evicted.tags);
            }
        }

        for tag in tags {
            index
                .entry(tag.clone())
                .or_default()
                .insert(key.to_string());
        }
    }

    /// Purge every entry carrying any of the given tags. Returns the number
    /// of entries removed; purging an already-absent tag is a no-op.
    pub fn invalidate_tags(&self, tags: &[CacheTag]) -> usize {
        let mut entries = write_or_recover(&self.entries, "entries");
        let mut index = write_or_recover(&self.tag_index, "tag_index");

        let mut purged = 0;
        for tag in tags {
            let Some(keys) = index.remove(tag) else {
                continue;
            };
            for key in keys {
                if let Some(entry) = entries.pop(&key) {
                    purged += 1;
                    unindex(&mut index, &key, &entry.tags);
                }
            }
        }

        if purged > 0 {
            counter!("orgatlas_cache_purge_total").increment(purged as u64);
        }
        purged
    }

    /// Drop every entry and tag mapping.
    pub fn clear(&self) -> usize {
        let mut entries = write_or_recover(&self.entries, "entries");
        let mut index = write_or_recover(&self.tag_index, "tag_index");

        let purged = entries.len();
        entries.clear();
        index.clear();

        if purged > 0 {
            counter!("orgatlas_cache_purge_total").increment(purged as u64);
        }
        purged
    }

    pub fn len(&self) -> usize {
        read_or_recover(&self.entries, "entries").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of distinct tags currently indexed.
    pub fn tag_count(&self) -> usize {
        read_or_recover(&self.tag_index, "tag_index").len()
    }
}

fn unindex(index: &mut HashMap<CacheTag, HashSet<String>>, key: &str, tags: &[CacheTag]) {
    for tag in tags {
        if let Some(keys) = index.get_mut(tag) {
            keys.remove(key);
            if keys.is_empty() {
                index.remove(tag);
            }
        }
    }
}
