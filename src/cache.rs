//! BoundedAssetCache - byte-budgeted LRU cache for large derived assets.
//!
//! The cache knows nothing about record semantics: entries are keyed by
//! `(record id, asset kind)` and removed either by LRU eviction when a `put`
//! overflows the budget, or by explicit invalidation. Callers that remove
//! records from the store are responsible for invalidating here; there is no
//! automatic linkage.

use std::collections::HashMap;
use std::fmt;

use log::debug;

use crate::record::RecordId;

/// Which derived artifact an asset entry holds.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum AssetKind {
    Audio,
    Transcript,
}

impl AssetKind {
    pub const ALL: [AssetKind; 2] = [AssetKind::Audio, AssetKind::Transcript];
}

impl fmt::Display for AssetKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AssetKind::Audio => f.write_str("audio"),
            AssetKind::Transcript => f.write_str("transcript"),
        }
    }
}

/// Cache key: the owning record plus the asset kind.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct AssetKey {
    pub record: RecordId,
    pub kind: AssetKind,
}

impl AssetKey {
    pub fn new(record: impl Into<RecordId>, kind: AssetKind) -> Self {
        AssetKey {
            record: record.into(),
            kind,
        }
    }
}

impl fmt::Display for AssetKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.record, self.kind)
    }
}

struct AssetCacheEntry {
    bytes: Vec<u8>,
    last_access: u64,
}

/// Size-limited, key-addressed cache with least-recently-used eviction.
///
/// Reads bump recency, so `get` takes `&mut self`; the cache is meant to be
/// owned by the same serialized context as the store. Eviction and
/// invalidation are synchronous.
pub struct BoundedAssetCache {
    entries: HashMap<AssetKey, AssetCacheEntry>,
    total_bytes: usize,
    limit_bytes: usize,
    clock: u64,
}

impl BoundedAssetCache {
    pub const DEFAULT_LIMIT: usize = 64 * 1024 * 1024;

    pub fn new(limit_bytes: usize) -> Self {
        BoundedAssetCache {
            entries: HashMap::new(),
            total_bytes: 0,
            limit_bytes,
            clock: 0,
        }
    }

    pub fn configured_limit(&self) -> usize {
        self.limit_bytes
    }

    pub fn current_size(&self) -> usize {
        self.total_bytes
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Fetch an asset, marking it most recently used.
    pub fn get(&mut self, key: &AssetKey) -> Option<&[u8]> {
        self.clock += 1;
        let clock = self.clock;
        self.entries.get_mut(key).map(|entry| {
            entry.last_access = clock;
            entry.bytes.as_slice()
        })
    }

    /// Insert an asset, then evict least-recently-used entries until the
    /// budget holds. The entry just inserted is exempt from its own eviction
    /// pass, so a single over-budget asset is admitted alone.
    pub fn put(&mut self, key: AssetKey, bytes: Vec<u8>) {
        self.clock += 1;
        let size = bytes.len();
        if let Some(old) = self.entries.insert(
            key.clone(),
            AssetCacheEntry {
                bytes,
                last_access: self.clock,
            },
        ) {
            self.total_bytes -= old.bytes.len();
        }
        self.total_bytes += size;
        self.evict_over_budget(&key);
    }

    /// Remove an entry unconditionally. Returns true if it existed.
    pub fn invalidate(&mut self, key: &AssetKey) -> bool {
        match self.entries.remove(key) {
            Some(entry) => {
                self.total_bytes -= entry.bytes.len();
                debug!("asset cache invalidate {}", key);
                true
            }
            None => false,
        }
    }

    /// Remove every asset kind cached for a record. Returns how many entries
    /// were dropped. This is the hook store deletions must call.
    pub fn invalidate_record(&mut self, record: &RecordId) -> usize {
        AssetKind::ALL
            .iter()
            .filter(|kind| {
                self.invalidate(&AssetKey {
                    record: record.clone(),
                    kind: **kind,
                })
            })
            .count()
    }

    fn evict_over_budget(&mut self, just_inserted: &AssetKey) {
        while self.total_bytes > self.limit_bytes {
            let victim = self
                .entries
                .iter()
                .filter(|(key, _)| *key != just_inserted)
                .min_by_key(|(_, entry)| entry.last_access)
                .map(|(key, _)| key.clone());
            match victim {
                Some(key) => {
                    if let Some(entry) = self.entries.remove(&key) {
                        self.total_bytes -= entry.bytes.len();
                        debug!(
                            "asset cache evict {} ({} bytes, {} of {} in use)",
                            key,
                            entry.bytes.len(),
                            self.total_bytes,
                            self.limit_bytes
                        );
                    }
                }
                // Only the fresh insert remains; admit it even over budget.
                None => break,
            }
        }
    }
}

impl Default for BoundedAssetCache {
    fn default() -> Self {
        Self::new(Self::DEFAULT_LIMIT)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(id: &str, kind: AssetKind) -> AssetKey {
        AssetKey::new(id, kind)
    }

    #[test]
    fn stays_within_budget_after_every_put() {
        let mut cache = BoundedAssetCache::new(100);
        for i in 0..20 {
            cache.put(key(&format!("r{}", i), AssetKind::Audio), vec![0u8; 30]);
            assert!(cache.current_size() <= cache.configured_limit());
        }
    }

    #[test]
    fn evicts_least_recently_used_first() {
        let mut cache = BoundedAssetCache::new(90);
        cache.put(key("a", AssetKind::Audio), vec![0u8; 30]);
        cache.put(key("b", AssetKind::Audio), vec![0u8; 30]);
        cache.put(key("c", AssetKind::Audio), vec![0u8; 30]);

        // Touch "a" so "b" becomes the LRU entry.
        assert!(cache.get(&key("a", AssetKind::Audio)).is_some());
        cache.put(key("d", AssetKind::Audio), vec![0u8; 30]);

        assert!(cache.get(&key("b", AssetKind::Audio)).is_none());
        assert!(cache.get(&key("a", AssetKind::Audio)).is_some());
        assert!(cache.get(&key("c", AssetKind::Audio)).is_some());
        assert!(cache.get(&key("d", AssetKind::Audio)).is_some());
    }

    #[test]
    fn fresh_insert_is_exempt_from_its_own_eviction_pass() {
        let mut cache = BoundedAssetCache::new(50);
        cache.put(key("a", AssetKind::Audio), vec![0u8; 40]);
        cache.put(key("big", AssetKind::Audio), vec![0u8; 200]);

        // "a" was evicted, the oversized fresh insert was admitted alone.
        assert!(cache.get(&key("a", AssetKind::Audio)).is_none());
        assert!(cache.get(&key("big", AssetKind::Audio)).is_some());
        assert_eq!(cache.current_size(), 200);
    }

    #[test]
    fn replacing_a_key_accounts_size_once() {
        let mut cache = BoundedAssetCache::new(100);
        cache.put(key("a", AssetKind::Audio), vec![0u8; 40]);
        cache.put(key("a", AssetKind::Audio), vec![0u8; 10]);
        assert_eq!(cache.current_size(), 10);
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn invalidate_record_drops_every_kind() {
        let mut cache = BoundedAssetCache::new(1000);
        cache.put(key("a", AssetKind::Audio), vec![0u8; 10]);
        cache.put(key("a", AssetKind::Transcript), vec![0u8; 10]);
        cache.put(key("b", AssetKind::Audio), vec![0u8; 10]);

        assert_eq!(cache.invalidate_record(&"a".into()), 2);
        assert!(cache.get(&key("a", AssetKind::Audio)).is_none());
        assert!(cache.get(&key("a", AssetKind::Transcript)).is_none());
        assert!(cache.get(&key("b", AssetKind::Audio)).is_some());
        assert_eq!(cache.current_size(), 10);
    }

    #[test]
    fn invalidate_missing_key_is_false() {
        let mut cache = BoundedAssetCache::new(100);
        assert!(!cache.invalidate(&key("ghost", AssetKind::Audio)));
        assert_eq!(cache.invalidate_record(&"ghost".into()), 0);
    }
}
