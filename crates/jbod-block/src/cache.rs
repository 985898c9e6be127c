//! Block cache for the linear volume
//!
//! A fixed number of slots, each holding one block keyed by
//! `(disk_id, block_id)`. Lookups and inserts scan the slots linearly; the
//! capacity is capped at a few thousand entries, so the scan is cheap next
//! to a network round trip.
//!
//! Recency comes from a logical clock rather than wall time. Every hit,
//! update and insert stamps the entry with the current clock value and then
//! advances the clock. When no slot is free, the entry with the smallest
//! stamp is evicted, ties going to the lowest slot index.

use std::fmt;

use jbod_common::{
    Block, BlockId, DiskId, MAX_CACHE_ENTRIES, MIN_CACHE_ENTRIES, is_valid_block, is_valid_disk,
    zero_block,
};
use tracing::{debug, info};

use crate::error::{BlockError, BlockResult};

/// Cache key uniquely identifies a block across all disks
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CacheKey {
    pub disk_id: DiskId,
    pub block_id: BlockId,
}

impl CacheKey {
    #[must_use]
    pub const fn new(disk_id: DiskId, block_id: BlockId) -> Self {
        Self { disk_id, block_id }
    }

    const fn is_valid(self) -> bool {
        is_valid_disk(self.disk_id) && is_valid_block(self.block_id)
    }
}

/// One cache slot
#[derive(Clone)]
struct CacheEntry {
    valid: bool,
    key: CacheKey,
    data: Block,
    /// Logical clock value of the last access
    last_access: u64,
}

impl CacheEntry {
    const fn empty() -> Self {
        Self {
            valid: false,
            key: CacheKey::new(0, 0),
            data: zero_block(),
            last_access: 0,
        }
    }

    fn matches(&self, key: CacheKey) -> bool {
        self.valid && self.key == key
    }
}

/// Cache statistics
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct CacheStats {
    /// Number of lookups
    pub queries: u64,
    /// Number of lookups that found their block
    pub hits: u64,
    /// Number of valid entries overwritten by insert
    pub evictions: u64,
}

impl CacheStats {
    /// Hit ratio (0.0 to 1.0), or `None` before the first lookup
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn hit_ratio(&self) -> Option<f64> {
        if self.queries == 0 {
            return None;
        }
        Some(self.hits as f64 / self.queries as f64)
    }
}

impl fmt::Display for CacheStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.hit_ratio() {
            Some(ratio) => write!(f, "Hit rate: {:5.1}%", ratio * 100.0),
            None => f.write_str("Hit rate:   n/a (no queries)"),
        }
    }
}

/// LRU block cache with a fixed number of entries
pub struct BlockCache {
    entries: Vec<CacheEntry>,
    /// Logical clock for LRU ordering
    clock: u64,
    stats: CacheStats,
}

impl BlockCache {
    /// Create a cache of `capacity` empty entries
    pub fn new(capacity: usize) -> BlockResult<Self> {
        if !(MIN_CACHE_ENTRIES..=MAX_CACHE_ENTRIES).contains(&capacity) {
            return Err(BlockError::InvalidCapacity(capacity));
        }
        Ok(Self {
            entries: vec![CacheEntry::empty(); capacity],
            clock: 0,
            stats: CacheStats::default(),
        })
    }

    #[must_use]
    pub fn capacity(&self) -> usize {
        self.entries.len()
    }

    /// Number of valid entries
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.iter().filter(|e| e.valid).count()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        !self.entries.iter().any(|e| e.valid)
    }

    #[must_use]
    pub const fn stats(&self) -> &CacheStats {
        &self.stats
    }

    /// Return the current clock value and advance it
    const fn tick(&mut self) -> u64 {
        let now = self.clock;
        self.clock += 1;
        now
    }

    fn position(&self, key: CacheKey) -> Option<usize> {
        self.entries.iter().position(|e| e.matches(key))
    }

    /// Check for a key without counting a query or touching recency
    #[must_use]
    pub fn contains(&self, key: CacheKey) -> bool {
        self.position(key).is_some()
    }

    /// Copy a cached block into `out`; returns false on a miss
    pub fn lookup(&mut self, key: CacheKey, out: &mut Block) -> bool {
        self.stats.queries += 1;
        let Some(index) = self.position(key) else {
            return false;
        };

        self.stats.hits += 1;
        let now = self.tick();
        let entry = &mut self.entries[index];
        out.copy_from_slice(&entry.data);
        entry.last_access = now;
        true
    }

    /// Overwrite a cached block in place; returns false if it is not cached
    ///
    /// Never inserts.
    pub fn update(&mut self, key: CacheKey, data: &Block) -> bool {
        let Some(index) = self.position(key) else {
            return false;
        };

        let now = self.tick();
        let entry = &mut self.entries[index];
        entry.data.copy_from_slice(data);
        entry.last_access = now;
        true
    }

    /// Add a block that is not yet cached
    ///
    /// Fills the first free slot, or evicts the least recently used entry.
    pub fn insert(&mut self, key: CacheKey, data: &Block) -> BlockResult<()> {
        if !key.is_valid() {
            return Err(BlockError::InvalidKey {
                disk_id: key.disk_id,
                block_id: key.block_id,
            });
        }
        if self.contains(key) {
            return Err(BlockError::DuplicateKey {
                disk_id: key.disk_id,
                block_id: key.block_id,
            });
        }

        let index = match self.entries.iter().position(|e| !e.valid) {
            Some(free) => free,
            None => {
                let victim = self.find_lru_entry();
                let evicted = self.entries[victim].key;
                debug!(
                    disk_id = evicted.disk_id,
                    block_id = evicted.block_id,
                    "evicting cached block"
                );
                self.stats.evictions += 1;
                victim
            }
        };

        let now = self.tick();
        let entry = &mut self.entries[index];
        entry.valid = true;
        entry.key = key;
        entry.data.copy_from_slice(data);
        entry.last_access = now;
        Ok(())
    }

    /// Index of the entry with the oldest access, first one on ties
    fn find_lru_entry(&self) -> usize {
        self.entries
            .iter()
            .enumerate()
            .min_by_key(|(_, entry)| entry.last_access)
            .map_or(0, |(index, _)| index)
    }
}

/// Holder for an optional cache with explicit create / destroy
///
/// Without a cache every operation passes through to the remote array.
#[derive(Default)]
pub struct CacheSlot {
    cache: Option<BlockCache>,
}

impl CacheSlot {
    #[must_use]
    pub const fn new() -> Self {
        Self { cache: None }
    }

    /// Create the cache; fails if one already exists or the capacity is out of range
    pub fn create(&mut self, capacity: usize) -> BlockResult<()> {
        if self.cache.is_some() {
            return Err(BlockError::CacheExists);
        }
        self.cache = Some(BlockCache::new(capacity)?);
        info!("Block cache created with {capacity} entries");
        Ok(())
    }

    /// Release the cache; fails if there is none
    pub fn destroy(&mut self) -> BlockResult<()> {
        let cache = self.cache.take().ok_or(BlockError::CacheNotCreated)?;
        info!("Block cache destroyed ({})", cache.stats());
        Ok(())
    }

    #[must_use]
    pub const fn enabled(&self) -> bool {
        self.cache.is_some()
    }

    /// Look up a block; `Ok(false)` is a miss
    pub fn lookup(&mut self, key: CacheKey, out: &mut Block) -> BlockResult<bool> {
        let cache = self.cache.as_mut().ok_or(BlockError::CacheNotCreated)?;
        Ok(cache.lookup(key, out))
    }

    /// Refresh a cached block; silently ignored when absent
    pub fn update(&mut self, key: CacheKey, data: &Block) {
        if let Some(cache) = self.cache.as_mut() {
            cache.update(key, data);
        }
    }

    pub fn insert(&mut self, key: CacheKey, data: &Block) -> BlockResult<()> {
        self.cache
            .as_mut()
            .ok_or(BlockError::CacheNotCreated)?
            .insert(key, data)
    }

    #[must_use]
    pub fn stats(&self) -> Option<CacheStats> {
        self.cache.as_ref().map(|cache| *cache.stats())
    }

    #[must_use]
    pub const fn get(&self) -> Option<&BlockCache> {
        self.cache.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use jbod_common::{BLOCKS_PER_DISK, NUM_DISKS};

    fn block(fill: u8) -> Block {
        [fill; jbod_common::BLOCK_SIZE]
    }

    fn key(block_id: BlockId) -> CacheKey {
        CacheKey::new(0, block_id)
    }

    #[test]
    fn test_capacity_bounds() {
        assert!(matches!(BlockCache::new(0), Err(BlockError::InvalidCapacity(0))));
        assert!(BlockCache::new(1).is_err());
        assert!(BlockCache::new(MAX_CACHE_ENTRIES + 1).is_err());

        let cache = BlockCache::new(2).unwrap();
        assert_eq!(cache.capacity(), 2);
        assert!(cache.is_empty());

        let cache = BlockCache::new(MAX_CACHE_ENTRIES).unwrap();
        assert_eq!(cache.len(), 0);
    }

    #[test]
    fn test_slot_create_destroy() {
        let mut slot = CacheSlot::new();
        assert!(!slot.enabled());
        assert!(matches!(slot.destroy(), Err(BlockError::CacheNotCreated)));
        assert!(slot.create(1).is_err());
        assert!(!slot.enabled());

        slot.create(8).unwrap();
        assert!(slot.enabled());
        assert!(matches!(slot.create(8), Err(BlockError::CacheExists)));

        slot.destroy().unwrap();
        assert!(!slot.enabled());
        slot.create(8).unwrap();
    }

    #[test]
    fn test_slot_without_cache() {
        let mut slot = CacheSlot::new();
        let mut out = block(0);
        assert!(matches!(
            slot.lookup(key(1), &mut out),
            Err(BlockError::CacheNotCreated)
        ));
        assert!(matches!(
            slot.insert(key(1), &block(1)),
            Err(BlockError::CacheNotCreated)
        ));
        slot.update(key(1), &block(1));
        assert!(slot.stats().is_none());
    }

    #[test]
    fn test_insert_and_lookup() {
        let mut cache = BlockCache::new(4).unwrap();
        cache.insert(CacheKey::new(3, 42), &block(0xAA)).unwrap();

        let mut out = block(0);
        assert!(cache.lookup(CacheKey::new(3, 42), &mut out));
        assert_eq!(out, block(0xAA));
        assert_eq!(cache.stats().hits, 1);
        assert_eq!(cache.stats().queries, 1);
    }

    #[test]
    fn test_miss_counts_query_only() {
        let mut cache = BlockCache::new(4).unwrap();
        let mut out = block(7);
        assert!(!cache.lookup(key(9), &mut out));
        assert_eq!(out, block(7));
        assert_eq!(cache.stats().queries, 1);
        assert_eq!(cache.stats().hits, 0);
    }

    #[test]
    fn test_duplicate_insert_keeps_original() {
        let mut cache = BlockCache::new(4).unwrap();
        cache.insert(key(1), &block(1)).unwrap();
        assert!(matches!(
            cache.insert(key(1), &block(2)),
            Err(BlockError::DuplicateKey { .. })
        ));

        let mut out = block(0);
        assert!(cache.lookup(key(1), &mut out));
        assert_eq!(out, block(1));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_insert_rejects_out_of_range_ids() {
        let mut cache = BlockCache::new(4).unwrap();
        assert!(matches!(
            cache.insert(CacheKey::new(NUM_DISKS, 0), &block(1)),
            Err(BlockError::InvalidKey { .. })
        ));
        assert!(cache.insert(CacheKey::new(0, BLOCKS_PER_DISK), &block(1)).is_err());
        assert!(cache.is_empty());
    }

    #[test]
    fn test_fills_free_slots_in_order() {
        let mut cache = BlockCache::new(3).unwrap();
        for id in 0..3 {
            cache.insert(key(id), &block(id as u8)).unwrap();
        }
        assert_eq!(cache.len(), 3);
        assert_eq!(cache.stats().evictions, 0);
        let keys: Vec<_> = cache.entries.iter().map(|e| e.key).collect();
        assert_eq!(keys, vec![key(0), key(1), key(2)]);
    }

    #[test]
    fn test_lru_eviction() {
        let mut cache = BlockCache::new(4).unwrap();
        for id in 0..4 {
            cache.insert(key(id), &block(id as u8)).unwrap();
        }

        // Key 0 has the oldest stamp.
        cache.insert(key(10), &block(10)).unwrap();
        assert_eq!(cache.stats().evictions, 1);

        let mut out = block(0);
        assert!(!cache.lookup(key(0), &mut out));
        for id in [1, 2, 3, 10] {
            assert!(cache.lookup(key(id), &mut out), "key {id} should hit");
            assert_eq!(out, block(id as u8));
        }
        // The evicted slot is reused in place.
        assert_eq!(cache.entries[0].key, key(10));
    }

    #[test]
    fn test_lookup_refreshes_recency() {
        let mut cache = BlockCache::new(2).unwrap();
        cache.insert(key(1), &block(1)).unwrap();
        cache.insert(key(2), &block(2)).unwrap();

        let mut out = block(0);
        assert!(cache.lookup(key(1), &mut out));

        // Key 2 is now the least recently used.
        cache.insert(key(3), &block(3)).unwrap();
        assert!(cache.contains(key(1)));
        assert!(!cache.contains(key(2)));
        assert!(cache.contains(key(3)));
    }

    #[test]
    fn test_update_refreshes_recency() {
        let mut cache = BlockCache::new(2).unwrap();
        cache.insert(key(1), &block(1)).unwrap();
        cache.insert(key(2), &block(2)).unwrap();

        assert!(cache.update(key(1), &block(0x11)));
        cache.insert(key(3), &block(3)).unwrap();

        assert!(!cache.contains(key(2)));
        let mut out = block(0);
        assert!(cache.lookup(key(1), &mut out));
        assert_eq!(out, block(0x11));
    }

    #[test]
    fn test_update_never_inserts() {
        let mut cache = BlockCache::new(2).unwrap();
        assert!(!cache.update(key(5), &block(5)));
        assert!(cache.is_empty());
        assert_eq!(cache.stats().queries, 0);
    }

    #[test]
    fn test_hit_ratio() {
        let mut cache = BlockCache::new(4).unwrap();
        assert_eq!(cache.stats().hit_ratio(), None);
        assert_eq!(cache.stats().to_string(), "Hit rate:   n/a (no queries)");

        cache.insert(key(1), &block(1)).unwrap();
        let mut out = block(0);
        cache.lookup(key(1), &mut out);
        cache.lookup(key(1), &mut out);
        cache.lookup(key(2), &mut out);
        cache.lookup(key(3), &mut out);

        let ratio = cache.stats().hit_ratio().unwrap();
        assert!((ratio - 0.5).abs() < f64::EPSILON);
        assert_eq!(cache.stats().to_string(), "Hit rate:  50.0%");
    }
}
