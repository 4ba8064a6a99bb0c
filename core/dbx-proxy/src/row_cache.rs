//! Row Identity Cache
//!
//! Keeps one row handle per id so that two lookups of the same row return the
//! same instance until the cache is cleared. Handles carry no row data: every
//! field access reads through to the store, so a cleared slot never serves
//! stale values. It only stops being the canonical instance.

use crate::config::RowCachePolicy;
use crate::statement::CacheStats;
use ahash::AHashMap;
use lru::LruCache;
use parking_lot::Mutex;
use std::num::NonZeroUsize;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::{trace, warn};

/// Identity anchor of a row handle.
#[derive(Debug, PartialEq, Eq)]
pub struct RowSlot {
    id: i64,
}

impl RowSlot {
    pub fn id(&self) -> i64 {
        self.id
    }
}

enum SlotMap {
    Unbounded(AHashMap<i64, Arc<RowSlot>>),
    /// 용량 초과 시 가장 오래 쓰지 않은 슬롯부터 제거
    Lru(LruCache<i64, Arc<RowSlot>>),
}

impl SlotMap {
    fn get(&mut self, id: i64) -> Option<Arc<RowSlot>> {
        match self {
            SlotMap::Unbounded(map) => map.get(&id).cloned(),
            SlotMap::Lru(cache) => cache.get(&id).cloned(),
        }
    }

    fn insert(&mut self, id: i64, slot: Arc<RowSlot>) {
        match self {
            SlotMap::Unbounded(map) => {
                map.insert(id, slot);
            }
            SlotMap::Lru(cache) => {
                cache.put(id, slot);
            }
        }
    }

    fn remove(&mut self, id: i64) -> bool {
        match self {
            SlotMap::Unbounded(map) => map.remove(&id).is_some(),
            SlotMap::Lru(cache) => cache.pop(&id).is_some(),
        }
    }

    fn len(&self) -> usize {
        match self {
            SlotMap::Unbounded(map) => map.len(),
            SlotMap::Lru(cache) => cache.len(),
        }
    }

    fn clear(&mut self) {
        match self {
            SlotMap::Unbounded(map) => map.clear(),
            SlotMap::Lru(cache) => cache.clear(),
        }
    }
}

/// Per-table identity cache
pub struct RowCache {
    table: String,
    slots: Mutex<SlotMap>,
    hit_count: AtomicU64,
    miss_count: AtomicU64,
}

impl RowCache {
    pub fn new(table: impl Into<String>, policy: &RowCachePolicy) -> Self {
        let table = table.into();
        let slots = match policy {
            RowCachePolicy::Unbounded => SlotMap::Unbounded(AHashMap::new()),
            RowCachePolicy::Lru { capacity } => match NonZeroUsize::new(*capacity) {
                Some(cap) => SlotMap::Lru(LruCache::new(cap)),
                None => {
                    warn!(target: "dbx_proxy", table = %table, "row cache capacity 0, using unbounded cache");
                    SlotMap::Unbounded(AHashMap::new())
                }
            },
        };
        Self {
            table,
            slots: Mutex::new(slots),
            hit_count: AtomicU64::new(0),
            miss_count: AtomicU64::new(0),
        }
    }

    /// Return the cached slot for `id`, creating it on first request.
    pub fn get_or_create(&self, id: i64) -> Arc<RowSlot> {
        let mut slots = self.slots.lock();
        if let Some(slot) = slots.get(id) {
            self.hit_count.fetch_add(1, Ordering::Relaxed);
            return slot;
        }
        trace!(target: "dbx_proxy", table = %self.table, id, "row handle created");
        self.miss_count.fetch_add(1, Ordering::Relaxed);
        let slot = Arc::new(RowSlot { id });
        slots.insert(id, Arc::clone(&slot));
        slot
    }

    /// Cached slot for `id`, without creating one
    pub fn get(&self, id: i64) -> Option<Arc<RowSlot>> {
        self.slots.lock().get(id)
    }

    /// Drop the slot for `id`; returns whether one was cached
    pub fn invalidate(&self, id: i64) -> bool {
        self.slots.lock().remove(id)
    }

    /// Drop every slot. Outstanding handles stay usable but are no longer canonical.
    pub fn clear_all(&self) -> usize {
        let mut slots = self.slots.lock();
        let dropped = slots.len();
        slots.clear();
        dropped
    }

    pub fn len(&self) -> usize {
        self.slots.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats::from_counters(
            self.hit_count.load(Ordering::Relaxed),
            self.miss_count.load(Ordering::Relaxed),
        )
    }
}
