// src/query_cache.rs
//! Query result cache keyed by fingerprint, with a 5-second TTL and a per-collection
//! write-generation counter. A write bumps the collection's generation, which changes
//! every subsequent fingerprint computed against it — stale entries become unreachable
//! without an eager sweep, and are reclaimed lazily as the capacity-triggered sweep in
//! `set` or the expiry check in `get` encounters them.

use crate::query_planner::FindResult;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::time::{Duration, Instant};

const TTL: Duration = Duration::from_secs(5);

struct CacheEntry {
    result: FindResult,
    stored_at: Instant,
}

pub struct QueryCache {
    entries: RwLock<HashMap<String, CacheEntry>>,
    generations: RwLock<HashMap<String, u64>>,
    capacity: usize,
}

impl QueryCache {
    pub fn new(capacity: usize) -> Self {
        QueryCache {
            entries: RwLock::new(HashMap::new()),
            generations: RwLock::new(HashMap::new()),
            capacity,
        }
    }

    /// Current write-generation for `collection` (0 if it has never been written to).
    pub fn generation(&self, collection: &str) -> u64 {
        *self.generations.read().get(collection).unwrap_or(&0)
    }

    /// Bump `collection`'s generation, invalidating every fingerprint computed
    /// against the old value. Called on every insert/update/delete/upsert.
    pub fn invalidate_collection(&self, collection: &str) {
        let mut gens = self.generations.write();
        *gens.entry(collection.to_string()).or_insert(0) += 1;
    }

    pub fn get(&self, fingerprint: &str) -> Option<FindResult> {
        let mut entries = self.entries.write();
        let expired = match entries.get(fingerprint) {
            Some(entry) => entry.stored_at.elapsed() >= TTL,
            None => return None,
        };
        if expired {
            entries.remove(fingerprint);
            return None;
        }
        entries.get(fingerprint).map(|e| e.result.clone())
    }

    pub fn set(&self, fingerprint: String, result: FindResult) {
        let mut entries = self.entries.write();
        if entries.len() >= self.capacity && !entries.contains_key(&fingerprint) {
            self.sweep_expired(&mut entries);
        }
        entries.insert(
            fingerprint,
            CacheEntry {
                result,
                stored_at: Instant::now(),
            },
        );
    }

    fn sweep_expired(&self, entries: &mut HashMap<String, CacheEntry>) {
        entries.retain(|_, entry| entry.stored_at.elapsed() < TTL);
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            capacity: self.capacity,
            size: self.entries.read().len(),
        }
    }

    pub fn clear(&self) {
        self.entries.write().clear();
    }
}

impl Default for QueryCache {
    fn default() -> Self {
        Self::new(1000)
    }
}

#[derive(Debug, Clone)]
pub struct CacheStats {
    pub capacity: usize,
    pub size: usize,
}
