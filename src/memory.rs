//! In-memory cache tier with LRU eviction.
//!
//! Process-wide, bounded pool of rendered artifacts. Eviction is automatic
//! under a byte budget and an entry-count budget; callers must not assume an
//! entry stays resident. Lookups never touch disk; losing an entry here
//! costs at worst a disk read or a recompute.

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};

use crate::artifact::Artifact;
use crate::key::CacheKey;

/// Statistics about memory tier usage.
#[derive(Debug, Clone, Copy, Default)]
pub struct MemoryCacheStats {
    /// Number of artifacts currently resident
    pub entry_count: usize,
    /// Total bytes held by resident artifacts
    pub bytes_used: usize,
    /// Byte budget
    pub byte_limit: usize,
    /// Entry-count budget
    pub max_entries: usize,
    /// Number of cache hits
    pub hits: u64,
    /// Number of cache misses
    pub misses: u64,
    /// Number of artifacts evicted under pressure
    pub evictions: u64,
}

impl MemoryCacheStats {
    /// Cache hit rate (0.0 to 1.0).
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }

    /// Byte budget utilization (0.0 to 1.0).
    pub fn utilization(&self) -> f64 {
        if self.byte_limit == 0 {
            0.0
        } else {
            self.bytes_used as f64 / self.byte_limit as f64
        }
    }
}

/// Internal cache state
struct CacheState {
    entries: HashMap<CacheKey, Artifact>,
    /// LRU queue: front = least recently used, back = most recently used
    lru_queue: VecDeque<CacheKey>,
    bytes_used: usize,
    byte_limit: usize,
    max_entries: usize,
    hits: u64,
    misses: u64,
    evictions: u64,
}

impl CacheState {
    fn new(byte_limit: usize, max_entries: usize) -> Self {
        Self {
            entries: HashMap::new(),
            lru_queue: VecDeque::new(),
            bytes_used: 0,
            byte_limit,
            max_entries,
            hits: 0,
            misses: 0,
            evictions: 0,
        }
    }

    /// Mark a key as most recently used.
    fn touch(&mut self, key: &CacheKey) {
        self.lru_queue.retain(|k| k != key);
        self.lru_queue.push_back(key.clone());
    }

    fn remove_entry(&mut self, key: &CacheKey) -> Option<Artifact> {
        let artifact = self.entries.remove(key)?;
        self.bytes_used = self.bytes_used.saturating_sub(artifact.len());
        self.lru_queue.retain(|k| k != key);
        Some(artifact)
    }

    /// Evict the least recently used artifact.
    fn evict_lru(&mut self) -> bool {
        let Some(key) = self.lru_queue.pop_front() else {
            return false;
        };
        if let Some(artifact) = self.entries.remove(&key) {
            self.bytes_used = self.bytes_used.saturating_sub(artifact.len());
            self.evictions += 1;
        }
        true
    }

    /// Evict until an artifact of `incoming_size` fits both budgets.
    fn evict_to_fit(&mut self, incoming_size: usize) {
        while !self.entries.is_empty()
            && (self.bytes_used + incoming_size > self.byte_limit
                || self.entries.len() + 1 > self.max_entries)
        {
            if !self.evict_lru() {
                break;
            }
        }
    }
}

/// Bounded in-memory artifact cache with LRU eviction.
///
/// Thread-safe for concurrent `get`/`insert` from multiple threads. When the
/// byte or entry budget would be exceeded, least recently used artifacts are
/// evicted automatically.
pub struct MemoryCache {
    state: Arc<Mutex<CacheState>>,
}

impl MemoryCache {
    /// Create a cache with the given byte budget and entry-count budget.
    pub fn new(byte_limit: usize, max_entries: usize) -> Self {
        Self {
            state: Arc::new(Mutex::new(CacheState::new(byte_limit, max_entries))),
        }
    }

    /// Retrieve the artifact for `key`, marking it most recently used.
    pub fn get(&self, key: &CacheKey) -> Option<Artifact> {
        let mut state = self.state.lock().unwrap();
        if let Some(artifact) = state.entries.get(key).cloned() {
            state.touch(key);
            state.hits += 1;
            Some(artifact)
        } else {
            state.misses += 1;
            None
        }
    }

    /// Store an artifact under `key`, evicting older entries to make room.
    ///
    /// An artifact that cannot fit the budgets even with an empty cache is
    /// not stored at all.
    pub fn insert(&self, key: CacheKey, artifact: Artifact) {
        let mut state = self.state.lock().unwrap();

        let size = artifact.len();
        if size > state.byte_limit || state.max_entries == 0 {
            return;
        }

        state.remove_entry(&key);
        state.evict_to_fit(size);

        state.bytes_used += size;
        state.entries.insert(key.clone(), artifact);
        state.touch(&key);
    }

    /// Check residency without updating LRU order.
    pub fn contains(&self, key: &CacheKey) -> bool {
        let state = self.state.lock().unwrap();
        state.entries.contains_key(key)
    }

    /// Remove the artifact for `key`, returning it if it was resident.
    pub fn remove(&self, key: &CacheKey) -> Option<Artifact> {
        let mut state = self.state.lock().unwrap();
        state.remove_entry(key)
    }

    /// Remove every resident artifact whose key belongs to `identity`,
    /// regardless of state key.
    pub fn purge_identity(&self, identity: &str) {
        let mut state = self.state.lock().unwrap();
        let doomed: Vec<CacheKey> = state
            .entries
            .keys()
            .filter(|key| key.identity() == identity)
            .cloned()
            .collect();
        for key in &doomed {
            state.remove_entry(key);
        }
    }

    /// Remove all resident artifacts.
    pub fn clear(&self) {
        let mut state = self.state.lock().unwrap();
        state.entries.clear();
        state.lru_queue.clear();
        state.bytes_used = 0;
    }

    /// Number of resident artifacts.
    pub fn len(&self) -> usize {
        let state = self.state.lock().unwrap();
        state.entries.len()
    }

    /// Whether the cache is empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Total bytes held by resident artifacts.
    pub fn bytes_used(&self) -> usize {
        let state = self.state.lock().unwrap();
        state.bytes_used
    }

    /// Current usage statistics.
    pub fn stats(&self) -> MemoryCacheStats {
        let state = self.state.lock().unwrap();
        MemoryCacheStats {
            entry_count: state.entries.len(),
            bytes_used: state.bytes_used,
            byte_limit: state.byte_limit,
            max_entries: state.max_entries,
            hits: state.hits,
            misses: state.misses,
            evictions: state.evictions,
        }
    }

    /// Update the byte budget, evicting if the cache is now over it.
    pub fn set_byte_limit(&self, new_limit: usize) {
        let mut state = self.state.lock().unwrap();
        state.byte_limit = new_limit;
        if state.bytes_used > new_limit {
            state.evict_to_fit(0);
        }
    }

    /// Update the entry-count budget, evicting if the cache is now over it.
    pub fn set_max_entries(&self, new_max: usize) {
        let mut state = self.state.lock().unwrap();
        state.max_entries = new_max;
        while state.entries.len() > new_max {
            if !state.evict_lru() {
                break;
            }
        }
    }
}
