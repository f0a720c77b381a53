//! Render gate: tier orchestration and the single-production guarantee.
//!
//! [`RenderGate`] decides, for a given key, whether a render has to run at
//! all (memory first, then disk) and ensures that at most one production
//! per key is in flight across all threads. Concurrent callers for the same
//! key block on the in-flight render and reuse its artifact instead of
//! re-rendering.
//!
//! The gate is synchronous and blocking; it is safe to call from any worker
//! thread. Disk failures degrade to "recompute" rather than failing the
//! request, so a broken disk tier costs performance, never correctness.

use std::collections::HashMap;
use std::sync::{Arc, Condvar, Mutex};

use tracing::{debug, warn};

use crate::artifact::Artifact;
use crate::config::CacheConfig;
use crate::disk::DiskStore;
use crate::error::{CacheError, ProduceError};
use crate::key::CacheKey;
use crate::memory::MemoryCache;

/// Outcome of an [`ensure_cached`](RenderGate::ensure_cached) call.
#[derive(Debug, Clone)]
pub struct RenderOutcome {
    /// The artifact, from a cache tier or fresh production.
    pub artifact: Artifact,
    /// Whether the producer ran for this call. `false` means a cached or
    /// in-flight result was reused and no redraw happened.
    pub produced: bool,
}

/// Per-key production slot. Exists only while a render is outstanding.
struct Flight {
    state: Mutex<FlightState>,
    cond: Condvar,
}

enum FlightState {
    Running,
    /// `None` means the production failed; waiters retry on their own.
    Done(Option<Artifact>),
}

impl Flight {
    fn new() -> Self {
        Self {
            state: Mutex::new(FlightState::Running),
            cond: Condvar::new(),
        }
    }

    fn publish(&self, result: Option<Artifact>) {
        let mut state = self.state.lock().unwrap();
        *state = FlightState::Done(result);
        self.cond.notify_all();
    }

    fn wait(&self) -> Option<Artifact> {
        let mut state = self.state.lock().unwrap();
        loop {
            match &*state {
                FlightState::Running => state = self.cond.wait(state).unwrap(),
                FlightState::Done(result) => return result.clone(),
            }
        }
    }
}

/// Orchestration point for the two cache tiers.
///
/// Holds the memory tier, the disk store, and the per-key in-flight table.
/// All shared state is explicit: embedders that want several gates to share
/// one memory pool construct it themselves and pass it to
/// [`with_parts`](RenderGate::with_parts).
pub struct RenderGate {
    memory: Arc<MemoryCache>,
    disk: DiskStore,
    in_flight: Mutex<HashMap<CacheKey, Arc<Flight>>>,
    debug_logging: bool,
}

impl RenderGate {
    /// Build a gate, its memory tier and its disk store from `config`.
    ///
    /// # Errors
    /// Fails if the disk root cannot be created.
    pub fn new(config: &CacheConfig) -> Result<Self, CacheError> {
        let memory = Arc::new(MemoryCache::new(config.memory_budget, config.max_entries));
        let disk = DiskStore::open(&config.cache_dir)?;
        Ok(Self::with_parts(memory, disk, config))
    }

    /// Build a gate around an existing (possibly shared) memory tier and
    /// disk store.
    pub fn with_parts(memory: Arc<MemoryCache>, disk: DiskStore, config: &CacheConfig) -> Self {
        Self {
            memory,
            disk,
            in_flight: Mutex::new(HashMap::new()),
            debug_logging: config.debug_logging,
        }
    }

    /// The gate's memory tier.
    pub fn memory(&self) -> &Arc<MemoryCache> {
        &self.memory
    }

    /// The gate's disk store.
    pub fn disk(&self) -> &DiskStore {
        &self.disk
    }

    /// Return the artifact for `key`, producing it at most once.
    ///
    /// With `key = None` caching is disabled for this call: the producer
    /// runs unconditionally and neither tier is touched. Otherwise the
    /// memory tier is checked first, then the disk tier (populating memory
    /// on a disk hit), and only on a full miss does the producer run,
    /// guarded so that concurrent callers for the same key share a single
    /// production.
    ///
    /// On success the artifact is written to disk before it is advertised in
    /// memory. A failed production caches nothing; the key is immediately
    /// eligible for another attempt.
    ///
    /// # Errors
    /// [`CacheError::Produce`] if the producer fails. Disk errors on the
    /// lookup and store paths are logged and degraded to recompute /
    /// not-cached instead of failing the call.
    pub fn ensure_cached<P>(
        &self,
        key: Option<CacheKey>,
        producer: P,
    ) -> Result<RenderOutcome, CacheError>
    where
        P: FnOnce() -> Result<Artifact, ProduceError>,
    {
        let Some(key) = key else {
            // Caching disabled for this call; never touch either tier.
            let artifact = producer().map_err(CacheError::Produce)?;
            return Ok(RenderOutcome {
                artifact,
                produced: true,
            });
        };

        loop {
            if let Some(artifact) = self.memory.get(&key) {
                if self.debug_logging {
                    debug!(%key, "memory hit");
                }
                return Ok(RenderOutcome {
                    artifact,
                    produced: false,
                });
            }

            match self.disk.load(&key) {
                Ok(Some(artifact)) => {
                    self.memory.insert(key.clone(), artifact.clone());
                    if self.debug_logging {
                        debug!(%key, "disk hit");
                    }
                    return Ok(RenderOutcome {
                        artifact,
                        produced: false,
                    });
                }
                Ok(None) => {}
                // Unreadable entries count as never cached; the next
                // successful production overwrites them.
                Err(e) => warn!(%key, error = %e, "disk read failed, falling back to render"),
            }

            let (flight, is_leader) = {
                let mut table = self.in_flight.lock().unwrap();
                match table.get(&key) {
                    Some(flight) => (Arc::clone(flight), false),
                    None => {
                        let flight = Arc::new(Flight::new());
                        table.insert(key.clone(), Arc::clone(&flight));
                        (flight, true)
                    }
                }
            };

            if !is_leader {
                match flight.wait() {
                    Some(artifact) => {
                        if self.debug_logging {
                            debug!(%key, "reused in-flight render");
                        }
                        return Ok(RenderOutcome {
                            artifact,
                            produced: false,
                        });
                    }
                    // The leader failed; retry from the top with our own
                    // producer.
                    None => continue,
                }
            }

            // We hold the production slot. A previous leader may have
            // published between our tier checks and taking the slot, so
            // re-check memory before rendering.
            if let Some(artifact) = self.memory.get(&key) {
                flight.publish(Some(artifact.clone()));
                self.in_flight.lock().unwrap().remove(&key);
                return Ok(RenderOutcome {
                    artifact,
                    produced: false,
                });
            }

            let outcome = match producer() {
                Ok(artifact) => {
                    // Disk first: durability before the result is
                    // advertised in memory.
                    match self.disk.store(&key, &artifact) {
                        Ok(()) => self.memory.insert(key.clone(), artifact.clone()),
                        Err(e) => warn!(%key, error = %e, "disk store failed, result not cached"),
                    }
                    if self.debug_logging {
                        debug!(%key, bytes = artifact.len(), "rendered and cached");
                    }
                    flight.publish(Some(artifact.clone()));
                    Ok(RenderOutcome {
                        artifact,
                        produced: true,
                    })
                }
                Err(e) => {
                    flight.publish(None);
                    Err(CacheError::Produce(e))
                }
            };
            self.in_flight.lock().unwrap().remove(&key);
            return outcome;
        }
    }

    /// Remove every cached artifact for `identity`, across all state keys,
    /// from both tiers.
    pub fn purge_cache_for(&self, identity: &str) -> Result<(), CacheError> {
        self.disk.purge(identity)?;
        self.memory.purge_identity(identity);
        Ok(())
    }

    /// Current disk usage for `identity`, in bytes.
    pub fn disk_usage_for(&self, identity: &str) -> Result<u64, CacheError> {
        self.disk.size_of(identity)
    }
}
