use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard};

use chrono::Duration;
use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;
use tracing::{debug, warn};

use super::entry::{CacheEntry, DEFAULT_TTL_MINUTES};
use super::single_flight::{wait_for_outcome, FlightLease, FlightOutcome, FlightRegistry, Role};
use super::storage::{MemoryStore, PersistentStore};
use crate::clock::{Clock, SystemClock};

/// Namespace prefix for every key this cache writes to the persistent tier.
pub const PERSISTENT_PREFIX: &str = "tasktide_cache_";

/// How long a follower waits on an in-flight operation before running it itself.
const IN_FLIGHT_TIMEOUT_SECS: u64 = 30;

/// Entry counts per tier, for display only.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CacheStats {
    pub memory_entries: usize,
    pub persistent_entries: usize,
    pub in_flight: usize,
}

/// What a `clear_expired` sweep removed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SweepReport {
    pub memory_removed: usize,
    pub persistent_removed: usize,
    pub corrupted_removed: usize,
}

impl SweepReport {
    pub fn total(&self) -> usize {
        self.memory_removed + self.persistent_removed + self.corrupted_removed
    }
}

/// Two-tier cache: a fast in-memory map mirrored to a persistent store.
///
/// Nothing here ever fails because of the cache itself. Storage faults and
/// corrupted entries are logged and treated as a miss.
pub struct CacheManager {
    memory: Mutex<HashMap<String, CacheEntry<Value>>>,
    persistent: Arc<dyn PersistentStore>,
    clock: Arc<dyn Clock>,
    flights: FlightRegistry,
    in_flight_timeout: std::time::Duration,
}

impl CacheManager {
    pub fn new(persistent: Arc<dyn PersistentStore>) -> Self {
        Self::with_clock(persistent, Arc::new(SystemClock))
    }

    pub fn with_clock(persistent: Arc<dyn PersistentStore>, clock: Arc<dyn Clock>) -> Self {
        Self {
            memory: Mutex::new(HashMap::new()),
            persistent,
            clock,
            flights: FlightRegistry::default(),
            in_flight_timeout: std::time::Duration::from_secs(IN_FLIGHT_TIMEOUT_SECS),
        }
    }

    /// A cache whose persistent tier lives only as long as the process.
    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemoryStore::new()))
    }

    pub fn with_in_flight_timeout(mut self, timeout: std::time::Duration) -> Self {
        self.in_flight_timeout = timeout;
        self
    }

    pub fn clock(&self) -> &Arc<dyn Clock> {
        &self.clock
    }

    fn memory(&self) -> MutexGuard<'_, HashMap<String, CacheEntry<Value>>> {
        self.memory.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn persistent_key(key: &str) -> String {
        format!("{}{}", PERSISTENT_PREFIX, key)
    }

    // ===== Basic operations =====

    /// Store `value` under `key` for `ttl` (default 5 minutes).
    ///
    /// A persistent-tier failure leaves the entry memory-only.
    pub fn set<T: Serialize>(&self, key: &str, value: &T, ttl: Option<Duration>) {
        let data = match serde_json::to_value(value) {
            Ok(v) => v,
            Err(e) => {
                warn!(key, error = %e, "Failed to serialize cache value, not caching");
                return;
            }
        };
        self.set_value(key, data, ttl);
    }

    fn set_value(&self, key: &str, data: Value, ttl: Option<Duration>) {
        let ttl = ttl.unwrap_or_else(|| Duration::minutes(DEFAULT_TTL_MINUTES));
        let entry = CacheEntry::new(data, self.clock.now_millis(), ttl);

        match serde_json::to_string(&entry) {
            Ok(json) => {
                if let Err(e) = self.persistent.write(&Self::persistent_key(key), &json) {
                    warn!(key, error = %e, "Persistent cache write failed, keeping entry in memory only");
                    // An older persisted value must not outlive this one
                    self.remove_persistent(key);
                }
            }
            Err(e) => {
                warn!(key, error = %e, "Failed to encode cache entry for persistent tier");
            }
        }

        self.memory().insert(key.to_string(), entry);
        debug!(key, ttl_ms = ttl.num_milliseconds(), "Cache set");
    }

    /// Fetch `key`. Missing, expired, corrupted and mistyped entries are all `None`.
    pub fn get<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let entry = self.get_entry(key)?;
        match serde_json::from_value(entry.data) {
            Ok(v) => Some(v),
            Err(e) => {
                warn!(key, error = %e, "Cached value has unexpected shape, treating as miss");
                None
            }
        }
    }

    /// Fetch the raw entry, rehydrating the memory tier from the persistent one.
    pub fn get_entry(&self, key: &str) -> Option<CacheEntry<Value>> {
        let now = self.clock.now_millis();

        {
            let mut memory = self.memory();
            if let Some(entry) = memory.get(key) {
                if !entry.is_expired(now) {
                    debug!(key, "Cache hit (memory)");
                    return Some(entry.clone());
                }
                memory.remove(key);
                drop(memory);
                debug!(key, "Cache entry expired");
                self.remove_persistent(key);
                return None;
            }
        }

        let pkey = Self::persistent_key(key);
        let raw = match self.persistent.read(&pkey) {
            Ok(Some(raw)) => raw,
            Ok(None) => {
                debug!(key, "Cache miss");
                return None;
            }
            Err(e) => {
                warn!(key, error = %e, "Persistent cache read failed, treating as miss");
                return None;
            }
        };

        let entry: CacheEntry<Value> = match serde_json::from_str(&raw) {
            Ok(entry) => entry,
            Err(e) => {
                warn!(key, error = %e, "Corrupted persistent cache entry, removing");
                self.remove_persistent(key);
                return None;
            }
        };

        if entry.is_expired(now) {
            debug!(key, "Persistent cache entry expired");
            self.remove_persistent(key);
            return None;
        }

        debug!(key, "Cache hit (persistent), rehydrating memory tier");
        self.memory().insert(key.to_string(), entry.clone());
        Some(entry)
    }

    /// Remove `key` from both tiers. Removing a missing key is a no-op.
    pub fn delete(&self, key: &str) {
        self.memory().remove(key);
        self.remove_persistent(key);
    }

    fn remove_persistent(&self, key: &str) {
        if let Err(e) = self.persistent.remove(&Self::persistent_key(key)) {
            warn!(key, error = %e, "Failed to remove persistent cache entry");
        }
    }

    /// Delete every key that starts with `prefix`. Returns how many were removed.
    pub fn invalidate_prefix(&self, prefix: &str) -> usize {
        let mut keys: Vec<String> = self
            .memory()
            .keys()
            .filter(|k| k.starts_with(prefix))
            .cloned()
            .collect();
        for key in self.persistent_keys() {
            if key.starts_with(prefix) && !keys.contains(&key) {
                keys.push(key);
            }
        }
        for key in &keys {
            self.delete(key);
        }
        debug!(prefix, count = keys.len(), "Cache prefix invalidated");
        keys.len()
    }

    /// Remove every entry in this cache's namespace from both tiers.
    pub fn clear(&self) {
        self.memory().clear();
        for key in self.persistent_keys() {
            self.remove_persistent(&key);
        }
        debug!("Cache cleared");
    }

    /// Unprefixed keys currently in the persistent tier.
    fn persistent_keys(&self) -> Vec<String> {
        match self.persistent.keys() {
            Ok(keys) => keys
                .into_iter()
                .filter_map(|k| k.strip_prefix(PERSISTENT_PREFIX).map(str::to_string))
                .collect(),
            Err(e) => {
                warn!(error = %e, "Failed to list persistent cache keys");
                Vec::new()
            }
        }
    }

    /// Sweep both tiers, dropping expired and unreadable entries.
    pub fn clear_expired(&self) -> SweepReport {
        let now = self.clock.now_millis();
        let mut report = SweepReport::default();

        {
            let mut memory = self.memory();
            let before = memory.len();
            memory.retain(|_, entry| !entry.is_expired(now));
            report.memory_removed = before - memory.len();
        }

        for key in self.persistent_keys() {
            let pkey = Self::persistent_key(&key);
            let raw = match self.persistent.read(&pkey) {
                Ok(Some(raw)) => raw,
                Ok(None) => continue,
                Err(e) => {
                    warn!(key, error = %e, "Failed to read persistent cache entry during sweep");
                    continue;
                }
            };
            match serde_json::from_str::<CacheEntry<Value>>(&raw) {
                Ok(entry) if entry.is_expired(now) => {
                    self.remove_persistent(&key);
                    report.persistent_removed += 1;
                }
                Ok(_) => {}
                Err(e) => {
                    warn!(key, error = %e, "Removing corrupted persistent cache entry");
                    self.remove_persistent(&key);
                    report.corrupted_removed += 1;
                }
            }
        }

        if report.total() > 0 {
            debug!(
                memory = report.memory_removed,
                persistent = report.persistent_removed,
                corrupted = report.corrupted_removed,
                "Expired cache entries swept"
            );
        }
        report
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            memory_entries: self.memory().len(),
            persistent_entries: self.persistent_keys().len(),
            in_flight: self.flights.len(),
        }
    }

    // ===== Single-flight =====

    /// Return the cached value for `key`, or run `op` to produce and cache it.
    ///
    /// Concurrent callers for the same key share one run of `op`. If that run
    /// fails, waiting callers retry themselves, so each caller only ever sees
    /// an error from its own invocation. A caller that waits longer than the
    /// in-flight timeout gives up waiting and runs `op` directly.
    pub async fn cached_operation<T, E, F, Fut>(
        &self,
        key: &str,
        ttl: Option<Duration>,
        op: F,
    ) -> Result<T, E>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        loop {
            if let Some(cached) = self.get::<T>(key) {
                return Ok(cached);
            }

            match self.flights.join(key) {
                Role::Leader(lease) => return self.lead(key, ttl, lease, op).await,
                Role::Follower(rx) => {
                    debug!(key, "Operation already in flight, waiting");
                    match tokio::time::timeout(self.in_flight_timeout, wait_for_outcome(rx)).await
                    {
                        Ok(Some(FlightOutcome::Ready(value))) => {
                            match serde_json::from_value::<T>(value) {
                                Ok(v) => return Ok(v),
                                Err(e) => {
                                    warn!(key, error = %e, "Shared result has unexpected shape, running operation directly");
                                    return self.run_and_store(key, ttl, op).await;
                                }
                            }
                        }
                        Ok(Some(FlightOutcome::Failed)) | Ok(None) => {
                            debug!(key, "In-flight operation did not produce a value, retrying");
                        }
                        Err(_) => {
                            warn!(key, "Timed out waiting on in-flight operation, running it directly");
                            return self.run_and_store(key, ttl, op).await;
                        }
                    }
                }
            }
        }
    }

    async fn lead<T, E, F, Fut>(
        &self,
        key: &str,
        ttl: Option<Duration>,
        lease: FlightLease<'_>,
        op: F,
    ) -> Result<T, E>
    where
        T: Serialize,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        match op().await {
            Ok(value) => {
                let outcome = match serde_json::to_value(&value) {
                    Ok(data) => {
                        self.set_value(key, data.clone(), ttl);
                        FlightOutcome::Ready(data)
                    }
                    Err(e) => {
                        warn!(key, error = %e, "Failed to serialize operation result, not caching");
                        FlightOutcome::Failed
                    }
                };
                lease.finish(outcome);
                Ok(value)
            }
            Err(e) => {
                debug!(key, "Cached operation failed");
                lease.finish(FlightOutcome::Failed);
                Err(e)
            }
        }
    }

    async fn run_and_store<T, E, F, Fut>(
        &self,
        key: &str,
        ttl: Option<Duration>,
        op: F,
    ) -> Result<T, E>
    where
        T: Serialize,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        let value = op().await?;
        self.set(key, &value, ttl);
        Ok(value)
    }
}

// ============================================================================
// Tests
// ============================================================================
