//! Local caching module.
//!
//! This module provides the `CacheManager`, a two-tier key/value cache with
//! per-entry expiry. Reads check the in-memory tier first and fall back to the
//! persistent tier, rehydrating memory on a hit. Concurrent fetches for the
//! same key are de-duplicated through `CacheManager::cached_operation`.
//!
//! Default TTLs depend on the data category:
//! - Tasks, Pomodoro sessions: 5 minutes
//! - Grades, calendar events: 10 minutes
//! - Study materials: 15 minutes
//! - Analytics, profile: 30 minutes
//! - Settings: 1 hour
//! - AI responses: 24 hours

pub mod entry;
pub mod manager;
mod single_flight;
pub mod storage;
pub mod sweeper;

pub use entry::{cache_key, CacheCategory, CacheEntry};
pub use manager::{CacheManager, CacheStats, SweepReport, PERSISTENT_PREFIX};
pub use storage::{FileStore, MemoryStore, PersistentStore, StorageError};
pub use sweeper::{SweeperHandle, DEFAULT_SWEEP_INTERVAL};
