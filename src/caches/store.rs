//! Backing-store seam and the typed cache adapter.
//!
//! A [`CacheStore`] is a byte-level key-value store; the shared membuffer,
//! the private in-process cache, and the distributed client all implement it.
//! [`StoreCache`] turns a store plus a namespace prefix into a typed
//! [`Cache`] handle, serializing values as JSON.

use std::marker::PhantomData;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use serde::Serialize;
use serde::de::DeserializeOwned;
use thiserror::Error;

use super::cache::{Cache, CacheInfo, CacheStatsSnapshot, Result as CacheResult};

// =============================================================================
// Error Types
// =============================================================================

/// Errors raised by byte-level store operations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The distributed cache service failed or was unreachable.
    #[error("remote cache error: {0}")]
    Remote(String),
}

/// Result type for store operations.
pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// Errors raised while constructing a cache.
#[derive(Debug, Error)]
pub enum ConstructionError {
    /// The shared segment cannot hold even one entry of this object class.
    #[error(
        "cache segment of {segment} bytes cannot hold a {entry_size}-byte entry for {namespace}"
    )]
    SegmentTooSmall {
        segment: usize,
        entry_size: usize,
        namespace: String,
    },

    /// A capacity hint of zero entries was requested.
    #[error("invalid cache capacity for {namespace}: zero entries")]
    InvalidCapacity { namespace: String },

    /// The distributed cache client could not be constructed.
    #[error("distributed cache unavailable: {0}")]
    Distributed(String),
}

// =============================================================================
// CacheStore Trait
// =============================================================================

/// A byte-level key-value cache store.
///
/// Stores hold serialized entries under full keys (namespace prefix plus
/// object key). They are free to evict or decline entries at any time; a
/// `put` that does not store is not an error.
#[async_trait]
pub trait CacheStore: Send + Sync {
    /// Look up the bytes stored under `key`.
    async fn get(&self, key: &str) -> StoreResult<Option<Vec<u8>>>;

    /// Store `value` under `key`.
    async fn put(&self, key: &str, value: Vec<u8>) -> StoreResult<()>;
}

// =============================================================================
// CacheStats
// =============================================================================

/// Per-handle access counters.
#[derive(Default)]
pub(crate) struct CacheStats {
    gets: AtomicU64,
    hits: AtomicU64,
    sets: AtomicU64,
}

impl CacheStats {
    fn record_get(&self, hit: bool) {
        self.gets.fetch_add(1, Ordering::Relaxed);
        if hit {
            self.hits.fetch_add(1, Ordering::Relaxed);
        }
    }

    fn record_set(&self) {
        self.sets.fetch_add(1, Ordering::Relaxed);
    }

    fn snapshot(&self) -> CacheStatsSnapshot {
        CacheStatsSnapshot {
            gets: self.gets.load(Ordering::Relaxed),
            hits: self.hits.load(Ordering::Relaxed),
            sets: self.sets.load(Ordering::Relaxed),
        }
    }
}

// =============================================================================
// StoreCache
// =============================================================================

/// Typed cache handle over a byte-level store.
///
/// Keys are namespaced as `{namespace}:{key}`, so handles with distinct
/// namespace prefixes never observe each other's entries even when they
/// share one backing store.
pub struct StoreCache<V> {
    store: Arc<dyn CacheStore>,
    namespace: String,
    stats: CacheStats,
    _marker: PhantomData<fn() -> V>,
}

impl<V> StoreCache<V> {
    /// Create a typed handle over `store` for the given namespace.
    pub fn new(store: Arc<dyn CacheStore>, namespace: String) -> Self {
        Self {
            store,
            namespace,
            stats: CacheStats::default(),
            _marker: PhantomData,
        }
    }

    fn full_key(&self, key: &str) -> String {
        format!("{}:{}", self.namespace, key)
    }
}

impl<V: Send + Sync> CacheInfo for StoreCache<V> {
    fn namespace(&self) -> &str {
        &self.namespace
    }

    fn stats(&self) -> CacheStatsSnapshot {
        self.stats.snapshot()
    }
}

#[async_trait]
impl<V> Cache<V> for StoreCache<V>
where
    V: Serialize + DeserializeOwned + Send + Sync,
{
    async fn get(&self, key: &str) -> CacheResult<Option<V>> {
        let found = self.store.get(&self.full_key(key)).await?;
        match found {
            Some(bytes) => {
                let value = serde_json::from_slice(&bytes)?;
                self.stats.record_get(true);
                Ok(Some(value))
            }
            None => {
                self.stats.record_get(false);
                Ok(None)
            }
        }
    }

    async fn put(&self, key: &str, value: &V) -> CacheResult<()> {
        self.stats.record_set();
        let bytes = serde_json::to_vec(value)?;
        self.store.put(&self.full_key(key), bytes).await?;
        Ok(())
    }
}

// =============================================================================
// Tests
// =============================================================================
