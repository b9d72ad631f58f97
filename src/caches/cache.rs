//! Cache handle trait and access statistics.
//!
//! A cache handle is the typed view a reader uses for one object class. The
//! handle hides which backing store serves it; tier selection happens once,
//! at construction time, in the selector.

use async_trait::async_trait;
use thiserror::Error;

use super::store::StoreError;

// =============================================================================
// Error Types
// =============================================================================

/// Errors raised by `get`/`put` on an already-constructed cache.
#[derive(Debug, Error)]
pub enum CacheError {
    /// The backing store failed.
    #[error("cache store error: {0}")]
    Store(#[from] StoreError),

    /// A cached value could not be encoded or decoded.
    #[error("cache codec error: {0}")]
    Codec(#[from] serde_json::Error),
}

/// Result type for cache operations.
pub type Result<T> = std::result::Result<T, CacheError>;

// =============================================================================
// Statistics
// =============================================================================

/// Point-in-time access counters for one cache handle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStatsSnapshot {
    /// Number of `get` calls.
    pub gets: u64,
    /// Number of `get` calls that returned a value.
    pub hits: u64,
    /// Number of `put` calls.
    pub sets: u64,
}

impl CacheStatsSnapshot {
    /// Number of `get` calls that found nothing.
    pub fn misses(&self) -> u64 {
        self.gets - self.hits
    }
}

/// Format one human-readable statistics line for a cache.
pub fn format_stats(namespace: &str, stats: &CacheStatsSnapshot) -> String {
    format!(
        "{}: {} gets, {} hits, {} misses, {} sets",
        namespace,
        stats.gets,
        stats.hits,
        stats.misses(),
        stats.sets
    )
}

// =============================================================================
// Cache Traits
// =============================================================================

/// Object-safe view of a cache handle, independent of its value type.
pub trait CacheInfo: Send + Sync {
    /// The namespace prefix this cache's keys live under.
    fn namespace(&self) -> &str;

    /// Snapshot of this cache's access counters.
    fn stats(&self) -> CacheStatsSnapshot;
}

/// A cache handle for values of type `V`.
///
/// `get` returns `Ok(None)` on a miss. Whether an operational failure
/// surfaces as `Err` or is downgraded to a miss depends on the error policy
/// the handle was wrapped with.
#[async_trait]
pub trait Cache<V>: CacheInfo {
    /// Look up the value cached under `key`.
    async fn get(&self, key: &str) -> Result<Option<V>>;

    /// Store `value` under `key`.
    async fn put(&self, key: &str, value: &V) -> Result<()>;
}

// =============================================================================
// Tests
// =============================================================================
