//! Global shared buffer cache.
//!
//! A [`MembufferStore`] emulates a fixed-capacity shared memory segment: one
//! instance is created per process and shared by every session that enables
//! buffer-backed caching. Entries from all sessions live in the same segment,
//! kept apart only by their namespace prefixes, so the byte capacity is a
//! process-wide ceiling rather than a per-session one.

use std::sync::Arc;

use async_trait::async_trait;
use lru::LruCache;
use serde::Serialize;
use serde::de::DeserializeOwned;
use tokio::sync::Mutex;

use super::cache::Cache;
use super::store::{CacheStore, ConstructionError, StoreCache, StoreResult};

// =============================================================================
// MembufferStore
// =============================================================================

/// Fixed-capacity shared cache segment.
///
/// Bounded by total bytes (keys plus values); least-recently-used entries are
/// evicted to make room. Values larger than the whole segment are declined
/// without error.
pub struct MembufferStore {
    capacity: usize,
    state: Mutex<SegmentState>,
}

struct SegmentState {
    /// Unbounded LRU; the byte capacity is enforced manually via `used`.
    entries: LruCache<String, Vec<u8>>,
    used: usize,
}

impl MembufferStore {
    /// Create a segment with the given byte capacity.
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            state: Mutex::new(SegmentState {
                entries: LruCache::unbounded(),
                used: 0,
            }),
        }
    }

    /// The segment's total byte capacity.
    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

fn entry_size(key: &str, value: &[u8]) -> usize {
    key.len() + value.len()
}

#[async_trait]
impl CacheStore for MembufferStore {
    async fn get(&self, key: &str) -> StoreResult<Option<Vec<u8>>> {
        let mut state = self.state.lock().await;
        Ok(state.entries.get(key).cloned())
    }

    async fn put(&self, key: &str, value: Vec<u8>) -> StoreResult<()> {
        let size = entry_size(key, &value);
        if size > self.capacity {
            // Oversized values bypass the segment entirely.
            return Ok(());
        }

        let mut state = self.state.lock().await;

        if let Some(old) = state.entries.pop(key) {
            state.used = state.used.saturating_sub(entry_size(key, &old));
        }

        while state.used + size > self.capacity {
            match state.entries.pop_lru() {
                Some((evicted_key, evicted)) => {
                    state.used = state
                        .used
                        .saturating_sub(entry_size(&evicted_key, &evicted));
                }
                None => break,
            }
        }

        state.used += size;
        state.entries.put(key.to_string(), value);
        Ok(())
    }
}

// =============================================================================
// Cache Construction
// =============================================================================

/// Create a buffer-backed cache for one object class.
///
/// `entry_size_hint` is the estimated serialized size of one entry; a segment
/// that cannot hold even a single entry of the class is a construction
/// failure rather than a cache that never stores anything.
pub fn create_membuffer_cache<V>(
    store: &Arc<MembufferStore>,
    namespace: String,
    entry_size_hint: usize,
) -> Result<Arc<dyn Cache<V>>, ConstructionError>
where
    V: Serialize + DeserializeOwned + Send + Sync + 'static,
{
    if entry_size_hint > store.capacity() {
        return Err(ConstructionError::SegmentTooSmall {
            segment: store.capacity(),
            entry_size: entry_size_hint,
            namespace,
        });
    }

    let store: Arc<MembufferStore> = Arc::clone(store);
    let store: Arc<dyn CacheStore> = store;
    Ok(Arc::new(StoreCache::new(store, namespace)))
}

// =============================================================================
// Tests
// =============================================================================
