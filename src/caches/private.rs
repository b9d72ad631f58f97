//! Per-process private cache.
//!
//! The fallback tier for the always-on object classes when no shared segment
//! is available: a bounded in-process map with LRU eviction, owned by exactly
//! one session and never shared across processes.

use std::num::NonZeroUsize;
use std::sync::Arc;

use async_trait::async_trait;
use lru::LruCache;
use serde::Serialize;
use serde::de::DeserializeOwned;
use tokio::sync::Mutex;

use super::cache::Cache;
use super::store::{CacheStore, ConstructionError, StoreCache, StoreResult};

// =============================================================================
// PrivateStore
// =============================================================================

/// A bounded in-process hash cache.
pub struct PrivateStore {
    entries: Mutex<LruCache<String, Vec<u8>>>,
}

impl PrivateStore {
    fn new(capacity: NonZeroUsize) -> Self {
        Self {
            entries: Mutex::new(LruCache::new(capacity)),
        }
    }
}

#[async_trait]
impl CacheStore for PrivateStore {
    async fn get(&self, key: &str) -> StoreResult<Option<Vec<u8>>> {
        let mut entries = self.entries.lock().await;
        Ok(entries.get(key).cloned())
    }

    async fn put(&self, key: &str, value: Vec<u8>) -> StoreResult<()> {
        let mut entries = self.entries.lock().await;
        entries.put(key.to_string(), value);
        Ok(())
    }
}

// =============================================================================
// Cache Construction
// =============================================================================

/// Create a private in-process cache for one object class.
///
/// The capacity hint mirrors the buffer-backed sizing: `pages` memory pages
/// of `per_page` entries each, so basic caching still functions with the
/// same footprint when the shared segment is unavailable.
pub fn create_inprocess_cache<V>(
    pages: usize,
    per_page: usize,
    namespace: String,
) -> Result<Arc<dyn Cache<V>>, ConstructionError>
where
    V: Serialize + DeserializeOwned + Send + Sync + 'static,
{
    let capacity = NonZeroUsize::new(pages * per_page).ok_or_else(|| {
        ConstructionError::InvalidCapacity {
            namespace: namespace.clone(),
        }
    })?;

    let store: Arc<dyn CacheStore> = Arc::new(PrivateStore::new(capacity));
    Ok(Arc::new(StoreCache::new(store, namespace)))
}

// =============================================================================
// Tests
// =============================================================================
