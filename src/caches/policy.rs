//! Error policy for cache operations.
//!
//! Every session-scoped cache handle is run through [`install_callbacks`]
//! after construction. In the default configuration operational failures are
//! delivered to the session's warning sink and reported to callers as cache
//! misses; with `fail-stop` enabled they propagate unmodified. Hit/miss
//! semantics are never altered, only failure visibility.

use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;

use crate::scope::Scope;

use super::cache::{Cache, CacheError, CacheInfo, CacheStatsSnapshot, Result, format_stats};

// =============================================================================
// Warning Sinks
// =============================================================================

/// Receives suppressed cache errors on behalf of the session owner.
pub trait WarningSink: Send + Sync {
    /// Deliver one suppressed cache error.
    fn warn(&self, err: &CacheError);
}

/// Default sink: log suppressed errors through `tracing`.
pub struct TracingWarnings;

impl WarningSink for TracingWarnings {
    fn warn(&self, err: &CacheError) {
        tracing::warn!("cache error (continuing uncached): {err}");
    }
}

/// A sink that buffers warning messages for the owner to collect.
#[derive(Default)]
pub struct CollectedWarnings {
    messages: Mutex<Vec<String>>,
}

impl CollectedWarnings {
    /// Create an empty sink.
    pub fn new() -> Self {
        Self::default()
    }

    /// Drain all buffered warning messages.
    pub fn take(&self) -> Vec<String> {
        std::mem::take(&mut *self.messages.lock())
    }
}

impl WarningSink for CollectedWarnings {
    fn warn(&self, err: &CacheError) {
        self.messages.lock().push(err.to_string());
    }
}

// =============================================================================
// WarnOnErrorCache
// =============================================================================

/// Wrapper that downgrades operational errors to warnings.
///
/// A failed `get` is observed as a miss, a failed `put` as a no-op; the
/// underlying error goes to the warning sink in both cases.
pub struct WarnOnErrorCache<V: 'static> {
    inner: Arc<dyn Cache<V>>,
    warnings: Arc<dyn WarningSink>,
}

impl<V: 'static> WarnOnErrorCache<V> {
    /// Wrap `inner`, sending its errors to `warnings`.
    pub fn new(inner: Arc<dyn Cache<V>>, warnings: Arc<dyn WarningSink>) -> Self {
        Self { inner, warnings }
    }
}

impl<V: Send + Sync + 'static> CacheInfo for WarnOnErrorCache<V> {
    fn namespace(&self) -> &str {
        self.inner.namespace()
    }

    fn stats(&self) -> CacheStatsSnapshot {
        self.inner.stats()
    }
}

#[async_trait]
impl<V: Send + Sync + 'static> Cache<V> for WarnOnErrorCache<V> {
    async fn get(&self, key: &str) -> Result<Option<V>> {
        match self.inner.get(key).await {
            Ok(value) => Ok(value),
            Err(err) => {
                self.warnings.warn(&err);
                Ok(None)
            }
        }
    }

    async fn put(&self, key: &str, value: &V) -> Result<()> {
        match self.inner.put(key, value).await {
            Ok(()) => Ok(()),
            Err(err) => {
                self.warnings.warn(&err);
                Ok(())
            }
        }
    }
}

// =============================================================================
// Callback Installation
// =============================================================================

/// Finish constructing a session cache handle.
///
/// In debug builds, registers a statistics dump to run at session-scope
/// teardown (one line per cache). Unless `fail_stop` is set, wraps the handle
/// so operational errors become warnings.
pub fn install_callbacks<V>(
    cache: Arc<dyn Cache<V>>,
    fail_stop: bool,
    warnings: &Arc<dyn WarningSink>,
    session_scope: &Scope,
) -> Arc<dyn Cache<V>>
where
    V: Send + Sync + 'static,
{
    if cfg!(debug_assertions) {
        let dump = Arc::clone(&cache);
        session_scope.register_cleanup(move || {
            let line = format_stats(dump.namespace(), &dump.stats());
            tracing::debug!(target: "fsfs_cache::stats", "{line}");
        });
    }

    if fail_stop {
        cache
    } else {
        Arc::new(WarnOnErrorCache::new(cache, Arc::clone(warnings)))
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::caches::store::{CacheStore, StoreCache, StoreError, StoreResult};

    /// A store whose every operation fails.
    struct BrokenStore;

    #[async_trait]
    impl CacheStore for BrokenStore {
        async fn get(&self, _key: &str) -> StoreResult<Option<Vec<u8>>> {
            Err(StoreError::Remote("connection reset".to_string()))
        }

        async fn put(&self, _key: &str, _value: Vec<u8>) -> StoreResult<()> {
            Err(StoreError::Remote("connection reset".to_string()))
        }
    }

    fn broken_cache() -> Arc<dyn Cache<u64>> {
        let cache: StoreCache<u64> =
            StoreCache::new(Arc::new(BrokenStore), "fsfs:u/p:RRI".to_string());
        Arc::new(cache)
    }

    #[tokio::test]
    async fn test_default_policy_downgrades_to_miss_and_warns() {
        let sink = Arc::new(CollectedWarnings::new());
        let warnings: Arc<dyn WarningSink> = sink.clone();
        let scope = Scope::new();

        let cache = install_callbacks(broken_cache(), false, &warnings, &scope);

        assert!(cache.get("r1").await.unwrap().is_none());
        cache.put("r1", &7).await.unwrap();

        let delivered = sink.take();
        assert_eq!(delivered.len(), 2);
        assert!(delivered[0].contains("connection reset"));
    }

    #[tokio::test]
    async fn test_fail_stop_propagates_errors() {
        let sink = Arc::new(CollectedWarnings::new());
        let warnings: Arc<dyn WarningSink> = sink.clone();
        let scope = Scope::new();

        let cache = install_callbacks(broken_cache(), true, &warnings, &scope);

        let err = cache.get("r1").await.unwrap_err();
        assert!(matches!(err, CacheError::Store(StoreError::Remote(_))));
        assert!(cache.put("r1", &7).await.is_err());
        assert!(sink.take().is_empty());
    }

    #[tokio::test]
    async fn test_wrapper_preserves_namespace_and_stats() {
        let sink: Arc<dyn WarningSink> = Arc::new(CollectedWarnings::new());
        let scope = Scope::new();
        let cache = install_callbacks(broken_cache(), false, &sink, &scope);

        assert_eq!(cache.namespace(), "fsfs:u/p:RRI");
        assert!(cache.get("r1").await.unwrap().is_none());
        // The failed get never reached the counters behind the store seam.
        assert_eq!(cache.stats().gets, 0);
    }
}
