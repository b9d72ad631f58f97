//! Distributed cache client.
//!
//! Adapts an external networked key-value cache service to the
//! [`CacheStore`] interface. The wire protocol lives behind the [`RemoteKv`]
//! trait; this module only decides when a client exists (configured servers)
//! and how its failures surface (as [`StoreError::Remote`]).

use std::sync::Arc;

use async_trait::async_trait;
use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::config::CachesConfig;

use super::cache::Cache;
use super::store::{CacheStore, ConstructionError, StoreCache, StoreError, StoreResult};

// =============================================================================
// RemoteKv Trait
// =============================================================================

/// Transport to a networked key-value cache service.
///
/// Implementations own the wire protocol and connection handling; errors are
/// reported as plain strings and mapped to [`StoreError::Remote`] by the
/// store adapter.
#[async_trait]
pub trait RemoteKv: Send + Sync {
    /// Fetch the bytes stored under `key`, if any.
    async fn get(&self, key: &str) -> std::result::Result<Option<Vec<u8>>, String>;

    /// Store `value` under `key`.
    async fn set(&self, key: &str, value: Vec<u8>) -> std::result::Result<(), String>;
}

/// Connects a [`RemoteKv`] transport to a list of `host:port` servers.
pub trait RemoteKvConnector {
    /// Establish a transport to the given servers.
    fn connect(&self, servers: &[String]) -> Result<Arc<dyn RemoteKv>, ConstructionError>;
}

// =============================================================================
// DistributedStore
// =============================================================================

/// A [`CacheStore`] backed by an external cache service.
pub struct DistributedStore {
    transport: Arc<dyn RemoteKv>,
}

impl DistributedStore {
    /// Wrap an established transport.
    pub fn new(transport: Arc<dyn RemoteKv>) -> Self {
        Self { transport }
    }

    /// Build a distributed store from configuration.
    ///
    /// Returns `Ok(None)` when the configuration names no cache servers;
    /// a connector failure is a [`ConstructionError`] and aborts whichever
    /// cache-set initialization requested the store.
    pub fn from_config(
        config: &CachesConfig,
        connector: &dyn RemoteKvConnector,
    ) -> Result<Option<Self>, ConstructionError> {
        if config.memcached_servers.is_empty() {
            return Ok(None);
        }

        let transport = connector.connect(&config.memcached_servers)?;
        Ok(Some(Self::new(transport)))
    }
}

#[async_trait]
impl CacheStore for DistributedStore {
    async fn get(&self, key: &str) -> StoreResult<Option<Vec<u8>>> {
        self.transport.get(key).await.map_err(StoreError::Remote)
    }

    async fn put(&self, key: &str, value: Vec<u8>) -> StoreResult<()> {
        self.transport
            .set(key, value)
            .await
            .map_err(StoreError::Remote)
    }
}

// =============================================================================
// Cache Construction
// =============================================================================

/// Create a cache handle served by the distributed store.
pub fn create_distributed_cache<V>(
    store: &Arc<DistributedStore>,
    namespace: String,
) -> Arc<dyn Cache<V>>
where
    V: Serialize + DeserializeOwned + Send + Sync + 'static,
{
    let store: Arc<DistributedStore> = Arc::clone(store);
    let store: Arc<dyn CacheStore> = store;
    Arc::new(StoreCache::new(store, namespace))
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use tokio::sync::Mutex;

    struct MemoryRemote {
        entries: Mutex<HashMap<String, Vec<u8>>>,
    }

    impl MemoryRemote {
        fn new() -> Self {
            Self {
                entries: Mutex::new(HashMap::new()),
            }
        }
    }

    #[async_trait]
    impl RemoteKv for MemoryRemote {
        async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, String> {
            Ok(self.entries.lock().await.get(key).cloned())
        }

        async fn set(&self, key: &str, value: Vec<u8>) -> Result<(), String> {
            self.entries.lock().await.insert(key.to_string(), value);
            Ok(())
        }
    }

    struct MemoryConnector;

    impl RemoteKvConnector for MemoryConnector {
        fn connect(&self, _servers: &[String]) -> Result<Arc<dyn RemoteKv>, ConstructionError> {
            Ok(Arc::new(MemoryRemote::new()))
        }
    }

    struct FailingConnector;

    impl RemoteKvConnector for FailingConnector {
        fn connect(&self, servers: &[String]) -> Result<Arc<dyn RemoteKv>, ConstructionError> {
            Err(ConstructionError::Distributed(format!(
                "cannot reach {}",
                servers.join(",")
            )))
        }
    }

    fn config_with_servers(servers: &[&str]) -> CachesConfig {
        CachesConfig {
            fail_stop: false,
            memcached_servers: servers.iter().map(|s| s.to_string()).collect(),
        }
    }

    #[test]
    fn test_from_config_unconfigured_is_none() {
        let config = config_with_servers(&[]);
        let store = DistributedStore::from_config(&config, &MemoryConnector).unwrap();
        assert!(store.is_none());
    }

    #[test]
    fn test_from_config_connector_failure_propagates() {
        let config = config_with_servers(&["cache1:11211"]);
        let result = DistributedStore::from_config(&config, &FailingConnector);
        assert!(matches!(result, Err(ConstructionError::Distributed(_))));
    }

    #[tokio::test]
    async fn test_roundtrip_through_transport() {
        let config = config_with_servers(&["cache1:11211", "cache2:11211"]);
        let store = Arc::new(
            DistributedStore::from_config(&config, &MemoryConnector)
                .unwrap()
                .unwrap(),
        );

        let cache = create_distributed_cache::<String>(&store, "fsfs:u/p:TEXT".to_string());
        cache.put("r5/file", &"contents".to_string()).await.unwrap();
        assert_eq!(
            cache.get("r5/file").await.unwrap(),
            Some("contents".to_string())
        );
    }
}
