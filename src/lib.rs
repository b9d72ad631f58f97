//! fsfs-cache - the caching layer of a versioned filesystem backend.
//!
//! Provides multi-tier, multi-policy caching for derived repository objects:
//! which backing store serves each object class, how keys are namespaced so
//! repositories, sessions, and transactions never collide, and when cached
//! entries stop being valid.

pub mod caches;
pub mod config;
pub mod model;
pub mod scope;

pub use caches::{
    Cache, CacheCapabilities, CacheError, CacheInfo, ConstructionError, DistributedStore,
    MembufferStore, RemoteKv, RemoteKvConnector, SessionCaches, WarningSink,
    initialize_session_caches,
};
pub use config::{CacheSettings, CachesConfig, ConfigError, read_caches_config};
pub use scope::Scope;
