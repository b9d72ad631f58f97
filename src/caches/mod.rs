//! Multi-tier caching for versioned filesystem sessions.
//!
//! Sessions cache derived objects (revision roots, DAG nodes, directory
//! listings, pack manifests, fulltexts, delta windows, node-revision
//! records) so repeated reads avoid re-deriving them from on-disk
//! structures.
//!
//! ## Architecture
//!
//! The cache system is layered:
//!
//! 1. **Backing stores** - byte-level key-value engines behind [`CacheStore`]
//!    - [`MembufferStore`] - fixed-capacity shared segment, process-wide
//!    - [`PrivateStore`] - bounded per-session in-process cache
//!    - [`DistributedStore`] - client to a networked cache service
//!
//! 2. **Typed handles** - [`Cache`] implementations over a store
//!    - [`StoreCache`] - namespace-prefixed, JSON-serializing adapter
//!    - [`WarnOnErrorCache`] - error-policy wrapper (failures become misses)
//!
//! 3. **Selection and lifecycle**
//!    - [`initialize_session_caches`] - picks the tier for each object
//!      class, derives collision-free namespaces, installs callbacks
//!    - [`SessionCaches::initialize_txn_cache`] - transaction-scoped
//!      directory caching with concurrent-transaction detection

mod cache;
mod membuffer;
mod policy;
mod private;
mod remote;
mod selector;
mod store;
mod txn;

// Cache handle layer
pub use cache::{Cache, CacheError, CacheInfo, CacheStatsSnapshot, Result, format_stats};

// Backing store layer
pub use membuffer::{MembufferStore, create_membuffer_cache};
pub use private::{PrivateStore, create_inprocess_cache};
pub use remote::{DistributedStore, RemoteKv, RemoteKvConnector, create_distributed_cache};
pub use store::{CacheStore, ConstructionError, StoreCache, StoreError, StoreResult};

// Error policy layer
pub use policy::{
    CollectedWarnings, TracingWarnings, WarnOnErrorCache, WarningSink, install_callbacks,
};

// Selection and transaction coordination
pub use selector::{
    CacheCapabilities, SessionCaches, initialize_session_caches, session_namespace,
};
