//! Cache-tier selection and session cache construction.
//!
//! For each cached object class, decides which backing implementation serves
//! it (shared membuffer, private in-process cache, or the distributed
//! client), derives its collision-free namespace prefix, and wires the error
//! policy and teardown callbacks. Everything is built up front: a session
//! either gets its complete cache set or none of it.

use std::sync::Arc;

use parking_lot::Mutex;
use serde::Serialize;
use serde::de::DeserializeOwned;
use uuid::Uuid;

use crate::config::{CacheSettings, CachesConfig};
use crate::model::{
    DagNode, DeltaWindow, DirectoryListing, Fulltext, NodeId, NodeRevision, PackManifest,
};
use crate::scope::Scope;

use super::cache::Cache;
use super::membuffer::{MembufferStore, create_membuffer_cache};
use super::policy::{WarningSink, install_callbacks};
use super::private::create_inprocess_cache;
use super::remote::{DistributedStore, create_distributed_cache};
use super::store::ConstructionError;
use super::txn::TxnSlot;

// =============================================================================
// Capacity Hints
// =============================================================================

/// Memory-page size the per-class capacity hints target.
pub(crate) const PAGE_SIZE: usize = 8192;

// Per-class sizing as (pages, entries per page). Revision roots: most
// commands touch only a few revisions, so one page is enough; an entry is a
// revision number plus a node id, roughly 80 bytes, and about a hundred fit
// a page. DAG nodes run ~320 bytes serialized, directory listings ~1K, and a
// pack manifest row is a revision number with its offset.
pub(crate) const REV_ROOT_ID_PAGES: usize = 1;
pub(crate) const REV_ROOT_ID_PER_PAGE: usize = 100;
pub(crate) const DAG_NODE_PAGES: usize = 1024;
pub(crate) const DAG_NODE_PER_PAGE: usize = 16;
pub(crate) const DIR_PAGES: usize = 1024;
pub(crate) const DIR_PER_PAGE: usize = 8;
pub(crate) const PACK_MANIFEST_PAGES: usize = 32;
pub(crate) const PACK_MANIFEST_PER_PAGE: usize = 512;

// Opt-in classes are only ever buffer- or network-backed, so they need no
// page counts, just an entry estimate for the segment check.
const FULLTEXT_PER_PAGE: usize = 1;
const DELTA_WINDOW_PER_PAGE: usize = 4;
const NODE_REVISION_PER_PAGE: usize = 16;

/// Estimated serialized size of one entry of a class.
pub(crate) const fn entry_size_hint(per_page: usize) -> usize {
    PAGE_SIZE / per_page
}

// =============================================================================
// Namespace Prefixes
// =============================================================================

// Object-class tags appended to the session or transaction prefix.
const TAG_REV_ROOT_ID: &str = "RRI";
const TAG_DAG_NODE: &str = "DAG";
const TAG_DIR: &str = "DIR";
const TAG_PACK_MANIFEST: &str = "PACK-MANIFEST";
const TAG_FULLTEXT: &str = "TEXT";
const TAG_DELTA_WINDOW: &str = "TXDELTA_WINDOW";
const TAG_NODE_REVISION: &str = "NODEREVS";
pub(crate) const TAG_TXN_DIR: &str = "TXNDIR";

/// Session-wide namespace prefix for a repository.
///
/// Embeds both the repository UUID and its path, so sessions opening the
/// same repository share entries while distinct repositories never collide.
/// Deterministic: identical inputs always yield the identical prefix.
pub fn session_namespace(repo_uuid: &str, repo_path: &str) -> String {
    format!("fsfs:{repo_uuid}/{repo_path}:")
}

/// Namespace prefix for one transaction's caches.
///
/// Beyond the (repository, transaction id) pair this embeds a freshly
/// generated UUID: a transaction that fails may be followed by a new one
/// that receives the same id, and entries written under the old incarnation
/// must stay invisible to it.
pub(crate) fn txn_namespace(repo_uuid: &str, repo_path: &str, txn_id: &str) -> String {
    format!("fsfs:{repo_uuid}/{repo_path}:{txn_id}:{}:", Uuid::new_v4())
}

// =============================================================================
// CacheCapabilities
// =============================================================================

/// Process-wide cache capabilities, injected into session construction.
///
/// Carries the shared stores and feature flags a session may use. Building
/// session caches is a pure function of (repository identity, configuration,
/// capability set); there is no ambient global state.
#[derive(Clone, Default)]
pub struct CacheCapabilities {
    /// The global shared buffer cache, if the process initialized one.
    pub membuffer: Option<Arc<MembufferStore>>,
    /// Client to the distributed cache service, if configured and reachable.
    pub distributed: Option<Arc<DistributedStore>>,
    /// Whether fulltext caching is enabled.
    pub cache_fulltexts: bool,
    /// Whether delta-window caching is enabled.
    pub cache_txdeltas: bool,
}

impl CacheCapabilities {
    /// Derive capabilities from process-wide settings.
    ///
    /// A `cache_size` of zero leaves the shared segment out entirely.
    pub fn from_settings(settings: &CacheSettings) -> Self {
        Self {
            membuffer: (settings.cache_size > 0)
                .then(|| Arc::new(MembufferStore::new(settings.cache_size))),
            distributed: None,
            cache_fulltexts: settings.cache_fulltexts,
            cache_txdeltas: settings.cache_txdeltas,
        }
    }

    /// Attach a distributed cache client.
    pub fn with_distributed(mut self, store: Arc<DistributedStore>) -> Self {
        self.distributed = Some(store);
        self
    }
}

// =============================================================================
// SessionCaches
// =============================================================================

/// The cache set of one open filesystem session.
///
/// One handle per object class; a `None` handle means caching is disabled
/// for that class. Once constructed, a handle's backing implementation and
/// namespace never change for the life of the session.
pub struct SessionCaches {
    pub(crate) repo_uuid: String,
    pub(crate) repo_path: String,

    pub rev_root_id_cache: Option<Arc<dyn Cache<NodeId>>>,
    pub dag_node_cache: Option<Arc<dyn Cache<DagNode>>>,
    pub dir_cache: Option<Arc<dyn Cache<DirectoryListing>>>,
    pub packed_offset_cache: Option<Arc<dyn Cache<PackManifest>>>,
    pub fulltext_cache: Option<Arc<dyn Cache<Fulltext>>>,
    pub txdelta_window_cache: Option<Arc<dyn Cache<DeltaWindow>>>,
    pub node_revision_cache: Option<Arc<dyn Cache<NodeRevision>>>,

    using_distributed_cache: bool,
    fail_stop: bool,

    /// Retained for building transaction-scoped caches later in the
    /// session's life.
    pub(crate) membuffer: Option<Arc<MembufferStore>>,

    /// Slot for the currently active transaction's directory cache.
    pub(crate) txn_dir_slot: Arc<Mutex<TxnSlot>>,
}

impl SessionCaches {
    /// UUID of the repository this session is open on.
    pub fn repo_uuid(&self) -> &str {
        &self.repo_uuid
    }

    /// Filesystem path of the repository.
    pub fn repo_path(&self) -> &str {
        &self.repo_path
    }

    /// Whether the fulltext cache is served by the distributed client.
    pub fn using_distributed_cache(&self) -> bool {
        self.using_distributed_cache
    }

    /// Whether cache operation errors propagate to callers.
    pub fn fail_stop(&self) -> bool {
        self.fail_stop
    }
}

// =============================================================================
// Cache Selection
// =============================================================================

/// Always-on class policy: buffer-backed when the shared segment exists,
/// otherwise a private in-process cache with the same footprint.
fn create_class_cache<V>(
    membuffer: Option<&Arc<MembufferStore>>,
    pages: usize,
    per_page: usize,
    namespace: String,
) -> Result<Arc<dyn Cache<V>>, ConstructionError>
where
    V: Serialize + DeserializeOwned + Send + Sync + 'static,
{
    match membuffer {
        Some(store) => create_membuffer_cache(store, namespace, entry_size_hint(per_page)),
        None => create_inprocess_cache(pages, per_page, namespace),
    }
}

/// Build the complete cache set for a session.
///
/// Construction is all-or-nothing: any failure aborts session-cache
/// initialization and no caches are handed out. Each successfully created
/// handle gets the error policy from `config.fail_stop` and, in debug
/// builds, a statistics dump registered on `session_scope` teardown.
pub fn initialize_session_caches(
    repo_uuid: &str,
    repo_path: &str,
    config: &CachesConfig,
    caps: &CacheCapabilities,
    warnings: Arc<dyn WarningSink>,
    session_scope: &Scope,
) -> Result<SessionCaches, ConstructionError> {
    let prefix = session_namespace(repo_uuid, repo_path);
    let fail_stop = config.fail_stop;
    let membuffer = caps.membuffer.as_ref();

    let rev_root_id_cache = create_class_cache::<NodeId>(
        membuffer,
        REV_ROOT_ID_PAGES,
        REV_ROOT_ID_PER_PAGE,
        format!("{prefix}{TAG_REV_ROOT_ID}"),
    )?;

    let dag_node_cache = create_class_cache::<DagNode>(
        membuffer,
        DAG_NODE_PAGES,
        DAG_NODE_PER_PAGE,
        format!("{prefix}{TAG_DAG_NODE}"),
    )?;

    let dir_cache = create_class_cache::<DirectoryListing>(
        membuffer,
        DIR_PAGES,
        DIR_PER_PAGE,
        format!("{prefix}{TAG_DIR}"),
    )?;

    let packed_offset_cache = create_class_cache::<PackManifest>(
        membuffer,
        PACK_MANIFEST_PAGES,
        PACK_MANIFEST_PER_PAGE,
        format!("{prefix}{TAG_PACK_MANIFEST}"),
    )?;

    // Fulltexts gain the most from cross-process sharing, so a configured
    // distributed cache takes precedence over the local tiers.
    let fulltext_cache = match (&caps.distributed, membuffer, caps.cache_fulltexts) {
        (Some(remote), _, _) => Some(create_distributed_cache::<Fulltext>(
            remote,
            format!("{prefix}{TAG_FULLTEXT}"),
        )),
        (None, Some(store), true) => Some(create_membuffer_cache::<Fulltext>(
            store,
            format!("{prefix}{TAG_FULLTEXT}"),
            entry_size_hint(FULLTEXT_PER_PAGE),
        )?),
        _ => None,
    };

    // Delta windows are opt-in and buffer-only.
    let txdelta_window_cache = match (membuffer, caps.cache_txdeltas) {
        (Some(store), true) => Some(create_membuffer_cache::<DeltaWindow>(
            store,
            format!("{prefix}{TAG_DELTA_WINDOW}"),
            entry_size_hint(DELTA_WINDOW_PER_PAGE),
        )?),
        _ => None,
    };

    // Node-revision records are cached whenever the shared segment exists.
    let node_revision_cache = match membuffer {
        Some(store) => Some(create_membuffer_cache::<NodeRevision>(
            store,
            format!("{prefix}{TAG_NODE_REVISION}"),
            entry_size_hint(NODE_REVISION_PER_PAGE),
        )?),
        None => None,
    };

    Ok(SessionCaches {
        repo_uuid: repo_uuid.to_string(),
        repo_path: repo_path.to_string(),
        rev_root_id_cache: Some(install_callbacks(
            rev_root_id_cache,
            fail_stop,
            &warnings,
            session_scope,
        )),
        dag_node_cache: Some(install_callbacks(
            dag_node_cache,
            fail_stop,
            &warnings,
            session_scope,
        )),
        dir_cache: Some(install_callbacks(dir_cache, fail_stop, &warnings, session_scope)),
        packed_offset_cache: Some(install_callbacks(
            packed_offset_cache,
            fail_stop,
            &warnings,
            session_scope,
        )),
        fulltext_cache: fulltext_cache
            .map(|cache| install_callbacks(cache, fail_stop, &warnings, session_scope)),
        txdelta_window_cache: txdelta_window_cache
            .map(|cache| install_callbacks(cache, fail_stop, &warnings, session_scope)),
        node_revision_cache: node_revision_cache
            .map(|cache| install_callbacks(cache, fail_stop, &warnings, session_scope)),
        using_distributed_cache: caps.distributed.is_some(),
        fail_stop,
        membuffer: caps.membuffer.clone(),
        txn_dir_slot: Arc::new(Mutex::new(TxnSlot::Empty)),
    })
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::caches::policy::CollectedWarnings;
    use crate::caches::remote::RemoteKv;
    use async_trait::async_trait;

    struct NullRemote;

    #[async_trait]
    impl RemoteKv for NullRemote {
        async fn get(&self, _key: &str) -> Result<Option<Vec<u8>>, String> {
            Ok(None)
        }

        async fn set(&self, _key: &str, _value: Vec<u8>) -> Result<(), String> {
            Ok(())
        }
    }

    fn sink() -> Arc<dyn WarningSink> {
        Arc::new(CollectedWarnings::new())
    }

    fn open(caps: &CacheCapabilities, scope: &Scope) -> SessionCaches {
        initialize_session_caches(
            "abc-123",
            "/repos/main",
            &CachesConfig::default(),
            caps,
            sink(),
            scope,
        )
        .unwrap()
    }

    #[test]
    fn test_session_namespace_literals() {
        let prefix = session_namespace("abc-123", "/repos/main");
        assert_eq!(prefix, "fsfs:abc-123//repos/main:");
        assert_eq!(format!("{prefix}RRI"), "fsfs:abc-123//repos/main:RRI");
        assert_eq!(format!("{prefix}DIR"), "fsfs:abc-123//repos/main:DIR");
    }

    #[test]
    fn test_namespaces_disjoint_across_repositories() {
        let a = session_namespace("u1", "/p1");
        let b = session_namespace("u2", "/p2");
        let c = session_namespace("u1", "/p2");
        assert_ne!(a, b);
        assert_ne!(a, c);
        assert_ne!(b, c);
    }

    #[test]
    fn test_full_set_with_membuffer() {
        let caps = CacheCapabilities::from_settings(&CacheSettings::default());
        let scope = Scope::new();
        let session = open(&caps, &scope);

        assert!(session.rev_root_id_cache.is_some());
        assert!(session.dag_node_cache.is_some());
        assert!(session.dir_cache.is_some());
        assert!(session.packed_offset_cache.is_some());
        // Fulltexts default on, delta windows default off.
        assert!(session.fulltext_cache.is_some());
        assert!(session.txdelta_window_cache.is_none());
        assert!(session.node_revision_cache.is_some());
        assert!(!session.using_distributed_cache());
        assert!(!session.fail_stop());
    }

    #[test]
    fn test_always_on_classes_survive_without_membuffer() {
        let settings = CacheSettings {
            cache_size: 0,
            ..CacheSettings::default()
        };
        let caps = CacheCapabilities::from_settings(&settings);
        let scope = Scope::new();
        let session = open(&caps, &scope);

        assert!(session.rev_root_id_cache.is_some());
        assert!(session.dag_node_cache.is_some());
        assert!(session.dir_cache.is_some());
        assert!(session.packed_offset_cache.is_some());
        // Opt-in classes get no private fallback.
        assert!(session.fulltext_cache.is_none());
        assert!(session.txdelta_window_cache.is_none());
        assert!(session.node_revision_cache.is_none());
    }

    #[test]
    fn test_opt_in_flags() {
        let settings = CacheSettings {
            cache_fulltexts: false,
            cache_txdeltas: true,
            ..CacheSettings::default()
        };
        let caps = CacheCapabilities::from_settings(&settings);
        let scope = Scope::new();
        let session = open(&caps, &scope);

        assert!(session.fulltext_cache.is_none());
        assert!(session.txdelta_window_cache.is_some());
    }

    #[test]
    fn test_fulltext_prefers_distributed_cache() {
        let distributed = Arc::new(DistributedStore::new(Arc::new(NullRemote)));
        let caps =
            CacheCapabilities::from_settings(&CacheSettings::default()).with_distributed(distributed);
        let scope = Scope::new();
        let session = open(&caps, &scope);

        assert!(session.using_distributed_cache());
        let fulltext = session.fulltext_cache.as_ref().unwrap();
        assert_eq!(fulltext.namespace(), "fsfs:abc-123//repos/main:TEXT");
    }

    #[test]
    fn test_namespaces_deterministic_across_invocations() {
        let caps = CacheCapabilities::from_settings(&CacheSettings::default());
        let scope = Scope::new();
        let first = open(&caps, &scope);
        let second = open(&caps, &scope);

        let namespaces = |s: &SessionCaches| {
            [
                s.rev_root_id_cache.as_ref().unwrap().namespace().to_string(),
                s.dag_node_cache.as_ref().unwrap().namespace().to_string(),
                s.dir_cache.as_ref().unwrap().namespace().to_string(),
                s.packed_offset_cache.as_ref().unwrap().namespace().to_string(),
            ]
        };
        assert_eq!(namespaces(&first), namespaces(&second));
    }

    #[test]
    fn test_tiny_segment_aborts_initialization() {
        let caps = CacheCapabilities {
            membuffer: Some(Arc::new(MembufferStore::new(64))),
            ..CacheCapabilities::default()
        };
        let scope = Scope::new();
        let result = initialize_session_caches(
            "abc-123",
            "/repos/main",
            &CachesConfig::default(),
            &caps,
            sink(),
            &scope,
        );
        assert!(matches!(
            result,
            Err(ConstructionError::SegmentTooSmall { .. })
        ));
    }

    #[tokio::test]
    async fn test_sessions_on_same_repo_share_entries() {
        use crate::model::{DirEntry, NodeKind};

        let caps = CacheCapabilities::from_settings(&CacheSettings::default());
        let scope = Scope::new();
        let first = open(&caps, &scope);
        let second = open(&caps, &scope);

        let listing = DirectoryListing {
            entries: vec![DirEntry {
                name: "trunk".to_string(),
                id: "0.0.r7/42".to_string(),
                kind: NodeKind::Directory,
            }],
        };

        let dir_a = first.dir_cache.as_ref().unwrap();
        let dir_b = second.dir_cache.as_ref().unwrap();
        dir_a.put("7/root", &listing).await.unwrap();
        assert_eq!(dir_b.get("7/root").await.unwrap(), Some(listing));
    }
}
