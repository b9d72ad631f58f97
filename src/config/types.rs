//! Configuration types for the cache layer.

// =============================================================================
// CachesConfig
// =============================================================================

/// `[caches]` section - per-repository cache behavior.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CachesConfig {
    /// Whether cache operation errors abort the calling command instead of
    /// being reported as warnings.
    pub fail_stop: bool,

    /// `host:port` addresses of the distributed cache service. Empty when no
    /// distributed cache is configured.
    pub memcached_servers: Vec<String>,
}

// =============================================================================
// CacheSettings
// =============================================================================

/// Process-wide cache settings.
///
/// Initialized once per process by the hosting application, before any
/// session is opened; sessions observe them through the capability set they
/// are constructed with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheSettings {
    /// Byte capacity of the global shared buffer cache. Zero disables the
    /// shared segment entirely.
    pub cache_size: usize,

    /// Whether reconstructed file contents are cached.
    pub cache_fulltexts: bool,

    /// Whether delta-compression windows are cached.
    pub cache_txdeltas: bool,
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            cache_size: 16 * 1024 * 1024,
            cache_fulltexts: true,
            cache_txdeltas: false,
        }
    }
}
