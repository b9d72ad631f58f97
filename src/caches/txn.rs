//! Transaction-scoped cache coordination.
//!
//! A transaction gets its own directory-listing cache whose validity ends
//! with the transaction's scope. One session hosts at most one such cache at
//! a time; if two transactions within a session overlap, transaction caching
//! is switched off for the rest of the session rather than risking
//! cross-transaction mixups.

use std::sync::Arc;

use crate::model::DirectoryListing;
use crate::scope::Scope;

use super::cache::Cache;
use super::membuffer::create_membuffer_cache;
use super::private::create_inprocess_cache;
use super::selector::{
    DIR_PAGES, DIR_PER_PAGE, SessionCaches, TAG_TXN_DIR, entry_size_hint, txn_namespace,
};
use super::store::ConstructionError;

// =============================================================================
// TxnSlot
// =============================================================================

/// State of a session's transaction cache slot.
pub(crate) enum TxnSlot {
    /// No transaction cache exists; the next transaction may create one.
    Empty,
    /// Exactly one transaction-scoped cache is live.
    Active(Arc<dyn Cache<DirectoryListing>>),
    /// Concurrent transactions were detected once; terminal for the session.
    Disabled,
}

// =============================================================================
// Transaction Cache Coordination
// =============================================================================

impl SessionCaches {
    /// Create the cache set for a transaction.
    ///
    /// If the slot still holds a previous transaction's cache, the session
    /// has concurrent transactions: the slot is cleared and transaction
    /// caching is permanently disabled for this session. Otherwise a fresh
    /// directory cache is built under a transaction-unique namespace and an
    /// invalidation callback is registered on `txn_scope`.
    ///
    /// A construction failure leaves the slot empty and must not abort the
    /// transaction itself; the transaction merely proceeds uncached.
    pub fn initialize_txn_cache(
        &self,
        txn_id: &str,
        txn_scope: &Scope,
    ) -> Result<(), ConstructionError> {
        let mut slot = self.txn_dir_slot.lock();
        match &*slot {
            TxnSlot::Disabled => return Ok(()),
            TxnSlot::Active(_) => {
                *slot = TxnSlot::Disabled;
                return Ok(());
            }
            TxnSlot::Empty => {}
        }

        let namespace = format!(
            "{}{}",
            txn_namespace(&self.repo_uuid, &self.repo_path, txn_id),
            TAG_TXN_DIR
        );

        // Mirrors the session-level directory-listing policy, but always
        // attempted: this cache is transaction-scoped and lightly populated,
        // so there is no opt-in flag to consult.
        let cache: Arc<dyn Cache<DirectoryListing>> = match &self.membuffer {
            Some(store) => {
                create_membuffer_cache(store, namespace, entry_size_hint(DIR_PER_PAGE))?
            }
            None => create_inprocess_cache(DIR_PAGES, DIR_PER_PAGE, namespace)?,
        };

        *slot = TxnSlot::Active(Arc::clone(&cache));
        drop(slot);

        let slot_ref = Arc::clone(&self.txn_dir_slot);
        txn_scope.register_cleanup(move || {
            let mut slot = slot_ref.lock();
            // A newer transaction may have replaced the slot's contents by
            // the time this scope tears down; only clear our own cache.
            if let TxnSlot::Active(current) = &*slot {
                if Arc::ptr_eq(current, &cache) {
                    *slot = TxnSlot::Empty;
                }
            }
        });

        Ok(())
    }

    /// Unconditionally drop the transaction cache, identity regardless.
    ///
    /// Used on forced or early invalidation, e.g. abort paths. Dropping the
    /// cache can only cost performance, never correctness. Once concurrent
    /// transactions have been detected, the slot stays disabled.
    pub fn reset_txn_caches(&self) {
        let mut slot = self.txn_dir_slot.lock();
        if !matches!(*slot, TxnSlot::Disabled) {
            *slot = TxnSlot::Empty;
        }
    }

    /// The active transaction's directory cache, if one exists.
    pub fn txn_dir_cache(&self) -> Option<Arc<dyn Cache<DirectoryListing>>> {
        match &*self.txn_dir_slot.lock() {
            TxnSlot::Active(cache) => Some(Arc::clone(cache)),
            _ => None,
        }
    }

    /// Whether concurrent transactions were detected in this session.
    pub fn concurrent_transactions_detected(&self) -> bool {
        matches!(*self.txn_dir_slot.lock(), TxnSlot::Disabled)
    }
}

// =============================================================================
// Tests
// =============================================================================
