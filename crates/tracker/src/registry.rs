//! In-memory store of the bridge operations known to a tracker.

use std::{
    collections::{btree_map::Entry, BTreeMap},
    sync::Arc,
};

use lxly_bridge_primitives::{record::BridgeTransaction, types::TxRef};
use tokio::sync::RwLock;

/// Records keyed by their source-chain hash, shared by all clones.
///
/// Locks are only held for the duration of a single read or update, so tracking one operation
/// never blocks submissions, claims or tracking of another.
#[derive(Debug, Clone, Default)]
pub struct Registry {
    records: Arc<RwLock<BTreeMap<TxRef, BridgeTransaction>>>,
}

impl Registry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a copy of the record of `tx_ref`, if any.
    pub async fn get(&self, tx_ref: &TxRef) -> Option<BridgeTransaction> {
        self.records.read().await.get(tx_ref).cloned()
    }

    /// Returns `true` if `tx_ref` is recorded.
    #[cfg(test)]
    pub(crate) async fn contains(&self, tx_ref: &TxRef) -> bool {
        self.records.read().await.contains_key(tx_ref)
    }

    /// Inserts a record unless one with the same hash already exists.
    ///
    /// Returns `false` and leaves the registry untouched in the latter case.
    pub async fn insert_new(&self, record: BridgeTransaction) -> bool {
        let mut records = self.records.write().await;

        if records.contains_key(&record.tx_ref) {
            return false;
        }

        records.insert(record.tx_ref, record);
        true
    }

    /// Inserts a record, or replaces the recorded one unless that is further along its
    /// lifecycle.
    ///
    /// A replacement keeps the recorded claim if `record` has none. Returns `false` if `record`
    /// was discarded.
    pub async fn merge(&self, mut record: BridgeTransaction) -> bool {
        let mut records = self.records.write().await;

        match records.entry(record.tx_ref) {
            Entry::Vacant(entry) => {
                entry.insert(record);
            }
            Entry::Occupied(mut entry) => {
                let current = entry.get_mut();
                if record.state() < current.state() {
                    return false;
                }

                if record.claim.is_none() {
                    record.claim = current.claim.take();
                }
                *current = record;
            }
        }

        true
    }

    /// Applies `f` to the record of `tx_ref` and returns its result, or `None` if there is no
    /// such record.
    pub async fn update<R>(
        &self,
        tx_ref: &TxRef,
        f: impl FnOnce(&mut BridgeTransaction) -> R,
    ) -> Option<R> {
        self.records.write().await.get_mut(tx_ref).map(f)
    }

    /// Removes and returns the record of `tx_ref`.
    pub async fn remove(&self, tx_ref: &TxRef) -> Option<BridgeTransaction> {
        self.records.write().await.remove(tx_ref)
    }

    /// Returns copies of all records ordered by hash.
    pub async fn snapshot(&self) -> Vec<BridgeTransaction> {
        self.records.read().await.values().cloned().collect()
    }

    /// Number of records.
    #[cfg(test)]
    pub(crate) async fn len(&self) -> usize {
        self.records.read().await.len()
    }

    /// Returns `true` if nothing is recorded.
    #[cfg(test)]
    pub(crate) async fn is_empty(&self) -> bool {
        self.records.read().await.is_empty()
    }
}
