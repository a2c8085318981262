//! Nullable store — thread-safe in-memory storage for testing.

use concord_store::{DelegationStore, MetaStore, StoreError, ValidationStore};
use concord_types::{DelegationId, ItemId};
use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

/// An in-memory implementation of every storage trait.
/// Thread-safe for use with tokio's multi-threaded runtime.
pub struct NullStore {
    delegations: Mutex<HashMap<DelegationId, Vec<u8>>>,
    items: Mutex<HashMap<ItemId, Vec<u8>>>,
    pending: Mutex<HashSet<ItemId>>,
    meta: Mutex<HashMap<String, Vec<u8>>>,
}

impl NullStore {
    pub fn new() -> Self {
        Self {
            delegations: Mutex::new(HashMap::new()),
            items: Mutex::new(HashMap::new()),
            pending: Mutex::new(HashSet::new()),
            meta: Mutex::new(HashMap::new()),
        }
    }
}

impl Default for NullStore {
    fn default() -> Self {
        Self::new()
    }
}

impl DelegationStore for NullStore {
    fn put_delegation(&self, id: DelegationId, data: &[u8]) -> Result<(), StoreError> {
        self.delegations.lock().unwrap().insert(id, data.to_vec());
        Ok(())
    }

    fn get_delegation(&self, id: DelegationId) -> Result<Option<Vec<u8>>, StoreError> {
        Ok(self.delegations.lock().unwrap().get(&id).cloned())
    }

    fn list_delegations(&self) -> Result<Vec<(DelegationId, Vec<u8>)>, StoreError> {
        Ok(self
            .delegations
            .lock()
            .unwrap()
            .iter()
            .map(|(id, data)| (*id, data.clone()))
            .collect())
    }
}

impl ValidationStore for NullStore {
    fn put_item(&self, id: &ItemId, data: &[u8]) -> Result<(), StoreError> {
        self.items.lock().unwrap().insert(id.clone(), data.to_vec());
        self.pending.lock().unwrap().insert(id.clone());
        Ok(())
    }

    fn get_item(&self, id: &ItemId) -> Result<Option<Vec<u8>>, StoreError> {
        Ok(self.items.lock().unwrap().get(id).cloned())
    }

    fn list_pending(&self) -> Result<Vec<ItemId>, StoreError> {
        Ok(self.pending.lock().unwrap().iter().cloned().collect())
    }

    fn mark_finalized(&self, id: &ItemId) -> Result<(), StoreError> {
        self.pending.lock().unwrap().remove(id);
        Ok(())
    }
}

impl MetaStore for NullStore {
    fn put_meta(&self, key: &str, data: &[u8]) -> Result<(), StoreError> {
        self.meta.lock().unwrap().insert(key.to_string(), data.to_vec());
        Ok(())
    }

    fn get_meta(&self, key: &str) -> Result<Option<Vec<u8>>, StoreError> {
        Ok(self.meta.lock().unwrap().get(key).cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn delegation_roundtrip() {
        let store = NullStore::new();
        let id = DelegationId::new(1);
        store.put_delegation(id, b"record").unwrap();
        assert_eq!(store.get_delegation(id).unwrap().as_deref(), Some(&b"record"[..]));
        assert_eq!(store.list_delegations().unwrap().len(), 1);
    }

    #[test]
    fn pending_listing_tracks_finalization() {
        let store = NullStore::new();
        let id = ItemId::new("item-1");
        store.put_item(&id, b"data").unwrap();
        assert_eq!(store.list_pending().unwrap(), vec![id.clone()]);

        store.mark_finalized(&id).unwrap();
        assert!(store.list_pending().unwrap().is_empty());
        // The record itself is retained for reads.
        assert!(store.get_item(&id).unwrap().is_some());
    }

    #[test]
    fn meta_roundtrip() {
        let store = NullStore::new();
        store.put_meta("snapshot", b"blob").unwrap();
        assert_eq!(store.get_meta("snapshot").unwrap().as_deref(), Some(&b"blob"[..]));
        assert_eq!(store.get_meta("missing").unwrap(), None);
    }
}
