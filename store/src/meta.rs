//! Keyed metadata blobs (engine snapshots and similar).

use crate::StoreError;

/// Small key → blob store for engine state snapshots.
pub trait MetaStore: Send + Sync {
    fn put_meta(&self, key: &str, data: &[u8]) -> Result<(), StoreError>;

    fn get_meta(&self, key: &str) -> Result<Option<Vec<u8>>, StoreError>;
}
