//! Validation item storage trait.

use crate::StoreError;
use concord_types::ItemId;

/// Durable storage for submitted validation items.
///
/// Finalized items are retained for read access; only the pending set is
/// listed separately so a restarted process can resume its checkers.
pub trait ValidationStore: Send + Sync {
    /// Store or overwrite an item record.
    fn put_item(&self, id: &ItemId, data: &[u8]) -> Result<(), StoreError>;

    /// Get an item record by id.
    fn get_item(&self, id: &ItemId) -> Result<Option<Vec<u8>>, StoreError>;

    /// List ids of items still awaiting a verdict.
    fn list_pending(&self) -> Result<Vec<ItemId>, StoreError>;

    /// Move an item out of the pending listing once it is terminal.
    fn mark_finalized(&self, id: &ItemId) -> Result<(), StoreError>;
}
