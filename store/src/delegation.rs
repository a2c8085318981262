//! Delegation record storage trait.

use crate::StoreError;
use concord_types::DelegationId;

/// Durable storage for delegation records.
///
/// Records are stored as serialized bytes keyed by delegation id. Revoked
/// delegations are retained for audit, so there is no delete operation.
pub trait DelegationStore: Send + Sync {
    /// Store or overwrite a delegation record.
    fn put_delegation(&self, id: DelegationId, data: &[u8]) -> Result<(), StoreError>;

    /// Get a delegation record by id.
    fn get_delegation(&self, id: DelegationId) -> Result<Option<Vec<u8>>, StoreError>;

    /// List all delegation records (including revoked ones).
    fn list_delegations(&self) -> Result<Vec<(DelegationId, Vec<u8>)>, StoreError>;
}
