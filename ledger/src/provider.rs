//! Identity collaborator contract.

use concord_types::AccountId;

/// Read-only capability and base-power lookups owned by the platform's
/// identity collaborator.
///
/// The ledger and validator consume this contract; they never decide who is
/// an admin or how much base power an account holds.
pub trait IdentityProvider: Send + Sync {
    /// An account's voting weight before any delegation in or out.
    fn base_voting_power(&self, account: &AccountId) -> u128;

    fn is_admin(&self, account: &AccountId) -> bool;

    fn is_delegate(&self, account: &AccountId) -> bool;

    /// Sum of all eligible accounts' base power at this instant. Captured
    /// as a decision's quorum denominator.
    fn total_base_power(&self) -> u128;
}
