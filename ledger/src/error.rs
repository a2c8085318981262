use concord_store::StoreError;
use concord_types::{AccountId, DelegationId};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("cannot delegate to self")]
    SelfDelegation,

    #[error("delegator {delegator} is cooling down for another {remaining_secs}s after a revocation")]
    CooldownActive {
        delegator: AccountId,
        remaining_secs: u64,
    },

    #[error("delegator {delegator} already holds {have} active delegations (max {max})")]
    TooManyDelegations {
        delegator: AccountId,
        have: usize,
        max: usize,
    },

    #[error("amount {amount} is below the minimum delegation amount {min}")]
    AmountBelowMinimum { amount: u128, min: u128 },

    #[error("percentage {percentage} exceeds the maximum delegation percentage {max}")]
    PercentageAboveMaximum { percentage: u8, max: u8 },

    #[error("outbound percentage delegations would commit {total}% of base power")]
    PercentageOvercommitted { total: u32 },

    #[error("outbound delegations would commit {committed} against a held balance of {balance}")]
    AmountOvercommitted { committed: u128, balance: u128 },

    #[error("{0} not found")]
    DelegationNotFound(DelegationId),

    #[error("{id} does not belong to {account}")]
    NotDelegator {
        id: DelegationId,
        account: AccountId,
    },

    #[error("invalid delegation config: {0}")]
    InvalidConfig(String),

    #[error(transparent)]
    Store(#[from] StoreError),
}
