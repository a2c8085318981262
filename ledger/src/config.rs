//! Delegation policy bounds.

use crate::error::LedgerError;
use serde::{Deserialize, Serialize};

/// Immutable policy bounds checked on every delegation mutation.
///
/// Supplied once at ledger construction; there is no mid-flight
/// reconfiguration.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DelegationConfig {
    /// Maximum concurrently active delegations per delegator. Also bounds
    /// the hop limit for resolving full-delegation chains.
    pub max_delegations_per_address: usize,
    /// Minimum amount (base units) for partial and percentage delegations.
    pub min_delegation_amount: u128,
    /// Maximum percentage a single percentage-kind delegation may carry.
    pub max_delegation_percentage: u8,
    /// Seconds before a new delegation starts transferring power.
    pub lock_period_secs: u64,
    /// Seconds after a revocation during which the delegator may not
    /// create new delegations.
    pub cooldown_period_secs: u64,
}

impl DelegationConfig {
    pub fn validate(&self) -> Result<(), LedgerError> {
        if self.max_delegations_per_address == 0 {
            return Err(LedgerError::InvalidConfig(
                "max_delegations_per_address must be at least 1".into(),
            ));
        }
        if self.max_delegation_percentage > 100 {
            return Err(LedgerError::InvalidConfig(format!(
                "max_delegation_percentage {} exceeds 100",
                self.max_delegation_percentage
            )));
        }
        Ok(())
    }
}

impl Default for DelegationConfig {
    fn default() -> Self {
        Self {
            max_delegations_per_address: 10,
            min_delegation_amount: 1,
            max_delegation_percentage: 100,
            lock_period_secs: 3_600,
            cooldown_period_secs: 86_400,
        }
    }
}
