//! Delegation records.

use concord_types::{AccountId, DelegationId, Timestamp};
use serde::{Deserialize, Serialize};

/// How a delegation commits the delegator's power.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum DelegationKind {
    /// The delegator's entire base power.
    Full,
    /// A fixed amount of base units.
    Partial,
    /// A percentage of the delegator's base power.
    Percentage,
}

/// Free-form annotation attached by the delegator.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DelegationMetadata {
    pub reason: Option<String>,
    pub tags: Vec<String>,
}

/// A single delegation record.
///
/// `end_time` is set at most once — revocation is irreversible. Revoked
/// records are retained for audit and never physically removed.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Delegation {
    pub id: DelegationId,
    pub delegator: AccountId,
    pub delegate: AccountId,
    pub kind: DelegationKind,
    /// Base units committed (Partial kind; informational for the others).
    pub amount: u128,
    /// Share of base power committed, 0–100 (Percentage kind).
    pub percentage: u8,
    pub start_time: Timestamp,
    pub end_time: Option<Timestamp>,
    pub metadata: DelegationMetadata,
}

impl Delegation {
    pub fn is_revoked(&self) -> bool {
        self.end_time.is_some()
    }

    /// Whether this delegation currently transfers power.
    ///
    /// A delegation only takes effect once its lock period has elapsed;
    /// until then it exists but moves nothing.
    pub fn is_active(&self, lock_period_secs: u64, now: Timestamp) -> bool {
        self.end_time.is_none() && self.start_time.has_expired(lock_period_secs, now)
    }

    /// The power this delegation moves, given the delegator's base power.
    pub fn committed_power(&self, delegator_base: u128) -> u128 {
        match self.kind {
            DelegationKind::Full => delegator_base,
            DelegationKind::Partial => self.amount,
            DelegationKind::Percentage => {
                delegator_base.saturating_mul(self.percentage as u128) / 100
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(kind: DelegationKind, amount: u128, percentage: u8) -> Delegation {
        Delegation {
            id: DelegationId::new(1),
            delegator: AccountId::new("alice"),
            delegate: AccountId::new("bob"),
            kind,
            amount,
            percentage,
            start_time: Timestamp::new(100),
            end_time: None,
            metadata: DelegationMetadata::default(),
        }
    }

    #[test]
    fn committed_power_by_kind() {
        assert_eq!(record(DelegationKind::Full, 0, 0).committed_power(1000), 1000);
        assert_eq!(record(DelegationKind::Partial, 250, 0).committed_power(1000), 250);
        assert_eq!(
            record(DelegationKind::Percentage, 0, 30).committed_power(1000),
            300
        );
    }

    #[test]
    fn inactive_until_lock_elapses() {
        let d = record(DelegationKind::Full, 0, 0);
        assert!(!d.is_active(60, Timestamp::new(100)));
        assert!(!d.is_active(60, Timestamp::new(159)));
        assert!(d.is_active(60, Timestamp::new(160)));
    }

    #[test]
    fn revoked_is_never_active() {
        let mut d = record(DelegationKind::Full, 0, 0);
        d.end_time = Some(Timestamp::new(200));
        assert!(!d.is_active(0, Timestamp::new(300)));
    }
}
