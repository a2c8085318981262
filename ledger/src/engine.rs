//! Delegation ledger — delegation records and voting-power arithmetic.
//!
//! The ledger keeps the authoritative in-memory record set with a forward
//! index by delegator, writes every mutation through to the injected
//! [`DelegationStore`], and can snapshot/restore its whole state for the
//! meta store.
//!
//! Effective power is `base − delegated away + received`, where received
//! contributions follow the recipient's own full-delegation chain (a full
//! delegation hands off everything its holder controls). Chains are walked
//! with cycle detection and a hop limit so resolution always terminates.

use crate::config::DelegationConfig;
use crate::delegation::{Delegation, DelegationKind, DelegationMetadata};
use crate::error::LedgerError;
use crate::provider::IdentityProvider;
use concord_store::{DelegationStore, StoreError};
use concord_types::{AccountId, DelegationId, Timestamp};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

/// Meta-store key used for persisting the ledger snapshot.
const LEDGER_META_KEY: &str = "delegation_ledger_state";

/// The delegation and voting-power ledger.
pub struct DelegationLedger {
    config: DelegationConfig,
    provider: Arc<dyn IdentityProvider>,
    store: Arc<dyn DelegationStore>,
    /// All records ever created, revoked ones included (audit retention).
    delegations: HashMap<DelegationId, Delegation>,
    /// Delegator → ids of their delegations.
    by_delegator: HashMap<AccountId, Vec<DelegationId>>,
    /// Most recent revocation per delegator, for cooldown enforcement.
    last_revoked: HashMap<AccountId, Timestamp>,
    /// Next delegation id to assign; `pub` so the relocated integration test
    /// can assert the counter survives a snapshot round-trip.
    pub next_id: u64,
}

/// Serializable snapshot of the ledger state.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct LedgerSnapshot {
    pub delegations: Vec<Delegation>,
    pub last_revoked: HashMap<AccountId, Timestamp>,
    pub next_id: u64,
}

impl DelegationLedger {
    pub fn new(
        config: DelegationConfig,
        provider: Arc<dyn IdentityProvider>,
        store: Arc<dyn DelegationStore>,
    ) -> Result<Self, LedgerError> {
        config.validate()?;
        Ok(Self {
            config,
            provider,
            store,
            delegations: HashMap::new(),
            by_delegator: HashMap::new(),
            last_revoked: HashMap::new(),
            next_id: 1,
        })
    }

    /// Create a delegation from `delegator` to `delegate`.
    ///
    /// The new record transfers no power until the lock period elapses.
    pub fn create_delegation(
        &mut self,
        delegator: &AccountId,
        delegate: &AccountId,
        kind: DelegationKind,
        amount: u128,
        percentage: u8,
        metadata: DelegationMetadata,
        now: Timestamp,
    ) -> Result<DelegationId, LedgerError> {
        if delegator == delegate {
            return Err(LedgerError::SelfDelegation);
        }
        if let Some(revoked_at) = self.last_revoked.get(delegator) {
            if !revoked_at.has_expired(self.config.cooldown_period_secs, now) {
                let remaining = revoked_at
                    .as_secs()
                    .saturating_add(self.config.cooldown_period_secs)
                    .saturating_sub(now.as_secs());
                return Err(LedgerError::CooldownActive {
                    delegator: delegator.clone(),
                    remaining_secs: remaining,
                });
            }
        }
        let have = self.open_delegation_count(delegator);
        if have >= self.config.max_delegations_per_address {
            return Err(LedgerError::TooManyDelegations {
                delegator: delegator.clone(),
                have,
                max: self.config.max_delegations_per_address,
            });
        }
        self.check_bounds(kind, amount, percentage)?;
        self.check_commitments(delegator, kind, amount, percentage, None)?;

        let id = DelegationId::new(self.next_id);
        self.next_id += 1;
        let record = Delegation {
            id,
            delegator: delegator.clone(),
            delegate: delegate.clone(),
            kind,
            amount,
            percentage,
            start_time: now,
            end_time: None,
            metadata,
        };
        self.persist(&record)?;
        self.by_delegator
            .entry(delegator.clone())
            .or_default()
            .push(id);
        self.delegations.insert(id, record);
        tracing::debug!(%id, %delegator, %delegate, ?kind, "delegation created");
        Ok(id)
    }

    /// Change an existing delegation's kind, amount, or percentage.
    ///
    /// The lock period restarts: the changed commitment transfers no power
    /// until it elapses again. Only the original delegator may update.
    pub fn update_delegation(
        &mut self,
        id: DelegationId,
        delegator: &AccountId,
        kind: DelegationKind,
        amount: u128,
        percentage: u8,
        now: Timestamp,
    ) -> Result<(), LedgerError> {
        match self.delegations.get(&id) {
            None => return Err(LedgerError::DelegationNotFound(id)),
            Some(d) if d.is_revoked() => return Err(LedgerError::DelegationNotFound(id)),
            Some(d) if &d.delegator != delegator => {
                return Err(LedgerError::NotDelegator {
                    id,
                    account: delegator.clone(),
                })
            }
            Some(_) => {}
        }
        self.check_bounds(kind, amount, percentage)?;
        self.check_commitments(delegator, kind, amount, percentage, Some(id))?;

        let record = self.delegations.get_mut(&id).expect("checked above");
        record.kind = kind;
        record.amount = amount;
        record.percentage = percentage;
        record.start_time = now;
        let record = record.clone();
        self.persist(&record)?;
        tracing::debug!(%id, %delegator, ?kind, "delegation updated");
        Ok(())
    }

    /// Revoke a delegation. Irreversible; the record is kept for audit.
    pub fn revoke_delegation(
        &mut self,
        id: DelegationId,
        delegator: &AccountId,
        now: Timestamp,
    ) -> Result<(), LedgerError> {
        match self.delegations.get(&id) {
            None => return Err(LedgerError::DelegationNotFound(id)),
            Some(d) if d.is_revoked() => return Err(LedgerError::DelegationNotFound(id)),
            Some(d) if &d.delegator != delegator => {
                return Err(LedgerError::NotDelegator {
                    id,
                    account: delegator.clone(),
                })
            }
            Some(_) => {}
        }
        let record = self.delegations.get_mut(&id).expect("checked above");
        record.end_time = Some(now);
        let record = record.clone();
        self.persist(&record)?;
        self.last_revoked.insert(delegator.clone(), now);
        tracing::debug!(%id, %delegator, "delegation revoked");
        Ok(())
    }

    /// Base power minus power delegated away, plus power received through
    /// active delegations.
    pub fn effective_voting_power(&self, account: &AccountId, now: Timestamp) -> u128 {
        self.available_voting_power(account, now)
            .saturating_add(self.inbound_power(account, now))
    }

    /// Power this account has delegated away through active delegations.
    pub fn delegated_voting_power(&self, account: &AccountId, now: Timestamp) -> u128 {
        self.outbound_power(account, now)
    }

    /// Base power not currently committed to anyone else.
    pub fn available_voting_power(&self, account: &AccountId, now: Timestamp) -> u128 {
        self.provider
            .base_voting_power(account)
            .saturating_sub(self.outbound_power(account, now))
    }

    /// Look up a delegation record, revoked ones included.
    pub fn delegation(&self, id: DelegationId) -> Option<&Delegation> {
        self.delegations.get(&id)
    }

    /// All of an account's delegation records, revoked ones included.
    pub fn delegations_for(&self, delegator: &AccountId) -> Vec<&Delegation> {
        self.by_delegator
            .get(delegator)
            .map(|ids| ids.iter().filter_map(|id| self.delegations.get(id)).collect())
            .unwrap_or_default()
    }

    fn outbound_power(&self, account: &AccountId, now: Timestamp) -> u128 {
        let base = self.provider.base_voting_power(account);
        self.active_outbound(account, now)
            .map(|d| d.committed_power(base))
            .sum()
    }

    fn inbound_power(&self, account: &AccountId, now: Timestamp) -> u128 {
        self.delegations
            .values()
            .filter(|d| d.is_active(self.config.lock_period_secs, now))
            .filter(|d| &self.resolve_recipient(&d.delegate, now) == account)
            .map(|d| d.committed_power(self.provider.base_voting_power(&d.delegator)))
            .sum()
    }

    /// Follow `delegate`'s chain of active full delegations to the account
    /// that finally holds the power.
    ///
    /// The walk is bounded by `max_delegations_per_address` hops with a
    /// visited set; a cycle or an over-long chain leaves the contribution
    /// with the direct delegate so power is never dropped.
    fn resolve_recipient(&self, delegate: &AccountId, now: Timestamp) -> AccountId {
        let mut current = delegate.clone();
        let mut visited = HashSet::new();
        for _ in 0..=self.config.max_delegations_per_address {
            if !visited.insert(current.clone()) {
                return delegate.clone(); // cycle
            }
            let next = self
                .active_outbound(&current, now)
                .find(|d| d.kind == DelegationKind::Full)
                .map(|d| d.delegate.clone());
            match next {
                Some(next_account) => current = next_account,
                None => return current,
            }
        }
        delegate.clone() // hop limit exceeded
    }

    fn active_outbound<'a>(
        &'a self,
        account: &AccountId,
        now: Timestamp,
    ) -> impl Iterator<Item = &'a Delegation> + 'a {
        let lock = self.config.lock_period_secs;
        self.by_delegator
            .get(account)
            .into_iter()
            .flatten()
            .filter_map(|id| self.delegations.get(id))
            .filter(move |d| d.is_active(lock, now))
    }

    /// Count of un-revoked delegations, lock state regardless: a record in
    /// its lock window already occupies a slot and commits power.
    fn open_delegation_count(&self, account: &AccountId) -> usize {
        self.by_delegator
            .get(account)
            .map(|ids| {
                ids.iter()
                    .filter_map(|id| self.delegations.get(id))
                    .filter(|d| !d.is_revoked())
                    .count()
            })
            .unwrap_or(0)
    }

    fn check_bounds(
        &self,
        kind: DelegationKind,
        amount: u128,
        percentage: u8,
    ) -> Result<(), LedgerError> {
        match kind {
            DelegationKind::Partial | DelegationKind::Percentage => {
                if amount < self.config.min_delegation_amount {
                    return Err(LedgerError::AmountBelowMinimum {
                        amount,
                        min: self.config.min_delegation_amount,
                    });
                }
            }
            DelegationKind::Full => {}
        }
        if kind == DelegationKind::Percentage && percentage > self.config.max_delegation_percentage
        {
            return Err(LedgerError::PercentageAboveMaximum {
                percentage,
                max: self.config.max_delegation_percentage,
            });
        }
        Ok(())
    }

    /// Aggregate-commitment check: outbound delegations must never commit
    /// more than 100% of base power (percentage) nor more than the held
    /// balance (partial/full). A full delegation counts against both.
    fn check_commitments(
        &self,
        delegator: &AccountId,
        kind: DelegationKind,
        amount: u128,
        percentage: u8,
        exclude: Option<DelegationId>,
    ) -> Result<(), LedgerError> {
        let mut pct_total: u32 = 0;
        let mut amt_total: u128 = 0;
        let base = self.provider.base_voting_power(delegator);
        for d in self
            .by_delegator
            .get(delegator)
            .into_iter()
            .flatten()
            .filter_map(|id| self.delegations.get(id))
            .filter(|d| !d.is_revoked() && Some(d.id) != exclude)
        {
            match d.kind {
                DelegationKind::Percentage => pct_total += d.percentage as u32,
                DelegationKind::Partial => amt_total = amt_total.saturating_add(d.amount),
                DelegationKind::Full => {
                    pct_total += 100;
                    amt_total = amt_total.saturating_add(base);
                }
            }
        }
        match kind {
            DelegationKind::Percentage => {
                let total = pct_total + percentage as u32;
                if total > 100 {
                    return Err(LedgerError::PercentageOvercommitted { total });
                }
            }
            DelegationKind::Partial => {
                let committed = amt_total.saturating_add(amount);
                if committed > base {
                    return Err(LedgerError::AmountOvercommitted {
                        committed,
                        balance: base,
                    });
                }
            }
            DelegationKind::Full => {
                if pct_total > 0 {
                    return Err(LedgerError::PercentageOvercommitted {
                        total: pct_total + 100,
                    });
                }
                if amt_total > 0 {
                    return Err(LedgerError::AmountOvercommitted {
                        committed: amt_total.saturating_add(base),
                        balance: base,
                    });
                }
            }
        }
        Ok(())
    }

    fn persist(&self, record: &Delegation) -> Result<(), LedgerError> {
        let bytes = bincode::serialize(record)
            .map_err(|e| StoreError::Serialization(e.to_string()))?;
        self.store.put_delegation(record.id, &bytes)?;
        Ok(())
    }

    /// Serialize the full ledger state for the meta store.
    pub fn save_state(&self) -> Vec<u8> {
        let snapshot = LedgerSnapshot {
            delegations: self.delegations.values().cloned().collect(),
            last_revoked: self.last_revoked.clone(),
            next_id: self.next_id,
        };
        bincode::serialize(&snapshot).unwrap_or_default()
    }

    /// Restore a ledger from a snapshot produced by [`save_state`].
    ///
    /// [`save_state`]: DelegationLedger::save_state
    pub fn load_state(
        data: &[u8],
        config: DelegationConfig,
        provider: Arc<dyn IdentityProvider>,
        store: Arc<dyn DelegationStore>,
    ) -> Result<Self, LedgerError> {
        config.validate()?;
        let snapshot: LedgerSnapshot = bincode::deserialize(data)
            .map_err(|e| StoreError::Serialization(e.to_string()))?;
        let mut by_delegator: HashMap<AccountId, Vec<DelegationId>> = HashMap::new();
        let mut delegations = HashMap::new();
        for record in snapshot.delegations {
            by_delegator
                .entry(record.delegator.clone())
                .or_default()
                .push(record.id);
            delegations.insert(record.id, record);
        }
        Ok(Self {
            config,
            provider,
            store,
            delegations,
            by_delegator,
            last_revoked: snapshot.last_revoked,
            next_id: snapshot.next_id,
        })
    }

    /// The meta-store key used for ledger persistence.
    pub fn meta_key() -> &'static str {
        LEDGER_META_KEY
    }
}

