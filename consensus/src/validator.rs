//! Consensus validator — coordinates items, quorum states, and role caps.
//!
//! The validator owns every live [`ValidationItem`] keyed by id, routes
//! capped votes into the right tally, and drives the periodic check that
//! eventually finalizes each item. It is a synchronous state machine: the
//! node crate supplies the clock, the voter's effective power, and the
//! scheduling of [`ConsensusValidator::check`].

use crate::config::ValidatorConfig;
use crate::error::ConsensusError;
use crate::quorum::{QuorumConfig, QuorumStatus, QuorumTracker};
use crate::roles::{Role, RoleCaps};
use crate::validation::{ValidationItem, ValidationStatus};
use concord_types::{AccountId, ItemId, Timestamp};

/// Result of one periodic check on an item.
#[derive(Clone, Debug)]
pub enum CheckOutcome {
    /// The window is still open; the latest quorum snapshot is attached.
    Progress(QuorumStatus),
    /// The window closed and the item was finalized on this check.
    Finalized {
        status: ValidationStatus,
        quorum: QuorumStatus,
    },
    /// The item was already terminal before this check ran.
    AlreadyFinal(ValidationStatus),
}

/// The consensus validator engine.
pub struct ConsensusValidator {
    config: ValidatorConfig,
    caps: RoleCaps,
    quorum: QuorumTracker,
    items: std::collections::HashMap<ItemId, ValidationItem>,
    next_seq: u64,
}

impl ConsensusValidator {
    pub fn new(
        config: ValidatorConfig,
        quorum_config: QuorumConfig,
    ) -> Result<Self, ConsensusError> {
        config.validate()?;
        let caps = RoleCaps::from_config(&config);
        Ok(Self {
            config,
            caps,
            quorum: QuorumTracker::new(quorum_config)?,
            items: std::collections::HashMap::new(),
            next_seq: 1,
        })
    }

    pub fn config(&self) -> &ValidatorConfig {
        &self.config
    }

    /// Accept a new item for validation.
    ///
    /// `total_power` is the sum of eligible base power at this instant; it
    /// is floored by `required_voting_power` before becoming the quorum
    /// denominator, so a near-empty population cannot trivialize quorum.
    pub fn submit(
        &mut self,
        payload: serde_json::Value,
        source: &str,
        total_power: u128,
        now: Timestamp,
    ) -> Result<ItemId, ConsensusError> {
        let id = ItemId::new(format!("item-{}", self.next_seq));
        self.next_seq += 1;

        let total = total_power.max(self.config.required_voting_power);
        self.quorum.initialize(
            &id.decision(),
            total,
            self.config.validation_period_secs,
            now,
        )?;
        let item = ValidationItem::new(id.clone(), payload, source, now);
        self.items.insert(id.clone(), item);
        Ok(id)
    }

    /// Re-admit a pending item persisted before a restart.
    ///
    /// Its quorum window resumes from the original submission time and the
    /// already-cast power is restored.
    pub fn resume(
        &mut self,
        item: ValidationItem,
        total_power: u128,
    ) -> Result<(), ConsensusError> {
        let total = total_power.max(self.config.required_voting_power);
        self.quorum.initialize(
            &item.linked_decision,
            total,
            self.config.validation_period_secs,
            item.submitted_at,
        )?;
        self.quorum.update(&item.linked_decision, item.tally.total())?;
        let seq = item
            .id
            .as_str()
            .strip_prefix("item-")
            .and_then(|s| s.parse::<u64>().ok());
        if let Some(seq) = seq {
            self.next_seq = self.next_seq.max(seq + 1);
        }
        self.items.insert(item.id.clone(), item);
        Ok(())
    }

    /// Cast a vote with the voter's effective power; the role cap is
    /// applied here.
    ///
    /// Returns the capped power actually counted.
    pub fn cast_vote(
        &mut self,
        id: &ItemId,
        voter: &AccountId,
        role: Role,
        effective_power: u128,
        support: bool,
        now: Timestamp,
    ) -> Result<u128, ConsensusError> {
        let item = self
            .items
            .get_mut(id)
            .ok_or_else(|| ConsensusError::ItemNotFound(id.clone()))?;
        let capped = self.caps.apply(role, effective_power);
        item.record_vote(voter, role, capped, support, now)?;
        self.quorum.update(&item.linked_decision, item.tally.total())?;
        Ok(capped)
    }

    /// One periodic check: refresh the quorum snapshot and, once the
    /// window has elapsed, finalize from that snapshot.
    ///
    /// The quorum state is dropped on finalization; the item itself is
    /// retained for reads.
    pub fn check(&mut self, id: &ItemId, now: Timestamp) -> Result<CheckOutcome, ConsensusError> {
        let item = self
            .items
            .get_mut(id)
            .ok_or_else(|| ConsensusError::ItemNotFound(id.clone()))?;
        if item.is_terminal() {
            return Ok(CheckOutcome::AlreadyFinal(item.status));
        }
        let quorum = self.quorum.status(&item.linked_decision, now)?;
        if item.window_expired(self.config.validation_period_secs, now) {
            let status = item.finalize(quorum.is_quorum_reached, &self.config);
            self.quorum.remove(&item.linked_decision);
            Ok(CheckOutcome::Finalized { status, quorum })
        } else {
            Ok(CheckOutcome::Progress(quorum))
        }
    }

    pub fn item(&self, id: &ItemId) -> Option<&ValidationItem> {
        self.items.get(id)
    }

    /// Latest quorum report for a pending item.
    pub fn quorum_status(
        &self,
        id: &ItemId,
        now: Timestamp,
    ) -> Result<QuorumStatus, ConsensusError> {
        let item = self
            .items
            .get(id)
            .ok_or_else(|| ConsensusError::ItemNotFound(id.clone()))?;
        self.quorum.status(&item.linked_decision, now)
    }

    /// Ids of all items still awaiting a verdict.
    pub fn pending_ids(&self) -> Vec<ItemId> {
        self.items
            .values()
            .filter(|item| !item.is_terminal())
            .map(|item| item.id.clone())
            .collect()
    }

    pub fn item_count(&self) -> usize {
        self.items.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn acct(name: &str) -> AccountId {
        AccountId::new(name)
    }

    fn ts(secs: u64) -> Timestamp {
        Timestamp::new(secs)
    }

    fn quorum_config() -> QuorumConfig {
        QuorumConfig {
            min_quorum_pct: 10,
            max_quorum_pct: 50,
            growth_rate_pct: 5,
            growth_period_secs: 100,
            min_voting_period_secs: 10,
            max_voting_period_secs: 100_000,
        }
    }

    fn validator(config: ValidatorConfig) -> ConsensusValidator {
        ConsensusValidator::new(config, quorum_config()).unwrap()
    }

    fn permissive_config() -> ValidatorConfig {
        ValidatorConfig {
            check_interval_secs: 10,
            required_voting_power: 1,
            validation_period_secs: 1_000,
            min_votes_required: 1,
            max_admin_voting_power: 100,
            max_delegate_voting_power: 500,
            minority_protection_pct: 0,
            veto_power_pct: 100,
        }
    }

    #[test]
    fn submit_assigns_sequential_ids_and_tracks_quorum() {
        let mut v = validator(permissive_config());
        let a = v.submit(json!({"n": 1}), "relay", 10_000, ts(0)).unwrap();
        let b = v.submit(json!({"n": 2}), "relay", 10_000, ts(1)).unwrap();

        assert_eq!(a.as_str(), "item-1");
        assert_eq!(b.as_str(), "item-2");
        assert_eq!(v.item_count(), 2);
        assert!(v.quorum_status(&a, ts(2)).is_ok());
        assert_eq!(v.pending_ids().len(), 2);
    }

    #[test]
    fn total_power_floored_by_required_voting_power() {
        let mut v = validator(ValidatorConfig {
            required_voting_power: 5_000,
            ..permissive_config()
        });
        let id = v.submit(json!({}), "relay", 100, ts(0)).unwrap();
        let status = v.quorum_status(&id, ts(0)).unwrap();
        assert_eq!(status.total_voting_power, 5_000);
    }

    #[test]
    fn vote_on_unknown_item_not_found() {
        let mut v = validator(permissive_config());
        let err = v
            .cast_vote(&ItemId::new("item-9"), &acct("a"), Role::Member, 100, true, ts(0))
            .unwrap_err();
        assert!(matches!(err, ConsensusError::ItemNotFound(_)));
    }

    #[test]
    fn role_caps_applied_on_vote() {
        let mut v = validator(permissive_config());
        let id = v.submit(json!({}), "relay", 10_000, ts(0)).unwrap();

        let counted = v
            .cast_vote(&id, &acct("admin"), Role::Admin, 2_000, true, ts(1))
            .unwrap();
        assert_eq!(counted, 100);
        let counted = v
            .cast_vote(&id, &acct("delegate"), Role::Delegate, 2_000, true, ts(2))
            .unwrap();
        assert_eq!(counted, 500);
        let counted = v
            .cast_vote(&id, &acct("member"), Role::Member, 2_000, true, ts(3))
            .unwrap();
        assert_eq!(counted, 2_000);

        let status = v.quorum_status(&id, ts(4)).unwrap();
        assert_eq!(status.current_voting_power, 2_600);
    }

    #[test]
    fn capped_to_zero_vote_rejected() {
        let mut v = validator(ValidatorConfig {
            max_admin_voting_power: 0,
            ..permissive_config()
        });
        let id = v.submit(json!({}), "relay", 10_000, ts(0)).unwrap();
        let err = v
            .cast_vote(&id, &acct("admin"), Role::Admin, 2_000, true, ts(1))
            .unwrap_err();
        assert!(matches!(err, ConsensusError::NoVotingPower { .. }));
    }

    #[test]
    fn check_reports_progress_until_window_closes() {
        let mut v = validator(permissive_config());
        let id = v.submit(json!({}), "relay", 1_000, ts(0)).unwrap();
        v.cast_vote(&id, &acct("a"), Role::Member, 600, true, ts(1)).unwrap();

        match v.check(&id, ts(500)).unwrap() {
            CheckOutcome::Progress(q) => assert!(q.is_quorum_reached),
            other => panic!("expected Progress, got {other:?}"),
        }
        assert_eq!(v.item(&id).unwrap().status, ValidationStatus::Pending);

        match v.check(&id, ts(1_000)).unwrap() {
            CheckOutcome::Finalized { status, .. } => {
                assert_eq!(status, ValidationStatus::Validated)
            }
            other => panic!("expected Finalized, got {other:?}"),
        }
        // Quorum state is scoped to the decision's lifetime.
        assert!(v.quorum_status(&id, ts(1_001)).is_err());
        // The item itself is retained for reads.
        assert_eq!(v.item(&id).unwrap().status, ValidationStatus::Validated);
        assert!(v.pending_ids().is_empty());
    }

    #[test]
    fn check_after_finalize_is_already_final() {
        let mut v = validator(permissive_config());
        let id = v.submit(json!({}), "relay", 1_000, ts(0)).unwrap();
        v.cast_vote(&id, &acct("a"), Role::Member, 600, true, ts(1)).unwrap();
        v.check(&id, ts(1_000)).unwrap();

        match v.check(&id, ts(1_010)).unwrap() {
            CheckOutcome::AlreadyFinal(status) => {
                assert_eq!(status, ValidationStatus::Validated)
            }
            other => panic!("expected AlreadyFinal, got {other:?}"),
        }
    }

    #[test]
    fn vote_after_finalization_is_state_error() {
        let mut v = validator(permissive_config());
        let id = v.submit(json!({}), "relay", 1_000, ts(0)).unwrap();
        v.cast_vote(&id, &acct("a"), Role::Member, 600, true, ts(1)).unwrap();
        v.check(&id, ts(1_000)).unwrap();

        let err = v
            .cast_vote(&id, &acct("b"), Role::Member, 400, false, ts(1_001))
            .unwrap_err();
        assert!(matches!(err, ConsensusError::ItemNotPending { .. }));
        assert_eq!(v.item(&id).unwrap().tally.power_for, 600);
        assert_eq!(v.item(&id).unwrap().tally.power_against, 0);
    }

    #[test]
    fn silent_window_rejects_on_expiry() {
        let mut v = validator(permissive_config());
        let id = v.submit(json!({}), "relay", 1_000, ts(0)).unwrap();

        // No votes: quorum unreached at expiry → rejected.
        match v.check(&id, ts(1_000)).unwrap() {
            CheckOutcome::Finalized { status, .. } => {
                assert_eq!(status, ValidationStatus::Rejected)
            }
            other => panic!("expected Finalized, got {other:?}"),
        }
    }

    #[test]
    fn decisions_finalize_independently() {
        let mut v = validator(permissive_config());
        let a = v.submit(json!({}), "relay", 1_000, ts(0)).unwrap();
        let b = v.submit(json!({}), "relay", 1_000, ts(500)).unwrap();
        v.cast_vote(&a, &acct("x"), Role::Member, 600, true, ts(1)).unwrap();
        v.cast_vote(&b, &acct("x"), Role::Member, 600, false, ts(501)).unwrap();

        match v.check(&a, ts(1_000)).unwrap() {
            CheckOutcome::Finalized { status, .. } => {
                assert_eq!(status, ValidationStatus::Validated)
            }
            other => panic!("expected Finalized, got {other:?}"),
        }
        // b's window is still open and unaffected by a's finalization.
        assert!(matches!(
            v.check(&b, ts(1_000)).unwrap(),
            CheckOutcome::Progress(_)
        ));
        match v.check(&b, ts(1_500)).unwrap() {
            CheckOutcome::Finalized { status, .. } => {
                assert_eq!(status, ValidationStatus::Rejected)
            }
            other => panic!("expected Finalized, got {other:?}"),
        }
    }

    #[test]
    fn resume_restores_pending_item_and_sequence() {
        let mut v = validator(permissive_config());
        let id = v.submit(json!({"n": 1}), "relay", 1_000, ts(0)).unwrap();
        v.cast_vote(&id, &acct("a"), Role::Member, 600, true, ts(1)).unwrap();
        let persisted = v.item(&id).unwrap().clone();

        let mut restarted = validator(permissive_config());
        restarted.resume(persisted, 1_000).unwrap();

        // The window still ends relative to the original submission time.
        match restarted.check(&id, ts(1_000)).unwrap() {
            CheckOutcome::Finalized { status, .. } => {
                assert_eq!(status, ValidationStatus::Validated)
            }
            other => panic!("expected Finalized, got {other:?}"),
        }
        // New submissions never reuse a restored id.
        let next = restarted.submit(json!({"n": 2}), "relay", 1_000, ts(1_001)).unwrap();
        assert_eq!(next.as_str(), "item-2");
    }
}
