//! Validation item state machine and the finalization verdict.
//!
//! An item moves `Pending → {Validated, Rejected}` and never leaves a
//! terminal state. The verdict evaluation order is load-bearing:
//! participation first, then minority protection, then the veto, then the
//! plain weighted majority. Reordering these produces different outcomes.

use crate::config::ValidatorConfig;
use crate::error::ConsensusError;
use crate::roles::Role;
use concord_types::{AccountId, DecisionId, ItemId, Timestamp};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Lifecycle state of a submitted item.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ValidationStatus {
    /// Awaiting votes; periodic quorum checks are running.
    Pending,
    /// Accepted by weighted consensus. Terminal.
    Validated,
    /// Rejected (failed quorum, vetoed, or outvoted). Terminal.
    Rejected,
}

/// One voter's recorded contribution.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct VoterRecord {
    pub support: bool,
    /// Power counted for this voter, after role caps.
    pub power: u128,
    pub role: Role,
    pub voted_at: Timestamp,
}

/// Accumulated weighted votes for an item.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct VoteTally {
    pub power_for: u128,
    pub power_against: u128,
    /// Each voter appears at most once.
    pub voters: HashMap<AccountId, VoterRecord>,
}

impl VoteTally {
    /// Total power cast on either side.
    pub fn total(&self) -> u128 {
        self.power_for.saturating_add(self.power_against)
    }

    /// The losing side's power.
    pub fn minority(&self) -> u128 {
        self.power_for.min(self.power_against)
    }

    /// The losing side's share of the total, in whole percent (0 when no
    /// votes were cast).
    pub fn minority_pct(&self) -> u128 {
        let total = self.total();
        if total == 0 {
            0
        } else {
            self.minority().saturating_mul(100) / total
        }
    }
}

/// The verdict for a closed voting window.
///
/// Evaluation order (fixed):
/// 1. quorum not reached, or fewer distinct voters than
///    `min_votes_required` → rejected;
/// 2. minority share strictly below `minority_protection_pct` → a
///    two-thirds supermajority decides;
/// 3. minority strictly above `veto_power_pct` of the total → rejected;
/// 4. otherwise the plain weighted majority decides.
pub fn decide(
    tally: &VoteTally,
    quorum_reached: bool,
    config: &ValidatorConfig,
) -> ValidationStatus {
    let total = tally.total();
    let minority_pct = tally.minority_pct();

    if !quorum_reached || (tally.voters.len() as u32) < config.min_votes_required {
        return ValidationStatus::Rejected;
    }

    if minority_pct < config.minority_protection_pct as u128 {
        // The losing side is too small to count as a meaningful minority;
        // a bare thin majority must not decide such a low-diversity
        // outcome, so the bar rises to two thirds.
        let for_pct = if total == 0 {
            0
        } else {
            tally.power_for.saturating_mul(100) / total
        };
        return if for_pct >= 66 {
            ValidationStatus::Validated
        } else {
            ValidationStatus::Rejected
        };
    }

    let veto_threshold = total.saturating_mul(config.veto_power_pct as u128) / 100;
    if tally.minority() > veto_threshold {
        return ValidationStatus::Rejected;
    }

    if tally.power_for > tally.power_against {
        ValidationStatus::Validated
    } else {
        ValidationStatus::Rejected
    }
}

/// A submitted item moving through validation.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ValidationItem {
    pub id: ItemId,
    pub submitted_at: Timestamp,
    pub payload: serde_json::Value,
    pub source: String,
    pub status: ValidationStatus,
    pub tally: VoteTally,
    /// The decision id this item's quorum state is tracked under.
    pub linked_decision: DecisionId,
}

impl ValidationItem {
    pub fn new(id: ItemId, payload: serde_json::Value, source: &str, now: Timestamp) -> Self {
        let linked_decision = id.decision();
        Self {
            id,
            submitted_at: now,
            payload,
            source: source.to_string(),
            status: ValidationStatus::Pending,
            tally: VoteTally::default(),
            linked_decision,
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.status != ValidationStatus::Pending
    }

    /// Whether the voting window has elapsed.
    pub fn window_expired(&self, validation_period_secs: u64, now: Timestamp) -> bool {
        self.submitted_at.has_expired(validation_period_secs, now)
    }

    /// Record a vote with already-capped power.
    ///
    /// The tally is untouched on any error, so a rejected vote can never
    /// leak partial weight into the totals.
    pub fn record_vote(
        &mut self,
        voter: &AccountId,
        role: Role,
        power: u128,
        support: bool,
        now: Timestamp,
    ) -> Result<(), ConsensusError> {
        if self.is_terminal() {
            return Err(ConsensusError::ItemNotPending {
                id: self.id.clone(),
                status: self.status,
            });
        }
        if self.tally.voters.contains_key(voter) {
            return Err(ConsensusError::AlreadyVoted {
                voter: voter.clone(),
            });
        }
        if power == 0 {
            return Err(ConsensusError::NoVotingPower {
                voter: voter.clone(),
            });
        }
        if support {
            self.tally.power_for = self.tally.power_for.saturating_add(power);
        } else {
            self.tally.power_against = self.tally.power_against.saturating_add(power);
        }
        self.tally.voters.insert(
            voter.clone(),
            VoterRecord {
                support,
                power,
                role,
                voted_at: now,
            },
        );
        Ok(())
    }

    /// Close the item with the verdict for the final quorum snapshot.
    /// A second call on a terminal item returns the existing status.
    pub fn finalize(&mut self, quorum_reached: bool, config: &ValidatorConfig) -> ValidationStatus {
        if self.is_terminal() {
            return self.status;
        }
        self.status = decide(&self.tally, quorum_reached, config);
        self.status
    }
}
