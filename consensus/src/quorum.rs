//! Quorum tracking — a participation requirement that grows with time.
//!
//! Each decision gets a [`QuorumState`] capturing the total eligible voting
//! power at initialization. The required quorum starts at
//! `min_quorum_pct` and rises by `growth_rate_pct` every
//! `growth_period_secs`, clamped to `max_quorum_pct`. The deliberately
//! lower early bar lets clearly popular outcomes through while a
//! last-minute low-turnout validation faces the full requirement.

use crate::error::ConsensusError;
use concord_types::{DecisionId, Timestamp};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Quorum policy, supplied once at construction.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct QuorumConfig {
    /// Required participation at the start of a window, in percent.
    pub min_quorum_pct: u32,
    /// Ceiling the requirement grows towards, in percent.
    pub max_quorum_pct: u32,
    /// Percentage points added per growth period.
    pub growth_rate_pct: u32,
    /// Seconds per growth step.
    pub growth_period_secs: u64,
    /// Shortest voting window a decision may be given.
    pub min_voting_period_secs: u64,
    /// Longest voting window a decision may be given.
    pub max_voting_period_secs: u64,
}

impl QuorumConfig {
    /// Pure predicate rejecting inconsistent quorum policies.
    pub fn validate(&self) -> Result<(), ConsensusError> {
        if self.min_quorum_pct > self.max_quorum_pct {
            return Err(ConsensusError::InvalidConfig(format!(
                "min_quorum_pct {} exceeds max_quorum_pct {}",
                self.min_quorum_pct, self.max_quorum_pct
            )));
        }
        if self.max_quorum_pct > 100 {
            return Err(ConsensusError::InvalidConfig(format!(
                "max_quorum_pct {} exceeds 100",
                self.max_quorum_pct
            )));
        }
        if self.min_voting_period_secs > self.max_voting_period_secs {
            return Err(ConsensusError::InvalidConfig(format!(
                "min_voting_period_secs {} exceeds max_voting_period_secs {}",
                self.min_voting_period_secs, self.max_voting_period_secs
            )));
        }
        if self.growth_period_secs == 0 {
            return Err(ConsensusError::InvalidConfig(
                "growth_period_secs must be positive".into(),
            ));
        }
        Ok(())
    }
}

impl Default for QuorumConfig {
    fn default() -> Self {
        Self {
            min_quorum_pct: 10,
            max_quorum_pct: 50,
            growth_rate_pct: 5,
            growth_period_secs: 3_600,
            min_voting_period_secs: 3_600,
            max_voting_period_secs: 7 * 86_400,
        }
    }
}

/// Per-decision quorum state. Lives exactly as long as the decision and is
/// never persisted.
#[derive(Clone, Debug)]
pub struct QuorumState {
    pub current_power: u128,
    pub total_power: u128,
    pub start_time: Timestamp,
    pub voting_period_secs: u64,
}

/// Point-in-time answer to "has this decision reached quorum?".
#[derive(Clone, Debug)]
pub struct QuorumStatus {
    pub current_quorum: u128,
    pub required_quorum: u128,
    pub total_voting_power: u128,
    pub current_voting_power: u128,
    pub quorum_percentage: f64,
    pub is_quorum_reached: bool,
    pub time_remaining_secs: u64,
}

/// Tracks quorum state for all live decisions.
pub struct QuorumTracker {
    config: QuorumConfig,
    states: HashMap<DecisionId, QuorumState>,
}

impl QuorumTracker {
    pub fn new(config: QuorumConfig) -> Result<Self, ConsensusError> {
        config.validate()?;
        Ok(Self {
            config,
            states: HashMap::new(),
        })
    }

    /// Capture a decision's quorum snapshot: total eligible power and the
    /// window start.
    ///
    /// `voting_period_secs` is clamped into the configured window bounds.
    /// Initializing a decision that is already tracked is a no-op.
    pub fn initialize(
        &mut self,
        decision: &DecisionId,
        total_power: u128,
        voting_period_secs: u64,
        now: Timestamp,
    ) -> Result<(), ConsensusError> {
        if !decision.is_valid() {
            return Err(ConsensusError::EmptyDecisionId);
        }
        if self.states.contains_key(decision) {
            return Ok(());
        }
        let period = voting_period_secs
            .max(self.config.min_voting_period_secs)
            .min(self.config.max_voting_period_secs);
        self.states.insert(
            decision.clone(),
            QuorumState {
                current_power: 0,
                total_power,
                start_time: now,
                voting_period_secs: period,
            },
        );
        Ok(())
    }

    /// Refresh a decision's cast voting power from the latest tally.
    pub fn update(
        &mut self,
        decision: &DecisionId,
        current_power: u128,
    ) -> Result<(), ConsensusError> {
        let state = self
            .states
            .get_mut(decision)
            .ok_or_else(|| ConsensusError::QuorumNotInitialized(decision.clone()))?;
        state.current_power = current_power;
        Ok(())
    }

    /// The participation the decision must reach at this instant.
    pub fn required_quorum(
        &self,
        decision: &DecisionId,
        now: Timestamp,
    ) -> Result<u128, ConsensusError> {
        let state = self.state(decision)?;
        let pct = self.required_pct(state.start_time.elapsed_since(now));
        Ok(state.total_power.saturating_mul(pct as u128) / 100)
    }

    /// The participation cast so far.
    pub fn current_quorum(&self, decision: &DecisionId) -> Result<u128, ConsensusError> {
        Ok(self.state(decision)?.current_power)
    }

    /// Cast power as a percentage of total power (0 when total is 0).
    pub fn quorum_percentage(&self, decision: &DecisionId) -> Result<f64, ConsensusError> {
        let state = self.state(decision)?;
        if state.total_power == 0 {
            return Ok(0.0);
        }
        Ok(state.current_power as f64 / state.total_power as f64 * 100.0)
    }

    /// Full quorum report for a decision.
    pub fn status(
        &self,
        decision: &DecisionId,
        now: Timestamp,
    ) -> Result<QuorumStatus, ConsensusError> {
        let state = self.state(decision)?;
        let required = self.required_quorum(decision, now)?;
        let elapsed = state.start_time.elapsed_since(now);
        Ok(QuorumStatus {
            current_quorum: state.current_power,
            required_quorum: required,
            total_voting_power: state.total_power,
            current_voting_power: state.current_power,
            quorum_percentage: self.quorum_percentage(decision)?,
            is_quorum_reached: state.current_power >= required,
            time_remaining_secs: state.voting_period_secs.saturating_sub(elapsed),
        })
    }

    /// Drop a decision's state once it has been finalized.
    pub fn remove(&mut self, decision: &DecisionId) -> Option<QuorumState> {
        self.states.remove(decision)
    }

    pub fn is_tracked(&self, decision: &DecisionId) -> bool {
        self.states.contains_key(decision)
    }

    pub fn decision_count(&self) -> usize {
        self.states.len()
    }

    fn state(&self, decision: &DecisionId) -> Result<&QuorumState, ConsensusError> {
        self.states
            .get(decision)
            .ok_or_else(|| ConsensusError::QuorumNotInitialized(decision.clone()))
    }

    /// Required percentage after `elapsed` seconds, clamped to the
    /// configured band.
    fn required_pct(&self, elapsed_secs: u64) -> u32 {
        let steps = elapsed_secs / self.config.growth_period_secs;
        let pct = self.config.min_quorum_pct as u64 + self.config.growth_rate_pct as u64 * steps;
        pct.min(self.config.max_quorum_pct as u64) as u32
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn decision(name: &str) -> DecisionId {
        DecisionId::new(name)
    }

    fn ts(secs: u64) -> Timestamp {
        Timestamp::new(secs)
    }

    fn tracker() -> QuorumTracker {
        QuorumTracker::new(QuorumConfig {
            min_quorum_pct: 10,
            max_quorum_pct: 50,
            growth_rate_pct: 5,
            growth_period_secs: 100,
            min_voting_period_secs: 100,
            max_voting_period_secs: 10_000,
        })
        .unwrap()
    }

    #[test]
    fn empty_decision_id_rejected() {
        let mut t = tracker();
        let err = t.initialize(&decision(""), 1_000, 500, ts(0)).unwrap_err();
        assert!(matches!(err, ConsensusError::EmptyDecisionId));
    }

    #[test]
    fn status_before_initialize_not_found() {
        let t = tracker();
        let err = t.status(&decision("d"), ts(0)).unwrap_err();
        assert!(matches!(err, ConsensusError::QuorumNotInitialized(_)));
    }

    #[test]
    fn reinitialize_is_noop() {
        let mut t = tracker();
        t.initialize(&decision("d"), 1_000, 500, ts(0)).unwrap();
        t.update(&decision("d"), 400).unwrap();
        t.initialize(&decision("d"), 9_999, 500, ts(50)).unwrap();

        let status = t.status(&decision("d"), ts(50)).unwrap();
        assert_eq!(status.total_voting_power, 1_000);
        assert_eq!(status.current_voting_power, 400);
    }

    #[test]
    fn requirement_grows_in_steps() {
        let mut t = tracker();
        t.initialize(&decision("d"), 1_000, 500, ts(0)).unwrap();

        // 10% at the start, +5% per 100s step.
        assert_eq!(t.required_quorum(&decision("d"), ts(0)).unwrap(), 100);
        assert_eq!(t.required_quorum(&decision("d"), ts(99)).unwrap(), 100);
        assert_eq!(t.required_quorum(&decision("d"), ts(100)).unwrap(), 150);
        assert_eq!(t.required_quorum(&decision("d"), ts(250)).unwrap(), 200);
    }

    #[test]
    fn requirement_clamped_at_maximum() {
        let mut t = tracker();
        t.initialize(&decision("d"), 1_000, 500, ts(0)).unwrap();

        // 8 steps would give 50%; far beyond, still 50%.
        assert_eq!(t.required_quorum(&decision("d"), ts(800)).unwrap(), 500);
        assert_eq!(t.required_quorum(&decision("d"), ts(1_000_000)).unwrap(), 500);
    }

    #[test]
    fn status_reports_reached_and_remaining() {
        let mut t = tracker();
        t.initialize(&decision("d"), 1_000, 500, ts(0)).unwrap();
        t.update(&decision("d"), 120).unwrap();

        let status = t.status(&decision("d"), ts(40)).unwrap();
        assert!(status.is_quorum_reached); // 120 >= 100
        assert_eq!(status.current_quorum, 120);
        assert_eq!(status.required_quorum, 100);
        assert!((status.quorum_percentage - 12.0).abs() < 1e-9);
        assert_eq!(status.time_remaining_secs, 460);

        // After a growth step the same turnout no longer suffices.
        let status = t.status(&decision("d"), ts(150)).unwrap();
        assert!(!status.is_quorum_reached); // 120 < 150
    }

    #[test]
    fn zero_total_power_percentage_is_zero() {
        let mut t = tracker();
        t.initialize(&decision("d"), 0, 500, ts(0)).unwrap();
        assert_eq!(t.quorum_percentage(&decision("d")).unwrap(), 0.0);
    }

    #[test]
    fn voting_period_clamped_into_config_window() {
        let mut t = tracker();
        t.initialize(&decision("short"), 1_000, 1, ts(0)).unwrap();
        t.initialize(&decision("long"), 1_000, 1_000_000, ts(0)).unwrap();

        assert_eq!(t.status(&decision("short"), ts(0)).unwrap().time_remaining_secs, 100);
        assert_eq!(t.status(&decision("long"), ts(0)).unwrap().time_remaining_secs, 10_000);
    }

    #[test]
    fn remove_drops_state() {
        let mut t = tracker();
        t.initialize(&decision("d"), 1_000, 500, ts(0)).unwrap();
        assert!(t.is_tracked(&decision("d")));
        assert!(t.remove(&decision("d")).is_some());
        assert!(!t.is_tracked(&decision("d")));
        assert!(t.status(&decision("d"), ts(1)).is_err());
    }

    #[test]
    fn inconsistent_configs_rejected() {
        let bad_quorum = QuorumConfig {
            min_quorum_pct: 60,
            max_quorum_pct: 50,
            ..Default::default()
        };
        assert!(bad_quorum.validate().is_err());

        let bad_period = QuorumConfig {
            min_voting_period_secs: 100,
            max_voting_period_secs: 10,
            ..Default::default()
        };
        assert!(bad_period.validate().is_err());

        let bad_ceiling = QuorumConfig {
            min_quorum_pct: 10,
            max_quorum_pct: 101,
            ..Default::default()
        };
        assert!(bad_ceiling.validate().is_err());
    }

    proptest! {
        /// The required quorum never decreases as time passes and never
        /// exceeds the configured ceiling.
        #[test]
        fn required_quorum_monotone_and_bounded(
            total in 1u128..1_000_000_000,
            t1 in 0u64..1_000_000,
            dt in 0u64..1_000_000,
        ) {
            let mut tracker = tracker();
            tracker.initialize(&decision("d"), total, 500, ts(0)).unwrap();

            let early = tracker.required_quorum(&decision("d"), ts(t1)).unwrap();
            let late = tracker.required_quorum(&decision("d"), ts(t1 + dt)).unwrap();
            prop_assert!(early <= late);
            prop_assert!(late <= total.saturating_mul(50) / 100);
        }
    }
}
