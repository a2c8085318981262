//! Validator policy configuration.

use crate::error::ConsensusError;
use serde::{Deserialize, Serialize};

/// Policy bounds for the consensus validator, supplied once at
/// construction.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ValidatorConfig {
    /// Seconds between periodic quorum checks for a pending item.
    pub check_interval_secs: u64,
    /// Floor applied to the captured total voting power when a decision's
    /// quorum state is initialized. Keeps the quorum denominator from
    /// collapsing when the eligible population is tiny.
    pub required_voting_power: u128,
    /// Length of an item's voting window, in seconds.
    pub validation_period_secs: u64,
    /// Minimum number of distinct voters for a verdict other than
    /// rejection.
    pub min_votes_required: u32,
    /// Cap applied to an admin voter's effective power.
    pub max_admin_voting_power: u128,
    /// Cap applied to a delegate voter's effective power.
    pub max_delegate_voting_power: u128,
    /// Below this minority share (percent, strict), a two-thirds
    /// supermajority is required to validate.
    pub minority_protection_pct: u32,
    /// A minority larger than this share (percent, strict) of the total
    /// vetoes the outcome.
    pub veto_power_pct: u32,
}

impl ValidatorConfig {
    pub fn validate(&self) -> Result<(), ConsensusError> {
        if self.check_interval_secs == 0 {
            return Err(ConsensusError::InvalidConfig(
                "check_interval_secs must be positive".into(),
            ));
        }
        if self.validation_period_secs == 0 {
            return Err(ConsensusError::InvalidConfig(
                "validation_period_secs must be positive".into(),
            ));
        }
        if self.minority_protection_pct > 100 {
            return Err(ConsensusError::InvalidConfig(format!(
                "minority_protection_pct {} exceeds 100",
                self.minority_protection_pct
            )));
        }
        if self.veto_power_pct > 100 {
            return Err(ConsensusError::InvalidConfig(format!(
                "veto_power_pct {} exceeds 100",
                self.veto_power_pct
            )));
        }
        Ok(())
    }
}

impl Default for ValidatorConfig {
    fn default() -> Self {
        Self {
            check_interval_secs: 30,
            required_voting_power: 100,
            validation_period_secs: 86_400,
            min_votes_required: 3,
            max_admin_voting_power: 10_000,
            max_delegate_voting_power: 50_000,
            minority_protection_pct: 20,
            veto_power_pct: 33,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        assert!(ValidatorConfig::default().validate().is_ok());
    }

    #[test]
    fn zero_check_interval_rejected() {
        let config = ValidatorConfig {
            check_interval_secs: 0,
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConsensusError::InvalidConfig(_))
        ));
    }

    #[test]
    fn out_of_range_percentages_rejected() {
        let config = ValidatorConfig {
            veto_power_pct: 101,
            ..Default::default()
        };
        assert!(config.validate().is_err());

        let config = ValidatorConfig {
            minority_protection_pct: 101,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }
}
