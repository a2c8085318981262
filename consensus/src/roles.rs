//! Voter roles and role-based power caps.

use crate::config::ValidatorConfig;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// A voter's capability class, as reported by the identity collaborator.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Role {
    Admin,
    Delegate,
    Member,
}

/// Role → power-cap lookup table.
///
/// A role absent from the table votes uncapped. Adding a capped role is a
/// data change, not a code change.
#[derive(Clone, Debug)]
pub struct RoleCaps {
    caps: HashMap<Role, u128>,
}

impl RoleCaps {
    pub fn from_config(config: &ValidatorConfig) -> Self {
        let mut caps = HashMap::new();
        caps.insert(Role::Admin, config.max_admin_voting_power);
        caps.insert(Role::Delegate, config.max_delegate_voting_power);
        Self { caps }
    }

    /// Override or add the cap for a role.
    pub fn set_cap(&mut self, role: Role, cap: u128) {
        self.caps.insert(role, cap);
    }

    /// The power a voter of `role` may actually bring to a vote.
    pub fn apply(&self, role: Role, power: u128) -> u128 {
        match self.caps.get(&role) {
            Some(cap) => power.min(*cap),
            None => power,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn caps() -> RoleCaps {
        RoleCaps::from_config(&ValidatorConfig {
            max_admin_voting_power: 100,
            max_delegate_voting_power: 500,
            ..Default::default()
        })
    }

    #[test]
    fn admin_and_delegate_are_capped() {
        let caps = caps();
        assert_eq!(caps.apply(Role::Admin, 1_000), 100);
        assert_eq!(caps.apply(Role::Delegate, 1_000), 500);
    }

    #[test]
    fn member_is_uncapped() {
        let caps = caps();
        assert_eq!(caps.apply(Role::Member, 1_000_000), 1_000_000);
    }

    #[test]
    fn cap_only_binds_above_it() {
        let caps = caps();
        assert_eq!(caps.apply(Role::Admin, 40), 40);
    }

    #[test]
    fn caps_are_data_driven() {
        let mut caps = caps();
        caps.set_cap(Role::Member, 7);
        assert_eq!(caps.apply(Role::Member, 1_000), 7);
    }
}
