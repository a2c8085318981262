//! Nullable identity provider — configurable powers and roles.

use concord_ledger::IdentityProvider;
use concord_types::AccountId;
use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

/// An in-memory [`IdentityProvider`] whose base powers and role sets are
/// set directly by the test.
pub struct NullIdentity {
    powers: Mutex<HashMap<AccountId, u128>>,
    admins: Mutex<HashSet<AccountId>>,
    delegates: Mutex<HashSet<AccountId>>,
}

impl NullIdentity {
    pub fn new() -> Self {
        Self {
            powers: Mutex::new(HashMap::new()),
            admins: Mutex::new(HashSet::new()),
            delegates: Mutex::new(HashSet::new()),
        }
    }

    pub fn set_base_power(&self, account: &AccountId, power: u128) {
        self.powers.lock().unwrap().insert(account.clone(), power);
    }

    pub fn set_admin(&self, account: &AccountId) {
        self.admins.lock().unwrap().insert(account.clone());
    }

    pub fn set_delegate(&self, account: &AccountId) {
        self.delegates.lock().unwrap().insert(account.clone());
    }
}

impl Default for NullIdentity {
    fn default() -> Self {
        Self::new()
    }
}

impl IdentityProvider for NullIdentity {
    fn base_voting_power(&self, account: &AccountId) -> u128 {
        self.powers.lock().unwrap().get(account).copied().unwrap_or(0)
    }

    fn is_admin(&self, account: &AccountId) -> bool {
        self.admins.lock().unwrap().contains(account)
    }

    fn is_delegate(&self, account: &AccountId) -> bool {
        self.delegates.lock().unwrap().contains(account)
    }

    fn total_base_power(&self) -> u128 {
        self.powers.lock().unwrap().values().sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_account_has_no_power() {
        let identity = NullIdentity::new();
        assert_eq!(identity.base_voting_power(&AccountId::new("ghost")), 0);
        assert!(!identity.is_admin(&AccountId::new("ghost")));
    }

    #[test]
    fn total_is_sum_of_base_powers() {
        let identity = NullIdentity::new();
        identity.set_base_power(&AccountId::new("a"), 100);
        identity.set_base_power(&AccountId::new("b"), 250);
        assert_eq!(identity.total_base_power(), 350);
    }

    #[test]
    fn roles_are_independent_sets() {
        let identity = NullIdentity::new();
        let a = AccountId::new("a");
        identity.set_admin(&a);
        assert!(identity.is_admin(&a));
        assert!(!identity.is_delegate(&a));
    }
}
