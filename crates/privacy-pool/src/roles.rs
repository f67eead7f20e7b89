//! pool owner and auditor set

use std::collections::BTreeSet;

use crate::{AccountId, PoolError, Result};

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Roles {
    owner: AccountId,
    auditors: BTreeSet<AccountId>,
}

impl Roles {
    pub fn new(owner: AccountId, auditors: impl IntoIterator<Item = AccountId>) -> Self {
        Self {
            owner,
            auditors: auditors.into_iter().collect(),
        }
    }

    pub fn owner(&self) -> &AccountId {
        &self.owner
    }

    pub fn auditors(&self) -> impl Iterator<Item = &AccountId> {
        self.auditors.iter()
    }

    pub fn auditor_count(&self) -> usize {
        self.auditors.len()
    }

    pub fn is_owner(&self, who: &AccountId) -> bool {
        &self.owner == who
    }

    pub fn is_auditor(&self, who: &AccountId) -> bool {
        self.auditors.contains(who)
    }

    pub fn ensure_owner(&self, who: &AccountId) -> Result<()> {
        if self.is_owner(who) {
            Ok(())
        } else {
            Err(PoolError::Unauthorized("caller is not the pool owner"))
        }
    }

    pub fn ensure_auditor(&self, who: &AccountId) -> Result<()> {
        if self.is_auditor(who) {
            Ok(())
        } else {
            Err(PoolError::Unauthorized("caller is not an auditor"))
        }
    }

    /// owner or any auditor
    pub fn ensure_owner_or_auditor(&self, who: &AccountId) -> Result<()> {
        if self.is_owner(who) || self.is_auditor(who) {
            Ok(())
        } else {
            Err(PoolError::Unauthorized("caller is neither owner nor auditor"))
        }
    }

    /// returns false if already present
    pub fn add_auditor(&mut self, auditor: AccountId) -> bool {
        self.auditors.insert(auditor)
    }

    /// returns false if absent
    pub fn remove_auditor(&mut self, auditor: &AccountId) -> bool {
        self.auditors.remove(auditor)
    }
}
