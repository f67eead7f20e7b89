//! association set provider registry
//!
//! an asp registers with a stake, waits for `approval_threshold` distinct
//! auditor votes and only then may publish association sets.
//!
//! ```text
//!   Pending ──votes──▶ Active ◀──reinstate── Suspended
//!      │                 │ └────suspend─────────▲
//!      └─────────────────┴──────revoke──────────┴──▶ Revoked
//! ```

use std::collections::{BTreeMap, HashMap, HashSet};

use serde::{Deserialize, Serialize};

use crate::{AccountId, Amount, AspId, PoolError, Result, Timestamp};

/// asp lifecycle
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AspStatus {
    /// registered, collecting auditor votes
    Pending,
    /// approved, may own association sets
    Active,
    /// temporarily barred; its sets stop certifying
    Suspended,
    /// terminal
    Revoked,
}

impl AspStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AspStatus::Pending => "Pending",
            AspStatus::Active => "Active",
            AspStatus::Suspended => "Suspended",
            AspStatus::Revoked => "Revoked",
        }
    }

    /// the full transition table
    pub fn can_transition_to(self, next: AspStatus) -> bool {
        use AspStatus::*;
        matches!(
            (self, next),
            (Pending, Active)
                | (Active, Suspended)
                | (Suspended, Active)
                | (Pending, Revoked)
                | (Active, Revoked)
                | (Suspended, Revoked)
        )
    }

    pub fn transition(self, next: AspStatus) -> Result<AspStatus> {
        if self.can_transition_to(next) {
            Ok(next)
        } else {
            Err(PoolError::InvalidTransition {
                from: self.as_str(),
                to: next.as_str(),
            })
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AspInfo {
    pub id: AspId,
    /// account that registered and operates the asp
    pub owner: AccountId,
    /// compressed ristretto point
    pub public_key: [u8; 32],
    /// hash of off-chain metadata (policy, contact)
    pub metadata_hash: [u8; 32],
    pub stake: Amount,
    pub status: AspStatus,
    pub approval_votes: u32,
    pub set_count: u32,
    pub suspension_reason: Option<u32>,
    pub registered_at: Timestamp,
    pub activated_at: Option<Timestamp>,
}

impl AspInfo {
    pub fn is_active(&self) -> bool {
        self.status == AspStatus::Active
    }
}

#[derive(Clone, Debug, Default)]
pub struct AspRegistry {
    asps: BTreeMap<AspId, AspInfo>,
    by_owner: HashMap<AccountId, AspId>,
    /// (asp, auditor) pairs that already voted
    votes: HashSet<(AspId, AccountId)>,
    next_id: AspId,
}

impl AspRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.asps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.asps.is_empty()
    }

    pub fn get(&self, id: AspId) -> Option<&AspInfo> {
        self.asps.get(&id)
    }

    pub fn by_owner(&self, owner: &AccountId) -> Option<&AspInfo> {
        self.by_owner.get(owner).and_then(|id| self.asps.get(id))
    }

    pub fn iter(&self) -> impl Iterator<Item = &AspInfo> {
        self.asps.values()
    }

    pub fn has_voted(&self, id: AspId, auditor: &AccountId) -> bool {
        self.votes.contains(&(id, *auditor))
    }

    /// all registration checks except the stake transfer; writes nothing
    pub fn check_registration(
        &self,
        owner: &AccountId,
        stake: Amount,
        min_stake: Amount,
    ) -> Result<()> {
        if stake < min_stake {
            return Err(PoolError::InsufficientStake {
                provided: stake,
                minimum: min_stake,
            });
        }
        if self.by_owner.contains_key(owner) {
            return Err(PoolError::AlreadyExists("account already operates an asp"));
        }
        Ok(())
    }

    /// record a checked registration as Pending
    pub fn insert(
        &mut self,
        owner: AccountId,
        public_key: [u8; 32],
        metadata_hash: [u8; 32],
        stake: Amount,
        now: Timestamp,
    ) -> AspId {
        let id = self.next_id;
        self.next_id += 1;
        self.asps.insert(
            id,
            AspInfo {
                id,
                owner,
                public_key,
                metadata_hash,
                stake,
                status: AspStatus::Pending,
                approval_votes: 0,
                set_count: 0,
                suspension_reason: None,
                registered_at: now,
                activated_at: None,
            },
        );
        self.by_owner.insert(owner, id);
        id
    }

    /// count one auditor vote; activates at `threshold`. caller must be an
    /// auditor (checked by the engine)
    pub fn approve(
        &mut self,
        auditor: &AccountId,
        id: AspId,
        threshold: u32,
        now: Timestamp,
    ) -> Result<&AspInfo> {
        let info = self.asps.get(&id).ok_or(PoolError::NotFound("asp"))?;
        if self.votes.contains(&(id, *auditor)) {
            return Err(PoolError::DuplicateVote { asp_id: id });
        }
        if info.status != AspStatus::Pending {
            return Err(PoolError::InvalidTransition {
                from: info.status.as_str(),
                to: AspStatus::Active.as_str(),
            });
        }

        self.votes.insert((id, *auditor));
        let info = self.asps.get_mut(&id).ok_or(PoolError::NotFound("asp"))?;
        info.approval_votes += 1;
        if info.approval_votes >= threshold {
            info.status = AspStatus::Active;
            info.activated_at = Some(now);
        }
        Ok(info)
    }

    /// move to `next` if the table allows it, returning the previous status
    pub fn set_status(&mut self, id: AspId, next: AspStatus, reason: Option<u32>) -> Result<AspStatus> {
        let info = self.asps.get_mut(&id).ok_or(PoolError::NotFound("asp"))?;
        let previous = info.status;
        info.status = previous.transition(next)?;
        info.suspension_reason = match next {
            AspStatus::Suspended => reason,
            AspStatus::Active => None,
            _ => info.suspension_reason,
        };
        Ok(previous)
    }

    /// the Active asp operated by `caller`
    pub fn active_by_owner(&self, caller: &AccountId) -> Result<&AspInfo> {
        let info = self
            .by_owner(caller)
            .ok_or(PoolError::Unauthorized("caller does not operate an asp"))?;
        if !info.is_active() {
            return Err(PoolError::Unauthorized("asp is not active"));
        }
        Ok(info)
    }

    pub(crate) fn record_set(&mut self, id: AspId) {
        if let Some(info) = self.asps.get_mut(&id) {
            info.set_count = info.set_count.saturating_add(1);
        }
    }
}
