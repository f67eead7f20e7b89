//! association sets
//!
//! each set is an append-only lean merkle tree of deposit commitments owned
//! by one asp. inclusion sets certify deposits as compliant; exclusion sets
//! flag them.

use std::collections::{BTreeMap, HashSet};

use lean_imt::{InsertResult, LeanImt, MerkleProof, MerkleState};
use serde::{Deserialize, Serialize};

use crate::{AspId, Commitment, Hash, PoolError, Result, RootHistory, SetId, Timestamp};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SetType {
    Inclusion,
    Exclusion,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssociationSetInfo {
    pub set_id: SetId,
    pub asp_id: AspId,
    pub set_type: SetType,
    pub state: MerkleState,
    pub member_count: u64,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
    pub active: bool,
}

#[derive(Clone, Debug)]
pub struct AssociationSet {
    info: AssociationSetInfo,
    tree: LeanImt,
    roots: RootHistory,
}

impl AssociationSet {
    fn new(
        set_id: SetId,
        asp_id: AspId,
        set_type: SetType,
        max_depth: usize,
        history: usize,
        now: Timestamp,
    ) -> Self {
        let tree = LeanImt::new(max_depth);
        Self {
            info: AssociationSetInfo {
                set_id,
                asp_id,
                set_type,
                state: tree.state(),
                member_count: 0,
                created_at: now,
                updated_at: now,
                active: true,
            },
            tree,
            roots: RootHistory::new(history),
        }
    }

    pub fn info(&self) -> &AssociationSetInfo {
        &self.info
    }

    pub fn root(&self) -> Hash {
        self.tree.root()
    }

    pub fn is_member(&self, commitment: &Commitment) -> bool {
        self.tree.contains(&commitment.0)
    }

    /// proof against the current root
    pub fn generate_proof(&self, commitment: &Commitment) -> Result<MerkleProof> {
        Ok(self.tree.generate_proof_for(&commitment.0)?)
    }

    /// root is current or retained, and the proven leaf is a member sitting
    /// where the path says it does
    pub fn verify_membership(&self, proof: &MerkleProof) -> bool {
        self.roots.contains(&proof.root) && self.tree.verify_proof(proof)
    }

    /// current or retained root of this set
    pub fn is_known_root(&self, root: &Hash) -> bool {
        self.roots.contains(root)
    }

    /// duplicate and capacity checks for `members`; writes nothing
    fn check_members(&self, members: &[Commitment]) -> Result<()> {
        let mut seen = HashSet::with_capacity(members.len());
        for member in members {
            if !seen.insert(member) {
                return Err(PoolError::AlreadyExists("duplicate member in batch"));
            }
            if self.is_member(member) {
                return Err(PoolError::AlreadyExists("commitment already in set"));
            }
        }
        self.tree.ensure_capacity(members.len() as u64)?;
        Ok(())
    }

    fn append(&mut self, members: &[Commitment], now: Timestamp) -> Result<InsertResult> {
        let leaves: Vec<Hash> = members.iter().map(|c| c.0).collect();
        let result = self.tree.insert_many(&leaves)?;
        self.roots.push(result.root);
        self.info.state = self.tree.state();
        self.info.member_count = result.size;
        self.info.updated_at = now;
        Ok(result)
    }
}

/// every association set, keyed by sequential id
#[derive(Clone, Debug)]
pub struct AssociationSets {
    sets: BTreeMap<SetId, AssociationSet>,
    next_id: SetId,
    max_depth: usize,
    history: usize,
}

impl AssociationSets {
    pub fn new(max_depth: usize, history: usize) -> Self {
        Self {
            sets: BTreeMap::new(),
            next_id: 0,
            max_depth,
            history,
        }
    }

    pub fn len(&self) -> usize {
        self.sets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sets.is_empty()
    }

    pub fn get(&self, set_id: SetId) -> Option<&AssociationSet> {
        self.sets.get(&set_id)
    }

    pub fn by_asp(&self, asp_id: AspId) -> impl Iterator<Item = &AssociationSet> {
        self.sets.values().filter(move |s| s.info.asp_id == asp_id)
    }

    /// new active set seeded with `members` (may be empty)
    pub fn create(
        &mut self,
        asp_id: AspId,
        set_type: SetType,
        members: &[Commitment],
        now: Timestamp,
    ) -> Result<(SetId, MerkleState)> {
        let set_id = self.next_id;
        let mut set = AssociationSet::new(set_id, asp_id, set_type, self.max_depth, self.history, now);
        set.check_members(members)?;
        if !members.is_empty() {
            set.append(members, now)?;
        }

        self.next_id += 1;
        let state = set.info.state;
        self.sets.insert(set_id, set);
        Ok((set_id, state))
    }

    /// append `members` to an active set, all or nothing
    pub fn extend(
        &mut self,
        set_id: SetId,
        members: &[Commitment],
        now: Timestamp,
    ) -> Result<InsertResult> {
        let set = self
            .sets
            .get_mut(&set_id)
            .ok_or(PoolError::NotFound("association set"))?;
        if !set.info.active {
            return Err(PoolError::InvalidInput("association set is inactive"));
        }
        if members.is_empty() {
            return Err(PoolError::InvalidInput("empty batch"));
        }
        set.check_members(members)?;
        set.append(members, now)
    }

    /// returns false if the set was already inactive
    pub fn deactivate(&mut self, set_id: SetId, now: Timestamp) -> Result<bool> {
        let set = self
            .sets
            .get_mut(&set_id)
            .ok_or(PoolError::NotFound("association set"))?;
        if !set.info.active {
            return Ok(false);
        }
        set.info.active = false;
        set.info.updated_at = now;
        Ok(true)
    }
}
