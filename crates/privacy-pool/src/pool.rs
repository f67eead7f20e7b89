//! the pool engine
//!
//! owns every registry and drives the deposit, withdrawal and ragequit
//! lifecycles. all entry points take the caller's account explicitly and
//! check it against stored roles.
//!
//! call-out ordering:
//! - `register_asp`, `deposit`, `batch_deposit`: validate, pull funds with
//!   `transfer_from`, then write state
//! - `withdraw`, `execute_ragequit`: validate, write state, pay out with
//!   `transfer`, roll the writes back if the payout is refused

use std::collections::{BTreeMap, HashMap, HashSet};

use lean_imt::{InsertResult, LeanImt, MerkleProof, MerkleState};
use pool_elgamal::{verify_opening, Point};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::{
    derive_nullifier, note_commitment, AccountId, Amount, AspId, AspInfo, AspRegistry, AspStatus,
    AssetId, AssociationSet, AssociationSets, Clock, Commitment, Hash, Nullifier, PoolConfig,
    PoolError, PoolEvent, ProofVerifier, RagequitClaim, RagequitRequest, RagequitStatus, RequestId,
    Result, Roles, RootHistory, SetId, SetType, Timestamp, TokenLedger, WITHDRAWAL_DOMAIN,
};

/// public deposit payload
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DepositRequest {
    pub commitment: Commitment,
    /// compressed pedersen commitment to `amount`
    pub amount_commitment: [u8; 32],
    pub asset_id: AssetId,
    pub amount: Amount,
    /// checked by the verifier when present
    pub range_proof: Option<Vec<u8>>,
}

impl DepositRequest {
    pub fn public_inputs(&self) -> Vec<[u8; 32]> {
        vec![
            self.commitment.0,
            self.amount_commitment,
            word(self.amount),
            word(self.asset_id as u128),
        ]
    }
}

/// immutable record of an accepted deposit
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DepositRecord {
    pub commitment: Commitment,
    pub amount_commitment: [u8; 32],
    pub asset_id: AssetId,
    pub amount: Amount,
    pub depositor: AccountId,
    pub deposited_at: Timestamp,
    pub leaf_index: u64,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DepositReceipt {
    pub index: u64,
    pub root: Hash,
    pub size: u64,
}

/// proof that a commitment is in an association set
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SetMembership {
    pub set_id: SetId,
    pub proof: MerkleProof,
}

/// exclusion set the commitment must not be in, pinned to a root of that
/// set so the verifier sees which version was checked
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExclusionCheck {
    pub set_id: SetId,
    /// current or retained root of the set
    pub root: Hash,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct WithdrawalRequest {
    pub nullifier: Nullifier,
    pub recipient: AccountId,
    pub asset_id: AssetId,
    pub amount: Amount,
    /// commitment against a retained deposit root
    pub deposit_proof: MerkleProof,
    /// compliance certificate
    pub inclusion: SetMembership,
    /// exclusion set the commitment must not be in
    pub exclusion: Option<ExclusionCheck>,
    /// handed to the verifier with [`WithdrawalRequest::public_inputs`]
    pub proof: Vec<u8>,
}

impl WithdrawalRequest {
    /// domain tag, nullifier, commitment, deposit root, inclusion set and
    /// root, exclusion set and root, recipient, amount, asset.
    ///
    /// the commitment is the leaf of `deposit_proof`, so the statement the
    /// verifier checks is about the same note the merkle checks are about.
    /// an absent exclusion check is encoded as two zero words
    pub fn public_inputs(&self) -> Vec<[u8; 32]> {
        let mut domain = [0u8; 32];
        domain[..WITHDRAWAL_DOMAIN.len()].copy_from_slice(WITHDRAWAL_DOMAIN);
        let (exclusion_set, exclusion_root) = match &self.exclusion {
            Some(check) => (word(check.set_id as u128 + 1), check.root),
            None => ([0u8; 32], [0u8; 32]),
        };
        vec![
            domain,
            self.nullifier.0,
            self.deposit_proof.leaf,
            self.deposit_proof.root,
            word(self.inclusion.set_id as u128),
            self.inclusion.proof.root,
            exclusion_set,
            exclusion_root,
            self.recipient,
            word(self.amount),
            word(self.asset_id as u128),
        ]
    }
}

/// little-endian u128 in a 32-byte word
fn word(value: u128) -> [u8; 32] {
    let mut out = [0u8; 32];
    out[..16].copy_from_slice(&value.to_le_bytes());
    out
}

/// log-friendly account prefix
fn short(bytes: &[u8; 32]) -> String {
    hex::encode(&bytes[..8])
}

pub struct PrivacyPool<L, V, C> {
    config: PoolConfig,
    ledger: L,
    verifier: V,
    clock: C,

    /// None until `initialize`
    roles: Option<Roles>,
    pool_account: AccountId,
    paused: bool,

    asps: AspRegistry,
    sets: AssociationSets,

    deposit_tree: LeanImt,
    deposit_roots: RootHistory,
    deposits: HashMap<Commitment, DepositRecord>,
    /// spent nullifiers and when
    nullifiers: HashMap<Nullifier, Timestamp>,

    ragequits: BTreeMap<RequestId, RagequitRequest>,
    next_request_id: RequestId,

    /// deposited funds available for payout, per asset
    liquidity: HashMap<AssetId, Amount>,
    /// asp stake held in `stake_asset`
    staked: Amount,

    events: Vec<PoolEvent>,
}

impl<L, V, C> PrivacyPool<L, V, C>
where
    L: TokenLedger,
    V: ProofVerifier,
    C: Clock,
{
    pub fn new(config: PoolConfig, ledger: L, verifier: V, clock: C) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            sets: AssociationSets::new(config.max_tree_depth, config.root_history_size),
            deposit_tree: LeanImt::new(config.max_tree_depth),
            deposit_roots: RootHistory::new(config.root_history_size),
            config,
            ledger,
            verifier,
            clock,
            roles: None,
            pool_account: [0u8; 32],
            paused: false,
            asps: AspRegistry::new(),
            deposits: HashMap::new(),
            nullifiers: HashMap::new(),
            ragequits: BTreeMap::new(),
            next_request_id: 0,
            liquidity: HashMap::new(),
            staked: 0,
            events: Vec::new(),
        })
    }

    // ============ guards ============

    fn initialized_roles(&self) -> Result<&Roles> {
        self.roles.as_ref().ok_or(PoolError::NotInitialized)
    }

    fn initialized_roles_mut(&mut self) -> Result<&mut Roles> {
        self.roles.as_mut().ok_or(PoolError::NotInitialized)
    }

    /// initialized and not paused
    fn ensure_live(&self) -> Result<()> {
        self.initialized_roles()?;
        if self.paused {
            return Err(PoolError::Paused);
        }
        Ok(())
    }

    // ============ administration ============

    /// one-time setup; every other mutating call fails until this succeeds
    pub fn initialize(
        &mut self,
        owner: AccountId,
        auditors: &[AccountId],
        pool_account: AccountId,
    ) -> Result<()> {
        if self.roles.is_some() {
            return Err(PoolError::AlreadyInitialized);
        }
        let roles = Roles::new(owner, auditors.iter().copied());
        if (roles.auditor_count() as u64) < self.config.approval_threshold as u64 {
            warn!(
                auditors = roles.auditor_count(),
                threshold = self.config.approval_threshold,
                "fewer auditors than the approval threshold, no asp can activate yet"
            );
        }

        self.events.push(PoolEvent::Initialized {
            owner,
            pool_account,
            auditors: roles.auditor_count() as u32,
        });
        info!(
            owner = %short(&owner),
            pool = %short(&pool_account),
            auditors = roles.auditor_count(),
            "pool initialized"
        );
        self.roles = Some(roles);
        self.pool_account = pool_account;
        Ok(())
    }

    pub fn add_auditor(&mut self, caller: &AccountId, auditor: AccountId) -> Result<()> {
        let roles = self.initialized_roles_mut()?;
        roles.ensure_owner(caller)?;
        if !roles.add_auditor(auditor) {
            return Err(PoolError::AlreadyExists("auditor"));
        }
        self.events.push(PoolEvent::AuditorAdded { auditor });
        info!(auditor = %short(&auditor), "auditor added");
        Ok(())
    }

    /// votes already cast by the auditor stay counted
    pub fn remove_auditor(&mut self, caller: &AccountId, auditor: &AccountId) -> Result<()> {
        let roles = self.initialized_roles_mut()?;
        roles.ensure_owner(caller)?;
        if !roles.remove_auditor(auditor) {
            return Err(PoolError::NotFound("auditor"));
        }
        self.events.push(PoolEvent::AuditorRemoved { auditor: *auditor });
        info!(auditor = %short(auditor), "auditor removed");
        Ok(())
    }

    /// stops deposits, withdrawals and new ragequit requests
    pub fn pause(&mut self, caller: &AccountId) -> Result<()> {
        self.initialized_roles()?.ensure_owner(caller)?;
        if self.paused {
            return Err(PoolError::Paused);
        }
        self.paused = true;
        self.events.push(PoolEvent::Paused);
        warn!("pool paused");
        Ok(())
    }

    pub fn unpause(&mut self, caller: &AccountId) -> Result<()> {
        self.initialized_roles()?.ensure_owner(caller)?;
        if !self.paused {
            return Err(PoolError::InvalidInput("pool is not paused"));
        }
        self.paused = false;
        self.events.push(PoolEvent::Unpaused);
        info!("pool unpaused");
        Ok(())
    }

    // ============ asp governance ============

    /// register the caller as an asp, escrowing `stake` in `stake_asset`
    pub fn register_asp(
        &mut self,
        caller: &AccountId,
        public_key: [u8; 32],
        metadata_hash: [u8; 32],
        stake: Amount,
    ) -> Result<AspId> {
        self.initialized_roles()?;
        Point::from_public_bytes(&public_key)?;
        self.asps
            .check_registration(caller, stake, self.config.min_asp_stake)?;
        let staked = self
            .staked
            .checked_add(stake)
            .ok_or(PoolError::InvalidInput("stake overflows"))?;

        if !self
            .ledger
            .transfer_from(self.config.stake_asset, caller, &self.pool_account, stake)
        {
            warn!(owner = %short(caller), stake, "asp stake transfer refused");
            return Err(PoolError::TransferFailed);
        }

        let now = self.clock.now();
        let asp_id = self
            .asps
            .insert(*caller, public_key, metadata_hash, stake, now);
        self.staked = staked;
        self.events.push(PoolEvent::AspRegistered {
            asp_id,
            owner: *caller,
            stake,
        });
        info!(asp_id, owner = %short(caller), stake, "asp registered");
        Ok(asp_id)
    }

    /// one auditor vote; returns the status after the vote
    pub fn approve_asp(&mut self, caller: &AccountId, asp_id: AspId) -> Result<AspStatus> {
        self.initialized_roles()?.ensure_auditor(caller)?;
        let now = self.clock.now();
        let threshold = self.config.approval_threshold;
        let info = self.asps.approve(caller, asp_id, threshold, now)?;
        let (votes, status) = (info.approval_votes, info.status);

        self.events.push(PoolEvent::AspApprovalVoted {
            asp_id,
            auditor: *caller,
            votes,
        });
        debug!(asp_id, auditor = %short(caller), votes, threshold, "asp approval vote");
        if status == AspStatus::Active {
            self.events.push(PoolEvent::AspStatusChanged {
                asp_id,
                from: AspStatus::Pending,
                to: AspStatus::Active,
                reason: None,
            });
            info!(asp_id, votes, "asp activated");
        }
        Ok(status)
    }

    /// owner or auditor; Active -> Suspended
    pub fn suspend_asp(&mut self, caller: &AccountId, asp_id: AspId, reason: u32) -> Result<()> {
        self.initialized_roles()?.ensure_owner_or_auditor(caller)?;
        self.change_asp_status(asp_id, AspStatus::Suspended, Some(reason))
    }

    /// owner only; Suspended -> Active
    pub fn reinstate_asp(&mut self, caller: &AccountId, asp_id: AspId) -> Result<()> {
        self.initialized_roles()?.ensure_owner(caller)?;
        self.change_asp_status(asp_id, AspStatus::Active, None)
    }

    /// owner only; terminal. the stake stays escrowed
    pub fn revoke_asp(&mut self, caller: &AccountId, asp_id: AspId) -> Result<()> {
        self.initialized_roles()?.ensure_owner(caller)?;
        self.change_asp_status(asp_id, AspStatus::Revoked, None)
    }

    fn change_asp_status(&mut self, asp_id: AspId, next: AspStatus, reason: Option<u32>) -> Result<()> {
        let from = self.asps.set_status(asp_id, next, reason)?;
        self.events.push(PoolEvent::AspStatusChanged {
            asp_id,
            from,
            to: next,
            reason,
        });
        info!(asp_id, from = from.as_str(), to = next.as_str(), ?reason, "asp status changed");
        Ok(())
    }

    // ============ association sets ============

    /// caller must operate an Active asp
    pub fn create_association_set(
        &mut self,
        caller: &AccountId,
        set_type: SetType,
        initial_members: &[Commitment],
    ) -> Result<SetId> {
        self.initialized_roles()?;
        let asp_id = self.asps.active_by_owner(caller)?.id;
        self.check_batch_len(initial_members.len())?;

        let now = self.clock.now();
        let (set_id, state) = self.sets.create(asp_id, set_type, initial_members, now)?;
        self.asps.record_set(asp_id);

        self.events.push(PoolEvent::AssociationSetCreated {
            set_id,
            asp_id,
            set_type,
            root: state.root,
            member_count: state.size,
        });
        info!(set_id, asp_id, ?set_type, members = state.size, "association set created");
        Ok(set_id)
    }

    /// owning Active asp only; sets never shrink
    pub fn add_to_association_set(
        &mut self,
        caller: &AccountId,
        set_id: SetId,
        members: &[Commitment],
    ) -> Result<InsertResult> {
        self.initialized_roles()?;
        let set = self
            .sets
            .get(set_id)
            .ok_or(PoolError::NotFound("association set"))?;
        let asp = self.asps.active_by_owner(caller)?;
        if asp.id != set.info().asp_id {
            return Err(PoolError::Unauthorized("set belongs to another asp"));
        }
        self.check_batch_len(members.len())?;

        let now = self.clock.now();
        let result = self.sets.extend(set_id, members, now)?;
        self.events.push(PoolEvent::AssociationSetExtended {
            set_id,
            root: result.root,
            start_index: result.start_index,
            inserted_count: result.inserted_count,
        });
        debug!(
            set_id,
            root = %hex::encode(result.root),
            size = result.size,
            inserted = result.inserted_count,
            "association set extended"
        );
        Ok(result)
    }

    /// owning asp (in any status) or the pool owner
    pub fn deactivate_association_set(&mut self, caller: &AccountId, set_id: SetId) -> Result<()> {
        let roles = self.initialized_roles()?;
        let set = self
            .sets
            .get(set_id)
            .ok_or(PoolError::NotFound("association set"))?;
        let owns_set = self
            .asps
            .get(set.info().asp_id)
            .map(|asp| &asp.owner == caller)
            .unwrap_or(false);
        if !owns_set && !roles.is_owner(caller) {
            return Err(PoolError::Unauthorized("caller may not deactivate this set"));
        }

        let now = self.clock.now();
        if !self.sets.deactivate(set_id, now)? {
            return Err(PoolError::InvalidInput("association set already inactive"));
        }
        self.events.push(PoolEvent::AssociationSetDeactivated { set_id });
        info!(set_id, "association set deactivated");
        Ok(())
    }

    fn check_batch_len(&self, len: usize) -> Result<()> {
        if len > self.config.max_batch_size {
            return Err(PoolError::CapacityExceeded(format!(
                "batch of {} exceeds max_batch_size {}",
                len, self.config.max_batch_size
            )));
        }
        Ok(())
    }

    // ============ deposits ============

    fn check_deposit(&self, request: &DepositRequest) -> Result<()> {
        if request.amount == 0 {
            return Err(PoolError::InvalidInput("deposit amount must be positive"));
        }
        Point::from_public_bytes(&request.amount_commitment)?;
        if self.deposits.contains_key(&request.commitment) {
            return Err(PoolError::AlreadyExists("commitment already deposited"));
        }
        if let Some(proof) = &request.range_proof {
            if !self.verifier.verify(proof, &request.public_inputs()) {
                return Err(PoolError::InvalidProof("range proof rejected"));
            }
        }
        Ok(())
    }

    fn check_liquidity_headroom(&self, asset_id: AssetId, amount: Amount) -> Result<()> {
        self.liquidity(asset_id)
            .checked_add(amount)
            .map(|_| ())
            .ok_or(PoolError::InvalidInput("pool liquidity overflows"))
    }

    pub fn deposit(&mut self, caller: &AccountId, request: &DepositRequest) -> Result<DepositReceipt> {
        self.ensure_live()?;
        self.check_deposit(request)?;
        self.check_liquidity_headroom(request.asset_id, request.amount)?;
        self.deposit_tree.ensure_capacity(1)?;

        if !self
            .ledger
            .transfer_from(request.asset_id, caller, &self.pool_account, request.amount)
        {
            warn!(depositor = %short(caller), amount = request.amount, "deposit transfer refused");
            return Err(PoolError::TransferFailed);
        }

        let result = self.append_deposits(caller, std::slice::from_ref(request))?;
        Ok(DepositReceipt {
            index: result.start_index,
            root: result.root,
            size: result.size,
        })
    }

    /// all or nothing; funds are pulled once per asset
    pub fn batch_deposit(
        &mut self,
        caller: &AccountId,
        requests: &[DepositRequest],
    ) -> Result<InsertResult> {
        self.ensure_live()?;
        if requests.is_empty() {
            return Err(PoolError::InvalidInput("empty batch"));
        }
        self.check_batch_len(requests.len())?;

        let mut seen = HashSet::with_capacity(requests.len());
        let mut totals: BTreeMap<AssetId, Amount> = BTreeMap::new();
        for request in requests {
            self.check_deposit(request)?;
            if !seen.insert(request.commitment) {
                return Err(PoolError::AlreadyExists("duplicate commitment in batch"));
            }
            let total = totals.entry(request.asset_id).or_insert(0);
            *total = total
                .checked_add(request.amount)
                .ok_or(PoolError::InvalidInput("batch total overflows"))?;
        }
        for (asset_id, total) in &totals {
            self.check_liquidity_headroom(*asset_id, *total)?;
        }
        self.deposit_tree.ensure_capacity(requests.len() as u64)?;

        let mut pulled: Vec<(AssetId, Amount)> = Vec::with_capacity(totals.len());
        for (asset_id, total) in totals {
            if !self
                .ledger
                .transfer_from(asset_id, caller, &self.pool_account, total)
            {
                warn!(depositor = %short(caller), asset_id, total, "batch deposit transfer refused");
                for (asset_id, amount) in pulled {
                    if !self.ledger.transfer(asset_id, caller, amount) {
                        warn!(depositor = %short(caller), asset_id, amount, "batch refund refused");
                    }
                }
                return Err(PoolError::TransferFailed);
            }
            pulled.push((asset_id, total));
        }

        self.append_deposits(caller, requests)
    }

    /// funds already escrowed, requests already checked
    fn append_deposits(
        &mut self,
        depositor: &AccountId,
        requests: &[DepositRequest],
    ) -> Result<InsertResult> {
        let now = self.clock.now();
        let leaves: Vec<Hash> = requests.iter().map(|r| r.commitment.0).collect();
        let result = self.deposit_tree.insert_many(&leaves)?;
        self.deposit_roots.push(result.root);

        for (offset, request) in requests.iter().enumerate() {
            let leaf_index = result.start_index + offset as u64;
            self.deposits.insert(
                request.commitment,
                DepositRecord {
                    commitment: request.commitment,
                    amount_commitment: request.amount_commitment,
                    asset_id: request.asset_id,
                    amount: request.amount,
                    depositor: *depositor,
                    deposited_at: now,
                    leaf_index,
                },
            );
            let liquidity = self.liquidity.entry(request.asset_id).or_insert(0);
            *liquidity = liquidity.saturating_add(request.amount);

            self.events.push(PoolEvent::Deposited {
                commitment: request.commitment,
                index: leaf_index,
                asset_id: request.asset_id,
                amount: request.amount,
                root: result.root,
            });
            info!(
                index = leaf_index,
                asset_id = request.asset_id,
                amount = request.amount,
                "deposit accepted"
            );
        }
        debug!(
            root = %hex::encode(result.root),
            size = result.size,
            depth = result.depth,
            "deposit tree updated"
        );
        Ok(result)
    }

    // ============ withdrawals ============

    /// checks in order: nullifier unspent, deposit proof, inclusion set,
    /// exclusion set, verifier
    fn check_withdrawal(&self, request: &WithdrawalRequest) -> Result<()> {
        if self.nullifiers.contains_key(&request.nullifier) {
            warn!(nullifier = ?request.nullifier, "rejected double spend");
            return Err(PoolError::AlreadySpent);
        }

        let proof = &request.deposit_proof;
        if !self.deposit_roots.contains(&proof.root) {
            return Err(PoolError::InvalidProof("unknown or stale deposit root"));
        }
        if !self.deposit_tree.verify_proof(proof) {
            return Err(PoolError::InvalidProof("deposit merkle proof"));
        }
        let commitment = Commitment(proof.leaf);
        let record = self
            .deposits
            .get(&commitment)
            .ok_or(PoolError::NotFound("deposit"))?;
        // record amounts are never zero, so this also rejects a zero withdrawal
        if record.asset_id != request.asset_id || record.amount != request.amount {
            return Err(PoolError::InvalidInput("amount or asset differs from the deposit"));
        }

        self.check_inclusion(&commitment, &request.inclusion)?;
        if let Some(check) = &request.exclusion {
            self.check_exclusion(&commitment, check)?;
        }

        if !self.verifier.verify(&request.proof, &request.public_inputs()) {
            return Err(PoolError::InvalidProof("withdrawal proof rejected"));
        }
        if self.liquidity(request.asset_id) < request.amount {
            return Err(PoolError::InsufficientLiquidity {
                asset_id: request.asset_id,
            });
        }
        Ok(())
    }

    fn check_inclusion(&self, commitment: &Commitment, membership: &SetMembership) -> Result<()> {
        let set = self
            .sets
            .get(membership.set_id)
            .ok_or(PoolError::NotFound("association set"))?;
        let info = set.info();
        if info.set_type != SetType::Inclusion {
            return Err(PoolError::InvalidInput("compliance proof must use an inclusion set"));
        }
        if !info.active {
            return Err(PoolError::InvalidProof("association set is inactive"));
        }
        if !self.asps.get(info.asp_id).map(AspInfo::is_active).unwrap_or(false) {
            return Err(PoolError::InvalidProof("association set provider is not active"));
        }
        if membership.proof.leaf != commitment.0 {
            return Err(PoolError::InvalidProof("membership proof is for another commitment"));
        }
        if !set.is_member(commitment) || !set.verify_membership(&membership.proof) {
            return Err(PoolError::InvalidProof("association set membership"));
        }
        Ok(())
    }

    /// inactive exclusion sets no longer flag anything. membership is
    /// checked against the current tree, whatever root the request pins
    fn check_exclusion(&self, commitment: &Commitment, check: &ExclusionCheck) -> Result<()> {
        let set = self
            .sets
            .get(check.set_id)
            .ok_or(PoolError::NotFound("association set"))?;
        if set.info().set_type != SetType::Exclusion {
            return Err(PoolError::InvalidInput("exclusion check must use an exclusion set"));
        }
        if !set.is_known_root(&check.root) {
            return Err(PoolError::InvalidProof("unknown or stale exclusion root"));
        }
        if set.info().active && set.is_member(commitment) {
            return Err(PoolError::InvalidProof("commitment is in the exclusion set"));
        }
        Ok(())
    }

    /// anyone may relay a withdrawal; `caller` is only logged
    pub fn withdraw(&mut self, caller: &AccountId, request: &WithdrawalRequest) -> Result<()> {
        self.ensure_live()?;
        self.check_withdrawal(request)?;

        let now = self.clock.now();
        self.nullifiers.insert(request.nullifier, now);
        self.debit_liquidity(request.asset_id, request.amount);

        if !self
            .ledger
            .transfer(request.asset_id, &request.recipient, request.amount)
        {
            self.nullifiers.remove(&request.nullifier);
            self.credit_liquidity(request.asset_id, request.amount);
            warn!(
                recipient = %short(&request.recipient),
                amount = request.amount,
                "withdrawal payout refused, nullifier released"
            );
            return Err(PoolError::TransferFailed);
        }

        self.events.push(PoolEvent::Withdrawn {
            nullifier: request.nullifier,
            recipient: request.recipient,
            asset_id: request.asset_id,
            amount: request.amount,
        });
        info!(
            relayer = %short(caller),
            asset_id = request.asset_id,
            amount = request.amount,
            "withdrawal paid"
        );
        Ok(())
    }

    fn credit_liquidity(&mut self, asset_id: AssetId, amount: Amount) {
        let liquidity = self.liquidity.entry(asset_id).or_insert(0);
        *liquidity = liquidity.saturating_add(amount);
    }

    fn debit_liquidity(&mut self, asset_id: AssetId, amount: Amount) {
        let liquidity = self.liquidity.entry(asset_id).or_insert(0);
        *liquidity = liquidity.saturating_sub(amount);
    }

    // ============ ragequit ============

    /// depositor opens the commitment to start the exit timer
    pub fn request_ragequit(
        &mut self,
        caller: &AccountId,
        claim: &RagequitClaim,
        recipient: AccountId,
    ) -> Result<RequestId> {
        self.ensure_live()?;
        let record = self
            .deposits
            .get(&claim.commitment)
            .ok_or(PoolError::NotFound("deposit"))?;
        if &record.depositor != caller {
            return Err(PoolError::Unauthorized("only the depositor may ragequit"));
        }
        if claim.amount == 0 || claim.amount != record.amount {
            return Err(PoolError::InvalidInput("claimed amount differs from the deposit"));
        }
        let opened = note_commitment(
            &claim.secret,
            &claim.nullifier_seed,
            claim.amount,
            record.asset_id,
        );
        if opened != claim.commitment {
            return Err(PoolError::InvalidProof("commitment opening"));
        }
        let amount_commitment = Point::from_public_bytes(&record.amount_commitment)?;
        if !verify_opening(&amount_commitment, claim.amount, &claim.blinding) {
            return Err(PoolError::InvalidProof("amount commitment opening"));
        }
        let nullifier = derive_nullifier(&claim.nullifier_seed);
        if self.nullifiers.contains_key(&nullifier) {
            return Err(PoolError::AlreadySpent);
        }

        let now = self.clock.now();
        if self
            .ragequits
            .values()
            .any(|r| r.commitment == claim.commitment && r.effective_status(now).is_open())
        {
            return Err(PoolError::AlreadyExists("open ragequit for this deposit"));
        }
        let executable_at = now
            .checked_add(self.config.ragequit_delay)
            .ok_or(PoolError::InvalidInput("ragequit delay overflows"))?;
        let expires_at = executable_at
            .checked_add(self.config.ragequit_window)
            .ok_or(PoolError::InvalidInput("ragequit window overflows"))?;

        let request_id = self.next_request_id;
        self.next_request_id += 1;
        let request = RagequitRequest {
            request_id,
            commitment: claim.commitment,
            nullifier,
            depositor: *caller,
            asset_id: record.asset_id,
            amount: record.amount,
            recipient,
            initiated_at: now,
            executable_at,
            expires_at,
            status: RagequitStatus::Pending,
        };
        self.ragequits.insert(request_id, request);

        self.events.push(PoolEvent::RagequitRequested {
            request_id,
            commitment: claim.commitment,
            executable_at,
            expires_at,
        });
        info!(request_id, executable_at, expires_at, "ragequit requested");
        Ok(request_id)
    }

    /// pays out without any compliance check; open while paused
    pub fn execute_ragequit(&mut self, caller: &AccountId, request_id: RequestId) -> Result<()> {
        self.initialized_roles()?;
        let now = self.clock.now();
        let request = self
            .ragequits
            .get(&request_id)
            .ok_or(PoolError::NotFound("ragequit request"))?;
        if &request.depositor != caller {
            return Err(PoolError::Unauthorized("only the depositor may execute"));
        }
        request.ensure_executable(now)?;
        if self.nullifiers.contains_key(&request.nullifier) {
            warn!(request_id, "ragequit for an already spent nullifier");
            return Err(PoolError::AlreadySpent);
        }
        if self.liquidity(request.asset_id) < request.amount {
            return Err(PoolError::InsufficientLiquidity {
                asset_id: request.asset_id,
            });
        }
        let (nullifier, commitment, asset_id, amount, recipient) = (
            request.nullifier,
            request.commitment,
            request.asset_id,
            request.amount,
            request.recipient,
        );

        let previous = self.advance_ragequit(request_id, RagequitStatus::Completed, now)?;
        self.nullifiers.insert(nullifier, now);
        self.debit_liquidity(asset_id, amount);

        if !self.ledger.transfer(asset_id, &recipient, amount) {
            self.nullifiers.remove(&nullifier);
            self.credit_liquidity(asset_id, amount);
            self.restore_ragequit_status(request_id, previous);
            warn!(request_id, recipient = %short(&recipient), amount, "ragequit payout refused");
            return Err(PoolError::TransferFailed);
        }

        self.events.push(PoolEvent::RagequitExecuted {
            request_id,
            commitment,
            nullifier,
            recipient,
            amount,
        });
        info!(request_id, amount, "ragequit executed, compliance bypassed");
        Ok(())
    }

    /// depositor only, while Pending or Executable
    pub fn cancel_ragequit(&mut self, caller: &AccountId, request_id: RequestId) -> Result<()> {
        self.initialized_roles()?;
        let now = self.clock.now();
        let request = self
            .ragequits
            .get(&request_id)
            .ok_or(PoolError::NotFound("ragequit request"))?;
        if &request.depositor != caller {
            return Err(PoolError::Unauthorized("only the depositor may cancel"));
        }

        self.advance_ragequit(request_id, RagequitStatus::Cancelled, now)?;
        self.events.push(PoolEvent::RagequitCancelled { request_id });
        info!(request_id, "ragequit cancelled");
        Ok(())
    }

    /// anyone, once the window has closed; records the expiry
    pub fn expire_ragequit(&mut self, request_id: RequestId) -> Result<()> {
        self.initialized_roles()?;
        let now = self.clock.now();
        self.ragequits
            .get_mut(&request_id)
            .ok_or(PoolError::NotFound("ragequit request"))?
            .expire(now)?;
        self.events.push(PoolEvent::RagequitExpired { request_id });
        debug!(request_id, "ragequit expired");
        Ok(())
    }

    /// table-checked status change; returns the stored status it replaced
    fn advance_ragequit(
        &mut self,
        request_id: RequestId,
        next: RagequitStatus,
        now: Timestamp,
    ) -> Result<RagequitStatus> {
        self.ragequits
            .get_mut(&request_id)
            .ok_or(PoolError::NotFound("ragequit request"))?
            .advance(next, now)
    }

    /// undo an `advance_ragequit` whose payout was refused
    fn restore_ragequit_status(&mut self, request_id: RequestId, previous: RagequitStatus) {
        if let Some(request) = self.ragequits.get_mut(&request_id) {
            request.status = previous;
        }
    }

    pub fn ragequit_status(&self, request_id: RequestId) -> Result<RagequitStatus> {
        self.ragequits
            .get(&request_id)
            .map(|r| r.effective_status(self.clock.now()))
            .ok_or(PoolError::NotFound("ragequit request"))
    }

    pub fn ragequit(&self, request_id: RequestId) -> Option<&RagequitRequest> {
        self.ragequits.get(&request_id)
    }

    // ============ queries ============

    pub fn config(&self) -> &PoolConfig {
        &self.config
    }

    pub fn is_initialized(&self) -> bool {
        self.roles.is_some()
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }

    pub fn roles(&self) -> Option<&Roles> {
        self.roles.as_ref()
    }

    pub fn pool_account(&self) -> &AccountId {
        &self.pool_account
    }

    pub fn deposit_record(&self, commitment: &Commitment) -> Option<&DepositRecord> {
        self.deposits.get(commitment)
    }

    pub fn deposit_at(&self, index: u64) -> Option<&DepositRecord> {
        self.deposit_tree
            .leaf(index)
            .and_then(|leaf| self.deposits.get(&Commitment(leaf)))
    }

    pub fn deposit_tree(&self) -> &LeanImt {
        &self.deposit_tree
    }

    pub fn deposit_state(&self) -> MerkleState {
        self.deposit_tree.state()
    }

    pub fn generate_deposit_proof(&self, commitment: &Commitment) -> Result<MerkleProof> {
        Ok(self.deposit_tree.generate_proof_for(&commitment.0)?)
    }

    /// current or retained deposit root
    pub fn is_known_root(&self, root: &Hash) -> bool {
        self.deposit_roots.contains(root)
    }

    pub fn is_spent(&self, nullifier: &Nullifier) -> bool {
        self.nullifiers.contains_key(nullifier)
    }

    pub fn asp(&self, asp_id: AspId) -> Option<&AspInfo> {
        self.asps.get(asp_id)
    }

    pub fn asp_by_owner(&self, owner: &AccountId) -> Option<&AspInfo> {
        self.asps.by_owner(owner)
    }

    pub fn association_set(&self, set_id: SetId) -> Option<&AssociationSet> {
        self.sets.get(set_id)
    }

    pub fn generate_membership_proof(
        &self,
        set_id: SetId,
        commitment: &Commitment,
    ) -> Result<MerkleProof> {
        self.sets
            .get(set_id)
            .ok_or(PoolError::NotFound("association set"))?
            .generate_proof(commitment)
    }

    /// false for unknown sets
    pub fn verify_membership(&self, set_id: SetId, proof: &MerkleProof) -> bool {
        self.sets
            .get(set_id)
            .map(|set| set.verify_membership(proof))
            .unwrap_or(false)
    }

    pub fn is_member(&self, set_id: SetId, commitment: &Commitment) -> bool {
        self.sets
            .get(set_id)
            .map(|set| set.is_member(commitment))
            .unwrap_or(false)
    }

    pub fn liquidity(&self, asset_id: AssetId) -> Amount {
        self.liquidity.get(&asset_id).copied().unwrap_or(0)
    }

    pub fn staked(&self) -> Amount {
        self.staked
    }

    pub fn ledger(&self) -> &L {
        &self.ledger
    }

    pub fn ledger_mut(&mut self) -> &mut L {
        &mut self.ledger
    }

    pub fn clock(&self) -> &C {
        &self.clock
    }

    /// take all events recorded since the last drain
    pub fn drain_events(&mut self) -> Vec<PoolEvent> {
        std::mem::take(&mut self.events)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{ManualClock, MemoryLedger, Note, StaticVerifier};
    use lean_imt::hash_pair;
    use pool_elgamal::KeyPair;
    use rand::rngs::OsRng;

    type TestPool = PrivacyPool<MemoryLedger, StaticVerifier, ManualClock>;

    const OWNER: AccountId = [1; 32];
    const AUDITOR_A: AccountId = [2; 32];
    const AUDITOR_B: AccountId = [3; 32];
    const ASP_OWNER: AccountId = [4; 32];
    const ALICE: AccountId = [5; 32];
    const RECIPIENT: AccountId = [6; 32];
    const POOL: AccountId = [0xee; 32];
    const T0: Timestamp = 1_700_000_000;

    fn pool_with(verifier: StaticVerifier) -> (TestPool, ManualClock) {
        let clock = ManualClock::new(T0);
        let mut ledger = MemoryLedger::new(POOL);
        ledger.mint(0, &ASP_OWNER, 1_000_000);
        ledger.mint(0, &ALICE, 1_000_000);
        let mut pool = PrivacyPool::new(PoolConfig::default(), ledger, verifier, clock.clone()).unwrap();
        pool.initialize(OWNER, &[AUDITOR_A, AUDITOR_B], POOL).unwrap();
        (pool, clock)
    }

    fn asp_key() -> [u8; 32] {
        KeyPair::random(&mut OsRng).public_key().compress()
    }

    fn active_asp(pool: &mut TestPool) -> AspId {
        let id = pool.register_asp(&ASP_OWNER, asp_key(), [0; 32], 10_000).unwrap();
        pool.approve_asp(&AUDITOR_A, id).unwrap();
        pool.approve_asp(&AUDITOR_B, id).unwrap();
        id
    }

    /// deposit `note` and certify it in a fresh inclusion set
    fn certified(pool: &mut TestPool, note: &Note) -> WithdrawalRequest {
        pool.deposit(&ALICE, &note.deposit_request()).unwrap();
        let set_id = pool
            .create_association_set(&ASP_OWNER, SetType::Inclusion, &[note.commitment()])
            .unwrap();
        WithdrawalRequest {
            nullifier: note.nullifier(),
            recipient: RECIPIENT,
            asset_id: note.asset_id(),
            amount: note.amount(),
            deposit_proof: pool.generate_deposit_proof(&note.commitment()).unwrap(),
            inclusion: SetMembership {
                set_id,
                proof: pool.generate_membership_proof(set_id, &note.commitment()).unwrap(),
            },
            exclusion: None,
            proof: vec![1, 2, 3],
        }
    }

    #[test]
    fn test_rejects_invalid_config() {
        let config = PoolConfig {
            approval_threshold: 0,
            ..Default::default()
        };
        let result = PrivacyPool::new(config, MemoryLedger::new(POOL), StaticVerifier::accepting(), ManualClock::new(0));
        assert!(matches!(result, Err(PoolError::Config(_))));
    }

    #[test]
    fn test_initialization_guard() {
        let mut pool = PrivacyPool::new(
            PoolConfig::default(),
            MemoryLedger::new(POOL),
            StaticVerifier::accepting(),
            ManualClock::new(T0),
        )
        .unwrap();
        let note = Note::random(&mut OsRng, 10, 0);

        assert_eq!(pool.deposit(&ALICE, &note.deposit_request()), Err(PoolError::NotInitialized));
        assert_eq!(
            pool.register_asp(&ASP_OWNER, asp_key(), [0; 32], 10_000),
            Err(PoolError::NotInitialized)
        );
        assert_eq!(pool.pause(&OWNER), Err(PoolError::NotInitialized));

        pool.initialize(OWNER, &[AUDITOR_A], POOL).unwrap();
        assert!(pool.is_initialized());
        assert_eq!(
            pool.initialize(ALICE, &[], POOL),
            Err(PoolError::AlreadyInitialized)
        );
        assert_eq!(pool.roles().unwrap().owner(), &OWNER);
    }

    #[test]
    fn test_auditor_management() {
        let (mut pool, _) = pool_with(StaticVerifier::accepting());
        let carol = [9; 32];

        assert!(matches!(pool.add_auditor(&ALICE, carol), Err(PoolError::Unauthorized(_))));
        pool.add_auditor(&OWNER, carol).unwrap();
        assert!(matches!(pool.add_auditor(&OWNER, carol), Err(PoolError::AlreadyExists(_))));

        let id = pool.register_asp(&ASP_OWNER, asp_key(), [0; 32], 10_000).unwrap();
        assert_eq!(pool.approve_asp(&carol, id), Ok(AspStatus::Pending));

        pool.remove_auditor(&OWNER, &carol).unwrap();
        assert!(matches!(pool.approve_asp(&carol, id), Err(PoolError::Unauthorized(_))));
        assert!(matches!(pool.remove_auditor(&OWNER, &carol), Err(PoolError::NotFound(_))));
    }

    #[test]
    fn test_register_asp_checks() {
        let (mut pool, _) = pool_with(StaticVerifier::accepting());

        assert!(matches!(
            pool.register_asp(&ASP_OWNER, [0; 32], [0; 32], 10_000),
            Err(PoolError::InvalidInput(_))
        ));
        assert_eq!(
            pool.register_asp(&ASP_OWNER, asp_key(), [0; 32], 9_999),
            Err(PoolError::InsufficientStake {
                provided: 9_999,
                minimum: 10_000
            })
        );
        // no funds
        assert_eq!(
            pool.register_asp(&RECIPIENT, asp_key(), [0; 32], 10_000),
            Err(PoolError::TransferFailed)
        );
        assert!(pool.asp_by_owner(&RECIPIENT).is_none());

        let id = pool.register_asp(&ASP_OWNER, asp_key(), [7; 32], 12_000).unwrap();
        assert_eq!(pool.staked(), 12_000);
        assert_eq!(pool.ledger().balance_of(0, &POOL), 12_000);
        assert_eq!(pool.asp(id).unwrap().status, AspStatus::Pending);
        assert!(matches!(
            pool.register_asp(&ASP_OWNER, asp_key(), [0; 32], 10_000),
            Err(PoolError::AlreadyExists(_))
        ));
    }

    #[test]
    fn test_governance_permissions() {
        let (mut pool, _) = pool_with(StaticVerifier::accepting());
        let id = active_asp(&mut pool);

        assert!(matches!(pool.suspend_asp(&ALICE, id, 1), Err(PoolError::Unauthorized(_))));
        pool.suspend_asp(&AUDITOR_A, id, 3).unwrap();
        assert_eq!(pool.asp(id).unwrap().suspension_reason, Some(3));

        assert!(matches!(pool.reinstate_asp(&AUDITOR_A, id), Err(PoolError::Unauthorized(_))));
        pool.reinstate_asp(&OWNER, id).unwrap();
        assert_eq!(pool.asp(id).unwrap().status, AspStatus::Active);

        assert!(matches!(pool.revoke_asp(&AUDITOR_B, id), Err(PoolError::Unauthorized(_))));
        pool.revoke_asp(&OWNER, id).unwrap();
        assert!(matches!(
            pool.reinstate_asp(&OWNER, id),
            Err(PoolError::InvalidTransition { from: "Revoked", .. })
        ));
    }

    #[test]
    fn test_set_ownership() {
        let (mut pool, _) = pool_with(StaticVerifier::accepting());
        let id = active_asp(&mut pool);
        let set_id = pool
            .create_association_set(&ASP_OWNER, SetType::Inclusion, &[])
            .unwrap();
        assert_eq!(pool.asp(id).unwrap().set_count, 1);

        let member = Commitment([8; 32]);
        assert!(matches!(
            pool.add_to_association_set(&ALICE, set_id, &[member]),
            Err(PoolError::Unauthorized(_))
        ));
        pool.add_to_association_set(&ASP_OWNER, set_id, &[member]).unwrap();
        assert!(pool.is_member(set_id, &member));

        pool.suspend_asp(&OWNER, id, 0).unwrap();
        assert!(matches!(
            pool.add_to_association_set(&ASP_OWNER, set_id, &[Commitment([9; 32])]),
            Err(PoolError::Unauthorized(_))
        ));

        assert!(matches!(
            pool.deactivate_association_set(&ALICE, set_id),
            Err(PoolError::Unauthorized(_))
        ));
        pool.deactivate_association_set(&OWNER, set_id).unwrap();
        assert!(!pool.association_set(set_id).unwrap().info().active);
    }

    #[test]
    fn test_batch_size_limit() {
        let (mut pool, _) = pool_with(StaticVerifier::accepting());
        active_asp(&mut pool);
        let members: Vec<Commitment> = (0..65u8).map(|i| Commitment([i; 32])).collect();
        assert!(matches!(
            pool.create_association_set(&ASP_OWNER, SetType::Inclusion, &members),
            Err(PoolError::CapacityExceeded(_))
        ));
    }

    #[test]
    fn test_deposit_validation() {
        let (mut pool, _) = pool_with(StaticVerifier::accepting());
        let note = Note::random(&mut OsRng, 100, 0);

        let mut zero = note.deposit_request();
        zero.amount = 0;
        assert!(matches!(pool.deposit(&ALICE, &zero), Err(PoolError::InvalidInput(_))));

        let mut identity = note.deposit_request();
        identity.amount_commitment = Point::identity().compress();
        assert!(matches!(pool.deposit(&ALICE, &identity), Err(PoolError::InvalidInput(_))));

        pool.deposit(&ALICE, &note.deposit_request()).unwrap();
        assert!(matches!(
            pool.deposit(&ALICE, &note.deposit_request()),
            Err(PoolError::AlreadyExists(_))
        ));
        assert_eq!(pool.liquidity(0), 100);
        assert_eq!(pool.deposit_at(0).unwrap().depositor, ALICE);
    }

    #[test]
    fn test_range_proof_goes_to_verifier() {
        let (mut pool, _) = pool_with(StaticVerifier::rejecting());
        let note = Note::random(&mut OsRng, 100, 0);
        let mut request = note.deposit_request();

        // no proof attached, verifier not consulted
        pool.deposit(&ALICE, &request).unwrap();

        let other = Note::random(&mut OsRng, 100, 0);
        request = other.deposit_request();
        request.range_proof = Some(vec![0xff]);
        assert!(matches!(pool.deposit(&ALICE, &request), Err(PoolError::InvalidProof(_))));
        assert_eq!(pool.deposit_state().size, 1);
    }

    #[test]
    fn test_refused_deposit_writes_nothing() {
        let (mut pool, _) = pool_with(StaticVerifier::accepting());
        let note = Note::random(&mut OsRng, 5_000_000, 0);
        assert_eq!(
            pool.deposit(&ALICE, &note.deposit_request()),
            Err(PoolError::TransferFailed)
        );
        assert_eq!(pool.deposit_state().size, 0);
        assert!(pool.deposit_record(&note.commitment()).is_none());
    }

    #[test]
    fn test_batch_refunds_on_partial_pull() {
        let (mut pool, _) = pool_with(StaticVerifier::accepting());
        pool.ledger_mut().mint(1, &ALICE, 10);
        let requests = vec![
            Note::random(&mut OsRng, 100, 0).deposit_request(),
            Note::random(&mut OsRng, 50, 1).deposit_request(),
        ];

        assert_eq!(pool.batch_deposit(&ALICE, &requests), Err(PoolError::TransferFailed));
        assert_eq!(pool.ledger().balance_of(0, &ALICE), 1_000_000);
        assert_eq!(pool.ledger().balance_of(1, &ALICE), 10);
        assert_eq!(pool.deposit_state().size, 0);
    }

    #[test]
    fn test_batch_rejects_duplicates() {
        let (mut pool, _) = pool_with(StaticVerifier::accepting());
        let request = Note::random(&mut OsRng, 100, 0).deposit_request();
        assert!(matches!(
            pool.batch_deposit(&ALICE, &[request.clone(), request]),
            Err(PoolError::AlreadyExists(_))
        ));
        assert!(matches!(pool.batch_deposit(&ALICE, &[]), Err(PoolError::InvalidInput(_))));
    }

    #[test]
    fn test_withdraw_check_order() {
        let (mut pool, _) = pool_with(StaticVerifier::rejecting());
        active_asp(&mut pool);
        let note = Note::random(&mut OsRng, 100, 0);
        let request = certified(&mut pool, &note);

        // everything valid except the verifier
        assert_eq!(
            pool.withdraw(&ALICE, &request),
            Err(PoolError::InvalidProof("withdrawal proof rejected"))
        );

        // a bad merkle proof is reported before the verifier
        let mut bad = request.clone();
        bad.deposit_proof.root = [0xab; 32];
        assert_eq!(
            pool.withdraw(&ALICE, &bad),
            Err(PoolError::InvalidProof("unknown or stale deposit root"))
        );
        assert!(!pool.is_spent(&note.nullifier()));
    }

    #[test]
    fn test_withdraw_compliance_checks() {
        let (mut pool, _) = pool_with(StaticVerifier::accepting());
        let asp_id = active_asp(&mut pool);
        let note = Note::random(&mut OsRng, 100, 0);
        let request = certified(&mut pool, &note);

        // membership proof for a different commitment
        let other = Note::random(&mut OsRng, 100, 0);
        pool.add_to_association_set(&ASP_OWNER, request.inclusion.set_id, &[other.commitment()])
            .unwrap();
        let mut wrong = request.clone();
        wrong.inclusion.proof = pool
            .generate_membership_proof(request.inclusion.set_id, &other.commitment())
            .unwrap();
        assert!(matches!(pool.withdraw(&ALICE, &wrong), Err(PoolError::InvalidProof(_))));

        // exclusion set flags the deposit
        let flagged = pool
            .create_association_set(&ASP_OWNER, SetType::Exclusion, &[note.commitment()])
            .unwrap();
        let mut excluded = request.clone();
        excluded.exclusion = Some(ExclusionCheck {
            set_id: flagged,
            root: pool.association_set(flagged).unwrap().root(),
        });
        assert_eq!(
            pool.withdraw(&ALICE, &excluded),
            Err(PoolError::InvalidProof("commitment is in the exclusion set"))
        );

        // inclusion set used as exclusion
        let mut swapped = request.clone();
        swapped.exclusion = Some(ExclusionCheck {
            set_id: request.inclusion.set_id,
            root: request.inclusion.proof.root,
        });
        assert!(matches!(pool.withdraw(&ALICE, &swapped), Err(PoolError::InvalidInput(_))));

        // suspended asp stops certifying
        pool.suspend_asp(&AUDITOR_A, asp_id, 1).unwrap();
        assert!(matches!(pool.withdraw(&ALICE, &request), Err(PoolError::InvalidProof(_))));
        pool.reinstate_asp(&OWNER, asp_id).unwrap();

        pool.withdraw(&ALICE, &request).unwrap();
        assert_eq!(pool.ledger().balance_of(0, &RECIPIENT), 100);
        assert_eq!(pool.liquidity(0), 0);
    }

    #[test]
    fn test_interior_node_is_not_certified() {
        let (mut pool, _) = pool_with(StaticVerifier::accepting());
        active_asp(&mut pool);
        let a = Note::random(&mut OsRng, 100, 0);
        let b = Note::random(&mut OsRng, 100, 0);
        let set_id = pool
            .create_association_set(&ASP_OWNER, SetType::Inclusion, &[a.commitment(), b.commitment()])
            .unwrap();

        // deposit the set's root as if it were a commitment
        let node = Commitment(hash_pair(&a.commitment().0, &b.commitment().0));
        let cover = Note::random(&mut OsRng, 100, 0);
        let mut deposit = cover.deposit_request();
        deposit.commitment = node;
        pool.deposit(&ALICE, &deposit).unwrap();
        assert!(!pool.is_member(set_id, &node));

        let request = WithdrawalRequest {
            nullifier: cover.nullifier(),
            recipient: RECIPIENT,
            asset_id: 0,
            amount: 100,
            deposit_proof: pool.generate_deposit_proof(&node).unwrap(),
            inclusion: SetMembership {
                set_id,
                proof: MerkleProof {
                    siblings: vec![],
                    path_indices: vec![],
                    leaf: node.0,
                    root: node.0,
                    tree_size: 2,
                },
            },
            exclusion: None,
            proof: Vec::new(),
        };
        assert!(request.inclusion.proof.verify());
        assert_eq!(
            pool.withdraw(&ALICE, &request),
            Err(PoolError::InvalidProof("association set membership"))
        );
        assert_eq!(pool.ledger().balance_of(0, &RECIPIENT), 0);
        assert!(!pool.is_spent(&cover.nullifier()));
    }

    #[test]
    fn test_deposit_proof_must_match_tree_shape() {
        let (mut pool, _) = pool_with(StaticVerifier::accepting());
        active_asp(&mut pool);
        let note = Note::random(&mut OsRng, 100, 0);
        let mut request = certified(&mut pool, &note);

        // same leaf and root, claiming a size the tree never had
        request.deposit_proof.tree_size = 2;
        assert_eq!(
            pool.withdraw(&ALICE, &request),
            Err(PoolError::InvalidProof("deposit merkle proof"))
        );
    }

    #[test]
    fn test_public_inputs_bind_the_checked_note() {
        let (mut pool, _) = pool_with(StaticVerifier::accepting());
        active_asp(&mut pool);
        let c = Note::random(&mut OsRng, 100, 0);
        let d = Note::random(&mut OsRng, 100, 0);
        let for_c = certified(&mut pool, &c);
        let for_d = certified(&mut pool, &d);

        // one nullifier, merkle proofs about two different notes
        let mut mixed = for_c.clone();
        mixed.deposit_proof = for_d.deposit_proof.clone();
        mixed.deposit_proof.root = for_c.deposit_proof.root;
        let inputs = for_c.public_inputs();
        assert_ne!(inputs, mixed.public_inputs());
        assert!(inputs.contains(&c.commitment().0));
        assert!(!inputs.contains(&d.commitment().0));

        let flagged = pool
            .create_association_set(&ASP_OWNER, SetType::Exclusion, &[d.commitment()])
            .unwrap();
        let root = pool.association_set(flagged).unwrap().root();
        let mut excluded = for_c.clone();
        excluded.exclusion = Some(ExclusionCheck { set_id: flagged, root });
        let with_exclusion = excluded.public_inputs();
        assert!(with_exclusion.contains(&root));
        assert_eq!(with_exclusion.len(), inputs.len());
        assert_ne!(with_exclusion, inputs);
    }

    #[test]
    fn test_exclusion_root_must_be_known() {
        let (mut pool, _) = pool_with(StaticVerifier::accepting());
        active_asp(&mut pool);
        let note = Note::random(&mut OsRng, 100, 0);
        let other = Note::random(&mut OsRng, 100, 0);
        let mut request = certified(&mut pool, &note);
        let flagged = pool
            .create_association_set(&ASP_OWNER, SetType::Exclusion, &[other.commitment()])
            .unwrap();

        request.exclusion = Some(ExclusionCheck {
            set_id: flagged,
            root: [0x5a; 32],
        });
        assert_eq!(
            pool.withdraw(&ALICE, &request),
            Err(PoolError::InvalidProof("unknown or stale exclusion root"))
        );

        // an older root of the set is still accepted
        let old_root = pool.association_set(flagged).unwrap().root();
        let later = Note::random(&mut OsRng, 100, 0);
        pool.add_to_association_set(&ASP_OWNER, flagged, &[later.commitment()])
            .unwrap();
        request.exclusion = Some(ExclusionCheck {
            set_id: flagged,
            root: old_root,
        });
        pool.withdraw(&ALICE, &request).unwrap();
    }

    #[test]
    fn test_spent_nullifier_reported_before_amount() {
        let (mut pool, _) = pool_with(StaticVerifier::accepting());
        active_asp(&mut pool);
        let note = Note::random(&mut OsRng, 100, 0);
        let request = certified(&mut pool, &note);

        let mut zero = request.clone();
        zero.amount = 0;
        assert!(matches!(pool.withdraw(&ALICE, &zero), Err(PoolError::InvalidInput(_))));

        pool.withdraw(&ALICE, &request).unwrap();
        assert_eq!(pool.withdraw(&ALICE, &zero), Err(PoolError::AlreadySpent));
    }

    #[test]
    fn test_withdraw_amount_must_match() {
        let (mut pool, _) = pool_with(StaticVerifier::accepting());
        active_asp(&mut pool);
        let note = Note::random(&mut OsRng, 100, 0);
        let mut request = certified(&mut pool, &note);
        request.amount = 101;
        assert!(matches!(pool.withdraw(&ALICE, &request), Err(PoolError::InvalidInput(_))));
    }

    #[test]
    fn test_refused_payout_releases_nullifier() {
        let (mut pool, _) = pool_with(StaticVerifier::accepting());
        active_asp(&mut pool);
        let note = Note::random(&mut OsRng, 100, 0);
        let request = certified(&mut pool, &note);

        pool.ledger_mut().freeze(&RECIPIENT);
        assert_eq!(pool.withdraw(&ALICE, &request), Err(PoolError::TransferFailed));
        assert!(!pool.is_spent(&note.nullifier()));
        assert_eq!(pool.liquidity(0), 100);

        pool.ledger_mut().unfreeze(&RECIPIENT);
        pool.withdraw(&ALICE, &request).unwrap();
        assert!(pool.is_spent(&note.nullifier()));
    }

    #[test]
    fn test_pause_blocks_entry_but_not_exit() {
        let (mut pool, clock) = pool_with(StaticVerifier::accepting());
        let note = Note::random(&mut OsRng, 100, 0);
        pool.deposit(&ALICE, &note.deposit_request()).unwrap();
        let request_id = pool
            .request_ragequit(&ALICE, &note.ragequit_claim(), RECIPIENT)
            .unwrap();

        assert!(matches!(pool.pause(&ALICE), Err(PoolError::Unauthorized(_))));
        pool.pause(&OWNER).unwrap();
        assert!(pool.is_paused());

        let next = Note::random(&mut OsRng, 100, 0);
        assert_eq!(pool.deposit(&ALICE, &next.deposit_request()), Err(PoolError::Paused));

        clock.advance(pool.config().ragequit_delay);
        pool.execute_ragequit(&ALICE, request_id).unwrap();

        pool.unpause(&OWNER).unwrap();
        pool.deposit(&ALICE, &next.deposit_request()).unwrap();
    }

    #[test]
    fn test_ragequit_requires_depositor_and_opening() {
        let (mut pool, _) = pool_with(StaticVerifier::accepting());
        let note = Note::random(&mut OsRng, 100, 0);
        pool.deposit(&ALICE, &note.deposit_request()).unwrap();

        assert!(matches!(
            pool.request_ragequit(&RECIPIENT, &note.ragequit_claim(), RECIPIENT),
            Err(PoolError::Unauthorized(_))
        ));

        let mut bad_secret = note.ragequit_claim();
        bad_secret.secret[0] ^= 1;
        assert_eq!(
            pool.request_ragequit(&ALICE, &bad_secret, RECIPIENT),
            Err(PoolError::InvalidProof("commitment opening"))
        );

        let mut bad_blinding = note.ragequit_claim();
        bad_blinding.blinding += pool_elgamal::Scalar::ONE;
        assert_eq!(
            pool.request_ragequit(&ALICE, &bad_blinding, RECIPIENT),
            Err(PoolError::InvalidProof("amount commitment opening"))
        );

        pool.request_ragequit(&ALICE, &note.ragequit_claim(), RECIPIENT)
            .unwrap();
        assert!(matches!(
            pool.request_ragequit(&ALICE, &note.ragequit_claim(), RECIPIENT),
            Err(PoolError::AlreadyExists(_))
        ));
    }

    #[test]
    fn test_ragequit_cancel_and_expire() {
        let (mut pool, clock) = pool_with(StaticVerifier::accepting());
        let note = Note::random(&mut OsRng, 100, 0);
        pool.deposit(&ALICE, &note.deposit_request()).unwrap();

        let first = pool
            .request_ragequit(&ALICE, &note.ragequit_claim(), RECIPIENT)
            .unwrap();
        assert!(matches!(pool.cancel_ragequit(&RECIPIENT, first), Err(PoolError::Unauthorized(_))));
        pool.cancel_ragequit(&ALICE, first).unwrap();
        assert_eq!(pool.ragequit_status(first), Ok(RagequitStatus::Cancelled));
        assert!(pool.execute_ragequit(&ALICE, first).is_err());

        // a cancelled request does not block a new one
        let second = pool
            .request_ragequit(&ALICE, &note.ragequit_claim(), RECIPIENT)
            .unwrap();
        assert!(matches!(
            pool.expire_ragequit(second),
            Err(PoolError::InvalidTransition { from: "Pending", .. })
        ));

        let request = pool.ragequit(second).unwrap().clone();
        clock.set(request.expires_at + 1);
        assert_eq!(pool.ragequit_status(second), Ok(RagequitStatus::Expired));
        assert_eq!(
            pool.execute_ragequit(&ALICE, second),
            Err(PoolError::Expired {
                expires_at: request.expires_at,
                now: request.expires_at + 1
            })
        );
        pool.expire_ragequit(second).unwrap();
        assert_eq!(pool.ragequit(second).unwrap().status, RagequitStatus::Expired);
        assert!(!pool.is_spent(&note.nullifier()));
    }

    #[test]
    fn test_ragequit_refused_payout_reverts() {
        let (mut pool, clock) = pool_with(StaticVerifier::accepting());
        let note = Note::random(&mut OsRng, 100, 0);
        pool.deposit(&ALICE, &note.deposit_request()).unwrap();
        let id = pool
            .request_ragequit(&ALICE, &note.ragequit_claim(), RECIPIENT)
            .unwrap();
        clock.advance(pool.config().ragequit_delay);

        pool.ledger_mut().freeze(&RECIPIENT);
        assert_eq!(pool.execute_ragequit(&ALICE, id), Err(PoolError::TransferFailed));
        assert_eq!(pool.ragequit_status(id), Ok(RagequitStatus::Executable));
        // the stored status is restored, not rewritten
        assert_eq!(pool.ragequit(id).unwrap().status, RagequitStatus::Pending);
        assert!(!pool.is_spent(&note.nullifier()));

        pool.ledger_mut().unfreeze(&RECIPIENT);
        pool.execute_ragequit(&ALICE, id).unwrap();
        assert_eq!(pool.ragequit_status(id), Ok(RagequitStatus::Completed));
        assert_eq!(pool.ragequit(id).unwrap().status, RagequitStatus::Completed);
        assert!(matches!(
            pool.cancel_ragequit(&ALICE, id),
            Err(PoolError::InvalidTransition { from: "Completed", to: "Cancelled" })
        ));
    }

    #[test]
    fn test_events_drained() {
        let (mut pool, _) = pool_with(StaticVerifier::accepting());
        let events = pool.drain_events();
        assert!(matches!(events.as_slice(), [PoolEvent::Initialized { .. }]));
        assert!(pool.drain_events().is_empty());

        let note = Note::random(&mut OsRng, 100, 0);
        pool.deposit(&ALICE, &note.deposit_request()).unwrap();
        match pool.drain_events().as_slice() {
            [PoolEvent::Deposited { commitment, index, .. }] => {
                assert_eq!(*commitment, note.commitment());
                assert_eq!(*index, 0);
            }
            other => panic!("unexpected events: {:?}", other),
        }
    }
}
