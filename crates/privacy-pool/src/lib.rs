//! compliance-compatible privacy pool
//!
//! deposits go into one global lean merkle tree. withdrawals prove
//! membership of the deposit and of an ASP-certified inclusion set, spend a
//! nullifier and pay out. depositors who never get certified can ragequit
//! after a fixed delay, publicly linking their nullifier to the exit.
//!
//! ```text
//! ┌──────────────────────────── PrivacyPool ────────────────────────────┐
//! │                                                                     │
//! │  roles ── owner + auditors                                          │
//! │  asps  ── Pending ──(M-of-N votes)──▶ Active ◀──▶ Suspended         │
//! │                                        └──────────┴──▶ Revoked      │
//! │  sets  ── inclusion / exclusion, one LeanImt + root ring each       │
//! │                                                                     │
//! │  deposit tree (LeanImt) + root ring ── deposits by commitment       │
//! │  nullifiers ── spent once, by withdraw or ragequit                  │
//! │  ragequits ── Pending ─(delay)─▶ Executable ─▶ Completed            │
//! │                                                                     │
//! └──── TokenLedger ─── ProofVerifier ─── Clock (collaborators) ────────┘
//! ```
//!
//! every entry point validates all preconditions before its first write.
//! calls that pay out mutate first, then call the ledger, and roll the
//! mutation back if the ledger refuses.

pub mod asp;
pub mod association;
pub mod collaborators;
pub mod config;
mod error;
pub mod event;
pub mod memory;
pub mod note;
pub mod pool;
pub mod ragequit;
pub mod roles;
pub mod roots;

pub use asp::{AspInfo, AspRegistry, AspStatus};
pub use association::{AssociationSet, AssociationSetInfo, AssociationSets, SetType};
pub use collaborators::{Clock, ProofVerifier, TokenLedger};
pub use config::PoolConfig;
pub use error::{PoolError, Result};
pub use event::PoolEvent;
pub use memory::{ManualClock, MemoryLedger, StaticVerifier, SystemClock};
pub use note::{derive_nullifier, note_commitment, Commitment, Note, Nullifier};
pub use pool::{
    DepositReceipt, DepositRecord, DepositRequest, ExclusionCheck, PrivacyPool, SetMembership,
    WithdrawalRequest,
};
pub use ragequit::{RagequitClaim, RagequitRequest, RagequitStatus};
pub use roles::Roles;
pub use roots::RootHistory;

pub use lean_imt::{Hash, InsertResult, MerkleProof, MerkleState};

/// account identifier
pub type AccountId = [u8; 32];

/// token amount (base units)
pub type Amount = u128;

/// asset identifier
pub type AssetId = u64;

/// seconds, from the [`Clock`] collaborator
pub type Timestamp = u64;

/// association set provider id
pub type AspId = u64;

/// association set id
pub type SetId = u64;

/// ragequit request id
pub type RequestId = u64;

/// domain separator for deposit commitments
pub const COMMITMENT_DOMAIN: &[u8] = b"privacy-pool.commitment.v1";
/// domain separator for nullifiers
pub const NULLIFIER_DOMAIN: &[u8] = b"privacy-pool.nullifier.v1";
/// domain separator for withdrawal public inputs
pub const WITHDRAWAL_DOMAIN: &[u8] = b"privacy-pool.withdrawal.v1";
