//! deposit notes, commitments and nullifiers
//!
//! a note is the client-side secret behind one deposit. the pool only ever
//! sees its commitment and, at spend time, its nullifier.

use std::fmt;

use pool_elgamal::{pedersen_commit_amount, Point, Scalar};
use rand_core::{CryptoRng, RngCore};
use serde::{Deserialize, Serialize};
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::pool::DepositRequest;
use crate::ragequit::RagequitClaim;
use crate::{Amount, AssetId, Hash, COMMITMENT_DOMAIN, NULLIFIER_DOMAIN};

/// leaf of the deposit tree
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Commitment(pub Hash);

/// spend tag, unlinkable to its commitment without the note
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Nullifier(pub Hash);

impl fmt::Debug for Commitment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Commitment({})", hex::encode(&self.0[..8]))
    }
}

impl fmt::Debug for Nullifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Nullifier({})", hex::encode(&self.0[..8]))
    }
}

impl From<Hash> for Commitment {
    fn from(h: Hash) -> Self {
        Self(h)
    }
}

/// commitment = H(domain || secret || nullifier_seed || amount_le || asset_le)
pub fn note_commitment(
    secret: &[u8; 32],
    nullifier_seed: &[u8; 32],
    amount: Amount,
    asset_id: AssetId,
) -> Commitment {
    let mut hasher = blake3::Hasher::new();
    hasher.update(COMMITMENT_DOMAIN);
    hasher.update(secret);
    hasher.update(nullifier_seed);
    hasher.update(&amount.to_le_bytes());
    hasher.update(&asset_id.to_le_bytes());
    Commitment(*hasher.finalize().as_bytes())
}

/// nullifier = H(domain || nullifier_seed)
pub fn derive_nullifier(nullifier_seed: &[u8; 32]) -> Nullifier {
    let mut hasher = blake3::Hasher::new();
    hasher.update(NULLIFIER_DOMAIN);
    hasher.update(nullifier_seed);
    Nullifier(*hasher.finalize().as_bytes())
}

#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct Note {
    secret: [u8; 32],
    nullifier_seed: [u8; 32],
    amount: Amount,
    asset_id: AssetId,
    /// blinding of the pedersen amount commitment
    blinding: Scalar,
}

impl fmt::Debug for Note {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Note")
            .field("commitment", &self.commitment())
            .field("amount", &self.amount)
            .field("asset_id", &self.asset_id)
            .finish_non_exhaustive()
    }
}

impl Note {
    pub fn new(
        secret: [u8; 32],
        nullifier_seed: [u8; 32],
        amount: Amount,
        asset_id: AssetId,
        blinding: Scalar,
    ) -> Self {
        Self {
            secret,
            nullifier_seed,
            amount,
            asset_id,
            blinding,
        }
    }

    pub fn random<R: RngCore + CryptoRng>(rng: &mut R, amount: Amount, asset_id: AssetId) -> Self {
        let mut secret = [0u8; 32];
        let mut nullifier_seed = [0u8; 32];
        rng.fill_bytes(&mut secret);
        rng.fill_bytes(&mut nullifier_seed);
        Self::new(secret, nullifier_seed, amount, asset_id, Scalar::random(rng))
    }

    pub fn amount(&self) -> Amount {
        self.amount
    }

    pub fn asset_id(&self) -> AssetId {
        self.asset_id
    }

    pub fn commitment(&self) -> Commitment {
        note_commitment(&self.secret, &self.nullifier_seed, self.amount, self.asset_id)
    }

    pub fn nullifier(&self) -> Nullifier {
        derive_nullifier(&self.nullifier_seed)
    }

    /// amount·H + blinding·G
    pub fn amount_commitment(&self) -> Point {
        pedersen_commit_amount(self.amount, &self.blinding)
    }

    /// public deposit payload, without a range proof
    pub fn deposit_request(&self) -> DepositRequest {
        DepositRequest {
            commitment: self.commitment(),
            amount_commitment: self.amount_commitment().compress(),
            asset_id: self.asset_id,
            amount: self.amount,
            range_proof: None,
        }
    }

    /// opening handed to the pool when exiting without certification
    pub fn ragequit_claim(&self) -> RagequitClaim {
        RagequitClaim {
            commitment: self.commitment(),
            secret: self.secret,
            nullifier_seed: self.nullifier_seed,
            amount: self.amount,
            blinding: self.blinding,
        }
    }
}
