//! encrypted balances with pending slots
//!
//! incoming and outgoing transfers land in `pending_in` / `pending_out` so
//! a concurrent sender never invalidates a proof against the main
//! ciphertext. `rollup` folds them in and starts a new epoch.

use crate::elgamal::{homomorphic_add, homomorphic_sub, Ciphertext};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct EncryptedBalance {
    pub ciphertext: Ciphertext,
    pub pending_in: Ciphertext,
    pub pending_out: Ciphertext,
    pub epoch: u64,
}

impl EncryptedBalance {
    pub fn new(ciphertext: Ciphertext, epoch: u64) -> Self {
        Self {
            ciphertext,
            pending_in: Ciphertext::zero(),
            pending_out: Ciphertext::zero(),
            epoch,
        }
    }

    pub fn zero() -> Self {
        Self::new(Ciphertext::zero(), 0)
    }

    /// queue an incoming amount
    pub fn credit(&mut self, ct: &Ciphertext) {
        self.pending_in = homomorphic_add(&self.pending_in, ct);
    }

    /// queue an outgoing amount
    pub fn debit(&mut self, ct: &Ciphertext) {
        self.pending_out = homomorphic_add(&self.pending_out, ct);
    }

    pub fn has_pending(&self) -> bool {
        !self.pending_in.is_zero() || !self.pending_out.is_zero()
    }

    /// ciphertext + pending_in - pending_out, pending reset, epoch + 1
    pub fn rollup(&self) -> Self {
        let with_in = homomorphic_add(&self.ciphertext, &self.pending_in);
        Self {
            ciphertext: homomorphic_sub(&with_in, &self.pending_out),
            pending_in: Ciphertext::zero(),
            pending_out: Ciphertext::zero(),
            epoch: self.epoch + 1,
        }
    }
}
