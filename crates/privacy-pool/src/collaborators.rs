//! seams to the outside world
//!
//! the engine never touches balances, proof systems or wall time directly.

use crate::{AccountId, Amount, AssetId, Timestamp};

/// fungible token ledger the pool escrows into and pays out of
pub trait TokenLedger {
    /// move `amount` from the pool's own account to `to`
    fn transfer(&mut self, asset: AssetId, to: &AccountId, amount: Amount) -> bool;

    /// pull `amount` from `from` into `to` (the pool account)
    fn transfer_from(
        &mut self,
        asset: AssetId,
        from: &AccountId,
        to: &AccountId,
        amount: Amount,
    ) -> bool;

    fn balance_of(&self, asset: AssetId, who: &AccountId) -> Amount;
}

/// zero-knowledge proof verifier
pub trait ProofVerifier {
    fn verify(&self, proof: &[u8], public_inputs: &[[u8; 32]]) -> bool;
}

/// source of time, in seconds
pub trait Clock {
    fn now(&self) -> Timestamp;
}
