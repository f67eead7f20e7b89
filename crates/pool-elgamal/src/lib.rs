//! pool-elgamal
//!
//! homomorphic encryption and commitment layer for the privacy pool
//!
//! # construction
//!
//! ```text
//! group      ristretto255 (prime order l, so every scalar lives mod l)
//! G          ristretto basepoint
//! H          hash-to-group of GENERATOR_H_DOMAIN (no known log_G(H))
//!
//! encrypt    (r*G, amount*H + r*PK)
//! decrypt    C2 - sk*C1 = amount*H
//! pedersen   amount*H + blinding*G
//! ```
//!
//! decryption yields the point `amount*H`, not the integer. callers either
//! stay homomorphic or recover small amounts with [`decrypt_bounded`].

pub mod balance;
pub mod dlog;
pub mod elgamal;
mod error;
pub mod pedersen;
pub mod point;
pub mod proof;
pub mod transcript;

pub use balance::EncryptedBalance;
pub use curve25519_dalek::scalar::Scalar;
pub use dlog::{decrypt_bounded, solve_discrete_log, MAX_DLOG_BOUND};
pub use elgamal::{
    decrypt_point, derive_public_key, encode_amount, encrypt, encrypt_with_rng,
    homomorphic_add, homomorphic_scalar_mul, homomorphic_sub, rerandomize, Ciphertext, KeyPair,
    SecretKey,
};
pub use error::{CryptoError, Result};
pub use pedersen::{pedersen_commit, pedersen_commit_amount, verify_opening};
pub use point::Point;
pub use proof::{DecryptionProof, EncryptionProof, SchnorrProof};
pub use transcript::Transcript;

/// domain separator for the second generator H
pub const GENERATOR_H_DOMAIN: &[u8] = b"pool-elgamal.generator.h.v1";
/// domain separator for schnorr challenges
pub const SCHNORR_DOMAIN: &[u8] = b"pool-elgamal.schnorr.v1";
/// domain separator for encryption proof challenges
pub const ENCRYPTION_PROOF_DOMAIN: &[u8] = b"pool-elgamal.encryption-proof.v1";
/// domain separator for decryption proof challenges
pub const DECRYPTION_PROOF_DOMAIN: &[u8] = b"pool-elgamal.decryption-proof.v1";
