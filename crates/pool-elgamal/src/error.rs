//! error types for pool-elgamal

use thiserror::Error;

pub type Result<T> = std::result::Result<T, CryptoError>;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CryptoError {
    #[error("invalid point encoding")]
    InvalidPoint,

    #[error("identity point where a non-zero point is required")]
    IdentityPoint,

    #[error("invalid scalar: not canonical")]
    InvalidScalar,

    #[error("proof verification failed")]
    VerificationFailed,

    #[error("discrete log not found within bound {bound}")]
    DiscreteLogOutOfRange { bound: u64 },

    #[error("discrete log bound {bound} exceeds maximum {max}")]
    BoundTooLarge { bound: u64, max: u64 },
}
