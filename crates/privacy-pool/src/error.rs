//! error types for privacy-pool

use lean_imt::ImtError;
use pool_elgamal::CryptoError;
use thiserror::Error;

use crate::{Amount, AspId, AssetId, Timestamp};

pub type Result<T> = std::result::Result<T, PoolError>;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PoolError {
    #[error("invalid input: {0}")]
    InvalidInput(&'static str),

    #[error("unauthorized: {0}")]
    Unauthorized(&'static str),

    #[error("insufficient stake: provided {provided}, minimum {minimum}")]
    InsufficientStake { provided: Amount, minimum: Amount },

    #[error("auditor already voted for asp {asp_id}")]
    DuplicateVote { asp_id: AspId },

    #[error("already exists: {0}")]
    AlreadyExists(&'static str),

    #[error("not found: {0}")]
    NotFound(&'static str),

    #[error("invalid proof: {0}")]
    InvalidProof(&'static str),

    #[error("nullifier already spent")]
    AlreadySpent,

    #[error("ragequit not executable until {executable_at} (now {now})")]
    NotYetExecutable {
        executable_at: Timestamp,
        now: Timestamp,
    },

    #[error("ragequit window closed at {expires_at} (now {now})")]
    Expired { expires_at: Timestamp, now: Timestamp },

    #[error("capacity exceeded: {0}")]
    CapacityExceeded(String),

    #[error("pool not initialized")]
    NotInitialized,

    #[error("pool already initialized")]
    AlreadyInitialized,

    #[error("pool is paused")]
    Paused,

    #[error("invalid status transition: {from} -> {to}")]
    InvalidTransition {
        from: &'static str,
        to: &'static str,
    },

    #[error("token transfer refused")]
    TransferFailed,

    #[error("insufficient pool liquidity for asset {asset_id}")]
    InsufficientLiquidity { asset_id: AssetId },

    #[error("invalid config: {0}")]
    Config(String),
}

impl From<ImtError> for PoolError {
    fn from(err: ImtError) -> Self {
        match err {
            ImtError::CapacityExceeded { .. } => PoolError::CapacityExceeded(err.to_string()),
            ImtError::EmptyBatch => PoolError::InvalidInput("empty batch"),
            ImtError::LeafOutOfRange { .. } => PoolError::NotFound("leaf index"),
            ImtError::LeafNotFound => PoolError::NotFound("leaf"),
        }
    }
}

impl From<CryptoError> for PoolError {
    fn from(err: CryptoError) -> Self {
        match err {
            CryptoError::InvalidPoint | CryptoError::IdentityPoint => {
                PoolError::InvalidInput("malformed or identity point")
            }
            CryptoError::InvalidScalar => PoolError::InvalidInput("non-canonical scalar"),
            _ => PoolError::InvalidProof("cryptographic check failed"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_imt_errors_map() {
        let err: PoolError = ImtError::CapacityExceeded { required: 3, max: 2 }.into();
        assert!(matches!(err, PoolError::CapacityExceeded(_)));
        assert_eq!(
            PoolError::from(ImtError::EmptyBatch),
            PoolError::InvalidInput("empty batch")
        );
    }

    #[test]
    fn test_display() {
        let err = PoolError::InsufficientStake {
            provided: 5,
            minimum: 10,
        };
        assert_eq!(err.to_string(), "insufficient stake: provided 5, minimum 10");
    }
}
