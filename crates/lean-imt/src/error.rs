//! error types for lean-imt

use thiserror::Error;

pub type Result<T> = std::result::Result<T, ImtError>;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ImtError {
    #[error("tree depth {required} exceeds maximum {max}")]
    CapacityExceeded { required: usize, max: usize },

    #[error("batch insert with no leaves")]
    EmptyBatch,

    #[error("leaf index {index} out of range (tree has {size} leaves)")]
    LeafOutOfRange { index: usize, size: usize },

    #[error("leaf not found in tree")]
    LeafNotFound,
}
