//! inclusion proofs
//!
//! levels where the path node had no sibling contribute nothing, so
//! `siblings` and `path_indices` hold one entry per level that was actually
//! hashed (at most `depth` entries).

use crate::hash::{hash_pair, Hash};
use crate::MAX_SUPPORTED_DEPTH;

/// inclusion proof in compressed form
///
/// `siblings` and `path_indices` are NOT padded to `depth`: a level where
/// the path node is the last node of its level and has no right sibling is
/// omitted, so both vectors have length `path_bits(index, tree_size).len()`,
/// which is at most `calculate_depth(tree_size)`. provers must emit the same
/// encoding; [`crate::path_bits`] gives the expected `path_indices`.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct MerkleProof {
    /// sibling hashes from leaf to root
    pub siblings: Vec<Hash>,
    /// true where the path node is the right child at that level
    pub path_indices: Vec<bool>,
    pub leaf: Hash,
    pub root: Hash,
    pub tree_size: u64,
}

impl MerkleProof {
    /// fold `leaf` through the siblings
    pub fn compute_root(&self) -> Option<Hash> {
        if self.siblings.len() != self.path_indices.len() {
            return None;
        }
        if self.siblings.len() > MAX_SUPPORTED_DEPTH {
            return None;
        }
        let mut node = self.leaf;
        for (sibling, is_right) in self.siblings.iter().zip(&self.path_indices) {
            node = if *is_right {
                hash_pair(sibling, &node)
            } else {
                hash_pair(&node, sibling)
            };
        }
        Some(node)
    }

    /// recompute the root and compare with the claimed one
    pub fn verify(&self) -> bool {
        self.tree_size > 0 && self.compute_root() == Some(self.root)
    }
}
