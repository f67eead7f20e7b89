//! lean incremental merkle tree
//!
//! append-only binary merkle tree whose depth grows only as leaves
//! arrive. a node without a right sibling is carried up unchanged instead
//! of being hashed with a zero placeholder, so a single leaf is its own
//! root and there are no precomputed zero subtrees.
//!
//! ```text
//!            h(h(a,b), c)
//!           /           \
//!       h(a,b)           c      <- c has no sibling, propagates
//!       /   \            |
//!      a     b           c
//! ```

mod error;
pub mod hash;
pub mod proof;
pub mod tree;

pub use error::{ImtError, Result};
pub use hash::{hash_pair, Hash, NODE_DOMAIN};
pub use proof::MerkleProof;
pub use tree::{InsertResult, LeanImt, MerkleState};

/// default depth cap (2^32 leaves)
pub const DEFAULT_MAX_DEPTH: usize = 32;

/// hard upper bound on any configured depth
pub const MAX_SUPPORTED_DEPTH: usize = 64;

/// depth of a tree holding `n` leaves: 0 when empty, otherwise
/// `ceil(log2 n)` with a floor of one level
pub fn calculate_depth(n: u64) -> usize {
    if n == 0 {
        return 0;
    }
    let ceil_log2 = (u64::BITS - (n - 1).leading_zeros()) as usize;
    ceil_log2.max(1)
}

/// whether inserting one more leaf into a tree of `size` adds a level
pub fn needs_depth_increase(size: u64) -> bool {
    calculate_depth(size.saturating_add(1)) > calculate_depth(size)
}

pub fn sibling_index(index: u64) -> u64 {
    index ^ 1
}

pub fn parent_index(index: u64) -> u64 {
    index / 2
}

pub fn is_left_child(index: u64) -> bool {
    index % 2 == 0
}

/// `path_indices` of the proof for leaf `index` in a tree of `size` leaves.
/// levels where the path node has no sibling are skipped
pub fn path_bits(index: u64, size: u64) -> Vec<bool> {
    let depth = calculate_depth(size);
    let mut bits = Vec::with_capacity(depth);
    let (mut idx, mut width) = (index, size);
    for _ in 0..depth {
        if sibling_index(idx) < width {
            bits.push(!is_left_child(idx));
        }
        idx = parent_index(idx);
        width = width / 2 + width % 2;
    }
    bits
}
