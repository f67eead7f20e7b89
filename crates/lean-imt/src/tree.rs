//! the tree itself
//!
//! every level is stored so proofs can be produced for any leaf. level 0
//! holds the leaves, level `depth` holds the root.

use std::collections::HashMap;

use crate::hash::{hash_pair, Hash};
use crate::proof::MerkleProof;
use crate::{
    calculate_depth, path_bits, ImtError, Result, DEFAULT_MAX_DEPTH, MAX_SUPPORTED_DEPTH,
};

/// externally visible tree state
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct MerkleState {
    pub root: Hash,
    pub size: u64,
    pub depth: usize,
}

/// outcome of a (batch) insertion
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct InsertResult {
    pub root: Hash,
    pub size: u64,
    pub depth: usize,
    pub start_index: u64,
    pub inserted_count: u64,
}

#[derive(Clone, Debug)]
pub struct LeanImt {
    /// nodes[level][index]
    nodes: Vec<Vec<Hash>>,
    /// first index of each leaf value
    leaf_index: HashMap<Hash, u64>,
    max_depth: usize,
}

impl Default for LeanImt {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_DEPTH)
    }
}

impl LeanImt {
    /// empty tree; `max_depth` is clamped to [`MAX_SUPPORTED_DEPTH`]
    pub fn new(max_depth: usize) -> Self {
        Self {
            nodes: vec![Vec::new()],
            leaf_index: HashMap::new(),
            max_depth: max_depth.min(MAX_SUPPORTED_DEPTH),
        }
    }

    pub fn size(&self) -> u64 {
        self.nodes[0].len() as u64
    }

    pub fn is_empty(&self) -> bool {
        self.nodes[0].is_empty()
    }

    pub fn depth(&self) -> usize {
        calculate_depth(self.size())
    }

    pub fn max_depth(&self) -> usize {
        self.max_depth
    }

    /// current root, all zero for an empty tree
    pub fn root(&self) -> Hash {
        self.nodes
            .get(self.depth())
            .and_then(|level| level.first())
            .copied()
            .unwrap_or([0u8; 32])
    }

    pub fn state(&self) -> MerkleState {
        MerkleState {
            root: self.root(),
            size: self.size(),
            depth: self.depth(),
        }
    }

    pub fn leaf(&self, index: u64) -> Option<Hash> {
        self.nodes[0].get(index as usize).copied()
    }

    pub fn index_of(&self, leaf: &Hash) -> Option<u64> {
        self.leaf_index.get(leaf).copied()
    }

    pub fn contains(&self, leaf: &Hash) -> bool {
        self.leaf_index.contains_key(leaf)
    }

    /// fail with `CapacityExceeded` if `additional` more leaves would not fit
    pub fn ensure_capacity(&self, additional: u64) -> Result<()> {
        let target = self
            .size()
            .checked_add(additional)
            .ok_or(ImtError::CapacityExceeded {
                required: MAX_SUPPORTED_DEPTH + 1,
                max: self.max_depth,
            })?;
        let required = calculate_depth(target);
        if required > self.max_depth {
            return Err(ImtError::CapacityExceeded {
                required,
                max: self.max_depth,
            });
        }
        Ok(())
    }

    /// append a leaf, returning its index
    pub fn insert(&mut self, leaf: Hash) -> Result<u64> {
        self.ensure_capacity(1)?;
        Ok(self.append(leaf))
    }

    /// append all leaves or none
    pub fn insert_many(&mut self, leaves: &[Hash]) -> Result<InsertResult> {
        if leaves.is_empty() {
            return Err(ImtError::EmptyBatch);
        }
        self.ensure_capacity(leaves.len() as u64)?;

        let start_index = self.size();
        for leaf in leaves {
            self.append(*leaf);
        }

        Ok(InsertResult {
            root: self.root(),
            size: self.size(),
            depth: self.depth(),
            start_index,
            inserted_count: leaves.len() as u64,
        })
    }

    /// capacity already checked
    fn append(&mut self, leaf: Hash) -> u64 {
        let index = self.size();
        let depth = calculate_depth(index + 1);
        while self.nodes.len() <= depth {
            self.nodes.push(Vec::new());
        }

        let mut node = leaf;
        let mut idx = index as usize;
        for level in 0..depth {
            Self::set(&mut self.nodes[level], idx, node);
            if idx & 1 == 1 {
                node = hash_pair(&self.nodes[level][idx - 1], &node);
            }
            idx >>= 1;
        }
        Self::set(&mut self.nodes[depth], idx, node);

        self.leaf_index.entry(leaf).or_insert(index);
        index
    }

    fn set(level: &mut Vec<Hash>, idx: usize, node: Hash) {
        if idx < level.len() {
            level[idx] = node;
        } else {
            level.push(node);
        }
    }

    /// inclusion proof for the leaf at `index` against the current root
    pub fn generate_proof(&self, index: u64) -> Result<MerkleProof> {
        let size = self.size();
        let leaf = self.leaf(index).ok_or(ImtError::LeafOutOfRange {
            index: index as usize,
            size: size as usize,
        })?;

        let depth = self.depth();
        let mut siblings = Vec::with_capacity(depth);
        let mut path_indices = Vec::with_capacity(depth);
        let mut idx = index as usize;

        for level in 0..depth {
            let is_right = idx & 1 == 1;
            let sibling = idx ^ 1;
            if let Some(node) = self.nodes[level].get(sibling) {
                siblings.push(*node);
                path_indices.push(is_right);
            }
            idx >>= 1;
        }

        Ok(MerkleProof {
            siblings,
            path_indices,
            leaf,
            root: self.root(),
            tree_size: size,
        })
    }

    /// stricter than [`MerkleProof::verify`]: the proven leaf must be a leaf
    /// of this tree and the path must have the shape that leaf's position
    /// has in a tree of `proof.tree_size` leaves. an interior node dressed
    /// up as a leaf fails here even though it folds to a valid root
    pub fn verify_proof(&self, proof: &MerkleProof) -> bool {
        if proof.tree_size == 0 || proof.tree_size > self.size() {
            return false;
        }
        let Some(index) = self.index_of(&proof.leaf) else {
            return false;
        };
        index < proof.tree_size
            && proof.path_indices == path_bits(index, proof.tree_size)
            && proof.verify()
    }

    /// proof for a leaf value, by its first occurrence
    pub fn generate_proof_for(&self, leaf: &Hash) -> Result<MerkleProof> {
        let index = self.index_of(leaf).ok_or(ImtError::LeafNotFound)?;
        self.generate_proof(index)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn leaf(i: u64) -> Hash {
        let mut h = [0u8; 32];
        h[..8].copy_from_slice(&i.to_le_bytes());
        h[31] = 0xaa;
        h
    }

    fn tree_with(n: u64) -> LeanImt {
        let mut tree = LeanImt::default();
        for i in 0..n {
            tree.insert(leaf(i)).unwrap();
        }
        tree
    }

    #[test]
    fn test_empty_tree() {
        let tree = LeanImt::default();
        assert_eq!(tree.size(), 0);
        assert_eq!(tree.depth(), 0);
        assert_eq!(tree.root(), [0u8; 32]);
        assert!(tree.generate_proof(0).is_err());
    }

    #[test]
    fn test_single_leaf_is_root() {
        let tree = tree_with(1);
        assert_eq!(tree.root(), leaf(0));
        assert_eq!(tree.depth(), 1);
        let proof = tree.generate_proof(0).unwrap();
        assert!(proof.siblings.is_empty());
        assert!(proof.verify());
    }

    #[test]
    fn test_small_tree_roots() {
        let (a, b, c) = (leaf(0), leaf(1), leaf(2));

        let tree = tree_with(2);
        assert_eq!(tree.root(), hash_pair(&a, &b));

        // c has no sibling and propagates unchanged
        let tree = tree_with(3);
        assert_eq!(tree.root(), hash_pair(&hash_pair(&a, &b), &c));
        assert_eq!(tree.depth(), 2);

        let d = leaf(3);
        let tree = tree_with(4);
        assert_eq!(tree.root(), hash_pair(&hash_pair(&a, &b), &hash_pair(&c, &d)));
    }

    #[test]
    fn test_root_changes_per_insert() {
        let mut tree = LeanImt::default();
        let mut seen = Vec::new();
        for i in 0..10 {
            tree.insert(leaf(i)).unwrap();
            assert!(!seen.contains(&tree.root()));
            seen.push(tree.root());
        }
    }

    #[test]
    fn test_depth_never_decreases() {
        let mut tree = LeanImt::default();
        let mut last = 0;
        for i in 0..70 {
            tree.insert(leaf(i)).unwrap();
            assert!(tree.depth() >= last);
            assert_eq!(tree.depth(), calculate_depth(tree.size()));
            last = tree.depth();
        }
    }

    #[test]
    fn test_all_proofs_verify() {
        for n in 1..=33 {
            let tree = tree_with(n);
            for i in 0..n {
                let proof = tree.generate_proof(i).unwrap();
                assert!(proof.verify(), "n = {}, i = {}", n, i);
                assert_eq!(proof.root, tree.root());
                assert_eq!(proof.leaf, leaf(i));
                assert!(proof.siblings.len() <= tree.depth());
            }
        }
    }

    #[test]
    fn test_tampered_proofs_fail() {
        let tree = tree_with(11);
        for i in 0..11 {
            let proof = tree.generate_proof(i).unwrap();
            for level in 0..proof.siblings.len() {
                let mut bad = proof.clone();
                bad.siblings[level][0] ^= 1;
                assert!(!bad.verify());

                let mut bad = proof.clone();
                bad.path_indices[level] = !bad.path_indices[level];
                assert!(!bad.verify());
            }

            let mut bad = proof.clone();
            bad.leaf = leaf(100);
            assert!(!bad.verify());
        }
    }

    #[test]
    fn test_batch_insert_matches_sequential() {
        let mut batched = tree_with(1);
        let leaves: Vec<Hash> = (1..4).map(leaf).collect();
        let result = batched.insert_many(&leaves).unwrap();

        assert_eq!(result.start_index, 1);
        assert_eq!(result.inserted_count, 3);
        assert_eq!(result.size, 4);
        assert_eq!(result.depth, 2);
        assert_eq!(result.root, tree_with(4).root());
    }

    #[test]
    fn test_batch_rejects_empty() {
        let mut tree = LeanImt::default();
        assert_eq!(tree.insert_many(&[]), Err(ImtError::EmptyBatch));
    }

    #[test]
    fn test_capacity_exceeded_is_atomic() {
        let mut tree = LeanImt::new(2);
        tree.insert_many(&[leaf(0), leaf(1), leaf(2)]).unwrap();
        let before = tree.state();

        let err = tree.insert_many(&[leaf(3), leaf(4)]).unwrap_err();
        assert_eq!(err, ImtError::CapacityExceeded { required: 3, max: 2 });
        assert_eq!(tree.state(), before);

        tree.insert(leaf(3)).unwrap();
        assert!(tree.insert(leaf(4)).is_err());
        assert_eq!(tree.size(), 4);
    }

    #[test]
    fn test_index_of() {
        let tree = tree_with(5);
        assert_eq!(tree.index_of(&leaf(3)), Some(3));
        assert!(tree.contains(&leaf(4)));
        assert!(!tree.contains(&leaf(5)));
        let proof = tree.generate_proof_for(&leaf(2)).unwrap();
        assert!(proof.verify());
        assert_eq!(tree.generate_proof_for(&leaf(9)), Err(ImtError::LeafNotFound));
    }

    #[test]
    fn test_old_proof_fails_against_new_root() {
        let mut tree = tree_with(4);
        let proof = tree.generate_proof(1).unwrap();
        tree.insert(leaf(4)).unwrap();

        // still self-consistent against the root it was made for
        assert!(proof.verify());
        assert_ne!(proof.root, tree.root());
    }

    #[test]
    fn test_verify_proof_rejects_interior_node() {
        let tree = tree_with(4);
        let interior = hash_pair(&leaf(0), &leaf(1));

        // folds fine, but the "leaf" is the left subtree of the root
        let forged = MerkleProof {
            siblings: vec![hash_pair(&leaf(2), &leaf(3))],
            path_indices: vec![false],
            leaf: interior,
            root: tree.root(),
            tree_size: 4,
        };
        assert!(forged.verify());
        assert!(!tree.verify_proof(&forged));

        // the root itself with an empty path
        let bare = MerkleProof {
            siblings: vec![],
            path_indices: vec![],
            leaf: tree.root(),
            root: tree.root(),
            tree_size: 4,
        };
        assert!(bare.verify());
        assert!(!tree.verify_proof(&bare));
    }

    #[test]
    fn test_verify_proof_accepts_historical_proofs() {
        let mut tree = tree_with(3);
        let old = tree.generate_proof(2).unwrap();
        tree.insert_many(&[leaf(3), leaf(4)]).unwrap();

        assert!(tree.verify_proof(&old));
        for i in 0..5 {
            assert!(tree.verify_proof(&tree.generate_proof(i).unwrap()));
        }

        // claims a size the leaf was not yet part of
        let mut early = tree.generate_proof(4).unwrap();
        early.tree_size = 4;
        assert!(!tree.verify_proof(&early));

        // a size beyond the tree
        let mut future = tree.generate_proof(0).unwrap();
        future.tree_size = 6;
        assert!(!tree.verify_proof(&future));
    }

    #[test]
    fn test_verify_proof_rejects_wrong_shape() {
        let tree = tree_with(5);
        let mut proof = tree.generate_proof(1).unwrap();
        proof.path_indices[0] = false;
        assert!(!tree.verify_proof(&proof));
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(32))]

        #[test]
        fn prop_every_leaf_proves(leaves in proptest::collection::vec(any::<[u8; 32]>(), 1..80)) {
            let mut tree = LeanImt::default();
            tree.insert_many(&leaves).unwrap();
            for i in 0..leaves.len() as u64 {
                let proof = tree.generate_proof(i).unwrap();
                prop_assert!(proof.verify());
                prop_assert!(tree.verify_proof(&proof));
                prop_assert_eq!(proof.root, tree.root());
            }
        }
    }
}
