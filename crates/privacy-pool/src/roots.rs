//! bounded history of recent roots
//!
//! proofs built against a slightly stale root stay valid until the root
//! falls out of the ring.

use std::collections::VecDeque;

use crate::Hash;

#[derive(Clone, Debug)]
pub struct RootHistory {
    roots: VecDeque<Hash>,
    capacity: usize,
}

impl RootHistory {
    /// `capacity` of zero is treated as one
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            roots: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// record a new current root, evicting the oldest when full
    pub fn push(&mut self, root: Hash) {
        if self.roots.back() == Some(&root) {
            return;
        }
        if self.roots.len() == self.capacity {
            self.roots.pop_front();
        }
        self.roots.push_back(root);
    }

    pub fn contains(&self, root: &Hash) -> bool {
        self.roots.contains(root)
    }

    pub fn current(&self) -> Option<Hash> {
        self.roots.back().copied()
    }

    pub fn len(&self) -> usize {
        self.roots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.roots.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}
