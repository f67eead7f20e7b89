//! domain-separated node hashing

pub type Hash = [u8; 32];

/// domain separator for interior nodes
pub const NODE_DOMAIN: &[u8] = b"lean-imt.node.v1";

/// H(domain || left || right), order-sensitive
pub fn hash_pair(left: &Hash, right: &Hash) -> Hash {
    let mut hasher = blake3::Hasher::new();
    hasher.update(NODE_DOMAIN);
    hasher.update(left);
    hasher.update(right);
    *hasher.finalize().as_bytes()
}
