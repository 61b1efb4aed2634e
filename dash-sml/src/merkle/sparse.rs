//! Sparse Merkle tree proofs.
//!
//! The tree has one leaf slot per 256-bit key. A key's path is read from its most
//! significant bit down: a clear bit goes left, a set bit goes right. An empty slot
//! or subtree hashes to 32 zero bytes, a leaf hashes to `H(key || H(value))` and an
//! inner node to `H(left || right)`, `H` being double SHA-256.
//!
//! A proof lists the side nodes met on the way from the leaf up to the root, so the
//! first side node is the sibling of the leaf. Proofs may be shorter than 256: the
//! leaf then sits at the depth given by the proof length.

use crate::merkle::MerkleHashFunction;

/// Depth of a tree keyed by 256-bit keys.
pub const SPARSE_TREE_DEPTH: usize = 256;

/// The hash of an empty subtree.
pub const EMPTY_NODE: [u8; 32] = [0u8; 32];

/// A leaf of a non-inclusion proof: another key occupying the path of the absent key.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ProofLeaf {
    pub key: [u8; 32],
    /// Hash of the value stored under `key`.
    pub value_hash: [u8; 32],
}

/// Side nodes proving a key's membership (or absence) under a root.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SparseMerkleProof {
    /// Sibling hashes ordered from the leaf level up.
    pub side_nodes: Vec<[u8; 32]>,
}

impl SparseMerkleProof {
    pub fn new(side_nodes: Vec<[u8; 32]>) -> Self {
        SparseMerkleProof {
            side_nodes,
        }
    }

    /// Expands a compressed proof.
    ///
    /// `bitmap` holds one bit per side node, LSB first, set when that side node is an
    /// empty subtree and was left out of `hashes`. `length` is the number of side nodes
    /// of the expanded proof.
    pub fn decompress(hashes: &[[u8; 32]], bitmap: &[u8], length: u32) -> Option<Self> {
        let length = length as usize;
        if length > SPARSE_TREE_DEPTH || bitmap.len() * 8 < length {
            return None;
        }
        let mut provided = hashes.iter();
        let mut side_nodes = Vec::with_capacity(length);
        for i in 0..length {
            if bitmap[i / 8] & (1 << (i % 8)) != 0 {
                side_nodes.push(EMPTY_NODE);
            } else {
                side_nodes.push(*provided.next()?);
            }
        }
        if provided.next().is_some() {
            return None;
        }
        Some(SparseMerkleProof {
            side_nodes,
        })
    }

    /// Compresses the proof into its non-empty hashes and the empty-node bitmap.
    pub fn compress(&self) -> (Vec<[u8; 32]>, Vec<u8>, u32) {
        let mut bitmap = vec![0u8; self.side_nodes.len().div_ceil(8)];
        let mut hashes = vec![];
        for (i, node) in self.side_nodes.iter().enumerate() {
            if *node == EMPTY_NODE {
                bitmap[i / 8] |= 1 << (i % 8);
            } else {
                hashes.push(*node);
            }
        }
        (hashes, bitmap, self.side_nodes.len() as u32)
    }

    /// Verifies that `key` maps to `value` under `root`.
    pub fn verify_inclusion(&self, root: &[u8; 32], key: &[u8; 32], value: &[u8]) -> bool {
        let value_hash = MerkleHashFunction::Sha256d.hash(value);
        self.compute_root(key, leaf_hash(key, &value_hash)).is_some_and(|computed| computed == *root)
    }

    /// Verifies that `key` has no value under `root`.
    ///
    /// `proof_leaf` is the leaf found at the end of the key's path, `None` when that
    /// slot is empty. A leaf for `key` itself proves inclusion, not absence.
    pub fn verify_non_inclusion(
        &self,
        root: &[u8; 32],
        key: &[u8; 32],
        proof_leaf: Option<&ProofLeaf>,
    ) -> bool {
        let leaf = match proof_leaf {
            None => EMPTY_NODE,
            Some(leaf) => {
                if leaf.key == *key {
                    return false;
                }
                // the other leaf must lie on the path the proof walks
                if common_prefix_bits(&leaf.key, key) < self.side_nodes.len() {
                    return false;
                }
                leaf_hash(&leaf.key, &leaf.value_hash)
            }
        };
        self.compute_root(key, leaf).is_some_and(|computed| computed == *root)
    }

    /// [`Self::verify_inclusion`] over a compressed proof.
    pub fn verify_compressed_inclusion(
        root: &[u8; 32],
        key: &[u8; 32],
        value: &[u8],
        hashes: &[[u8; 32]],
        bitmap: &[u8],
        length: u32,
    ) -> bool {
        Self::decompress(hashes, bitmap, length)
            .is_some_and(|proof| proof.verify_inclusion(root, key, value))
    }

    /// [`Self::verify_non_inclusion`] over a compressed proof.
    pub fn verify_compressed_non_inclusion(
        root: &[u8; 32],
        key: &[u8; 32],
        proof_leaf: Option<&ProofLeaf>,
        hashes: &[[u8; 32]],
        bitmap: &[u8],
        length: u32,
    ) -> bool {
        Self::decompress(hashes, bitmap, length)
            .is_some_and(|proof| proof.verify_non_inclusion(root, key, proof_leaf))
    }

    fn compute_root(&self, key: &[u8; 32], leaf: [u8; 32]) -> Option<[u8; 32]> {
        let depth = self.side_nodes.len();
        if depth > SPARSE_TREE_DEPTH {
            return None;
        }
        let mut current = leaf;
        for (i, side) in self.side_nodes.iter().enumerate() {
            let level = depth - 1 - i;
            current = if key_bit(key, level) {
                node_hash(side, &current)
            } else {
                node_hash(&current, side)
            };
        }
        Some(current)
    }
}

/// `H(key || value_hash)`.
pub fn leaf_hash(key: &[u8; 32], value_hash: &[u8; 32]) -> [u8; 32] {
    MerkleHashFunction::Sha256d.hash_branch(key, value_hash)
}

pub fn node_hash(left: &[u8; 32], right: &[u8; 32]) -> [u8; 32] {
    MerkleHashFunction::Sha256d.hash_branch(left, right)
}

/// Bit `index` of `key`, most significant bit of the first byte being bit 0.
fn key_bit(key: &[u8; 32], index: usize) -> bool {
    key[index / 8] & (0x80 >> (index % 8)) != 0
}

fn common_prefix_bits(a: &[u8; 32], b: &[u8; 32]) -> usize {
    (0..SPARSE_TREE_DEPTH).take_while(|i| key_bit(a, *i) == key_bit(b, *i)).count()
}
