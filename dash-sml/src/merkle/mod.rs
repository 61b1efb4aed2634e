//! Merkle proofs.
//!
//! [`partial`] walks the partial merkle tree carried by a `mnlistdiff` to prove the
//! coinbase transaction belongs to a block. [`sparse`] verifies sparse Merkle tree
//! proofs of the kind platform state proofs use. Both share the branch hashing
//! defined here.

pub mod partial;
pub mod sparse;

use hashes::{Hash, sha256d};

pub use self::partial::{MerkleBlockError, PartialMerkleTree, verify_coinbase_inclusion};
pub use self::sparse::SparseMerkleProof;

/// Hash function combining two child nodes into their parent.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum MerkleHashFunction {
    /// Double SHA-256, used by block transaction trees and list roots.
    #[default]
    Sha256d,
    Blake3,
}

impl MerkleHashFunction {
    /// Hashes an arbitrary byte string.
    pub fn hash(&self, data: &[u8]) -> [u8; 32] {
        match self {
            MerkleHashFunction::Sha256d => sha256d::Hash::hash(data).to_byte_array(),
            MerkleHashFunction::Blake3 => *blake3::hash(data).as_bytes(),
        }
    }

    /// Hashes the concatenation `left || right`.
    pub fn hash_branch(&self, left: &[u8; 32], right: &[u8; 32]) -> [u8; 32] {
        let mut data = [0u8; 64];
        data[..32].copy_from_slice(left);
        data[32..].copy_from_slice(right);
        self.hash(&data)
    }
}

/// Computes the merkle root of `hashes` with sha256d, duplicating the last hash of a
/// level with an odd number of entries.
///
/// Returns `None` when `hashes` is empty.
pub fn merkle_root_from_hashes(hashes: Vec<[u8; 32]>) -> Option<[u8; 32]> {
    merkle_root_from_hashes_with(MerkleHashFunction::Sha256d, hashes)
}

/// Same as [`merkle_root_from_hashes`] with a chosen hash function.
pub fn merkle_root_from_hashes_with(
    function: MerkleHashFunction,
    hashes: Vec<[u8; 32]>,
) -> Option<[u8; 32]> {
    if hashes.is_empty() {
        return None;
    }
    let mut level = hashes;
    while level.len() > 1 {
        level = level
            .chunks(2)
            .map(|pair| function.hash_branch(&pair[0], pair.get(1).unwrap_or(&pair[0])))
            .collect();
    }
    level.pop()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_hash_is_its_own_root() {
        assert_eq!(merkle_root_from_hashes(vec![[7; 32]]), Some([7; 32]));
        assert_eq!(merkle_root_from_hashes(vec![]), None);
    }

    #[test]
    fn odd_level_duplicates_last_hash() {
        let a = [1u8; 32];
        let b = [2u8; 32];
        let c = [3u8; 32];
        let f = MerkleHashFunction::Sha256d;
        let expected = f.hash_branch(&f.hash_branch(&a, &b), &f.hash_branch(&c, &c));
        assert_eq!(merkle_root_from_hashes(vec![a, b, c]), Some(expected));
    }

    #[test]
    fn blake3_differs_from_sha256d() {
        let hashes = vec![[1u8; 32], [2u8; 32]];
        assert_ne!(
            merkle_root_from_hashes_with(MerkleHashFunction::Blake3, hashes.clone()),
            merkle_root_from_hashes(hashes)
        );
    }
}
