// Rust Dash Library
// Written by
//   John L. Jegutanis
//   Andrew Poelstra
// Updated for Dash in 2025 by
//     The Dash Core Developers
//
// To the extent possible under law, the author(s) have dedicated all
// copyright and related and neighboring rights to this software to
// the public domain worldwide. This software is distributed without
// any warranty.
//
// You should have received a copy of the CC0 Public Domain Dedication
// along with this software.
// If not, see <http://creativecommons.org/publicdomain/zero/1.0/>.
//

//! Partial merkle trees.
//!
//! A partial merkle tree is the depth-first encoding of the part of a block's
//! transaction tree needed to prove a set of leaves. It is sent as a leaf count, a
//! list of hashes and a list of flag bits packed LSB first. A `mnlistdiff` carries one
//! that matches exactly the coinbase transaction.
//!
//! The encoding walks the tree depth first. Each node visited emits a flag bit that is
//! set when the node is an ancestor of a matched leaf (or the matched leaf itself).
//! Nodes with the bit clear, and matched leaves, also emit their hash; their subtree
//! is not descended into.

use core::fmt;

use hashes::Hash;

use crate::hash_types::{TxMerkleNode, Txid};
use crate::merkle::MerkleHashFunction;

/// Upper bound of transactions in a block: 2MB block size over the 60 byte smallest
/// transaction.
pub const MAX_TRANSACTIONS_PER_BLOCK: u32 = 2_000_000 / 60;

/// An error when verifying a partial merkle tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MerkleBlockError {
    /// The tree covers no transactions.
    NoTransactions,
    /// More transactions than a block can hold.
    TooManyTransactions,
    /// More hashes than leaves.
    TooManyHashes,
    /// Fewer flag bits than hashes.
    NotEnoughBits,
    /// Flag bytes left over after the walk.
    NotAllBitsConsumed,
    /// Hashes left over after the walk.
    NotAllHashesConsumed,
    /// The walk needed more flag bits than provided.
    BitsArrayOverflow,
    /// The walk needed more hashes than provided.
    HashesArrayOverflow,
    /// Two sibling nodes had the same hash, which would let a tree with duplicated
    /// transactions prove the same root.
    IdenticalHashesFound,
}

impl fmt::Display for MerkleBlockError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        use MerkleBlockError::*;

        match *self {
            NoTransactions => write!(f, "no transactions"),
            TooManyTransactions => write!(f, "too many transactions"),
            TooManyHashes => write!(f, "proof contains more hashes than transactions"),
            NotEnoughBits => write!(f, "proof contains less bits than hashes"),
            NotAllBitsConsumed => write!(f, "not all bits were consumed"),
            NotAllHashesConsumed => write!(f, "not all hashes were consumed"),
            BitsArrayOverflow => write!(f, "overflowed the bits array"),
            HashesArrayOverflow => write!(f, "overflowed the hashes array"),
            IdenticalHashesFound => write!(f, "found identical transaction hashes"),
        }
    }
}

impl std::error::Error for MerkleBlockError {}

/// A partial merkle tree as carried on the wire.
#[derive(PartialEq, Eq, Clone, Debug)]
pub struct PartialMerkleTree {
    /// The total number of leaves in the tree.
    num_transactions: u32,
    /// Node-is-parent-of-matched-leaf flags, depth first.
    bits: Vec<bool>,
    /// Hashes of the nodes that are not descended into, depth first.
    hashes: Vec<[u8; 32]>,
    hash_function: MerkleHashFunction,
}

impl PartialMerkleTree {
    /// Builds the tree from the `total_transactions`, `merkle_hashes` and
    /// `merkle_flags` fields of a message.
    pub fn from_message_parts(
        total_transactions: u32,
        merkle_hashes: &[TxMerkleNode],
        merkle_flags: &[u8],
    ) -> Self {
        let bits = merkle_flags
            .iter()
            .flat_map(|byte| (0..8).map(move |i| byte & (1 << i) != 0))
            .collect();
        PartialMerkleTree {
            num_transactions: total_transactions,
            bits,
            hashes: merkle_hashes.iter().map(|hash| hash.to_byte_array()).collect(),
            hash_function: MerkleHashFunction::Sha256d,
        }
    }

    /// Builds a tree from raw hashes and packed flags hashed with `hash_function`.
    pub fn from_raw_parts(
        element_count: u32,
        hashes: Vec<[u8; 32]>,
        flags: &[u8],
        hash_function: MerkleHashFunction,
    ) -> Self {
        let bits = flags.iter().flat_map(|byte| (0..8).map(move |i| byte & (1 << i) != 0)).collect();
        PartialMerkleTree {
            num_transactions: element_count,
            bits,
            hashes,
            hash_function,
        }
    }

    /// Constructs a tree proving the leaves whose `matches` flag is set.
    ///
    /// Leaves with no corresponding entry in `matches` are not matched.
    pub fn from_leaves(
        leaves: &[[u8; 32]],
        matches: &[bool],
        hash_function: MerkleHashFunction,
    ) -> Result<Self, MerkleBlockError> {
        if leaves.is_empty() {
            return Err(MerkleBlockError::NoTransactions);
        }
        if leaves.len() as u64 > MAX_TRANSACTIONS_PER_BLOCK as u64 {
            return Err(MerkleBlockError::TooManyTransactions);
        }
        let mut pmt = PartialMerkleTree {
            num_transactions: leaves.len() as u32,
            bits: Vec::with_capacity(leaves.len()),
            hashes: vec![],
            hash_function,
        };
        let height = pmt.tree_height();
        pmt.traverse_and_build(height, 0, leaves, matches);
        Ok(pmt)
    }

    /// Constructs a sha256d tree over block transactions.
    pub fn from_txids(txids: &[Txid], matches: &[bool]) -> Result<Self, MerkleBlockError> {
        let leaves: Vec<[u8; 32]> = txids.iter().map(|txid| txid.to_byte_array()).collect();
        Self::from_leaves(&leaves, matches, MerkleHashFunction::Sha256d)
    }

    pub fn num_transactions(&self) -> u32 {
        self.num_transactions
    }

    pub fn bits(&self) -> &[bool] {
        &self.bits
    }

    pub fn hashes(&self) -> &[[u8; 32]] {
        &self.hashes
    }

    pub fn hash_function(&self) -> MerkleHashFunction {
        self.hash_function
    }

    /// The flag bits packed LSB first, as sent in `merkle_flags`.
    pub fn flag_bytes(&self) -> Vec<u8> {
        let mut bytes = vec![0u8; self.bits.len().div_ceil(8)];
        for (i, bit) in self.bits.iter().enumerate() {
            bytes[i / 8] |= (*bit as u8) << (i % 8);
        }
        bytes
    }

    /// The hashes typed as sent in `merkle_hashes`.
    pub fn merkle_hashes(&self) -> Vec<TxMerkleNode> {
        self.hashes.iter().map(|hash| TxMerkleNode::from_byte_array(*hash)).collect()
    }

    /// Walks the tree, collecting matched leaves and their positions, and returns
    /// the merkle root.
    pub fn extract_matches(
        &self,
        matches: &mut Vec<[u8; 32]>,
        indexes: &mut Vec<u32>,
    ) -> Result<[u8; 32], MerkleBlockError> {
        matches.clear();
        indexes.clear();
        if self.num_transactions == 0 {
            return Err(MerkleBlockError::NoTransactions);
        }
        if self.num_transactions > MAX_TRANSACTIONS_PER_BLOCK {
            return Err(MerkleBlockError::TooManyTransactions);
        }
        if self.hashes.len() as u32 > self.num_transactions {
            return Err(MerkleBlockError::TooManyHashes);
        }
        if self.bits.len() < self.hashes.len() {
            return Err(MerkleBlockError::NotEnoughBits);
        }

        let height = self.tree_height();
        let mut bits_used = 0u32;
        let mut hash_used = 0u32;
        let root =
            self.traverse_and_extract(height, 0, &mut bits_used, &mut hash_used, matches, indexes)?;
        // padding bits of the last flag byte are allowed
        if (bits_used as usize).div_ceil(8) != self.bits.len().div_ceil(8) {
            return Err(MerkleBlockError::NotAllBitsConsumed);
        }
        if hash_used as usize != self.hashes.len() {
            return Err(MerkleBlockError::NotAllHashesConsumed);
        }
        Ok(root)
    }

    /// The root of the tree, if the tree is well formed.
    pub fn root(&self) -> Result<[u8; 32], MerkleBlockError> {
        self.extract_matches(&mut vec![], &mut vec![])
    }

    /// True when the tree is empty or well formed with root `desired_root`.
    pub fn has_root(&self, desired_root: &[u8; 32]) -> bool {
        self.num_transactions == 0 || self.root().is_ok_and(|root| root == *desired_root)
    }

    /// The matched leaf hashes, empty when the tree is malformed.
    pub fn element_hashes(&self) -> Vec<[u8; 32]> {
        let mut matches = vec![];
        match self.extract_matches(&mut matches, &mut vec![]) {
            Ok(_) => matches,
            Err(_) => vec![],
        }
    }

    pub fn contains_hash(&self, hash: &[u8; 32]) -> bool {
        self.element_hashes().contains(hash)
    }

    fn tree_height(&self) -> u32 {
        let mut height = 0;
        while self.calc_tree_width(height) > 1 {
            height += 1;
        }
        height
    }

    /// Number of nodes at `height`, leaves being height 0.
    fn calc_tree_width(&self, height: u32) -> u32 {
        (self.num_transactions + (1 << height) - 1) >> height
    }

    fn calc_hash(&self, height: u32, pos: u32, leaves: &[[u8; 32]]) -> [u8; 32] {
        if height == 0 {
            leaves[pos as usize]
        } else {
            let left = self.calc_hash(height - 1, pos * 2, leaves);
            let right = if pos * 2 + 1 < self.calc_tree_width(height - 1) {
                self.calc_hash(height - 1, pos * 2 + 1, leaves)
            } else {
                left
            };
            self.hash_function.hash_branch(&left, &right)
        }
    }

    fn traverse_and_build(&mut self, height: u32, pos: u32, leaves: &[[u8; 32]], matches: &[bool]) {
        let mut parent_of_match = false;
        let mut p = pos << height;
        while p < (pos + 1) << height && p < self.num_transactions {
            parent_of_match |= matches.get(p as usize).copied().unwrap_or(false);
            p += 1;
        }
        self.bits.push(parent_of_match);

        if height == 0 || !parent_of_match {
            let hash = self.calc_hash(height, pos, leaves);
            self.hashes.push(hash);
        } else {
            self.traverse_and_build(height - 1, pos * 2, leaves, matches);
            if pos * 2 + 1 < self.calc_tree_width(height - 1) {
                self.traverse_and_build(height - 1, pos * 2 + 1, leaves, matches);
            }
        }
    }

    fn traverse_and_extract(
        &self,
        height: u32,
        pos: u32,
        bits_used: &mut u32,
        hash_used: &mut u32,
        matches: &mut Vec<[u8; 32]>,
        indexes: &mut Vec<u32>,
    ) -> Result<[u8; 32], MerkleBlockError> {
        let Some(&parent_of_match) = self.bits.get(*bits_used as usize) else {
            return Err(MerkleBlockError::BitsArrayOverflow);
        };
        *bits_used += 1;

        if height == 0 || !parent_of_match {
            let Some(&hash) = self.hashes.get(*hash_used as usize) else {
                return Err(MerkleBlockError::HashesArrayOverflow);
            };
            *hash_used += 1;
            if height == 0 && parent_of_match {
                matches.push(hash);
                indexes.push(pos);
            }
            Ok(hash)
        } else {
            let left =
                self.traverse_and_extract(height - 1, pos * 2, bits_used, hash_used, matches, indexes)?;
            let right = if pos * 2 + 1 < self.calc_tree_width(height - 1) {
                let right = self.traverse_and_extract(
                    height - 1,
                    pos * 2 + 1,
                    bits_used,
                    hash_used,
                    matches,
                    indexes,
                )?;
                if right == left {
                    return Err(MerkleBlockError::IdenticalHashesFound);
                }
                right
            } else {
                left
            };
            Ok(self.hash_function.hash_branch(&left, &right))
        }
    }
}

/// Checks that `tree` is well formed, has `declared_merkle_root` as root and proves
/// `coinbase_txid` as the first transaction of the block.
pub fn verify_coinbase_inclusion(
    coinbase_txid: &Txid,
    tree: &PartialMerkleTree,
    declared_merkle_root: &TxMerkleNode,
) -> bool {
    let mut matches = vec![];
    let mut indexes = vec![];
    match tree.extract_matches(&mut matches, &mut indexes) {
        Ok(root) => {
            if root != declared_merkle_root.to_byte_array() {
                log::debug!(
                    "partial merkle tree root {} does not match block merkle root {}",
                    TxMerkleNode::from_byte_array(root),
                    declared_merkle_root
                );
                return false;
            }
            indexes.first() == Some(&0) && matches.first() == Some(coinbase_txid.as_byte_array())
        }
        Err(e) => {
            log::debug!("malformed partial merkle tree: {}", e);
            false
        }
    }
}
