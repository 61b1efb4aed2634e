// Rust Dash Library
// Written in 2014 by
//     Andrew Poelstra <apoelstra@wpsoftware.net>
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

//! Dash hash types.
//!
//! This module defines types for hashes used throughout the library. These
//! types are needed in order to avoid mixing data of the same hash format
//! (e.g. `SHA256d`) but of different meaning (such as transaction id, block
//! hash).

use std::cmp::Ordering;

use hashes::{Hash, hash_newtype, sha256, sha256d};

use crate::internal_macros::impl_hashencode;

hash_newtype! {
    /// A dash block hash.
    pub struct BlockHash(sha256d::Hash);
    /// A dash transaction hash/transaction ID.
    pub struct Txid(sha256d::Hash);
    /// A hash of the Merkle tree branch or root for transactions.
    pub struct TxMerkleNode(sha256d::Hash);

    /// The registration transaction hash identifying a masternode.
    pub struct ProTxHash(sha256d::Hash);
    /// Hash of the block at which a masternode registration was confirmed.
    pub struct ConfirmedHash(sha256d::Hash);
    /// Hash of a serialized masternode list entry, a leaf of the masternode list root.
    pub struct MnListEntryHash(sha256d::Hash);

    /// The hash of the block a quorum was formed at.
    pub struct QuorumHash(sha256d::Hash);
    /// Hash of the verification vector of a quorum.
    pub struct QuorumVVecHash(sha256d::Hash);
    /// The message signed by every member of a quorum commitment.
    pub struct QuorumCommitmentHash(sha256d::Hash);
    /// Hash of a serialized quorum commitment, a leaf of the quorum list root.
    pub struct QuorumEntryHash(sha256d::Hash);
    /// Seed used to score masternodes for a quorum.
    pub struct QuorumModifierHash(sha256d::Hash);
    /// Orders quorums for a signing request id.
    pub struct QuorumOrderingHash(sha256d::Hash);
    /// Signing request id of an InstantSend or ChainLock message.
    pub struct QuorumSigningRequestId(sha256d::Hash);

    /// Masternode list merkle root carried in the coinbase payload.
    pub struct MerkleRootMasternodeList(sha256d::Hash);
    /// Quorum list merkle root carried in the coinbase payload.
    pub struct MerkleRootQuorums(sha256d::Hash);

    /// `sha256(pro_reg_tx_hash || confirmed_hash)`, precomputed per entry.
    pub struct ConfirmedHashHashedWithProRegTx(sha256::Hash);
    /// The score of a masternode for a quorum modifier.
    pub struct ScoreHash(sha256::Hash);
}

impl_hashencode!(BlockHash);
impl_hashencode!(Txid);
impl_hashencode!(TxMerkleNode);
impl_hashencode!(ProTxHash);
impl_hashencode!(ConfirmedHash);
impl_hashencode!(MnListEntryHash);
impl_hashencode!(QuorumHash);
impl_hashencode!(QuorumVVecHash);
impl_hashencode!(QuorumCommitmentHash);
impl_hashencode!(QuorumEntryHash);
impl_hashencode!(MerkleRootMasternodeList);
impl_hashencode!(MerkleRootQuorums);

impl BlockHash {
    /// The all-zero hash used as base of a diff starting from genesis.
    pub fn is_zero(&self) -> bool {
        *self == BlockHash::all_zeros()
    }
}

impl From<BlockHash> for QuorumHash {
    fn from(block_hash: BlockHash) -> Self {
        QuorumHash::from_byte_array(block_hash.to_byte_array())
    }
}

impl From<QuorumHash> for BlockHash {
    fn from(quorum_hash: QuorumHash) -> Self {
        BlockHash::from_byte_array(quorum_hash.to_byte_array())
    }
}

impl ConfirmedHashHashedWithProRegTx {
    pub fn new(pro_reg_tx_hash: &ProTxHash, confirmed_hash: &ConfirmedHash) -> Self {
        let mut data = [0u8; 64];
        data[..32].copy_from_slice(pro_reg_tx_hash.as_byte_array());
        data[32..].copy_from_slice(confirmed_hash.as_byte_array());
        Self::from_byte_array(sha256::Hash::hash(&data).to_byte_array())
    }
}

impl ScoreHash {
    /// `sha256(confirmed_hash_hashed_with_pro_reg_tx || modifier)`.
    pub fn create_score(
        confirmed_hash_hashed_with_pro_reg_tx: &ConfirmedHashHashedWithProRegTx,
        modifier: &QuorumModifierHash,
    ) -> Self {
        let mut data = [0u8; 64];
        data[..32].copy_from_slice(confirmed_hash_hashed_with_pro_reg_tx.as_byte_array());
        data[32..].copy_from_slice(modifier.as_byte_array());
        Self::from_byte_array(sha256::Hash::hash(&data).to_byte_array())
    }

    /// Compares two scores as 256-bit little endian integers.
    pub fn cmp_as_uint256(&self, other: &ScoreHash) -> Ordering {
        self.as_byte_array().iter().rev().cmp(other.as_byte_array().iter().rev())
    }
}

/// Double sha256 of `data`, as raw bytes.
pub(crate) fn sha256d_bytes(data: &[u8]) -> [u8; 32] {
    sha256d::Hash::hash(data).to_byte_array()
}
