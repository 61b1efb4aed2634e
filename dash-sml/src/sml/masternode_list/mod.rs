//! The masternode list at one block.

mod apply_diff;
mod builder;
mod is_lock_methods;
mod masternode_helpers;
mod merkle_roots;
mod quorum_helpers;
pub mod rotation;
mod scores_for_quorum;

use std::collections::BTreeMap;
use std::io;

pub use apply_diff::AppliedDiff;
pub use builder::MasternodeListBuilder;
pub use masternode_helpers::MasternodeListComparison;

use crate::bls_sig_utils::BLSSignature;
use crate::consensus::{Decodable, Encodable, encode};
use crate::hash_types::{MerkleRootMasternodeList, MerkleRootQuorums};
use crate::prelude::CoreBlockHeight;
use crate::sml::llmq_entry_verification::{
    LLMQEntryVerificationSkipStatus, LLMQEntryVerificationStatus,
};
use crate::sml::llmq_type::LLMQType;
use crate::sml::masternode_list_entry::MasternodeListEntry;
use crate::sml::masternode_list_entry::qualified_masternode_list_entry::QualifiedMasternodeListEntry;
use crate::sml::quorum_entry::qualified_quorum_entry::QualifiedQuorumEntry;
use crate::transaction::special_transaction::quorum_commitment::QuorumEntry;
use crate::{BlockHash, ProTxHash, QuorumHash};

/// The deterministic masternode list and the active quorums at a block.
///
/// A list is never modified once built. Applying a diff yields a new list, see
/// [`MasternodeList::apply_diff`].
#[derive(Clone, Eq, PartialEq, Debug)]
pub struct MasternodeList {
    pub block_hash: BlockHash,
    pub known_height: CoreBlockHeight,
    pub masternode_merkle_root: MerkleRootMasternodeList,
    pub llmq_merkle_root: MerkleRootQuorums,
    pub masternodes: BTreeMap<ProTxHash, QualifiedMasternodeListEntry>,
    pub quorums: BTreeMap<LLMQType, BTreeMap<QuorumHash, QualifiedQuorumEntry>>,
    /// The chain lock signature committed in the coinbase of this block, if any.
    pub chain_lock_signature: Option<BLSSignature>,
}

impl MasternodeList {
    pub fn empty(block_hash: BlockHash, block_height: CoreBlockHeight) -> Self {
        MasternodeListBuilder::empty(block_hash, block_height).build()
    }

    pub fn build(
        masternodes: BTreeMap<ProTxHash, QualifiedMasternodeListEntry>,
        quorums: BTreeMap<LLMQType, BTreeMap<QuorumHash, QualifiedQuorumEntry>>,
        block_hash: BlockHash,
        block_height: CoreBlockHeight,
    ) -> MasternodeListBuilder {
        MasternodeListBuilder::new(masternodes, quorums, block_hash, block_height)
    }
}

/// Persisted form: the raw entries and commitments plus whether each quorum was
/// verified. Hashes and roots are recomputed when decoding.
impl Encodable for MasternodeList {
    fn consensus_encode<W: io::Write + ?Sized>(&self, w: &mut W) -> Result<usize, io::Error> {
        let mut len = 0;
        len += self.block_hash.consensus_encode(w)?;
        len += self.known_height.consensus_encode(w)?;
        match &self.chain_lock_signature {
            Some(signature) => {
                len += true.consensus_encode(w)?;
                len += signature.consensus_encode(w)?;
            }
            None => len += false.consensus_encode(w)?,
        }
        let entries: Vec<MasternodeListEntry> =
            self.masternodes.values().map(|node| node.masternode_list_entry).collect();
        len += entries.consensus_encode(w)?;
        let quorums: Vec<&QualifiedQuorumEntry> =
            self.quorums.values().flat_map(|by_hash| by_hash.values()).collect();
        len += crate::VarInt(quorums.len() as u64).consensus_encode(w)?;
        for quorum in quorums {
            len += quorum.quorum_entry.consensus_encode(w)?;
            len += quorum.is_verified().consensus_encode(w)?;
        }
        Ok(len)
    }
}

impl Decodable for MasternodeList {
    fn consensus_decode<R: io::Read + ?Sized>(r: &mut R) -> Result<Self, encode::Error> {
        let block_hash = BlockHash::consensus_decode(r)?;
        let known_height = u32::consensus_decode(r)?;
        let chain_lock_signature = if bool::consensus_decode(r)? {
            Some(BLSSignature::consensus_decode(r)?)
        } else {
            None
        };
        let entries: Vec<MasternodeListEntry> = Decodable::consensus_decode(r)?;
        let masternodes = entries
            .into_iter()
            .map(|entry| (entry.pro_reg_tx_hash, entry.into()))
            .collect();

        let count = crate::VarInt::consensus_decode(r)?.0;
        // a commitment takes at least 300 bytes
        encode::check_vec_allocation(count, 300)?;
        let mut quorums: BTreeMap<LLMQType, BTreeMap<QuorumHash, QualifiedQuorumEntry>> =
            BTreeMap::new();
        for _ in 0..count {
            let entry = QuorumEntry::consensus_decode(r)?;
            let verified = bool::consensus_decode(r)?;
            let mut quorum = QualifiedQuorumEntry::from(entry);
            quorum.verified = if verified {
                LLMQEntryVerificationStatus::Verified
            } else {
                LLMQEntryVerificationStatus::Skipped(
                    LLMQEntryVerificationSkipStatus::NotMarkedForVerification,
                )
            };
            quorums
                .entry(quorum.quorum_entry.llmq_type)
                .or_default()
                .insert(quorum.quorum_entry.quorum_hash, quorum);
        }
        Ok(MasternodeListBuilder::new(masternodes, quorums, block_hash, known_height)
            .with_chain_lock_signature(chain_lock_signature)
            .build())
    }
}

#[cfg(test)]
mod tests {
    use hashes::Hash;

    use super::*;
    use crate::consensus::{deserialize, serialize};
    use crate::test_utils::{TestMasternode, TestQuorum};

    #[test]
    fn persisted_list_round_trips_with_verification_state() {
        let quorum = TestQuorum::non_rotating_for_test([1; 32], 4);
        let mut verified = QualifiedQuorumEntry::from(quorum.commitment.clone());
        verified.verified = LLMQEntryVerificationStatus::Verified;
        let mut quorums: BTreeMap<LLMQType, BTreeMap<QuorumHash, QualifiedQuorumEntry>> =
            BTreeMap::new();
        quorums.entry(LLMQType::LlmqtypeTest).or_default().insert(verified.quorum_entry.quorum_hash, verified);
        let masternodes = (0..3)
            .map(|i| {
                let entry = TestMasternode::new(i).entry();
                (entry.pro_reg_tx_hash, entry.into())
            })
            .collect();
        let list = MasternodeList::build(masternodes, quorums, BlockHash::from_byte_array([4; 32]), 40)
            .with_chain_lock_signature(Some(BLSSignature::from([6; 96])))
            .build();

        let decoded: MasternodeList = deserialize(&serialize(&list)).unwrap();
        assert_eq!(decoded, list);
        assert!(decoded.quorums[&LLMQType::LlmqtypeTest].values().all(QualifiedQuorumEntry::is_verified));
    }

    #[test]
    fn empty_list_has_zero_roots() {
        let list = MasternodeList::empty(BlockHash::all_zeros(), 0);
        assert_eq!(list.masternode_merkle_root, MerkleRootMasternodeList::all_zeros());
        assert_eq!(list.llmq_merkle_root, MerkleRootQuorums::all_zeros());
    }
}
