use std::collections::BTreeMap;

use hashes::Hash;

use crate::hash_types::{MerkleRootMasternodeList, MerkleRootQuorums};
use crate::merkle::merkle_root_from_hashes;
use crate::sml::llmq_type::LLMQType;
use crate::sml::masternode_list::MasternodeList;
use crate::sml::masternode_list_entry::qualified_masternode_list_entry::QualifiedMasternodeListEntry;
use crate::sml::quorum_entry::qualified_quorum_entry::QualifiedQuorumEntry;
use crate::transaction::special_transaction::coinbase::CoinbasePayload;
use crate::{ProTxHash, QuorumHash};

impl MasternodeList {
    /// Root over the entry hashes, in ascending registration hash order.
    /// An empty list has an all zero root.
    pub(crate) fn masternode_merkle_root_for(
        masternodes: &BTreeMap<ProTxHash, QualifiedMasternodeListEntry>,
    ) -> MerkleRootMasternodeList {
        let hashes = masternodes.values().map(|node| node.entry_hash.to_byte_array()).collect();
        merkle_root_from_hashes(hashes)
            .map(MerkleRootMasternodeList::from_byte_array)
            .unwrap_or_else(MerkleRootMasternodeList::all_zeros)
    }

    /// Root over the commitment entry hashes, sorted by byte value.
    pub(crate) fn llmq_merkle_root_for(
        quorums: &BTreeMap<LLMQType, BTreeMap<QuorumHash, QualifiedQuorumEntry>>,
    ) -> MerkleRootQuorums {
        merkle_root_from_hashes(Self::hashes_for_quorum_merkle_root_of(quorums))
            .map(MerkleRootQuorums::from_byte_array)
            .unwrap_or_else(MerkleRootQuorums::all_zeros)
    }

    fn hashes_for_quorum_merkle_root_of(
        quorums: &BTreeMap<LLMQType, BTreeMap<QuorumHash, QualifiedQuorumEntry>>,
    ) -> Vec<[u8; 32]> {
        let mut llmq_commitment_hashes = quorums
            .values()
            .flat_map(|q_map| q_map.values().map(|entry| entry.entry_hash.to_byte_array()))
            .collect::<Vec<_>>();
        llmq_commitment_hashes.sort();
        llmq_commitment_hashes
    }

    pub fn calculate_masternodes_merkle_root(&self) -> MerkleRootMasternodeList {
        Self::masternode_merkle_root_for(&self.masternodes)
    }

    pub fn calculate_llmq_merkle_root(&self) -> MerkleRootQuorums {
        Self::llmq_merkle_root_for(&self.quorums)
    }

    pub fn hashes_for_quorum_merkle_root(&self) -> Vec<[u8; 32]> {
        Self::hashes_for_quorum_merkle_root_of(&self.quorums)
    }

    pub fn has_valid_mn_list_root(&self, coinbase_payload: &CoinbasePayload) -> bool {
        coinbase_payload.merkle_root_masternode_list == self.masternode_merkle_root
    }

    /// A version 1 coinbase predates quorums and is only valid for a list without any.
    pub fn has_valid_llmq_list_root(&self, coinbase_payload: &CoinbasePayload) -> bool {
        match coinbase_payload.merkle_root_quorums {
            Some(root) => root == self.llmq_merkle_root,
            None => self.quorums.values().all(BTreeMap::is_empty),
        }
    }
}
