use std::collections::BTreeMap;

use crate::bls_sig_utils::BLSSignature;
use crate::prelude::CoreBlockHeight;
use crate::sml::llmq_type::LLMQType;
use crate::sml::masternode_list::MasternodeList;
use crate::sml::masternode_list_entry::qualified_masternode_list_entry::QualifiedMasternodeListEntry;
use crate::sml::quorum_entry::qualified_quorum_entry::QualifiedQuorumEntry;
use crate::{BlockHash, ProTxHash, QuorumHash};

/// Assembles a [`MasternodeList`], computing both merkle roots from the maps.
pub struct MasternodeListBuilder {
    pub block_hash: BlockHash,
    pub block_height: CoreBlockHeight,
    pub masternodes: BTreeMap<ProTxHash, QualifiedMasternodeListEntry>,
    pub quorums: BTreeMap<LLMQType, BTreeMap<QuorumHash, QualifiedQuorumEntry>>,
    pub chain_lock_signature: Option<BLSSignature>,
}

impl MasternodeListBuilder {
    pub fn empty(block_hash: BlockHash, block_height: CoreBlockHeight) -> Self {
        Self::new(BTreeMap::new(), BTreeMap::new(), block_hash, block_height)
    }

    pub fn new(
        masternodes: BTreeMap<ProTxHash, QualifiedMasternodeListEntry>,
        quorums: BTreeMap<LLMQType, BTreeMap<QuorumHash, QualifiedQuorumEntry>>,
        block_hash: BlockHash,
        block_height: CoreBlockHeight,
    ) -> Self {
        Self {
            block_hash,
            block_height,
            masternodes,
            quorums,
            chain_lock_signature: None,
        }
    }

    /// A zeroed signature means the coinbase carries no chain lock.
    pub fn with_chain_lock_signature(mut self, signature: Option<BLSSignature>) -> Self {
        self.chain_lock_signature = signature.filter(|signature| !signature.is_zeroed());
        self
    }

    pub fn build(self) -> MasternodeList {
        let masternode_merkle_root = MasternodeList::masternode_merkle_root_for(&self.masternodes);
        let llmq_merkle_root = MasternodeList::llmq_merkle_root_for(&self.quorums);
        MasternodeList {
            block_hash: self.block_hash,
            known_height: self.block_height,
            masternode_merkle_root,
            llmq_merkle_root,
            masternodes: self.masternodes,
            quorums: self.quorums,
            chain_lock_signature: self.chain_lock_signature,
        }
    }
}
