use crate::hash_types::{QuorumHash, TxMerkleNode};
use crate::merkle::PartialMerkleTree;
use crate::sml::llmq_type::LLMQType;
use crate::sml::masternode_list_entry::MasternodeListEntry;
use crate::transaction::special_transaction::coinbase::CoinbasePayload;
use crate::transaction::special_transaction::quorum_commitment::QuorumEntry;
use crate::{BlockHash, ProTxHash, Transaction};

/// The getmnlistd message requests a mnlistdiff message that provides either:
/// - A full masternode list (if baseBlockHash is all-zero)
/// - An update to a previously requested masternode list
///
/// https://docs.dash.org/en/stable/docs/core/reference/p2p-network-data-messages.html#getmnlistd
#[derive(PartialEq, Eq, Clone, Copy, Debug)]
pub struct GetMnListDiff {
    pub base_block_hash: BlockHash,
    pub block_hash: BlockHash,
}

impl_consensus_encoding!(GetMnListDiff, base_block_hash, block_hash);

/// The mnlistdiff message is a reply to a getmnlistd message which requested
/// either a full masternode list or a diff for a range of blocks.
///
/// `merkle_hashes` and `merkle_flags` form a partial merkle tree proving that
/// `coinbase_tx` is part of `block_hash`.
///
/// https://docs.dash.org/en/stable/docs/core/reference/p2p-network-data-messages.html#mnlistdiff
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct MnListDiff {
    pub base_block_hash: BlockHash,
    pub block_hash: BlockHash,
    pub total_transactions: u32,
    pub merkle_hashes: Vec<TxMerkleNode>,
    pub merkle_flags: Vec<u8>,
    pub coinbase_tx: Transaction,
    pub deleted_masternodes: Vec<ProTxHash>,
    pub new_masternodes: Vec<MasternodeListEntry>,
    pub deleted_quorums: Vec<DeletedQuorum>,
    pub new_quorums: Vec<QuorumEntry>,
}

impl_consensus_encoding!(
    MnListDiff,
    base_block_hash,
    block_hash,
    total_transactions,
    merkle_hashes,
    merkle_flags,
    coinbase_tx,
    deleted_masternodes,
    new_masternodes,
    deleted_quorums,
    new_quorums
);

impl MnListDiff {
    /// The coinbase special payload, if the coinbase carries one.
    pub fn coinbase_payload(&self) -> Option<&CoinbasePayload> {
        self.coinbase_tx.special_transaction_payload.as_ref()?.to_coinbase_payload()
    }

    /// The partial merkle tree proving the coinbase inclusion.
    pub fn partial_merkle_tree(&self) -> PartialMerkleTree {
        PartialMerkleTree::from_message_parts(
            self.total_transactions,
            &self.merkle_hashes,
            &self.merkle_flags,
        )
    }

    /// True when the diff starts from an empty list.
    pub fn is_from_genesis(&self) -> bool {
        self.base_block_hash.is_zero()
    }

    pub fn has_rotated_quorums(&self) -> bool {
        self.new_quorums.iter().any(|q| q.llmq_type.is_rotating_quorum_type())
    }
}

/// A quorum removed from the list, identified by type and hash.
#[derive(PartialEq, Eq, Clone, Copy, Debug, Hash)]
pub struct DeletedQuorum {
    pub llmq_type: LLMQType,
    pub quorum_hash: QuorumHash,
}

impl_consensus_encoding!(DeletedQuorum, llmq_type, quorum_hash);
