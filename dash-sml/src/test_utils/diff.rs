use std::collections::BTreeMap;

use hashes::Hash;

use crate::bls_sig_utils::BLSSignature;
use crate::hash_types::MerkleRootMasternodeList;
use crate::merkle::PartialMerkleTree;
use crate::network::message_sml::{DeletedQuorum, MnListDiff};
use crate::prelude::CoreBlockHeight;
use crate::sml::llmq_type::LLMQType;
use crate::sml::masternode_list::MasternodeList;
use crate::sml::masternode_list_entry::MasternodeListEntry;
use crate::sml::masternode_list_entry::qualified_masternode_list_entry::QualifiedMasternodeListEntry;
use crate::sml::quorum_entry::qualified_quorum_entry::QualifiedQuorumEntry;
use crate::transaction::special_transaction::TransactionPayload;
use crate::transaction::special_transaction::coinbase::{CoinbaseChainLock, CoinbasePayload};
use crate::transaction::special_transaction::quorum_commitment::QuorumEntry;
use crate::{BlockHash, OutPoint, ProTxHash, QuorumHash, Transaction, TxIn, TxMerkleNode, TxOut};

/// Builds a `mnlistdiff` whose coinbase commits to the roots of the list it yields.
///
/// The block holds the coinbase only, so its merkle root is the coinbase txid; see
/// [`DiffBuilder::merkle_root`].
#[derive(Clone, Debug)]
pub struct DiffBuilder {
    base: Option<MasternodeList>,
    base_block_hash: BlockHash,
    block_hash: BlockHash,
    height: CoreBlockHeight,
    deleted_masternodes: Vec<ProTxHash>,
    new_masternodes: Vec<MasternodeListEntry>,
    deleted_quorums: Vec<DeletedQuorum>,
    new_quorums: Vec<QuorumEntry>,
    chain_lock_signature: Option<BLSSignature>,
    flip_masternode_root: bool,
}

impl DiffBuilder {
    /// A diff from `base_block_hash` whose roots are computed as if the base list were
    /// empty, which is only right for a diff from genesis.
    pub fn new(base_block_hash: BlockHash, block_hash: BlockHash, height: CoreBlockHeight) -> Self {
        DiffBuilder {
            base: None,
            base_block_hash,
            block_hash,
            height,
            deleted_masternodes: vec![],
            new_masternodes: vec![],
            deleted_quorums: vec![],
            new_quorums: vec![],
            chain_lock_signature: None,
            flip_masternode_root: false,
        }
    }

    /// A diff on top of `list`.
    pub fn on_list(list: &MasternodeList, block_hash: BlockHash, height: CoreBlockHeight) -> Self {
        DiffBuilder {
            base: Some(list.clone()),
            ..Self::new(list.block_hash, block_hash, height)
        }
    }

    pub fn add_masternodes<I: IntoIterator<Item = MasternodeListEntry>>(mut self, entries: I) -> Self {
        self.new_masternodes.extend(entries);
        self
    }

    pub fn remove_masternodes<I: IntoIterator<Item = ProTxHash>>(mut self, hashes: I) -> Self {
        self.deleted_masternodes.extend(hashes);
        self
    }

    pub fn add_quorums<I: IntoIterator<Item = QuorumEntry>>(mut self, quorums: I) -> Self {
        self.new_quorums.extend(quorums);
        self
    }

    pub fn remove_quorums<I: IntoIterator<Item = (LLMQType, QuorumHash)>>(mut self, quorums: I) -> Self {
        self.deleted_quorums.extend(quorums.into_iter().map(|(llmq_type, quorum_hash)| DeletedQuorum {
            llmq_type,
            quorum_hash,
        }));
        self
    }

    /// Puts a chain lock signature in the coinbase, making it a version 3 payload.
    pub fn with_chain_lock_signature(mut self, signature: BLSSignature) -> Self {
        self.chain_lock_signature = Some(signature);
        self
    }

    /// Makes the coinbase commit to a wrong masternode list root.
    pub fn with_flipped_masternode_root(mut self) -> Self {
        self.flip_masternode_root = true;
        self
    }

    pub fn build(self) -> MnListDiff {
        let (masternodes, quorums) = self.resulting_maps();
        let mut masternode_root = MasternodeList::masternode_merkle_root_for(&masternodes);
        if self.flip_masternode_root {
            let mut bytes = masternode_root.to_byte_array();
            bytes[0] ^= 0x01;
            masternode_root = MerkleRootMasternodeList::from_byte_array(bytes);
        }
        let payload = CoinbasePayload {
            version: if self.chain_lock_signature.is_some() { 3 } else { 2 },
            height: self.height,
            merkle_root_masternode_list: masternode_root,
            merkle_root_quorums: Some(MasternodeList::llmq_merkle_root_for(&quorums)),
            chain_lock: self.chain_lock_signature.map(|signature| CoinbaseChainLock {
                height_diff: 0,
                signature,
                asset_locked_amount: 0,
            }),
        };
        let coinbase_tx = coinbase_transaction(self.height, payload);
        let tree = PartialMerkleTree::from_txids(&[coinbase_tx.txid()], &[true])
            .expect("a single transaction tree");
        MnListDiff {
            base_block_hash: self.base_block_hash,
            block_hash: self.block_hash,
            total_transactions: tree.num_transactions(),
            merkle_hashes: tree.merkle_hashes(),
            merkle_flags: tree.flag_bytes(),
            coinbase_tx,
            deleted_masternodes: self.deleted_masternodes,
            new_masternodes: self.new_masternodes,
            deleted_quorums: self.deleted_quorums,
            new_quorums: self.new_quorums,
        }
    }

    /// The merkle root the header of a diff's block must carry.
    pub fn merkle_root(diff: &MnListDiff) -> TxMerkleNode {
        TxMerkleNode::from_byte_array(diff.coinbase_tx.txid().to_byte_array())
    }

    #[allow(clippy::type_complexity)]
    fn resulting_maps(
        &self,
    ) -> (
        BTreeMap<ProTxHash, QualifiedMasternodeListEntry>,
        BTreeMap<LLMQType, BTreeMap<QuorumHash, QualifiedQuorumEntry>>,
    ) {
        let (mut masternodes, mut quorums) = match &self.base {
            Some(base) => (base.masternodes.clone(), base.quorums.clone()),
            None => (BTreeMap::new(), BTreeMap::new()),
        };
        for hash in &self.deleted_masternodes {
            masternodes.remove(hash);
        }
        for entry in &self.new_masternodes {
            masternodes.insert(entry.pro_reg_tx_hash, QualifiedMasternodeListEntry::from(*entry));
        }
        for deleted in &self.deleted_quorums {
            if let Some(by_hash) = quorums.get_mut(&deleted.llmq_type) {
                by_hash.remove(&deleted.quorum_hash);
                if by_hash.is_empty() {
                    quorums.remove(&deleted.llmq_type);
                }
            }
        }
        for quorum in &self.new_quorums {
            quorums
                .entry(quorum.llmq_type)
                .or_default()
                .insert(quorum.quorum_hash, QualifiedQuorumEntry::from(quorum.clone()));
        }
        (masternodes, quorums)
    }
}

fn coinbase_transaction(height: CoreBlockHeight, payload: CoinbasePayload) -> Transaction {
    let mut script_sig = vec![0x04];
    script_sig.extend_from_slice(&height.to_le_bytes());
    Transaction {
        version: 3,
        lock_time: 0,
        input: vec![TxIn {
            previous_output: OutPoint::null(),
            script_sig,
            sequence: u32::MAX,
        }],
        output: vec![TxOut {
            value: 500_000_000,
            script_pubkey: vec![0x76, 0xa9, 0x14],
        }],
        special_transaction_payload: Some(TransactionPayload::CoinbasePayloadType(payload)),
    }
}
