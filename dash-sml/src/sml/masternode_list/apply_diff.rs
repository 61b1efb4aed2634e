use std::collections::{BTreeMap, BTreeSet};

use crate::network::message_sml::{DeletedQuorum, MnListDiff};
use crate::prelude::CoreBlockHeight;
use crate::sml::error::SmlError;
use crate::sml::llmq_type::LLMQType;
use crate::sml::masternode_list::{MasternodeList, MasternodeListBuilder};
use crate::sml::masternode_list_entry::qualified_masternode_list_entry::QualifiedMasternodeListEntry;
use crate::sml::quorum_entry::qualified_quorum_entry::QualifiedQuorumEntry;
use crate::{ProTxHash, QuorumHash};

/// A list built from a diff together with what the diff changed.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AppliedDiff {
    pub list: MasternodeList,
    pub added_masternodes: BTreeMap<ProTxHash, QualifiedMasternodeListEntry>,
    pub modified_masternodes: BTreeMap<ProTxHash, QualifiedMasternodeListEntry>,
    /// Deleted registration hashes that were present in the base list.
    pub removed_masternodes: BTreeSet<ProTxHash>,
    pub added_quorums: BTreeMap<LLMQType, BTreeMap<QuorumHash, QualifiedQuorumEntry>>,
    pub removed_quorums: Vec<DeletedQuorum>,
}

impl AppliedDiff {
    pub fn added_quorums(&self) -> impl Iterator<Item = &QualifiedQuorumEntry> {
        self.added_quorums.values().flat_map(BTreeMap::values)
    }
}

impl MasternodeList {
    /// Applies `diff` to `base`, `None` meaning the diff starts from the empty list.
    ///
    /// Entries of the diff already in the base are modified, others are added.
    /// Commitments already known keep their verification state.
    pub fn apply_diff(
        base: Option<&MasternodeList>,
        diff: &MnListDiff,
        diff_end_height: CoreBlockHeight,
    ) -> Result<AppliedDiff, SmlError> {
        let (mut masternodes, mut quorums) = match base {
            Some(base) => {
                if base.block_hash != diff.base_block_hash {
                    return Err(SmlError::BaseBlockHashMismatch {
                        expected: base.block_hash,
                        found: diff.base_block_hash,
                    });
                }
                (base.masternodes.clone(), base.quorums.clone())
            }
            None if diff.is_from_genesis() => (BTreeMap::new(), BTreeMap::new()),
            None => return Err(SmlError::MissingStartMasternodeList(diff.base_block_hash)),
        };
        let coinbase_payload = diff
            .coinbase_payload()
            .ok_or(SmlError::MissingCoinbasePayload(diff.block_hash))?;

        let mut removed_masternodes = BTreeSet::new();
        for pro_tx_hash in &diff.deleted_masternodes {
            if masternodes.remove(pro_tx_hash).is_some() {
                removed_masternodes.insert(*pro_tx_hash);
            }
        }

        let mut added_masternodes = BTreeMap::new();
        let mut modified_masternodes = BTreeMap::new();
        for new_mn in &diff.new_masternodes {
            let qualified = QualifiedMasternodeListEntry::from(*new_mn);
            if masternodes.insert(new_mn.pro_reg_tx_hash, qualified).is_some() {
                modified_masternodes.insert(new_mn.pro_reg_tx_hash, qualified);
            } else {
                added_masternodes.insert(new_mn.pro_reg_tx_hash, qualified);
            }
        }

        let mut removed_quorums = vec![];
        for deleted_quorum in &diff.deleted_quorums {
            if let Some(quorum_map) = quorums.get_mut(&deleted_quorum.llmq_type) {
                if quorum_map.remove(&deleted_quorum.quorum_hash).is_some() {
                    removed_quorums.push(*deleted_quorum);
                }
                if quorum_map.is_empty() {
                    quorums.remove(&deleted_quorum.llmq_type);
                }
            }
        }

        let mut added_quorums: BTreeMap<LLMQType, BTreeMap<QuorumHash, QualifiedQuorumEntry>> =
            BTreeMap::new();
        for new_quorum in &diff.new_quorums {
            let qualified = QualifiedQuorumEntry::from(new_quorum.clone());
            let by_hash = quorums.entry(new_quorum.llmq_type).or_default();
            match by_hash.get(&new_quorum.quorum_hash) {
                Some(known) if known.entry_hash == qualified.entry_hash => {}
                _ => {
                    by_hash.insert(new_quorum.quorum_hash, qualified.clone());
                    added_quorums
                        .entry(new_quorum.llmq_type)
                        .or_default()
                        .insert(new_quorum.quorum_hash, qualified);
                }
            }
        }

        let chain_lock_signature = coinbase_payload.chain_lock.map(|chain_lock| chain_lock.signature);
        let list = MasternodeListBuilder::new(masternodes, quorums, diff.block_hash, diff_end_height)
            .with_chain_lock_signature(chain_lock_signature)
            .build();
        log::debug!(
            "applied diff {} -> {} at height {}: {} added, {} modified, {} removed masternodes, {} new quorums",
            diff.base_block_hash,
            diff.block_hash,
            diff_end_height,
            added_masternodes.len(),
            modified_masternodes.len(),
            removed_masternodes.len(),
            diff.new_quorums.len()
        );
        Ok(AppliedDiff {
            list,
            added_masternodes,
            modified_masternodes,
            removed_masternodes,
            added_quorums,
            removed_quorums,
        })
    }

    /// Replaces quorums with their validated counterparts, producing a new list.
    pub fn with_quorum_statuses<'a, I>(&self, updated: I) -> MasternodeList
    where
        I: IntoIterator<Item = &'a QualifiedQuorumEntry>,
    {
        let mut list = self.clone();
        for quorum in updated {
            if let Some(known) = list
                .quorums
                .get_mut(&quorum.quorum_entry.llmq_type)
                .and_then(|by_hash| by_hash.get_mut(&quorum.quorum_entry.quorum_hash))
            {
                if known.entry_hash == quorum.entry_hash {
                    known.verified = quorum.verified.clone();
                }
            }
        }
        list
    }
}
