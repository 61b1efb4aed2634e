use std::collections::{BTreeMap, BTreeSet};

use hashes::Hash;

use crate::network::message_qrinfo::QuorumSnapshot;
use crate::network::message_sml::DeletedQuorum;
use crate::prelude::CoreBlockHeight;
use crate::sml::masternode_list::AppliedDiff;
use crate::sml::masternode_list_entry::qualified_masternode_list_entry::QualifiedMasternodeListEntry;
use crate::sml::quorum_entry::qualified_quorum_entry::QualifiedQuorumEntry;
use crate::{BlockHash, ProTxHash};

/// What processing one `mnlistdiff` found out.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MnListDiffResult {
    pub base_block_hash: BlockHash,
    pub block_hash: BlockHash,
    pub height: CoreBlockHeight,
    /// The coinbase carries a coinbase special payload.
    pub found_coinbase: bool,
    /// The coinbase is proven to be the first transaction of the block.
    pub valid_coinbase: bool,
    pub root_mn_list_valid: bool,
    pub root_quorum_list_valid: bool,
    /// No added quorum failed validation.
    pub valid_quorums: bool,
    pub needed_missing_masternode_lists: BTreeSet<BlockHash>,
    pub added_masternodes: BTreeMap<ProTxHash, QualifiedMasternodeListEntry>,
    pub modified_masternodes: BTreeMap<ProTxHash, QualifiedMasternodeListEntry>,
    pub removed_masternodes: BTreeSet<ProTxHash>,
    /// Added quorums with the verification status they ended up with.
    pub added_quorums: Vec<QualifiedQuorumEntry>,
    pub removed_quorums: Vec<DeletedQuorum>,
}

impl MnListDiffResult {
    pub fn new(base_block_hash: BlockHash, block_hash: BlockHash, height: CoreBlockHeight) -> Self {
        MnListDiffResult {
            base_block_hash,
            block_hash,
            height,
            found_coinbase: false,
            valid_coinbase: false,
            root_mn_list_valid: false,
            root_quorum_list_valid: false,
            valid_quorums: false,
            needed_missing_masternode_lists: BTreeSet::new(),
            added_masternodes: BTreeMap::new(),
            modified_masternodes: BTreeMap::new(),
            removed_masternodes: BTreeSet::new(),
            added_quorums: vec![],
            removed_quorums: vec![],
        }
    }

    /// The result of a message that could not be decoded.
    pub fn malformed() -> Self {
        Self::new(BlockHash::all_zeros(), BlockHash::all_zeros(), 0)
    }

    pub fn is_valid(&self) -> bool {
        self.found_coinbase
            && self.valid_coinbase
            && self.root_mn_list_valid
            && self.root_quorum_list_valid
            && self.valid_quorums
    }

    pub fn has_rotated_quorums(&self) -> bool {
        self.added_quorums.iter().any(|q| q.quorum_entry.llmq_type.is_rotating_quorum_type())
    }

    pub(crate) fn record_changes(&mut self, applied: &AppliedDiff) {
        self.added_masternodes = applied.added_masternodes.clone();
        self.modified_masternodes = applied.modified_masternodes.clone();
        self.removed_masternodes = applied.removed_masternodes.clone();
        self.added_quorums = applied.added_quorums().cloned().collect();
        self.removed_quorums = applied.removed_quorums.clone();
    }

    /// Takes over the statuses of `checked` quorums present among the added ones.
    pub(crate) fn record_quorum_statuses(&mut self, checked: &[QualifiedQuorumEntry]) {
        for added in self.added_quorums.iter_mut() {
            if let Some(status) = checked
                .iter()
                .find(|quorum| quorum.entry_hash == added.entry_hash)
                .map(|quorum| quorum.verified.clone())
            {
                added.verified = status;
            }
        }
    }
}

/// What processing one `qrinfo` found out, diff by diff.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct QrInfoResult {
    pub result_at_tip: MnListDiffResult,
    pub result_at_h: MnListDiffResult,
    pub result_at_h_minus_c: MnListDiffResult,
    pub result_at_h_minus_2c: MnListDiffResult,
    pub result_at_h_minus_3c: MnListDiffResult,
    pub snapshot_at_h_minus_c: QuorumSnapshot,
    pub snapshot_at_h_minus_2c: QuorumSnapshot,
    pub snapshot_at_h_minus_3c: QuorumSnapshot,
    /// Whether the h-4c pair was sent.
    pub extra_share: bool,
    pub result_at_h_minus_4c: Option<MnListDiffResult>,
    pub snapshot_at_h_minus_4c: Option<QuorumSnapshot>,
    /// The last rotating commitment of each quorum index, with its status.
    pub last_quorum_per_index: Vec<QualifiedQuorumEntry>,
    pub quorum_snapshot_list: Vec<QuorumSnapshot>,
    pub mn_list_diff_list: Vec<MnListDiffResult>,
}

impl QrInfoResult {
    /// Every diff result, oldest first.
    pub fn diff_results(&self) -> impl Iterator<Item = &MnListDiffResult> {
        self.mn_list_diff_list
            .iter()
            .chain(self.result_at_h_minus_4c.iter())
            .chain([
                &self.result_at_h_minus_3c,
                &self.result_at_h_minus_2c,
                &self.result_at_h_minus_c,
                &self.result_at_h,
                &self.result_at_tip,
            ])
    }

    pub fn is_valid(&self) -> bool {
        self.diff_results().all(MnListDiffResult::is_valid)
    }

    pub fn needed_missing_masternode_lists(&self) -> BTreeSet<BlockHash> {
        self.diff_results()
            .flat_map(|result| result.needed_missing_masternode_lists.iter().copied())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_result_is_not_valid() {
        let mut result = MnListDiffResult::malformed();
        assert!(!result.is_valid());
        result.found_coinbase = true;
        result.valid_coinbase = true;
        result.root_mn_list_valid = true;
        result.root_quorum_list_valid = true;
        assert!(!result.is_valid());
        result.valid_quorums = true;
        assert!(result.is_valid());
    }
}
