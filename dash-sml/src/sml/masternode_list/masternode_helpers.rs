use std::collections::BTreeSet;

use crate::ProTxHash;
use crate::sml::masternode_list::MasternodeList;
use crate::sml::masternode_list_entry::qualified_masternode_list_entry::QualifiedMasternodeListEntry;

/// Differences of a list against an older one.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct MasternodeListComparison {
    pub added: BTreeSet<ProTxHash>,
    pub removed: BTreeSet<ProTxHash>,
    /// Present in both lists with a different entry.
    pub changed: BTreeSet<ProTxHash>,
    pub became_valid: BTreeSet<ProTxHash>,
    pub became_invalid: BTreeSet<ProTxHash>,
}

impl MasternodeListComparison {
    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.removed.is_empty() && self.changed.is_empty()
    }
}

impl MasternodeList {
    pub fn masternode_count(&self) -> usize {
        self.masternodes.len()
    }

    pub fn valid_masternode_count(&self) -> usize {
        self.masternodes.values().filter(|node| node.masternode_list_entry.is_valid).count()
    }

    pub fn masternode_for_registration_hash(
        &self,
        pro_reg_tx_hash: &ProTxHash,
    ) -> Option<&QualifiedMasternodeListEntry> {
        self.masternodes.get(pro_reg_tx_hash)
    }

    pub fn has_valid_masternode(&self, pro_reg_tx_hash: &ProTxHash) -> bool {
        self.masternodes
            .get(pro_reg_tx_hash)
            .is_some_and(|node| node.masternode_list_entry.is_valid)
    }

    pub fn pro_reg_tx_hashes(&self) -> impl Iterator<Item = &ProTxHash> {
        self.masternodes.keys()
    }

    /// Compares this list against an older one.
    pub fn compare(&self, previous: &MasternodeList) -> MasternodeListComparison {
        let mut comparison = MasternodeListComparison::default();
        for (pro_tx_hash, node) in &self.masternodes {
            match previous.masternodes.get(pro_tx_hash) {
                None => {
                    comparison.added.insert(*pro_tx_hash);
                }
                Some(old) if old.entry_hash != node.entry_hash => {
                    comparison.changed.insert(*pro_tx_hash);
                    let (was, is) = (
                        old.masternode_list_entry.is_valid,
                        node.masternode_list_entry.is_valid,
                    );
                    if !was && is {
                        comparison.became_valid.insert(*pro_tx_hash);
                    } else if was && !is {
                        comparison.became_invalid.insert(*pro_tx_hash);
                    }
                }
                Some(_) => {}
            }
        }
        comparison.removed = previous
            .masternodes
            .keys()
            .filter(|pro_tx_hash| !self.masternodes.contains_key(*pro_tx_hash))
            .copied()
            .collect();
        comparison
    }
}
