use std::collections::{BTreeMap, BTreeSet};
use std::sync::{Arc, Mutex};

use dash_sml::sml::masternode_list::MasternodeList;
use dash_sml::sml::masternode_list_entry::qualified_masternode_list_entry::QualifiedMasternodeListEntry;
use dash_sml::sml::quorum_entry::qualified_quorum_entry::QualifiedQuorumEntry;
use dash_sml::{BlockHash, ProTxHash, QuorumHash};

use crate::sync::MasternodeListListener;

/// Records what it is told, in order.
#[derive(Debug, Default)]
pub struct RecordingListener {
    /// Block hash and added, modified and removed counts of every committed list.
    pub committed: Mutex<Vec<(BlockHash, usize, usize, usize)>>,
    pub verified_quorums: Mutex<Vec<QuorumHash>>,
}

impl RecordingListener {
    pub fn committed_blocks(&self) -> Vec<BlockHash> {
        self.committed.lock().unwrap().iter().map(|(block_hash, ..)| *block_hash).collect()
    }
}

impl MasternodeListListener for RecordingListener {
    fn on_masternode_list_committed(
        &self,
        list: &Arc<MasternodeList>,
        added: &BTreeMap<ProTxHash, QualifiedMasternodeListEntry>,
        modified: &BTreeMap<ProTxHash, QualifiedMasternodeListEntry>,
        removed: &BTreeSet<ProTxHash>,
    ) {
        self.committed.lock().unwrap().push((
            list.block_hash,
            added.len(),
            modified.len(),
            removed.len(),
        ));
    }

    fn on_quorum_verified(&self, quorum: &QualifiedQuorumEntry) {
        self.verified_quorums.lock().unwrap().push(quorum.quorum_entry.quorum_hash);
    }
}
