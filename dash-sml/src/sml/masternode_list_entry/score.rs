use crate::hash_types::{QuorumModifierHash, ScoreHash};
use crate::sml::masternode_list_entry::qualified_masternode_list_entry::QualifiedMasternodeListEntry;

impl QualifiedMasternodeListEntry {
    /// Score of this masternode for a quorum modifier.
    ///
    /// Invalid and unconfirmed masternodes have no score and cannot be quorum members.
    pub fn score(&self, modifier: &QuorumModifierHash) -> Option<ScoreHash> {
        if !self.masternode_list_entry.is_valid {
            return None;
        }
        let confirmed = self.confirmed_hash_hashed_with_pro_reg_tx.as_ref()?;
        Some(ScoreHash::create_score(confirmed, modifier))
    }
}
