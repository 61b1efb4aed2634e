use std::cmp::Ordering;

use crate::hash_types::{QuorumModifierHash, ScoreHash};
use crate::sml::llmq_type::LLMQType;
use crate::sml::masternode_list::MasternodeList;
use crate::sml::masternode_list_entry::MasternodeListEntry;
use crate::sml::masternode_list_entry::qualified_masternode_list_entry::QualifiedMasternodeListEntry;
use crate::sml::quorum_entry::quorum_modifier_type::LLMQModifierType;

/// Scores `entries` with `modifier` and sorts them best first.
///
/// Entries without a score (invalid or unconfirmed) are dropped. Ties, which need a
/// sha256 collision, fall back to the registration hash.
pub(crate) fn sorted_by_score<'a, I>(
    entries: I,
    modifier: &QuorumModifierHash,
) -> Vec<(ScoreHash, &'a QualifiedMasternodeListEntry)>
where
    I: IntoIterator<Item = &'a QualifiedMasternodeListEntry>,
{
    let mut scored: Vec<_> = entries
        .into_iter()
        .filter_map(|entry| entry.score(modifier).map(|score| (score, entry)))
        .collect();
    scored.sort_by(|(score_a, a), (score_b, b)| match score_b.cmp_as_uint256(score_a) {
        Ordering::Equal => a
            .masternode_list_entry
            .pro_reg_tx_hash
            .cmp(&b.masternode_list_entry.pro_reg_tx_hash),
        ordering => ordering,
    });
    scored
}

impl MasternodeList {
    /// Every scorable masternode of the list, highest score first.
    pub fn scores_for_quorum(
        &self,
        quorum_modifier: &QuorumModifierHash,
    ) -> Vec<(ScoreHash, &QualifiedMasternodeListEntry)> {
        sorted_by_score(self.masternodes.values(), quorum_modifier)
    }

    /// The ordered members of a non rotating quorum: the `size` best scored masternodes.
    pub fn valid_masternodes_for_quorum(
        &self,
        llmq_type: LLMQType,
        quorum_modifier: LLMQModifierType,
    ) -> Vec<MasternodeListEntry> {
        let modifier = quorum_modifier.build_llmq_hash();
        self.scores_for_quorum(&modifier)
            .into_iter()
            .take(llmq_type.size() as usize)
            .map(|(_, entry)| entry.masternode_list_entry)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use hashes::Hash;

    use super::*;
    use crate::BlockHash;
    use crate::test_utils::TestMasternode;

    #[test]
    fn members_are_the_best_scored_valid_nodes() {
        let mut entries: Vec<_> = (0..8).map(|i| TestMasternode::new(i).entry()).collect();
        entries[0].is_valid = false;
        let masternodes =
            entries.iter().map(|entry| (entry.pro_reg_tx_hash, (*entry).into())).collect();
        let list = MasternodeList::build(masternodes, BTreeMap::new(), BlockHash::all_zeros(), 0).build();

        let modifier = LLMQModifierType::PreCoreV20(LLMQType::LlmqtypeTest, BlockHash::from_byte_array([3; 32]));
        let scores = list.scores_for_quorum(&modifier.build_llmq_hash());
        assert_eq!(scores.len(), 7);
        for pair in scores.windows(2) {
            assert_eq!(pair[0].0.cmp_as_uint256(&pair[1].0), Ordering::Greater);
        }

        let members = list.valid_masternodes_for_quorum(LLMQType::LlmqtypeTest, modifier);
        assert_eq!(members.len(), LLMQType::LlmqtypeTest.size() as usize);
        assert!(members.iter().all(|member| member.is_valid));
        let expected: Vec<_> = scores.iter().take(members.len()).map(|(_, e)| e.masternode_list_entry).collect();
        assert_eq!(members, expected);
    }
}
