use std::collections::BTreeSet;

use crate::QuorumHash;
use crate::sml::llmq_type::LLMQType;
use crate::sml::masternode_list::MasternodeList;
use crate::sml::quorum_entry::qualified_quorum_entry::QualifiedQuorumEntry;

impl MasternodeList {
    pub fn quorums_of_type(&self, llmq_type: LLMQType) -> impl Iterator<Item = &QualifiedQuorumEntry> {
        self.quorums.get(&llmq_type).into_iter().flat_map(|by_hash| by_hash.values())
    }

    pub fn all_quorums(&self) -> impl Iterator<Item = &QualifiedQuorumEntry> {
        self.quorums.values().flat_map(|by_hash| by_hash.values())
    }

    pub fn quorum_hashes(&self, exclude_quorum_types: &[LLMQType]) -> BTreeSet<QuorumHash> {
        self.quorums
            .iter()
            .filter(|(llmq_type, _)| !exclude_quorum_types.contains(llmq_type))
            .flat_map(|(_, quorums)| quorums.keys().copied())
            .collect()
    }

    pub fn quorum_entry_of_type_for_quorum_hash(
        &self,
        llmq_type: LLMQType,
        quorum_hash: &QuorumHash,
    ) -> Option<&QualifiedQuorumEntry> {
        self.quorums.get(&llmq_type)?.get(quorum_hash)
    }

    /// The platform quorum with the given hash, looked up by platform code paths.
    pub fn quorum_entry_for_platform_with_quorum_hash(
        &self,
        quorum_hash: &QuorumHash,
        llmq_type: LLMQType,
    ) -> Option<&QualifiedQuorumEntry> {
        self.quorum_entry_of_type_for_quorum_hash(llmq_type, quorum_hash)
    }

    pub fn quorums_count(&self) -> usize {
        self.quorums.values().map(|by_hash| by_hash.len()).sum()
    }

    pub fn valid_quorums_count(&self) -> usize {
        self.all_quorums().filter(|quorum| quorum.is_verified()).count()
    }

    pub fn has_unverified_rotated_quorums(&self) -> bool {
        self.quorums
            .iter()
            .filter(|(llmq_type, _)| llmq_type.is_rotating_quorum_type())
            .any(|(_, by_hash)| by_hash.values().any(|quorum| !quorum.is_verified()))
    }

    pub fn has_unverified_non_rotated_quorums(&self) -> bool {
        self.quorums
            .iter()
            .filter(|(llmq_type, _)| !llmq_type.is_rotating_quorum_type())
            .any(|(_, by_hash)| by_hash.values().any(|quorum| !quorum.is_verified()))
    }
}
