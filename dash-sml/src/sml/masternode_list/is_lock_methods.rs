use std::cmp::Ordering;

use hashes::Hash;

use crate::hash_types::{QuorumOrderingHash, QuorumSigningRequestId};
use crate::sml::llmq_type::LLMQType;
use crate::sml::masternode_list::MasternodeList;
use crate::sml::quorum_entry::qualified_quorum_entry::QualifiedQuorumEntry;

/// Orders ordering hashes as 256-bit little endian numbers.
fn cmp_ordering_hashes(lhs: &QuorumOrderingHash, rhs: &QuorumOrderingHash) -> Ordering {
    lhs.as_byte_array().iter().rev().cmp(rhs.as_byte_array().iter().rev())
}

impl MasternodeList {
    /// Quorums of `llmq_type` ranked for signing `request_id`, the responsible one first.
    pub fn quorum_entries_ranked_for_request_id(
        &self,
        request_id: &QuorumSigningRequestId,
        llmq_type: LLMQType,
    ) -> Vec<&QualifiedQuorumEntry> {
        let mut ranked: Vec<_> = self
            .quorums_of_type(llmq_type)
            .map(|entry| (entry.ordering_hash_for_request_id(request_id), entry))
            .collect();
        ranked.sort_by(|(lhs, _), (rhs, _)| cmp_ordering_hashes(lhs, rhs));
        ranked.into_iter().map(|(_, entry)| entry).collect()
    }

    /// The quorum responsible for a chain lock or instant send lock request id.
    pub fn quorum_entry_for_lock_request_id(
        &self,
        request_id: &QuorumSigningRequestId,
        llmq_type: LLMQType,
    ) -> Option<&QualifiedQuorumEntry> {
        self.quorums_of_type(llmq_type).min_by(|lhs, rhs| {
            cmp_ordering_hashes(
                &lhs.ordering_hash_for_request_id(request_id),
                &rhs.ordering_hash_for_request_id(request_id),
            )
        })
    }
}
