use hashes::Hash;

use crate::VarInt;
use crate::consensus::Encodable;
use crate::hash_types::{QuorumOrderingHash, QuorumSigningRequestId, sha256d_bytes};
use crate::sml::quorum_entry::qualified_quorum_entry::QualifiedQuorumEntry;

impl QualifiedQuorumEntry {
    /// `sha256d(llmq_type || quorum_hash || request_id)`, the llmq type as a var int.
    ///
    /// The quorum with the lowest ordering hash signs for a request id.
    pub fn ordering_hash_for_request_id(
        &self,
        request_id: &QuorumSigningRequestId,
    ) -> QuorumOrderingHash {
        let llmq_type = VarInt(self.quorum_entry.llmq_type.index() as u64);
        let mut writer = Vec::with_capacity(llmq_type.len() + 64);
        llmq_type.consensus_encode(&mut writer).expect("encoders don't error");
        writer.extend_from_slice(self.quorum_entry.quorum_hash.as_byte_array());
        writer.extend_from_slice(request_id.as_byte_array());
        QuorumOrderingHash::from_byte_array(sha256d_bytes(&writer))
    }
}
