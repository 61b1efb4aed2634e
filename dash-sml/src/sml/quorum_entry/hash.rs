use hashes::Hash;

use crate::consensus::encode::write_compact_bitset;
use crate::consensus::{Encodable, serialize};
use crate::hash_types::{QuorumCommitmentHash, QuorumEntryHash, sha256d_bytes};
use crate::transaction::special_transaction::quorum_commitment::QuorumEntry;

impl QuorumEntry {
    /// The message every member signs when committing to the quorum:
    /// `sha256d(llmq_type || quorum_hash || valid_members || quorum_public_key || quorum_vvec_hash)`
    /// with `valid_members` as a compact-size prefixed bitset.
    pub fn calculate_commitment_hash(&self) -> QuorumCommitmentHash {
        let mut writer = Vec::with_capacity(1 + 32 + 9 + self.valid_members.len() / 8 + 1 + 48 + 32);
        self.llmq_type.consensus_encode(&mut writer).expect("encoders don't error");
        self.quorum_hash.consensus_encode(&mut writer).expect("encoders don't error");
        write_compact_bitset(&mut writer, &self.valid_members).expect("encoders don't error");
        self.quorum_public_key.consensus_encode(&mut writer).expect("encoders don't error");
        self.quorum_vvec_hash.consensus_encode(&mut writer).expect("encoders don't error");
        QuorumCommitmentHash::from_byte_array(sha256d_bytes(&writer))
    }

    /// Double sha256 of the serialized commitment, the leaf of the quorum list root.
    pub fn calculate_entry_hash(&self) -> QuorumEntryHash {
        QuorumEntryHash::from_byte_array(sha256d_bytes(&serialize(self)))
    }
}
