use blsful::{Bls12381G2Impl, SecretKey};
use hashes::Hash;

use crate::BlockHash;
use crate::bls_sig_utils::BLSSignature;
use crate::hash_types::{QuorumHash, QuorumVVecHash, sha256d_bytes};
use crate::sml::llmq_type::LLMQType;
use crate::sml::masternode_list::MasternodeList;
use crate::sml::masternode_list_entry::MasternodeListEntry;
use crate::sml::quorum_entry::quorum_modifier_type::LLMQModifierType;
use crate::test_utils::TestMasternode;
use crate::transaction::special_transaction::quorum_commitment::QuorumEntry;

/// A commitment signed by its members and by the quorum key.
#[derive(Clone, Debug)]
pub struct TestQuorum {
    pub commitment: QuorumEntry,
    pub members: Vec<TestMasternode>,
}

impl TestQuorum {
    /// A fully signed `llmq_test` commitment over `member_count` masternodes derived
    /// from `seed`, whose quorum hash is `seed`.
    pub fn non_rotating_for_test(seed: [u8; 32], member_count: u32) -> Self {
        let members: Vec<_> =
            (0..member_count).map(|i| TestMasternode::new(seed[0] as u32 * 1000 + i)).collect();
        Self::signed(LLMQType::LlmqtypeTest, QuorumHash::from_byte_array(seed), None, &members)
    }

    /// A non rotating commitment signed by the members `list` selects for it.
    ///
    /// `list` is the list at the work block and must carry no chain lock signature.
    pub fn for_list(llmq_type: LLMQType, quorum_hash: QuorumHash, list: &MasternodeList) -> Self {
        let modifier = LLMQModifierType::PreCoreV20(llmq_type, BlockHash::from(quorum_hash));
        let members: Vec<_> = list
            .valid_masternodes_for_quorum(llmq_type, modifier)
            .iter()
            .map(TestMasternode::from_entry)
            .collect();
        Self::signed(llmq_type, quorum_hash, None, &members)
    }

    /// A commitment where every one of `members` signed and is valid.
    pub fn signed(
        llmq_type: LLMQType,
        quorum_hash: QuorumHash,
        quorum_index: Option<i16>,
        members: &[TestMasternode],
    ) -> Self {
        let size = llmq_type.size() as usize;
        let members: Vec<_> = members.iter().take(size).copied().collect();
        let bits: Vec<bool> = (0..size).map(|i| i < members.len()).collect();
        let quorum_key = quorum_secret_key(&quorum_hash);
        let mut commitment = QuorumEntry {
            version: if quorum_index.is_some() { 4 } else { 3 },
            llmq_type,
            quorum_hash,
            quorum_index,
            signers: bits.clone(),
            valid_members: bits,
            quorum_public_key: super::public_key(&quorum_key),
            quorum_vvec_hash: QuorumVVecHash::from_byte_array(sha256d_bytes(
                quorum_hash.as_byte_array(),
            )),
            threshold_sig: BLSSignature::from([0; 96]),
            all_commitment_aggregated_signature: BLSSignature::from([0; 96]),
        };
        let commitment_hash = commitment.calculate_commitment_hash();
        let message = commitment_hash.to_byte_array();
        commitment.threshold_sig = super::sign(&quorum_key, &message);
        let signatures: Vec<_> = members.iter().map(|member| member.sign(&message)).collect();
        commitment.all_commitment_aggregated_signature =
            BLSSignature::aggregate(signatures.iter()).expect("fixture signatures are valid points");
        TestQuorum {
            commitment,
            members,
        }
    }

    pub fn member_entries(&self) -> Vec<MasternodeListEntry> {
        self.members.iter().map(TestMasternode::entry).collect()
    }

    /// Signs `digest` with the quorum key.
    pub fn sign(&self, digest: &[u8; 32]) -> BLSSignature {
        super::sign(&quorum_secret_key(&self.commitment.quorum_hash), digest)
    }
}

fn quorum_secret_key(quorum_hash: &QuorumHash) -> SecretKey<Bls12381G2Impl> {
    let mut seed = b"quorum".to_vec();
    seed.extend_from_slice(quorum_hash.as_byte_array());
    super::secret_key(&seed)
}
