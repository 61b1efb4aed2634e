use crate::bls_sig_utils::BLSSignature;
use crate::sml::masternode_list_entry::MasternodeListEntry;
use crate::sml::quorum_entry::qualified_quorum_entry::QualifiedQuorumEntry;
use crate::sml::quorum_validation_error::QuorumValidationError;

impl QualifiedQuorumEntry {
    /// Checks that only need the commitment itself: bitset sizes, signer and valid member
    /// counts against the quorum type, and that the commitment hash matches the content.
    pub fn validate_structure(&self) -> Result<(), QuorumValidationError> {
        let entry = &self.quorum_entry;
        let params = entry.llmq_type.params();
        let size = params.size as usize;
        if entry.signers.len() != size || entry.valid_members.len() != size {
            return Err(QuorumValidationError::InvalidBitsetLength {
                expected: size,
                signers_len: entry.signers.len(),
                valid_members_len: entry.valid_members.len(),
            });
        }
        let signers = entry.count_signers() as u64;
        if signers < params.threshold as u64 {
            return Err(QuorumValidationError::InsufficientSigners {
                required: params.threshold as u64,
                found: signers,
            });
        }
        let valid_members = entry.count_valid_members() as u64;
        if valid_members < params.min_size as u64 {
            return Err(QuorumValidationError::InsufficientValidMembers {
                required: params.min_size as u64,
                found: valid_members,
            });
        }
        // signatures are checked over the cached hash, which must still describe the content
        if entry.calculate_commitment_hash() != self.commitment_hash {
            return Err(QuorumValidationError::CommitmentHashMismatch);
        }
        Ok(())
    }

    /// Verifies the aggregate signature of the signers over the commitment hash.
    ///
    /// `members` is the ordered member list of the quorum; the operator key of
    /// member `i` contributes when signer bit `i` is set.
    pub fn verify_aggregated_commitment_signature(
        &self,
        members: &[MasternodeListEntry],
    ) -> Result<(), QuorumValidationError> {
        let signers = &self.quorum_entry.signers;
        let operator_keys = members
            .iter()
            .zip(signers.iter())
            .filter(|(_, signed)| **signed)
            .map(|(member, _)| &member.operator_public_key);
        self.quorum_entry
            .all_commitment_aggregated_signature
            .verify_same_message_aggregate(operator_keys, self.commitment_hash.as_ref())
    }

    /// Verifies the threshold signature of the quorum over the commitment hash.
    pub fn verify_quorum_signature(&self) -> Result<(), QuorumValidationError> {
        self.quorum_entry
            .threshold_sig
            .verify(&self.quorum_entry.quorum_public_key, self.commitment_hash.as_ref())
            .map_err(|e| QuorumValidationError::ThresholdSignatureNotValid(e.to_string()))
    }

    /// Fully validates the commitment against its ordered member list.
    pub fn validate(&self, members: &[MasternodeListEntry]) -> Result<(), QuorumValidationError> {
        self.validate_structure()?;
        if members.is_empty() {
            return Err(QuorumValidationError::NoQuorumMembers);
        }
        // a quorum with fewer members than its size cannot have flags past its last member
        let entry = &self.quorum_entry;
        for index in members.len()..entry.signers.len() {
            if entry.signers[index] || entry.valid_members[index] {
                return Err(QuorumValidationError::BitSetBeyondMembers {
                    index,
                    members: members.len(),
                });
            }
        }
        self.verify_aggregated_commitment_signature(members)?;
        self.verify_quorum_signature()?;
        log::trace!(
            "quorum {} of type {} verified against {} members",
            entry.quorum_hash,
            entry.llmq_type,
            members.len()
        );
        Ok(())
    }

    /// Verifies a signature made by this quorum over a 32 byte digest, such as the
    /// sign hash of a chain lock or an instant send lock.
    pub fn verify_message_digest(
        &self,
        message_digest: [u8; 32],
        signature: &BLSSignature,
    ) -> Result<(), QuorumValidationError> {
        signature
            .verify(&self.quorum_entry.quorum_public_key, &message_digest)
            .map_err(|e| QuorumValidationError::ThresholdSignatureNotValid(e.to_string()))
    }
}
