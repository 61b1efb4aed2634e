use crate::hash_types::{QuorumCommitmentHash, QuorumEntryHash};
use crate::sml::llmq_entry_verification::{
    LLMQEntryVerificationSkipStatus, LLMQEntryVerificationStatus,
};
use crate::sml::quorum_validation_error::QuorumValidationError;
use crate::transaction::special_transaction::quorum_commitment::QuorumEntry;

/// A quorum commitment with its derived hashes and verification state.
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Debug, Hash)]
pub struct QualifiedQuorumEntry {
    pub quorum_entry: QuorumEntry,
    pub verified: LLMQEntryVerificationStatus,
    /// Commitment hash computed when the entry was qualified.
    ///
    /// The wire carries no commitment hash, so a decoded entry always agrees with it.
    /// Signatures are checked over this value: an entry whose content changed after
    /// qualification no longer matches and fails validation.
    pub commitment_hash: QuorumCommitmentHash,
    pub entry_hash: QuorumEntryHash,
}

impl From<QuorumEntry> for QualifiedQuorumEntry {
    fn from(value: QuorumEntry) -> Self {
        let commitment_hash = value.calculate_commitment_hash();
        let entry_hash = value.calculate_entry_hash();
        QualifiedQuorumEntry {
            quorum_entry: value,
            verified: LLMQEntryVerificationStatus::Skipped(
                LLMQEntryVerificationSkipStatus::NotMarkedForVerification,
            ),
            commitment_hash,
            entry_hash,
        }
    }
}

impl QualifiedQuorumEntry {
    pub fn is_verified(&self) -> bool {
        self.verified.is_verified()
    }

    /// Records the outcome of a validation attempt.
    ///
    /// Missing data leaves the quorum skipped, anything else marks it invalid.
    pub fn update_quorum_status(&mut self, result: Result<(), QuorumValidationError>) {
        self.verified = match result {
            Ok(()) => LLMQEntryVerificationStatus::Verified,
            Err(QuorumValidationError::RequiredBlockNotPresent(block_hash)) => {
                LLMQEntryVerificationStatus::Skipped(LLMQEntryVerificationSkipStatus::UnknownBlock(
                    block_hash,
                ))
            }
            Err(QuorumValidationError::RequiredMasternodeListNotPresent(height, block_hash)) => {
                LLMQEntryVerificationStatus::Skipped(LLMQEntryVerificationSkipStatus::MissedList(
                    height, block_hash,
                ))
            }
            Err(QuorumValidationError::RequiredSnapshotNotPresent(block_hash)) => {
                LLMQEntryVerificationStatus::Skipped(
                    LLMQEntryVerificationSkipStatus::MissedSnapshot(block_hash),
                )
            }
            Err(QuorumValidationError::RequiredBlockHeightNotPresent(height)) => {
                LLMQEntryVerificationStatus::Skipped(LLMQEntryVerificationSkipStatus::OtherContext(
                    format!("height {height} is not known"),
                ))
            }
            Err(e) => LLMQEntryVerificationStatus::Invalid(e),
        };
    }
}
