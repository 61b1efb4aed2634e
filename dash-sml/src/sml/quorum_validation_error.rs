use thiserror::Error;

use crate::BlockHash;
use crate::prelude::CoreBlockHeight;

/// Why a quorum commitment could not be validated.
///
/// The `Required*` variants are soft: the data needed to validate the quorum is
/// missing, not wrong. Every other variant is a hard failure of that quorum.
#[derive(Debug, Error, Clone, Ord, PartialOrd, PartialEq, Hash, Eq)]
pub enum QuorumValidationError {
    #[error("Required block not present: {0}")]
    RequiredBlockNotPresent(BlockHash),

    #[error("Required block height not present: {0}")]
    RequiredBlockHeightNotPresent(CoreBlockHeight),

    #[error("Required masternode list not present at block height {0}, block hash: {1}")]
    RequiredMasternodeListNotPresent(CoreBlockHeight, BlockHash),

    #[error("Required quorum snapshot not present for block hash: {0}")]
    RequiredSnapshotNotPresent(BlockHash),

    #[error("Cycle at {0} reaches back before the genesis block")]
    CycleBeforeGenesis(CoreBlockHeight),

    #[error("Commitment hash does not match the commitment content")]
    CommitmentHashMismatch,

    #[error("Invalid bitset lengths: expected {expected}, signers {signers_len}, valid members {valid_members_len}")]
    InvalidBitsetLength { expected: usize, signers_len: usize, valid_members_len: usize },

    #[error("Insufficient signers: required {required}, found {found}")]
    InsufficientSigners { required: u64, found: u64 },

    #[error("Insufficient valid members: required {required}, found {found}")]
    InsufficientValidMembers { required: u64, found: u64 },

    #[error("Quorum has no members to verify against")]
    NoQuorumMembers,

    #[error("Bit {index} is set but the quorum only has {members} members")]
    BitSetBeyondMembers { index: usize, members: usize },

    #[error("Invalid BLS public key: {0}")]
    InvalidBLSPublicKey(String),

    #[error("Invalid BLS signature: {0}")]
    InvalidBLSSignature(String),

    #[error("All commitment aggregated signature not valid: {0}")]
    AllCommitmentAggregatedSignatureNotValid(String),

    #[error("Threshold signature not valid: {0}")]
    ThresholdSignatureNotValid(String),
}

impl QuorumValidationError {
    /// True when validation failed for lack of data rather than bad data.
    pub fn is_missing_dependency(&self) -> bool {
        matches!(
            self,
            QuorumValidationError::RequiredBlockNotPresent(_)
                | QuorumValidationError::RequiredBlockHeightNotPresent(_)
                | QuorumValidationError::RequiredMasternodeListNotPresent(..)
                | QuorumValidationError::RequiredSnapshotNotPresent(_)
        )
    }

    /// The block whose masternode list (or header) would resolve this error, if known.
    pub fn missing_block_hash(&self) -> Option<BlockHash> {
        match self {
            QuorumValidationError::RequiredBlockNotPresent(hash)
            | QuorumValidationError::RequiredMasternodeListNotPresent(_, hash)
            | QuorumValidationError::RequiredSnapshotNotPresent(hash) => Some(*hash),
            _ => None,
        }
    }

    /// The height with no header that kept the quorum from being validated.
    ///
    /// No masternode list can resolve it: the header chain must grow first.
    pub fn missing_height(&self) -> Option<CoreBlockHeight> {
        match self {
            QuorumValidationError::RequiredBlockHeightNotPresent(height) => Some(*height),
            _ => None,
        }
    }
}
