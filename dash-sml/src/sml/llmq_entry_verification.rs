use core::fmt::{Display, Formatter};

use crate::BlockHash;
use crate::prelude::CoreBlockHeight;
use crate::sml::quorum_validation_error::QuorumValidationError;

#[derive(Clone, Ord, PartialOrd, PartialEq, Eq, Hash, Debug)]
pub enum LLMQEntryVerificationSkipStatus {
    NotMarkedForVerification,
    MissedList(CoreBlockHeight, BlockHash),
    UnknownBlock(BlockHash),
    MissedSnapshot(BlockHash),
    OtherContext(String),
}

impl Display for LLMQEntryVerificationSkipStatus {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            LLMQEntryVerificationSkipStatus::NotMarkedForVerification => {
                write!(f, "NotMarkedForVerification")
            }
            LLMQEntryVerificationSkipStatus::MissedList(block_height, block_hash) => {
                write!(f, "MissedList({}, {})", block_height, block_hash)
            }
            LLMQEntryVerificationSkipStatus::UnknownBlock(block_hash) => {
                write!(f, "UnknownBlock({})", block_hash)
            }
            LLMQEntryVerificationSkipStatus::MissedSnapshot(block_hash) => {
                write!(f, "MissedSnapshot({})", block_hash)
            }
            LLMQEntryVerificationSkipStatus::OtherContext(message) => {
                write!(f, "OtherContext({message})")
            }
        }
    }
}

/// Verification state of a quorum held in a masternode list.
#[derive(Clone, Ord, PartialOrd, PartialEq, Eq, Hash, Debug, Default)]
pub enum LLMQEntryVerificationStatus {
    #[default]
    Unknown,
    Verified,
    Skipped(LLMQEntryVerificationSkipStatus),
    Invalid(QuorumValidationError),
}

impl LLMQEntryVerificationStatus {
    pub fn is_verified(&self) -> bool {
        matches!(self, LLMQEntryVerificationStatus::Verified)
    }

    pub fn is_invalid(&self) -> bool {
        matches!(self, LLMQEntryVerificationStatus::Invalid(_))
    }
}

impl Display for LLMQEntryVerificationStatus {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            LLMQEntryVerificationStatus::Unknown => write!(f, "unknown"),
            LLMQEntryVerificationStatus::Verified => write!(f, "verified"),
            LLMQEntryVerificationStatus::Invalid(error) => write!(f, "Invalid({error})"),
            LLMQEntryVerificationStatus::Skipped(reason) => write!(f, "Skipped({reason})"),
        }
    }
}
