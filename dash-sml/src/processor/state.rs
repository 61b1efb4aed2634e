use std::collections::BTreeSet;
use std::fmt;

use crate::processor::error::ProcessingError;
use crate::sml::llmq_type::LLMQType;
use crate::sml::quorum_validation_error::QuorumValidationError;
use crate::{BlockHash, QuorumHash};

/// Where a message stands in its processing.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ProcessingState {
    Decoding,
    /// Coinbase inclusion and both list roots matched.
    RootsChecked,
    /// Every added quorum that could be checked was checked.
    QuorumsChecked,
    /// The lists were handed to the store.
    Committed,
    Rejected(RejectReason),
    /// Lists at these blocks are needed before the message can be finished.
    Pending(BTreeSet<BlockHash>),
}

impl ProcessingState {
    /// Terminal states accept no further transition.
    pub fn is_terminal(&self) -> bool {
        matches!(self, ProcessingState::Committed | ProcessingState::Rejected(_))
    }

    /// True once the message was verified and can be committed.
    pub fn is_ready_to_commit(&self) -> bool {
        matches!(self, ProcessingState::QuorumsChecked)
    }

    pub fn missing_block_hashes(&self) -> Option<&BTreeSet<BlockHash>> {
        match self {
            ProcessingState::Pending(missing) => Some(missing),
            _ => None,
        }
    }

    fn name(&self) -> &'static str {
        match self {
            ProcessingState::Decoding => "Decoding",
            ProcessingState::RootsChecked => "RootsChecked",
            ProcessingState::QuorumsChecked => "QuorumsChecked",
            ProcessingState::Committed => "Committed",
            ProcessingState::Rejected(_) => "Rejected",
            ProcessingState::Pending(_) => "Pending",
        }
    }

    /// Moves to `next` if the machine allows it.
    ///
    /// A message is rejected from any live state. It waits for missing lists either
    /// before its roots are checked (the base list is unknown) or once its quorums
    /// were checked.
    pub fn transition(&mut self, next: ProcessingState) -> Result<(), ProcessingError> {
        let allowed = match (&*self, &next) {
            (ProcessingState::Decoding, ProcessingState::RootsChecked)
            | (ProcessingState::Decoding, ProcessingState::Pending(_))
            | (ProcessingState::RootsChecked, ProcessingState::QuorumsChecked)
            | (ProcessingState::QuorumsChecked, ProcessingState::Committed)
            | (ProcessingState::QuorumsChecked, ProcessingState::Pending(_)) => true,
            (current, ProcessingState::Rejected(_)) => !current.is_terminal(),
            _ => false,
        };
        if !allowed {
            return Err(ProcessingError::IllegalTransition {
                from: self.name(),
                to: next.name(),
            });
        }
        log::trace!("processing state {} -> {}", self.name(), next.name());
        *self = next;
        Ok(())
    }
}

impl fmt::Display for ProcessingState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProcessingState::Rejected(reason) => write!(f, "Rejected({})", reason),
            ProcessingState::Pending(missing) => write!(f, "Pending({} lists)", missing.len()),
            other => f.write_str(other.name()),
        }
    }
}

/// Why a message was rejected.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RejectReason {
    MalformedMessage(String),
    InvalidRoots(RootFailure),
    InvalidQuorum {
        llmq_type: LLMQType,
        quorum_hash: QuorumHash,
        error: QuorumValidationError,
    },
}

impl fmt::Display for RejectReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RejectReason::MalformedMessage(e) => write!(f, "malformed message: {}", e),
            RejectReason::InvalidRoots(failure) => write!(f, "invalid roots: {}", failure),
            RejectReason::InvalidQuorum {
                llmq_type,
                quorum_hash,
                error,
            } => write!(f, "invalid quorum {} of type {}: {}", quorum_hash, llmq_type, error),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RootFailure {
    MissingCoinbasePayload,
    /// The partial merkle tree does not prove the coinbase under the header's root.
    CoinbaseNotIncluded,
    MasternodeListRootMismatch,
    QuorumListRootMismatch,
}

impl fmt::Display for RootFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            RootFailure::MissingCoinbasePayload => "coinbase has no special payload",
            RootFailure::CoinbaseNotIncluded => "coinbase not included in block",
            RootFailure::MasternodeListRootMismatch => "masternode list root mismatch",
            RootFailure::QuorumListRootMismatch => "quorum list root mismatch",
        })
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;
    use hashes::Hash;

    use super::*;

    #[test]
    fn happy_path() {
        let mut state = ProcessingState::Decoding;
        state.transition(ProcessingState::RootsChecked).unwrap();
        state.transition(ProcessingState::QuorumsChecked).unwrap();
        assert!(state.is_ready_to_commit());
        state.transition(ProcessingState::Committed).unwrap();
        assert!(state.is_terminal());
    }

    #[test]
    fn no_way_out_of_terminal_states() {
        let mut state = ProcessingState::Rejected(RejectReason::InvalidRoots(
            RootFailure::MasternodeListRootMismatch,
        ));
        assert_matches!(
            state.transition(ProcessingState::RootsChecked),
            Err(ProcessingError::IllegalTransition { from: "Rejected", to: "RootsChecked" })
        );
        assert_matches!(
            state.transition(ProcessingState::Rejected(RejectReason::MalformedMessage(
                "again".to_string()
            ))),
            Err(ProcessingError::IllegalTransition { .. })
        );
    }

    #[test]
    fn steps_cannot_be_skipped() {
        let mut state = ProcessingState::Decoding;
        assert!(state.transition(ProcessingState::QuorumsChecked).is_err());
        assert!(state.transition(ProcessingState::Committed).is_err());
        state.transition(ProcessingState::RootsChecked).unwrap();
        assert!(state.transition(ProcessingState::Pending(BTreeSet::new())).is_err());
    }

    #[test]
    fn pending_lists_missing_blocks() {
        let mut state = ProcessingState::Decoding;
        state.transition(ProcessingState::RootsChecked).unwrap();
        state.transition(ProcessingState::QuorumsChecked).unwrap();
        let missing = BTreeSet::from([BlockHash::from_byte_array([3; 32])]);
        state.transition(ProcessingState::Pending(missing.clone())).unwrap();
        assert_eq!(state.missing_block_hashes(), Some(&missing));
        assert_eq!(state.to_string(), "Pending(1 lists)");
    }
}
