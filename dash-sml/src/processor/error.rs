use thiserror::Error;

use crate::BlockHash;
use crate::prelude::CoreBlockHeight;

/// Errors of the processor itself, as opposed to verdicts on a message.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ProcessingError {
    #[error("Illegal processing state transition from {from} to {to}")]
    IllegalTransition { from: &'static str, to: &'static str },

    /// The message is about a block the header chain does not know yet.
    #[error("Block {0} is not in the header chain")]
    UnknownBlock(BlockHash),

    /// A quorum of the message needs a block below it that the header chain lacks.
    #[error("No header at height {0}")]
    UnknownHeight(CoreBlockHeight),
}
