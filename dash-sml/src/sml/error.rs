use thiserror::Error;

use crate::BlockHash;

/// Errors while building a masternode list from a diff.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SmlError {
    /// The diff does not start from the list it is applied to.
    #[error("Base block hash mismatch: expected {expected}, found {found}")]
    BaseBlockHashMismatch { expected: BlockHash, found: BlockHash },

    /// No list is known at the base block of the diff.
    #[error("Missing start masternode list for base block {0}")]
    MissingStartMasternodeList(BlockHash),

    /// The diff's coinbase has no coinbase special payload.
    #[error("Coinbase transaction of block {0} has no coinbase payload")]
    MissingCoinbasePayload(BlockHash),
}
