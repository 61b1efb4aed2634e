//! The simplified masternode list.
//!
//! A [`masternode_list::MasternodeList`] is the set of masternodes and active quorums
//! at one block, as rebuilt from `mnlistdiff` messages. Lists are immutable once built:
//! applying a diff produces a new list. This module also holds the scoring used to pick
//! quorum members and the validation of quorum commitments.

pub mod address;
pub mod error;
pub mod llmq_entry_verification;
pub mod llmq_type;
pub mod masternode_list;
pub mod masternode_list_entry;
pub mod quorum_entry;
pub mod quorum_validation_error;
