//! Quorum commitments held by a masternode list, and their validation.

mod hash;
mod helpers;
pub mod qualified_quorum_entry;
pub mod quorum_modifier_type;
mod validation;
