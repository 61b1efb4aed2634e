//! Masternode list entries.
//!
//! A [`MasternodeListEntry`] is the 151 byte record carried by `mnlistdiff`.
//! [`qualified_masternode_list_entry::QualifiedMasternodeListEntry`] wraps it with the
//! hashes derived from it, computed once when the entry enters a list.

pub mod hash;
pub mod qualified_masternode_list_entry;
pub mod score;

use std::fmt;

use crate::bls_sig_utils::BLSPublicKey;
use crate::hash_types::{ConfirmedHash, ProTxHash};
use crate::internal_macros::impl_consensus_encoding;
use crate::sml::address::ServiceAddress;

/// Serialized size of a masternode list entry.
pub const MASTERNODE_LIST_ENTRY_SIZE: usize = 151;

/// A deterministic masternode as known by the simplified masternode list.
///
/// Identity is the registration transaction hash.
#[derive(Clone, Copy, Ord, PartialOrd, Eq, PartialEq, Hash)]
pub struct MasternodeListEntry {
    pub pro_reg_tx_hash: ProTxHash,
    /// All zeros until the registration is confirmed.
    pub confirmed_hash: ConfirmedHash,
    pub service_address: ServiceAddress,
    pub operator_public_key: BLSPublicKey,
    /// Hash160 of the voting key.
    pub key_id_voting: [u8; 20],
    pub is_valid: bool,
}

impl_consensus_encoding!(
    MasternodeListEntry,
    pro_reg_tx_hash,
    confirmed_hash,
    service_address,
    operator_public_key,
    key_id_voting,
    is_valid
);

impl fmt::Debug for MasternodeListEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MasternodeListEntry")
            .field("pro_reg_tx_hash", &self.pro_reg_tx_hash)
            .field("confirmed_hash", &self.confirmed_hash)
            .field("service_address", &self.service_address.to_string())
            .field("operator_public_key", &self.operator_public_key)
            .field("key_id_voting", &hex::encode(self.key_id_voting))
            .field("is_valid", &self.is_valid)
            .finish()
    }
}
