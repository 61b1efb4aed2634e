use hashes::Hash;

use crate::consensus::serialize;
use crate::hash_types::{MnListEntryHash, sha256d_bytes};
use crate::sml::masternode_list_entry::MasternodeListEntry;

impl MasternodeListEntry {
    /// Double sha256 of the serialized entry, the leaf of the masternode list root.
    pub fn calculate_entry_hash(&self) -> MnListEntryHash {
        MnListEntryHash::from_byte_array(sha256d_bytes(&serialize(self)))
    }
}
