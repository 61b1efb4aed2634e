use hashes::Hash;

use crate::BlockHash;

impl BlockHash {
    /// Create a deterministic test block hash from a u32 identifier
    ///
    /// The last byte is set so that no dummy hash is the all zero genesis marker.
    pub fn dummy(id: u32) -> Self {
        let mut bytes = [0u8; 32];
        bytes[..4].copy_from_slice(&id.to_le_bytes());
        bytes[31] = 0xdd;
        BlockHash::from_byte_array(bytes)
    }
}
