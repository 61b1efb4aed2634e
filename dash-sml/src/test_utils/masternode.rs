use std::net::Ipv4Addr;

use blsful::{Bls12381G2Impl, SecretKey};
use hashes::Hash;

use crate::bls_sig_utils::BLSSignature;
use crate::hash_types::{ConfirmedHash, ProTxHash, sha256d_bytes};
use crate::sml::address::ServiceAddress;
use crate::sml::masternode_list_entry::MasternodeListEntry;

/// A valid, confirmed masternode whose operator key is known.
///
/// The id is kept in the first bytes of the voting key id, so the fixture can be
/// found back from any entry it produced.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TestMasternode {
    pub id: u32,
    entry: MasternodeListEntry,
}

impl TestMasternode {
    pub fn new(id: u32) -> Self {
        let mut key_id_voting = [0u8; 20];
        key_id_voting[..4].copy_from_slice(&id.to_le_bytes());
        let entry = MasternodeListEntry {
            pro_reg_tx_hash: ProTxHash::from_byte_array(sha256d_bytes(&seed(b"protx", id))),
            confirmed_hash: ConfirmedHash::from_byte_array(sha256d_bytes(&seed(b"confirmed", id))),
            service_address: ServiceAddress::new(
                Ipv4Addr::new(10, 0, (id >> 8) as u8, id as u8),
                19999,
            ),
            operator_public_key: super::public_key(&operator_key(id)),
            key_id_voting,
            is_valid: true,
        };
        TestMasternode {
            id,
            entry,
        }
    }

    /// The fixture that produced `entry`.
    pub fn from_entry(entry: &MasternodeListEntry) -> Self {
        let mut id = [0u8; 4];
        id.copy_from_slice(&entry.key_id_voting[..4]);
        Self::new(u32::from_le_bytes(id))
    }

    pub fn entry(&self) -> MasternodeListEntry {
        self.entry
    }

    pub fn operator_secret_key(&self) -> SecretKey<Bls12381G2Impl> {
        operator_key(self.id)
    }

    pub fn sign(&self, message: &[u8]) -> BLSSignature {
        super::sign(&self.operator_secret_key(), message)
    }
}

fn seed(domain: &[u8], id: u32) -> Vec<u8> {
    let mut data = domain.to_vec();
    data.extend_from_slice(&id.to_le_bytes());
    data
}

fn operator_key(id: u32) -> SecretKey<Bls12381G2Impl> {
    super::secret_key(&seed(b"operator", id))
}
