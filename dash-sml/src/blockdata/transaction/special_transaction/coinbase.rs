// Rust Dash Library
// Written for Dash in 2022 by
//     The Dash Core Developers
//
// To the extent possible under law, the author(s) have dedicated all
// copyright and related and neighboring rights to this software to
// the public domain worldwide. This software is distributed without
// any warranty.
//
// You should have received a copy of the CC0 Public Domain Dedication
// along with this software.
// If not, see <http://creativecommons.org/publicdomain/zero/1.0/>.
//

//! Dash Coinbase Special Transaction.
//!
//! The coinbase of every block carries the merkle roots of the masternode list
//! and of the quorum list valid at that block. A light client recomputes both
//! roots from the list it built and compares them with this payload. Defined in
//! DIP4 [dip-0004](https://github.com/dashpay/dips/blob/master/dip-0004.md).

use std::io;

use crate::bls_sig_utils::BLSSignature;
use crate::consensus::encode::{read_compact_size, write_compact_size};
use crate::consensus::{Decodable, Encodable, VarInt, encode};
use crate::hash_types::{MerkleRootMasternodeList, MerkleRootQuorums};

/// The chain lock section added to the payload in version 3.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Hash)]
pub struct CoinbaseChainLock {
    /// Blocks between this block and the best chain locked block.
    pub height_diff: u32,
    pub signature: BLSSignature,
    /// Credit pool balance, in duffs.
    pub asset_locked_amount: u64,
}

/// The payload of a coinbase special transaction.
#[derive(Clone, PartialEq, Eq, Debug, Hash)]
pub struct CoinbasePayload {
    pub version: u16,
    pub height: u32,
    pub merkle_root_masternode_list: MerkleRootMasternodeList,
    /// Present from version 2.
    pub merkle_root_quorums: Option<MerkleRootQuorums>,
    /// Present from version 3.
    pub chain_lock: Option<CoinbaseChainLock>,
}

impl CoinbasePayload {
    /// A version 2 payload, the smallest one that commits to quorums.
    pub fn new_v2(
        height: u32,
        merkle_root_masternode_list: MerkleRootMasternodeList,
        merkle_root_quorums: MerkleRootQuorums,
    ) -> Self {
        CoinbasePayload {
            version: 2,
            height,
            merkle_root_masternode_list,
            merkle_root_quorums: Some(merkle_root_quorums),
            chain_lock: None,
        }
    }

    /// Size of the payload in bytes.
    pub fn size(&self) -> usize {
        let mut size = 2 + 4 + 32;
        if self.version >= 2 {
            size += 32;
        }
        if let (true, Some(chain_lock)) = (self.version >= 3, &self.chain_lock) {
            size += VarInt(chain_lock.height_diff as u64).len() + 96 + 8;
        }
        size
    }

    /// Height of the best chain locked block known to the miner, if committed.
    pub fn best_chain_locked_height(&self) -> Option<u32> {
        self.chain_lock.map(|cl| self.height.saturating_sub(cl.height_diff + 1))
    }
}

fn missing_field(field: &'static str) -> io::Error {
    io::Error::new(io::ErrorKind::InvalidInput, format!("coinbase payload is missing {field}"))
}

impl Encodable for CoinbasePayload {
    fn consensus_encode<W: io::Write + ?Sized>(&self, w: &mut W) -> Result<usize, io::Error> {
        let mut len = 0;
        len += self.version.consensus_encode(w)?;
        len += self.height.consensus_encode(w)?;
        len += self.merkle_root_masternode_list.consensus_encode(w)?;
        if self.version >= 2 {
            let root = self.merkle_root_quorums.ok_or_else(|| missing_field("merkle_root_quorums"))?;
            len += root.consensus_encode(w)?;
        }
        if self.version >= 3 {
            let chain_lock = self.chain_lock.ok_or_else(|| missing_field("chain lock data"))?;
            len += write_compact_size(w, chain_lock.height_diff)?;
            len += chain_lock.signature.consensus_encode(w)?;
            len += chain_lock.asset_locked_amount.consensus_encode(w)?;
        }
        Ok(len)
    }
}

impl Decodable for CoinbasePayload {
    fn consensus_decode<R: io::Read + ?Sized>(r: &mut R) -> Result<Self, encode::Error> {
        let version = u16::consensus_decode(r)?;
        let height = u32::consensus_decode(r)?;
        let merkle_root_masternode_list = MerkleRootMasternodeList::consensus_decode(r)?;
        let merkle_root_quorums =
            if version >= 2 { Some(MerkleRootQuorums::consensus_decode(r)?) } else { None };
        let chain_lock = if version >= 3 {
            Some(CoinbaseChainLock {
                height_diff: read_compact_size(r)?,
                signature: BLSSignature::consensus_decode(r)?,
                asset_locked_amount: u64::consensus_decode(r)?,
            })
        } else {
            None
        };
        Ok(CoinbasePayload {
            version,
            height,
            merkle_root_masternode_list,
            merkle_root_quorums,
            chain_lock,
        })
    }
}
