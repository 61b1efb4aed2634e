// Rust Dash Library
// Written in 2014 by
//     Andrew Poelstra <apoelstra@wpsoftware.net>
// Updated for Dash in 2025 by
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

//! Network message framing.
//!
//! The masternode list messages wrapped in the usual `magic | command | length |
//! checksum | payload` envelope. Transports hand the payload of a framed message to
//! the processor; this module is only concerned with the envelope.

use std::io::{self, Cursor, Read};

use crate::consensus::encode::{self, check_vec_allocation};
use crate::consensus::{Decodable, Encodable, serialize};
use crate::hash_types::sha256d_bytes;
use crate::network::message_qrinfo::{GetQrInfo, QrInfo};
use crate::network::message_sml::{GetMnListDiff, MnListDiff};

/// Maximum size of a framed message payload.
pub const MAX_MSG_SIZE: usize = 5_000_000;

/// A masternode list protocol message.
#[derive(Clone, PartialEq, Eq, Debug)]
pub enum NetworkMessage {
    /// `getmnlistd`
    GetMnListD(GetMnListDiff),
    /// `mnlistdiff`
    MnListDiff(MnListDiff),
    /// `getqrinfo`
    GetQRInfo(GetQrInfo),
    /// `qrinfo`
    QRInfo(QrInfo),
}

impl NetworkMessage {
    /// Return the message command as a static string reference.
    pub fn cmd(&self) -> &'static str {
        match self {
            NetworkMessage::GetMnListD(_) => "getmnlistd",
            NetworkMessage::MnListDiff(_) => "mnlistdiff",
            NetworkMessage::GetQRInfo(_) => "getqrinfo",
            NetworkMessage::QRInfo(_) => "qrinfo",
        }
    }

    fn payload_bytes(&self) -> Vec<u8> {
        match self {
            NetworkMessage::GetMnListD(dat) => serialize(dat),
            NetworkMessage::MnListDiff(dat) => serialize(dat),
            NetworkMessage::GetQRInfo(dat) => serialize(dat),
            NetworkMessage::QRInfo(dat) => serialize(dat),
        }
    }
}

/// A network message with its envelope.
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct RawNetworkMessage {
    /// Magic bytes of the network the message belongs to.
    pub magic: u32,
    pub payload: NetworkMessage,
}

fn checksum(data: &[u8]) -> [u8; 4] {
    let hash = sha256d_bytes(data);
    [hash[0], hash[1], hash[2], hash[3]]
}

fn encode_command(cmd: &str) -> [u8; 12] {
    let mut raw = [0u8; 12];
    let bytes = cmd.as_bytes();
    raw[..bytes.len()].copy_from_slice(bytes);
    raw
}

impl Encodable for RawNetworkMessage {
    fn consensus_encode<W: io::Write + ?Sized>(&self, w: &mut W) -> Result<usize, io::Error> {
        let payload = self.payload.payload_bytes();
        let mut len = 0;
        len += self.magic.consensus_encode(w)?;
        len += encode_command(self.payload.cmd()).consensus_encode(w)?;
        len += (payload.len() as u32).consensus_encode(w)?;
        len += checksum(&payload).consensus_encode(w)?;
        w.write_all(&payload)?;
        Ok(len + payload.len())
    }
}

impl Decodable for RawNetworkMessage {
    fn consensus_decode<R: io::Read + ?Sized>(r: &mut R) -> Result<Self, encode::Error> {
        let magic = u32::consensus_decode(r)?;
        let raw_cmd: [u8; 12] = Decodable::consensus_decode(r)?;
        let cmd: String = raw_cmd.iter().take_while(|b| **b != 0).map(|b| *b as char).collect();
        let len = u32::consensus_decode(r)?;
        if len as usize > MAX_MSG_SIZE {
            return Err(encode::Error::OversizedVectorAllocation {
                requested: len as usize,
                max: MAX_MSG_SIZE,
            });
        }
        let expected: [u8; 4] = Decodable::consensus_decode(r)?;
        let mut payload = vec![0u8; check_vec_allocation(len as u64, 1)?];
        r.read_exact(&mut payload)?;
        let actual = checksum(&payload);
        if expected != actual {
            log::warn!(
                "Invalid payload checksum for network message '{}' (magic {:#x}): expected {:02x?}, actual {:02x?}",
                cmd,
                magic,
                expected,
                actual
            );
            return Err(encode::Error::ParseFailed("invalid payload checksum"));
        }

        let mut mem_d = Cursor::new(payload);
        let payload = match cmd.as_str() {
            "getmnlistd" => NetworkMessage::GetMnListD(Decodable::consensus_decode(&mut mem_d)?),
            "mnlistdiff" => NetworkMessage::MnListDiff(Decodable::consensus_decode(&mut mem_d)?),
            "getqrinfo" => NetworkMessage::GetQRInfo(Decodable::consensus_decode(&mut mem_d)?),
            "qrinfo" => NetworkMessage::QRInfo(Decodable::consensus_decode(&mut mem_d)?),
            _ => return Err(encode::Error::ParseFailed("unsupported network message command")),
        };
        if (mem_d.position() as usize) != mem_d.get_ref().len() {
            return Err(encode::Error::DataNotConsumed);
        }
        Ok(RawNetworkMessage {
            magic,
            payload,
        })
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;
    use hashes::Hash;

    use super::*;
    use crate::BlockHash;
    use crate::consensus::deserialize;
    use crate::network::constants::Network;

    fn get_mn_list_diff() -> RawNetworkMessage {
        RawNetworkMessage {
            magic: Network::Dash.magic(),
            payload: NetworkMessage::GetMnListD(GetMnListDiff {
                base_block_hash: BlockHash::all_zeros(),
                block_hash: BlockHash::from_byte_array([1; 32]),
            }),
        }
    }

    #[test]
    fn framed_message_round_trip() {
        let message = get_mn_list_diff();
        let bytes = serialize(&message);
        assert_eq!(&bytes[..4], &[0xBF, 0x0C, 0x6B, 0xBD]);
        assert_eq!(&bytes[4..14], b"getmnlistd");
        assert_eq!(bytes.len(), 24 + 64);
        assert_eq!(deserialize::<RawNetworkMessage>(&bytes).unwrap(), message);
    }

    #[test]
    fn corrupted_payload_fails_checksum() {
        let mut bytes = serialize(&get_mn_list_diff());
        let last = bytes.len() - 1;
        bytes[last] ^= 1;
        assert_matches!(deserialize::<RawNetworkMessage>(&bytes), Err(encode::Error::ParseFailed(_)));
    }

    #[test]
    fn oversized_length_is_rejected() {
        let mut bytes = serialize(&get_mn_list_diff());
        bytes[16..20].copy_from_slice(&u32::MAX.to_le_bytes());
        assert_matches!(
            deserialize::<RawNetworkMessage>(&bytes),
            Err(encode::Error::OversizedVectorAllocation { .. })
        );
    }
}
