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

//! Dash special transactions.
//!
//! Special transactions are defined in DIP2. Only the coinbase and quorum
//! commitment payloads are interpreted; the other types are carried as opaque
//! bytes so that a transaction still round-trips and hashes to its txid.

pub mod coinbase;
pub mod quorum_commitment;

use std::fmt;
use std::io;

use crate::consensus::{Encodable, deserialize, encode};
use crate::transaction::special_transaction::coinbase::CoinbasePayload;
use crate::transaction::special_transaction::quorum_commitment::QuorumCommitmentPayload;

/// The transaction type, the upper 16 bits of the 32-bit version field.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(u16)]
pub enum TransactionType {
    Classic = 0,
    ProviderRegistration = 1,
    ProviderUpdateService = 2,
    ProviderUpdateRegistrar = 3,
    ProviderUpdateRevocation = 4,
    Coinbase = 5,
    QuorumCommitment = 6,
    MnhfSignal = 7,
    AssetLock = 8,
    AssetUnlock = 9,
}

impl fmt::Display for TransactionType {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            TransactionType::Classic => write!(f, "Classic"),
            TransactionType::ProviderRegistration => write!(f, "Provider Registration"),
            TransactionType::ProviderUpdateService => write!(f, "Provider Update Service"),
            TransactionType::ProviderUpdateRegistrar => write!(f, "Provider Update Registrar"),
            TransactionType::ProviderUpdateRevocation => write!(f, "Provider Update Revocation"),
            TransactionType::Coinbase => write!(f, "Coinbase"),
            TransactionType::QuorumCommitment => write!(f, "Quorum Commitment"),
            TransactionType::MnhfSignal => write!(f, "Mnhf Signal"),
            TransactionType::AssetLock => write!(f, "Asset Lock"),
            TransactionType::AssetUnlock => write!(f, "Asset Unlock"),
        }
    }
}

impl TryFrom<u16> for TransactionType {
    type Error = encode::Error;

    fn try_from(value: u16) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(TransactionType::Classic),
            1 => Ok(TransactionType::ProviderRegistration),
            2 => Ok(TransactionType::ProviderUpdateService),
            3 => Ok(TransactionType::ProviderUpdateRegistrar),
            4 => Ok(TransactionType::ProviderUpdateRevocation),
            5 => Ok(TransactionType::Coinbase),
            6 => Ok(TransactionType::QuorumCommitment),
            7 => Ok(TransactionType::MnhfSignal),
            8 => Ok(TransactionType::AssetLock),
            9 => Ok(TransactionType::AssetUnlock),
            _ => Err(encode::Error::ParseFailed("unknown special transaction type")),
        }
    }
}

/// The payload of a special transaction.
#[derive(Clone, PartialEq, Eq, Debug, Hash)]
pub enum TransactionPayload {
    CoinbasePayloadType(CoinbasePayload),
    QuorumCommitmentPayloadType(QuorumCommitmentPayload),
    /// A payload this crate does not interpret.
    Opaque(TransactionType, Vec<u8>),
}

impl TransactionPayload {
    pub fn tx_type(&self) -> TransactionType {
        match self {
            TransactionPayload::CoinbasePayloadType(_) => TransactionType::Coinbase,
            TransactionPayload::QuorumCommitmentPayloadType(_) => TransactionType::QuorumCommitment,
            TransactionPayload::Opaque(tx_type, _) => *tx_type,
        }
    }

    /// The size of the payload in bytes.
    pub fn size(&self) -> usize {
        match self {
            TransactionPayload::CoinbasePayloadType(p) => p.size(),
            TransactionPayload::QuorumCommitmentPayloadType(p) => p.size(),
            TransactionPayload::Opaque(_, bytes) => bytes.len(),
        }
    }

    /// Interprets the length-delimited payload bytes of a transaction of `tx_type`.
    pub fn from_bytes(tx_type: TransactionType, bytes: Vec<u8>) -> Result<Self, encode::Error> {
        Ok(match tx_type {
            TransactionType::Coinbase => TransactionPayload::CoinbasePayloadType(deserialize(&bytes)?),
            TransactionType::QuorumCommitment => {
                TransactionPayload::QuorumCommitmentPayloadType(deserialize(&bytes)?)
            }
            other => TransactionPayload::Opaque(other, bytes),
        })
    }

    pub fn to_coinbase_payload(&self) -> Option<&CoinbasePayload> {
        match self {
            TransactionPayload::CoinbasePayloadType(payload) => Some(payload),
            _ => None,
        }
    }
}

impl Encodable for TransactionPayload {
    fn consensus_encode<W: io::Write + ?Sized>(&self, w: &mut W) -> Result<usize, io::Error> {
        match self {
            TransactionPayload::CoinbasePayloadType(p) => p.consensus_encode(w),
            TransactionPayload::QuorumCommitmentPayloadType(p) => p.consensus_encode(w),
            TransactionPayload::Opaque(_, bytes) => {
                w.write_all(bytes)?;
                Ok(bytes.len())
            }
        }
    }
}
