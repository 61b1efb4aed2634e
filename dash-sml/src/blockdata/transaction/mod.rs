// Rust Dash Library
// Originally written in 2014 by
//     Andrew Poelstra <apoelstra@wpsoftware.net>
//     For Bitcoin
// Updated for Dash in 2022 by
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

//! Dash transactions.
//!
//! Only as much of the transaction format as a masternode list diff needs: the
//! coinbase transaction is decoded so that its txid can be proven against the
//! block merkle root and its special payload can be read.

pub mod special_transaction;

use std::io;

use hashes::Hash;

pub use crate::blockdata::transaction::special_transaction::{TransactionPayload, TransactionType};
use crate::consensus::encode::{read_var_bytes, write_var_bytes};
use crate::consensus::{Decodable, Encodable, encode, serialize};
use crate::hash_types::{Txid, sha256d_bytes};

/// A reference to a transaction output.
#[derive(Copy, Clone, Debug, Eq, Hash, PartialEq, PartialOrd, Ord)]
pub struct OutPoint {
    /// The referenced transaction's txid.
    pub txid: Txid,
    /// The index of the referenced output in its transaction's vout.
    pub vout: u32,
}

impl OutPoint {
    /// Creates a "null" `OutPoint`, the previous output of a coinbase input.
    pub fn null() -> OutPoint {
        OutPoint {
            txid: Txid::all_zeros(),
            vout: u32::MAX,
        }
    }

    pub fn is_null(&self) -> bool {
        *self == OutPoint::null()
    }
}

impl_consensus_encoding!(OutPoint, txid, vout);

/// A transaction input.
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Debug, Hash)]
pub struct TxIn {
    pub previous_output: OutPoint,
    /// Raw script bytes; the coinbase input carries the block height here.
    pub script_sig: Vec<u8>,
    pub sequence: u32,
}

impl Encodable for TxIn {
    fn consensus_encode<W: io::Write + ?Sized>(&self, w: &mut W) -> Result<usize, io::Error> {
        let mut len = self.previous_output.consensus_encode(w)?;
        len += write_var_bytes(w, &self.script_sig)?;
        len += self.sequence.consensus_encode(w)?;
        Ok(len)
    }
}

impl Decodable for TxIn {
    fn consensus_decode<R: io::Read + ?Sized>(r: &mut R) -> Result<Self, encode::Error> {
        Ok(TxIn {
            previous_output: OutPoint::consensus_decode(r)?,
            script_sig: read_var_bytes(r)?,
            sequence: u32::consensus_decode(r)?,
        })
    }
}

/// A transaction output.
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Debug, Hash)]
pub struct TxOut {
    /// Value in duffs.
    pub value: u64,
    pub script_pubkey: Vec<u8>,
}

impl Encodable for TxOut {
    fn consensus_encode<W: io::Write + ?Sized>(&self, w: &mut W) -> Result<usize, io::Error> {
        let mut len = self.value.consensus_encode(w)?;
        len += write_var_bytes(w, &self.script_pubkey)?;
        Ok(len)
    }
}

impl Decodable for TxOut {
    fn consensus_decode<R: io::Read + ?Sized>(r: &mut R) -> Result<Self, encode::Error> {
        Ok(TxOut {
            value: u64::consensus_decode(r)?,
            script_pubkey: read_var_bytes(r)?,
        })
    }
}

/// A Dash transaction.
///
/// Dash transactions use a format with a 2-byte version followed by a 2-byte
/// transaction type. Standard transactions have type 0, while special transactions
/// (masternode registration, quorum commitments, coinbase, etc.) have non-zero
/// types and, from version 3, carry an extra payload.
#[derive(Clone, PartialEq, Eq, Debug, Hash)]
pub struct Transaction {
    pub version: u16,
    /// Block number before which this transaction is valid, or 0 for valid immediately.
    pub lock_time: u32,
    pub input: Vec<TxIn>,
    pub output: Vec<TxOut>,
    pub special_transaction_payload: Option<TransactionPayload>,
}

impl Transaction {
    /// Computes the transaction ID (txid) by double-SHA256 hashing the serialized transaction.
    pub fn txid(&self) -> Txid {
        Txid::from_byte_array(sha256d_bytes(&serialize(self)))
    }

    /// Get the transaction type. If a classical transaction this would be 0.
    /// Otherwise it is gotten by association from the payload type.
    pub fn tx_type(&self) -> TransactionType {
        self.special_transaction_payload
            .as_ref()
            .map(TransactionPayload::tx_type)
            .unwrap_or(TransactionType::Classic)
    }

    /// Is this a coin base transaction?
    pub fn is_coin_base(&self) -> bool {
        self.input.len() == 1 && self.input[0].previous_output.is_null()
    }
}

impl Encodable for Transaction {
    fn consensus_encode<W: io::Write + ?Sized>(&self, w: &mut W) -> Result<usize, io::Error> {
        let mut len = 0;
        len += self.version.consensus_encode(w)?;
        len += (self.tx_type() as u16).consensus_encode(w)?;
        len += self.input.consensus_encode(w)?;
        len += self.output.consensus_encode(w)?;
        len += self.lock_time.consensus_encode(w)?;
        if let Some(payload) = &self.special_transaction_payload {
            let mut buf = Vec::with_capacity(payload.size());
            payload.consensus_encode(&mut buf)?;
            len += write_var_bytes(w, &buf)?;
        }
        Ok(len)
    }
}

impl Decodable for Transaction {
    fn consensus_decode<R: io::Read + ?Sized>(r: &mut R) -> Result<Self, encode::Error> {
        let version = u16::consensus_decode(r)?;
        let tx_type = TransactionType::try_from(u16::consensus_decode(r)?)?;
        let input = Vec::<TxIn>::consensus_decode(r)?;
        let output = Vec::<TxOut>::consensus_decode(r)?;
        let lock_time = u32::consensus_decode(r)?;
        let special_transaction_payload = match (version >= 3, tx_type) {
            (_, TransactionType::Classic) => None,
            (true, tx_type) => Some(TransactionPayload::from_bytes(tx_type, read_var_bytes(r)?)?),
            (false, _) => {
                return Err(encode::Error::ParseFailed(
                    "special transaction type on a pre-v3 transaction",
                ));
            }
        };

        Ok(Transaction {
            version,
            input,
            output,
            lock_time,
            special_transaction_payload,
        })
    }
}
