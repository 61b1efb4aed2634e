// Rust Dash Library
// Written for Dash in 2025 by
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

//! # Dash simplified masternode list
//!
//! Wire types, merkle proofs and validation logic needed by a light client to
//! follow the deterministic masternode list and the LLMQ quorums of a Dash chain
//! without running a full node.
//!
//! The crate is organised leaf first:
//!
//! * [`consensus`] and [`network`] decode `mnlistdiff` and `qrinfo` messages,
//! * [`merkle`] checks coinbase inclusion and sparse Merkle proofs,
//! * [`sml`] holds the masternode list model, root computation and quorum validation,
//! * [`processor`] drives a message through decoding, root checks and quorum checks.
//!
//! Nothing in here performs I/O or spawns tasks; the async orchestration lives in
//! the `dash-mnsync` crate.

#![cfg_attr(docsrs, feature(doc_cfg))]
#![deny(unsafe_code)]

/// Re-export of the hashes crate.
pub extern crate hashes;

#[macro_use]
mod internal_macros;

pub mod blockdata;
pub mod bls_sig_utils;
pub mod consensus;
pub mod hash_types;
pub mod merkle;
pub mod network;
pub mod processor;
pub mod sml;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;

pub use crate::blockdata::transaction::{self, OutPoint, Transaction, TxIn, TxOut};
pub use crate::consensus::encode::VarInt;
pub use crate::hash_types::*;
pub use crate::network::constants::Network;

pub mod prelude {
    /// Height of a block on the core chain.
    pub type CoreBlockHeight = u32;
}
