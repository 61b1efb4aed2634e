// Rust Dash Library
// Originally written in 2014 by
//     Andrew Poelstra <apoelstra@wpsoftware.net>
//     For Dash
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

//! Dash network constants.
//!
//! The chain a masternode list belongs to decides which LLMQ types sign
//! InstantSend, ChainLocks and platform messages, and from which height the
//! v20 quorum modifier applies.

use std::fmt;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// The cryptocurrency network to act on.
#[derive(Copy, PartialEq, Eq, PartialOrd, Ord, Clone, Hash, Debug)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum Network {
    /// Classic Dash Core Payment Chain
    Dash,
    /// Dash's testnet network.
    Testnet,
    /// Dash's devnet network.
    Devnet,
    /// Local regression test network.
    Regtest,
}

impl Network {
    /// Creates a `Network` from the magic bytes.
    pub fn from_magic(magic: u32) -> Option<Network> {
        match magic {
            0xBD6B0CBF => Some(Network::Dash),
            0xFFCAE2CE => Some(Network::Testnet),
            0xCEFFCAE2 => Some(Network::Devnet),
            0xDCB7C1FC => Some(Network::Regtest),
            _ => None,
        }
    }

    /// Return the network magic bytes, which should be encoded little-endian
    /// at the start of every message
    pub fn magic(self) -> u32 {
        match self {
            Network::Dash => 0xBD6B0CBF,
            Network::Testnet => 0xFFCAE2CE,
            Network::Devnet => 0xCEFFCAE2,
            Network::Regtest => 0xDCB7C1FC,
        }
    }

    /// The known activation height of core v20
    pub fn core_v20_activation_height(&self) -> u32 {
        match self {
            Network::Dash => 1987776,
            Network::Testnet => 905100,
            Network::Devnet => 1,
            Network::Regtest => 1,
        }
    }

    /// Helper method to know if core v20 was active
    pub fn core_v20_is_active_at(&self, core_block_height: u32) -> bool {
        core_block_height >= self.core_v20_activation_height()
    }
}

impl fmt::Display for Network {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Network::Dash => write!(f, "dash"),
            Network::Testnet => write!(f, "testnet"),
            Network::Devnet => write!(f, "devnet"),
            Network::Regtest => write!(f, "regtest"),
        }
    }
}

impl std::str::FromStr for Network {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "dash" | "mainnet" => Ok(Network::Dash),
            "testnet" | "test" => Ok(Network::Testnet),
            "devnet" | "dev" => Ok(Network::Devnet),
            "regtest" => Ok(Network::Regtest),
            _ => Err(format!("Unknown network type: {}", s)),
        }
    }
}
