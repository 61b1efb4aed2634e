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

//! Dash network support.
//!
//! The P2P messages used to fetch masternode lists (`getmnlistd` / `mnlistdiff`)
//! and quorum rotation info (`getqrinfo` / `qrinfo`).

pub mod constants;
pub mod message;
pub mod message_qrinfo;
pub mod message_sml;
