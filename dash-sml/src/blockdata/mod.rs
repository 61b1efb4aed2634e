//! Block data.
//!
//! The transaction types a masternode list diff carries.

pub mod transaction;
