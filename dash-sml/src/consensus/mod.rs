//! Consensus.
//!
//! This module defines structures, functions, and traits that are needed to
//! conform to Dash consensus.

pub mod encode;

pub use self::encode::{
    Decodable, Encodable, VarInt, deserialize, deserialize_partial, serialize, serialize_hex,
};
