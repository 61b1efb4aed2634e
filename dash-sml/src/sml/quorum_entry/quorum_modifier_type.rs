use std::fmt;

use hashes::Hash;

use crate::BlockHash;
use crate::bls_sig_utils::BLSSignature;
use crate::consensus::Encodable;
use crate::consensus::encode::VarInt;
use crate::hash_types::{QuorumModifierHash, sha256d_bytes};
use crate::prelude::CoreBlockHeight;
use crate::sml::llmq_type::LLMQType;

/// The inputs of the seed used to score masternodes for a quorum.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum LLMQModifierType {
    /// Before v20, or when the work block carries no chain lock: the block hash.
    PreCoreV20(LLMQType, BlockHash),
    /// From v20: the work block height and the chain lock signature in its coinbase.
    CoreV20(LLMQType, CoreBlockHeight, BLSSignature),
}

impl fmt::Display for LLMQModifierType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LLMQModifierType::PreCoreV20(llmq_type, block_hash) => {
                write!(f, "PreCoreV20: Type: {}, BlockHash: {}", llmq_type, block_hash)
            }
            LLMQModifierType::CoreV20(llmq_type, height, signature) => {
                write!(f, "CoreV20: Type: {}, Height: {}, Signature: {}", llmq_type, height, signature)
            }
        }
    }
}

impl LLMQModifierType {
    pub fn build_llmq_hash(&self) -> QuorumModifierHash {
        let mut writer = vec![];
        match self {
            LLMQModifierType::PreCoreV20(llmq_type, block_hash) => {
                VarInt(llmq_type.index() as u64).consensus_encode(&mut writer).expect("encoders don't error");
                block_hash.consensus_encode(&mut writer).expect("encoders don't error");
            }
            LLMQModifierType::CoreV20(llmq_type, block_height, cl_signature) => {
                VarInt(llmq_type.index() as u64).consensus_encode(&mut writer).expect("encoders don't error");
                block_height.consensus_encode(&mut writer).expect("encoders don't error");
                cl_signature.consensus_encode(&mut writer).expect("encoders don't error");
            }
        }
        QuorumModifierHash::from_byte_array(sha256d_bytes(&writer))
    }
}
