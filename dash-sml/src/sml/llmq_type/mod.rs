//! LLMQ types and their parameters.
//!
//! The quorum type byte on the wire selects the size, threshold and DKG cycle
//! of a quorum. Decoding an unknown type byte is an error.

pub mod network;

use std::fmt::{Display, Formatter};
use std::io;

use crate::consensus::{Decodable, Encodable, encode};

/// Consensus parameters of a quorum type.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub struct QuorumParams {
    pub name: &'static str,
    pub size: u32,
    /// Valid members needed for a commitment to be accepted.
    pub min_size: u32,
    pub threshold: u32,
    /// Blocks between two DKG sessions.
    pub dkg_interval: u32,
    /// Quorums of the type signing at any time.
    pub active_quorum_count: u32,
}

const fn quorum_params(
    name: &'static str,
    size: u32,
    min_size: u32,
    threshold: u32,
    dkg_interval: u32,
    active_quorum_count: u32,
) -> QuorumParams {
    QuorumParams {
        name,
        size,
        min_size,
        threshold,
        dkg_interval,
        active_quorum_count,
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, PartialOrd, Hash, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[repr(u8)]
pub enum LLMQType {
    Llmqtype50_60 = 1,
    Llmqtype400_60 = 2,
    Llmqtype400_85 = 3,
    Llmqtype100_67 = 4,
    Llmqtype60_75 = 5,
    Llmqtype25_67 = 6,

    // devnet and regtest only
    LlmqtypeTest = 100,
    LlmqtypeDevnet = 101,
    LlmqtypeTestV17 = 102,
    LlmqtypeTestDIP0024 = 103,
    LlmqtypeTestInstantSend = 104,
    LlmqtypeDevnetDIP0024 = 105,
    LlmqtypeTestnetPlatform = 106,
    LlmqtypeDevnetPlatform = 107,
}

impl Display for LLMQType {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}_{}", self.index(), self.params().name)
    }
}

impl LLMQType {
    pub fn params(&self) -> QuorumParams {
        match self {
            LLMQType::Llmqtype50_60 => quorum_params("llmq_50_60", 50, 40, 30, 24, 24),
            LLMQType::Llmqtype400_60 => quorum_params("llmq_400_60", 400, 300, 240, 288, 4),
            LLMQType::Llmqtype400_85 => quorum_params("llmq_400_85", 400, 350, 340, 576, 4),
            LLMQType::Llmqtype100_67 => quorum_params("llmq_100_67", 100, 80, 67, 24, 24),
            LLMQType::Llmqtype60_75 => quorum_params("llmq_60_75", 60, 50, 45, 288, 32),
            LLMQType::Llmqtype25_67 => quorum_params("llmq_25_67", 25, 22, 17, 24, 24),
            LLMQType::LlmqtypeTest => quorum_params("llmq_test", 4, 2, 2, 24, 2),
            LLMQType::LlmqtypeDevnet => quorum_params("llmq_devnet", 12, 7, 6, 24, 4),
            LLMQType::LlmqtypeTestV17 => quorum_params("llmq_test_v17", 3, 2, 2, 24, 2),
            LLMQType::LlmqtypeTestDIP0024 => quorum_params("llmq_test_dip0024", 4, 3, 2, 24, 2),
            LLMQType::LlmqtypeTestInstantSend => {
                quorum_params("llmq_test_instantsend", 3, 2, 2, 24, 2)
            }
            LLMQType::LlmqtypeDevnetDIP0024 => {
                quorum_params("llmq_devnet_dip0024", 8, 6, 4, 48, 2)
            }
            LLMQType::LlmqtypeTestnetPlatform => {
                quorum_params("llmq_test_platform", 3, 2, 2, 288, 2)
            }
            LLMQType::LlmqtypeDevnetPlatform => quorum_params("llmq_dev_platform", 12, 9, 8, 288, 4),
        }
    }

    pub fn size(&self) -> u32 {
        self.params().size
    }

    pub fn min_size(&self) -> u32 {
        self.params().min_size
    }

    pub fn threshold(&self) -> u32 {
        self.params().threshold
    }

    pub fn active_quorum_count(&self) -> u32 {
        self.params().active_quorum_count
    }

    /// The DKG interval, which is the cycle length of a rotating quorum.
    pub fn cycle_length(&self) -> u32 {
        self.params().dkg_interval
    }

    pub fn index(&self) -> u8 {
        *self as u8
    }

    pub fn is_rotating_quorum_type(&self) -> bool {
        matches!(
            self,
            LLMQType::Llmqtype60_75 | LLMQType::LlmqtypeDevnetDIP0024 | LLMQType::LlmqtypeTestDIP0024
        )
    }

    /// Calculate the cycle base height for a given block height
    pub fn get_cycle_base_height(&self, height: u32) -> u32 {
        let interval = self.cycle_length();
        (height / interval) * interval
    }
}

impl TryFrom<u8> for LLMQType {
    type Error = encode::Error;

    fn try_from(orig: u8) -> Result<Self, Self::Error> {
        match orig {
            1 => Ok(LLMQType::Llmqtype50_60),
            2 => Ok(LLMQType::Llmqtype400_60),
            3 => Ok(LLMQType::Llmqtype400_85),
            4 => Ok(LLMQType::Llmqtype100_67),
            5 => Ok(LLMQType::Llmqtype60_75),
            6 => Ok(LLMQType::Llmqtype25_67),
            100 => Ok(LLMQType::LlmqtypeTest),
            101 => Ok(LLMQType::LlmqtypeDevnet),
            102 => Ok(LLMQType::LlmqtypeTestV17),
            103 => Ok(LLMQType::LlmqtypeTestDIP0024),
            104 => Ok(LLMQType::LlmqtypeTestInstantSend),
            105 => Ok(LLMQType::LlmqtypeDevnetDIP0024),
            106 => Ok(LLMQType::LlmqtypeTestnetPlatform),
            107 => Ok(LLMQType::LlmqtypeDevnetPlatform),
            unknown => Err(encode::Error::UnknownLLMQType(unknown)),
        }
    }
}

impl From<LLMQType> for u8 {
    fn from(value: LLMQType) -> Self {
        value.index()
    }
}

impl Encodable for LLMQType {
    fn consensus_encode<W: io::Write + ?Sized>(&self, w: &mut W) -> Result<usize, io::Error> {
        self.index().consensus_encode(w)
    }
}

impl Decodable for LLMQType {
    fn consensus_decode<R: io::Read + ?Sized>(r: &mut R) -> Result<LLMQType, encode::Error> {
        LLMQType::try_from(u8::consensus_decode(r)?)
    }
}
