use crate::network::constants::Network;
use crate::sml::llmq_type::LLMQType;

/// Which quorum type signs what on a given chain.
pub trait NetworkLLMQExt {
    fn is_llmq_type(&self) -> LLMQType;
    fn isd_llmq_type(&self) -> LLMQType;
    fn chain_locks_type(&self) -> LLMQType;
    fn platform_type(&self) -> LLMQType;
    /// Quorum types a masternode list of this chain may carry.
    fn enabled_llmq_types(&self) -> Vec<LLMQType>;
}

impl NetworkLLMQExt for Network {
    fn is_llmq_type(&self) -> LLMQType {
        match self {
            Network::Dash => LLMQType::Llmqtype50_60,
            Network::Testnet => LLMQType::Llmqtype50_60,
            Network::Devnet => LLMQType::LlmqtypeDevnet,
            Network::Regtest => LLMQType::LlmqtypeTestInstantSend,
        }
    }

    fn isd_llmq_type(&self) -> LLMQType {
        match self {
            Network::Dash => LLMQType::Llmqtype60_75,
            Network::Testnet => LLMQType::Llmqtype60_75,
            Network::Devnet => LLMQType::LlmqtypeDevnetDIP0024,
            Network::Regtest => LLMQType::LlmqtypeTestDIP0024,
        }
    }

    fn chain_locks_type(&self) -> LLMQType {
        match self {
            Network::Dash => LLMQType::Llmqtype400_60,
            Network::Testnet => LLMQType::Llmqtype50_60,
            Network::Devnet => LLMQType::LlmqtypeDevnet,
            Network::Regtest => LLMQType::LlmqtypeTest,
        }
    }

    fn platform_type(&self) -> LLMQType {
        match self {
            Network::Dash => LLMQType::Llmqtype100_67,
            Network::Testnet => LLMQType::Llmqtype25_67,
            Network::Devnet => LLMQType::LlmqtypeDevnetPlatform,
            Network::Regtest => LLMQType::LlmqtypeTestnetPlatform,
        }
    }

    fn enabled_llmq_types(&self) -> Vec<LLMQType> {
        match self {
            Network::Dash => vec![
                LLMQType::Llmqtype50_60,
                LLMQType::Llmqtype60_75,
                LLMQType::Llmqtype400_60,
                LLMQType::Llmqtype400_85,
                LLMQType::Llmqtype100_67,
            ],
            Network::Testnet => vec![
                LLMQType::Llmqtype50_60,
                LLMQType::Llmqtype60_75,
                LLMQType::Llmqtype400_60,
                LLMQType::Llmqtype400_85,
                LLMQType::Llmqtype25_67,
            ],
            Network::Devnet => vec![
                LLMQType::LlmqtypeDevnet,
                LLMQType::LlmqtypeDevnetDIP0024,
                LLMQType::LlmqtypeDevnetPlatform,
            ],
            Network::Regtest => vec![
                LLMQType::LlmqtypeTest,
                LLMQType::LlmqtypeTestV17,
                LLMQType::LlmqtypeTestDIP0024,
                LLMQType::LlmqtypeTestInstantSend,
                LLMQType::LlmqtypeTestnetPlatform,
            ],
        }
    }
}
