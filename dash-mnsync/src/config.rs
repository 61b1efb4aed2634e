//! Configuration of masternode list synchronization.

use std::path::{Path, PathBuf};
use std::time::Duration;

use dash_sml::Network;
use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, ConfigResult};
use crate::types::SyncMode;

/// Peers allowed to send invalid lists before the sync gives up on the chain.
pub const MAX_FAULTY_DML_PEERS: usize = 1;

/// Configuration for masternode list synchronization.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MasternodeSyncConfig {
    /// Network the lists belong to.
    pub network: Network,

    /// Messages used to retrieve lists.
    pub mode: SyncMode,

    /// How long to wait for the answer to a single request.
    pub request_timeout: Duration,

    /// How long a whole sync, dependencies included, may take.
    pub sync_timeout: Duration,

    /// Attempts per block hash before it is dropped from the queue.
    pub max_retries: u32,

    /// How many levels of missing lists are fetched before the original request.
    pub max_dependency_depth: usize,

    /// Number of most recent lists kept when pruning.
    pub retention_count: usize,

    /// Peers that may send invalid lists before they are reported.
    pub max_faulty_peers: usize,

    /// Directory for persisted lists. `None` keeps everything in memory.
    pub storage_path: Option<PathBuf>,
}

impl Default for MasternodeSyncConfig {
    fn default() -> Self {
        Self {
            network: Network::Dash,
            mode: SyncMode::Mixed,
            request_timeout: Duration::from_secs(20),
            sync_timeout: Duration::from_secs(180),
            max_retries: 3,
            max_dependency_depth: 4,
            retention_count: 16,
            max_faulty_peers: MAX_FAULTY_DML_PEERS,
            storage_path: None,
        }
    }
}

impl MasternodeSyncConfig {
    /// Create a new configuration for the given network.
    pub fn new(network: Network) -> Self {
        Self {
            network,
            ..Self::default()
        }
    }

    /// Create a configuration for mainnet.
    pub fn mainnet() -> Self {
        Self::new(Network::Dash)
    }

    /// Create a configuration for testnet.
    pub fn testnet() -> Self {
        Self::new(Network::Testnet)
    }

    /// Create a configuration for regtest.
    ///
    /// Regtest blocks come fast, so timeouts are shorter.
    pub fn regtest() -> Self {
        Self {
            request_timeout: Duration::from_secs(5),
            sync_timeout: Duration::from_secs(60),
            ..Self::new(Network::Regtest)
        }
    }

    /// Read a configuration from a JSON file. Missing fields take their defaults.
    pub fn from_json_file(path: impl AsRef<Path>) -> ConfigResult<Self> {
        let content = std::fs::read_to_string(path.as_ref())
            .map_err(|e| ConfigError::Parse(format!("{}: {}", path.as_ref().display(), e)))?;
        Self::from_json_str(&content)
    }

    pub fn from_json_str(content: &str) -> ConfigResult<Self> {
        let config: Self =
            serde_json::from_str(content).map_err(|e| ConfigError::Parse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Set the retrieval mode.
    pub fn with_mode(mut self, mode: SyncMode) -> Self {
        self.mode = mode;
        self
    }

    /// Set the per-request timeout.
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// Set the overall sync timeout.
    pub fn with_sync_timeout(mut self, timeout: Duration) -> Self {
        self.sync_timeout = timeout;
        self
    }

    /// Set the maximum attempts per block hash.
    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    /// Set the maximum dependency depth.
    pub fn with_max_dependency_depth(mut self, depth: usize) -> Self {
        self.max_dependency_depth = depth;
        self
    }

    /// Set how many recent lists survive pruning.
    pub fn with_retention_count(mut self, count: usize) -> Self {
        self.retention_count = count;
        self
    }

    /// Set storage path.
    pub fn with_storage_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.storage_path = Some(path.into());
        self
    }

    /// Validate the configuration.
    pub fn validate(&self) -> ConfigResult<()> {
        if self.request_timeout.is_zero() {
            return Err(ConfigError::InvalidValue {
                field: "request_timeout",
                reason: "must be greater than zero".to_string(),
            });
        }
        if self.sync_timeout < self.request_timeout {
            return Err(ConfigError::InvalidValue {
                field: "sync_timeout",
                reason: format!(
                    "{:?} is shorter than the request timeout {:?}",
                    self.sync_timeout, self.request_timeout
                ),
            });
        }
        if self.max_retries == 0 {
            return Err(ConfigError::InvalidValue {
                field: "max_retries",
                reason: "at least one attempt is needed".to_string(),
            });
        }
        // a quorum needs the lists at its own block and its work block
        if self.retention_count < 2 {
            return Err(ConfigError::InvalidValue {
                field: "retention_count",
                reason: format!("{} lists are too few to verify quorums", self.retention_count),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = MasternodeSyncConfig::default();
        assert_eq!(config.network, Network::Dash);
        assert_eq!(config.max_faulty_peers, MAX_FAULTY_DML_PEERS);
        config.validate().unwrap();
        MasternodeSyncConfig::regtest().validate().unwrap();
    }

    #[test]
    fn test_builder_methods() {
        let config = MasternodeSyncConfig::testnet()
            .with_mode(SyncMode::Diff)
            .with_request_timeout(Duration::from_secs(3))
            .with_max_retries(5)
            .with_retention_count(8)
            .with_storage_path("/tmp/mnsync");
        assert_eq!(config.network, Network::Testnet);
        assert_eq!(config.mode, SyncMode::Diff);
        assert_eq!(config.request_timeout, Duration::from_secs(3));
        assert_eq!(config.max_retries, 5);
        assert_eq!(config.retention_count, 8);
        assert_eq!(config.storage_path, Some(PathBuf::from("/tmp/mnsync")));
    }

    #[test]
    fn test_validation_errors() {
        let config = MasternodeSyncConfig::default().with_request_timeout(Duration::ZERO);
        assert_matches!(
            config.validate(),
            Err(ConfigError::InvalidValue {
                field: "request_timeout",
                ..
            })
        );

        let config = MasternodeSyncConfig::default().with_sync_timeout(Duration::from_secs(1));
        assert_matches!(
            config.validate(),
            Err(ConfigError::InvalidValue {
                field: "sync_timeout",
                ..
            })
        );

        let config = MasternodeSyncConfig::default().with_retention_count(1);
        assert_matches!(
            config.validate(),
            Err(ConfigError::InvalidValue {
                field: "retention_count",
                ..
            })
        );
    }

    #[test]
    fn test_json_config_with_defaults() {
        let config =
            MasternodeSyncConfig::from_json_str(r#"{"network": "testnet", "mode": "rotation"}"#)
                .unwrap();
        assert_eq!(config.network, Network::Testnet);
        assert_eq!(config.mode, SyncMode::Rotation);
        assert_eq!(config.max_retries, 3);

        assert_matches!(
            MasternodeSyncConfig::from_json_str(r#"{"max_retries": 0}"#),
            Err(ConfigError::InvalidValue {
                field: "max_retries",
                ..
            })
        );
        assert_matches!(MasternodeSyncConfig::from_json_str("{"), Err(ConfigError::Parse(_)));
    }

    #[test]
    fn test_json_file_round_trip() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("mnsync.json");
        let config = MasternodeSyncConfig::regtest().with_mode(SyncMode::Diff);
        std::fs::write(&path, serde_json::to_string_pretty(&config).unwrap()).unwrap();
        assert_eq!(MasternodeSyncConfig::from_json_file(&path).unwrap(), config);
    }
}
