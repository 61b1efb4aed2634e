//! Error types for masternode list synchronization.

use std::io;

use dash_sml::processor::{ProcessingError, RejectReason};
use thiserror::Error;

use crate::types::PeerId;

/// Main error type of the crate.
#[derive(Debug, Error)]
pub enum MnSyncError {
    #[error("Network error: {0}")]
    Network(#[from] NetworkError),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Sync error: {0}")]
    Sync(#[from] SyncError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Logging error: {0}")]
    Logging(#[from] LoggingError),
}

/// Logging-related errors.
#[derive(Debug, Error)]
pub enum LoggingError {
    #[error("Failed to create log directory: {0}")]
    DirectoryCreation(#[from] std::io::Error),

    #[error("Subscriber initialization failed: {0}")]
    SubscriberInit(String),

    #[error("Log rotation failed: {0}")]
    RotationFailed(String),
}

/// Errors talking to the download peer.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum NetworkError {
    #[error("Timeout occurred")]
    Timeout,

    #[error("Peer disconnected")]
    PeerDisconnected,

    #[error("Request cancelled")]
    Cancelled,

    #[error("Request failed: {0}")]
    RequestFailed(String),
}

/// Storage-related errors.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Corruption detected: {0}")]
    Corruption(String),

    #[error("Write failed: {0}")]
    WriteFailed(String),

    #[error("Read failed: {0}")]
    ReadFailed(String),

    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl Clone for StorageError {
    fn clone(&self) -> Self {
        match self {
            StorageError::Corruption(s) => StorageError::Corruption(s.clone()),
            StorageError::WriteFailed(s) => StorageError::WriteFailed(s.clone()),
            StorageError::ReadFailed(s) => StorageError::ReadFailed(s.clone()),
            StorageError::Io(err) => StorageError::Io(io::Error::new(err.kind(), err.to_string())),
            StorageError::Serialization(s) => StorageError::Serialization(s.clone()),
        }
    }
}

/// Invalid configuration values.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Invalid value for {field}: {reason}")]
    InvalidValue {
        field: &'static str,
        reason: String,
    },

    #[error("Failed to parse configuration: {0}")]
    Parse(String),
}

/// Synchronization-related errors.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SyncError {
    /// Unexpected internal state, not caused by peer data
    #[error("Invalid state: {0}")]
    InvalidState(String),

    /// A list could not be obtained within the dependency depth
    #[error("Missing dependency: {0}")]
    MissingDependency(String),

    #[error("Timeout error: {0}")]
    Timeout(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Storage error: {0}")]
    Storage(String),

    /// The peer sent bytes that do not decode
    #[error("Malformed message: {0}")]
    MalformedMessage(String),

    /// The message contradicts the block headers
    #[error("Invalid roots: {0}")]
    InvalidRoots(String),

    #[error("Invalid quorum: {0}")]
    InvalidQuorum(String),

    #[error("Lost peer {0}")]
    PeerLost(PeerId),

    #[error("Processing error: {0}")]
    Processing(#[from] ProcessingError),
}

impl SyncError {
    /// Returns a static string representing the error category based on the variant
    pub fn category(&self) -> &'static str {
        match self {
            SyncError::InvalidState(_) => "state",
            SyncError::Timeout(_) => "timeout",
            SyncError::MissingDependency(_) => "dependency",
            SyncError::Network(_) | SyncError::PeerLost(_) => "network",
            SyncError::Storage(_) => "storage",
            SyncError::MalformedMessage(_)
            | SyncError::InvalidRoots(_)
            | SyncError::InvalidQuorum(_) => "validation",
            SyncError::Processing(_) => "processing",
        }
    }

    /// Whether the error says something about the quality of the peer that sent the
    /// message.
    pub fn is_peer_fault(&self) -> bool {
        matches!(
            self,
            SyncError::MalformedMessage(_) | SyncError::InvalidRoots(_) | SyncError::InvalidQuorum(_)
        )
    }
}

/// Type alias for Result with MnSyncError.
pub type Result<T> = std::result::Result<T, MnSyncError>;

/// Type alias for network operation results.
pub type NetworkResult<T> = std::result::Result<T, NetworkError>;

/// Type alias for storage operation results.
pub type StorageResult<T> = std::result::Result<T, StorageError>;

/// Type alias for sync operation results.
pub type SyncResult<T> = std::result::Result<T, SyncError>;

/// Type alias for logging operation results.
pub type LoggingResult<T> = std::result::Result<T, LoggingError>;

/// Type alias for configuration results.
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

impl From<NetworkError> for SyncError {
    fn from(err: NetworkError) -> Self {
        match err {
            NetworkError::Timeout => SyncError::Timeout(err.to_string()),
            _ => SyncError::Network(err.to_string()),
        }
    }
}

impl From<StorageError> for SyncError {
    fn from(err: StorageError) -> Self {
        SyncError::Storage(err.to_string())
    }
}

impl From<RejectReason> for SyncError {
    fn from(reason: RejectReason) -> Self {
        match reason {
            RejectReason::MalformedMessage(message) => SyncError::MalformedMessage(message),
            RejectReason::InvalidRoots(_) => SyncError::InvalidRoots(reason.to_string()),
            RejectReason::InvalidQuorum {
                ..
            } => SyncError::InvalidQuorum(reason.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use dash_sml::processor::RootFailure;

    use super::*;

    #[test]
    fn test_sync_error_category() {
        assert_eq!(SyncError::Timeout("test".to_string()).category(), "timeout");
        assert_eq!(SyncError::Network("test".to_string()).category(), "network");
        assert_eq!(SyncError::PeerLost(PeerId(3)).category(), "network");
        assert_eq!(SyncError::Storage("test".to_string()).category(), "storage");
        assert_eq!(SyncError::InvalidState("test".to_string()).category(), "state");
        assert_eq!(SyncError::MissingDependency("test".to_string()).category(), "dependency");
        assert_eq!(SyncError::InvalidRoots("test".to_string()).category(), "validation");
    }

    #[test]
    fn test_reject_reasons_are_peer_faults() {
        let malformed: SyncError = RejectReason::MalformedMessage("short read".into()).into();
        assert_eq!(malformed, SyncError::MalformedMessage("short read".into()));
        assert!(malformed.is_peer_fault());

        let roots: SyncError =
            RejectReason::InvalidRoots(RootFailure::QuorumListRootMismatch).into();
        assert!(matches!(roots, SyncError::InvalidRoots(_)));
        assert!(roots.is_peer_fault());

        assert!(!SyncError::from(NetworkError::Timeout).is_peer_fault());
        assert_eq!(SyncError::from(NetworkError::Timeout).category(), "timeout");
    }
}
