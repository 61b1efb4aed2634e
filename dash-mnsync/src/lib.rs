//! Masternode list synchronization for Dash SPV clients.
//!
//! Retrieves `mnlistdiff` and `qrinfo` messages from a download peer, verifies them
//! with [`dash_sml::processor`] against the headers the client trusts, and keeps the
//! verified lists in a [`MasternodeListStore`] backed by a [`PersistentStore`].
//!
//! # Quick Start
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use dash_mnsync::{
//!     DiskPersistentStore, MasternodeListStore, MasternodeSyncConfig, MasternodeSyncManager,
//! };
//! use dash_sml::processor::HeaderChain;
//!
//! async fn sync(
//!     headers: Arc<dyn HeaderChain + Send + Sync>,
//!     peer: &dyn dash_mnsync::network::Peer,
//!     tip: dash_sml::BlockHash,
//! ) -> Result<(), Box<dyn std::error::Error>> {
//!     let config = MasternodeSyncConfig::testnet().with_storage_path("./.tmp/mnsync");
//!     let persistent = Arc::new(DiskPersistentStore::open("./.tmp/mnsync").await?);
//!     let store = Arc::new(MasternodeListStore::open(persistent, config.retention_count).await?);
//!
//!     let mut manager = MasternodeSyncManager::new(config, store, headers);
//!     manager.request_lists([tip]).await;
//!     let progress = manager.sync(peer).await?;
//!     println!("{} lists committed", progress.committed);
//!     Ok(())
//! }
//! ```

#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;

pub mod config;
pub mod error;
pub mod event_bus;
pub mod logging;
pub mod network;
pub mod storage;
pub mod store;
pub mod sync;
pub mod types;

pub use config::{MAX_FAULTY_DML_PEERS, MasternodeSyncConfig};
pub use error::{
    ConfigError, LoggingError, LoggingResult, MnSyncError, NetworkError, StorageError, SyncError,
    SyncResult,
};
pub use logging::{LogFileConfig, LoggingConfig, LoggingGuard, init_console_logging, init_logging};
pub use storage::{DiskPersistentStore, MemoryPersistentStore, PersistentStore};
pub use store::{MasternodeListStore, StoreView};
pub use sync::{MasternodeEvent, MasternodeListListener, MasternodeSyncManager, RetrievalScheduler};
pub use types::{PeerId, SyncMode, SyncProgress};

/// Current version of the crate.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
