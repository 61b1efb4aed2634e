//! Persistence boundary of the masternode list store.
//!
//! The store keeps lists in memory and writes through to a [`PersistentStore`],
//! which only knows how to load and save lists and snapshots by block hash.

mod disk;
pub(crate) mod io;
mod memory;

use async_trait::async_trait;
use dash_sml::BlockHash;
use dash_sml::network::message_qrinfo::QuorumSnapshot;
use dash_sml::prelude::CoreBlockHeight;
use dash_sml::sml::masternode_list::MasternodeList;

use crate::error::StorageResult;

pub use disk::DiskPersistentStore;
pub use memory::MemoryPersistentStore;

#[async_trait]
pub trait PersistentStore: Send + Sync {
    async fn load_masternode_list(
        &self,
        block_hash: &BlockHash,
    ) -> StorageResult<Option<MasternodeList>>;

    /// Saving a list already present replaces it.
    async fn save_masternode_list(&self, list: &MasternodeList) -> StorageResult<()>;

    async fn delete_masternode_list(&self, block_hash: &BlockHash) -> StorageResult<()>;

    /// Height and block hash of every saved list, lowest height first.
    async fn masternode_list_index(&self) -> StorageResult<Vec<(CoreBlockHeight, BlockHash)>>;

    async fn load_quorum_snapshot(
        &self,
        block_hash: &BlockHash,
    ) -> StorageResult<Option<QuorumSnapshot>>;

    async fn save_quorum_snapshot(
        &self,
        block_hash: &BlockHash,
        snapshot: &QuorumSnapshot,
    ) -> StorageResult<()>;

    async fn delete_quorum_snapshot(&self, block_hash: &BlockHash) -> StorageResult<()>;

    /// Block hashes of every saved snapshot.
    async fn quorum_snapshot_index(&self) -> StorageResult<Vec<BlockHash>>;

    /// Removes every list and snapshot.
    async fn clear(&self) -> StorageResult<()>;
}
