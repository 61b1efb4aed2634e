//! In-memory persistent store, for tests and clients that resync on every start.

use std::collections::HashMap;

use async_trait::async_trait;
use dash_sml::BlockHash;
use dash_sml::network::message_qrinfo::QuorumSnapshot;
use dash_sml::prelude::CoreBlockHeight;
use dash_sml::sml::masternode_list::MasternodeList;
use tokio::sync::RwLock;

use crate::error::StorageResult;
use crate::storage::PersistentStore;

#[derive(Debug, Default)]
pub struct MemoryPersistentStore {
    lists: RwLock<HashMap<BlockHash, MasternodeList>>,
    snapshots: RwLock<HashMap<BlockHash, QuorumSnapshot>>,
}

impl MemoryPersistentStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl PersistentStore for MemoryPersistentStore {
    async fn load_masternode_list(
        &self,
        block_hash: &BlockHash,
    ) -> StorageResult<Option<MasternodeList>> {
        Ok(self.lists.read().await.get(block_hash).cloned())
    }

    async fn save_masternode_list(&self, list: &MasternodeList) -> StorageResult<()> {
        self.lists.write().await.insert(list.block_hash, list.clone());
        Ok(())
    }

    async fn delete_masternode_list(&self, block_hash: &BlockHash) -> StorageResult<()> {
        self.lists.write().await.remove(block_hash);
        Ok(())
    }

    async fn masternode_list_index(&self) -> StorageResult<Vec<(CoreBlockHeight, BlockHash)>> {
        let mut index: Vec<_> =
            self.lists.read().await.values().map(|list| (list.known_height, list.block_hash)).collect();
        index.sort();
        Ok(index)
    }

    async fn load_quorum_snapshot(
        &self,
        block_hash: &BlockHash,
    ) -> StorageResult<Option<QuorumSnapshot>> {
        Ok(self.snapshots.read().await.get(block_hash).cloned())
    }

    async fn save_quorum_snapshot(
        &self,
        block_hash: &BlockHash,
        snapshot: &QuorumSnapshot,
    ) -> StorageResult<()> {
        self.snapshots.write().await.insert(*block_hash, snapshot.clone());
        Ok(())
    }

    async fn delete_quorum_snapshot(&self, block_hash: &BlockHash) -> StorageResult<()> {
        self.snapshots.write().await.remove(block_hash);
        Ok(())
    }

    async fn quorum_snapshot_index(&self) -> StorageResult<Vec<BlockHash>> {
        Ok(self.snapshots.read().await.keys().copied().collect())
    }

    async fn clear(&self) -> StorageResult<()> {
        self.lists.write().await.clear();
        self.snapshots.write().await.clear();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use dash_sml::hashes::Hash;

    use super::*;

    #[tokio::test]
    async fn test_index_is_sorted_by_height() {
        let store = MemoryPersistentStore::new();
        for height in [30u32, 10, 20] {
            let hash = BlockHash::dummy(height);
            store.save_masternode_list(&MasternodeList::empty(hash, height)).await.unwrap();
        }
        let heights: Vec<_> =
            store.masternode_list_index().await.unwrap().into_iter().map(|(h, _)| h).collect();
        assert_eq!(heights, vec![10, 20, 30]);

        store.delete_masternode_list(&BlockHash::dummy(20)).await.unwrap();
        assert!(store.load_masternode_list(&BlockHash::dummy(20)).await.unwrap().is_none());
        assert!(store.load_masternode_list(&BlockHash::dummy(10)).await.unwrap().is_some());

        store.save_quorum_snapshot(&BlockHash::all_zeros(), &QuorumSnapshot::default()).await.unwrap();
        store.save_quorum_snapshot(&BlockHash::dummy(5), &QuorumSnapshot::default()).await.unwrap();
        store.delete_quorum_snapshot(&BlockHash::dummy(5)).await.unwrap();
        assert_eq!(store.quorum_snapshot_index().await.unwrap(), vec![BlockHash::all_zeros()]);
        store.clear().await.unwrap();
        assert!(store.masternode_list_index().await.unwrap().is_empty());
        assert!(store.load_quorum_snapshot(&BlockHash::all_zeros()).await.unwrap().is_none());
    }
}
