//! Disk persistent store.
//!
//! Layout under the base directory:
//! - `index.json`: height and block hash of every saved list,
//! - `lists/<block hash>.json`: one consensus-encoded list, hex in JSON,
//! - `snapshots/<block hash>.json`: one consensus-encoded quorum snapshot.
//!
//! Every file is replaced atomically. The list file is written before the index
//! refers to it and the index is updated before the file is deleted.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use dash_sml::BlockHash;
use dash_sml::network::message_qrinfo::QuorumSnapshot;
use dash_sml::prelude::CoreBlockHeight;
use dash_sml::sml::masternode_list::MasternodeList;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

use crate::error::{StorageError, StorageResult};
use crate::storage::PersistentStore;
use crate::storage::io::{
    EncodedRecord, atomic_write, block_hash_from_hex, block_hash_to_hex, read_if_exists,
};

const INDEX_FILE: &str = "index.json";
const LISTS_DIR: &str = "lists";
const SNAPSHOTS_DIR: &str = "snapshots";

#[derive(Debug, Serialize, Deserialize)]
struct IndexEntry {
    height: CoreBlockHeight,
    block_hash: String,
}

pub struct DiskPersistentStore {
    base_path: PathBuf,
    index: RwLock<BTreeMap<BlockHash, CoreBlockHeight>>,
}

impl DiskPersistentStore {
    /// Opens the store at `base_path`, creating the directories if needed.
    pub async fn open(base_path: impl Into<PathBuf>) -> StorageResult<Self> {
        let base_path = base_path.into();
        for dir in [LISTS_DIR, SNAPSHOTS_DIR] {
            tokio::fs::create_dir_all(base_path.join(dir)).await.map_err(|e| {
                StorageError::WriteFailed(format!("Failed to create {} directory: {}", dir, e))
            })?;
        }

        let index = match read_if_exists(&base_path.join(INDEX_FILE)).await? {
            Some(content) => {
                let entries: Vec<IndexEntry> = serde_json::from_str(&content)
                    .map_err(|e| StorageError::Corruption(format!("Invalid index: {}", e)))?;
                entries
                    .into_iter()
                    .map(|entry| Ok((block_hash_from_hex(&entry.block_hash)?, entry.height)))
                    .collect::<StorageResult<BTreeMap<_, _>>>()?
            }
            None => BTreeMap::new(),
        };
        tracing::debug!("Opened list store at {} with {} lists", base_path.display(), index.len());

        Ok(Self {
            base_path,
            index: RwLock::new(index),
        })
    }

    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    fn list_path(&self, block_hash: &BlockHash) -> PathBuf {
        self.base_path.join(LISTS_DIR).join(format!("{}.json", block_hash_to_hex(block_hash)))
    }

    fn snapshot_path(&self, block_hash: &BlockHash) -> PathBuf {
        self.base_path.join(SNAPSHOTS_DIR).join(format!("{}.json", block_hash_to_hex(block_hash)))
    }

    async fn write_index(&self, index: &BTreeMap<BlockHash, CoreBlockHeight>) -> StorageResult<()> {
        let entries: Vec<IndexEntry> = index
            .iter()
            .map(|(block_hash, height)| IndexEntry {
                height: *height,
                block_hash: block_hash_to_hex(block_hash),
            })
            .collect();
        let json = serde_json::to_string_pretty(&entries)
            .map_err(|e| StorageError::Serialization(format!("Failed to serialize index: {}", e)))?;
        atomic_write(&self.base_path.join(INDEX_FILE), json.as_bytes()).await
    }

    async fn load_record(path: &Path) -> StorageResult<Option<EncodedRecord>> {
        match read_if_exists(path).await? {
            Some(content) => Ok(Some(EncodedRecord::from_json(&content)?)),
            None => Ok(None),
        }
    }
}

#[async_trait]
impl PersistentStore for DiskPersistentStore {
    async fn load_masternode_list(
        &self,
        block_hash: &BlockHash,
    ) -> StorageResult<Option<MasternodeList>> {
        let Some(record) = Self::load_record(&self.list_path(block_hash)).await? else {
            return Ok(None);
        };
        let list: MasternodeList = record.decode()?;
        if list.block_hash != *block_hash {
            return Err(StorageError::Corruption(format!(
                "File for list {} holds list {}",
                block_hash, list.block_hash
            )));
        }
        Ok(Some(list))
    }

    async fn save_masternode_list(&self, list: &MasternodeList) -> StorageResult<()> {
        let record = EncodedRecord::new(&list.block_hash, Some(list.known_height), list);
        atomic_write(&self.list_path(&list.block_hash), record.to_json()?.as_bytes()).await?;

        let mut index = self.index.write().await;
        if index.insert(list.block_hash, list.known_height) != Some(list.known_height) {
            self.write_index(&index).await?;
        }
        Ok(())
    }

    async fn delete_masternode_list(&self, block_hash: &BlockHash) -> StorageResult<()> {
        let mut index = self.index.write().await;
        if index.remove(block_hash).is_some() {
            self.write_index(&index).await?;
        }
        match tokio::fs::remove_file(self.list_path(block_hash)).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    async fn masternode_list_index(&self) -> StorageResult<Vec<(CoreBlockHeight, BlockHash)>> {
        let mut entries: Vec<_> =
            self.index.read().await.iter().map(|(hash, height)| (*height, *hash)).collect();
        entries.sort();
        Ok(entries)
    }

    async fn load_quorum_snapshot(
        &self,
        block_hash: &BlockHash,
    ) -> StorageResult<Option<QuorumSnapshot>> {
        match Self::load_record(&self.snapshot_path(block_hash)).await? {
            Some(record) => Ok(Some(record.decode()?)),
            None => Ok(None),
        }
    }

    async fn save_quorum_snapshot(
        &self,
        block_hash: &BlockHash,
        snapshot: &QuorumSnapshot,
    ) -> StorageResult<()> {
        let record = EncodedRecord::new(block_hash, None, snapshot);
        atomic_write(&self.snapshot_path(block_hash), record.to_json()?.as_bytes()).await
    }

    async fn delete_quorum_snapshot(&self, block_hash: &BlockHash) -> StorageResult<()> {
        match tokio::fs::remove_file(self.snapshot_path(block_hash)).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    async fn quorum_snapshot_index(&self) -> StorageResult<Vec<BlockHash>> {
        let mut entries = tokio::fs::read_dir(self.base_path.join(SNAPSHOTS_DIR)).await?;
        let mut block_hashes = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            // leftovers of interrupted writes end in .tmp
            if path.extension().and_then(|ext| ext.to_str()) != Some("json") {
                continue;
            }
            if let Some(stem) = path.file_stem().and_then(|stem| stem.to_str()) {
                block_hashes.push(block_hash_from_hex(stem)?);
            }
        }
        Ok(block_hashes)
    }

    async fn clear(&self) -> StorageResult<()> {
        let mut index = self.index.write().await;
        index.clear();
        self.write_index(&index).await?;
        for dir in [LISTS_DIR, SNAPSHOTS_DIR] {
            let path = self.base_path.join(dir);
            tokio::fs::remove_dir_all(&path).await?;
            tokio::fs::create_dir_all(&path).await?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use dash_sml::network::message_qrinfo::MnSkipListMode;
    use dash_sml::test_utils::TestMasternode;
    use tempfile::TempDir;

    use super::*;

    fn list_with_nodes(height: u32, count: u32) -> MasternodeList {
        let masternodes = (0..count)
            .map(|i| {
                let entry = TestMasternode::new(i).entry();
                (entry.pro_reg_tx_hash, entry.into())
            })
            .collect();
        MasternodeList::build(masternodes, Default::default(), BlockHash::dummy(height), height)
            .build()
    }

    #[tokio::test]
    async fn test_lists_survive_reopening() {
        let dir = TempDir::new().unwrap();
        let list = list_with_nodes(1000, 3);
        {
            let store = DiskPersistentStore::open(dir.path()).await.unwrap();
            store.save_masternode_list(&list).await.unwrap();
            store.save_masternode_list(&list_with_nodes(900, 1)).await.unwrap();
        }

        let store = DiskPersistentStore::open(dir.path()).await.unwrap();
        assert_eq!(
            store.masternode_list_index().await.unwrap(),
            vec![(900, BlockHash::dummy(900)), (1000, BlockHash::dummy(1000))]
        );
        let loaded = store.load_masternode_list(&list.block_hash).await.unwrap().unwrap();
        assert_eq!(loaded, list);
        assert_eq!(loaded.masternode_merkle_root, list.masternode_merkle_root);
    }

    #[tokio::test]
    async fn test_delete_and_clear() {
        let dir = TempDir::new().unwrap();
        let store = DiskPersistentStore::open(dir.path()).await.unwrap();
        store.save_masternode_list(&list_with_nodes(10, 1)).await.unwrap();
        store.save_masternode_list(&list_with_nodes(11, 1)).await.unwrap();

        store.delete_masternode_list(&BlockHash::dummy(10)).await.unwrap();
        // deleting twice is fine
        store.delete_masternode_list(&BlockHash::dummy(10)).await.unwrap();
        assert!(store.load_masternode_list(&BlockHash::dummy(10)).await.unwrap().is_none());
        assert_eq!(store.masternode_list_index().await.unwrap().len(), 1);

        store.clear().await.unwrap();
        assert!(store.masternode_list_index().await.unwrap().is_empty());
        assert!(store.load_masternode_list(&BlockHash::dummy(11)).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_snapshots() {
        let dir = TempDir::new().unwrap();
        let store = DiskPersistentStore::open(dir.path()).await.unwrap();
        let snapshot = QuorumSnapshot {
            skip_list_mode: MnSkipListMode::SkipFirst,
            active_quorum_members: vec![true, false, true],
            skip_list: vec![2, 1],
        };
        store.save_quorum_snapshot(&BlockHash::dummy(64), &snapshot).await.unwrap();
        assert_eq!(store.load_quorum_snapshot(&BlockHash::dummy(64)).await.unwrap(), Some(snapshot));
        assert_eq!(store.load_quorum_snapshot(&BlockHash::dummy(65)).await.unwrap(), None);

        std::fs::write(store.snapshot_path(&BlockHash::dummy(66)).with_extension("tmp"), "partial")
            .unwrap();
        assert_eq!(store.quorum_snapshot_index().await.unwrap(), vec![BlockHash::dummy(64)]);
        store.delete_quorum_snapshot(&BlockHash::dummy(64)).await.unwrap();
        store.delete_quorum_snapshot(&BlockHash::dummy(64)).await.unwrap();
        assert!(store.quorum_snapshot_index().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_corrupt_index() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join(INDEX_FILE), "not json").unwrap();
        assert!(matches!(
            DiskPersistentStore::open(dir.path()).await,
            Err(StorageError::Corruption(_))
        ));
    }

    #[tokio::test]
    async fn test_misplaced_list_is_corruption() {
        let dir = TempDir::new().unwrap();
        let store = DiskPersistentStore::open(dir.path()).await.unwrap();
        store.save_masternode_list(&list_with_nodes(5, 1)).await.unwrap();
        std::fs::copy(store.list_path(&BlockHash::dummy(5)), store.list_path(&BlockHash::dummy(6)))
            .unwrap();
        assert!(matches!(
            store.load_masternode_list(&BlockHash::dummy(6)).await,
            Err(StorageError::Corruption(_))
        ));
    }
}
