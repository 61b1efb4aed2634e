//! Committed masternode lists and quorum snapshots, keyed by block hash.
//!
//! Lists are immutable and shared as `Arc`s. Readers take the read lock only;
//! mutations are serialized by a dedicated mutex held across the write-through to
//! the [`PersistentStore`], the in-memory maps being updated once persistence
//! succeeded.

use std::collections::{BTreeMap, BTreeSet};
use std::ops::RangeInclusive;
use std::sync::Arc;

use dash_sml::BlockHash;
use dash_sml::hashes::Hash;
use dash_sml::network::message_qrinfo::QuorumSnapshot;
use dash_sml::prelude::CoreBlockHeight;
use dash_sml::processor::{HeaderChain, MasternodeListProvider};
use dash_sml::sml::masternode_list::MasternodeList;
use dash_sml::sml::masternode_list::rotation::WORK_BLOCK_DISTANCE;
use tokio::sync::{Mutex, RwLock};

use crate::error::StorageResult;
use crate::storage::PersistentStore;

/// A record written by an unfinished commit.
#[derive(Debug, Clone, Copy)]
enum Written {
    List(BlockHash),
    Snapshot(BlockHash),
}

#[derive(Debug, Default)]
struct StoreState {
    lists: BTreeMap<BlockHash, Arc<MasternodeList>>,
    by_height: BTreeSet<(CoreBlockHeight, BlockHash)>,
    snapshots: BTreeMap<BlockHash, QuorumSnapshot>,
    /// Pin counts of lists needed by in-flight lock checks.
    pins: BTreeMap<BlockHash, usize>,
}

impl StoreState {
    fn insert(&mut self, list: Arc<MasternodeList>) {
        self.by_height.insert((list.known_height, list.block_hash));
        self.lists.insert(list.block_hash, list);
    }

    fn remove(&mut self, block_hash: &BlockHash) -> Option<Arc<MasternodeList>> {
        let list = self.lists.remove(block_hash)?;
        self.by_height.remove(&(list.known_height, list.block_hash));
        Some(list)
    }

    /// Height ranges that unverified quorums of `retained` lists still need: from the
    /// quorum block down to the oldest work block the quorum type can refer to. The
    /// quorum height comes from `headers`, or from a list at the quorum block.
    fn needed_by_unverified_quorums<'a, H>(
        &self,
        retained: impl Iterator<Item = &'a Arc<MasternodeList>>,
        headers: &H,
    ) -> Vec<RangeInclusive<CoreBlockHeight>>
    where
        H: HeaderChain + ?Sized,
    {
        let mut needed = Vec::new();
        for list in retained {
            for quorum in list.all_quorums().filter(|quorum| !quorum.is_verified()) {
                let quorum_block = BlockHash::from(quorum.quorum_entry.quorum_hash);
                let Some(quorum_height) = headers
                    .height_for_block_hash(&quorum_block)
                    .or_else(|| self.lists.get(&quorum_block).map(|list| list.known_height))
                else {
                    tracing::debug!("Height of unverified quorum block {} is unknown", quorum_block);
                    continue;
                };
                let llmq_type = quorum.quorum_entry.llmq_type;
                let reach = if llmq_type.is_rotating_quorum_type() {
                    3 * llmq_type.cycle_length() + WORK_BLOCK_DISTANCE
                } else {
                    WORK_BLOCK_DISTANCE
                };
                needed.push(quorum_height.saturating_sub(reach)..=quorum_height);
            }
        }
        needed
    }
}

/// Owned view of the store at one point in time, handed to the verification worker.
#[derive(Debug, Clone, Default)]
pub struct StoreView {
    pub lists: BTreeMap<BlockHash, Arc<MasternodeList>>,
    pub snapshots: BTreeMap<BlockHash, QuorumSnapshot>,
}

impl MasternodeListProvider for StoreView {
    fn masternode_list(&self, block_hash: &BlockHash) -> Option<Arc<MasternodeList>> {
        self.lists.get(block_hash).cloned()
    }

    fn quorum_snapshot(&self, block_hash: &BlockHash) -> Option<QuorumSnapshot> {
        self.snapshots.get(block_hash).cloned()
    }
}

pub struct MasternodeListStore {
    state: RwLock<StoreState>,
    mutation: Mutex<()>,
    persistent: Arc<dyn PersistentStore>,
    retention_count: usize,
}

impl MasternodeListStore {
    /// Opens the store, loading every list and snapshot the persistent store holds.
    pub async fn open(
        persistent: Arc<dyn PersistentStore>,
        retention_count: usize,
    ) -> StorageResult<Self> {
        let mut state = StoreState::default();
        for (height, block_hash) in persistent.masternode_list_index().await? {
            match persistent.load_masternode_list(&block_hash).await? {
                Some(list) => state.insert(Arc::new(list)),
                None => tracing::warn!("Indexed list {} at {} is missing", block_hash, height),
            }
        }
        for block_hash in persistent.quorum_snapshot_index().await? {
            if let Some(snapshot) = persistent.load_quorum_snapshot(&block_hash).await? {
                state.snapshots.insert(block_hash, snapshot);
            }
        }
        tracing::info!("Loaded {} masternode lists", state.lists.len());
        Ok(Self {
            state: RwLock::new(state),
            mutation: Mutex::new(()),
            persistent,
            retention_count,
        })
    }

    pub async fn get(&self, block_hash: &BlockHash) -> Option<Arc<MasternodeList>> {
        self.state.read().await.lists.get(block_hash).cloned()
    }

    pub async fn contains(&self, block_hash: &BlockHash) -> bool {
        self.state.read().await.lists.contains_key(block_hash)
    }

    /// Commits `list`. An existing list for the same block is never replaced:
    /// returns whether `list` was stored.
    pub async fn commit(&self, list: Arc<MasternodeList>) -> StorageResult<bool> {
        Ok(!self.commit_all(vec![list], BTreeMap::new()).await?.is_empty())
    }

    /// Commits lists and snapshots produced by one message, lowest height first.
    /// Returns the lists that were not already present. When a write fails, the
    /// records already written for the message are deleted again and nothing is
    /// committed.
    pub async fn commit_all(
        &self,
        mut lists: Vec<Arc<MasternodeList>>,
        snapshots: BTreeMap<BlockHash, QuorumSnapshot>,
    ) -> StorageResult<Vec<Arc<MasternodeList>>> {
        let _guard = self.mutation.lock().await;
        lists.sort_by_key(|list| list.known_height);
        let (new_lists, new_snapshots) = {
            let state = self.state.read().await;
            let mut seen = BTreeSet::new();
            let new_lists: Vec<_> = lists
                .into_iter()
                .filter(|list| {
                    !state.lists.contains_key(&list.block_hash) && seen.insert(list.block_hash)
                })
                .collect();
            let new_snapshots: Vec<_> = snapshots
                .into_iter()
                .filter(|(hash, _)| !state.snapshots.contains_key(hash))
                .collect();
            (new_lists, new_snapshots)
        };

        let mut written = Vec::with_capacity(new_snapshots.len() + new_lists.len());
        if let Err(e) = self.write_through(&new_lists, &new_snapshots, &mut written).await {
            tracing::warn!("Commit failed after {} writes: {}", written.len(), e);
            self.roll_back(&written).await;
            return Err(e);
        }

        let mut state = self.state.write().await;
        state.snapshots.extend(new_snapshots);
        for list in &new_lists {
            tracing::debug!("Committed masternode list {} at {}", list.block_hash, list.known_height);
            state.insert(list.clone());
        }
        Ok(new_lists)
    }

    async fn write_through(
        &self,
        lists: &[Arc<MasternodeList>],
        snapshots: &[(BlockHash, QuorumSnapshot)],
        written: &mut Vec<Written>,
    ) -> StorageResult<()> {
        for (block_hash, snapshot) in snapshots {
            self.persistent.save_quorum_snapshot(block_hash, snapshot).await?;
            written.push(Written::Snapshot(*block_hash));
        }
        for list in lists {
            self.persistent.save_masternode_list(list).await?;
            written.push(Written::List(list.block_hash));
        }
        Ok(())
    }

    async fn roll_back(&self, written: &[Written]) {
        for record in written.iter().rev() {
            let result = match record {
                Written::List(block_hash) => self.persistent.delete_masternode_list(block_hash).await,
                Written::Snapshot(block_hash) => {
                    self.persistent.delete_quorum_snapshot(block_hash).await
                }
            };
            if let Err(e) = result {
                tracing::error!("Failed to roll back {:?}: {}", record, e);
            }
        }
    }

    pub async fn snapshot(&self, block_hash: &BlockHash) -> Option<QuorumSnapshot> {
        self.state.read().await.snapshots.get(block_hash).cloned()
    }

    pub async fn view(&self) -> StoreView {
        let state = self.state.read().await;
        StoreView {
            lists: state.lists.clone(),
            snapshots: state.snapshots.clone(),
        }
    }

    /// The most recent list on the chain of `block_hash`, at or below its height.
    pub async fn closest_known_ancestor<H>(
        &self,
        block_hash: &BlockHash,
        headers: &H,
    ) -> Option<Arc<MasternodeList>>
    where
        H: HeaderChain + ?Sized,
    {
        let height = headers.height_for_block_hash(block_hash)?;
        let state = self.state.read().await;
        state
            .by_height
            .iter()
            .rev()
            .filter(|(list_height, _)| *list_height <= height)
            .find(|(list_height, hash)| headers.block_hash_at_height(*list_height) == Some(*hash))
            .and_then(|(_, hash)| state.lists.get(hash).cloned())
    }

    /// Removes lists below `height`, except the `retention_count` most recent, pinned
    /// lists and lists still needed to verify quorums, along with the snapshots of
    /// blocks below `height` that no kept list or quorum needs. Heights of quorum and
    /// snapshot blocks are resolved through `headers`. Returns how many lists were
    /// removed.
    pub async fn prune_below<H>(&self, height: CoreBlockHeight, headers: &H) -> StorageResult<usize>
    where
        H: HeaderChain + ?Sized,
    {
        let _guard = self.mutation.lock().await;
        let (doomed_lists, doomed_snapshots) = {
            let state = self.state.read().await;
            let recent: BTreeSet<BlockHash> =
                state.by_height.iter().rev().take(self.retention_count).map(|(_, h)| *h).collect();
            let retained = state.lists.values().filter(|list| {
                list.known_height >= height || recent.contains(&list.block_hash)
            });
            let needed = state.needed_by_unverified_quorums(retained, headers);
            let is_needed = |h: CoreBlockHeight| needed.iter().any(|range| range.contains(&h));

            let doomed_lists: Vec<BlockHash> = state
                .by_height
                .iter()
                .filter(|(list_height, hash)| {
                    *list_height < height
                        && !recent.contains(hash)
                        && !state.pins.contains_key(hash)
                        && !is_needed(*list_height)
                })
                .map(|(_, hash)| *hash)
                .collect();
            let doomed_snapshots: Vec<BlockHash> = state
                .snapshots
                .keys()
                .copied()
                .filter(|hash| {
                    let kept_list =
                        state.lists.contains_key(hash) && !doomed_lists.contains(hash);
                    let snapshot_height = headers
                        .height_for_block_hash(hash)
                        .or_else(|| state.lists.get(hash).map(|list| list.known_height));
                    !kept_list
                        && snapshot_height.is_some_and(|h| h < height && !is_needed(h))
                })
                .collect();
            (doomed_lists, doomed_snapshots)
        };
        self.remove_lists(&doomed_lists).await?;
        for block_hash in &doomed_snapshots {
            self.persistent.delete_quorum_snapshot(block_hash).await?;
            self.state.write().await.snapshots.remove(block_hash);
        }
        if !doomed_lists.is_empty() || !doomed_snapshots.is_empty() {
            tracing::debug!(
                "Pruned {} masternode lists and {} snapshots below {}",
                doomed_lists.len(),
                doomed_snapshots.len(),
                height
            );
        }
        Ok(doomed_lists.len())
    }

    async fn remove_lists(&self, block_hashes: &[BlockHash]) -> StorageResult<()> {
        for block_hash in block_hashes {
            self.persistent.delete_masternode_list(block_hash).await?;
            self.state.write().await.remove(block_hash);
        }
        Ok(())
    }

    /// Keeps the list at `block_hash` from being pruned until as many `unpin` calls.
    pub async fn pin(&self, block_hash: &BlockHash) {
        *self.state.write().await.pins.entry(*block_hash).or_insert(0) += 1;
    }

    pub async fn unpin(&self, block_hash: &BlockHash) {
        let mut state = self.state.write().await;
        if let Some(count) = state.pins.get_mut(block_hash) {
            *count -= 1;
            if *count == 0 {
                state.pins.remove(block_hash);
            }
        }
    }

    pub async fn is_pinned(&self, block_hash: &BlockHash) -> bool {
        self.state.read().await.pins.contains_key(block_hash)
    }

    pub async fn known_masternode_lists_count(&self) -> usize {
        self.state.read().await.lists.len()
    }

    pub async fn earliest_masternode_list_block_height(&self) -> Option<CoreBlockHeight> {
        self.state.read().await.by_height.first().map(|(height, _)| *height)
    }

    pub async fn last_masternode_list_block_height(&self) -> Option<CoreBlockHeight> {
        self.state.read().await.by_height.last().map(|(height, _)| *height)
    }

    pub async fn last_masternode_list(&self) -> Option<Arc<MasternodeList>> {
        let state = self.state.read().await;
        state.by_height.last().and_then(|(_, hash)| state.lists.get(hash).cloned())
    }

    /// Up to `count` lists, most recent first.
    pub async fn recent_masternode_lists(&self, count: usize) -> Vec<Arc<MasternodeList>> {
        let state = self.state.read().await;
        state
            .by_height
            .iter()
            .rev()
            .take(count)
            .filter_map(|(_, hash)| state.lists.get(hash).cloned())
            .collect()
    }

    /// Removes every list and snapshot, pins included.
    pub async fn remove_all(&self) -> StorageResult<()> {
        let _guard = self.mutation.lock().await;
        self.persistent.clear().await?;
        *self.state.write().await = StoreState::default();
        tracing::info!("Removed all masternode lists");
        Ok(())
    }

    /// Removes unpinned lists without any masternode. Returns how many were removed.
    pub async fn delete_empty_masternode_lists(&self) -> StorageResult<usize> {
        let _guard = self.mutation.lock().await;
        let empty: Vec<BlockHash> = {
            let state = self.state.read().await;
            state
                .lists
                .values()
                .filter(|list| list.masternodes.is_empty() && !state.pins.contains_key(&list.block_hash))
                .map(|list| list.block_hash)
                .collect()
        };
        self.remove_lists(&empty).await?;
        Ok(empty.len())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use assert_matches::assert_matches;
    use async_trait::async_trait;
    use dash_sml::sml::llmq_type::LLMQType;
    use dash_sml::test_utils::{DiffBuilder, TestHeaderChain, TestMasternode, TestQuorum};
    use dash_sml::transaction::special_transaction::quorum_commitment::QuorumEntry;
    use dash_sml::{QuorumHash, TxMerkleNode};

    use super::*;
    use crate::error::StorageError;
    use crate::storage::MemoryPersistentStore;

    fn list_at(height: u32, nodes: u32) -> Arc<MasternodeList> {
        let diff = DiffBuilder::new(BlockHash::all_zeros(), BlockHash::dummy(height), height)
            .add_masternodes((0..nodes).map(|i| TestMasternode::new(i).entry()))
            .build();
        Arc::new(MasternodeList::apply_diff(None, &diff, height).unwrap().list)
    }

    async fn store_with(heights: &[u32], retention_count: usize) -> MasternodeListStore {
        let store =
            MasternodeListStore::open(Arc::new(MemoryPersistentStore::new()), retention_count)
                .await
                .unwrap();
        for height in heights {
            assert!(store.commit(list_at(*height, 2)).await.unwrap());
        }
        store
    }

    #[tokio::test]
    async fn test_commit_never_overwrites() {
        let store = store_with(&[10], 4).await;
        let replacement = list_at(10, 5);
        assert!(!store.commit(replacement).await.unwrap());
        assert_eq!(store.get(&BlockHash::dummy(10)).await.unwrap().masternodes.len(), 2);
        assert_eq!(store.known_masternode_lists_count().await, 1);
    }

    #[tokio::test]
    async fn test_commit_all_skips_known_lists() {
        let store = store_with(&[10], 4).await;
        let snapshots = BTreeMap::from([(BlockHash::dummy(20), QuorumSnapshot::default())]);
        let committed = store
            .commit_all(vec![list_at(30, 1), list_at(10, 1), list_at(20, 1)], snapshots)
            .await
            .unwrap();
        let heights: Vec<_> = committed.iter().map(|list| list.known_height).collect();
        assert_eq!(heights, vec![20, 30]);
        assert_eq!(store.snapshot(&BlockHash::dummy(20)).await, Some(QuorumSnapshot::default()));
        let view = store.view().await;
        assert_eq!(view.lists.len(), 3);
        assert!(view.quorum_snapshot(&BlockHash::dummy(20)).is_some());
    }

    #[tokio::test]
    async fn test_reopen_loads_persisted_lists() {
        let persistent = Arc::new(MemoryPersistentStore::new());
        let store = MasternodeListStore::open(persistent.clone(), 4).await.unwrap();
        store.commit(list_at(10, 2)).await.unwrap();
        store
            .commit_all(vec![list_at(20, 2)], BTreeMap::from([(BlockHash::dummy(20), QuorumSnapshot::default())]))
            .await
            .unwrap();
        drop(store);

        let store = MasternodeListStore::open(persistent, 4).await.unwrap();
        assert_eq!(store.known_masternode_lists_count().await, 2);
        assert!(store.snapshot(&BlockHash::dummy(20)).await.is_some());
    }

    #[tokio::test]
    async fn test_height_bookkeeping() {
        let store = store_with(&[30, 10, 20], 4).await;
        assert_eq!(store.earliest_masternode_list_block_height().await, Some(10));
        assert_eq!(store.last_masternode_list_block_height().await, Some(30));
        assert_eq!(store.last_masternode_list().await.unwrap().known_height, 30);
        let recent: Vec<_> =
            store.recent_masternode_lists(2).await.iter().map(|l| l.known_height).collect();
        assert_eq!(recent, vec![30, 20]);

        store.remove_all().await.unwrap();
        assert_eq!(store.known_masternode_lists_count().await, 0);
        assert_eq!(store.last_masternode_list_block_height().await, None);
    }

    #[tokio::test]
    async fn test_closest_known_ancestor_follows_the_chain() {
        let headers = TestHeaderChain::with_dummy_blocks(0..=50);
        let store = store_with(&[10, 20, 40], 4).await;
        let ancestor = store.closest_known_ancestor(&BlockHash::dummy(35), &headers).await;
        assert_eq!(ancestor.unwrap().known_height, 20);
        let ancestor = store.closest_known_ancestor(&BlockHash::dummy(40), &headers).await;
        assert_eq!(ancestor.unwrap().known_height, 40);

        // a list on another branch at 20 is not an ancestor
        let mut forked = TestHeaderChain::with_dummy_blocks(0..=50);
        forked.add_block(BlockHash::from_byte_array([7; 32]), 20, TxMerkleNode::all_zeros());
        let ancestor = store.closest_known_ancestor(&BlockHash::dummy(35), &forked).await;
        assert_eq!(ancestor.unwrap().known_height, 10);

        assert!(store.closest_known_ancestor(&BlockHash::dummy(99), &headers).await.is_none());
    }

    #[tokio::test]
    async fn test_prune_keeps_recent_and_pinned_lists() {
        let store = store_with(&[10, 20, 30, 40, 50], 2).await;
        store.pin(&BlockHash::dummy(20)).await;
        store.pin(&BlockHash::dummy(20)).await;
        store.unpin(&BlockHash::dummy(20)).await;
        assert!(store.is_pinned(&BlockHash::dummy(20)).await);

        let headers = TestHeaderChain::with_dummy_blocks(0..=50);
        let removed = store.prune_below(45, &headers).await.unwrap();
        assert_eq!(removed, 2);
        let mut heights: Vec<_> =
            store.recent_masternode_lists(10).await.iter().map(|l| l.known_height).collect();
        heights.sort();
        assert_eq!(heights, vec![20, 40, 50]);

        store.unpin(&BlockHash::dummy(20)).await;
        assert_eq!(store.prune_below(45, &headers).await.unwrap(), 1);
    }

    /// A list at 120 carrying an unverified quorum mined at 100.
    fn tip_with_unverified_quorum() -> Arc<MasternodeList> {
        let quorum = TestQuorum::non_rotating_for_test([0; 32], 4).commitment;
        let quorum = QuorumEntry {
            quorum_hash: QuorumHash::from(BlockHash::dummy(100)),
            llmq_type: LLMQType::LlmqtypeTest,
            ..quorum
        };
        let diff = DiffBuilder::new(BlockHash::all_zeros(), BlockHash::dummy(120), 120)
            .add_quorums([quorum])
            .build();
        let tip = MasternodeList::apply_diff(None, &diff, 120).unwrap().list;
        assert!(tip.has_unverified_non_rotated_quorums());
        Arc::new(tip)
    }

    #[tokio::test]
    async fn test_prune_keeps_lists_of_unverified_quorums() {
        let headers = TestHeaderChain::with_dummy_blocks(0..=200);
        let store = store_with(&[80, 92, 100], 1).await;
        store.commit(tip_with_unverified_quorum()).await.unwrap();

        assert_eq!(store.prune_below(120, &headers).await.unwrap(), 1);
        assert!(store.contains(&BlockHash::dummy(92)).await);
        assert!(store.contains(&BlockHash::dummy(100)).await);
        assert!(!store.contains(&BlockHash::dummy(80)).await);
    }

    #[tokio::test]
    async fn test_prune_keeps_work_list_without_list_at_quorum_block() {
        let headers = TestHeaderChain::with_dummy_blocks(0..=200);
        let store = store_with(&[80, 92], 1).await;
        store.commit(tip_with_unverified_quorum()).await.unwrap();

        assert_eq!(store.prune_below(120, &headers).await.unwrap(), 1);
        assert!(store.contains(&BlockHash::dummy(92)).await);
        assert!(!store.contains(&BlockHash::dummy(80)).await);

        // without a header for the quorum block, nothing places the quorum
        let store = store_with(&[80, 92], 1).await;
        store.commit(tip_with_unverified_quorum()).await.unwrap();
        let headers = TestHeaderChain::with_dummy_blocks(0..=90);
        assert_eq!(store.prune_below(120, &headers).await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_prune_removes_snapshots_of_pruned_blocks() {
        let headers = TestHeaderChain::with_dummy_blocks(0..=200);
        let persistent = Arc::new(MemoryPersistentStore::new());
        let store = MasternodeListStore::open(persistent.clone(), 1).await.unwrap();
        let snapshots = BTreeMap::from([
            (BlockHash::dummy(10), QuorumSnapshot::default()),
            (BlockHash::dummy(96), QuorumSnapshot::default()),
            (BlockHash::dummy(110), QuorumSnapshot::default()),
        ]);
        store.commit_all(vec![list_at(10, 2)], snapshots).await.unwrap();
        store.commit(tip_with_unverified_quorum()).await.unwrap();

        assert_eq!(store.prune_below(120, &headers).await.unwrap(), 1);
        assert!(!store.contains(&BlockHash::dummy(10)).await);
        assert!(store.snapshot(&BlockHash::dummy(10)).await.is_none());
        assert!(persistent.load_quorum_snapshot(&BlockHash::dummy(10)).await.unwrap().is_none());
        // 96 lies in the work block range of the unverified quorum at 100
        assert!(store.snapshot(&BlockHash::dummy(96)).await.is_some());
        assert!(store.snapshot(&BlockHash::dummy(110)).await.is_none());
        assert_eq!(persistent.quorum_snapshot_index().await.unwrap(), vec![BlockHash::dummy(96)]);

        // a reopened store only sees what is left
        drop(store);
        let store = MasternodeListStore::open(persistent, 1).await.unwrap();
        assert_eq!(store.view().await.snapshots.len(), 1);
    }

    /// Fails every list save after the first `allowed`.
    struct FailingPersistentStore {
        inner: MemoryPersistentStore,
        allowed: AtomicUsize,
    }

    #[async_trait]
    impl PersistentStore for FailingPersistentStore {
        async fn load_masternode_list(
            &self,
            block_hash: &BlockHash,
        ) -> StorageResult<Option<MasternodeList>> {
            self.inner.load_masternode_list(block_hash).await
        }

        async fn save_masternode_list(&self, list: &MasternodeList) -> StorageResult<()> {
            let remaining = self.allowed.load(Ordering::SeqCst);
            if remaining == 0 {
                return Err(StorageError::WriteFailed("disk full".into()));
            }
            self.allowed.store(remaining - 1, Ordering::SeqCst);
            self.inner.save_masternode_list(list).await
        }

        async fn delete_masternode_list(&self, block_hash: &BlockHash) -> StorageResult<()> {
            self.inner.delete_masternode_list(block_hash).await
        }

        async fn masternode_list_index(&self) -> StorageResult<Vec<(CoreBlockHeight, BlockHash)>> {
            self.inner.masternode_list_index().await
        }

        async fn load_quorum_snapshot(
            &self,
            block_hash: &BlockHash,
        ) -> StorageResult<Option<QuorumSnapshot>> {
            self.inner.load_quorum_snapshot(block_hash).await
        }

        async fn save_quorum_snapshot(
            &self,
            block_hash: &BlockHash,
            snapshot: &QuorumSnapshot,
        ) -> StorageResult<()> {
            self.inner.save_quorum_snapshot(block_hash, snapshot).await
        }

        async fn delete_quorum_snapshot(&self, block_hash: &BlockHash) -> StorageResult<()> {
            self.inner.delete_quorum_snapshot(block_hash).await
        }

        async fn quorum_snapshot_index(&self) -> StorageResult<Vec<BlockHash>> {
            self.inner.quorum_snapshot_index().await
        }

        async fn clear(&self) -> StorageResult<()> {
            self.inner.clear().await
        }
    }

    #[tokio::test]
    async fn test_failed_commit_leaves_nothing_behind() {
        let persistent = Arc::new(FailingPersistentStore {
            inner: MemoryPersistentStore::new(),
            allowed: AtomicUsize::new(1),
        });
        let store = MasternodeListStore::open(persistent.clone(), 4).await.unwrap();
        let snapshots = BTreeMap::from([(BlockHash::dummy(10), QuorumSnapshot::default())]);

        let result = store.commit_all(vec![list_at(10, 2), list_at(20, 2)], snapshots).await;
        assert_matches!(result, Err(StorageError::WriteFailed(_)));
        assert_eq!(store.known_masternode_lists_count().await, 0);
        assert!(store.snapshot(&BlockHash::dummy(10)).await.is_none());
        assert!(persistent.masternode_list_index().await.unwrap().is_empty());
        assert!(persistent.quorum_snapshot_index().await.unwrap().is_empty());

        drop(store);
        let store = MasternodeListStore::open(persistent, 4).await.unwrap();
        assert_eq!(store.known_masternode_lists_count().await, 0);
    }

    #[tokio::test]
    async fn test_delete_empty_lists() {
        let store = store_with(&[10, 20], 4).await;
        store.commit(list_at(30, 0)).await.unwrap();
        store.commit(list_at(40, 0)).await.unwrap();
        store.pin(&BlockHash::dummy(40)).await;
        assert_eq!(store.delete_empty_masternode_lists().await.unwrap(), 1);
        assert!(!store.contains(&BlockHash::dummy(30)).await);
        assert!(store.contains(&BlockHash::dummy(40)).await);
    }
}
