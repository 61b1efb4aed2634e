//! What the processor needs from the rest of the client.

use std::collections::BTreeMap;
use std::sync::Arc;

use crate::network::message_qrinfo::QuorumSnapshot;
use crate::prelude::CoreBlockHeight;
use crate::sml::masternode_list::MasternodeList;
use crate::{BlockHash, TxMerkleNode};

/// Read access to the block headers the client already trusts.
pub trait HeaderChain {
    fn height_for_block_hash(&self, block_hash: &BlockHash) -> Option<CoreBlockHeight>;

    fn block_hash_at_height(&self, height: CoreBlockHeight) -> Option<BlockHash>;

    /// Merkle root of the transactions of the block, from its header.
    fn merkle_root_for_block_hash(&self, block_hash: &BlockHash) -> Option<TxMerkleNode>;
}

/// Read access to committed masternode lists and quorum snapshots.
pub trait MasternodeListProvider {
    fn masternode_list(&self, block_hash: &BlockHash) -> Option<Arc<MasternodeList>>;

    /// The snapshot taken at the work block `block_hash` of a rotation cycle.
    fn quorum_snapshot(&self, block_hash: &BlockHash) -> Option<QuorumSnapshot>;
}

impl MasternodeListProvider for BTreeMap<BlockHash, Arc<MasternodeList>> {
    fn masternode_list(&self, block_hash: &BlockHash) -> Option<Arc<MasternodeList>> {
        self.get(block_hash).cloned()
    }

    fn quorum_snapshot(&self, _block_hash: &BlockHash) -> Option<QuorumSnapshot> {
        None
    }
}

/// Lists and snapshots produced while processing a message, consulted before the
/// committed ones so later steps of the message can use what earlier steps built.
pub struct OverlayProvider<'a, P: ?Sized> {
    base: &'a P,
    pub lists: BTreeMap<BlockHash, Arc<MasternodeList>>,
    pub snapshots: BTreeMap<BlockHash, QuorumSnapshot>,
}

impl<'a, P: MasternodeListProvider + ?Sized> OverlayProvider<'a, P> {
    pub fn new(base: &'a P) -> Self {
        OverlayProvider {
            base,
            lists: BTreeMap::new(),
            snapshots: BTreeMap::new(),
        }
    }

    pub fn insert_list(&mut self, list: Arc<MasternodeList>) {
        self.lists.insert(list.block_hash, list);
    }

    pub fn insert_snapshot(&mut self, block_hash: BlockHash, snapshot: QuorumSnapshot) {
        self.snapshots.insert(block_hash, snapshot);
    }
}

impl<P: MasternodeListProvider + ?Sized> MasternodeListProvider for OverlayProvider<'_, P> {
    fn masternode_list(&self, block_hash: &BlockHash) -> Option<Arc<MasternodeList>> {
        self.lists.get(block_hash).cloned().or_else(|| self.base.masternode_list(block_hash))
    }

    fn quorum_snapshot(&self, block_hash: &BlockHash) -> Option<QuorumSnapshot> {
        self.snapshots.get(block_hash).cloned().or_else(|| self.base.quorum_snapshot(block_hash))
    }
}

#[cfg(test)]
mod tests {
    use hashes::Hash;

    use super::*;

    #[test]
    fn overlay_shadows_the_base() {
        let hash = BlockHash::from_byte_array([1; 32]);
        let mut committed = BTreeMap::new();
        committed.insert(hash, Arc::new(MasternodeList::empty(hash, 1)));

        let mut overlay = OverlayProvider::new(&committed);
        assert_eq!(overlay.masternode_list(&hash).map(|list| list.known_height), Some(1));
        overlay.insert_list(Arc::new(MasternodeList::empty(hash, 2)));
        assert_eq!(overlay.masternode_list(&hash).map(|list| list.known_height), Some(2));

        assert!(overlay.quorum_snapshot(&hash).is_none());
        overlay.insert_snapshot(hash, QuorumSnapshot::default());
        assert!(overlay.quorum_snapshot(&hash).is_some());
    }
}
