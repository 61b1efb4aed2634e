use std::collections::BTreeMap;
use std::ops::RangeInclusive;

use hashes::Hash;

use crate::network::message_sml::MnListDiff;
use crate::prelude::CoreBlockHeight;
use crate::processor::HeaderChain;
use crate::test_utils::DiffBuilder;
use crate::{BlockHash, TxMerkleNode};

/// An in memory header chain.
#[derive(Clone, Debug, Default)]
pub struct TestHeaderChain {
    heights: BTreeMap<BlockHash, CoreBlockHeight>,
    hashes: BTreeMap<CoreBlockHeight, BlockHash>,
    merkle_roots: BTreeMap<BlockHash, TxMerkleNode>,
}

impl TestHeaderChain {
    pub fn new() -> Self {
        Self::default()
    }

    /// A chain with a [`BlockHash::dummy`] block at each height, whose merkle root
    /// proves nothing until a diff is registered for it.
    pub fn with_dummy_blocks(heights: RangeInclusive<CoreBlockHeight>) -> Self {
        let mut chain = Self::new();
        for height in heights {
            chain.add_block(BlockHash::dummy(height), height, TxMerkleNode::all_zeros());
        }
        chain
    }

    /// Adds a block, replacing whatever was known at `height`.
    pub fn add_block(&mut self, block_hash: BlockHash, height: CoreBlockHeight, merkle_root: TxMerkleNode) {
        if let Some(previous) = self.hashes.insert(height, block_hash) {
            self.heights.remove(&previous);
            self.merkle_roots.remove(&previous);
        }
        self.heights.insert(block_hash, height);
        self.merkle_roots.insert(block_hash, merkle_root);
    }

    /// Adds the block a diff built by [`DiffBuilder`] leads to.
    pub fn add_diff(&mut self, diff: &MnListDiff, height: CoreBlockHeight) {
        self.add_block(diff.block_hash, height, DiffBuilder::merkle_root(diff));
    }
}

impl HeaderChain for TestHeaderChain {
    fn height_for_block_hash(&self, block_hash: &BlockHash) -> Option<CoreBlockHeight> {
        self.heights.get(block_hash).copied()
    }

    fn block_hash_at_height(&self, height: CoreBlockHeight) -> Option<BlockHash> {
        self.hashes.get(&height).copied()
    }

    fn merkle_root_for_block_hash(&self, block_hash: &BlockHash) -> Option<TxMerkleNode> {
        self.merkle_roots.get(block_hash).copied()
    }
}
