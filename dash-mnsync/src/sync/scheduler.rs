//! Decides which list is requested next.
//!
//! The scheduler keeps one queue of block hashes whose lists are wanted. Each hash
//! carries the kind of request that retrieves it and how deep it sits in a chain of
//! dependencies. Lists a message was pending on go to the front of the queue, ahead
//! of the message that needs them, so that they are committed first.

use std::collections::HashMap;

use dash_sml::BlockHash;
use dash_sml::prelude::CoreBlockHeight;
use dash_sml::processor::QuorumVerification;

use crate::config::MasternodeSyncConfig;
use crate::error::{SyncError, SyncResult};
use crate::network::PeerReport;
use crate::sync::download_coordinator::{DownloadConfig, DownloadCoordinator};
use crate::sync::request::RequestKind;
use crate::types::{PeerId, SyncMode, SyncProgress};

/// A block taken off the queue, ready to be turned into a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScheduledBlock {
    pub block_hash: BlockHash,
    pub kind: RequestKind,
    /// 0 for wanted blocks, n for the dependencies of a block at depth n - 1.
    pub depth: usize,
    pub verification: QuorumVerification,
}

#[derive(Debug, Clone, Copy)]
struct QueuedBlock {
    kind: RequestKind,
    depth: usize,
}

#[derive(Debug)]
pub struct RetrievalScheduler {
    mode: SyncMode,
    coordinator: DownloadCoordinator<BlockHash>,
    /// Request kind and depth of every block queued or in flight.
    blocks: HashMap<BlockHash, QueuedBlock>,
    /// Invalid messages seen per peer since its last report.
    faults: HashMap<PeerId, usize>,
    max_faulty_peers: usize,
    max_dependency_depth: usize,
    committed: usize,
    last_height: Option<CoreBlockHeight>,
}

impl RetrievalScheduler {
    pub fn new(config: &MasternodeSyncConfig) -> Self {
        Self {
            mode: config.mode,
            coordinator: DownloadCoordinator::new(
                DownloadConfig::default()
                    .with_max_concurrent(1)
                    .with_timeout(config.request_timeout)
                    .with_max_retries(config.max_retries),
            ),
            blocks: HashMap::new(),
            faults: HashMap::new(),
            max_faulty_peers: config.max_faulty_peers,
            max_dependency_depth: config.max_dependency_depth,
            committed: 0,
            last_height: None,
        }
    }

    pub fn mode(&self) -> SyncMode {
        self.mode
    }

    fn kind_for_wanted_block(&self, is_tip: bool) -> RequestKind {
        match self.mode {
            SyncMode::Diff => RequestKind::Diff,
            SyncMode::Rotation => RequestKind::Rotation,
            SyncMode::Mixed if is_tip => RequestKind::Rotation,
            SyncMode::Mixed => RequestKind::Diff,
        }
    }

    /// Queues wanted blocks, oldest first. The last one is the tip.
    ///
    /// Blocks already queued or in flight are not queued twice.
    pub fn enqueue_blocks(&mut self, block_hashes: impl IntoIterator<Item = BlockHash>) {
        let block_hashes: Vec<BlockHash> = block_hashes.into_iter().collect();
        let count = block_hashes.len();
        let mut queued = 0;
        for (position, block_hash) in block_hashes.into_iter().enumerate() {
            if self.blocks.contains_key(&block_hash) {
                continue;
            }
            let kind = self.kind_for_wanted_block(position + 1 == count);
            self.blocks.insert(block_hash, QueuedBlock { kind, depth: 0 });
            self.coordinator.enqueue([block_hash]);
            queued += 1;
        }
        if queued > 0 {
            tracing::info!("Queued {} masternode lists ({} remaining)", queued, self.coordinator.remaining());
        }
    }

    /// Queues the lists `block_hash` is pending on ahead of it, and `block_hash` right
    /// after them.
    ///
    /// Fails with `MissingDependency` when the dependencies would sit deeper than the
    /// configured bound, in which case `block_hash` is dropped.
    pub fn enqueue_dependencies(
        &mut self,
        block_hash: BlockHash,
        missing: impl IntoIterator<Item = BlockHash>,
    ) -> SyncResult<()> {
        let original = self.blocks.get(&block_hash).copied().unwrap_or(QueuedBlock {
            kind: self.kind_for_wanted_block(false),
            depth: 0,
        });
        let depth = original.depth + 1;
        self.coordinator.receive(&block_hash);
        let missing: Vec<BlockHash> =
            missing.into_iter().filter(|hash| *hash != block_hash).collect();
        if depth > self.max_dependency_depth {
            self.forget(&block_hash);
            return Err(SyncError::MissingDependency(format!(
                "{} still misses {} lists at depth {}",
                block_hash,
                missing.len(),
                depth
            )));
        }

        let mut front = Vec::with_capacity(missing.len() + 1);
        for dependency in missing {
            if self.coordinator.is_in_flight(&dependency) {
                continue;
            }
            let entry = self.blocks.entry(dependency).or_insert(QueuedBlock {
                kind: RequestKind::Diff,
                depth,
            });
            entry.depth = entry.depth.max(depth);
            front.push(dependency);
        }
        tracing::debug!("{} waits for {} lists at depth {}", block_hash, front.len(), depth);
        self.blocks.insert(block_hash, original);
        front.push(block_hash);
        self.coordinator.enqueue_front(front);
        Ok(())
    }

    /// Takes the next block to request, if nothing is in flight.
    pub fn next(&mut self) -> Option<ScheduledBlock> {
        let block_hash = self.coordinator.take_next()?;
        let Some(queued) = self.blocks.get(&block_hash).copied() else {
            tracing::warn!("Queued block {} has no request kind, skipping", block_hash);
            return None;
        };
        // the deepest dependencies are committed without checking their quorums
        let verification = if queued.depth >= self.max_dependency_depth {
            QuorumVerification::Skip
        } else {
            QuorumVerification::Verify
        };
        Some(ScheduledBlock {
            block_hash,
            kind: queued.kind,
            depth: queued.depth,
            verification,
        })
    }

    pub fn mark_sent(&mut self, block_hash: BlockHash, peer: PeerId) {
        self.coordinator.mark_sent(block_hash, peer);
    }

    /// The block's list was committed, or the block is no longer wanted.
    pub fn complete(&mut self, block_hash: &BlockHash, height: Option<CoreBlockHeight>) {
        self.coordinator.receive(block_hash);
        self.forget(block_hash);
        if let Some(height) = height {
            self.committed += 1;
            self.last_height = Some(self.last_height.map_or(height, |last| last.max(height)));
        }
    }

    /// The request for `block_hash` got no answer in time.
    ///
    /// Returns false when the block exceeded its retries and was dropped.
    pub fn timed_out(&mut self, block_hash: BlockHash) -> bool {
        self.coordinator.receive(&block_hash);
        self.coordinator.record_timeouts(1);
        self.retry(block_hash)
    }

    /// Requeues a block whose answer was unusable. Returns false when it was dropped.
    pub fn retry(&mut self, block_hash: BlockHash) -> bool {
        self.coordinator.receive(&block_hash);
        if self.coordinator.enqueue_retry(block_hash) {
            true
        } else {
            self.forget(&block_hash);
            false
        }
    }

    /// Moves every request in flight toward `peer` back to the front of the queue.
    pub fn peer_lost(&mut self, peer: PeerId) -> Vec<BlockHash> {
        let moved = self.coordinator.requeue_peer(peer);
        if !moved.is_empty() {
            tracing::info!("Requeued {} requests of lost {}", moved.len(), peer);
        }
        moved
    }

    /// Records that `peer` sent an invalid message.
    ///
    /// The peer is to be banned once it reaches the tolerated number of faults, and
    /// only disconnected before that.
    pub fn report_faulty(&mut self, peer: PeerId) -> PeerReport {
        let faults = self.faults.entry(peer).or_insert(0);
        *faults += 1;
        if *faults >= self.max_faulty_peers {
            self.faults.remove(&peer);
            tracing::warn!("{} sent too many invalid masternode lists", peer);
            PeerReport::Ban(peer)
        } else {
            PeerReport::Faulty(peer)
        }
    }

    pub fn faults_of(&self, peer: PeerId) -> usize {
        self.faults.get(&peer).copied().unwrap_or(0)
    }

    fn forget(&mut self, block_hash: &BlockHash) {
        self.coordinator.remove(block_hash);
        self.blocks.remove(block_hash);
    }

    /// Whether `block_hash` is queued or in flight.
    pub fn is_in_retrieval(&self, block_hash: &BlockHash) -> bool {
        self.coordinator.contains(block_hash)
    }

    pub fn is_in_flight(&self, block_hash: &BlockHash) -> bool {
        self.coordinator.is_in_flight(block_hash)
    }

    /// Whether the last block of the queue, the most recent one wanted, is `block_hash`.
    pub fn has_latest_block_in_retrieval_queue_with_hash(&self, block_hash: &BlockHash) -> bool {
        self.coordinator.pending().last() == Some(block_hash)
    }

    pub fn is_idle(&self) -> bool {
        self.coordinator.is_empty()
    }

    pub fn retrieval_queue_count(&self) -> usize {
        self.coordinator.pending_count()
    }

    pub fn retrieval_queue_max_amount(&self) -> usize {
        self.coordinator.max_amount()
    }

    pub fn timed_out_attempts(&self) -> u32 {
        self.coordinator.timed_out_attempts()
    }

    pub fn progress(&self) -> SyncProgress {
        SyncProgress {
            queued: self.coordinator.pending_count(),
            in_flight: self.coordinator.active_count(),
            max_amount: self.coordinator.max_amount(),
            committed: self.committed,
            last_height: self.last_height,
        }
    }

    /// Drops every queued and in-flight block.
    pub fn clear(&mut self) {
        self.coordinator.clear();
        self.blocks.clear();
    }
}
