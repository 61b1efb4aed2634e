//! Masternode list synchronization against one download peer.
//!
//! The manager drives the [`RetrievalScheduler`]: it turns the next scheduled block
//! into a `getmnlistd` or `getqrinfo`, waits for the answer with a timeout, hands the
//! payload to the [`MasternodeProcessor`] on a blocking worker and acts on the
//! verdict. Verified lists are committed to the store before anyone is told about
//! them; a message is committed whole or not at all.

use std::collections::BTreeMap;
use std::sync::Arc;

use dash_sml::BlockHash;
use dash_sml::hashes::Hash;
use dash_sml::network::message_qrinfo::QuorumSnapshot;
use dash_sml::prelude::CoreBlockHeight;
use dash_sml::processor::{
    HeaderChain, MasternodeProcessor, MnListDiffResult, ProcessedDiff, ProcessedQrInfo,
    ProcessingError, ProcessingState, RejectReason,
};
use dash_sml::sml::masternode_list::MasternodeList;
use dash_sml::sml::quorum_entry::qualified_quorum_entry::QualifiedQuorumEntry;
use tokio_util::sync::CancellationToken;

use crate::config::MasternodeSyncConfig;
use crate::error::{NetworkError, SyncError, SyncResult};
use crate::event_bus::{EventBus, EventReceiver};
use crate::network::{Peer, PeerReport};
use crate::store::MasternodeListStore;
use crate::sync::events::{MasternodeEvent, MasternodeListListener};
use crate::sync::request::{DiffRequest, MasternodeRequest, RequestKind, RotationRequest};
use crate::sync::scheduler::{RetrievalScheduler, ScheduledBlock};
use crate::types::{PeerId, SyncProgress};

/// Known lists offered as bases in a `getqrinfo`.
const MAX_QR_INFO_BASE_HASHES: usize = 4;

/// What one request ended with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StepOutcome {
    /// Nothing left to request.
    Idle,
    /// The lists of the message were committed. Lists already known are not counted.
    Committed {
        block_hash: BlockHash,
        lists: usize,
    },
    /// The message waits for other lists, now queued ahead of it.
    Pending {
        block_hash: BlockHash,
        missing: usize,
    },
    /// The request timed out and was requeued, unless it ran out of retries.
    TimedOut {
        block_hash: BlockHash,
    },
    /// The block was dropped from retrieval.
    Abandoned {
        block_hash: BlockHash,
    },
    /// The peer sent an invalid message.
    Rejected {
        block_hash: BlockHash,
        reason: RejectReason,
        report: PeerReport,
    },
}

enum Processed {
    Diff(ProcessedDiff),
    QrInfo(ProcessedQrInfo),
}

impl Processed {
    fn state(&self) -> &ProcessingState {
        match self {
            Processed::Diff(processed) => &processed.state,
            Processed::QrInfo(processed) => &processed.state,
        }
    }

    /// The block the answer is about, if it could be decoded.
    fn answered_block(&self) -> Option<BlockHash> {
        match self {
            Processed::Diff(processed) => Some(processed.result.block_hash),
            Processed::QrInfo(processed) => {
                processed.result.as_ref().map(|result| result.result_at_tip.block_hash)
            }
        }
    }
}

pub struct MasternodeSyncManager {
    config: MasternodeSyncConfig,
    store: Arc<MasternodeListStore>,
    headers: Arc<dyn HeaderChain + Send + Sync>,
    scheduler: RetrievalScheduler,
    events: EventBus<MasternodeEvent>,
    listeners: Vec<Arc<dyn MasternodeListListener>>,
    /// Cancels whatever is outstanding toward the current download peer.
    cancel: CancellationToken,
}

impl MasternodeSyncManager {
    pub fn new(
        config: MasternodeSyncConfig,
        store: Arc<MasternodeListStore>,
        headers: Arc<dyn HeaderChain + Send + Sync>,
    ) -> Self {
        let scheduler = RetrievalScheduler::new(&config);
        Self {
            config,
            store,
            headers,
            scheduler,
            events: EventBus::default(),
            listeners: vec![],
            cancel: CancellationToken::new(),
        }
    }

    pub fn subscribe(&self) -> EventReceiver<MasternodeEvent> {
        self.events.subscribe()
    }

    pub fn add_listener(&mut self, listener: Arc<dyn MasternodeListListener>) {
        self.listeners.push(listener);
    }

    pub fn store(&self) -> &Arc<MasternodeListStore> {
        &self.store
    }

    pub fn scheduler(&self) -> &RetrievalScheduler {
        &self.scheduler
    }

    pub fn progress(&self) -> SyncProgress {
        self.scheduler.progress()
    }

    /// Token cancelling the requests toward the current download peer.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Wants the lists at `block_hashes`, oldest first, the last one being the tip.
    /// Lists already in the store are not requested.
    pub async fn request_lists(&mut self, block_hashes: impl IntoIterator<Item = BlockHash>) {
        let mut wanted = vec![];
        for block_hash in block_hashes {
            if !self.store.contains(&block_hash).await {
                wanted.push(block_hash);
            }
        }
        self.scheduler.enqueue_blocks(wanted);
    }

    /// Stops using `peer`: cancels its outstanding request and requeues what was in
    /// flight toward it.
    pub fn switch_peer(&mut self, peer: PeerId) -> Vec<BlockHash> {
        self.cancel.cancel();
        self.cancel = CancellationToken::new();
        self.scheduler.peer_lost(peer)
    }

    /// Requests lists from `peer` until the queue drains.
    ///
    /// Stops with `PeerLost` when the peer goes away and with the rejection when it
    /// sends an invalid message; the caller is expected to switch peers and call again.
    /// Fails with `Timeout` when the whole sync takes longer than configured.
    pub async fn sync(&mut self, peer: &dyn Peer) -> SyncResult<SyncProgress> {
        let sync_timeout = self.config.sync_timeout;
        let outcome = tokio::time::timeout(sync_timeout, self.run(peer)).await;
        match outcome {
            Ok(result) => result,
            Err(_) => {
                tracing::warn!("Masternode list sync did not finish within {:?}", sync_timeout);
                self.switch_peer(peer.id());
                Err(SyncError::Timeout(format!("sync did not finish within {:?}", sync_timeout)))
            }
        }
    }

    async fn run(&mut self, peer: &dyn Peer) -> SyncResult<SyncProgress> {
        loop {
            match self.step(peer).await? {
                StepOutcome::Idle => break,
                StepOutcome::Rejected {
                    reason,
                    ..
                } => return Err(reason.into()),
                outcome => tracing::trace!("Masternode sync step: {:?}", outcome),
            }
        }

        let last_height = self.store.last_masternode_list_block_height().await;
        if let Some(height) = last_height {
            let pruned = self.store.prune_below(height, self.headers.as_ref()).await?;
            if pruned > 0 {
                tracing::debug!("Pruned {} lists after sync", pruned);
            }
        }
        tracing::info!("Masternode list sync complete at {:?}", last_height);
        self.events.emit(MasternodeEvent::SyncComplete {
            height: last_height,
        });
        Ok(self.scheduler.progress())
    }

    /// Sends the next scheduled request to `peer` and processes the answer.
    pub async fn step(&mut self, peer: &dyn Peer) -> SyncResult<StepOutcome> {
        let Some(block) = self.scheduler.next() else {
            return Ok(StepOutcome::Idle);
        };
        if self.store.contains(&block.block_hash).await {
            tracing::debug!("List {} is already known", block.block_hash);
            self.scheduler.complete(&block.block_hash, None);
            return Ok(StepOutcome::Committed {
                block_hash: block.block_hash,
                lists: 0,
            });
        }

        let request = match self.build_request(&block).await {
            Ok(request) => request,
            Err(e) => {
                tracing::warn!("Cannot request list {}: {}", block.block_hash, e);
                return Ok(self.abandon(block.block_hash));
            }
        };
        tracing::debug!("Requesting {} from {}", request, peer.id());
        self.scheduler.mark_sent(block.block_hash, peer.id());

        let payload = match self.send(peer, &request).await {
            Ok(payload) => payload,
            Err(NetworkError::Timeout) => {
                tracing::warn!("{} timed out on {}", peer.id(), request);
                if self.scheduler.timed_out(block.block_hash) {
                    return Ok(StepOutcome::TimedOut {
                        block_hash: block.block_hash,
                    });
                }
                return Ok(self.abandon(block.block_hash));
            }
            Err(NetworkError::RequestFailed(e)) => {
                tracing::warn!("{} failed on {}: {}", peer.id(), request, e);
                if self.scheduler.retry(block.block_hash) {
                    return Ok(StepOutcome::TimedOut {
                        block_hash: block.block_hash,
                    });
                }
                return Ok(self.abandon(block.block_hash));
            }
            Err(NetworkError::PeerDisconnected) | Err(NetworkError::Cancelled) => {
                self.scheduler.peer_lost(peer.id());
                return Err(SyncError::PeerLost(peer.id()));
            }
        };

        let processed = match self.process(payload, &block).await {
            Ok(processed) => processed,
            Err(SyncError::Processing(ProcessingError::UnknownBlock(unknown))) => {
                tracing::warn!("Answer for {} refers to unknown block {}", block.block_hash, unknown);
                return Ok(self.abandon(block.block_hash));
            }
            Err(SyncError::Processing(ProcessingError::UnknownHeight(height))) => {
                tracing::warn!("Answer for {} needs a header at {}", block.block_hash, height);
                return Ok(self.abandon(block.block_hash));
            }
            Err(e) => {
                self.scheduler.retry(block.block_hash);
                return Err(e);
            }
        };
        self.handle(peer.id(), &block, processed).await
    }

    async fn build_request(&self, block: &ScheduledBlock) -> SyncResult<MasternodeRequest> {
        let height = self.headers.height_for_block_hash(&block.block_hash).ok_or_else(|| {
            SyncError::InvalidState(format!("Block {} is not in the header chain", block.block_hash))
        })?;
        match block.kind {
            RequestKind::Diff => {
                let base_block_hash = self
                    .store
                    .closest_known_ancestor(&block.block_hash, self.headers.as_ref())
                    .await
                    .map_or_else(BlockHash::all_zeros, |list| list.block_hash);
                Ok(MasternodeRequest::Diff(DiffRequest {
                    base_block_hash,
                    block_hash: block.block_hash,
                }))
            }
            RequestKind::Rotation => {
                let mut base_block_hashes: Vec<BlockHash> = self
                    .store
                    .recent_masternode_lists(usize::MAX)
                    .await
                    .into_iter()
                    .filter(|list| {
                        list.known_height < height
                            && self.headers.block_hash_at_height(list.known_height)
                                == Some(list.block_hash)
                    })
                    .take(MAX_QR_INFO_BASE_HASHES)
                    .map(|list| list.block_hash)
                    .collect();
                base_block_hashes.reverse();
                Ok(MasternodeRequest::Rotation(RotationRequest {
                    base_block_hashes,
                    block_hash: block.block_hash,
                    extra_share: true,
                }))
            }
        }
    }

    async fn send(&self, peer: &dyn Peer, request: &MasternodeRequest) -> Result<Vec<u8>, NetworkError> {
        let timeout = self.config.request_timeout;
        let response = async {
            match request {
                MasternodeRequest::Diff(request) => peer.request_mn_list_diff(request.into()).await,
                MasternodeRequest::Rotation(request) => peer.request_qr_info(request.into()).await,
            }
        };
        tokio::select! {
            _ = self.cancel.cancelled() => Err(NetworkError::Cancelled),
            result = tokio::time::timeout(timeout, response) => {
                result.unwrap_or(Err(NetworkError::Timeout))
            }
        }
    }

    /// Runs the processor over a view of the store on a blocking worker.
    async fn process(&self, payload: Vec<u8>, block: &ScheduledBlock) -> SyncResult<Processed> {
        let view = self.store.view().await;
        let headers = self.headers.clone();
        let network = self.config.network;
        let kind = block.kind;
        let verification = block.verification;
        let processed = tokio::task::spawn_blocking(move || {
            let processor = MasternodeProcessor::new(network, headers.as_ref(), &view);
            match kind {
                RequestKind::Diff => {
                    processor.process_diff_message(&payload, verification).map(Processed::Diff)
                }
                RequestKind::Rotation => {
                    processor.process_qr_info_message(&payload).map(Processed::QrInfo)
                }
            }
        })
        .await
        .map_err(|e| SyncError::InvalidState(format!("Verification worker failed: {}", e)))??;
        Ok(processed)
    }

    async fn handle(
        &mut self,
        peer: PeerId,
        block: &ScheduledBlock,
        processed: Processed,
    ) -> SyncResult<StepOutcome> {
        let block_hash = block.block_hash;
        let answered = processed.answered_block();
        let state = match (processed.state(), answered) {
            (ProcessingState::Rejected(_), _) => processed.state().clone(),
            (_, Some(answered)) if answered != block_hash => {
                ProcessingState::Rejected(RejectReason::MalformedMessage(format!(
                    "answer is about block {} instead of {}",
                    answered, block_hash
                )))
            }
            (state, _) => state.clone(),
        };

        match state {
            ProcessingState::Rejected(reason) => Ok(self.reject(peer, block_hash, reason)),
            ProcessingState::Pending(missing) => {
                tracing::debug!("{} waits for {} lists", block_hash, missing.len());
                let count = missing.len();
                match self.scheduler.enqueue_dependencies(block_hash, missing) {
                    Ok(()) => Ok(StepOutcome::Pending {
                        block_hash,
                        missing: count,
                    }),
                    Err(e) => {
                        tracing::warn!("Giving up on {}: {}", block_hash, e);
                        Ok(self.abandon(block_hash))
                    }
                }
            }
            ProcessingState::QuorumsChecked => match processed {
                Processed::Diff(processed) => self.commit_diff(block_hash, processed).await,
                Processed::QrInfo(processed) => self.commit_qr_info(block_hash, processed).await,
            },
            other => Err(SyncError::InvalidState(format!(
                "Processing of {} ended in state {}",
                block_hash, other
            ))),
        }
    }

    async fn commit_diff(
        &mut self,
        block_hash: BlockHash,
        mut processed: ProcessedDiff,
    ) -> SyncResult<StepOutcome> {
        let Some(list) = processed.list.clone() else {
            return Err(SyncError::InvalidState(format!("No list to commit for {}", block_hash)));
        };
        let committed = self.store.commit(list.clone()).await?;
        processed.mark_committed()?;
        self.scheduler.complete(&block_hash, committed.then_some(list.known_height));
        if committed {
            self.announce(&list, &processed.result);
        }
        Ok(StepOutcome::Committed {
            block_hash,
            lists: usize::from(committed),
        })
    }

    async fn commit_qr_info(
        &mut self,
        block_hash: BlockHash,
        mut processed: ProcessedQrInfo,
    ) -> SyncResult<StepOutcome> {
        let lists = std::mem::take(&mut processed.lists);
        let snapshots: BTreeMap<BlockHash, QuorumSnapshot> = std::mem::take(&mut processed.snapshots);
        let committed = self.store.commit_all(lists, snapshots).await?;
        processed.mark_committed()?;

        let results: BTreeMap<BlockHash, &MnListDiffResult> = processed
            .result
            .iter()
            .flat_map(|result| result.diff_results())
            .map(|result| (result.block_hash, result))
            .collect();
        for list in &committed {
            if self.scheduler.is_in_retrieval(&list.block_hash) && list.block_hash != block_hash {
                self.scheduler.complete(&list.block_hash, Some(list.known_height));
            }
            if let Some(result) = results.get(&list.block_hash) {
                self.announce(list, result);
            }
        }
        let height = committed
            .iter()
            .find(|list| list.block_hash == block_hash)
            .map(|list| list.known_height);
        self.scheduler.complete(&block_hash, height);
        if let Some(result) = &processed.result {
            for quorum in result.last_quorum_per_index.iter().filter(|q| q.is_verified()) {
                self.announce_quorum(quorum);
            }
        }
        Ok(StepOutcome::Committed {
            block_hash,
            lists: committed.len(),
        })
    }

    /// Tells listeners and subscribers about a committed list and its verified quorums.
    fn announce(&self, list: &Arc<MasternodeList>, result: &MnListDiffResult) {
        tracing::info!(
            "Committed masternode list {} at {} (+{} ~{} -{})",
            list.block_hash,
            list.known_height,
            result.added_masternodes.len(),
            result.modified_masternodes.len(),
            result.removed_masternodes.len()
        );
        for listener in &self.listeners {
            listener.on_masternode_list_committed(
                list,
                &result.added_masternodes,
                &result.modified_masternodes,
                &result.removed_masternodes,
            );
        }
        self.events.emit(MasternodeEvent::ListCommitted {
            block_hash: list.block_hash,
            height: list.known_height,
            added: result.added_masternodes.len(),
            modified: result.modified_masternodes.len(),
            removed: result.removed_masternodes.len(),
        });
        for quorum in result.added_quorums.iter().filter(|q| q.is_verified()) {
            self.announce_quorum(quorum);
        }
    }

    fn announce_quorum(&self, quorum: &QualifiedQuorumEntry) {
        for listener in &self.listeners {
            listener.on_quorum_verified(quorum);
        }
        self.events.emit(MasternodeEvent::QuorumVerified {
            llmq_type: quorum.quorum_entry.llmq_type,
            quorum_hash: quorum.quorum_entry.quorum_hash,
        });
    }

    fn reject(&mut self, peer: PeerId, block_hash: BlockHash, reason: RejectReason) -> StepOutcome {
        tracing::warn!("{} sent an invalid list for {}: {}", peer, block_hash, reason);
        self.events.emit(MasternodeEvent::MessageRejected {
            peer,
            block_hash,
            reason: reason.to_string(),
        });
        let report = self.scheduler.report_faulty(peer);
        self.events.emit(MasternodeEvent::PeerReported(report));
        if !self.scheduler.retry(block_hash) {
            self.events.emit(MasternodeEvent::RetrievalAbandoned {
                block_hash,
            });
        }
        StepOutcome::Rejected {
            block_hash,
            reason,
            report,
        }
    }

    fn abandon(&mut self, block_hash: BlockHash) -> StepOutcome {
        tracing::warn!("Abandoning retrieval of list {}", block_hash);
        self.scheduler.complete(&block_hash, None);
        self.events.emit(MasternodeEvent::RetrievalAbandoned {
            block_hash,
        });
        StepOutcome::Abandoned {
            block_hash,
        }
    }

    /// Height of the most recent committed list.
    pub async fn last_height(&self) -> Option<CoreBlockHeight> {
        self.store.last_masternode_list_block_height().await
    }
}
