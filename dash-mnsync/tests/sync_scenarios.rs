//! Masternode list sync against scripted peers, from request to committed list.

use std::sync::Arc;
use std::time::Duration;

use assert_matches::assert_matches;
use dash_mnsync::network::PeerReport;
use dash_mnsync::storage::{DiskPersistentStore, MemoryPersistentStore};
use dash_mnsync::sync::{MasternodeEvent, StepOutcome};
use dash_mnsync::test_utils::{RecordedRequest, RecordingListener, ScriptedAnswer, ScriptedPeer};
use dash_mnsync::{
    MasternodeListStore, MasternodeSyncConfig, MasternodeSyncManager, PeerId, SyncError, SyncMode,
};
use dash_sml::hashes::Hash;
use dash_sml::network::message_sml::MnListDiff;
use dash_sml::processor::HeaderChain;
use dash_sml::sml::llmq_type::LLMQType;
use dash_sml::sml::masternode_list::MasternodeList;
use dash_sml::sml::masternode_list_entry::MasternodeListEntry;
use dash_sml::test_utils::{DiffBuilder, TestHeaderChain, TestMasternode, TestQuorum};
use dash_sml::{BlockHash, QuorumHash};
use tempfile::TempDir;

fn pool(count: u32) -> Vec<MasternodeListEntry> {
    (0..count).map(|i| TestMasternode::new(i).entry()).collect()
}

fn genesis_diff(height: u32, entries: Vec<MasternodeListEntry>) -> MnListDiff {
    DiffBuilder::new(BlockHash::all_zeros(), BlockHash::dummy(height), height)
        .add_masternodes(entries)
        .build()
}

async fn manager_with(
    config: MasternodeSyncConfig,
    headers: TestHeaderChain,
) -> (MasternodeSyncManager, Arc<RecordingListener>) {
    let store = MasternodeListStore::open(Arc::new(MemoryPersistentStore::new()), config.retention_count)
        .await
        .unwrap();
    let headers: Arc<dyn HeaderChain + Send + Sync> = Arc::new(headers);
    let mut manager = MasternodeSyncManager::new(config, Arc::new(store), headers);
    let listener = Arc::new(RecordingListener::default());
    manager.add_listener(listener.clone());
    (manager, listener)
}

fn diff_config() -> MasternodeSyncConfig {
    MasternodeSyncConfig::regtest().with_mode(SyncMode::Diff)
}

// =============================================================================
// Commit
// =============================================================================

#[tokio::test]
async fn three_entry_diff_is_committed_and_announced() {
    let mut headers = TestHeaderChain::with_dummy_blocks(0..=20);
    let diff = genesis_diff(10, pool(3));
    headers.add_diff(&diff, 10);
    let (mut manager, listener) = manager_with(diff_config(), headers).await;
    let mut events = manager.subscribe();
    let peer = ScriptedPeer::new(1).answer_diff(&diff);

    manager.request_lists([BlockHash::dummy(10)]).await;
    let progress = manager.sync(&peer).await.unwrap();

    assert_eq!(progress.committed, 1);
    assert_eq!(progress.last_height, Some(10));
    assert!(progress.is_complete());
    assert_eq!(
        peer.requests(),
        vec![RecordedRequest::Diff(dash_sml::network::message_sml::GetMnListDiff {
            base_block_hash: BlockHash::all_zeros(),
            block_hash: BlockHash::dummy(10),
        })]
    );

    let list = manager.store().get(&BlockHash::dummy(10)).await.unwrap();
    assert_eq!(list.masternode_count(), 3);
    assert_eq!(*listener.committed.lock().unwrap(), vec![(BlockHash::dummy(10), 3, 0, 0)]);
    assert_matches!(
        events.try_recv(),
        Some(MasternodeEvent::ListCommitted { height: 10, added: 3, .. })
    );
    assert_matches!(events.try_recv(), Some(MasternodeEvent::SyncComplete { height: Some(10) }));
}

#[tokio::test]
async fn known_lists_are_not_requested_again() {
    let mut headers = TestHeaderChain::with_dummy_blocks(0..=20);
    let diff = genesis_diff(10, pool(3));
    headers.add_diff(&diff, 10);
    let (mut manager, _) = manager_with(diff_config(), headers).await;
    let peer = ScriptedPeer::new(1).answer_diff(&diff);

    manager.request_lists([BlockHash::dummy(10)]).await;
    manager.sync(&peer).await.unwrap();
    manager.request_lists([BlockHash::dummy(10)]).await;
    assert!(manager.scheduler().is_idle());
    assert_eq!(manager.step(&peer).await.unwrap(), StepOutcome::Idle);
    assert_eq!(peer.requests().len(), 1);
}

#[tokio::test]
async fn later_diffs_are_requested_from_the_closest_known_ancestor() {
    let mut headers = TestHeaderChain::with_dummy_blocks(0..=40);
    let first = genesis_diff(10, pool(3));
    headers.add_diff(&first, 10);
    let base = MasternodeList::apply_diff(None, &first, 10).unwrap().list;
    let second = DiffBuilder::on_list(&base, BlockHash::dummy(30), 30).add_masternodes(pool(5)).build();
    headers.add_diff(&second, 30);
    let (mut manager, listener) = manager_with(diff_config(), headers).await;
    let peer = ScriptedPeer::new(1).answer_diff(&first).answer_diff(&second);

    manager.request_lists([BlockHash::dummy(10), BlockHash::dummy(30)]).await;
    manager.sync(&peer).await.unwrap();

    assert_matches!(
        peer.requests().last(),
        Some(RecordedRequest::Diff(request)) if request.base_block_hash == BlockHash::dummy(10)
    );
    assert_eq!(manager.store().get(&BlockHash::dummy(30)).await.unwrap().masternode_count(), 5);
    assert_eq!(
        *listener.committed.lock().unwrap(),
        vec![(BlockHash::dummy(10), 3, 0, 0), (BlockHash::dummy(30), 2, 3, 0)]
    );
}

// =============================================================================
// Rejection
// =============================================================================

#[tokio::test]
async fn flipped_root_is_rejected_and_the_peer_reported() {
    let mut headers = TestHeaderChain::with_dummy_blocks(0..=20);
    let honest = genesis_diff(10, pool(3));
    headers.add_diff(&honest, 10);
    let forged = DiffBuilder::new(BlockHash::all_zeros(), BlockHash::dummy(10), 10)
        .add_masternodes(pool(3))
        .with_flipped_masternode_root()
        .build();
    let (mut manager, listener) = manager_with(diff_config(), headers).await;
    let mut events = manager.subscribe();
    let liar = ScriptedPeer::new(1).answer_diff(&forged);

    manager.request_lists([BlockHash::dummy(10)]).await;
    let err = manager.sync(&liar).await.unwrap_err();

    assert_matches!(err, SyncError::InvalidRoots(_));
    assert!(err.is_peer_fault());
    assert!(manager.store().get(&BlockHash::dummy(10)).await.is_none());
    assert!(listener.committed.lock().unwrap().is_empty());
    assert_matches!(events.try_recv(), Some(MasternodeEvent::MessageRejected { peer: PeerId(1), .. }));
    assert_matches!(
        events.try_recv(),
        Some(MasternodeEvent::PeerReported(PeerReport::Ban(PeerId(1))))
    );

    // the block stays wanted and an honest peer delivers it
    assert!(manager.scheduler().is_in_retrieval(&BlockHash::dummy(10)));
    let honest_peer = ScriptedPeer::new(2).answer_diff(&honest);
    manager.sync(&honest_peer).await.unwrap();
    assert!(manager.store().get(&BlockHash::dummy(10)).await.is_some());
}

#[tokio::test]
async fn answer_for_another_block_is_rejected() {
    let mut headers = TestHeaderChain::with_dummy_blocks(0..=20);
    let other = genesis_diff(12, pool(2));
    headers.add_diff(&other, 12);
    let (mut manager, _) = manager_with(diff_config(), headers).await;
    let peer = ScriptedPeer::new(1).answer(
        BlockHash::dummy(10),
        ScriptedAnswer::Payload(dash_sml::consensus::serialize(&other)),
    );

    manager.request_lists([BlockHash::dummy(10)]).await;
    assert_matches!(
        manager.step(&peer).await.unwrap(),
        StepOutcome::Rejected { report: PeerReport::Ban(PeerId(1)), .. }
    );
    assert!(manager.store().get(&BlockHash::dummy(12)).await.is_none());
}

#[tokio::test]
async fn garbage_qr_info_is_malformed() {
    let headers = TestHeaderChain::with_dummy_blocks(0..=20);
    let config = MasternodeSyncConfig::regtest().with_mode(SyncMode::Rotation);
    let (mut manager, _) = manager_with(config, headers).await;
    let peer =
        ScriptedPeer::new(1).answer(BlockHash::dummy(20), ScriptedAnswer::Payload(vec![1, 2, 3]));

    manager.request_lists([BlockHash::dummy(20)]).await;
    assert_matches!(manager.sync(&peer).await, Err(SyncError::MalformedMessage(_)));
    assert_matches!(
        peer.requests().as_slice(),
        [RecordedRequest::QrInfo(request)] if request.extra_share && request.base_block_hashes.is_empty()
    );
}

// =============================================================================
// Dependencies
// =============================================================================

#[tokio::test]
async fn quorum_waits_for_its_work_list_then_is_committed() {
    let mut headers = TestHeaderChain::with_dummy_blocks(0..=120);
    let work_diff = genesis_diff(92, pool(8));
    headers.add_diff(&work_diff, 92);
    let work_list = MasternodeList::apply_diff(None, &work_diff, 92).unwrap().list;
    let quorum_hash = QuorumHash::from(BlockHash::dummy(100));
    let quorum = TestQuorum::for_list(LLMQType::LlmqtypeTest, quorum_hash, &work_list);
    let tip_diff = DiffBuilder::new(BlockHash::all_zeros(), BlockHash::dummy(110), 110)
        .add_masternodes(pool(8))
        .add_quorums([quorum.commitment])
        .build();
    headers.add_diff(&tip_diff, 110);
    let (mut manager, listener) = manager_with(diff_config(), headers).await;
    let peer = ScriptedPeer::new(1).answer_diff(&work_diff).answer_diff(&tip_diff);

    manager.request_lists([BlockHash::dummy(110)]).await;
    assert_eq!(
        manager.step(&peer).await.unwrap(),
        StepOutcome::Pending {
            block_hash: BlockHash::dummy(110),
            missing: 1,
        }
    );
    assert!(manager.store().get(&BlockHash::dummy(110)).await.is_none());

    let progress = manager.sync(&peer).await.unwrap();
    assert_eq!(progress.committed, 2);
    assert_eq!(
        peer.requested_blocks(),
        vec![BlockHash::dummy(110), BlockHash::dummy(92), BlockHash::dummy(110)]
    );
    assert_eq!(listener.committed_blocks(), vec![BlockHash::dummy(92), BlockHash::dummy(110)]);
    assert_eq!(*listener.verified_quorums.lock().unwrap(), vec![quorum_hash]);

    let tip = manager.store().get(&BlockHash::dummy(110)).await.unwrap();
    assert_eq!(tip.valid_quorums_count(), 1);
    assert!(!tip.has_unverified_non_rotated_quorums());
}

// =============================================================================
// Peers
// =============================================================================

#[tokio::test]
async fn disconnect_requeues_the_request_for_the_next_peer() {
    let mut headers = TestHeaderChain::with_dummy_blocks(0..=20);
    let diff = genesis_diff(10, pool(3));
    headers.add_diff(&diff, 10);
    let (mut manager, _) = manager_with(diff_config(), headers).await;
    let flaky = ScriptedPeer::new(1).answer(BlockHash::dummy(10), ScriptedAnswer::Disconnect);

    manager.request_lists([BlockHash::dummy(10), BlockHash::dummy(12)]).await;
    assert_eq!(manager.sync(&flaky).await, Err(SyncError::PeerLost(PeerId(1))));
    let progress = manager.progress();
    assert_eq!(progress.in_flight, 0);
    assert_eq!(progress.queued, 2);
    assert!(!manager.scheduler().has_latest_block_in_retrieval_queue_with_hash(&BlockHash::dummy(10)));

    // the lost request is the first one sent to the next peer
    let steady = ScriptedPeer::new(2).answer_diff(&diff);
    assert_matches!(manager.step(&steady).await.unwrap(), StepOutcome::Committed { lists: 1, .. });
    assert_eq!(steady.requested_blocks(), vec![BlockHash::dummy(10)]);
}

#[tokio::test]
async fn stalled_requests_time_out_and_are_abandoned() {
    let headers = TestHeaderChain::with_dummy_blocks(0..=20);
    let config = diff_config().with_request_timeout(Duration::from_millis(50)).with_max_retries(1);
    let (mut manager, _) = manager_with(config, headers).await;
    let mut events = manager.subscribe();
    let peer = ScriptedPeer::new(1).answer(BlockHash::dummy(10), ScriptedAnswer::Stall);

    manager.request_lists([BlockHash::dummy(10)]).await;
    assert_eq!(
        manager.step(&peer).await.unwrap(),
        StepOutcome::TimedOut {
            block_hash: BlockHash::dummy(10),
        }
    );
    let progress = manager.sync(&peer).await.unwrap();

    assert_eq!(progress.committed, 0);
    assert_eq!(manager.scheduler().timed_out_attempts(), 2);
    assert_eq!(peer.requests().len(), 2);
    assert_matches!(
        events.try_recv(),
        Some(MasternodeEvent::RetrievalAbandoned { block_hash }) if block_hash == BlockHash::dummy(10)
    );
}

#[tokio::test]
async fn block_outside_the_header_chain_is_abandoned_not_retried() {
    let mut headers = TestHeaderChain::with_dummy_blocks(0..=20);
    let diff = genesis_diff(10, pool(2));
    headers.add_diff(&diff, 10);
    let (mut manager, _) = manager_with(diff_config(), headers).await;
    let mut events = manager.subscribe();
    let peer = ScriptedPeer::new(1).answer_diff(&diff);

    manager.request_lists([BlockHash::dummy(99), BlockHash::dummy(10)]).await;
    assert_eq!(
        manager.step(&peer).await.unwrap(),
        StepOutcome::Abandoned {
            block_hash: BlockHash::dummy(99),
        }
    );
    assert_matches!(
        events.try_recv(),
        Some(MasternodeEvent::RetrievalAbandoned { block_hash }) if block_hash == BlockHash::dummy(99)
    );

    // the queue moves on to the next block
    assert_matches!(manager.step(&peer).await.unwrap(), StepOutcome::Committed { lists: 1, .. });
    assert_eq!(manager.step(&peer).await.unwrap(), StepOutcome::Idle);
    assert!(!manager.scheduler().is_in_retrieval(&BlockHash::dummy(99)));
    assert_eq!(peer.requested_blocks(), vec![BlockHash::dummy(10)]);
}

#[tokio::test]
async fn switching_peers_cancels_the_outstanding_request() {
    let headers = TestHeaderChain::with_dummy_blocks(0..=20);
    let (mut manager, _) = manager_with(diff_config(), headers).await;
    let peer = ScriptedPeer::new(1).answer(BlockHash::dummy(10), ScriptedAnswer::Stall);
    manager.request_lists([BlockHash::dummy(10)]).await;

    let token = manager.cancellation_token();
    token.cancel();
    assert_eq!(manager.step(&peer).await, Err(SyncError::PeerLost(PeerId(1))));
    assert!(manager.scheduler().is_in_retrieval(&BlockHash::dummy(10)));

    // a fresh token is used once the peer is switched
    manager.switch_peer(PeerId(1));
    assert!(!manager.cancellation_token().is_cancelled());
}

// =============================================================================
// Persistence
// =============================================================================

#[tokio::test]
async fn committed_lists_survive_a_restart() {
    let dir = TempDir::new().unwrap();
    let mut headers = TestHeaderChain::with_dummy_blocks(0..=20);
    let diff = genesis_diff(10, pool(4));
    headers.add_diff(&diff, 10);
    let headers: Arc<dyn HeaderChain + Send + Sync> = Arc::new(headers);
    let config = diff_config().with_storage_path(dir.path());

    {
        let persistent = Arc::new(DiskPersistentStore::open(dir.path()).await.unwrap());
        let store = Arc::new(MasternodeListStore::open(persistent, config.retention_count).await.unwrap());
        let mut manager = MasternodeSyncManager::new(config.clone(), store, headers.clone());
        manager.request_lists([BlockHash::dummy(10)]).await;
        manager.sync(&ScriptedPeer::new(1).answer_diff(&diff)).await.unwrap();
    }

    let persistent = Arc::new(DiskPersistentStore::open(dir.path()).await.unwrap());
    let store = MasternodeListStore::open(persistent, config.retention_count).await.unwrap();
    let list = store.get(&BlockHash::dummy(10)).await.unwrap();
    assert_eq!(list.masternode_count(), 4);
    assert_eq!(store.last_masternode_list_block_height().await, Some(10));
}
