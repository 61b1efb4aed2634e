// Processor scenarios
// These tests drive whole mnlistdiff and qrinfo messages through the processor,
// from wire bytes to the lists that would be committed.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use assert_matches::assert_matches;
use dash_sml::bls_sig_utils::BLSSignature;
use dash_sml::consensus::serialize;
use dash_sml::hash_types::{BlockHash, QuorumHash};
use dash_sml::network::message_qrinfo::{MnSkipListMode, QrInfo, QuorumSnapshot};
use dash_sml::network::message_sml::MnListDiff;
use dash_sml::processor::{
    HeaderChain, MasternodeProcessor, ProcessingError, ProcessingState, QuorumVerification,
    RejectReason, RootFailure,
};
use dash_sml::sml::llmq_entry_verification::LLMQEntryVerificationStatus;
use dash_sml::sml::llmq_type::LLMQType;
use dash_sml::sml::masternode_list::MasternodeList;
use dash_sml::sml::masternode_list::rotation::quorum_members_from_quarters;
use dash_sml::sml::masternode_list_entry::MasternodeListEntry;
use dash_sml::sml::quorum_entry::quorum_modifier_type::LLMQModifierType;
use dash_sml::test_utils::{DiffBuilder, TestHeaderChain, TestMasternode, TestQuorum};
use dash_sml::sml::quorum_validation_error::QuorumValidationError;
use dash_sml::{Network, TxMerkleNode};
use hashes::Hash;

type Lists = BTreeMap<BlockHash, Arc<MasternodeList>>;

fn pool(count: u32) -> Vec<MasternodeListEntry> {
    (0..count).map(|i| TestMasternode::new(i).entry()).collect()
}

fn genesis_diff(height: u32, entries: Vec<MasternodeListEntry>) -> MnListDiff {
    DiffBuilder::new(BlockHash::all_zeros(), BlockHash::dummy(height), height)
        .add_masternodes(entries)
        .build()
}

// =============================================================================
// mnlistdiff: roots
// =============================================================================

#[test]
fn three_entry_genesis_diff_is_ready_to_commit() {
    let mut headers = TestHeaderChain::with_dummy_blocks(0..=20);
    let diff = genesis_diff(10, pool(3));
    headers.add_diff(&diff, 10);
    let lists = Lists::new();
    let processor = MasternodeProcessor::new(Network::Regtest, &headers, &lists);

    let mut processed =
        processor.process_diff_message(&serialize(&diff), QuorumVerification::Verify).unwrap();
    assert_eq!(processed.state, ProcessingState::QuorumsChecked);
    assert!(processed.result.is_valid());
    assert_eq!(processed.result.added_masternodes.len(), 3);
    assert!(processed.result.modified_masternodes.is_empty());
    let list = processed.list.clone().unwrap();
    assert_eq!(list.masternodes.len(), 3);
    assert_eq!(list.known_height, 10);

    processed.mark_committed().unwrap();
    assert_eq!(processed.state, ProcessingState::Committed);
    assert!(processed.mark_committed().is_err());
}

#[test]
fn flipped_masternode_root_is_rejected() {
    let mut headers = TestHeaderChain::with_dummy_blocks(0..=20);
    let diff = DiffBuilder::new(BlockHash::all_zeros(), BlockHash::dummy(10), 10)
        .add_masternodes(pool(3))
        .with_flipped_masternode_root()
        .build();
    headers.add_diff(&diff, 10);
    let lists = Lists::new();
    let processor = MasternodeProcessor::new(Network::Regtest, &headers, &lists);

    let processed = processor.process_diff(&diff, QuorumVerification::Verify).unwrap();
    assert_eq!(
        processed.state,
        ProcessingState::Rejected(RejectReason::InvalidRoots(RootFailure::MasternodeListRootMismatch))
    );
    assert!(processed.result.found_coinbase);
    assert!(processed.result.valid_coinbase);
    assert!(!processed.result.root_mn_list_valid);
    assert!(processed.list.is_none());
}

#[test]
fn coinbase_must_be_proven_by_the_header() {
    // the dummy header's merkle root does not cover the coinbase
    let headers = TestHeaderChain::with_dummy_blocks(0..=20);
    let diff = genesis_diff(10, pool(3));
    let lists = Lists::new();
    let processor = MasternodeProcessor::new(Network::Regtest, &headers, &lists);

    let processed = processor.process_diff(&diff, QuorumVerification::Verify).unwrap();
    assert_eq!(
        processed.state,
        ProcessingState::Rejected(RejectReason::InvalidRoots(RootFailure::CoinbaseNotIncluded))
    );
    assert!(!processed.result.valid_coinbase);
}

#[test]
fn unknown_block_and_garbage() {
    let headers = TestHeaderChain::with_dummy_blocks(0..=5);
    let lists = Lists::new();
    let processor = MasternodeProcessor::new(Network::Regtest, &headers, &lists);

    let diff = genesis_diff(10, pool(1));
    assert_matches!(
        processor.process_diff(&diff, QuorumVerification::Verify),
        Err(ProcessingError::UnknownBlock(hash)) if hash == BlockHash::dummy(10)
    );

    let bytes = serialize(&diff);
    let processed =
        processor.process_diff_message(&bytes[..bytes.len() / 2], QuorumVerification::Verify).unwrap();
    assert_matches!(processed.state, ProcessingState::Rejected(RejectReason::MalformedMessage(_)));
    assert!(processed.list.is_none());
}

#[test]
fn unknown_base_list_leaves_the_diff_pending() {
    let mut headers = TestHeaderChain::with_dummy_blocks(0..=20);
    let base = MasternodeList::apply_diff(None, &genesis_diff(5, pool(3)), 5).unwrap().list;
    let diff = DiffBuilder::on_list(&base, BlockHash::dummy(10), 10).add_masternodes(pool(5)).build();
    headers.add_diff(&diff, 10);

    let empty = Lists::new();
    let processed = MasternodeProcessor::new(Network::Regtest, &headers, &empty)
        .process_diff(&diff, QuorumVerification::Verify)
        .unwrap();
    assert_eq!(processed.state, ProcessingState::Pending(BTreeSet::from([BlockHash::dummy(5)])));

    let lists = Lists::from([(base.block_hash, Arc::new(base))]);
    let processed = MasternodeProcessor::new(Network::Regtest, &headers, &lists)
        .process_diff(&diff, QuorumVerification::Verify)
        .unwrap();
    assert_eq!(processed.state, ProcessingState::QuorumsChecked);
    assert_eq!(processed.result.added_masternodes.len(), 2);
    assert_eq!(processed.result.modified_masternodes.len(), 3);
}

// =============================================================================
// mnlistdiff: quorums
// =============================================================================

struct QuorumSetup {
    headers: TestHeaderChain,
    work_diff: MnListDiff,
    tip_diff: MnListDiff,
}

/// An llmq_test quorum mined at 100, whose members are picked at its work block 92,
/// added by a genesis diff to 110.
fn quorum_setup(tamper: impl FnOnce(&mut TestQuorum)) -> QuorumSetup {
    let mut headers = TestHeaderChain::with_dummy_blocks(0..=120);
    let work_diff = genesis_diff(92, pool(8));
    headers.add_diff(&work_diff, 92);
    let work_list = MasternodeList::apply_diff(None, &work_diff, 92).unwrap().list;
    let mut quorum =
        TestQuorum::for_list(LLMQType::LlmqtypeTest, QuorumHash::from(BlockHash::dummy(100)), &work_list);
    tamper(&mut quorum);
    let tip_diff = DiffBuilder::new(BlockHash::all_zeros(), BlockHash::dummy(110), 110)
        .add_masternodes(pool(8))
        .add_quorums([quorum.commitment])
        .build();
    headers.add_diff(&tip_diff, 110);
    QuorumSetup {
        headers,
        work_diff,
        tip_diff,
    }
}

#[test]
fn quorum_pending_on_its_work_list_then_committed() {
    let setup = quorum_setup(|_| {});
    let mut lists = Lists::new();

    let processed = MasternodeProcessor::new(Network::Regtest, &setup.headers, &lists)
        .process_diff(&setup.tip_diff, QuorumVerification::Verify)
        .unwrap();
    assert_eq!(processed.state, ProcessingState::Pending(BTreeSet::from([BlockHash::dummy(92)])));
    assert!(processed.result.needed_missing_masternode_lists.contains(&BlockHash::dummy(92)));
    assert!(processed.result.valid_quorums);
    assert!(processed.list.is_none());

    // the dependency is fetched and committed without checking its own quorums
    let dependency = MasternodeProcessor::new(Network::Regtest, &setup.headers, &lists)
        .process_diff(&setup.work_diff, QuorumVerification::Skip)
        .unwrap();
    assert_eq!(dependency.state, ProcessingState::QuorumsChecked);
    let work_list = dependency.list.unwrap();
    lists.insert(work_list.block_hash, work_list);

    let processed = MasternodeProcessor::new(Network::Regtest, &setup.headers, &lists)
        .process_diff(&setup.tip_diff, QuorumVerification::Verify)
        .unwrap();
    assert_eq!(processed.state, ProcessingState::QuorumsChecked);
    assert!(processed.result.is_valid());
    assert_eq!(processed.result.added_quorums.len(), 1);
    assert_eq!(processed.result.added_quorums[0].verified, LLMQEntryVerificationStatus::Verified);
    let list = processed.list.unwrap();
    assert!(list.quorums_of_type(LLMQType::LlmqtypeTest).all(|quorum| quorum.is_verified()));
    assert_eq!(list.valid_quorums_count(), 1);
}

#[test]
fn quorum_with_a_bad_signature_rejects_the_message() {
    let setup = quorum_setup(|quorum| {
        quorum.commitment.all_commitment_aggregated_signature = quorum.commitment.threshold_sig;
    });
    let work_list = MasternodeList::apply_diff(None, &setup.work_diff, 92).unwrap().list;
    let lists = Lists::from([(work_list.block_hash, Arc::new(work_list))]);

    let processed = MasternodeProcessor::new(Network::Regtest, &setup.headers, &lists)
        .process_diff(&setup.tip_diff, QuorumVerification::Verify)
        .unwrap();
    assert_matches!(
        processed.state,
        ProcessingState::Rejected(RejectReason::InvalidQuorum { llmq_type: LLMQType::LlmqtypeTest, .. })
    );
    assert!(!processed.result.valid_quorums);
    assert!(processed.list.is_none());
}

#[test]
fn commitment_without_signers_is_rejected_before_its_members_are_needed() {
    let setup = quorum_setup(|quorum| {
        quorum.commitment.signers.iter_mut().for_each(|signed| *signed = false);
    });
    // the work list at 92 is unknown, yet nothing is fetched for a commitment this broken
    let lists = Lists::new();
    let processed = MasternodeProcessor::new(Network::Regtest, &setup.headers, &lists)
        .process_diff(&setup.tip_diff, QuorumVerification::Verify)
        .unwrap();
    assert_matches!(
        processed.state,
        ProcessingState::Rejected(RejectReason::InvalidQuorum {
            error: QuorumValidationError::InsufficientSigners { found: 0, .. },
            ..
        })
    );
    assert!(processed.result.needed_missing_masternode_lists.is_empty());
}

/// Header chain with one height missing below its tip.
struct GappedHeaders<'a> {
    headers: &'a TestHeaderChain,
    gap: u32,
}

impl HeaderChain for GappedHeaders<'_> {
    fn height_for_block_hash(&self, block_hash: &BlockHash) -> Option<u32> {
        self.headers.height_for_block_hash(block_hash)
    }

    fn block_hash_at_height(&self, height: u32) -> Option<BlockHash> {
        if height == self.gap {
            None
        } else {
            self.headers.block_hash_at_height(height)
        }
    }

    fn merkle_root_for_block_hash(&self, block_hash: &BlockHash) -> Option<TxMerkleNode> {
        self.headers.merkle_root_for_block_hash(block_hash)
    }
}

#[test]
fn quorum_over_a_missing_header_is_not_committed() {
    let setup = quorum_setup(|_| {});
    let headers = GappedHeaders {
        headers: &setup.headers,
        gap: 92,
    };
    let lists = Lists::new();
    let outcome = MasternodeProcessor::new(Network::Regtest, &headers, &lists)
        .process_diff(&setup.tip_diff, QuorumVerification::Verify);
    assert_eq!(outcome.unwrap_err(), ProcessingError::UnknownHeight(92));
}

#[test]
fn skipped_verification_leaves_quorums_unverified() {
    let setup = quorum_setup(|quorum| {
        quorum.commitment.threshold_sig = BLSSignature::from([0; 96]);
    });
    let lists = Lists::new();
    let processed = MasternodeProcessor::new(Network::Regtest, &setup.headers, &lists)
        .process_diff(&setup.tip_diff, QuorumVerification::Skip)
        .unwrap();
    assert_eq!(processed.state, ProcessingState::QuorumsChecked);
    let list = processed.list.unwrap();
    assert!(list.has_unverified_non_rotated_quorums());
}

// =============================================================================
// qrinfo: rotation
// =============================================================================

const ROTATING: LLMQType = LLMQType::LlmqtypeTestDIP0024;

fn empty_snapshot(list: &MasternodeList) -> QuorumSnapshot {
    QuorumSnapshot {
        skip_list_mode: MnSkipListMode::NoSkipping,
        active_quorum_members: vec![false; list.masternodes.len()],
        skip_list: vec![],
    }
}

fn modifier(cycle_base_height: u32) -> dash_sml::hash_types::QuorumModifierHash {
    LLMQModifierType::PreCoreV20(ROTATING, BlockHash::dummy(cycle_base_height)).build_llmq_hash()
}

/// A qrinfo for the cycle at 96, with work blocks at 88, 64, 40 and 16, whose tip
/// diff mines the two quorums of the cycle.
fn qr_info(headers: &mut TestHeaderChain) -> QrInfo {
    let mut diffs = vec![genesis_diff(16, pool(8))];
    let mut lists = vec![MasternodeList::apply_diff(None, &diffs[0], 16).unwrap().list];
    for height in [40, 64, 88] {
        let previous = lists.last().unwrap();
        let diff = DiffBuilder::on_list(previous, BlockHash::dummy(height), height).build();
        lists.push(MasternodeList::apply_diff(Some(previous), &diff, height).unwrap().list);
        diffs.push(diff);
    }
    let [list_3c, list_2c, list_c, list_h] = [&lists[0], &lists[1], &lists[2], &lists[3]];

    let quarters_c = list_c.quarter_members_from_snapshot(ROTATING, &empty_snapshot(list_c), &modifier(72));
    let quarters_2c = list_2c.quarter_members_from_snapshot(ROTATING, &empty_snapshot(list_2c), &modifier(48));
    let quarters_3c = list_3c.quarter_members_from_snapshot(ROTATING, &empty_snapshot(list_3c), &modifier(24));
    let quarters_new =
        list_h.new_quarter_members(ROTATING, [&quarters_c, &quarters_2c, &quarters_3c], &modifier(96));
    let commitments: Vec<_> = (0..2u32)
        .map(|index| {
            let members: Vec<_> = quorum_members_from_quarters(
                &quarters_3c,
                &quarters_2c,
                &quarters_c,
                &quarters_new,
                index as usize,
            )
            .iter()
            .map(TestMasternode::from_entry)
            .collect();
            assert_eq!(members.len(), 4);
            TestQuorum::signed(
                ROTATING,
                QuorumHash::from(BlockHash::dummy(96 + index)),
                Some(index as i16),
                &members,
            )
            .commitment
        })
        .collect();

    let tip = DiffBuilder::on_list(list_h, BlockHash::dummy(100), 100)
        .add_quorums(commitments.iter().cloned())
        .build();
    for (diff, height) in diffs.iter().zip([16, 40, 64, 88]) {
        headers.add_diff(diff, height);
    }
    headers.add_diff(&tip, 100);

    let mut diffs = diffs.into_iter();
    QrInfo {
        quorum_snapshot_at_h_minus_c: empty_snapshot(list_c),
        quorum_snapshot_at_h_minus_2c: empty_snapshot(list_2c),
        quorum_snapshot_at_h_minus_3c: empty_snapshot(list_3c),
        mn_list_diff_at_h_minus_3c: diffs.next().unwrap(),
        mn_list_diff_at_h_minus_2c: diffs.next().unwrap(),
        mn_list_diff_at_h_minus_c: diffs.next().unwrap(),
        mn_list_diff_h: diffs.next().unwrap(),
        mn_list_diff_tip: tip,
        quorum_snapshot_and_mn_list_diff_at_h_minus_4c: None,
        last_commitment_per_index: commitments,
        quorum_snapshot_list: vec![],
        mn_list_diff_list: vec![],
    }
}

#[test]
fn qr_info_verifies_the_rotating_quorums_of_the_cycle() {
    let mut headers = TestHeaderChain::with_dummy_blocks(0..=120);
    let qr_info = qr_info(&mut headers);
    let lists = Lists::new();
    let processor = MasternodeProcessor::new(Network::Regtest, &headers, &lists);

    let mut processed = processor.process_qr_info_message(&serialize(&qr_info)).unwrap();
    assert_eq!(processed.state, ProcessingState::QuorumsChecked);
    let result = processed.result.clone().unwrap();
    assert!(result.is_valid());
    assert!(!result.extra_share);
    assert_eq!(result.last_quorum_per_index.len(), 2);
    assert!(result.last_quorum_per_index.iter().all(|quorum| quorum.is_verified()));
    assert!(result.result_at_tip.has_rotated_quorums());

    assert_eq!(processed.lists.len(), 5);
    assert_eq!(processed.lists.last().unwrap().block_hash, BlockHash::dummy(100));
    assert!(!processed.lists.last().unwrap().has_unverified_rotated_quorums());
    assert_eq!(
        processed.snapshots.keys().copied().collect::<Vec<_>>(),
        {
            let mut expected = vec![BlockHash::dummy(16), BlockHash::dummy(40), BlockHash::dummy(64)];
            expected.sort();
            expected
        }
    );
    processed.mark_committed().unwrap();
}

#[test]
fn qr_info_with_a_wrong_snapshot_is_rejected_whole() {
    let mut headers = TestHeaderChain::with_dummy_blocks(0..=120);
    let mut qr_info = qr_info(&mut headers);
    // marking every node used changes the order quarters are picked in
    let count = qr_info.quorum_snapshot_at_h_minus_c.active_quorum_members.len();
    qr_info.quorum_snapshot_at_h_minus_c.active_quorum_members = (0..count).map(|i| i % 2 == 0).collect();
    let lists = Lists::new();
    let processor = MasternodeProcessor::new(Network::Regtest, &headers, &lists);

    let processed = processor.process_qr_info(&qr_info).unwrap();
    assert_matches!(processed.state, ProcessingState::Rejected(RejectReason::InvalidQuorum { .. }));
    assert!(processed.lists.is_empty());
}
