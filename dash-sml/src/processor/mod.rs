//! Verification of masternode list messages.
//!
//! A [`MasternodeProcessor`] takes one `mnlistdiff` or `qrinfo` through decoding,
//! root checks and quorum checks, tracking where it stands with a
//! [`ProcessingState`]. It never mutates anything: a message that passes yields the
//! lists to commit, and committing them is up to the caller, which then marks the
//! outcome [`ProcessingState::Committed`].

pub mod context;
pub mod error;
pub mod quorum_members;
pub mod result;
pub mod state;

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

pub use self::context::{HeaderChain, MasternodeListProvider, OverlayProvider};
pub use self::error::ProcessingError;
pub use self::quorum_members::QuorumMemberResolver;
pub use self::result::{MnListDiffResult, QrInfoResult};
pub use self::state::{ProcessingState, RejectReason, RootFailure};
use crate::consensus::deserialize;
use crate::merkle::verify_coinbase_inclusion;
use crate::network::constants::Network;
use crate::network::message_qrinfo::{QrInfo, QuorumSnapshot};
use crate::network::message_sml::MnListDiff;
use crate::prelude::CoreBlockHeight;
use crate::sml::llmq_type::LLMQType;
use crate::sml::masternode_list::{AppliedDiff, MasternodeList};
use crate::sml::quorum_entry::qualified_quorum_entry::QualifiedQuorumEntry;
use crate::sml::quorum_validation_error::QuorumValidationError;
use crate::{BlockHash, QuorumHash, TxMerkleNode};

/// Whether the quorums added by a diff are checked.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum QuorumVerification {
    Verify,
    /// Used for lists fetched only as a base or a dependency of another message.
    Skip,
}

/// Outcome of processing a `mnlistdiff`.
#[derive(Clone, Debug)]
pub struct ProcessedDiff {
    pub state: ProcessingState,
    pub result: MnListDiffResult,
    /// The list to commit, set when the message is ready to commit.
    pub list: Option<Arc<MasternodeList>>,
}

impl ProcessedDiff {
    fn finished(state: ProcessingState, result: MnListDiffResult) -> Self {
        ProcessedDiff {
            state,
            result,
            list: None,
        }
    }

    /// Records that the list was committed.
    pub fn mark_committed(&mut self) -> Result<(), ProcessingError> {
        self.state.transition(ProcessingState::Committed)
    }
}

/// Outcome of processing a `qrinfo`.
#[derive(Clone, Debug)]
pub struct ProcessedQrInfo {
    pub state: ProcessingState,
    pub result: Option<QrInfoResult>,
    /// Lists to commit together, oldest first.
    pub lists: Vec<Arc<MasternodeList>>,
    /// Snapshots to commit, keyed by the work block they were taken at.
    pub snapshots: BTreeMap<BlockHash, QuorumSnapshot>,
}

impl ProcessedQrInfo {
    fn finished(state: ProcessingState) -> Self {
        ProcessedQrInfo {
            state,
            result: None,
            lists: vec![],
            snapshots: BTreeMap::new(),
        }
    }

    pub fn mark_committed(&mut self) -> Result<(), ProcessingError> {
        self.state.transition(ProcessingState::Committed)
    }
}

/// Quorums once checked, with what kept them from being verified.
#[derive(Default)]
struct QuorumChecks {
    checked: Vec<QualifiedQuorumEntry>,
    missing: BTreeSet<BlockHash>,
    /// A height below a quorum with no header; no list fetch resolves it.
    unknown_height: Option<CoreBlockHeight>,
    invalid: Option<(LLMQType, QuorumHash, QuorumValidationError)>,
}

impl QuorumChecks {
    fn run<'q, H, P, I>(resolver: &mut QuorumMemberResolver<'_, H, P>, quorums: I) -> Self
    where
        H: HeaderChain + ?Sized,
        P: MasternodeListProvider + ?Sized,
        I: IntoIterator<Item = &'q QualifiedQuorumEntry>,
    {
        let mut checks = QuorumChecks::default();
        for quorum in quorums {
            let mut quorum = quorum.clone();
            // a commitment malformed on its face is rejected before its members are looked up
            let outcome = quorum
                .validate_structure()
                .and_then(|()| resolver.members_for(&quorum))
                .and_then(|members| quorum.validate(&members));
            let llmq_type = quorum.quorum_entry.llmq_type;
            let quorum_hash = quorum.quorum_entry.quorum_hash;
            match &outcome {
                Ok(()) => log::debug!("quorum {} of type {} verified", quorum_hash, llmq_type),
                Err(e) if e.is_missing_dependency() => {
                    log::debug!("quorum {} of type {} not verifiable yet: {}", quorum_hash, llmq_type, e);
                    checks.missing.extend(e.missing_block_hash());
                    if let Some(height) = e.missing_height() {
                        checks.unknown_height.get_or_insert(height);
                    }
                }
                Err(e) => {
                    log::warn!("quorum {} of type {} is invalid: {}", quorum_hash, llmq_type, e);
                    if checks.invalid.is_none() {
                        checks.invalid = Some((llmq_type, quorum_hash, e.clone()));
                    }
                }
            }
            quorum.update_quorum_status(outcome);
            checks.checked.push(quorum);
        }
        checks
    }

    /// Fails when a quorum needs a header the chain does not have yet.
    fn require_headers(&self) -> Result<(), ProcessingError> {
        match self.unknown_height {
            Some(height) => Err(ProcessingError::UnknownHeight(height)),
            None => Ok(()),
        }
    }

    fn reject_reason(&self) -> Option<RejectReason> {
        self.invalid.as_ref().map(|(llmq_type, quorum_hash, error)| RejectReason::InvalidQuorum {
            llmq_type: *llmq_type,
            quorum_hash: *quorum_hash,
            error: error.clone(),
        })
    }
}

/// Verifies masternode list messages against trusted headers and committed lists.
pub struct MasternodeProcessor<'a, H: ?Sized, P: ?Sized> {
    network: Network,
    headers: &'a H,
    lists: &'a P,
}

impl<'a, H, P> MasternodeProcessor<'a, H, P>
where
    H: HeaderChain + ?Sized,
    P: MasternodeListProvider + ?Sized,
{
    pub fn new(network: Network, headers: &'a H, lists: &'a P) -> Self {
        MasternodeProcessor {
            network,
            headers,
            lists,
        }
    }

    /// Decodes and processes the payload of a `mnlistdiff` message.
    pub fn process_diff_message(
        &self,
        payload: &[u8],
        verification: QuorumVerification,
    ) -> Result<ProcessedDiff, ProcessingError> {
        match deserialize::<MnListDiff>(payload) {
            Ok(diff) => self.process_diff(&diff, verification),
            Err(e) => {
                log::warn!("malformed mnlistdiff: {}", e);
                let mut state = ProcessingState::Decoding;
                state.transition(ProcessingState::Rejected(RejectReason::MalformedMessage(
                    e.to_string(),
                )))?;
                Ok(ProcessedDiff::finished(state, MnListDiffResult::malformed()))
            }
        }
    }

    /// Processes a decoded `mnlistdiff`.
    ///
    /// Fails only when the header chain lacks the diff's block or a height one of its
    /// quorums is built from; every verdict on the message itself is in the returned state.
    pub fn process_diff(
        &self,
        diff: &MnListDiff,
        verification: QuorumVerification,
    ) -> Result<ProcessedDiff, ProcessingError> {
        let mut state = ProcessingState::Decoding;
        let (height, merkle_root) = self.block_info(&diff.block_hash)?;
        let mut result = MnListDiffResult::new(diff.base_block_hash, diff.block_hash, height);

        let base = if diff.is_from_genesis() {
            None
        } else {
            match self.lists.masternode_list(&diff.base_block_hash) {
                Some(base) => Some(base),
                None => {
                    log::debug!(
                        "base list {} of diff to {} is unknown",
                        diff.base_block_hash,
                        diff.block_hash
                    );
                    result.needed_missing_masternode_lists.insert(diff.base_block_hash);
                    state.transition(ProcessingState::Pending(BTreeSet::from([
                        diff.base_block_hash,
                    ])))?;
                    return Ok(ProcessedDiff::finished(state, result));
                }
            }
        };

        let applied = match check_roots(diff, base.as_deref(), height, &merkle_root, &mut result) {
            Ok(applied) => applied,
            Err(reason) => {
                log::warn!("rejecting diff {} -> {}: {}", diff.base_block_hash, diff.block_hash, reason);
                state.transition(ProcessingState::Rejected(reason))?;
                return Ok(ProcessedDiff::finished(state, result));
            }
        };
        state.transition(ProcessingState::RootsChecked)?;
        result.record_changes(&applied);

        let checks = match verification {
            // rotating quorums are checked with the snapshots of a qrinfo
            QuorumVerification::Verify => {
                let mut resolver = QuorumMemberResolver::new(self.network, self.headers, self.lists);
                QuorumChecks::run(
                    &mut resolver,
                    applied.added_quorums().filter(|q| !q.quorum_entry.llmq_type.is_rotating_quorum_type()),
                )
            }
            QuorumVerification::Skip => QuorumChecks::default(),
        };
        result.record_quorum_statuses(&checks.checked);
        result.valid_quorums = checks.invalid.is_none();
        result.needed_missing_masternode_lists.extend(checks.missing.iter().copied());
        state.transition(ProcessingState::QuorumsChecked)?;

        if let Some(reason) = checks.reject_reason() {
            state.transition(ProcessingState::Rejected(reason))?;
            return Ok(ProcessedDiff::finished(state, result));
        }
        checks.require_headers()?;
        if !checks.missing.is_empty() {
            state.transition(ProcessingState::Pending(checks.missing))?;
            return Ok(ProcessedDiff::finished(state, result));
        }
        let list = applied.list.with_quorum_statuses(checks.checked.iter());
        Ok(ProcessedDiff {
            state,
            result,
            list: Some(Arc::new(list)),
        })
    }

    /// Decodes and processes the payload of a `qrinfo` message.
    pub fn process_qr_info_message(&self, payload: &[u8]) -> Result<ProcessedQrInfo, ProcessingError> {
        match deserialize::<QrInfo>(payload) {
            Ok(qr_info) => self.process_qr_info(&qr_info),
            Err(e) => {
                log::warn!("malformed qrinfo: {}", e);
                let mut state = ProcessingState::Decoding;
                state.transition(ProcessingState::Rejected(RejectReason::MalformedMessage(
                    e.to_string(),
                )))?;
                Ok(ProcessedQrInfo::finished(state))
            }
        }
    }

    /// Processes a decoded `qrinfo`.
    ///
    /// The diffs are applied oldest first, each on top of the previous lists of the
    /// message. The rotating quorums of the last cycle and the non rotating quorums
    /// added at the tip are verified, and their statuses are carried into every list
    /// of the message. Either every list is ready to commit or none is.
    pub fn process_qr_info(&self, qr_info: &QrInfo) -> Result<ProcessedQrInfo, ProcessingError> {
        let mut state = ProcessingState::Decoding;
        let mut overlay = OverlayProvider::new(self.lists);
        let mut results = vec![];
        let mut tip_added = vec![];
        let mut rotating_added = vec![];
        let diffs = qr_info.diffs_oldest_first();
        let diff_count = diffs.len();

        for (position, (snapshot, diff)) in diffs.into_iter().enumerate() {
            let (height, merkle_root) = self.block_info(&diff.block_hash)?;
            let mut result = MnListDiffResult::new(diff.base_block_hash, diff.block_hash, height);
            let base = if diff.is_from_genesis() {
                None
            } else {
                match overlay.masternode_list(&diff.base_block_hash) {
                    Some(base) => Some(base),
                    None => {
                        log::debug!("qrinfo diff to {} misses base {}", diff.block_hash, diff.base_block_hash);
                        state.transition(ProcessingState::Pending(BTreeSet::from([
                            diff.base_block_hash,
                        ])))?;
                        return Ok(ProcessedQrInfo::finished(state));
                    }
                }
            };
            let applied = match check_roots(diff, base.as_deref(), height, &merkle_root, &mut result) {
                Ok(applied) => applied,
                Err(reason) => {
                    log::warn!("rejecting qrinfo, diff to {}: {}", diff.block_hash, reason);
                    state.transition(ProcessingState::Rejected(reason))?;
                    return Ok(ProcessedQrInfo::finished(state));
                }
            };
            result.record_changes(&applied);
            // the last two diffs are the ones at h and at the tip
            if position + 2 >= diff_count {
                rotating_added.extend(
                    applied
                        .added_quorums()
                        .filter(|q| q.quorum_entry.llmq_type.is_rotating_quorum_type())
                        .cloned(),
                );
            }
            if position + 1 == diff_count {
                tip_added.extend(
                    applied
                        .added_quorums()
                        .filter(|q| !q.quorum_entry.llmq_type.is_rotating_quorum_type())
                        .cloned(),
                );
            }
            if let Some(snapshot) = snapshot {
                overlay.insert_snapshot(diff.block_hash, snapshot.clone());
            }
            overlay.insert_list(Arc::new(applied.list));
            results.push(result);
        }
        state.transition(ProcessingState::RootsChecked)?;

        let mut to_check: Vec<QualifiedQuorumEntry> = qr_info
            .last_commitment_per_index
            .iter()
            .cloned()
            .map(QualifiedQuorumEntry::from)
            .collect();
        for quorum in rotating_added.into_iter().chain(tip_added) {
            if !to_check.iter().any(|known| known.entry_hash == quorum.entry_hash) {
                to_check.push(quorum);
            }
        }
        let checks = {
            let mut resolver = QuorumMemberResolver::new(self.network, self.headers, &overlay);
            QuorumChecks::run(&mut resolver, to_check.iter())
        };
        for result in results.iter_mut() {
            result.record_quorum_statuses(&checks.checked);
            result.valid_quorums = checks.invalid.is_none();
        }
        if let Some(tip) = results.last_mut() {
            tip.needed_missing_masternode_lists.extend(checks.missing.iter().copied());
        }
        state.transition(ProcessingState::QuorumsChecked)?;

        if let Some(reason) = checks.reject_reason() {
            state.transition(ProcessingState::Rejected(reason))?;
            return Ok(ProcessedQrInfo::finished(state));
        }
        checks.require_headers()?;

        let lists: Vec<Arc<MasternodeList>> = results
            .iter()
            .filter_map(|result| overlay.lists.get(&result.block_hash))
            .map(|list| Arc::new(list.with_quorum_statuses(checks.checked.iter())))
            .collect();
        let last_quorum_per_index = qr_info
            .last_commitment_per_index
            .iter()
            .filter_map(|entry| {
                let hash = entry.calculate_entry_hash();
                checks.checked.iter().find(|quorum| quorum.entry_hash == hash).cloned()
            })
            .collect();
        let snapshots = overlay.snapshots.clone();
        let result = assemble_qr_info_result(qr_info, results, last_quorum_per_index);

        if !checks.missing.is_empty() {
            state.transition(ProcessingState::Pending(checks.missing))?;
            return Ok(ProcessedQrInfo {
                state,
                result,
                lists: vec![],
                snapshots: BTreeMap::new(),
            });
        }
        Ok(ProcessedQrInfo {
            state,
            result,
            lists,
            snapshots,
        })
    }

    fn block_info(&self, block_hash: &BlockHash) -> Result<(CoreBlockHeight, TxMerkleNode), ProcessingError> {
        let height = self
            .headers
            .height_for_block_hash(block_hash)
            .ok_or(ProcessingError::UnknownBlock(*block_hash))?;
        let merkle_root = self
            .headers
            .merkle_root_for_block_hash(block_hash)
            .ok_or(ProcessingError::UnknownBlock(*block_hash))?;
        Ok((height, merkle_root))
    }
}

/// Checks the coinbase of `diff` and the roots of the list it produces.
fn check_roots(
    diff: &MnListDiff,
    base: Option<&MasternodeList>,
    height: CoreBlockHeight,
    merkle_root: &TxMerkleNode,
    result: &mut MnListDiffResult,
) -> Result<AppliedDiff, RejectReason> {
    let coinbase_payload = diff
        .coinbase_payload()
        .ok_or(RejectReason::InvalidRoots(RootFailure::MissingCoinbasePayload))?;
    result.found_coinbase = true;

    result.valid_coinbase = diff.coinbase_tx.is_coin_base()
        && verify_coinbase_inclusion(&diff.coinbase_tx.txid(), &diff.partial_merkle_tree(), merkle_root);
    if !result.valid_coinbase {
        return Err(RejectReason::InvalidRoots(RootFailure::CoinbaseNotIncluded));
    }

    let applied = MasternodeList::apply_diff(base, diff, height)
        .map_err(|e| RejectReason::MalformedMessage(e.to_string()))?;
    result.root_mn_list_valid = applied.list.has_valid_mn_list_root(coinbase_payload);
    result.root_quorum_list_valid = applied.list.has_valid_llmq_list_root(coinbase_payload);
    if !result.root_mn_list_valid {
        log::debug!(
            "masternode list root {} does not match coinbase {}",
            applied.list.masternode_merkle_root,
            coinbase_payload.merkle_root_masternode_list
        );
        return Err(RejectReason::InvalidRoots(RootFailure::MasternodeListRootMismatch));
    }
    if !result.root_quorum_list_valid {
        return Err(RejectReason::InvalidRoots(RootFailure::QuorumListRootMismatch));
    }
    Ok(applied)
}

fn assemble_qr_info_result(
    qr_info: &QrInfo,
    mut results: Vec<MnListDiffResult>,
    last_quorum_per_index: Vec<QualifiedQuorumEntry>,
) -> Option<QrInfoResult> {
    // results are oldest first, as laid out by `QrInfo::diffs_oldest_first`
    let result_at_tip = results.pop()?;
    let result_at_h = results.pop()?;
    let result_at_h_minus_c = results.pop()?;
    let result_at_h_minus_2c = results.pop()?;
    let result_at_h_minus_3c = results.pop()?;
    let extra = qr_info.quorum_snapshot_and_mn_list_diff_at_h_minus_4c.as_ref();
    let result_at_h_minus_4c = match extra {
        Some(_) => Some(results.pop()?),
        None => None,
    };
    Some(QrInfoResult {
        result_at_tip,
        result_at_h,
        result_at_h_minus_c,
        result_at_h_minus_2c,
        result_at_h_minus_3c,
        snapshot_at_h_minus_c: qr_info.quorum_snapshot_at_h_minus_c.clone(),
        snapshot_at_h_minus_2c: qr_info.quorum_snapshot_at_h_minus_2c.clone(),
        snapshot_at_h_minus_3c: qr_info.quorum_snapshot_at_h_minus_3c.clone(),
        extra_share: extra.is_some(),
        result_at_h_minus_4c,
        snapshot_at_h_minus_4c: extra.map(|(snapshot, _)| snapshot.clone()),
        last_quorum_per_index,
        quorum_snapshot_list: qr_info.quorum_snapshot_list.clone(),
        mn_list_diff_list: results,
    })
}
