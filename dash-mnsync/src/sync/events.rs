use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use dash_sml::prelude::CoreBlockHeight;
use dash_sml::sml::llmq_type::LLMQType;
use dash_sml::sml::masternode_list::MasternodeList;
use dash_sml::sml::masternode_list_entry::qualified_masternode_list_entry::QualifiedMasternodeListEntry;
use dash_sml::sml::quorum_entry::qualified_quorum_entry::QualifiedQuorumEntry;
use dash_sml::{BlockHash, ProTxHash, QuorumHash};

use crate::network::PeerReport;
use crate::types::PeerId;

/// Events broadcast by the masternode sync on its [`EventBus`](crate::event_bus::EventBus).
#[derive(Debug, Clone)]
pub enum MasternodeEvent {
    /// A list was verified and committed to the store.
    ListCommitted {
        block_hash: BlockHash,
        height: CoreBlockHeight,
        /// Masternodes added, modified and removed relative to the base list.
        added: usize,
        modified: usize,
        removed: usize,
    },

    /// A quorum commitment passed verification.
    QuorumVerified {
        llmq_type: LLMQType,
        quorum_hash: QuorumHash,
    },

    /// A message failed verification and was dropped.
    MessageRejected {
        peer: PeerId,
        block_hash: BlockHash,
        reason: String,
    },

    /// A peer should be disconnected or banned.
    PeerReported(PeerReport),

    /// A block was dropped from retrieval after too many failed attempts.
    RetrievalAbandoned {
        block_hash: BlockHash,
    },

    /// The retrieval queue drained.
    SyncComplete {
        /// Height of the most recent committed list, if any.
        height: Option<CoreBlockHeight>,
    },
}

/// Receives committed lists synchronously, in commit order.
///
/// Called from the sync task: implementations must not block.
pub trait MasternodeListListener: Send + Sync {
    fn on_masternode_list_committed(
        &self,
        list: &Arc<MasternodeList>,
        added: &BTreeMap<ProTxHash, QualifiedMasternodeListEntry>,
        modified: &BTreeMap<ProTxHash, QualifiedMasternodeListEntry>,
        removed: &BTreeSet<ProTxHash>,
    );

    fn on_quorum_verified(&self, _quorum: &QualifiedQuorumEntry) {}
}
