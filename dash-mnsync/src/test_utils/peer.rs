use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;

use async_trait::async_trait;
use dash_sml::BlockHash;
use dash_sml::consensus::serialize;
use dash_sml::network::message_qrinfo::{GetQrInfo, QrInfo};
use dash_sml::network::message_sml::{GetMnListDiff, MnListDiff};

use crate::error::{NetworkError, NetworkResult};
use crate::network::Peer;
use crate::types::PeerId;

/// How a [`ScriptedPeer`] answers one request.
#[derive(Debug, Clone)]
pub enum ScriptedAnswer {
    Payload(Vec<u8>),
    /// The connection drops before the answer.
    Disconnect,
    /// No answer ever comes.
    Stall,
    Fail(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecordedRequest {
    Diff(GetMnListDiff),
    QrInfo(GetQrInfo),
}

impl RecordedRequest {
    pub fn block_hash(&self) -> BlockHash {
        match self {
            RecordedRequest::Diff(request) => request.block_hash,
            RecordedRequest::QrInfo(request) => request.block_request_hash,
        }
    }
}

/// A peer answering from a script keyed by the requested block.
///
/// Answers for a block are used in order and the last one repeats. Requests for a
/// block without a script fail.
pub struct ScriptedPeer {
    id: PeerId,
    answers: Mutex<HashMap<BlockHash, VecDeque<ScriptedAnswer>>>,
    requests: Mutex<Vec<RecordedRequest>>,
}

impl ScriptedPeer {
    pub fn new(id: u64) -> Self {
        Self {
            id: PeerId(id),
            answers: Mutex::new(HashMap::new()),
            requests: Mutex::new(vec![]),
        }
    }

    pub fn answer(self, block_hash: BlockHash, answer: ScriptedAnswer) -> Self {
        self.answers.lock().unwrap().entry(block_hash).or_default().push_back(answer);
        self
    }

    pub fn answer_diff(self, diff: &MnListDiff) -> Self {
        let block_hash = diff.block_hash;
        self.answer(block_hash, ScriptedAnswer::Payload(serialize(diff)))
    }

    pub fn answer_qr_info(self, block_hash: BlockHash, qr_info: &QrInfo) -> Self {
        self.answer(block_hash, ScriptedAnswer::Payload(serialize(qr_info)))
    }

    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn requested_blocks(&self) -> Vec<BlockHash> {
        self.requests().iter().map(RecordedRequest::block_hash).collect()
    }

    fn next_answer(&self, block_hash: &BlockHash) -> Option<ScriptedAnswer> {
        let mut answers = self.answers.lock().unwrap();
        let queue = answers.get_mut(block_hash)?;
        if queue.len() > 1 {
            queue.pop_front()
        } else {
            queue.front().cloned()
        }
    }

    async fn respond(&self, request: RecordedRequest) -> NetworkResult<Vec<u8>> {
        let block_hash = request.block_hash();
        self.requests.lock().unwrap().push(request);
        match self.next_answer(&block_hash) {
            Some(ScriptedAnswer::Payload(payload)) => Ok(payload),
            Some(ScriptedAnswer::Disconnect) => Err(NetworkError::PeerDisconnected),
            Some(ScriptedAnswer::Stall) => std::future::pending().await,
            Some(ScriptedAnswer::Fail(reason)) => Err(NetworkError::RequestFailed(reason)),
            None => Err(NetworkError::RequestFailed(format!("no answer for {}", block_hash))),
        }
    }
}

#[async_trait]
impl Peer for ScriptedPeer {
    fn id(&self) -> PeerId {
        self.id
    }

    async fn request_mn_list_diff(&self, request: GetMnListDiff) -> NetworkResult<Vec<u8>> {
        self.respond(RecordedRequest::Diff(request)).await
    }

    async fn request_qr_info(&self, request: GetQrInfo) -> NetworkResult<Vec<u8>> {
        self.respond(RecordedRequest::QrInfo(request)).await
    }
}
