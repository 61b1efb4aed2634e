//! What the sync needs from the peer-to-peer layer.
//!
//! Connection management and the handshake live elsewhere. A [`Peer`] is a
//! connected node able to answer `getmnlistd` and `getqrinfo`; it hands back the
//! raw payload of the answer so that decoding happens on the verification worker.

use async_trait::async_trait;
use dash_sml::network::message_qrinfo::GetQrInfo;
use dash_sml::network::message_sml::GetMnListDiff;

use crate::error::NetworkResult;
use crate::types::PeerId;

/// A connected peer serving masternode list messages.
#[async_trait]
pub trait Peer: Send + Sync {
    fn id(&self) -> PeerId;

    /// Sends `getmnlistd` and waits for the `mnlistdiff` payload.
    ///
    /// Fails with `PeerDisconnected` if the connection drops before the answer.
    /// Callers apply their own timeout.
    async fn request_mn_list_diff(&self, request: GetMnListDiff) -> NetworkResult<Vec<u8>>;

    /// Sends `getqrinfo` and waits for the `qrinfo` payload.
    async fn request_qr_info(&self, request: GetQrInfo) -> NetworkResult<Vec<u8>>;
}

/// Reports about peers, consumed by the connection layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PeerReport {
    /// The peer sent a list that failed verification.
    Faulty(PeerId),
    /// More peers sent invalid lists than tolerated: the peer should be banned.
    Ban(PeerId),
}
