//! Requests the scheduler hands to the download peer.

use std::fmt;

use dash_sml::BlockHash;
use dash_sml::network::message_qrinfo::GetQrInfo;
use dash_sml::network::message_sml::GetMnListDiff;

/// How a block's list is fetched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RequestKind {
    /// `getmnlistdiff` from the closest known ancestor.
    Diff,
    /// `getqrinfo` for the rotation cycle ending at the block.
    Rotation,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiffRequest {
    /// All zeros when no ancestor list is known.
    pub base_block_hash: BlockHash,
    pub block_hash: BlockHash,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RotationRequest {
    /// Known lists the peer may diff against, oldest first.
    pub base_block_hashes: Vec<BlockHash>,
    pub block_hash: BlockHash,
    pub extra_share: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MasternodeRequest {
    Diff(DiffRequest),
    Rotation(RotationRequest),
}

impl MasternodeRequest {
    /// The block whose list the request retrieves.
    pub fn block_hash(&self) -> BlockHash {
        match self {
            MasternodeRequest::Diff(request) => request.block_hash,
            MasternodeRequest::Rotation(request) => request.block_hash,
        }
    }

    pub fn kind(&self) -> RequestKind {
        match self {
            MasternodeRequest::Diff(_) => RequestKind::Diff,
            MasternodeRequest::Rotation(_) => RequestKind::Rotation,
        }
    }
}

impl From<&DiffRequest> for GetMnListDiff {
    fn from(request: &DiffRequest) -> Self {
        GetMnListDiff {
            base_block_hash: request.base_block_hash,
            block_hash: request.block_hash,
        }
    }
}

impl From<&RotationRequest> for GetQrInfo {
    fn from(request: &RotationRequest) -> Self {
        GetQrInfo {
            base_block_hashes: request.base_block_hashes.clone(),
            block_request_hash: request.block_hash,
            extra_share: request.extra_share,
        }
    }
}

impl fmt::Display for MasternodeRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MasternodeRequest::Diff(request) => {
                write!(f, "getmnlistdiff({} -> {})", request.base_block_hash, request.block_hash)
            }
            MasternodeRequest::Rotation(request) => write!(
                f,
                "getqrinfo({} bases -> {})",
                request.base_block_hashes.len(),
                request.block_hash
            ),
        }
    }
}
