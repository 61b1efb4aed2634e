use std::io;

use crate::BlockHash;
use crate::consensus::encode::{read_compact_bitset, write_compact_bitset};
use crate::consensus::{Decodable, Encodable, encode};
use crate::network::message_sml::MnListDiff;
use crate::transaction::special_transaction::quorum_commitment::QuorumEntry;

/// The `getqrinfo` message requests a `qrinfo` message that provides the information
/// required to verify quorum details for quorums formed using the quorum rotation process.
///
/// Fields:
/// - `base_block_hashes`: block hashes of the masternode lists the light client already knows
/// - `block_request_hash`: hash of the block for which the rotation info is requested
/// - `extra_share`: request the h-4c snapshot and diff as well
#[derive(PartialEq, Eq, Clone, Debug)]
pub struct GetQrInfo {
    pub base_block_hashes: Vec<BlockHash>,
    pub block_request_hash: BlockHash,
    pub extra_share: bool,
}

impl_consensus_encoding!(GetQrInfo, base_block_hashes, block_request_hash, extra_share);

/// The `qrinfo` message sends quorum rotation information for a given block height.
///
/// `h` is the height of the last rotation cycle at or below the requested block and
/// `c` the cycle length. All fields are required except the h-4c pair, which is only
/// present when `extra_share` was requested.
#[derive(PartialEq, Eq, Clone, Debug)]
pub struct QrInfo {
    pub quorum_snapshot_at_h_minus_c: QuorumSnapshot,
    pub quorum_snapshot_at_h_minus_2c: QuorumSnapshot,
    pub quorum_snapshot_at_h_minus_3c: QuorumSnapshot,

    pub mn_list_diff_tip: MnListDiff,
    pub mn_list_diff_h: MnListDiff,
    pub mn_list_diff_at_h_minus_c: MnListDiff,
    pub mn_list_diff_at_h_minus_2c: MnListDiff,
    pub mn_list_diff_at_h_minus_3c: MnListDiff,

    pub quorum_snapshot_and_mn_list_diff_at_h_minus_4c: Option<(QuorumSnapshot, MnListDiff)>,

    /// The last commitment mined for each quorum index of the rotating type.
    pub last_commitment_per_index: Vec<QuorumEntry>,
    /// Snapshots matching `mn_list_diff_list`, one per older commitment.
    pub quorum_snapshot_list: Vec<QuorumSnapshot>,
    pub mn_list_diff_list: Vec<MnListDiff>,
}

impl QrInfo {
    /// The diffs ordered oldest first, each paired with its snapshot when it has one.
    pub fn diffs_oldest_first(&self) -> Vec<(Option<&QuorumSnapshot>, &MnListDiff)> {
        let mut diffs = Vec::with_capacity(6 + self.mn_list_diff_list.len());
        for (snapshot, diff) in self.quorum_snapshot_list.iter().zip(self.mn_list_diff_list.iter()) {
            diffs.push((Some(snapshot), diff));
        }
        if let Some((snapshot, diff)) = &self.quorum_snapshot_and_mn_list_diff_at_h_minus_4c {
            diffs.push((Some(snapshot), diff));
        }
        diffs.push((Some(&self.quorum_snapshot_at_h_minus_3c), &self.mn_list_diff_at_h_minus_3c));
        diffs.push((Some(&self.quorum_snapshot_at_h_minus_2c), &self.mn_list_diff_at_h_minus_2c));
        diffs.push((Some(&self.quorum_snapshot_at_h_minus_c), &self.mn_list_diff_at_h_minus_c));
        diffs.push((None, &self.mn_list_diff_h));
        diffs.push((None, &self.mn_list_diff_tip));
        diffs
    }
}

impl Encodable for QrInfo {
    fn consensus_encode<W: io::Write + ?Sized>(&self, w: &mut W) -> Result<usize, io::Error> {
        let mut len = 0;
        len += self.quorum_snapshot_at_h_minus_c.consensus_encode(w)?;
        len += self.quorum_snapshot_at_h_minus_2c.consensus_encode(w)?;
        len += self.quorum_snapshot_at_h_minus_3c.consensus_encode(w)?;

        len += self.mn_list_diff_tip.consensus_encode(w)?;
        len += self.mn_list_diff_h.consensus_encode(w)?;
        len += self.mn_list_diff_at_h_minus_c.consensus_encode(w)?;
        len += self.mn_list_diff_at_h_minus_2c.consensus_encode(w)?;
        len += self.mn_list_diff_at_h_minus_3c.consensus_encode(w)?;

        match &self.quorum_snapshot_and_mn_list_diff_at_h_minus_4c {
            Some((snapshot, diff)) => {
                len += true.consensus_encode(w)?;
                len += snapshot.consensus_encode(w)?;
                len += diff.consensus_encode(w)?;
            }
            None => len += false.consensus_encode(w)?,
        }
        len += self.last_commitment_per_index.consensus_encode(w)?;
        len += self.quorum_snapshot_list.consensus_encode(w)?;
        len += self.mn_list_diff_list.consensus_encode(w)?;
        Ok(len)
    }
}

impl Decodable for QrInfo {
    fn consensus_decode<R: io::Read + ?Sized>(r: &mut R) -> Result<Self, encode::Error> {
        let quorum_snapshot_at_h_minus_c = QuorumSnapshot::consensus_decode(r)?;
        let quorum_snapshot_at_h_minus_2c = QuorumSnapshot::consensus_decode(r)?;
        let quorum_snapshot_at_h_minus_3c = QuorumSnapshot::consensus_decode(r)?;

        let mn_list_diff_tip = MnListDiff::consensus_decode(r)?;
        let mn_list_diff_h = MnListDiff::consensus_decode(r)?;
        let mn_list_diff_at_h_minus_c = MnListDiff::consensus_decode(r)?;
        let mn_list_diff_at_h_minus_2c = MnListDiff::consensus_decode(r)?;
        let mn_list_diff_at_h_minus_3c = MnListDiff::consensus_decode(r)?;

        let extra_share = bool::consensus_decode(r)?;
        let quorum_snapshot_and_mn_list_diff_at_h_minus_4c = if extra_share {
            Some((QuorumSnapshot::consensus_decode(r)?, MnListDiff::consensus_decode(r)?))
        } else {
            None
        };

        let last_commitment_per_index = Vec::consensus_decode(r)?;
        let quorum_snapshot_list: Vec<QuorumSnapshot> = Vec::consensus_decode(r)?;
        let mn_list_diff_list: Vec<MnListDiff> = Vec::consensus_decode(r)?;
        if quorum_snapshot_list.len() != mn_list_diff_list.len() {
            return Err(encode::Error::ParseFailed(
                "qrinfo snapshot list and diff list lengths differ",
            ));
        }

        Ok(QrInfo {
            quorum_snapshot_at_h_minus_c,
            quorum_snapshot_at_h_minus_2c,
            quorum_snapshot_at_h_minus_3c,
            mn_list_diff_tip,
            mn_list_diff_h,
            mn_list_diff_at_h_minus_c,
            mn_list_diff_at_h_minus_2c,
            mn_list_diff_at_h_minus_3c,
            quorum_snapshot_and_mn_list_diff_at_h_minus_4c,
            last_commitment_per_index,
            quorum_snapshot_list,
            mn_list_diff_list,
        })
    }
}

/// Which members were skipped when a rotation cycle built its new quarters.
#[derive(Debug, PartialEq, Eq, Clone, Copy, Default, Hash)]
#[repr(i32)]
pub enum MnSkipListMode {
    /// The skip list is empty, nobody was skipped.
    #[default]
    NoSkipping = 0,
    /// The first entry is an index, later entries are offsets from it.
    SkipFirst = 1,
    /// The skip list holds the entries that were not skipped.
    SkipExcept = 2,
    /// Every node was skipped, no DKG session was attempted.
    SkipAll = 3,
}

impl TryFrom<i32> for MnSkipListMode {
    type Error = encode::Error;

    fn try_from(value: i32) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(MnSkipListMode::NoSkipping),
            1 => Ok(MnSkipListMode::SkipFirst),
            2 => Ok(MnSkipListMode::SkipExcept),
            3 => Ok(MnSkipListMode::SkipAll),
            other => Err(encode::Error::UnknownSkipListMode(other)),
        }
    }
}

impl Encodable for MnSkipListMode {
    fn consensus_encode<W: io::Write + ?Sized>(&self, w: &mut W) -> Result<usize, io::Error> {
        (*self as i32).consensus_encode(w)
    }
}

impl Decodable for MnSkipListMode {
    fn consensus_decode<R: io::Read + ?Sized>(r: &mut R) -> Result<Self, encode::Error> {
        MnSkipListMode::try_from(i32::consensus_decode(r)?)
    }
}

/// A snapshot of quorum membership taken at a rotation cycle's work block.
///
/// `active_quorum_members` has one flag per masternode of the list at that block,
/// in score order, set for nodes already placed in a quarter.
#[derive(PartialEq, Eq, Clone, Debug, Default, Hash)]
pub struct QuorumSnapshot {
    pub skip_list_mode: MnSkipListMode,
    pub active_quorum_members: Vec<bool>,
    pub skip_list: Vec<i32>,
}

/// Masternodes one snapshot can describe.
pub const MAX_SNAPSHOT_MEMBERS: usize = 1 << 16;

impl QuorumSnapshot {
    pub fn member_is_active(&self, index: usize) -> bool {
        self.active_quorum_members.get(index).copied().unwrap_or(false)
    }
}

impl Encodable for QuorumSnapshot {
    fn consensus_encode<W: io::Write + ?Sized>(&self, w: &mut W) -> Result<usize, io::Error> {
        let mut len = 0;
        len += self.skip_list_mode.consensus_encode(w)?;
        len += write_compact_bitset(w, &self.active_quorum_members)?;
        len += self.skip_list.consensus_encode(w)?;
        Ok(len)
    }
}

impl Decodable for QuorumSnapshot {
    fn consensus_decode<R: io::Read + ?Sized>(r: &mut R) -> Result<Self, encode::Error> {
        Ok(QuorumSnapshot {
            skip_list_mode: MnSkipListMode::consensus_decode(r)?,
            active_quorum_members: read_compact_bitset(r, MAX_SNAPSHOT_MEMBERS)?,
            skip_list: Vec::consensus_decode(r)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;
    use hashes::Hash;

    use super::*;
    use crate::consensus::{deserialize, serialize};

    #[test]
    fn snapshot_encoding() {
        let snapshot = QuorumSnapshot {
            skip_list_mode: MnSkipListMode::SkipFirst,
            active_quorum_members: vec![true, true, false, true],
            skip_list: vec![2, -1],
        };
        let bytes = serialize(&snapshot);
        assert_eq!(
            bytes,
            vec![1, 0, 0, 0, 4, 0b1011, 2, 2, 0, 0, 0, 0xff, 0xff, 0xff, 0xff]
        );
        assert_eq!(deserialize::<QuorumSnapshot>(&bytes).unwrap(), snapshot);
        assert!(snapshot.member_is_active(3));
        assert!(!snapshot.member_is_active(2));
        assert!(!snapshot.member_is_active(40));
    }

    #[test]
    fn skip_list_mode_out_of_range() {
        assert_matches!(
            deserialize::<QuorumSnapshot>(&[4, 0, 0, 0, 0, 0]),
            Err(encode::Error::UnknownSkipListMode(4))
        );
    }

    #[test]
    fn get_qr_info_encoding() {
        let request = GetQrInfo {
            base_block_hashes: vec![BlockHash::from_byte_array([1; 32])],
            block_request_hash: BlockHash::from_byte_array([2; 32]),
            extra_share: true,
        };
        let bytes = serialize(&request);
        assert_eq!(bytes.len(), 1 + 32 + 32 + 1);
        assert_eq!(deserialize::<GetQrInfo>(&bytes).unwrap(), request);
    }
}
