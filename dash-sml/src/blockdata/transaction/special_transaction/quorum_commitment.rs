// Rust Dash Library
// Written for Dash in 2022 by
//     The Dash Core Developers
//
// To the extent possible under law, the author(s) have dedicated all
// copyright and related and neighboring rights to this software to
// the public domain worldwide. This software is distributed without
// any warranty.
//
// You should have received a copy of the CC0 Public Domain Dedication
// along with this software.
// If not, see <http://creativecommons.org/publicdomain/zero/1.0/>.
//

//! Dash Quorum Commitment Special Transaction.
//!
//! The same finalization commitment travels inside `mnlistdiff` messages as a
//! list of new quorums. It is defined in DIP6
//! [dip-0006.md](https://github.com/dashpay/dips/blob/master/dip-0006.md).

use std::io;

use crate::bls_sig_utils::{BLSPublicKey, BLSSignature};
use crate::consensus::encode::{read_compact_bitset, write_compact_bitset};
use crate::consensus::{Decodable, Encodable, VarInt, encode};
use crate::hash_types::{QuorumHash, QuorumVVecHash};
use crate::sml::llmq_type::LLMQType;

/// A Quorum Finalization Commitment. It is described in the finalization section of DIP6:
/// [dip-0006.md#6-finalization-phase](https://github.com/dashpay/dips/blob/master/dip-0006.md#6-finalization-phase)
///
/// `signers` and `valid_members` hold one flag per quorum member, in member order.
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Debug, Hash)]
pub struct QuorumEntry {
    pub version: u16,
    pub llmq_type: LLMQType,
    pub quorum_hash: QuorumHash,
    /// Only serialized by the indexed versions 2 and 4.
    pub quorum_index: Option<i16>,
    pub signers: Vec<bool>,
    pub valid_members: Vec<bool>,
    pub quorum_public_key: BLSPublicKey,
    pub quorum_vvec_hash: QuorumVVecHash,
    /// Threshold signature of the quorum over the commitment hash.
    pub threshold_sig: BLSSignature,
    /// Aggregate of the signers' signatures over the commitment hash.
    pub all_commitment_aggregated_signature: BLSSignature,
}

impl QuorumEntry {
    /// Whether this commitment version carries a quorum index.
    pub fn version_has_index(version: u16) -> bool {
        version == 2 || version == 4
    }

    /// The size of the commitment in bytes.
    pub fn size(&self) -> usize {
        let mut size = 2 + 1 + 32 + 48 + 32 + 96 + 96;
        size += VarInt(self.signers.len() as u64).len() + self.signers.len().div_ceil(8);
        size += VarInt(self.valid_members.len() as u64).len() + self.valid_members.len().div_ceil(8);
        if Self::version_has_index(self.version) {
            size += 2;
        }
        size
    }

    pub fn count_signers(&self) -> usize {
        self.signers.iter().filter(|b| **b).count()
    }

    pub fn count_valid_members(&self) -> usize {
        self.valid_members.iter().filter(|b| **b).count()
    }
}

impl Encodable for QuorumEntry {
    fn consensus_encode<W: io::Write + ?Sized>(&self, w: &mut W) -> Result<usize, io::Error> {
        let mut len = 0;
        len += self.version.consensus_encode(w)?;
        len += self.llmq_type.consensus_encode(w)?;
        len += self.quorum_hash.consensus_encode(w)?;
        if Self::version_has_index(self.version) {
            len += self.quorum_index.unwrap_or_default().consensus_encode(w)?;
        }
        len += write_compact_bitset(w, &self.signers)?;
        len += write_compact_bitset(w, &self.valid_members)?;
        len += self.quorum_public_key.consensus_encode(w)?;
        len += self.quorum_vvec_hash.consensus_encode(w)?;
        len += self.threshold_sig.consensus_encode(w)?;
        len += self.all_commitment_aggregated_signature.consensus_encode(w)?;
        Ok(len)
    }
}

impl Decodable for QuorumEntry {
    fn consensus_decode<R: io::Read + ?Sized>(r: &mut R) -> Result<Self, encode::Error> {
        let version = u16::consensus_decode(r)?;
        let llmq_type = LLMQType::consensus_decode(r)?;
        let quorum_hash = QuorumHash::consensus_decode(r)?;
        let quorum_index =
            if Self::version_has_index(version) { Some(i16::consensus_decode(r)?) } else { None };
        // a quorum never has more members than its type's size
        let max_members = llmq_type.size() as usize;
        let signers = read_compact_bitset(r, max_members)?;
        let valid_members = read_compact_bitset(r, max_members)?;
        Ok(QuorumEntry {
            version,
            llmq_type,
            quorum_hash,
            quorum_index,
            signers,
            valid_members,
            quorum_public_key: BLSPublicKey::consensus_decode(r)?,
            quorum_vvec_hash: QuorumVVecHash::consensus_decode(r)?,
            threshold_sig: BLSSignature::consensus_decode(r)?,
            all_commitment_aggregated_signature: BLSSignature::consensus_decode(r)?,
        })
    }
}

/// A Quorum Commitment Payload used in a Quorum Commitment Special Transaction.
/// This is used in the mining phase as described in DIP 6:
/// [dip-0006.md#7-mining-phase](https://github.com/dashpay/dips/blob/master/dip-0006.md#7-mining-phase).
///
/// Miners take the best final commitment for a DKG session and mine it into a block.
#[derive(Clone, PartialEq, Eq, Debug, Hash)]
pub struct QuorumCommitmentPayload {
    pub version: u16,
    pub height: u32,
    pub finalization_commitment: QuorumEntry,
}

impl QuorumCommitmentPayload {
    /// The size of the payload in bytes.
    pub fn size(&self) -> usize {
        2 + 4 + self.finalization_commitment.size()
    }
}

impl_consensus_encoding!(QuorumCommitmentPayload, version, height, finalization_commitment);

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;
    use hashes::Hash;

    use super::*;
    use crate::consensus::{deserialize, serialize};

    fn commitment(version: u16) -> QuorumEntry {
        QuorumEntry {
            version,
            llmq_type: LLMQType::LlmqtypeTest,
            quorum_hash: QuorumHash::all_zeros(),
            quorum_index: QuorumEntry::version_has_index(version).then_some(3),
            signers: vec![true, false, true, true],
            valid_members: vec![true, true, true, true],
            quorum_public_key: BLSPublicKey::from([0; 48]),
            quorum_vvec_hash: QuorumVVecHash::all_zeros(),
            threshold_sig: BLSSignature::from([0; 96]),
            all_commitment_aggregated_signature: BLSSignature::from([0; 96]),
        }
    }

    #[test]
    fn size() {
        // 307 fixed bytes plus two one-byte bitsets with their lengths
        let payload = QuorumCommitmentPayload {
            version: 1,
            height: 0,
            finalization_commitment: commitment(1),
        };
        let actual = payload.consensus_encode(&mut Vec::new()).unwrap();
        assert_eq!(payload.size(), 317);
        assert_eq!(actual, 317);

        let indexed = commitment(2);
        assert_eq!(indexed.size(), 313);
        assert_eq!(serialize(&indexed).len(), 313);
    }

    #[test]
    fn bitsets_survive_encoding() {
        for version in [1, 2, 3, 4] {
            let entry = commitment(version);
            let decoded: QuorumEntry = deserialize(&serialize(&entry)).unwrap();
            assert_eq!(decoded, entry);
            assert_eq!(decoded.count_signers(), 3);
            assert_eq!(decoded.count_valid_members(), 4);
        }
    }

    #[test]
    fn unknown_llmq_type_fails_closed() {
        let mut bytes = serialize(&commitment(1));
        bytes[2] = 42;
        assert_matches!(
            deserialize::<QuorumEntry>(&bytes),
            Err(encode::Error::UnknownLLMQType(42))
        );
    }

    #[test]
    fn huge_bitset_length_is_rejected() {
        let mut bytes = serialize(&commitment(1));
        // replace the signers bitset length with 0xFFFFFFFF
        bytes.splice(35..36, [0xfe, 0xff, 0xff, 0xff, 0xff]);
        assert_matches!(
            deserialize::<QuorumEntry>(&bytes),
            Err(encode::Error::OversizedVectorAllocation { .. })
        );
    }

    #[test]
    fn bitset_longer_than_the_quorum_is_rejected() {
        let mut entry = commitment(1);
        entry.valid_members.push(true);
        assert_matches!(
            deserialize::<QuorumEntry>(&serialize(&entry)),
            Err(encode::Error::OversizedVectorAllocation { requested: 5, max: 4 })
        );
    }
}
