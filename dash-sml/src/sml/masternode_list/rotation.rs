//! Quarter reconstruction for rotating quorums.
//!
//! A rotating quorum is made of four quarters, picked at the current cycle and at the
//! three previous ones. Quarters of previous cycles are rebuilt from the quorum
//! snapshot taken at that cycle; the new quarter is built from the list at the
//! current work block, preferring masternodes not used by the previous quarters.

use std::collections::BTreeSet;

use crate::ProTxHash;
use crate::hash_types::QuorumModifierHash;
use crate::network::message_qrinfo::{MnSkipListMode, QuorumSnapshot};
use crate::sml::llmq_type::LLMQType;
use crate::sml::masternode_list::MasternodeList;
use crate::sml::masternode_list_entry::MasternodeListEntry;

/// One quarter per quorum index of a cycle.
pub type Quarters = Vec<Vec<MasternodeListEntry>>;

/// Blocks between a cycle base and the block whose list selects the members.
pub const WORK_BLOCK_DISTANCE: u32 = 8;

impl MasternodeList {
    /// Splits the scored masternodes of this list into (used, unused) following the
    /// active member flags of `snapshot`, both in score order.
    pub fn usage_info_from_snapshot(
        &self,
        snapshot: &QuorumSnapshot,
        modifier: &QuorumModifierHash,
    ) -> (Vec<MasternodeListEntry>, Vec<MasternodeListEntry>) {
        let mut used = vec![];
        let mut unused = vec![];
        for (index, (_, entry)) in self.scores_for_quorum(modifier).into_iter().enumerate() {
            if snapshot.member_is_active(index) {
                used.push(entry.masternode_list_entry);
            } else {
                unused.push(entry.masternode_list_entry);
            }
        }
        (used, unused)
    }

    /// Rebuilds the quarters a previous cycle produced, this list being the list at
    /// that cycle's work block.
    pub fn quarter_members_from_snapshot(
        &self,
        llmq_type: LLMQType,
        snapshot: &QuorumSnapshot,
        modifier: &QuorumModifierHash,
    ) -> Quarters {
        let quorum_count = llmq_type.active_quorum_count() as usize;
        let quarter_size = llmq_type.size() as usize / 4;
        let mut quarters: Quarters = vec![vec![]; quorum_count];
        let (used, unused) = self.usage_info_from_snapshot(snapshot, modifier);
        let mut combined = unused;
        combined.extend(used);
        if combined.is_empty() || quarter_size == 0 {
            return quarters;
        }

        match snapshot.skip_list_mode {
            MnSkipListMode::NoSkipping => {
                let mut idx = 0;
                for quarter in quarters.iter_mut() {
                    while quarter.len() < quarter_size {
                        quarter.push(combined[idx]);
                        idx = (idx + 1) % combined.len();
                    }
                }
            }
            MnSkipListMode::SkipFirst => {
                // the first entry is an index, the others are offsets from it
                let mut first_entry_index = 0i64;
                let mut processed_skip_list = Vec::with_capacity(snapshot.skip_list.len());
                for s in &snapshot.skip_list {
                    if first_entry_index == 0 {
                        first_entry_index = *s as i64;
                        processed_skip_list.push(*s as i64);
                    } else {
                        processed_skip_list.push(first_entry_index + *s as i64);
                    }
                }
                let mut skips = processed_skip_list.into_iter().peekable();
                let mut idx = 0usize;
                for quarter in quarters.iter_mut() {
                    while quarter.len() < quarter_size {
                        if skips.peek() == Some(&(idx as i64)) {
                            skips.next();
                        } else {
                            quarter.push(combined[idx]);
                        }
                        idx = (idx + 1) % combined.len();
                    }
                }
            }
            MnSkipListMode::SkipExcept | MnSkipListMode::SkipAll => {}
        }
        quarters
    }

    /// Builds the quarters of the current cycle, this list being the list at its work
    /// block. `previous_quarters` are the quarters of cycles h-c, h-2c and h-3c.
    pub fn new_quarter_members(
        &self,
        llmq_type: LLMQType,
        previous_quarters: [&Quarters; 3],
        modifier: &QuorumModifierHash,
    ) -> Quarters {
        let quorum_count = llmq_type.active_quorum_count() as usize;
        let quarter_size = llmq_type.size() as usize / 4;
        let mut quarters: Quarters = vec![vec![]; quorum_count];
        if quarter_size == 0 || self.valid_masternode_count() < quarter_size {
            return quarters;
        }

        let mut used_at_h = BTreeSet::<ProTxHash>::new();
        let mut used_at_h_indexed = vec![BTreeSet::<ProTxHash>::new(); quorum_count];
        for (index, used_indexed) in used_at_h_indexed.iter_mut().enumerate() {
            for previous in previous_quarters {
                for member in previous.get(index).into_iter().flatten() {
                    // removed or banned masternodes no longer count as used
                    if !self.has_valid_masternode(&member.pro_reg_tx_hash) {
                        continue;
                    }
                    used_at_h.insert(member.pro_reg_tx_hash);
                    used_indexed.insert(member.pro_reg_tx_hash);
                }
            }
        }

        let (used, unused): (Vec<_>, Vec<_>) = self
            .scores_for_quorum(modifier)
            .into_iter()
            .map(|(_, entry)| entry.masternode_list_entry)
            .partition(|entry| used_at_h.contains(&entry.pro_reg_tx_hash));
        let mut combined = unused;
        combined.extend(used);
        if combined.is_empty() {
            return quarters;
        }

        let mut idx = 0usize;
        for (quarter, used_indexed) in quarters.iter_mut().zip(used_at_h_indexed.iter_mut()) {
            let used_count = used_indexed.len();
            let mut updated = false;
            let initial_loop_idx = idx;
            while quarter.len() < quarter_size && used_count + quarter.len() < combined.len() {
                let candidate = combined[idx];
                if used_indexed.insert(candidate.pro_reg_tx_hash) {
                    quarter.push(candidate);
                    updated = true;
                }
                idx = (idx + 1) % combined.len();
                if idx == initial_loop_idx {
                    if !updated {
                        // a full loop without progress: not enough masternodes
                        return vec![vec![]; quorum_count];
                    }
                    updated = false;
                }
            }
        }
        quarters
    }
}

/// Ordered members of the rotating quorum at `quorum_index`: its quarters from h-3c,
/// h-2c, h-c and the new one, concatenated.
pub fn quorum_members_from_quarters(
    quarter_h_minus_3c: &Quarters,
    quarter_h_minus_2c: &Quarters,
    quarter_h_minus_c: &Quarters,
    quarter_new: &Quarters,
    quorum_index: usize,
) -> Vec<MasternodeListEntry> {
    [quarter_h_minus_3c, quarter_h_minus_2c, quarter_h_minus_c, quarter_new]
        .into_iter()
        .flat_map(|quarters| quarters.get(quorum_index).into_iter().flatten().copied())
        .collect()
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use hashes::Hash;

    use super::*;
    use crate::BlockHash;
    use crate::test_utils::TestMasternode;

    const TYPE: LLMQType = LLMQType::LlmqtypeTestDIP0024;

    fn list(count: u32) -> MasternodeList {
        let masternodes = (0..count)
            .map(|i| {
                let entry = TestMasternode::new(i).entry();
                (entry.pro_reg_tx_hash, entry.into())
            })
            .collect();
        MasternodeList::build(masternodes, BTreeMap::new(), BlockHash::all_zeros(), 0).build()
    }

    fn modifier() -> QuorumModifierHash {
        QuorumModifierHash::from_byte_array([8; 32])
    }

    fn sorted(list: &MasternodeList) -> Vec<MasternodeListEntry> {
        list.scores_for_quorum(&modifier()).into_iter().map(|(_, e)| e.masternode_list_entry).collect()
    }

    #[test]
    fn snapshot_without_skipping_puts_unused_first() {
        let list = list(5);
        let sorted = sorted(&list);
        let snapshot = QuorumSnapshot {
            skip_list_mode: MnSkipListMode::NoSkipping,
            active_quorum_members: vec![true, false, false, false, false],
            skip_list: vec![],
        };
        let quarters = list.quarter_members_from_snapshot(TYPE, &snapshot, &modifier());
        // two quorums with quarters of one member
        assert_eq!(quarters, vec![vec![sorted[1]], vec![sorted[2]]]);
    }

    #[test]
    fn snapshot_skip_first_offsets_from_first_index() {
        let list = list(5);
        let sorted = sorted(&list);
        let snapshot = QuorumSnapshot {
            skip_list_mode: MnSkipListMode::SkipFirst,
            active_quorum_members: vec![false; 5],
            skip_list: vec![1, 1],
        };
        // indexes 1 and 2 are skipped
        let quarters = list.quarter_members_from_snapshot(TYPE, &snapshot, &modifier());
        assert_eq!(quarters, vec![vec![sorted[0]], vec![sorted[3]]]);
    }

    #[test]
    fn skip_all_yields_empty_quarters() {
        let list = list(5);
        let snapshot = QuorumSnapshot {
            skip_list_mode: MnSkipListMode::SkipAll,
            active_quorum_members: vec![],
            skip_list: vec![],
        };
        let quarters = list.quarter_members_from_snapshot(TYPE, &snapshot, &modifier());
        assert_eq!(quarters, vec![vec![], vec![]]);
    }

    #[test]
    fn new_quarter_prefers_unused_masternodes() {
        let list = list(6);
        let sorted = sorted(&list);
        let previous: Quarters = vec![vec![sorted[0]], vec![sorted[1]]];
        let empty: Quarters = vec![vec![], vec![]];
        let quarters = list.new_quarter_members(TYPE, [&previous, &empty, &empty], &modifier());
        assert_eq!(quarters, vec![vec![sorted[2]], vec![sorted[3]]]);
    }

    #[test]
    fn new_quarter_needs_enough_masternodes() {
        let list = list(0);
        let empty: Quarters = vec![vec![], vec![]];
        let quarters = list.new_quarter_members(TYPE, [&empty, &empty, &empty], &modifier());
        assert_eq!(quarters, vec![vec![], vec![]]);
    }

    #[test]
    fn members_concatenate_quarters_oldest_first() {
        let entries: Vec<_> = (0..8).map(|i| TestMasternode::new(i).entry()).collect();
        let q = |a: usize, b: usize| -> Quarters { vec![vec![entries[a]], vec![entries[b]]] };
        let members = quorum_members_from_quarters(&q(0, 1), &q(2, 3), &q(4, 5), &q(6, 7), 1);
        assert_eq!(members, vec![entries[1], entries[3], entries[5], entries[7]]);
    }
}
