//! Resolution of the ordered member list of a quorum.
//!
//! A non rotating quorum is made of the best scored masternodes of the list at its
//! work block. A rotating quorum is assembled from four quarters, one per cycle,
//! rebuilt from the lists and snapshots at the work block of each cycle. Quarters are
//! shared by every quorum of a cycle and computed once per cycle.

use std::collections::BTreeMap;
use std::sync::Arc;

use crate::BlockHash;
use crate::network::constants::Network;
use crate::prelude::CoreBlockHeight;
use crate::processor::context::{HeaderChain, MasternodeListProvider};
use crate::sml::llmq_type::LLMQType;
use crate::sml::masternode_list::MasternodeList;
use crate::sml::masternode_list::rotation::{
    Quarters, WORK_BLOCK_DISTANCE, quorum_members_from_quarters,
};
use crate::sml::masternode_list_entry::MasternodeListEntry;
use crate::sml::quorum_entry::qualified_quorum_entry::QualifiedQuorumEntry;
use crate::sml::quorum_entry::quorum_modifier_type::LLMQModifierType;
use crate::sml::quorum_validation_error::QuorumValidationError;

/// Quarters of a cycle: the new ones, then those of h-c, h-2c and h-3c.
struct CycleQuarters {
    new: Quarters,
    h_minus_c: Quarters,
    h_minus_2c: Quarters,
    h_minus_3c: Quarters,
}

pub struct QuorumMemberResolver<'a, H: ?Sized, P: ?Sized> {
    network: Network,
    headers: &'a H,
    lists: &'a P,
    cycles: BTreeMap<(LLMQType, CoreBlockHeight), Arc<CycleQuarters>>,
}

impl<'a, H, P> QuorumMemberResolver<'a, H, P>
where
    H: HeaderChain + ?Sized,
    P: MasternodeListProvider + ?Sized,
{
    pub fn new(network: Network, headers: &'a H, lists: &'a P) -> Self {
        QuorumMemberResolver {
            network,
            headers,
            lists,
            cycles: BTreeMap::new(),
        }
    }

    /// The members of `quorum` in the order its bitsets refer to them.
    pub fn members_for(
        &mut self,
        quorum: &QualifiedQuorumEntry,
    ) -> Result<Vec<MasternodeListEntry>, QuorumValidationError> {
        if quorum.quorum_entry.llmq_type.is_rotating_quorum_type() {
            self.rotating_members(quorum)
        } else {
            self.non_rotating_members(quorum)
        }
    }

    fn non_rotating_members(
        &self,
        quorum: &QualifiedQuorumEntry,
    ) -> Result<Vec<MasternodeListEntry>, QuorumValidationError> {
        let llmq_type = quorum.quorum_entry.llmq_type;
        let quorum_block_hash = BlockHash::from(quorum.quorum_entry.quorum_hash);
        let quorum_height = self.height_of(&quorum_block_hash)?;
        // from v20 members are picked at the work block instead of the quorum block
        let work_height = if self.network.core_v20_is_active_at(quorum_height) {
            quorum_height.saturating_sub(WORK_BLOCK_DISTANCE)
        } else {
            quorum_height
        };
        let work_list = self.list_at_height(work_height)?;
        let modifier = self.modifier(llmq_type, quorum_block_hash, &work_list);
        Ok(work_list.valid_masternodes_for_quorum(llmq_type, modifier))
    }

    fn rotating_members(
        &mut self,
        quorum: &QualifiedQuorumEntry,
    ) -> Result<Vec<MasternodeListEntry>, QuorumValidationError> {
        let llmq_type = quorum.quorum_entry.llmq_type;
        let quorum_height = self.height_of(&BlockHash::from(quorum.quorum_entry.quorum_hash))?;
        let quorum_index = match quorum.quorum_entry.quorum_index {
            Some(index) if index >= 0 => index as u32,
            _ => quorum_height % llmq_type.cycle_length(),
        };
        let cycle_base_height = quorum_height.saturating_sub(quorum_index);

        let quarters = match self.cycles.get(&(llmq_type, cycle_base_height)) {
            Some(quarters) => quarters.clone(),
            None => {
                let quarters = Arc::new(self.cycle_quarters(llmq_type, cycle_base_height)?);
                self.cycles.insert((llmq_type, cycle_base_height), quarters.clone());
                quarters
            }
        };
        Ok(quorum_members_from_quarters(
            &quarters.h_minus_3c,
            &quarters.h_minus_2c,
            &quarters.h_minus_c,
            &quarters.new,
            quorum_index as usize,
        ))
    }

    fn cycle_quarters(
        &self,
        llmq_type: LLMQType,
        cycle_base_height: CoreBlockHeight,
    ) -> Result<CycleQuarters, QuorumValidationError> {
        let cycle_length = llmq_type.cycle_length();
        let mut previous = Vec::with_capacity(3);
        for cycles_back in 1..=3 {
            let base_height = cycle_base_height
                .checked_sub(cycles_back * cycle_length)
                .ok_or(QuorumValidationError::CycleBeforeGenesis(cycle_base_height))?;
            let (base_hash, work_list) = self.cycle_work_list(base_height)?;
            let snapshot = self
                .lists
                .quorum_snapshot(&work_list.block_hash)
                .ok_or(QuorumValidationError::RequiredSnapshotNotPresent(work_list.block_hash))?;
            let modifier = self.modifier(llmq_type, base_hash, &work_list).build_llmq_hash();
            previous.push(work_list.quarter_members_from_snapshot(llmq_type, &snapshot, &modifier));
        }
        let [h_minus_c, h_minus_2c, h_minus_3c]: [Quarters; 3] = previous
            .try_into()
            .map_err(|_| QuorumValidationError::CycleBeforeGenesis(cycle_base_height))?;

        let (base_hash, work_list) = self.cycle_work_list(cycle_base_height)?;
        let modifier = self.modifier(llmq_type, base_hash, &work_list).build_llmq_hash();
        let new = work_list.new_quarter_members(
            llmq_type,
            [&h_minus_c, &h_minus_2c, &h_minus_3c],
            &modifier,
        );
        log::trace!(
            "rebuilt quarters of {} cycle at {} from work block {}",
            llmq_type,
            cycle_base_height,
            work_list.block_hash
        );
        Ok(CycleQuarters {
            new,
            h_minus_c,
            h_minus_2c,
            h_minus_3c,
        })
    }

    /// The hash of the cycle base block and the list at its work block.
    fn cycle_work_list(
        &self,
        base_height: CoreBlockHeight,
    ) -> Result<(BlockHash, Arc<MasternodeList>), QuorumValidationError> {
        let base_hash = self
            .headers
            .block_hash_at_height(base_height)
            .ok_or(QuorumValidationError::RequiredBlockHeightNotPresent(base_height))?;
        let work_list = self.list_at_height(base_height.saturating_sub(WORK_BLOCK_DISTANCE))?;
        Ok((base_hash, work_list))
    }

    /// The modifier scoring masternodes for a quorum whose base block is `base_hash`.
    ///
    /// From v20 it commits to the chain lock signature found in the coinbase of the
    /// work block; without one, and before v20, to the base block hash.
    fn modifier(
        &self,
        llmq_type: LLMQType,
        base_hash: BlockHash,
        work_list: &MasternodeList,
    ) -> LLMQModifierType {
        match work_list.chain_lock_signature {
            Some(signature) if self.network.core_v20_is_active_at(work_list.known_height) => {
                LLMQModifierType::CoreV20(llmq_type, work_list.known_height, signature)
            }
            _ => LLMQModifierType::PreCoreV20(llmq_type, base_hash),
        }
    }

    fn height_of(&self, block_hash: &BlockHash) -> Result<CoreBlockHeight, QuorumValidationError> {
        self.headers
            .height_for_block_hash(block_hash)
            .ok_or(QuorumValidationError::RequiredBlockNotPresent(*block_hash))
    }

    fn list_at_height(
        &self,
        height: CoreBlockHeight,
    ) -> Result<Arc<MasternodeList>, QuorumValidationError> {
        let block_hash = self
            .headers
            .block_hash_at_height(height)
            .ok_or(QuorumValidationError::RequiredBlockHeightNotPresent(height))?;
        self.lists
            .masternode_list(&block_hash)
            .ok_or(QuorumValidationError::RequiredMasternodeListNotPresent(height, block_hash))
    }
}
